//! TOML configuration: schema, file location, loading and the default
//! template written by `tabdoc config init`.

pub mod default;
pub mod error;
pub mod loader;
pub mod schema;
pub mod xdg;

pub use error::ConfigError;
pub use loader::{ConfigLoader, ConfigSource};
pub use schema::Config;
