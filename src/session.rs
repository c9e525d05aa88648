//! Per-document session state held by one tab.
//!
//! A [`DocumentSession`] is a tab's in-memory view of one remote document:
//! the text buffer, the edit flags, and the lock token when this tab holds
//! the exclusive write lock.

use std::fmt;

use remote_docs::LockTimeout;

/// Content classification used to pick a formatter, resolved once from the
/// path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// XML family, including DITA topics and maps.
    Xml,
    /// HTML and XHTML.
    Html,
    /// JSON documents.
    Json,
    /// Anything else.
    Text,
}

impl Language {
    /// Classifies `path` by its extension (case-insensitive).
    pub fn from_path(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        let ext = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return Language::Text,
        };
        match ext.as_str() {
            "xml" | "dita" | "ditamap" | "xsd" | "xsl" | "xslt" | "svg" => Language::Xml,
            "html" | "htm" | "xhtml" => Language::Html,
            "json" => Language::Json,
            _ => Language::Text,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Xml => "xml",
            Language::Html => "html",
            Language::Json => "json",
            Language::Text => "text",
        };
        write!(f, "{}", s)
    }
}

/// Edit flags of a session.
///
/// `dirty` and `stale` are independent: a session can carry local edits and
/// be known to lag behind the remote copy at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditFlags {
    /// Local edits not yet saved.
    pub dirty: bool,
    /// The buffer is behind the latest saved remote version.
    pub stale: bool,
    /// Opened without the lock; local edits are rejected.
    pub read_only: bool,
}

/// Coarse state of a session, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Viewing without the lock.
    ReadOnly,
    /// Holding the lock, no unsaved edits.
    EditableClean,
    /// Holding the lock with unsaved edits.
    EditableDirty,
    /// A save request is in flight.
    Saving,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::ReadOnly => "read-only",
            SessionState::EditableClean => "clean",
            SessionState::EditableDirty => "dirty",
            SessionState::Saving => "saving",
        };
        write!(f, "{}", s)
    }
}

/// A tab's open view of one remote document.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    /// Remote file path; unique within a tab.
    pub path: String,
    /// Last path segment, for tab titles.
    pub display_name: String,
    /// URL the content is served from.
    pub resolved_url: String,
    /// In-memory text buffer.
    pub content: String,
    /// Classification derived from the path extension.
    pub language: Language,
    /// Dirty/stale/read-only flags.
    pub flags: EditFlags,
    /// Exclusive lock credential; only ever present on editable sessions.
    pub lock_token: Option<String>,
    /// Lease timeout reported when the lock was granted. Informational only.
    pub lock_timeout: Option<LockTimeout>,
    /// Set while a save request is in flight.
    pub saving: bool,
    /// When the session was opened.
    pub opened_at: chrono::DateTime<chrono::Utc>,
}

impl DocumentSession {
    /// Creates an editable session holding `token`.
    pub fn editable(
        path: impl Into<String>,
        resolved_url: impl Into<String>,
        content: String,
        token: String,
    ) -> Self {
        let mut session = Self::base(path.into(), resolved_url.into(), content);
        session.lock_token = Some(token);
        session
    }

    /// Creates a read-only session. Read-only sessions never carry a token.
    pub fn read_only(
        path: impl Into<String>,
        resolved_url: impl Into<String>,
        content: String,
    ) -> Self {
        let mut session = Self::base(path.into(), resolved_url.into(), content);
        session.flags.read_only = true;
        session
    }

    fn base(path: String, resolved_url: String, content: String) -> Self {
        Self {
            display_name: display_name(&path),
            language: Language::from_path(&path),
            path,
            resolved_url,
            content,
            flags: EditFlags::default(),
            lock_token: None,
            lock_timeout: None,
            saving: false,
            opened_at: chrono::Utc::now(),
        }
    }

    /// Current coarse state.
    pub fn state(&self) -> SessionState {
        if self.flags.read_only {
            SessionState::ReadOnly
        } else if self.saving {
            SessionState::Saving
        } else if self.flags.dirty {
            SessionState::EditableDirty
        } else {
            SessionState::EditableClean
        }
    }

    /// Returns `true` if this session holds a token it could release.
    pub fn holds_lock(&self) -> bool {
        !self.flags.read_only && self.lock_token.is_some()
    }

    /// Returns `true` if the buffer should be refetched silently.
    pub fn needs_reload(&self) -> bool {
        self.flags.stale && !self.flags.dirty
    }

    /// Applies a local edit.
    ///
    /// Returns `false` without touching the buffer when the session is
    /// read-only.
    pub fn apply_edit(&mut self, content: String) -> bool {
        if self.flags.read_only {
            return false;
        }
        if content != self.content {
            self.content = content;
            self.flags.dirty = true;
        }
        true
    }

    /// Replaces the buffer with freshly fetched remote content.
    ///
    /// Clears both `dirty` and `stale`; callers must have checked that
    /// discarding local edits is acceptable.
    pub fn replace_content(&mut self, content: String) {
        self.content = content;
        self.flags.dirty = false;
        self.flags.stale = false;
    }
}

/// Last non-empty segment of a slash-separated path.
pub fn display_name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(path)
        .to_string()
}
