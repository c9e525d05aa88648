//! Event loop plumbing for one tab.
//!
//! A [`Tab`] owns a [`SessionCoordinator`] and the queue its asynchronous
//! inputs land in. The bus listener and the lifecycle guard only push
//! [`TabEvent`]s; the tab applies them one at a time, between user commands,
//! so the store is never mutated from two places at once.

use tokio::sync::mpsc;

use crate::bus::Subscription;
use crate::coordinator::{Dispatch, SessionCoordinator, TabEvent};
use crate::lifecycle::LifecycleSignal;

/// What the host loop should do after an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStep {
    /// Keep running.
    Continue,
    /// Leaving was requested but unsaved edits exist. Asking again leaves.
    UnloadBlocked,
    /// The tab was torn down.
    Exit,
}

/// One running tab.
#[derive(Debug)]
pub struct Tab {
    coordinator: SessionCoordinator,
    events_tx: mpsc::UnboundedSender<TabEvent>,
    events_rx: mpsc::UnboundedReceiver<TabEvent>,
    subscription: Option<Subscription>,
    unload_blocked: bool,
    torn_down: bool,
}

impl Tab {
    /// Starts the tab: subscribes to the bus and begins queueing its
    /// messages. Must be called within a Tokio runtime.
    pub fn start(coordinator: SessionCoordinator) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let forward = events_tx.clone();
        let subscription = coordinator.bus().subscribe(move |message| {
            let _ = forward.send(TabEvent::Bus(message));
        });
        tracing::debug!(tab = coordinator.tab_id(), "tab started");
        Self {
            coordinator,
            events_tx,
            events_rx,
            subscription: Some(subscription),
            unload_blocked: false,
            torn_down: false,
        }
    }

    /// The tab's coordinator, for user commands.
    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// Sender for pushing events (lifecycle signals, test input) into the
    /// tab's queue.
    pub fn events(&self) -> mpsc::UnboundedSender<TabEvent> {
        self.events_tx.clone()
    }

    /// Waits for the next queued event.
    pub async fn next_event(&mut self) -> Option<TabEvent> {
        self.events_rx.recv().await
    }

    /// Applies one event.
    ///
    /// `BeforeUnload` with unsaved edits blocks once; a second
    /// `BeforeUnload` in a row proceeds to teardown, as does one with no
    /// unsaved edits.
    pub async fn handle(&mut self, event: TabEvent) -> TabStep {
        if self.torn_down {
            return TabStep::Exit;
        }
        let before_unload = event == TabEvent::Lifecycle(LifecycleSignal::BeforeUnload);
        let teardown = matches!(&event, TabEvent::Lifecycle(s) if s.is_teardown());

        if before_unload && self.unload_blocked {
            tracing::info!("leaving with unsaved changes");
            self.shutdown().await;
            return TabStep::Exit;
        }

        let outcome = self.coordinator.dispatch(event).await;
        match outcome {
            Dispatch::BlockUnload => {
                self.unload_blocked = true;
                TabStep::UnloadBlocked
            }
            Dispatch::Continue if before_unload => {
                self.shutdown().await;
                TabStep::Exit
            }
            Dispatch::Continue if teardown => {
                self.finish();
                TabStep::Exit
            }
            Dispatch::Continue => {
                self.unload_blocked = false;
                TabStep::Continue
            }
        }
    }

    /// Applies every event already queued without waiting for more.
    pub async fn process_pending(&mut self) -> TabStep {
        while let Ok(event) = self.events_rx.try_recv() {
            let step = self.handle(event).await;
            if step != TabStep::Continue {
                return step;
            }
        }
        TabStep::Continue
    }

    /// Tears the tab down: page hide then unload. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        for signal in [LifecycleSignal::PageHide, LifecycleSignal::Unload] {
            self.coordinator.dispatch(signal.into()).await;
        }
        self.finish();
    }

    /// Returns `true` once the tab has been torn down.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn finish(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.torn_down = true;
        tracing::debug!(tab = self.coordinator.tab_id(), "tab torn down");
    }
}
