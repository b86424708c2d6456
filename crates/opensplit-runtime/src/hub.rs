//! Coordinator (Hub)
//!
//! The hub is a single task that exclusively owns the [`TimerState`] and the
//! observer registry. Everything else reaches it through [`HubHandle`], which
//! only ever enqueues [`HubEvent`]s. Events are processed one at a time in
//! arrival order, interleaved with a fixed-period tick, so every mutation is
//! applied and broadcast before the next event is looked at.
//!
//! Fan-out never waits on an observer: a snapshot is offered to each outbound
//! queue with a non-blocking send, and an observer whose queue is full is
//! dropped on the spot. It has to reconnect to receive updates again.

use crate::observer::{ObserverId, OutboundSender, Payload};
use opensplit_core::{
    config::HubConfig, Clock, Command, OpenSplitError, OpenSplitResult, SystemClock, TimerState,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

// ----------------------------------------------------------------------------
// Events and Handle
// ----------------------------------------------------------------------------

/// Everything the hub reacts to, besides its own tick
#[derive(Debug)]
pub enum HubEvent {
    /// Add an observer; it is sent a full snapshot straight away
    Register {
        id: ObserverId,
        outbound: OutboundSender,
    },
    /// Remove an observer; a no-op if it is already gone
    Unregister { id: ObserverId },
    /// Apply a command and broadcast the result
    Command {
        from: Option<ObserverId>,
        command: Command,
    },
    /// Stop the hub loop
    Shutdown,
}

/// Cloneable handle used by connections (and the CLI) to talk to the hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    pub async fn register(&self, id: ObserverId, outbound: OutboundSender) -> OpenSplitResult<()> {
        self.send(HubEvent::Register { id, outbound }).await
    }

    pub async fn unregister(&self, id: ObserverId) -> OpenSplitResult<()> {
        self.send(HubEvent::Unregister { id }).await
    }

    pub async fn submit(&self, from: Option<ObserverId>, command: Command) -> OpenSplitResult<()> {
        self.send(HubEvent::Command { from, command }).await
    }

    pub async fn shutdown(&self) -> OpenSplitResult<()> {
        self.send(HubEvent::Shutdown).await
    }

    /// Whether the hub loop has exited
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    /// Resolves once the hub loop has exited
    pub async fn closed(&self) {
        self.events.closed().await
    }

    async fn send(&self, event: HubEvent) -> OpenSplitResult<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| OpenSplitError::Channel {
                message: "Hub is no longer running".to_string(),
            })
    }
}

// ----------------------------------------------------------------------------
// Statistics
// ----------------------------------------------------------------------------

/// Counters reported when the hub stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    pub commands_applied: u64,
    pub broadcasts: u64,
    pub snapshots_delivered: u64,
    pub observers_registered: u64,
    pub observers_evicted: u64,
}

// ----------------------------------------------------------------------------
// Hub Task
// ----------------------------------------------------------------------------

/// The coordinator task
pub struct Hub<C: Clock = SystemClock> {
    timer: TimerState<C>,
    observers: HashMap<ObserverId, OutboundSender>,
    events: mpsc::Receiver<HubEvent>,
    config: HubConfig,
    stats: HubStats,
}

impl Hub<SystemClock> {
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Hub<C> {
    pub fn with_clock(config: HubConfig, clock: C) -> (Self, HubHandle) {
        let (sender, receiver) = mpsc::channel(config.event_buffer_size.max(1));
        let hub = Self {
            timer: TimerState::with_clock(clock),
            observers: HashMap::new(),
            events: receiver,
            config,
            stats: HubStats::default(),
        };
        (hub, HubHandle { events: sender })
    }

    /// Run the control loop until shutdown or until every handle is dropped
    pub async fn run(mut self) -> OpenSplitResult<HubStats> {
        info!("Hub starting");

        let mut ticker = time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of an interval completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(HubEvent::Shutdown) => {
                        info!("Hub shutdown requested");
                        break;
                    }
                    Some(event) => self.handle_event(event),
                    None => {
                        debug!("All hub handles dropped, stopping");
                        break;
                    }
                },
                _ = ticker.tick() => self.handle_tick(),
            }
        }

        // Dropping the senders closes every outbound queue
        self.observers.clear();
        info!(stats = ?self.stats, "Hub stopped");
        Ok(self.stats)
    }

    fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register { id, outbound } => self.register(id, outbound),
            HubEvent::Unregister { id } => self.unregister(id),
            HubEvent::Command { from, command } => {
                self.apply(from, command);
                self.broadcast();
            }
            HubEvent::Shutdown => {}
        }
    }

    fn register(&mut self, id: ObserverId, outbound: OutboundSender) {
        let Some(payload) = self.encode_snapshot() else {
            return;
        };
        match outbound.try_send(payload) {
            Ok(()) => {
                self.stats.observers_registered += 1;
                self.stats.snapshots_delivered += 1;
                self.observers.insert(id, outbound);
                info!(observer = %id, observers = self.observers.len(), "Observer registered");
            }
            Err(_) => {
                self.stats.observers_evicted += 1;
                warn!(observer = %id, "Observer could not take its initial snapshot, dropping");
            }
        }
    }

    fn unregister(&mut self, id: ObserverId) {
        if self.observers.remove(&id).is_some() {
            info!(observer = %id, observers = self.observers.len(), "Observer unregistered");
        }
    }

    /// Dispatch one command to the timer
    fn apply(&mut self, from: Option<ObserverId>, command: Command) {
        match from {
            Some(id) => debug!(observer = %id, command = command.name(), "Applying command"),
            None => debug!(command = command.name(), "Applying local command"),
        }
        self.stats.commands_applied += 1;

        match command {
            Command::Start => self.timer.start(),
            Command::Pause => self.timer.pause(),
            Command::Reset => self.timer.reset(),
            Command::SetSplits { splits, title } => {
                self.timer.set_predefined_splits(splits, title);
            }
            Command::NextSplit => {
                if let Some(outcome) = self.timer.next_split() {
                    if outcome.run_finished {
                        info!(
                            time = %outcome.split.cumulative_time,
                            personal_best = outcome.new_personal_best,
                            "Run finished"
                        );
                    }
                }
            }
            Command::RestorePbData(patch) => self.timer.apply_best_times(patch),
            Command::SetWorldRecord(world_record) => self.timer.set_world_record(world_record),
        }
    }

    fn handle_tick(&mut self) {
        self.timer.tick();
        if self.timer.is_running() {
            self.broadcast();
        }
    }

    /// Offer the current snapshot to every observer, dropping the ones that
    /// cannot keep up
    fn broadcast(&mut self) {
        let Some(payload) = self.encode_snapshot() else {
            return;
        };
        self.stats.broadcasts += 1;

        let mut dropped = Vec::new();
        for (id, outbound) in &self.observers {
            match outbound.try_send(Arc::clone(&payload)) {
                Ok(()) => self.stats.snapshots_delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(observer = %id, "Observer queue full, dropping slow consumer");
                    dropped.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(observer = %id, "Observer queue closed, dropping");
                    dropped.push(*id);
                }
            }
        }

        for id in dropped {
            self.observers.remove(&id);
            self.stats.observers_evicted += 1;
        }
    }

    fn encode_snapshot(&self) -> Option<Payload> {
        match self.timer.snapshot().to_json() {
            Ok(json) => Some(Payload::from(json)),
            Err(e) => {
                error!("Failed to serialize timer snapshot: {}", e);
                None
            }
        }
    }
}
