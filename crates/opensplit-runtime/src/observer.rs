//! Observer identity and outbound queues

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Serialized snapshot, shared by every observer of one broadcast
pub type Payload = Arc<str>;

/// Hub side of an observer's bounded outbound queue
pub type OutboundSender = mpsc::Sender<Payload>;

/// Connection side of an observer's bounded outbound queue
pub type OutboundReceiver = mpsc::Receiver<Payload>;

/// Create the outbound queue for one observer
pub fn outbound_channel(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    mpsc::channel(capacity)
}

/// Unique identity of a connected observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first group is plenty to tell observers apart in logs
        let id = self.0.simple().to_string();
        write!(f, "{}", &id[..8])
    }
}
