//! Outbound state snapshot
//!
//! The snapshot is the only view of the timer observers ever get. It carries
//! every field except the internal time anchors.

use crate::duration::Nanos;
use crate::errors::OpenSplitResult;
use crate::split::{Split, SplitDefinition};
use crate::timer::TimerStatus;
use serde::{Deserialize, Serialize};

/// Full timer state as broadcast to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub current_time: Nanos,
    pub status: TimerStatus,
    pub splits: Vec<Split>,
    pub predefined_splits: Vec<SplitDefinition>,
    pub timer_title: String,
    /// Index of the split being timed, `-1` when none
    pub current_split_index: i64,
    pub best_split_times: Vec<Nanos>,
    pub best_cumulative_times: Vec<Nanos>,
    pub personal_best: Nanos,
    pub sum_of_best: Nanos,
    pub pb_split_times: Vec<Nanos>,
    pub world_record: Nanos,
}

impl TimerSnapshot {
    pub fn to_json(&self) -> OpenSplitResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> OpenSplitResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
