//! Export/import document
//!
//! An export is the outbound snapshot plus a small envelope. Importing one
//! replays it as ordinary commands, so a fresh server ends up with the same
//! layout and best-time bookkeeping without any special code path.

use crate::command::{BestTimesPatch, Command};
use crate::errors::OpenSplitResult;
use crate::snapshot::TimerSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document format version written by this crate
pub const EXPORT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(flatten)]
    pub state: TimerSnapshot,
    /// Width of the timer UI when the export was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_width: Option<u32>,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

impl ExportDocument {
    pub fn from_snapshot(state: TimerSnapshot, container_width: Option<u32>) -> Self {
        Self {
            state,
            container_width,
            version: EXPORT_VERSION.to_string(),
            exported_at: Some(Utc::now()),
        }
    }

    pub fn to_json_pretty(&self) -> OpenSplitResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> OpenSplitResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Commands that rebuild this document's layout and records on a timer
    ///
    /// The layout goes first: it resizes the best-time arrays that the
    /// restore then fills.
    pub fn into_commands(self) -> Vec<Command> {
        let state = self.state;
        let best_times = BestTimesPatch::complete(
            &state.best_split_times,
            &state.best_cumulative_times,
            state.personal_best,
            state.sum_of_best,
            &state.pb_split_times,
            state.world_record,
        );

        vec![
            Command::SetSplits {
                splits: state.predefined_splits,
                title: state.timer_title,
            },
            Command::RestorePbData(best_times),
            Command::SetWorldRecord(state.world_record),
        ]
    }
}
