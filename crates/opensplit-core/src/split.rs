//! Split records and the course layout

use crate::config::DEFAULT_SPLIT_ICON;
use crate::duration::Nanos;
use serde::{Deserialize, Serialize};

/// A completed segment of the current run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub name: String,
    /// Time since the previous split (or since start for the first one)
    pub segment_time: Nanos,
    /// Time since the run started
    pub cumulative_time: Nanos,
    /// `cumulative_time` minus the best cumulative time at this split; zero
    /// when there was no best to compare against
    pub delta: Nanos,
}

/// A named checkpoint in the course layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitDefinition {
    pub name: String,
    /// Emoji or embedded image payload, passed through untouched
    pub icon: String,
    pub notes: String,
}

impl SplitDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

impl Default for SplitDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            icon: DEFAULT_SPLIT_ICON.to_string(),
            notes: String::new(),
        }
    }
}
