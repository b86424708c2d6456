//! Command Decoder
//!
//! Inbound frames are loosely-typed JSON objects with a `command` field. This
//! module turns them into the closed [`Command`] enum, normalizing optional
//! arguments to safe defaults on the way. Anything that cannot be turned into
//! a command is a [`DecodeError`]; the caller logs and discards the frame.

use crate::config::{DEFAULT_SPLIT_ICON, DEFAULT_TIMER_TITLE};
use crate::duration::Nanos;
use crate::errors::DecodeError;
use crate::split::SplitDefinition;
use serde_json::{Map, Value};

// ----------------------------------------------------------------------------
// Command Types
// ----------------------------------------------------------------------------

/// A validated command, ready to be applied to the timer
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    SetSplits {
        splits: Vec<SplitDefinition>,
        title: String,
    },
    NextSplit,
    RestorePbData(BestTimesPatch),
    SetWorldRecord(Nanos),
}

impl Command {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Reset => "reset",
            Command::SetSplits { .. } => "setSplits",
            Command::NextSplit => "nextSplit",
            Command::RestorePbData(_) => "restorePBData",
            Command::SetWorldRecord(_) => "setWorldRecord",
        }
    }
}

/// Best-time data restored from an earlier session
///
/// `None` means the field was absent and is left untouched. Inside the
/// arrays, `None` marks a malformed entry that is skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestTimesPatch {
    pub best_segment_times: Option<Vec<Option<Nanos>>>,
    pub best_cumulative_times: Option<Vec<Option<Nanos>>>,
    pub personal_best: Option<Nanos>,
    /// Accepted for compatibility; the timer recomputes its own sum of best
    pub sum_of_best: Option<Nanos>,
    pub pb_split_times: Option<Vec<Option<Nanos>>>,
    pub world_record: Option<Nanos>,
}

impl BestTimesPatch {
    /// Build a patch with every entry present
    pub fn complete(
        best_segment_times: &[Nanos],
        best_cumulative_times: &[Nanos],
        personal_best: Nanos,
        sum_of_best: Nanos,
        pb_split_times: &[Nanos],
        world_record: Nanos,
    ) -> Self {
        let wrap = |values: &[Nanos]| Some(values.iter().copied().map(Some).collect());
        Self {
            best_segment_times: wrap(best_segment_times),
            best_cumulative_times: wrap(best_cumulative_times),
            personal_best: Some(personal_best),
            sum_of_best: Some(sum_of_best),
            pb_split_times: wrap(pb_split_times),
            world_record: Some(world_record),
        }
    }
}

// ----------------------------------------------------------------------------
// Decoding
// ----------------------------------------------------------------------------

/// Decode one inbound frame
pub fn decode_command(frame: &[u8]) -> Result<Command, DecodeError> {
    let value: Value = serde_json::from_slice(frame)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let name = object
        .get("command")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingCommand)?;

    match name {
        "start" => Ok(Command::Start),
        "pause" => Ok(Command::Pause),
        "reset" => Ok(Command::Reset),
        "setSplits" => decode_set_splits(object),
        "nextSplit" => Ok(Command::NextSplit),
        "restorePBData" => Ok(Command::RestorePbData(decode_best_times(object))),
        "setWorldRecord" => object
            .get("worldRecord")
            .and_then(Nanos::from_json_number)
            .map(Command::SetWorldRecord)
            .ok_or(DecodeError::InvalidArgument {
                command: "setWorldRecord",
                field: "worldRecord",
            }),
        other => Err(DecodeError::UnknownCommand {
            name: other.to_string(),
        }),
    }
}

fn decode_set_splits(object: &Map<String, Value>) -> Result<Command, DecodeError> {
    let entries = object
        .get("splits")
        .and_then(Value::as_array)
        .ok_or(DecodeError::InvalidArgument {
            command: "setSplits",
            field: "splits",
        })?;

    let splits = entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| SplitDefinition {
            name: string_field(entry, "name").unwrap_or_default(),
            icon: string_field(entry, "icon").unwrap_or_else(|| DEFAULT_SPLIT_ICON.to_string()),
            notes: string_field(entry, "notes").unwrap_or_default(),
        })
        .collect();

    let title = string_field(object, "title").unwrap_or_else(|| DEFAULT_TIMER_TITLE.to_string());

    Ok(Command::SetSplits { splits, title })
}

fn decode_best_times(object: &Map<String, Value>) -> BestTimesPatch {
    let scalar = |field: &str| object.get(field).and_then(Nanos::from_json_number);
    let array = |field: &str| {
        object
            .get(field)
            .and_then(Value::as_array)
            .map(|values| values.iter().map(Nanos::from_json_number).collect())
    };

    BestTimesPatch {
        best_segment_times: array("bestSplitTimes"),
        best_cumulative_times: array("bestCumulativeTimes"),
        personal_best: scalar("personalBest"),
        sum_of_best: scalar("sumOfBest"),
        pb_split_times: array("pbSplitTimes"),
        world_record: scalar("worldRecord"),
    }
}

fn string_field(object: &Map<String, Value>, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).map(str::to_owned)
}
