//! Timer/Split State Machine
//!
//! `TimerState` is a plain state container: every operation is a synchronous
//! call that either applies a transition or, when the call makes no sense in
//! the current state, does nothing at all. It has no I/O and no concurrency of
//! its own; the coordinator owns the single instance and serializes access.
//!
//! Elapsed time is tracked as an accumulated baseline plus the instant the
//! current running window began, so pausing and resuming never loses or
//! double-counts time.

use crate::command::BestTimesPatch;
use crate::config::DEFAULT_TIMER_TITLE;
use crate::duration::Nanos;
use crate::snapshot::TimerSnapshot;
use crate::split::{Split, SplitDefinition};
use crate::time::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

// ----------------------------------------------------------------------------
// Status
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

// ----------------------------------------------------------------------------
// Best-Time Bookkeeping
// ----------------------------------------------------------------------------

/// Per-split records and run-level bests
///
/// The three arrays always have the same length as the layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BestTimes {
    segments: Vec<Nanos>,
    cumulative: Vec<Nanos>,
    pb_splits: Vec<Nanos>,
    personal_best: Nanos,
    sum_of_best: Nanos,
    world_record: Nanos,
}

impl BestTimes {
    /// Drop every per-split record and reallocate for a layout of `len` splits
    fn reallocate(&mut self, len: usize) {
        self.segments = vec![Nanos::ZERO; len];
        self.cumulative = vec![Nanos::ZERO; len];
        self.pb_splits = vec![Nanos::ZERO; len];
        self.recompute_sum_of_best();
    }

    fn recompute_sum_of_best(&mut self) {
        self.sum_of_best = self.segments.iter().copied().sum();
    }
}

/// What a successful `next_split` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub split: Split,
    /// The split was the last one in the layout and the run is over
    pub run_finished: bool,
    pub new_personal_best: bool,
}

// ----------------------------------------------------------------------------
// Timer State
// ----------------------------------------------------------------------------

/// The single authoritative timer
#[derive(Debug)]
pub struct TimerState<C: Clock = SystemClock> {
    clock: C,
    status: TimerStatus,
    /// Last computed elapsed time; live while running, frozen otherwise
    elapsed: Nanos,
    /// Start of the current running window
    running_since: Option<Instant>,
    /// Time accumulated by earlier running windows of this run
    accumulated: Duration,
    splits: Vec<Split>,
    predefined_splits: Vec<SplitDefinition>,
    title: String,
    current_split: Option<usize>,
    best: BestTimes,
}

impl TimerState<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TimerState<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TimerState<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            status: TimerStatus::Stopped,
            elapsed: Nanos::ZERO,
            running_since: None,
            accumulated: Duration::ZERO,
            splits: Vec::new(),
            predefined_splits: Vec::new(),
            title: DEFAULT_TIMER_TITLE.to_string(),
            current_split: None,
            best: BestTimes::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Elapsed run time, read live from the clock while running
    pub fn elapsed(&self) -> Nanos {
        if self.is_running() {
            Nanos::from(self.run_duration(self.clock.now()))
        } else {
            self.elapsed
        }
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn predefined_splits(&self) -> &[SplitDefinition] {
        &self.predefined_splits
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn current_split_index(&self) -> Option<usize> {
        self.current_split
    }

    pub fn best_segment_times(&self) -> &[Nanos] {
        &self.best.segments
    }

    pub fn best_cumulative_times(&self) -> &[Nanos] {
        &self.best.cumulative
    }

    pub fn pb_split_times(&self) -> &[Nanos] {
        &self.best.pb_splits
    }

    pub fn personal_best(&self) -> Nanos {
        self.best.personal_best
    }

    pub fn sum_of_best(&self) -> Nanos {
        self.best.sum_of_best
    }

    pub fn world_record(&self) -> Nanos {
        self.best.world_record
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Start a new run from Stopped, or resume from Paused
    pub fn start(&mut self) {
        let now = self.clock.now();
        match self.status {
            TimerStatus::Stopped => {
                self.accumulated = Duration::ZERO;
                self.elapsed = Nanos::ZERO;
                self.splits.clear();
                self.current_split = (!self.predefined_splits.is_empty()).then_some(0);
            }
            TimerStatus::Paused => {}
            TimerStatus::Running => return,
        }
        self.running_since = Some(now);
        self.status = TimerStatus::Running;
    }

    /// Toggle between Running and Paused
    pub fn pause(&mut self) {
        match self.status {
            TimerStatus::Running => {
                self.freeze(self.clock.now());
                self.status = TimerStatus::Paused;
            }
            TimerStatus::Paused => {
                self.running_since = Some(self.clock.now());
                self.status = TimerStatus::Running;
            }
            TimerStatus::Stopped => {}
        }
    }

    /// Return to Stopped, keeping every best-time record
    pub fn reset(&mut self) {
        self.status = TimerStatus::Stopped;
        self.elapsed = Nanos::ZERO;
        self.splits.clear();
        self.current_split = None;
        self.running_since = None;
        self.accumulated = Duration::ZERO;
    }

    /// Replace the course layout and title
    ///
    /// A layout with a different number of splits invalidates every per-split
    /// record. A layout change during a run keeps the run going; progress past
    /// the end of a shorter layout is dropped.
    pub fn set_predefined_splits(&mut self, splits: Vec<SplitDefinition>, title: String) {
        let len = splits.len();
        if len != self.predefined_splits.len() {
            debug!(
                from = self.predefined_splits.len(),
                to = len,
                "Split count changed, clearing best times"
            );
            self.best.reallocate(len);
        }
        self.predefined_splits = splits;
        self.title = title;

        if self.status == TimerStatus::Stopped {
            self.splits.clear();
            self.current_split = None;
        } else {
            self.splits.truncate(len);
            self.current_split = self.current_split.filter(|&index| index < len);
        }
    }

    /// Complete the split currently being timed
    ///
    /// Returns `None` (and changes nothing) unless the timer is running with a
    /// split in progress.
    pub fn next_split(&mut self) -> Option<SplitOutcome> {
        if !self.is_running() {
            return None;
        }
        let index = self
            .current_split
            .filter(|&index| index < self.predefined_splits.len())?;

        let now = self.clock.now();
        let cumulative = Nanos::from(self.run_duration(now));
        self.elapsed = cumulative;

        let previous = self
            .splits
            .last()
            .map(|split| split.cumulative_time)
            .unwrap_or(Nanos::ZERO);
        let segment = cumulative - previous;

        let best_cumulative = self.best.cumulative[index];
        let delta = if best_cumulative.is_zero() {
            Nanos::ZERO
        } else {
            cumulative - best_cumulative
        };

        if segment.improves_on(self.best.segments[index]) {
            self.best.segments[index] = segment;
            self.best.recompute_sum_of_best();
        }
        if cumulative.improves_on(best_cumulative) {
            self.best.cumulative[index] = cumulative;
        }

        let split = Split {
            name: self.predefined_splits[index].name.clone(),
            segment_time: segment,
            cumulative_time: cumulative,
            delta,
        };
        self.splits.push(split.clone());

        let run_finished = index + 1 == self.predefined_splits.len();
        let mut new_personal_best = false;
        if run_finished {
            self.freeze(now);
            self.status = TimerStatus::Stopped;
            self.current_split = None;
            new_personal_best = self.record_finished_run(cumulative);
        } else {
            self.current_split = Some(index + 1);
        }

        Some(SplitOutcome {
            split,
            run_finished,
            new_personal_best,
        })
    }

    /// Refresh the elapsed time from the clock while running
    pub fn tick(&mut self) {
        if self.is_running() {
            self.elapsed = Nanos::from(self.run_duration(self.clock.now()));
        }
    }

    /// Overwrite best-time records from an earlier session
    ///
    /// Entries beyond the current layout and malformed entries are skipped.
    /// The sum of best is recomputed from the restored best segments.
    pub fn apply_best_times(&mut self, patch: BestTimesPatch) {
        overlay(&mut self.best.segments, patch.best_segment_times);
        overlay(&mut self.best.cumulative, patch.best_cumulative_times);
        overlay(&mut self.best.pb_splits, patch.pb_split_times);
        if let Some(personal_best) = patch.personal_best {
            self.best.personal_best = personal_best;
        }
        if let Some(world_record) = patch.world_record {
            self.best.world_record = world_record;
        }
        self.best.recompute_sum_of_best();
    }

    /// Set the reference world record; zero clears it
    pub fn set_world_record(&mut self, world_record: Nanos) {
        self.best.world_record = world_record;
    }

    /// Externally visible state, without the internal time anchors
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            current_time: self.elapsed(),
            status: self.status,
            splits: self.splits.clone(),
            predefined_splits: self.predefined_splits.clone(),
            timer_title: self.title.clone(),
            current_split_index: self.current_split.map_or(-1, |index| index as i64),
            best_split_times: self.best.segments.clone(),
            best_cumulative_times: self.best.cumulative.clone(),
            personal_best: self.best.personal_best,
            sum_of_best: self.best.sum_of_best,
            pb_split_times: self.best.pb_splits.clone(),
            world_record: self.best.world_record,
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn run_duration(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + now.saturating_duration_since(since),
            None => self.accumulated,
        }
    }

    /// Close the current running window at `now`
    fn freeze(&mut self, now: Instant) {
        self.accumulated = self.run_duration(now);
        self.running_since = None;
        self.elapsed = Nanos::from(self.accumulated);
    }

    fn record_finished_run(&mut self, total: Nanos) -> bool {
        if !total.improves_on(self.best.personal_best) {
            return false;
        }
        self.best.personal_best = total;

        let len = self.predefined_splits.len();
        let mut pb_splits: Vec<Nanos> = self
            .splits
            .iter()
            .map(|split| split.cumulative_time)
            .take(len)
            .collect();
        pb_splits.resize(len, Nanos::ZERO);
        self.best.pb_splits = pb_splits;

        if !self.best.world_record.is_zero() && total < self.best.world_record {
            self.best.world_record = total;
        }
        true
    }
}

fn overlay(target: &mut [Nanos], source: Option<Vec<Option<Nanos>>>) {
    let Some(source) = source else { return };
    for (slot, value) in target.iter_mut().zip(source) {
        if let Some(value) = value {
            *slot = value;
        }
    }
}
