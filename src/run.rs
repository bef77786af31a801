//! The run: an ordered list of segments and the timer state machine driving
//! them
//!
//! ```text
//! Null -> Ready -> Ongoing <-> Paused
//!                     |
//!                     v
//!                  Stopped -> (reset) -> Ready
//! ```
//!
//! Every command samples the run's clock once, validates its preconditions
//! before touching anything and reports changes to subscribed listeners.
use crate::clock::{Clock, MonotonicClock};
use crate::config::ComparisonConfig;
use crate::definition::{RunDefinition, SegmentDefinition};
use crate::events::{Column, Listener, ListenerId, Notifier, RunEvent};
use crate::segment::{Segment, TimeKind, TimeSlot};
use crate::time::Time;
use crate::{Command, Error};
use log::{debug, info, trace, warn};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum State {
    /// No segments
    Null,
    /// Segments exist, timer not started
    Ready,
    Ongoing,
    Paused,
    /// Completed or halted
    Stopped,
}

/// Attempt-scoped state of a run, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSession {
    pub state: State,
    /// Index of the segment being timed, `len()` once every split is done
    pub current: Option<usize>,
    /// Timestamp at which the attempt started
    pub start_time: Option<i64>,
}

impl RunSession {
    fn fresh(segment_count: usize) -> Self {
        Self {
            state: if segment_count == 0 {
                State::Null
            } else {
                State::Ready
            },
            current: None,
            start_time: None,
        }
    }
}

/// A value read from the segment table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell<'a> {
    Icon(Option<&'a str>),
    Name(&'a str),
    Time(Option<Time>),
}

#[derive(Debug, Clone)]
struct Backup {
    name: String,
    segmented: bool,
    segments: Vec<Segment>,
    session: RunSession,
}

pub struct Run {
    name: String,
    segmented: bool,
    segments: Vec<Segment>,
    session: RunSession,
    comparison: ComparisonConfig,
    clock: Arc<dyn Clock>,
    notifier: Notifier,
    backup: Option<Backup>,
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run")
            .field("name", &self.name)
            .field("segmented", &self.segmented)
            .field("segments", &self.segments)
            .field("session", &self.session)
            .field("comparison", &self.comparison)
            .field("listeners", &self.notifier.len())
            .finish()
    }
}

impl Run {
    /// Empty run timed by the system's monotonic clock
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_clock(name, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            segmented: false,
            segments: vec![],
            session: RunSession::fresh(0),
            comparison: ComparisonConfig::default(),
            clock,
            notifier: Notifier::new(),
            backup: None,
        }
    }

    /// Builds a run ready for a new attempt from its saved definition
    pub fn from_definition(definition: RunDefinition, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        let mut segments = Vec::with_capacity(definition.segments.len());
        for s in definition.segments {
            if s.name.is_empty() {
                return Err(Error::EmptyName);
            }
            let mut segment = Segment::with_times(s.name, s.run_time, s.best_time)?;
            segment.set_icon(s.icon);
            segments.push(segment);
        }
        debug!(
            "Loaded run \"{}\" with {} segments",
            definition.name,
            segments.len()
        );
        Ok(Self {
            name: definition.name,
            segmented: definition.segmented,
            session: RunSession::fresh(segments.len()),
            segments,
            comparison: ComparisonConfig::default(),
            clock,
            notifier: Notifier::new(),
            backup: None,
        })
    }

    /// Persisted part of this run
    pub fn definition(&self) -> RunDefinition {
        RunDefinition {
            name: self.name.clone(),
            segmented: self.segmented,
            segments: self
                .segments
                .iter()
                .map(|s| SegmentDefinition {
                    name: s.name().to_string(),
                    icon: s.icon().map(str::to_string),
                    run_time: s.time(TimeKind::Run, self.comparison.method),
                    best_time: s.time(TimeKind::Best, self.comparison.method),
                })
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.name {
            self.name = name;
            self.notifier.emit(RunEvent::NameChanged);
        }
    }

    /// Whether the timer pauses after each split
    pub fn is_segmented(&self) -> bool {
        self.segmented
    }

    pub fn set_segmented(&mut self, segmented: bool) {
        self.segmented = segmented;
    }

    pub fn comparison(&self) -> ComparisonConfig {
        self.comparison
    }

    pub fn set_comparison(&mut self, comparison: ComparisonConfig) {
        self.comparison = comparison;
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn state(&self) -> State {
        self.session.state
    }

    pub fn current(&self) -> Option<usize> {
        self.session.current
    }

    pub fn session(&self) -> RunSession {
        self.session
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True once every segment has been split
    pub fn is_complete(&self) -> bool {
        !self.segments.is_empty() && self.session.current == Some(self.segments.len())
    }

    fn set_state(&mut self, new: State) {
        let old = self.session.state;
        if old != new {
            trace!("{old} -> {new}");
            self.session.state = new;
            self.notifier.emit(RunEvent::StateChanged { old, new });
        }
    }

    fn set_current(&mut self, new: Option<usize>) {
        let old = self.session.current;
        if old != new {
            self.session.current = new;
            self.notifier.emit(RunEvent::CurrentChanged { old, new });
        }
    }

    fn illegal(&self, command: Command) -> Error {
        let e = Error::IllegalState {
            command,
            state: self.session.state,
        };
        warn!("{e}");
        e
    }

    fn check_index(&self, index: usize) -> Result<(), Error> {
        if index < self.segments.len() {
            Ok(())
        } else {
            Err(Error::InvalidIndex {
                index,
                len: self.segments.len(),
            })
        }
    }

    fn now(&self) -> Result<i64, Error> {
        let now = self.clock.now();
        if now < 0 {
            return Err(Error::NegativeStartTime(now));
        }
        Ok(now)
    }

    /// Index of the segment being timed while the timer is running or paused
    fn timed_segment(&self) -> Option<usize> {
        self.session.current.filter(|c| *c < self.segments.len())
    }

    fn emit_cell(&mut self, row: usize, column: Column) {
        self.notifier.emit(RunEvent::CellChanged { row, column });
    }

    /// Cumulative split times of `from..` are derived from segment times, so
    /// they change whenever one of those does
    fn emit_split_times_from(&mut self, from: usize) {
        for row in from..self.segments.len() {
            self.emit_cell(row, Column::Time);
        }
    }

    pub fn add_segment(&mut self, segment: Segment) -> Result<(), Error> {
        if segment.name().is_empty() {
            return Err(Error::EmptyName);
        }
        debug!("Adding segment \"{}\"", segment.name());
        self.segments.push(segment);
        self.notifier.emit(RunEvent::StructureChanged);
        if self.session.state == State::Null {
            self.set_state(State::Ready);
        }
        Ok(())
    }

    pub fn remove_segment(&mut self, index: usize) -> Result<Segment, Error> {
        self.check_index(index)?;
        let removed = self.segments.remove(index);
        debug!("Removed segment \"{}\"", removed.name());
        self.notifier.emit(RunEvent::StructureChanged);

        let len = self.segments.len();
        if len == 0 {
            self.session.start_time = None;
            self.set_current(None);
            self.set_state(State::Null);
        } else if let Some(current) = self.session.current {
            let timing = matches!(self.session.state, State::Ongoing | State::Paused);
            if timing && index == current && index < len {
                // the segment sliding in keeps timing from the removed one's start
                let next = &mut self.segments[index];
                next.inherit_start(removed.start_time());
                if self.session.state == State::Paused {
                    next.put(removed.time(TimeKind::Live, self.comparison.method), TimeSlot::Live);
                }
            }
            let shifted = if index < current { current - 1 } else { current };
            let shifted = shifted.min(len);
            self.set_current(Some(shifted));
            if timing && shifted == len {
                self.set_state(State::Stopped);
            }
        }
        Ok(removed)
    }

    /// Segments being timed keep their position in the attempt: the session
    /// slots stay where they were and only the saved parts move
    fn swap_segments(&mut self, upper: usize) {
        self.segments.swap(upper, upper + 1);
        if matches!(self.session.state, State::Ongoing | State::Paused) {
            let (left, right) = self.segments.split_at_mut(upper + 1);
            left[upper].swap_session(&mut right[0]);
        }
        self.notifier.emit(RunEvent::StructureChanged);
    }

    /// Swaps segment `index` with the one before it
    pub fn move_segment_up(&mut self, index: usize) -> Result<(), Error> {
        self.check_index(index)?;
        if index == 0 {
            return Err(Error::InvalidIndex {
                index,
                len: self.segments.len(),
            });
        }
        self.swap_segments(index - 1);
        Ok(())
    }

    /// Swaps segment `index` with the one after it
    pub fn move_segment_down(&mut self, index: usize) -> Result<(), Error> {
        self.check_index(index)?;
        if index + 1 == self.segments.len() {
            return Err(Error::InvalidIndex {
                index,
                len: self.segments.len(),
            });
        }
        self.swap_segments(index);
        Ok(())
    }

    /// Starts a new attempt, discarding live times of the previous one
    pub fn start(&mut self) -> Result<(), Error> {
        match self.session.state {
            State::Null | State::Ongoing => return Err(self.illegal(Command::Start)),
            State::Ready | State::Paused | State::Stopped => {}
        }
        let now = self.now()?;
        for segment in self.segments.iter_mut() {
            segment.clear_session();
        }
        self.segments[0].set_start_time(now)?;
        self.session.start_time = Some(now);
        self.set_current(Some(0));
        self.set_state(State::Ongoing);
        info!("Run \"{}\" started", self.name);
        Ok(())
    }

    /// Records the live time of the current segment and moves on to the next
    pub fn split(&mut self) -> Result<(), Error> {
        let current = match (self.session.state, self.timed_segment()) {
            (State::Ongoing, Some(c)) => c,
            _ => return Err(self.illegal(Command::Split)),
        };
        let now = self.now()?;
        let start = self.segments[current]
            .start_time()
            .ok_or(Error::MissingStartTime(current))?;
        let live = Time::from_milliseconds(now - start);
        self.segments[current].put(Some(live), TimeSlot::Live);
        debug!(
            "Split \"{}\" at {live}",
            self.segments[current].name()
        );

        let next = current + 1;
        self.set_current(Some(next));
        if next == self.segments.len() {
            self.stop()?;
            if self.is_personal_best() {
                info!("Run \"{}\" completed with a personal best", self.name);
            } else {
                info!("Run \"{}\" completed", self.name);
            }
        } else {
            self.segments[next].set_start_time(now)?;
            if self.segmented {
                self.pause()?;
            }
        }
        Ok(())
    }

    /// Goes back to the previous segment, which keeps timing from its
    /// original start
    pub fn unsplit(&mut self) -> Result<(), Error> {
        let current = match (self.session.state, self.session.current) {
            (State::Ongoing | State::Stopped, Some(c)) => c,
            _ => return Err(self.illegal(Command::Unsplit)),
        };
        if current == 0 {
            return Ok(());
        }
        let previous = current - 1;
        self.segments[previous].put(None, TimeSlot::Live);
        debug!("Unsplit \"{}\"", self.segments[previous].name());
        self.set_current(Some(previous));
        if self.session.state == State::Stopped {
            self.set_state(State::Ongoing);
        }
        Ok(())
    }

    /// Freezes the current segment's elapsed time into its live time
    pub fn pause(&mut self) -> Result<(), Error> {
        let current = match (self.session.state, self.timed_segment()) {
            (State::Ongoing, Some(c)) => c,
            _ => return Err(self.illegal(Command::Pause)),
        };
        let now = self.now()?;
        let start = self.segments[current]
            .start_time()
            .ok_or(Error::MissingStartTime(current))?;
        let live = Time::from_milliseconds(now - start);
        self.segments[current].put(Some(live), TimeSlot::Live);
        self.set_state(State::Paused);
        debug!("Paused at {live}");
        Ok(())
    }

    /// Shifts every start timestamp so that elapsed times continue from where
    /// they were when paused
    pub fn resume(&mut self) -> Result<(), Error> {
        let current = match (self.session.state, self.timed_segment()) {
            (State::Paused, Some(c)) => c,
            _ => return Err(self.illegal(Command::Resume)),
        };
        let now = self.now()?;
        let method = self.comparison.method;
        let live_ms =
            |s: &Segment| s.time(TimeKind::Live, method).map_or(0, |t| t.milliseconds());

        let mut starts = vec![0; current + 1];
        starts[current] = now - live_ms(&self.segments[current]);
        for i in (0..current).rev() {
            starts[i] = starts[i + 1] - live_ms(&self.segments[i]);
        }
        if let Some(negative) = starts.iter().find(|s| **s < 0) {
            return Err(Error::NegativeStartTime(*negative));
        }

        for (segment, start) in self.segments.iter_mut().zip(starts.iter()) {
            segment.set_start_time(*start)?;
        }
        self.session.start_time = Some(starts[0]);
        self.set_state(State::Ongoing);
        debug!("Resumed");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), Error> {
        if self.session.state != State::Ongoing {
            return Err(self.illegal(Command::Stop));
        }
        self.set_state(State::Stopped);
        Ok(())
    }

    /// Discards the current attempt. Always allowed.
    pub fn reset(&mut self) {
        for segment in self.segments.iter_mut() {
            segment.clear_session();
        }
        self.session.start_time = None;
        self.set_current(None);
        let state = RunSession::fresh(self.segments.len()).state;
        self.set_state(state);
        debug!("Run \"{}\" reset", self.name);
    }

    /// Skips the current segment without recording a live time. Its elapsed
    /// time is carried into the next segment, which inherits its start
    /// timestamp. Returns false when there is no next segment to skip to.
    pub fn skip(&mut self) -> bool {
        let current = match self.session.current {
            Some(c) if c + 1 < self.segments.len() => c,
            _ => return false,
        };
        let start = self.segments[current].start_time();
        let live = self.segments[current].time(TimeKind::Live, self.comparison.method);
        let next = &mut self.segments[current + 1];
        next.inherit_start(start);
        // a paused segment keeps its elapsed time in the live slot
        if self.session.state == State::Paused {
            next.put(live, TimeSlot::Live);
        }
        self.segments[current].put(None, TimeSlot::Live);
        debug!("Skipped \"{}\"", self.segments[current].name());
        self.set_current(Some(current + 1));
        true
    }

    /// Elapsed time of the whole attempt
    pub fn run_elapsed(&self) -> Option<Time> {
        match self.session.state {
            State::Null | State::Ready => None,
            State::Ongoing => {
                let start = self.session.start_time?;
                Some(Time::from_milliseconds(self.clock.now() - start))
            }
            State::Paused => self.time(self.timed_segment()?, TimeKind::Live, false),
            State::Stopped => self.time(self.segments.len() - 1, TimeKind::Live, false),
        }
    }

    /// Elapsed time of the segment being timed
    pub fn segment_elapsed(&self) -> Option<Time> {
        let segment = &self.segments[self.timed_segment()?];
        match self.session.state {
            State::Ongoing => {
                let start = segment.start_time()?;
                Some(Time::from_milliseconds(self.clock.now() - start))
            }
            State::Paused => segment.time(TimeKind::Live, self.comparison.method),
            _ => None,
        }
    }

    /// Cumulative time through segment `index`.
    ///
    /// With `allow_null`, returns `None` when segment `index` itself has no
    /// time of that kind; otherwise undefined segments count as zero. Delta
    /// kinds compare the cumulative live time with the cumulative reference.
    pub fn time(&self, index: usize, kind: TimeKind, allow_null: bool) -> Option<Time> {
        let method = self.comparison.method;
        let segment = self.segments.get(index)?;
        let reference = match kind {
            TimeKind::Delta => Some(TimeKind::Set),
            TimeKind::DeltaRun => Some(TimeKind::Run),
            TimeKind::DeltaBest => Some(TimeKind::Best),
            TimeKind::Run | TimeKind::Best | TimeKind::Live | TimeKind::Set => None,
        };
        if let Some(reference) = reference {
            let reference = self.time(index, reference, allow_null)?;
            let live = self.time(index, TimeKind::Live, false);
            return Some(Time::delta(live, Some(reference)));
        }

        if allow_null && segment.time(kind, method).is_none() {
            return None;
        }
        let mut total = Time::ZERO;
        for s in &self.segments[..=index] {
            total.accumulate(s.time(kind, method));
        }
        Some(total)
    }

    /// Scale of the comparison graph: a percentage of the total compared
    /// time, taken at the last segment that has one
    pub fn compare_time(&self) -> Time {
        let total = (0..self.segments.len())
            .rev()
            .find_map(|i| self.time(i, TimeKind::Set, true));
        match total {
            Some(t) => Time::from_milliseconds(
                (t.milliseconds() as f64 * self.comparison.compare_percent / 100.0) as i64,
            ),
            None => Time::ZERO,
        }
    }

    /// The attempt is complete and faster than the saved run. A run that was
    /// never completed before is beaten by any complete attempt.
    pub fn is_personal_best(&self) -> bool {
        if !self.is_complete() {
            return false;
        }
        let last = self.segments.len() - 1;
        match self.time(last, TimeKind::Live, false) {
            Some(live) => live.compare_opt(self.time(last, TimeKind::Run, true)) == Ordering::Less,
            None => false,
        }
    }

    /// Whether any split segment of this attempt is a new best segment, as
    /// [`Run::is_best_segment`] sees it: a segment timed over skipped ones is
    /// compared against their best times too
    pub fn has_segments_best(&self) -> bool {
        let done = self.session.current.unwrap_or(0).min(self.segments.len());
        (0..done).any(|i| self.is_best_segment(i))
    }

    /// Live time of segment `index` beats its compared time
    pub fn is_better_segment(&self, index: usize) -> bool {
        self.beats_reference(index, TimeKind::Set)
    }

    /// Live time of segment `index` beats its best time
    pub fn is_best_segment(&self, index: usize) -> bool {
        self.beats_reference(index, TimeKind::Best)
    }

    /// Compares live and reference times of segment `index`, both widened to
    /// cover the same stretch of the run.
    ///
    /// Earlier segments without a reference time are covered by this
    /// segment's reference, so their live times join the live side. Earlier
    /// segments without a live time (skipped) were timed within this
    /// segment's live time, so their references join the reference side. Each
    /// side walks back until it meets a defined time.
    fn beats_reference(&self, index: usize, kind: TimeKind) -> bool {
        let method = self.comparison.method;
        let Some(segment) = self.segments.get(index) else {
            return false;
        };
        let Some(mut live) = segment.time(TimeKind::Live, method) else {
            return false;
        };
        let mut reference = segment.time(kind, method);

        let mut i = index;
        while i > 0 && self.segments[i - 1].time(kind, method).is_none() {
            i -= 1;
            live.accumulate(self.segments[i].time(TimeKind::Live, method));
        }

        let mut i = index;
        while i > 0 && self.segments[i - 1].time(TimeKind::Live, method).is_none() {
            i -= 1;
            if let Some(r) = self.segments[i].time(kind, method) {
                reference = Some(reference.unwrap_or(Time::ZERO) + r);
            }
        }

        live.compare_opt(reference) == Ordering::Less
    }

    /// Reads one cell of the segment table
    pub fn cell(&self, row: usize, column: Column) -> Option<Cell<'_>> {
        let segment = self.segments.get(row)?;
        let method = self.comparison.method;
        Some(match column {
            Column::Icon => Cell::Icon(segment.icon()),
            Column::Name => Cell::Name(segment.name()),
            Column::Time => Cell::Time(self.time(row, TimeKind::Run, true)),
            Column::Segment => Cell::Time(segment.time(TimeKind::Run, method)),
            Column::Best => Cell::Time(segment.time(TimeKind::Best, method)),
        })
    }

    pub fn set_segment_name(&mut self, index: usize, name: impl Into<String>) -> Result<(), Error> {
        self.check_index(index)?;
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        self.segments[index].set_name(name);
        self.emit_cell(index, Column::Name);
        Ok(())
    }

    pub fn set_segment_icon(&mut self, index: usize, icon: Option<String>) -> Result<(), Error> {
        self.check_index(index)?;
        self.segments[index].set_icon(icon);
        self.emit_cell(index, Column::Icon);
        Ok(())
    }

    /// Sets the saved segment time of segment `index` as is. Later splits
    /// move with it.
    pub fn set_segment_time(&mut self, index: usize, time: Option<Time>) -> Result<(), Error> {
        self.check_index(index)?;
        self.segments[index].set_time(time, TimeSlot::Run, false)?;
        self.emit_cell(index, Column::Segment);
        self.emit_split_times_from(index);
        Ok(())
    }

    pub fn set_best_time(&mut self, index: usize, time: Option<Time>) -> Result<(), Error> {
        self.check_index(index)?;
        self.segments[index].set_time(time, TimeSlot::Best, false)?;
        self.emit_cell(index, Column::Best);
        Ok(())
    }

    /// Edits the saved cumulative split time of segment `index` while
    /// keeping the other splits where they are.
    ///
    /// Clearing a split hands its segment time over to the next defined
    /// segment. Setting one takes the difference out of the next defined
    /// segment, provided the new split still falls between its neighbours.
    pub fn set_split_time(&mut self, index: usize, time: Option<Time>) -> Result<(), Error> {
        self.check_index(index)?;
        let method = self.comparison.method;
        let run_time = |s: &Segment| s.time(TimeKind::Run, method);

        let Some(time) = time else {
            let stored = run_time(&self.segments[index]);
            let next = (index + 1..self.segments.len()).find(|k| run_time(&self.segments[*k]).is_some());
            self.segments[index].put(None, TimeSlot::Run);
            self.emit_cell(index, Column::Segment);
            if let (Some(stored), Some(next)) = (stored, next) {
                let mut merged = stored;
                merged.accumulate(run_time(&self.segments[next]));
                self.segments[next].put(Some(merged), TimeSlot::Run);
                self.emit_cell(next, Column::Segment);
            }
            self.emit_split_times_from(index);
            debug!("Cleared split {index}");
            return Ok(());
        };

        let baseline = match self.time(index, TimeKind::Run, true) {
            Some(old) => old,
            None if index > 0 => self
                .time(index - 1, TimeKind::Run, false)
                .unwrap_or(Time::ZERO),
            None => Time::ZERO,
        };
        let delta = time - baseline;
        let previous = (0..index)
            .rev()
            .find_map(|i| self.time(i, TimeKind::Run, true))
            .unwrap_or(Time::ZERO);
        let segment_time = time - previous;
        if !segment_time.is_positive() {
            return Err(Error::InvalidTime(segment_time));
        }

        // the next split must stay where it was
        let next = (index + 1..self.segments.len())
            .find_map(|k| self.time(k, TimeKind::Run, true).map(|split| (k, split)));
        if let Some((k, next_split)) = next {
            if previous < time && time < next_split {
                let adjusted = run_time(&self.segments[k]).unwrap_or(Time::ZERO) - delta;
                self.segments[k].put(Some(adjusted), TimeSlot::Run);
                self.emit_cell(k, Column::Segment);
            }
        }

        self.segments[index].set_time(Some(segment_time), TimeSlot::Run, false)?;
        self.emit_cell(index, Column::Segment);
        let best = self.segments[index].time(TimeKind::Best, method);
        if segment_time.compare_opt(best) == Ordering::Less {
            self.segments[index].set_time(Some(segment_time), TimeSlot::Best, false)?;
            self.emit_cell(index, Column::Best);
        }
        self.emit_split_times_from(index);
        debug!("Split {index} set to {time}");
        Ok(())
    }

    /// Keeps what this attempt achieved: improved best segments always, and
    /// the live times as the new saved run unless `partial` or the attempt
    /// is incomplete
    pub fn save_live_times(&mut self, partial: bool) {
        let method = self.comparison.method;
        let replace_run = !partial && self.is_complete();
        let mut changed = vec![];
        for (row, segment) in self.segments.iter_mut().enumerate() {
            let live = segment
                .time(TimeKind::Live, method)
                .filter(Time::is_positive);
            if let Some(l) = live {
                if l.compare_opt(segment.time(TimeKind::Best, method)) == Ordering::Less {
                    segment.put(Some(l), TimeSlot::Best);
                    changed.push((row, Column::Best));
                }
            }
            if replace_run {
                segment.put(live, TimeSlot::Run);
                changed.push((row, Column::Segment));
                changed.push((row, Column::Time));
            }
        }
        for (row, column) in changed {
            self.emit_cell(row, column);
        }
        if replace_run {
            info!("Saved live times of \"{}\" as the new run", self.name);
        }
    }

    /// Keeps a copy of the segments and session, for instance before an edit
    /// that may be cancelled
    pub fn save_backup(&mut self) {
        self.backup = Some(Backup {
            name: self.name.clone(),
            segmented: self.segmented,
            segments: self.segments.clone(),
            session: self.session,
        });
    }

    /// Restores the last backup. Returns false if there is none.
    pub fn load_backup(&mut self) -> bool {
        let Some(backup) = self.backup.take() else {
            return false;
        };
        let old_session = self.session;
        let renamed = backup.name != self.name;
        self.name = backup.name;
        self.segmented = backup.segmented;
        self.segments = backup.segments;
        self.session = backup.session;

        self.notifier.emit(RunEvent::StructureChanged);
        if renamed {
            self.notifier.emit(RunEvent::NameChanged);
        }
        if old_session.state != self.session.state {
            self.notifier.emit(RunEvent::StateChanged {
                old: old_session.state,
                new: self.session.state,
            });
        }
        if old_session.current != self.session.current {
            self.notifier.emit(RunEvent::CurrentChanged {
                old: old_session.current,
                new: self.session.current,
            });
        }
        info!("Restored backup of \"{}\"", self.name);
        true
    }
}
