//! A segment is one leg of a run
use crate::config::CompareMethod;
use crate::time::Time;
use crate::Error;
use log::trace;
use strum::{Display, EnumIter};

/// Time slots stored by a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum TimeSlot {
    /// Segment time of the saved run
    Run,
    /// Best segment time ever achieved
    Best,
    /// Segment time of the current attempt
    Live,
}

/// Every time a segment can answer for, stored or derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum TimeKind {
    Run,
    Best,
    Live,
    /// `Run` or `Best` depending on the comparison method
    Set,
    /// `Live - Set`
    Delta,
    /// `Live - Run`
    DeltaRun,
    /// `Live - Best`
    DeltaBest,
}

impl From<TimeSlot> for TimeKind {
    fn from(slot: TimeSlot) -> Self {
        match slot {
            TimeSlot::Run => TimeKind::Run,
            TimeSlot::Best => TimeKind::Best,
            TimeSlot::Live => TimeKind::Live,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    name: String,
    icon: Option<String>,
    run_time: Option<Time>,
    best_time: Option<Time>,
    live_time: Option<Time>,
    start_time: Option<i64>,
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
            run_time: None,
            best_time: None,
            live_time: None,
            start_time: None,
        }
    }

    /// Builder style constructor for a segment with saved times
    pub fn with_times(
        name: impl Into<String>,
        run_time: Option<Time>,
        best_time: Option<Time>,
    ) -> Result<Self, Error> {
        let mut segment = Segment::new(name);
        segment.set_time(run_time, TimeSlot::Run, false)?;
        segment.set_time(best_time, TimeSlot::Best, false)?;
        Ok(segment)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Path of the icon displayed next to the name
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn set_icon(&mut self, icon: Option<String>) {
        self.icon = icon;
    }

    /// Stores `time` in `slot`. Unless `bypass` is set, a defined time must be
    /// strictly positive.
    pub fn set_time(&mut self, time: Option<Time>, slot: TimeSlot, bypass: bool) -> Result<(), Error> {
        if let Some(t) = time {
            if !bypass && !t.is_positive() {
                return Err(Error::InvalidTime(t));
            }
        }
        self.put(time, slot);
        Ok(())
    }

    /// Stores `time` in `slot` without validation, for the run's own
    /// bookkeeping
    pub(crate) fn put(&mut self, time: Option<Time>, slot: TimeSlot) {
        trace!("segment \"{}\": {slot} time {time:?}", self.name);
        match slot {
            TimeSlot::Run => self.run_time = time,
            TimeSlot::Best => self.best_time = time,
            TimeSlot::Live => self.live_time = time,
        }
    }

    /// Stored or derived time of this segment. Deltas are absent when their
    /// reference is absent.
    pub fn time(&self, kind: TimeKind, method: CompareMethod) -> Option<Time> {
        match kind {
            TimeKind::Run => self.run_time,
            TimeKind::Best => self.best_time,
            TimeKind::Live => self.live_time,
            TimeKind::Set => match method {
                CompareMethod::BestOverallRun => self.run_time,
                CompareMethod::SumOfBestSegments => self.best_time,
            },
            TimeKind::Delta => self
                .time(TimeKind::Set, method)
                .map(|set| Time::delta(self.live_time, Some(set))),
            TimeKind::DeltaRun => self
                .run_time
                .map(|run| Time::delta(self.live_time, Some(run))),
            TimeKind::DeltaBest => self
                .best_time
                .map(|best| Time::delta(self.live_time, Some(best))),
        }
    }

    /// Timestamp at which this segment started timing
    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    pub fn set_start_time(&mut self, ms: i64) -> Result<(), Error> {
        if ms < 0 {
            return Err(Error::NegativeStartTime(ms));
        }
        self.start_time = Some(ms);
        Ok(())
    }

    /// Takes over the start timestamp of a skipped or removed segment
    pub(crate) fn inherit_start(&mut self, start: Option<i64>) {
        self.start_time = start;
    }

    /// Exchanges live time and start timestamp with `other`
    pub(crate) fn swap_session(&mut self, other: &mut Segment) {
        std::mem::swap(&mut self.live_time, &mut other.live_time);
        std::mem::swap(&mut self.start_time, &mut other.start_time);
    }

    /// Forgets everything about the current attempt
    pub(crate) fn clear_session(&mut self) {
        self.live_time = None;
        self.start_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: i64) -> Option<Time> {
        Some(Time::from_milliseconds(s * 1000))
    }

    #[test]
    fn rejects_non_positive_times_unless_bypassed() {
        let mut s = Segment::new("Forest");
        assert_eq!(
            s.set_time(Some(Time::ZERO), TimeSlot::Run, false),
            Err(Error::InvalidTime(Time::ZERO))
        );
        assert_eq!(
            s.set_time(Some(Time::from_milliseconds(-10)), TimeSlot::Best, false),
            Err(Error::InvalidTime(Time::from_milliseconds(-10)))
        );
        assert_eq!(s.time(TimeKind::Run, CompareMethod::BestOverallRun), None);

        s.set_time(Some(Time::ZERO), TimeSlot::Live, true).unwrap();
        assert_eq!(s.time(TimeKind::Live, CompareMethod::BestOverallRun), Some(Time::ZERO));
        s.set_time(None, TimeSlot::Run, false).unwrap();
    }

    #[test]
    fn set_follows_comparison_method() {
        let s = Segment::with_times("Forest", secs(12), secs(10)).unwrap();
        assert_eq!(s.time(TimeKind::Set, CompareMethod::BestOverallRun), secs(12));
        assert_eq!(s.time(TimeKind::Set, CompareMethod::SumOfBestSegments), secs(10));
    }

    #[test]
    fn deltas_are_absent_without_reference() {
        let mut s = Segment::with_times("Forest", secs(12), None).unwrap();
        s.set_time(secs(11), TimeSlot::Live, false).unwrap();
        let m = CompareMethod::BestOverallRun;
        assert_eq!(s.time(TimeKind::Delta, m), Some(Time::from_milliseconds(-1000)));
        assert_eq!(s.time(TimeKind::DeltaRun, m), Some(Time::from_milliseconds(-1000)));
        assert_eq!(s.time(TimeKind::DeltaBest, m), None);
        assert_eq!(s.time(TimeKind::Delta, CompareMethod::SumOfBestSegments), None);

        // without live time the delta is the negated reference
        s.set_time(None, TimeSlot::Live, false).unwrap();
        assert_eq!(s.time(TimeKind::DeltaRun, m), Some(Time::from_milliseconds(-12_000)));
    }

    #[test]
    fn clone_is_deep() {
        let mut s = Segment::with_times("Forest", secs(12), secs(10)).unwrap();
        s.set_icon(Some("forest.png".to_string()));
        s.set_start_time(300).unwrap();
        let copy = s.clone();
        s.set_time(secs(20), TimeSlot::Run, false).unwrap();
        s.set_name("Lake");
        assert_eq!(copy.name(), "Forest");
        assert_eq!(copy.icon(), Some("forest.png"));
        assert_eq!(copy.start_time(), Some(300));
        assert_eq!(copy.time(TimeKind::Run, CompareMethod::BestOverallRun), secs(12));
    }

    #[test]
    fn negative_start_time_is_rejected() {
        let mut s = Segment::new("Forest");
        assert_eq!(s.set_start_time(-1), Err(Error::NegativeStartTime(-1)));
        assert_eq!(s.start_time(), None);
        s.set_start_time(0).unwrap();
        assert_eq!(s.start_time(), Some(0));
    }
}
