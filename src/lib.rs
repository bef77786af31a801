use std::fmt;
use strum::{Display, EnumIter, EnumString};

pub mod clock;
pub mod config;
pub mod definition;
pub mod events;
pub mod persistence;
pub mod run;
pub mod segment;
pub mod time;
pub mod timer_controls;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{CompareMethod, ComparisonConfig};
pub use definition::{RunDefinition, SegmentDefinition};
pub use events::{Column, RunEvent};
pub use run::{Run, State};
pub use segment::{Segment, TimeKind, TimeSlot};
pub use time::{Accuracy, Time};

/// Errors of the timing core. None of them leave a run half modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Saved times must be strictly positive
    InvalidTime(Time),
    /// Text that does not read as "[[H:]M:]S[.fraction]"
    InvalidTimestamp(String),
    /// Command not allowed in the current state of the run
    IllegalState { command: Command, state: State },
    /// Clock or caller bug, not recoverable by the user
    NegativeStartTime(i64),
    /// Segment being timed has no start timestamp
    MissingStartTime(usize),
    InvalidIndex { index: usize, len: usize },
    EmptyName,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg: String = match self {
            Error::InvalidTime(t) => format!("Invalid time {t}: times must be positive"),
            Error::InvalidTimestamp(s) => format!("Invalid timestamp \"{s}\""),
            Error::IllegalState { command, state } => {
                format!("Cannot {command} while the run is {state}")
            }
            Error::NegativeStartTime(ms) => format!("Negative start time: {ms}ms"),
            Error::MissingStartTime(index) => {
                format!("Segment {index} is being timed without a start time")
            }
            Error::InvalidIndex { index, len } => {
                format!("No segment at index {index} (run has {len} segments)")
            }
            Error::EmptyName => "Segment names cannot be empty".to_string(),
        };
        write!(f, "{msg}")
    }
}

impl std::error::Error for Error {}

/// Commands the timer accepts from input dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Command {
    Start,
    Split,
    Unsplit,
    Skip,
    Pause,
    Resume,
    Stop,
    Reset,
}

