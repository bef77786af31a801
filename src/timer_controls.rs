//! Control a shared run from input callbacks
//!
//! Every function takes the run's write lock for the whole command, so a run
//! is never driven by two threads at once.
use crate::run::{Run, State};
use crate::Command;
use log::{error, info, warn};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Errors while controlling the run with keybindings
#[derive(Debug)]
pub enum TimerControlError<'a> {
    /// Unrecoverable error with the run
    RunWriteLock(PoisonError<RwLockWriteGuard<'a, Run>>),
    /// Unrecoverable error with the run
    RunReadLock(PoisonError<RwLockReadGuard<'a, Run>>),
}

impl fmt::Display for TimerControlError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerControlError::RunWriteLock(lock) => fmt::Display::fmt(lock, f),
            TimerControlError::RunReadLock(lock) => fmt::Display::fmt(lock, f),
        }
    }
}

fn write_run(run: &Arc<RwLock<Run>>) -> RwLockWriteGuard<'_, Run> {
    match run.write().map_err(TimerControlError::RunWriteLock) {
        Ok(run) => run,
        Err(e) => {
            error!("{e}");
            panic!("{e}") // cannot recover
        }
    }
}

/// Read access to `run`, for display
///
/// # Panics
/// Panics if the lock is poisoned
pub fn read_run(run: &Arc<RwLock<Run>>) -> RwLockReadGuard<'_, Run> {
    match run.read().map_err(TimerControlError::RunReadLock) {
        Ok(run) => run,
        Err(e) => {
            error!("{e}");
            panic!("{e}") // cannot recover
        }
    }
}

/// Starts `run` if it is not running, splits otherwise. Returns false if the
/// run refused the keypress.
///
/// # Panics
/// Panics if the lock is poisoned
pub fn start_or_split(run: &Arc<RwLock<Run>>) -> bool {
    let mut run = write_run(run);
    let result = match run.state() {
        State::Ready | State::Stopped => {
            info!("Start/split keypress: start");
            run.start()
        }
        _ => {
            info!("Start/split keypress: split");
            run.split()
        }
    };
    match result {
        Ok(()) => {
            if run.is_complete() {
                info!("Ended!");
            }
            true
        }
        Err(e) => {
            warn!("{e}");
            false
        }
    }
}

/// Reset `run`, keeping improved best segments of the discarded attempt
///
/// # Panics
/// Panics if the lock is poisoned
pub fn reset(run: &Arc<RwLock<Run>>) {
    info!("Reset keypress");
    let mut run = write_run(run);
    run.save_live_times(true);
    run.reset();
}

/// Runs `command` on `run`. Returns false if the run refused it.
///
/// # Panics
/// Panics if the lock is poisoned
pub fn dispatch(run: &Arc<RwLock<Run>>, command: Command) -> bool {
    let result = match command {
        Command::Split => return start_or_split(run),
        Command::Reset => {
            reset(run);
            return true;
        }
        Command::Skip => {
            let skipped = write_run(run).skip();
            if !skipped {
                info!("Nothing to skip");
            }
            return skipped;
        }
        Command::Start => write_run(run).start(),
        Command::Unsplit => write_run(run).unsplit(),
        Command::Pause => write_run(run).pause(),
        Command::Resume => write_run(run).resume(),
        Command::Stop => write_run(run).stop(),
    };
    info!("{command} keypress");
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("{e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::segment::{Segment, TimeKind};
    use crate::time::Time;

    fn shared_run(clock: &ManualClock) -> Arc<RwLock<Run>> {
        let mut run = Run::with_clock("Any%", Arc::new(clock.clone()));
        for name in ["Forest", "Lake"] {
            run.add_segment(Segment::new(name)).unwrap();
        }
        Arc::new(RwLock::new(run))
    }

    #[test]
    fn split_key_starts_then_splits() {
        let clock = ManualClock::new(0);
        let run = shared_run(&clock);
        assert!(start_or_split(&run));
        assert_eq!(read_run(&run).state(), State::Ongoing);
        clock.advance(1_000);
        assert!(start_or_split(&run));
        clock.advance(2_000);
        assert!(start_or_split(&run));
        let r = read_run(&run);
        assert_eq!(r.state(), State::Stopped);
        assert_eq!(
            r.time(1, TimeKind::Live, true),
            Some(Time::from_milliseconds(3_000))
        );
    }

    #[test]
    fn refused_commands_report_false() {
        let clock = ManualClock::new(0);
        let run = shared_run(&clock);
        assert!(!dispatch(&run, Command::Pause));
        assert!(!dispatch(&run, Command::Skip));
        assert!(dispatch(&run, Command::Split));
        assert!(dispatch(&run, Command::Pause));
        assert!(!dispatch(&run, Command::Pause));
        assert!(dispatch(&run, Command::Resume));
    }

    #[test]
    fn reset_keeps_improved_best_segments() {
        let clock = ManualClock::new(0);
        let run = shared_run(&clock);
        dispatch(&run, Command::Split);
        clock.advance(4_000);
        dispatch(&run, Command::Split);
        dispatch(&run, Command::Reset);
        let r = read_run(&run);
        assert_eq!(r.state(), State::Ready);
        assert_eq!(
            r.segments()[0].time(TimeKind::Best, r.comparison().method),
            Some(Time::from_milliseconds(4_000))
        );
        assert_eq!(r.segments()[0].time(TimeKind::Run, r.comparison().method), None);
    }

    #[test]
    fn commands_from_several_threads_are_serialized() {
        let clock = ManualClock::new(0);
        let run = shared_run(&clock);
        dispatch(&run, Command::Split);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let run = run.clone();
                std::thread::spawn(move || dispatch(&run, Command::Pause))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(read_run(&run).state(), State::Paused);
    }
}
