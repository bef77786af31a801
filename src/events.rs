//! Change notifications emitted by a run
//!
//! Presentation code subscribes once and redraws what the events point at.
//! Cells are addressed the way a table of segments × [`Column`] would be.
use crate::run::State;
use strum::{Display, EnumIter};

/// Columns of the segment table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Column {
    Icon,
    Name,
    /// Cumulative split time of the saved run
    Time,
    /// Segment time of the saved run
    Segment,
    /// Best segment time
    Best,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    StateChanged { old: State, new: State },
    CurrentChanged { old: Option<usize>, new: Option<usize> },
    CellChanged { row: usize, column: Column },
    /// Rows were added, removed, reordered or restored from a backup
    StructureChanged,
    NameChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&RunEvent) + Send + Sync>;

/// Listeners of a single run, called in subscription order
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        before != self.listeners.len()
    }

    pub fn emit(&mut self, event: RunEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}
