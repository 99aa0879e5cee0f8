use std::fmt;

use crate::event::Event;

/// The effect a diff has on the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffKind {
    Create,
    Update,
    Delete,
}

impl DiffKind {
    /// One-character marker used in log lines.
    pub const fn marker(self) -> char {
        match self {
            DiffKind::Create => '+',
            DiffKind::Update => '~',
            DiffKind::Delete => '-',
        }
    }
}

/// One change to apply to the local store.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDiff {
    Create(Event),
    Update { old: Event, new: Event },
    Delete(Event),
}

impl fmt::Display for EventDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind().marker(), self.event().title, self.event().id)
    }
}

impl EventDiff {
    /// Diff between two versions of the same event. `None` when equal.
    pub fn get_diff(old: Event, new: Event) -> Option<EventDiff> {
        if old == new {
            None
        } else {
            Some(EventDiff::Update { old, new })
        }
    }

    pub fn kind(&self) -> DiffKind {
        match self {
            EventDiff::Create(_) => DiffKind::Create,
            EventDiff::Update { .. } => DiffKind::Update,
            EventDiff::Delete(_) => DiffKind::Delete,
        }
    }

    /// The event after the change, or the removed event for deletions.
    pub fn event(&self) -> &Event {
        match self {
            EventDiff::Create(event) | EventDiff::Delete(event) => event,
            EventDiff::Update { new, .. } => new,
        }
    }
}
