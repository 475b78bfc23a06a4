//! Transition history tracking.
//!
//! Every time a machine settles on a new leaf it appends a
//! [`TransitionRecord`] describing which states were exited and entered. The
//! history is bounded; once full, the oldest records are dropped.

use super::state::{StateId, TransitionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Default number of records a machine keeps.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Record of one settled transition.
///
/// # Example
///
/// ```rust
/// use hsm_engine::core::{StateId, TransitionKind, TransitionRecord};
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     from: Some(StateId::new(1)),
///     to: StateId::new(3),
///     source: StateId::new(1),
///     target: StateId::new(2),
///     kind: TransitionKind::External,
///     exited: vec![StateId::new(1)],
///     entered: vec![StateId::new(2), StateId::new(3)],
///     timestamp: Utc::now(),
/// };
/// assert!(!record.is_initial());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Leaf the machine left; `None` for initialization.
    pub from: Option<StateId>,
    /// Leaf the machine settled on
    pub to: StateId,
    /// State that declared the transition
    pub source: StateId,
    /// Declared target, possibly a composite
    pub target: StateId,
    pub kind: TransitionKind,
    /// Exit actions run, leaf-to-root
    pub exited: Vec<StateId>,
    /// Entry actions run, root-to-leaf, including the default-child cascade
    pub entered: Vec<StateId>,
    /// When the machine settled
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Whether this record is the machine's initialization.
    pub fn is_initial(&self) -> bool {
        self.from.is_none()
    }
}

/// Bounded, ordered history of settled transitions.
///
/// # Example
///
/// ```rust
/// use hsm_engine::core::{StateId, TransitionHistory, TransitionKind, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = TransitionHistory::with_limit(2);
/// for (from, to) in [(None, 1), (Some(1), 2), (Some(2), 3)] {
///     history.record(TransitionRecord {
///         from: from.map(StateId::new),
///         to: StateId::new(to),
///         source: StateId::new(0),
///         target: StateId::new(to),
///         kind: TransitionKind::External,
///         exited: Vec::new(),
///         entered: Vec::new(),
///         timestamp: Utc::now(),
///     });
/// }
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.get_path(), vec![StateId::new(1), StateId::new(2), StateId::new(3)]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionHistory {
    limit: usize,
    records: VecDeque<TransitionRecord>,
}

impl Default for TransitionHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl TransitionHistory {
    /// Create an empty history with the default limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty history keeping at most `limit` records.
    /// A limit of zero disables recording.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            records: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Append a record, dropping the oldest one when full.
    pub fn record(&mut self, record: TransitionRecord) {
        if self.limit == 0 {
            return;
        }
        while self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Retained records, oldest first.
    pub fn transitions(&self) -> impl DoubleEndedIterator<Item = &TransitionRecord> + '_ {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Leaves the machine settled on, in order.
    ///
    /// Starts with the `from` leaf of the oldest retained record when there is
    /// one, so a truncated history still reads as a connected path.
    pub fn get_path(&self) -> Vec<StateId> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(from) = self.records.front().and_then(|record| record.from) {
            path.push(from);
        }
        path.extend(self.records.iter().map(|record| record.to));
        path
    }

    /// Time between the first and last retained record.
    pub fn duration(&self) -> Option<Duration> {
        let first = self.records.front()?;
        let last = self.records.back()?;
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
