//! Linear undo/redo over stroke log snapshots.

use crate::stroke::StrokeLog;

/// Snapshot history with a cursor.
///
/// Always holds at least one entry; the cursor stays within
/// `0..entries.len()`.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<StrokeLog>,
    cursor: usize,
    /// Maximum number of entries kept, oldest dropped first.
    limit: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// One empty entry, cursor at 0.
    pub fn new() -> Self {
        Self {
            entries: vec![StrokeLog::new()],
            cursor: 0,
            limit: None,
        }
    }

    /// History that keeps at most `limit` snapshots (minimum 1).
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit: limit.map(|l| l.max(1)),
            ..Self::new()
        }
    }

    /// Drop everything after the cursor, then append `snapshot`.
    pub fn push(&mut self, snapshot: StrokeLog) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);

        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let excess = self.entries.len() - limit;
                self.entries.drain(..excess);
            }
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back. Returns `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&StrokeLog> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward. Returns `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&StrokeLog> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Entry under the cursor.
    pub fn current(&self) -> &StrokeLog {
        &self.entries[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of snapshots, never zero.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Back to a single empty entry.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.entries.push(StrokeLog::new());
        self.cursor = 0;
    }
}
