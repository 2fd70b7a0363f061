use boardsync_core::{LogEntry, Loggable};

/// Bounded diagnostics log of move outcomes. Oldest entries drop first.
#[derive(Debug, Clone)]
pub struct MoveJournal {
    entries: Vec<LogEntry>,
    capacity: usize,
}

impl MoveJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Loggable for MoveJournal {
    fn push_entry(&mut self, entry: LogEntry) {
        self.entries.push(entry);
        if self.entries.len() > self.capacity {
            let overflow = self.entries.len() - self.capacity;
            self.entries.drain(..overflow);
        }
    }

    fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}
