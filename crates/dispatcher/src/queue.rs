//! PriorityQueueBank - one FIFO queue per priority level

use std::collections::VecDeque;

use parking_lot::Mutex;

use contracts::Message;

/// Bank of per-level FIFO queues
///
/// Index 0 is the most urgent level, `levels() - 1` the slowest.
/// Any number of producers may enqueue concurrently with a single consumer.
/// Each lock is held only for a push or a pop.
#[derive(Debug)]
pub struct PriorityQueueBank {
    queues: Vec<Mutex<VecDeque<Message>>>,
}

impl PriorityQueueBank {
    /// Create a bank with `levels` queues (at least one)
    pub fn new(levels: usize) -> Self {
        let queues = (0..levels.max(1))
            .map(|_| Mutex::new(VecDeque::new()))
            .collect();
        Self { queues }
    }

    /// Number of priority levels
    pub fn levels(&self) -> usize {
        self.queues.len()
    }

    /// Queue index for a requested level; out-of-range clamps to the slowest queue
    pub fn queue_index(&self, level: usize) -> usize {
        level.min(self.queues.len() - 1)
    }

    /// Append a message; returns the queue index actually used
    pub fn enqueue(&self, level: usize, msg: Message) -> usize {
        let idx = self.queue_index(level);
        self.queues[idx].lock().push_back(msg);
        idx
    }

    /// Pop the oldest message of a level, if any
    pub fn try_dequeue(&self, level: usize) -> Option<Message> {
        self.queues.get(level)?.lock().pop_front()
    }

    /// Current depth of a level
    pub fn len(&self, level: usize) -> usize {
        self.queues.get(level).map_or(0, |q| q.lock().len())
    }

    /// Total messages across all levels
    pub fn total_len(&self) -> usize {
        self.queues.iter().map(|q| q.lock().len()).sum()
    }

    /// True when every level is empty
    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Discard all messages of one level; returns how many were dropped
    pub fn clear(&self, level: usize) -> usize {
        self.queues.get(level).map_or(0, |q| {
            let mut q = q.lock();
            let dropped = q.len();
            q.clear();
            dropped
        })
    }

    /// Discard every queued message; returns how many were dropped
    pub fn clear_all(&self) -> usize {
        (0..self.levels()).map(|level| self.clear(level)).sum()
    }
}
