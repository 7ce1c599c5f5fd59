//! Bounded error sink (C9).
//!
//! Stores up to a configured maximum of `{code, message}` records; on
//! overflow it flushes every stored record, plus the overflowing one, to a
//! configured destination. Grounded on the teacher's `queues::Queue` usage
//! in `hart::memory::Memory` (a FIFO buffer drained by `flush_stdout`) —
//! reused here for the analogous "accumulate then drain" error-sink shape.

use queues::{IsQueue, Queue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub code: &'static str,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Destination for flushed error records, e.g. standard output.
pub trait Flush {
    fn flush(&mut self, records: &[ErrorRecord]);
}

/// Flushes records to standard output, one per line.
pub struct StdoutFlush;

impl Flush for StdoutFlush {
    fn flush(&mut self, records: &[ErrorRecord]) {
        for record in records {
            println!("[{}] {}", record.code, record.message);
        }
    }
}

pub trait ErrorSink {
    fn record(&mut self, record: ErrorRecord);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accumulates up to `capacity` records; on overflow, flushes everything
/// accumulated so far (plus the overflowing record) and starts empty again.
pub struct BoundedErrorSink<F: Flush = StdoutFlush> {
    capacity: usize,
    records: Queue<ErrorRecord>,
    flush: F,
}

impl BoundedErrorSink<StdoutFlush> {
    pub fn new(capacity: usize) -> Self {
        Self::with_flush(capacity, StdoutFlush)
    }
}

impl<F: Flush> BoundedErrorSink<F> {
    pub fn with_flush(capacity: usize, flush: F) -> Self {
        Self {
            capacity,
            records: Queue::new(),
            flush,
        }
    }

    fn drain(&mut self) -> Vec<ErrorRecord> {
        let mut drained = Vec::with_capacity(self.records.size());
        while let Ok(record) = self.records.remove() {
            drained.push(record);
        }
        drained
    }
}

impl<F: Flush> ErrorSink for BoundedErrorSink<F> {
    fn record(&mut self, record: ErrorRecord) {
        if self.records.size() >= self.capacity {
            let mut drained = self.drain();
            drained.push(record);
            self.flush.flush(&drained);
        } else {
            self.records
                .add(record)
                .expect("queue add should not fail below capacity");
        }
    }

    fn len(&self) -> usize {
        self.records.size()
    }
}
