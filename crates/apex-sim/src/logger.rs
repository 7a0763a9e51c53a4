//! Hot-path logger.
//!
//! The trading threads never format or block for logging: they copy a
//! fixed-size record into an SPSC ring and move on. A background drain
//! thread forwards records to `tracing`, sleeping briefly when idle since
//! the sink is not latency-critical. Full-ring pushes are dropped and
//! counted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use apex_metrics::NanoClock;
use apex_ring::{channel, Consumer, Producer};

/// Ring capacity for log records.
pub const LOG_QUEUE_SIZE: usize = 8192;

/// Fixed message payload size.
pub const MAX_MSG_LEN: usize = 240;

/// Idle sleep for the drain thread.
const IDLE_SLEEP: Duration = Duration::from_micros(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

/// One log record; trivially copyable for ring transport.
#[derive(Clone, Copy)]
pub struct LogRecord {
    level: LogLevel,
    timestamp_ns: u64,
    len: u16,
    msg: [u8; MAX_MSG_LEN],
}

/// Producer half held by a hot thread.
pub struct HotLogger {
    tx: Producer<LogRecord>,
    clock: NanoClock,
    dropped: u64,
}

impl HotLogger {
    /// Enqueue one record, truncating to [`MAX_MSG_LEN`]. Never blocks.
    pub fn log(&mut self, level: LogLevel, message: &str) {
        let bytes = message.as_bytes();
        let len = bytes.len().min(MAX_MSG_LEN);

        let mut record = LogRecord {
            level,
            timestamp_ns: self.clock.now_ns(),
            len: len as u16,
            msg: [0; MAX_MSG_LEN],
        };
        record.msg[..len].copy_from_slice(&bytes[..len]);

        if !self.tx.try_push(record) {
            self.dropped += 1;
        }
    }

    pub fn info(&mut self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Records lost to a full ring.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Consumer half run by the logger thread.
pub struct LogDrain {
    rx: Consumer<LogRecord>,
}

impl LogDrain {
    /// Forward records to `tracing` until shutdown, then drain what is
    /// left.
    pub fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            match self.rx.try_pop() {
                Some(record) => emit(&record),
                None => thread::sleep(IDLE_SLEEP),
            }
        }

        while let Some(record) = self.rx.try_pop() {
            emit(&record);
        }
    }
}

fn emit(record: &LogRecord) {
    let text = core::str::from_utf8(&record.msg[..record.len as usize]).unwrap_or("<invalid utf8>");
    match record.level {
        LogLevel::Debug => tracing::debug!(ts_ns = record.timestamp_ns, "{}", text),
        LogLevel::Info => tracing::info!(ts_ns = record.timestamp_ns, "{}", text),
        LogLevel::Warn => tracing::warn!(ts_ns = record.timestamp_ns, "{}", text),
        LogLevel::Error => tracing::error!(ts_ns = record.timestamp_ns, "{}", text),
    }
}

/// Build a connected hot-logger / drain pair.
pub fn hot_logger(clock: NanoClock) -> (HotLogger, LogDrain) {
    let (tx, rx) = channel::<LogRecord>(LOG_QUEUE_SIZE);
    (
        HotLogger {
            tx,
            clock,
            dropped: 0,
        },
        LogDrain { rx },
    )
}
