use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Transaction log shared between a controller and its readers.
pub type SharedLog = Arc<Mutex<TransactionLog>>;

#[derive(Debug, Clone)]
pub struct TxEntry {
    pub timestamp: u64,
    pub direction: Direction,
    pub device: u8,
    pub data: Vec<u8>,
    pub acked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// Bounded record of bus transactions, oldest entries dropped first.
pub struct TransactionLog {
    entries: VecDeque<TxEntry>,
    max_entries: usize,
}

impl TransactionLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries,
        }
    }

    pub fn shared(max_entries: usize) -> SharedLog {
        Arc::new(Mutex::new(Self::new(max_entries)))
    }

    pub fn push(&mut self, direction: Direction, device: u8, data: &[u8], acked: bool) {
        if self.max_entries == 0 {
            return;
        }
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        self.entries.push_back(TxEntry {
            timestamp,
            direction,
            device,
            data: data.to_vec(),
            acked,
        });

        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &TxEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// One line per transaction, bytes in hex, e.g. `0x08 TX: 05`.
    pub fn to_text(&self, show_timestamp: bool) -> String {
        let mut result = String::new();
        for entry in &self.entries {
            if show_timestamp {
                let millis = entry.timestamp % 1000;
                let secs = entry.timestamp / 1000;
                let hours = (secs / 3600) % 24;
                let minutes = (secs / 60) % 60;
                let seconds = secs % 60;
                let _ = write!(result, "[{hours:02}:{minutes:02}:{seconds:02}.{millis:03}] ");
            }

            let prefix = match entry.direction {
                Direction::Rx => "RX:",
                Direction::Tx => "TX:",
            };
            let _ = write!(result, "0x{:02X} {prefix}", entry.device);
            for byte in &entry.data {
                let _ = write!(result, " {byte:02X}");
            }
            if !entry.acked {
                result.push_str(" NACK");
            }
            result.push('\n');
        }
        result
    }
}
