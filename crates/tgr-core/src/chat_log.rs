use std::collections::VecDeque;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::domain::MessageId;

pub const SENDER_SELF: &str = "You";
pub const SENDER_PEER: &str = "Bot";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One mirrored message as served to HTTP clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Process-wide monotonic sequence number (polling cursor).
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub sender: &'static str,
    pub text: String,
    pub time: String,
    pub file_path: Option<String>,
}

/// Fields of an entry before it is sequenced.
#[derive(Clone, Debug)]
pub struct NewEntry {
    pub id: Option<MessageId>,
    pub outgoing: bool,
    pub text: String,
    pub date: DateTime<Utc>,
    pub file_path: Option<String>,
}

/// Bounded in-memory conversation log. Oldest entries fall off the front.
#[derive(Debug)]
pub struct ChatLog {
    capacity: usize,
    next_seq: u64,
    entries: VecDeque<LogEntry>,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            next_seq: 1,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Append an entry; returns `None` if a message with the same id is already logged.
    pub fn push(&mut self, entry: NewEntry) -> Option<&LogEntry> {
        if let Some(id) = entry.id {
            if self.entries.iter().any(|e| e.id == Some(id.0)) {
                return None;
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            seq,
            id: entry.id.map(|m| m.0),
            sender: if entry.outgoing {
                SENDER_SELF
            } else {
                SENDER_PEER
            },
            text: entry.text,
            time: format_time(entry.date),
            file_path: entry.file_path,
        });
        self.entries.back()
    }

    /// Entries with `seq > since`, oldest first.
    pub fn since(&self, since: u64) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.seq > since)
            .cloned()
            .collect()
    }
}

fn format_time(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local).format(TIME_FORMAT).to_string()
}
