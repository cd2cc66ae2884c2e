// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-wide request counters.
//!
//! Counters start at zero on every process start and are never persisted.
//! Their snapshot is what attestation reports sign.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Counted operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    FetchRequests,
    StoreWrites,
    StoreReads,
    RecordWrites,
    RecordReads,
}

/// Live counters shared by all handlers.
#[derive(Debug)]
pub struct Stats {
    fetch_requests: AtomicU64,
    store_writes: AtomicU64,
    store_reads: AtomicU64,
    record_writes: AtomicU64,
    record_reads: AtomicU64,
    start_time: DateTime<Utc>,
    last_request: Mutex<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub fetch_requests: u64,
    pub store_writes: u64,
    pub store_reads: u64,
    pub record_writes: u64,
    pub record_reads: u64,
    /// RFC 3339, millisecond precision.
    pub start_time: String,
    /// RFC 3339 time of the last counted request, `null` before the first.
    pub last_request: Option<String>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(start_time: DateTime<Utc>) -> Self {
        Self {
            fetch_requests: AtomicU64::new(0),
            store_writes: AtomicU64::new(0),
            store_reads: AtomicU64::new(0),
            record_writes: AtomicU64::new(0),
            record_reads: AtomicU64::new(0),
            start_time,
            last_request: Mutex::new(None),
        }
    }

    /// Count one operation and stamp `lastRequest`.
    pub fn record(&self, counter: Counter) {
        let cell = match counter {
            Counter::FetchRequests => &self.fetch_requests,
            Counter::StoreWrites => &self.store_writes,
            Counter::StoreReads => &self.store_reads,
            Counter::RecordWrites => &self.record_writes,
            Counter::RecordReads => &self.record_reads,
        };
        cell.fetch_add(1, Ordering::Relaxed);

        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(Utc::now());
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Whole seconds since start, rendered as `"<n>s"`.
    pub fn uptime(&self) -> String {
        let secs = (Utc::now() - self.start_time).num_seconds().max(0);
        format!("{secs}s")
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let last_request = *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        StatsSnapshot {
            fetch_requests: self.fetch_requests.load(Ordering::Relaxed),
            store_writes: self.store_writes.load(Ordering::Relaxed),
            store_reads: self.store_reads.load(Ordering::Relaxed),
            record_writes: self.record_writes.load(Ordering::Relaxed),
            record_reads: self.record_reads.load(Ordering::Relaxed),
            start_time: format_time(self.start_time),
            last_request: last_request.map(format_time),
        }
    }
}

pub(crate) fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
