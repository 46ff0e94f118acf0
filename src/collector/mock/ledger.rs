//! Bookkeeping of mock handles, used to prove that every session and cursor
//! opened during a cycle is released again.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts live mock handles and records the calls made against the backend.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    open_sessions: AtomicUsize,
    sessions_opened: AtomicUsize,
    open_cursors: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ResourceLedger {
    /// Number of sessions currently alive.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Total number of sessions opened since the backend was created.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    /// Number of instance and property cursors currently alive.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Calls made so far, e.g. `connect root\cimv2` or `query SELECT * FROM X`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub(crate) fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    pub(crate) fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn session_closed(&self) {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn cursor_opened(&self) {
        self.open_cursors.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn cursor_closed(&self) {
        self.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}
