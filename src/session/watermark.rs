//! Commit watermark.
//!
//! Tracks in-flight commit timestamps. `done_until` is the highest
//! timestamp at or below which every begun commit has finished, so a
//! reader that waited for `ts` sees every commit `<= ts`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct MarkState {
    done_until: u64,
    last_index: u64,
    /// Begun-but-unfinished count per timestamp.
    pending: BTreeMap<u64, i64>,
}

impl MarkState {
    fn advance(&mut self) {
        while let Some((&ts, &count)) = self.pending.first_key_value() {
            if count > 0 {
                return;
            }
            self.pending.remove(&ts);
            self.done_until = self.done_until.max(ts);
        }
        self.done_until = self.done_until.max(self.last_index);
    }
}

#[derive(Debug)]
pub struct WaterMark {
    name: &'static str,
    state: Mutex<MarkState>,
    cv: Condvar,
}

impl WaterMark {
    pub fn new(name: &'static str) -> Self {
        Self::with_done_until(name, 0)
    }

    /// Watermark that treats everything up to `ts` as already committed.
    pub fn with_done_until(name: &'static str, ts: u64) -> Self {
        Self {
            name,
            state: Mutex::new(MarkState {
                done_until: ts,
                last_index: ts,
                pending: BTreeMap::new(),
            }),
            cv: Condvar::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn begin(&self, ts: u64) {
        let mut state = self.state.lock();
        *state.pending.entry(ts).or_insert(0) += 1;
        state.last_index = state.last_index.max(ts);
    }

    /// Finish `ts`. A `done` without a matching `begin` counts as both.
    pub fn done(&self, ts: u64) {
        let mut state = self.state.lock();
        let count = state.pending.entry(ts).or_insert(1);
        *count -= 1;
        state.last_index = state.last_index.max(ts);
        state.advance();
        self.cv.notify_all();
    }

    pub fn done_until(&self) -> u64 {
        self.state.lock().done_until
    }

    pub fn last_index(&self) -> u64 {
        self.state.lock().last_index
    }

    /// Block until every commit `<= ts` has finished.
    pub fn wait(&self, ts: u64) {
        let mut state = self.state.lock();
        while state.done_until < ts {
            self.cv.wait(&mut state);
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`. Returns whether
    /// `ts` was reached.
    pub fn wait_timeout(&self, ts: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.done_until < ts {
            if self.cv.wait_until(&mut state, deadline).timed_out() {
                return state.done_until >= ts;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_in_order() {
        let mark = WaterMark::new("txn");
        mark.begin(1);
        mark.begin(2);
        mark.done(1);
        assert_eq!(mark.done_until(), 1);
        mark.done(2);
        assert_eq!(mark.done_until(), 2);
    }

    #[test]
    fn test_out_of_order_holds_back() {
        let mark = WaterMark::new("txn");
        mark.begin(3);
        mark.begin(5);
        mark.done(5);
        assert_eq!(mark.done_until(), 0);
        mark.done(3);
        assert_eq!(mark.done_until(), 5);
        assert_eq!(mark.last_index(), 5);
    }

    #[test]
    fn test_done_without_begin() {
        let mark = WaterMark::with_done_until("txn", 1);
        mark.done(4);
        assert_eq!(mark.done_until(), 4);
    }

    #[test]
    fn test_wait_timeout() {
        let mark = WaterMark::new("txn");
        mark.begin(2);
        assert!(!mark.wait_timeout(2, Duration::from_millis(10)));
        assert!(mark.wait_timeout(0, Duration::from_millis(10)));
    }

    #[test]
    fn test_wait_wakes_on_done() {
        let mark = Arc::new(WaterMark::new("txn"));
        mark.begin(7);

        let waiter = {
            let mark = Arc::clone(&mark);
            thread::spawn(move || mark.wait(7))
        };
        thread::sleep(Duration::from_millis(20));
        mark.done(7);
        waiter.join().unwrap();
        assert_eq!(mark.done_until(), 7);
    }
}
