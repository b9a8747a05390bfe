// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The batch queue (C11, spec.md §5 "External batch driver"): a fixed array of paths, drained by
//! workers through a single atomic length counter.
//!
//! Grounded on `examples/original_source/src/queue.c`'s `lf_ow_queue_t`: populated once by the
//! producer (this binary's `main`, before any worker starts), then never pushed to again, so a
//! single `fetch_sub` with [`Ordering::Relaxed`] is the only synchronization a pop needs — there
//! is no ABA hazard and no concurrent-push race to guard against. Spec.md §9 calls this out
//! explicitly: "not a general MPMC queue and should not be described as one." Unlike the C
//! version, this queue's backing `Vec<PathBuf>` is sized exactly once up front rather than grown
//! with `realloc` on push, since the full path list is known before any worker is spawned.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicIsize, Ordering};

pub struct WorkQueue {
    paths: Vec<PathBuf>,
    remaining: AtomicIsize,
}

impl WorkQueue {
    /// Builds a queue already populated with `paths`; the counter starts at `paths.len()`.
    pub fn new(paths: Vec<PathBuf>) -> Self {
        let remaining = AtomicIsize::new(paths.len() as isize);
        WorkQueue { paths, remaining }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Atomically claims the next path, or `None` once every slot has been claimed.
    ///
    /// Each call decrements the shared counter and reads the slot the *previous* value pointed
    /// to, exactly as `lf_ow_queue_pop`'s `initial_length - current_length` indexing does: the
    /// value returned by `fetch_sub` is the length *before* the decrement, so slot index
    /// `initial_len - current_length` is the one this call claimed.
    pub fn pop(&self) -> Option<&Path> {
        let current_length = self.remaining.fetch_sub(1, Ordering::Relaxed);
        if current_length <= 0 {
            return None;
        }
        let index = self.paths.len() as isize - current_length;
        Some(&self.paths[index as usize])
    }

    /// Fraction of the queue claimed so far, in `[0.0, 100.0]` (spec.md's informative
    /// `lf_ow_queue_percentage`, used only for `--verbose` progress reporting).
    pub fn percentage_claimed(&self) -> f32 {
        let current_length = self.remaining.load(Ordering::Relaxed);
        if current_length <= 0 {
            return 100.0;
        }
        let claimed = self.paths.len() as isize - current_length;
        (claimed as f32 / self.paths.len() as f32) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_drains_every_path_exactly_once() {
        let paths: Vec<PathBuf> = (0..10).map(|i| PathBuf::from(format!("f{i}"))).collect();
        let q = WorkQueue::new(paths.clone());

        let mut seen = Vec::new();
        while let Some(p) = q.pop() {
            seen.push(p.to_path_buf());
        }
        seen.sort();
        let mut want = paths;
        want.sort();
        assert_eq!(seen, want);
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn empty_queue_is_immediately_drained() {
        let q = WorkQueue::new(Vec::new());
        assert_eq!(q.pop(), None);
        assert_eq!(q.percentage_claimed(), 100.0);
    }

    #[test]
    fn concurrent_pop_never_hands_out_a_path_twice() {
        use std::sync::Arc;
        use std::thread;

        let paths: Vec<PathBuf> = (0..512).map(|i| PathBuf::from(format!("f{i}"))).collect();
        let q = Arc::new(WorkQueue::new(paths.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let mut claimed = Vec::new();
                    while let Some(p) = q.pop() {
                        claimed.push(p.to_path_buf());
                    }
                    claimed
                })
            })
            .collect();

        let mut all: Vec<PathBuf> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort();
        let mut want = paths;
        want.sort();
        assert_eq!(all, want);
    }
}
