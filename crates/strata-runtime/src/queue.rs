use std::collections::VecDeque;
use std::mem;
use std::sync::Mutex;

/// A finished payload tagged with the key of the request that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingResult<K, T> {
    pub key: K,
    pub payload: T,
}

/// FIFO of completed work, filled by workers and drained by the owning thread.
pub struct ResultQueue<K, T> {
    inner: Mutex<VecDeque<PendingResult<K, T>>>,
}

impl<K, T> Default for ResultQueue<K, T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }
}

impl<K, T> ResultQueue<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, key: K, payload: T) {
        let mut q = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        q.push_back(PendingResult { key, payload });
    }

    /// Takes everything queued so far. The lock is held only for the swap, so
    /// results pushed while the caller processes the batch wait for the next drain.
    pub fn drain(&self) -> Vec<PendingResult<K, T>> {
        let taken = {
            let mut q = match self.inner.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            mem::take(&mut *q)
        };
        taken.into()
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn drain_is_fifo_and_empties() {
        let q = ResultQueue::new();
        q.push(1, "a");
        q.push(2, "b");
        let out = q.drain();
        assert_eq!(out.iter().map(|r| r.key).collect::<Vec<_>>(), vec![1, 2]);
        assert!(q.is_empty());
        assert!(q.drain().is_empty());
    }

    #[test]
    fn concurrent_pushes_are_all_delivered_once() {
        let q = Arc::new(ResultQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..250 {
                        q.push(t * 1000 + i, ());
                    }
                })
            })
            .collect();
        let mut seen = Vec::new();
        for h in handles {
            h.join().unwrap();
        }
        seen.extend(q.drain().into_iter().map(|r| r.key));
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 1000);
    }
}
