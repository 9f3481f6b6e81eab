//! In-memory store that retains at most `capacity` samples.
//!
//! Once capacity is reached, excess samples are evicted in the order they were
//! appended. Removal after delivery is by value equality, so a value present
//! several times is removed entirely by a single matching entry.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::SampleStore;

#[derive(Debug)]
struct BufferState<S> {
    samples: VecDeque<S>,
    capacity: usize,
}

impl<S> BufferState<S> {
    fn trim(&mut self) -> usize {
        let mut evicted = 0;
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }
}

/// Capacity-limited FIFO buffer.
#[derive(Debug)]
pub struct BoundedBuffer<S> {
    state: Mutex<BufferState<S>>,
}

impl<S> BoundedBuffer<S> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BufferState {
                samples: VecDeque::with_capacity(capacity.min(1024)),
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Change the capacity, evicting oldest samples if the buffer is now over it.
    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.state.lock();
        state.capacity = capacity;
        let evicted = state.trim();
        if evicted > 0 {
            log::debug!(
                "[BUFFER] Capacity reduced to {}, evicted {} samples",
                capacity,
                evicted
            );
        }
    }
}

impl<S> SampleStore<S> for BoundedBuffer<S>
where
    S: Clone + PartialEq + Send,
{
    fn append(&self, sample: S) {
        let mut state = self.state.lock();
        state.samples.push_back(sample);
        let evicted = state.trim();
        if evicted > 0 {
            log::debug!("[BUFFER] Full ({}), evicted {} oldest", state.capacity, evicted);
        }
    }

    fn size(&self) -> usize {
        self.state.lock().samples.len()
    }

    fn snapshot(&self) -> Vec<S> {
        self.state.lock().samples.iter().cloned().collect()
    }

    fn remove_all(&self, samples: &[S]) {
        if samples.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        state.samples.retain(|held| !samples.contains(held));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_most_recent_capacity_values() {
        let buffer = BoundedBuffer::new(3);
        let mut appended = Vec::new();

        for value in 0..10 {
            buffer.append(value);
            appended.push(value);

            assert!(buffer.size() <= 3);
            let start = appended.len().saturating_sub(3);
            assert_eq!(buffer.snapshot(), appended[start..].to_vec());
        }
    }

    #[test]
    fn test_zero_capacity_discards_everything() {
        let buffer = BoundedBuffer::new(0);
        buffer.append("a");
        buffer.append("b");
        assert_eq!(buffer.size(), 0);
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_independent_of_later_mutation() {
        let buffer = BoundedBuffer::new(4);
        buffer.append(1);
        buffer.append(2);

        let snapshot = buffer.snapshot();
        buffer.append(3);
        buffer.remove_all(&[1]);

        assert_eq!(snapshot, vec![1, 2]);
        assert_eq!(buffer.snapshot(), vec![2, 3]);
    }

    #[test]
    fn test_remove_all_removes_every_equal_occurrence() {
        let buffer = BoundedBuffer::new(5);
        for value in ["x", "y", "x", "z"] {
            buffer.append(value);
        }

        buffer.remove_all(&["x"]);

        assert_eq!(buffer.snapshot(), vec!["y", "z"]);
    }

    #[test]
    fn test_remove_all_ignores_values_not_held() {
        let buffer = BoundedBuffer::new(3);
        buffer.append(1);
        buffer.append(2);

        buffer.remove_all(&[7, 8]);
        buffer.remove_all(&[]);

        assert_eq!(buffer.snapshot(), vec![1, 2]);
    }

    #[test]
    fn test_set_capacity_shrinks_oldest_first() {
        let buffer = BoundedBuffer::new(5);
        for value in 1..=5 {
            buffer.append(value);
        }

        buffer.set_capacity(2);

        assert_eq!(buffer.capacity(), 2);
        assert_eq!(buffer.snapshot(), vec![4, 5]);

        buffer.append(6);
        assert_eq!(buffer.snapshot(), vec![5, 6]);
    }

    #[test]
    fn test_concurrent_append_and_removal_stay_bounded_and_ordered() {
        const CAPACITY: usize = 16;
        const COUNT: u32 = 5_000;
        let buffer = BoundedBuffer::new(CAPACITY);

        let removed: Vec<u32> = std::thread::scope(|scope| {
            let appender = scope.spawn(|| {
                for value in 0..COUNT {
                    buffer.append(value);
                    assert!(buffer.size() <= CAPACITY);
                }
            });

            let mut removed = Vec::new();
            while !appender.is_finished() {
                let snapshot = buffer.snapshot();
                assert!(snapshot.len() <= CAPACITY);
                assert!(snapshot.windows(2).all(|w| w[0] < w[1]));

                let even: Vec<u32> = snapshot.into_iter().filter(|v| v % 2 == 0).collect();
                buffer.remove_all(&even);
                removed.extend(even);
            }
            appender.join().unwrap();
            removed
        });

        let remaining = buffer.snapshot();
        assert!(remaining.len() <= CAPACITY);
        assert!(remaining.windows(2).all(|w| w[0] < w[1]));
        // the newest value is odd, so it is neither evicted nor removed
        assert!(remaining.contains(&(COUNT - 1)));
        assert!(removed.iter().all(|v| !remaining.contains(v)));
        assert!(removed.windows(2).all(|w| w[0] < w[1]));
    }
}
