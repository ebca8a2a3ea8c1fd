use rand::seq::index;
use rand::Rng;
use std::collections::VecDeque;

use crate::error::{Result, TheseusError};

/// Bounded FIFO memory of past experiences.
///
/// Once `capacity` entries are stored, each `add` evicts the oldest one.
#[derive(Clone, Debug)]
pub struct ReplayBuffer<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> ReplayBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TheseusError::invalid_parameter(
                "capacity",
                "Capacity must be greater than 0",
            ));
        }
        Ok(ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    pub fn add(&mut self, experience: T) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    /// Up to `batch_size` distinct entries drawn uniformly without replacement.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<&T> {
        let amount = batch_size.min(self.buffer.len());
        index::sample(rng, self.buffer.len(), amount)
            .into_iter()
            .filter_map(|i| self.buffer.get(i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }
}
