//! Lock-free sample queue between the capture callback and the analysis loop
//!
//! Overflow policy is drop-newest: a chunk that does not fit in full is
//! discarded and counted, so the capture callback never blocks and the
//! samples that do reach the consumer stay in order. Once the consumer is
//! closed or dropped, pushes are ignored without counting as drops.

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Bounded single-producer, single-consumer sample queue
pub struct SampleQueue {
    producer: HeapProducer<f64>,
    consumer: HeapConsumer<f64>,
    capacity: usize,
}

impl SampleQueue {
    /// Create new queue with given capacity
    ///
    /// # Arguments
    /// * `capacity` - Queue capacity in samples
    pub fn new(capacity: usize) -> Self {
        let rb = HeapRb::<f64>::new(capacity.max(1));
        let (producer, consumer) = rb.split();

        Self {
            producer,
            consumer,
            capacity: capacity.max(1),
        }
    }

    /// Queue holding `blocks` whole blocks of `block_length` samples
    pub fn with_blocks(block_length: usize, blocks: usize) -> Self {
        Self::new(block_length.saturating_mul(blocks))
    }

    /// Split into producer and consumer ends
    pub fn split(self) -> (SampleProducer, SampleConsumer) {
        let dropped = Arc::new(AtomicU64::new(0));
        let open = Arc::new(AtomicBool::new(true));
        (
            SampleProducer {
                producer: self.producer,
                dropped: Arc::clone(&dropped),
                open: Arc::clone(&open),
                capacity: self.capacity,
            },
            SampleConsumer {
                consumer: self.consumer,
                dropped,
                open,
                capacity: self.capacity,
            },
        )
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Producer end, owned by the capture side
pub struct SampleProducer {
    producer: HeapProducer<f64>,
    dropped: Arc<AtomicU64>,
    open: Arc<AtomicBool>,
    capacity: usize,
}

impl SampleProducer {
    /// Enqueue a chunk of samples
    ///
    /// # Returns
    /// Number of samples written: either all of them or none
    pub fn push(&mut self, samples: &[f64]) -> usize {
        if !self.is_open() {
            return 0;
        }
        if self.producer.free_len() < samples.len() {
            self.dropped.fetch_add(samples.len() as u64, Ordering::Relaxed);
            return 0;
        }
        self.producer.push_slice(samples)
    }

    /// Whether the consumer is still taking samples
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Get number of free slots
    pub fn free_len(&self) -> usize {
        self.producer.free_len()
    }

    /// Samples discarded so far because the queue was full
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer end, owned by the analysis loop
pub struct SampleConsumer {
    consumer: HeapConsumer<f64>,
    dropped: Arc<AtomicU64>,
    open: Arc<AtomicBool>,
    capacity: usize,
}

impl SampleConsumer {
    /// Fill `block` with the next `block.len()` samples
    ///
    /// Takes nothing and returns `false` until a whole block is queued.
    pub fn pop_block(&mut self, block: &mut [f64]) -> bool {
        if self.consumer.len() < block.len() {
            return false;
        }
        self.consumer.pop_slice(block) == block.len()
    }

    /// Get number of queued samples
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    /// Samples discarded so far because the queue was full
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tell the producer to stop sending samples
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl Drop for SampleConsumer {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_write_read() {
        let queue = SampleQueue::new(1024);
        let (mut producer, mut consumer) = queue.split();

        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(producer.push(&data), 5);

        let mut block = vec![0.0; 5];
        assert!(consumer.pop_block(&mut block));
        assert_eq!(block, data);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_partial_block_is_not_consumed() {
        let (mut producer, mut consumer) = SampleQueue::new(64).split();
        producer.push(&[1.0; 6]);

        let mut block = vec![0.0; 8];
        assert!(!consumer.pop_block(&mut block));
        assert_eq!(consumer.len(), 6);

        producer.push(&[2.0; 2]);
        assert!(consumer.pop_block(&mut block));
        assert_eq!(block, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_overflow_drops_newest_chunk() {
        let (mut producer, mut consumer) = SampleQueue::new(10).split();

        assert_eq!(producer.push(&[1.0; 8]), 8);
        // Does not fit in full: dropped, not truncated
        assert_eq!(producer.push(&[2.0; 4]), 0);
        assert_eq!(producer.dropped_samples(), 4);
        assert_eq!(consumer.dropped_samples(), 4);

        let mut block = vec![0.0; 8];
        assert!(consumer.pop_block(&mut block));
        assert!(block.iter().all(|&s| s == 1.0));
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_order_preserved_across_blocks() {
        let (mut producer, mut consumer) = SampleQueue::with_blocks(4, 3).split();
        assert_eq!(producer.capacity(), 12);

        let samples: Vec<f64> = (0..12).map(|i| i as f64).collect();
        for chunk in samples.chunks(5) {
            producer.push(chunk);
        }

        let mut block = vec![0.0; 4];
        let mut out = Vec::new();
        while consumer.pop_block(&mut block) {
            out.extend_from_slice(&block);
        }
        assert_eq!(out, samples);
    }

    #[test]
    fn test_closed_queue_ignores_pushes() {
        let (mut producer, consumer) = SampleQueue::new(16).split();
        assert!(producer.is_open());

        consumer.close();
        assert!(!producer.is_open());
        assert_eq!(producer.push(&[1.0; 4]), 0);
        assert_eq!(producer.dropped_samples(), 0);
        assert_eq!(producer.free_len(), 16);
    }

    #[test]
    fn test_dropping_consumer_closes_queue() {
        let (mut producer, consumer) = SampleQueue::new(16).split();
        drop(consumer);

        assert!(!producer.is_open());
        assert_eq!(producer.push(&[1.0; 4]), 0);
        assert_eq!(producer.dropped_samples(), 0);
    }
}
