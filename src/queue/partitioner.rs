//! Dynamic partitioning of one file queue into N pull iterators
//!
//! Each [`Partition`] pulls from the shared queue on demand, so a worker that
//! finishes a small file early simply takes the next one. Every file is
//! delivered to exactly one partition; no ordering holds across partitions.

use super::file_queue::{ValidatedFile, ValidatedFileQueue};

/// Adapts a [`ValidatedFileQueue`] into independent pull iterators
#[derive(Debug, Clone)]
pub struct DynamicPartitioner {
    queue: ValidatedFileQueue,
}

impl DynamicPartitioner {
    pub fn new(queue: ValidatedFileQueue) -> Self {
        Self { queue }
    }

    /// Create `count` partitions over the same queue
    pub fn partitions(&self, count: usize) -> Vec<Partition> {
        (0..count)
            .map(|id| Partition {
                id,
                queue: self.queue.clone(),
                taken: 0,
            })
            .collect()
    }

    /// Create one more partition
    pub fn partition(&self, id: usize) -> Partition {
        Partition {
            id,
            queue: self.queue.clone(),
            taken: 0,
        }
    }

    pub fn queue(&self) -> &ValidatedFileQueue {
        &self.queue
    }
}

/// A blocking pull iterator over the shared queue
#[derive(Debug)]
pub struct Partition {
    id: usize,
    queue: ValidatedFileQueue,
    taken: u64,
}

impl Partition {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Files pulled by this partition so far
    pub fn taken(&self) -> u64 {
        self.taken
    }
}

impl Iterator for Partition {
    type Item = ValidatedFile;

    fn next(&mut self) -> Option<ValidatedFile> {
        let file = self.queue.take()?;
        self.taken += 1;
        Some(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::file_queue::FileKind;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn test_each_item_delivered_once() {
        let (queue, producer) = ValidatedFileQueue::new();
        let partitioner = DynamicPartitioner::new(queue);
        let partitions = partitioner.partitions(4);

        let handles: Vec<_> = partitions
            .into_iter()
            .map(|p| thread::spawn(move || p.map(|f| f.path).collect::<Vec<_>>()))
            .collect();

        for i in 0..100 {
            producer.push(ValidatedFile::new(
                PathBuf::from(format!("file{}", i)),
                FileKind::Data,
                1,
            ));
        }
        drop(producer);

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for path in handle.join().unwrap() {
                total += 1;
                seen.insert(path);
            }
        }

        assert_eq!(total, 100);
        assert_eq!(seen.len(), 100);
        assert_eq!(partitioner.queue().stats().dequeued(), 100);
    }

    #[test]
    fn test_partition_counts() {
        let (queue, producer) = ValidatedFileQueue::new();
        for i in 0..3 {
            producer.push(ValidatedFile::new(
                PathBuf::from(format!("f{}", i)),
                FileKind::Data,
                1,
            ));
        }
        drop(producer);

        let mut partition = DynamicPartitioner::new(queue).partition(7);
        assert_eq!(partition.id(), 7);
        assert_eq!(partition.by_ref().count(), 3);
        assert_eq!(partition.taken(), 3);
    }
}
