use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{core::SecretMasterKey, Error};

/// Hands out user slots. Two calls never return the same slot.
pub trait SlotAllocator {
    /// Reserves the next free slot.
    ///
    /// # Error
    ///
    /// Fails once every slot has been issued.
    fn allocate(&self) -> Result<usize, Error>;

    /// Returns the number of slots issued so far.
    fn issued(&self) -> usize;
}

/// Lock-free allocator over an atomic counter.
#[derive(Debug)]
pub struct AtomicSlotAllocator {
    counter: AtomicUsize,
    last_slot: usize,
}

impl AtomicSlotAllocator {
    /// Creates an allocator resuming from the counter of the given key.
    #[must_use]
    pub fn new(msk: &SecretMasterKey) -> Self {
        Self::starting_at(msk.counter, msk.last_slot())
    }

    /// Creates an allocator issuing `counter..=last_slot`.
    #[must_use]
    pub fn starting_at(counter: usize, last_slot: usize) -> Self {
        Self {
            counter: AtomicUsize::new(counter),
            last_slot,
        }
    }
}

impl SlotAllocator for AtomicSlotAllocator {
    fn allocate(&self) -> Result<usize, Error> {
        self.counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |counter| {
                (counter <= self.last_slot).then_some(counter + 1)
            })
            .map_err(|counter| {
                Error::Key(format!(
                    "no user slot left: {counter} slots issued out of {}",
                    self.last_slot + 1
                ))
            })
    }

    fn issued(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use super::*;

    #[test]
    fn test_allocation_is_sequential() {
        let allocator = AtomicSlotAllocator::starting_at(3, 5);
        assert_eq!(allocator.allocate().unwrap(), 3);
        assert_eq!(allocator.allocate().unwrap(), 4);
        assert_eq!(allocator.allocate().unwrap(), 5);
        assert!(matches!(allocator.allocate(), Err(Error::Key(_))));
        assert_eq!(allocator.issued(), 6);
    }

    #[test]
    fn test_concurrent_allocation() {
        let allocator = Arc::new(AtomicSlotAllocator::starting_at(0, 799));
        let handles = (0..8)
            .map(|_| {
                let allocator = allocator.clone();
                thread::spawn(move || {
                    (0..100)
                        .map(|_| allocator.allocate().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();
        let slots = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect::<HashSet<_>>();
        assert_eq!(slots.len(), 800);
        assert!(allocator.allocate().is_err());
    }
}
