use crate::{common::unlikely, PcpBufError};

/// Outcome of [`RingBuf::insert_single`].
///
/// A rejected element is handed back to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Insert<T> {
    Inserted,
    Full(T),
}

impl<T> Insert<T> {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Insert::Inserted)
    }

    pub fn into_rejected(self) -> Option<T> {
        match self {
            Insert::Inserted => None,
            Insert::Full(element) => Some(element),
        }
    }
}

/// Fixed-capacity FIFO circular buffer.
///
/// The buffer has no internal locking; blocking handoff between threads is
/// layered on top by [`crate::Edge`].
#[derive(Debug)]
pub struct RingBuf<T> {
    slots: Box<[Option<T>]>,
    read: usize,
    write: usize,
    len: usize,
}

impl<T> RingBuf<T> {
    /// Allocate a buffer holding up to `capacity` elements.
    ///
    /// Fails when `capacity` is zero, when `T` is zero-sized, or when the
    /// storage cannot be allocated.
    pub fn new(capacity: usize) -> Result<Self, PcpBufError> {
        if capacity == 0 {
            return Err(PcpBufError::ZeroCapacity);
        }
        if std::mem::size_of::<T>() == 0 {
            return Err(PcpBufError::ZeroElementSize);
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|e| PcpBufError::Allocation(capacity, e))?;
        slots.resize_with(capacity, || None);

        Ok(RingBuf {
            slots: slots.into_boxed_slice(),
            read: 0,
            write: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn element_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// Number of elements waiting to be removed.
    pub fn read_available(&self) -> usize {
        self.len
    }

    /// Number of free slots.
    pub fn write_available(&self) -> usize {
        self.slots.len() - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn insert_single(&mut self, element: T) -> Insert<T> {
        if unlikely(self.is_full()) {
            return Insert::Full(element);
        }

        self.slots[self.write] = Some(element);
        self.write = (self.write + 1) % self.slots.len();
        self.len += 1;
        Insert::Inserted
    }

    /// Remove the oldest element, or `None` when the buffer is empty.
    pub fn remove_single(&mut self) -> Option<T> {
        if unlikely(self.is_empty()) {
            return None;
        }

        let element = self.slots[self.read].take();
        self.read = (self.read + 1) % self.slots.len();
        self.len -= 1;
        element
    }

    /// Insert elements pulled from `elements` until the buffer is full.
    ///
    /// Elements that do not fit stay in the iterator. Returns how many were
    /// inserted.
    pub fn insert_multi<I>(&mut self, elements: &mut I) -> usize
    where
        I: Iterator<Item = T>,
    {
        let mut inserted = 0;
        while !self.is_full() {
            let Some(element) = elements.next() else {
                break;
            };
            // cannot be full, checked above
            let _ = self.insert_single(element);
            inserted += 1;
        }
        inserted
    }

    /// Remove up to `count` elements in FIFO order.
    pub fn remove_multi(&mut self, count: usize) -> Vec<T> {
        let count = count.min(self.len);
        let mut removed = Vec::with_capacity(count);
        removed.extend(std::iter::from_fn(|| self.remove_single()).take(count));
        removed
    }

    /// Remove every element in FIFO order.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.remove_single())
    }
}
