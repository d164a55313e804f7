use super::EffectRequest;
use crate::config::EngineConfig;

/// Fixed-capacity FIFO ring.
#[derive(Clone, Debug)]
pub struct RingBuffer<T: Copy, const N: usize> {
    slots: [Option<T>; N],
    head: usize,
    len: usize,
}

impl<T: Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    pub const CAPACITY: usize = N;

    pub fn new() -> Self {
        Self {
            slots: [None; N],
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Appends at the tail; gives the item back when full.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        let tail = (self.head + self.len) % N;
        self.slots[tail] = Some(item);
        self.len += 1;
        Ok(())
    }

    /// Appends at the tail, evicting the oldest item when full.
    pub fn push_overwrite(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() { self.pop() } else { None };
        // Cannot fail: a slot was just freed or was already free.
        let _ = self.push(item);
        evicted
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % N;
        self.len -= 1;
        item
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Items from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |offset| self.slots[(self.head + offset) % N].as_ref())
    }
}

/// Where [`RequestQueue::push`] put a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Primary ring was full; the request waits in the overflow ring.
    Overflowed,
    /// Both rings were full.
    Dropped,
}

/// Pending effect requests: a primary ring backed by a bounded overflow ring.
///
/// Push never blocks. FIFO order holds across both rings: once anything is in
/// overflow, new requests go there too until it drains.
#[derive(Clone, Debug, Default)]
pub struct RequestQueue {
    primary: RingBuffer<EffectRequest, { EngineConfig::REQUEST_QUEUE_CAPACITY }>,
    overflow: RingBuffer<EffectRequest, { EngineConfig::REQUEST_OVERFLOW_CAPACITY }>,
    dropped: u32,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: EffectRequest) -> PushOutcome {
        if self.overflow.is_empty() && self.primary.push(request).is_ok() {
            return PushOutcome::Queued;
        }
        match self.overflow.push(request) {
            Ok(()) => PushOutcome::Overflowed,
            Err(_) => {
                self.dropped += 1;
                PushOutcome::Dropped
            }
        }
    }

    pub fn pop(&mut self) -> Option<EffectRequest> {
        let request = self.primary.pop().or_else(|| self.overflow.pop());
        while !self.primary.is_full() {
            let Some(moved) = self.overflow.pop() else {
                break;
            };
            let _ = self.primary.push(moved);
        }
        request
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.overflow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Requests dropped since the last [`RequestQueue::take_dropped`].
    pub fn take_dropped(&mut self) -> u32 {
        std::mem::take(&mut self.dropped)
    }

    pub fn clear(&mut self) {
        self.primary.clear();
        self.overflow.clear();
        self.dropped = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectRequest> + '_ {
        self.primary.iter().chain(self.overflow.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::TemplateId;
    use crate::env::EntityHandle;

    fn request(n: u32) -> EffectRequest {
        let e = EntityHandle::from_parts(0, 0);
        EffectRequest::new(e, e, TemplateId(n))
    }

    #[test]
    fn ring_wraps_and_overwrites() {
        let mut ring: RingBuffer<u8, 3> = RingBuffer::new();
        for n in 0..3 {
            ring.push(n).unwrap();
        }
        assert_eq!(ring.push(9), Err(9));
        assert_eq!(ring.pop(), Some(0));
        ring.push(3).unwrap();
        assert_eq!(ring.push_overwrite(4), Some(1));
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn overflow_preserves_fifo_and_drops_when_full() {
        let mut queue = RequestQueue::new();
        let total = EngineConfig::REQUEST_QUEUE_CAPACITY + EngineConfig::REQUEST_OVERFLOW_CAPACITY;
        for n in 0..total as u32 {
            assert_ne!(queue.push(request(n)), PushOutcome::Dropped);
        }
        assert_eq!(queue.push(request(9_999)), PushOutcome::Dropped);
        assert_eq!(queue.take_dropped(), 1);
        assert_eq!(queue.take_dropped(), 0);

        // Draining one primary slot must not let a new request jump the overflow.
        assert_eq!(queue.pop().map(|r| r.template), Some(TemplateId(0)));
        assert_eq!(queue.push(request(10_000)), PushOutcome::Overflowed);

        let order: Vec<u32> = std::iter::from_fn(|| queue.pop()).map(|r| r.template.0).collect();
        let mut expected: Vec<u32> = (1..total as u32).collect();
        expected.push(10_000);
        assert_eq!(order, expected);
    }
}
