/// Write buffer admission: the one piece of FTL state touched from more
/// than one execution context (§5 — host write submission and the
/// background flush/idle path both allocate and release against it), so
/// it is the only thing in this module behind a lock rather than plain
/// `&mut self` state.
use spin::Mutex;

struct BufferState {
    remaining: u64,
    capacity: u64,
}

pub struct WriteBuffer {
    state: Mutex<BufferState>,
}

impl WriteBuffer {
    pub fn new(capacity_bytes: u64) -> Self {
        WriteBuffer { state: Mutex::new(BufferState { remaining: capacity_bytes, capacity: capacity_bytes }) }
    }

    pub fn capacity(&self) -> u64 {
        self.state.lock().capacity
    }

    /// Alias for `capacity` matching the external write-buffer interface's
    /// `size` accessor (§6).
    pub fn size(&self) -> u64 {
        self.capacity()
    }

    pub fn remaining(&self) -> u64 {
        self.state.lock().remaining
    }

    /// Reset `remaining` to the full capacity, discarding whatever was
    /// still outstanding. Mirrors `buffer_refill` in the device model this
    /// is drawn from, which the writeback completer calls once it has
    /// drained its queue rather than releasing piecemeal.
    pub fn refill(&self) {
        let mut s = self.state.lock();
        s.remaining = s.capacity;
    }

    /// Grant up to `requested` bytes, never more than is free. Returns the
    /// granted amount, which may be zero or partial.
    pub fn allocate(&self, requested: u64) -> u64 {
        let mut s = self.state.lock();
        let granted = requested.min(s.remaining);
        s.remaining -= granted;
        granted
    }

    /// Give bytes back, e.g. once a buffered write has been destaged to
    /// NAND. Never exceeds `capacity` even if callers over-release.
    pub fn release(&self, size: u64) {
        let mut s = self.state.lock();
        s.remaining = (s.remaining + size).min(s.capacity);
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_grants_up_to_remaining() {
        let buf = WriteBuffer::new(100);
        assert_eq!(buf.allocate(40), 40);
        assert_eq!(buf.remaining(), 60);
        assert_eq!(buf.allocate(1000), 60);
        assert!(buf.is_full());
    }

    #[test]
    fn release_never_exceeds_capacity() {
        let buf = WriteBuffer::new(100);
        buf.allocate(50);
        buf.release(1000);
        assert_eq!(buf.remaining(), 100);
    }

    #[test]
    fn refill_resets_to_full_capacity() {
        let buf = WriteBuffer::new(100);
        buf.allocate(90);
        assert_eq!(buf.remaining(), 10);
        buf.refill();
        assert_eq!(buf.remaining(), 100);
        assert_eq!(buf.size(), 100);
    }
}
