use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

const BUFFER_SIZE: usize = 256;

/// Set 1 make code of the up arrow (keypad 8).
pub const SCANCODE_UP: u8 = 0x48;
/// Set 1 make code of the down arrow (keypad 2).
pub const SCANCODE_DOWN: u8 = 0x50;

/// Directional signal recognized by the interrupt path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Up,
    Down,
}

impl KeyDirection {
    pub const fn from_scancode(scancode: u8) -> Option<Self> {
        match scancode {
            SCANCODE_UP => Some(KeyDirection::Up),
            SCANCODE_DOWN => Some(KeyDirection::Down),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            KeyDirection::Up => "up",
            KeyDirection::Down => "down",
        }
    }
}

/// Bit 7 marks a break (release) code.
pub const fn is_release(scancode: u8) -> bool {
    scancode & 0x80 != 0
}

pub const fn key_code(scancode: u8) -> u8 {
    scancode & 0x7F
}

/// Single-producer, single-consumer ring of raw scan codes. The interrupt
/// handler pushes, kernel code pops. When full, new bytes are dropped.
pub struct ScancodeQueue {
    buf: [AtomicU8; BUFFER_SIZE],
    head: AtomicUsize,
    tail: AtomicUsize,
}

pub static SCANCODES: ScancodeQueue = ScancodeQueue::new();

impl ScancodeQueue {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicU8 = AtomicU8::new(0);
        Self { buf: [ZERO; BUFFER_SIZE], head: AtomicUsize::new(0), tail: AtomicUsize::new(0) }
    }

    /// Returns `false` if the byte was dropped.
    pub fn push(&self, scancode: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % BUFFER_SIZE;
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }
        self.buf[head].store(scancode, Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        true
    }

    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        let scancode = self.buf[tail].load(Ordering::Relaxed);
        self.tail.store((tail + 1) % BUFFER_SIZE, Ordering::Release);
        Some(scancode)
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// One slot is kept free to tell full from empty.
    pub const fn capacity(&self) -> usize {
        BUFFER_SIZE - 1
    }
}

impl Default for ScancodeQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Next scan code queued by the interrupt path.
pub fn dequeue_scancode() -> Option<u8> {
    SCANCODES.pop()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_two_codes_are_directional() {
        assert_eq!(KeyDirection::from_scancode(0x48), Some(KeyDirection::Up));
        assert_eq!(KeyDirection::from_scancode(0x50), Some(KeyDirection::Down));
        assert_eq!(KeyDirection::from_scancode(0x1E), None);
        // The matching release codes are not directional.
        assert_eq!(KeyDirection::from_scancode(0xC8), None);
        assert_eq!(KeyDirection::from_scancode(0xD0), None);
    }

    #[test]
    fn release_bit() {
        assert!(is_release(0xC8));
        assert!(!is_release(0x48));
        assert_eq!(key_code(0xC8), 0x48);
    }

    #[test]
    fn queue_is_fifo() {
        let queue = ScancodeQueue::new();
        assert!(queue.is_empty());
        assert!(queue.push(0x48));
        assert!(queue.push(0x50));
        assert_eq!(queue.pop(), Some(0x48));
        assert_eq!(queue.pop(), Some(0x50));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn full_queue_drops_new_bytes() {
        let queue = ScancodeQueue::new();
        for i in 0..queue.capacity() {
            assert!(queue.push(i as u8));
        }
        assert!(!queue.push(0xFF));
        assert_eq!(queue.pop(), Some(0));

        // Wraps around once space frees up.
        assert!(queue.push(0xAA));
        let drained: Vec<u8> = core::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(drained.len(), queue.capacity());
        assert_eq!(drained.last(), Some(&0xAA));
    }

    #[test]
    fn global_queue_drains_in_arrival_order() {
        assert!(SCANCODES.push(0x48));
        assert!(SCANCODES.push(0xC8));
        assert_eq!(dequeue_scancode(), Some(0x48));
        assert_eq!(dequeue_scancode(), Some(0xC8));
        assert_eq!(dequeue_scancode(), None);
    }
}
