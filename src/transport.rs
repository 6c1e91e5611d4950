use std::io;
use std::time::{Duration, Instant};

/// Byte oriented duplex link to the battery console.
///
/// Reads never block: `read_byte` returns `None` if nothing is buffered.
pub trait Transport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Discards everything currently buffered on the receive side.
    fn flush_input(&mut self) -> io::Result<usize> {
        let mut discarded = 0;
        while self.bytes_available()? > 0 {
            match self.read_byte()? {
                Some(_) => discarded += 1,
                None => break,
            }
        }
        if discarded > 0 {
            log::trace!("Discarded {discarded} stale bytes");
        }
        Ok(discarded)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }
}

/// Monotonic time source used by the reader and the poll session.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
