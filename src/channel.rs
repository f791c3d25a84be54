//! Raw byte access to the modem UART.

use heapless::Deque;

/// Non-blocking duplex byte stream to the modem.
///
/// None of the methods may block waiting for the remote side: the receive
/// state machine polls [`available`](ByteChannel::available) and only reads
/// bytes that are already there.
pub trait ByteChannel {
    type Error;

    /// Number of bytes that can be read right now without blocking.
    fn available(&mut self) -> usize;

    /// Read one already available byte.
    fn read_byte(&mut self) -> Option<u8>;

    /// Write all of `bytes` to the modem.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Drop everything currently pending on the receive side.
    fn flush_input(&mut self);
}

impl<T: ByteChannel + ?Sized> ByteChannel for &mut T {
    type Error = T::Error;

    fn available(&mut self) -> usize {
        T::available(self)
    }

    fn read_byte(&mut self) -> Option<u8> {
        T::read_byte(self)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        T::write_bytes(self, bytes)
    }

    fn flush_input(&mut self) {
        T::flush_input(self)
    }
}

const STAGING_LEN: usize = 64;

/// [`ByteChannel`] over any blocking `embedded-io` UART that can report
/// read readiness.
///
/// Bytes are moved into a small staging queue only when the UART reports
/// them ready, so [`ByteChannel::available`] never blocks.
pub struct Serial<T> {
    uart: T,
    staging: Deque<u8, STAGING_LEN>,
}

impl<T> Serial<T> {
    pub fn new(uart: T) -> Self {
        Self {
            uart,
            staging: Deque::new(),
        }
    }

    pub fn release(self) -> T {
        self.uart
    }
}

impl<T> Serial<T>
where
    T: embedded_io::Read + embedded_io::ReadReady,
{
    fn fill(&mut self) {
        if !self.staging.is_empty() {
            return;
        }
        if !matches!(self.uart.read_ready(), Ok(true)) {
            return;
        }

        let mut chunk = [0u8; STAGING_LEN];
        match self.uart.read(&mut chunk) {
            Ok(n) => {
                for b in &chunk[..n] {
                    // Cannot fail, staging was empty and `chunk` has its capacity
                    let _ = self.staging.push_back(*b);
                }
            }
            Err(_) => warn!("UART read error, dropping"),
        }
    }
}

impl<T> ByteChannel for Serial<T>
where
    T: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write,
{
    type Error = T::Error;

    fn available(&mut self) -> usize {
        self.fill();
        self.staging.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.fill();
        self.staging.pop_front()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.uart.write_all(bytes)?;
        self.uart.flush()
    }

    fn flush_input(&mut self) {
        self.staging.clear();
        let mut scratch = [0u8; STAGING_LEN];
        while matches!(self.uart.read_ready(), Ok(true)) {
            match self.uart.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    #[derive(Default)]
    struct Uart {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
    }

    impl embedded_io::ErrorType for Uart {
        type Error = core::convert::Infallible;
    }

    impl embedded_io::Read for Uart {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let mut n = 0;
            while n < buf.len() {
                match self.rx.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl embedded_io::ReadReady for Uart {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.rx.is_empty())
        }
    }

    impl embedded_io::Write for Uart {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn stages_ready_bytes() {
        let mut uart = Uart::default();
        uart.rx.extend(b"\r\nOK\r\n");
        let mut serial = Serial::new(uart);

        assert_eq!(serial.available(), 6);
        let mut read = Vec::new();
        while let Some(b) = serial.read_byte() {
            read.push(b);
        }
        assert_eq!(read, b"\r\nOK\r\n");
        assert_eq!(serial.available(), 0);
    }

    #[test]
    fn flush_drops_staged_and_pending() {
        let mut uart = Uart::default();
        uart.rx.extend(core::iter::repeat(b'x').take(100));
        let mut serial = Serial::new(uart);

        assert_eq!(serial.available(), STAGING_LEN);
        serial.flush_input();
        assert_eq!(serial.available(), 0);
    }

    #[test]
    fn writes_pass_through() {
        let mut serial = Serial::new(Uart::default());
        serial.write_bytes(b"AT\r\n").unwrap();
        assert_eq!(serial.release().tx, b"AT\r\n");
    }
}
