use heapless::Vec;

/// Default response capacity, one short multi line AT response.
pub const DEFAULT_CAPACITY: usize = 200;

/// Append-only accumulator for a single response.
///
/// Bytes pushed past the capacity are dropped and only counted.
#[derive(Debug, Default)]
pub struct ResponseBuffer<const N: usize = DEFAULT_CAPACITY> {
    data: Vec<u8, N>,
    discarded: usize,
}

impl<const N: usize> ResponseBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            discarded: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.discarded = 0;
    }

    pub(crate) fn push(&mut self, byte: u8) -> bool {
        if self.data.push(byte).is_err() {
            self.discarded += 1;
            false
        } else {
            true
        }
    }

    pub fn is_full(&self) -> bool {
        self.data.is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Everything stored, NUL bytes included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Stored bytes up to the first NUL.
    pub fn text(&self) -> &[u8] {
        let end = self
            .data
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.data.len());
        &self.data[..end]
    }

    /// The text view as `str`, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.text()).ok()
    }

    pub fn is_truncated(&self) -> bool {
        self.discarded > 0
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Bytes received in the last cycle, stored or not.
    pub fn total_len(&self) -> usize {
        self.data.len() + self.discarded
    }
}
