//! Host serial link.
//!
//! Commands and capture data share one byte stream. Every operation is
//! non-blocking: the capture loop polls `available` for abort bytes between
//! halves and checks `write_space` before flushing so it never stalls inside
//! the transport.

/// Byte-oriented, non-blocking bidirectional transport (USB CDC on hardware).
pub trait SerialTransport {
    /// Error type
    type Error: core::fmt::Debug;

    /// Number of received bytes that can be read without waiting.
    fn available(&self) -> usize;

    /// Copy up to `buf.len()` received bytes. Returns the count copied,
    /// which is 0 when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Free space in the outbound queue, in bytes.
    fn write_space(&self) -> usize;

    /// Queue up to `data.len()` bytes. Returns the count accepted, which may
    /// be short under backpressure.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read a single byte if one is pending.
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}
