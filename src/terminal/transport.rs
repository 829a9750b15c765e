//! Transport abstraction: any byte-oriented terminal channel.
//!
//! Concrete implementations:
//! - UART serial terminal ([`super::uart`])
//! - TCP client socket ([`super::tcp`])
//!
//! [`Session`](super::session::Session) is generic over `Transport`, so
//! adding a channel requires zero changes to the command handling.

use core::fmt;

/// Errors from [`Transport`] operations.
#[derive(Debug)]
pub enum TransportError {
    /// The peer went away.
    Closed,
    /// The underlying driver failed.
    Io(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "connection closed"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Byte-oriented terminal channel.
pub trait Transport {
    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read; 0 if nothing arrived
    /// before the driver's timeout.  A disconnect is `Err(Closed)`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write `data`, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), TransportError>;

    /// Write all of `data`.
    fn write_all(&mut self, mut data: &[u8]) -> Result<(), TransportError> {
        while !data.is_empty() {
            match self.write(data)? {
                0 => return Err(TransportError::Closed),
                n => data = &data[n..],
            }
        }
        Ok(())
    }

    /// Write `text` followed by `\n`, then flush.
    fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
        self.write_all(text.as_bytes())?;
        self.write_all(b"\n")?;
        self.flush()
    }
}

/// In-memory transport: replays scripted input, captures output.
///
/// Used by the session tests and the host integration tests.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    input: std::collections::VecDeque<Vec<u8>>,
    pub output: Vec<u8>,
}

impl ScriptedTransport {
    /// Each chunk is returned by one `read` call; once they run out the
    /// peer reads as closed.
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            input: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            output: Vec::new(),
        }
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Transport for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let Some(mut chunk) = self.input.pop_front() else {
            return Err(TransportError::Closed);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.input.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.output.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
