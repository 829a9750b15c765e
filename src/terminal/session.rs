//! One terminal session: banner, then line → command → reply until the
//! peer quits or disconnects.
//!
//! ```text
//!   Transport.read ──▶ LineDecoder ──▶ (echo) ──▶ CommandProcessor
//!         ▲                                             │
//!         └──────────── write_line(reply) ◀─────────────┘
//! ```
//!
//! A session owns its transport; the processor (and so the watering
//! system) is shared with every other session and the scheduler.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::codec::{Line, LineDecoder};
use super::transport::{Transport, TransportError};
use crate::app::processor::{CommandProcessor, Reply};

const READ_CHUNK: usize = 256;

pub const PROMPT: &str = "Enter a command (type \"help\" for list of valid commands):";

/// Per-transport session behaviour.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Echo each received line before replying (serial terminals).
    pub echo: bool,
    /// Shown in the banner.
    pub version: String,
    /// Optional art printed above the banner.
    pub banner_art: Option<String>,
    /// Label for log lines, e.g. `UART` or a peer address.
    pub label: String,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer sent `quit`.
    Quit,
    /// The transport closed.
    Disconnected,
}

pub struct Session<T, D> {
    transport: T,
    processor: CommandProcessor<D>,
    decoder: LineDecoder,
    opts: SessionOptions,
}

impl<T, D> Session<T, D>
where
    T: Transport,
    D: DelayNs + Clone + Send + Sync + 'static,
{
    pub fn new(transport: T, processor: CommandProcessor<D>, opts: SessionOptions) -> Self {
        Self {
            transport,
            processor,
            decoder: LineDecoder::new(),
            opts,
        }
    }

    /// Write the banner, then serve lines until `quit` or disconnect.
    pub fn run(&mut self) -> Result<SessionEnd, TransportError> {
        info!("Terminal[{}]: session started", self.opts.label);
        self.write_banner()?;

        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = match self.transport.read(&mut buf) {
                Ok(n) => n,
                Err(TransportError::Closed) => {
                    info!("Terminal[{}]: disconnected", self.opts.label);
                    return Ok(SessionEnd::Disconnected);
                }
                Err(e) => return Err(e),
            };
            for line in self.decoder.feed(&buf[..n]) {
                let end = match line {
                    Line::Text(text) => self.handle(&text)?,
                    Line::Overflow { keyword } => self.reject_overlong(&keyword)?,
                };
                if end == Some(SessionEnd::Quit) {
                    info!("Terminal[{}]: quit", self.opts.label);
                    return Ok(SessionEnd::Quit);
                }
            }
        }
    }

    fn handle(&mut self, line: &str) -> Result<Option<SessionEnd>, TransportError> {
        let command = line.trim_end();
        if command.is_empty() {
            return Ok(None);
        }
        if self.opts.echo {
            self.transport.write_line(command)?;
        }
        debug!("Terminal[{}]: > {}", self.opts.label, command);
        match self.processor.handle_line(command) {
            Reply::Text(text) => {
                self.transport.write_line(&text)?;
                Ok(None)
            }
            Reply::Close => Ok(Some(SessionEnd::Quit)),
        }
    }

    fn reject_overlong(&mut self, keyword: &str) -> Result<Option<SessionEnd>, TransportError> {
        warn!("Terminal[{}]: overlong '{keyword}' line rejected", self.opts.label);
        if let Reply::Text(text) = self.processor.handle_overlong(keyword) {
            self.transport.write_line(&text)?;
        }
        Ok(None)
    }

    fn write_banner(&mut self) -> Result<(), TransportError> {
        let sys = self.processor.system();
        let mut banner = String::new();
        if let Some(art) = &self.opts.banner_art {
            banner.push_str(art);
        }
        banner.push_str(&format!(
            "\n\nWelcome to version {}!\nWatering System Name: {}\nCurrent Time: {}\n\n{}",
            self.opts.version,
            sys.name(),
            sys.now(),
            PROMPT
        ));
        self.transport.write_line(&banner)
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
