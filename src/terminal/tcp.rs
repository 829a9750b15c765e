//! TCP line server.
//!
//! Listens on the terminal port (31415 by default) and runs one
//! [`Session`] per client on its own thread.  Clients share the single
//! command processor, so a `water` from one socket and a scheduled fire
//! serialise on the domain exactly like two local commands would.
//!
//! Plain text, no TLS, no authentication.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use super::session::{Session, SessionOptions};
use super::transport::{Transport, TransportError};
use crate::app::processor::CommandProcessor;
use crate::drivers::task_pin::{TCP_CLIENT_TASK, spawn_task};

/// Concurrent clients; further connections are turned away.
pub const MAX_CLIENTS: usize = 4;

const BUSY_REPLY: &[u8] = b"Too many connections, try again later\n";

// ───────────────────────────────────────────────────────────────
// Socket transport
// ───────────────────────────────────────────────────────────────

/// [`Transport`] over one accepted client socket.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(0)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) if is_disconnect(&e) => Err(TransportError::Closed),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.stream.write(data).map_err(|e| {
            if is_disconnect(&e) {
                TransportError::Closed
            } else {
                e.into()
            }
        })
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.stream.flush().map_err(Into::into)
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

// ───────────────────────────────────────────────────────────────
// Listener
// ───────────────────────────────────────────────────────────────

/// Accepts clients and spawns a session thread for each.
pub struct TcpLineServer<D> {
    listener: TcpListener,
    processor: CommandProcessor<D>,
    opts: SessionOptions,
    active: Arc<AtomicUsize>,
}

impl<D> TcpLineServer<D>
where
    D: DelayNs + Clone + Send + Sync + 'static,
{
    /// Bind on all interfaces at `port`.
    pub fn bind(port: u16, processor: CommandProcessor<D>, opts: SessionOptions) -> io::Result<Self> {
        Self::bind_addr(("0.0.0.0", port), processor, opts)
    }

    pub fn bind_addr(
        addr: impl ToSocketAddrs,
        processor: CommandProcessor<D>,
        opts: SessionOptions,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        info!("TCP: listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            processor,
            opts,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Clients currently connected.
    pub fn active_clients(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Accept clients forever.
    pub fn serve(&self) {
        loop {
            if let Err(e) = self.accept_one() {
                error!("TCP: accept failed: {e}");
            }
        }
    }

    /// Accept one client and start its session.  Returns the session
    /// thread, or `None` if the client was turned away.
    pub fn accept_one(&self) -> io::Result<Option<JoinHandle<()>>> {
        let (mut stream, peer) = self.listener.accept()?;

        if self.active.fetch_add(1, Ordering::AcqRel) >= MAX_CLIENTS {
            self.active.fetch_sub(1, Ordering::AcqRel);
            warn!("TCP: {peer} refused, {MAX_CLIENTS} clients already connected");
            // Best effort: the client is being dropped either way.
            let _ = stream.write_all(BUSY_REPLY);
            let _ = stream.shutdown(Shutdown::Both);
            return Ok(None);
        }

        info!("TCP: client {peer} connected");
        let _ = stream.set_nodelay(true);
        let opts = SessionOptions {
            label: peer.to_string(),
            ..self.opts.clone()
        };
        let processor = self.processor.clone();
        let active = Arc::clone(&self.active);

        let spawned = spawn_task(TCP_CLIENT_TASK, move || {
            let shutdown_handle = stream.try_clone().ok();
            let mut session = Session::new(TcpTransport::new(stream), processor, opts);
            match session.run() {
                Ok(end) => info!("TCP: client {peer} finished ({end:?})"),
                Err(e) => warn!("TCP: client {peer} dropped: {e}"),
            }
            if let Some(s) = shutdown_handle {
                let _ = s.shutdown(Shutdown::Both);
            }
            active.fetch_sub(1, Ordering::AcqRel);
        });

        match spawned {
            Ok(handle) => Ok(Some(handle)),
            Err(e) => {
                self.active.fetch_sub(1, Ordering::AcqRel);
                Err(e)
            }
        }
    }
}
