//! Serial terminal.
//!
//! - **`target_os = "espidf"`**: UART1 at the configured baud rate on the
//!   pins from [`crate::pins`], read with a short tick timeout so the
//!   session loop never blocks forever inside the driver.
//! - **host**: stdin/stdout, so the simulation binary can be driven from
//!   a shell.
//!
//! Serial sessions echo each line back, since most serial consoles do not
//! echo locally.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::session::{Session, SessionEnd, SessionOptions};
use super::transport::{Transport, TransportError};
use crate::app::processor::CommandProcessor;

/// Driver read timeout.  Only bounds how long a read blocks; partial
/// lines survive it in the decoder.
pub const READ_TIMEOUT_MS: u64 = 100;

// ───────────────────────────────────────────────────────────────
// ESP-IDF: UART1
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod imp {
    use esp_idf_hal::delay::TickType;
    use esp_idf_hal::gpio::{AnyIOPin, InputPin, OutputPin};
    use esp_idf_hal::peripheral::Peripheral;
    use esp_idf_hal::uart::{Uart, UartDriver, config::Config};
    use esp_idf_hal::units::Hertz;

    use super::{READ_TIMEOUT_MS, Transport, TransportError};

    pub struct SerialTransport {
        driver: UartDriver<'static>,
        timeout_ticks: u32,
    }

    impl SerialTransport {
        pub fn new(
            uart: impl Peripheral<P = impl Uart> + 'static,
            tx: impl Peripheral<P = impl OutputPin> + 'static,
            rx: impl Peripheral<P = impl InputPin> + 'static,
            baud: u32,
        ) -> Result<Self, TransportError> {
            let config = Config::default().baudrate(Hertz(baud));
            let driver = UartDriver::new(
                uart,
                tx,
                rx,
                Option::<AnyIOPin>::None,
                Option::<AnyIOPin>::None,
                &config,
            )
            .map_err(io_err)?;
            Ok(Self {
                driver,
                timeout_ticks: TickType::new_millis(READ_TIMEOUT_MS).ticks(),
            })
        }
    }

    impl Transport for SerialTransport {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            // A timeout is reported as Ok(0) by the driver.
            self.driver.read(buf, self.timeout_ticks).map_err(io_err)
        }

        fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
            self.driver.write(data).map_err(io_err)
        }

        fn flush(&mut self) -> Result<(), TransportError> {
            self.driver
                .wait_tx_done(self.timeout_ticks)
                .map_err(io_err)
        }
    }

    fn io_err(e: esp_idf_sys::EspError) -> TransportError {
        TransportError::Io(std::io::Error::other(e))
    }
}

// ───────────────────────────────────────────────────────────────
// Host: stdin / stdout
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod imp {
    use std::io::{self, Read, Write};

    use super::{Transport, TransportError};

    /// Serial stand-in on the host.  EOF on stdin reads as a disconnect.
    #[derive(Debug, Default)]
    pub struct SerialTransport;

    impl SerialTransport {
        pub fn new() -> Self {
            Self
        }
    }

    impl Transport for SerialTransport {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            match io::stdin().lock().read(buf) {
                Ok(0) => Err(TransportError::Closed),
                Ok(n) => Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
                Err(e) => Err(e.into()),
            }
        }

        fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
            io::stdout().lock().write(data).map_err(Into::into)
        }

        fn flush(&mut self) -> Result<(), TransportError> {
            io::stdout().lock().flush().map_err(Into::into)
        }
    }
}

pub use imp::SerialTransport;

/// Run serial sessions back to back.
///
/// `quit` on a serial console starts a fresh session (banner again); the
/// port itself never goes away.  Returns the transport once it reports a
/// disconnect (stdin EOF on the host) or fails.
pub fn serve_serial<T, D>(transport: T, processor: CommandProcessor<D>, opts: SessionOptions) -> T
where
    T: Transport,
    D: DelayNs + Clone + Send + Sync + 'static,
{
    let opts = SessionOptions {
        echo: true,
        label: "UART".into(),
        ..opts
    };
    let mut transport = transport;
    loop {
        let mut session = Session::new(transport, processor.clone(), opts.clone());
        let outcome = session.run();
        transport = session.into_transport();
        match outcome {
            Ok(SessionEnd::Quit) => info!("UART: session closed, restarting"),
            Ok(SessionEnd::Disconnected) => {
                info!("UART: input closed");
                return transport;
            }
            Err(e) => {
                warn!("UART: terminal failed: {e}");
                return transport;
            }
        }
    }
}
