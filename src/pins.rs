//! Fixed pin assignments for the controller board.
//!
//! Relay outputs are not listed here: each watering domain names its own
//! GPIO in the configuration document.  Only the serial console is fixed.

// ---------------------------------------------------------------------------
// UART terminal (UART1)
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 4;
pub const UART_RX_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Relay outputs
// ---------------------------------------------------------------------------

/// Highest GPIO with an output driver on the ESP32 (34–39 are input-only).
pub const MAX_OUTPUT_GPIO: u8 = 33;

/// Whether `gpio` can drive a relay.  The UART pins are reserved.
pub fn is_relay_capable(gpio: u8) -> bool {
    let g = i32::from(gpio);
    gpio <= MAX_OUTPUT_GPIO && g != UART_TX_GPIO && g != UART_RX_GPIO
}
