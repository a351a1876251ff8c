//! UART abstractions for a DMX512 line
//!
//! Not a general-purpose serial driver: only the operations the DMX512/RDM
//! state machines need (break control, per-event receive, FIFO transmit).

/// Bit rate mandated by DMX512
pub const DMX_BAUDRATE: u32 = 250_000;

/// Something the receiver saw on the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxEvent {
    /// Line held low longer than one character time
    ///
    /// Implementations report the break first and then deliver the break
    /// character itself (a 0x00 with a framing error) as a `Data` event, so
    /// the receiver sees the same sequence on every chip.
    Break,
    /// One received character
    Data(u8),
}

/// Interrupt sources the core switches on and off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    /// A character (or break) is available
    Receive,
    /// The transmit FIFO has room again
    TransmitEmpty,
}

/// How the peripheral should be set up for the current port role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineMode {
    /// One interrupt per character so every slot can be timestamped
    Receive,
    /// Transmit FIFO enabled and flushed
    Transmit,
}

/// DMX UART
///
/// All methods take `&self`; see the crate documentation.
pub trait DmxUart {
    /// Apply baud rate and frame format
    fn configure(&self, config: &UartConfig);

    /// Switch FIFO and interrupt-granularity policy for a port role
    fn set_mode(&self, mode: LineMode);

    /// Drive (or release) a break condition on the transmit line
    fn set_break(&self, asserted: bool);

    /// Pop the next receive event, if any
    fn read_event(&self) -> Option<RxEvent>;

    /// Number of bytes that can be written after a transmit-empty interrupt
    fn tx_fifo_depth(&self) -> usize;

    /// Room for at least one more byte in the transmit FIFO
    fn tx_ready(&self) -> bool;

    /// Queue one byte for transmission
    ///
    /// Callers check [`DmxUart::tx_ready`] or stay within
    /// [`DmxUart::tx_fifo_depth`] after a transmit-empty interrupt.
    fn write_byte(&self, byte: u8);

    /// Every queued byte, including the last stop bits, has left the shifter
    fn tx_complete(&self) -> bool;

    /// Enable or disable one interrupt source
    fn set_interrupt(&self, source: Interrupt, enabled: bool);

    /// Discard everything in the receive path
    fn flush_rx(&self) {
        while self.read_event().is_some() {}
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (always eight for DMX)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl UartConfig {
    /// 250 kbaud, 8 data bits, no parity, 2 stop bits
    pub const fn dmx() -> Self {
        Self {
            baudrate: DMX_BAUDRATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::Two,
        }
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::dmx()
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_dmx_frame_format() {
        let config = UartConfig::default();
        assert_eq!(config.baudrate, 250_000);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::Two);
    }
}
