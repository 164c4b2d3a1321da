//! x86 I/O port addresses.
//!
//! This module provides a type-safe `Port` newtype that consolidates all
//! known I/O port addresses used by VesperOS, preventing accidentally using
//! other u16 values as port numbers.

/// x86 I/O port address.
///
/// Ports are accessed via IN/OUT instructions. This newtype groups all
/// known port addresses and prevents accidentally using other u16 values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Port(pub u16);

impl Port {
    // =========================================================================
    // Serial (8250/16550 UART)
    // =========================================================================

    /// COM1 serial port base address.
    pub const COM1: Self = Self(0x3F8);

    /// COM2 serial port base address.
    pub const COM2: Self = Self(0x2F8);

    // =========================================================================
    // Programmable Interval Timer (8254 PIT)
    // =========================================================================

    /// PIT Channel 0 data port.
    pub const PIT_CHANNEL0: Self = Self(0x40);

    /// PIT Command/mode register port.
    pub const PIT_COMMAND: Self = Self(0x43);

    // =========================================================================
    // Legacy PIC (8259)
    // =========================================================================

    /// Master PIC command port.
    pub const PIC1_COMMAND: Self = Self(0x20);

    /// Master PIC data port.
    pub const PIC1_DATA: Self = Self(0x21);

    /// Slave PIC command port.
    pub const PIC2_COMMAND: Self = Self(0xA0);

    /// Slave PIC data port.
    pub const PIC2_DATA: Self = Self(0xA1);

    // =========================================================================
    // Debug Ports
    // =========================================================================

    /// POST diagnostic port, written for a ~1us I/O delay.
    pub const POST_DELAY: Self = Self(0x80);

    // =========================================================================
    // Methods
    // =========================================================================

    /// Get the raw port number for IN/OUT instructions.
    #[inline]
    pub const fn number(self) -> u16 {
        self.0
    }

    /// Create an offset port (e.g., COM1 + register offset).
    #[inline]
    pub const fn offset(self, off: u16) -> Self {
        Self(self.0 + off)
    }

    /// Create a new port from a raw address.
    #[inline]
    pub const fn new(addr: u16) -> Self {
        Self(addr)
    }
}

// =============================================================================
// UART Register Offsets (relative to COMx base)
// =============================================================================

/// Receiver Buffer Register (read) / Transmitter Holding Register (write).
pub const UART_REG_THR: u16 = 0;
/// Divisor latch low byte (when DLAB is set).
pub const UART_REG_DLL: u16 = 0;
/// Interrupt Enable Register / divisor latch high byte (when DLAB is set).
pub const UART_REG_IER: u16 = 1;
/// FIFO Control Register (write).
pub const UART_REG_FCR: u16 = 2;
/// Line Control Register.
pub const UART_REG_LCR: u16 = 3;
/// Modem Control Register.
pub const UART_REG_MCR: u16 = 4;
/// Line Status Register.
pub const UART_REG_LSR: u16 = 5;

// =============================================================================
// UART Control Bits
// =============================================================================

/// Divisor Latch Access Bit (LCR).
pub const UART_LCR_DLAB: u8 = 0x80;
/// 8 data bits, no parity, one stop bit (LCR).
pub const UART_LCR_8N1: u8 = 0x03;

/// Enable FIFO, clear both FIFOs, 14-byte trigger threshold (FCR).
pub const UART_FCR_ENABLE_CLEAR_14: u8 = 0xC7;

/// Data Terminal Ready (MCR).
pub const UART_MCR_DTR: u8 = 0x01;
/// Request To Send (MCR).
pub const UART_MCR_RTS: u8 = 0x02;
/// Auxiliary output 2 - enables interrupts on some systems (MCR).
pub const UART_MCR_AUX2: u8 = 0x08;

/// Transmitter holding register empty (LSR).
pub const UART_LSR_TX_EMPTY: u8 = 0x20;

// =============================================================================
// PIT Constants
// =============================================================================

/// PIT base oscillator frequency (Hz).
pub const PIT_BASE_FREQUENCY_HZ: u32 = 1_193_180;

/// Select channel 0 (PIT command).
pub const PIT_COMMAND_CHANNEL0: u8 = 0x00;

/// Access mode: low byte then high byte (PIT command).
pub const PIT_COMMAND_ACCESS_LOHI: u8 = 0x30;

/// Operating mode: periodic square wave generator (PIT command).
pub const PIT_COMMAND_MODE_SQUARE: u8 = 0x06;

/// Binary counting mode (PIT command).
pub const PIT_COMMAND_BINARY: u8 = 0x00;

/// PIT is connected to legacy IRQ 0.
pub const PIT_IRQ_LINE: u8 = 0;

// =============================================================================
// PIC Constants
// =============================================================================

/// ICW1: begin initialization, cascade mode, ICW4 needed.
pub const PIC_ICW1_INIT: u8 = 0x11;

/// ICW2 for the master controller: vectors 32..=39.
pub const PIC1_VECTOR_OFFSET: u8 = 0x20;

/// ICW2 for the slave controller: vectors 40..=47.
pub const PIC2_VECTOR_OFFSET: u8 = 0x28;

/// ICW3 for the master: a slave is wired to IRQ line 2.
pub const PIC1_ICW3_CASCADE: u8 = 0x04;

/// ICW3 for the slave: its cascade identity is 2.
pub const PIC2_ICW3_CASCADE: u8 = 0x02;

/// ICW4: 8086/8088 mode.
pub const PIC_ICW4_8086: u8 = 0x01;

/// Interrupt mask with every line enabled.
pub const PIC_MASK_NONE: u8 = 0x00;

/// End of Interrupt command.
pub const PIC_EOI: u8 = 0x20;
