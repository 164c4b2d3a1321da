//! 16550 UART console.
//!
//! Polled transmit only; the kernel log is the sole client. Receive and
//! UART interrupts stay disabled.

use core::fmt;

use vesper_abi::arch::x86::ports::{
    Port, UART_FCR_ENABLE_CLEAR_14, UART_LCR_8N1, UART_LCR_DLAB, UART_LSR_TX_EMPTY, UART_MCR_AUX2,
    UART_MCR_DTR, UART_MCR_RTS, UART_REG_DLL, UART_REG_FCR, UART_REG_IER, UART_REG_LCR,
    UART_REG_LSR, UART_REG_MCR, UART_REG_THR,
};
use vesper_lib::io::PortIo;

/// Baud rate divisor for 38400 baud (115200 / 38400).
const BAUD_DIVISOR: u16 = 3;

/// Spins waited on the transmitter before giving up on a byte. Keeps a
/// wedged or absent UART from hanging the whole kernel log.
const TX_SPIN_LIMIT: u32 = 100_000;

pub struct SerialPort<P: PortIo> {
    base: Port,
    ports: P,
}

impl<P: PortIo> SerialPort<P> {
    pub const fn new(base: Port, ports: P) -> Self {
        Self { base, ports }
    }

    /// Program the UART: interrupts off, 38400 baud, 8N1, FIFOs on.
    pub fn init(&mut self) {
        self.ports.write_byte(self.base.offset(UART_REG_IER), 0x00);
        self.ports
            .write_byte(self.base.offset(UART_REG_LCR), UART_LCR_DLAB);
        self.ports
            .write_byte(self.base.offset(UART_REG_DLL), (BAUD_DIVISOR & 0xFF) as u8);
        self.ports
            .write_byte(self.base.offset(UART_REG_IER), (BAUD_DIVISOR >> 8) as u8);
        self.ports
            .write_byte(self.base.offset(UART_REG_LCR), UART_LCR_8N1);
        self.ports
            .write_byte(self.base.offset(UART_REG_FCR), UART_FCR_ENABLE_CLEAR_14);
        self.ports.write_byte(
            self.base.offset(UART_REG_MCR),
            UART_MCR_DTR | UART_MCR_RTS | UART_MCR_AUX2,
        );
    }

    fn wait_tx_ready(&mut self) -> bool {
        for _ in 0..TX_SPIN_LIMIT {
            let status = self.ports.read_byte(self.base.offset(UART_REG_LSR));
            if status & UART_LSR_TX_EMPTY != 0 {
                return true;
            }
            core::hint::spin_loop();
        }
        false
    }

    /// Transmit one byte, dropping it if the UART never drains.
    pub fn write_byte(&mut self, byte: u8) {
        if self.wait_tx_ready() {
            self.ports
                .write_byte(self.base.offset(UART_REG_THR), byte);
        }
    }

    pub fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }
}

impl<P: PortIo> fmt::Write for SerialPort<P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        SerialPort::write_str(self, s);
        Ok(())
    }
}
