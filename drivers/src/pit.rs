//! 8254 programmable interval timer.
//!
//! Channel 0 is programmed as a periodic square wave on IRQ 0. The driver
//! keeps a monotonic tick counter that the IRQ path advances; uptime and
//! sleeping are derived from it. Tick state is atomic because the counter
//! is read from normal code while the interrupt path increments it.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use vesper_abi::arch::x86::ports::{
    PIT_BASE_FREQUENCY_HZ, PIT_COMMAND_ACCESS_LOHI, PIT_COMMAND_BINARY, PIT_COMMAND_CHANNEL0,
    PIT_COMMAND_MODE_SQUARE, Port,
};
use vesper_abi::arch::x86::trap::TrapFrame;
use vesper_lib::io::PortIo;
use vesper_lib::{cpu, klog_info};

use crate::irq::IrqHandler;

/// Channel 0, low/high byte access, periodic square wave, binary counting.
const PIT_COMMAND_PERIODIC: u8 =
    PIT_COMMAND_CHANNEL0 | PIT_COMMAND_ACCESS_LOHI | PIT_COMMAND_MODE_SQUARE | PIT_COMMAND_BINARY;

pub struct Pit {
    ticks: AtomicU64,
    frequency_hz: AtomicU32,
}

impl Pit {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            frequency_hz: AtomicU32::new(0),
        }
    }

    /// Program channel 0 for `frequency_hz` interrupts per second.
    ///
    /// The hardware divides its base oscillator by a 16-bit reload value,
    /// so the delivered rate is the closest achievable divisor, reported by
    /// [`Pit::actual_frequency`].
    pub fn init<P: PortIo>(&self, frequency_hz: u32, ports: &mut P) {
        self.frequency_hz.store(frequency_hz, Ordering::Relaxed);

        let reload = (PIT_BASE_FREQUENCY_HZ / frequency_hz) as u16;
        ports.write_byte(Port::PIT_COMMAND, PIT_COMMAND_PERIODIC);
        ports.write_byte(Port::PIT_CHANNEL0, (reload & 0xFF) as u8);
        ports.write_byte(Port::PIT_CHANNEL0, (reload >> 8) as u8);

        klog_info!(
            "pit: channel 0 at {} Hz (reload {}, actual {} Hz)",
            frequency_hz,
            reload,
            self.actual_frequency()
        );
    }

    /// Ticks since `init`.
    pub fn get_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Whole seconds of uptime, derived from the programmed frequency.
    pub fn get_seconds(&self) -> u64 {
        let frequency = self.frequency_hz.load(Ordering::Relaxed);
        if frequency == 0 {
            return 0;
        }
        self.get_ticks() / frequency as u64
    }

    /// The rate the hardware actually delivers after divisor truncation.
    pub fn actual_frequency(&self) -> u32 {
        let requested = self.frequency_hz.load(Ordering::Relaxed);
        if requested == 0 {
            return 0;
        }
        let reload = PIT_BASE_FREQUENCY_HZ / requested;
        if reload == 0 {
            return 0;
        }
        PIT_BASE_FREQUENCY_HZ / reload
    }

    /// Block for at least `ms` milliseconds, halting between ticks.
    ///
    /// Requires timer interrupts to be flowing; with them masked this never
    /// returns.
    pub fn sleep_ms(&self, ms: u64) {
        let frequency = self.frequency_hz.load(Ordering::Relaxed) as u64;
        let target = self.get_ticks() + (ms * frequency).div_ceil(1000);
        while self.get_ticks() < target {
            cpu::hlt();
        }
    }
}

impl IrqHandler for Pit {
    fn handle(&self, _frame: &mut TrapFrame) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for Pit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_lib::testing::RecordingPorts;

    #[test]
    fn init_writes_command_then_reload_low_high() {
        let pit = Pit::new();
        let mut ports = RecordingPorts::new();
        pit.init(100, &mut ports);

        // 1_193_180 / 100 = 11931 = 0x2E9B
        assert_eq!(
            ports.writes(),
            &[
                (Port::PIT_COMMAND.number(), 0x36),
                (Port::PIT_CHANNEL0.number(), 0x9B),
                (Port::PIT_CHANNEL0.number(), 0x2E),
            ]
        );
    }

    #[test]
    fn each_interrupt_advances_one_tick() {
        let pit = Pit::new();
        let mut ports = RecordingPorts::new();
        pit.init(100, &mut ports);

        let mut frame = TrapFrame::for_vector(32);
        for _ in 0..250 {
            pit.handle(&mut frame);
        }
        assert_eq!(pit.get_ticks(), 250);
        assert_eq!(pit.get_seconds(), 2);
    }

    #[test]
    fn seconds_are_zero_before_init() {
        let pit = Pit::new();
        assert_eq!(pit.get_seconds(), 0);
    }

    #[test]
    fn actual_frequency_reflects_divisor_truncation() {
        let pit = Pit::new();
        let mut ports = RecordingPorts::new();
        pit.init(7000, &mut ports);

        // reload = 170, so the delivered rate is 1_193_180 / 170 = 7018 Hz.
        assert_eq!(pit.actual_frequency(), 7018);

        let exact = Pit::new();
        exact.init(100, &mut ports);
        assert_eq!(exact.actual_frequency(), 100);
    }
}
