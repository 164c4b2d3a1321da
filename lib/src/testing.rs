//! Test fixtures.
//!
//! [`RecordingPorts`] is the fake hardware used across the workspace: it
//! logs every port write in order and replays scripted read values, so
//! tests can assert the exact byte sequences a component puts on the wire.

use vesper_abi::arch::x86::ports::Port;

use crate::io::PortIo;

const LOG_CAPACITY: usize = 128;

/// Recording fake for [`PortIo`].
///
/// Writes beyond capacity are counted but not stored; reads with no
/// scripted value return zero.
pub struct RecordingPorts {
    writes: [(u16, u8); LOG_CAPACITY],
    write_count: usize,
    overflowed: bool,
    scripted_reads: [(u16, u8); LOG_CAPACITY],
    scripted_len: usize,
    read_cursor: usize,
}

impl RecordingPorts {
    pub const fn new() -> Self {
        Self {
            writes: [(0, 0); LOG_CAPACITY],
            write_count: 0,
            overflowed: false,
            scripted_reads: [(0, 0); LOG_CAPACITY],
            scripted_len: 0,
            read_cursor: 0,
        }
    }

    /// Queue a value to be returned by the next matching `read_byte`.
    pub fn script_read(&mut self, port: Port, value: u8) {
        if self.scripted_len < LOG_CAPACITY {
            self.scripted_reads[self.scripted_len] = (port.number(), value);
            self.scripted_len += 1;
        }
    }

    /// Every write performed so far, in order.
    pub fn writes(&self) -> &[(u16, u8)] {
        &self.writes[..self.write_count]
    }

    /// The ordered bytes written to one specific port.
    pub fn bytes_written_to(&self, port: Port) -> impl Iterator<Item = u8> + '_ {
        let target = port.number();
        self.writes()
            .iter()
            .filter(move |(p, _)| *p == target)
            .map(|(_, v)| *v)
    }

    /// The set of distinct ports written, preserving first-write order.
    pub fn ports_touched(&self) -> impl Iterator<Item = u16> + '_ {
        let writes = self.writes();
        writes.iter().enumerate().filter_map(move |(i, (p, _))| {
            if writes[..i].iter().any(|(q, _)| q == p) {
                None
            } else {
                Some(*p)
            }
        })
    }

    pub fn write_count(&self) -> usize {
        self.write_count
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }
}

impl Default for RecordingPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl PortIo for RecordingPorts {
    fn read_byte(&mut self, port: Port) -> u8 {
        while self.read_cursor < self.scripted_len {
            let (p, v) = self.scripted_reads[self.read_cursor];
            self.read_cursor += 1;
            if p == port.number() {
                return v;
            }
        }
        0
    }

    fn write_byte(&mut self, port: Port, value: u8) {
        if self.write_count < LOG_CAPACITY {
            self.writes[self.write_count] = (port.number(), value);
            self.write_count += 1;
        } else {
            self.overflowed = true;
        }
    }
}
