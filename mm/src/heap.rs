//! Flat kernel heap.
//!
//! A first-fit, split-on-allocate allocator over one fixed byte arena.
//! Block headers live inside the arena as a singly linked chain starting at
//! offset 0. Freed blocks are flagged free in place and never coalesced, so
//! the chain only ever grows finer.
//!
//! All header traffic goes through bounds-checked offset accessors; a
//! corrupted or fabricated offset turns into a reported no-op instead of a
//! wild read.

use vesper_lib::{InitFlag, klog_warn};

/// In-arena header: size u32, used u32, next u32, little endian.
const HEADER_SIZE: u32 = 12;

/// Allocation granularity in bytes.
const ALIGN: usize = 4;

/// Minimum spare payload left over before a block is worth splitting.
const SPLIT_MIN_REMAINDER: u32 = 16;

/// `next` value terminating the chain.
const NO_NEXT: u32 = u32::MAX;

const OFFSET_SIZE: u32 = 0;
const OFFSET_USED: u32 = 4;
const OFFSET_NEXT: u32 = 8;

/// Opaque handle to an allocated block: the payload's arena offset.
///
/// Offset 0 is inside the genesis header and can never be a payload, so it
/// doubles as the null handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapPtr(u32);

impl HeapPtr {
    pub const fn null() -> Self {
        Self(0)
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Arena offset of the payload.
    pub const fn offset(self) -> u32 {
        self.0
    }
}

/// Arena accounting. Used and free sums include each block's header, so
/// `used_bytes + free_bytes == total_bytes` for an intact chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub total_bytes: usize,
    pub used_bytes: usize,
    pub free_bytes: usize,
}

/// Outcome of [`KernelHeap::free`]. Every variant except `Freed` is a no-op
/// on arena state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreeStatus {
    /// The block's used flag was cleared.
    Freed,
    /// The block was already free; the flag stays clear.
    AlreadyFree,
    /// The handle does not point at any block in the chain.
    NotABlock,
    /// The null handle, or the allocator is not initialized.
    Null,
}

pub struct KernelHeap<'a> {
    arena: &'a mut [u8],
    ready: InitFlag,
}

impl<'a> KernelHeap<'a> {
    /// Borrow `arena` as the heap's backing store. No header is written
    /// until [`KernelHeap::init`].
    pub const fn new(arena: &'a mut [u8]) -> Self {
        Self {
            arena,
            ready: InitFlag::new(),
        }
    }

    /// Write the genesis header covering the whole arena and mark the
    /// allocator ready. Exactly once; later calls are ignored.
    pub fn init(&mut self) {
        if self.arena.len() <= HEADER_SIZE as usize {
            klog_warn!(
                "heap: arena of {} bytes cannot hold a block header",
                self.arena.len()
            );
            return;
        }
        if !self.ready.init_once() {
            klog_warn!("heap: ignoring repeated init");
            return;
        }
        let payload = self.arena.len() as u32 - HEADER_SIZE;
        self.write_header(0, payload, 0, NO_NEXT);
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.is_set()
    }

    /// First-fit allocation of `size` bytes, rounded up to the 4-byte
    /// granularity. `None` before init, for size 0, or when no free block
    /// is large enough.
    pub fn alloc(&mut self, size: usize) -> Option<HeapPtr> {
        if !self.ready.is_set() || size == 0 {
            return None;
        }
        let rounded = u32::try_from(size)
            .ok()?
            .checked_next_multiple_of(ALIGN as u32)?;

        let mut offset = 0u32;
        loop {
            let block_size = self.read_field(offset, OFFSET_SIZE)?;
            let used = self.read_field(offset, OFFSET_USED)?;
            let next = self.read_field(offset, OFFSET_NEXT)?;

            if used == 0 && block_size >= rounded {
                // Split only when the remainder can hold a header plus a
                // useful payload; otherwise hand out the whole block.
                if block_size >= rounded + HEADER_SIZE + SPLIT_MIN_REMAINDER {
                    let remainder_offset = offset + HEADER_SIZE + rounded;
                    let remainder_size = block_size - rounded - HEADER_SIZE;
                    self.write_header(remainder_offset, remainder_size, 0, next);
                    self.write_header(offset, rounded, 1, remainder_offset);
                } else {
                    self.write_header(offset, block_size, 1, next);
                }
                return Some(HeapPtr(offset + HEADER_SIZE));
            }

            // Links must move forward; anything else is a corrupted chain.
            if next == NO_NEXT || next <= offset {
                return None;
            }
            offset = next;
        }
    }

    /// Clear a block's used flag.
    ///
    /// The handle is validated against the chain before anything is
    /// touched, so a fabricated or stale handle reports [`FreeStatus::
    /// NotABlock`] instead of corrupting a header. Freed blocks stay in
    /// place; there is no coalescing.
    pub fn free(&mut self, ptr: HeapPtr) -> FreeStatus {
        if ptr.is_null() || !self.ready.is_set() {
            return FreeStatus::Null;
        }
        let Some(header_offset) = ptr.offset().checked_sub(HEADER_SIZE) else {
            return FreeStatus::NotABlock;
        };
        if !self.chain_contains(header_offset) {
            return FreeStatus::NotABlock;
        }
        match self.read_field(header_offset, OFFSET_USED) {
            Some(0) => FreeStatus::AlreadyFree,
            Some(_) => {
                self.write_field(header_offset, OFFSET_USED, 0);
                FreeStatus::Freed
            }
            None => FreeStatus::NotABlock,
        }
    }

    /// Walk the chain and sum block footprints (header included).
    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            total_bytes: self.arena.len(),
            used_bytes: 0,
            free_bytes: 0,
        };
        if !self.ready.is_set() {
            return stats;
        }
        let mut offset = 0u32;
        loop {
            let Some(size) = self.read_field(offset, OFFSET_SIZE) else {
                return stats;
            };
            let Some(used) = self.read_field(offset, OFFSET_USED) else {
                return stats;
            };
            let footprint = (HEADER_SIZE + size) as usize;
            if used != 0 {
                stats.used_bytes += footprint;
            } else {
                stats.free_bytes += footprint;
            }
            match self.read_field(offset, OFFSET_NEXT) {
                Some(NO_NEXT) | None => return stats,
                Some(next) if next <= offset => return stats,
                Some(next) => offset = next,
            }
        }
    }

    /// Bytes of an allocated block. `None` for anything `free` would not
    /// accept as a live block.
    pub fn payload(&self, ptr: HeapPtr) -> Option<&[u8]> {
        let (start, len) = self.payload_span(ptr)?;
        self.arena.get(start..start + len)
    }

    /// Mutable bytes of an allocated block.
    pub fn payload_mut(&mut self, ptr: HeapPtr) -> Option<&mut [u8]> {
        let (start, len) = self.payload_span(ptr)?;
        self.arena.get_mut(start..start + len)
    }

    fn payload_span(&self, ptr: HeapPtr) -> Option<(usize, usize)> {
        if ptr.is_null() || !self.ready.is_set() {
            return None;
        }
        let header_offset = ptr.offset().checked_sub(HEADER_SIZE)?;
        if !self.chain_contains(header_offset) {
            return None;
        }
        if self.read_field(header_offset, OFFSET_USED)? == 0 {
            return None;
        }
        let size = self.read_field(header_offset, OFFSET_SIZE)?;
        Some((ptr.offset() as usize, size as usize))
    }

    fn chain_contains(&self, header_offset: u32) -> bool {
        let mut offset = 0u32;
        loop {
            if offset == header_offset {
                return true;
            }
            match self.read_field(offset, OFFSET_NEXT) {
                Some(NO_NEXT) | None => return false,
                Some(next) if next <= offset => return false,
                Some(next) => offset = next,
            }
        }
    }

    fn read_field(&self, header_offset: u32, field: u32) -> Option<u32> {
        let start = header_offset.checked_add(field)? as usize;
        let bytes = self.arena.get(start..start + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn write_field(&mut self, header_offset: u32, field: u32, value: u32) {
        let start = (header_offset + field) as usize;
        if let Some(bytes) = self.arena.get_mut(start..start + 4) {
            bytes.copy_from_slice(&value.to_le_bytes());
        }
    }

    fn write_header(&mut self, header_offset: u32, size: u32, used: u32, next: u32) {
        self.write_field(header_offset, OFFSET_SIZE, size);
        self.write_field(header_offset, OFFSET_USED, used);
        self.write_field(header_offset, OFFSET_NEXT, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARENA: usize = 1024;

    fn fresh_heap(arena: &mut [u8]) -> KernelHeap<'_> {
        let mut heap = KernelHeap::new(arena);
        heap.init();
        heap
    }

    #[test]
    fn alloc_before_init_returns_none() {
        let mut arena = [0u8; ARENA];
        let mut heap = KernelHeap::new(&mut arena);
        assert!(!heap.is_initialized());
        assert_eq!(heap.alloc(16), None);
    }

    #[test]
    fn zero_size_alloc_returns_none() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        assert_eq!(heap.alloc(0), None);
    }

    #[test]
    fn init_is_once() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(32).unwrap();
        heap.init();
        // The chain survives the ignored second init.
        assert!(heap.payload(a).is_some());
    }

    #[test]
    fn arena_smaller_than_a_header_never_initializes() {
        let mut arena = [0u8; 8];
        let mut heap = KernelHeap::new(&mut arena);
        heap.init();
        assert!(!heap.is_initialized());
        assert_eq!(heap.alloc(1), None);
    }

    #[test]
    fn sizes_round_up_to_four_bytes() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(1).unwrap();
        assert_eq!(heap.payload(a).unwrap().len(), 4);
    }

    #[test]
    fn first_fit_reuses_the_lowest_free_block() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(64).unwrap();
        let b = heap.alloc(64).unwrap();
        let _c = heap.alloc(64).unwrap();
        assert_eq!(heap.free(a), FreeStatus::Freed);
        assert_eq!(heap.free(b), FreeStatus::Freed);

        // Both holes fit; the scan must hand back the earlier one.
        let reused = heap.alloc(16).unwrap();
        assert_eq!(reused.offset(), a.offset());
    }

    #[test]
    fn splitting_leaves_an_allocatable_remainder() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(100).unwrap();
        let b = heap.alloc(100).unwrap();
        assert_eq!(b.offset(), a.offset() + 100 + 12);
    }

    #[test]
    fn a_slim_remainder_is_not_split_off() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(64).unwrap();
        assert_eq!(heap.free(a), FreeStatus::Freed);

        // 56 rounded fits in the 64-byte hole, but the 8 spare bytes are
        // below the split threshold, so the whole block is handed out.
        let b = heap.alloc(56).unwrap();
        assert_eq!(b, a);
        assert_eq!(heap.payload(b).unwrap().len(), 64);
    }

    #[test]
    fn freed_neighbors_are_never_merged() {
        let mut arena = [0u8; 200];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(60).unwrap();
        let b = heap.alloc(60).unwrap();
        // Remaining tail: 200 - 2*(60+12) - 12 = 44 payload bytes.
        assert_eq!(heap.free(a), FreeStatus::Freed);
        assert_eq!(heap.free(b), FreeStatus::Freed);

        // 120 bytes would fit only if the two 60-byte holes merged.
        assert_eq!(heap.alloc(120), None);
        assert!(heap.alloc(60).is_some());
    }

    #[test]
    fn stats_balance_and_track_free() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let genesis = heap.stats();
        assert_eq!(genesis.total_bytes, ARENA);
        assert_eq!(genesis.used_bytes, 0);
        assert_eq!(genesis.free_bytes, ARENA);

        let a = heap.alloc(100).unwrap();
        let after_alloc = heap.stats();
        assert_eq!(after_alloc.used_bytes, 100 + 12);
        assert_eq!(after_alloc.used_bytes + after_alloc.free_bytes, ARENA);

        heap.free(a);
        let after_free = heap.stats();
        assert_eq!(after_free.used_bytes, 0);
        assert_eq!(after_free.free_bytes, ARENA);
    }

    #[test]
    fn two_allocations_account_for_their_headers() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(100).unwrap();
        let b = heap.alloc(50).unwrap();
        assert_ne!(a, b);

        // 50 rounds to 52; both footprints include a header.
        let stats = heap.stats();
        assert_eq!(stats.used_bytes, (100 + 12) + (52 + 12));
        assert!(stats.used_bytes >= 100 + 50 + 2 * 12);
    }

    #[test]
    fn free_validates_the_handle() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(32).unwrap();
        let before = heap.stats();

        let fabricated = HeapPtr(a.offset() + 2);
        assert_eq!(heap.free(fabricated), FreeStatus::NotABlock);
        assert_eq!(heap.stats(), before);

        assert_eq!(heap.free(HeapPtr::null()), FreeStatus::Null);
        assert_eq!(heap.stats(), before);
    }

    #[test]
    fn double_free_is_reported_and_harmless() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(32).unwrap();
        assert_eq!(heap.free(a), FreeStatus::Freed);
        let after_first = heap.stats();
        assert_eq!(heap.free(a), FreeStatus::AlreadyFree);
        assert_eq!(heap.stats(), after_first);
    }

    #[test]
    fn payloads_do_not_overlap() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(16).unwrap();
        let b = heap.alloc(16).unwrap();

        heap.payload_mut(a).unwrap().fill(0xAA);
        heap.payload_mut(b).unwrap().fill(0xBB);
        assert!(heap.payload(a).unwrap().iter().all(|&x| x == 0xAA));
        assert!(heap.payload(b).unwrap().iter().all(|&x| x == 0xBB));
    }

    #[test]
    fn payload_of_a_free_block_is_unreadable() {
        let mut arena = [0u8; ARENA];
        let mut heap = fresh_heap(&mut arena);
        let a = heap.alloc(16).unwrap();
        heap.free(a);
        assert!(heap.payload(a).is_none());
    }

    #[test]
    fn exhaustion_returns_none_without_corruption() {
        let mut arena = [0u8; 64];
        let mut heap = fresh_heap(&mut arena);
        // Genesis payload is 52 bytes.
        assert_eq!(heap.alloc(64), None);
        let a = heap.alloc(52).unwrap();
        assert_eq!(heap.alloc(4), None);
        assert_eq!(heap.free(a), FreeStatus::Freed);
        assert!(heap.alloc(52).is_some());
    }
}
