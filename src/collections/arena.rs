//! Fixed-slot arena backing one table.
//!
//! A slot is `left child | right child | row payload`, child links being
//! 32-bit arena indices. Free slots are threaded into a singly linked list
//! through the left-child field, so a slot's first four bytes are either a
//! tree link or the next free index depending on which set the slot is in;
//! the table controller keeps the two sets disjoint by releasing only slots
//! just severed from the tree.

use crate::config::NIL;
use crate::error::TableError;
use crate::Result;

/// Byte offset of the row payload inside a slot (two child indices).
pub const SLOT_HEADER: usize = 2 * std::mem::size_of::<u32>();

pub struct Arena {
    buf: Vec<u8>,
    /// Cached subtree heights, one per slot. Kept out of the slot buffer so
    /// the row layout stays `left,right,key,fields`.
    heights: Vec<u8>,
    slot_size: usize,
    capacity: u32,
    free_head: u32,
}

impl Arena {
    /// Allocates `capacity` zeroed slots and threads `0..capacity` into the
    /// free list, the last slot pointing at the sentinel.
    pub fn new(capacity: u32, slot_size: usize) -> Result<Arena> {
        debug_assert!(slot_size >= SLOT_HEADER);
        debug_assert!(capacity >= 1);
        let bytes = capacity as usize * slot_size;
        let mut buf = Vec::new();
        buf.try_reserve_exact(bytes)
            .map_err(|_| TableError::OutOfMemory)?;
        buf.resize(bytes, 0);
        let mut heights = Vec::new();
        heights
            .try_reserve_exact(capacity as usize)
            .map_err(|_| TableError::OutOfMemory)?;
        heights.resize(capacity as usize, 0);

        let mut arena = Arena {
            buf,
            heights,
            slot_size,
            capacity,
            free_head: 0,
        };
        for idx in 0..capacity {
            let next = if idx + 1 == capacity { NIL } else { idx + 1 };
            arena.set_left(idx, next);
        }
        Ok(arena)
    }

    /// Detach and return the head of the free list; `None` when exhausted.
    /// The returned slot starts out as a childless leaf.
    pub fn take_empty(&mut self) -> Option<u32> {
        if self.free_head == NIL {
            return None;
        }
        let idx = self.free_head;
        self.free_head = self.left(idx);
        self.set_left(idx, NIL);
        self.set_right(idx, NIL);
        self.heights[idx as usize] = 0;
        Some(idx)
    }

    /// Push a slot back onto the free list. The slot must have just been
    /// severed from the tree.
    pub fn release(&mut self, idx: u32) {
        self.set_left(idx, self.free_head);
        self.free_head = idx;
    }

    pub fn slot(&self, idx: u32) -> &[u8] {
        let offset = idx as usize * self.slot_size;
        &self.buf[offset..offset + self.slot_size]
    }

    pub fn slot_mut(&mut self, idx: u32) -> &mut [u8] {
        let offset = idx as usize * self.slot_size;
        &mut self.buf[offset..offset + self.slot_size]
    }

    pub fn left(&self, idx: u32) -> u32 {
        self.link(idx as usize * self.slot_size)
    }

    pub fn right(&self, idx: u32) -> u32 {
        self.link(idx as usize * self.slot_size + 4)
    }

    pub fn set_left(&mut self, idx: u32, to: u32) {
        let offset = idx as usize * self.slot_size;
        self.buf[offset..offset + 4].copy_from_slice(&to.to_le_bytes());
    }

    pub fn set_right(&mut self, idx: u32, to: u32) {
        let offset = idx as usize * self.slot_size + 4;
        self.buf[offset..offset + 4].copy_from_slice(&to.to_le_bytes());
    }

    /// Cached height of the subtree rooted at `idx`; leaves have height 0
    /// and the sentinel -1.
    pub fn height(&self, idx: u32) -> i8 {
        if idx == NIL {
            -1
        } else {
            self.heights[idx as usize] as i8
        }
    }

    pub fn set_height(&mut self, idx: u32, height: i8) {
        debug_assert!(height >= 0);
        self.heights[idx as usize] = height as u8;
    }

    /// Copy the row payload (key and fields, not the child links) between
    /// slots.
    pub fn copy_payload(&mut self, to: u32, from: u32) {
        if to == from {
            return;
        }
        let len = self.slot_size - SLOT_HEADER;
        let from_offset = from as usize * self.slot_size + SLOT_HEADER;
        let to_offset = to as usize * self.slot_size + SLOT_HEADER;
        self.buf.copy_within(from_offset..from_offset + len, to_offset);
    }

    #[cfg(test)]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[cfg(test)]
    pub fn free_slots(&self) -> u32 {
        let mut count = 0;
        let mut cursor = self.free_head;
        while cursor != NIL {
            count += 1;
            cursor = self.left(cursor);
        }
        count
    }

    fn link(&self, offset: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.clone_from_slice(&self.buf[offset..offset + 4]);
        u32::from_le_bytes(raw)
    }
}
