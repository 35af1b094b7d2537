//! Arbor buffers: accepted-synapse payload plus a packed skip list
//!
//! An arbor of `nc` candidate synapses occupies exactly `nc` slots. Accepted
//! source indices fill the buffer from the front; rejected candidate numbers
//! are written from the back, one slot lower per skip, so a fully generated
//! arbor always satisfies `accepted + skipped == nc` with no free slot left.
//! Skips are read back in the order they were written.
//!
//! Compaction discards the payload and keeps only the skip tail, which is all
//! that regeneration needs.

use crate::error::{Result, StorageError};

/// Storage for one (cell, connection type) arbor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArborBuffer {
    nc: u32,
    slots: Vec<u32>,
    accepted: u32,
    skipped: u32,
    strengths: Vec<i16>,
    payload: bool,
}

impl ArborBuffer {
    /// Empty buffer for an arbor of `nc` candidate synapses
    pub fn new(nc: u32) -> Self {
        Self {
            nc,
            slots: vec![0; nc as usize],
            accepted: 0,
            skipped: 0,
            strengths: Vec::new(),
            payload: true,
        }
    }

    /// Rebuild a buffer from previously exported parts
    ///
    /// `skips` must be ascending candidate numbers. Strengths are optional;
    /// when present there must be one per accepted synapse.
    pub fn from_parts(nc: u32, lij: &[u32], skips: &[u32], strengths: &[i16]) -> Result<Self> {
        if lij.len() + skips.len() > nc as usize {
            return Err(StorageError::BufferFull { capacity: nc });
        }
        if !strengths.is_empty() && strengths.len() != lij.len() {
            return Err(StorageError::invalid_format(format!(
                "{} strengths for {} accepted synapses",
                strengths.len(),
                lij.len()
            )));
        }
        if skips.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StorageError::invalid_format("skip list is not ascending"));
        }

        let mut buffer = Self::new(nc);
        for &l in lij {
            buffer.push_accepted(l)?;
        }
        for &s in skips {
            buffer.push_skip(s)?;
        }
        buffer.strengths = strengths.to_vec();
        Ok(buffer)
    }

    /// Declared synapse count
    pub fn nc(&self) -> u32 {
        self.nc
    }

    /// Number of accepted synapses recorded
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    /// Number of skipped candidates recorded
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    /// Whether every candidate has been accounted for
    pub fn is_complete(&self) -> bool {
        self.accepted + self.skipped == self.nc
    }

    /// Whether the accepted payload is still held
    pub fn has_payload(&self) -> bool {
        self.payload
    }

    fn used(&self) -> u32 {
        self.accepted + self.skipped
    }

    /// Append an accepted source index
    pub fn push_accepted(&mut self, lij: u32) -> Result<()> {
        if !self.payload {
            return Err(StorageError::PayloadDiscarded);
        }
        if self.used() >= self.nc {
            return Err(StorageError::BufferFull { capacity: self.nc });
        }
        self.slots[self.accepted as usize] = lij;
        self.accepted += 1;
        Ok(())
    }

    /// Attach the 16-bit strength of the most recently accepted synapse
    pub fn push_strength(&mut self, strength: i16) -> Result<()> {
        if !self.payload {
            return Err(StorageError::PayloadDiscarded);
        }
        if self.strengths.len() >= self.accepted as usize {
            return Err(StorageError::OutOfBounds {
                index: self.strengths.len(),
                max: self.accepted as usize,
            });
        }
        self.strengths.push(strength);
        Ok(())
    }

    /// Record a rejected candidate number in the tail
    pub fn push_skip(&mut self, jsyn: u32) -> Result<()> {
        if !self.payload {
            return Err(StorageError::PayloadDiscarded);
        }
        if self.used() >= self.nc {
            return Err(StorageError::BufferFull { capacity: self.nc });
        }
        debug_assert!(self.skips().last().map_or(true, |prev| prev < jsyn));
        let slot = self.slots.len() - 1 - self.skipped as usize;
        self.slots[slot] = jsyn;
        self.skipped += 1;
        Ok(())
    }

    /// Skipped candidate numbers in the order they were written
    pub fn skips(&self) -> impl Iterator<Item = u32> + '_ {
        let top = self.slots.len();
        (0..self.skipped as usize).map(move |k| self.slots[top - 1 - k])
    }

    /// The `k`th skip in write order
    pub fn skip_at(&self, k: u32) -> Option<u32> {
        if k >= self.skipped {
            return None;
        }
        Some(self.slots[self.slots.len() - 1 - k as usize])
    }

    /// Accepted source index number `isyn`
    pub fn lij(&self, isyn: u32) -> Result<u32> {
        if !self.payload {
            return Err(StorageError::PayloadDiscarded);
        }
        if isyn >= self.accepted {
            return Err(StorageError::OutOfBounds {
                index: isyn as usize,
                max: self.accepted as usize,
            });
        }
        Ok(self.slots[isyn as usize])
    }

    /// All accepted source indices
    pub fn accepted_lij(&self) -> Result<&[u32]> {
        if !self.payload {
            return Err(StorageError::PayloadDiscarded);
        }
        Ok(&self.slots[..self.accepted as usize])
    }

    /// Stored strength of accepted synapse `isyn`, if strengths were kept
    pub fn strength(&self, isyn: u32) -> Option<i16> {
        self.strengths.get(isyn as usize).copied()
    }

    /// Whether a strength is stored for every accepted synapse
    pub fn has_strengths(&self) -> bool {
        self.payload && self.accepted > 0 && self.strengths.len() == self.accepted as usize
    }

    /// Drop the payload, keeping only the skip list
    pub fn compact(&mut self) {
        if !self.payload {
            return;
        }
        let tail_start = self.slots.len() - self.skipped as usize;
        self.slots = self.slots[tail_start..].to_vec();
        self.strengths = Vec::new();
        self.payload = false;
        log::trace!(
            "compacted arbor: {} accepted dropped, {} skips kept",
            self.accepted,
            self.skipped
        );
    }

    /// Approximate heap footprint in bytes
    pub fn memory_bytes(&self) -> usize {
        self.slots.capacity() * core::mem::size_of::<u32>()
            + self.strengths.capacity() * core::mem::size_of::<i16>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_and_tail_share_slots() {
        let mut buf = ArborBuffer::new(5);
        buf.push_accepted(40).unwrap();
        buf.push_skip(1).unwrap();
        buf.push_accepted(41).unwrap();
        buf.push_skip(3).unwrap();
        buf.push_accepted(42).unwrap();

        assert!(buf.is_complete());
        assert_eq!(buf.accepted_lij().unwrap(), &[40, 41, 42]);
        assert_eq!(buf.skips().collect::<Vec<_>>(), vec![1, 3]);
        assert!(matches!(buf.push_skip(4), Err(StorageError::BufferFull { capacity: 5 })));
        assert!(matches!(buf.push_accepted(7), Err(StorageError::BufferFull { .. })));
    }

    #[test]
    fn test_tail_written_in_descending_slots() {
        let mut buf = ArborBuffer::new(4);
        buf.push_skip(0).unwrap();
        buf.push_skip(2).unwrap();
        assert_eq!(buf.slots[3], 0);
        assert_eq!(buf.slots[2], 2);
    }

    #[test]
    fn test_compaction_keeps_skips_only() {
        let mut buf = ArborBuffer::new(6);
        for (j, accept) in [true, false, true, true, false, true].iter().enumerate() {
            if *accept {
                buf.push_accepted(100 + j as u32).unwrap();
                buf.push_strength(j as i16).unwrap();
            } else {
                buf.push_skip(j as u32).unwrap();
            }
        }
        assert!(buf.has_strengths());
        let before = buf.memory_bytes();

        buf.compact();
        assert!(!buf.has_payload());
        assert!(!buf.has_strengths());
        assert_eq!(buf.accepted(), 4);
        assert_eq!(buf.skips().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(buf.skip_at(1), Some(4));
        assert_eq!(buf.skip_at(2), None);
        assert!(buf.memory_bytes() < before);
        assert!(matches!(buf.lij(0), Err(StorageError::PayloadDiscarded)));
        assert!(matches!(buf.push_skip(5), Err(StorageError::PayloadDiscarded)));
    }

    #[test]
    fn test_from_parts() {
        let buf = ArborBuffer::from_parts(4, &[9, 8], &[0, 3], &[10, -10]).unwrap();
        assert!(buf.is_complete());
        assert_eq!(buf.lij(1).unwrap(), 8);
        assert_eq!(buf.strength(1), Some(-10));
        assert_eq!(buf.skips().collect::<Vec<_>>(), vec![0, 3]);

        assert!(ArborBuffer::from_parts(2, &[1, 2], &[0], &[]).is_err());
        assert!(ArborBuffer::from_parts(4, &[1], &[2, 1], &[]).is_err());
        assert!(ArborBuffer::from_parts(4, &[1, 2], &[], &[5]).is_err());
    }

    #[test]
    fn test_strength_needs_accepted_synapse() {
        let mut buf = ArborBuffer::new(2);
        assert!(buf.push_strength(1).is_err());
        buf.push_accepted(3).unwrap();
        buf.push_strength(1).unwrap();
        assert!(buf.push_strength(2).is_err());
    }
}
