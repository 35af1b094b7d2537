//! Precomputed local connectivity kernels
//!
//! A kernel lists position offsets from an origin together with the source
//! element to connect and a baked-in weight. The table always ends with a
//! sentinel entry whose orientation is [`KernelEntry::SENTINEL`]; rules walk
//! the table until they reach it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One kernel offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KernelEntry {
    /// Column offset from the kernel origin
    pub dx: i32,
    /// Row offset from the kernel origin
    pub dy: i32,
    /// Source element (orientation) to connect
    pub orientation: u16,
    /// Weight in S16 fixed point (65536 is 1.0)
    pub weight: i32,
}

impl KernelEntry {
    /// Orientation value marking the end of the table
    pub const SENTINEL: u16 = u16::MAX;

    /// Create an entry
    pub const fn new(dx: i32, dy: i32, orientation: u16, weight: i32) -> Self {
        Self {
            dx,
            dy,
            orientation,
            weight,
        }
    }

    /// Whether this is the terminating entry
    pub const fn is_sentinel(&self) -> bool {
        self.orientation == Self::SENTINEL
    }
}

/// A sentinel-terminated kernel table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    entries: Vec<KernelEntry>,
}

impl Kernel {
    /// Build a kernel from its entries, appending the sentinel
    ///
    /// Any sentinel already present truncates the table at that point.
    pub fn new(entries: impl IntoIterator<Item = KernelEntry>) -> Self {
        let mut entries: Vec<KernelEntry> =
            entries.into_iter().take_while(|e| !e.is_sentinel()).collect();
        entries.push(KernelEntry::new(0, 0, KernelEntry::SENTINEL, 0));
        Self { entries }
    }

    /// Build a kernel by evaluating `f` over a `(2rx+1) × (2ry+1)` window for
    /// each of `nel` orientations; `None` leaves the offset out
    pub fn from_fn<F>(rx: u32, ry: u32, nel: u16, mut f: F) -> Self
    where
        F: FnMut(i32, i32, u16) -> Option<i32>,
    {
        let (rx, ry) = (rx as i32, ry as i32);
        let mut entries = Vec::new();
        for dy in -ry..=ry {
            for dx in -rx..=rx {
                for orientation in 0..nel {
                    if let Some(weight) = f(dx, dy, orientation) {
                        entries.push(KernelEntry::new(dx, dy, orientation, weight));
                    }
                }
            }
        }
        Self::new(entries)
    }

    /// Number of real entries (excluding the sentinel)
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    /// Whether the kernel holds no real entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry at `step`; steps past the end yield the sentinel
    pub fn entry(&self, step: u32) -> &KernelEntry {
        let last = self.entries.len() - 1;
        &self.entries[(step as usize).min(last)]
    }

    /// Real entries
    pub fn entries(&self) -> &[KernelEntry] {
        &self.entries[..self.len()]
    }

    /// Largest orientation used by any entry
    pub fn max_orientation(&self) -> Option<u16> {
        self.entries().iter().map(|e| e.orientation).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_appended() {
        let kernel = Kernel::new(vec![KernelEntry::new(1, 0, 0, 65536)]);
        assert_eq!(kernel.len(), 1);
        assert!(!kernel.entry(0).is_sentinel());
        assert!(kernel.entry(1).is_sentinel());
        assert!(kernel.entry(100).is_sentinel());
    }

    #[test]
    fn test_embedded_sentinel_truncates() {
        let kernel = Kernel::new(vec![
            KernelEntry::new(0, 0, 0, 1),
            KernelEntry::new(0, 0, KernelEntry::SENTINEL, 0),
            KernelEntry::new(5, 5, 0, 1),
        ]);
        assert_eq!(kernel.len(), 1);
    }

    #[test]
    fn test_from_fn_raster_order() {
        let kernel = Kernel::from_fn(1, 1, 2, |dx, dy, o| {
            if dx == 0 && dy == 0 {
                None
            } else {
                Some((dx + dy) * 100 + o as i32)
            }
        });
        assert_eq!(kernel.len(), 16);
        assert_eq!(kernel.entry(0), &KernelEntry::new(-1, -1, 0, -200));
        assert_eq!(kernel.entry(1), &KernelEntry::new(-1, -1, 1, -199));
        assert_eq!(kernel.max_orientation(), Some(1));
    }
}
