//! Source and target layer geometry
//!
//! A source array is `nx × ny` positions with `nel` elements at each
//! position; the source index (Lij) of element `e` at `(x, y)` is
//! `((y · nx) + x) · nel + e`. A target layer is `nx × ny` groups of `cpg`
//! cells each, numbered the same way.

use synarbor_storage::CellId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A possibly out-of-range source coordinate
///
/// Rules work in signed coordinates so that a region anchored outside the
/// array can still reach back into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Loc {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
    /// Element within the position
    pub e: i32,
}

impl Loc {
    /// Create a location
    pub const fn new(x: i32, y: i32, e: i32) -> Self {
        Self { x, y, e }
    }

    /// Shift by a position offset, keeping the element
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            e: self.e,
        }
    }

    /// Replace the element
    pub const fn with_element(self, e: i32) -> Self {
        Self { x: self.x, y: self.y, e }
    }
}

/// Extent of the source array feeding a connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceGeometry {
    /// Columns
    pub nx: u32,
    /// Rows
    pub ny: u32,
    /// Elements per position
    pub nel: u32,
}

impl SourceGeometry {
    /// Create a source geometry
    pub const fn new(nx: u32, ny: u32, nel: u32) -> Self {
        Self { nx, ny, nel }
    }

    /// Number of positions
    pub fn positions(&self) -> u64 {
        self.nx as u64 * self.ny as u64
    }

    /// Number of addressable source elements
    pub fn size(&self) -> u64 {
        self.positions() * self.nel as u64
    }

    /// Whether the position of `loc` lies inside the array
    ///
    /// Negative coordinates wrap to huge unsigned values, so one comparison
    /// per axis rejects both edges.
    #[inline]
    pub fn contains_position(&self, loc: Loc) -> bool {
        (loc.x as u32) < self.nx && (loc.y as u32) < self.ny
    }

    /// Whether `loc` addresses a real source element
    #[inline]
    pub fn contains(&self, loc: Loc) -> bool {
        self.contains_position(loc) && (loc.e as u32) < self.nel
    }

    /// Source index of `loc`, or `None` when it is out of range
    #[inline]
    pub fn index(&self, loc: Loc) -> Option<u32> {
        if !self.contains(loc) {
            return None;
        }
        let pos = loc.y as u64 * self.nx as u64 + loc.x as u64;
        Some((pos * self.nel as u64 + loc.e as u64) as u32)
    }

    /// Coordinates of source index `lij`
    pub fn locate(&self, lij: u32) -> Loc {
        let nel = self.nel.max(1);
        let nx = self.nx.max(1);
        let pos = lij / nel;
        Loc::new((pos % nx) as i32, (pos / nx) as i32, (lij % nel) as i32)
    }
}

/// Extent of the target layer (cells are arranged in groups)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TargetGeometry {
    /// Group columns
    pub nx: u32,
    /// Group rows
    pub ny: u32,
    /// Cells per group
    pub cpg: u32,
}

impl TargetGeometry {
    /// Create a target geometry
    pub const fn new(nx: u32, ny: u32, cpg: u32) -> Self {
        Self { nx, ny, cpg }
    }

    /// Number of groups
    pub fn groups(&self) -> u64 {
        self.nx as u64 * self.ny as u64
    }

    /// Number of cells
    pub fn size(&self) -> u64 {
        self.groups() * self.cpg as u64
    }

    /// Decompose a cell index into its group coordinates
    pub fn cell(&self, index: u32) -> TargetCell {
        let cpg = self.cpg.max(1);
        let nx = self.nx.max(1);
        let group = index / cpg;
        TargetCell {
            id: CellId::new(index),
            group,
            x: group % nx,
            y: group / nx,
            element: index % cpg,
        }
    }

    /// Every cell of the layer in index order
    pub fn cells(&self) -> impl Iterator<Item = TargetCell> + '_ {
        (0..self.size() as u32).map(move |i| self.cell(i))
    }

    /// Whether a source array has exactly this layer's shape
    pub fn matches(&self, source: &SourceGeometry) -> bool {
        self.nx == source.nx && self.ny == source.ny && self.cpg == source.nel
    }
}

/// Identity and group decomposition of the cell receiving an arbor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCell {
    /// Cell index within its layer
    pub id: CellId,
    /// Group number
    pub group: u32,
    /// Group column
    pub x: u32,
    /// Group row
    pub y: u32,
    /// Cell number within the group
    pub element: u32,
}

/// Position of a target group projected into source coordinates
///
/// The group centre is scaled by the ratio of the two grids, so identical
/// grids project each group onto the same position.
pub fn project(target: &TargetGeometry, cell: &TargetCell, source: &SourceGeometry) -> (i32, i32) {
    let scale = |t: u32, tn: u32, sn: u32| -> i32 {
        let tn = tn.max(1) as u64;
        (((2 * t as u64 + 1) * sn as u64) / (2 * tn)) as i32
    };
    (
        scale(cell.x, target.nx, source.nx),
        scale(cell.y, target.ny, source.ny),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_and_locate_agree() {
        let src = SourceGeometry::new(5, 4, 3);
        assert_eq!(src.size(), 60);
        for lij in 0..60 {
            let loc = src.locate(lij);
            assert_eq!(src.index(loc), Some(lij));
        }
    }

    #[test]
    fn test_negative_coordinates_rejected() {
        let src = SourceGeometry::new(5, 4, 1);
        assert!(src.index(Loc::new(-1, 0, 0)).is_none());
        assert!(src.index(Loc::new(0, -1, 0)).is_none());
        assert!(src.index(Loc::new(5, 0, 0)).is_none());
        assert!(src.index(Loc::new(0, 4, 0)).is_none());
        assert!(src.index(Loc::new(0, 0, 1)).is_none());
        assert!(src.index(Loc::new(0, 0, -1)).is_none());
        assert_eq!(src.index(Loc::new(4, 3, 0)), Some(19));
    }

    #[test]
    fn test_target_decomposition() {
        let tgt = TargetGeometry::new(4, 2, 3);
        let cell = tgt.cell(17);
        assert_eq!(cell.group, 5);
        assert_eq!((cell.x, cell.y, cell.element), (1, 1, 2));
        assert_eq!(tgt.cells().count(), 24);
    }

    #[test]
    fn test_projection() {
        let tgt = TargetGeometry::new(4, 4, 1);
        let same = SourceGeometry::new(4, 4, 1);
        for cell in tgt.cells() {
            assert_eq!(project(&tgt, &cell, &same), (cell.x as i32, cell.y as i32));
        }

        let double = SourceGeometry::new(8, 8, 1);
        let cell = tgt.cell(5); // group (1, 1)
        assert_eq!(project(&tgt, &cell, &double), (3, 3));
    }
}
