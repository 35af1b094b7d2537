//! ID types for the storage layer

use core::fmt;

/// Index of a cell within its layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(pub u32);

impl CellId {
    /// Create a new cell ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell {}", self.0)
    }
}

/// Relative connection-type number on a target cell type
///
/// Connection types are numbered from 1 within their target cell type; 0 is
/// never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnTypeId(pub u16);

impl ConnTypeId {
    /// Create a new connection type ID
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Invalid connection type ID constant
    pub const INVALID: Self = Self(0);

    /// Check if this is a valid connection type ID
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ConnTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CT{}", self.0)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::{Deserialize, Serialize};

    impl Serialize for CellId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            self.0.serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for CellId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let id = u32::deserialize(deserializer)?;
            Ok(CellId::new(id))
        }
    }

    impl Serialize for ConnTypeId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            self.0.serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for ConnTypeId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let id = u16::deserialize(deserializer)?;
            Ok(ConnTypeId::new(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_id() {
        let cell = CellId::new(42);
        assert_eq!(cell.raw(), 42);
        assert_eq!(format!("{}", cell), "cell 42");
    }

    #[test]
    fn test_conntype_id() {
        let ct = ConnTypeId::new(3);
        assert_eq!(ct.raw(), 3);
        assert!(ct.is_valid());
        assert!(!ConnTypeId::INVALID.is_valid());
        assert_eq!(format!("{}", ct), "CT3");
    }

    #[test]
    fn test_ordering() {
        assert!(CellId::new(1) < CellId::new(2));
        assert!(ConnTypeId::new(1) < ConnTypeId::new(2));
    }
}
