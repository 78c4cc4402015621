//! Bolt protocol versions spoken by the driver.

use std::fmt;

/// Negotiable protocol versions.
///
/// On the wire a version is four bytes: reserved, range, minor, major. The
/// range byte lets one proposal cover `minor, minor - 1, ..., minor - range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoltVersion {
    /// Bolt 4.4 (Neo4j 4.4)
    V4_4,
    /// Bolt 5.0 (Neo4j 5.0): element ids, UTC date-times
    V5_0,
}

impl BoltVersion {
    /// Proposed versions, most preferred first.
    pub const PREFERRED: [BoltVersion; 2] = [BoltVersion::V5_0, BoltVersion::V4_4];

    pub fn major(self) -> u8 {
        match self {
            BoltVersion::V4_4 => 4,
            BoltVersion::V5_0 => 5,
        }
    }

    pub fn minor(self) -> u8 {
        match self {
            BoltVersion::V4_4 => 4,
            BoltVersion::V5_0 => 0,
        }
    }

    /// Proposal bytes with an empty range.
    pub fn to_bytes(self) -> [u8; 4] {
        [0, 0, self.minor(), self.major()]
    }

    /// Parse the server's answer. The range byte is ignored.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        match (bytes[3], bytes[2]) {
            (4, 4) => Some(BoltVersion::V4_4),
            (5, 0) => Some(BoltVersion::V5_0),
            _ => None,
        }
    }

    /// Nodes and relationships carry server-assigned element ids.
    pub fn has_element_ids(self) -> bool {
        self >= BoltVersion::V5_0
    }

    /// Date-times with an offset count seconds in UTC.
    pub fn has_utc_date_times(self) -> bool {
        self >= BoltVersion::V5_0
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}
