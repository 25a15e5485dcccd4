//! Club positions.

use serde::{Deserialize, Serialize};

/// Position a member holds inside one club.
///
/// Serialized with the capitalized names stored in club documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClubRole {
    /// May run every club-management action.
    President,
    /// Regular member.
    #[default]
    Member,
}

impl ClubRole {
    /// Stable label used in documents and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::President => "President",
            Self::Member => "Member",
        }
    }
}
