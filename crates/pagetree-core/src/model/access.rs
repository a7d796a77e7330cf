use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::{fmt, str::FromStr};

use super::node::ParseEnumError;

/// Access level on a page, strongest first: Owner > Admin > Edit > Comment >
/// View > Restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRole {
    Owner,
    Admin,
    Edit,
    Comment,
    View,
    Restricted,
}

impl AccessRole {
    pub const ALL: [Self; 6] = [
        Self::Owner,
        Self::Admin,
        Self::Edit,
        Self::Comment,
        Self::View,
        Self::Restricted,
    ];

    /// Numeric strength; higher grants more.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Owner => 5,
            Self::Admin => 4,
            Self::Edit => 3,
            Self::Comment => 2,
            Self::View => 1,
            Self::Restricted => 0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Edit => "edit",
            Self::Comment => "comment",
            Self::View => "view",
            Self::Restricted => "restricted",
        }
    }

    /// Whether this role is at least as strong as `other`.
    #[must_use]
    pub fn includes(self, other: Self) -> bool {
        self >= other
    }
}

impl PartialOrd for AccessRole {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccessRole {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for AccessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| ParseEnumError {
                expected: "role",
                got: s.to_string(),
            })
    }
}

/// One row of a page's access roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub user: String,
    pub role: AccessRole,
    pub granted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_order_strongest_first() {
        let mut roles = AccessRole::ALL.to_vec();
        roles.sort_by(|a, b| b.cmp(a));
        assert_eq!(roles, AccessRole::ALL.to_vec());
        assert!(AccessRole::Owner > AccessRole::Admin);
        assert!(AccessRole::View > AccessRole::Restricted);
    }

    #[test]
    fn includes_is_reflexive_and_downward() {
        assert!(AccessRole::Edit.includes(AccessRole::Edit));
        assert!(AccessRole::Edit.includes(AccessRole::Comment));
        assert!(!AccessRole::Comment.includes(AccessRole::Edit));
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in AccessRole::ALL {
            assert_eq!(role.as_str().parse::<AccessRole>(), Ok(role));
        }
        assert!("superuser".parse::<AccessRole>().is_err());
    }
}
