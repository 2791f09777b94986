use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Role stored on a contributor row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Read,
    Write,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "admin" => Ok(Self::Admin),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a git request does to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective access an actor holds on a repository, weakest first.
///
/// Ownership (direct, or through organization membership) is never stored as
/// a contributor row but ranks above every role, so both paths collapse into
/// one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    PublicRead,
    Read,
    Write,
    Admin,
    Owner,
}

impl Capability {
    /// Returns true if this capability is sufficient for the operation.
    #[must_use]
    pub fn permits(self, operation: Operation) -> bool {
        match operation {
            Operation::Read => self >= Self::PublicRead,
            Operation::Write => self >= Self::Write,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicRead => "public-read",
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl From<Role> for Capability {
    fn from(role: Role) -> Self {
        match role {
            Role::Read => Self::Read,
            Role::Write => Self::Write,
            Role::Admin => Self::Admin,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_ordering() {
        assert!(Capability::Owner > Capability::Admin);
        assert!(Capability::Admin > Capability::Write);
        assert!(Capability::Write > Capability::Read);
        assert!(Capability::Read > Capability::PublicRead);
    }

    #[test]
    fn test_capability_permits() {
        assert!(Capability::PublicRead.permits(Operation::Read));
        assert!(!Capability::PublicRead.permits(Operation::Write));
        assert!(Capability::Read.permits(Operation::Read));
        assert!(!Capability::Read.permits(Operation::Write));
        assert!(Capability::Write.permits(Operation::Write));
        assert!(Capability::Admin.permits(Operation::Write));
        assert!(Capability::Owner.permits(Operation::Write));
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("read".parse::<Role>().unwrap(), Role::Read);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!(matches!("owner".parse::<Role>(), Err(Error::InvalidRole(_))));
    }
}
