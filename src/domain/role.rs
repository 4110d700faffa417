//! Exclusive client roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role a connection may claim with an `identify` message.
///
/// At most one connection holds each role at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Headset / operator side. Receives `robot_status`.
    Vr,
    /// Robot side. Receives `vr_command`.
    Robot,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vr => "vr",
            Self::Robot => "robot",
        }
    }

    pub(crate) const fn to_tag(self) -> u8 {
        match self {
            Self::Vr => 1,
            Self::Robot => 2,
        }
    }

    pub(crate) const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Vr),
            2 => Some(Self::Robot),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vr" => Ok(Self::Vr),
            "robot" => Ok(Self::Robot),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
