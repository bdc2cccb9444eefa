use serde::{Deserialize, Serialize};

use crate::Permission;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Club,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Club => "club",
        }
    }

    /// Permissions granted by this role.
    pub fn permissions(&self) -> Vec<Permission> {
        match self {
            Role::Student => vec![
                Permission::EVENTS_REGISTER,
                Permission::EVENTS_STAR,
                Permission::PROFILE_EDIT,
            ],
            Role::Club => vec![
                Permission::EVENTS_CREATE,
                Permission::EVENTS_STATUS_UPDATE,
                Permission::TOKENS_ISSUE,
                Permission::PROFILE_EDIT,
            ],
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "club" => Ok(Role::Club),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}
