use insti_core::{ClubId, UserId};

use crate::{Permission, Role};

/// The signed-in account an operation is performed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    /// Club the account administers (club role only).
    pub club_id: Option<ClubId>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Principal with the permissions implied by `role`.
    pub fn new(user_id: UserId, role: Role, club_id: Option<ClubId>) -> Self {
        Self {
            user_id,
            role,
            club_id,
            permissions: role.permissions(),
        }
    }

    pub fn student(user_id: UserId) -> Self {
        Self::new(user_id, Role::Student, None)
    }

    pub fn club(user_id: UserId, club_id: ClubId) -> Self {
        Self::new(user_id, Role::Club, Some(club_id))
    }

    pub fn has(&self, permission: &Permission) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
