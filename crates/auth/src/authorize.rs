use thiserror::Error;

use insti_core::ClubId;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("event is owned by club '{owner}'")]
    NotOwner { owner: ClubId },
}

/// Require `permission`.
///
/// No IO, no panics.
pub fn authorize(principal: &Principal, permission: &Permission) -> Result<(), AuthzError> {
    if principal.has(permission) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(permission.as_str().to_string()))
    }
}

/// Require that the principal administers `owner`.
pub fn authorize_owner(principal: &Principal, owner: &ClubId) -> Result<(), AuthzError> {
    match &principal.club_id {
        Some(club_id) if club_id == owner => Ok(()),
        _ => Err(AuthzError::NotOwner {
            owner: owner.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insti_core::UserId;

    fn club_admin() -> Principal {
        Principal::club(UserId::new("demo_club"), ClubId::new("club_webops"))
    }

    #[test]
    fn role_permissions_decide_authorization() {
        let student = Principal::student(UserId::new("demo_student"));
        assert!(authorize(&student, &Permission::EVENTS_REGISTER).is_ok());
        assert_eq!(
            authorize(&student, &Permission::TOKENS_ISSUE),
            Err(AuthzError::Forbidden("tokens.issue".to_string()))
        );
        assert!(authorize(&club_admin(), &Permission::TOKENS_ISSUE).is_ok());
    }

    #[test]
    fn owner_check_compares_club_ids() {
        let principal = club_admin();
        assert!(authorize_owner(&principal, &ClubId::new("club_webops")).is_ok());
        assert!(matches!(
            authorize_owner(&principal, &ClubId::new("club_blockchain")),
            Err(AuthzError::NotOwner { .. })
        ));

        let student = Principal::student(UserId::new("s1"));
        assert!(authorize_owner(&student, &ClubId::new("club_webops")).is_err());
    }
}
