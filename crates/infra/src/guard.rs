//! Checked access to a [`LedgerStore`] on behalf of a signed-in principal.
//!
//! Students act only on their own account; clubs only on events they own.
//! Registration is refused once an event is at capacity. All checks run
//! against state loaded under the store's write lock.

use insti_auth::{Permission, Principal, authorize, authorize_owner};
use insti_core::{DomainError, EventId, UserId};
use insti_events::{Envelope, EventBus};
use insti_ledger::{ClubEvent, EventStatus, LedgerActivity, LedgerState, NewEvent, User};
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};
use crate::storage::KeyValueStore;
use crate::store::{LedgerStore, ProfileUpdate, Registration, TokenIssue};

/// The principal an account acts as.
pub fn principal_for(user: &User) -> Principal {
    Principal::new(user.id.clone(), user.role, user.club_id.clone())
}

#[derive(Debug)]
pub struct GuardedLedger<'a, S, B> {
    store: &'a LedgerStore<S, B>,
    principal: Principal,
}

impl<'a, S, B> GuardedLedger<'a, S, B>
where
    S: KeyValueStore,
    B: EventBus<Envelope<LedgerActivity>>,
{
    pub fn new(store: &'a LedgerStore<S, B>, principal: Principal) -> Self {
        Self { store, principal }
    }

    /// Guard for whoever is signed in; `None` when nobody is.
    pub fn for_current_user(store: &'a LedgerStore<S, B>) -> LedgerResult<Option<Self>> {
        Ok(store
            .current_user()?
            .map(|user| Self::new(store, principal_for(&user))))
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn register(&self, event_id: &EventId) -> LedgerResult<Registration> {
        self.require(&Permission::EVENTS_REGISTER)?;
        let user_id = self.principal.user_id.clone();

        self.store.register_checked(event_id, &user_id, |state| {
            let event = existing_event(state, event_id)?;
            if !event.is_participant(&user_id) && event.is_full() {
                return Err(DomainError::CapacityExceeded {
                    event_id: event_id.to_string(),
                    capacity: event.capacity,
                }
                .into());
            }
            Ok(())
        })
    }

    pub fn unregister(&self, event_id: &EventId) -> LedgerResult<bool> {
        self.require(&Permission::EVENTS_REGISTER)?;
        self.store.unregister(event_id, &self.principal.user_id)
    }

    pub fn toggle_star(&self, event_id: &EventId) -> LedgerResult<bool> {
        self.require(&Permission::EVENTS_STAR)?;
        self.store
            .toggle_star(event_id, &self.principal.user_id)?
            .ok_or_else(|| DomainError::not_found("event", event_id).into())
    }

    /// Validate and create an event for the principal's club.
    pub fn create_event(&self, data: NewEvent) -> LedgerResult<ClubEvent> {
        self.require(&Permission::EVENTS_CREATE)?;
        let club_id = self
            .principal
            .club_id
            .clone()
            .ok_or_else(|| self.denied(DomainError::Unauthorized))?;
        data.validate()?;

        self.store
            .create_event_as(data, &club_id, Some(&self.principal.user_id))
    }

    pub fn update_event_status(
        &self,
        event_id: &EventId,
        status: EventStatus,
    ) -> LedgerResult<ClubEvent> {
        self.require(&Permission::EVENTS_STATUS_UPDATE)?;
        self.store
            .update_event_status_checked(event_id, status, Some(&self.principal.user_id), |state| {
                self.require_owner(state, event_id)
            })?
            .ok_or_else(|| DomainError::not_found("event", event_id).into())
    }

    pub fn issue_tokens_to_participants(
        &self,
        event_id: &EventId,
        user_ids: &[UserId],
    ) -> LedgerResult<TokenIssue> {
        self.require(&Permission::TOKENS_ISSUE)?;
        self.store
            .issue_tokens_checked(event_id, user_ids, Some(&self.principal.user_id), |state| {
                self.require_owner(state, event_id)
            })?
            .ok_or_else(|| DomainError::not_found("event", event_id).into())
    }

    pub fn update_profile(&self, update: ProfileUpdate) -> LedgerResult<User> {
        self.require(&Permission::PROFILE_EDIT)?;
        let user_id = &self.principal.user_id;
        self.store
            .update_profile(user_id, update)?
            .ok_or_else(|| DomainError::not_found("user", user_id).into())
    }

    fn require(&self, permission: &Permission) -> LedgerResult<()> {
        authorize(&self.principal, permission).map_err(|e| self.denied(e))
    }

    fn require_owner(&self, state: &LedgerState, event_id: &EventId) -> LedgerResult<()> {
        let event = existing_event(state, event_id)?;
        authorize_owner(&self.principal, &event.club_id).map_err(|e| self.denied(e))
    }

    fn denied(&self, err: impl Into<LedgerError>) -> LedgerError {
        let err = err.into();
        warn!(
            user_id = %self.principal.user_id,
            role = %self.principal.role,
            error = %err,
            "ledger operation denied"
        );
        err
    }
}

fn existing_event<'s>(state: &'s LedgerState, event_id: &EventId) -> LedgerResult<&'s ClubEvent> {
    state
        .event(event_id)
        .ok_or_else(|| DomainError::not_found("event", event_id).into())
}
