//! Repository over the persisted ledger collections.
//!
//! Every operation runs the same cycle:
//!
//! ```text
//! lock → load users + events (with revisions)
//!      → LedgerState::handle (pure decision)
//!      → apply → save touched collections (revision CAS)
//!      → publish activity envelopes → unlock
//! ```
//!
//! Envelopes are sequenced while the lock is held, so sequence order is
//! commit order.
//!
//! Unknown user or event ids are no-ops, reported through the return value
//! rather than an error. Capacity and permissions are not checked here; see
//! [`crate::guard::GuardedLedger`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use insti_core::{Clock, ClubId, EventId, ExpectedRevision, SystemClock, UserId};
use insti_events::{Envelope, EventBus};
use insti_ledger::seed::{sample_events, sample_users};
use insti_ledger::{
    ClubEvent, CreateEvent, EventStatus, IssueTokens, LedgerActivity, LedgerCommand, LedgerState,
    NewEvent, Register, Role, SignIn, ToggleStar, Unregister, UpdateEventStatus, UpdateProfile,
    User, generate_roll_number,
};

use crate::config::DEFAULT_KEY_PREFIX;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{KeyValueStore, StoreError};

/// Storage keys for one ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerKeys {
    pub users: String,
    pub events: String,
    pub current_user: String,
}

impl LedgerKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            users: format!("{prefix}users"),
            events: format!("{prefix}events"),
            current_user: format!("{prefix}currentUser"),
        }
    }
}

impl Default for LedgerKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_KEY_PREFIX)
    }
}

/// Outcome of [`LedgerStore::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Added to the participants; `tokens_credited` is set when the event
    /// was already completed and the reward was paid out on the spot.
    Registered { tokens_credited: Option<u64> },
    AlreadyRegistered,
    /// Unknown event or user.
    Ignored,
}

/// Outcome of [`LedgerStore::issue_tokens_to_participants`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TokenIssue {
    pub credited: Vec<UserId>,
    /// Requested ids that were unknown, repeated or already credited.
    pub skipped: Vec<UserId>,
    pub amount_per_user: u64,
}

/// Profile fields to overwrite; `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub roll_number: Option<String>,
}

struct Loaded {
    state: LedgerState,
    users_revision: u64,
    events_revision: u64,
}

/// Runs ledger commands against a [`KeyValueStore`] and publishes what
/// changed on an [`EventBus`].
pub struct LedgerStore<S, B> {
    kv: S,
    bus: B,
    clock: Arc<dyn Clock>,
    keys: LedgerKeys,
    write_lock: Mutex<()>,
    sequence: AtomicU64,
}

impl<S, B> core::fmt::Debug for LedgerStore<S, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedgerStore")
            .field("keys", &self.keys)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl<S, B> LedgerStore<S, B> {
    pub fn new(kv: S, bus: B) -> Self {
        Self {
            kv,
            bus,
            clock: Arc::new(SystemClock),
            keys: LedgerKeys::default(),
            write_lock: Mutex::new(()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.keys = LedgerKeys::with_prefix(prefix);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn keys(&self) -> &LedgerKeys {
        &self.keys
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Date used for schedule-derived status.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| LedgerError::Store(StoreError::Poisoned))
    }
}

impl<S, B> LedgerStore<S, B>
where
    S: KeyValueStore,
    B: EventBus<Envelope<LedgerActivity>>,
{
    /// Seed the demo users and events into whichever collection is absent.
    ///
    /// Returns whether anything was written.
    pub fn initialize(&self) -> LedgerResult<bool> {
        let _guard = self.lock()?;
        let mut seeded = false;

        if self.kv.get(&self.keys.users)?.is_none() {
            self.write(&self.keys.users, &sample_users(), ExpectedRevision::Exact(0))?;
            seeded = true;
        }
        if self.kv.get(&self.keys.events)?.is_none() {
            self.write(&self.keys.events, &sample_events(), ExpectedRevision::Exact(0))?;
            seeded = true;
        }

        if seeded {
            info!(users_key = %self.keys.users, events_key = %self.keys.events, "seeded sample data");
        }
        Ok(seeded)
    }

    /// Current contents of both collections.
    pub fn state(&self) -> LedgerResult<LedgerState> {
        Ok(self.load()?.state)
    }

    pub fn users(&self) -> LedgerResult<Vec<User>> {
        Ok(self.read_collection::<User>(&self.keys.users)?.0)
    }

    pub fn events(&self) -> LedgerResult<Vec<ClubEvent>> {
        Ok(self.read_collection::<ClubEvent>(&self.keys.events)?.0)
    }

    pub fn user(&self, user_id: &UserId) -> LedgerResult<Option<User>> {
        Ok(self.users()?.into_iter().find(|u| &u.id == user_id))
    }

    pub fn event(&self, event_id: &EventId) -> LedgerResult<Option<ClubEvent>> {
        Ok(self.events()?.into_iter().find(|e| &e.id == event_id))
    }

    /// The signed-in user, if the session pointer resolves to one.
    pub fn current_user(&self) -> LedgerResult<Option<User>> {
        match self.current_user_id()? {
            Some(user_id) => self.user(&user_id),
            None => Ok(None),
        }
    }

    pub fn current_user_id(&self) -> LedgerResult<Option<UserId>> {
        match self.kv.get(&self.keys.current_user)? {
            Some(stored) => Ok(Some(serde_json::from_value(stored.value)?)),
            None => Ok(None),
        }
    }

    /// Sign in by email, creating the account on first use. A new club
    /// account administers the default club.
    pub fn sign_in(&self, email: &str, role: Role) -> LedgerResult<User> {
        self.sign_in_inner(email, role, None)
    }

    /// Sign in (or sign up) as the administrator of `club_id`.
    pub fn sign_in_with_club(&self, email: &str, club_id: ClubId) -> LedgerResult<User> {
        self.sign_in_inner(email, Role::Club, Some(club_id))
    }

    fn sign_in_inner(&self, email: &str, role: Role, club_id: Option<ClubId>) -> LedgerResult<User> {
        let new_user_id = UserId::generate();
        let command = LedgerCommand::SignIn(SignIn {
            email: email.to_string(),
            role,
            club_id,
            new_user_id: new_user_id.clone(),
            roll_number: generate_roll_number(),
            occurred_at: self.clock.now(),
        });

        // Only a sign-up emits activities, and its actor is the new account.
        let _guard = self.lock()?;
        let (state, activities) = self.run(&command, Some(&new_user_id), |_| Ok(()))?;
        let user = state
            .user_by_email(email)
            .cloned()
            .ok_or_else(|| insti_core::DomainError::not_found("user", email.trim()))?;
        self.set_session(&user.id)?;
        drop(_guard);

        if activities.is_empty() {
            info!(user_id = %user.id, "signed in");
        } else {
            info!(user_id = %user.id, role = %user.role, "signed up");
        }
        Ok(user)
    }

    /// Point the session at an existing account (demo login).
    pub fn sign_in_as(&self, user_id: &UserId) -> LedgerResult<Option<User>> {
        let _guard = self.lock()?;
        let Some(user) = self.user(user_id)? else {
            debug!(user_id = %user_id, "sign-in as unknown user ignored");
            return Ok(None);
        };
        self.set_session(&user.id)?;
        info!(user_id = %user.id, "signed in");
        Ok(Some(user))
    }

    pub fn sign_out(&self) -> LedgerResult<()> {
        let _guard = self.lock()?;
        self.kv
            .remove(&self.keys.current_user, ExpectedRevision::Any)?;
        info!("signed out");
        Ok(())
    }

    pub fn register(&self, event_id: &EventId, user_id: &UserId) -> LedgerResult<Registration> {
        self.register_checked(event_id, user_id, |_| Ok(()))
    }

    /// [`Self::register`] with an extra check run against freshly loaded
    /// state while the write lock is held.
    pub(crate) fn register_checked(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        check: impl FnOnce(&LedgerState) -> LedgerResult<()>,
    ) -> LedgerResult<Registration> {
        let command = LedgerCommand::Register(Register {
            event_id: event_id.clone(),
            user_id: user_id.clone(),
            occurred_at: self.clock.now(),
        });

        let (state, activities) = self.execute(&command, Some(user_id), check)?;

        let registration = if !activities.is_empty() {
            let tokens_credited = activities.iter().find_map(|a| match a {
                LedgerActivity::TokensCredited(c) => Some(c.amount),
                _ => None,
            });
            info!(
                event_id = %event_id,
                user_id = %user_id,
                tokens_credited = tokens_credited.unwrap_or(0),
                "registered for event"
            );
            Registration::Registered { tokens_credited }
        } else if state
            .event(event_id)
            .is_some_and(|e| e.is_participant(user_id))
        {
            debug!(event_id = %event_id, user_id = %user_id, "already registered");
            Registration::AlreadyRegistered
        } else {
            debug!(event_id = %event_id, user_id = %user_id, "registration ignored");
            Registration::Ignored
        };

        Ok(registration)
    }

    /// Returns whether the user was a participant.
    pub fn unregister(&self, event_id: &EventId, user_id: &UserId) -> LedgerResult<bool> {
        let command = LedgerCommand::Unregister(Unregister {
            event_id: event_id.clone(),
            user_id: user_id.clone(),
            occurred_at: self.clock.now(),
        });

        let (_, activities) = self.execute(&command, Some(user_id), |_| Ok(()))?;
        let removed = !activities.is_empty();
        if removed {
            info!(event_id = %event_id, user_id = %user_id, "unregistered from event");
        } else {
            debug!(event_id = %event_id, user_id = %user_id, "unregister ignored");
        }

        Ok(removed)
    }

    /// Flip the star; returns the new state, `None` for an unknown event.
    pub fn toggle_star(&self, event_id: &EventId, user_id: &UserId) -> LedgerResult<Option<bool>> {
        let command = LedgerCommand::ToggleStar(ToggleStar {
            event_id: event_id.clone(),
            user_id: user_id.clone(),
            occurred_at: self.clock.now(),
        });

        let (_, activities) = self.execute(&command, Some(user_id), |_| Ok(()))?;
        let starred = activities.iter().find_map(|a| match a {
            LedgerActivity::StarToggled(t) => Some(t.starred),
            _ => None,
        });
        match starred {
            Some(starred) => debug!(event_id = %event_id, user_id = %user_id, starred, "star toggled"),
            None => debug!(event_id = %event_id, "toggle star on unknown event ignored"),
        }

        Ok(starred)
    }

    /// Create an upcoming event owned by `club_id` under a fresh id.
    pub fn create_event(&self, data: NewEvent, club_id: &ClubId) -> LedgerResult<ClubEvent> {
        self.create_event_as(data, club_id, None)
    }

    pub(crate) fn create_event_as(
        &self,
        data: NewEvent,
        club_id: &ClubId,
        actor: Option<&UserId>,
    ) -> LedgerResult<ClubEvent> {
        let event_id = EventId::generate();
        let command = LedgerCommand::CreateEvent(CreateEvent {
            event_id: event_id.clone(),
            club_id: club_id.clone(),
            data,
            occurred_at: self.clock.now(),
        });

        let (state, _) = self.execute(&command, actor, |_| Ok(()))?;
        let event = state
            .event(&event_id)
            .cloned()
            .ok_or_else(|| insti_core::DomainError::not_found("event", &event_id))?;
        info!(event_id = %event.id, club_id = %club_id, name = %event.name, "event created");

        Ok(event)
    }

    /// Overwrite the stored status. `None` for an unknown event.
    pub fn update_event_status(
        &self,
        event_id: &EventId,
        status: EventStatus,
    ) -> LedgerResult<Option<ClubEvent>> {
        self.update_event_status_checked(event_id, status, None, |_| Ok(()))
    }

    pub(crate) fn update_event_status_checked(
        &self,
        event_id: &EventId,
        status: EventStatus,
        actor: Option<&UserId>,
        check: impl FnOnce(&LedgerState) -> LedgerResult<()>,
    ) -> LedgerResult<Option<ClubEvent>> {
        let command = LedgerCommand::UpdateEventStatus(UpdateEventStatus {
            event_id: event_id.clone(),
            status,
            occurred_at: self.clock.now(),
        });

        let (state, _) = self.execute(&command, actor, check)?;
        let event = state.event(event_id).cloned();
        match &event {
            Some(_) => info!(event_id = %event_id, status = %status, "event status updated"),
            None => debug!(event_id = %event_id, "status update on unknown event ignored"),
        }

        Ok(event)
    }

    /// Credit each listed user once for the event and mark it completed.
    /// `None` for an unknown event.
    pub fn issue_tokens_to_participants(
        &self,
        event_id: &EventId,
        user_ids: &[UserId],
    ) -> LedgerResult<Option<TokenIssue>> {
        self.issue_tokens_checked(event_id, user_ids, None, |_| Ok(()))
    }

    pub(crate) fn issue_tokens_checked(
        &self,
        event_id: &EventId,
        user_ids: &[UserId],
        actor: Option<&UserId>,
        check: impl FnOnce(&LedgerState) -> LedgerResult<()>,
    ) -> LedgerResult<Option<TokenIssue>> {
        let command = LedgerCommand::IssueTokens(IssueTokens {
            event_id: event_id.clone(),
            user_ids: user_ids.to_vec(),
            occurred_at: self.clock.now(),
        });

        let (state, activities) = self.execute(&command, actor, check)?;
        let Some(event) = state.event(event_id) else {
            debug!(event_id = %event_id, "token issue on unknown event ignored");
            return Ok(None);
        };

        let credited: Vec<UserId> = activities
            .iter()
            .filter_map(|a| match a {
                LedgerActivity::TokensCredited(c) => Some(c.user_id.clone()),
                _ => None,
            })
            .collect();
        let mut skipped = Vec::new();
        for (i, user_id) in user_ids.iter().enumerate() {
            let first = user_ids[..i].iter().all(|earlier| earlier != user_id);
            if !(first && credited.contains(user_id)) {
                skipped.push(user_id.clone());
            }
        }

        info!(
            event_id = %event_id,
            credited = credited.len(),
            skipped = skipped.len(),
            amount = event.tokens,
            "tokens issued"
        );

        let issue = TokenIssue {
            credited,
            skipped,
            amount_per_user: event.tokens,
        };
        Ok(Some(issue))
    }

    /// Overwrite the provided profile fields. `None` for an unknown user.
    pub fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> LedgerResult<Option<User>> {
        let command = LedgerCommand::UpdateProfile(UpdateProfile {
            user_id: user_id.clone(),
            name: update.name,
            phone: update.phone,
            roll_number: update.roll_number,
            occurred_at: self.clock.now(),
        });

        let (state, _) = self.execute(&command, Some(user_id), |_| Ok(()))?;
        let user = state.user(user_id).cloned();
        if user.is_some() {
            info!(user_id = %user_id, "profile updated");
        }

        Ok(user)
    }
}

// Pipeline internals.
impl<S, B> LedgerStore<S, B>
where
    S: KeyValueStore,
    B: EventBus<Envelope<LedgerActivity>>,
{
    /// Lock, then [`Self::run`].
    fn execute(
        &self,
        command: &LedgerCommand,
        actor: Option<&UserId>,
        check: impl FnOnce(&LedgerState) -> LedgerResult<()>,
    ) -> LedgerResult<(LedgerState, Vec<LedgerActivity>)> {
        let _guard = self.lock()?;
        self.run(command, actor, check)
    }

    /// Load, check, decide, apply, save, publish. Caller holds the write lock.
    fn run(
        &self,
        command: &LedgerCommand,
        actor: Option<&UserId>,
        check: impl FnOnce(&LedgerState) -> LedgerResult<()>,
    ) -> LedgerResult<(LedgerState, Vec<LedgerActivity>)> {
        let Loaded {
            mut state,
            users_revision,
            events_revision,
        } = self.load()?;

        check(&state)?;

        let activities = state.handle(command)?;
        if activities.is_empty() {
            return Ok((state, activities));
        }
        for activity in &activities {
            state.apply(activity);
        }

        let result = self.save(&state, &activities, users_revision, events_revision);
        if let Err(err) = &result {
            if err.is_conflict() {
                warn!(
                    command = command.name(),
                    actor = ?actor,
                    error = %err,
                    "concurrent write detected"
                );
            }
        }
        result?;

        self.publish(actor, &activities);
        Ok((state, activities))
    }

    fn load(&self) -> LedgerResult<Loaded> {
        let (users, users_revision) = self.read_collection::<User>(&self.keys.users)?;
        let (events, events_revision) = self.read_collection::<ClubEvent>(&self.keys.events)?;
        Ok(Loaded {
            state: LedgerState::new(users, events),
            users_revision,
            events_revision,
        })
    }

    fn save(
        &self,
        state: &LedgerState,
        activities: &[LedgerActivity],
        users_revision: u64,
        events_revision: u64,
    ) -> LedgerResult<()> {
        // Users first: after a failed events write, the retry sees the credit
        // already recorded and only repairs the event.
        if activities.iter().any(LedgerActivity::touches_users) {
            self.write(
                &self.keys.users,
                state.users(),
                ExpectedRevision::Exact(users_revision),
            )?;
        }
        if activities.iter().any(LedgerActivity::touches_events) {
            self.write(
                &self.keys.events,
                state.events(),
                ExpectedRevision::Exact(events_revision),
            )?;
        }
        Ok(())
    }

    fn read_collection<T: DeserializeOwned>(&self, key: &str) -> LedgerResult<(Vec<T>, u64)> {
        match self.kv.get(key)? {
            Some(stored) => Ok((serde_json::from_value(stored.value)?, stored.revision)),
            None => Ok((Vec::new(), 0)),
        }
    }

    fn write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        expected: ExpectedRevision,
    ) -> LedgerResult<u64> {
        let json: JsonValue = serde_json::to_value(value)?;
        Ok(self.kv.put(key, json, expected)?)
    }

    fn set_session(&self, user_id: &UserId) -> LedgerResult<()> {
        self.write(&self.keys.current_user, user_id, ExpectedRevision::Any)?;
        Ok(())
    }

    fn publish(&self, actor: Option<&UserId>, activities: &[LedgerActivity]) {
        for activity in activities {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            let envelope = Envelope::new(sequence, actor.cloned(), activity.clone());
            if let Err(err) = self.bus.publish(envelope) {
                warn!(sequence, error = ?err, "failed to publish ledger activity");
            }
        }
    }
}
