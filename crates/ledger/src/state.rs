//! The ledger: users and club events, and the rules that change them.

use std::collections::HashSet;

use insti_auth::Role;
use insti_core::{DomainError, DomainResult, EventId, UserId, find, find_mut};

use crate::activity::{
    EventCreated, LedgerActivity, ParticipantRegistered, ParticipantUnregistered, ProfileUpdated,
    StarToggled, StatusChanged, TokensCredited, UserSignedUp,
};
use crate::club::{club_by_id, default_club};
use crate::command::{
    CreateEvent, IssueTokens, LedgerCommand, Register, SignIn, ToggleStar, Unregister,
    UpdateEventStatus, UpdateProfile,
};
use crate::event::{ClubEvent, EventStatus};
use crate::user::User;

/// In-memory snapshot of both collections, in stored order.
///
/// Commands referencing an unknown user or event decide nothing; the caller
/// sees an empty activity list rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    users: Vec<User>,
    events: Vec<ClubEvent>,
}

impl LedgerState {
    pub fn new(users: Vec<User>, events: Vec<ClubEvent>) -> Self {
        Self { users, events }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn events(&self) -> &[ClubEvent] {
        &self.events
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        find(&self.users, id)
    }

    pub fn event(&self, id: &EventId) -> Option<&ClubEvent> {
        find(&self.events, id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users.iter().find(|u| u.email == email)
    }

    pub fn into_parts(self) -> (Vec<User>, Vec<ClubEvent>) {
        (self.users, self.events)
    }

    /// Decide and apply in one step.
    pub fn execute(&mut self, command: &LedgerCommand) -> DomainResult<Vec<LedgerActivity>> {
        let activities = self.handle(command)?;
        for activity in &activities {
            self.apply(activity);
        }
        Ok(activities)
    }

    /// Decide which activities `command` produces. Does not mutate.
    pub fn handle(&self, command: &LedgerCommand) -> DomainResult<Vec<LedgerActivity>> {
        match command {
            LedgerCommand::Register(cmd) => Ok(self.handle_register(cmd)),
            LedgerCommand::Unregister(cmd) => Ok(self.handle_unregister(cmd)),
            LedgerCommand::ToggleStar(cmd) => Ok(self.handle_toggle_star(cmd)),
            LedgerCommand::CreateEvent(cmd) => self.handle_create_event(cmd),
            LedgerCommand::UpdateEventStatus(cmd) => Ok(self.handle_update_status(cmd)),
            LedgerCommand::IssueTokens(cmd) => Ok(self.handle_issue_tokens(cmd)),
            LedgerCommand::SignIn(cmd) => self.handle_sign_in(cmd),
            LedgerCommand::UpdateProfile(cmd) => Ok(self.handle_update_profile(cmd)),
        }
    }

    /// Evolve state from one activity.
    pub fn apply(&mut self, activity: &LedgerActivity) {
        match activity {
            LedgerActivity::UserSignedUp(e) => self.users.push(e.user.clone()),
            LedgerActivity::ProfileUpdated(e) => {
                if let Some(user) = find_mut(&mut self.users, &e.user_id) {
                    if let Some(name) = &e.name {
                        user.name = name.clone();
                    }
                    if let Some(phone) = &e.phone {
                        user.phone = phone.clone();
                    }
                    if let Some(roll) = &e.roll_number {
                        user.roll_number = Some(roll.clone()).filter(|r| !r.trim().is_empty());
                    }
                }
            }
            LedgerActivity::EventCreated(e) => self.events.push(e.event.clone()),
            LedgerActivity::ParticipantRegistered(e) => {
                if let Some(event) = find_mut(&mut self.events, &e.event_id) {
                    if !event.participants.contains(&e.user_id) {
                        event.participants.push(e.user_id.clone());
                    }
                    event.recount();
                }
            }
            LedgerActivity::ParticipantUnregistered(e) => {
                if let Some(event) = find_mut(&mut self.events, &e.event_id) {
                    event.participants.retain(|id| id != &e.user_id);
                    event.recount();
                }
            }
            LedgerActivity::StarToggled(e) => {
                if let Some(event) = find_mut(&mut self.events, &e.event_id) {
                    event.starred_by.retain(|id| id != &e.user_id);
                    if e.starred {
                        event.starred_by.push(e.user_id.clone());
                    }
                }
            }
            LedgerActivity::StatusChanged(e) => {
                if let Some(event) = find_mut(&mut self.events, &e.event_id) {
                    event.status = e.to;
                }
            }
            LedgerActivity::TokensCredited(e) => {
                if let Some(user) = find_mut(&mut self.users, &e.user_id) {
                    if !user.has_participated(&e.event_id) {
                        user.participated_events.push(e.event_id.clone());
                        user.tokens = user.tokens.saturating_add(e.amount);
                    }
                }
            }
        }
    }
}

impl LedgerState {
    fn handle_register(&self, cmd: &Register) -> Vec<LedgerActivity> {
        let (Some(event), Some(user)) = (self.event(&cmd.event_id), self.user(&cmd.user_id)) else {
            return vec![];
        };
        if event.is_participant(&user.id) {
            return vec![];
        }

        let mut activities = vec![LedgerActivity::ParticipantRegistered(ParticipantRegistered {
            event_id: event.id.clone(),
            user_id: user.id.clone(),
            occurred_at: cmd.occurred_at,
        })];

        // Late registration for an event already marked completed earns the
        // reward immediately.
        if event.status == EventStatus::Completed && !user.has_participated(&event.id) {
            activities.push(LedgerActivity::TokensCredited(TokensCredited {
                event_id: event.id.clone(),
                user_id: user.id.clone(),
                amount: event.tokens,
                occurred_at: cmd.occurred_at,
            }));
        }

        activities
    }

    fn handle_unregister(&self, cmd: &Unregister) -> Vec<LedgerActivity> {
        match self.event(&cmd.event_id) {
            Some(event) if event.is_participant(&cmd.user_id) => {
                vec![LedgerActivity::ParticipantUnregistered(ParticipantUnregistered {
                    event_id: cmd.event_id.clone(),
                    user_id: cmd.user_id.clone(),
                    occurred_at: cmd.occurred_at,
                })]
            }
            _ => vec![],
        }
    }

    fn handle_toggle_star(&self, cmd: &ToggleStar) -> Vec<LedgerActivity> {
        let Some(event) = self.event(&cmd.event_id) else {
            return vec![];
        };
        vec![LedgerActivity::StarToggled(StarToggled {
            event_id: cmd.event_id.clone(),
            user_id: cmd.user_id.clone(),
            starred: !event.is_starred_by(&cmd.user_id),
            occurred_at: cmd.occurred_at,
        })]
    }

    fn handle_create_event(&self, cmd: &CreateEvent) -> DomainResult<Vec<LedgerActivity>> {
        if self.event(&cmd.event_id).is_some() {
            return Err(DomainError::conflict(format!(
                "event {} already exists",
                cmd.event_id
            )));
        }

        let club = club_by_id(&cmd.club_id);
        let data = &cmd.data;
        let event = ClubEvent {
            id: cmd.event_id.clone(),
            name: data.name.clone(),
            club: club
                .as_ref()
                .map(|c| c.name.to_string())
                .unwrap_or_else(|| cmd.club_id.to_string()),
            club_id: cmd.club_id.clone(),
            club_logo: club.map(|c| c.logo.to_string()),
            venue: data.venue.clone(),
            description: data.description.clone(),
            date: data.date,
            start_time: data.start_time,
            end_time: data.end_time,
            status: EventStatus::Upcoming,
            tokens: data.tokens,
            capacity: data.capacity,
            registered: 0,
            starred_by: Vec::new(),
            participants: Vec::new(),
        };

        Ok(vec![LedgerActivity::EventCreated(EventCreated {
            event,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_status(&self, cmd: &UpdateEventStatus) -> Vec<LedgerActivity> {
        let Some(event) = self.event(&cmd.event_id) else {
            return vec![];
        };
        vec![LedgerActivity::StatusChanged(StatusChanged {
            event_id: cmd.event_id.clone(),
            from: event.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })]
    }

    fn handle_issue_tokens(&self, cmd: &IssueTokens) -> Vec<LedgerActivity> {
        let Some(event) = self.event(&cmd.event_id) else {
            return vec![];
        };

        let mut credited: HashSet<&UserId> = HashSet::new();
        let mut activities = Vec::new();
        for user_id in &cmd.user_ids {
            let Some(user) = self.user(user_id) else {
                continue;
            };
            if user.has_participated(&event.id) || !credited.insert(user_id) {
                continue;
            }
            activities.push(LedgerActivity::TokensCredited(TokensCredited {
                event_id: event.id.clone(),
                user_id: user_id.clone(),
                amount: event.tokens,
                occurred_at: cmd.occurred_at,
            }));
        }

        activities.push(LedgerActivity::StatusChanged(StatusChanged {
            event_id: event.id.clone(),
            from: event.status,
            to: EventStatus::Completed,
            occurred_at: cmd.occurred_at,
        }));

        activities
    }

    fn handle_sign_in(&self, cmd: &SignIn) -> DomainResult<Vec<LedgerActivity>> {
        let email = cmd.email.trim();
        if email.is_empty() {
            return Err(DomainError::validation("email cannot be empty"));
        }
        if self.user_by_email(email).is_some() {
            return Ok(vec![]);
        }
        if self.user(&cmd.new_user_id).is_some() {
            return Err(DomainError::conflict(format!(
                "user {} already exists",
                cmd.new_user_id
            )));
        }

        let mut user = User::new(cmd.new_user_id.clone(), email, cmd.role);
        match cmd.role {
            Role::Student => {
                user.roll_number = Some(cmd.roll_number.clone()).filter(|r| !r.trim().is_empty());
            }
            Role::Club => {
                let club = match &cmd.club_id {
                    Some(id) => club_by_id(id)
                        .ok_or_else(|| DomainError::validation(format!("unknown club '{id}'")))?,
                    None => default_club(),
                };
                user.club_id = Some(club.id);
            }
        }

        Ok(vec![LedgerActivity::UserSignedUp(UserSignedUp {
            user,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_profile(&self, cmd: &UpdateProfile) -> Vec<LedgerActivity> {
        if self.user(&cmd.user_id).is_none() {
            return vec![];
        }
        vec![LedgerActivity::ProfileUpdated(ProfileUpdated {
            user_id: cmd.user_id.clone(),
            name: cmd.name.clone(),
            phone: cmd.phone.clone(),
            roll_number: cmd.roll_number.clone(),
            occurred_at: cmd.occurred_at,
        })]
    }
}
