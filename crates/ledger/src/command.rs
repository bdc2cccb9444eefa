//! Ledger commands: requests to change users or events.
//!
//! Identifiers and timestamps for anything a command may create are chosen
//! by the caller, keeping [`crate::LedgerState::handle`] deterministic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use insti_auth::Role;
use insti_core::{ClubId, EventId, UserId};

use crate::event::{EventStatus, NewEvent};

/// Command: Register a user for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub event_id: EventId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Unregister a user from an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unregister {
    pub event_id: EventId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ToggleStar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleStar {
    pub event_id: EventId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CreateEvent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEvent {
    pub event_id: EventId,
    pub club_id: ClubId,
    pub data: NewEvent,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateEventStatus (manual override, any transition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEventStatus {
    pub event_id: EventId,
    pub status: EventStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: IssueTokens to the listed users and mark the event completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTokens {
    pub event_id: EventId,
    pub user_ids: Vec<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SignIn by email, creating the account on first use.
///
/// `new_user_id` and `roll_number` are only used when no account exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignIn {
    pub email: String,
    pub role: Role,
    pub club_id: Option<ClubId>,
    pub new_user_id: UserId,
    pub roll_number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProfile. `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub user_id: UserId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub roll_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    Register(Register),
    Unregister(Unregister),
    ToggleStar(ToggleStar),
    CreateEvent(CreateEvent),
    UpdateEventStatus(UpdateEventStatus),
    IssueTokens(IssueTokens),
    SignIn(SignIn),
    UpdateProfile(UpdateProfile),
}

impl LedgerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCommand::Register(_) => "register",
            LedgerCommand::Unregister(_) => "unregister",
            LedgerCommand::ToggleStar(_) => "toggle_star",
            LedgerCommand::CreateEvent(_) => "create_event",
            LedgerCommand::UpdateEventStatus(_) => "update_event_status",
            LedgerCommand::IssueTokens(_) => "issue_tokens",
            LedgerCommand::SignIn(_) => "sign_in",
            LedgerCommand::UpdateProfile(_) => "update_profile",
        }
    }
}
