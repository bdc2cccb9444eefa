//! Ledger activities: facts recorded by accepted commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use insti_core::{EventId, UserId};
use insti_events::Event;

use crate::event::{ClubEvent, EventStatus};
use crate::user::User;

/// Event: UserSignedUp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSignedUp {
    pub user: User,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProfileUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdated {
    pub user_id: UserId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub roll_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: EventCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCreated {
    pub event: ClubEvent,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ParticipantRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRegistered {
    pub event_id: EventId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ParticipantUnregistered. Earlier credits stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantUnregistered {
    pub event_id: EventId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StarToggled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarToggled {
    pub event_id: EventId,
    pub user_id: UserId,
    /// Membership after the toggle.
    pub starred: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub event_id: EventId,
    pub from: EventStatus,
    pub to: EventStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TokensCredited (once per user per event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensCredited {
    pub event_id: EventId,
    pub user_id: UserId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerActivity {
    UserSignedUp(UserSignedUp),
    ProfileUpdated(ProfileUpdated),
    EventCreated(EventCreated),
    ParticipantRegistered(ParticipantRegistered),
    ParticipantUnregistered(ParticipantUnregistered),
    StarToggled(StarToggled),
    StatusChanged(StatusChanged),
    TokensCredited(TokensCredited),
}

impl LedgerActivity {
    /// Whether applying this activity changes the users collection.
    pub fn touches_users(&self) -> bool {
        matches!(
            self,
            LedgerActivity::UserSignedUp(_)
                | LedgerActivity::ProfileUpdated(_)
                | LedgerActivity::TokensCredited(_)
        )
    }

    /// Whether applying this activity changes the events collection.
    pub fn touches_events(&self) -> bool {
        !self.touches_users()
    }
}

impl Event for LedgerActivity {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerActivity::UserSignedUp(_) => "ledger.user.signed_up",
            LedgerActivity::ProfileUpdated(_) => "ledger.user.profile_updated",
            LedgerActivity::EventCreated(_) => "ledger.event.created",
            LedgerActivity::ParticipantRegistered(_) => "ledger.event.participant_registered",
            LedgerActivity::ParticipantUnregistered(_) => "ledger.event.participant_unregistered",
            LedgerActivity::StarToggled(_) => "ledger.event.star_toggled",
            LedgerActivity::StatusChanged(_) => "ledger.event.status_changed",
            LedgerActivity::TokensCredited(_) => "ledger.tokens.credited",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerActivity::UserSignedUp(e) => e.occurred_at,
            LedgerActivity::ProfileUpdated(e) => e.occurred_at,
            LedgerActivity::EventCreated(e) => e.occurred_at,
            LedgerActivity::ParticipantRegistered(e) => e.occurred_at,
            LedgerActivity::ParticipantUnregistered(e) => e.occurred_at,
            LedgerActivity::StarToggled(e) => e.occurred_at,
            LedgerActivity::StatusChanged(e) => e.occurred_at,
            LedgerActivity::TokensCredited(e) => e.occurred_at,
        }
    }
}
