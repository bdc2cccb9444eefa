//! Insti Chain ledger domain.
//!
//! Users, club events, registration, starring and token issuance, written as
//! deterministic domain logic (no IO, no storage). The infrastructure crate
//! loads a [`LedgerState`], runs a [`LedgerCommand`] through it and persists
//! the result.

pub mod activity;
pub mod club;
pub mod command;
pub mod event;
pub mod query;
pub mod seed;
pub mod state;
pub mod user;

pub use activity::{
    EventCreated, LedgerActivity, ParticipantRegistered, ParticipantUnregistered, ProfileUpdated,
    StarToggled, StatusChanged, TokensCredited, UserSignedUp,
};
pub use club::{Club, club_by_id, club_registry, default_club};
pub use command::{
    CreateEvent, IssueTokens, LedgerCommand, Register, SignIn, ToggleStar, Unregister,
    UpdateEventStatus, UpdateProfile,
};
pub use event::{ClubEvent, EventStatus, NewEvent};
pub use state::LedgerState;
pub use user::{User, generate_roll_number};

pub use insti_auth::Role;
