//! `insti-core` — shared building blocks for the Insti Chain ledger.
//!
//! Pure primitives only: identifiers, errors, time source, revision checks.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod revision;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::{Entity, find, find_mut};
pub use error::{DomainError, DomainResult};
pub use id::{ClubId, EventId, UserId};
pub use revision::ExpectedRevision;
