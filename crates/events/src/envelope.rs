use serde::{Deserialize, Serialize};
use uuid::Uuid;

use insti_core::UserId;

/// Publication wrapper for a domain event.
///
/// `sequence_number` increases monotonically per publishing store handle, so
/// subscribers can detect gaps. `actor` is the signed-in user that triggered
/// the change, when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<E> {
    envelope_id: Uuid,
    sequence_number: u64,
    actor: Option<UserId>,
    payload: E,
}

impl<E> Envelope<E> {
    pub fn new(sequence_number: u64, actor: Option<UserId>, payload: E) -> Self {
        Self {
            envelope_id: Uuid::now_v7(),
            sequence_number,
            actor,
            payload,
        }
    }

    pub fn envelope_id(&self) -> Uuid {
        self.envelope_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn actor(&self) -> Option<&UserId> {
        self.actor.as_ref()
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
