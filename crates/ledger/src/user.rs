use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use insti_auth::Role;
use insti_core::{ClubId, Entity, EventId, UserId};

/// A student or club account.
///
/// `tokens` only ever grows, by the reward of an event the user is credited
/// for, once per event; [`crate::LedgerState`] is the only writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone: String,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Seeded favourites. Starring itself is recorded on the event.
    #[serde(default)]
    pub starred_events: Vec<EventId>,
    #[serde(default)]
    pub participated_events: Vec<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_id: Option<ClubId>,
}

impl User {
    /// Fresh account with zero tokens and no history.
    pub fn new(id: UserId, email: &str, role: Role) -> Self {
        Self {
            id,
            name: display_name_for(email),
            email: email.to_string(),
            role,
            phone: String::new(),
            roll_number: None,
            tokens: 0,
            avatar_url: None,
            starred_events: Vec::new(),
            participated_events: Vec::new(),
            club_id: None,
        }
    }

    /// Whether the user has already been credited for `event_id`.
    pub fn has_participated(&self, event_id: &EventId) -> bool {
        self.participated_events.contains(event_id)
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

/// Student roll number in the `CS21B###` pattern.
pub fn generate_roll_number() -> String {
    let n = Uuid::now_v7().as_u128() % 999;
    format!("CS21B{n:03}")
}

fn display_name_for(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
