use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use insti_core::{ClubId, DomainError, DomainResult, Entity, EventId, UserId};

/// Lifecycle status of a club event.
///
/// Transitions are unconstrained: a club may move an event to any status at
/// any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
}

impl EventStatus {
    /// Status implied by the calendar: past dates are completed, today is
    /// ongoing, future dates are upcoming.
    pub fn scheduled(date: NaiveDate, today: NaiveDate) -> Self {
        if date < today {
            EventStatus::Completed
        } else if date == today {
            EventStatus::Ongoing
        } else {
            EventStatus::Upcoming
        }
    }

    /// Upcoming or ongoing.
    pub fn is_open(&self) -> bool {
        !matches!(self, EventStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
        }
    }
}

impl core::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for EventStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(EventStatus::Upcoming),
            "ongoing" => Ok(EventStatus::Ongoing),
            "completed" => Ok(EventStatus::Completed),
            other => Err(DomainError::validation(format!("unknown status '{other}'"))),
        }
    }
}

/// A scheduled activity owned by a club.
///
/// `status` is the explicitly stored status. The calendar-derived status is
/// available through [`ClubEvent::scheduled_status`]; the two may disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubEvent {
    pub id: EventId,
    pub name: String,
    /// Club display name.
    #[serde(default)]
    pub club: String,
    pub club_id: ClubId,
    #[serde(default)]
    pub club_logo: Option<String>,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub status: EventStatus,
    /// Reward credited to each participant.
    pub tokens: u64,
    pub capacity: u32,
    #[serde(default)]
    pub registered: u32,
    #[serde(default)]
    pub starred_by: Vec<UserId>,
    #[serde(default)]
    pub participants: Vec<UserId>,
}

impl ClubEvent {
    pub fn scheduled_status(&self, today: NaiveDate) -> EventStatus {
        EventStatus::scheduled(self.date, today)
    }

    pub fn is_participant(&self, user_id: &UserId) -> bool {
        self.participants.contains(user_id)
    }

    pub fn is_starred_by(&self, user_id: &UserId) -> bool {
        self.starred_by.contains(user_id)
    }

    pub fn is_full(&self) -> bool {
        self.registered >= self.capacity
    }

    pub(crate) fn recount(&mut self) {
        self.registered = u32::try_from(self.participants.len()).unwrap_or(u32::MAX);
    }
}

impl Entity for ClubEvent {
    type Id = EventId;

    fn id(&self) -> &EventId {
        &self.id
    }
}

/// Club-supplied data for a new event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub venue: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub capacity: u32,
    pub tokens: u64,
}

impl NewEvent {
    /// Form-level checks: required text present, positive capacity and reward.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.venue.trim().is_empty() {
            return Err(DomainError::validation("venue cannot be empty"));
        }
        if self.capacity == 0 {
            return Err(DomainError::validation("capacity must be positive"));
        }
        if self.tokens == 0 {
            return Err(DomainError::validation("tokens must be positive"));
        }
        Ok(())
    }
}

/// `HH:MM` wall-clock times. Also accepts `HH:MM:SS` on input.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn scheduled_status_compares_date_with_today() {
        let today = date("2025-01-18");
        assert_eq!(EventStatus::scheduled(date("2025-01-17"), today), EventStatus::Completed);
        assert_eq!(EventStatus::scheduled(today, today), EventStatus::Ongoing);
        assert_eq!(EventStatus::scheduled(date("2025-01-19"), today), EventStatus::Upcoming);
    }

    #[test]
    fn reads_original_event_layout() {
        let json = r#"{
            "id": "evt_004",
            "name": "Git & GitHub Workshop",
            "club": "WebOps Club IITM",
            "clubId": "club_webops",
            "clubLogo": "/assets/webops-logo.svg",
            "venue": "CS Seminar Hall",
            "date": "2024-12-20",
            "startTime": "15:00",
            "endTime": "18:00",
            "status": "completed",
            "tokens": 8,
            "description": "Version control essentials.",
            "capacity": 50,
            "registered": 48,
            "starredBy": [],
            "participants": ["demo_student"]
        }"#;
        let event: ClubEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.status, EventStatus::Completed);
        assert_eq!(event.start_time, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert!(event.is_participant(&UserId::new("demo_student")));

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["startTime"], "15:00");
        assert_eq!(back["clubId"], "club_webops");
    }

    #[test]
    fn new_event_validation_rejects_non_positive_values() {
        let mut data = NewEvent {
            name: "Rust Meetup".into(),
            description: String::new(),
            venue: "Room 101".into(),
            date: date("2025-02-01"),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            capacity: 10,
            tokens: 5,
        };
        assert!(data.validate().is_ok());

        data.capacity = 0;
        assert!(matches!(data.validate(), Err(DomainError::Validation(_))));

        data.capacity = 10;
        data.tokens = 0;
        assert!(matches!(data.validate(), Err(DomainError::Validation(_))));
    }
}
