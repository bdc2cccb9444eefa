//! Read-side views over the ledger.
//!
//! Browsing and the student dashboard use the calendar-derived status; the
//! club dashboard counts by stored status.

use std::cmp::Reverse;

use chrono::NaiveDate;
use serde::Serialize;

use insti_core::{ClubId, UserId};

use crate::event::{ClubEvent, EventStatus};
use crate::user::User;

/// Tokens needed to fill the dashboard progress bar.
pub const TOKEN_GOAL: u64 = 100;

const MAX_DASHBOARD_ITEMS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView<'a> {
    pub event: &'a ClubEvent,
    pub scheduled_status: EventStatus,
}

impl<'a> EventView<'a> {
    pub fn new(event: &'a ClubEvent, today: NaiveDate) -> Self {
        Self {
            event,
            scheduled_status: event.scheduled_status(today),
        }
    }
}

pub fn event_views(events: &[ClubEvent], today: NaiveDate) -> Vec<EventView<'_>> {
    events.iter().map(|e| EventView::new(e, today)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventSort {
    /// Earliest first.
    #[default]
    Date,
    /// Highest reward first.
    Tokens,
    Name,
}

impl core::str::FromStr for EventSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(EventSort::Date),
            "tokens" => Ok(EventSort::Tokens),
            "name" => Ok(EventSort::Name),
            other => Err(format!("unknown sort '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilter {
    /// Tab to show, matched against the scheduled status.
    pub status: EventStatus,
    pub search: Option<String>,
    /// Only events starred by this user.
    pub starred_by: Option<UserId>,
    pub sort: EventSort,
}

impl EventFilter {
    pub fn tab(status: EventStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn starred_by(mut self, user_id: UserId) -> Self {
        self.starred_by = Some(user_id);
        self
    }

    pub fn sort(mut self, sort: EventSort) -> Self {
        self.sort = sort;
        self
    }

    fn matches(&self, view: &EventView<'_>) -> bool {
        if view.scheduled_status != self.status {
            return false;
        }
        if let Some(user_id) = &self.starred_by {
            if !view.event.is_starred_by(user_id) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let query = query.to_lowercase();
                view.event.name.to_lowercase().contains(&query)
                    || view.event.club.to_lowercase().contains(&query)
            }
        }
    }
}

/// The event listing page: one status tab, searched, filtered and sorted.
pub fn browse<'a>(
    events: &'a [ClubEvent],
    filter: &EventFilter,
    today: NaiveDate,
) -> Vec<EventView<'a>> {
    let mut views: Vec<_> = events
        .iter()
        .map(|e| EventView::new(e, today))
        .filter(|v| filter.matches(v))
        .collect();

    match filter.sort {
        EventSort::Date => views.sort_by_key(|v| v.event.date),
        EventSort::Tokens => views.sort_by_key(|v| Reverse(v.event.tokens)),
        EventSort::Name => views.sort_by_cached_key(|v| v.event.name.to_lowercase()),
    }
    views
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDashboard<'a> {
    pub upcoming: Vec<EventView<'a>>,
    pub starred: Vec<EventView<'a>>,
    pub registered: Vec<EventView<'a>>,
    pub recent: Vec<EventView<'a>>,
    pub tokens: u64,
    /// Percentage of [`TOKEN_GOAL`], capped at 100.
    pub progress: u8,
}

pub fn student_dashboard<'a>(
    user: &User,
    events: &'a [ClubEvent],
    today: NaiveDate,
) -> StudentDashboard<'a> {
    let views = event_views(events, today);
    let open = |v: &&EventView<'_>| v.scheduled_status.is_open();

    let upcoming = views
        .iter()
        .filter(open)
        .take(MAX_DASHBOARD_ITEMS)
        .copied()
        .collect();
    let starred = views
        .iter()
        .filter(|v| v.event.is_starred_by(&user.id))
        .take(MAX_DASHBOARD_ITEMS)
        .copied()
        .collect();
    let registered = views
        .iter()
        .filter(open)
        .filter(|v| v.event.is_participant(&user.id))
        .copied()
        .collect();

    let mut recent: Vec<_> = views
        .iter()
        .filter(|v| user.has_participated(&v.event.id))
        .copied()
        .collect();
    recent.sort_by_key(|v| Reverse(v.event.date));
    recent.truncate(MAX_DASHBOARD_ITEMS);

    StudentDashboard {
        upcoming,
        starred,
        registered,
        recent,
        tokens: user.tokens,
        progress: progress(user.tokens),
    }
}

fn progress(tokens: u64) -> u8 {
    let pct = tokens.min(TOKEN_GOAL) * 100 / TOKEN_GOAL;
    u8::try_from(pct).unwrap_or(100)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubDashboard<'a> {
    /// The club's events, latest date first.
    pub events: Vec<&'a ClubEvent>,
    pub upcoming: usize,
    pub completed: usize,
    pub total_participants: usize,
    /// Tokens paid out across the club's completed events.
    pub tokens_issued: u64,
}

pub fn club_dashboard<'a>(club_id: &ClubId, events: &'a [ClubEvent]) -> ClubDashboard<'a> {
    let mut mine: Vec<&ClubEvent> = events.iter().filter(|e| &e.club_id == club_id).collect();
    mine.sort_by_key(|e| Reverse(e.date));

    let count = |status| mine.iter().filter(|e| e.status == status).count();
    let tokens_issued = mine
        .iter()
        .filter(|e| e.status == EventStatus::Completed)
        .map(|e| (e.participants.len() as u64).saturating_mul(e.tokens))
        .fold(0u64, u64::saturating_add);

    ClubDashboard {
        upcoming: count(EventStatus::Upcoming),
        completed: count(EventStatus::Completed),
        total_participants: mine.iter().map(|e| e.participants.len()).sum(),
        tokens_issued,
        events: mine,
    }
}

/// Events the user has been credited for, in stored order.
pub fn participation_history<'a>(user: &User, events: &'a [ClubEvent]) -> Vec<&'a ClubEvent> {
    events
        .iter()
        .filter(|e| user.has_participated(&e.id))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub tokens: u64,
    pub events_attended: usize,
    /// Rounded; 0 when nothing attended.
    pub average_tokens: u64,
    pub starred: usize,
}

pub fn profile_summary(user: &User, events: &[ClubEvent]) -> ProfileSummary {
    let attended = participation_history(user, events).len();
    let average_tokens = match attended as u64 {
        0 => 0,
        n => (user.tokens + n / 2) / n,
    };
    ProfileSummary {
        tokens: user.tokens,
        events_attended: attended,
        average_tokens,
        starred: user.starred_events.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub roll_number: Option<String>,
    pub phone: Option<String>,
}

/// Registered participants of `event` that resolve to a known user, in user
/// order.
pub fn participant_roster(event: &ClubEvent, users: &[User]) -> Vec<RosterEntry> {
    users
        .iter()
        .filter(|u| event.is_participant(&u.id))
        .map(|u| RosterEntry {
            user_id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            roll_number: u.roll_number.clone(),
            phone: Some(u.phone.clone()).filter(|p| !p.trim().is_empty()),
        })
        .collect()
}

pub const ROSTER_HEADER: &str = "Name,Email,Roll Number,Phone";

pub fn roster_csv(entries: &[RosterEntry]) -> String {
    let mut out = String::from(ROSTER_HEADER);
    for entry in entries {
        let fields = [
            csv_field(&entry.name),
            csv_field(&entry.email),
            csv_field(entry.roll_number.as_deref().unwrap_or("N/A")),
            csv_field(entry.phone.as_deref().unwrap_or("N/A")),
        ];
        out.push('\n');
        out.push_str(&fields.join(","));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
