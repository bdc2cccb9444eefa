//! Demo accounts and events written on first start.

use chrono::{NaiveDate, NaiveTime};

use insti_auth::Role;
use insti_core::{ClubId, EventId, UserId};

use crate::club::club_by_id;
use crate::event::{ClubEvent, EventStatus};
use crate::user::User;

pub const DEMO_STUDENT: &str = "demo_student";
pub const DEMO_CLUB: &str = "demo_club";

pub fn sample_users() -> Vec<User> {
    let student = User {
        name: "Alex Kumar".into(),
        phone: "+91 9876543210".into(),
        roll_number: Some("CS21B001".into()),
        tokens: 45,
        starred_events: vec![EventId::new("evt_001"), EventId::new("evt_003")],
        participated_events: vec![EventId::new("evt_004"), EventId::new("evt_005")],
        ..User::new(
            UserId::new(DEMO_STUDENT),
            "alex@student.iitm.ac.in",
            Role::Student,
        )
    };

    let club = User {
        name: "WebOps Admin".into(),
        club_id: Some(ClubId::new("club_webops")),
        ..User::new(UserId::new(DEMO_CLUB), "admin@webops.iitm.ac.in", Role::Club)
    };

    vec![student, club]
}

struct Sample {
    id: &'static str,
    name: &'static str,
    club_id: &'static str,
    venue: &'static str,
    date: (i32, u32, u32),
    hours: (u32, u32),
    status: EventStatus,
    tokens: u64,
    description: &'static str,
    capacity: u32,
    registered: u32,
    starred: bool,
    attended: bool,
}

const SAMPLES: &[Sample] = &[
    Sample {
        id: "evt_001",
        name: "Blockchain 101 Workshop",
        club_id: "club_blockchain",
        venue: "Lecture Hall 3",
        date: (2025, 1, 15),
        hours: (14, 17),
        status: EventStatus::Upcoming,
        tokens: 10,
        description: "Learn the fundamentals of blockchain technology, smart contracts, and decentralized applications. Perfect for beginners!",
        capacity: 100,
        registered: 45,
        starred: true,
        attended: false,
    },
    Sample {
        id: "evt_002",
        name: "React Masterclass",
        club_id: "club_webops",
        venue: "Computer Lab 1",
        date: (2025, 1, 18),
        hours: (10, 16),
        status: EventStatus::Upcoming,
        tokens: 15,
        description: "Comprehensive React workshop covering hooks, state management, and modern development practices.",
        capacity: 60,
        registered: 35,
        starred: false,
        attended: false,
    },
    Sample {
        id: "evt_003",
        name: "Web3 Hackathon",
        club_id: "club_blockchain",
        venue: "Innovation Lab",
        date: (2025, 1, 25),
        hours: (9, 21),
        status: EventStatus::Upcoming,
        tokens: 25,
        description: "24-hour hackathon building decentralized applications. Prizes worth ₹50,000!",
        capacity: 80,
        registered: 72,
        starred: true,
        attended: false,
    },
    Sample {
        id: "evt_004",
        name: "Git & GitHub Workshop",
        club_id: "club_webops",
        venue: "CS Seminar Hall",
        date: (2024, 12, 20),
        hours: (15, 18),
        status: EventStatus::Completed,
        tokens: 8,
        description: "Version control essentials for developers. Learn Git workflows and collaboration.",
        capacity: 50,
        registered: 48,
        starred: false,
        attended: true,
    },
    Sample {
        id: "evt_005",
        name: "Smart Contract Security",
        club_id: "club_blockchain",
        venue: "Room 301",
        date: (2024, 12, 15),
        hours: (16, 19),
        status: EventStatus::Completed,
        tokens: 12,
        description: "Learn about common vulnerabilities and security best practices in smart contract development.",
        capacity: 40,
        registered: 37,
        starred: false,
        attended: true,
    },
];

/// The five demo events. Seeded `registered` counts are display figures and
/// do not match the (demo-only) participant lists until the first change.
pub fn sample_events() -> Vec<ClubEvent> {
    SAMPLES.iter().filter_map(Sample::build).collect()
}

impl Sample {
    fn build(&self) -> Option<ClubEvent> {
        let club_id = ClubId::new(self.club_id);
        let club = club_by_id(&club_id)?;
        let (y, m, d) = self.date;
        let demo = || vec![UserId::new(DEMO_STUDENT)];

        Some(ClubEvent {
            id: EventId::new(self.id),
            name: self.name.into(),
            club: club.name.into(),
            club_id,
            club_logo: Some(club.logo.into()),
            venue: self.venue.into(),
            description: self.description.into(),
            date: NaiveDate::from_ymd_opt(y, m, d)?,
            start_time: NaiveTime::from_hms_opt(self.hours.0, 0, 0)?,
            end_time: NaiveTime::from_hms_opt(self.hours.1, 0, 0)?,
            status: self.status,
            tokens: self.tokens,
            capacity: self.capacity,
            registered: self.registered,
            starred_by: if self.starred { demo() } else { Vec::new() },
            participants: if self.attended { demo() } else { Vec::new() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_sample_event_builds() {
        let events = sample_events();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["evt_001", "evt_002", "evt_003", "evt_004", "evt_005"]);

        let git = &events[3];
        assert_eq!(git.club, "WebOps Club IITM");
        assert_eq!(git.club_logo.as_deref(), Some("/assets/webops-logo.svg"));
        assert_eq!(git.status, EventStatus::Completed);
        assert!(git.is_participant(&UserId::new(DEMO_STUDENT)));
    }

    #[test]
    fn demo_student_history_matches_completed_events() {
        let users = sample_users();
        let student = &users[0];
        assert_eq!(student.tokens, 45);
        for event in sample_events() {
            assert_eq!(
                student.has_participated(&event.id),
                event.status == EventStatus::Completed
            );
        }
        assert_eq!(users[1].club_id, Some(ClubId::new("club_webops")));
        assert!(users[1].roll_number.is_none());
    }
}
