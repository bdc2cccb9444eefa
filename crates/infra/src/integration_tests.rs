//! Integration tests for the full store pipeline.
//!
//! Tests: Command → LedgerState → KeyValueStore → EventBus
//!
//! Verifies:
//! - Ledger operations persist and read back through the storage backends
//! - Capacity and ownership are enforced by the guarded boundary only
//! - Concurrent writers are detected through revision checks
//! - Activities are published after a successful save

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use chrono::{NaiveDate, NaiveTime};
    use serde_json::Value as JsonValue;

    use insti_auth::{AuthzError, Principal};
    use insti_core::{ClubId, DomainError, EventId, ExpectedRevision, FixedClock, UserId};
    use insti_events::EventBus;
    use insti_ledger::query::{self, EventFilter};
    use insti_ledger::{EventStatus, LedgerActivity, NewEvent, Role};

    use crate::guard::{GuardedLedger, principal_for};
    use crate::storage::{InMemoryKeyValueStore, KeyValueStore, StoreError, Versioned};
    use crate::store::{LedgerStore, ProfileUpdate, Registration};
    use crate::{ActivityBus, LedgerConfig, LedgerError, open_store};

    type TestStore<S> = LedgerStore<S, Arc<ActivityBus>>;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 16).unwrap()
    }

    fn setup() -> TestStore<Arc<InMemoryKeyValueStore>> {
        insti_observability::init();
        store_over(Arc::new(InMemoryKeyValueStore::new()))
    }

    fn store_over<S: KeyValueStore>(kv: S) -> TestStore<S> {
        LedgerStore::new(kv, Arc::new(ActivityBus::new()))
            .with_clock(Arc::new(FixedClock::on(today())))
    }

    fn new_event(capacity: u32, tokens: u64) -> NewEvent {
        NewEvent {
            name: "Intro to Rust".into(),
            description: "Ownership, borrowing and lifetimes.".into(),
            venue: "CS Seminar Hall".into(),
            date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            capacity,
            tokens,
        }
    }

    fn club() -> ClubId {
        ClubId::new("club_webops")
    }

    #[test]
    fn sign_in_creates_account_once() {
        let store = setup();

        let user = store.sign_in("x@y.com", Role::Student).unwrap();
        assert_eq!(user.name, "x");
        assert_eq!(user.tokens, 0);
        assert!(user.participated_events.is_empty());
        let roll = user.roll_number.clone().unwrap();
        assert!(roll.starts_with("CS21B") && roll.len() == 8);
        assert!(roll[5..].chars().all(|c| c.is_ascii_digit()));

        let again = store.sign_in("x@y.com", Role::Student).unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(store.users().unwrap().len(), 1);
        assert_eq!(store.current_user().unwrap(), Some(user));
    }

    #[test]
    fn club_sign_in_gets_a_club() {
        let store = setup();
        let admin = store.sign_in("admin@club.org", Role::Club).unwrap();
        assert_eq!(admin.club_id, Some(club()));
        assert!(admin.roll_number.is_none());

        let chain = store
            .sign_in_with_club("chain@club.org", ClubId::new("club_blockchain"))
            .unwrap();
        assert_eq!(chain.club_id, Some(ClubId::new("club_blockchain")));

        let err = store
            .sign_in_with_club("chess@club.org", ClubId::new("club_chess"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn session_pointer_follows_sign_in_and_out() {
        let store = setup();
        store.initialize().unwrap();

        let demo = store.sign_in_as(&UserId::new("demo_student")).unwrap().unwrap();
        assert_eq!(demo.name, "Alex Kumar");
        assert_eq!(store.current_user_id().unwrap(), Some(demo.id.clone()));

        assert!(store.sign_in_as(&UserId::new("nobody")).unwrap().is_none());
        assert_eq!(store.current_user_id().unwrap(), Some(demo.id));

        store.sign_out().unwrap();
        assert!(store.current_user().unwrap().is_none());
        store.sign_out().unwrap();
    }

    #[test]
    fn initialize_only_fills_missing_collections() {
        let store = setup();
        assert!(store.initialize().unwrap());
        assert!(!store.initialize().unwrap());

        assert_eq!(store.users().unwrap().len(), 2);
        assert_eq!(store.events().unwrap().len(), 5);
        assert_eq!(
            store.kv().keys(),
            ["instichain_events", "instichain_users"]
        );

        let other = setup();
        other.sign_in("x@y.com", Role::Student).unwrap();
        other.initialize().unwrap();
        assert_eq!(other.users().unwrap().len(), 1);
        assert_eq!(other.events().unwrap().len(), 5);
    }

    #[test]
    fn capacity_is_enforced_only_by_the_guard() {
        let store = setup();
        let a = store.sign_in("a@iitm.ac.in", Role::Student).unwrap();
        let b = store.sign_in("b@iitm.ac.in", Role::Student).unwrap();
        let c = store.sign_in("c@iitm.ac.in", Role::Student).unwrap();

        let event = store.create_event(new_event(2, 10), &club()).unwrap();
        assert_eq!(event.registered, 0);
        assert_eq!(event.status, EventStatus::Upcoming);
        assert_eq!(event.club, "WebOps Club IITM");

        for user in [&a, &b] {
            let outcome = GuardedLedger::new(&store, principal_for(user))
                .register(&event.id)
                .unwrap();
            assert_eq!(outcome, Registration::Registered { tokens_credited: None });
        }
        assert_eq!(store.event(&event.id).unwrap().unwrap().registered, 2);

        let err = GuardedLedger::new(&store, principal_for(&c))
            .register(&event.id)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::CapacityExceeded { capacity: 2, .. })
        ));

        // The unguarded store keeps the trusting behaviour.
        let outcome = store.register(&event.id, &c.id).unwrap();
        assert_eq!(outcome, Registration::Registered { tokens_credited: None });
        let stored = store.event(&event.id).unwrap().unwrap();
        assert_eq!(stored.registered, 3);
        assert!(stored.is_participant(&c.id));

        // Already registered users are not bounced by a full event.
        let again = GuardedLedger::new(&store, principal_for(&a))
            .register(&event.id)
            .unwrap();
        assert_eq!(again, Registration::AlreadyRegistered);
    }

    #[test]
    fn issuing_tokens_credits_each_user_once() {
        let store = setup();
        let a = store.sign_in("a@iitm.ac.in", Role::Student).unwrap();
        let b = store.sign_in("b@iitm.ac.in", Role::Student).unwrap();
        let event = store.create_event(new_event(50, 10), &club()).unwrap();
        store.register(&event.id, &a.id).unwrap();
        store.register(&event.id, &b.id).unwrap();

        let first = store
            .issue_tokens_to_participants(&event.id, &[a.id.clone()])
            .unwrap()
            .unwrap();
        assert_eq!(first.credited, vec![a.id.clone()]);

        let second = store
            .issue_tokens_to_participants(
                &event.id,
                &[a.id.clone(), b.id.clone(), UserId::new("ghost")],
            )
            .unwrap()
            .unwrap();
        assert_eq!(second.credited, vec![b.id.clone()]);
        assert_eq!(second.skipped, vec![a.id.clone(), UserId::new("ghost")]);
        assert_eq!(second.amount_per_user, 10);

        assert_eq!(store.user(&a.id).unwrap().unwrap().tokens, 10);
        assert_eq!(store.user(&b.id).unwrap().unwrap().tokens, 10);
        assert_eq!(
            store.event(&event.id).unwrap().unwrap().status,
            EventStatus::Completed
        );

        assert!(store
            .issue_tokens_to_participants(&EventId::new("evt_missing"), &[a.id])
            .unwrap()
            .is_none());
    }

    #[test]
    fn late_registration_on_completed_event_is_rewarded() {
        let store = setup();
        let a = store.sign_in("a@iitm.ac.in", Role::Student).unwrap();
        let event = store.create_event(new_event(50, 12), &club()).unwrap();
        store
            .update_event_status(&event.id, EventStatus::Completed)
            .unwrap();

        let outcome = store.register(&event.id, &a.id).unwrap();
        assert_eq!(outcome, Registration::Registered { tokens_credited: Some(12) });
        assert!(store.unregister(&event.id, &a.id).unwrap());
        assert!(!store.unregister(&event.id, &a.id).unwrap());

        let user = store.user(&a.id).unwrap().unwrap();
        assert_eq!(user.tokens, 12);
        assert_eq!(user.participated_events, vec![event.id]);
    }

    #[test]
    fn unknown_ids_leave_storage_untouched() {
        let store = setup();
        store.initialize().unwrap();
        let users_rev = store.kv().revision("instichain_users").unwrap();
        let events_rev = store.kv().revision("instichain_events").unwrap();

        let missing = EventId::new("evt_missing");
        let student = UserId::new("demo_student");
        assert_eq!(store.register(&missing, &student).unwrap(), Registration::Ignored);
        assert_eq!(
            store.register(&EventId::new("evt_002"), &UserId::new("ghost")).unwrap(),
            Registration::Ignored
        );
        assert_eq!(store.toggle_star(&missing, &student).unwrap(), None);
        assert!(store.update_event_status(&missing, EventStatus::Ongoing).unwrap().is_none());
        assert!(store
            .update_profile(&UserId::new("ghost"), ProfileUpdate::default())
            .unwrap()
            .is_none());

        assert_eq!(store.kv().revision("instichain_users").unwrap(), users_rev);
        assert_eq!(store.kv().revision("instichain_events").unwrap(), events_rev);
    }

    #[test]
    fn starring_and_browsing() {
        let store = setup();
        store.initialize().unwrap();
        let student = UserId::new("demo_student");
        let react = EventId::new("evt_002");

        assert_eq!(store.toggle_star(&react, &student).unwrap(), Some(true));
        let state = store.state().unwrap();
        let filter = EventFilter::tab(EventStatus::Upcoming).starred_by(student.clone());
        let ids: Vec<_> = query::browse(state.events(), &filter, store.today())
            .iter()
            .map(|v| v.event.id.to_string())
            .collect();
        assert_eq!(ids, ["evt_002", "evt_003"]);

        assert_eq!(store.toggle_star(&react, &student).unwrap(), Some(false));
        assert!(!store.event(&react).unwrap().unwrap().is_starred_by(&student));
    }

    #[test]
    fn guard_checks_roles_and_ownership() {
        let store = setup();
        store.initialize().unwrap();
        let student = GuardedLedger::new(&store, Principal::student(UserId::new("demo_student")));
        let webops = GuardedLedger::new(&store, Principal::club(UserId::new("demo_club"), club()));

        let err = student.create_event(new_event(10, 5)).unwrap_err();
        assert!(matches!(err, LedgerError::Authz(AuthzError::Forbidden(_))));
        let err = webops.register(&EventId::new("evt_002")).unwrap_err();
        assert!(matches!(err, LedgerError::Authz(AuthzError::Forbidden(_))));

        let err = webops.create_event(new_event(0, 5)).unwrap_err();
        assert!(matches!(err, LedgerError::Domain(DomainError::Validation(_))));

        // evt_001 belongs to the blockchain club.
        let err = webops
            .update_event_status(&EventId::new("evt_001"), EventStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Authz(AuthzError::NotOwner { .. })));
        assert_eq!(
            store.event(&EventId::new("evt_001")).unwrap().unwrap().status,
            EventStatus::Upcoming
        );

        let err = webops
            .issue_tokens_to_participants(&EventId::new("evt_missing"), &[])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Domain(DomainError::NotFound { .. })));

        let created = webops.create_event(new_event(10, 5)).unwrap();
        assert_eq!(created.club_id, club());
        let updated = webops
            .update_event_status(&created.id, EventStatus::Ongoing)
            .unwrap();
        assert_eq!(updated.status, EventStatus::Ongoing);

        assert!(student.toggle_star(&created.id).unwrap());
        assert!(student.register(&created.id).is_ok());
        let issue = webops
            .issue_tokens_to_participants(&created.id, &[UserId::new("demo_student")])
            .unwrap();
        assert_eq!(issue.credited.len(), 1);
        assert_eq!(store.user(&UserId::new("demo_student")).unwrap().unwrap().tokens, 50);
    }

    #[test]
    fn guard_for_current_user_and_profile_edits() {
        let store = setup();
        store.initialize().unwrap();
        assert!(GuardedLedger::for_current_user(&store).unwrap().is_none());

        store.sign_in_as(&UserId::new("demo_student")).unwrap();
        let guard = GuardedLedger::for_current_user(&store).unwrap().unwrap();
        assert_eq!(guard.principal().role, Role::Student);

        let user = guard
            .update_profile(ProfileUpdate {
                name: Some("Alex K".into()),
                phone: Some("+91 9000000000".into()),
                roll_number: None,
            })
            .unwrap();
        assert_eq!(user.name, "Alex K");
        assert_eq!(user.phone, "+91 9000000000");
        assert_eq!(user.roll_number.as_deref(), Some("CS21B001"));
    }

    #[test]
    fn activities_are_published_in_order() {
        let store = setup();
        let subscription = store.bus().subscribe();

        let a = store.sign_in("a@iitm.ac.in", Role::Student).unwrap();
        let event = store.create_event(new_event(5, 3), &club()).unwrap();
        store.register(&event.id, &a.id).unwrap();
        store.register(&event.id, &a.id).unwrap();

        let envelopes = subscription.drain();
        let kinds: Vec<_> = envelopes
            .iter()
            .map(|e| match e.payload() {
                LedgerActivity::UserSignedUp(_) => "signed_up",
                LedgerActivity::EventCreated(_) => "created",
                LedgerActivity::ParticipantRegistered(_) => "registered",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["signed_up", "created", "registered"]);

        let sequences: Vec<_> = envelopes.iter().map(|e| e.sequence_number()).collect();
        assert_eq!(sequences, [1, 2, 3]);
        assert_eq!(envelopes[2].actor(), Some(&a.id));

        let next = store.bus().subscribe();
        store.unregister(&event.id, &a.id).unwrap();
        assert!(next.recv_timeout(Duration::from_secs(1)).is_ok());
    }

    /// Lets another writer bump a key's revision exactly once, right before
    /// the next `put` (to `only_key`, when set).
    #[derive(Debug, Default)]
    struct Interfering {
        inner: InMemoryKeyValueStore,
        armed: AtomicBool,
        only_key: Option<&'static str>,
    }

    impl Interfering {
        fn on_key(key: &'static str) -> Self {
            Self {
                only_key: Some(key),
                ..Self::default()
            }
        }
    }

    impl KeyValueStore for Interfering {
        fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError> {
            self.inner.get(key)
        }

        fn put(
            &self,
            key: &str,
            value: JsonValue,
            expected: ExpectedRevision,
        ) -> Result<u64, StoreError> {
            let targeted = self.only_key.is_none_or(|only| only == key);
            if targeted && self.armed.swap(false, Ordering::SeqCst) {
                let current = self.inner.get(key)?.map_or(value.clone(), |v| v.value);
                self.inner.put(key, current, ExpectedRevision::Any)?;
            }
            self.inner.put(key, value, expected)
        }

        fn remove(&self, key: &str, expected: ExpectedRevision) -> Result<(), StoreError> {
            self.inner.remove(key, expected)
        }
    }

    #[test]
    fn concurrent_writer_is_reported_as_conflict() {
        let store = store_over(Interfering::default());
        store.initialize().unwrap();
        let subscription = store.bus().subscribe();

        store.kv().armed.store(true, Ordering::SeqCst);
        let err = store
            .register(&EventId::new("evt_002"), &UserId::new("demo_student"))
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(subscription.drain().is_empty());

        // A fresh attempt sees the other writer's revision and succeeds.
        let outcome = store
            .register(&EventId::new("evt_002"), &UserId::new("demo_student"))
            .unwrap();
        assert!(matches!(outcome, Registration::Registered { .. }));
    }

    #[test]
    fn late_registration_retry_after_events_conflict_keeps_credit() {
        let store = store_over(Interfering::on_key("instichain_events"));
        store.initialize().unwrap();
        let student = store.sign_in("late@iitm.ac.in", Role::Student).unwrap();
        let completed = EventId::new("evt_004");

        store.kv().armed.store(true, Ordering::SeqCst);
        let err = store.register(&completed, &student.id).unwrap_err();
        assert!(err.is_conflict());

        let outcome = store.register(&completed, &student.id).unwrap();
        assert_eq!(outcome, Registration::Registered { tokens_credited: None });

        let user = store.user(&student.id).unwrap().unwrap();
        assert_eq!(user.tokens, 8);
        assert_eq!(user.participated_events, vec![completed.clone()]);
        let event = store.event(&completed).unwrap().unwrap();
        assert!(event.is_participant(&student.id));
    }

    #[test]
    fn late_registration_retry_after_users_conflict_credits_once() {
        let store = store_over(Interfering::on_key("instichain_users"));
        store.initialize().unwrap();
        let student = store.sign_in("late@iitm.ac.in", Role::Student).unwrap();
        let completed = EventId::new("evt_004");

        store.kv().armed.store(true, Ordering::SeqCst);
        assert!(store.register(&completed, &student.id).unwrap_err().is_conflict());
        assert!(!store.event(&completed).unwrap().unwrap().is_participant(&student.id));

        let outcome = store.register(&completed, &student.id).unwrap();
        assert_eq!(outcome, Registration::Registered { tokens_credited: Some(8) });
        assert_eq!(store.user(&student.id).unwrap().unwrap().tokens, 8);
    }

    #[test]
    fn parallel_handles_never_lose_registrations() {
        let store = Arc::new(setup());
        let students: Vec<UserId> = (0..8)
            .map(|i| {
                store
                    .sign_in(&format!("s{i}@iitm.ac.in"), Role::Student)
                    .unwrap()
                    .id
            })
            .collect();
        let event_id = store.create_event(new_event(100, 1), &club()).unwrap().id;

        let handles: Vec<_> = students
            .into_iter()
            .map(|user_id| {
                let store = store.clone();
                let event_id = event_id.clone();
                std::thread::spawn(move || store.register(&event_id, &user_id).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = store.event(&event_id).unwrap().unwrap();
        assert_eq!(stored.registered, 8);
        assert_eq!(stored.participants.len(), 8);
    }

    #[test]
    fn envelope_sequence_follows_commit_order() {
        let store = Arc::new(setup());
        let students: Vec<UserId> = (0..8)
            .map(|i| {
                store
                    .sign_in(&format!("s{i}@iitm.ac.in"), Role::Student)
                    .unwrap()
                    .id
            })
            .collect();
        let event_id = store.create_event(new_event(100, 1), &club()).unwrap().id;
        let subscription = store.bus().subscribe();

        let handles: Vec<_> = students
            .into_iter()
            .map(|user_id| {
                let store = store.clone();
                let event_id = event_id.clone();
                std::thread::spawn(move || store.register(&event_id, &user_id).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let envelopes = subscription.drain();
        let sequences: Vec<_> = envelopes.iter().map(|e| e.sequence_number()).collect();
        assert!(sequences.windows(2).all(|w| w[0] < w[1]));

        let published: Vec<UserId> = envelopes
            .iter()
            .filter_map(|e| match e.payload() {
                LedgerActivity::ParticipantRegistered(r) => Some(r.user_id.clone()),
                _ => None,
            })
            .collect();
        let stored = store.event(&event_id).unwrap().unwrap();
        assert_eq!(published, stored.participants);
    }

    #[test]
    fn file_backed_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..LedgerConfig::default()
        };

        let user_id = {
            let store = open_store(&config).unwrap();
            let user = store.sign_in("x@y.com", Role::Student).unwrap();
            store.register(&EventId::new("evt_002"), &user.id).unwrap();
            user.id
        };
        assert!(dir.path().join("instichain_users.json").exists());
        assert!(dir.path().join("instichain_events.json").exists());
        assert!(dir.path().join("instichain_currentUser.json").exists());

        let store = open_store(&config).unwrap();
        assert_eq!(store.users().unwrap().len(), 3);
        assert_eq!(store.current_user().unwrap().map(|u| u.id), Some(user_id.clone()));
        let react = store.event(&EventId::new("evt_002")).unwrap().unwrap();
        assert!(react.is_participant(&user_id));
        assert_eq!(react.registered, 1);
    }

    #[test]
    fn key_prefix_and_seeding_follow_config() {
        let config = LedgerConfig {
            key_prefix: "test_".into(),
            seed_sample_data: false,
            ..LedgerConfig::default()
        };
        let store = open_store(&config).unwrap();
        assert!(store.events().unwrap().is_empty());

        store.sign_in("x@y.com", Role::Student).unwrap();
        assert_eq!(store.keys().users, "test_users");
        assert!(store.kv().get("test_currentUser").unwrap().is_some());
        assert!(store.kv().get("instichain_users").unwrap().is_none());
    }
}
