use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use insti_core::{ClubId, EventId, UserId};
use insti_infra::{ActivityBus, InMemoryKeyValueStore, LedgerStore};
use insti_ledger::query::{self, EventFilter, EventSort};
use insti_ledger::{EventStatus, NewEvent, Role};

type BenchStore = LedgerStore<InMemoryKeyValueStore, Arc<ActivityBus>>;

fn new_event(n: u64) -> NewEvent {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
    NewEvent {
        name: format!("Workshop #{n}"),
        description: "Benchmark fixture".to_string(),
        venue: "Lecture Hall 1".to_string(),
        date: start.checked_add_days(Days::new(n % 90)).unwrap_or(start),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
        end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
        capacity: 500,
        tokens: 1 + n % 20,
    }
}

/// Store holding `events` events and `students` students.
fn populated(events: u64, students: u64) -> (BenchStore, Vec<EventId>, Vec<UserId>) {
    let store = LedgerStore::new(InMemoryKeyValueStore::new(), Arc::new(ActivityBus::new()));
    let club = ClubId::new("club_webops");

    let event_ids = (0..events)
        .map(|n| store.create_event(new_event(n), &club).unwrap().id)
        .collect();
    let user_ids = (0..students)
        .map(|n| {
            store
                .sign_in(&format!("student{n}@iitm.ac.in"), Role::Student)
                .unwrap()
                .id
        })
        .collect();

    (store, event_ids, user_ids)
}

fn bench_operation_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("operation_latency");

    group.bench_function("register_unregister", |b| {
        let (store, events, users) = populated(20, 20);
        b.iter(|| {
            store.register(&events[3], &users[7]).unwrap();
            store.unregister(&events[3], &users[7]).unwrap();
        });
    });

    group.bench_function("toggle_star", |b| {
        let (store, events, users) = populated(20, 20);
        b.iter(|| black_box(store.toggle_star(&events[5], &users[2]).unwrap()));
    });

    group.bench_function("sign_in_existing", |b| {
        let (store, _, _) = populated(5, 50);
        b.iter(|| black_box(store.sign_in("student25@iitm.ac.in", Role::Student).unwrap()));
    });

    group.finish();
}

fn bench_collection_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_size");

    for size in [10u64, 100, 1000] {
        group.throughput(Throughput::Elements(size));

        group.bench_with_input(BenchmarkId::new("toggle_star", size), &size, |b, &size| {
            let (store, events, users) = populated(size, 10);
            b.iter(|| black_box(store.toggle_star(&events[0], &users[0]).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("issue_tokens", size), &size, |b, &size| {
            let (store, events, users) = populated(10, size);
            b.iter(|| {
                black_box(
                    store
                        .issue_tokens_to_participants(&events[0], &users)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_browse(c: &mut Criterion) {
    let mut group = c.benchmark_group("browse");
    let today = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap_or_default();

    for size in [100u64, 1000] {
        let (store, _, _) = populated(size, 1);
        let state = store.state().unwrap();
        let filter = EventFilter::tab(EventStatus::Upcoming)
            .search("workshop #1")
            .sort(EventSort::Tokens);

        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::new("search_and_sort", size), &state, |b, state| {
            b.iter(|| black_box(query::browse(state.events(), &filter, today).len()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_operation_latency,
    bench_collection_size,
    bench_browse
);
criterion_main!(benches);
