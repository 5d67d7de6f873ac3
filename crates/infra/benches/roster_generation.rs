use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use chrono::{Duration, Utc, Weekday};
use serde_json::Value as JsonValue;

use flock_core::{AggregateId, MemberId, TenantId};
use flock_events::{EventEnvelope, InMemoryEventBus};
use flock_infra::command_dispatcher::CommandDispatcher;
use flock_infra::directory::InMemoryMemberDirectory;
use flock_infra::event_store::InMemoryEventStore;
use flock_infra::notify::InMemoryNotificationDispatch;
use flock_infra::rotation_store::InMemoryRotationCursorStore;
use flock_infra::services::{MinistryService, RosterService};
use flock_ministries::{DefineMinistry, MinistryId, Recurrence};

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type BenchRosterService = RosterService<
    Arc<InMemoryEventStore>,
    Bus,
    Arc<InMemoryRotationCursorStore>,
    Arc<InMemoryMemberDirectory>,
    Arc<InMemoryNotificationDispatch>,
>;

fn setup(pool_size: usize, roles: usize) -> (BenchRosterService, TenantId, MinistryId) {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let cursors = Arc::new(InMemoryRotationCursorStore::new());
    let directory = Arc::new(InMemoryMemberDirectory::new());
    let notifications = Arc::new(InMemoryNotificationDispatch::new());
    let tenant = TenantId::new();

    let pool: Vec<MemberId> = (0..pool_size)
        .map(|i| {
            let member = MemberId::new();
            directory.insert(tenant, member, format!("Member {i}"));
            member
        })
        .collect();

    let ministries = MinistryService::new(
        CommandDispatcher::new(store.clone(), bus.clone()),
        cursors.clone(),
    );
    let ministry_id = MinistryId::new(AggregateId::new());
    ministries
        .define_ministry(DefineMinistry {
            tenant_id: tenant,
            ministry_id,
            name: "Worship".to_string(),
            duty_roles: (0..roles).map(|i| format!("Role {i}")).collect(),
            member_pool: pool,
            recurrence: Recurrence::Weekly {
                weekday: Weekday::Sun,
            },
            occurred_at: Utc::now(),
        })
        .expect("define ministry");

    let rosters = RosterService::new(
        CommandDispatcher::new(store, bus),
        cursors,
        directory,
        notifications,
    );

    (rosters, tenant, ministry_id)
}

fn bench_generate_roster(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_roster");

    for pool_size in [5usize, 50, 500] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("pool", pool_size),
            &pool_size,
            |b, &pool_size| {
                let (rosters, tenant, ministry_id) = setup(pool_size, 4);
                let mut week = 0i64;
                b.iter(|| {
                    week += 1;
                    let occurs_at = Utc::now() + Duration::hours(48) + Duration::weeks(week);
                    black_box(
                        rosters
                            .generate_roster(tenant, ministry_id, occurs_at)
                            .expect("generate roster"),
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_confirm_presence(c: &mut Criterion) {
    c.bench_function("confirm_presence", |b| {
        let (rosters, tenant, ministry_id) = setup(64, 1);
        b.iter_with_setup(
            || {
                let roster = rosters
                    .generate_roster(tenant, ministry_id, Utc::now() + Duration::hours(48))
                    .expect("generate roster");
                let member_id = roster.entries()[0].member_id;
                (roster.id_typed(), member_id)
            },
            |(roster_id, member_id)| {
                rosters
                    .confirm_presence(tenant, roster_id, member_id)
                    .expect("confirm presence")
            },
        );
    });
}

criterion_group!(benches, bench_generate_roster, bench_confirm_presence);
criterion_main!(benches);
