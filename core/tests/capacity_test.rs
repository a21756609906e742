//! Capacity synchronization against staff roster changes.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use slotbook_core::store::{AdmissionMode, SlotStore};
use slotbook_core::types::{Slot, SlotStatus};
use slotbook_core::{BlockingEngine, CapacitySynchronizer, EngineError, SlotGenerator, SlotSelector, UserId};
use slotbook_testing::TestHarness;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

const DATE: (i32, u32, u32) = (2025, 6, 2);

async fn generated_day(harness: &TestHarness) -> Vec<Slot> {
    SlotGenerator::new(harness.env.clone())
        .generate_day(harness.tenant, harness.shop, d(DATE.0, DATE.1, DATE.2))
        .await
        .expect("generate")
}

#[tokio::test]
async fn capacity_follows_the_roster_up_and_down() {
    let harness = TestHarness::builder().staff_count(2).build();
    let sync = CapacitySynchronizer::new(harness.env.clone());
    generated_day(&harness).await;

    harness.roster.set_count(4);
    let synced = sync
        .sync_capacity(harness.tenant, harness.shop, d(DATE.0, DATE.1, DATE.2))
        .await
        .expect("sync up");
    assert!(synced.iter().all(|s| s.capacity == 4 && s.max_capacity == 4));

    harness.roster.set_count(1);
    let synced = sync
        .sync_capacity(harness.tenant, harness.shop, d(DATE.0, DATE.1, DATE.2))
        .await
        .expect("sync down");
    assert!(synced.iter().all(|s| s.capacity == 1 && s.max_capacity == 1));
}

#[tokio::test]
async fn capacity_never_shrinks_below_current_bookings() {
    let harness = TestHarness::builder().staff_count(3).build();
    let sync = CapacitySynchronizer::new(harness.env.clone());
    let slots = generated_day(&harness).await;

    let busy = slots[0].id;
    for _ in 0..2 {
        harness
            .store
            .admit(harness.tenant, busy, AdmissionMode::Checked)
            .await
            .expect("admit");
    }

    harness.roster.set_count(1);
    let synced = sync
        .sync_capacity(harness.tenant, harness.shop, d(DATE.0, DATE.1, DATE.2))
        .await
        .expect("sync");

    let floored = synced.iter().find(|s| s.id == busy).expect("busy slot");
    assert_eq!(floored.capacity, 2);
    assert_eq!(floored.max_capacity, 1);
    assert_eq!(floored.status, SlotStatus::Full);

    let idle = synced.iter().find(|s| s.id != busy).expect("idle slot");
    assert_eq!(idle.capacity, 1);
    assert_eq!(idle.status, SlotStatus::Available);
}

#[tokio::test]
async fn sync_is_idempotent_and_only_notifies_on_change() {
    let harness = TestHarness::builder().staff_count(2).build();
    let sync = CapacitySynchronizer::new(harness.env.clone());
    generated_day(&harness).await;

    harness.roster.set_count(3);
    sync.sync_capacity(harness.tenant, harness.shop, d(DATE.0, DATE.1, DATE.2))
        .await
        .expect("first sync");
    let after_first = harness.sink.capacity_events().await.len();
    assert_eq!(after_first, 1);

    sync.sync_capacity(harness.tenant, harness.shop, d(DATE.0, DATE.1, DATE.2))
        .await
        .expect("second sync");
    assert_eq!(harness.sink.capacity_events().await.len(), after_first);
}

#[tokio::test]
async fn blocked_slots_are_skipped_by_sync() {
    let harness = TestHarness::builder().staff_count(2).build();
    let sync = CapacitySynchronizer::new(harness.env.clone());
    let slots = generated_day(&harness).await;

    let blocked_id = slots[0].id;
    BlockingEngine::new(harness.env.clone())
        .block(
            harness.tenant,
            harness.shop,
            SlotSelector::ById(blocked_id),
            UserId::new(),
            None,
        )
        .await
        .expect("block");

    harness.roster.set_count(5);
    let synced = sync
        .sync_capacity(harness.tenant, harness.shop, d(DATE.0, DATE.1, DATE.2))
        .await
        .expect("sync");

    assert!(synced.iter().all(|s| s.id != blocked_id));
    let blocked = harness.store.slot(blocked_id).await.expect("slot");
    assert_eq!(blocked.capacity, 2);
    assert_eq!(blocked.status, SlotStatus::Blocked);
}

#[tokio::test]
async fn set_capacity_resizes_one_slot() {
    let harness = TestHarness::builder().staff_count(2).build();
    let sync = CapacitySynchronizer::new(harness.env.clone());
    let slots = generated_day(&harness).await;

    let slot = sync
        .set_capacity(harness.tenant, slots[0].id, 5)
        .await
        .expect("set");
    assert_eq!(slot.capacity, 5);
    assert_eq!(slot.status, SlotStatus::Available);
    assert!(!harness.sink.capacity_events().await.is_empty());
}

#[tokio::test]
async fn set_capacity_rejects_zero_and_stranding_bookings() {
    let harness = TestHarness::builder().staff_count(2).build();
    let sync = CapacitySynchronizer::new(harness.env.clone());
    let slots = generated_day(&harness).await;
    let id = slots[0].id;

    let err = sync
        .set_capacity(harness.tenant, id, 0)
        .await
        .expect_err("zero capacity");
    assert!(matches!(err, EngineError::Validation(_)));

    for _ in 0..2 {
        harness
            .store
            .admit(harness.tenant, id, AdmissionMode::Checked)
            .await
            .expect("admit");
    }
    let err = sync
        .set_capacity(harness.tenant, id, 1)
        .await
        .expect_err("below booked count");
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn set_capacity_refuses_blocked_slots() {
    let harness = TestHarness::builder().build();
    let sync = CapacitySynchronizer::new(harness.env.clone());
    let slots = generated_day(&harness).await;

    BlockingEngine::new(harness.env.clone())
        .block(
            harness.tenant,
            harness.shop,
            SlotSelector::ById(slots[0].id),
            UserId::new(),
            None,
        )
        .await
        .expect("block");

    let err = sync
        .set_capacity(harness.tenant, slots[0].id, 3)
        .await
        .expect_err("blocked");
    assert!(matches!(err, EngineError::BlockedSlot));
}
