//! Contract tests for the in-memory store.
//!
//! The engine's correctness rests on the store-level atomicity of `admit`,
//! `resync_booked_count` and `block_cascade`; these tests pin the in-memory
//! implementation to the same observable behavior the PostgreSQL store
//! provides.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use chrono::{NaiveDate, NaiveTime, Utc};
use slotbook_core::store::{AdmissionMode, AdmissionOutcome, BookingStore, SlotStore};
use slotbook_core::types::{
    BlockMeta, Booking, BookingSource, BookingStatus, CancelMeta, CancelledByType, CustomerId,
    Money, ServiceId, ShopId, Slot, SlotStatus, TenantId, UserId,
};
use slotbook_testing::mocks::InMemoryStore;
use std::sync::Arc;

fn make_slot(tenant: TenantId, shop: ShopId, capacity: u32) -> Slot {
    Slot::new(
        tenant,
        shop,
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        capacity,
    )
}

fn make_booking(slot: &Slot) -> Booking {
    Booking::new(
        slot,
        CustomerId::new(),
        ServiceId::new(),
        BookingStatus::Confirmed,
        BookingSource::Online,
        Money::from_cents(2_500),
        Utc::now(),
    )
}

#[tokio::test]
async fn insert_is_idempotent_on_the_slot_key() {
    let store = InMemoryStore::new();
    let tenant = TenantId::new();
    let shop = ShopId::new();

    let slot = make_slot(tenant, shop, 2);
    assert!(store.insert_new(slot.clone()).await.unwrap());

    // Same (shop, date, start) key, different id: must not create a row.
    let duplicate = make_slot(tenant, shop, 5);
    assert!(!store.insert_new(duplicate).await.unwrap());

    let day = store.list_day(tenant, shop, slot.date).await.unwrap();
    assert_eq!(day.len(), 1);
    assert_eq!(day[0].capacity, 2);
}

#[tokio::test]
async fn admission_is_scoped_to_the_tenant() {
    let store = InMemoryStore::new();
    let tenant = TenantId::new();
    let slot = make_slot(tenant, ShopId::new(), 2);
    let id = slot.id;
    store.insert_new(slot).await.unwrap();

    let outcome = store
        .admit(TenantId::new(), id, AdmissionMode::Checked)
        .await
        .unwrap();
    assert_eq!(outcome, AdmissionOutcome::NotFound);

    let untouched = store.get(tenant, id).await.unwrap().unwrap();
    assert_eq!(untouched.booked_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admissions_never_exceed_capacity() {
    let store = Arc::new(InMemoryStore::new());
    let tenant = TenantId::new();
    let slot = make_slot(tenant, ShopId::new(), 3);
    let slot_id = slot.id;
    store.insert_new(slot).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .admit(tenant, slot_id, AdmissionMode::Checked)
                .await
                .unwrap()
        }));
    }

    let mut admitted = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            AdmissionOutcome::Admitted(_) => admitted += 1,
            AdmissionOutcome::Full => full += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(admitted, 3);
    assert_eq!(full, 7);

    let slot = store.get(tenant, slot_id).await.unwrap().unwrap();
    assert_eq!(slot.booked_count, 3);
    assert_eq!(slot.status, SlotStatus::Full);
}

#[tokio::test]
async fn priority_admission_passes_capacity_but_not_blocks() {
    let store = InMemoryStore::new();
    let tenant = TenantId::new();
    let slot = make_slot(tenant, ShopId::new(), 1);
    let slot_id = slot.id;
    store.insert_new(slot).await.unwrap();

    store
        .admit(tenant, slot_id, AdmissionMode::Checked)
        .await
        .unwrap();
    let outcome = store
        .admit(tenant, slot_id, AdmissionMode::Priority)
        .await
        .unwrap();
    let AdmissionOutcome::Admitted(slot) = outcome else {
        panic!("priority admission should pass a full slot");
    };
    assert_eq!(slot.booked_count, 2);
    assert_eq!(slot.status, SlotStatus::Full);

    let admin = UserId::new();
    let now = Utc::now();
    store
        .block_cascade(
            tenant,
            slot_id,
            BlockMeta {
                blocked_by: admin,
                reason: "maintenance".to_string(),
                at: now,
            },
            CancelMeta {
                cancelled_by: Some(admin),
                cancelled_by_type: CancelledByType::Admin,
                reason: "maintenance".to_string(),
                at: now,
            },
        )
        .await
        .unwrap();

    let outcome = store
        .admit(tenant, slot_id, AdmissionMode::Priority)
        .await
        .unwrap();
    assert_eq!(outcome, AdmissionOutcome::Blocked);
}

#[tokio::test]
async fn block_cascade_cancels_every_occupying_booking() {
    let store = InMemoryStore::new();
    let tenant = TenantId::new();
    let slot = make_slot(tenant, ShopId::new(), 2);
    let slot_id = slot.id;
    store.insert_new(slot.clone()).await.unwrap();
    for _ in 0..2 {
        let AdmissionOutcome::Admitted(written) = store
            .admit(tenant, slot_id, AdmissionMode::Checked)
            .await
            .unwrap()
        else {
            panic!("admission should succeed");
        };
        store.insert(make_booking(&written)).await.unwrap();
    }

    let admin = UserId::new();
    let now = Utc::now();
    let (blocked, cancelled) = store
        .block_cascade(
            tenant,
            slot_id,
            BlockMeta {
                blocked_by: admin,
                reason: "maintenance".to_string(),
                at: now,
            },
            CancelMeta {
                cancelled_by: Some(admin),
                cancelled_by_type: CancelledByType::Admin,
                reason: "maintenance".to_string(),
                at: now,
            },
        )
        .await
        .unwrap()
        .expect("slot exists");

    assert!(blocked.is_blocked);
    assert_eq!(blocked.status, SlotStatus::Blocked);
    assert_eq!(blocked.booked_count, 0);
    assert_eq!(cancelled.len(), 2);
    for booking in &cancelled {
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.cancelled_by_type, Some(CancelledByType::Admin));
    }
    assert!(
        store
            .occupying_for_slot(tenant, slot_id)
            .await
            .unwrap()
            .is_empty()
    );

    let unblocked = store
        .unblock(tenant, slot_id, Utc::now())
        .await
        .unwrap()
        .expect("slot exists");
    assert_eq!(unblocked.status, SlotStatus::Available);
    assert!(unblocked.blocked_by.is_none());
}

#[tokio::test]
async fn resync_recounts_live_bookings() {
    let store = InMemoryStore::new();
    let tenant = TenantId::new();
    let slot = make_slot(tenant, ShopId::new(), 2);
    let slot_id = slot.id;
    store.insert_new(slot.clone()).await.unwrap();

    let mut booking = make_booking(&slot);
    store.insert(booking.clone()).await.unwrap();
    let synced = store
        .resync_booked_count(tenant, slot_id)
        .await
        .unwrap()
        .expect("slot exists");
    assert_eq!(synced.booked_count, 1);

    booking.apply_cancel(&CancelMeta {
        cancelled_by: None,
        cancelled_by_type: CancelledByType::Customer,
        reason: "changed my mind".to_string(),
        at: Utc::now(),
    });
    store.save(&booking).await.unwrap();

    let synced = store
        .resync_booked_count(tenant, slot_id)
        .await
        .unwrap()
        .expect("slot exists");
    assert_eq!(synced.booked_count, 0);
    assert_eq!(synced.status, SlotStatus::Available);
}
