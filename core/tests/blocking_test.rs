//! Administrative blocking and its cancellation cascade.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use slotbook_core::admission::OnlineBookingRequest;
use slotbook_core::types::{
    Booking, BookingStatus, CancelledByType, CustomerId, Money, ServiceId, SlotId, SlotStatus,
    StaffId, UserId,
};
use slotbook_core::{
    AdmissionControl, BlockingEngine, EngineError, ServiceRecord, SlotGenerator, SlotSelector,
    DEFAULT_BLOCK_REASON,
};
use slotbook_testing::TestHarness;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

const DATE: (i32, u32, u32) = (2025, 6, 2);

struct Scene {
    harness: TestHarness,
    blocking: BlockingEngine,
    admission: AdmissionControl,
    service: ServiceId,
    slot_id: SlotId,
}

async fn scene(staff: u32) -> Scene {
    let harness = TestHarness::builder().staff_count(staff).build();
    let service = ServiceId::new();
    harness
        .catalog
        .put(ServiceRecord {
            id: service,
            name: "Haircut".to_string(),
            active: true,
            price: Money::from_cents(2_500),
        })
        .await;
    let slots = SlotGenerator::new(harness.env.clone())
        .generate_day(harness.tenant, harness.shop, d(DATE.0, DATE.1, DATE.2))
        .await
        .expect("generate");
    let slot_id = slots[0].id;
    Scene {
        blocking: BlockingEngine::new(harness.env.clone()),
        admission: AdmissionControl::new(harness.env.clone()),
        harness,
        service,
        slot_id,
    }
}

impl Scene {
    async fn book(&self) -> Booking {
        self.admission
            .create_online(
                self.harness.tenant,
                OnlineBookingRequest {
                    shop_id: self.harness.shop,
                    slot_id: self.slot_id,
                    customer_id: CustomerId::new(),
                    service_id: self.service,
                },
            )
            .await
            .expect("book")
    }
}

#[tokio::test]
async fn blocking_cancels_every_occupying_booking() {
    let scene = scene(2).await;
    let first = scene.book().await;
    let second = scene.book().await;
    let admin = UserId::new();

    let outcome = scene
        .blocking
        .block(
            scene.harness.tenant,
            scene.harness.shop,
            SlotSelector::ById(scene.slot_id),
            admin,
            Some("pipe burst".to_string()),
        )
        .await
        .expect("block");

    assert!(outcome.slot.is_blocked);
    assert_eq!(outcome.slot.status, SlotStatus::Blocked);
    assert_eq!(outcome.slot.booked_count, 0);
    assert_eq!(outcome.slot.blocked_by, Some(admin));
    assert_eq!(outcome.slot.blocked_reason.as_deref(), Some("pipe burst"));
    assert_eq!(outcome.cancelled.len(), 2);
    for booking in &outcome.cancelled {
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.cancelled_by, Some(admin));
        assert_eq!(booking.cancelled_by_type, Some(CancelledByType::Admin));
        assert_eq!(booking.cancellation_reason.as_deref(), Some("pipe burst"));
    }

    // The cascade is persisted, not just reported.
    for id in [first.id, second.id] {
        let stored = scene.harness.store.booking(id).await.expect("booking");
        assert_eq!(stored.status, BookingStatus::Cancelled);
    }

    // One booking event per cancellation, plus the capacity change.
    assert_eq!(scene.harness.sink.booking_events().await.len(), 4); // 2 creations + 2 cancellations
    assert!(!scene.harness.sink.capacity_events().await.is_empty());
}

#[tokio::test]
async fn completed_bookings_survive_the_cascade() {
    let scene = scene(2).await;
    let done = scene.book().await;
    scene
        .admission
        .start_service(scene.harness.tenant, done.id, StaffId::new())
        .await
        .expect("start");
    scene
        .admission
        .complete_service(scene.harness.tenant, done.id)
        .await
        .expect("complete");
    scene.book().await;

    let outcome = scene
        .blocking
        .block(
            scene.harness.tenant,
            scene.harness.shop,
            SlotSelector::ById(scene.slot_id),
            UserId::new(),
            None,
        )
        .await
        .expect("block");

    assert_eq!(outcome.cancelled.len(), 1);
    let stored = scene.harness.store.booking(done.id).await.expect("booking");
    assert_eq!(stored.status, BookingStatus::Completed);
}

#[tokio::test]
async fn blocking_an_empty_slot_cancels_nothing() {
    let scene = scene(2).await;

    let outcome = scene
        .blocking
        .block(
            scene.harness.tenant,
            scene.harness.shop,
            SlotSelector::ById(scene.slot_id),
            UserId::new(),
            None,
        )
        .await
        .expect("block");

    assert!(outcome.cancelled.is_empty());
    assert_eq!(outcome.slot.blocked_reason.as_deref(), Some(DEFAULT_BLOCK_REASON));
}

#[tokio::test]
async fn a_blocked_slot_cannot_be_blocked_again() {
    let scene = scene(2).await;
    let selector = SlotSelector::ById(scene.slot_id);

    scene
        .blocking
        .block(scene.harness.tenant, scene.harness.shop, selector, UserId::new(), None)
        .await
        .expect("first block");
    let err = scene
        .blocking
        .block(scene.harness.tenant, scene.harness.shop, selector, UserId::new(), None)
        .await
        .expect_err("second block");
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn blocked_slots_refuse_new_bookings() {
    let scene = scene(2).await;
    scene
        .blocking
        .block(
            scene.harness.tenant,
            scene.harness.shop,
            SlotSelector::ById(scene.slot_id),
            UserId::new(),
            None,
        )
        .await
        .expect("block");

    let err = scene
        .admission
        .create_online(
            scene.harness.tenant,
            OnlineBookingRequest {
                shop_id: scene.harness.shop,
                slot_id: scene.slot_id,
                customer_id: CustomerId::new(),
                service_id: scene.service,
            },
        )
        .await
        .expect_err("blocked slot");
    assert!(matches!(err, EngineError::BlockedSlot));
}

#[tokio::test]
async fn unblocking_restores_availability() {
    let scene = scene(2).await;
    let selector = SlotSelector::ById(scene.slot_id);
    scene
        .blocking
        .block(scene.harness.tenant, scene.harness.shop, selector, UserId::new(), None)
        .await
        .expect("block");

    let slot = scene
        .blocking
        .unblock(scene.harness.tenant, scene.harness.shop, selector)
        .await
        .expect("unblock");

    assert!(!slot.is_blocked);
    assert_eq!(slot.status, SlotStatus::Available);
    assert!(slot.blocked_by.is_none());
    assert!(slot.blocked_reason.is_none());
    assert!(slot.blocked_at.is_none());
    assert!(slot.unblock_at.is_some());

    // And it takes bookings again.
    scene.book().await;
}

#[tokio::test]
async fn unblocking_an_open_slot_is_a_conflict() {
    let scene = scene(2).await;
    let err = scene
        .blocking
        .unblock(
            scene.harness.tenant,
            scene.harness.shop,
            SlotSelector::ById(scene.slot_id),
        )
        .await
        .expect_err("not blocked");
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn a_slot_can_be_addressed_by_date_and_start() {
    let scene = scene(2).await;
    let stored = scene
        .harness
        .store
        .slot(scene.slot_id)
        .await
        .expect("slot");

    let outcome = scene
        .blocking
        .block(
            scene.harness.tenant,
            scene.harness.shop,
            SlotSelector::ByStart {
                date: stored.date,
                start_time: stored.start_time,
            },
            UserId::new(),
            None,
        )
        .await
        .expect("block by start");
    assert_eq!(outcome.slot.id, scene.slot_id);
}

#[tokio::test]
async fn an_unknown_selector_is_not_found() {
    let scene = scene(2).await;
    let err = scene
        .blocking
        .block(
            scene.harness.tenant,
            scene.harness.shop,
            SlotSelector::ByStart {
                date: d(2025, 6, 3),
                start_time: chrono::NaiveTime::from_hms_opt(3, 0, 0).unwrap(),
            },
            UserId::new(),
            None,
        )
        .await
        .expect_err("no such slot");
    assert!(matches!(err, EngineError::NotFound { entity: "slot", .. }));
}
