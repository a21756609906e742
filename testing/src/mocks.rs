//! Mock implementations of the engine's environment traits.
//!
//! The centerpiece is [`InMemoryStore`], which implements both store traits
//! over a single `tokio::sync::Mutex` — one serialization point, so the
//! atomicity contracts of `admit`, `resync_booked_count` and `block_cascade`
//! hold by construction. The remaining mocks are small static providers plus
//! a [`RecordingSink`] that captures emitted notifications for assertions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use slotbook_core::environment::{
    Clock, CustomerDirectory, ServiceCatalog, ServiceRecord, ShopDirectory, StaffRoster,
};
use slotbook_core::notify::{BookingChanged, CapacityChanged, NotificationSink, NotifyError};
use slotbook_core::store::{AdmissionMode, AdmissionOutcome, BookingStore, SlotStore};
use slotbook_core::types::{
    BlockMeta, Booking, BookingId, CancelMeta, CustomerId, ServiceId, ShopConfig, ShopId,
    ShopSettings, Slot, SlotId, TenantId,
};
use slotbook_core::StoreError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Mutex;

// ============================================================================
// Clock
// ============================================================================

/// Fixed clock for deterministic tests.
///
/// Always returns the same time, making tests reproducible.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

#[derive(Debug, Default)]
struct World {
    slots: HashMap<SlotId, Slot>,
    bookings: HashMap<BookingId, Booking>,
}

/// In-memory slot + booking store.
///
/// Every operation takes the single world lock, which makes each store method
/// atomic with respect to every other — the in-memory counterpart of the
/// conditional-update/transaction guarantees the Postgres store provides.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    world: Mutex<World>,
}

impl InMemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read of a slot, bypassing tenant scoping (assertion helper)
    pub async fn slot(&self, id: SlotId) -> Option<Slot> {
        self.world.lock().await.slots.get(&id).cloned()
    }

    /// Direct read of a booking, bypassing tenant scoping (assertion helper)
    pub async fn booking(&self, id: BookingId) -> Option<Booking> {
        self.world.lock().await.bookings.get(&id).cloned()
    }
}

fn occupying_count(world: &World, tenant: TenantId, slot: SlotId) -> u32 {
    let count = world
        .bookings
        .values()
        .filter(|b| b.tenant_id == tenant && b.slot_id == slot && b.is_occupying())
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[async_trait]
impl SlotStore for InMemoryStore {
    async fn insert_new(&self, slot: Slot) -> Result<bool, StoreError> {
        let mut world = self.world.lock().await;
        let exists = world.slots.values().any(|s| {
            s.tenant_id == slot.tenant_id
                && s.shop_id == slot.shop_id
                && s.date == slot.date
                && s.start_time == slot.start_time
        });
        if exists {
            return Ok(false);
        }
        world.slots.insert(slot.id, slot);
        Ok(true)
    }

    async fn get(&self, tenant: TenantId, id: SlotId) -> Result<Option<Slot>, StoreError> {
        let world = self.world.lock().await;
        Ok(world
            .slots
            .get(&id)
            .filter(|s| s.tenant_id == tenant)
            .cloned())
    }

    async fn find_by_start(
        &self,
        tenant: TenantId,
        shop: ShopId,
        date: NaiveDate,
        start: NaiveTime,
    ) -> Result<Option<Slot>, StoreError> {
        let world = self.world.lock().await;
        Ok(world
            .slots
            .values()
            .find(|s| {
                s.tenant_id == tenant
                    && s.shop_id == shop
                    && s.date == date
                    && s.start_time == start
            })
            .cloned())
    }

    async fn list_day(
        &self,
        tenant: TenantId,
        shop: ShopId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError> {
        self.list_range(tenant, shop, date, date).await
    }

    async fn list_range(
        &self,
        tenant: TenantId,
        shop: ShopId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError> {
        let world = self.world.lock().await;
        let mut slots: Vec<Slot> = world
            .slots
            .values()
            .filter(|s| {
                s.tenant_id == tenant && s.shop_id == shop && s.date >= from && s.date <= to
            })
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.date, s.start_time));
        Ok(slots)
    }

    async fn update(&self, slot: &Slot) -> Result<(), StoreError> {
        let mut world = self.world.lock().await;
        if !world.slots.contains_key(&slot.id) {
            return Err(StoreError::Backend(format!(
                "update of unknown slot {}",
                slot.id
            )));
        }
        world.slots.insert(slot.id, slot.clone());
        Ok(())
    }

    async fn admit(
        &self,
        tenant: TenantId,
        id: SlotId,
        mode: AdmissionMode,
    ) -> Result<AdmissionOutcome, StoreError> {
        let mut world = self.world.lock().await;
        let Some(slot) = world.slots.get_mut(&id).filter(|s| s.tenant_id == tenant) else {
            return Ok(AdmissionOutcome::NotFound);
        };
        if slot.is_blocked {
            return Ok(AdmissionOutcome::Blocked);
        }
        if mode == AdmissionMode::Checked && slot.booked_count >= slot.capacity {
            return Ok(AdmissionOutcome::Full);
        }
        slot.booked_count += 1;
        slot.recompute_status();
        Ok(AdmissionOutcome::Admitted(slot.clone()))
    }

    async fn resync_booked_count(
        &self,
        tenant: TenantId,
        id: SlotId,
    ) -> Result<Option<Slot>, StoreError> {
        let mut world = self.world.lock().await;
        let booked = occupying_count(&world, tenant, id);
        let Some(slot) = world.slots.get_mut(&id).filter(|s| s.tenant_id == tenant) else {
            return Ok(None);
        };
        slot.booked_count = booked;
        slot.recompute_status();
        Ok(Some(slot.clone()))
    }

    async fn block_cascade(
        &self,
        tenant: TenantId,
        id: SlotId,
        block: BlockMeta,
        cancel: CancelMeta,
    ) -> Result<Option<(Slot, Vec<Booking>)>, StoreError> {
        let mut world = self.world.lock().await;
        if !world
            .slots
            .get(&id)
            .is_some_and(|s| s.tenant_id == tenant)
        {
            return Ok(None);
        }
        let mut cancelled = Vec::new();
        for booking in world.bookings.values_mut() {
            if booking.tenant_id == tenant && booking.slot_id == id && booking.is_occupying() {
                booking.apply_cancel(&cancel);
                cancelled.push(booking.clone());
            }
        }
        cancelled.sort_by_key(|b| b.created_at);
        let Some(slot) = world.slots.get_mut(&id) else {
            return Ok(None);
        };
        slot.apply_block(&block);
        Ok(Some((slot.clone(), cancelled)))
    }

    async fn unblock(
        &self,
        tenant: TenantId,
        id: SlotId,
        at: DateTime<Utc>,
    ) -> Result<Option<Slot>, StoreError> {
        let mut world = self.world.lock().await;
        let Some(slot) = world.slots.get_mut(&id).filter(|s| s.tenant_id == tenant) else {
            return Ok(None);
        };
        slot.apply_unblock(at);
        Ok(Some(slot.clone()))
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert(&self, booking: Booking) -> Result<(), StoreError> {
        let mut world = self.world.lock().await;
        world.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn find(&self, tenant: TenantId, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let world = self.world.lock().await;
        Ok(world
            .bookings
            .get(&id)
            .filter(|b| b.tenant_id == tenant)
            .cloned())
    }

    async fn save(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut world = self.world.lock().await;
        if !world.bookings.contains_key(&booking.id) {
            return Err(StoreError::Backend(format!(
                "update of unknown booking {}",
                booking.id
            )));
        }
        world.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn list_for_slot(
        &self,
        tenant: TenantId,
        slot: SlotId,
    ) -> Result<Vec<Booking>, StoreError> {
        let world = self.world.lock().await;
        let mut bookings: Vec<Booking> = world
            .bookings
            .values()
            .filter(|b| b.tenant_id == tenant && b.slot_id == slot)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn occupying_for_slot(
        &self,
        tenant: TenantId,
        slot: SlotId,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut bookings = self.list_for_slot(tenant, slot).await?;
        bookings.retain(Booking::is_occupying);
        Ok(bookings)
    }
}

// ============================================================================
// Collaborator Mocks
// ============================================================================

/// Staff roster returning an adjustable count for every shop
#[derive(Debug, Default)]
pub struct StaticRoster {
    count: AtomicU32,
}

impl StaticRoster {
    /// Roster with the given active-staff count
    #[must_use]
    pub const fn new(count: u32) -> Self {
        Self {
            count: AtomicU32::new(count),
        }
    }

    /// Changes the active-staff count (simulates roster changes)
    pub fn set_count(&self, count: u32) {
        self.count.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl StaffRoster for StaticRoster {
    async fn active_staff_count(
        &self,
        _tenant: TenantId,
        _shop: ShopId,
    ) -> Result<u32, StoreError> {
        Ok(self.count.load(Ordering::SeqCst))
    }
}

/// Catalog over a mutable in-memory set of services
#[derive(Debug, Default)]
pub struct StaticCatalog {
    services: Mutex<HashMap<ServiceId, ServiceRecord>>,
}

impl StaticCatalog {
    /// Empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a service
    pub async fn put(&self, service: ServiceRecord) {
        self.services.lock().await.insert(service.id, service);
    }
}

#[async_trait]
impl ServiceCatalog for StaticCatalog {
    async fn service(
        &self,
        _tenant: TenantId,
        service: ServiceId,
    ) -> Result<Option<ServiceRecord>, StoreError> {
        Ok(self.services.lock().await.get(&service).cloned())
    }
}

/// Shop directory serving one configuration and one settings value for every
/// shop, both adjustable mid-test
#[derive(Debug)]
pub struct StaticShopDirectory {
    config: Mutex<Option<ShopConfig>>,
    settings: Mutex<ShopSettings>,
}

impl StaticShopDirectory {
    /// Directory answering with the given config and settings
    #[must_use]
    pub fn new(config: ShopConfig, settings: ShopSettings) -> Self {
        Self {
            config: Mutex::new(Some(config)),
            settings: Mutex::new(settings),
        }
    }

    /// Replaces the served configuration (`None` simulates an unknown shop)
    pub async fn set_config(&self, config: Option<ShopConfig>) {
        *self.config.lock().await = config;
    }

    /// Replaces the served settings
    pub async fn set_settings(&self, settings: ShopSettings) {
        *self.settings.lock().await = settings;
    }
}

#[async_trait]
impl ShopDirectory for StaticShopDirectory {
    async fn config(
        &self,
        _tenant: TenantId,
        _shop: ShopId,
    ) -> Result<Option<ShopConfig>, StoreError> {
        Ok(self.config.lock().await.clone())
    }

    async fn settings(&self, _tenant: TenantId, _shop: ShopId) -> Result<ShopSettings, StoreError> {
        Ok(self.settings.lock().await.clone())
    }
}

/// Customer directory keyed by (tenant, email)
#[derive(Debug, Default)]
pub struct InMemoryCustomers {
    by_email: Mutex<HashMap<(TenantId, String), CustomerId>>,
}

impl InMemoryCustomers {
    /// Empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known customers
    pub async fn len(&self) -> usize {
        self.by_email.lock().await.len()
    }

    /// Whether the directory is empty
    pub async fn is_empty(&self) -> bool {
        self.by_email.lock().await.is_empty()
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomers {
    async fn find_or_create(
        &self,
        tenant: TenantId,
        email: &str,
        _name: &str,
    ) -> Result<CustomerId, StoreError> {
        let mut by_email = self.by_email.lock().await;
        let id = by_email
            .entry((tenant, email.to_string()))
            .or_insert_with(CustomerId::new);
        Ok(*id)
    }
}

// ============================================================================
// Recording Notification Sink
// ============================================================================

/// Sink that captures every emitted event for assertions.
///
/// Can be switched into a failing mode to verify that delivery failures stay
/// best-effort and never fail the underlying operation.
#[derive(Debug, Default)]
pub struct RecordingSink {
    capacity: Mutex<Vec<CapacityChanged>>,
    bookings: Mutex<Vec<BookingChanged>>,
    failing: AtomicBool,
}

impl RecordingSink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Capacity events captured so far
    pub async fn capacity_events(&self) -> Vec<CapacityChanged> {
        self.capacity.lock().await.clone()
    }

    /// Booking events captured so far
    pub async fn booking_events(&self) -> Vec<BookingChanged> {
        self.bookings.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn capacity_changed(&self, event: CapacityChanged) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError("sink switched off".to_string()));
        }
        self.capacity.lock().await.push(event);
        Ok(())
    }

    async fn booking_changed(&self, event: BookingChanged) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError("sink switched off".to_string()));
        }
        self.bookings.lock().await.push(event);
        Ok(())
    }
}
