//! Storage contracts for slots and bookings.
//!
//! The engine performs no in-process locking of its own; every concurrency
//! guarantee it needs is expressed as a store-level contract:
//!
//! - [`SlotStore::admit`] is a **single atomic conditional mutation** — the
//!   check-then-act admission race cannot occur because the capacity check and
//!   the increment are one store operation.
//! - [`SlotStore::block_cascade`] is **all-or-nothing across both
//!   aggregates** — no reader may observe the slot blocked with bookings still
//!   occupying, or vice versa.
//! - [`SlotStore::resync_booked_count`] atomically recomputes a slot's booked
//!   count from the live set of occupying bookings.
//!
//! The domain transition rules themselves stay in this crate as pure
//! functions ([`Slot::apply_block`], [`Booking::apply_cancel`],
//! [`derive_status`](crate::types::derive_status)); store implementations
//! apply them inside whatever transactional boundary they own. Every method is
//! scoped by [`TenantId`]: implementations must never let a lookup cross
//! tenant boundaries.

use crate::error::StoreError;
use crate::types::{
    BlockMeta, Booking, BookingId, CancelMeta, ShopId, Slot, SlotId, TenantId,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// How an admission treats the capacity comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionMode {
    /// Admit only while `booked_count < capacity` (online path)
    Checked,
    /// Skip the capacity comparison, never the blocked check (walk-in
    /// priority overbooking)
    Priority,
}

/// Outcome of an atomic admission attempt
#[derive(Clone, Debug, PartialEq)]
pub enum AdmissionOutcome {
    /// The increment was applied; carries the slot as written
    Admitted(Slot),
    /// The slot had no free capacity (checked mode only)
    Full,
    /// The slot is administratively blocked
    Blocked,
    /// No such slot within the tenant scope
    NotFound,
}

/// Persistence contract for slots.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Inserts a slot if no slot with the same (shop, date, start) key
    /// exists. Returns `true` if a row was created, `false` if the key was
    /// already taken (the existing slot is left untouched).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_new(&self, slot: Slot) -> Result<bool, StoreError>;

    /// Fetches a slot by its canonical identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get(&self, tenant: TenantId, id: SlotId) -> Result<Option<Slot>, StoreError>;

    /// Resolves the derived (date, start) addressing to a slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn find_by_start(
        &self,
        tenant: TenantId,
        shop: ShopId,
        date: NaiveDate,
        start: NaiveTime,
    ) -> Result<Option<Slot>, StoreError>;

    /// All slots of a shop on one day, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_day(
        &self,
        tenant: TenantId,
        shop: ShopId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError>;

    /// All slots of a shop in the inclusive date range, ordered by
    /// (date, start time).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_range(
        &self,
        tenant: TenantId,
        shop: ShopId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError>;

    /// Writes back a mutated slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn update(&self, slot: &Slot) -> Result<(), StoreError>;

    /// Atomically increments `booked_count` and re-derives the status.
    ///
    /// In [`AdmissionMode::Checked`] the increment only happens while
    /// `booked_count < capacity`; in [`AdmissionMode::Priority`] the capacity
    /// comparison is skipped. A blocked slot is never admitted in either
    /// mode. The check and the increment are one store-level operation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn admit(
        &self,
        tenant: TenantId,
        id: SlotId,
        mode: AdmissionMode,
    ) -> Result<AdmissionOutcome, StoreError>;

    /// Atomically recomputes `booked_count` as the live count of occupying
    /// bookings for the slot and re-derives the status. Returns the slot as
    /// written, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn resync_booked_count(
        &self,
        tenant: TenantId,
        id: SlotId,
    ) -> Result<Option<Slot>, StoreError>;

    /// Atomically blocks the slot and cancels every occupying booking in it.
    ///
    /// Applies [`Booking::apply_cancel`] with `cancel` to each occupying
    /// booking and [`Slot::apply_block`] with `block` to the slot, as one
    /// unit. Returns the blocked slot and the bookings that were cancelled,
    /// or `None` if the slot does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn block_cascade(
        &self,
        tenant: TenantId,
        id: SlotId,
        block: BlockMeta,
        cancel: CancelMeta,
    ) -> Result<Option<(Slot, Vec<Booking>)>, StoreError>;

    /// Atomically clears the block metadata ([`Slot::apply_unblock`]) and
    /// re-derives the status. Returns the slot as written, or `None` if it
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn unblock(
        &self,
        tenant: TenantId,
        id: SlotId,
        at: DateTime<Utc>,
    ) -> Result<Option<Slot>, StoreError>;
}

/// Persistence contract for bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts a new booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert(&self, booking: Booking) -> Result<(), StoreError>;

    /// Fetches a booking by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn find(&self, tenant: TenantId, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Writes back a mutated booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn save(&self, booking: &Booking) -> Result<(), StoreError>;

    /// All bookings referencing the slot, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_for_slot(
        &self,
        tenant: TenantId,
        slot: SlotId,
    ) -> Result<Vec<Booking>, StoreError>;

    /// The bookings currently occupying the slot's capacity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn occupying_for_slot(
        &self,
        tenant: TenantId,
        slot: SlotId,
    ) -> Result<Vec<Booking>, StoreError>;
}
