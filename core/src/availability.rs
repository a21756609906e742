//! Customer-visible availability queries.
//!
//! Read-only filter over slots: a slot is available when it is not blocked,
//! its derived status is available, and it has free capacity. The range query
//! is a finite, restartable stream that pages through the store day by day.

use crate::environment::Environment;
use crate::error::{EngineError, Result};
use crate::types::{ShopId, Slot, SlotId, SlotStatus, TenantId};
use async_stream::try_stream;
use chrono::{Duration, NaiveDate};
use futures::Stream;

/// Read-only availability filter over slots.
#[derive(Clone, Debug)]
pub struct AvailabilityQuery {
    env: Environment,
}

impl AvailabilityQuery {
    /// Creates an availability query over the given environment.
    #[must_use]
    pub const fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Streams the customer-visible slots of a shop over the inclusive date
    /// range, ordered by (date, start time).
    ///
    /// The stream is lazy (one store call per day as it is polled), finite,
    /// and restartable by calling this again. Blocked and full slots never
    /// appear, regardless of their counts.
    pub fn list_available(
        &self,
        tenant: TenantId,
        shop: ShopId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Stream<Item = Result<Slot>> + '_ {
        try_stream! {
            let mut date = from;
            while date <= to {
                let slots = self.env.slots.list_day(tenant, shop, date).await?;
                for slot in slots {
                    if Self::is_slot_available(&slot) {
                        yield slot;
                    }
                }
                date += Duration::days(1);
            }
        }
    }

    /// Whether the slot currently admits a capacity-checked booking.
    ///
    /// A missing slot is simply not available.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] on backend failure.
    pub async fn is_available(&self, tenant: TenantId, id: SlotId) -> Result<bool> {
        let slot = self.env.slots.get(tenant, id).await?;
        Ok(slot.is_some_and(|slot| Self::is_slot_available(&slot)))
    }

    /// Fetches a slot and fails unless it currently admits a booking.
    ///
    /// Used as the online admission pre-check.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the slot does not exist
    /// - [`EngineError::BlockedSlot`] if it is blocked
    /// - [`EngineError::FullSlot`] if it has no free capacity
    /// - [`EngineError::Store`] on backend failure
    pub async fn require_available(&self, tenant: TenantId, id: SlotId) -> Result<Slot> {
        let slot = self
            .env
            .slots
            .get(tenant, id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "slot",
                id: id.to_string(),
            })?;
        if slot.is_blocked {
            return Err(EngineError::BlockedSlot);
        }
        if slot.booked_count >= slot.capacity {
            return Err(EngineError::FullSlot);
        }
        Ok(slot)
    }

    fn is_slot_available(slot: &Slot) -> bool {
        !slot.is_blocked
            && slot.status == SlotStatus::Available
            && slot.booked_count < slot.capacity
    }
}
