//! Capacity synchronization.
//!
//! Invoked whenever a shop's active staff roster changes: recomputes each
//! non-blocked slot's `max_capacity` from the roster and floors `capacity` at
//! the current booked count, so synchronization can never strand existing
//! bookings. Blocked slots are skipped entirely.

use crate::environment::Environment;
use crate::error::{EngineError, Result};
use crate::notify;
use crate::types::{derive_status, ShopId, Slot, SlotId, TenantId};
use chrono::NaiveDate;

/// Recomputes slot capacities in response to staff roster changes.
#[derive(Clone, Debug)]
pub struct CapacitySynchronizer {
    env: Environment,
}

impl CapacitySynchronizer {
    /// Creates a synchronizer over the given environment.
    #[must_use]
    pub const fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Synchronizes every non-blocked slot of the shop on the given day with
    /// the current active staff count.
    ///
    /// For each slot: `max_capacity` becomes the active staff count and
    /// `capacity` becomes `max(active, booked_count)` — it can rise or shrink
    /// toward the roster, but never below current bookings. Repeated
    /// invocation with an unchanged roster is a no-op. A capacity-change
    /// notification is emitted after persisting, and only if something
    /// actually changed.
    ///
    /// Returns the synchronized (non-blocked) slots.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] on backend failure.
    pub async fn sync_capacity(
        &self,
        tenant: TenantId,
        shop: ShopId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>> {
        let active = self.env.roster.active_staff_count(tenant, shop).await?;
        let slots = self.env.slots.list_day(tenant, shop, date).await?;

        let mut synced = Vec::new();
        let mut changed = 0usize;
        for mut slot in slots {
            if slot.is_blocked {
                continue;
            }
            let capacity = active.max(slot.booked_count);
            let status = derive_status(false, capacity, slot.booked_count);
            if slot.max_capacity != active || slot.capacity != capacity || slot.status != status {
                slot.max_capacity = active;
                slot.capacity = capacity;
                slot.status = status;
                self.env.slots.update(&slot).await?;
                changed += 1;
            }
            synced.push(slot);
        }

        if changed > 0 {
            tracing::info!(%tenant, %shop, %date, active, changed, "capacity synchronized");
            notify::emit_capacity(self.env.notifications.as_ref(), tenant, shop, Some(date)).await;
        }
        Ok(synced)
    }

    /// Manually adjusts one slot's capacity.
    ///
    /// Administrative escape hatch for sizing a single slot independently of
    /// the roster; the next `sync_capacity` run folds it back toward the
    /// staff count.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] if `new_capacity` is zero
    /// - [`EngineError::NotFound`] if the slot does not exist
    /// - [`EngineError::BlockedSlot`] if the slot is blocked
    /// - [`EngineError::Conflict`] if `new_capacity` is below the current
    ///   booked count
    /// - [`EngineError::Store`] on backend failure
    pub async fn set_capacity(
        &self,
        tenant: TenantId,
        id: SlotId,
        new_capacity: u32,
    ) -> Result<Slot> {
        if new_capacity == 0 {
            return Err(EngineError::Validation(
                "capacity must be at least 1".to_string(),
            ));
        }
        let mut slot = self
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
        if new_capacity < slot.booked_count {
            return Err(EngineError::Conflict(format!(
                "cannot reduce capacity to {new_capacity} below {} current bookings",
                slot.booked_count
            )));
        }

        slot.capacity = new_capacity;
        slot.recompute_status();
        self.env.slots.update(&slot).await?;
        tracing::info!(%tenant, slot_id = %id, new_capacity, "slot capacity set");
        notify::emit_capacity(
            self.env.notifications.as_ref(),
            tenant,
            slot.shop_id,
            Some(slot.date),
        )
        .await;
        Ok(slot)
    }
}
