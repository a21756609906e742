//! Administrative slot blocking.
//!
//! Blocking removes a slot from availability and force-cancels every booking
//! currently occupying it; unblocking restores it. The cascade is a single
//! atomic store operation: no observer may see the slot blocked with bookings
//! still occupying, or unblocked with its bookings already cancelled.

use crate::environment::Environment;
use crate::error::{EngineError, Result};
use crate::notify;
use crate::types::{
    BlockMeta, Booking, CancelMeta, CancelledByType, ShopId, Slot, SlotId, TenantId, UserId,
};
use chrono::{NaiveDate, NaiveTime};

/// Reason recorded when an administrator blocks a slot without giving one
pub const DEFAULT_BLOCK_REASON: &str = "Slot blocked by admin";

/// Addresses a slot either canonically by id or by its (date, start) key.
///
/// The composite form is resolved to an id before any mutation, so both
/// addressings share one code path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotSelector {
    /// Canonical identifier
    ById(SlotId),
    /// Derived (date, start-time) lookup within the shop
    ByStart {
        /// Calendar day
        date: NaiveDate,
        /// Window start
        start_time: NaiveTime,
    },
}

/// Result of a block operation: the blocked slot and every booking the
/// cascade cancelled, for audit and customer notification.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockOutcome {
    /// The slot as written
    pub slot: Slot,
    /// The bookings cancelled by the cascade
    pub cancelled: Vec<Booking>,
}

/// Blocks and unblocks slots, cascading cancellation into open bookings.
#[derive(Clone, Debug)]
pub struct BlockingEngine {
    env: Environment,
}

impl BlockingEngine {
    /// Creates a blocking engine over the given environment.
    #[must_use]
    pub const fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Blocks a slot, cancelling every occupying booking in it.
    ///
    /// Each cancelled booking records `cancelled_by_type = admin`, the acting
    /// user, the given reason (defaulting to [`DEFAULT_BLOCK_REASON`]) and
    /// the block timestamp. The slot's `booked_count` is forced to zero;
    /// capacity is left untouched. Emits a capacity-change notification and
    /// one booking-change notification per cancelled booking.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the selector resolves to no slot
    /// - [`EngineError::Conflict`] if the slot is already blocked
    /// - [`EngineError::Store`] on backend failure
    pub async fn block(
        &self,
        tenant: TenantId,
        shop: ShopId,
        selector: SlotSelector,
        actor: UserId,
        reason: Option<String>,
    ) -> Result<BlockOutcome> {
        let slot = self.resolve(tenant, shop, selector).await?;
        if slot.is_blocked {
            return Err(EngineError::Conflict(format!(
                "slot {} is already blocked",
                slot.id
            )));
        }

        let now = self.env.clock.now();
        let reason = reason.unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string());
        let block = BlockMeta {
            blocked_by: actor,
            reason: reason.clone(),
            at: now,
        };
        let cancel = CancelMeta {
            cancelled_by: Some(actor),
            cancelled_by_type: CancelledByType::Admin,
            reason,
            at: now,
        };

        let (slot, cancelled) = self
            .env
            .slots
            .block_cascade(tenant, slot.id, block, cancel)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "slot",
                id: slot.id.to_string(),
            })?;

        tracing::info!(
            %tenant,
            slot_id = %slot.id,
            blocked_by = %actor,
            cancelled = cancelled.len(),
            "slot blocked"
        );
        for booking in &cancelled {
            notify::emit_booking(self.env.notifications.as_ref(), booking).await;
        }
        notify::emit_capacity(
            self.env.notifications.as_ref(),
            tenant,
            slot.shop_id,
            Some(slot.date),
        )
        .await;
        Ok(BlockOutcome { slot, cancelled })
    }

    /// Unblocks a slot, restoring it to availability.
    ///
    /// Clears the block metadata, stamps `unblock_at`, and re-derives the
    /// status from the current capacity and booked count (zero right after a
    /// block, since no booking can land in a blocked slot). Emits a
    /// capacity-change notification.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the selector resolves to no slot
    /// - [`EngineError::Conflict`] if the slot is not currently blocked
    /// - [`EngineError::Store`] on backend failure
    pub async fn unblock(
        &self,
        tenant: TenantId,
        shop: ShopId,
        selector: SlotSelector,
    ) -> Result<Slot> {
        let slot = self.resolve(tenant, shop, selector).await?;
        if !slot.is_blocked {
            return Err(EngineError::Conflict(format!(
                "slot {} is not blocked",
                slot.id
            )));
        }

        let slot = self
            .env
            .slots
            .unblock(tenant, slot.id, self.env.clock.now())
            .await?
            .ok_or(EngineError::NotFound {
                entity: "slot",
                id: slot.id.to_string(),
            })?;

        tracing::info!(%tenant, slot_id = %slot.id, status = %slot.status, "slot unblocked");
        notify::emit_capacity(
            self.env.notifications.as_ref(),
            tenant,
            slot.shop_id,
            Some(slot.date),
        )
        .await;
        Ok(slot)
    }

    async fn resolve(
        &self,
        tenant: TenantId,
        shop: ShopId,
        selector: SlotSelector,
    ) -> Result<Slot> {
        let found = match selector {
            SlotSelector::ById(id) => self.env.slots.get(tenant, id).await?,
            SlotSelector::ByStart { date, start_time } => {
                self.env
                    .slots
                    .find_by_start(tenant, shop, date, start_time)
                    .await?
            }
        };
        found.ok_or_else(|| EngineError::NotFound {
            entity: "slot",
            id: match selector {
                SlotSelector::ById(id) => id.to_string(),
                SlotSelector::ByStart { date, start_time } => format!("{date} {start_time}"),
            },
        })
    }
}
