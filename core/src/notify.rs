//! Notification contract.
//!
//! The engine's only outbound surface besides the store: after any committed
//! operation that changes a slot's capacity, booked count or blocked state it
//! emits a [`CapacityChanged`] event, and after any booking transition a
//! [`BookingChanged`] event. Delivery is **emit-after-commit, at-least-once,
//! best-effort**: a sink failure is logged and never surfaces as a failure of
//! the underlying operation.
//!
//! The sink is injected per [`Environment`](crate::environment::Environment);
//! there is no process-wide delivery switch. Components built without a real
//! sink use [`NoopSink`].

use crate::types::{Booking, ShopId, TenantId};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Error type for notification delivery
#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Emitted after any operation that changes a slot's capacity, booked count
/// or blocked state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityChanged {
    /// Tenant scope
    pub tenant_id: TenantId,
    /// Affected shop
    pub shop_id: ShopId,
    /// Affected day, when the operation is day-scoped
    pub date: Option<NaiveDate>,
}

/// Emitted after any booking status transition, with the updated booking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingChanged {
    /// Tenant scope
    pub tenant_id: TenantId,
    /// Affected shop
    pub shop_id: ShopId,
    /// The booking as written
    pub booking: Booking,
}

/// Fan-out seam towards the external notification layer.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers a capacity-change event.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if delivery fails; callers treat this as
    /// best-effort and only log it.
    async fn capacity_changed(&self, event: CapacityChanged) -> Result<(), NotifyError>;

    /// Delivers a booking-change event.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if delivery fails; callers treat this as
    /// best-effort and only log it.
    async fn booking_changed(&self, event: BookingChanged) -> Result<(), NotifyError>;
}

/// Sink that drops every event. The default when no fan-out layer is wired.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn capacity_changed(&self, _event: CapacityChanged) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn booking_changed(&self, _event: BookingChanged) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Emits a capacity-change event, logging (not propagating) delivery failure.
pub(crate) async fn emit_capacity(
    sink: &dyn NotificationSink,
    tenant_id: TenantId,
    shop_id: ShopId,
    date: Option<NaiveDate>,
) {
    let event = CapacityChanged {
        tenant_id,
        shop_id,
        date,
    };
    if let Err(err) = sink.capacity_changed(event).await {
        tracing::warn!(%tenant_id, %shop_id, error = %err, "capacity notification dropped");
    }
}

/// Emits a booking-change event, logging (not propagating) delivery failure.
pub(crate) async fn emit_booking(sink: &dyn NotificationSink, booking: &Booking) {
    let event = BookingChanged {
        tenant_id: booking.tenant_id,
        shop_id: booking.shop_id,
        booking: booking.clone(),
    };
    if let Err(err) = sink.booking_changed(event).await {
        tracing::warn!(
            tenant_id = %booking.tenant_id,
            booking_id = %booking.id,
            error = %err,
            "booking notification dropped"
        );
    }
}
