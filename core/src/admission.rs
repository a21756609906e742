//! Booking admission control.
//!
//! Creates bookings against slot capacity and advances them through their
//! lifecycle. The legal transitions:
//!
//! ```text
//! (create online)  -> pending | confirmed     capacity-checked, policy-guarded
//! (create walk-in) -> confirmed               priority admission
//! confirmed        -> arrived                 mark_arrived
//! confirmed/arrived -> no_show                mark_no_show
//! confirmed/arrived -> in_progress            start_service (assigns staff)
//! in_progress      -> completed               complete_service
//! confirmed/arrived -> cancelled              cancel
//! ```
//!
//! Online admission is the "last seat" hot path: the capacity check and the
//! booked-count increment happen as one atomic store operation
//! ([`SlotStore::admit`](crate::store::SlotStore::admit)), so two concurrent
//! requests can never both claim the final place. Transitions that release
//! capacity (cancel, no-show, complete) resync the slot's booked count from
//! the live set of occupying bookings afterwards.

use crate::environment::{Environment, ServiceRecord};
use crate::error::{EngineError, Result};
use crate::notify;
use crate::store::{AdmissionMode, AdmissionOutcome};
use crate::types::{
    Booking, BookingId, BookingSource, BookingStatus, CancelMeta, CancelledByType, CustomerId,
    Money, ServiceId, ShopId, ShopSettings, Slot, SlotId, StaffId, TenantId, UserId, WalkInPolicy,
};
use chrono::Duration;

/// An online booking request from the customer-facing path
#[derive(Clone, Debug)]
pub struct OnlineBookingRequest {
    /// Shop the slot belongs to
    pub shop_id: ShopId,
    /// Target slot
    pub slot_id: SlotId,
    /// Customer placing the booking
    pub customer_id: CustomerId,
    /// Service being booked
    pub service_id: ServiceId,
}

/// A walk-in booking request taken at the counter
#[derive(Clone, Debug)]
pub struct WalkInRequest {
    /// Shop the slot belongs to
    pub shop_id: ShopId,
    /// Target slot
    pub slot_id: SlotId,
    /// Customer email, resolved or created within the tenant
    pub customer_email: String,
    /// Customer display name used if a record has to be created
    pub customer_name: String,
    /// Service being booked
    pub service_id: ServiceId,
    /// Manual price, when it deviates from the service's list price
    pub price_override: Option<Money>,
    /// Who entered the override
    pub edited_by: Option<UserId>,
    /// Why the price was overridden
    pub edit_reason: Option<String>,
}

/// Who is cancelling a booking, for the audit trail
#[derive(Clone, Debug)]
pub struct CancelActor {
    /// Acting user, when one exists
    pub cancelled_by: Option<UserId>,
    /// Kind of actor
    pub cancelled_by_type: CancelledByType,
    /// Stated reason
    pub reason: Option<String>,
}

/// Creates and advances bookings, enforcing capacity and transition legality.
#[derive(Clone, Debug)]
pub struct AdmissionControl {
    env: Environment,
}

impl AdmissionControl {
    /// Creates an admission controller over the given environment.
    #[must_use]
    pub const fn new(env: Environment) -> Self {
        Self { env }
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Creates an online booking against a slot.
    ///
    /// The initial status follows the shop's auto-confirm setting
    /// (`confirmed` when set, `pending` otherwise); the price is the
    /// service's current list price; the scheduled timestamp is the slot's
    /// date plus start time.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the slot or service is missing
    /// - [`EngineError::Validation`] if the service is inactive
    /// - [`EngineError::PolicyViolation`] if the slot lies beyond the shop's
    ///   advance-booking window
    /// - [`EngineError::BlockedSlot`] if the slot is blocked
    /// - [`EngineError::CapacityExceeded`] if the slot has no free capacity
    /// - [`EngineError::Store`] on backend failure
    pub async fn create_online(
        &self,
        tenant: TenantId,
        request: OnlineBookingRequest,
    ) -> Result<Booking> {
        let slot = self.require_slot(tenant, request.slot_id).await?;
        if slot.is_blocked {
            return Err(EngineError::BlockedSlot);
        }
        let service = self.require_active_service(tenant, request.service_id).await?;
        let settings = self.env.shops.settings(tenant, request.shop_id).await?;
        self.check_advance_window(&slot, &settings)?;

        let status = if settings.auto_confirm {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        };

        let slot = self
            .admit(tenant, request.slot_id, AdmissionMode::Checked)
            .await?;
        let booking = Booking::new(
            &slot,
            request.customer_id,
            request.service_id,
            status,
            BookingSource::Online,
            service.price,
            self.env.clock.now(),
        );
        self.persist_admitted(tenant, booking, &slot).await
    }

    /// Creates a walk-in booking at the counter.
    ///
    /// The customer is resolved (or created) by email within the tenant; the
    /// booking is always created `confirmed`. Under the default
    /// [`WalkInPolicy::Overbook`] the capacity check is bypassed (priority
    /// admission); under [`WalkInPolicy::EnforceCapacity`] walk-ins compete
    /// like online bookings. A manual price override is recorded with its
    /// audit trail when it differs from the service's list price.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the slot or service is missing
    /// - [`EngineError::BlockedSlot`] if the slot is blocked
    /// - [`EngineError::CapacityExceeded`] if the slot is full and the shop
    ///   enforces capacity for walk-ins
    /// - [`EngineError::Store`] on backend failure
    pub async fn create_walk_in(
        &self,
        tenant: TenantId,
        request: WalkInRequest,
    ) -> Result<Booking> {
        let slot = self.require_slot(tenant, request.slot_id).await?;
        if slot.is_blocked {
            return Err(EngineError::BlockedSlot);
        }
        let service = self.require_service(tenant, request.service_id).await?;
        let settings = self.env.shops.settings(tenant, request.shop_id).await?;
        let customer = self
            .env
            .customers
            .find_or_create(tenant, &request.customer_email, &request.customer_name)
            .await?;

        let mode = match settings.walk_in_policy {
            WalkInPolicy::Overbook => AdmissionMode::Priority,
            WalkInPolicy::EnforceCapacity => AdmissionMode::Checked,
        };
        let slot = self.admit(tenant, request.slot_id, mode).await?;

        let mut booking = Booking::new(
            &slot,
            customer,
            request.service_id,
            BookingStatus::Confirmed,
            BookingSource::WalkIn,
            service.price,
            self.env.clock.now(),
        );
        if let Some(price) = request.price_override {
            if price != service.price {
                booking.final_price = price;
                booking.price_edited = true;
                booking.edited_by = request.edited_by;
                booking.edit_reason = request.edit_reason;
            }
        }
        self.persist_admitted(tenant, booking, &slot).await
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Marks a confirmed booking as arrived.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the booking is missing
    /// - [`EngineError::IllegalTransition`] unless the booking is confirmed
    /// - [`EngineError::Store`] on backend failure
    pub async fn mark_arrived(&self, tenant: TenantId, id: BookingId) -> Result<Booking> {
        let mut booking = self.require_booking(tenant, id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(EngineError::IllegalTransition {
                from: booking.status,
                action: "mark arrived",
            });
        }
        booking.status = BookingStatus::Arrived;
        booking.arrived_at = Some(self.env.clock.now());
        self.env.bookings.save(&booking).await?;
        notify::emit_booking(self.env.notifications.as_ref(), &booking).await;
        Ok(booking)
    }

    /// Marks a confirmed or arrived booking as a no-show, releasing its
    /// capacity.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the booking is missing
    /// - [`EngineError::IllegalTransition`] unless the booking is confirmed
    ///   or arrived
    /// - [`EngineError::Store`] on backend failure
    pub async fn mark_no_show(&self, tenant: TenantId, id: BookingId) -> Result<Booking> {
        let mut booking = self.require_booking(tenant, id).await?;
        if !matches!(
            booking.status,
            BookingStatus::Confirmed | BookingStatus::Arrived
        ) {
            return Err(EngineError::IllegalTransition {
                from: booking.status,
                action: "mark no-show",
            });
        }
        booking.status = BookingStatus::NoShow;
        self.env.bookings.save(&booking).await?;
        self.release_capacity(tenant, &booking).await?;
        notify::emit_booking(self.env.notifications.as_ref(), &booking).await;
        Ok(booking)
    }

    /// Starts service for a confirmed or arrived booking, assigning the
    /// staff member and backfilling the arrival timestamp if absent.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the booking is missing
    /// - [`EngineError::IllegalTransition`] unless the booking is confirmed
    ///   or arrived
    /// - [`EngineError::Conflict`] if a different staff member is already
    ///   assigned
    /// - [`EngineError::Store`] on backend failure
    pub async fn start_service(
        &self,
        tenant: TenantId,
        id: BookingId,
        staff: StaffId,
    ) -> Result<Booking> {
        let mut booking = self.require_booking(tenant, id).await?;
        if !matches!(
            booking.status,
            BookingStatus::Confirmed | BookingStatus::Arrived
        ) {
            return Err(EngineError::IllegalTransition {
                from: booking.status,
                action: "start service",
            });
        }
        if let Some(assigned) = booking.staff_id {
            if assigned != staff {
                return Err(EngineError::Conflict(format!(
                    "booking already assigned to staff {assigned}"
                )));
            }
        }
        let now = self.env.clock.now();
        booking.staff_id = Some(staff);
        booking.status = BookingStatus::InProgress;
        booking.started_at = Some(now);
        if booking.arrived_at.is_none() {
            booking.arrived_at = Some(now);
        }
        self.env.bookings.save(&booking).await?;
        notify::emit_booking(self.env.notifications.as_ref(), &booking).await;
        Ok(booking)
    }

    /// Completes an in-progress booking, releasing its capacity.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the booking is missing
    /// - [`EngineError::IllegalTransition`] unless the booking is in progress
    /// - [`EngineError::Store`] on backend failure
    pub async fn complete_service(&self, tenant: TenantId, id: BookingId) -> Result<Booking> {
        let mut booking = self.require_booking(tenant, id).await?;
        if booking.status != BookingStatus::InProgress {
            return Err(EngineError::IllegalTransition {
                from: booking.status,
                action: "complete service",
            });
        }
        booking.status = BookingStatus::Completed;
        booking.completed_at = Some(self.env.clock.now());
        self.env.bookings.save(&booking).await?;
        self.release_capacity(tenant, &booking).await?;
        notify::emit_booking(self.env.notifications.as_ref(), &booking).await;
        Ok(booking)
    }

    /// Cancels a confirmed or arrived booking, releasing its capacity and
    /// recording who cancelled and why.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the booking is missing
    /// - [`EngineError::IllegalTransition`] unless the booking is confirmed
    ///   or arrived
    /// - [`EngineError::Store`] on backend failure
    pub async fn cancel(
        &self,
        tenant: TenantId,
        id: BookingId,
        actor: CancelActor,
    ) -> Result<Booking> {
        let mut booking = self.require_booking(tenant, id).await?;
        if !matches!(
            booking.status,
            BookingStatus::Confirmed | BookingStatus::Arrived
        ) {
            return Err(EngineError::IllegalTransition {
                from: booking.status,
                action: "cancel",
            });
        }
        let meta = CancelMeta {
            cancelled_by: actor.cancelled_by,
            cancelled_by_type: actor.cancelled_by_type,
            reason: actor
                .reason
                .unwrap_or_else(|| "Cancelled by request".to_string()),
            at: self.env.clock.now(),
        };
        booking.apply_cancel(&meta);
        self.env.bookings.save(&booking).await?;
        self.release_capacity(tenant, &booking).await?;
        notify::emit_booking(self.env.notifications.as_ref(), &booking).await;
        Ok(booking)
    }

    /// Edits a booking's price, subject to shop policy.
    ///
    /// Allowed while the booking is confirmed, arrived or in progress.
    /// The shop must have price editing enabled, and a discount against the
    /// original price may not exceed the configured maximum percentage.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the booking is missing
    /// - [`EngineError::IllegalTransition`] if the booking is in a terminal
    ///   or pending state
    /// - [`EngineError::PolicyViolation`] if editing is disabled or the
    ///   discount cap is exceeded
    /// - [`EngineError::Store`] on backend failure
    pub async fn edit_price(
        &self,
        tenant: TenantId,
        id: BookingId,
        new_price: Money,
        edited_by: UserId,
        reason: Option<String>,
    ) -> Result<Booking> {
        let mut booking = self.require_booking(tenant, id).await?;
        if !matches!(
            booking.status,
            BookingStatus::Confirmed | BookingStatus::Arrived | BookingStatus::InProgress
        ) {
            return Err(EngineError::IllegalTransition {
                from: booking.status,
                action: "edit price of",
            });
        }
        let settings = self.env.shops.settings(tenant, booking.shop_id).await?;
        if !settings.price_editing_enabled {
            return Err(EngineError::PolicyViolation(
                "price editing is disabled for this shop".to_string(),
            ));
        }
        if !Money::within_discount_cap(
            booking.original_price,
            new_price,
            settings.max_discount_percent,
        ) {
            return Err(EngineError::PolicyViolation(format!(
                "discount exceeds the maximum of {}%",
                settings.max_discount_percent
            )));
        }
        booking.final_price = new_price;
        booking.price_edited = true;
        booking.edited_by = Some(edited_by);
        booking.edit_reason = reason;
        self.env.bookings.save(&booking).await?;
        notify::emit_booking(self.env.notifications.as_ref(), &booking).await;
        Ok(booking)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn admit(
        &self,
        tenant: TenantId,
        slot_id: SlotId,
        mode: AdmissionMode,
    ) -> Result<Slot> {
        match self.env.slots.admit(tenant, slot_id, mode).await? {
            AdmissionOutcome::Admitted(slot) => Ok(slot),
            AdmissionOutcome::Full => Err(EngineError::CapacityExceeded),
            AdmissionOutcome::Blocked => Err(EngineError::BlockedSlot),
            AdmissionOutcome::NotFound => Err(EngineError::NotFound {
                entity: "slot",
                id: slot_id.to_string(),
            }),
        }
    }

    /// Persists an admitted booking. The atomic admission already holds the
    /// place; the booking row lands second, so a failed insert must give the
    /// place back by resyncing the count from the live bookings.
    async fn persist_admitted(
        &self,
        tenant: TenantId,
        booking: Booking,
        slot: &Slot,
    ) -> Result<Booking> {
        if let Err(err) = self.env.bookings.insert(booking.clone()).await {
            let _ = self.env.slots.resync_booked_count(tenant, slot.id).await;
            return Err(err.into());
        }
        tracing::info!(
            %tenant,
            booking_id = %booking.id,
            slot_id = %slot.id,
            status = %booking.status,
            source = booking.source.as_str(),
            "booking created"
        );
        notify::emit_booking(self.env.notifications.as_ref(), &booking).await;
        notify::emit_capacity(
            self.env.notifications.as_ref(),
            tenant,
            slot.shop_id,
            Some(slot.date),
        )
        .await;
        Ok(booking)
    }

    /// Resyncs the slot after a capacity-releasing transition and notifies.
    async fn release_capacity(&self, tenant: TenantId, booking: &Booking) -> Result<()> {
        self.env
            .slots
            .resync_booked_count(tenant, booking.slot_id)
            .await?;
        notify::emit_capacity(
            self.env.notifications.as_ref(),
            tenant,
            booking.shop_id,
            Some(booking.scheduled_for.date()),
        )
        .await;
        Ok(())
    }

    fn check_advance_window(&self, slot: &Slot, settings: &ShopSettings) -> Result<()> {
        let today = self.env.clock.now().date_naive();
        let horizon = today + Duration::days(i64::from(settings.booking_advance_days));
        if slot.date > horizon {
            return Err(EngineError::PolicyViolation(format!(
                "slot date {} is beyond the {}-day advance booking window",
                slot.date, settings.booking_advance_days
            )));
        }
        Ok(())
    }

    async fn require_slot(&self, tenant: TenantId, id: SlotId) -> Result<Slot> {
        self.env
            .slots
            .get(tenant, id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "slot",
                id: id.to_string(),
            })
    }

    async fn require_booking(&self, tenant: TenantId, id: BookingId) -> Result<Booking> {
        self.env
            .bookings
            .find(tenant, id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "booking",
                id: id.to_string(),
            })
    }

    async fn require_service(&self, tenant: TenantId, id: ServiceId) -> Result<ServiceRecord> {
        self.env
            .catalog
            .service(tenant, id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "service",
                id: id.to_string(),
            })
    }

    async fn require_active_service(
        &self,
        tenant: TenantId,
        id: ServiceId,
    ) -> Result<ServiceRecord> {
        let service = self.require_service(tenant, id).await?;
        if !service.active {
            return Err(EngineError::Validation(format!(
                "service {} is not active",
                service.id
            )));
        }
        Ok(service)
    }
}
