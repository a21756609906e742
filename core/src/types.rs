//! Domain types for the slot booking engine.
//!
//! This module contains all value objects and entities: identifier newtypes,
//! the cents-based [`Money`] value object, slot and booking status enums, the
//! [`Slot`] and [`Booking`] entities, and the externally-owned shop
//! configuration types.
//!
//! Status derivation is centralized in [`derive_status`]: every mutator goes
//! through it, so the `status`/`is_blocked`/`booked_count` relationship is
//! enforced in exactly one place.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing `Uuid`
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Unique identifier for a tenant (one customer organization of the network)
    TenantId
);
id_newtype!(
    /// Unique identifier for a shop within a tenant
    ShopId
);
id_newtype!(
    /// Unique identifier for a bookable slot
    SlotId
);
id_newtype!(
    /// Unique identifier for a booking
    BookingId
);
id_newtype!(
    /// Unique identifier for a customer
    CustomerId
);
id_newtype!(
    /// Unique identifier for a catalog service
    ServiceId
);
id_newtype!(
    /// Unique identifier for a staff member
    StaffId
);
id_newtype!(
    /// Unique identifier for an acting user (admin or staff account)
    UserId
);

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts two money amounts (returns `None` if the result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// Checks whether discounting `original` down to `discounted` stays within
    /// `max_percent` of the original price.
    ///
    /// Uses exact integer arithmetic (`discount * 100 <= max_percent * original`),
    /// so no rounding policy is involved. A `discounted` value at or above
    /// `original` is always within the cap; a zero `original` only admits a
    /// zero `discounted`.
    #[must_use]
    pub const fn within_discount_cap(original: Self, discounted: Self, max_percent: u8) -> bool {
        if discounted.0 >= original.0 {
            return true;
        }
        let discount = original.0 - discounted.0;
        // u64 * 100 can overflow for adversarial cents values; saturate rather
        // than wrap so the comparison stays conservative.
        discount.saturating_mul(100) <= original.0.saturating_mul(max_percent as u64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Status Enums
// ============================================================================

/// Derived availability state of a [`Slot`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Has free capacity and is not blocked
    Available,
    /// Booked up to (or, under priority overbooking, past) capacity
    Full,
    /// Administratively removed from availability
    Blocked,
}

impl SlotStatus {
    /// Canonical string form, as persisted and as used in notification payloads
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Full => "full",
            Self::Blocked => "blocked",
        }
    }
}

impl FromStr for SlotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "full" => Ok(Self::Full),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown slot status: {other}")),
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a [`Booking`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created online, awaiting shop confirmation
    Pending,
    /// Confirmed by the shop (or auto-confirmed)
    Confirmed,
    /// Customer has arrived at the shop
    Arrived,
    /// Service has started
    InProgress,
    /// Service finished
    Completed,
    /// Cancelled by a customer, staff member, admin, or the system
    Cancelled,
    /// Customer never arrived
    NoShow,
}

impl BookingStatus {
    /// Whether a booking in this state still consumes slot capacity.
    ///
    /// Pending, confirmed, arrived and in-progress bookings occupy capacity;
    /// completed, cancelled and no-show bookings have released it.
    #[must_use]
    pub const fn is_occupying(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Confirmed | Self::Arrived | Self::InProgress
        )
    }

    /// Canonical string form, as persisted and as used in notification payloads
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Arrived => "arrived",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "arrived" => Ok(Self::Arrived),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "no_show" => Ok(Self::NoShow),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of actor that cancelled a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledByType {
    /// A shop or tenant administrator
    Admin,
    /// The system itself (expiry, cascades)
    System,
    /// The booking's customer
    Customer,
    /// A staff member
    Staff,
}

impl CancelledByType {
    /// Canonical string form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::System => "system",
            Self::Customer => "customer",
            Self::Staff => "staff",
        }
    }
}

impl FromStr for CancelledByType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "system" => Ok(Self::System),
            "customer" => Ok(Self::Customer),
            "staff" => Ok(Self::Staff),
            other => Err(format!("unknown cancelled-by type: {other}")),
        }
    }
}

/// How a booking entered the system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    /// Created through the customer-facing online path (capacity checked)
    Online,
    /// Created at the counter (priority admission)
    WalkIn,
}

impl BookingSource {
    /// Canonical string form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::WalkIn => "walk_in",
        }
    }
}

impl FromStr for BookingSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "walk_in" => Ok(Self::WalkIn),
            other => Err(format!("unknown booking source: {other}")),
        }
    }
}

// ============================================================================
// Status Derivation
// ============================================================================

/// Derives a slot's status from its blocked flag, capacity and booked count.
///
/// This is the single source of truth for the status invariant:
/// blocked wins, then `booked_count >= capacity` means full, otherwise
/// available. Every mutator of a slot re-derives through this function.
#[must_use]
pub const fn derive_status(is_blocked: bool, capacity: u32, booked_count: u32) -> SlotStatus {
    if is_blocked {
        SlotStatus::Blocked
    } else if booked_count >= capacity {
        SlotStatus::Full
    } else {
        SlotStatus::Available
    }
}

// ============================================================================
// Transition Metadata
// ============================================================================

/// Administrative metadata recorded when a slot is blocked
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Administrator performing the block
    pub blocked_by: UserId,
    /// Human-readable reason, also propagated to cascaded cancellations
    pub reason: String,
    /// When the block was applied
    pub at: DateTime<Utc>,
}

/// Metadata recorded when a booking is cancelled
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelMeta {
    /// Acting user, when one exists (system cancellations carry none)
    pub cancelled_by: Option<UserId>,
    /// Kind of actor behind the cancellation
    pub cancelled_by_type: CancelledByType,
    /// Human-readable reason
    pub reason: String,
    /// When the cancellation happened
    pub at: DateTime<Utc>,
}

// ============================================================================
// Slot Entity
// ============================================================================

/// One bookable time window on one calendar day for one shop.
///
/// Identity is (`shop_id`, `date`, `start_time`); `date` is normalized to the
/// start of day, so slots within a day are distinguished purely by
/// `start_time`. Capacity is a headcount derived from the shop's active staff
/// roster; `booked_count` tracks bookings in an occupying state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Canonical identifier; all mutations address slots by this id
    pub id: SlotId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Owning shop
    pub shop_id: ShopId,
    /// Calendar day (no time-of-day component)
    pub date: NaiveDate,
    /// Window start
    pub start_time: NaiveTime,
    /// Window end (start + shop slot duration)
    pub end_time: NaiveTime,
    /// Current bookable headcount
    pub capacity: u32,
    /// Last-synchronized active-staff count, independent of current bookings
    pub max_capacity: u32,
    /// Count of bookings currently in an occupying state
    pub booked_count: u32,
    /// Derived status; see [`derive_status`]
    pub status: SlotStatus,
    /// Administrative block flag
    pub is_blocked: bool,
    /// Administrator that applied the current block, if any
    pub blocked_by: Option<UserId>,
    /// Reason for the current block, if any
    pub blocked_reason: Option<String>,
    /// When the current block was applied, if any
    pub blocked_at: Option<DateTime<Utc>>,
    /// When the slot was last unblocked, if ever
    pub unblock_at: Option<DateTime<Utc>>,
}

impl Slot {
    /// Creates a fresh slot as the generator produces it: empty, unblocked,
    /// with capacity sized to the current active staff count.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        shop_id: ShopId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        staff_count: u32,
    ) -> Self {
        Self {
            id: SlotId::new(),
            tenant_id,
            shop_id,
            date,
            start_time,
            end_time,
            capacity: staff_count,
            max_capacity: staff_count,
            booked_count: 0,
            status: derive_status(false, staff_count, 0),
            is_blocked: false,
            blocked_by: None,
            blocked_reason: None,
            blocked_at: None,
            unblock_at: None,
        }
    }

    /// Whether the slot can admit a capacity-checked booking
    #[must_use]
    pub const fn has_free_capacity(&self) -> bool {
        !self.is_blocked && self.booked_count < self.capacity
    }

    /// Re-derives `status` from the current field values
    pub const fn recompute_status(&mut self) {
        self.status = derive_status(self.is_blocked, self.capacity, self.booked_count);
    }

    /// Applies an administrative block: records the metadata, forces
    /// `booked_count` to zero (capacity is left untouched) and re-derives the
    /// status. Occupying bookings are cancelled by the caller's cascade.
    pub fn apply_block(&mut self, meta: &BlockMeta) {
        self.is_blocked = true;
        self.blocked_by = Some(meta.blocked_by);
        self.blocked_reason = Some(meta.reason.clone());
        self.blocked_at = Some(meta.at);
        self.booked_count = 0;
        self.recompute_status();
    }

    /// Clears an administrative block and re-derives the status from the
    /// current capacity and booked count.
    pub fn apply_unblock(&mut self, at: DateTime<Utc>) {
        self.is_blocked = false;
        self.blocked_by = None;
        self.blocked_reason = None;
        self.blocked_at = None;
        self.unblock_at = Some(at);
        self.recompute_status();
    }

    /// The booking-facing timestamp of this slot (date combined with start)
    #[must_use]
    pub const fn scheduled_for(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }
}

// ============================================================================
// Booking Entity
// ============================================================================

/// One customer's claim against a [`Slot`].
///
/// Occupies slot capacity while in pending/confirmed/arrived/in-progress, and
/// releases it on completion, cancellation, or no-show.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Identifier
    pub id: BookingId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Owning shop
    pub shop_id: ShopId,
    /// The slot this booking claims
    pub slot_id: SlotId,
    /// The customer holding the claim
    pub customer_id: CustomerId,
    /// The catalog service booked
    pub service_id: ServiceId,
    /// Assigned staff member, set when service starts (or earlier)
    pub staff_id: Option<StaffId>,
    /// Lifecycle state
    pub status: BookingStatus,
    /// Where the booking came from
    pub source: BookingSource,
    /// Slot date + start time, denormalized for display and sorting
    pub scheduled_for: NaiveDateTime,
    /// Service list price at creation time
    pub original_price: Money,
    /// Price actually charged
    pub final_price: Money,
    /// Whether `final_price` was manually edited
    pub price_edited: bool,
    /// Who edited the price, if it was edited
    pub edited_by: Option<UserId>,
    /// Why the price was edited, if it was edited
    pub edit_reason: Option<String>,
    /// When the customer arrived
    pub arrived_at: Option<DateTime<Utc>>,
    /// When the service started
    pub started_at: Option<DateTime<Utc>>,
    /// When the service completed
    pub completed_at: Option<DateTime<Utc>>,
    /// When the booking was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Acting user behind a cancellation, when one exists
    pub cancelled_by: Option<UserId>,
    /// Kind of actor behind a cancellation
    pub cancelled_by_type: Option<CancelledByType>,
    /// Why the booking was cancelled
    pub cancellation_reason: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a booking in its initial state against the given slot.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        slot: &Slot,
        customer_id: CustomerId,
        service_id: ServiceId,
        status: BookingStatus,
        source: BookingSource,
        price: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BookingId::new(),
            tenant_id: slot.tenant_id,
            shop_id: slot.shop_id,
            slot_id: slot.id,
            customer_id,
            service_id,
            staff_id: None,
            status,
            source,
            scheduled_for: slot.scheduled_for(),
            original_price: price,
            final_price: price,
            price_edited: false,
            edited_by: None,
            edit_reason: None,
            arrived_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancelled_by_type: None,
            cancellation_reason: None,
            created_at,
        }
    }

    /// Whether this booking currently consumes slot capacity
    #[must_use]
    pub const fn is_occupying(&self) -> bool {
        self.status.is_occupying()
    }

    /// Applies a cancellation: sets the terminal state and audit fields.
    ///
    /// Pure transition; legality (which states may be cancelled by which
    /// flows) is the caller's concern. The blocking cascade applies this to
    /// every occupying booking regardless of sub-state.
    pub fn apply_cancel(&mut self, meta: &CancelMeta) {
        self.status = BookingStatus::Cancelled;
        self.cancelled_at = Some(meta.at);
        self.cancelled_by = meta.cancelled_by;
        self.cancelled_by_type = Some(meta.cancelled_by_type);
        self.cancellation_reason = Some(meta.reason.clone());
    }
}

// ============================================================================
// Shop Configuration (external, read-only to the engine)
// ============================================================================

/// Working hours for one weekday
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    /// Whether the shop opens at all on this weekday
    pub is_open: bool,
    /// Opening time
    pub open: NaiveTime,
    /// Closing time (exclusive; slots tile `[open, close)`)
    pub close: NaiveTime,
}

/// Per-shop working schedule and slot sizing.
///
/// Owned by shop management; the engine only reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Hours per weekday, Monday first
    pub week: [DayHours; 7],
    /// Fixed slot width in minutes
    pub slot_duration_minutes: u32,
}

impl ShopConfig {
    /// A schedule with the same hours every day of the week
    #[must_use]
    pub const fn uniform(open: NaiveTime, close: NaiveTime, slot_duration_minutes: u32) -> Self {
        let day = DayHours {
            is_open: true,
            open,
            close,
        };
        Self {
            week: [day; 7],
            slot_duration_minutes,
        }
    }

    /// Returns the hours for the given weekday
    #[must_use]
    pub const fn hours_for(&self, weekday: Weekday) -> DayHours {
        self.week[weekday.num_days_from_monday() as usize]
    }
}

/// Policy for walk-in admissions when a slot is at capacity.
///
/// The historical behavior admits walk-ins unconditionally (priority
/// overbooking); this makes that an explicit per-shop choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkInPolicy {
    /// Walk-ins are admitted even at full capacity
    #[default]
    Overbook,
    /// Walk-ins are subject to the same capacity check as online bookings
    EnforceCapacity,
}

/// Tenant/shop-level booking policy knobs, resolved per request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSettings {
    /// How many days ahead online bookings may be placed
    pub booking_advance_days: u32,
    /// Whether online bookings are confirmed immediately instead of pending
    pub auto_confirm: bool,
    /// Whether booking prices may be edited at all
    pub price_editing_enabled: bool,
    /// Largest allowed discount against the original price, in percent
    pub max_discount_percent: u8,
    /// Walk-in capacity policy
    pub walk_in_policy: WalkInPolicy,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            booking_advance_days: 30,
            auto_confirm: true,
            price_editing_enabled: true,
            max_discount_percent: 20,
            walk_in_policy: WalkInPolicy::default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
