//! # Slotbook Core
//!
//! Slot capacity and booking lifecycle engine for a multi-tenant shop
//! network: carves a shop's working day into discrete slots, sizes each
//! slot's capacity to the active staff count, admits or rejects bookings
//! against that capacity, and lets administrators block slots — cancelling
//! every booking the block strands, atomically.
//!
//! ## Components
//!
//! - [`generator::SlotGenerator`] — tiles working hours into slots
//! - [`capacity::CapacitySynchronizer`] — follows staff roster changes
//! - [`admission::AdmissionControl`] — booking creation and lifecycle
//! - [`blocking::BlockingEngine`] — administrative block/unblock override
//! - [`availability::AvailabilityQuery`] — customer-visible slot filter
//!
//! ## Architecture Principles
//!
//! - Dependency injection via [`environment::Environment`] — every external
//!   collaborator (store, roster, catalog, settings, notification sink,
//!   clock) sits behind a trait
//! - One status derivation — [`types::derive_status`] is the single place
//!   the blocked/full/available invariant is enforced
//! - Concurrency through the store — admission is a single atomic
//!   conditional mutation, the blocking cascade a single atomic unit; the
//!   engine holds no shared mutable state of its own
//! - Distinct, recoverable domain errors ([`error::EngineError`]); store
//!   failures propagate unchanged
//!
//! ## Example
//!
//! ```ignore
//! use slotbook_core::admission::{AdmissionControl, OnlineBookingRequest};
//!
//! let admission = AdmissionControl::new(env.clone());
//! let booking = admission
//!     .create_online(tenant, OnlineBookingRequest {
//!         shop_id,
//!         slot_id,
//!         customer_id,
//!         service_id,
//!     })
//!     .await?;
//! ```

pub mod admission;
pub mod availability;
pub mod blocking;
pub mod capacity;
pub mod environment;
pub mod error;
pub mod generator;
pub mod notify;
pub mod store;
pub mod types;

pub use admission::{AdmissionControl, CancelActor, OnlineBookingRequest, WalkInRequest};
pub use availability::AvailabilityQuery;
pub use blocking::{BlockOutcome, BlockingEngine, SlotSelector, DEFAULT_BLOCK_REASON};
pub use capacity::CapacitySynchronizer;
pub use environment::{Clock, Environment, ServiceRecord, SystemClock};
pub use error::{EngineError, Result, StoreError};
pub use generator::SlotGenerator;
pub use notify::{BookingChanged, CapacityChanged, NoopSink, NotificationSink, NotifyError};
pub use store::{AdmissionMode, AdmissionOutcome, BookingStore, SlotStore};
pub use types::{
    derive_status, BlockMeta, Booking, BookingId, BookingSource, BookingStatus, CancelMeta,
    CancelledByType, CustomerId, DayHours, Money, ServiceId, ShopConfig, ShopId, ShopSettings,
    Slot, SlotId, SlotStatus, StaffId, TenantId, UserId, WalkInPolicy,
};
