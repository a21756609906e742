//! Dependency injection environment for the engine components.
//!
//! All external collaborators are abstracted behind traits and injected via
//! the [`Environment`] bundle: the scoped stores, the staff roster, the
//! service catalog, the shop directory (working hours + policy settings), the
//! customer directory, the notification sink, and the clock.
//!
//! Tenant routing itself is outside the engine: whoever constructs an
//! `Environment` has already resolved the request's tenant to a scoped store
//! handle. Every trait method still takes the `TenantId` so implementations
//! can enforce that no lookup crosses tenant boundaries.

use crate::error::StoreError;
use crate::notify::NotificationSink;
use crate::store::{BookingStore, SlotStore};
use crate::types::{CustomerId, Money, ServiceId, ShopConfig, ShopId, ShopSettings, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A service as resolved from the tenant's catalog
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Identifier
    pub id: ServiceId,
    /// Display name
    pub name: String,
    /// Whether the service is currently offered
    pub active: bool,
    /// Current list price
    pub price: Money,
}

/// Provides the current active-staff count for a shop.
///
/// The engine only ever needs the count; individual staff records stay with
/// the roster's owner.
#[async_trait]
pub trait StaffRoster: Send + Sync {
    /// Number of active staff members for the shop.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the roster backend fails.
    async fn active_staff_count(&self, tenant: TenantId, shop: ShopId)
    -> Result<u32, StoreError>;
}

/// Resolves services from the tenant's catalog.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Looks up a service; `None` if it does not exist for this tenant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the catalog backend fails.
    async fn service(
        &self,
        tenant: TenantId,
        service: ServiceId,
    ) -> Result<Option<ServiceRecord>, StoreError>;
}

/// Resolves a shop's working-hours configuration and policy settings.
#[async_trait]
pub trait ShopDirectory: Send + Sync {
    /// The shop's weekly schedule and slot duration; `None` for unknown shops.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory backend fails.
    async fn config(&self, tenant: TenantId, shop: ShopId)
    -> Result<Option<ShopConfig>, StoreError>;

    /// The shop's booking policy settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory backend fails.
    async fn settings(&self, tenant: TenantId, shop: ShopId) -> Result<ShopSettings, StoreError>;
}

/// Resolves or creates customer records for the walk-in path.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Finds the customer with this email within the tenant, creating a
    /// record if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory backend fails.
    async fn find_or_create(
        &self,
        tenant: TenantId,
        email: &str,
        name: &str,
    ) -> Result<CustomerId, StoreError>;
}

/// Injected dependencies shared by all engine components.
///
/// Cloning is cheap (all fields are `Arc`s); each component holds its own
/// clone.
#[derive(Clone)]
pub struct Environment {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Slot persistence
    pub slots: Arc<dyn SlotStore>,
    /// Booking persistence
    pub bookings: Arc<dyn BookingStore>,
    /// Active-staff counts
    pub roster: Arc<dyn StaffRoster>,
    /// Service catalog
    pub catalog: Arc<dyn ServiceCatalog>,
    /// Shop configuration and settings
    pub shops: Arc<dyn ShopDirectory>,
    /// Customer resolution for walk-ins
    pub customers: Arc<dyn CustomerDirectory>,
    /// Best-effort notification fan-out
    pub notifications: Arc<dyn NotificationSink>,
}

impl Environment {
    /// Bundles the given collaborators into an environment.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: Arc<dyn Clock>,
        slots: Arc<dyn SlotStore>,
        bookings: Arc<dyn BookingStore>,
        roster: Arc<dyn StaffRoster>,
        catalog: Arc<dyn ServiceCatalog>,
        shops: Arc<dyn ShopDirectory>,
        customers: Arc<dyn CustomerDirectory>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            clock,
            slots,
            bookings,
            roster,
            catalog,
            shops,
            customers,
            notifications,
        }
    }

    /// Replaces the notification sink, keeping everything else.
    #[must_use]
    pub fn with_notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = sink;
        self
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}
