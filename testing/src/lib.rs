//! # Slotbook Testing
//!
//! Testing utilities for the slotbook engine:
//!
//! - Mock implementations of every environment trait ([`mocks`])
//! - An in-memory store whose single lock makes the store-level atomicity
//!   contracts hold by construction
//! - [`TestHarness`], a pre-wired environment with handles to every mock
//!
//! ## Example
//!
//! ```ignore
//! use slotbook_testing::TestHarness;
//!
//! #[tokio::test]
//! async fn generates_slots() {
//!     let harness = TestHarness::builder().staff_count(2).build();
//!     let generator = SlotGenerator::new(harness.env.clone());
//!     let slots = generator.generate_day(harness.tenant, harness.shop, date).await?;
//!     assert_eq!(slots.len(), 16);
//! }
//! ```

pub mod mocks;

use crate::mocks::{
    FixedClock, InMemoryCustomers, InMemoryStore, RecordingSink, StaticCatalog, StaticRoster,
    StaticShopDirectory,
};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use slotbook_core::environment::Environment;
use slotbook_core::types::{ShopConfig, ShopId, ShopSettings, TenantId};
use std::sync::Arc;

/// Installs a tracing subscriber for test output, honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fully wired test environment with handles to every mock.
///
/// The environment serves one tenant and one shop; the mocks behind it can be
/// adjusted mid-test (roster count, settings, sink failure mode).
pub struct TestHarness {
    /// Tenant every operation is scoped to
    pub tenant: TenantId,
    /// The shop under test
    pub shop: ShopId,
    /// The wired environment, ready for the engine components
    pub env: Environment,
    /// The shared in-memory store
    pub store: Arc<InMemoryStore>,
    /// Adjustable staff roster
    pub roster: Arc<StaticRoster>,
    /// Mutable service catalog
    pub catalog: Arc<StaticCatalog>,
    /// Adjustable shop directory
    pub shops: Arc<StaticShopDirectory>,
    /// Customer directory
    pub customers: Arc<InMemoryCustomers>,
    /// Captured notifications
    pub sink: Arc<RecordingSink>,
}

impl TestHarness {
    /// Starts a builder with sensible defaults: two active staff, a
    /// 09:00–17:00 shop at 30-minute slots, default settings, and a fixed
    /// clock at 2025-06-01 08:00 UTC.
    #[must_use]
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }
}

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    staff_count: u32,
    config: ShopConfig,
    settings: ShopSettings,
    now: DateTime<Utc>,
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        let open = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
        let close = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);
        Self {
            staff_count: 2,
            config: ShopConfig::uniform(open, close, 30),
            settings: ShopSettings::default(),
            now: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

impl TestHarnessBuilder {
    /// Sets the active-staff count
    #[must_use]
    pub const fn staff_count(mut self, count: u32) -> Self {
        self.staff_count = count;
        self
    }

    /// Sets the shop configuration
    #[must_use]
    pub fn config(mut self, config: ShopConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the shop settings
    #[must_use]
    pub fn settings(mut self, settings: ShopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the fixed "now"
    #[must_use]
    pub const fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Wires everything together
    #[must_use]
    pub fn build(self) -> TestHarness {
        let store = Arc::new(InMemoryStore::new());
        let roster = Arc::new(StaticRoster::new(self.staff_count));
        let catalog = Arc::new(StaticCatalog::new());
        let shops = Arc::new(StaticShopDirectory::new(self.config, self.settings));
        let customers = Arc::new(InMemoryCustomers::new());
        let sink = Arc::new(RecordingSink::new());
        let env = Environment::new(
            Arc::new(FixedClock::new(self.now)),
            store.clone(),
            store.clone(),
            roster.clone(),
            catalog.clone(),
            shops.clone(),
            customers.clone(),
            sink.clone(),
        );
        TestHarness {
            tenant: TenantId::new(),
            shop: ShopId::new(),
            env,
            store,
            roster,
            catalog,
            shops,
            customers,
            sink,
        }
    }
}
