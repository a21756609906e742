//! # Slotbook Postgres
//!
//! PostgreSQL implementations of the slotbook store contracts.
//!
//! ## Overview
//!
//! Provides [`PostgresStore`], a single pool-backed type implementing both
//! `SlotStore` and `BookingStore`, with the engine's concurrency contracts
//! expressed as database primitives:
//!
//! - admission as one conditional `UPDATE ... RETURNING`
//! - the blocking cascade as one transaction under `FOR UPDATE`
//! - booked-count resync as one statement over the live bookings
//!
//! ## Example
//!
//! ```ignore
//! use slotbook_postgres::PostgresStore;
//!
//! let store = PostgresStore::connect(&database_url).await?;
//! store.migrate().await?;
//!
//! let store = std::sync::Arc::new(store);
//! let env = Environment::new(clock, store.clone(), store.clone(), /* ... */);
//! ```

mod store;

pub use store::PostgresStore;
