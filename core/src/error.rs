//! Error taxonomy for the booking engine.
//!
//! Every recoverable-by-caller condition gets its own [`EngineError`] variant
//! so the boundary layer can map each to an appropriate response instead of
//! pattern-matching on strings. Collaborator failures (store unavailable)
//! propagate unchanged through the `Store` variant and are never reinterpreted
//! as domain errors.

use crate::types::BookingStatus;

/// Error type for storage-backend operations.
///
/// Store implementations translate their backend's failures into this type;
/// the engine treats every variant as an infrastructure failure, not a domain
/// condition.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend failure (connection, query, transaction)
    #[error("storage error: {0}")]
    Backend(String),

    /// A persisted row could not be mapped back into a domain value
    #[error("corrupted row: {0}")]
    Corrupted(String),
}

/// Domain error type for all engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The referenced entity does not exist within the given tenant/shop scope
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up ("slot", "booking", "service", "shop")
        entity: &'static str,
        /// Identifier that failed to resolve
        id: String,
    },

    /// The operation conflicts with current state (already blocked, staff
    /// already assigned, capacity below current bookings)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed or out-of-range input
    #[error("validation failed: {0}")]
    Validation(String),

    /// A tenant-configured policy forbids the operation
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// The slot has no free capacity for a checked admission
    #[error("slot capacity exceeded")]
    CapacityExceeded,

    /// The booking is not in a state that permits the requested action
    #[error("illegal transition: cannot {action} a {from} booking")]
    IllegalTransition {
        /// Current booking status
        from: BookingStatus,
        /// The attempted action
        action: &'static str,
    },

    /// The slot is administratively blocked
    #[error("slot is blocked")]
    BlockedSlot,

    /// The slot is fully booked (availability pre-check)
    #[error("slot is full")]
    FullSlot,

    /// The shop has no active staff, so no capacity can exist
    #[error("shop has no active staff")]
    NoActiveStaff,

    /// Infrastructure failure from the store, propagated unchanged
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
