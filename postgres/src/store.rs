//! PostgreSQL-backed implementation of the slot and booking stores.
//!
//! Concurrency contracts map straight onto the database:
//!
//! - `admit` is one conditional `UPDATE ... WHERE booked_count < capacity
//!   ... RETURNING` — the row-level write lock makes the check and the
//!   increment a single atomic operation, so concurrent "last place" requests
//!   serialize in the database.
//! - `block_cascade` runs in one transaction holding the slot row under
//!   `FOR UPDATE`, so no reader sees the slot blocked with bookings still
//!   occupying or the reverse.
//! - `resync_booked_count` recomputes the count from the live bookings inside
//!   a single `UPDATE ... FROM (SELECT COUNT(*) ...)`.
//!
//! Status strings are re-derived inside each statement with the same rule as
//! [`derive_status`](slotbook_core::types::derive_status): blocked wins, then
//! `booked_count >= capacity` means full.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use slotbook_core::store::{AdmissionMode, AdmissionOutcome, BookingStore, SlotStore};
use slotbook_core::types::{
    BlockMeta, Booking, BookingId, CancelMeta, CustomerId, Money, ServiceId, ShopId, Slot, SlotId,
    StaffId, TenantId, UserId,
};
use slotbook_core::StoreError;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

/// Booking statuses that occupy slot capacity, as a SQL list fragment.
/// Must mirror `BookingStatus::is_occupying`.
const OCCUPYING_SQL: &str = "('pending', 'confirmed', 'arrived', 'in_progress')";

const SLOT_COLUMNS: &str = "id, tenant_id, shop_id, date, start_time, end_time, capacity, \
     max_capacity, booked_count, status, is_blocked, blocked_by, blocked_reason, blocked_at, \
     unblock_at";

const BOOKING_COLUMNS: &str = "id, tenant_id, shop_id, slot_id, customer_id, service_id, \
     staff_id, status, source, scheduled_for, original_price_cents, final_price_cents, \
     price_edited, edited_by, edit_reason, arrived_at, started_at, completed_at, cancelled_at, \
     cancelled_by, cancelled_by_type, cancellation_reason, created_at";

/// PostgreSQL store for slots and bookings.
///
/// Cheap to clone; all clones share the underlying pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL with a small default pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(db_err)?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema (idempotent).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if a statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(include_str!("../schema.sql"))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        tracing::info!("slotbook schema applied");
        Ok(())
    }

    /// The underlying pool, for callers that share it.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SlotStore for PostgresStore {
    async fn insert_new(&self, slot: Slot) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO slots (id, tenant_id, shop_id, date, start_time, end_time, capacity, \
             max_capacity, booked_count, status, is_blocked, blocked_by, blocked_reason, \
             blocked_at, unblock_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT ON CONSTRAINT slots_key DO NOTHING",
        )
        .bind(*slot.id.as_uuid())
        .bind(*slot.tenant_id.as_uuid())
        .bind(*slot.shop_id.as_uuid())
        .bind(slot.date)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(to_int(slot.capacity)?)
        .bind(to_int(slot.max_capacity)?)
        .bind(to_int(slot.booked_count)?)
        .bind(slot.status.as_str())
        .bind(slot.is_blocked)
        .bind(slot.blocked_by.map(|id| *id.as_uuid()))
        .bind(slot.blocked_reason.as_deref())
        .bind(slot.blocked_at)
        .bind(slot.unblock_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, tenant: TenantId, id: SlotId) -> Result<Option<Slot>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(*id.as_uuid())
        .bind(*tenant.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(slot_from_row).transpose()
    }

    async fn find_by_start(
        &self,
        tenant: TenantId,
        shop: ShopId,
        date: NaiveDate,
        start: NaiveTime,
    ) -> Result<Option<Slot>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots \
             WHERE tenant_id = $1 AND shop_id = $2 AND date = $3 AND start_time = $4"
        ))
        .bind(*tenant.as_uuid())
        .bind(*shop.as_uuid())
        .bind(date)
        .bind(start)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(slot_from_row).transpose()
    }

    async fn list_day(
        &self,
        tenant: TenantId,
        shop: ShopId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError> {
        self.list_range(tenant, shop, date, date).await
    }

    async fn list_range(
        &self,
        tenant: TenantId,
        shop: ShopId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots \
             WHERE tenant_id = $1 AND shop_id = $2 AND date >= $3 AND date <= $4 \
             ORDER BY date, start_time"
        ))
        .bind(*tenant.as_uuid())
        .bind(*shop.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(slot_from_row).collect()
    }

    async fn update(&self, slot: &Slot) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE slots SET capacity = $3, max_capacity = $4, booked_count = $5, status = $6, \
             is_blocked = $7, blocked_by = $8, blocked_reason = $9, blocked_at = $10, \
             unblock_at = $11 \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(*slot.id.as_uuid())
        .bind(*slot.tenant_id.as_uuid())
        .bind(to_int(slot.capacity)?)
        .bind(to_int(slot.max_capacity)?)
        .bind(to_int(slot.booked_count)?)
        .bind(slot.status.as_str())
        .bind(slot.is_blocked)
        .bind(slot.blocked_by.map(|id| *id.as_uuid()))
        .bind(slot.blocked_reason.as_deref())
        .bind(slot.blocked_at)
        .bind(slot.unblock_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "update of unknown slot {}",
                slot.id
            )));
        }
        Ok(())
    }

    async fn admit(
        &self,
        tenant: TenantId,
        id: SlotId,
        mode: AdmissionMode,
    ) -> Result<AdmissionOutcome, StoreError> {
        let capacity_guard = match mode {
            AdmissionMode::Checked => "AND booked_count < capacity",
            AdmissionMode::Priority => "",
        };
        // The conditional UPDATE is the admission: check and increment are one
        // statement, serialized by the row lock.
        let row = sqlx::query(&format!(
            "UPDATE slots SET booked_count = booked_count + 1, \
             status = CASE WHEN booked_count + 1 >= capacity THEN 'full' \
                           ELSE 'available' END \
             WHERE id = $1 AND tenant_id = $2 AND NOT is_blocked {capacity_guard} \
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(*tenant.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        if let Some(row) = row {
            return Ok(AdmissionOutcome::Admitted(slot_from_row(&row)?));
        }
        // No row updated: classify why.
        match self.get(tenant, id).await? {
            None => Ok(AdmissionOutcome::NotFound),
            Some(slot) if slot.is_blocked => Ok(AdmissionOutcome::Blocked),
            Some(_) => Ok(AdmissionOutcome::Full),
        }
    }

    async fn resync_booked_count(
        &self,
        tenant: TenantId,
        id: SlotId,
    ) -> Result<Option<Slot>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE slots SET booked_count = live.cnt, \
             status = CASE WHEN is_blocked THEN 'blocked' \
                           WHEN live.cnt >= capacity THEN 'full' \
                           ELSE 'available' END \
             FROM (SELECT COUNT(*)::int AS cnt FROM bookings \
                   WHERE tenant_id = $2 AND slot_id = $1 AND status IN {OCCUPYING_SQL}) AS live \
             WHERE id = $1 AND tenant_id = $2 \
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(*tenant.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(slot_from_row).transpose()
    }

    async fn block_cascade(
        &self,
        tenant: TenantId,
        id: SlotId,
        block: BlockMeta,
        cancel: CancelMeta,
    ) -> Result<Option<(Slot, Vec<Booking>)>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let locked = sqlx::query("SELECT id FROM slots WHERE id = $1 AND tenant_id = $2 FOR UPDATE")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if locked.is_none() {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        }

        let cancelled_rows = sqlx::query(&format!(
            "UPDATE bookings SET status = 'cancelled', cancelled_at = $3, cancelled_by = $4, \
             cancelled_by_type = $5, cancellation_reason = $6 \
             WHERE tenant_id = $2 AND slot_id = $1 AND status IN {OCCUPYING_SQL} \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(*tenant.as_uuid())
        .bind(cancel.at)
        .bind(cancel.cancelled_by.map(|by| *by.as_uuid()))
        .bind(cancel.cancelled_by_type.as_str())
        .bind(cancel.reason.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        let slot_row = sqlx::query(&format!(
            "UPDATE slots SET is_blocked = TRUE, status = 'blocked', booked_count = 0, \
             blocked_by = $3, blocked_reason = $4, blocked_at = $5 \
             WHERE id = $1 AND tenant_id = $2 \
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(*tenant.as_uuid())
        .bind(*block.blocked_by.as_uuid())
        .bind(block.reason.as_str())
        .bind(block.at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        let slot = slot_from_row(&slot_row)?;
        let cancelled = cancelled_rows
            .iter()
            .map(booking_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some((slot, cancelled)))
    }

    async fn unblock(
        &self,
        tenant: TenantId,
        id: SlotId,
        at: DateTime<Utc>,
    ) -> Result<Option<Slot>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE slots SET is_blocked = FALSE, blocked_by = NULL, blocked_reason = NULL, \
             blocked_at = NULL, unblock_at = $3, \
             status = CASE WHEN booked_count >= capacity THEN 'full' ELSE 'available' END \
             WHERE id = $1 AND tenant_id = $2 \
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(*tenant.as_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(slot_from_row).transpose()
    }
}

#[async_trait]
impl BookingStore for PostgresStore {
    async fn insert(&self, booking: Booking) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO bookings (id, tenant_id, shop_id, slot_id, customer_id, service_id, \
             staff_id, status, source, scheduled_for, original_price_cents, final_price_cents, \
             price_edited, edited_by, edit_reason, arrived_at, started_at, completed_at, \
             cancelled_at, cancelled_by, cancelled_by_type, cancellation_reason, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23)",
        )
        .bind(*booking.id.as_uuid())
        .bind(*booking.tenant_id.as_uuid())
        .bind(*booking.shop_id.as_uuid())
        .bind(*booking.slot_id.as_uuid())
        .bind(*booking.customer_id.as_uuid())
        .bind(*booking.service_id.as_uuid())
        .bind(booking.staff_id.map(|id| *id.as_uuid()))
        .bind(booking.status.as_str())
        .bind(booking.source.as_str())
        .bind(booking.scheduled_for)
        .bind(to_cents(booking.original_price)?)
        .bind(to_cents(booking.final_price)?)
        .bind(booking.price_edited)
        .bind(booking.edited_by.map(|id| *id.as_uuid()))
        .bind(booking.edit_reason.as_deref())
        .bind(booking.arrived_at)
        .bind(booking.started_at)
        .bind(booking.completed_at)
        .bind(booking.cancelled_at)
        .bind(booking.cancelled_by.map(|id| *id.as_uuid()))
        .bind(booking.cancelled_by_type.map(|t| t.as_str()))
        .bind(booking.cancellation_reason.as_deref())
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, tenant: TenantId, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(*id.as_uuid())
        .bind(*tenant.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn save(&self, booking: &Booking) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE bookings SET staff_id = $3, status = $4, final_price_cents = $5, \
             price_edited = $6, edited_by = $7, edit_reason = $8, arrived_at = $9, \
             started_at = $10, completed_at = $11, cancelled_at = $12, cancelled_by = $13, \
             cancelled_by_type = $14, cancellation_reason = $15 \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(*booking.id.as_uuid())
        .bind(*booking.tenant_id.as_uuid())
        .bind(booking.staff_id.map(|id| *id.as_uuid()))
        .bind(booking.status.as_str())
        .bind(to_cents(booking.final_price)?)
        .bind(booking.price_edited)
        .bind(booking.edited_by.map(|id| *id.as_uuid()))
        .bind(booking.edit_reason.as_deref())
        .bind(booking.arrived_at)
        .bind(booking.started_at)
        .bind(booking.completed_at)
        .bind(booking.cancelled_at)
        .bind(booking.cancelled_by.map(|id| *id.as_uuid()))
        .bind(booking.cancelled_by_type.map(|t| t.as_str()))
        .bind(booking.cancellation_reason.as_deref())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "update of unknown booking {}",
                booking.id
            )));
        }
        Ok(())
    }

    async fn list_for_slot(
        &self,
        tenant: TenantId,
        slot: SlotId,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE tenant_id = $1 AND slot_id = $2 ORDER BY created_at"
        ))
        .bind(*tenant.as_uuid())
        .bind(*slot.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn occupying_for_slot(
        &self,
        tenant: TenantId,
        slot: SlotId,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE tenant_id = $1 AND slot_id = $2 AND status IN {OCCUPYING_SQL} \
             ORDER BY created_at"
        ))
        .bind(*tenant.as_uuid())
        .bind(*slot.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(booking_from_row).collect()
    }
}

// ============================================================================
// Row Mapping
// ============================================================================

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn to_int(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("count out of range: {value}")))
}

fn to_cents(money: Money) -> Result<i64, StoreError> {
    i64::try_from(money.cents())
        .map_err(|_| StoreError::Backend(format!("price out of range: {money}")))
}

fn col_err(column: &str, err: &sqlx::Error) -> StoreError {
    StoreError::Corrupted(format!("column {column}: {err}"))
}

fn get_count(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let value: i32 = row.try_get(column).map_err(|e| col_err(column, &e))?;
    u32::try_from(value).map_err(|_| StoreError::Corrupted(format!("negative {column}: {value}")))
}

fn get_money(row: &PgRow, column: &str) -> Result<Money, StoreError> {
    let value: i64 = row.try_get(column).map_err(|e| col_err(column, &e))?;
    let cents = u64::try_from(value)
        .map_err(|_| StoreError::Corrupted(format!("negative {column}: {value}")))?;
    Ok(Money::from_cents(cents))
}

fn slot_from_row(row: &PgRow) -> Result<Slot, StoreError> {
    let status: String = row.try_get("status").map_err(|e| col_err("status", &e))?;
    Ok(Slot {
        id: SlotId::from_uuid(row.try_get::<Uuid, _>("id").map_err(|e| col_err("id", &e))?),
        tenant_id: TenantId::from_uuid(
            row.try_get::<Uuid, _>("tenant_id")
                .map_err(|e| col_err("tenant_id", &e))?,
        ),
        shop_id: ShopId::from_uuid(
            row.try_get::<Uuid, _>("shop_id")
                .map_err(|e| col_err("shop_id", &e))?,
        ),
        date: row.try_get("date").map_err(|e| col_err("date", &e))?,
        start_time: row
            .try_get("start_time")
            .map_err(|e| col_err("start_time", &e))?,
        end_time: row
            .try_get("end_time")
            .map_err(|e| col_err("end_time", &e))?,
        capacity: get_count(row, "capacity")?,
        max_capacity: get_count(row, "max_capacity")?,
        booked_count: get_count(row, "booked_count")?,
        status: status.parse().map_err(StoreError::Corrupted)?,
        is_blocked: row
            .try_get("is_blocked")
            .map_err(|e| col_err("is_blocked", &e))?,
        blocked_by: row
            .try_get::<Option<Uuid>, _>("blocked_by")
            .map_err(|e| col_err("blocked_by", &e))?
            .map(UserId::from_uuid),
        blocked_reason: row
            .try_get("blocked_reason")
            .map_err(|e| col_err("blocked_reason", &e))?,
        blocked_at: row
            .try_get("blocked_at")
            .map_err(|e| col_err("blocked_at", &e))?,
        unblock_at: row
            .try_get("unblock_at")
            .map_err(|e| col_err("unblock_at", &e))?,
    })
}

fn booking_from_row(row: &PgRow) -> Result<Booking, StoreError> {
    let status: String = row.try_get("status").map_err(|e| col_err("status", &e))?;
    let source: String = row.try_get("source").map_err(|e| col_err("source", &e))?;
    let cancelled_by_type: Option<String> = row
        .try_get("cancelled_by_type")
        .map_err(|e| col_err("cancelled_by_type", &e))?;
    Ok(Booking {
        id: BookingId::from_uuid(row.try_get::<Uuid, _>("id").map_err(|e| col_err("id", &e))?),
        tenant_id: TenantId::from_uuid(
            row.try_get::<Uuid, _>("tenant_id")
                .map_err(|e| col_err("tenant_id", &e))?,
        ),
        shop_id: ShopId::from_uuid(
            row.try_get::<Uuid, _>("shop_id")
                .map_err(|e| col_err("shop_id", &e))?,
        ),
        slot_id: SlotId::from_uuid(
            row.try_get::<Uuid, _>("slot_id")
                .map_err(|e| col_err("slot_id", &e))?,
        ),
        customer_id: CustomerId::from_uuid(
            row.try_get::<Uuid, _>("customer_id")
                .map_err(|e| col_err("customer_id", &e))?,
        ),
        service_id: ServiceId::from_uuid(
            row.try_get::<Uuid, _>("service_id")
                .map_err(|e| col_err("service_id", &e))?,
        ),
        staff_id: row
            .try_get::<Option<Uuid>, _>("staff_id")
            .map_err(|e| col_err("staff_id", &e))?
            .map(StaffId::from_uuid),
        status: status.parse().map_err(StoreError::Corrupted)?,
        source: source.parse().map_err(StoreError::Corrupted)?,
        scheduled_for: row
            .try_get("scheduled_for")
            .map_err(|e| col_err("scheduled_for", &e))?,
        original_price: get_money(row, "original_price_cents")?,
        final_price: get_money(row, "final_price_cents")?,
        price_edited: row
            .try_get("price_edited")
            .map_err(|e| col_err("price_edited", &e))?,
        edited_by: row
            .try_get::<Option<Uuid>, _>("edited_by")
            .map_err(|e| col_err("edited_by", &e))?
            .map(UserId::from_uuid),
        edit_reason: row
            .try_get("edit_reason")
            .map_err(|e| col_err("edit_reason", &e))?,
        arrived_at: row
            .try_get("arrived_at")
            .map_err(|e| col_err("arrived_at", &e))?,
        started_at: row
            .try_get("started_at")
            .map_err(|e| col_err("started_at", &e))?,
        completed_at: row
            .try_get("completed_at")
            .map_err(|e| col_err("completed_at", &e))?,
        cancelled_at: row
            .try_get("cancelled_at")
            .map_err(|e| col_err("cancelled_at", &e))?,
        cancelled_by: row
            .try_get::<Option<Uuid>, _>("cancelled_by")
            .map_err(|e| col_err("cancelled_by", &e))?
            .map(UserId::from_uuid),
        cancelled_by_type: cancelled_by_type
            .map(|t| t.parse().map_err(StoreError::Corrupted))
            .transpose()?,
        cancellation_reason: row
            .try_get("cancellation_reason")
            .map_err(|e| col_err("cancellation_reason", &e))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| col_err("created_at", &e))?,
    })
}
