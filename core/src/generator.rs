//! Slot generation.
//!
//! Carves a shop's working day into fixed-width windows and persists one slot
//! per window, sized to the current active staff count. Generation is
//! idempotent: a slot that already exists for a (shop, date, start) key is
//! left untouched.

use crate::environment::Environment;
use crate::error::{EngineError, Result};
use crate::types::{ShopConfig, ShopId, Slot, TenantId};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

/// Tiles `[open, close)` into fixed-width windows of `duration_minutes`.
///
/// A trailing partial window shorter than the full duration is not produced;
/// the tiling stops once the next window would not fit fully before closing
/// time. Returns an empty vector when the duration is zero or does not fit at
/// all.
#[must_use]
pub fn tile_windows(
    open: NaiveTime,
    close: NaiveTime,
    duration_minutes: u32,
) -> Vec<(NaiveTime, NaiveTime)> {
    let mut windows = Vec::new();
    if duration_minutes == 0 {
        return windows;
    }
    let duration = Duration::minutes(i64::from(duration_minutes));
    let mut start = open;
    loop {
        // overflowing_add_signed reports midnight wrap-around, which would
        // otherwise tile past closing time forever.
        let (end, wrapped) = start.overflowing_add_signed(duration);
        if wrapped != 0 || end > close || start >= close {
            break;
        }
        windows.push((start, end));
        start = end;
    }
    windows
}

/// Generates slots for a shop from its working-hours configuration and the
/// current staff roster.
#[derive(Clone, Debug)]
pub struct SlotGenerator {
    env: Environment,
}

impl SlotGenerator {
    /// Creates a generator over the given environment.
    #[must_use]
    pub const fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Generates slots for every day in the inclusive date range.
    ///
    /// Returns all slots present in the range after generation, ordered by
    /// (date, start time).
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the shop has no configuration
    /// - [`EngineError::NoActiveStaff`] if the shop has no active staff
    /// - [`EngineError::Validation`] if `end_date` precedes `start_date`
    /// - [`EngineError::Store`] on backend failure
    pub async fn generate_range(
        &self,
        tenant: TenantId,
        shop: ShopId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Slot>> {
        if end_date < start_date {
            return Err(EngineError::Validation(format!(
                "end date {end_date} precedes start date {start_date}"
            )));
        }
        let config = self.shop_config(tenant, shop).await?;
        let staff_count = self.require_staff(tenant, shop).await?;

        let mut slots = Vec::new();
        let mut date = start_date;
        while date <= end_date {
            slots.extend(self.generate_day_inner(tenant, shop, &config, staff_count, date).await?);
            date += Duration::days(1);
        }
        tracing::info!(%tenant, %shop, %start_date, %end_date, total = slots.len(), "generated slot range");
        Ok(slots)
    }

    /// Generates slots for a single day.
    ///
    /// A day on which the shop is closed yields an empty result, not an
    /// error. Returns all slots present for the day after generation.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the shop has no configuration
    /// - [`EngineError::NoActiveStaff`] if the shop has no active staff
    /// - [`EngineError::Store`] on backend failure
    pub async fn generate_day(
        &self,
        tenant: TenantId,
        shop: ShopId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>> {
        let config = self.shop_config(tenant, shop).await?;
        let staff_count = self.require_staff(tenant, shop).await?;
        self.generate_day_inner(tenant, shop, &config, staff_count, date)
            .await
    }

    async fn generate_day_inner(
        &self,
        tenant: TenantId,
        shop: ShopId,
        config: &ShopConfig,
        staff_count: u32,
        date: NaiveDate,
    ) -> Result<Vec<Slot>> {
        let hours = config.hours_for(date.weekday());
        if !hours.is_open {
            tracing::debug!(%tenant, %shop, %date, "shop closed, no slots generated");
            return Ok(Vec::new());
        }

        let mut created = 0usize;
        for (start, end) in tile_windows(hours.open, hours.close, config.slot_duration_minutes) {
            let slot = Slot::new(tenant, shop, date, start, end, staff_count);
            if self.env.slots.insert_new(slot).await? {
                created += 1;
            }
        }
        let slots = self.env.slots.list_day(tenant, shop, date).await?;
        tracing::debug!(%tenant, %shop, %date, created, present = slots.len(), "generated day");
        Ok(slots)
    }

    async fn shop_config(&self, tenant: TenantId, shop: ShopId) -> Result<ShopConfig> {
        self.env
            .shops
            .config(tenant, shop)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "shop",
                id: shop.to_string(),
            })
    }

    async fn require_staff(&self, tenant: TenantId, shop: ShopId) -> Result<u32> {
        let count = self.env.roster.active_staff_count(tenant, shop).await?;
        if count == 0 {
            return Err(EngineError::NoActiveStaff);
        }
        Ok(count)
    }
}
