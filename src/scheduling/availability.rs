use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use uuid::Uuid;

use super::store::AppointmentStore;
use crate::routing::TriageError;
use crate::routing_config::RoutingConfig;

/// Bookable hours of a day: on the hour, `start_hour <= h < end_hour`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SlotGrid {
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            start_hour: config.slot_start_hour,
            end_hour: config.slot_end_hour,
        }
    }

    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        ts.minute() == 0
            && ts.second() == 0
            && ts.nanosecond() == 0
            && (self.start_hour..self.end_hour).contains(&ts.hour())
    }

    /// Every grid slot of one day, in hour order.
    pub fn slots_on(&self, day: NaiveDate) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (self.start_hour..self.end_hour)
            .filter_map(move |h| NaiveTime::from_hms_opt(h, 0, 0).map(|t| day.and_time(t)))
    }
}

/// First and last instants covered by a window of `days` after the start
/// day, both end days included.
pub fn window_bounds(window_start: NaiveDateTime, days: u32) -> (NaiveDateTime, NaiveDateTime) {
    let first_day = window_start.date();
    let last_day = first_day
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);
    (
        first_day.and_time(NaiveTime::MIN),
        last_day.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)),
    )
}

/// Grid slots of days `0..=days` after the start day, day then hour, minus
/// any timestamp in `booked`. The time of day of `window_start` is ignored.
pub fn open_slots(
    grid: &SlotGrid,
    window_start: NaiveDateTime,
    days: u32,
    booked: &HashSet<NaiveDateTime>,
) -> Vec<NaiveDateTime> {
    let first_day = window_start.date();
    (0..=u64::from(days))
        .filter_map(|offset| first_day.checked_add_days(Days::new(offset)))
        .flat_map(|day| grid.slots_on(day))
        .filter(|slot| !booked.contains(slot))
        .collect()
}

/// Reads scheduled bookings from the store and subtracts them from the grid.
pub struct AvailabilityChecker {
    store: Arc<dyn AppointmentStore>,
    grid: SlotGrid,
    default_window_days: u32,
    max_window_days: u32,
}

impl AvailabilityChecker {
    pub fn new(store: Arc<dyn AppointmentStore>, config: &RoutingConfig) -> Self {
        Self {
            store,
            grid: SlotGrid::from_config(config),
            default_window_days: config.default_window_days,
            max_window_days: config.max_window_days,
        }
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    /// Open hourly slots for `doctor_id`. `window_days` defaults to the
    /// configured window and may not exceed `max_window_days`. An empty
    /// result is a valid answer.
    pub fn availability(
        &self,
        doctor_id: &Uuid,
        window_start: NaiveDateTime,
        window_days: Option<u32>,
    ) -> Result<Vec<NaiveDateTime>, TriageError> {
        let days = window_days.unwrap_or(self.default_window_days);
        if days > self.max_window_days {
            return Err(TriageError::InvalidInput(format!(
                "availability window is limited to {} days (asked for {days})",
                self.max_window_days
            )));
        }
        let (from, to) = window_bounds(window_start, days);
        let booked: HashSet<NaiveDateTime> = self
            .store
            .list_scheduled_appointments(doctor_id, from, to)?
            .into_iter()
            .map(|a| a.scheduled_at)
            .collect();

        let slots = open_slots(&self.grid, window_start, days, &booked);
        tracing::debug!(
            doctor_id = %doctor_id,
            days,
            booked = booked.len(),
            open = slots.len(),
            "Availability computed"
        );
        Ok(slots)
    }
}
