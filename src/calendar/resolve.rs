use super::{Calendar, CalendarHours, DayType};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

#[cfg(feature = "resolve-cache")]
use parking_lot::RwLock;
#[cfg(feature = "resolve-cache")]
use std::collections::HashMap;

/// Working time of one calendar on one date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkTime {
    pub is_working: bool,
    pub ranges: Vec<CalendarHours>,
}

impl WorkTime {
    pub fn non_working() -> Self {
        Self::default()
    }

    pub fn minutes(&self) -> i64 {
        self.ranges.iter().map(CalendarHours::minutes).sum()
    }
}

/// Resolves `date` against the calendar in `slot`.
///
/// Own exceptions win over own working weeks, which win over the base week.
/// A `Default` day defers to the parent; a root that still reaches `Default`
/// is non-working. `parents` must be acyclic.
pub fn resolve(
    calendars: &[Calendar],
    parents: &[Option<usize>],
    slot: usize,
    date: NaiveDate,
) -> WorkTime {
    let weekday = date.weekday();
    let mut current = Some(slot);

    while let Some(slot) = current {
        let calendar = &calendars[slot];

        if let Some(exception) = calendar.exceptions.iter().find(|ex| ex.contains(date)) {
            return WorkTime {
                is_working: exception.working,
                ranges: if exception.working {
                    exception.hours.clone()
                } else {
                    Vec::new()
                },
            };
        }

        let day = match calendar.weeks.iter().find(|week| week.contains(date)) {
            Some(week) => week.day(weekday),
            None => calendar.day(weekday),
        };

        match day.day_type {
            DayType::Working => {
                return WorkTime {
                    is_working: true,
                    ranges: day.hours.clone(),
                };
            }
            DayType::NonWorking => return WorkTime::non_working(),
            DayType::Default => current = parents[slot],
        }
    }

    WorkTime::non_working()
}

/// Memo of resolved `(calendar slot, date)` pairs.
///
/// Without the `resolve-cache` feature, or when disabled, every lookup
/// resolves afresh.
#[derive(Default)]
pub struct ResolutionCache {
    enabled: bool,
    #[cfg(feature = "resolve-cache")]
    entries: RwLock<HashMap<(usize, NaiveDate), WorkTime>>,
}

impl ResolutionCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            #[cfg(feature = "resolve-cache")]
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && cfg!(feature = "resolve-cache")
    }

    #[cfg(feature = "resolve-cache")]
    pub fn get_or_resolve(
        &self,
        slot: usize,
        date: NaiveDate,
        resolve: impl FnOnce() -> WorkTime,
    ) -> WorkTime {
        if !self.enabled {
            return resolve();
        }
        if let Some(hit) = self.entries.read().get(&(slot, date)) {
            return hit.clone();
        }
        let work = resolve();
        self.entries.write().insert((slot, date), work.clone());
        work
    }

    #[cfg(not(feature = "resolve-cache"))]
    pub fn get_or_resolve(
        &self,
        _slot: usize,
        _date: NaiveDate,
        resolve: impl FnOnce() -> WorkTime,
    ) -> WorkTime {
        resolve()
    }

    pub fn len(&self) -> usize {
        #[cfg(feature = "resolve-cache")]
        {
            self.entries.read().len()
        }
        #[cfg(not(feature = "resolve-cache"))]
        {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("enabled", &self.is_enabled())
            .field("entries", &self.len())
            .finish()
    }
}
