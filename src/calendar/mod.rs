//! Working-time calendars: base weekdays, date-ranged working weeks and
//! exceptions, inherited along the parent chain.

pub mod recurrence;
pub mod resolve;

pub use recurrence::{MAX_RECURRENCE_DATES, RecurrenceType, RecurringData};
pub use resolve::{ResolutionCache, WorkTime, resolve};

use crate::duration::Duration;
use crate::error::{EntityKind, ModelError, ModelResult};
use crate::project::ProjectFile;
use crate::raw::RawRecord;
use crate::resource::ResourceRef;
use crate::task::TaskRef;
use chrono::{Days, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use tracing::warn;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Weekdays in the order calendars store them.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum DayType {
    Working,
    NonWorking,
    /// Take the day from the parent calendar.
    #[default]
    Default,
}

impl FromStr for DayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "working" => Ok(DayType::Working),
            "non_working" | "nonworking" => Ok(DayType::NonWorking),
            "default" => Ok(DayType::Default),
            _ => Err(format!("unknown day type '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum CalendarType {
    #[default]
    Global,
    Resource,
    Shared,
}

impl FromStr for CalendarType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" | "standard" | "base" => Ok(CalendarType::Global),
            "resource" => Ok(CalendarType::Resource),
            "shared" => Ok(CalendarType::Shared),
            _ => Err(format!("unknown calendar type '{s}'")),
        }
    }
}

/// A `[from, to)` time-of-day range. A `to` of midnight is the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CalendarHours {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl CalendarHours {
    pub fn new(from: NaiveTime, to: NaiveTime) -> Self {
        Self { from, to }
    }

    fn start_minute(&self) -> u32 {
        self.from.num_seconds_from_midnight() / 60
    }

    fn end_minute(&self) -> u32 {
        if self.to == NaiveTime::MIN {
            MINUTES_PER_DAY
        } else {
            self.to.num_seconds_from_midnight() / 60
        }
    }

    pub fn minutes(&self) -> i64 {
        i64::from(self.end_minute()) - i64::from(self.start_minute())
    }

    fn from_raw(record: &RawRecord) -> ModelResult<Self> {
        let kind = EntityKind::Calendar;
        let from = record
            .time(kind, "from")?
            .ok_or_else(|| ModelError::invalid_field(kind, "hours.from", "missing"))?;
        let to = record
            .time(kind, "to")?
            .ok_or_else(|| ModelError::invalid_field(kind, "hours.to", "missing"))?;
        Ok(Self { from, to })
    }
}

impl fmt::Display for CalendarHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from.format("%H:%M"), self.to.format("%H:%M"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub day_type: DayType,
    pub hours: Vec<CalendarHours>,
}

impl CalendarDay {
    pub fn working(hours: Vec<CalendarHours>) -> Self {
        Self {
            day_type: DayType::Working,
            hours,
        }
    }

    pub fn non_working() -> Self {
        Self {
            day_type: DayType::NonWorking,
            hours: Vec::new(),
        }
    }
}

/// A named override of the base week, active over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarWeek {
    pub name: Option<String>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: [CalendarDay; 7],
}

impl CalendarWeek {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    pub fn day(&self, weekday: Weekday) -> &CalendarDay {
        &self.days[weekday.num_days_from_monday() as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarException {
    pub name: Option<String>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub working: bool,
    pub hours: Vec<CalendarHours>,
}

impl CalendarException {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calendar {
    pub unique_id: i32,
    pub parent_unique_id: Option<i32>,
    pub name: Option<String>,
    pub calendar_type: CalendarType,
    pub personal: bool,
    pub minutes_per_day: Option<i32>,
    pub minutes_per_week: Option<i32>,
    pub minutes_per_month: Option<i32>,
    pub minutes_per_year: Option<i32>,
    /// Base week, Monday first.
    pub days: [CalendarDay; 7],
    /// Sorted by `from`, never overlapping.
    pub weeks: Vec<CalendarWeek>,
    /// Document order; the first exception containing a date wins.
    pub exceptions: Vec<CalendarException>,
}

impl Calendar {
    pub fn day(&self, weekday: Weekday) -> &CalendarDay {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    pub(crate) fn from_raw(record: &RawRecord) -> ModelResult<Self> {
        let kind = EntityKind::Calendar;
        let unique_id = record.unique_id(kind)?;
        let parent_unique_id = record.integer(kind, "parent_unique_id")?;
        let calendar_type = match record.string(kind, "type")? {
            Some(text) => text
                .parse()
                .map_err(|detail: String| ModelError::invalid_field(kind, "type", detail))?,
            None => CalendarType::default(),
        };

        let days = parse_days(record, unique_id)?;
        if parent_unique_id.is_none() {
            for (weekday, day) in WEEKDAYS.iter().zip(&days) {
                if day.day_type == DayType::Default {
                    warn!(
                        calendar = unique_id,
                        weekday = %weekday,
                        "root calendar leaves a weekday as default, treating it as non-working"
                    );
                }
            }
        }

        let mut weeks = record
            .records(kind, "working_weeks")?
            .iter()
            .map(|week| parse_week(week, unique_id))
            .collect::<ModelResult<Vec<_>>>()?;
        weeks.sort_by_key(|week| week.from);
        if let Some(pair) = weeks.windows(2).find(|pair| pair[0].to >= pair[1].from) {
            return Err(ModelError::malformed_range(
                kind,
                unique_id,
                format!(
                    "working weeks {}..{} and {}..{} overlap",
                    pair[0].from, pair[0].to, pair[1].from, pair[1].to
                ),
            ));
        }

        let mut exceptions = Vec::new();
        for exception in record.records(kind, "exceptions")? {
            exceptions.extend(parse_exception(&exception, unique_id)?);
        }

        Ok(Self {
            unique_id,
            parent_unique_id,
            name: record.string(kind, "name")?,
            calendar_type,
            personal: record.boolean(kind, "personal")?,
            minutes_per_day: record.integer(kind, "minutes_per_day")?,
            minutes_per_week: record.integer(kind, "minutes_per_week")?,
            minutes_per_month: record.integer(kind, "minutes_per_month")?,
            minutes_per_year: record.integer(kind, "minutes_per_year")?,
            days,
            weeks,
            exceptions,
        })
    }
}

fn parse_days(record: &RawRecord, unique_id: i32) -> ModelResult<[CalendarDay; 7]> {
    let mut days: [CalendarDay; 7] = Default::default();
    for (slot, weekday) in WEEKDAYS.iter().enumerate() {
        let field = weekday_field(*weekday);
        if let Some(day) = record.record(EntityKind::Calendar, field)? {
            days[slot] = parse_day(&day, unique_id)?;
        }
    }
    Ok(days)
}

fn parse_day(record: &RawRecord, unique_id: i32) -> ModelResult<CalendarDay> {
    let kind = EntityKind::Calendar;
    let hours = parse_hours(record, unique_id)?;
    let day_type = match record.string(kind, "type")? {
        Some(text) => text
            .parse()
            .map_err(|detail: String| ModelError::invalid_field(kind, "type", detail))?,
        None if hours.is_empty() => DayType::Default,
        None => DayType::Working,
    };
    Ok(CalendarDay { day_type, hours })
}

/// Reads an `hours` list, sorted ascending, rejecting empty, reversed and
/// overlapping ranges.
fn parse_hours(record: &RawRecord, unique_id: i32) -> ModelResult<Vec<CalendarHours>> {
    let kind = EntityKind::Calendar;
    let mut hours = record
        .records(kind, "hours")?
        .iter()
        .map(CalendarHours::from_raw)
        .collect::<ModelResult<Vec<_>>>()?;

    for range in &hours {
        if range.start_minute() >= range.end_minute() {
            return Err(ModelError::malformed_range(
                kind,
                unique_id,
                format!("hours {range} do not run forwards"),
            ));
        }
    }
    hours.sort_by_key(|range| range.start_minute());
    if let Some(pair) = hours
        .windows(2)
        .find(|pair| pair[0].end_minute() > pair[1].start_minute())
    {
        return Err(ModelError::malformed_range(
            kind,
            unique_id,
            format!("hours {} and {} overlap", pair[0], pair[1]),
        ));
    }
    Ok(hours)
}

fn parse_week(record: &RawRecord, unique_id: i32) -> ModelResult<CalendarWeek> {
    let kind = EntityKind::Calendar;
    let from = record.date(kind, "effective_from")?.unwrap_or(NaiveDate::MIN);
    let to = record.date(kind, "effective_to")?.unwrap_or(NaiveDate::MAX);
    if from > to {
        return Err(ModelError::malformed_range(
            kind,
            unique_id,
            format!("working week runs from {from} back to {to}"),
        ));
    }
    Ok(CalendarWeek {
        name: record.string(kind, "name")?,
        from,
        to,
        days: parse_days(record, unique_id)?,
    })
}

/// One raw exception becomes one entry, or one single-day entry per
/// occurrence when it recurs.
fn parse_exception(record: &RawRecord, unique_id: i32) -> ModelResult<Vec<CalendarException>> {
    let kind = EntityKind::Calendar;
    let name = record.string(kind, "name")?;
    let hours = parse_hours(record, unique_id)?;
    let working = match record.string(kind, "type")? {
        Some(text) => {
            let day_type: DayType = text
                .parse()
                .map_err(|detail: String| ModelError::invalid_field(kind, "exceptions.type", detail))?;
            match day_type {
                DayType::Working => true,
                DayType::NonWorking => false,
                DayType::Default => !hours.is_empty(),
            }
        }
        None => !hours.is_empty(),
    };
    let hours = if working { hours } else { Vec::new() };

    if let Some(recurrence) = record.record(kind, "recurrence")? {
        let recurrence = RecurringData::from_raw(&recurrence)?;
        let dates = recurrence.dates();
        if dates.is_empty() {
            warn!(calendar = unique_id, name = ?name, "recurring exception produced no dates");
        } else if dates.len() == MAX_RECURRENCE_DATES {
            warn!(
                calendar = unique_id,
                name = ?name,
                limit = MAX_RECURRENCE_DATES,
                "recurring exception truncated"
            );
        }
        return Ok(dates
            .into_iter()
            .map(|date| CalendarException {
                name: name.clone(),
                from: date,
                to: date,
                working,
                hours: hours.clone(),
            })
            .collect());
    }

    let from = record
        .date(kind, "from")?
        .ok_or_else(|| ModelError::invalid_field(kind, "exceptions.from", "missing"))?;
    let to = record.date(kind, "to")?.unwrap_or(from);
    if from > to {
        return Err(ModelError::malformed_range(
            kind,
            unique_id,
            format!("exception runs from {from} back to {to}"),
        ));
    }
    Ok(vec![CalendarException {
        name,
        from,
        to,
        working,
        hours,
    }])
}

fn weekday_field(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// A calendar inside a built [`ProjectFile`].
#[derive(Clone, Copy)]
pub struct CalendarRef<'p> {
    project: &'p ProjectFile,
    slot: usize,
}

impl<'p> CalendarRef<'p> {
    pub(crate) fn new(project: &'p ProjectFile, slot: usize) -> Self {
        Self { project, slot }
    }

    pub fn calendar(&self) -> &'p Calendar {
        &self.project.calendars[self.slot]
    }

    pub fn parent(&self) -> Option<CalendarRef<'p>> {
        self.project.calendar_tree.parents[self.slot]
            .map(|slot| CalendarRef::new(self.project, slot))
    }

    /// Calendars whose parent is this one, in document order.
    pub fn derived_calendars(&self) -> Vec<CalendarRef<'p>> {
        self.project.calendar_tree.children[self.slot]
            .iter()
            .map(|&slot| CalendarRef::new(self.project, slot))
            .collect()
    }

    /// Tasks that name this calendar directly.
    pub fn tasks(&self) -> Vec<TaskRef<'p>> {
        self.project
            .task_calendars
            .iter()
            .enumerate()
            .filter(|(_, calendar)| **calendar == Some(self.slot))
            .map(|(slot, _)| TaskRef::new(self.project, slot))
            .collect()
    }

    pub fn resources(&self) -> Vec<ResourceRef<'p>> {
        self.project
            .resource_calendars
            .iter()
            .enumerate()
            .filter(|(_, calendar)| **calendar == Some(self.slot))
            .map(|(slot, _)| ResourceRef::new(self.project, slot))
            .collect()
    }

    pub fn resolve(&self, date: NaiveDate) -> WorkTime {
        self.project.resolve_calendar(self.slot, date)
    }

    pub fn is_working_date(&self, date: NaiveDate) -> bool {
        self.resolve(date).is_working
    }

    pub fn start_time(&self, date: NaiveDate) -> Option<NaiveTime> {
        let work = self.resolve(date);
        if !work.is_working {
            return None;
        }
        work.ranges.first().map(|range| range.from)
    }

    pub fn finish_time(&self, date: NaiveDate) -> Option<NaiveTime> {
        let work = self.resolve(date);
        if !work.is_working {
            return None;
        }
        work.ranges.last().map(|range| range.to)
    }

    /// Working minutes on `date`.
    pub fn work(&self, date: NaiveDate) -> Duration {
        Duration::minutes(self.resolve(date).minutes() as f64)
    }

    /// Working dates in `start..=end`.
    pub fn working_days(&self, start: NaiveDate, end: NaiveDate) -> usize {
        let mut count = 0;
        let mut current = start;
        while current <= end {
            if self.is_working_date(current) {
                count += 1;
            }
            match current.checked_add_days(Days::new(1)) {
                Some(next) => current = next,
                None => break,
            }
        }
        count
    }

    /// The base weekday type after inheritance, ignoring weeks and exceptions.
    pub fn day_type(&self, weekday: Weekday) -> DayType {
        self.base_day(weekday)
            .map(|day| day.day_type)
            .unwrap_or(DayType::NonWorking)
    }

    /// The base weekday hours after inheritance, ignoring weeks and exceptions.
    pub fn hours(&self, weekday: Weekday) -> Vec<CalendarHours> {
        match self.base_day(weekday) {
            Some(day) if day.day_type == DayType::Working => day.hours.clone(),
            _ => Vec::new(),
        }
    }

    pub fn minutes_per_day(&self) -> i32 {
        self.inherited(|calendar| calendar.minutes_per_day)
            .unwrap_or_else(|| self.project.time_defaults().minutes_per_day)
    }

    pub fn minutes_per_week(&self) -> i32 {
        self.inherited(|calendar| calendar.minutes_per_week)
            .unwrap_or_else(|| self.project.time_defaults().minutes_per_week)
    }

    pub fn minutes_per_month(&self) -> i32 {
        self.inherited(|calendar| calendar.minutes_per_month)
            .unwrap_or_else(|| self.project.time_defaults().minutes_per_month)
    }

    pub fn minutes_per_year(&self) -> i32 {
        self.inherited(|calendar| calendar.minutes_per_year)
            .unwrap_or_else(|| self.project.time_defaults().minutes_per_year)
    }

    pub fn days_per_month(&self) -> i32 {
        self.project.time_defaults().days_per_month
    }

    fn base_day(&self, weekday: Weekday) -> Option<&'p CalendarDay> {
        let mut current = Some(*self);
        while let Some(calendar) = current {
            let day = calendar.calendar().day(weekday);
            if day.day_type != DayType::Default {
                return Some(day);
            }
            current = calendar.parent();
        }
        None
    }

    fn inherited(&self, value: impl Fn(&Calendar) -> Option<i32>) -> Option<i32> {
        let mut current = Some(*self);
        while let Some(calendar) = current {
            if let Some(found) = value(calendar.calendar()) {
                return Some(found);
            }
            current = calendar.parent();
        }
        None
    }
}

impl Deref for CalendarRef<'_> {
    type Target = Calendar;

    fn deref(&self) -> &Calendar {
        &self.project.calendars[self.slot]
    }
}

impl PartialEq for CalendarRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.project, other.project) && self.slot == other.slot
    }
}

impl fmt::Debug for CalendarRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarRef")
            .field("unique_id", &self.unique_id)
            .field("name", &self.name)
            .finish()
    }
}
