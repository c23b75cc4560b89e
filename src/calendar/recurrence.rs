//! Expansion of recurring calendar exceptions into concrete dates.

use crate::error::{EntityKind, ModelError, ModelResult};
use crate::raw::RawRecord;
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use std::str::FromStr;

/// Upper bound on the dates one recurrence expands to. Larger `occurrences`
/// values are rejected; finish-date ranges stop expanding here.
pub const MAX_RECURRENCE_DATES: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for RecurrenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RecurrenceType::Daily),
            "weekly" => Ok(RecurrenceType::Weekly),
            "monthly" => Ok(RecurrenceType::Monthly),
            "yearly" => Ok(RecurrenceType::Yearly),
            other => Err(format!("unknown recurrence type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringData {
    pub recurrence_type: RecurrenceType,
    pub start_date: NaiveDate,
    /// When set, generation runs until this date; otherwise `occurrences` bounds it.
    pub finish_date: Option<NaiveDate>,
    pub occurrences: Option<i32>,
    pub frequency: i32,
    pub relative: bool,
    pub day_number: Option<i32>,
    pub month_number: Option<i32>,
    /// Selected weekdays for weekly recurrences; the first entry is the
    /// weekday used by relative monthly and yearly recurrences.
    pub weekly_days: Vec<Weekday>,
}

impl RecurringData {
    pub(crate) fn from_raw(record: &RawRecord) -> ModelResult<Self> {
        let kind = EntityKind::Calendar;
        let recurrence_type: RecurrenceType = record
            .string(kind, "type")?
            .ok_or_else(|| ModelError::invalid_field(kind, "recurrence.type", "missing"))?
            .parse()
            .map_err(|detail: String| ModelError::invalid_field(kind, "recurrence.type", detail))?;
        let start_date = record
            .date(kind, "start_date")?
            .ok_or_else(|| ModelError::invalid_field(kind, "recurrence.start_date", "missing"))?;
        let weekly_days = record
            .strings(kind, "weekly_days")?
            .iter()
            .map(|name| {
                name.parse::<Weekday>().map_err(|_| {
                    ModelError::invalid_field(
                        kind,
                        "recurrence.weekly_days",
                        format!("unknown weekday '{name}'"),
                    )
                })
            })
            .collect::<ModelResult<Vec<_>>>()?;

        let data = Self {
            recurrence_type,
            start_date,
            finish_date: record.date(kind, "finish_date")?,
            occurrences: record.integer(kind, "occurrences")?,
            frequency: record.integer(kind, "frequency")?.unwrap_or(1).max(1),
            relative: record.boolean(kind, "relative")?,
            day_number: record.integer(kind, "day_number")?,
            month_number: record.integer(kind, "month_number")?,
            weekly_days,
        };
        data.validate()?;
        Ok(data)
    }

    fn validate(&self) -> ModelResult<()> {
        let kind = EntityKind::Calendar;
        if let Some(count) = self.occurrences {
            if count as i64 > MAX_RECURRENCE_DATES as i64 {
                return Err(ModelError::invalid_field(
                    kind,
                    "recurrence.occurrences",
                    format!("at most {MAX_RECURRENCE_DATES} occurrences are supported (got {count})"),
                ));
            }
        }
        let needs_month = self.recurrence_type == RecurrenceType::Yearly;
        if needs_month && !matches!(self.month_number, Some(1..=12)) {
            return Err(ModelError::invalid_field(
                kind,
                "recurrence.month_number",
                "yearly recurrence needs a month between 1 and 12",
            ));
        }
        let absolute = matches!(
            self.recurrence_type,
            RecurrenceType::Monthly | RecurrenceType::Yearly
        ) && !self.relative;
        if absolute && !matches!(self.day_number, Some(1..=31)) {
            return Err(ModelError::invalid_field(
                kind,
                "recurrence.day_number",
                "absolute recurrence needs a day between 1 and 31",
            ));
        }
        Ok(())
    }

    /// Every date on which the recurrence occurs, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        match (self.recurrence_type, self.relative) {
            (RecurrenceType::Daily, _) => self.daily_dates(&mut dates),
            (RecurrenceType::Weekly, _) => self.weekly_dates(&mut dates),
            (RecurrenceType::Monthly, true) => self.monthly_relative_dates(&mut dates),
            (RecurrenceType::Monthly, false) => self.monthly_absolute_dates(&mut dates),
            (RecurrenceType::Yearly, true) => self.yearly_relative_dates(&mut dates),
            (RecurrenceType::Yearly, false) => self.yearly_absolute_dates(&mut dates),
        }
        dates
    }

    fn more_dates(&self, date: NaiveDate, dates: &[NaiveDate]) -> bool {
        if dates.len() >= MAX_RECURRENCE_DATES {
            return false;
        }
        match self.finish_date {
            Some(finish) => date <= finish,
            None => {
                let occurrences = self.occurrences.unwrap_or(1).max(1);
                dates.len() < occurrences as usize
            }
        }
    }

    fn frequency(&self) -> u32 {
        self.frequency.max(1) as u32
    }

    fn daily_dates(&self, dates: &mut Vec<NaiveDate>) {
        let mut date = self.start_date;
        while self.more_dates(date, dates) {
            dates.push(date);
            let Some(next) = date.checked_add_days(Days::new(self.frequency() as u64)) else {
                break;
            };
            date = next;
        }
    }

    fn weekly_dates(&self, dates: &mut Vec<NaiveDate>) {
        if self.weekly_days.is_empty() {
            return;
        }
        // Walk whole weeks starting from the Sunday on or before the start date.
        let back = self.start_date.weekday().num_days_from_sunday() as u64;
        let Some(mut date) = self.start_date.checked_sub_days(Days::new(back)) else {
            return;
        };
        let mut current = Weekday::Sun;

        while self.more_dates(date, dates) {
            let mut offset: u64 = 0;
            for _ in 0..7 {
                if self.weekly_days.contains(&current) {
                    if offset != 0 {
                        match date.checked_add_days(Days::new(offset)) {
                            Some(next) => date = next,
                            None => return,
                        }
                        offset = 0;
                    }
                    if !self.more_dates(date, dates) {
                        break;
                    }
                    if date >= self.start_date {
                        dates.push(date);
                    }
                }
                offset += 1;
                current = current.succ();
            }
            offset += 7 * (self.frequency() as u64 - 1);
            match date.checked_add_days(Days::new(offset)) {
                Some(next) => date = next,
                None => return,
            }
        }
    }

    fn monthly_relative_dates(&self, dates: &mut Vec<NaiveDate>) {
        let Some(&weekday) = self.weekly_days.first() else {
            return;
        };
        let day_number = self.day_number.unwrap_or(1);
        let mut month = first_of_month(self.start_date);

        while self.more_dates(month, dates) {
            let Some(date) = relative_day(month, weekday, day_number) else {
                return;
            };
            if date >= self.start_date {
                if !self.more_dates(date, dates) {
                    break;
                }
                dates.push(date);
            }
            match first_of_month(date).checked_add_months(Months::new(self.frequency())) {
                Some(next) => month = next,
                None => return,
            }
        }
    }

    fn monthly_absolute_dates(&self, dates: &mut Vec<NaiveDate>) {
        let required = self.day_number.unwrap_or(1) as u32;
        let mut month = first_of_month(self.start_date);
        if required < self.start_date.day() {
            match month.checked_add_months(Months::new(1)) {
                Some(next) => month = next,
                None => return,
            }
        }

        while self.more_dates(month, dates) {
            let Some(date) = clamped_day(month, required) else {
                return;
            };
            if !self.more_dates(date, dates) {
                break;
            }
            dates.push(date);
            match month.checked_add_months(Months::new(self.frequency())) {
                Some(next) => month = next,
                None => return,
            }
        }
    }

    fn yearly_relative_dates(&self, dates: &mut Vec<NaiveDate>) {
        let Some(&weekday) = self.weekly_days.first() else {
            return;
        };
        let day_number = self.day_number.unwrap_or(1);
        let Some(mut month) = self.start_month() else {
            return;
        };

        while self.more_dates(month, dates) {
            let Some(date) = relative_day(month, weekday, day_number) else {
                return;
            };
            if date >= self.start_date {
                if !self.more_dates(date, dates) {
                    break;
                }
                dates.push(date);
            }
            match month.checked_add_months(Months::new(12)) {
                Some(next) => month = next,
                None => return,
            }
        }
    }

    fn yearly_absolute_dates(&self, dates: &mut Vec<NaiveDate>) {
        let required = self.day_number.unwrap_or(1) as u32;
        let Some(mut month) = self.start_month() else {
            return;
        };

        while self.more_dates(month, dates) {
            let Some(mut date) = clamped_day(month, required) else {
                return;
            };
            if date < self.start_date {
                match date.checked_add_months(Months::new(12)) {
                    Some(next) => date = next,
                    None => return,
                }
            }
            if !self.more_dates(date, dates) {
                break;
            }
            dates.push(date);
            match first_of_month(date).checked_add_months(Months::new(12)) {
                Some(next) => month = next,
                None => return,
            }
        }
    }

    fn start_month(&self) -> Option<NaiveDate> {
        let month = u32::try_from(self.month_number?).ok()?;
        NaiveDate::from_ymd_opt(self.start_date.year(), month, 1)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn days_in_month(month: NaiveDate) -> u32 {
    month
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

fn clamped_day(month: NaiveDate, day: u32) -> Option<NaiveDate> {
    month.with_day(day.min(days_in_month(month)))
}

/// The `n`th `weekday` of the month starting at `month`; `n > 4` means the last one.
fn relative_day(month: NaiveDate, weekday: Weekday, n: i32) -> Option<NaiveDate> {
    if n > 4 {
        let last = month.with_day(days_in_month(month))?;
        let back = (7 + last.weekday().num_days_from_sunday() - weekday.num_days_from_sunday()) % 7;
        return last.checked_sub_days(Days::new(back as u64));
    }
    let forward = (7 + weekday.num_days_from_sunday() - month.weekday().num_days_from_sunday()) % 7;
    let weeks = if n > 1 { 7 * (n as u64 - 1) } else { 0 };
    month.checked_add_days(Days::new(forward as u64 + weeks))
}
