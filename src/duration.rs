use crate::config::TimeDefaults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_HOUR: f64 = 60.0;
const ELAPSED_MINUTES_PER_DAY: f64 = 1440.0;
const ELAPSED_MINUTES_PER_WEEK: f64 = 10_080.0;
const ELAPSED_MINUTES_PER_MONTH: f64 = 43_200.0;
const ELAPSED_MINUTES_PER_YEAR: f64 = 525_600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
    ElapsedMinutes,
    ElapsedHours,
    ElapsedDays,
    ElapsedWeeks,
    ElapsedMonths,
    ElapsedYears,
}

impl TimeUnit {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
            TimeUnit::Weeks => "w",
            TimeUnit::Months => "mo",
            TimeUnit::Years => "y",
            TimeUnit::ElapsedMinutes => "em",
            TimeUnit::ElapsedHours => "eh",
            TimeUnit::ElapsedDays => "ed",
            TimeUnit::ElapsedWeeks => "ew",
            TimeUnit::ElapsedMonths => "emo",
            TimeUnit::ElapsedYears => "ey",
        }
    }

    pub fn is_elapsed(&self) -> bool {
        matches!(
            self,
            TimeUnit::ElapsedMinutes
                | TimeUnit::ElapsedHours
                | TimeUnit::ElapsedDays
                | TimeUnit::ElapsedWeeks
                | TimeUnit::ElapsedMonths
                | TimeUnit::ElapsedYears
        )
    }

    fn minutes_per_unit(&self, defaults: &TimeDefaults) -> f64 {
        match self {
            TimeUnit::Minutes | TimeUnit::ElapsedMinutes => 1.0,
            TimeUnit::Hours | TimeUnit::ElapsedHours => MINUTES_PER_HOUR,
            TimeUnit::Days => f64::from(defaults.minutes_per_day),
            TimeUnit::Weeks => f64::from(defaults.minutes_per_week),
            TimeUnit::Months => {
                f64::from(defaults.minutes_per_day) * f64::from(defaults.days_per_month)
            }
            TimeUnit::Years => f64::from(defaults.minutes_per_year),
            TimeUnit::ElapsedDays => ELAPSED_MINUTES_PER_DAY,
            TimeUnit::ElapsedWeeks => ELAPSED_MINUTES_PER_WEEK,
            TimeUnit::ElapsedMonths => ELAPSED_MINUTES_PER_MONTH,
            TimeUnit::ElapsedYears => ELAPSED_MINUTES_PER_YEAR,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    /// Accepts abbreviations (`d`, `emo`) and names (`days`, `ELAPSED_DAYS`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "m" | "minutes" => TimeUnit::Minutes,
            "h" | "hours" => TimeUnit::Hours,
            "d" | "days" => TimeUnit::Days,
            "w" | "weeks" => TimeUnit::Weeks,
            "mo" | "months" => TimeUnit::Months,
            "y" | "years" => TimeUnit::Years,
            "em" | "elapsed_minutes" => TimeUnit::ElapsedMinutes,
            "eh" | "elapsed_hours" => TimeUnit::ElapsedHours,
            "ed" | "elapsed_days" => TimeUnit::ElapsedDays,
            "ew" | "elapsed_weeks" => TimeUnit::ElapsedWeeks,
            "emo" | "elapsed_months" => TimeUnit::ElapsedMonths,
            "ey" | "elapsed_years" => TimeUnit::ElapsedYears,
            other => return Err(format!("unknown time unit '{other}'")),
        };
        Ok(unit)
    }
}

/// A signed amount of time in a given unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    pub value: f64,
    pub units: TimeUnit,
}

impl Duration {
    pub fn new(value: f64, units: TimeUnit) -> Self {
        Self { value, units }
    }

    pub fn zero() -> Self {
        Self::new(0.0, TimeUnit::Minutes)
    }

    pub fn minutes(value: f64) -> Self {
        Self::new(value, TimeUnit::Minutes)
    }

    /// The engine writes durations as whole seconds.
    pub fn from_seconds(seconds: f64) -> Self {
        Self::minutes(seconds / 60.0)
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    pub fn as_minutes(&self, defaults: &TimeDefaults) -> f64 {
        self.value * self.units.minutes_per_unit(defaults)
    }

    pub fn convert(&self, units: TimeUnit, defaults: &TimeDefaults) -> Duration {
        if units == self.units {
            return *self;
        }
        let minutes = self.as_minutes(defaults);
        Duration::new(minutes / units.minutes_per_unit(defaults), units)
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.fract() == 0.0 {
            write!(f, "{:.1}{}", self.value, self.units)
        } else {
            write!(f, "{}{}", self.value, self.units)
        }
    }
}
