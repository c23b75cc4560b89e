pub mod assignment;
pub mod calendar;
pub mod config;
pub mod duration;
pub mod error;
pub mod hierarchy;
pub mod index;
pub mod project;
pub mod properties;
pub mod raw;
pub mod reader;
pub mod relation;
pub mod resource;
pub mod task;

pub use assignment::{Assignment, AssignmentRef};
pub use calendar::{
    Calendar, CalendarDay, CalendarException, CalendarHours, CalendarRef, CalendarType,
    CalendarWeek, DayType, MAX_RECURRENCE_DATES, RecurrenceType, RecurringData, WorkTime,
};
pub use config::{ModelConfig, TimeDefaults};
pub use duration::{Duration, TimeUnit};
pub use error::{EntityKind, ModelError, ModelResult};
pub use project::ProjectFile;
pub use properties::ProjectProperties;
pub use raw::{RawProject, RawRecord};
pub use reader::{JsonProjectReader, ProjectReader, read_project};
pub use relation::{Relation, RelationType};
pub use resource::{Resource, ResourceRef};
pub use task::{Task, TaskRef};
