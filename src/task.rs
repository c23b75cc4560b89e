use crate::assignment::AssignmentRef;
use crate::calendar::CalendarRef;
use crate::config::TimeDefaults;
use crate::duration::Duration;
use crate::error::{EntityKind, ModelResult};
use crate::project::ProjectFile;
use crate::raw::RawRecord;
use crate::relation::{Relation, RelationEdge};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: Option<i32>,
    pub unique_id: i32,
    pub name: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
    pub duration: Option<Duration>,
    pub percent_complete: Option<f64>,
    pub outline_level: Option<i32>,
    pub outline_number: Option<String>,
    pub recurring: bool,
    pub milestone: bool,
    pub baseline_duration: Option<Duration>,
    pub baseline_duration_text: Option<String>,
    pub notes: Option<String>,
    pub calendar_unique_id: Option<i32>,
    pub parent_task_unique_id: Option<i32>,
}

impl Task {
    pub(crate) fn from_raw(record: &RawRecord, defaults: &TimeDefaults) -> ModelResult<Self> {
        let kind = EntityKind::Task;
        Ok(Self {
            id: record.integer(kind, "id")?,
            unique_id: record.unique_id(kind)?,
            name: record.string(kind, "name")?,
            start: record.timestamp(kind, "start")?,
            finish: record.timestamp(kind, "finish")?,
            duration: record.duration(kind, "duration", defaults)?,
            percent_complete: record.float(kind, "percent_complete")?,
            outline_level: record.integer(kind, "outline_level")?,
            outline_number: record.string(kind, "outline_number")?,
            recurring: record.boolean(kind, "recurring")?,
            milestone: record.boolean(kind, "milestone")?,
            baseline_duration: record.duration(kind, "baseline_duration", defaults)?,
            baseline_duration_text: record.string(kind, "baseline_duration_text")?,
            notes: record.string(kind, "notes")?,
            calendar_unique_id: record.integer(kind, "calendar_unique_id")?,
            parent_task_unique_id: record.integer(kind, "parent_task_unique_id")?,
        })
    }

    /// The textual baseline override when present, otherwise the formatted
    /// baseline duration.
    pub fn baseline_duration_display(&self) -> Option<String> {
        self.baseline_duration_text
            .clone()
            .or_else(|| self.baseline_duration.map(|d| d.to_string()))
    }
}

/// A task inside a built [`ProjectFile`], able to follow its links.
#[derive(Clone, Copy)]
pub struct TaskRef<'p> {
    project: &'p ProjectFile,
    slot: usize,
}

impl<'p> TaskRef<'p> {
    pub(crate) fn new(project: &'p ProjectFile, slot: usize) -> Self {
        Self { project, slot }
    }

    pub fn task(&self) -> &'p Task {
        &self.project.tasks[self.slot]
    }

    pub fn parent_task(&self) -> Option<TaskRef<'p>> {
        self.project.task_tree.parents[self.slot].map(|slot| TaskRef::new(self.project, slot))
    }

    pub fn child_tasks(&self) -> Vec<TaskRef<'p>> {
        self.project.task_tree.children[self.slot]
            .iter()
            .map(|&slot| TaskRef::new(self.project, slot))
            .collect()
    }

    pub fn predecessors(&self) -> Vec<Relation<'p>> {
        self.project
            .relations
            .predecessors(self.slot)
            .into_iter()
            .map(|(other, edge)| self.relation_to(other, edge))
            .collect()
    }

    pub fn successors(&self) -> Vec<Relation<'p>> {
        self.project
            .relations
            .successors(self.slot)
            .into_iter()
            .map(|(other, edge)| self.relation_to(other, edge))
            .collect()
    }

    pub fn assignments(&self) -> Vec<AssignmentRef<'p>> {
        self.project.assignment_links.by_task[self.slot]
            .iter()
            .map(|&slot| AssignmentRef::new(self.project, slot))
            .collect()
    }

    pub fn calendar(&self) -> Option<CalendarRef<'p>> {
        self.project.task_calendars[self.slot].map(|slot| CalendarRef::new(self.project, slot))
    }

    /// The task's own calendar, falling back to the project default.
    pub fn effective_calendar(&self) -> Option<CalendarRef<'p>> {
        self.calendar().or_else(|| self.project.default_calendar())
    }

    fn relation_to(&self, other: usize, edge: RelationEdge) -> Relation<'p> {
        Relation {
            task: *self,
            target: TaskRef::new(self.project, other),
            relation_type: edge.relation_type,
            lag: edge.lag,
        }
    }
}

impl Deref for TaskRef<'_> {
    type Target = Task;

    fn deref(&self) -> &Task {
        &self.project.tasks[self.slot]
    }
}

impl PartialEq for TaskRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.project, other.project) && self.slot == other.slot
    }
}

impl fmt::Debug for TaskRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRef")
            .field("unique_id", &self.unique_id)
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
