use crate::config::TimeDefaults;
use crate::duration::Duration;
use crate::error::{EntityKind, ModelError, ModelResult};
use crate::index::IdentityIndex;
use crate::project::ProjectFile;
use crate::raw::RawRecord;
use crate::resource::ResourceRef;
use crate::task::TaskRef;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

/// A resource working on a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub unique_id: i32,
    pub task_unique_id: i32,
    pub resource_unique_id: i32,
    /// Assignment units as a percentage of the resource.
    pub units: Option<f64>,
    pub work: Option<Duration>,
    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
}

impl Assignment {
    pub(crate) fn from_raw(record: &RawRecord, defaults: &TimeDefaults) -> ModelResult<Self> {
        let kind = EntityKind::Assignment;
        let required = |field: &str| -> ModelResult<i32> {
            record
                .integer(kind, field)?
                .ok_or_else(|| ModelError::invalid_field(kind, field, "missing foreign key"))
        };
        Ok(Self {
            unique_id: record.unique_id(kind)?,
            task_unique_id: required("task_unique_id")?,
            resource_unique_id: required("resource_unique_id")?,
            units: record.float(kind, "units")?,
            work: record.duration(kind, "work", defaults)?,
            start: record.timestamp(kind, "start")?,
            finish: record.timestamp(kind, "finish")?,
        })
    }
}

/// Resolved foreign keys of every assignment plus the per-task and
/// per-resource views. Both views hold assignment slots, so they always read
/// the same underlying record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentLinks {
    pub task_slots: Vec<usize>,
    pub resource_slots: Vec<usize>,
    pub by_task: Vec<Vec<usize>>,
    pub by_resource: Vec<Vec<usize>>,
}

pub fn link_assignments(
    assignments: &[Assignment],
    task_index: &IdentityIndex,
    resource_index: &IdentityIndex,
    task_count: usize,
    resource_count: usize,
) -> ModelResult<AssignmentLinks> {
    let mut links = AssignmentLinks {
        task_slots: Vec::with_capacity(assignments.len()),
        resource_slots: Vec::with_capacity(assignments.len()),
        by_task: vec![Vec::new(); task_count],
        by_resource: vec![Vec::new(); resource_count],
    };

    for (slot, assignment) in assignments.iter().enumerate() {
        let task = task_index.resolve(
            EntityKind::Assignment,
            assignment.unique_id,
            "task_unique_id",
            assignment.task_unique_id,
        )?;
        let resource = resource_index.resolve(
            EntityKind::Assignment,
            assignment.unique_id,
            "resource_unique_id",
            assignment.resource_unique_id,
        )?;
        links.task_slots.push(task);
        links.resource_slots.push(resource);
        links.by_task[task].push(slot);
        links.by_resource[resource].push(slot);
    }

    Ok(links)
}

#[derive(Clone, Copy)]
pub struct AssignmentRef<'p> {
    project: &'p ProjectFile,
    slot: usize,
}

impl<'p> AssignmentRef<'p> {
    pub(crate) fn new(project: &'p ProjectFile, slot: usize) -> Self {
        Self { project, slot }
    }

    pub fn assignment(&self) -> &'p Assignment {
        &self.project.assignments[self.slot]
    }

    pub fn task(&self) -> TaskRef<'p> {
        TaskRef::new(self.project, self.project.assignment_links.task_slots[self.slot])
    }

    pub fn resource(&self) -> ResourceRef<'p> {
        ResourceRef::new(
            self.project,
            self.project.assignment_links.resource_slots[self.slot],
        )
    }
}

impl Deref for AssignmentRef<'_> {
    type Target = Assignment;

    fn deref(&self) -> &Assignment {
        &self.project.assignments[self.slot]
    }
}

impl PartialEq for AssignmentRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.project, other.project) && self.slot == other.slot
    }
}

impl fmt::Debug for AssignmentRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssignmentRef")
            .field("unique_id", &self.unique_id)
            .field("task_unique_id", &self.task_unique_id)
            .field("resource_unique_id", &self.resource_unique_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(uid: i32, task: i32, resource: i32) -> Assignment {
        Assignment {
            unique_id: uid,
            task_unique_id: task,
            resource_unique_id: resource,
            units: None,
            work: None,
            start: None,
            finish: None,
        }
    }

    fn index(kind: EntityKind, uids: &[i32]) -> IdentityIndex {
        let mut index = IdentityIndex::new(kind);
        for (slot, uid) in uids.iter().enumerate() {
            index.register(*uid, None, slot).unwrap();
        }
        index
    }

    #[test]
    fn both_views_keep_document_order() {
        let tasks = index(EntityKind::Task, &[10, 11]);
        let resources = index(EntityKind::Resource, &[1, 2]);
        let assignments = [
            assignment(100, 11, 1),
            assignment(101, 10, 1),
            assignment(102, 11, 2),
        ];
        let links = link_assignments(&assignments, &tasks, &resources, 2, 2).unwrap();
        assert_eq!(links.by_task[1], vec![0, 2]);
        assert_eq!(links.by_task[0], vec![1]);
        assert_eq!(links.by_resource[0], vec![0, 1]);
        assert_eq!(links.by_resource[1], vec![2]);
    }

    #[test]
    fn missing_resource_is_dangling() {
        let tasks = index(EntityKind::Task, &[10]);
        let resources = index(EntityKind::Resource, &[1]);
        let err = link_assignments(&[assignment(100, 10, 9)], &tasks, &resources, 1, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::DanglingReference {
                field: "resource_unique_id",
                target_unique_id: 9,
                ..
            }
        ));
    }
}
