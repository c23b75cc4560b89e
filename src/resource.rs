use crate::assignment::AssignmentRef;
use crate::calendar::CalendarRef;
use crate::error::{EntityKind, ModelResult};
use crate::project::ProjectFile;
use crate::raw::RawRecord;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

/// A person, crew, material or piece of equipment that can be assigned to tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    /// Display id. Not guaranteed unique.
    pub id: Option<i32>,
    /// Permanent identifier, unique among resources.
    pub unique_id: i32,
    pub name: Option<String>,
    pub initials: Option<String>,
    pub group: Option<String>,
    pub email_address: Option<String>,
    /// Maximum units available, as a percentage (100 = one full-time unit).
    pub max_units: Option<f64>,
    /// Unique id of the resource's own calendar, if it has one.
    pub calendar_unique_id: Option<i32>,
}

impl Resource {
    pub(crate) fn from_raw(record: &RawRecord) -> ModelResult<Self> {
        let kind = EntityKind::Resource;
        Ok(Self {
            id: record.integer(kind, "id")?,
            unique_id: record.unique_id(kind)?,
            name: record.string(kind, "name")?,
            initials: record.string(kind, "initials")?,
            group: record.string(kind, "group")?,
            email_address: record.string(kind, "email_address")?,
            max_units: record.float(kind, "max_units")?,
            calendar_unique_id: record.integer(kind, "calendar_unique_id")?,
        })
    }
}

#[derive(Clone, Copy)]
pub struct ResourceRef<'p> {
    project: &'p ProjectFile,
    slot: usize,
}

impl<'p> ResourceRef<'p> {
    pub(crate) fn new(project: &'p ProjectFile, slot: usize) -> Self {
        Self { project, slot }
    }

    pub fn resource(&self) -> &'p Resource {
        &self.project.resources[self.slot]
    }

    pub fn calendar(&self) -> Option<CalendarRef<'p>> {
        self.project.resource_calendars[self.slot]
            .map(|slot| CalendarRef::new(self.project, slot))
    }

    pub fn assignments(&self) -> Vec<AssignmentRef<'p>> {
        self.project.assignment_links.by_resource[self.slot]
            .iter()
            .map(|&slot| AssignmentRef::new(self.project, slot))
            .collect()
    }
}

impl Deref for ResourceRef<'_> {
    type Target = Resource;

    fn deref(&self) -> &Resource {
        &self.project.resources[self.slot]
    }
}

impl PartialEq for ResourceRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.project, other.project) && self.slot == other.slot
    }
}

impl fmt::Debug for ResourceRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("unique_id", &self.unique_id)
            .field("name", &self.name)
            .finish()
    }
}
