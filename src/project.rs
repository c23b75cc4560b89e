//! The project aggregate and its two-pass build.

use crate::assignment::{Assignment, AssignmentLinks, AssignmentRef, link_assignments};
use crate::calendar::{Calendar, CalendarRef, ResolutionCache, WorkTime, resolve};
use crate::config::{ModelConfig, TimeDefaults};
use crate::error::{EntityKind, ModelResult};
use crate::hierarchy::{Hierarchy, build_hierarchy};
use crate::index::IdentityIndex;
use crate::properties::ProjectProperties;
use crate::raw::RawProject;
use crate::relation::{LinkSide, RawLink, RelationGraph, parse_links};
use crate::resource::{Resource, ResourceRef};
use crate::task::{Task, TaskRef};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// A fully linked, read-only project.
///
/// Entities live in flat arenas in document order; every link between them is
/// resolved once during [`ProjectFile::build`]. Navigation goes through the
/// `*Ref` handles, which borrow the project.
#[derive(Debug)]
pub struct ProjectFile {
    config: ModelConfig,
    properties: ProjectProperties,
    time_defaults: TimeDefaults,

    pub(crate) tasks: Vec<Task>,
    pub(crate) resources: Vec<Resource>,
    pub(crate) calendars: Vec<Calendar>,
    pub(crate) assignments: Vec<Assignment>,

    task_index: IdentityIndex,
    resource_index: IdentityIndex,
    calendar_index: IdentityIndex,
    assignment_index: IdentityIndex,

    pub(crate) task_tree: Hierarchy,
    pub(crate) calendar_tree: Hierarchy,
    pub(crate) relations: RelationGraph,
    pub(crate) assignment_links: AssignmentLinks,
    pub(crate) task_calendars: Vec<Option<usize>>,
    pub(crate) resource_calendars: Vec<Option<usize>>,
    default_calendar: Option<usize>,

    cache: ResolutionCache,
}

impl ProjectFile {
    /// Builds the model from raw records. Either every reference resolves
    /// and the complete model is returned, or the first failure is.
    pub fn build(raw: RawProject, config: &ModelConfig) -> ModelResult<Self> {
        config.validate()?;
        let properties = ProjectProperties::from_raw(&raw.properties)?;
        let time_defaults = properties.time_defaults(config);

        debug!(
            calendars = raw.calendars.len(),
            resources = raw.resources.len(),
            tasks = raw.tasks.len(),
            assignments = raw.assignments.len(),
            "registering entities"
        );

        let mut calendar_index = IdentityIndex::new(EntityKind::Calendar);
        let mut calendars = Vec::with_capacity(raw.calendars.len());
        for (slot, record) in raw.calendars.iter().enumerate() {
            let calendar = Calendar::from_raw(record)?;
            calendar_index.register(calendar.unique_id, None, slot)?;
            calendars.push(calendar);
        }

        let mut resource_index = IdentityIndex::new(EntityKind::Resource);
        let mut resources = Vec::with_capacity(raw.resources.len());
        for (slot, record) in raw.resources.iter().enumerate() {
            let resource = Resource::from_raw(record)?;
            resource_index.register(resource.unique_id, resource.id, slot)?;
            resources.push(resource);
        }

        let mut task_index = IdentityIndex::new(EntityKind::Task);
        let mut tasks = Vec::with_capacity(raw.tasks.len());
        let mut task_links: Vec<Vec<RawLink>> = Vec::with_capacity(raw.tasks.len());
        for (slot, record) in raw.tasks.iter().enumerate() {
            let task = Task::from_raw(record, &time_defaults)?;
            task_index.register(task.unique_id, task.id, slot)?;
            task_links.push(parse_links(record, &time_defaults)?);
            tasks.push(task);
        }

        let mut assignment_index = IdentityIndex::new(EntityKind::Assignment);
        let mut assignments = Vec::with_capacity(raw.assignments.len());
        for (slot, record) in raw.assignments.iter().enumerate() {
            let assignment = Assignment::from_raw(record, &time_defaults)?;
            assignment_index.register(assignment.unique_id, None, slot)?;
            assignments.push(assignment);
        }

        debug!("resolving references");

        let calendar_parents: Vec<_> = calendars
            .iter()
            .map(|calendar| (calendar.unique_id, calendar.parent_unique_id))
            .collect();
        let calendar_tree = build_hierarchy(&calendar_index, "parent_unique_id", &calendar_parents)?;

        let resource_calendars = resources
            .iter()
            .map(|resource| {
                resource
                    .calendar_unique_id
                    .map(|uid| {
                        calendar_index.resolve(
                            EntityKind::Resource,
                            resource.unique_id,
                            "calendar_unique_id",
                            uid,
                        )
                    })
                    .transpose()
            })
            .collect::<ModelResult<Vec<_>>>()?;

        let task_calendars = tasks
            .iter()
            .map(|task| {
                task.calendar_unique_id
                    .map(|uid| {
                        calendar_index.resolve(
                            EntityKind::Task,
                            task.unique_id,
                            "calendar_unique_id",
                            uid,
                        )
                    })
                    .transpose()
            })
            .collect::<ModelResult<Vec<_>>>()?;

        let task_parents: Vec<_> = tasks
            .iter()
            .map(|task| (task.unique_id, task.parent_task_unique_id))
            .collect();
        let task_tree = build_hierarchy(&task_index, "parent_task_unique_id", &task_parents)?;

        let mut relations = RelationGraph::with_tasks(tasks.len());
        for (slot, links) in task_links.into_iter().enumerate() {
            for link in links {
                let other = task_index.resolve(
                    EntityKind::Task,
                    tasks[slot].unique_id,
                    link.side.field(),
                    link.target_unique_id,
                )?;
                match link.side {
                    LinkSide::Predecessor => {
                        relations.link(other, slot, link.edge, &time_defaults)
                    }
                    LinkSide::Successor => relations.link(slot, other, link.edge, &time_defaults),
                };
            }
        }

        let assignment_links = link_assignments(
            &assignments,
            &task_index,
            &resource_index,
            tasks.len(),
            resources.len(),
        )?;

        let default_calendar = properties.default_calendar_unique_id.and_then(|uid| {
            let slot = calendar_index.by_unique_id(uid);
            if slot.is_none() {
                warn!(
                    calendar = uid,
                    "default calendar is not among the project's calendars"
                );
            }
            slot
        });

        info!(
            tasks = tasks.len(),
            resources = resources.len(),
            calendars = calendars.len(),
            assignments = assignments.len(),
            relations = relations.edge_count(),
            "project model built"
        );

        Ok(Self {
            config: config.clone(),
            properties,
            time_defaults,
            tasks,
            resources,
            calendars,
            assignments,
            task_index,
            resource_index,
            calendar_index,
            assignment_index,
            task_tree,
            calendar_tree,
            relations,
            assignment_links,
            task_calendars,
            resource_calendars,
            default_calendar,
            cache: ResolutionCache::new(config.cache_resolutions),
        })
    }

    pub fn properties(&self) -> &ProjectProperties {
        &self.properties
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Conversion factors in effect: project properties over the config.
    pub fn time_defaults(&self) -> TimeDefaults {
        self.time_defaults
    }

    pub fn all_tasks(&self) -> Vec<TaskRef<'_>> {
        (0..self.tasks.len())
            .map(|slot| TaskRef::new(self, slot))
            .collect()
    }

    pub fn all_resources(&self) -> Vec<ResourceRef<'_>> {
        (0..self.resources.len())
            .map(|slot| ResourceRef::new(self, slot))
            .collect()
    }

    pub fn all_calendars(&self) -> Vec<CalendarRef<'_>> {
        (0..self.calendars.len())
            .map(|slot| CalendarRef::new(self, slot))
            .collect()
    }

    pub fn all_assignments(&self) -> Vec<AssignmentRef<'_>> {
        (0..self.assignments.len())
            .map(|slot| AssignmentRef::new(self, slot))
            .collect()
    }

    /// Top-level tasks in document order.
    pub fn child_tasks(&self) -> Vec<TaskRef<'_>> {
        self.task_tree
            .roots
            .iter()
            .map(|&slot| TaskRef::new(self, slot))
            .collect()
    }

    /// The last task registered with display id `id`.
    pub fn task_by_id(&self, id: i32) -> Option<TaskRef<'_>> {
        self.task_index.by_id(id).map(|slot| TaskRef::new(self, slot))
    }

    pub fn task_by_unique_id(&self, unique_id: i32) -> Option<TaskRef<'_>> {
        self.task_index
            .by_unique_id(unique_id)
            .map(|slot| TaskRef::new(self, slot))
    }

    pub fn resource_by_id(&self, id: i32) -> Option<ResourceRef<'_>> {
        self.resource_index
            .by_id(id)
            .map(|slot| ResourceRef::new(self, slot))
    }

    pub fn resource_by_unique_id(&self, unique_id: i32) -> Option<ResourceRef<'_>> {
        self.resource_index
            .by_unique_id(unique_id)
            .map(|slot| ResourceRef::new(self, slot))
    }

    pub fn calendar_by_unique_id(&self, unique_id: i32) -> Option<CalendarRef<'_>> {
        self.calendar_index
            .by_unique_id(unique_id)
            .map(|slot| CalendarRef::new(self, slot))
    }

    /// The first calendar, in document order, called `name`.
    pub fn calendar_by_name(&self, name: &str) -> Option<CalendarRef<'_>> {
        self.calendars
            .iter()
            .position(|calendar| calendar.name.as_deref() == Some(name))
            .map(|slot| CalendarRef::new(self, slot))
    }

    pub fn assignment_by_unique_id(&self, unique_id: i32) -> Option<AssignmentRef<'_>> {
        self.assignment_index
            .by_unique_id(unique_id)
            .map(|slot| AssignmentRef::new(self, slot))
    }

    pub fn default_calendar(&self) -> Option<CalendarRef<'_>> {
        self.default_calendar
            .map(|slot| CalendarRef::new(self, slot))
    }

    pub(crate) fn resolve_calendar(&self, slot: usize, date: NaiveDate) -> WorkTime {
        self.cache.get_or_resolve(slot, date, || {
            resolve(&self.calendars, &self.calendar_tree.parents, slot, date)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn project_is_shareable_across_threads() {
        assert_send_sync::<ProjectFile>();
    }

    #[test]
    fn empty_input_builds_empty_model() {
        let project = ProjectFile::build(RawProject::default(), &ModelConfig::default()).unwrap();
        assert!(project.all_tasks().is_empty());
        assert!(project.child_tasks().is_empty());
        assert!(project.default_calendar().is_none());
        assert_eq!(project.time_defaults(), TimeDefaults::default());
    }
}
