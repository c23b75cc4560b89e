use chrono::NaiveDate;
use project_model::{
    EntityKind, ModelConfig, ModelError, ProjectFile, RawProject, TimeUnit,
};
use serde_json::{Value, json};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn build(value: Value) -> Result<ProjectFile, ModelError> {
    let raw: RawProject = serde_json::from_value(value).unwrap();
    ProjectFile::build(raw, &ModelConfig::default())
}

fn sample() -> Value {
    json!({
        "property_values": {
            "project_title": "Warehouse fit-out",
            "author": "Planning",
            "start_date": "2024-03-04T08:00:00.0",
            "default_calendar_unique_id": 1
        },
        "calendars": [{
            "unique_id": 1,
            "name": "Standard",
            "monday": {"type": "working", "hours": [{"from": "08:00", "to": "12:00"}, {"from": "13:00", "to": "17:00"}]},
            "tuesday": {"type": "working", "hours": [{"from": "08:00", "to": "12:00"}, {"from": "13:00", "to": "17:00"}]},
            "wednesday": {"type": "working", "hours": [{"from": "08:00", "to": "12:00"}, {"from": "13:00", "to": "17:00"}]},
            "thursday": {"type": "working", "hours": [{"from": "08:00", "to": "12:00"}, {"from": "13:00", "to": "17:00"}]},
            "friday": {"type": "working", "hours": [{"from": "08:00", "to": "12:00"}, {"from": "13:00", "to": "17:00"}]},
            "saturday": {"type": "non_working"},
            "sunday": {"type": "non_working"}
        }],
        "resources": [
            {"unique_id": 1, "id": 1, "name": "Electrician", "max_units": 100.0},
            {"unique_id": 2, "id": 2, "name": "Crane"}
        ],
        "tasks": [
            {"unique_id": 10, "id": 0, "name": "Fit-out", "outline_level": 0},
            {"unique_id": 11, "id": 1, "name": "Wiring", "parent_task_unique_id": 10,
             "duration": 86400, "duration_units": "d",
             "start": "2024-03-04T08:00:00.0", "finish": "2024-03-08T17:00:00.0"},
            {"unique_id": 12, "id": 2, "name": "Racking", "parent_task_unique_id": 10,
             "predecessors": [{"predecessor_task_unique_id": 11, "type": "FS", "lag": 0}]},
            {"unique_id": 13, "id": 3, "name": "Anchor bolts", "parent_task_unique_id": 12}
        ],
        "assignments": [
            {"unique_id": 100, "task_unique_id": 11, "resource_unique_id": 1, "units": 100.0},
            {"unique_id": 101, "task_unique_id": 13, "resource_unique_id": 2}
        ]
    })
}

#[test]
fn end_to_end_parent_and_assignment_navigation() {
    let project = build(sample()).unwrap();

    let anchor = project.task_by_id(3).unwrap();
    assert_eq!(anchor.parent_task().unwrap().id, Some(2));

    let wiring = project.task_by_id(1).unwrap();
    let assignments = wiring.assignments();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].resource_unique_id, 1);
    assert_eq!(assignments[0].resource().name.as_deref(), Some("Electrician"));
    assert_eq!(assignments[0].task(), wiring);
}

#[test]
fn unique_id_lookups_round_trip() {
    let project = build(sample()).unwrap();
    for task in project.all_tasks() {
        assert_eq!(project.task_by_unique_id(task.unique_id), Some(task));
    }
    for resource in project.all_resources() {
        assert_eq!(project.resource_by_unique_id(resource.unique_id), Some(resource));
    }
    for calendar in project.all_calendars() {
        assert_eq!(project.calendar_by_unique_id(calendar.unique_id), Some(calendar));
    }
    for assignment in project.all_assignments() {
        assert_eq!(
            project.assignment_by_unique_id(assignment.unique_id),
            Some(assignment)
        );
    }
    assert!(project.task_by_unique_id(999).is_none());
}

#[test]
fn hierarchy_is_symmetric() {
    let project = build(sample()).unwrap();
    for task in project.all_tasks() {
        if let Some(parent) = task.parent_task() {
            let occurrences = parent
                .child_tasks()
                .into_iter()
                .filter(|child| *child == task)
                .count();
            assert_eq!(occurrences, 1);
        }
        for child in task.child_tasks() {
            assert_eq!(child.parent_task(), Some(task));
        }
    }
    let roots: Vec<i32> = project.child_tasks().iter().map(|t| t.unique_id).collect();
    assert_eq!(roots, vec![10]);
}

#[test]
fn both_assignment_views_share_one_record() {
    let project = build(sample()).unwrap();
    let crane = project.resource_by_unique_id(2).unwrap();
    let from_resource = crane.assignments()[0];
    let from_task = project.task_by_unique_id(13).unwrap().assignments()[0];
    assert_eq!(from_resource, from_task);
    assert!(std::ptr::eq(from_resource.assignment(), from_task.assignment()));
}

#[test]
fn parsed_fields_and_durations() {
    let project = build(sample()).unwrap();
    let wiring = project.task_by_unique_id(11).unwrap();
    let duration = wiring.duration.unwrap();
    assert_eq!(duration.units, TimeUnit::Days);
    assert!((duration.value - 3.0).abs() < 1e-9);
    assert_eq!(
        wiring.start.unwrap().date(),
        d(2024, 3, 4)
    );
    assert_eq!(project.properties().project_title.as_deref(), Some("Warehouse fit-out"));
}

#[test]
fn effective_calendar_falls_back_to_default() {
    let project = build(sample()).unwrap();
    let standard = project.default_calendar().unwrap();
    assert_eq!(standard.name.as_deref(), Some("Standard"));
    let wiring = project.task_by_unique_id(11).unwrap();
    assert!(wiring.calendar().is_none());
    assert_eq!(wiring.effective_calendar(), Some(standard));
    assert_eq!(project.calendar_by_name("Standard"), Some(standard));
    assert!(project.calendar_by_name("Night shift").is_none());
}

#[test]
fn missing_default_calendar_is_absent_not_an_error() {
    let mut raw = sample();
    raw["property_values"]["default_calendar_unique_id"] = json!(42);
    let project = build(raw).unwrap();
    assert!(project.default_calendar().is_none());
}

#[test]
fn forward_references_resolve_in_second_pass() {
    let project = build(json!({
        "tasks": [
            {"unique_id": 3, "parent_task_unique_id": 1,
             "predecessors": [{"predecessor_task_unique_id": 2}]},
            {"unique_id": 2, "parent_task_unique_id": 1, "calendar_unique_id": 7},
            {"unique_id": 1}
        ],
        "calendars": [
            {"unique_id": 8, "parent_unique_id": 7},
            {"unique_id": 7, "name": "Base"}
        ]
    }))
    .unwrap();
    let summary = project.task_by_unique_id(1).unwrap();
    let children: Vec<i32> = summary.child_tasks().iter().map(|t| t.unique_id).collect();
    assert_eq!(children, vec![3, 2]);
    let second = project.task_by_unique_id(2).unwrap();
    assert_eq!(second.calendar().unwrap().unique_id, 7);
    assert_eq!(
        project.calendar_by_unique_id(8).unwrap().parent().unwrap().unique_id,
        7
    );
}

#[test]
fn display_id_lookup_returns_last_registered() {
    let project = build(json!({
        "tasks": [
            {"unique_id": 1, "id": 5, "name": "first"},
            {"unique_id": 2, "id": 5, "name": "second"}
        ]
    }))
    .unwrap();
    assert_eq!(project.task_by_id(5).unwrap().name.as_deref(), Some("second"));
}

#[test]
fn duplicate_unique_id_fails_build() {
    let err = build(json!({"resources": [{"unique_id": 4}, {"unique_id": 4}]})).unwrap_err();
    assert!(matches!(
        err,
        ModelError::DuplicateUniqueId {
            kind: EntityKind::Resource,
            unique_id: 4
        }
    ));
}

#[test]
fn same_unique_id_across_kinds_is_allowed() {
    let project = build(json!({
        "tasks": [{"unique_id": 1}],
        "resources": [{"unique_id": 1}],
        "calendars": [{"unique_id": 1}]
    }))
    .unwrap();
    assert!(project.task_by_unique_id(1).is_some());
    assert!(project.resource_by_unique_id(1).is_some());
}

#[test]
fn dangling_references_fail_build() {
    let err = build(json!({"tasks": [{"unique_id": 1, "parent_task_unique_id": 9}]})).unwrap_err();
    assert!(matches!(
        err,
        ModelError::DanglingReference {
            kind: EntityKind::Task,
            field: "parent_task_unique_id",
            target_unique_id: 9,
            ..
        }
    ));

    let err = build(json!({
        "tasks": [{"unique_id": 1}],
        "assignments": [{"unique_id": 5, "task_unique_id": 2, "resource_unique_id": 1}],
        "resources": [{"unique_id": 1}]
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        ModelError::DanglingReference {
            kind: EntityKind::Assignment,
            field: "task_unique_id",
            ..
        }
    ));

    let err = build(json!({"resources": [{"unique_id": 1, "calendar_unique_id": 3}]})).unwrap_err();
    assert!(matches!(
        err,
        ModelError::DanglingReference {
            target_kind: EntityKind::Calendar,
            target_unique_id: 3,
            ..
        }
    ));
}

#[test]
fn cyclic_parents_fail_build() {
    let err = build(json!({
        "tasks": [
            {"unique_id": 1, "parent_task_unique_id": 2},
            {"unique_id": 2, "parent_task_unique_id": 1}
        ]
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        ModelError::CyclicHierarchy {
            kind: EntityKind::Task,
            ..
        }
    ));

    let err = build(json!({"calendars": [{"unique_id": 1, "parent_unique_id": 1}]})).unwrap_err();
    assert!(matches!(
        err,
        ModelError::CyclicHierarchy {
            kind: EntityKind::Calendar,
            unique_id: 1
        }
    ));
}

#[test]
fn wrongly_typed_field_is_invalid() {
    let err = build(json!({"tasks": [{"unique_id": 1, "percent_complete": "half"}]})).unwrap_err();
    assert!(matches!(err, ModelError::InvalidField { kind: EntityKind::Task, .. }));

    let err = build(json!({"tasks": [{"name": "no id"}]})).unwrap_err();
    assert!(matches!(err, ModelError::InvalidField { .. }));
}

#[test]
fn baseline_text_overrides_formatted_duration() {
    let project = build(json!({
        "tasks": [
            {"unique_id": 1, "baseline_duration": 57600, "baseline_duration_units": "d"},
            {"unique_id": 2, "baseline_duration": 57600, "baseline_duration_text": "2 days?"}
        ]
    }))
    .unwrap();
    assert_eq!(
        project.task_by_unique_id(1).unwrap().baseline_duration_display().as_deref(),
        Some("2.0d")
    );
    assert_eq!(
        project.task_by_unique_id(2).unwrap().baseline_duration_display().as_deref(),
        Some("2 days?")
    );
}

#[test]
fn properties_drive_duration_conversion() {
    let raw: RawProject = serde_json::from_value(json!({
        "property_values": {"minutes_per_day": 420},
        "tasks": [{"unique_id": 1, "duration": 50400, "duration_units": "d"}]
    }))
    .unwrap();
    let project = ProjectFile::build(raw, &ModelConfig::default()).unwrap();
    let duration = project.task_by_unique_id(1).unwrap().duration.unwrap();
    assert!((duration.value - 2.0).abs() < 1e-9);
    assert_eq!(project.time_defaults().minutes_per_day, 420);
}

#[test]
fn non_positive_config_is_rejected_at_build() {
    let config = ModelConfig {
        minutes_per_day: 0,
        ..ModelConfig::default()
    };
    let raw: RawProject = serde_json::from_value(sample()).unwrap();
    let err = ProjectFile::build(raw, &config).unwrap_err();
    assert!(matches!(err, ModelError::UnsupportedInput(_)));
}
