use std::fmt;
use std::io;
use thiserror::Error;

/// Entity families that carry their own unique-id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Task,
    Resource,
    Calendar,
    Assignment,
    Properties,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Resource => "resource",
            EntityKind::Calendar => "calendar",
            EntityKind::Assignment => "assignment",
            EntityKind::Properties => "properties",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate {kind} unique id {unique_id}")]
    DuplicateUniqueId { kind: EntityKind, unique_id: i32 },

    #[error(
        "{kind} {unique_id} field '{field}' references missing {target_kind} {target_unique_id}"
    )]
    DanglingReference {
        kind: EntityKind,
        unique_id: i32,
        field: &'static str,
        target_kind: EntityKind,
        target_unique_id: i32,
    },

    #[error("{kind} {unique_id} has a parent chain that does not terminate")]
    CyclicHierarchy { kind: EntityKind, unique_id: i32 },

    #[error("{kind} {unique_id} has a malformed range: {detail}")]
    MalformedRange {
        kind: EntityKind,
        unique_id: i32,
        detail: String,
    },

    #[error("{kind} field '{field}' is invalid: {detail}")]
    InvalidField {
        kind: EntityKind,
        field: String,
        detail: String,
    },

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ModelError {
    /// True when the engine rejected the source itself rather than the data inside it.
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            ModelError::UnsupportedInput(_) | ModelError::AccessDenied(_)
        )
    }

    pub(crate) fn invalid_field(
        kind: EntityKind,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        ModelError::InvalidField {
            kind,
            field: field.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn malformed_range(
        kind: EntityKind,
        unique_id: i32,
        detail: impl Into<String>,
    ) -> Self {
        ModelError::MalformedRange {
            kind,
            unique_id,
            detail: detail.into(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
