use crate::error::{EntityKind, ModelError, ModelResult};
use std::collections::HashMap;

/// Maps display ids and unique ids of one entity kind to arena slots.
///
/// Unique ids are a primary key and must not repeat. Display ids may repeat;
/// lookups by display id return the most recently registered slot.
#[derive(Debug, Clone)]
pub struct IdentityIndex {
    kind: EntityKind,
    by_unique_id: HashMap<i32, usize>,
    by_id: HashMap<i32, usize>,
}

impl IdentityIndex {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            by_unique_id: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn register(&mut self, unique_id: i32, id: Option<i32>, slot: usize) -> ModelResult<()> {
        if self.by_unique_id.contains_key(&unique_id) {
            return Err(ModelError::DuplicateUniqueId {
                kind: self.kind,
                unique_id,
            });
        }
        self.by_unique_id.insert(unique_id, slot);
        if let Some(id) = id {
            self.by_id.insert(id, slot);
        }
        Ok(())
    }

    pub fn by_id(&self, id: i32) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn by_unique_id(&self, unique_id: i32) -> Option<usize> {
        self.by_unique_id.get(&unique_id).copied()
    }

    /// Looks up `target` on behalf of `owner`, reporting a dangling reference
    /// against the owner's field when it is absent.
    pub fn resolve(
        &self,
        owner_kind: EntityKind,
        owner_unique_id: i32,
        field: &'static str,
        target: i32,
    ) -> ModelResult<usize> {
        self.by_unique_id(target)
            .ok_or(ModelError::DanglingReference {
                kind: owner_kind,
                unique_id: owner_unique_id,
                field,
                target_kind: self.kind,
                target_unique_id: target,
            })
    }

    pub fn len(&self) -> usize {
        self.by_unique_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_unique_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_unique_id_is_rejected() {
        let mut index = IdentityIndex::new(EntityKind::Task);
        index.register(10, Some(1), 0).unwrap();
        let err = index.register(10, Some(2), 1).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DuplicateUniqueId {
                kind: EntityKind::Task,
                unique_id: 10
            }
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn repeated_display_id_resolves_to_last_registered() {
        let mut index = IdentityIndex::new(EntityKind::Resource);
        index.register(1, Some(5), 0).unwrap();
        index.register(2, Some(5), 1).unwrap();
        assert_eq!(index.by_id(5), Some(1));
        assert_eq!(index.by_unique_id(1), Some(0));
    }

    #[test]
    fn resolve_reports_owner_and_target() {
        let index = IdentityIndex::new(EntityKind::Calendar);
        let err = index
            .resolve(EntityKind::Resource, 4, "calendar_unique_id", 99)
            .unwrap_err();
        match err {
            ModelError::DanglingReference {
                kind,
                unique_id,
                target_kind,
                target_unique_id,
                ..
            } => {
                assert_eq!(kind, EntityKind::Resource);
                assert_eq!(unique_id, 4);
                assert_eq!(target_kind, EntityKind::Calendar);
                assert_eq!(target_unique_id, 99);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
