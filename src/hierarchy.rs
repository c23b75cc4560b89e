use crate::error::{ModelError, ModelResult};
use crate::index::IdentityIndex;

/// Parent/child links over one arena, expressed as slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub parents: Vec<Option<usize>>,
    pub children: Vec<Vec<usize>>,
    pub roots: Vec<usize>,
}

/// Resolves `(unique_id, parent_unique_id)` pairs, given in document order,
/// into a forest. Child and root lists keep document order.
pub fn build_hierarchy(
    index: &IdentityIndex,
    field: &'static str,
    links: &[(i32, Option<i32>)],
) -> ModelResult<Hierarchy> {
    let kind = index.kind();
    let count = links.len();
    let mut parents = Vec::with_capacity(count);
    let mut children = vec![Vec::new(); count];
    let mut roots = Vec::new();

    for (slot, &(unique_id, parent_unique_id)) in links.iter().enumerate() {
        match parent_unique_id {
            Some(parent_uid) => {
                let parent = index.resolve(kind, unique_id, field, parent_uid)?;
                parents.push(Some(parent));
                children[parent].push(slot);
            }
            None => {
                parents.push(None);
                roots.push(slot);
            }
        }
    }

    // Every chain must reach a root within `count` steps. Slots proven to
    // terminate are remembered so each one is walked at most once.
    let mut terminates = vec![false; count];
    for start in 0..count {
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(slot) = current {
            if terminates[slot] {
                break;
            }
            if path.len() > count {
                return Err(ModelError::CyclicHierarchy {
                    kind,
                    unique_id: links[start].0,
                });
            }
            path.push(slot);
            current = parents[slot];
        }
        for slot in path {
            terminates[slot] = true;
        }
    }

    Ok(Hierarchy {
        parents,
        children,
        roots,
    })
}
