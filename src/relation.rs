use crate::config::TimeDefaults;
use crate::duration::Duration;
use crate::error::{EntityKind, ModelError, ModelResult};
use crate::raw::RawRecord;
use crate::task::TaskRef;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    #[default]
    FinishStart,
    StartStart,
    FinishFinish,
    StartFinish,
}

impl RelationType {
    pub fn code(&self) -> &'static str {
        match self {
            RelationType::FinishStart => "FS",
            RelationType::StartStart => "SS",
            RelationType::FinishFinish => "FF",
            RelationType::StartFinish => "SF",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "fs" | "finish_start" => Ok(RelationType::FinishStart),
            "ss" | "start_start" => Ok(RelationType::StartStart),
            "ff" | "finish_finish" => Ok(RelationType::FinishFinish),
            "sf" | "start_finish" => Ok(RelationType::StartFinish),
            _ => Err(format!("unknown relation type '{s}'")),
        }
    }
}

/// Payload of one predecessor -> successor edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub relation_type: RelationType,
    pub lag: Duration,
}

impl RelationEdge {
    fn same_relation(&self, other: &RelationEdge, defaults: &TimeDefaults) -> bool {
        self.relation_type == other.relation_type
            && (self.lag.as_minutes(defaults) - other.lag.as_minutes(defaults)).abs() < 1e-6
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkSide {
    Predecessor,
    Successor,
}

impl LinkSide {
    pub(crate) fn field(&self) -> &'static str {
        match self {
            LinkSide::Predecessor => "predecessors",
            LinkSide::Successor => "successors",
        }
    }
}

/// A relation as declared on one task's raw record, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawLink {
    pub side: LinkSide,
    pub target_unique_id: i32,
    pub edge: RelationEdge,
}

pub(crate) fn parse_links(
    record: &RawRecord,
    defaults: &TimeDefaults,
) -> ModelResult<Vec<RawLink>> {
    let kind = EntityKind::Task;
    let mut links = Vec::new();
    for side in [LinkSide::Predecessor, LinkSide::Successor] {
        let target_field = match side {
            LinkSide::Predecessor => "predecessor_task_unique_id",
            LinkSide::Successor => "successor_task_unique_id",
        };
        for entry in record.records(kind, side.field())? {
            let target = match entry.integer(kind, target_field)? {
                Some(uid) => uid,
                None => entry.integer(kind, "task_unique_id")?.ok_or_else(|| {
                    ModelError::invalid_field(kind, side.field(), "relation without a target task")
                })?,
            };
            let relation_type = match entry.string(kind, "type")? {
                Some(text) => text
                    .parse()
                    .map_err(|detail: String| ModelError::invalid_field(kind, "type", detail))?,
                None => RelationType::default(),
            };
            let lag = entry.duration(kind, "lag", defaults)?.unwrap_or_default();
            links.push(RawLink {
                side,
                target_unique_id: target,
                edge: RelationEdge { relation_type, lag },
            });
        }
    }
    Ok(links)
}

/// Precedence edges between task slots.
///
/// Each relation is stored once, pointing from predecessor to successor. A
/// task's predecessor list is its incoming edges and its successor list its
/// outgoing edges, so the two views cannot disagree.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    graph: DiGraph<usize, RelationEdge>,
    nodes: Vec<NodeIndex>,
}

impl RelationGraph {
    pub fn with_tasks(count: usize) -> Self {
        let mut graph = DiGraph::with_capacity(count, count);
        let nodes = (0..count).map(|slot| graph.add_node(slot)).collect();
        Self { graph, nodes }
    }

    /// Adds `predecessor -> successor` unless an edge of the same type and
    /// the same lag span already exists. Lags are compared in minutes, so
    /// `8h` and `1d` match under an eight hour day. Returns whether a new
    /// edge was stored.
    pub fn link(
        &mut self,
        predecessor: usize,
        successor: usize,
        edge: RelationEdge,
        defaults: &TimeDefaults,
    ) -> bool {
        let (from, to) = (self.nodes[predecessor], self.nodes[successor]);
        let present = self
            .graph
            .edges_connecting(from, to)
            .any(|existing| existing.weight().same_relation(&edge, defaults));
        if present {
            return false;
        }
        self.graph.add_edge(from, to, edge);
        true
    }

    pub fn predecessors(&self, slot: usize) -> Vec<(usize, RelationEdge)> {
        self.neighbours(slot, Direction::Incoming)
    }

    pub fn successors(&self, slot: usize) -> Vec<(usize, RelationEdge)> {
        self.neighbours(slot, Direction::Outgoing)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // petgraph walks adjacency newest-first; sort by edge index to recover
    // insertion order.
    fn neighbours(&self, slot: usize, direction: Direction) -> Vec<(usize, RelationEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(self.nodes[slot], direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                (edge.id().index(), self.graph[other], *edge.weight())
            })
            .collect();
        edges.sort_by_key(|(edge_index, _, _)| *edge_index);
        edges
            .into_iter()
            .map(|(_, other, weight)| (other, weight))
            .collect()
    }
}

/// A relation seen from `task`: `target` is the predecessor when read from
/// [`TaskRef::predecessors`] and the successor when read from
/// [`TaskRef::successors`].
#[derive(Debug, Clone, Copy)]
pub struct Relation<'p> {
    pub task: TaskRef<'p>,
    pub target: TaskRef<'p>,
    pub relation_type: RelationType,
    pub lag: Duration,
}

impl<'p> Relation<'p> {
    pub fn source_task(&self) -> TaskRef<'p> {
        self.task
    }

    pub fn target_task(&self) -> TaskRef<'p> {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::TimeUnit;

    fn fs(lag_days: f64) -> RelationEdge {
        RelationEdge {
            relation_type: RelationType::FinishStart,
            lag: Duration::new(lag_days, TimeUnit::Days),
        }
    }

    #[test]
    fn identical_edge_is_stored_once() {
        let defaults = TimeDefaults::default();
        let mut graph = RelationGraph::with_tasks(2);
        assert!(graph.link(0, 1, fs(0.0), &defaults));
        assert!(!graph.link(0, 1, fs(0.0), &defaults));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.successors(0), vec![(1, fs(0.0))]);
        assert_eq!(graph.predecessors(1), vec![(0, fs(0.0))]);
    }

    #[test]
    fn differing_lag_is_a_separate_edge() {
        let defaults = TimeDefaults::default();
        let mut graph = RelationGraph::with_tasks(2);
        graph.link(0, 1, fs(0.0), &defaults);
        graph.link(0, 1, fs(2.0), &defaults);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn neighbours_keep_insertion_order() {
        let defaults = TimeDefaults::default();
        let mut graph = RelationGraph::with_tasks(4);
        graph.link(0, 3, fs(0.0), &defaults);
        graph.link(1, 3, fs(0.0), &defaults);
        graph.link(2, 3, fs(0.0), &defaults);
        let preds: Vec<usize> = graph.predecessors(3).into_iter().map(|(p, _)| p).collect();
        assert_eq!(preds, vec![0, 1, 2]);
    }

    #[test]
    fn equal_lag_in_other_units_is_the_same_edge() {
        let defaults = TimeDefaults::default();
        let mut graph = RelationGraph::with_tasks(2);
        let hours = RelationEdge {
            relation_type: RelationType::FinishStart,
            lag: Duration::new(8.0, TimeUnit::Hours),
        };
        assert!(graph.link(0, 1, hours, &defaults));
        assert!(!graph.link(0, 1, fs(1.0), &defaults));
        assert_eq!(graph.successors(0), vec![(1, hours)]);

        let start_start = RelationEdge {
            relation_type: RelationType::StartStart,
            ..hours
        };
        assert!(graph.link(0, 1, start_start, &defaults));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn relation_type_codes_parse() {
        assert_eq!("SS".parse::<RelationType>().unwrap(), RelationType::StartStart);
        assert_eq!(
            "finish-finish".parse::<RelationType>().unwrap(),
            RelationType::FinishFinish
        );
        assert!("XX".parse::<RelationType>().is_err());
    }
}
