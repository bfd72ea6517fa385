// agent-world/src/graph.rs

use ledger_core::{current_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

const GOLDEN_ANGLE_DEG: f64 = 137.5;
const PHI: f64 = 1.618_033_988_749_895;
const LAYOUT_SCALE: f64 = 80.0;

/// An agent in the world graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNode {
    pub id: Uuid,
    pub desc: String,
    pub weight: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub seed: Option<u32>,
    pub t: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl AgentNode {
    /// Pinned position, when both coordinates are set
    pub fn pinned(&self) -> Option<Position> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Position { x, y }),
            _ => None,
        }
    }
}

/// Directed lineage edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub src: Uuid,
    pub dst: Uuid,
    pub w: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Node attributes accepted by [`AgentGraph::ensure_node`]
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    pub weight: f64,
    pub summary: String,
    pub seed: Option<u32>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Insertion-ordered agent graph keyed by descriptor
#[derive(Debug, Clone, Default)]
pub struct AgentGraph {
    nodes: Vec<AgentNode>,
    by_desc: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl AgentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node for `desc`, or refresh the existing one.
    ///
    /// An existing node keeps its id and the larger of both weights; its
    /// summary and any given coordinates are overwritten.
    pub fn ensure_node(&mut self, desc: &str, spec: NodeSpec) -> Uuid {
        if let Some(&i) = self.by_desc.get(desc) {
            let node = &mut self.nodes[i];
            node.weight = node.weight.max(spec.weight);
            if !spec.summary.is_empty() {
                node.summary = spec.summary;
            }
            if spec.seed.is_some() {
                node.seed = spec.seed;
            }
            if spec.x.is_some() {
                node.x = spec.x;
            }
            if spec.y.is_some() {
                node.y = spec.y;
            }
            return node.id;
        }

        let node = AgentNode {
            id: Uuid::new_v4(),
            desc: desc.to_string(),
            weight: spec.weight,
            summary: spec.summary,
            seed: spec.seed,
            t: current_timestamp(),
            x: spec.x,
            y: spec.y,
        };
        let id = node.id;
        self.by_desc.insert(node.desc.clone(), self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Inserts a node as-is. Refused when its descriptor is already present.
    pub fn insert(&mut self, node: AgentNode) -> bool {
        if self.by_desc.contains_key(&node.desc) {
            return false;
        }
        self.by_desc.insert(node.desc.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Adds the edge only when both endpoints exist
    pub fn add_edge(&mut self, src: Uuid, dst: Uuid, w: f64) -> bool {
        if self.get(&src).is_none() || self.get(&dst).is_none() {
            return false;
        }
        self.edges.push(Edge { src, dst, w });
        true
    }

    pub fn get(&self, id: &Uuid) -> Option<&AgentNode> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    pub fn get_by_desc(&self, desc: &str) -> Option<&AgentNode> {
        self.by_desc.get(desc).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[AgentNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.by_desc.clear();
        self.edges.clear();
    }

    /// Phyllotaxis layout: heaviest and newest nodes sit nearest the centre
    pub fn layout_phi(&self) -> Vec<(Uuid, Position)> {
        let mut order: Vec<&AgentNode> = self.nodes.iter().collect();
        order.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| b.t.cmp(&a.t))
        });

        let theta = GOLDEN_ANGLE_DEG.to_radians();
        order
            .into_iter()
            .enumerate()
            .map(|(i, node)| {
                let i = i as f64;
                let r = 1.0 + i.powf(0.55) / PHI;
                let angle = theta * i;
                let pos = Position {
                    x: r * angle.cos() * LAYOUT_SCALE,
                    y: r * angle.sin() * LAYOUT_SCALE,
                };
                (node.id, pos)
            })
            .collect()
    }

    /// Pinned coordinates when any node has both set, else the computed layout
    pub fn positions(&self) -> Vec<(Uuid, Position)> {
        if self.nodes.iter().any(|n| n.pinned().is_some()) {
            self.nodes
                .iter()
                .filter_map(|n| n.pinned().map(|p| (n.id, p)))
                .collect()
        } else {
            self.layout_phi()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(weight: f64) -> NodeSpec {
        NodeSpec {
            weight,
            ..Default::default()
        }
    }

    #[test]
    fn test_ensure_node_is_keyed_by_desc() {
        let mut graph = AgentGraph::new();
        let a = graph.ensure_node("sun", spec(1.0));
        let b = graph.ensure_node("sun", spec(3.0));
        let c = graph.ensure_node("sun", spec(2.0));

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get(&a).unwrap().weight, 3.0);
    }

    #[test]
    fn test_ensure_node_updates_coordinates() {
        let mut graph = AgentGraph::new();
        let id = graph.ensure_node("sun", spec(1.0));
        assert!(graph.get(&id).unwrap().pinned().is_none());

        graph.ensure_node(
            "sun",
            NodeSpec {
                x: Some(1.0),
                y: Some(2.0),
                summary: "bright".into(),
                ..spec(1.0)
            },
        );
        let node = graph.get(&id).unwrap();
        assert_eq!(node.pinned(), Some(Position { x: 1.0, y: 2.0 }));
        assert_eq!(node.summary, "bright");
    }

    #[test]
    fn test_add_edge_requires_both_ends() {
        let mut graph = AgentGraph::new();
        let a = graph.ensure_node("a", spec(1.0));
        let b = graph.ensure_node("b", spec(1.0));

        assert!(graph.add_edge(a, b, 1.0));
        assert!(!graph.add_edge(a, Uuid::new_v4(), 1.0));
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_layout_puts_heaviest_first() {
        let mut graph = AgentGraph::new();
        graph.ensure_node("light", spec(1.0));
        let heavy = graph.ensure_node("heavy", spec(5.0));

        let layout = graph.layout_phi();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout[0].0, heavy);
        assert_eq!(layout[0].1, Position { x: 80.0, y: 0.0 });
    }

    #[test]
    fn test_positions_prefer_pinned() {
        let mut graph = AgentGraph::new();
        graph.ensure_node("free", spec(1.0));
        let pinned = graph.ensure_node(
            "pinned",
            NodeSpec {
                x: Some(3.0),
                y: Some(4.0),
                ..spec(1.0)
            },
        );

        let positions = graph.positions();
        assert_eq!(positions, vec![(pinned, Position { x: 3.0, y: 4.0 })]);
    }

    #[test]
    fn test_insert_keeps_identity() {
        let mut graph = AgentGraph::new();
        let id = graph.ensure_node("a", spec(1.0));
        let node = graph.get(&id).unwrap().clone();

        let mut copy = AgentGraph::new();
        assert!(copy.insert(node.clone()));
        assert!(!copy.insert(node));
        assert_eq!(copy.get_by_desc("a").unwrap().id, id);
    }

    #[test]
    fn test_clear() {
        let mut graph = AgentGraph::new();
        let a = graph.ensure_node("a", spec(1.0));
        graph.add_edge(a, a, 1.0);
        graph.clear();
        assert!(graph.is_empty());
        assert!(graph.edges().is_empty());
        assert!(graph.get_by_desc("a").is_none());
    }
}
