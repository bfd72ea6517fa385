// agent-world/src/world.rs

use crate::fractal::{encode_text, mix_seeds, FractalSignature};
use crate::graph::{AgentGraph, AgentNode, Edge, NodeSpec, Position};
use crate::{WorldError, WorldResult};
use ledger_core::{current_timestamp, ProviderError, StateRootProvider, Timestamp};
use ledger_crypto::{canonical, digest, merkle_like_root, Hash};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const INGEST_WEIGHT: f64 = 1.0;
const INGEST_SUMMARY_CHARS: usize = 64;
const LINEAGE_WEIGHT: f64 = 0.8;
const MERGE_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMeta {
    pub t: Timestamp,
}

/// Exported view of the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub meta: StateMeta,
    pub nodes: Vec<AgentNode>,
    pub edges: Vec<Edge>,
    pub positions: BTreeMap<String, Position>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportNode {
    #[serde(default)]
    pub id: String,
    pub desc: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub seed: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportEdge {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub dst: String,
    #[serde(default = "default_weight")]
    pub w: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ImportPosition {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

/// Body of an import request. Ids refer to the exporting world.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportPayload {
    #[serde(default)]
    pub nodes: Vec<ImportNode>,
    #[serde(default)]
    pub edges: Vec<ImportEdge>,
    #[serde(default)]
    pub positions: HashMap<String, ImportPosition>,
}

impl ImportPayload {
    pub fn from_value(value: serde_json::Value) -> WorldResult<Self> {
        serde_json::from_value(value).map_err(|e| WorldError::BadImport(e.to_string()))
    }
}

fn default_weight() -> f64 {
    1.0
}

/// Agent graph plus the kernel operations on it
#[derive(Debug, Default)]
pub struct World {
    graph: AgentGraph,
    prev: Option<Uuid>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a world from a previous export, keeping node ids
    pub fn from_state(state: WorldState) -> Self {
        let mut graph = AgentGraph::new();
        for node in state.nodes {
            graph.insert(node);
        }
        for edge in state.edges {
            graph.add_edge(edge.src, edge.dst, edge.w);
        }
        Self { graph, prev: None }
    }

    /// Reads an exported state file, if there is one
    pub fn load(path: &Path) -> WorldResult<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let state: WorldState = serde_json::from_str(&fs::read_to_string(path)?)?;
        info!("Loaded {} agents from {}", state.nodes.len(), path.display());
        Ok(Some(Self::from_state(state)))
    }

    pub fn graph(&self) -> &AgentGraph {
        &self.graph
    }

    /// Adds an agent for `text`, linked from the previous one.
    /// Returns its descriptor.
    pub fn ingest_text(&mut self, text: &str, x: Option<f64>, y: Option<f64>) -> String {
        let encoded = encode_text(text);
        let id = self.graph.ensure_node(
            &encoded.descriptor,
            NodeSpec {
                weight: INGEST_WEIGHT,
                summary: text.chars().take(INGEST_SUMMARY_CHARS).collect(),
                seed: Some(encoded.seed),
                x,
                y,
            },
        );
        if let Some(prev) = self.prev {
            self.graph.add_edge(prev, id, LINEAGE_WEIGHT);
        }
        self.prev = Some(id);

        debug!("Ingested agent {}", encoded.descriptor);
        encoded.descriptor
    }

    /// Hybrid of two descriptors. Parents that are not in the graph get no
    /// lineage edge.
    pub fn merge(&mut self, desc_a: &str, desc_b: &str, mix: f64) -> WorldResult<String> {
        let sa = FractalSignature::from_descriptor(desc_a)?.seed;
        let sb = FractalSignature::from_descriptor(desc_b)?.seed;
        let seed = mix_seeds(sa, sb, mix);
        let descriptor = FractalSignature::new(u64::from(seed)).descriptor();

        let summary = format!("merge:{}+{}", prefix(desc_a, 10), prefix(desc_b, 10));
        let id = self.graph.ensure_node(
            &descriptor,
            NodeSpec {
                weight: MERGE_WEIGHT,
                summary,
                seed: Some(seed),
                ..Default::default()
            },
        );
        for parent in [desc_a, desc_b] {
            if let Some(node) = self.graph.get_by_desc(parent) {
                let pid = node.id;
                self.graph.add_edge(pid, id, MERGE_WEIGHT);
            }
        }
        self.prev = Some(id);

        debug!("Merged {} + {} -> {}", desc_a, desc_b, descriptor);
        Ok(descriptor)
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.prev = None;
    }

    /// Current nodes, edges and positions
    pub fn state(&self) -> WorldState {
        let positions = self
            .graph
            .positions()
            .into_iter()
            .map(|(id, pos)| (id.to_string(), pos))
            .collect();

        WorldState {
            meta: StateMeta {
                t: current_timestamp(),
            },
            nodes: self.graph.nodes().to_vec(),
            edges: self.graph.edges().to_vec(),
            positions,
        }
    }

    /// Writes the current state as pretty JSON
    pub fn export_state(&self, path: &Path) -> WorldResult<WorldState> {
        let state = self.state();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(&state)?)?;

        info!("Exported {} agents to {}", state.nodes.len(), path.display());
        Ok(state)
    }

    /// Replaces the graph with `payload`. Nodes get fresh ids and edges are
    /// remapped through the imported ids; dangling edges are dropped.
    pub fn import_state(&mut self, payload: ImportPayload) -> WorldResult<usize> {
        let mut graph = AgentGraph::new();
        let mut id_map: HashMap<&str, Uuid> = HashMap::new();

        for node in &payload.nodes {
            if node.desc.is_empty() {
                return Err(WorldError::BadImport("node without desc".into()));
            }
            let pos = payload.positions.get(&node.id).copied().unwrap_or_default();
            let id = graph.ensure_node(
                &node.desc,
                NodeSpec {
                    weight: node.weight,
                    summary: node.summary.clone(),
                    seed: node.seed,
                    x: pos.x,
                    y: pos.y,
                },
            );
            if !node.id.is_empty() {
                id_map.insert(node.id.as_str(), id);
            }
        }

        for edge in &payload.edges {
            if let (Some(&src), Some(&dst)) = (
                id_map.get(edge.src.as_str()),
                id_map.get(edge.dst.as_str()),
            ) {
                graph.add_edge(src, dst, edge.w);
            }
        }

        let count = graph.len();
        self.graph = graph;
        self.prev = None;

        info!("Imported {} agents", count);
        Ok(count)
    }

    /// Leaves bound into the state root: one per node, one per edge and one
    /// for the position map.
    pub fn state_leaves(&self) -> WorldResult<Vec<Hash>> {
        let mut leaves = Vec::with_capacity(self.graph.len() + self.graph.edges().len() + 1);
        for node in self.graph.nodes() {
            leaves.push(digest(format!("{}|{}", node.desc, node.id)));
        }
        for edge in self.graph.edges() {
            leaves.push(digest(format!("{}->{}", edge.src, edge.dst)));
        }

        let positions: BTreeMap<String, Position> = self
            .graph
            .positions()
            .into_iter()
            .map(|(id, pos)| (id.to_string(), pos))
            .collect();
        leaves.push(digest(canonical(&positions)?));
        Ok(leaves)
    }

    pub fn state_root(&self) -> WorldResult<Hash> {
        Ok(merkle_like_root(&self.state_leaves()?))
    }
}

impl StateRootProvider for World {
    fn compute_state_root(&self) -> Result<Hash, ProviderError> {
        self.state_root().map_err(|e| ProviderError::new(e.to_string()))
    }
}

fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// World behind a lock, shared between the HTTP handlers and the miner
#[derive(Debug, Default)]
pub struct SharedWorld {
    inner: RwLock<World>,
}

impl SharedWorld {
    pub fn new(world: World) -> Self {
        Self {
            inner: RwLock::new(world),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&World) -> R) -> WorldResult<R> {
        let world = self.inner.read().map_err(|_| WorldError::LockPoisoned)?;
        Ok(f(&world))
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut World) -> R) -> WorldResult<R> {
        let mut world = self.inner.write().map_err(|_| WorldError::LockPoisoned)?;
        Ok(f(&mut world))
    }
}

impl StateRootProvider for SharedWorld {
    fn compute_state_root(&self) -> Result<Hash, ProviderError> {
        self.read(|world| world.compute_state_root())
            .map_err(|e| ProviderError::new(e.to_string()))?
    }
}
