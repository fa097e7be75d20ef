use crate::domain::callgraph::CallGraph;
use dashmap::DashMap;
use sled::Db;

/// Trait for built-graph storage backends.
/// A stored graph is immutable and can be re-rooted any number of times
/// without re-parsing the source. Implementations must be thread-safe.
pub trait GraphStore: Send + Sync {
    fn put(&self, key: &str, graph: &CallGraph);
    fn get(&self, key: &str) -> Option<CallGraph>;
    fn remove(&self, key: &str);
}

// ============================================================================
// MemoryGraphStore - concurrent in-process cache using DashMap
// ============================================================================

#[derive(Default)]
pub struct MemoryGraphStore {
    graphs: DashMap<String, CallGraph>,
}

impl GraphStore for MemoryGraphStore {
    fn put(&self, key: &str, graph: &CallGraph) {
        self.graphs.insert(key.to_string(), graph.clone());
    }

    fn get(&self, key: &str) -> Option<CallGraph> {
        self.graphs.get(key).map(|entry| entry.clone())
    }

    fn remove(&self, key: &str) {
        self.graphs.remove(key);
    }
}

// ============================================================================
// DiskGraphStore - persistent storage using sled
// ============================================================================

pub struct DiskGraphStore {
    _db: Db,
    graphs_tree: sled::Tree,
}

impl DiskGraphStore {
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let db = sled::open(path)?;
        let graphs_tree = db.open_tree("graphs")?;
        Ok(Self {
            _db: db,
            graphs_tree,
        })
    }
}

impl GraphStore for DiskGraphStore {
    fn put(&self, key: &str, graph: &CallGraph) {
        if let Ok(bytes) = bincode::serialize(graph) {
            let _ = self.graphs_tree.insert(key.as_bytes(), bytes);
        }
    }

    fn get(&self, key: &str) -> Option<CallGraph> {
        self.graphs_tree
            .get(key.as_bytes())
            .ok()
            .flatten()
            .and_then(|bytes| bincode::deserialize(&bytes).ok())
    }

    fn remove(&self, key: &str) {
        let _ = self.graphs_tree.remove(key.as_bytes());
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
