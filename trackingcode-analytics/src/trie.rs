//! Referrer trie: groups `(address, count)` pairs by host, then by path
//! segment, one level at a time.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Only the top level
//! is built eagerly; a node's children are partitioned out of its records
//! the first time somebody asks for them.

use crate::record::{ParsedAddress, ReferrerRecord};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Rows shown per level before the "see more" cut.
pub const DEFAULT_LIMIT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct TrieNode {
    key: String,
    depth: usize,
    total: u64,
    representative_url: Option<String>,
    records: Vec<usize>,
    children: Option<Vec<NodeId>>,
}

impl TrieNode {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Traffic of this node and everything beneath it.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn representative_url(&self) -> Option<&str> {
        self.representative_url.as_deref()
    }

    pub fn is_materialised(&self) -> bool {
        self.children.is_some()
    }
}

struct Entry {
    parsed: ParsedAddress,
    record: ReferrerRecord,
}

pub struct ReferrerTrie {
    entries: Vec<Entry>,
    nodes: Vec<TrieNode>,
    roots: Vec<NodeId>,
}

impl ReferrerTrie {
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ReferrerRecord>,
    {
        let entries: Vec<Entry> = records
            .into_iter()
            .map(|record| Entry {
                parsed: ParsedAddress::parse(&record.address),
                record,
            })
            .collect();

        let mut trie = Self {
            entries,
            nodes: Vec::new(),
            roots: Vec::new(),
        };

        let mut by_host: HashMap<String, NodeId> = HashMap::new();
        for idx in 0..trie.entries.len() {
            let host = trie.entries[idx].parsed.host.clone();
            let id = match by_host.get(&host) {
                Some(id) => *id,
                None => {
                    let id = trie.push_node(host.clone(), 0, idx);
                    by_host.insert(host, id);
                    trie.roots.push(id);
                    id
                }
            };
            trie.fold(id, idx);
        }

        debug!(
            "Built referrer trie: {} records under {} hosts",
            trie.entries.len(),
            trie.roots.len()
        );
        trie
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id.0]
    }

    /// Number of nodes materialised so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of `id`, partitioned by the next path segment on first use.
    pub fn children(&mut self, id: NodeId) -> Vec<NodeId> {
        if let Some(children) = &self.nodes[id.0].children {
            return children.clone();
        }

        let depth = self.nodes[id.0].depth;
        let records = self.nodes[id.0].records.clone();
        let mut by_segment: HashMap<String, NodeId> = HashMap::new();
        let mut children = Vec::new();

        for idx in records {
            let Some(segment) = self.entries[idx].parsed.segments.get(depth).cloned() else {
                // path ends here: own traffic of this node
                continue;
            };
            let child = match by_segment.get(&segment) {
                Some(child) => *child,
                None => {
                    let child = self.push_node(segment.clone(), depth + 1, idx);
                    by_segment.insert(segment, child);
                    children.push(child);
                    child
                }
            };
            self.fold(child, idx);
        }

        self.nodes[id.0].children = Some(children.clone());
        children
    }

    /// Traffic held by the children of `id`.
    pub fn deep_count(&mut self, id: NodeId) -> u64 {
        self.children(id)
            .into_iter()
            .map(|child| self.nodes[child.0].total)
            .sum()
    }

    /// Traffic whose path ends exactly at `id`.
    pub fn own_count(&mut self, id: NodeId) -> u64 {
        let deep = self.deep_count(id);
        self.nodes[id.0].total - deep
    }

    /// Display rows for `ids`, sorted by total traffic, largest first.
    pub fn rows(&mut self, ids: &[NodeId]) -> Vec<LevelRow> {
        let mut rows: Vec<LevelRow> = ids
            .iter()
            .map(|&id| {
                let children = self.children(id);
                let deep_count: u64 = children.iter().map(|c| self.nodes[c.0].total).sum();
                let node = &self.nodes[id.0];
                LevelRow {
                    key: node.key.clone(),
                    own_count: node.total - deep_count,
                    deep_count,
                    representative_url: node.representative_url.clone(),
                    drillable: !children.is_empty(),
                    node: id,
                }
            })
            .collect();

        // stable: equal totals keep insertion order
        rows.sort_by(|a, b| b.total().cmp(&a.total()));
        rows
    }

    fn push_node(&mut self, key: String, depth: usize, first_record: usize) -> NodeId {
        let entry = &self.entries[first_record];
        let representative_url = entry.parsed.linkable.then(|| entry.record.address.clone());
        let id = NodeId(self.nodes.len());
        self.nodes.push(TrieNode {
            key,
            depth,
            total: 0,
            representative_url,
            records: Vec::new(),
            children: None,
        });
        id
    }

    fn fold(&mut self, id: NodeId, record: usize) {
        let count = self.entries[record].record.count;
        let node = &mut self.nodes[id.0];
        node.total += count;
        node.records.push(record);
    }
}

/// One row of a displayed trie level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelRow {
    pub key: String,
    pub own_count: u64,
    pub deep_count: u64,
    pub representative_url: Option<String>,
    pub drillable: bool,
    #[serde(skip)]
    node: NodeId,
}

impl LevelRow {
    pub fn total(&self) -> u64 {
        self.own_count + self.deep_count
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Outbound link without the query string.
    pub fn link(&self) -> Option<&str> {
        self.representative_url
            .as_deref()
            .map(|url| url.split('?').next().unwrap_or(url))
    }
}

/// The rows of the current level as handed to the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelView {
    pub rows: Vec<LevelRow>,
    pub has_more: bool,
    pub can_drill_up: bool,
    pub path: Vec<String>,
}

struct Level {
    key: Option<String>,
    rows: Vec<LevelRow>,
}

/// Drill-down/drill-up navigation over a [`ReferrerTrie`].
///
/// Every visited level keeps its full sorted row list on a stack, so
/// drilling up hands back exactly what was shown before.
pub struct ReferrerExplorer {
    trie: ReferrerTrie,
    levels: Vec<Level>,
}

impl ReferrerExplorer {
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ReferrerRecord>,
    {
        let mut trie = ReferrerTrie::build(records);
        let roots = trie.roots().to_vec();
        let rows = trie.rows(&roots);
        Self {
            trie,
            levels: vec![Level { key: None, rows }],
        }
    }

    pub fn trie(&self) -> &ReferrerTrie {
        &self.trie
    }

    /// All rows of the current level, in display order.
    pub fn current_rows(&self) -> &[LevelRow] {
        &self.current().rows
    }

    /// Keys drilled through to reach the current level.
    pub fn path(&self) -> Vec<String> {
        self.levels.iter().filter_map(|l| l.key.clone()).collect()
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// The current level cut to `limit` rows unless `expanded` is set.
    pub fn view(&self, limit: usize, expanded: bool) -> LevelView {
        let rows = self.current_rows();
        let has_more = rows.len() > limit;
        let shown = if expanded || !has_more {
            rows.to_vec()
        } else {
            rows[..limit].to_vec()
        };

        LevelView {
            rows: shown,
            has_more,
            can_drill_up: self.levels.len() > 1,
            path: self.path(),
        }
    }

    /// Push the children of the row keyed `key`. Leaf rows and unknown keys
    /// leave the navigation untouched and return `false`.
    pub fn drill_down(&mut self, key: &str) -> bool {
        let Some(row) = self.current_rows().iter().find(|r| r.key == key) else {
            debug!("Drill into unknown referrer key {}", key);
            return false;
        };
        if !row.drillable {
            return false;
        }

        let node = row.node;
        let children = self.trie.children(node);
        let rows = self.trie.rows(&children);
        debug!("Drilled into {} ({} rows)", key, rows.len());
        self.levels.push(Level {
            key: Some(key.to_string()),
            rows,
        });
        true
    }

    /// Pop back to the previous level; a no-op at the root.
    pub fn drill_up(&mut self) -> bool {
        if self.levels.len() <= 1 {
            return false;
        }
        self.levels.pop();
        true
    }

    fn current(&self) -> &Level {
        // the root level is never popped
        &self.levels[self.levels.len() - 1]
    }
}
