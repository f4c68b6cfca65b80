//! Expression dependency graph.
//!
//! Built from a lexical scan of every expression for `get('<path>')` calls
//! with a literal argument. Edges run from the dependency to the dependent.
//! The graph is transient: it is rebuilt from the tree on every evaluation
//! and never stored in nodes.
//!
//! ```text
//! price ──► total ──► total_with_tax
//! qty ────┘
//! ```

use crate::tree::PropTree;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

fn get_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bget\s*\(\s*(?:'([^'\\]*)'|"([^"\\]*)")\s*\)"#)
            .expect("dependency pattern is a valid regex")
    })
}

/// Paths read through `get(...)` with a literal argument, deduplicated in
/// order of first appearance.
///
/// Conservative: branches that never run at evaluation time still count.
pub fn extract_dependencies(source: &str) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    for caps in get_call_regex().captures_iter(source) {
        let Some(path) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        let path = path.as_str();
        if !path.is_empty() && !deps.iter().any(|d| d == path) {
            deps.push(path.to_string());
        }
    }
    deps
}

/// A vertex of the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Node path
    pub id: String,
    /// Longest distance from a node without incoming edges
    pub level: usize,
    /// The node currently carries an `expressionError`
    pub has_error: bool,
}

/// `from` is read by the expression of `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Dependency graph over node paths
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub has_cycle: bool,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    fwd_adj: Vec<Vec<usize>>,
    #[serde(skip)]
    bwd_adj: Vec<Vec<usize>>,
    #[serde(skip)]
    cyclic: Vec<bool>,
}

impl DependencyGraph {
    fn intern(&mut self, path: &str, has_error: bool) -> usize {
        if let Some(&idx) = self.index.get(path) {
            self.nodes[idx].has_error |= has_error;
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(GraphNode {
            id: path.to_string(),
            level: 0,
            has_error,
        });
        self.index.insert(path.to_string(), idx);
        self.fwd_adj.push(Vec::new());
        self.bwd_adj.push(Vec::new());
        idx
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        if self.fwd_adj[from].contains(&to) {
            return;
        }
        self.fwd_adj[from].push(to);
        self.bwd_adj[to].push(from);
        self.edges.push(GraphEdge {
            from: self.nodes[from].id.clone(),
            to: self.nodes[to].id.clone(),
        });
    }

    /// Paths the expression at `path` reads
    pub fn dependencies_of(&self, path: &str) -> Vec<&str> {
        self.neighbours(path, &self.bwd_adj)
    }

    /// Paths whose expressions read `path`
    pub fn dependents_of(&self, path: &str) -> Vec<&str> {
        self.neighbours(path, &self.fwd_adj)
    }

    fn neighbours<'a>(&'a self, path: &str, adj: &'a [Vec<usize>]) -> Vec<&'a str> {
        match self.index.get(path) {
            Some(&idx) => adj[idx].iter().map(|&n| self.nodes[n].id.as_str()).collect(),
            None => Vec::new(),
        }
    }

    pub fn level_of(&self, path: &str) -> Option<usize> {
        self.index.get(path).map(|&idx| self.nodes[idx].level)
    }

    /// True if `path` is on a cycle (including a self-reference)
    pub fn is_cyclic(&self, path: &str) -> bool {
        self.index
            .get(path)
            .is_some_and(|&idx| self.cyclic[idx])
    }

    /// Every node on a cycle, in graph order
    pub fn cyclic_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .zip(&self.cyclic)
            .filter(|(_, &c)| c)
            .map(|(n, _)| n.id.as_str())
            .collect()
    }

    pub fn node(&self, path: &str) -> Option<&GraphNode> {
        self.index.get(path).map(|&idx| &self.nodes[idx])
    }
}

/// Build the dependency graph of every expression in `tree`.
///
/// Graph nodes are the expression nodes (in traversal order) plus every
/// path they reference.
pub fn build_expression_dependency_graph(tree: &PropTree) -> DependencyGraph {
    let mut graph = DependencyGraph::default();

    for (path, node) in tree.primitives() {
        let Some(source) = &node.meta.expression else {
            continue;
        };
        let to = graph.intern(&path, node.meta.expression_error.is_some());
        for dep in extract_dependencies(source) {
            let has_error = tree
                .get(&dep)
                .is_some_and(|n| n.meta.expression_error.is_some());
            let from = graph.intern(&dep, has_error);
            graph.add_edge(from, to);
        }
    }

    graph.has_cycle = has_back_edge(&graph.fwd_adj);
    graph.cyclic = cycle_membership(&graph.fwd_adj);
    let levels = compute_levels(&graph.fwd_adj, &graph.cyclic);
    for (node, level) in graph.nodes.iter_mut().zip(levels) {
        node.level = level;
    }
    graph
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Colored depth-first walk; true iff a back edge exists
fn has_back_edge(adj: &[Vec<usize>]) -> bool {
    let n = adj.len();
    let mut color = vec![Color::White; n];

    for start in 0..n {
        if color[start] != Color::White {
            continue;
        }
        color[start] = Color::Gray;
        let mut stack = vec![(start, 0usize)];

        while let Some((node, next)) = stack.last().copied() {
            match adj[node].get(next) {
                Some(&neighbor) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    match color[neighbor] {
                        Color::Gray => return true,
                        Color::White => {
                            color[neighbor] = Color::Gray;
                            stack.push((neighbor, 0));
                        }
                        Color::Black => {}
                    }
                }
                None => {
                    color[node] = Color::Black;
                    stack.pop();
                }
            }
        }
    }

    false
}

/// Mark nodes inside a strongly connected component of size > 1 or with a
/// self edge (Tarjan, iterative)
fn cycle_membership(adj: &[Vec<usize>]) -> Vec<bool> {
    const UNVISITED: usize = usize::MAX;
    let n = adj.len();
    let mut index = vec![UNVISITED; n];
    let mut low = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut cyclic = vec![false; n];
    let mut next_index = 0;

    for start in 0..n {
        if index[start] != UNVISITED {
            continue;
        }
        index[start] = next_index;
        low[start] = next_index;
        next_index += 1;
        stack.push(start);
        on_stack[start] = true;
        let mut work = vec![(start, 0usize)];

        while let Some((node, next)) = work.last().copied() {
            if let Some(&neighbor) = adj[node].get(next) {
                if let Some(top) = work.last_mut() {
                    top.1 += 1;
                }
                if index[neighbor] == UNVISITED {
                    index[neighbor] = next_index;
                    low[neighbor] = next_index;
                    next_index += 1;
                    stack.push(neighbor);
                    on_stack[neighbor] = true;
                    work.push((neighbor, 0));
                } else if on_stack[neighbor] {
                    low[node] = low[node].min(index[neighbor]);
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                low[parent] = low[parent].min(low[node]);
            }
            if low[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                let self_edge = adj[node].contains(&node);
                if component.len() > 1 || self_edge {
                    for member in component {
                        cyclic[member] = true;
                    }
                }
            }
        }
    }

    cyclic
}

/// Longest-path levels (Kahn). Cyclic nodes stay at level 0 and their
/// outgoing edges are ignored.
fn compute_levels(adj: &[Vec<usize>], cyclic: &[bool]) -> Vec<usize> {
    let n = adj.len();
    let mut in_degree = vec![0usize; n];
    for (from, targets) in adj.iter().enumerate() {
        if cyclic[from] {
            continue;
        }
        for &to in targets {
            if !cyclic[to] {
                in_degree[to] += 1;
            }
        }
    }

    let mut level = vec![0usize; n];
    let mut queue: VecDeque<usize> = (0..n)
        .filter(|&i| !cyclic[i] && in_degree[i] == 0)
        .collect();

    while let Some(node) = queue.pop_front() {
        for &neighbor in &adj[node] {
            if cyclic[neighbor] {
                continue;
            }
            level[neighbor] = level[neighbor].max(level[node] + 1);
            in_degree[neighbor] -= 1;
            if in_degree[neighbor] == 0 {
                queue.push_back(neighbor);
            }
        }
    }

    level
}
