//! Directed dependency graph over registered factories.
//!
//! Nodes are identified by their insertion order. Edges are not stored; they
//! are derived on demand by the caller, which lets the registry compute them
//! from the live candidate rules instead of keeping a second copy in sync.

/// Append-only node list with depth-first cycle detection.
#[derive(Debug)]
pub struct Graph<N> {
    nodes: Vec<N>,
}

#[derive(Clone, Copy, Default)]
struct CycleNode {
    visited: bool,
    on_stack: bool,
}

impl<N> Default for Graph<N> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<N> Graph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its order.
    pub fn add(&mut self, node: N) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, order: usize) -> Option<&N> {
        self.nodes.get(order)
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Drops every node whose order is `order` or higher.
    pub fn truncate(&mut self, order: usize) {
        self.nodes.truncate(order);
    }

    /// True when no cycle is reachable from any node.
    pub fn is_acyclic<F>(&self, edges_from: F) -> bool
    where
        F: Fn(usize, &N) -> Vec<usize>,
    {
        self.find_cycle(edges_from).is_none()
    }

    /// Returns the first cycle found, as node orders with the entry node
    /// repeated at the end (`[1, 2, 1]`). A self-dependency yields `[u, u]`.
    ///
    /// `edges_from(u, node)` lists the orders `u` depends on; orders outside
    /// the graph are ignored.
    pub fn find_cycle<F>(&self, edges_from: F) -> Option<Vec<usize>>
    where
        F: Fn(usize, &N) -> Vec<usize>,
    {
        let mut info = vec![CycleNode::default(); self.nodes.len()];
        let mut path = Vec::new();

        for start in 0..self.nodes.len() {
            for node in info.iter_mut() {
                node.on_stack = false;
            }
            path.clear();
            if let Some(cycle) = self.visit(start, &edges_from, &mut info, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    /// Like [`find_cycle`](Self::find_cycle) but only searches paths
    /// leaving `start`. Enough after appending `start` to a graph that was
    /// acyclic before, since any new cycle runs through it.
    pub fn find_cycle_from<F>(&self, start: usize, edges_from: F) -> Option<Vec<usize>>
    where
        F: Fn(usize, &N) -> Vec<usize>,
    {
        if start >= self.nodes.len() {
            return None;
        }
        let mut info = vec![CycleNode::default(); self.nodes.len()];
        let mut path = Vec::new();
        self.visit(start, &edges_from, &mut info, &mut path)
    }

    fn visit<F>(&self, u: usize, edges_from: &F, info: &mut [CycleNode], path: &mut Vec<usize>) -> Option<Vec<usize>>
    where
        F: Fn(usize, &N) -> Vec<usize>,
    {
        if info[u].visited {
            return None;
        }
        info[u].visited = true;
        info[u].on_stack = true;
        path.push(u);

        for v in edges_from(u, &self.nodes[u]) {
            if v >= info.len() {
                continue;
            }
            if !info[v].visited {
                if let Some(cycle) = self.visit(v, edges_from, info, path) {
                    return Some(cycle);
                }
            } else if info[v].on_stack {
                let start = path.iter().rposition(|&n| n == v).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(v);
                return Some(cycle);
            }
        }

        info[u].on_stack = false;
        path.pop();
        None
    }
}
