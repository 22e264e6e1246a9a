// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Topology Builder
// ─────────────────────────────────────────────────────────────────────
//! Weighted adjacency construction for the oscillator population.
//!
//! One tagged shape descriptor, one constructor. Every builder returns
//! a symmetric, nonnegative matrix with zero diagonal; randomised
//! shapes are deterministic given the caller's seeded generator.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tagged description of the graph to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TopologyShape {
    /// Cycle of `nodes` oscillators, each linked to both neighbours.
    Ring { nodes: usize },
    /// rows × cols lattice, 4-neighbourhood; `diagonal` adds the 8-neighbourhood.
    Grid { rows: usize, cols: usize, diagonal: bool },
    /// Watts-Strogatz ring of degree `ring_degree` with rewire probability `rewire_p`.
    SmallWorld {
        nodes: usize,
        ring_degree: usize,
        rewire_p: f64,
    },
    /// One ring per layer; consecutive layers bridged at their first node.
    NestedLayers {
        layer_sizes: Vec<usize>,
        inter_weight: f64,
    },
    /// Hex-ring point lattice: centre plus 6k points on ring k, edges
    /// between points within Euclidean distance `reach`.
    RadialLattice { rings: usize, reach: f64 },
}

impl TopologyShape {
    /// Number of nodes the built adjacency will have.
    pub fn node_count(&self) -> usize {
        match self {
            TopologyShape::Ring { nodes } => *nodes,
            TopologyShape::Grid { rows, cols, .. } => rows * cols,
            TopologyShape::SmallWorld { nodes, .. } => *nodes,
            TopologyShape::NestedLayers { layer_sizes, .. } => layer_sizes.iter().sum(),
            TopologyShape::RadialLattice { rings, .. } => {
                1 + (1..=*rings).map(|k| 6 * k).sum::<usize>()
            }
        }
    }
}

/// Symmetric nonnegative weighted adjacency, row-major n×n.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjacency {
    n: usize,
    w: Vec<f64>,
}

impl Adjacency {
    pub fn zeros(n: usize) -> Self {
        Self { n, w: vec![0.0; n * n] }
    }

    /// Build an adjacency from a shape descriptor.
    ///
    /// Randomised shapes draw only from `rng`; equal seeds give equal graphs.
    pub fn build(shape: &TopologyShape, rng: &mut impl Rng) -> Self {
        match shape {
            TopologyShape::Ring { nodes } => Self::ring(*nodes),
            TopologyShape::Grid { rows, cols, diagonal } => Self::grid(*rows, *cols, *diagonal),
            TopologyShape::SmallWorld {
                nodes,
                ring_degree,
                rewire_p,
            } => Self::small_world(*nodes, *ring_degree, *rewire_p, rng),
            TopologyShape::NestedLayers {
                layer_sizes,
                inter_weight,
            } => Self::nested_layers(layer_sizes, *inter_weight),
            TopologyShape::RadialLattice { rings, reach } => Self::radial_lattice(*rings, *reach),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn weight(&self, i: usize, j: usize) -> f64 {
        self.w[i * self.n + j]
    }

    /// Set both (i, j) and (j, i); the diagonal stays zero.
    pub fn set_symmetric(&mut self, i: usize, j: usize, weight: f64) {
        if i == j {
            return;
        }
        self.w[i * self.n + j] = weight;
        self.w[j * self.n + i] = weight;
    }

    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        i != j && self.weight(i, j) > 0.0
    }

    /// Number of positive-weight neighbours of node i.
    pub fn degree(&self, i: usize) -> usize {
        (0..self.n).filter(|&j| self.has_edge(i, j)).count()
    }

    /// Sum of edge weights incident to node i.
    pub fn weighted_degree(&self, i: usize) -> f64 {
        let row = &self.w[i * self.n..(i + 1) * self.n];
        row.iter().sum()
    }

    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.n).filter(move |&j| self.has_edge(i, j))
    }

    /// Undirected edge count (positive weights, each pair once).
    pub fn edge_count(&self) -> usize {
        let mut count = 0;
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if self.weight(i, j) > 0.0 {
                    count += 1;
                }
            }
        }
        count
    }

    /// Permanently insert a new undirected edge.
    ///
    /// Rejects self-loops and duplicates; this is the only mutation the
    /// engine performs after construction (edge birth).
    pub fn add_edge(&mut self, u: usize, v: usize, weight: f64) -> Result<(), &'static str> {
        if u == v {
            return Err("self-loop rejected");
        }
        if u >= self.n || v >= self.n {
            return Err("node index out of range");
        }
        if self.has_edge(u, v) {
            return Err("duplicate edge rejected");
        }
        if weight <= 0.0 {
            return Err("edge weight must be positive");
        }
        self.set_symmetric(u, v, weight);
        Ok(())
    }

    pub fn is_symmetric(&self) -> bool {
        for i in 0..self.n {
            if self.w[i * self.n + i] != 0.0 {
                return false;
            }
            for j in (i + 1)..self.n {
                if (self.weight(i, j) - self.weight(j, i)).abs() > 1e-12 {
                    return false;
                }
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    fn ring(nodes: usize) -> Self {
        let mut adj = Self::zeros(nodes);
        if nodes < 2 {
            return adj;
        }
        for i in 0..nodes {
            adj.set_symmetric(i, (i + 1) % nodes, 1.0);
        }
        adj
    }

    fn grid(rows: usize, cols: usize, diagonal: bool) -> Self {
        let n = rows * cols;
        let mut adj = Self::zeros(n);
        let idx = |r: usize, c: usize| r * cols + c;
        for r in 0..rows {
            for c in 0..cols {
                if c + 1 < cols {
                    adj.set_symmetric(idx(r, c), idx(r, c + 1), 1.0);
                }
                if r + 1 < rows {
                    adj.set_symmetric(idx(r, c), idx(r + 1, c), 1.0);
                }
                if diagonal && r + 1 < rows {
                    if c + 1 < cols {
                        adj.set_symmetric(idx(r, c), idx(r + 1, c + 1), 1.0);
                    }
                    if c > 0 {
                        adj.set_symmetric(idx(r, c), idx(r + 1, c - 1), 1.0);
                    }
                }
            }
        }
        adj
    }

    fn small_world(nodes: usize, ring_degree: usize, rewire_p: f64, rng: &mut impl Rng) -> Self {
        let mut adj = Self::zeros(nodes);
        if nodes < 2 {
            return adj;
        }
        let half = (ring_degree / 2).max(1).min(nodes.saturating_sub(1) / 2).max(1);
        let mut lattice_edges = Vec::new();
        for i in 0..nodes {
            for k in 1..=half {
                let j = (i + k) % nodes;
                if !adj.has_edge(i, j) {
                    adj.set_symmetric(i, j, 1.0);
                    lattice_edges.push((i, j));
                }
            }
        }
        // Rewire each lattice edge once, independently. The candidate
        // pool excludes self, current neighbours, and the old partner,
        // so degree is approximately preserved and no duplicate forms.
        for (i, j) in lattice_edges {
            if !adj.has_edge(i, j) {
                continue;
            }
            if rng.gen::<f64>() >= rewire_p {
                continue;
            }
            let pool: Vec<usize> = (0..nodes)
                .filter(|&x| x != i && x != j && !adj.has_edge(i, x))
                .collect();
            if pool.is_empty() {
                continue;
            }
            let target = pool[rng.gen_range(0..pool.len())];
            adj.set_symmetric(i, j, 0.0);
            adj.set_symmetric(i, target, 1.0);
        }
        adj
    }

    fn nested_layers(layer_sizes: &[usize], inter_weight: f64) -> Self {
        let n: usize = layer_sizes.iter().sum();
        let mut adj = Self::zeros(n);
        let mut offset = 0;
        let mut anchors = Vec::with_capacity(layer_sizes.len());
        for &size in layer_sizes {
            if size >= 2 {
                for i in 0..size {
                    adj.set_symmetric(offset + i, offset + (i + 1) % size, 1.0);
                }
            }
            anchors.push(offset);
            offset += size;
        }
        for pair in anchors.windows(2) {
            adj.set_symmetric(pair[0], pair[1], inter_weight);
        }
        adj
    }

    fn radial_lattice(rings: usize, reach: f64) -> Self {
        let mut coords = vec![(0.0f64, 0.0f64)];
        for k in 1..=rings {
            let m = 6 * k;
            for j in 0..m {
                let angle = std::f64::consts::TAU * (j as f64 / m as f64);
                coords.push((k as f64 * angle.cos(), k as f64 * angle.sin()));
            }
        }
        let n = coords.len();
        let mut adj = Self::zeros(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let (dx, dy) = (coords[i].0 - coords[j].0, coords[i].1 - coords[j].1);
                if (dx * dx + dy * dy).sqrt() <= reach + 1e-9 {
                    adj.set_symmetric(i, j, 1.0);
                }
            }
        }
        adj
    }
}
