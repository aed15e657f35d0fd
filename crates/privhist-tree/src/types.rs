//! Core types for hierarchical tree representation
//!
//! The tree lives in an arena: nodes are addressed by [`NodeId`] and store
//! their parent and children as ids, so traversal is plain index iteration.

use std::fmt;

use privhist_core::{Error, Grid, Result};

/// Index of a node inside a [`HierarchicalTree`]
pub type NodeId = usize;

/// An axis-aligned hyper-rectangle of cells, bounds inclusive on every axis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    lower: Vec<usize>,
    upper: Vec<usize>,
}

impl Region {
    /// Create a region from inclusive lower and upper corners
    pub fn new(lower: Vec<usize>, upper: Vec<usize>) -> Result<Self> {
        if lower.is_empty() || lower.len() != upper.len() {
            return Err(Error::size_mismatch(lower.len(), upper.len(), "region corners"));
        }
        if lower.iter().zip(&upper).any(|(lo, hi)| lo > hi) {
            return Err(Error::InvalidInput(format!(
                "region lower corner {lower:?} exceeds upper corner {upper:?}"
            )));
        }
        Ok(Self { lower, upper })
    }

    /// The region covering a whole grid of the given shape
    pub fn covering(shape: &[usize]) -> Result<Self> {
        if shape.contains(&0) {
            return Err(Error::empty_input("region"));
        }
        Self::new(vec![0; shape.len()], shape.iter().map(|&len| len - 1).collect())
    }

    /// Inclusive lower corner
    pub fn lower(&self) -> &[usize] {
        &self.lower
    }

    /// Inclusive upper corner
    pub fn upper(&self) -> &[usize] {
        &self.upper
    }

    /// Number of axes
    pub fn ndim(&self) -> usize {
        self.lower.len()
    }

    /// Number of cells along one axis
    pub fn extent(&self, axis: usize) -> usize {
        self.upper[axis] - self.lower[axis] + 1
    }

    /// Number of cells covered
    pub fn volume(&self) -> usize {
        (0..self.ndim()).map(|axis| self.extent(axis)).product()
    }

    /// Check if the region is a single cell
    pub fn is_cell(&self) -> bool {
        self.lower == self.upper
    }

    /// Check if `other` lies entirely inside this region
    pub fn contains(&self, other: &Region) -> bool {
        self.ndim() == other.ndim()
            && (0..self.ndim())
                .all(|a| self.lower[a] <= other.lower[a] && other.upper[a] <= self.upper[a])
    }

    /// Check if the two regions share at least one cell
    pub fn intersects(&self, other: &Region) -> bool {
        self.ndim() == other.ndim()
            && (0..self.ndim())
                .all(|a| self.lower[a] <= other.upper[a] && other.lower[a] <= self.upper[a])
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}..={:?}", self.lower, self.upper)
    }
}

/// A single node of the hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub(crate) region: Region,
    pub(crate) depth: usize,
    pub(crate) height: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) true_count: f64,
    pub(crate) noisy_count: Option<f64>,
    pub(crate) estimate: Option<f64>,
}

impl TreeNode {
    /// Cells this node counts
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Distance from the root (root is 0)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Distance to the leaves below (leaves are 0)
    pub fn height(&self) -> usize {
        self.height
    }

    /// Parent id, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids in region order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Check if the node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Exact sum of the padded domain over this node's region
    pub fn true_count(&self) -> f64 {
        self.true_count
    }

    /// Noised count, once the injector has visited this node
    pub fn noisy_count(&self) -> Option<f64> {
        self.noisy_count
    }

    /// Consistent estimate, once inference has run
    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TreeNode({}) = (count={}, noisy={:?}, estimate={:?})",
            self.region, self.true_count, self.noisy_count, self.estimate
        )
    }
}

/// A complete hierarchical decomposition of a padded domain
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalTree {
    pub(crate) nodes: Vec<TreeNode>,
    pub(crate) root: NodeId,
    pub(crate) arity: usize,
    pub(crate) height: usize,
    pub(crate) padded_shape: Vec<usize>,
}

impl HierarchicalTree {
    /// Id of the root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    /// All nodes in arena order (pre-order of construction)
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Per-axis branching factor
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Children per internal node (`arity^ndim`)
    pub fn fanout(&self) -> usize {
        self.arity.pow(self.padded_shape.len() as u32)
    }

    /// Number of splits from the root to any leaf
    pub fn height(&self) -> usize {
        self.height
    }

    /// Shape of the zero-padded domain the tree covers
    pub fn padded_shape(&self) -> &[usize] {
        &self.padded_shape
    }

    /// Number of padded cells
    pub fn padded_size(&self) -> usize {
        self.padded_shape.iter().product()
    }

    /// Ids of all leaves in arena order
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(move |&id| self.nodes[id].is_leaf())
    }

    /// Node ids, parents before children, children left to right
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        order
    }

    /// Node ids, children left to right before their parent
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, next_child)) = stack.pop() {
            let children = &self.nodes[id].children;
            if next_child == children.len() {
                order.push(id);
            } else {
                stack.push((id, next_child + 1));
                stack.push((children[next_child], 0));
            }
        }
        order
    }

    pub(crate) fn set_noisy_count(&mut self, id: NodeId, value: f64) -> Result<()> {
        let node = &mut self.nodes[id];
        if node.noisy_count.is_some() {
            return Err(Error::InvariantViolation(format!(
                "node {} was noised twice",
                node.region
            )));
        }
        node.noisy_count = Some(value);
        Ok(())
    }

    pub(crate) fn set_estimate(&mut self, id: NodeId, value: f64) -> Result<()> {
        let node = &mut self.nodes[id];
        if node.estimate.is_some() {
            return Err(Error::InvariantViolation(format!(
                "node {} was estimated twice",
                node.region
            )));
        }
        if !value.is_finite() {
            return Err(Error::non_finite("consistent estimate"));
        }
        node.estimate = Some(value);
        Ok(())
    }

    /// Check that every node's children tile its region exactly
    ///
    /// Children must lie inside the parent, be pairwise disjoint, and cover
    /// the parent's volume. Leaves must be single cells and the root must
    /// cover the padded domain.
    pub fn validate_partition(&self) -> Result<()> {
        let root = &self.nodes[self.root];
        if root.region != Region::covering(&self.padded_shape)? {
            return Err(Error::InvariantViolation(format!(
                "root region {} does not cover padded shape {:?}",
                root.region, self.padded_shape
            )));
        }

        for node in &self.nodes {
            if node.is_leaf() {
                if !node.region.is_cell() {
                    return Err(Error::InvariantViolation(format!(
                        "leaf {} spans more than one cell",
                        node.region
                    )));
                }
                continue;
            }

            let mut covered = 0usize;
            for (i, &child) in node.children.iter().enumerate() {
                let region = &self.nodes[child].region;
                if !node.region.contains(region) {
                    return Err(Error::InvariantViolation(format!(
                        "child {region} escapes parent {}",
                        node.region
                    )));
                }
                if self.nodes[child].depth != node.depth + 1 {
                    return Err(Error::InvariantViolation(format!(
                        "child {region} sits at depth {} under depth {}",
                        self.nodes[child].depth, node.depth
                    )));
                }
                for &sibling in &node.children[i + 1..] {
                    if region.intersects(&self.nodes[sibling].region) {
                        return Err(Error::InvariantViolation(format!(
                            "children {region} and {} overlap",
                            self.nodes[sibling].region
                        )));
                    }
                }
                covered += region.volume();
            }
            if covered != node.region.volume() {
                return Err(Error::InvariantViolation(format!(
                    "children of {} cover {covered} of {} cells",
                    node.region,
                    node.region.volume()
                )));
            }
        }
        Ok(())
    }

    /// Check that every internal estimate equals the sum of its children's
    ///
    /// `tolerance` is relative to the larger of the parent's magnitude and
    /// the sum of its children's magnitudes.
    pub fn check_additivity(&self, tolerance: f64) -> Result<()> {
        for node in self.nodes.iter().filter(|n| !n.is_leaf()) {
            let parent = node.estimate.ok_or_else(|| {
                Error::InvariantViolation(format!("node {} has no estimate", node.region))
            })?;
            let mut sum = 0.0;
            let mut magnitude = parent.abs();
            for &child in &node.children {
                let value = self.nodes[child].estimate.ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "node {} has no estimate",
                        self.nodes[child].region
                    ))
                })?;
                sum += value;
                magnitude += value.abs();
            }
            if (parent - sum).abs() > tolerance * magnitude.max(1.0) {
                return Err(Error::InvariantViolation(format!(
                    "node {} estimates {parent} but its children sum to {sum}",
                    node.region
                )));
            }
        }
        Ok(())
    }

    /// Leaf estimates laid out over the padded domain
    pub fn leaf_estimates(&self) -> Result<Grid> {
        let mut grid = Grid::zeros(self.padded_shape.clone())?;
        let mut filled = 0usize;
        for id in self.leaves() {
            let node = &self.nodes[id];
            let value = node.estimate.ok_or_else(|| {
                Error::InvariantViolation(format!("leaf {} was never estimated", node.region))
            })?;
            let cell = grid.get_mut(node.region.lower()).ok_or_else(|| {
                Error::InvariantViolation(format!("leaf {} outside padded domain", node.region))
            })?;
            *cell = value;
            filled += 1;
        }
        if filled != grid.len() {
            return Err(Error::InvariantViolation(format!(
                "{filled} leaves for {} padded cells",
                grid.len()
            )));
        }
        Ok(grid)
    }
}

impl fmt::Display for HierarchicalTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HierarchicalTree(arity={}, height={}, padded={:?}, nodes={})",
            self.arity,
            self.height,
            self.padded_shape,
            self.nodes.len()
        )
    }
}
