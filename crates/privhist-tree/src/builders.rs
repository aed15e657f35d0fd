//! Complete tree construction over a zero-padded domain

use privhist_core::{math, Domain, Error, Grid, Result};
use tracing::debug;

use crate::types::{HierarchicalTree, NodeId, Region, TreeNode};

/// Builds the complete hierarchy of a domain for a given per-axis arity
///
/// Every axis is padded with zeros to `arity^height`, where `height` is the
/// exact ceiling logarithm of the longest axis. Each internal node is cut
/// into `arity` near-equal parts per axis, and the cartesian product of those
/// parts gives its children.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder {
    arity: usize,
}

impl TreeBuilder {
    /// Create a builder, rejecting arities below 2
    pub fn new(arity: usize) -> Result<Self> {
        if arity < 2 {
            return Err(Error::InvalidInput(format!(
                "arity must be at least 2, got {arity}"
            )));
        }
        Ok(Self { arity })
    }

    /// Per-axis branching factor
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Tree height needed to cover `domain`
    pub fn height_for(&self, domain: &Domain) -> Result<usize> {
        let longest = domain.shape().iter().copied().max().unwrap_or(0);
        Ok(math::ceil_log(longest, self.arity)? as usize)
    }

    /// Build the tree, computing every node's true count
    pub fn build(&self, domain: &Domain) -> Result<HierarchicalTree> {
        let height = self.height_for(domain)?;
        let side = math::checked_pow(self.arity, height as u32)?;
        let padded_shape = vec![side; domain.ndim()];
        let padded = domain.padded(&padded_shape)?;

        debug!(
            arity = self.arity,
            height,
            original = ?domain.shape(),
            padded = ?padded_shape,
            "building hierarchy"
        );

        let mut nodes = Vec::new();
        let root_region = Region::covering(&padded_shape)?;
        let root = self.build_node(&mut nodes, &padded, root_region, 0, height, None)?;

        let tree = HierarchicalTree {
            nodes,
            root,
            arity: self.arity,
            height,
            padded_shape,
        };
        tree.validate_partition()?;
        Ok(tree)
    }

    fn build_node(
        &self,
        nodes: &mut Vec<TreeNode>,
        padded: &Grid,
        region: Region,
        depth: usize,
        tree_height: usize,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let id = nodes.len();
        let is_cell = region.is_cell();
        nodes.push(TreeNode {
            region: region.clone(),
            depth,
            height: tree_height.saturating_sub(depth),
            parent,
            children: Vec::new(),
            true_count: 0.0,
            noisy_count: None,
            estimate: None,
        });

        if is_cell {
            if depth != tree_height {
                return Err(Error::InvariantViolation(format!(
                    "leaf {region} at depth {depth} in a tree of height {tree_height}"
                )));
            }
            nodes[id].true_count = padded.get(region.lower()).ok_or_else(|| {
                Error::InvariantViolation(format!("leaf {region} outside padded domain"))
            })?;
            return Ok(id);
        }

        let mut total = 0.0;
        for child_region in self.split(&region)? {
            let child = self.build_node(nodes, padded, child_region, depth + 1, tree_height, Some(id))?;
            total += nodes[child].true_count;
            nodes[id].children.push(child);
        }
        nodes[id].true_count = total;
        Ok(id)
    }

    /// Cut a region into its child regions, first axis outermost
    pub fn split(&self, region: &Region) -> Result<Vec<Region>> {
        let per_axis: Vec<Vec<(usize, usize)>> = (0..region.ndim())
            .map(|axis| split_range(region.lower()[axis], region.upper()[axis], self.arity))
            .collect();

        let mut children = Vec::new();
        let mut index = vec![0usize; per_axis.len()];
        loop {
            let lower = index.iter().zip(&per_axis).map(|(&i, parts)| parts[i].0).collect();
            let upper = index.iter().zip(&per_axis).map(|(&i, parts)| parts[i].1).collect();
            children.push(Region::new(lower, upper)?);

            // Odometer over the per-axis parts, last axis fastest
            let mut axis = per_axis.len();
            loop {
                if axis == 0 {
                    return Ok(children);
                }
                axis -= 1;
                index[axis] += 1;
                if index[axis] < per_axis[axis].len() {
                    break;
                }
                index[axis] = 0;
            }
        }
    }
}

/// Split the inclusive range `[lower, upper]` into `parts` near-equal pieces
///
/// The first `len % parts` pieces get one extra cell. Empty pieces (only
/// possible when the range is shorter than `parts`) are dropped.
pub fn split_range(lower: usize, upper: usize, parts: usize) -> Vec<(usize, usize)> {
    let len = upper - lower + 1;
    let base = len / parts;
    let extra = len % parts;

    let mut pieces = Vec::with_capacity(parts.min(len));
    let mut start = lower;
    for i in 0..parts {
        let size = base + usize::from(i < extra);
        if size == 0 {
            continue;
        }
        pieces.push((start, start + size - 1));
        start += size;
    }
    pieces
}
