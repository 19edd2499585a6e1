//! Lazy traversal from a root concept along descendant edges.

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::str::FromStr;

use cohort_model::ConceptId;
use petgraph::graph::NodeIndex;
use petgraph::Direction;

use crate::error::{HierarchyError, HierarchyResult};
use crate::graph::ConceptHierarchy;
use crate::node::ConceptNode;

/// Visiting order of [`ConceptHierarchy::iter_nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Breadth-first.
    Bfs,
    /// Depth-first, last child first.
    Dfs,
}

impl FromStr for TraversalOrder {
    type Err = HierarchyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bfs" => Ok(Self::Bfs),
            "dfs" => Ok(Self::Dfs),
            other => Err(HierarchyError::UnsupportedOrder(other.to_string())),
        }
    }
}

/// Iterator over the concepts reachable from a root.
///
/// Path traversal yields a concept once per incoming path, so a diamond
/// yields its bottom twice. Unique traversal tracks visited concepts and
/// yields each at most once. Either way a child already on the path from
/// the root is skipped, so merged hierarchies with cycles still terminate.
pub struct NodeIter<'a> {
    hierarchy: &'a ConceptHierarchy,
    order: TraversalOrder,
    /// Pending concepts with the path from the root, themselves included.
    frontier: VecDeque<(NodeIndex, Rc<[NodeIndex]>)>,
    visited: Option<HashSet<NodeIndex>>,
}

impl<'a> NodeIter<'a> {
    fn next_entry(&mut self) -> Option<(NodeIndex, Rc<[NodeIndex]>)> {
        match self.order {
            TraversalOrder::Bfs => self.frontier.pop_front(),
            TraversalOrder::Dfs => self.frontier.pop_back(),
        }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = ConceptNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, path) = self.next_entry()?;
            if let Some(visited) = self.visited.as_mut() {
                if !visited.insert(index) {
                    continue;
                }
            }
            for child in self.hierarchy.neighbors(index, Direction::Outgoing) {
                if path.contains(&child) {
                    continue;
                }
                let child_path: Rc<[NodeIndex]> =
                    path.iter().copied().chain(std::iter::once(child)).collect();
                self.frontier.push_back((child, child_path));
            }
            return Some(ConceptNode::new(self.hierarchy, index));
        }
    }
}

impl ConceptHierarchy {
    /// Walks the descendants of `root`, including `root` itself first.
    ///
    /// Concepts reachable along several paths are yielded once per path.
    pub fn iter_nodes(
        &self,
        root: ConceptId,
        order: TraversalOrder,
    ) -> HierarchyResult<NodeIter<'_>> {
        self.start(root, order, false)
    }

    /// Like [`iter_nodes`](Self::iter_nodes) but yields each concept once.
    pub fn iter_unique_nodes(
        &self,
        root: ConceptId,
        order: TraversalOrder,
    ) -> HierarchyResult<NodeIter<'_>> {
        self.start(root, order, true)
    }

    fn start(
        &self,
        root: ConceptId,
        order: TraversalOrder,
        unique: bool,
    ) -> HierarchyResult<NodeIter<'_>> {
        let index = self
            .index_of(root)
            .ok_or(HierarchyError::RootNotFound(root))?;
        Ok(NodeIter {
            hierarchy: self,
            order,
            frontier: VecDeque::from([(index, Rc::from(vec![index]))]),
            visited: unique.then(HashSet::new),
        })
    }
}
