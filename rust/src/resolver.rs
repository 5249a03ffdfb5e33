//! Dependency resolution: effective predecessor and successor sets.
//!
//! A task's predecessors combine, in this order:
//! 1. its explicit dependencies, each expanded to the leaves of its subtree;
//! 2. every predecessor of its parent (hierarchy inheritance);
//! 3. the closest earlier sibling of the same category, expanded to leaves.
//!
//! The list is then de-duplicated (first occurrence wins) and stably sorted
//! by (order_index, id). Both maps are computed once per run.

use rustc_hash::FxHashSet;

use crate::graph::{GraphError, TaskGraph, TaskIdx};
use crate::log_debug;

/// Predecessor and successor lists for every task, indexed by [`TaskIdx`].
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    predecessors: Vec<Vec<TaskIdx>>,
    successors: Vec<Vec<TaskIdx>>,
}

impl DependencyMap {
    /// Resolve predecessors for every task, then invert them into successors.
    pub fn resolve(graph: &TaskGraph<'_>, verbosity: u8) -> Result<Self, GraphError> {
        let n = graph.len();
        let mut predecessors: Vec<Vec<TaskIdx>> = vec![Vec::new(); n];

        // Parents first, so inherited lists are already final when read
        for &idx in graph.top_down() {
            let task = graph.task(idx);
            let mut collected: Vec<TaskIdx> = Vec::new();

            for pred_id in task.explicit_predecessor_ids() {
                let pred = graph.idx_of(pred_id).ok_or_else(|| GraphError::UnknownTask {
                    task: task.id.clone(),
                    referenced: pred_id.to_string(),
                })?;
                collected.extend(graph.leaves_of(pred));
            }

            if let Some(parent) = graph.parent(idx) {
                collected.extend(predecessors[parent as usize].iter().copied());
            }

            if let Some(sibling) = category_predecessor(graph, idx) {
                log_debug!(
                    verbosity,
                    "  {} follows {} (category {:?})",
                    graph.qualified_name(idx),
                    graph.qualified_name(sibling),
                    graph.category(idx)
                );
                collected.extend(graph.leaves_of(sibling));
            }

            let mut seen: FxHashSet<TaskIdx> = FxHashSet::default();
            collected.retain(|p| seen.insert(*p));
            collected.sort_by(|a, b| graph.cmp_order(*a, *b));

            log_debug!(
                verbosity,
                "Predecessors of {}: [{}]",
                graph.qualified_name(idx),
                collected
                    .iter()
                    .map(|&p| graph.task(p).name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            predecessors[idx as usize] = collected;
        }

        let mut successors: Vec<Vec<TaskIdx>> = vec![Vec::new(); n];
        for idx in graph.indices() {
            for &pred in &predecessors[idx as usize] {
                successors[pred as usize].push(idx);
            }
        }
        for list in &mut successors {
            list.sort_by(|a, b| graph.cmp_order(*a, *b));
        }

        Ok(Self {
            predecessors,
            successors,
        })
    }

    /// Effective predecessors, sorted by (order_index, id).
    #[inline]
    pub fn predecessors(&self, idx: TaskIdx) -> &[TaskIdx] {
        &self.predecessors[idx as usize]
    }

    /// Tasks that list `idx` among their predecessors.
    #[inline]
    pub fn successors(&self, idx: TaskIdx) -> &[TaskIdx] {
        &self.successors[idx as usize]
    }
}

/// The sibling with the greatest order strictly below `idx`'s that shares its
/// (defined) category.
///
/// Serializes same-category work so one crew does one job at a time. Tasks
/// without a category are never linked this way. A container found here is
/// expanded to its leaves by the caller, like an explicit dependency on one.
fn category_predecessor(graph: &TaskGraph<'_>, idx: TaskIdx) -> Option<TaskIdx> {
    let category = graph.category(idx)?;
    let order = graph.task(idx).order_index;
    graph
        .sibling_group(idx)
        .iter()
        .rev()
        .copied()
        .find(|&s| {
            s != idx && graph.task(s).order_index < order && graph.category(s) == Some(category)
        })
}
