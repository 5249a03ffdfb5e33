//! Task graph snapshot: indexed hierarchy, categories and durations.
//!
//! Built once per run from the task records. All parent/children/category
//! lookups are array indexed by [`TaskIdx`]; string ids are only touched
//! while building the index.

use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::VecDeque;
use thiserror::Error;

use crate::config::MissingDurationPolicy;
use crate::models::Task;

/// Dense task index (u32 for compact storage and fast hashing).
pub type TaskIdx = u32;

/// Errors raised while building the snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),
    #[error("Task {task} depends on unknown task {referenced}")]
    UnknownTask { task: String, referenced: String },
    #[error("Parent links of task {0} form a cycle")]
    HierarchyCycle(String),
    #[error("Task {task} has a negative duration estimate ({millis} ms)")]
    InvalidDuration { task: String, millis: i64 },
    #[error("Task '{name}' ({task}) has no time estimate")]
    MissingDuration { task: String, name: String },
}

/// Immutable, indexed view over one snapshot of task records.
#[derive(Debug)]
pub struct TaskGraph<'a> {
    tasks: &'a [Task],
    index: FxHashMap<&'a str, TaskIdx>,
    parents: Vec<Option<TaskIdx>>,
    /// Children per task, sorted by (order_index, id).
    children: Vec<Vec<TaskIdx>>,
    /// Root tasks, sorted by (order_index, id).
    roots: Vec<TaskIdx>,
    /// Every task, parents before children.
    top_down: Vec<TaskIdx>,
    categories: Vec<Option<&'a str>>,
    durations: Vec<i64>,
}

impl<'a> TaskGraph<'a> {
    /// Index the snapshot, resolve categories and durations.
    ///
    /// A parent id absent from the snapshot makes the task a root.
    pub fn new(tasks: &'a [Task], policy: MissingDurationPolicy) -> Result<Self, GraphError> {
        let n = tasks.len();
        let mut index: FxHashMap<&str, TaskIdx> =
            FxHashMap::with_capacity_and_hasher(n, Default::default());
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.id.as_str(), i as TaskIdx).is_some() {
                return Err(GraphError::DuplicateTask(task.id.clone()));
            }
        }

        let parents: Vec<Option<TaskIdx>> = tasks
            .iter()
            .map(|t| t.parent_id.as_deref().and_then(|p| index.get(p).copied()))
            .collect();

        let mut children: Vec<Vec<TaskIdx>> = vec![Vec::new(); n];
        let mut roots: Vec<TaskIdx> = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) => children[*p as usize].push(i as TaskIdx),
                None => roots.push(i as TaskIdx),
            }
        }
        let by_order = |a: &TaskIdx, b: &TaskIdx| cmp_tasks(&tasks[*a as usize], &tasks[*b as usize]);
        for list in &mut children {
            list.sort_by(by_order);
        }
        roots.sort_by(by_order);

        // Breadth-first from the roots; anything unreached sits on a parent cycle
        let mut top_down: Vec<TaskIdx> = Vec::with_capacity(n);
        let mut queue: VecDeque<TaskIdx> = roots.iter().copied().collect();
        while let Some(idx) = queue.pop_front() {
            top_down.push(idx);
            queue.extend(children[idx as usize].iter().copied());
        }
        if top_down.len() != n {
            let mut reached = vec![false; n];
            for &idx in &top_down {
                reached[idx as usize] = true;
            }
            let stuck = reached.iter().position(|r| !r).unwrap_or(0);
            return Err(GraphError::HierarchyCycle(tasks[stuck].id.clone()));
        }

        let mut categories: Vec<Option<&str>> = vec![None; n];
        for &idx in &top_down {
            let i = idx as usize;
            categories[i] = match tasks[i].category.as_deref() {
                Some(own) => Some(own),
                None => parents[i].and_then(|p| categories[p as usize]),
            };
        }

        let mut durations = vec![0_i64; n];
        for (i, task) in tasks.iter().enumerate() {
            if !children[i].is_empty() {
                continue;
            }
            durations[i] = match task.duration_millis {
                Some(millis) if millis < 0 => {
                    return Err(GraphError::InvalidDuration {
                        task: task.id.clone(),
                        millis,
                    })
                }
                Some(millis) => millis,
                None => match policy {
                    MissingDurationPolicy::Zero => 0,
                    MissingDurationPolicy::Error => {
                        return Err(GraphError::MissingDuration {
                            task: task.id.clone(),
                            name: task.name.clone(),
                        })
                    }
                },
            };
        }

        Ok(Self {
            tasks,
            index,
            parents,
            children,
            roots,
            top_down,
            categories,
            durations,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[inline]
    pub fn task(&self, idx: TaskIdx) -> &'a Task {
        &self.tasks[idx as usize]
    }

    #[inline]
    pub fn idx_of(&self, id: &str) -> Option<TaskIdx> {
        self.index.get(id).copied()
    }

    /// All task indices in snapshot order.
    pub fn indices(&self) -> impl Iterator<Item = TaskIdx> {
        0..self.tasks.len() as TaskIdx
    }

    #[inline]
    pub fn parent(&self, idx: TaskIdx) -> Option<TaskIdx> {
        self.parents[idx as usize]
    }

    #[inline]
    pub fn children(&self, idx: TaskIdx) -> &[TaskIdx] {
        &self.children[idx as usize]
    }

    #[inline]
    pub fn is_leaf(&self, idx: TaskIdx) -> bool {
        self.children[idx as usize].is_empty()
    }

    /// Tasks sharing `idx`'s parent (all roots for a root), including `idx`.
    pub fn sibling_group(&self, idx: TaskIdx) -> &[TaskIdx] {
        match self.parent(idx) {
            Some(p) => self.children(p),
            None => &self.roots,
        }
    }

    /// Every task ordered so that parents precede their children.
    pub fn top_down(&self) -> &[TaskIdx] {
        &self.top_down
    }

    /// Leaf descendants of `idx`, or `idx` itself when it is a leaf.
    pub fn leaves_of(&self, idx: TaskIdx) -> Vec<TaskIdx> {
        let mut leaves = Vec::new();
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            let kids = self.children(current);
            if kids.is_empty() {
                leaves.push(current);
            } else {
                stack.extend(kids.iter().rev().copied());
            }
        }
        leaves
    }

    /// Effective category: own label, else the nearest labelled ancestor's.
    #[inline]
    pub fn category(&self, idx: TaskIdx) -> Option<&'a str> {
        self.categories[idx as usize]
    }

    /// Scheduling duration in milliseconds; zero for containers.
    #[inline]
    pub fn duration(&self, idx: TaskIdx) -> i64 {
        self.durations[idx as usize]
    }

    pub fn parent_name(&self, idx: TaskIdx) -> Option<&'a str> {
        self.parent(idx).map(|p| self.task(p).name.as_str())
    }

    /// Display name qualified by the containing task, e.g. `Shell / Walls`.
    pub fn qualified_name(&self, idx: TaskIdx) -> String {
        match self.parent_name(idx) {
            Some(parent) => format!("{} / {}", parent, self.task(idx).name),
            None => self.task(idx).name.clone(),
        }
    }

    /// Compare two tasks by (order_index, id).
    #[inline]
    pub fn cmp_order(&self, a: TaskIdx, b: TaskIdx) -> Ordering {
        cmp_tasks(self.task(a), self.task(b))
    }
}

fn cmp_tasks(a: &Task, b: &Task) -> Ordering {
    a.order_index
        .total_cmp(&b.order_index)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(id: &str, parent: Option<&str>, order: f64) -> Task {
        let mut task = Task::named(id, id.to_uppercase(), order);
        task.parent_id = parent.map(str::to_string);
        task.duration_millis = Some(1_000);
        task
    }

    fn ids(graph: &TaskGraph, idxs: &[TaskIdx]) -> Vec<String> {
        idxs.iter().map(|&i| graph.task(i).id.clone()).collect()
    }

    #[test]
    fn test_children_sorted_by_order_then_id() {
        let tasks = vec![
            make_task("p", None, 1.0),
            make_task("c", Some("p"), 2.0),
            make_task("b", Some("p"), 1.0),
            make_task("a", Some("p"), 2.0),
        ];
        let graph = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap();
        let p = graph.idx_of("p").unwrap();
        assert_eq!(ids(&graph, graph.children(p)), vec!["b", "a", "c"]);
        assert!(!graph.is_leaf(p));
        assert!(graph.is_leaf(graph.idx_of("a").unwrap()));
    }

    #[test]
    fn test_leaves_of_nested_container() {
        let tasks = vec![
            make_task("root", None, 1.0),
            make_task("mid", Some("root"), 1.0),
            make_task("x", Some("mid"), 1.0),
            make_task("y", Some("mid"), 2.0),
            make_task("z", Some("root"), 2.0),
        ];
        let graph = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap();
        let root = graph.idx_of("root").unwrap();
        assert_eq!(ids(&graph, &graph.leaves_of(root)), vec!["x", "y", "z"]);
        let x = graph.idx_of("x").unwrap();
        assert_eq!(graph.leaves_of(x), vec![x]);
    }

    #[test]
    fn test_category_inherited_from_nearest_ancestor() {
        let mut tasks = vec![
            make_task("root", None, 1.0),
            make_task("mid", Some("root"), 1.0),
            make_task("leaf", Some("mid"), 1.0),
            make_task("own", Some("mid"), 2.0),
            make_task("bare", None, 2.0),
        ];
        tasks[0].category = Some("Masonry".to_string());
        tasks[3].category = Some("Plumbing".to_string());
        let graph = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap();
        assert_eq!(graph.category(graph.idx_of("leaf").unwrap()), Some("Masonry"));
        assert_eq!(graph.category(graph.idx_of("own").unwrap()), Some("Plumbing"));
        assert_eq!(graph.category(graph.idx_of("bare").unwrap()), None);
    }

    #[test]
    fn test_container_duration_is_zero() {
        let mut tasks = vec![make_task("p", None, 1.0), make_task("c", Some("p"), 1.0)];
        tasks[0].duration_millis = Some(99_000);
        let graph = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap();
        assert_eq!(graph.duration(graph.idx_of("p").unwrap()), 0);
        assert_eq!(graph.duration(graph.idx_of("c").unwrap()), 1_000);
    }

    #[test]
    fn test_missing_duration_policies() {
        let mut tasks = vec![make_task("a", None, 1.0)];
        tasks[0].duration_millis = None;

        let graph = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap();
        assert_eq!(graph.duration(0), 0);

        let err = TaskGraph::new(&tasks, MissingDurationPolicy::Error).unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingDuration {
                task: "a".to_string(),
                name: "A".to_string()
            }
        );
    }

    #[test]
    fn test_missing_duration_on_container_is_fine_under_error_policy() {
        let mut tasks = vec![make_task("p", None, 1.0), make_task("c", Some("p"), 1.0)];
        tasks[0].duration_millis = None;
        assert!(TaskGraph::new(&tasks, MissingDurationPolicy::Error).is_ok());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let mut tasks = vec![make_task("a", None, 1.0)];
        tasks[0].duration_millis = Some(-5);
        let err = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap_err();
        assert!(matches!(err, GraphError::InvalidDuration { millis: -5, .. }));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let tasks = vec![make_task("a", None, 1.0), make_task("a", None, 2.0)];
        let err = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap_err();
        assert_eq!(err, GraphError::DuplicateTask("a".to_string()));
    }

    #[test]
    fn test_unknown_parent_becomes_root() {
        let tasks = vec![make_task("a", Some("elsewhere"), 1.0), make_task("b", None, 2.0)];
        let graph = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap();
        let a = graph.idx_of("a").unwrap();
        assert_eq!(graph.parent(a), None);
        assert_eq!(ids(&graph, graph.sibling_group(a)), vec!["a", "b"]);
    }

    #[test]
    fn test_parent_cycle_rejected() {
        let tasks = vec![
            make_task("a", Some("b"), 1.0),
            make_task("b", Some("a"), 1.0),
            make_task("c", None, 1.0),
        ];
        let err = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap_err();
        assert_eq!(err, GraphError::HierarchyCycle("a".to_string()));
    }

    #[test]
    fn test_qualified_name_and_top_down_order() {
        let tasks = vec![make_task("c", Some("p"), 1.0), make_task("p", None, 1.0)];
        let graph = TaskGraph::new(&tasks, MissingDurationPolicy::Zero).unwrap();
        let c = graph.idx_of("c").unwrap();
        assert_eq!(graph.qualified_name(c), "P / C");
        assert_eq!(ids(&graph, graph.top_down()), vec!["p", "c"]);
    }
}
