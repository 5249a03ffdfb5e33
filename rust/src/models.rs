//! Core data types for the latest-date scheduler.

use chrono::NaiveDateTime;
use pyo3::prelude::*;

/// An explicit dependency: `dependent_id` cannot finish before `predecessor_id`.
///
/// The task store attaches the same pair to both ends of the edge, so a task
/// only honours the pairs where it is the dependent.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    #[pyo3(get, set)]
    pub dependent_id: String,
    #[pyo3(get, set)]
    pub predecessor_id: String,
}

impl Dependency {
    pub fn between(dependent_id: impl Into<String>, predecessor_id: impl Into<String>) -> Self {
        Self {
            dependent_id: dependent_id.into(),
            predecessor_id: predecessor_id.into(),
        }
    }
}

#[pymethods]
impl Dependency {
    #[new]
    fn new(dependent_id: String, predecessor_id: String) -> Self {
        Self::between(dependent_id, predecessor_id)
    }

    fn __repr__(&self) -> String {
        format!(
            "Dependency(dependent_id={:?}, predecessor_id={:?})",
            self.dependent_id, self.predecessor_id
        )
    }
}

/// A task record from the project plan snapshot.
#[pyclass]
#[derive(Clone, Debug)]
pub struct Task {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub parent_id: Option<String>,
    /// Sibling ordering key.
    #[pyo3(get, set)]
    pub order_index: f64,
    #[pyo3(get, set)]
    pub dependencies: Vec<Dependency>,
    /// Trade / category label; inherited from the nearest ancestor when absent.
    #[pyo3(get, set)]
    pub category: Option<String>,
    /// Work estimate in milliseconds. Only meaningful for leaf tasks.
    #[pyo3(get, set)]
    pub duration_millis: Option<i64>,
}

impl Task {
    /// Create a root task with no dependencies, category or estimate.
    pub fn named(id: impl Into<String>, name: impl Into<String>, order_index: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            order_index,
            dependencies: Vec::new(),
            category: None,
            duration_millis: None,
        }
    }

    /// Predecessor ids declared by this task itself.
    pub fn explicit_predecessor_ids(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(move |d| d.dependent_id == self.id)
            .map(|d| d.predecessor_id.as_str())
    }
}

#[pymethods]
impl Task {
    #[new]
    #[pyo3(signature = (
        id,
        name,
        order_index,
        parent_id=None,
        dependencies=Vec::new(),
        category=None,
        duration_millis=None
    ))]
    fn new(
        id: String,
        name: String,
        order_index: f64,
        parent_id: Option<String>,
        dependencies: Vec<Dependency>,
        category: Option<String>,
        duration_millis: Option<i64>,
    ) -> Self {
        Self {
            id,
            name,
            parent_id,
            order_index,
            dependencies,
            category,
            duration_millis,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(id={:?}, name={:?}, parent={:?}, order={}, deps={})",
            self.id,
            self.name,
            self.parent_id,
            self.order_index,
            self.dependencies.len()
        )
    }
}

/// Computed latest dates and resolved relations for one task.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct TaskSchedule {
    #[pyo3(get)]
    pub id: String,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub parent_name: Option<String>,
    #[pyo3(get)]
    pub order_index: f64,
    /// Effective category (own or inherited).
    #[pyo3(get)]
    pub category: Option<String>,
    #[pyo3(get)]
    pub latest_start: Option<NaiveDateTime>,
    #[pyo3(get)]
    pub latest_end: Option<NaiveDateTime>,
    #[pyo3(get)]
    pub predecessor_names: Vec<String>,
    #[pyo3(get)]
    pub successor_names: Vec<String>,
    #[pyo3(get)]
    pub is_leaf: bool,
}

#[pymethods]
impl TaskSchedule {
    fn __repr__(&self) -> String {
        format!(
            "TaskSchedule(id={:?}, start={:?}, end={:?})",
            self.id, self.latest_start, self.latest_end
        )
    }
}

/// Payload pushed back to the task store for one task.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitPayload {
    #[pyo3(get)]
    pub task_id: String,
    #[pyo3(get)]
    pub start_date_time: bool,
    #[pyo3(get)]
    pub due_date_time: bool,
    /// Latest start as epoch milliseconds.
    #[pyo3(get)]
    pub start_date: i64,
    /// Latest end as epoch milliseconds.
    #[pyo3(get)]
    pub due_date: i64,
}

#[pymethods]
impl CommitPayload {
    fn __repr__(&self) -> String {
        format!(
            "CommitPayload(task_id={:?}, start_date={}, due_date={})",
            self.task_id, self.start_date, self.due_date
        )
    }
}

/// Result of one scheduling run, in snapshot order.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScheduleResult {
    #[pyo3(get)]
    pub tasks: Vec<TaskSchedule>,
    /// Ids of the tasks propagation started from.
    #[pyo3(get)]
    pub endpoints: Vec<String>,
}

impl ScheduleResult {
    pub fn find(&self, task_id: &str) -> Option<&TaskSchedule> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Build push-back payloads. Instants are interpreted as UTC; tasks
    /// without dates are skipped.
    pub fn build_commit_payloads(&self) -> Vec<CommitPayload> {
        self.tasks
            .iter()
            .filter_map(|t| match (t.latest_start, t.latest_end) {
                (Some(start), Some(end)) => Some(CommitPayload {
                    task_id: t.id.clone(),
                    start_date_time: true,
                    due_date_time: true,
                    start_date: start.and_utc().timestamp_millis(),
                    due_date: end.and_utc().timestamp_millis(),
                }),
                _ => None,
            })
            .collect()
    }
}

#[pymethods]
impl ScheduleResult {
    /// Look up the schedule of a task by id.
    fn get(&self, task_id: &str) -> Option<TaskSchedule> {
        self.find(task_id).cloned()
    }

    fn commit_payloads(&self) -> Vec<CommitPayload> {
        self.build_commit_payloads()
    }

    fn __len__(&self) -> usize {
        self.tasks.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleResult(tasks={}, endpoints={})",
            self.tasks.len(),
            self.endpoints.len()
        )
    }
}
