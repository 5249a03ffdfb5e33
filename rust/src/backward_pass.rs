//! Backward pass: latest start/end propagation from the project deadline.
//!
//! Every endpoint (a task no other task depends on) is handed the project
//! end. A task's latest start is its latest end minus its duration on the
//! business calendar, and that start becomes the candidate deadline of each of
//! its predecessors. A candidate is dropped when the recorded deadline is already
//! strictly earlier, so the final value is the minimum over all successors
//! regardless of visiting order.
//!
//! Containers are endpoints too (nothing lists a container as a predecessor),
//! so they push the project end onto their inherited predecessors. The values
//! recorded for them while doing so are scratch: once all leaves are fixed,
//! container dates are rederived as the span of their children.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::calendar::{is_after, BusinessCalendar};
use crate::config::ConfigError;
use crate::graph::{GraphError, TaskGraph, TaskIdx};
use crate::resolver::DependencyMap;
use crate::{log_changes, log_checks};

/// Errors that abort a scheduling run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The dependency graph loops back on itself. `chain` lists the tasks in
    /// traversal order (dependent before predecessor), ending with the task
    /// that closed the loop.
    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },
    /// Subtracting a task's duration left the representable date range.
    #[error("Date out of range while scheduling task {task}")]
    DateOutOfRange { task: String },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Latest dates for every task, indexed by [`TaskIdx`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestDates {
    pub latest_start: Vec<Option<NaiveDateTime>>,
    pub latest_end: Vec<Option<NaiveDateTime>>,
}

impl LatestDates {
    fn unset(n: usize) -> Self {
        Self {
            latest_start: vec![None; n],
            latest_end: vec![None; n],
        }
    }

    #[inline]
    pub fn start(&self, idx: TaskIdx) -> Option<NaiveDateTime> {
        self.latest_start[idx as usize]
    }

    #[inline]
    pub fn end(&self, idx: TaskIdx) -> Option<NaiveDateTime> {
        self.latest_end[idx as usize]
    }
}

/// Tasks with no successors, containers included, in snapshot order.
pub fn find_endpoints(graph: &TaskGraph<'_>, deps: &DependencyMap) -> Vec<TaskIdx> {
    graph
        .indices()
        .filter(|&idx| deps.successors(idx).is_empty())
        .collect()
}

enum Step {
    /// Offer `deadline` to `task` as a latest end.
    Enter {
        task: TaskIdx,
        deadline: NaiveDateTime,
    },
    /// The entered task's predecessors are done; take it off the path.
    Leave,
}

/// Run the backward pass over the whole graph.
///
/// Returns dates for every task (containers derived from their children), or
/// an error if the dependency graph has a cycle or a date leaves chrono's
/// range. No dates are returned on error.
pub fn backward_pass(
    graph: &TaskGraph<'_>,
    deps: &DependencyMap,
    calendar: &BusinessCalendar,
    project_end: NaiveDateTime,
    verbosity: u8,
) -> Result<LatestDates, ScheduleError> {
    let mut dates = LatestDates::unset(graph.len());
    let endpoints = find_endpoints(graph, deps);
    log_checks!(verbosity, "Endpoints: {}", endpoints.len());

    for &endpoint in &endpoints {
        propagate(
            graph,
            deps,
            calendar,
            &mut dates,
            endpoint,
            project_end,
            verbosity,
        )?;
    }

    // A leaf nobody reached hangs off a cycle with no endpoint downstream
    if let Some(stranded) = graph
        .indices()
        .find(|&idx| graph.is_leaf(idx) && dates.end(idx).is_none())
    {
        return Err(ScheduleError::CycleDetected {
            chain: unreachable_cycle(graph, deps, stranded),
        });
    }

    derive_containers(graph, &mut dates);

    log_changes!(
        verbosity,
        "Backward pass complete: {} tasks, {} endpoints",
        graph.len(),
        endpoints.len()
    );
    Ok(dates)
}

/// Depth-first propagation from one endpoint with an explicit stack.
///
/// `path` holds the tasks on the current branch only; a task is pushed when
/// entered and popped once all of its predecessors have been processed, so
/// reconverging DAG branches never see each other's visits.
fn propagate(
    graph: &TaskGraph<'_>,
    deps: &DependencyMap,
    calendar: &BusinessCalendar,
    dates: &mut LatestDates,
    endpoint: TaskIdx,
    project_end: NaiveDateTime,
    verbosity: u8,
) -> Result<(), ScheduleError> {
    let mut path: Vec<TaskIdx> = Vec::new();
    let mut on_path = vec![false; graph.len()];
    let mut stack = vec![Step::Enter {
        task: endpoint,
        deadline: project_end,
    }];

    while let Some(step) = stack.pop() {
        let (task, deadline) = match step {
            Step::Leave => {
                if let Some(done) = path.pop() {
                    on_path[done as usize] = false;
                }
                continue;
            }
            Step::Enter { task, deadline } => (task, deadline),
        };
        let i = task as usize;

        if on_path[i] {
            let chain = path
                .iter()
                .chain(std::iter::once(&task))
                .map(|&t| graph.qualified_name(t))
                .collect();
            return Err(ScheduleError::CycleDetected { chain });
        }

        if let Some(recorded) = dates.latest_end[i] {
            if is_after(recorded, deadline) {
                log_checks!(
                    verbosity,
                    "  keep {} end {} (offered {})",
                    graph.qualified_name(task),
                    recorded,
                    deadline
                );
                continue;
            }
        }

        let start = calendar
            .subtract(deadline, graph.duration(task))
            .ok_or_else(|| ScheduleError::DateOutOfRange {
                task: graph.qualified_name(task),
            })?;
        dates.latest_end[i] = Some(deadline);
        dates.latest_start[i] = Some(start);
        log_changes!(
            verbosity,
            "{}: latest start {}, latest end {}",
            graph.qualified_name(task),
            start,
            deadline
        );

        path.push(task);
        on_path[i] = true;
        stack.push(Step::Leave);
        for &pred in deps.predecessors(task).iter().rev() {
            stack.push(Step::Enter {
                task: pred,
                deadline: start,
            });
        }
    }

    Ok(())
}

/// Follow successors from a stranded leaf until a task repeats.
///
/// Every successor of a stranded leaf is stranded too (otherwise propagation
/// would have reached it), and each has a leaf successor through hierarchy
/// inheritance, so the walk ends on a loop. The loop is reported in
/// traversal order: dependent first.
fn unreachable_cycle(graph: &TaskGraph<'_>, deps: &DependencyMap, start: TaskIdx) -> Vec<String> {
    let mut walk: Vec<TaskIdx> = Vec::new();
    let mut position = vec![None; graph.len()];
    let mut current = start;

    loop {
        if let Some(first) = position[current as usize] {
            let mut cycle: Vec<TaskIdx> = walk[first..].to_vec();
            cycle.push(current);
            cycle.reverse();
            return cycle.iter().map(|&t| graph.qualified_name(t)).collect();
        }
        position[current as usize] = Some(walk.len());
        walk.push(current);

        let next = deps
            .successors(current)
            .iter()
            .copied()
            .find(|&s| graph.is_leaf(s));
        match next {
            Some(next) => current = next,
            None => return walk.iter().map(|&t| graph.qualified_name(t)).collect(),
        }
    }
}

/// Fill container dates bottom-up: earliest child start, latest child end.
///
/// Overwrites whatever propagation recorded for the container as an endpoint.
fn derive_containers(graph: &TaskGraph<'_>, dates: &mut LatestDates) {
    for &idx in graph.top_down().iter().rev() {
        let children = graph.children(idx);
        if children.is_empty() {
            continue;
        }
        let start = children.iter().filter_map(|&c| dates.start(c)).min();
        let end = children.iter().filter_map(|&c| dates.end(c)).max();
        dates.latest_start[idx as usize] = start;
        dates.latest_end[idx as usize] = end;
    }
}
