//! Latest-date scheduling for hierarchical project plans.
//!
//! Given a snapshot of tasks (hierarchy, explicit dependencies, sibling order,
//! trade category, work estimate) and a fixed project end, computes for every
//! task the latest start and finish that still meet the deadline on an
//! 8-hour-workday calendar.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDateTime;
use pyo3::prelude::*;

pub mod backward_pass;
pub mod calendar;
mod config;
pub mod graph;
pub mod logging;
mod models;
pub mod report;
pub mod resolver;

pub use backward_pass::{backward_pass, find_endpoints, LatestDates, ScheduleError};
pub use calendar::{is_after, BusinessCalendar, WeekendPolicy, WORKDAY_MILLIS};
pub use config::{ConfigError, MissingDurationPolicy, ScheduleConfig};
pub use graph::{GraphError, TaskGraph, TaskIdx};
pub use models::{CommitPayload, Dependency, ScheduleResult, Task, TaskSchedule};
pub use report::render_report;
pub use resolver::DependencyMap;

/// Compute latest start and end dates for every task in the snapshot.
///
/// Runs the whole pipeline: snapshot indexing, dependency resolution, the
/// backward pass and container aggregation. Any error aborts the run; no
/// partial schedule is returned.
pub fn schedule_latest(
    tasks: &[Task],
    config: &ScheduleConfig,
) -> Result<ScheduleResult, ScheduleError> {
    let verbosity = config.verbosity;
    let policy = config.missing_duration_policy()?;

    let graph = TaskGraph::new(tasks, policy)?;
    let deps = DependencyMap::resolve(&graph, verbosity)?;
    let dates = backward_pass(
        &graph,
        &deps,
        &config.calendar(),
        config.project_end,
        verbosity,
    )?;

    let names = |idxs: &[TaskIdx]| -> Vec<String> {
        idxs.iter().map(|&i| graph.task(i).name.clone()).collect()
    };

    let schedules = graph
        .indices()
        .map(|idx| {
            let task = graph.task(idx);
            TaskSchedule {
                id: task.id.clone(),
                name: task.name.clone(),
                parent_name: graph.parent_name(idx).map(str::to_string),
                order_index: task.order_index,
                category: graph.category(idx).map(str::to_string),
                latest_start: dates.start(idx),
                latest_end: dates.end(idx),
                predecessor_names: names(deps.predecessors(idx)),
                successor_names: names(deps.successors(idx)),
                is_leaf: graph.is_leaf(idx),
            }
        })
        .collect();

    let endpoints = find_endpoints(&graph, &deps)
        .into_iter()
        .map(|idx| graph.task(idx).id.clone())
        .collect();

    Ok(ScheduleResult {
        tasks: schedules,
        endpoints,
    })
}

/// Compute latest start and end dates for every task.
///
/// # Arguments
/// * `tasks` - Snapshot of all tasks in the plan
/// * `config` - Project end date and run policies
///
/// # Returns
/// * ScheduleResult with one entry per task, in input order
///
/// # Raises
/// * ValueError on a dependency cycle, an invalid snapshot, an unknown policy
///   or a date pushed out of range by a huge estimate
#[pyfunction]
fn run_latest_schedule(tasks: Vec<Task>, config: ScheduleConfig) -> PyResult<ScheduleResult> {
    schedule_latest(&tasks, &config)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

/// Subtract `duration_millis` of working time from `instant`.
#[pyfunction]
#[pyo3(signature = (instant, duration_millis, skip_weekends=true))]
fn subtract_work_time(
    instant: NaiveDateTime,
    duration_millis: i64,
    skip_weekends: bool,
) -> PyResult<NaiveDateTime> {
    if duration_millis < 0 {
        return Err(pyo3::exceptions::PyValueError::new_err(format!(
            "duration must be non-negative, got {} ms",
            duration_millis
        )));
    }
    let calendar = BusinessCalendar::new(WeekendPolicy::from_skip_flag(skip_weekends));
    calendar.subtract(instant, duration_millis).ok_or_else(|| {
        pyo3::exceptions::PyValueError::new_err(format!(
            "subtracting {} ms from {} leaves the supported date range",
            duration_millis, instant
        ))
    })
}

/// Render the `;`-delimited report for a schedule.
#[pyfunction]
#[pyo3(name = "render_report")]
fn py_render_report(result: &ScheduleResult) -> String {
    render_report(result)
}

/// The ganttoid.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<Dependency>()?;
    m.add_class::<Task>()?;
    m.add_class::<TaskSchedule>()?;
    m.add_class::<ScheduleResult>()?;
    m.add_class::<CommitPayload>()?;

    // Config types
    m.add_class::<ScheduleConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(run_latest_schedule, m)?)?;
    m.add_function(wrap_pyfunction!(subtract_work_time, m)?)?;
    m.add_function(wrap_pyfunction!(py_render_report, m)?)?;

    Ok(())
}
