//! Delimited per-task report of a scheduling run.

use chrono::NaiveDateTime;

use crate::models::{ScheduleResult, TaskSchedule};

pub const REPORT_HEADER: &str =
    "ID;Name;Parent;Latest start;Sequence;Latest end;Category;Predecessors;Successors";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render one `;`-delimited line per task, preceded by [`REPORT_HEADER`].
///
/// Missing values render as empty fields and name lists are comma-joined.
pub fn render_report(result: &ScheduleResult) -> String {
    let mut out = String::from(REPORT_HEADER);
    out.push('\n');
    for task in &result.tasks {
        out.push_str(&render_line(task));
        out.push('\n');
    }
    out
}

fn render_line(task: &TaskSchedule) -> String {
    [
        field(&task.id),
        field(&task.name),
        task.parent_name.as_deref().map(field).unwrap_or_default(),
        date(task.latest_start),
        task.order_index.to_string(),
        date(task.latest_end),
        task.category.as_deref().map(field).unwrap_or_default(),
        names(&task.predecessor_names),
        names(&task.successor_names),
    ]
    .join(";")
}

/// Keep a value on one line and out of the delimiter's way.
fn field(value: &str) -> String {
    value.replace([';', '\n', '\r'], " ")
}

fn date(value: Option<NaiveDateTime>) -> String {
    value
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn names(list: &[String]) -> String {
    list.iter().map(|n| field(n)).collect::<Vec<_>>().join(", ")
}
