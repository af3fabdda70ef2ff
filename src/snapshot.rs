// Snapshot encoding, export and import

use crate::models::Task;
use chrono::NaiveDate;
use eyre::{Context, Result, eyre};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Serialize the full collection as a pretty-printed JSON array
pub fn encode(tasks: &[Task]) -> Result<String> {
    serde_json::to_string_pretty(tasks).context("Failed to serialize tasks")
}

/// Parse a snapshot
///
/// The top level must be an array and every element a valid task with a unique id.
/// Any failure rejects the whole snapshot; nothing partial is returned.
pub fn decode(text: &str) -> Result<Vec<Task>> {
    let value: Value = serde_json::from_str(text).context("Snapshot is not valid JSON")?;

    let Value::Array(items) = value else {
        return Err(eyre!("Invalid snapshot: expected a JSON array of tasks"));
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut tasks = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let mut task: Task =
            serde_json::from_value(item).with_context(|| format!("Invalid task at index {}", index))?;

        if !seen.insert(task.id.clone()) {
            return Err(eyre!("Duplicate task id in snapshot: {}", task.id));
        }

        task.normalize_completion();
        tasks.push(task);
    }

    Ok(tasks)
}

/// Name of the export file for a given day
pub fn export_file_name(date: NaiveDate) -> String {
    format!("taskflow_backup_{}.json", date.format("%Y-%m-%d"))
}

/// Write `tasks` to a dated backup file in `dir`, returning its path
pub fn write_export(dir: &Path, tasks: &[Task], date: NaiveDate) -> Result<PathBuf> {
    fs::create_dir_all(dir).context("Failed to create export directory")?;

    let path = dir.join(export_file_name(date));
    let json = encode(tasks)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = ?path, count = tasks.len(), "Exported tasks");
    Ok(path)
}

/// Read and validate an import file
pub fn read_import(path: &Path) -> Result<Vec<Task>> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode(&text).with_context(|| format!("Failed to import {}", path.display()))
}
