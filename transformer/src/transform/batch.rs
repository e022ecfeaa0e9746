//! Transform every spreadsheet in a directory.
//!
//! Each file is an independent pipeline run with its own grid, so runs go to
//! the blocking pool side by side. Files sharing an output path share a task
//! and run in directory order. One failure does not stop the others.

use futures::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::pipeline::{transform_with_options, TransformOptions, TransformReport};
use crate::downloads::spreadsheets_in;
use crate::error::PipelineResult;
use crate::logs::{log_error, log_info, log_success, log_warning};
use crate::writer::output_target;

/// Result for one file of a batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<TransformReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Group sources by destination, keeping directory order.
///
/// Sources that map to the same output (`x.xls` and `x.xlsx` both write
/// `x-r.xlsx`) land in one group and run one after another.
fn group_by_output(files: Vec<PathBuf>) -> Vec<Vec<PathBuf>> {
    let mut groups: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();
    for source in files {
        let (output, _) = output_target(&source);
        match groups.iter_mut().find(|(o, _)| *o == output) {
            Some((_, sources)) => sources.push(source),
            None => groups.push((output, vec![source])),
        }
    }
    groups.into_iter().map(|(_, sources)| sources).collect()
}

fn run_one(source: PathBuf, options: &TransformOptions) -> BatchOutcome {
    match transform_with_options(&source, options) {
        Ok(report) => BatchOutcome { source, report: Some(report), error: None },
        Err(e) => BatchOutcome { source, report: None, error: Some(e.to_string()) },
    }
}

/// Transform all readable spreadsheets in `dir` (skipping `-r` outputs).
///
/// Outcomes come back in directory order. When several sources share an
/// output path, the last one in that order is what remains on disk.
pub async fn transform_dir(dir: &Path, options: &TransformOptions) -> PipelineResult<Vec<BatchOutcome>> {
    let files = spreadsheets_in(dir)?;
    if files.is_empty() {
        log_warning(format!("No spreadsheets in {}", dir.display()));
        return Ok(Vec::new());
    }
    log_info(format!("📂 {} spreadsheet(s) in {}", files.len(), dir.display()));

    let groups = group_by_output(files);
    for group in groups.iter().filter(|g| g.len() > 1) {
        log_warning(format!(
            "{} sources write {}, running them in order",
            group.len(),
            output_target(&group[0]).0.display()
        ));
    }

    let tasks = groups.into_iter().map(|group| {
        let options = options.clone();
        async move {
            let sources = group.clone();
            let handle = tokio::task::spawn_blocking(move || {
                group
                    .into_iter()
                    .map(|source| run_one(source, &options))
                    .collect::<Vec<_>>()
            });
            match handle.await {
                Ok(outcomes) => outcomes,
                Err(e) => sources
                    .into_iter()
                    .map(|source| BatchOutcome {
                        source,
                        report: None,
                        error: Some(format!("task failed: {}", e)),
                    })
                    .collect(),
            }
        }
    });

    let mut outcomes: Vec<BatchOutcome> = join_all(tasks).await.into_iter().flatten().collect();
    outcomes.sort_by(|a, b| a.source.cmp(&b.source));

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    for outcome in outcomes.iter().filter(|o| !o.is_ok()) {
        log_error(format!(
            "{}: {}",
            outcome.source.display(),
            outcome.error.as_deref().unwrap_or_default()
        ));
    }
    if failed == 0 {
        log_success(format!("All {} files transformed", outcomes.len()));
    } else {
        log_warning(format!("{} of {} files failed", failed, outcomes.len()));
    }

    Ok(outcomes)
}
