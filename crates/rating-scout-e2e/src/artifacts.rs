//! Failure artifacts: a screenshot and a JSON report per failed scenario.

use crate::error::FlowResult;
use crate::flow::ScenarioReport;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Paths written for one failure.
#[derive(Debug, Clone, Serialize)]
pub struct FailureArtifacts {
    pub screenshot: Option<PathBuf>,
    pub report: PathBuf,
}

fn artifact_stem(scenario: &str) -> String {
    let name: String = scenario
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("FAIL_{name}_{}", Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// Write `FAIL_<scenario>_<timestamp>.json` and, when bytes are given, the
/// matching `.png` into `dir`.
pub fn write_failure_artifacts(
    dir: &Path,
    scenario: &str,
    report: &ScenarioReport,
    screenshot_png: Option<&[u8]>,
) -> FlowResult<FailureArtifacts> {
    std::fs::create_dir_all(dir)?;
    let stem = artifact_stem(scenario);

    let screenshot = match screenshot_png {
        Some(bytes) => {
            let path = dir.join(format!("{stem}.png"));
            std::fs::write(&path, bytes)?;
            Some(path)
        }
        None => None,
    };

    let report_path = dir.join(format!("{stem}.json"));
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(&report_path, json)?;

    tracing::info!(report = %report_path.display(), "failure artifacts written");
    Ok(FailureArtifacts {
        screenshot,
        report: report_path,
    })
}
