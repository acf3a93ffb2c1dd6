use crate::config::Config;
use chrono::{DateTime, Utc};
use facetag_core::gallery::SkippedFile;
use facetag_core::{BatchReport, Gallery};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub entries: usize,
}

pub fn label_counts(gallery: &Gallery) -> Vec<LabelCount> {
    gallery
        .label_counts()
        .into_iter()
        .map(|(label, entries)| LabelCount {
            label: label.to_string(),
            entries,
        })
        .collect()
}

/// Machine-readable record of one `run`.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: &'a Config,
    pub known_faces: usize,
    pub labels: Vec<LabelCount>,
    pub skipped_known: &'a [SkippedFile],
    pub written: usize,
    pub failed: usize,
    pub matched_faces: usize,
    pub batch: &'a BatchReport,
}

impl RunReport<'_> {
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
