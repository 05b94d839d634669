//! Offline decisions for a CSV of applicants, one decision per data row.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::decision::{CounterStore, DecisionService, DecisionView, RawFields, Verdict};

/// Read applicants from CSV. The header row names the fields; extra columns are ignored.
pub fn read_applicants<R: Read>(reader: R) -> Result<Vec<RawFields>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut applicants = Vec::new();

    for record in csv_reader.deserialize::<BTreeMap<String, String>>() {
        applicants.push(record?.into_iter().collect());
    }

    Ok(applicants)
}

pub fn read_applicants_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawFields>, csv::Error> {
    let file = File::open(path)?;
    read_applicants(file)
}

/// Result for one CSV data row (1-based, header excluded).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub row: usize,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Decided(DecisionView),
    Failed { error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    pub approved: usize,
    pub rejected: usize,
    pub failed: usize,
    pub unpersisted: usize,
}

/// Decide every applicant in order. A bad row is reported and the batch continues.
pub fn run_batch<C>(service: &DecisionService<C>, applicants: &[RawFields]) -> BatchReport
where
    C: CounterStore + 'static,
{
    let mut report = BatchReport::default();

    for (index, raw) in applicants.iter().enumerate() {
        let row = index + 1;
        let outcome = match service.decide_blocking(raw) {
            Ok(outcome) => {
                if outcome.persistence_error.is_some() {
                    report.unpersisted += 1;
                }
                match outcome.result.verdict {
                    Verdict::Approved => report.approved += 1,
                    Verdict::Rejected => report.rejected += 1,
                }
                BatchOutcome::Decided(outcome.result.view())
            }
            Err(err) => {
                warn!(row, error = %err, "skipping applicant row");
                report.failed += 1;
                BatchOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };
        report.entries.push(BatchEntry { row, outcome });
    }

    report
}
