// src/history.rs - Monthly historical index series and bloom labelling

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{AlgaeRiskError, Result};
use crate::indices::{IndexKind, IndexSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BloomSeverity {
    #[serde(rename = "None")]
    NoBloom,
    Low,
    Medium,
    High,
    Severe,
}

impl BloomSeverity {
    /// Medium and above count as a bloom event
    pub fn is_bloom(&self) -> bool {
        *self >= BloomSeverity::Medium
    }
}

/// Severity and coverage inferred for one observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloomLabel {
    pub severity: BloomSeverity,
    pub coverage: f64,
}

/// One monthly observation from the historical series provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub chlorophyll_a: f64,
    #[serde(default)]
    pub ndvi: f64,
    #[serde(default)]
    pub fai: f64,
    #[serde(default)]
    pub severity: Option<BloomSeverity>,
    #[serde(default)]
    pub coverage_estimate: Option<f64>,
}

/// Bloom when chl-a > 10 μg/L, or NDVI > 0.3 together with FAI > 0.1
pub fn detect_bloom(chl_a: f64, ndvi: f64, fai: f64) -> Option<BloomLabel> {
    if !(chl_a > 10.0 || (ndvi > 0.3 && fai > 0.1)) {
        return None;
    }

    let label = if chl_a > 40.0 {
        BloomLabel {
            severity: BloomSeverity::Severe,
            coverage: (60.0 + (chl_a - 40.0) * 0.5).min(100.0),
        }
    } else if chl_a > 20.0 {
        BloomLabel {
            severity: BloomSeverity::High,
            coverage: (30.0 + (chl_a - 20.0) * 1.5).min(60.0),
        }
    } else if chl_a > 10.0 {
        BloomLabel {
            severity: BloomSeverity::Medium,
            coverage: (10.0 + (chl_a - 10.0)).min(30.0),
        }
    } else if ndvi > 0.5 || fai > 0.3 {
        BloomLabel {
            severity: BloomSeverity::Medium,
            coverage: 20.0 + ndvi * 30.0,
        }
    } else {
        BloomLabel {
            severity: BloomSeverity::Low,
            coverage: 10.0 + ndvi * 20.0,
        }
    };

    Some(label)
}

impl HistoricalRecord {
    /// Build a labelled record from a month's index set
    pub fn from_indices(date: NaiveDate, indices: &IndexSet) -> Self {
        let chl_a = indices.value(IndexKind::ChlorophyllA);
        let ndvi = indices.value(IndexKind::Ndvi);
        let fai = indices.value(IndexKind::Fai);
        let label = detect_bloom(chl_a, ndvi, fai);

        Self {
            date,
            chlorophyll_a: chl_a,
            ndvi,
            fai,
            severity: Some(label.map(|l| l.severity).unwrap_or(BloomSeverity::NoBloom)),
            coverage_estimate: Some(label.map(|l| l.coverage).unwrap_or(0.0)),
        }
    }

    /// Recorded severity, or the one inferred from the indices when absent
    pub fn effective_severity(&self) -> BloomSeverity {
        self.severity.unwrap_or_else(|| {
            detect_bloom(self.chlorophyll_a, self.ndvi, self.fai)
                .map(|l| l.severity)
                .unwrap_or(BloomSeverity::NoBloom)
        })
    }

    pub fn is_bloom(&self) -> bool {
        self.effective_severity().is_bloom()
    }

    /// Months since year 0, for regression on elapsed time
    pub fn month_index(&self) -> i64 {
        self.date.year() as i64 * 12 + self.date.month() as i64
    }
}

/// Parse a history CSV (`date,chlorophyll_a,ndvi,fai,severity,coverage_estimate`), sorted by date
pub fn read_history<R: Read>(reader: R) -> Result<Vec<HistoricalRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for row in csv_reader.deserialize() {
        let record: HistoricalRecord = row?;
        records.push(record);
    }
    records.sort_by_key(|r| r.date);
    Ok(records)
}

pub fn load_history_csv<P: AsRef<Path>>(path: P) -> Result<Vec<HistoricalRecord>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AlgaeRiskError::InvalidPath(path.to_path_buf()));
    }
    let records = read_history(File::open(path)?)?;
    log::info!("Loaded {} historical records from {}", records.len(), path.display());
    Ok(records)
}
