use std::fs;
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;

use crate::errors::Result;
use crate::pipeline::Report;

/// One line of the batch summary
#[derive(Debug, Clone)]
pub struct SummaryEntry {
    pub name: String,
    pub report: Report,
}

/// Write a report as pretty JSON to `<output_dir>/reports/<name>.json`
pub fn write_json_report<T: Serialize, P: AsRef<Path>>(
    report: &T,
    output_dir: P,
    name: &str,
) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join("reports").join(format!("{}.json", name));

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(report)?;
    fs::write(&output_path, json)?;

    Ok(output_path)
}

/// Write `<output_dir>/summary.csv` with one row per processed input
pub fn write_summary_csv<P: AsRef<Path>>(entries: &[SummaryEntry], output_dir: P) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join("summary.csv");

    let mut writer = Writer::from_path(&output_path)?;

    writer.write_record([
        "ID",
        "Source",
        "Risk_Score",
        "Risk_Level",
        "Algae_Coverage_Percent",
        "Confidence",
        "Forecast_Category",
        "Bloom_Probability",
        "Predicted_Coverage_Percent",
    ])?;

    for entry in entries {
        let risk = entry.report.risk();
        let forecast = entry.report.forecast();

        writer.write_record([
            entry.name.clone(),
            entry.report.kind_label().to_string(),
            format!("{:.4}", risk.risk_score),
            risk.risk_level.to_string(),
            format!("{:.2}", risk.algae_coverage_percent),
            format!("{:.1}", risk.confidence),
            forecast.map(|f| f.risk_category.to_string()).unwrap_or_default(),
            forecast.map(|f| format!("{:.4}", f.bloom_probability)).unwrap_or_default(),
            forecast.map(|f| format!("{:.2}", f.predicted_coverage_percent)).unwrap_or_default(),
        ])?;
    }

    writer.flush()?;

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::analyze_image;
    use image::{Rgb, RgbImage};

    #[test]
    fn writes_report_and_summary() {
        let dir = std::env::temp_dir().join(format!("algae_risk_output_{}", std::process::id()));
        let image = RgbImage::from_pixel(8, 8, Rgb([30, 90, 140]));
        let report = analyze_image(&image, &Config::default()).unwrap();

        let json_path = write_json_report(&report, &dir, "lake").unwrap();
        assert!(json_path.ends_with("reports/lake.json"));

        let entries = vec![SummaryEntry {
            name: "lake".to_string(),
            report: Report::Image(report),
        }];
        let csv_path = write_summary_csv(&entries, &dir).unwrap();
        let text = fs::read_to_string(&csv_path).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("ID,Source,Risk_Score"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("lake,image,"));
        assert!(row.ends_with(",,,"));
    }
}
