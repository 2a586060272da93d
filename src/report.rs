use crate::metrics::MetricsReport;
use chrono::{DateTime, Local};
use std::path::Path;
use tracing::info;

const REPORT_WIDTH: usize = 50;

/// Renders the plain text evaluation report.
pub fn format_report(report: &MetricsReport, generated_at: DateTime<Local>) -> String {
    let heavy = "=".repeat(REPORT_WIDTH);
    let light = "-".repeat(REPORT_WIDTH);
    let lines = [
        heavy.clone(),
        "PLATE OCR EVALUATION REPORT".to_string(),
        heavy.clone(),
        format!("Date: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
        format!("Total images: {}", report.total_images),
        light.clone(),
        "1. DETECTION METRICS".to_string(),
        format!("   Precision (P):    {:.4}", report.precision),
        format!("   Recall (R):       {:.4}", report.recall),
        format!("   F1-Score:         {:.4}", report.f1),
        light.clone(),
        "2. RECOGNITION METRICS".to_string(),
        format!("   PAR (Plate Accuracy):     {:.2}%", report.plate_accuracy_rate * 100.0),
        format!("   CAR (Character Accuracy): {:.2}%", report.character_accuracy_rate * 100.0),
        format!("   CER (Character Error):    {:.2}%", report.character_error_rate * 100.0),
        format!("   WER (Word Error Rate):    {:.2}%", report.word_error_rate * 100.0),
        format!("   Average Levenshtein:      {:.2}", report.average_edit_distance),
        light,
        "3. PERFORMANCE".to_string(),
        format!("   Total time:       {:.2} s", report.elapsed_seconds),
        format!("   FPS:              {:.2}", report.throughput_fps),
        format!("   Latency:          {:.2} ms/img", report.mean_latency_ms),
        heavy,
    ];
    lines.join("\n")
}

pub fn save_report(text: &str, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, text)?;
    info!(?path, "Report saved");
    Ok(())
}

pub fn save_report_json(report: &MetricsReport, path: &Path) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(report)?;
    std::fs::write(path, content)?;
    info!(?path, "JSON report saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{EvaluationRecord, MetricsReport};
    use chrono::TimeZone;
    use std::time::Duration;

    fn sample_report() -> MetricsReport {
        let records = vec![
            EvaluationRecord::new("placa_001.jpg", "ABC-1234", "ABC-1234"),
            EvaluationRecord::new("placa_002.jpg", "ABC-1234", "ABD-1235"),
            EvaluationRecord::new("placa_003.jpg", "ABC-1234", "XYZ-9234"),
            EvaluationRecord::new("placa_004.jpg", "ABC-1234", ""),
        ];
        MetricsReport::from_records(&records, Duration::from_millis(2000)).unwrap()
    }

    #[test]
    fn test_report_sections_in_order() {
        let generated_at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let text = format_report(&sample_report(), generated_at);

        assert!(text.contains("Date: 2024-03-09 14:05:07"));
        assert!(text.contains("Total images: 4"));
        assert!(text.contains("Precision (P):    1.0000"));
        assert!(text.contains("Recall (R):       0.7500"));
        assert!(text.contains("F1-Score:         0.8571"));
        assert!(text.contains("PAR (Plate Accuracy):     25.00%"));
        // distances 0 + 2 + 4 + 8 over 32 characters
        assert!(text.contains("CER (Character Error):    43.75%"));
        assert!(text.contains("CAR (Character Accuracy): 56.25%"));
        assert!(text.contains("WER (Word Error Rate):    75.00%"));
        assert!(text.contains("Average Levenshtein:      3.50"));
        assert!(text.contains("Total time:       2.00 s"));
        assert!(text.contains("FPS:              2.00"));
        assert!(text.contains("Latency:          500.00 ms/img"));

        let detection = text.find("1. DETECTION").unwrap();
        let recognition = text.find("2. RECOGNITION").unwrap();
        let performance = text.find("3. PERFORMANCE").unwrap();
        assert!(detection < recognition && recognition < performance);
    }

    #[test]
    fn test_save_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();

        let text_path = dir.path().join("report.txt");
        let text = format_report(&report, Local::now());
        save_report(&text, &text_path).unwrap();
        assert_eq!(std::fs::read_to_string(&text_path).unwrap(), text);

        let json_path = dir.path().join("report.json");
        save_report_json(&report, &json_path).unwrap();
        let loaded: MetricsReport =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(loaded.total_images, report.total_images);
        assert_eq!(loaded.total_edit_distance, 14);
        assert!((loaded.character_error_rate - report.character_error_rate).abs() < 1e-12);
    }
}
