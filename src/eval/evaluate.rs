//! Offline quality evaluation over a JSONL dataset

use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::dataset::{read_dataset, DatasetError, DatasetRow};
use crate::pipeline::ReverseEngineeringService;

/// Every evaluation run is deterministic with this seed
pub const EVAL_SEED: u64 = 1337;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub avg_confidence: f64,
    pub risk_flag_rate: f64,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn evaluate_rows(service: &ReverseEngineeringService, rows: &[DatasetRow]) -> EvaluationReport {
    let mut confidence_sum = 0.0;
    let mut flagged = 0usize;

    for row in rows {
        let result = service.analyze(&row.output_text, true, Some(EVAL_SEED));
        confidence_sum += result.confidence_score;
        if result.explainability.has_risk() {
            flagged += 1;
        }
    }

    let samples = rows.len();
    if samples == 0 {
        return EvaluationReport {
            samples,
            avg_confidence: 0.0,
            risk_flag_rate: 0.0,
        };
    }
    EvaluationReport {
        samples,
        avg_confidence: round4(confidence_sum / samples as f64),
        risk_flag_rate: round4(flagged as f64 / samples as f64),
    }
}

pub fn evaluate_dataset(
    path: &Path,
    service: &ReverseEngineeringService,
) -> Result<EvaluationReport, DatasetError> {
    let rows = read_dataset(path)?;
    let report = evaluate_rows(service, &rows);
    info!(
        path = %path.display(),
        samples = report.samples,
        avg_confidence = report.avg_confidence,
        risk_flag_rate = report.risk_flag_rate,
        "Evaluation complete"
    );
    Ok(report)
}
