//! Synthetic JSONL dataset of LLM outputs for evaluation and benchmarking
//!
//! Rows are drawn from a fixed sample list. The sample picked for row `id`
//! is `SHA-256("{seed}:{id}") mod len(SAMPLES)`, so a given seed always
//! yields the same file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::util::hashing::digest_parts;

pub const DEFAULT_DATASET_PATH: &str = "data/synthetic_outputs.jsonl";
pub const DEFAULT_ROWS: usize = 250;
pub const DEFAULT_DATASET_SEED: u64 = 1337;

pub const SAMPLES: [&str; 5] = [
    "You are a senior Python engineer. Provide concise code with tests and comments.",
    "Explain quantum computing in three bullet points for beginners.",
    "Step 1: analyze constraints. Step 2: provide JSON output with confidence.",
    "{{ROLE}} {{TASK}} {{CONSTRAINTS}} Produce a production-grade answer.",
    "As an architect, provide a short design proposal with risks and mitigations.",
];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset not found at {}. Run `prompt-reverse generate-dataset` first.", .0.display())]
    Missing(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid dataset row at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub id: u64,
    pub output_text: String,
}

pub fn sample_index(seed: u64, id: u64) -> usize {
    let digest = digest_parts(&[&seed.to_string(), &id.to_string()]);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % SAMPLES.len() as u64) as usize
}

pub fn generate_rows(rows: usize, seed: u64) -> Vec<DatasetRow> {
    (0..rows as u64)
        .map(|id| DatasetRow {
            id,
            output_text: SAMPLES[sample_index(seed, id)].to_string(),
        })
        .collect()
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DatasetError + '_ {
    move |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes `rows` as JSONL, creating parent directories as needed
pub fn write_dataset(path: &Path, rows: &[DatasetRow]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let file = fs::File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    for (index, row) in rows.iter().enumerate() {
        let line = serde_json::to_string(row).map_err(|source| DatasetError::Parse {
            line: index + 1,
            source,
        })?;
        writeln!(writer, "{}", line).map_err(io_error(path))?;
    }
    writer.flush().map_err(io_error(path))?;

    debug!(path = %path.display(), rows = rows.len(), "Dataset written");
    Ok(())
}

/// Reads a JSONL dataset, skipping blank lines
pub fn read_dataset(path: &Path) -> Result<Vec<DatasetRow>, DatasetError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DatasetError::Missing(path.to_path_buf()))
        }
        Err(e) => return Err(io_error(path)(e)),
    };

    let mut rows = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_error(path))?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|source| DatasetError::Parse {
            line: index + 1,
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}
