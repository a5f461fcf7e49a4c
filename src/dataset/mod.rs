#[cfg(test)]
mod tests;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const QUESTION_COLUMN: &str = "question";
pub const ANSWER_COLUMN: &str = "answer";

/// One curated question with its expert answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset is missing the required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Dataset {0} contains no usable records")]
    Empty(String),
}

/// The question/answer table, loaded once and shared read-only.
///
/// Cloning is cheap: all clones point at the same records.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[QaRecord]>,
    source: String,
}

impl Dataset {
    /// Load a CSV file with `question` and `answer` columns.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        debug!("Loading dataset from {}", path.display());

        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_reader(file, path.display().to_string())
    }

    /// Parse CSV from any reader. `source` names the input in logs and errors.
    #[inline]
    pub fn from_reader<R: Read>(
        reader: R,
        source: impl Into<String>,
    ) -> Result<Self, DatasetError> {
        let source = source.into();
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let question_col = column_index(&headers, QUESTION_COLUMN)?;
        let answer_col = column_index(&headers, ANSWER_COLUMN)?;

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for row in csv_reader.records() {
            let row = row?;
            let question = row.get(question_col).unwrap_or_default().trim();
            let answer = row.get(answer_col).unwrap_or_default().trim();

            if question.is_empty() || answer.is_empty() {
                skipped += 1;
                continue;
            }

            records.push(QaRecord {
                question: question.to_string(),
                answer: answer.to_string(),
            });
        }

        if skipped > 0 {
            warn!(
                "Skipped {} rows with a blank question or answer in {}",
                skipped, source
            );
        }

        let dataset = Self::from_records(records, source)?;
        info!(
            "Loaded {} question/answer records from {}",
            dataset.len(),
            dataset.source
        );
        Ok(dataset)
    }

    #[inline]
    pub fn from_records(
        records: Vec<QaRecord>,
        source: impl Into<String>,
    ) -> Result<Self, DatasetError> {
        let source = source.into();
        if records.is_empty() {
            return Err(DatasetError::Empty(source));
        }

        Ok(Self {
            records: records.into(),
            source,
        })
    }

    #[inline]
    pub fn records(&self) -> &[QaRecord] {
        &self.records
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&QaRecord> {
        self.records.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a constructed dataset.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }
}

fn column_index(headers: &csv::StringRecord, name: &'static str) -> Result<usize, DatasetError> {
    headers
        .iter()
        .position(|header| header.trim() == name)
        .ok_or(DatasetError::MissingColumn(name))
}
