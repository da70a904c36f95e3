use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Failed to read reference table: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse reference table: {0}")]
    Parse(#[from] csv::Error),
    #[error("Reference table contains no rows")]
    Empty,
}

/// One row of the diagnosis reference table. The row's position in the file
/// is the class index the classifier emits for it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReferenceRow {
    #[serde(rename = "ClassName")]
    pub class_name: String,
    #[serde(rename = "Diagnosis")]
    pub diagnosis: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Treatment_Medication")]
    pub treatment: String,
    #[serde(rename = "Recommendation")]
    pub recommendation: String,
}

/// The diagnosis reference table, loaded once at startup and immutable for
/// the process lifetime. Row order must match the classifier's output index
/// ordering; a malformed file is a fatal error rather than a partial load.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    rows: Vec<ReferenceRow>,
}

impl ReferenceTable {
    /// Reads the CSV file at `path` into an ordered table.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path.as_ref())?;
        let mut reader = csv::Reader::from_reader(file);

        let mut rows = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }
        if rows.is_empty() {
            return Err(TableError::Empty);
        }

        log::info!(
            "Loaded reference table with {} rows from {:?}",
            rows.len(),
            path.as_ref()
        );
        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<ReferenceRow>) -> Self {
        Self { rows }
    }

    pub fn get(&self, class_index: usize) -> Option<&ReferenceRow> {
        self.rows.get(class_index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
