//! JSON-lines records and embedding parsing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use crate::error::InputError;

/// One line of an input file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MemoryRecord {
    pub content: String,
    pub embedding: Vec<f32>,
    /// Store in the procedural tier instead of working memory
    #[serde(default)]
    pub procedural: bool,
}

/// Read records from a JSON-lines file. Blank lines and `#` comments are skipped.
pub fn read_records(path: &Path) -> Result<Vec<MemoryRecord>, InputError> {
    let file = File::open(path)?;
    parse_records(BufReader::new(file))
}

pub fn parse_records(reader: impl BufRead) -> Result<Vec<MemoryRecord>, InputError> {
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let record: MemoryRecord =
            serde_json::from_str(trimmed).map_err(|e| InputError::record(index + 1, e))?;
        if record.embedding.is_empty() {
            return Err(InputError::record(index + 1, InputError::EmptyEmbedding));
        }
        records.push(record);
    }

    Ok(records)
}

/// Parse "0.1, 0.2,-0.3" into an embedding
pub fn parse_embedding(text: &str) -> Result<Vec<f32>, InputError> {
    let embedding = text
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f32>().map_err(|_| InputError::EmbeddingValue {
                value: part.to_string(),
            })
        })
        .collect::<Result<Vec<f32>, _>>()?;

    if embedding.is_empty() {
        return Err(InputError::EmptyEmbedding);
    }
    Ok(embedding)
}
