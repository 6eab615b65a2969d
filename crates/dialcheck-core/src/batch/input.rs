//! Input parsing for number lists.

use std::path::Path;

use thiserror::Error;

use crate::batch::formats::{detect_format, InputFormat};
use crate::batch::normalizer::{IdentifierSet, Normalizer};

/// Errors raised while reading an input list.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input file does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Offending path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A delimited file was malformed.
    #[error("Malformed delimited input: {0}")]
    Csv(#[from] csv::Error),
}

/// Raw candidates as read from one input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    /// Free text.
    Text(String),
    /// Delimited rows.
    Rows(Vec<Vec<String>>),
}

impl RawInput {
    /// Normalizes the raw candidates.
    pub fn normalize(&self, normalizer: &Normalizer) -> IdentifierSet {
        match self {
            Self::Text(text) => normalizer.normalize_text(text),
            Self::Rows(rows) => normalizer.normalize_rows(rows),
        }
    }
}

/// Parses already-loaded content. `path` only informs format detection.
pub fn parse_input(path: Option<&Path>, content: &str) -> Result<RawInput, InputError> {
    match detect_format(path, content) {
        InputFormat::Lines => Ok(RawInput::Text(content.to_string())),
        InputFormat::Csv { delimiter } => parse_delimited(content, delimiter),
    }
}

/// Reads and parses an input file.
pub fn parse_input_file(path: &Path) -> Result<RawInput, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|source| InputError::Read { path: path.display().to_string(), source })?;

    parse_input(Some(path), &content)
}

/// Normalizes several sources into one deduplicated set.
pub fn normalize_all(inputs: &[RawInput], normalizer: &Normalizer) -> IdentifierSet {
    inputs.iter().flat_map(|input| input.normalize(normalizer)).collect()
}

fn parse_delimited(content: &str, delimiter: u8) -> Result<RawInput, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawInput::Rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_lines() {
        let raw = parse_input(None, "+15551234567\n15557654321\n").unwrap();
        assert!(matches!(raw, RawInput::Text(_)));
        assert_eq!(raw.normalize(&Normalizer::default()).len(), 2);
    }

    #[test]
    fn test_parse_csv_rows() {
        let content = "name,phone\nalice,+15551234567\nbob,\"1555 765 4321\",extra\n";
        let raw = parse_input(None, content).unwrap();
        match &raw {
            RawInput::Rows(rows) => {
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[2], vec!["bob", "\"1555 765 4321\"", "extra"]);
            }
            RawInput::Text(_) => panic!("expected rows"),
        }
        assert_eq!(raw.normalize(&Normalizer::default()).len(), 2);
    }

    #[test]
    fn test_stray_quote_does_not_swallow_rows() {
        let content = "15551234567,alice\n\"15557654321\n15550000000\n15550000001\n";
        let raw = parse_input(None, content).unwrap();
        match &raw {
            RawInput::Rows(rows) => {
                assert_eq!(rows.len(), 4);
                assert_eq!(rows[1], vec!["\"15557654321"]);
            }
            RawInput::Text(_) => panic!("expected rows"),
        }
        assert_eq!(raw.normalize(&Normalizer::default()).len(), 4);
    }

    #[test]
    fn test_parse_input_file_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "15551234567").unwrap();
        writeln!(file, "15557654321").unwrap();
        file.flush().unwrap();

        let raw = parse_input_file(file.path()).unwrap();
        assert!(matches!(raw, RawInput::Rows(_)));
    }

    #[test]
    fn test_parse_input_file_text() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "+58 416 231 4157").unwrap();
        file.flush().unwrap();

        let raw = parse_input_file(file.path()).unwrap();
        let ids = raw.normalize(&Normalizer::default());
        assert_eq!(ids.iter().next().unwrap().as_str(), "+584162314157");
    }

    #[test]
    fn test_parse_input_file_not_found() {
        let path = Path::new("/nonexistent/numbers.txt");
        assert!(matches!(parse_input_file(path), Err(InputError::NotFound(_))));
    }

    #[test]
    fn test_normalize_all_merges_sources() {
        let inputs = vec![
            parse_input(None, "15551234567\n15550000000").unwrap(),
            parse_input(None, "x,15551234567\ny,15559999999").unwrap(),
        ];
        assert_eq!(normalize_all(&inputs, &Normalizer::default()).len(), 3);
    }
}
