//! Input format detection for number lists.

use std::path::Path;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Free text, one number per line.
    Lines,
    /// Delimited rows; every cell is a candidate.
    Csv {
        /// Field delimiter.
        delimiter: u8,
    },
}

/// Detects the format from the file extension, falling back to content.
pub fn detect_format(path: Option<&Path>, content: &str) -> InputFormat {
    let extension = path
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("csv") => InputFormat::Csv { delimiter: b',' },
        Some("tsv") => InputFormat::Csv { delimiter: b'\t' },
        _ => detect_from_content(content),
    }
}

/// Looks at the first non-empty line for a delimiter.
fn detect_from_content(content: &str) -> InputFormat {
    let first = content.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or("");

    if first.contains('\t') {
        InputFormat::Csv { delimiter: b'\t' }
    } else if first.contains(',') {
        InputFormat::Csv { delimiter: b',' }
    } else {
        InputFormat::Lines
    }
}
