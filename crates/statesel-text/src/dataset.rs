//! GLUE SST-2 TSV datasets.
//!
//! Each file starts with a header row naming its columns. `sentence` is
//! required; `label` (0 or 1) and `index` are optional. Training and dev
//! files carry labels, test files carry an index instead. Without an
//! `index` column examples are numbered from zero in file order.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{TextError, TextResult};

/// One sentence with its optional label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Example {
    pub idx: usize,
    pub sentence: String,
    pub label: Option<u8>,
}

/// Read a TSV dataset from disk.
pub fn read_tsv(path: &Path) -> TextResult<Vec<Example>> {
    let content = fs::read_to_string(path).map_err(|e| TextError::io(path, e))?;
    let examples = parse_tsv(&content, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), examples = examples.len(), "read dataset");
    Ok(examples)
}

/// Parse TSV content; `source` names the input in error messages.
pub fn parse_tsv(content: &str, source: &str) -> TextResult<Vec<Example>> {
    let malformed = |line: usize, message: String| TextError::MalformedTsv {
        path: source.to_string(),
        line,
        message,
    };

    let mut lines = content.lines().enumerate();
    let header: Vec<&str> = match lines.next() {
        Some((_, header)) => header.split('\t').map(str::trim).collect(),
        None => return Err(malformed(1, "missing header row".to_string())),
    };
    let column = |name: &str| header.iter().position(|c| *c == name);
    let sentence_col = column("sentence")
        .ok_or_else(|| malformed(1, "header has no 'sentence' column".to_string()))?;
    let label_col = column("label");
    let index_col = column("index");

    let mut examples = Vec::new();
    for (i, line) in lines {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != header.len() {
            return Err(malformed(
                line_no,
                format!("expected {} columns, found {}", header.len(), fields.len()),
            ));
        }

        let label = match label_col {
            Some(col) => Some(parse_label(fields[col]).ok_or_else(|| {
                malformed(line_no, format!("invalid label '{}'", fields[col]))
            })?),
            None => None,
        };
        let idx = match index_col {
            Some(col) => fields[col].trim().parse().map_err(|_| {
                malformed(line_no, format!("invalid index '{}'", fields[col]))
            })?,
            None => examples.len(),
        };

        examples.push(Example {
            idx,
            sentence: fields[sentence_col].trim().to_string(),
            label,
        });
    }
    Ok(examples)
}

fn parse_label(field: &str) -> Option<u8> {
    match field.trim() {
        "0" => Some(0),
        "1" => Some(1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_labelled_rows() {
        let examples = parse_tsv(
            "sentence\tlabel\nhide new secretions \t0\nthe greatest musicians \t1\n",
            "train.tsv",
        )
        .unwrap();
        assert_eq!(
            examples,
            vec![
                Example {
                    idx: 0,
                    sentence: "hide new secretions".to_string(),
                    label: Some(0),
                },
                Example {
                    idx: 1,
                    sentence: "the greatest musicians".to_string(),
                    label: Some(1),
                },
            ]
        );
    }

    #[test]
    fn test_indexed_rows_without_labels() {
        let examples = parse_tsv("index\tsentence\n7\tit 's a charming journey .\n", "test.tsv").unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].idx, 7);
        assert_eq!(examples[0].label, None);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let examples = parse_tsv("sentence\tlabel\n\na\t1\n\n", "dev.tsv").unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].idx, 0);
    }

    #[test]
    fn test_malformed_rows() {
        for (input, line) in [
            ("", 1),
            ("label\n1\n", 1),
            ("sentence\tlabel\na\t1\nb\n", 3),
            ("sentence\tlabel\na\t2\n", 2),
            ("index\tsentence\nx\ta\n", 2),
        ] {
            match parse_tsv(input, "bad.tsv").unwrap_err() {
                TextError::MalformedTsv { line: got, .. } => assert_eq!(got, line, "{:?}", input),
                other => panic!("expected MalformedTsv, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_read_tsv_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dev.tsv");
        fs::write(&path, "sentence\tlabel\nok\t1\n").unwrap();
        assert_eq!(read_tsv(&path).unwrap().len(), 1);
    }
}
