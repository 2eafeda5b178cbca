//! Parser for delimited interaction and item files.
//!
//! - ratings: userId<sep>itemId<sep>rating[<sep>ignored...]
//! - items:   itemId<sep>title[<sep>ignored...]
//!
//! `<sep>` is `::` (MovieLens), `,` or a tab, detected per line. A first line
//! whose leading field is not numeric is treated as a header and skipped.
//! Parsing only produces `RawInteraction`s; semantic checks (negative ids,
//! non-finite ratings) belong to validation in the store.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read a file as ISO-8859-1 (Latin-1).
///
/// Every byte maps directly to a Unicode code point, so this never fails on
/// non-UTF-8 input such as the MovieLens item titles.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let content: String = bytes.iter().map(|&b| b as char).collect();

    Ok(content.lines().map(|s| s.to_string()).collect())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Split a line on the first delimiter style it contains
fn split_fields(line: &str) -> Vec<&str> {
    let fields: Vec<&str> = if line.contains("::") {
        line.split("::").collect()
    } else if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split(',').collect()
    };
    fields.into_iter().map(str::trim).collect()
}

fn is_header(line_no: usize, fields: &[&str]) -> bool {
    line_no == 1
        && fields
            .first()
            .is_some_and(|first| first.parse::<f64>().is_err())
}

/// Parse a ratings file into unvalidated records
pub fn parse_ratings(path: &Path) -> Result<Vec<RawInteraction>> {
    let lines = read_lines_latin1(path)?;
    parse_ratings_lines(&file_name(path), lines.as_slice())
}

/// Parse ratings from already-read lines.
///
/// `file` is only used for error messages.
pub fn parse_ratings_lines<S: AsRef<str>>(file: &str, lines: &[S]) -> Result<Vec<RawInteraction>> {
    let mut records = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.as_ref().trim();
        if line_trimmed.is_empty() {
            continue;
        }

        let fields = split_fields(line_trimmed);
        if is_header(line_no, &fields) {
            continue;
        }

        let parse_error = |reason: String| DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason,
        };

        if fields.len() < 3 {
            return Err(parse_error(format!(
                "expected at least 3 fields but found {}",
                fields.len()
            )));
        }

        let user_id = parse_optional::<i64>(fields[0])
            .map_err(|e| parse_error(format!("Invalid userId: {}", e)))?;
        let item_id = parse_optional::<i64>(fields[1])
            .map_err(|e| parse_error(format!("Invalid itemId: {}", e)))?;
        let rating = parse_optional::<f64>(fields[2])
            .map_err(|e| parse_error(format!("Invalid rating: {}", e)))?;

        records.push(RawInteraction {
            user_id,
            item_id,
            rating,
        });
    }

    Ok(records)
}

/// Empty fields become `None` and are rejected later by validation
fn parse_optional<T: std::str::FromStr>(field: &str) -> std::result::Result<Option<T>, T::Err> {
    if field.is_empty() {
        Ok(None)
    } else {
        field.parse().map(Some)
    }
}

/// Parse an item file into a catalog of display names
pub fn parse_items(path: &Path) -> Result<ItemCatalog> {
    let lines = read_lines_latin1(path)?;
    parse_items_lines(&file_name(path), lines.as_slice())
}

pub fn parse_items_lines<S: AsRef<str>>(file: &str, lines: &[S]) -> Result<ItemCatalog> {
    let mut catalog = ItemCatalog::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.as_ref().trim();
        if line_trimmed.is_empty() {
            continue;
        }

        let fields = split_fields(line_trimmed);
        if is_header(line_no, &fields) {
            continue;
        }

        let (item_id, title) = match fields.as_slice() {
            [item_id, title, ..] => (item_id, title),
            _ => {
                return Err(DataLoadError::ParseError {
                    file: file.to_string(),
                    line: line_no,
                    reason: "Missing title".to_string(),
                });
            }
        };

        let item_id: ItemId = item_id.parse().map_err(|e| DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason: format!("Invalid itemId: {}", e),
        })?;

        catalog.insert(item_id, *title);
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movielens_ratings() {
        let lines = ["1::1193::5::978300760", "1::661::3::978302109", ""];
        let records = parse_ratings_lines("ratings.dat", &lines).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], RawInteraction::new(1, 1193, 5.0));
        assert_eq!(records[1].rating, Some(3.0));
    }

    #[test]
    fn test_parse_csv_with_header() {
        let lines = ["userId,movieId,rating", "4,7,2.5", "4,8,"];
        let records = parse_ratings_lines("ratings.csv", &lines).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], RawInteraction::new(4, 7, 2.5));
        assert_eq!(records[1].rating, None);
    }

    #[test]
    fn test_negative_id_parses_but_is_kept_raw() {
        let records = parse_ratings_lines("r.tsv", &["-1\t2\t3.0"]).unwrap();
        assert_eq!(records[0].user_id, Some(-1));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let lines = ["1,2,3", "x,2,3"];
        let err = parse_ratings_lines("ratings.csv", &lines).unwrap_err();
        match err {
            DataLoadError::ParseError { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("userId"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }

        assert!(parse_ratings_lines("ratings.csv", &["1,2"]).is_err());
    }

    #[test]
    fn test_parse_items() {
        let lines = [
            "1::Toy Story (1995)::Animation|Children's|Comedy",
            "2::Jumanji (1995)::Adventure",
        ];
        let catalog = parse_items_lines("movies.dat", &lines).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get_title(1), Some("Toy Story (1995)"));
        assert_eq!(catalog.get_title(3), None);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_ratings(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }
}
