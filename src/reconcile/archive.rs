//! Result payload extraction from artifact ZIPs.

use std::io::{Cursor, Read};

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("could not read {entry}: {source}")]
    Read {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{entry} is not valid JSON: {source}")]
    Json {
        entry: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{entry} does not hold a JSON object")]
    NotAnObject { entry: String },
}

/// Whether an archive entry is the results file.
pub fn is_results_entry(name: &str) -> bool {
    name.contains("results") && name.ends_with(".json")
}

/// The first `*results*.json` entry in archive order, parsed as a JSON object.
///
/// `Ok(None)` when no entry qualifies.
pub fn find_results(bytes: &[u8]) -> Result<Option<Map<String, Value>>, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() || !is_results_entry(file.name()) {
            continue;
        }

        let entry = file.name().to_string();
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|source| ArchiveError::Read {
                entry: entry.clone(),
                source,
            })?;

        return match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(ArchiveError::NotAnObject { entry }),
            Err(source) => Err(ArchiveError::Json { entry, source }),
        };
    }

    Ok(None)
}

/// Best-effort form of [`find_results`]: every failure becomes `None`.
pub fn extract(bytes: &[u8]) -> Option<Map<String, Value>> {
    match find_results(bytes) {
        Ok(found) => {
            if found.is_none() {
                tracing::debug!("artifact has no results json");
            }
            found
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not extract results from artifact");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::CompressionMethod;

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            let options = FileOptions::default().compression_method(CompressionMethod::Stored);
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extracts_results_json() {
        let bytes = zip_of(&[
            ("logs/run.txt", "hello"),
            ("results-test_1.json", r#"{"totalMessages": 42}"#),
        ]);
        let data = extract(&bytes).unwrap();
        assert_eq!(data["totalMessages"], 42);
    }

    #[test]
    fn test_first_qualifying_entry_wins() {
        let bytes = zip_of(&[
            ("results-a.json", r#"{"totalMessages": 1}"#),
            ("results-b.json", r#"{"totalMessages": 2}"#),
        ]);
        assert_eq!(extract(&bytes).unwrap()["totalMessages"], 1);
    }

    #[test]
    fn test_no_qualifying_entry() {
        let bytes = zip_of(&[("summary.json", "{}"), ("results.txt", "{}")]);
        assert!(extract(&bytes).is_none());
        assert!(matches!(find_results(&bytes), Ok(None)));
    }

    #[test]
    fn test_garbage_bytes() {
        assert!(extract(b"definitely not a zip").is_none());
        assert!(matches!(find_results(b"nope"), Err(ArchiveError::Zip(_))));
    }

    #[test]
    fn test_invalid_json_is_not_found() {
        let bytes = zip_of(&[("results.json", "{ truncated")]);
        assert!(extract(&bytes).is_none());
        assert!(matches!(find_results(&bytes), Err(ArchiveError::Json { .. })));
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        let bytes = zip_of(&[("results.json", "[1, 2, 3]")]);
        assert!(matches!(find_results(&bytes), Err(ArchiveError::NotAnObject { .. })));
    }

    #[test]
    fn test_entry_name_rule() {
        assert!(is_results_entry("out/load-results.json"));
        assert!(!is_results_entry("results.json.bak"));
        assert!(!is_results_entry("summary.json"));
    }
}
