//! Annotation Aggregator
//!
//! Merges per-batch VIA region-annotation exports into one flat
//! filename-to-class mapping. Each export is a JSON object keyed by an
//! internal record id; only the record's `filename` and the `class`
//! attribute of its first region are kept. Class labels are lowercased so
//! downstream training sees a single canonical spelling.
//!
//! Files are merged in lexicographic order and later files win on duplicate
//! filenames, so the merge result is independent of directory iteration
//! order.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::utils::error::{DataPrepError, Result};
use crate::AGGREGATED_FILE_NAME;

/// Attributes attached to a single annotated region
#[derive(Debug, Clone, Deserialize)]
pub struct RegionAttributes {
    /// Class label as entered by the annotator
    #[serde(rename = "class")]
    pub label: String,
}

/// One annotated region within an image record
#[derive(Debug, Clone, Deserialize)]
pub struct Region {
    pub region_attributes: RegionAttributes,
}

/// One image record from a VIA export
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRecord {
    pub filename: String,
    #[serde(default)]
    pub regions: Vec<Region>,
}

/// List the `.json` annotation files directly inside `dir`, sorted by path.
pub fn list_annotation_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| DataPrepError::fs(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DataPrepError::fs(dir, e))?;
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if path.is_file() && is_json {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Read one VIA export and return its filename-to-class pairs.
///
/// A record with no regions is a schema violation, as is a file that does
/// not parse as a VIA object map.
pub fn extract_class_map(path: &Path) -> Result<Vec<(String, String)>> {
    let file = File::open(path).map_err(|e| DataPrepError::fs(path, e))?;
    let records: HashMap<String, AnnotationRecord> =
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| DataPrepError::schema(path, e.to_string()))?;

    // Sort by record key so collisions inside one file resolve the same way
    // on every run.
    let mut records: Vec<_> = records.into_iter().collect();
    records.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut pairs = Vec::with_capacity(records.len());
    for (_, record) in records {
        let region = record.regions.first().ok_or_else(|| {
            DataPrepError::schema(path, format!("no regions for '{}'", record.filename))
        })?;
        pairs.push((
            record.filename,
            region.region_attributes.label.to_lowercase(),
        ));
    }

    Ok(pairs)
}

/// Merge every annotation file in `dir` into one filename-to-class mapping.
pub fn aggregate_annotations(dir: &Path) -> Result<BTreeMap<String, String>> {
    let files = list_annotation_files(dir)?;
    info!("Aggregating {} annotation files from {:?}", files.len(), dir);

    let mut merged = BTreeMap::new();
    for file in &files {
        let pairs = extract_class_map(file)?;
        debug!("{:?}: {} records", file, pairs.len());
        for (filename, class) in pairs {
            merged.insert(filename, class);
        }
    }

    Ok(merged)
}

/// Write an aggregated mapping as pretty-printed JSON.
pub fn write_aggregated(mapping: &BTreeMap<String, String>, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(mapping)
        .map_err(|e| DataPrepError::schema(output, e.to_string()))?;
    fs::write(output, json).map_err(|e| DataPrepError::fs(output, e))?;
    Ok(())
}

/// Aggregate `dir` and write the result next to the annotation files.
///
/// Returns the path of the written file. The historical output name
/// (misspelling included) is kept so existing tooling keeps working.
pub fn aggregate_to_file(dir: &Path) -> Result<PathBuf> {
    let mapping = aggregate_annotations(dir)?;
    let output = dir.join(AGGREGATED_FILE_NAME);
    write_aggregated(&mapping, &output)?;
    info!("Wrote {} entries to {:?}", mapping.len(), output);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_via_export(dir: &Path, name: &str, entries: &[(&str, &str)]) {
        let mut records = serde_json::Map::new();
        for (i, (filename, class)) in entries.iter().enumerate() {
            records.insert(
                format!("{}{}", filename, i),
                serde_json::json!({
                    "filename": filename,
                    "size": 12345,
                    "regions": [{
                        "shape_attributes": {"name": "rect", "x": 1, "y": 2},
                        "region_attributes": {"class": class}
                    }],
                    "file_attributes": {}
                }),
            );
        }
        let json = serde_json::to_string_pretty(&records).unwrap();
        fs::write(dir.join(name), json).unwrap();
    }

    #[test]
    fn test_extract_class_map_lowercases_labels() {
        let dir = tempfile::tempdir().unwrap();
        write_via_export(dir.path(), "batch.json", &[("leaf1.jpg", "Healthy")]);

        let pairs = extract_class_map(&dir.path().join("batch.json")).unwrap();
        assert_eq!(pairs, vec![("leaf1.jpg".to_string(), "healthy".to_string())]);
    }

    #[test]
    fn test_record_without_regions_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::json!({
            "leaf1.jpg12345": {
                "filename": "leaf1.jpg",
                "regions": [],
                "file_attributes": {}
            }
        });
        fs::write(dir.path().join("bad.json"), json.to_string()).unwrap();

        let err = extract_class_map(&dir.path().join("bad.json")).unwrap_err();
        assert!(matches!(err, DataPrepError::Schema { .. }));
        assert!(err.to_string().contains("leaf1.jpg"));
    }

    #[test]
    fn test_malformed_json_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();

        let err = extract_class_map(&dir.path().join("bad.json")).unwrap_err();
        assert!(matches!(err, DataPrepError::Schema { .. }));
    }

    #[test]
    fn test_list_annotation_files_skips_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write_via_export(dir.path(), "b.json", &[("x.jpg", "cat")]);
        write_via_export(dir.path(), "a.JSON", &[("y.jpg", "dog")]);
        fs::write(dir.path().join("readme.txt"), "notes").unwrap();

        let files = list_annotation_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.JSON"));
        assert!(files[1].ends_with("b.json"));
    }

    #[test]
    fn test_later_files_win_on_duplicate_filenames() {
        let dir = tempfile::tempdir().unwrap();
        write_via_export(dir.path(), "a.json", &[("shared.jpg", "Cat")]);
        write_via_export(dir.path(), "b.json", &[("shared.jpg", "Dog")]);

        let merged = aggregate_annotations(dir.path()).unwrap();
        assert_eq!(merged.get("shared.jpg"), Some(&"dog".to_string()));
    }

    #[test]
    fn test_aggregate_to_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        write_via_export(
            dir.path(),
            "batch1.json",
            &[("a.jpg", "Healthy"), ("b.jpg", "Wilt")],
        );
        write_via_export(dir.path(), "batch2.json", &[("c.jpg", "Healthy")]);

        let output = aggregate_to_file(dir.path()).unwrap();
        assert!(output.ends_with(AGGREGATED_FILE_NAME));

        let written: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written.get("a.jpg"), Some(&"healthy".to_string()));
        assert_eq!(written.get("b.jpg"), Some(&"wilt".to_string()));
    }

    #[test]
    fn test_empty_directory_yields_empty_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let merged = aggregate_annotations(dir.path()).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_missing_directory_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = aggregate_annotations(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, DataPrepError::Filesystem { .. }));
    }
}
