//! Test helpers for writing CLI input documents into a scratch directory.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Scratch directory that lives as long as the test holds it.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path(name);
        write_utf8(&path, contents.as_bytes());
        path
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write fixture file");
}

/// Region dataset with three one-bedroom markets; two share a county and
/// carry unit-square geometry.
pub(super) const DATASET: &str = r#"[
  {"id": "94110", "county": "San Francisco", "place_name": "San Francisco",
   "geometry": "MULTIPOLYGON(((0 0,1 0,1 1,0 1,0 0)))",
   "population": 70000, "rent": {"1bd": 3000.0}},
  {"id": "94112", "county": "San Francisco", "place_name": "San Francisco",
   "geometry": "MULTIPOLYGON(((1 0,2 0,2 1,1 1,1 0)))",
   "population": 80000, "rent": {"1bd": 4200.0}},
  {"id": "94601", "county": "Alameda", "place_name": "Oakland",
   "rent": {"1bd": 4300.0}}
]"#;

/// Rent source covering two ZIP codes, one stored as an integer.
pub(super) const RENT_SOURCE: &str = r#"{
  "source_id": "rent",
  "key_column": "ZIP",
  "bindings": [{"column": "RENT_1BD", "target": {"field": "rent", "unit": "1bd"}}],
  "table": {"headers": ["ZIP", "RENT_1BD"], "rows": [[94110, 3000.0], ["94112", 4200.0]]}
}"#;

/// Income source overlapping the rent source on one ZIP code.
pub(super) const INCOME_SOURCE: &str = r#"{
  "source_id": "income",
  "key_column": "ZIP",
  "bindings": [{"column": "MEDIAN_INCOME", "target": {"field": "income"}}],
  "table": {"headers": ["ZIP", "MEDIAN_INCOME"], "rows": [["94110", 95000], ["94601", 72000]]}
}"#;
