//! JSON document loading and rendering shared by the commands.

use std::io::{BufReader, Write};

use camino::Utf8Path;
use opportunity_core::{Region, RegionTable};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CliError;
use crate::fs::open_utf8_file;

/// Decode a JSON document from `path`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenInput {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseInput {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a region dataset written by `consolidate`.
pub(crate) fn load_dataset(path: &Utf8Path) -> Result<RegionTable, CliError> {
    let regions: Vec<Region> = read_json(path)?;
    RegionTable::from_regions(regions).map_err(|source| CliError::InvalidDataset {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-print `value` as JSON followed by a newline.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}
