//! Reading the source policy table.
//!
//! Every column is read as text so that year and category cells keep their
//! raw form until the type caster handles them. Exports of the database are
//! not always UTF-8; when decoding fails the bytes are read as Windows-1252,
//! the superset of Latin-1 that legacy exports are written in.

use crate::error::{PolicyError, Result};
use encoding_rs::WINDOWS_1252;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the policy CSV at `path`.
pub fn load_policy_csv(path: &Path) -> Result<DataFrame> {
    info!("Loading policy table from: {}", path.display());
    let bytes = std::fs::read(path).map_err(|e| {
        PolicyError::Io(e).with_context(format!("reading {}", path.display()))
    })?;
    let df = read_csv_bytes(bytes)?;
    debug!("Loaded table with shape {:?}", df.shape());
    Ok(df)
}

/// Parse CSV content, falling back to Windows-1252 when it is not valid UTF-8.
pub fn read_csv_bytes(bytes: Vec<u8>) -> Result<DataFrame> {
    let bytes = match String::from_utf8(bytes) {
        Ok(text) => text.into_bytes(),
        Err(e) => {
            warn!("Input is not valid UTF-8, decoding as Windows-1252");
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(e.as_bytes());
            text.into_owned().into_bytes()
        }
    };

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}
