//! Expansion of an input payload into named text files. Shared by the
//! parsing worker and the CLI; the `zip` crate does the heavy lifting.

use std::io::{Cursor, Read};

use log::debug;

use crate::classify;
use crate::error::LayerError;
use crate::protocol::{NamedFile, WorkInput};

/// Unpack a zip archive into named text blobs. Directory entries and files
/// with banned extensions are skipped without a trace in the result; file
/// content is decoded lossily, since fabrication text formats are ASCII in
/// practice.
pub fn expand_zip(bytes: &[u8]) -> Result<Vec<NamedFile>, LayerError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut files = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let file_name = entry.name().to_string();
        if classify::is_banned(&file_name) {
            debug!("ignoring banned entry {file_name}");
            continue;
        }
        let mut raw = Vec::new();
        entry.read_to_end(&mut raw)?;
        files.push(NamedFile {
            file_name,
            content: String::from_utf8_lossy(&raw).into_owned(),
        });
    }
    Ok(files)
}

/// Expand a request input into its flat file list: zip contents first, then
/// any loose files, minus banned extensions.
pub fn expand_input(input: &WorkInput) -> Result<Vec<NamedFile>, LayerError> {
    let mut files = match &input.zip {
        Some(bytes) => expand_zip(bytes)?,
        None => Vec::new(),
    };
    if let Some(loose) = &input.files {
        files.extend(
            loose
                .iter()
                .filter(|f| !classify::is_banned(&f.file_name))
                .cloned(),
        );
    }
    if files.is_empty() && input.zip.is_none() && input.files.is_none() {
        return Err(LayerError::UnsupportedArchive("empty input".into()));
    }
    Ok(files)
}
