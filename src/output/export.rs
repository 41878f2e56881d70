use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::world::World;

/// Errors that can occur while writing the terrain export.
#[derive(Debug)]
pub enum ExportError {
    Io(io::Error),
    Serialize(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
            ExportError::Serialize(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<io::Error> for ExportError {
    fn from(e: io::Error) -> Self {
        ExportError::Io(e)
    }
}

/// Write the final terrain of a world as JSON.
///
/// The file is written next to the target under a temporary name and then
/// renamed, so an existing export is never left half written.
pub fn write_export(world: &World, path: &Path) -> Result<PathBuf, ExportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("terrain.json");
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let encoded = serde_json::to_vec_pretty(&world.export())
        .map_err(|e| ExportError::Serialize(e.to_string()))?;

    if let Err(e) = fs::write(&tmp, &encoded) {
        let _ = fs::remove_file(&tmp);
        return Err(ExportError::Io(e));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(ExportError::Io(e));
    }
    Ok(path.to_path_buf())
}
