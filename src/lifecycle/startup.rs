//! Filesystem preparation before handoff.
//!
//! # Responsibilities
//! - Create the data directory if missing
//! - Write the resolved config so readers never see a partial file

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::template::ResolvedConfig;

#[derive(Debug, Error)]
#[error("failed to {action} {path}: {source}")]
pub struct WriteError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Create `dir` and its parents. Succeeds if it already exists.
pub fn ensure_data_dir(dir: &Path) -> Result<(), WriteError> {
    fs::create_dir_all(dir).map_err(|source| WriteError {
        action: "create data directory",
        path: dir.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %dir.display(), "Data directory ready");
    Ok(())
}

fn err(action: &'static str, target: &Path) -> impl FnOnce(io::Error) -> WriteError {
    let path = target.to_path_buf();
    move |source| WriteError { action, path, source }
}

/// Write `config` to `path` via a sibling temp file and rename.
pub fn write_config(path: &Path, config: &ResolvedConfig) -> Result<(), WriteError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(err("create config directory", parent))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut file = fs::File::create(&tmp).map_err(err("create", &tmp))?;
    file.write_all(config.to_text().as_bytes()).map_err(err("write", &tmp))?;
    file.sync_all().map_err(err("sync", &tmp))?;
    drop(file);

    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err("rename into place", path)(source));
    }

    tracing::info!(path = %path.display(), lines = config.lines().len(), "Wrote config");
    Ok(())
}
