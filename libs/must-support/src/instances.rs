//! Instance document loading

use crate::aggregate::InstanceDocument;
use crate::diagnostics::Diagnostics;
use crate::error::Warning;
use msfind_models::common::Bundle;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Load every `*.json` Bundle in `dir`, in file name order.
///
/// A missing directory yields no documents. Files that are not readable JSON Bundles are
/// skipped with an [`Warning::InstanceParse`].
pub fn load_instances(dir: &Path, diagnostics: &mut Diagnostics) -> Vec<InstanceDocument> {
    let paths = match json_files(dir) {
        Ok(paths) => paths,
        Err(e) => {
            diagnostics.push(Warning::InstanceParse {
                file: dir.display().to_string(),
                reason: format!("instance directory unavailable: {}", e),
            });
            return Vec::new();
        }
    };

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match read_bundle(&path) {
            Ok(bundle) => documents.push(InstanceDocument::new(name, bundle)),
            Err(reason) => diagnostics.push(Warning::InstanceParse { file: name, reason }),
        }
    }

    info!(dir = %dir.display(), documents = documents.len(), "Loaded instance documents");
    documents
}

fn json_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension() == Some("json".as_ref()) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_bundle(path: &Path) -> Result<Bundle, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| format!("invalid JSON: {}", e))?;
    Bundle::from_value(value).map_err(|e| e.to_string())
}
