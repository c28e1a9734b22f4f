//! Writing generated file sets to disk

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

/// A file written by `write_files`
#[derive(Debug, Clone)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Check that a server-supplied path stays inside the output directory
pub fn safe_relative(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        anyhow::bail!("refusing to write a file with an empty path");
    }

    let relative = Path::new(path);
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                anyhow::bail!("refusing to write outside the output directory: {}", path)
            }
        }
    }

    Ok(relative.to_path_buf())
}

/// Write every file under `dir`, creating parent directories as needed
///
/// All paths are checked before anything is written.
pub fn write_files(dir: &Path, files: &BTreeMap<String, String>) -> Result<Vec<WrittenFile>> {
    let targets = files
        .iter()
        .map(|(path, content)| Ok((dir.join(safe_relative(path)?), content)))
        .collect::<Result<Vec<_>>>()?;

    let mut written = Vec::with_capacity(targets.len());
    for (path, content) in targets {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(WrittenFile {
            path,
            bytes: content.len(),
        });
    }

    Ok(written)
}
