//! Atomic bundle writes.
//!
//! Every file is first written next to its destination with a `.tmp`
//! suffix; only when all of them succeeded are they renamed into place.
//! File names coming out of the engine are validated so that nothing can be
//! written outside the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use super::output::OutputFile;
use crate::error::{Error, Result};

/// Write `files` into `dir`, returning the absolute paths written.
pub fn write_output(files: &[OutputFile], dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = validate_and_normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let operations = files
        .iter()
        .map(|file| Ok((validate_output_path(&dir, file.file_name())?, file.contents())))
        .collect::<Result<Vec<_>>>()?;

    write_files_atomic(&operations)?;
    Ok(operations.into_iter().map(|(path, _)| path).collect())
}

/// Remove everything inside `dir` except a `.git` directory.
pub fn empty_dir(dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io_at(dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| Error::io_at(dir, e))?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        let removed = if entry.file_type().map_err(|e| Error::io_at(&path, e))?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| Error::io_at(&path, e))?;
    }

    tracing::debug!(dir = %dir.display(), "emptied output directory");
    Ok(())
}

fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();

    if cleaned.is_absolute() {
        return Ok(cleaned);
    }

    Ok(std::env::current_dir()
        .map_err(|e| Error::InvalidOutputPath(format!("Failed to get current directory: {}", e)))?
        .join(&cleaned)
        .clean())
}

/// Resolve `filename` under `base_dir`, rejecting anything that escapes it.
pub(crate) fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();

    if !full_path.starts_with(base_dir) {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut temp_files = Vec::new();

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path_for(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                tracing::warn!(
                    path = %temp_path.display(),
                    error = %e,
                    "failed to clean up temporary file"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::output::{AssetFile, ChunkFile};
    use tempfile::TempDir;

    #[test]
    fn test_validate_output_path_nested() {
        let base = Path::new("/tmp/output");
        let result = validate_output_path(base, "chunks/shared.js");
        assert_eq!(result.unwrap(), Path::new("/tmp/output/chunks/shared.js"));
    }

    #[test]
    fn test_validate_output_path_traversal() {
        let base = Path::new("/tmp/output");
        let result = validate_output_path(base, "safe/../../../../etc/passwd");
        assert!(matches!(result.unwrap_err(), Error::InvalidOutputPath(_)));
    }

    #[test]
    fn test_validate_output_path_null_byte() {
        let base = Path::new("/tmp/output");
        assert!(validate_output_path(base, "file\0name.js").is_err());
    }

    #[test]
    fn writes_chunks_and_assets_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out/main");
        let files = vec![
            OutputFile::Chunk(ChunkFile {
                file_name: "index.js".into(),
                code: "console.log(1)".into(),
                ..Default::default()
            }),
            OutputFile::Asset(AssetFile::new("chunks/icon-abc.png", vec![1, 2, 3])),
        ];

        let written = write_output(&files, &out).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(out.join("index.js")).unwrap(), "console.log(1)");
        assert_eq!(fs::read(out.join("chunks/icon-abc.png")).unwrap(), vec![1, 2, 3]);
        assert!(!out.join("index.js.tmp").exists());
    }

    #[test]
    fn empty_dir_keeps_git() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("old.js"), "").unwrap();

        empty_dir(dir.path()).unwrap();
        assert!(dir.path().join(".git").exists());
        assert!(!dir.path().join("nested").exists());
        assert!(!dir.path().join("old.js").exists());
    }

    #[test]
    fn empty_dir_ignores_missing_directory() {
        let dir = TempDir::new().unwrap();
        empty_dir(&dir.path().join("missing")).unwrap();
    }
}
