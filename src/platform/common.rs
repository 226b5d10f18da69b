use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Atomically write content to a file that only the owner may read
///
/// Writes to a temporary file in the same directory, restricts its
/// permissions, syncs to disk, then renames over the target path. The
/// content is never visible under the target name in a partial state.
pub fn atomic_write_private(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory_exists(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = File::create(&temp_path).with_context(|| {
            format!("Failed to create temporary file: {}", temp_path.display())
        })?;

        set_owner_only_permissions(&temp_path)?;

        file.write_all(content)
            .context("Failed to write to temporary file")?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

/// Ensure a directory exists, creating it and all parents if needed
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    Ok(())
}

/// Restrict a file to its owner (0600 on Unix, writable on Windows)
pub fn set_owner_only_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for: {}", path.display()))?;

        let mut permissions = metadata.permissions();
        permissions.set_mode(0o600);

        std::fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions for: {}", path.display()))?;
    }

    #[cfg(windows)]
    {
        // ACLs would need extra dependencies; just make sure it isn't read-only
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for: {}", path.display()))?;

        let mut permissions = metadata.permissions();
        permissions.set_readonly(false);

        std::fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions for: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_private() {
        use assert_fs::prelude::*;
        use predicates::prelude::*;

        let temp = assert_fs::TempDir::new().unwrap();
        let settings = temp.child("settings.yaml");

        atomic_write_private(settings.path(), b"lock_time: 60\n").unwrap();

        settings.assert("lock_time: 60\n");
        temp.child("settings.tmp").assert(predicate::path::missing());
    }

    #[test]
    fn test_atomic_write_nested_path() {
        let temp_dir = tempdir().unwrap();
        let test_file = temp_dir.path().join("nested").join("path").join("settings.yaml");

        atomic_write_private(&test_file, b"nested").unwrap();
        assert_eq!(std::fs::read(&test_file).unwrap(), b"nested");
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = tempdir().unwrap();
        let test_file = temp_dir.path().join("settings.yaml");

        atomic_write_private(&test_file, b"first").unwrap();
        atomic_write_private(&test_file, b"second").unwrap();
        assert_eq!(std::fs::read(&test_file).unwrap(), b"second");
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let test_file = temp_dir.path().join("settings.yaml");
        atomic_write_private(&test_file, b"app_password: x").unwrap();

        let mode = std::fs::metadata(&test_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_ensure_directory_exists_idempotent() {
        let temp_dir = tempdir().unwrap();
        let test_dir = temp_dir.path().join("a").join("b");

        ensure_directory_exists(&test_dir).unwrap();
        ensure_directory_exists(&test_dir).unwrap();
        assert!(test_dir.is_dir());
    }
}
