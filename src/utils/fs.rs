//! Cross-platform filesystem primitives.
//!
//! Mirrors the small set of directory helpers this lineage keeps in
//! `utils::fs`: an idempotent directory-ensure, an atomic write-via-rename,
//! a removal that tolerates read-only files, and a recursive copy that can
//! skip named entries (used to strip `.git` out of a cache checkout before
//! it becomes a workspace package).

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Create `path` and all missing parent directories. A no-op if `path`
/// already exists and is a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| format!("failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Write `content` to `path` via a temp-file-then-rename so readers never
/// observe a partially written file.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content).with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed to finalize write to {}", path.display()))?;
    Ok(())
}

/// Recursively remove `path`. A no-op if it doesn't exist. Clears the
/// read-only attribute before retrying on platforms (Windows chiefly) that
/// enforce per-file write permission, since a cache checkout's files may
/// have been left read-only by `git checkout`.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if !path.exists() && !path.is_symlink() {
        return Ok(());
    }
    if path.is_symlink() || path.is_file() {
        return remove_file_clearing_readonly(path);
    }
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(first_err) => {
            clear_readonly_recursive(path);
            fs::remove_dir_all(path)
                .with_context(|| format!("failed to remove directory {} ({first_err})", path.display()))
        }
    }
}

fn remove_file_clearing_readonly(path: &Path) -> Result<()> {
    if fs::remove_file(path).is_ok() {
        return Ok(());
    }
    let mut perms = fs::metadata(path)?.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(path, perms)?;
    fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))
}

fn clear_readonly_recursive(path: &Path) {
    let Ok(entries) = fs::read_dir(path) else {
        return;
    };
    for entry in entries.flatten() {
        let entry_path = entry.path();
        if let Ok(file_type) = entry.file_type()
            && file_type.is_dir()
            && !file_type.is_symlink()
        {
            clear_readonly_recursive(&entry_path);
        }
        if let Ok(metadata) = entry.metadata() {
            let mut perms = metadata.permissions();
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            let _ = fs::set_permissions(&entry_path, perms);
        }
    }
    if let Ok(metadata) = fs::metadata(path) {
        let mut perms = metadata.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        let _ = fs::set_permissions(path, perms);
    }
}

/// Recursively copy `src` into `dst`, creating `dst` if needed. Entries
/// whose file name matches one of `skip` (e.g. `".git"`) are omitted
/// entirely, directories and all.
pub fn copy_dir_recursive(src: &Path, dst: &Path, skip: &[&str]) -> Result<()> {
    ensure_dir(dst)?;
    for entry in fs::read_dir(src).with_context(|| format!("failed to read directory {}", src.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        if skip.iter().any(|s| name.to_str() == Some(*s)) {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path, skip)?;
        } else if file_type.is_file() {
            fs::copy(&src_path, &dst_path)
                .with_context(|| format!("failed to copy {} to {}", src_path.display(), dst_path.display()))?;
        }
        // Symlinks inside a cache checkout are not followed; git itself
        // rarely produces them for sparse trees and copying a dangling
        // link would just confuse the installed package.
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_dir_recursive_skips_named_entries() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join(".git")).unwrap();
        fs::write(src.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/file.txt"), "hello").unwrap();

        let dst = tmp.path().join("dst");
        copy_dir_recursive(&src, &dst, &[".git"]).unwrap();

        assert!(!dst.join(".git").exists());
        assert_eq!(fs::read_to_string(dst.join("nested/file.txt")).unwrap(), "hello");
    }

    #[test]
    fn remove_dir_all_is_idempotent_on_missing_path() {
        let tmp = TempDir::new().unwrap();
        remove_dir_all(&tmp.path().join("nope")).unwrap();
    }

    #[test]
    fn atomic_write_produces_final_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.txt");
        atomic_write(&path, b"hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn remove_dir_all_clears_readonly_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("ro");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("file.txt");
        fs::write(&file, "x").unwrap();
        let mut perms = fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&file, perms).unwrap();

        remove_dir_all(&dir).unwrap();
        assert!(!dir.exists());
    }
}
