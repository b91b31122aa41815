use std::path::{Path, PathBuf};

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn list(&self, dir: &str) -> Vec<String>;
}

/// Filesystem storage rooted at `base_dir`. Identifiers may contain `/` to
/// address nested directories, which are created on write.
#[derive(Clone, Debug)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }

    fn path_of(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.path_of(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path_of(ident))
    }

    /// Writes to a uniquely named sibling first and renames it over the
    /// target, so readers observe either the old or the new content.
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.path_of(ident);
        let parent = path.parent().unwrap_or(&self.base_dir).to_path_buf();
        std::fs::create_dir_all(&parent)?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("blob");
        let temp_path = parent.join(format!(
            ".{}-{file_name}.tmp",
            rusty_ulid::Ulid::generate()
        ));

        if let Err(err) = std::fs::write(&temp_path, data) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }

        if let Err(err) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }

        Ok(())
    }

    /// Lists entry names (files and directories) directly under `dir`,
    /// skipping hidden temp files. Sorted for stable output.
    fn list(&self, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path_of(dir))
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
                    .filter(|name| !name.starts_with('.'))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_nested_dirs_and_replaces_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(tmp.path()).unwrap();

        store.write("a/b/file.txt", b"one").unwrap();
        store.write("a/b/file.txt", b"two").unwrap();

        assert!(store.exists("a/b/file.txt"));
        assert_eq!(store.read("a/b/file.txt").unwrap(), b"two");
        assert_eq!(store.list("a/b"), vec!["file.txt".to_string()]);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(tmp.path()).unwrap();
        assert!(store.list("nope").is_empty());
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(tmp.path()).unwrap();

        // a non-empty directory cannot be replaced by a file
        store.write("target/inner", b"1").unwrap();
        assert!(store.write("target", b"2").is_err());

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "stray temp files: {leftovers:?}");
        assert_eq!(store.read("target/inner").unwrap(), b"1");
    }
}
