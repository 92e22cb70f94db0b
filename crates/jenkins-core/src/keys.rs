use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Source of secrets (API tokens, build trigger tokens) addressed by a
/// storage path such as `keys/jenkins/api-token`.
pub trait KeyStorage {
    /// A blank `path` means "not configured" and yields `Ok(None)`.
    fn lookup(&self, path: &str) -> io::Result<Option<String>>;
}

impl<K: KeyStorage + ?Sized> KeyStorage for &K {
    fn lookup(&self, path: &str) -> io::Result<Option<String>> {
        (**self).lookup(path)
    }
}

/// Key storage backed by one file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileKeyStorage {
    root: PathBuf,
}

impl FileKeyStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("key storage path escapes the storage root: {path}"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl KeyStorage for FileKeyStorage {
    fn lookup(&self, path: &str) -> io::Result<Option<String>> {
        if path.trim().is_empty() {
            return Ok(None);
        }
        let file = self.resolve(path.trim())?;
        let contents = std::fs::read_to_string(&file)?;
        let contents = contents
            .strip_suffix('\n')
            .map(|s| s.strip_suffix('\r').unwrap_or(s))
            .unwrap_or(&contents);
        Ok(Some(contents.to_string()))
    }
}

/// In-memory key storage.
impl KeyStorage for HashMap<String, String> {
    fn lookup(&self, path: &str) -> io::Result<Option<String>> {
        if path.trim().is_empty() {
            return Ok(None);
        }
        self.get(path.trim()).cloned().map(Some).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no key at {path}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage_with(path: &str, contents: &str) -> (TempDir, FileKeyStorage) {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, contents).unwrap();
        let storage = FileKeyStorage::new(dir.path());
        (dir, storage)
    }

    #[test]
    fn reads_key_without_trailing_newline() {
        let (_dir, storage) = storage_with("keys/jenkins/token", "11d0abc\n");
        assert_eq!(
            storage.lookup("keys/jenkins/token").unwrap().as_deref(),
            Some("11d0abc")
        );
        assert_eq!(
            storage.lookup("/keys/jenkins/token").unwrap().as_deref(),
            Some("11d0abc")
        );
    }

    #[test]
    fn crlf_is_stripped_once() {
        let (_dir, storage) = storage_with("k", "secret\r\n");
        assert_eq!(storage.lookup("k").unwrap().as_deref(), Some("secret"));
    }

    #[test]
    fn blank_path_is_not_configured() {
        let storage = FileKeyStorage::new("/nonexistent");
        assert_eq!(storage.lookup("").unwrap(), None);
        assert_eq!(storage.lookup("   ").unwrap(), None);
    }

    #[test]
    fn missing_key_is_an_error() {
        let (_dir, storage) = storage_with("keys/a", "x");
        let err = storage.lookup("keys/b").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn parent_components_are_rejected() {
        let (_dir, storage) = storage_with("keys/a", "x");
        let err = storage.lookup("keys/../../etc/passwd").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn map_storage() {
        let keys: HashMap<String, String> = [("keys/t".to_string(), "v".to_string())].into();
        assert_eq!(keys.lookup("keys/t").unwrap().as_deref(), Some("v"));
        assert_eq!(keys.lookup("").unwrap(), None);
        assert!(keys.lookup("keys/missing").is_err());
    }
}
