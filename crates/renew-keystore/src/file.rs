use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::{CredentialStore, StoreError};

/// Credentials kept as a flat JSON object on disk.
///
/// Writes go to a temporary file in the same directory that is renamed over
/// the target, so readers (in this process or another) never see a partial
/// file.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(io_error(&self.path, err)),
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|err| StoreError::Corrupt {
            message: format!("{}: {err}", self.path.display()),
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|err| io_error(parent, err))?;
        let contents = serde_json::to_string_pretty(entries).map_err(|err| StoreError::Corrupt {
            message: err.to_string(),
        })?;

        let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(|err| io_error(parent, err))?;
        restrict_permissions(staged.path())?;
        staged
            .write_all(contents.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|err| io_error(staged.path(), err))?;
        staged
            .persist(&self.path)
            .map_err(|err| io_error(&self.path, err.error))?;
        Ok(())
    }

    fn update(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Unavailable {
            message: "failed to lock credential file".to_string(),
        })?;
        let mut entries = self.read_entries()?;
        f(&mut entries);
        self.write_entries(&entries)
    }
}

impl CredentialStore for FileStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_entries()?.remove(name))
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(name.to_string(), value.to_string());
        })?;
        debug!(path = %self.path.display(), name, "stored credential in file");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(name);
        })
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Io {
        message: format!("{}: {err}", path.display()),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|err| io_error(path, err))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CredentialPair, ACCESS_TOKEN, REFRESH_TOKEN};

    #[test]
    fn missing_file_reads_empty() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get(ACCESS_TOKEN)?, None);
        store.remove(ACCESS_TOKEN)?;
        assert!(!store.path().exists());
        Ok(())
    }

    #[test]
    fn file_roundtrip_creates_parents() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("nested").join("creds.json"));
        store.replace_credentials(&CredentialPair::new("a1", "r1"))?;

        let reopened = FileStore::new(store.path().to_path_buf());
        assert_eq!(reopened.get(ACCESS_TOKEN)?.as_deref(), Some("a1"));
        assert_eq!(reopened.get(REFRESH_TOKEN)?.as_deref(), Some("r1"));

        reopened.clear_credentials()?;
        assert_eq!(store.credentials()?, None);
        Ok(())
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("creds.json");
        fs::write(&path, "not json").expect("write");
        let store = FileStore::new(path);
        assert!(matches!(
            store.get(ACCESS_TOKEN),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn readers_never_see_a_partial_write() -> Result<(), StoreError> {
        use std::sync::atomic::{AtomicBool, Ordering};

        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("creds.json"));
        store.replace_credentials(&CredentialPair::new("a0", "r0"))?;
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..300 {
                    store
                        .replace_credentials(&CredentialPair::new(
                            format!("a{round}"),
                            format!("r{round}"),
                        ))
                        .expect("write");
                }
                done.store(true, Ordering::SeqCst);
            });
            while !done.load(Ordering::SeqCst) {
                assert!(store.get(ACCESS_TOKEN).expect("read access").is_some());
                assert!(store.get(REFRESH_TOKEN).expect("read refresh").is_some());
            }
        });
        assert_eq!(store.get(ACCESS_TOKEN)?.as_deref(), Some("a299"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("creds.json"));
        store.set(ACCESS_TOKEN, "a1").expect("set");
        let mode = fs::metadata(store.path()).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
