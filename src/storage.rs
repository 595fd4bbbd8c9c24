use std::{
    ffi::OsString,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::users::repo_types::User;

/// Durable side of the user store. `save` replaces the whole collection.
pub trait RecordFile: Send + Sync {
    fn load(&self) -> anyhow::Result<Vec<User>>;
    fn save(&self, users: &[User]) -> anyhow::Result<()>;
}

/// JSON array on disk, written with two-space indentation.
///
/// Saves go to a sibling `.tmp` file which is synced and then renamed over
/// the target, so a failed save leaves the previous contents in place.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl RecordFile for JsonFile {
    fn load(&self) -> anyhow::Result<Vec<User>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let users = serde_json::from_str(&raw)
            .with_context(|| format!("parse {}", self.path.display()))?;
        Ok(users)
    }

    fn save(&self, users: &[User]) -> anyhow::Result<()> {
        let body = serde_json::to_string_pretty(users).context("encode users")?;
        let tmp = self.tmp_path();

        if let Err(e) = write_synced(&tmp, body.as_bytes()) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("write {}", tmp.display()));
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("replace {}", self.path.display()));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use fake::MemoryFile;


#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, email: &str) -> User {
        User {
            id,
            email: email.into(),
            password_hash: "c2FsdA$ZGlnZXN0".into(),
        }
    }

    #[test]
    fn save_then_load_returns_same_users() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("users.json"));
        let users = vec![user(1, "a@b.com"), user(2, "c@d.com")];

        file.save(&users).unwrap();
        assert_eq!(file.load().unwrap(), users);
    }

    #[test]
    fn save_writes_two_space_indented_array() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("users.json"));
        file.save(&[user(1, "a@b.com")]).unwrap();

        let raw = std::fs::read_to_string(&file.path).unwrap();
        assert!(raw.starts_with("[\n  {\n    \"id\": 1,"));
        assert!(raw.contains("\"password\": \"c2FsdA$ZGlnZXN0\""));
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("users.json"));
        file.save(&[user(1, "a@b.com"), user(2, "c@d.com")]).unwrap();
        file.save(&[]).unwrap();

        assert_eq!(std::fs::read_to_string(&file.path).unwrap(), "[]");
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = JsonFile::new(dir.path().join("absent.json"));
        let err = missing.load().unwrap_err();
        assert!(format!("{err:#}").contains("absent.json"));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFile::new(&path).load().unwrap_err();
        assert!(err.to_string().starts_with("parse"));
    }

    #[test]
    fn failed_save_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("users.json"));
        let before = vec![user(1, "a@b.com"), user(2, "c@d.com")];
        file.save(&before).unwrap();
        let raw_before = std::fs::read_to_string(&file.path).unwrap();

        // a directory squatting on the temp path makes the write fail
        std::fs::create_dir(file.tmp_path()).unwrap();
        let err = file.save(&[user(3, "e@f.com")]).unwrap_err();
        assert!(format!("{err:#}").contains("users.json.tmp"));

        assert_eq!(std::fs::read_to_string(&file.path).unwrap(), raw_before);
        assert_eq!(file.load().unwrap(), before);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("users.json"));
        file.save(&[user(1, "a@b.com")]).unwrap();

        assert!(!file.tmp_path().exists());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("users.json")]);
    }

    #[test]
    fn shipped_data_file_loads() {
        let file = JsonFile::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/users.json"));
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn save_fails_when_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nope").join("users.json"));
        assert!(file.save(&[user(1, "a@b.com")]).is_err());
    }
}
