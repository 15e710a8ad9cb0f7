// Storage module - write-through persistence for sessions, topics and repo history
//
// Everything is stored as pretty JSON under the data directory:
// - instances.json   every session across every repository
// - topics.json      every topic
// - state.json       recently opened repositories, most recent first
//
// Files are rewritten whole on each save. A missing file loads as empty.
// Callers surface errors to the operator; nothing here rolls back memory.

use crate::session::{Session, Topic};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const INSTANCES_FILE: &str = "instances.json";
const TOPICS_FILE: &str = "topics.json";
const STATE_FILE: &str = "state.json";

/// Where controller state survives restarts
pub trait Persistence: Send {
    fn save_instances(&self, sessions: &[Session]) -> Result<()>;
    fn load_instances(&self) -> Result<Vec<Session>>;
    fn save_topics(&self, topics: &[Topic]) -> Result<()>;
    fn load_topics(&self) -> Result<Vec<Topic>>;
    fn save_recent_repos(&self, repos: &[PathBuf]) -> Result<()>;
    fn load_recent_repos(&self) -> Result<Vec<PathBuf>>;
}

/// Small state bag kept next to the session records
#[derive(Debug, Default, Serialize, Deserialize)]
struct AppState {
    #[serde(default)]
    recent_repos: Vec<PathBuf>,
}

/// JSON files under one directory
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Create the store, making sure the directory exists
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path(name);
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {}", name))?;

        // Write beside the target then rename, so a crash never leaves half a file
        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("Failed to open {}", tmp.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        file.flush().context("Failed to flush store file")?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        read_json_file(&self.path(name))
    }

    fn load_state(&self) -> Result<AppState> {
        self.read_json(STATE_FILE)
    }
}

fn read_json_file<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(T::default()),
        Ok(contents) => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

impl Persistence for JsonStore {
    fn save_instances(&self, sessions: &[Session]) -> Result<()> {
        // Sessions still being named have no identity yet
        let named: Vec<&Session> = sessions.iter().filter(|s| !s.title.is_empty()).collect();
        self.write_json(INSTANCES_FILE, &named)
    }

    fn load_instances(&self) -> Result<Vec<Session>> {
        self.read_json(INSTANCES_FILE)
    }

    fn save_topics(&self, topics: &[Topic]) -> Result<()> {
        self.write_json(TOPICS_FILE, topics)
    }

    fn load_topics(&self) -> Result<Vec<Topic>> {
        self.read_json(TOPICS_FILE)
    }

    fn save_recent_repos(&self, repos: &[PathBuf]) -> Result<()> {
        let mut state = self.load_state().unwrap_or_default();
        state.recent_repos = repos.to_vec();
        self.write_json(STATE_FILE, &state)
    }

    fn load_recent_repos(&self) -> Result<Vec<PathBuf>> {
        Ok(self.load_state()?.recent_repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionOptions, Status};

    fn session(title: &str) -> Session {
        Session::new(SessionOptions {
            title: title.to_string(),
            repo_path: PathBuf::from("/repo"),
            program: "claude".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("nested")).unwrap();
        assert!(store.load_instances().unwrap().is_empty());
        assert!(store.load_topics().unwrap().is_empty());
        assert!(store.load_recent_repos().unwrap().is_empty());
    }

    #[test]
    fn sessions_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf()).unwrap();

        let mut a = session("alpha");
        a.started = true;
        a.set_status(Status::Paused);
        store.save_instances(&[a, session("beta")]).unwrap();

        let loaded = store.load_instances().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].title, "alpha");
        assert_eq!(loaded[0].status, Status::Paused);
        assert!(!dir.path().join("instances.json.tmp").exists());
    }

    #[test]
    fn unnamed_sessions_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf()).unwrap();
        store.save_instances(&[session(""), session("kept")]).unwrap();
        let loaded = store.load_instances().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "kept");
    }

    #[test]
    fn topics_and_recent_repos_are_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf()).unwrap();

        store
            .save_topics(&[Topic::new("auth", PathBuf::from("/repo"), true)])
            .unwrap();
        store
            .save_recent_repos(&[PathBuf::from("/a"), PathBuf::from("/b")])
            .unwrap();

        assert_eq!(store.load_topics().unwrap()[0].name, "auth");
        assert_eq!(
            store.load_recent_repos().unwrap(),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert!(dir.path().join("state.json").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("topics.json"), "{not json").unwrap();
        let store = JsonStore::new(dir.path().to_path_buf()).unwrap();
        let err = store.load_topics().unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
