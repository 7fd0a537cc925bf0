//! PresetStore - CRUD over `name -> MixerState` in sled

use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::PresetError;
use crate::mixer::MixerState;

/// Name of the sled tree holding presets
const PRESETS_TREE: &str = "presets";

/// Durable preset collection
///
/// Cheap to clone; clones share the same database.
#[derive(Clone)]
pub struct PresetStore {
    _db: sled::Db,
    tree: sled::Tree,
}

impl PresetStore {
    /// Open (or create) the preset database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        info!("Preset database opened at: {}", path.display());
        Self::from_db(db)
    }

    /// In-memory database discarded on drop
    pub fn temporary() -> Result<Self, PresetError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    /// Open the database at `path`, or fall back to an empty temporary one
    ///
    /// An unreadable database is treated as an empty collection so the
    /// service keeps running; presets saved afterwards do not survive a
    /// restart.
    pub fn open_or_temporary(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        match Self::open(path.as_ref()) {
            Ok(store) => Ok(store),
            Err(e) => {
                error!(
                    "Cannot open preset database at {} ({}), using an empty in-memory store",
                    path.as_ref().display(),
                    e
                );
                Self::temporary()
            }
        }
    }

    fn from_db(db: sled::Db) -> Result<Self, PresetError> {
        let tree = db.open_tree(PRESETS_TREE)?;
        Ok(Self { _db: db, tree })
    }

    /// Insert or overwrite a preset
    pub fn save(&self, name: &str, state: &MixerState) -> Result<(), PresetError> {
        if name.trim().is_empty() {
            return Err(PresetError::EmptyName);
        }

        let json = serde_json::to_vec(state)?;
        self.tree.insert(name.as_bytes(), json)?;
        self.tree.flush()?;

        debug!("Preset '{}' written ({} channels)", name, state.channel_count());
        Ok(())
    }

    /// Fetch a preset
    pub fn load(&self, name: &str) -> Result<MixerState, PresetError> {
        let data = self
            .tree
            .get(name.as_bytes())?
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;

        serde_json::from_slice(&data).map_err(|source| PresetError::Parse {
            name: name.to_string(),
            source,
        })
    }

    /// Remove a preset; returns whether it existed
    pub fn delete(&self, name: &str) -> Result<bool, PresetError> {
        let existed = self.tree.remove(name.as_bytes())?.is_some();
        if existed {
            self.tree.flush()?;
        }
        Ok(existed)
    }

    /// Preset names in storage order
    ///
    /// Unreadable entries are skipped and logged.
    pub fn list(&self) -> Vec<String> {
        self.tree
            .iter()
            .keys()
            .filter_map(|key| match key {
                Ok(key) => Some(String::from_utf8_lossy(&key).into_owned()),
                Err(e) => {
                    warn!("Skipping unreadable preset key: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Import presets from a legacy JSON mapping file
    ///
    /// Accepts `{name: [bus x4]}` or `{"presets": {name: [bus x4]}}`. A
    /// missing or corrupt file imports nothing; invalid entries are
    /// skipped. Returns the number of presets imported.
    pub fn import_json(&self, path: impl AsRef<Path>) -> Result<usize, PresetError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No preset file at {}, nothing to import", path.display());
                return Ok(0);
            }
            Err(source) => {
                return Err(PresetError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut root: Map<String, Value> = match serde_json::from_str(&text) {
            Ok(root) => root,
            Err(e) => {
                warn!("Preset file {} is corrupt ({}), nothing imported", path.display(), e);
                return Ok(0);
            }
        };

        if let Some(Value::Object(nested)) = root.remove("presets") {
            root = nested;
        }

        let mut imported = 0;
        for (name, value) in root {
            match serde_json::from_value::<MixerState>(value) {
                Ok(state) => match self.save(&name, &state) {
                    Ok(()) => imported += 1,
                    Err(e) => warn!("Skipping preset '{}': {}", name, e),
                },
                Err(e) => warn!("Skipping invalid preset '{}': {}", name, e),
            }
        }

        info!("Imported {} presets from {}", imported, path.display());
        Ok(imported)
    }

    /// Export all readable presets to a JSON mapping file
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<usize, PresetError> {
        let path = path.as_ref();
        let mut root = Map::new();

        for name in self.list() {
            match self.load(&name) {
                Ok(state) => {
                    root.insert(name, serde_json::to_value(state)?);
                }
                Err(e) => warn!("Not exporting preset '{}': {}", name, e),
            }
        }

        let count = root.len();
        let json = serde_json::to_string_pretty(&Value::Object(root))?;
        std::fs::write(path, json).map_err(|source| PresetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Exported {} presets to {}", count, path.display());
        Ok(count)
    }

    #[cfg(test)]
    fn insert_raw(&self, name: &str, data: &[u8]) {
        self.tree.insert(name.as_bytes(), data).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::{ChannelUpdate, MixerStore};
    use tempfile::tempdir;

    fn sample_state() -> MixerState {
        let mut store = MixerStore::new(&["Kick", "Snare", "Vox"], 70);
        store
            .apply_update(
                2,
                1,
                &ChannelUpdate {
                    fader: Some(12),
                    pan: Some(90),
                    muted: Some(true),
                    hidden: Some(true),
                    name: Some("Snr".into()),
                },
            )
            .unwrap();
        store.snapshot()
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let store = PresetStore::temporary().unwrap();
        let state = sample_state();

        store.save("Sunday", &state).unwrap();
        assert_eq!(store.load("Sunday").unwrap(), state);
    }

    #[test]
    fn test_save_overwrites() {
        let store = PresetStore::temporary().unwrap();
        store.save("A", &MixerState::new(&["x"], 0)).unwrap();
        let newer = sample_state();
        store.save("A", &newer).unwrap();

        assert_eq!(store.load("A").unwrap(), newer);
        assert_eq!(store.list(), vec!["A".to_string()]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let store = PresetStore::temporary().unwrap();
        let err = store.save("  ", &sample_state()).unwrap_err();
        assert!(matches!(err, PresetError::EmptyName));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let store = PresetStore::temporary().unwrap();
        assert!(matches!(store.load("nope"), Err(PresetError::NotFound(_))));

        store.insert_raw("bad", b"[[{]]");
        assert!(matches!(store.load("bad"), Err(PresetError::Parse { .. })));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let store = PresetStore::temporary().unwrap();
        store.save("Keep", &sample_state()).unwrap();

        assert!(!store.delete("Ghost").unwrap());
        assert_eq!(store.list(), vec!["Keep".to_string()]);

        assert!(store.delete("Keep").unwrap());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("presets.sled");
        let state = sample_state();

        {
            let store = PresetStore::open(&path).unwrap();
            store.save("Show", &state).unwrap();
        }

        let reopened = PresetStore::open(&path).unwrap();
        assert_eq!(reopened.list(), vec!["Show".to_string()]);
        assert_eq!(reopened.load("Show").unwrap(), state);
    }

    #[test]
    fn test_open_or_temporary_recovers() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-db");
        std::fs::write(&file, b"plain file").unwrap();

        let store = PresetStore::open_or_temporary(&file).unwrap();
        assert!(store.list().is_empty());
        store.save("Works", &sample_state()).unwrap();
        assert_eq!(store.list(), vec!["Works".to_string()]);
    }

    #[test]
    fn test_import_legacy_formats() {
        let dir = tempdir().unwrap();
        let state = serde_json::to_value(sample_state()).unwrap();

        let flat = dir.path().join("presets.json");
        std::fs::write(
            &flat,
            serde_json::json!({ "Rehearsal": state, "Broken": [[]] }).to_string(),
        )
        .unwrap();

        let nested = dir.path().join("config.json");
        std::fs::write(
            &nested,
            serde_json::json!({ "presets": { "Gig": state } }).to_string(),
        )
        .unwrap();

        let store = PresetStore::temporary().unwrap();
        assert_eq!(store.import_json(&flat).unwrap(), 1);
        assert_eq!(store.import_json(&nested).unwrap(), 1);
        assert_eq!(store.list(), vec!["Gig".to_string(), "Rehearsal".to_string()]);
    }

    #[test]
    fn test_import_missing_or_corrupt_is_empty() {
        let dir = tempdir().unwrap();
        let store = PresetStore::temporary().unwrap();
        assert_eq!(store.import_json(dir.path().join("absent.json")).unwrap(), 0);

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{ nope").unwrap();
        assert_eq!(store.import_json(&corrupt).unwrap(), 0);
    }

    #[test]
    fn test_export_then_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        let source = PresetStore::temporary().unwrap();
        source.save("One", &sample_state()).unwrap();
        source.save("Two", &MixerState::new(&["a", "b"], 5)).unwrap();

        assert_eq!(source.export_json(&path).unwrap(), 2);

        let target = PresetStore::temporary().unwrap();
        assert_eq!(target.import_json(&path).unwrap(), 2);
        assert_eq!(target.load("One").unwrap(), sample_state());
    }
}
