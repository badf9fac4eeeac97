//! Registry stored as a single JSON document.
//!
//! The document is an object keyed by pilot id, each value holding the pilot
//! fields plus `timeOfViolation` and `closestDistance`. Saves go to a sibling
//! temp file which is synced and then renamed over the target.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use birdnest_core::ViolatorRegistry;

use super::{RegistryStore, StoreError};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    async fn load(&self) -> Result<ViolatorRegistry, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ViolatorRegistry::new());
            }
            Err(err) => return Err(err.into()),
        };

        // A freshly created, empty file counts as an empty registry
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ViolatorRegistry::new());
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, registry: &ViolatorRegistry) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let payload = serde_json::to_vec_pretty(registry)?;
        let temp = self.temp_path();
        let mut file = fs::File::create(&temp).await?;
        file.write_all(&payload).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(err) = fs::rename(&temp, &self.path).await {
            fs::remove_file(&temp).await.ok();
            return Err(err.into());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use birdnest_core::{PilotRecord, ViolatorRecord};
    use chrono::{TimeZone, Utc};

    fn registry() -> ViolatorRegistry {
        (1..=3)
            .map(|i| ViolatorRecord {
                pilot: PilotRecord {
                    pilot_id: format!("P-{i}"),
                    first_name: "Kim".to_string(),
                    last_name: format!("Pilot{i}"),
                    phone_number: format!("+35840000000{i}"),
                    email: format!("kim{i}@example.com"),
                    created_dt: Some("2022-10-27T16:03:33.212Z".to_string()),
                },
                time_of_violation: Utc.with_ymd_and_hms(2023, 1, 13, 12, 0, i).unwrap()
                    + chrono::Duration::microseconds(123_456),
                closest_distance: 12_345.678_9 * i as f64,
            })
            .collect()
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pilot_information.json");
        std::fs::write(&path, "\n").unwrap();
        assert!(JsonFileStore::new(&path).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pilot_information.json");
        std::fs::write(&path, "{\"P-1\": {\"pilotId\":").unwrap();
        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Serde(_)));
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/dir/registry.json"));

        store.save(&ViolatorRegistry::new()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), ViolatorRegistry::new());

        let original = registry();
        store.save(&original).await.unwrap();
        assert_eq!(store.load().await.unwrap(), original);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("registry.json"));

        store.save(&registry()).await.unwrap();
        store.save(&ViolatorRegistry::new()).await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw.trim(), "{}");
    }

    #[tokio::test]
    async fn file_is_keyed_by_pilot_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("registry.json"));
        store.save(&registry()).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["P-2"]["lastName"], "Pilot2");
        assert!(value["P-2"]["timeOfViolation"].is_string());
    }
}
