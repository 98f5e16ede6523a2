use std::{
    path::PathBuf,
    sync::Arc,
};

use chrono::Utc;
use tokio::{fs, sync::RwLock};
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, models::pin::LocationPin};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Drop every existing record first.
    pub truncate: bool,
    /// Compute the outcome without touching the stored records.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Server side record store of the locations API, persisted as one JSON array.
#[derive(Clone)]
pub struct LocationRepository {
    path: Arc<PathBuf>,
    records: Arc<RwLock<Vec<LocationPin>>>,
}

impl LocationRepository {
    pub async fn open(path: PathBuf) -> Result<Self, AppError> {
        let records: Vec<LocationPin> = if fs::try_exists(&path).await? {
            let raw = fs::read(&path).await?;
            if raw.is_empty() {
                Vec::new()
            } else {
                serde_json::from_slice(&raw)?
            }
        } else {
            Vec::new()
        };
        info!(path = %path.display(), count = records.len(), "opened location records");
        Ok(Self {
            path: Arc::new(path),
            records: Arc::new(RwLock::new(records)),
        })
    }

    /// Most recently updated first.
    pub async fn list(&self) -> Vec<LocationPin> {
        let mut items = self.records.read().await.clone();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        items
    }

    pub async fn get(&self, id: &str) -> Result<LocationPin, AppError> {
        let id = canonical_id(id)?;
        self.records
            .read()
            .await
            .iter()
            .find(|pin| pin.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    /// Keeps a client supplied UUID, replaces anything else with a fresh one.
    pub async fn create(&self, mut pin: LocationPin) -> Result<LocationPin, AppError> {
        let id = Uuid::parse_str(&pin.id).unwrap_or_else(|_| Uuid::new_v4());
        let now = Utc::now().to_rfc3339();
        pin.id = id.to_string();
        if pin.created_at.is_none() {
            pin.created_at = Some(now.clone());
        }
        pin.updated_at = Some(now);

        let mut records = self.records.write().await;
        if records.iter().any(|existing| existing.id == pin.id) {
            return Err(AppError::Validation(format!(
                "location {} already exists",
                pin.id
            )));
        }
        records.push(pin.clone());
        self.persist(&records).await?;
        Ok(pin)
    }

    /// Bulk load of exported pins. Records are matched by UUID; ids that are not
    /// UUIDs get a fresh one, so re-importing such a file inserts again.
    pub async fn import(
        &self,
        pins: Vec<LocationPin>,
        options: ImportOptions,
    ) -> Result<ImportStats, AppError> {
        let mut records = self.records.write().await;
        let mut staged = if options.truncate {
            Vec::new()
        } else {
            records.clone()
        };
        let mut stats = ImportStats {
            deleted: records.len() - staged.len(),
            ..ImportStats::default()
        };

        for mut pin in pins {
            pin.id = Uuid::parse_str(&pin.id)
                .unwrap_or_else(|_| Uuid::new_v4())
                .to_string();
            let created_at = pin
                .created_at
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339());
            if pin.updated_at.is_none() {
                pin.updated_at = Some(created_at.clone());
            }

            match staged.iter_mut().find(|existing| existing.id == pin.id) {
                Some(existing) => {
                    pin.created_at = existing.created_at.clone().or(Some(created_at));
                    *existing = pin;
                    stats.updated += 1;
                }
                None => {
                    pin.created_at = Some(created_at);
                    staged.push(pin);
                    stats.inserted += 1;
                }
            }
        }

        if options.dry_run {
            info!(?stats, "import dry run, nothing written");
            return Ok(stats);
        }
        self.persist(&staged).await?;
        *records = staged;
        info!(?stats, "import committed");
        Ok(stats)
    }

    pub async fn update(&self, id: &str, mut pin: LocationPin) -> Result<LocationPin, AppError> {
        let id = canonical_id(id)?;
        let mut records = self.records.write().await;
        let existing = records
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or(AppError::NotFound)?;

        pin.id = id;
        if existing.created_at.is_some() {
            pin.created_at = existing.created_at.clone();
        }
        pin.updated_at = Some(Utc::now().to_rfc3339());
        *existing = pin.clone();
        self.persist(&records).await?;
        Ok(pin)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = canonical_id(id)?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|pin| pin.id != id);
        if records.len() == before {
            return Err(AppError::NotFound);
        }
        self.persist(&records).await
    }

    async fn persist(&self, records: &[LocationPin]) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(records)?;
        fs::write(self.path.as_ref(), data).await?;
        Ok(())
    }
}

/// Record ids are hyphenated lowercase UUIDs; anything that does not parse
/// cannot exist.
fn canonical_id(id: &str) -> Result<String, AppError> {
    Uuid::parse_str(id)
        .map(|uuid| uuid.to_string())
        .map_err(|_| AppError::NotFound)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::pin::{Coordinates, PinCategory};

    fn pin(id: &str) -> LocationPin {
        LocationPin::new(
            id,
            "Cape Lookout",
            Coordinates {
                latitude: 45.34,
                longitude: -123.97,
            },
            PinCategory::Coastal,
        )
    }

    #[tokio::test]
    async fn create_assigns_uuid_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db").join("locations.json");
        let repo = LocationRepository::open(path.clone()).await.unwrap();

        let created = repo.create(pin("pin_1_abc")).await.unwrap();
        assert!(Uuid::parse_str(&created.id).is_ok());
        assert!(created.created_at.is_some());

        let reopened = LocationRepository::open(path).await.unwrap();
        assert_eq!(reopened.get(&created.id).await.unwrap().title, "Cape Lookout");
    }

    #[tokio::test]
    async fn update_keeps_created_at_and_path_id() {
        let dir = TempDir::new().unwrap();
        let repo = LocationRepository::open(dir.path().join("l.json")).await.unwrap();
        let created = repo.create(pin("")).await.unwrap();

        let mut changed = pin("something-else");
        changed.title = "X".into();
        let updated = repo.update(&created.id, changed).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(repo.list().await.len(), 1);
    }

    #[tokio::test]
    async fn import_upserts_and_assigns_uuids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("l.json");
        let repo = LocationRepository::open(path.clone()).await.unwrap();
        let seed = crate::services::pin_store::default_pins().unwrap();

        let stats = repo
            .import(seed.clone(), ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(stats.inserted, 6);
        let stored = repo.list().await;
        assert!(stored.iter().all(|pin| Uuid::parse_str(&pin.id).is_ok()));
        assert!(stored.iter().all(|pin| pin.created_at.is_some()));

        let mut edited = stored[0].clone();
        edited.title = "Renamed".into();
        let stats = repo
            .import(vec![edited.clone()], ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(stats, ImportStats { inserted: 0, updated: 1, deleted: 0 });
        assert_eq!(repo.get(&edited.id).await.unwrap().title, "Renamed");
        assert_eq!(LocationRepository::open(path).await.unwrap().list().await.len(), 6);
    }

    #[tokio::test]
    async fn import_dry_run_and_truncate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("l.json");
        let repo = LocationRepository::open(path.clone()).await.unwrap();
        repo.create(pin("")).await.unwrap();

        let dry = ImportOptions {
            truncate: true,
            dry_run: true,
        };
        let stats = repo.import(vec![pin(""), pin("")], dry).await.unwrap();
        assert_eq!(stats, ImportStats { inserted: 2, updated: 0, deleted: 1 });
        assert_eq!(repo.list().await.len(), 1);

        let stats = repo
            .import(
                vec![pin("")],
                ImportOptions {
                    truncate: true,
                    dry_run: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(stats.deleted, 1);
        assert_eq!(repo.list().await.len(), 1);
        assert_eq!(LocationRepository::open(path).await.unwrap().list().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = LocationRepository::open(dir.path().join("l.json")).await.unwrap();
        let ghost = Uuid::new_v4().to_string();
        assert!(matches!(repo.delete(&ghost).await, Err(AppError::NotFound)));
        assert!(matches!(repo.get("not-a-uuid").await, Err(AppError::NotFound)));
        assert!(matches!(
            repo.update(&ghost, pin(&ghost)).await,
            Err(AppError::NotFound)
        ));
    }
}
