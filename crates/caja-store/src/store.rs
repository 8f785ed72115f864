//! # Snapshot File Store
//!
//! The whole application state persists as a single JSON document,
//! read-modify-written on every committed operation:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  load() ──► engine operation (caja-core) ──► save()              │
//! │                                                                  │
//! │  save() is atomic: write to a temp file in the same directory,   │
//! │  then rename over the live file. A crash mid-save leaves the     │
//! │  previous snapshot intact.                                       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing file degrades to the default state. A corrupt file is
//! moved aside (never deleted) before the default state is returned.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use caja_core::money::Money;
use caja_core::snapshot::Snapshot;

use crate::error::{StoreError, StoreResult};

/// Persists snapshots to one JSON file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot, or the default state when the file is missing
    /// or unreadable as JSON. A corrupt file is renamed to
    /// `<name>.corrupt-<timestamp>` so it can be inspected.
    pub fn load(&self) -> StoreResult<Snapshot> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "snapshot file missing, starting from default state");
            return Ok(Snapshot::default_state(Money::zero()));
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|e| StoreError::io(self.path.display().to_string(), e))?;

        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => {
                debug!(path = %self.path.display(), bytes = raw.len(), "snapshot loaded");
                Ok(snapshot)
            }
            Err(parse_err) => {
                let aside = self.path.with_extension(format!(
                    "corrupt-{}",
                    Utc::now().format("%Y%m%d-%H%M%S")
                ));
                error!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %parse_err,
                    "snapshot unreadable, moving aside and starting from default state"
                );
                fs::rename(&self.path, &aside)
                    .map_err(|e| StoreError::io(self.path.display().to_string(), e))?;
                Ok(Snapshot::default_state(Money::zero()))
            }
        }
    }

    /// Saves the snapshot atomically: temp file in the same directory,
    /// then rename over the live file.
    pub fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::io(parent.display().to_string(), e))?;
            }
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        fs::write(&tmp, &json).map_err(|e| StoreError::io(tmp.display().to_string(), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::io(self.path.display().to_string(), e))?;

        debug!(path = %self.path.display(), bytes = json.len(), "snapshot saved");
        Ok(())
    }

    /// Writes a timestamped backup copy of the snapshot into `dir` and
    /// returns its path.
    pub fn backup(&self, snapshot: &Snapshot, dir: impl AsRef<Path>) -> StoreResult<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir.display().to_string(), e))?;

        let name = format!("caja-backup-{}.json", Utc::now().format("%Y%m%d-%H%M%S"));
        let path = dir.join(name);
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&path, json).map_err(|e| StoreError::io(path.display().to_string(), e))?;

        info!(path = %path.display(), "backup written");
        Ok(path)
    }

    /// Restores from a backup file. The candidate must pass the core
    /// invariant checks before it replaces the live snapshot.
    pub fn restore(&self, backup_path: impl AsRef<Path>) -> StoreResult<Snapshot> {
        let backup_path = backup_path.as_ref();
        if !backup_path.exists() {
            return Err(StoreError::BackupNotFound(
                backup_path.display().to_string(),
            ));
        }

        let raw = fs::read_to_string(backup_path)
            .map_err(|e| StoreError::io(backup_path.display().to_string(), e))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;

        let violations = snapshot.verify();
        if !violations.is_empty() {
            return Err(StoreError::Corrupt { violations });
        }

        self.save(&snapshot)?;
        info!(from = %backup_path.display(), "snapshot restored from backup");
        Ok(snapshot)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (FileStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("caja-test-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        (FileStore::new(dir.join("caja.json")), dir)
    }

    #[test]
    fn test_missing_file_loads_default_state() {
        let (store, dir) = temp_store();
        let snapshot = store.load().unwrap();
        assert!(snapshot.sales.is_empty());
        assert!(snapshot.ledger.resolve("Efectivo").is_ok());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_save_load_round_trip() {
        let (store, dir) = temp_store();
        let mut snapshot = Snapshot::default_state(Money::from_pesos(250_000));
        caja_core::engine::add_account(&mut snapshot, "Daviplata").unwrap();

        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(
            loaded.ledger.resolve("Efectivo").unwrap().balance,
            Money::from_pesos(250_000)
        );
        assert!(loaded.ledger.resolve("Daviplata").is_ok());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_corrupt_file_moved_aside() {
        let (store, dir) = temp_store();
        fs::write(store.path(), "{ not json").unwrap();

        let snapshot = store.load().unwrap();
        assert!(snapshot.sales.is_empty());
        // The broken file survives under a .corrupt-* name.
        let aside = fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| {
                e.path()
                    .extension()
                    .map_or(false, |x| x.to_string_lossy().starts_with("corrupt-"))
            })
            .count();
        assert_eq!(aside, 1);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_backup_and_restore() {
        let (store, dir) = temp_store();
        let snapshot = Snapshot::default_state(Money::from_pesos(99_000));
        store.save(&snapshot).unwrap();

        let backup = store.backup(&snapshot, dir.join("backups")).unwrap();

        // Clobber the live file, then restore.
        store.save(&Snapshot::default_state(Money::zero())).unwrap();
        let restored = store.restore(&backup).unwrap();
        assert_eq!(
            restored.ledger.resolve("Efectivo").unwrap().balance,
            Money::from_pesos(99_000)
        );
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_restore_rejects_broken_invariants() {
        let (store, dir) = temp_store();
        let mut snapshot = Snapshot::default_state(Money::zero());
        snapshot
            .inventory
            .products
            .push(caja_core::inventory::Product {
                stock: -3,
                ..seed_product()
            });

        let json = serde_json::to_string(&snapshot).unwrap();
        let bad = dir.join("bad-backup.json");
        fs::write(&bad, json).unwrap();

        assert!(matches!(
            store.restore(&bad),
            Err(StoreError::Corrupt { .. })
        ));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_restore_missing_backup() {
        let (store, dir) = temp_store();
        assert!(matches!(
            store.restore(dir.join("nope.json")),
            Err(StoreError::BackupNotFound(_))
        ));
        fs::remove_dir_all(dir).unwrap();
    }

    fn seed_product() -> caja_core::inventory::Product {
        caja_core::inventory::Product {
            id: "p1".to_string(),
            sku: "PKM-001".to_string(),
            name: "Pikachu VMAX".to_string(),
            description: String::new(),
            language: "ES".to_string(),
            category: "Pokémon".to_string(),
            kind: "Carta".to_string(),
            stock: 5,
            cost: Money::from_pesos(50_000),
            price: Money::from_pesos(95_000),
            supplier: String::new(),
            tags: vec![],
            images: vec![],
            apply_tax: true,
            status: caja_core::inventory::ProductStatus::Available,
            history: vec![],
        }
    }
}
