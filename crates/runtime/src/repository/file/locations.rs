//! File-based LocationRepository implementation.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use std::collections::BTreeMap;

use scroll_core::{BindingKey, Destination, SavedLocation};
use serde::{Deserialize, Serialize};

use crate::repository::{BindingMap, LocationRepository, RepositoryError, Result};

const FILE_NAME: &str = "locations.json";
const FORMAT_VERSION: u32 = 2;
/// Fixed points only, written before random destinations existed.
const LEGACY_VERSION: u32 = 1;

#[derive(Deserialize)]
struct DocumentHeader {
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct BindingsDocument {
    version: u32,
    bindings: BindingMap,
}

#[derive(Deserialize)]
struct LegacyDocument {
    locations: BTreeMap<BindingKey, SavedLocation>,
}

/// Stores the full binding map as `{base_dir}/locations.json`.
///
/// Writes go to a sibling temp file that is synced and renamed over the
/// target, so a crash mid-write leaves the previous mapping readable.
pub struct FileLocationRepository {
    path: PathBuf,
}

impl FileLocationRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir)?;
        Ok(Self {
            path: base_dir.join(FILE_NAME),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocationRepository for FileLocationRepository {
    fn load(&self) -> Result<BindingMap> {
        if !self.path.exists() {
            return Ok(BindingMap::new());
        }

        let json = fs::read_to_string(&self.path)?;
        let header: DocumentHeader = decode(&json)?;
        let bindings = match header.version {
            FORMAT_VERSION => decode::<BindingsDocument>(&json)?.bindings,
            LEGACY_VERSION => {
                tracing::info!("Migrating {} from format version 1", self.path.display());
                decode::<LegacyDocument>(&json)?
                    .locations
                    .into_iter()
                    .map(|(key, location)| (key, Destination::Fixed(location)))
                    .collect()
            }
            version => {
                return Err(RepositoryError::CorruptedData(format!(
                    "unsupported locations format version {}",
                    version
                )));
            }
        };

        for (key, destination) in &bindings {
            destination.validate().map_err(|error| {
                RepositoryError::CorruptedData(format!("binding '{}': {}", key, error))
            })?;
        }

        tracing::debug!(
            "Loaded {} bindings from {}",
            bindings.len(),
            self.path.display()
        );

        Ok(bindings)
    }

    fn persist(&self, bindings: &BindingMap) -> Result<()> {
        let temp_path = self.path.with_extension("json.tmp");

        let document = BindingsDocument {
            version: FORMAT_VERSION,
            bindings: bindings.clone(),
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let mut file = File::create(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;

        tracing::debug!(
            "Saved {} bindings to {}",
            bindings.len(),
            self.path.display()
        );

        Ok(())
    }
}

fn decode<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| RepositoryError::Serialization(e.to_string()))
}
