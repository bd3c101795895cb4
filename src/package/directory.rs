//! Package written to a directory: one file per item plus a JSON manifest.
//!
//! ```text
//! <output>/
//!   manifest.json
//!   content/000000
//!   content/000001
//!   ...
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::errors::{PackageError, PackageResult};
use super::{PackageItem, PackageWriter};

pub const MANIFEST_FILE: &str = "manifest.json";
const CONTENT_DIR: &str = "content";

/// Manifest entry for one stored item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub is_front: bool,
    /// File under the output directory holding the item's bytes.
    pub file: String,
    pub size: u64,
}

/// `manifest.json` contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: DateTime<Utc>,
    pub main_path: Option<String>,
    pub items: Vec<ManifestEntry>,
    pub aliases: BTreeMap<String, String>,
}

impl Manifest {
    /// Read a manifest written by [`DirectoryPackage::finish`].
    pub fn load(output_dir: &Path) -> PackageResult<Self> {
        let data = fs::read(output_dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_slice(&data)?)
    }
}

#[derive(Debug)]
pub struct DirectoryPackage {
    root: PathBuf,
    entries: Vec<ManifestEntry>,
    paths: HashSet<String>,
    aliases: BTreeMap<String, String>,
    finished: bool,
}

impl DirectoryPackage {
    /// Create (or reuse) `root` and check that it is writable.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Unwritable`] when the directory cannot be created
    /// or a file cannot be written inside it.
    pub fn create(root: impl Into<PathBuf>) -> PackageResult<Self> {
        let root = root.into();
        let unwritable = |source| PackageError::Unwritable {
            path: root.clone(),
            source,
        };
        fs::create_dir_all(root.join(CONTENT_DIR)).map_err(unwritable)?;
        // Probe: creation and removal of a temporary file.
        NamedTempFile::new_in(&root)
            .and_then(|probe| probe.close())
            .map_err(unwritable)?;

        log::debug!("Writing package to {}", root.display());
        Ok(Self {
            root,
            entries: Vec::new(),
            paths: HashSet::new(),
            aliases: BTreeMap::new(),
            finished: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PackageWriter for DirectoryPackage {
    fn add_item(&mut self, item: PackageItem) -> PackageResult<()> {
        if self.finished {
            return Err(PackageError::Finished);
        }
        if !self.paths.insert(item.path.clone()) {
            return Err(PackageError::DuplicatePath(item.path));
        }
        let file = format!("{CONTENT_DIR}/{:06}", self.entries.len());
        fs::write(self.root.join(&file), &item.content)?;
        self.entries.push(ManifestEntry {
            path: item.path,
            mime_type: item.mime_type,
            title: item.title,
            is_front: item.is_front,
            file,
            size: item.content.len() as u64,
        });
        Ok(())
    }

    fn add_alias(&mut self, path: &str, target: &str) -> PackageResult<()> {
        if self.finished {
            return Err(PackageError::Finished);
        }
        if self.paths.contains(path) || self.aliases.contains_key(path) {
            return Err(PackageError::DuplicatePath(path.to_string()));
        }
        self.aliases.insert(path.to_string(), target.to_string());
        Ok(())
    }

    fn contains(&self, path: &str) -> bool {
        self.paths.contains(path) || self.aliases.contains_key(path)
    }

    fn finish(&mut self, main_path: Option<&str>) -> PackageResult<()> {
        if self.finished {
            return Err(PackageError::Finished);
        }
        if let Some((alias, target)) = self
            .aliases
            .iter()
            .find(|(_, target)| !self.paths.contains(*target))
        {
            return Err(PackageError::DanglingAlias {
                alias: alias.clone(),
                target: target.clone(),
            });
        }

        let manifest = Manifest {
            created_at: Utc::now(),
            main_path: main_path.map(str::to_string),
            items: std::mem::take(&mut self.entries),
            aliases: std::mem::take(&mut self.aliases),
        };

        // Written beside the target and renamed so readers never see a partial manifest.
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut tmp, &manifest)?;
        tmp.flush()?;
        tmp.persist(self.root.join(MANIFEST_FILE))
            .map_err(|e| PackageError::Io(e.error))?;

        log::info!(
            "Package manifest written: {} items, {} aliases",
            manifest.items.len(),
            manifest.aliases.len()
        );
        self.finished = true;
        Ok(())
    }
}
