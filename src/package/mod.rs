//! Package output: the rewritten items and where they are stored.

pub mod directory;
pub mod errors;
pub mod memory;
pub mod statics;

pub use directory::{DirectoryPackage, MANIFEST_FILE, Manifest, ManifestEntry};
pub use errors::{PackageError, PackageResult};
pub use memory::MemoryPackage;
pub use statics::{SETUP_SCRIPT_PATH, module_decl_js, static_items};

/// One output entry, keyed by its package path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageItem {
    pub path: String,
    pub mime_type: String,
    pub title: Option<String>,
    /// Navigable document hint: true exactly for HTML.
    pub is_front: bool,
    pub content: Vec<u8>,
}

impl PackageItem {
    pub fn new(path: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        let mime_type = mime_type.into();
        Self {
            path: path.into(),
            is_front: mime_type == "text/html",
            mime_type,
            title: None,
            content,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

/// Destination for converted items.
pub trait PackageWriter {
    /// Store an item. Paths must be unique.
    fn add_item(&mut self, item: PackageItem) -> PackageResult<()>;

    /// Make `path` resolve to the item stored at `target`.
    fn add_alias(&mut self, path: &str, target: &str) -> PackageResult<()>;

    /// Whether an item or alias already uses `path`.
    fn contains(&self, path: &str) -> bool;

    /// Finalize the package. No item may be added afterwards.
    fn finish(&mut self, main_path: Option<&str>) -> PackageResult<()>;
}

impl<W: PackageWriter + ?Sized> PackageWriter for &mut W {
    fn add_item(&mut self, item: PackageItem) -> PackageResult<()> {
        (**self).add_item(item)
    }

    fn add_alias(&mut self, path: &str, target: &str) -> PackageResult<()> {
        (**self).add_alias(path, target)
    }

    fn contains(&self, path: &str) -> bool {
        (**self).contains(path)
    }

    fn finish(&mut self, main_path: Option<&str>) -> PackageResult<()> {
        (**self).finish(main_path)
    }
}
