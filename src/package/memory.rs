//! In-memory package, for library callers that post-process items themselves.

use std::collections::BTreeMap;

use super::errors::{PackageError, PackageResult};
use super::{PackageItem, PackageWriter};

#[derive(Debug, Default)]
pub struct MemoryPackage {
    items: Vec<PackageItem>,
    index: BTreeMap<String, usize>,
    aliases: BTreeMap<String, String>,
    main_path: Option<String>,
    finished: bool,
}

impl MemoryPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[PackageItem] {
        &self.items
    }

    pub fn get(&self, path: &str) -> Option<&PackageItem> {
        let path = self.aliases.get(path).map_or(path, String::as_str);
        self.index.get(path).map(|&i| &self.items[i])
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn main_path(&self) -> Option<&str> {
        self.main_path.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_items(self) -> Vec<PackageItem> {
        self.items
    }
}

impl PackageWriter for MemoryPackage {
    fn add_item(&mut self, item: PackageItem) -> PackageResult<()> {
        if self.finished {
            return Err(PackageError::Finished);
        }
        if self.index.contains_key(&item.path) {
            return Err(PackageError::DuplicatePath(item.path));
        }
        self.index.insert(item.path.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    fn add_alias(&mut self, path: &str, target: &str) -> PackageResult<()> {
        if self.finished {
            return Err(PackageError::Finished);
        }
        if self.index.contains_key(path) || self.aliases.contains_key(path) {
            return Err(PackageError::DuplicatePath(path.to_string()));
        }
        self.aliases.insert(path.to_string(), target.to_string());
        Ok(())
    }

    fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path) || self.aliases.contains_key(path)
    }

    fn finish(&mut self, main_path: Option<&str>) -> PackageResult<()> {
        if self.finished {
            return Err(PackageError::Finished);
        }
        for (alias, target) in &self.aliases {
            if !self.index.contains_key(target) {
                return Err(PackageError::DanglingAlias {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }
        self.main_path = main_path.map(str::to_string);
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str) -> PackageItem {
        PackageItem::new(path, "text/plain", b"x".to_vec())
    }

    #[test]
    fn test_add_and_lookup_through_alias() {
        let mut package = MemoryPackage::new();
        package.add_item(item("a.com/x")).unwrap();
        package.add_alias("a.com/y", "a.com/x").unwrap();
        assert!(package.contains("a.com/y"));
        assert_eq!(package.get("a.com/y").map(|i| i.path.as_str()), Some("a.com/x"));
        package.finish(Some("a.com/x")).unwrap();
        assert_eq!(package.main_path(), Some("a.com/x"));
    }

    #[test]
    fn test_duplicates_and_dangling_aliases_rejected() {
        let mut package = MemoryPackage::new();
        package.add_item(item("a")).unwrap();
        assert!(matches!(package.add_item(item("a")), Err(PackageError::DuplicatePath(_))));
        package.add_alias("b", "missing").unwrap();
        assert!(matches!(package.finish(None), Err(PackageError::DanglingAlias { .. })));
    }
}
