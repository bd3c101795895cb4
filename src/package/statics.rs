//! Bootstrap files stored under the static prefix of every package.

use std::fs;
use std::path::Path;

use serde::Serialize;
use jwalk::{Parallelism, WalkDir};

use super::PackageItem;
use super::errors::{PackageError, PackageResult};
use crate::url_rewriting::FuzzyRules;
use crate::utils::{GLOBAL_OVERRIDES, MODULE_DECL_PATH, STATIC_PREFIX};

/// Package path of the generated replay setup script.
pub const SETUP_SCRIPT_PATH: &str = "_offline_static/wombat_setup.js";

#[derive(Debug, Serialize)]
struct FuzzyRuleJson<'a> {
    #[serde(rename = "match")]
    pattern: &'a str,
    replace: &'a str,
}

/// Source of the module imported by rewritten ES modules.
///
/// It exports the same wrapped globals classic scripts get from their
/// local block.
pub fn module_decl_js() -> String {
    let mut js = String::from(
        "var wrapObj = function(name) {return (self._wb_wombat && self._wb_wombat.local_init \
         && self._wb_wombat.local_init(name)) || self[name]; };\n\
         if (!self.__WB_pmw) { self.__WB_pmw = function(obj) { this.__WB_source = obj; return this; } }\n",
    );
    for name in GLOBAL_OVERRIDES {
        js.push_str(&format!("const {name} = wrapObj(\"{name}\");\n"));
    }
    js.push_str(&format!("export {{ {} }};\n", GLOBAL_OVERRIDES.join(", ")));
    js
}

/// Script exposing the fuzzy rule table to the replay runtime.
pub fn setup_js(rules: &FuzzyRules) -> PackageResult<String> {
    let table: Vec<FuzzyRuleJson<'_>> = rules
        .rules()
        .iter()
        .map(|rule| FuzzyRuleJson {
            pattern: rule.pattern(),
            replace: rule.replacement(),
        })
        .collect();
    let json = serde_json::to_string(&table)?;
    Ok(format!(
        "self.__offline_fuzzy_rules = {json};\n\
         if (self.wombatSetup) {{ self.wombatSetup.fuzzyRules = self.__offline_fuzzy_rules; }}\n"
    ))
}

/// Generated bootstrap items plus every file of `static_dir`, if given.
pub fn static_items(rules: &FuzzyRules, static_dir: Option<&Path>) -> PackageResult<Vec<PackageItem>> {
    let mut items = vec![
        PackageItem::new(MODULE_DECL_PATH, "text/javascript", module_decl_js().into_bytes()),
        PackageItem::new(SETUP_SCRIPT_PATH, "text/javascript", setup_js(rules)?.into_bytes()),
    ];
    if let Some(dir) = static_dir {
        items.extend(read_static_dir(dir)?);
    }
    Ok(items)
}

fn read_static_dir(dir: &Path) -> PackageResult<Vec<PackageItem>> {
    let static_error = |message: String| PackageError::StaticDir {
        path: dir.to_path_buf(),
        message,
    };
    if !dir.is_dir() {
        return Err(static_error("not a directory".to_string()));
    }

    let mut items = Vec::new();
    let walker = WalkDir::new(dir)
        .parallelism(Parallelism::Serial)
        .skip_hidden(false)
        .follow_links(true)
        .sort(true);
    for entry in walker {
        let entry = entry.map_err(|e| static_error(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let entry_path = entry.path();
        let relative = entry_path.strip_prefix(dir).unwrap_or(&entry_path);
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let path = format!("{STATIC_PREFIX}{relative}");
        if path == MODULE_DECL_PATH || path == SETUP_SCRIPT_PATH {
            log::warn!("Static file {relative} shadows a generated file, skipping it");
            continue;
        }
        let content = fs::read(&entry_path)?;
        items.push(PackageItem::new(path, mime_for_extension(&entry_path), content));
    }
    log::debug!("Loaded {} static files from {}", items.len(), dir.display());
    Ok(items)
}

fn mime_for_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "js" | "mjs" => "text/javascript",
        "css" => "text/css",
        "html" | "htm" => "text/html",
        "json" | "map" => "application/json",
        "wasm" => "application/wasm",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
