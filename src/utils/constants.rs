//! Shared constants for the archive-to-package conversion
//!
//! Package paths and names shared by the rewriters and the package writer.

/// Directory (inside the package) holding the replay bootstrap files.
///
/// Every generated or user-supplied static file is stored under this prefix,
/// and the header template receives it relative to the current item.
pub const STATIC_PREFIX: &str = "_offline_static/";

/// Module imported by rewritten ES modules to obtain the shimmed globals.
pub const MODULE_DECL_PATH: &str = "_offline_static/__wb_module_decl.js";

/// Canonical URL under which a user supplied custom stylesheet is stored.
pub const CUSTOM_CSS_URL: &str = "https://offline.custom.css/custom.css";

/// Default number of records rewritten in parallel before they are written out.
///
/// Bounds the number of record payloads resident in memory at once.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Exit code reported by the binary when the archive produced no items.
pub const NOTHING_PRODUCED_EXIT_CODE: u8 = 100;

/// Global names shadowed for archived scripts, in declaration order.
pub const GLOBAL_OVERRIDES: [&str; 9] = [
    "window",
    "globalThis",
    "self",
    "document",
    "location",
    "top",
    "parent",
    "frames",
    "opener",
];
