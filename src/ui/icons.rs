//! Shared UI icons.
//!
//! Each icon falls back to a plain-text tag on terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "");

// Finding indicators
pub static BRANCH: Emoji<'_, '_> = Emoji("🌿 ", "-");
pub static PULL_REQUEST: Emoji<'_, '_> = Emoji("📬 ", "-");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static TRASH: Emoji<'_, '_> = Emoji("🗑️  ", "-");
pub static REPORT: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FILE_NEW: Emoji<'_, '_> = Emoji("📄 ", "+");
