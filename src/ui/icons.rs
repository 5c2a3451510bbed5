//! Shared UI icons with plain-text fallbacks.

use console::Emoji;

// Unit status
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static PENDING: Emoji<'_, '_> = Emoji("⬜ ", "[ ]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Narration
pub static SPEAKER: Emoji<'_, '_> = Emoji("🔊 ", "[VOICE]");

// Bundle
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static FILE: Emoji<'_, '_> = Emoji("📄 ", "-");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "[ZIP]");
