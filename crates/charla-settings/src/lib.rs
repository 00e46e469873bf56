//! # charla-settings
//!
//! Layered configuration for Charla.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CharlaSettings::default()`]
//! 2. **User file**: `~/.charla/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CHARLA_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, load_with_env, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<CharlaSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// The first call loads from the default path; if loading fails the compiled
/// defaults are used.
pub fn get_settings() -> &'static CharlaSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            CharlaSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the value back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: CharlaSettings) -> std::result::Result<(), CharlaSettings> {
    SETTINGS.set(settings)
}
