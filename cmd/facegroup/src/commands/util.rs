//! Utility functions for CLI commands.

use std::sync::Arc;

use facegroup_facestore::RedbStore;
use tracing::debug;

use crate::Cli;
use crate::config::{Config, load_config};

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(cli.config.as_deref())
}

/// Opens the face database, creating it and its directory if needed.
pub fn open_store(cli: &Cli, cfg: &Config) -> anyhow::Result<Arc<RedbStore>> {
    let path = cfg.db_path(cli.db.as_deref())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    debug!(path = %path.display(), "opening face database");
    Ok(Arc::new(RedbStore::open(&path)?))
}

/// Outputs result as JSON or YAML on stdout.
pub fn output_result<T: serde::Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };
    print!("{}", output);
    Ok(())
}

/// Guesses an image file extension from its leading bytes.
pub fn guess_extension(data: &[u8]) -> &'static str {
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    if data.starts_with(PNG) {
        "png"
    } else if data.starts_with(JPEG) {
        "jpg"
    } else {
        "bin"
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_from_magic_bytes() {
        assert_eq!(guess_extension(b"\x89PNG\r\n\x1a\n...."), "png");
        assert_eq!(guess_extension(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), "jpg");
        assert_eq!(guess_extension(b"GIF89a"), "bin");
        assert_eq!(guess_extension(b""), "bin");
    }
}
