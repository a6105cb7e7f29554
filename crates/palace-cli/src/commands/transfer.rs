//! Backup export, import and reset

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use palace_core::{Config, DirectorySink, Store};

use crate::output::Output;
use crate::prompt::confirm;

/// Write a backup of both collections
pub fn export(store: &Store, config: &Config, dir: Option<PathBuf>, output: &Output) -> Result<()> {
    let sink = DirectorySink::new(dir.unwrap_or_else(|| config.backup_dir()));
    let file_name = store.export_snapshot(&sink)?;
    let path = sink.path_for(&file_name);

    output.success(&format!("Exported backup to {}", path.display()));
    if output.is_quiet() {
        println!("{}", path.display());
    }
    Ok(())
}

/// Replace collections with the contents of a backup file
pub async fn import(store: &Store, file: &Path, output: &Output) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read backup file: {:?}", file))?;

    if !store.import_snapshot(&raw).await {
        bail!(
            "Import failed: {:?} is not a valid backup, or it could not be saved",
            file
        );
    }

    output.success(&format!(
        "Imported backup ({} bean(s), {} album(s))",
        store.ingredients().item_count(),
        store.media().item_count()
    ));
    Ok(())
}

/// Restore the built-in collections
pub async fn reset(store: &Store, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            bail!("Reset replaces both collections. Pass --yes to confirm.");
        }
        println!("This replaces every shelf, bean and album with the built-in defaults.");
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if let Err(error) = store.reset_to_defaults().await {
        if let Some(hint) = error.recovery_suggestion() {
            output.warn(hint);
        }
        return Err(error).context("Reset was applied but could not be saved");
    }

    output.success("Collections reset to defaults");
    Ok(())
}
