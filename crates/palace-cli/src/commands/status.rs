//! Status command handler

use anyhow::Result;

use palace_core::{Config, Store};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let stats = store.persist_stats();
    let ingredients = store.ingredients().shelves();
    let media = store.media().shelves();
    let beans = store.ingredients().item_count();
    let albums = store.media().item_count();
    let favorites = store.media().favorites().len();
    let available = !store.is_durable_unavailable();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "storage": {
                        "database": config.database_path(),
                        "available": available,
                        "backup_dir": config.backup_dir(),
                    },
                    "counts": {
                        "cafe": { "shelves": ingredients.len(), "beans": beans },
                        "audio": { "shelves": media.len(), "albums": albums, "favorites": favorites }
                    },
                    "writes": stats
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{} {}", beans, albums);
        }
        OutputFormat::Human => {
            println!("Palace Status");
            println!("=============");
            println!();
            println!("Storage:");
            println!("  Database: {}", config.database_path().display());
            println!("  Status:   {}", if available { "ok" } else { "unavailable" });
            println!("  Backups:  {}", config.backup_dir().display());
            println!();
            println!("Cafe:");
            println!("  Shelves: {}", ingredients.len());
            println!("  Beans:   {}", beans);
            println!();
            println!("Audio:");
            println!("  Shelves:   {}", media.len());
            println!("  Albums:    {}", albums);
            println!("  Favorites: {}", favorites);
        }
    }

    Ok(())
}
