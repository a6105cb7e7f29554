//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use palace_core::{IngredientItem, IngredientShelf, MediaItem, MediaShelf};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print the bean collection
    pub fn print_ingredient_shelves(&self, shelves: &[IngredientShelf]) {
        match self.format {
            OutputFormat::Human => {
                if shelves.is_empty() {
                    println!("No shelves.");
                    return;
                }
                for shelf in shelves {
                    print_shelf_heading(shelf.id, &shelf.title, shelf.items.len());
                    for bean in &shelf.items {
                        println!("    {}", bean_line(bean));
                    }
                }
            }
            OutputFormat::Json => print_json(shelves),
            OutputFormat::Quiet => {
                for shelf in shelves {
                    println!("{}", shelf.id);
                }
            }
        }
    }

    /// Print the album collection
    pub fn print_media_shelves(&self, shelves: &[MediaShelf]) {
        match self.format {
            OutputFormat::Human => {
                if shelves.is_empty() {
                    println!("No shelves.");
                    return;
                }
                for shelf in shelves {
                    print_shelf_heading(shelf.id, &shelf.title, shelf.items.len());
                    for album in &shelf.items {
                        println!("    {}", album_line(album));
                    }
                }
            }
            OutputFormat::Json => print_json(shelves),
            OutputFormat::Quiet => {
                for shelf in shelves {
                    println!("{}", shelf.id);
                }
            }
        }
    }

    /// Print a single bean
    pub fn print_bean(&self, bean: &IngredientItem) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", bean.id);
                println!("Name:    {}", bean.name);
                println!("Region:  {}", or_dash(&bean.region));
                println!("Process: {}", or_dash(&bean.process));
                println!("Notes:   {}", or_dash(&bean.notes));
                println!("Roast:   {}", bean.roast);
                println!("Colors:  {} -> {}", bean.color_from, bean.color_to);
            }
            OutputFormat::Json => print_json(bean),
            OutputFormat::Quiet => println!("{}", bean.id),
        }
    }

    /// Print a single album
    pub fn print_album(&self, album: &MediaItem) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", album.id);
                println!("Title:       {}", album.title);
                println!("Artist:      {}", album.artist);
                println!("Year:        {}", or_dash(&album.year));
                println!("Cover:       {}", cover_summary(&album.cover_ref));
                if let Some(link) = album.source_link() {
                    println!("Listen:      {}", link);
                }
                if let Some(desc) = album.description.as_deref().filter(|d| !d.is_empty()) {
                    println!("Description: {}", desc);
                }
                println!("Favorite:    {}", if album.is_favorite() { "yes" } else { "no" });
            }
            OutputFormat::Json => print_json(album),
            OutputFormat::Quiet => println!("{}", album.id),
        }
    }

    /// Print a flat list of albums
    pub fn print_albums(&self, albums: &[MediaItem]) {
        match self.format {
            OutputFormat::Human => {
                if albums.is_empty() {
                    println!("No albums found.");
                    return;
                }
                for album in albums {
                    println!("{}", album_line(album));
                }
                println!("\n{} album(s)", albums.len());
            }
            OutputFormat::Json => print_json(albums),
            OutputFormat::Quiet => {
                for album in albums {
                    println!("{}", album.id);
                }
            }
        }
    }

    /// Print any serializable value as JSON (JSON mode only)
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        if self.format == OutputFormat::Json {
            print_json(value);
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn print_shelf_heading(id: i64, title: &str, count: usize) {
    println!("[{}] {} ({} item{})", id, title, count, if count == 1 { "" } else { "s" });
}

fn bean_line(bean: &IngredientItem) -> String {
    format!(
        "{} | {} | {} | {}",
        bean.id,
        truncate(&bean.name, 30),
        truncate(or_dash(&bean.region), 20),
        bean.roast
    )
}

fn album_line(album: &MediaItem) -> String {
    let star = if album.is_favorite() { " ★" } else { "" };
    format!(
        "{} | {}{} | {} | {}",
        album.id,
        truncate(&album.title, 35),
        star,
        truncate(&album.artist, 25),
        or_dash(&album.year)
    )
}

/// Inline images are long; show only their kind
fn cover_summary(cover: &str) -> String {
    if cover.is_empty() {
        "-".to_string()
    } else if let Some(rest) = cover.strip_prefix("data:") {
        let mime = rest.split(';').next().unwrap_or("image");
        format!("(inline {}, {} bytes)", mime, cover.len())
    } else {
        truncate(cover, 60)
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
