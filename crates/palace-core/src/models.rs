//! Data models for Mind Palace
//!
//! Two independent collections are kept, each an ordered list of shelves:
//! - the ingredient collection (coffee beans, the "cafe" room)
//! - the media collection (albums, the "audio" room)
//!
//! Field names on the wire follow the backup format, so these types
//! serialize straight into snapshots and durable records.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Anything that can sit on a shelf
///
/// Ids are unique within the owning collection; the store assigns them on
/// insert.
pub trait ShelfItem: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Title given to a shelf created without one
    const NEW_SHELF_TITLE: &'static str;

    /// Unique identifier within the collection
    fn id(&self) -> i64;

    /// Replace the identifier (used when the store assigns a fresh id)
    fn set_id(&mut self, id: i64);
}

/// A named, ordered container of items
///
/// The order of `items` is meaningful and survives load, save, export and
/// import unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelf<I> {
    /// Unique among the shelves of one collection
    pub id: i64,
    /// Display title
    pub title: String,
    /// Items in display order
    #[serde(default = "Vec::new")]
    pub items: Vec<I>,
}

impl<I> Shelf<I> {
    /// Create an empty shelf
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            items: Vec::new(),
        }
    }

    /// Builder-style helper for seed data and tests
    pub fn with_items(mut self, items: Vec<I>) -> Self {
        self.items = items;
        self
    }
}

impl<I: ShelfItem> Shelf<I> {
    /// Position of an item on this shelf
    pub fn position_of(&self, item_id: i64) -> Option<usize> {
        self.items.iter().position(|item| item.id() == item_id)
    }
}

/// Shelf of the ingredient collection
pub type IngredientShelf = Shelf<IngredientItem>;

/// Shelf of the media collection
pub type MediaShelf = Shelf<MediaItem>;

/// Total number of items across all shelves
pub fn item_count<I>(shelves: &[Shelf<I>]) -> usize {
    shelves.iter().map(|shelf| shelf.items.len()).sum()
}

/// Largest id used by any shelf or item, if there is one
pub fn max_id<I: ShelfItem>(shelves: &[Shelf<I>]) -> Option<i64> {
    shelves
        .iter()
        .flat_map(|shelf| std::iter::once(shelf.id).chain(shelf.items.iter().map(|i| i.id())))
        .max()
}

/// Roast level of a bean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Roast {
    #[default]
    Light,
    Medium,
    Dark,
    Omni,
}

impl std::fmt::Display for Roast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Roast::Light => "Light",
            Roast::Medium => "Medium",
            Roast::Dark => "Dark",
            Roast::Omni => "Omni",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Roast {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Roast::Light),
            "medium" => Ok(Roast::Medium),
            "dark" => Ok(Roast::Dark),
            "omni" => Ok(Roast::Omni),
            other => Err(format!(
                "unknown roast '{}' (expected light, medium, dark or omni)",
                other
            )),
        }
    }
}

/// A coffee bean in the ingredient collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub process: String,
    /// Tasting notes
    #[serde(default)]
    pub notes: String,
    /// Gradient start color (CSS color string)
    #[serde(default)]
    pub color_from: String,
    /// Gradient end color
    #[serde(default)]
    pub color_to: String,
    #[serde(default)]
    pub roast: Roast,
}

impl IngredientItem {
    /// Create a bean with the given name and neutral defaults
    ///
    /// The id is a placeholder until the store assigns one.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            region: String::new(),
            process: String::new(),
            notes: String::new(),
            color_from: "#94a3b8".to_string(),
            color_to: "#334155".to_string(),
            roast: Roast::default(),
        }
    }
}

impl ShelfItem for IngredientItem {
    const NEW_SHELF_TITLE: &'static str = "New Shelf";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// An album in the media collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: i64,
    pub title: String,
    pub artist: String,
    /// Cover art: a URL or an inline `data:` URL
    #[serde(rename = "coverUrl", default)]
    pub cover_ref: String,
    /// External link to listen to the album; empty when absent
    #[serde(rename = "trackUrl", default)]
    pub source_ref: String,
    #[serde(default)]
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "isFavorite", default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

impl MediaItem {
    /// Create an album with the defaults used for a freshly added track
    pub fn new() -> Self {
        Self {
            id: 0,
            title: "New Track".to_string(),
            artist: "Unknown Artist".to_string(),
            cover_ref: String::new(),
            source_ref: String::new(),
            year: chrono::Utc::now().format("%Y").to_string(),
            description: Some(String::new()),
            favorite: Some(false),
        }
    }

    /// Whether the album is marked as a favorite
    pub fn is_favorite(&self) -> bool {
        self.favorite.unwrap_or(false)
    }

    /// External link, if one is set
    pub fn source_link(&self) -> Option<&str> {
        Some(self.source_ref.as_str()).filter(|s| !s.is_empty())
    }
}

impl Default for MediaItem {
    fn default() -> Self {
        Self::new()
    }
}

impl ShelfItem for MediaItem {
    const NEW_SHELF_TITLE: &'static str = "New Genre";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_item_defaults() {
        let item = MediaItem::new();
        assert_eq!(item.title, "New Track");
        assert_eq!(item.artist, "Unknown Artist");
        assert_eq!(item.year.len(), 4);
        assert!(!item.is_favorite());
        assert!(item.source_link().is_none());
    }

    #[test]
    fn test_media_item_wire_names() {
        let mut item = MediaItem::new();
        item.id = 7;
        item.cover_ref = "https://example.com/cover.jpg".to_string();
        item.favorite = Some(true);

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["coverUrl"], "https://example.com/cover.jpg");
        assert_eq!(json["trackUrl"], "");
        assert_eq!(json["isFavorite"], true);
    }

    #[test]
    fn test_media_item_optional_fields_absent() {
        let json = r#"{"id":102,"title":"The Dark Side of the Moon","artist":"Pink Floyd",
            "coverUrl":"x","trackUrl":"","year":"1973"}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.description, None);
        assert_eq!(item.favorite, None);
        assert!(!item.is_favorite());

        // Absent optionals stay absent on the way back out
        let out = serde_json::to_value(&item).unwrap();
        assert!(out.get("isFavorite").is_none());
        assert!(out.get("description").is_none());
    }

    #[test]
    fn test_ingredient_wire_names() {
        let json = r##"{"id":101,"name":"Panama Geisha","region":"Boquete","process":"Washed",
            "notes":"Jasmine","colorFrom":"#f472b6","colorTo":"#be185d","roast":"Light"}"##;
        let item: IngredientItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.color_from, "#f472b6");
        assert_eq!(item.roast, Roast::Light);
    }

    #[test]
    fn test_roast_parse() {
        assert_eq!("dark".parse::<Roast>().unwrap(), Roast::Dark);
        assert_eq!("OMNI".parse::<Roast>().unwrap(), Roast::Omni);
        assert!("burnt".parse::<Roast>().is_err());
        assert_eq!(Roast::Medium.to_string(), "Medium");
    }

    #[test]
    fn test_counts_and_max_id() {
        let shelves = vec![
            Shelf::new(1, "A").with_items(vec![IngredientItem { id: 50, ..IngredientItem::new("x") }]),
            Shelf::new(2, "B"),
        ];
        assert_eq!(item_count(&shelves), 1);
        assert_eq!(max_id(&shelves), Some(50));
        assert_eq!(max_id::<IngredientItem>(&[]), None);
        assert_eq!(shelves[0].position_of(50), Some(0));
    }
}
