//! Built-in default collections
//!
//! Used on first start, when the durable store is empty or unreadable, and by
//! reset.

use crate::models::{IngredientItem, IngredientShelf, MediaItem, MediaShelf, Roast, Shelf};

fn bean(
    id: i64,
    name: &str,
    region: &str,
    process: &str,
    notes: &str,
    colors: (&str, &str),
    roast: Roast,
) -> IngredientItem {
    IngredientItem {
        id,
        name: name.to_string(),
        region: region.to_string(),
        process: process.to_string(),
        notes: notes.to_string(),
        color_from: colors.0.to_string(),
        color_to: colors.1.to_string(),
        roast,
    }
}

fn album(
    id: i64,
    title: &str,
    artist: &str,
    cover: &str,
    link: &str,
    year: &str,
    description: &str,
) -> MediaItem {
    MediaItem {
        id,
        title: title.to_string(),
        artist: artist.to_string(),
        cover_ref: cover.to_string(),
        source_ref: link.to_string(),
        year: year.to_string(),
        description: Some(description.to_string()),
        favorite: None,
    }
}

/// Default ingredient collection
pub fn default_ingredients() -> Vec<IngredientShelf> {
    vec![
        Shelf::new(1, "Premium Arabica Collection").with_items(vec![
            bean(
                101,
                "Panama Geisha",
                "Boquete",
                "Washed",
                "Jasmine, Bergamot, Honey",
                ("#f472b6", "#be185d"),
                Roast::Light,
            ),
            bean(
                102,
                "Ethiopia Yirgacheffe",
                "Gedeo",
                "Natural",
                "Blueberry, Lemon",
                ("#facc15", "#ea580c"),
                Roast::Light,
            ),
        ]),
        Shelf::new(2, "Experimental & Blends").with_items(vec![bean(
            201,
            "Cau Dat Arabica",
            "Vietnam",
            "Honey",
            "Caramel, Chocolate",
            ("#60a5fa", "#1e3a8a"),
            Roast::Medium,
        )]),
    ]
}

/// Default media collection
pub fn default_media() -> Vec<MediaShelf> {
    let mut ram = album(
        101,
        "Random Access Memories",
        "Daft Punk",
        "https://upload.wikimedia.org/wikipedia/en/a/a7/Random_Access_Memories.jpg",
        "https://open.spotify.com/album/4m2880jivSbbyEGqf539qK",
        "2013",
        "A homage to the late 1970s and early 1980s US disco and boogie era.",
    );
    ram.favorite = Some(true);

    vec![
        Shelf::new(1, "Favorites Playlist").with_items(vec![
            ram,
            album(
                102,
                "The Dark Side of the Moon",
                "Pink Floyd",
                "https://upload.wikimedia.org/wikipedia/en/3/3b/Dark_Side_of_the_Moon.png",
                "",
                "1973",
                "A concept album that explores themes such as conflict, greed, time, death, and mental illness.",
            ),
        ]),
        Shelf::new(2, "Late Night Lo-Fi").with_items(vec![album(
            201,
            "Nostalgia",
            "Various Artists",
            "https://f4.bcbits.com/img/a1637693293_65",
            "",
            "2024",
            "Beats to relax and study to.",
        )]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item_count;

    #[test]
    fn test_seed_shapes() {
        let beans = default_ingredients();
        assert_eq!(beans.len(), 2);
        assert_eq!(item_count(&beans), 3);

        let albums = default_media();
        assert_eq!(albums.len(), 2);
        assert_eq!(item_count(&albums), 3);
        assert!(albums[0].items[0].is_favorite());
    }

    #[test]
    fn test_seed_is_deterministic() {
        assert_eq!(default_ingredients(), default_ingredients());
        assert_eq!(default_media(), default_media());
    }
}
