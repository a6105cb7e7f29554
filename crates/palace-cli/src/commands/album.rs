//! Album (audio collection) command handlers

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;

use palace_core::{MediaItem, MoveRequest, Store};

use crate::cover::resolve_cover;
use crate::output::Output;

/// Album fields shared by `add` and `edit`
#[derive(Args, Debug, Clone, Default)]
pub struct AlbumFields {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub artist: Option<String>,
    #[arg(long)]
    pub year: Option<String>,
    /// Cover image: a URL, or a local image file to embed
    #[arg(long)]
    pub cover: Option<String>,
    /// Where to listen to it
    #[arg(long)]
    pub link: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

impl AlbumFields {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.year.is_none()
            && self.cover.is_none()
            && self.link.is_none()
            && self.description.is_none()
    }

    fn apply(self, album: &mut MediaItem) -> Result<()> {
        if let Some(title) = self.title {
            album.title = title;
        }
        if let Some(artist) = self.artist {
            album.artist = artist;
        }
        if let Some(year) = self.year {
            album.year = year;
        }
        if let Some(cover) = self.cover {
            album.cover_ref = resolve_cover(&cover)?;
        }
        if let Some(link) = self.link {
            album.source_ref = link;
        }
        if let Some(description) = self.description {
            album.description = Some(description);
        }
        Ok(())
    }
}

/// Add an album to a shelf, at the end or at `at`
pub fn add(
    store: &Store,
    shelf_id: i64,
    fields: AlbumFields,
    at: Option<usize>,
    output: &Output,
) -> Result<()> {
    let mut album = MediaItem::new();
    fields.apply(&mut album)?;

    let albums = store.media();
    album.id = match at {
        Some(index) => albums.insert_item(shelf_id, index, album.clone()),
        None => albums.add_item(shelf_id, album.clone()),
    }
    .context("Failed to add album")?;

    output.success(&format!("Added album {}", album.id));
    output.print_album(&album);
    Ok(())
}

/// Change fields of an existing album
pub fn edit(store: &Store, id: i64, fields: AlbumFields, output: &Output) -> Result<()> {
    if fields.is_empty() {
        bail!("Nothing to change. Pass at least one field, e.g. --year 1977");
    }

    let (shelf_id, mut album) = find(store, id)?;
    fields.apply(&mut album)?;

    store
        .media()
        .update_item(shelf_id, album.clone())
        .context("Failed to update album")?;

    output.success("Album updated");
    output.print_album(&album);
    Ok(())
}

/// Remove an album
pub fn delete(store: &Store, id: i64, output: &Output) -> Result<()> {
    let (shelf_id, album) = find(store, id)?;

    store
        .media()
        .delete_item(shelf_id, id)
        .context("Failed to delete album")?;

    output.success(&format!("Deleted album: {} - {}", id, album.title));
    Ok(())
}

/// Flip the favorite flag
pub fn favorite(store: &Store, id: i64, output: &Output) -> Result<()> {
    let (shelf_id, album) = find(store, id)?;

    let now = store
        .media()
        .toggle_favorite(shelf_id, id)
        .context("Failed to update album")?;

    let verb = if now { "Favorited" } else { "Unfavorited" };
    output.success(&format!("{} {}", verb, album.title));
    Ok(())
}

/// List favorite albums
pub fn favorites(store: &Store, output: &Output) -> Result<()> {
    output.print_albums(&store.media().favorites());
    Ok(())
}

/// Move an album to another shelf (or another spot on its own shelf)
pub fn move_to(
    store: &Store,
    id: i64,
    target_shelf: i64,
    index: Option<usize>,
    output: &Output,
) -> Result<()> {
    let (source_shelf, _) = find(store, id)?;
    let source_index = store
        .media()
        .shelf(source_shelf)
        .and_then(|shelf| shelf.position_of(id))
        .ok_or_else(|| anyhow!("No album with id {}", id))?;

    let request = match index {
        Some(index) => MoveRequest::to_index(source_shelf, source_index, target_shelf, index),
        None => MoveRequest::to_end(source_shelf, source_index, target_shelf),
    };

    if request.is_identity() {
        output.message("Album is already there.");
        return Ok(());
    }

    if !store.media().move_item(request) {
        bail!("No shelf with id {}", target_shelf);
    }

    output.success(&format!("Moved album {} to shelf {}", id, target_shelf));
    Ok(())
}

fn find(store: &Store, id: i64) -> Result<(i64, MediaItem)> {
    store
        .media()
        .find_item(id)
        .ok_or_else(|| anyhow!("No album with id {}", id))
}
