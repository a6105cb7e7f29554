//! Bean (cafe collection) command handlers

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;

use palace_core::{IngredientItem, Roast, Store};

use crate::output::Output;

/// Optional bean fields shared by `add` and `edit`
#[derive(Args, Debug, Clone, Default)]
pub struct BeanFields {
    /// Growing region
    #[arg(long)]
    pub region: Option<String>,
    /// Processing method (Washed, Natural, Honey, ...)
    #[arg(long)]
    pub process: Option<String>,
    /// Tasting notes
    #[arg(long)]
    pub notes: Option<String>,
    /// Roast level: light, medium, dark or omni
    #[arg(long)]
    pub roast: Option<Roast>,
    /// Gradient start color
    #[arg(long)]
    pub color_from: Option<String>,
    /// Gradient end color
    #[arg(long)]
    pub color_to: Option<String>,
}

impl BeanFields {
    fn is_empty(&self) -> bool {
        self.region.is_none()
            && self.process.is_none()
            && self.notes.is_none()
            && self.roast.is_none()
            && self.color_from.is_none()
            && self.color_to.is_none()
    }

    fn apply(self, bean: &mut IngredientItem) {
        if let Some(region) = self.region {
            bean.region = region;
        }
        if let Some(process) = self.process {
            bean.process = process;
        }
        if let Some(notes) = self.notes {
            bean.notes = notes;
        }
        if let Some(roast) = self.roast {
            bean.roast = roast;
        }
        if let Some(color) = self.color_from {
            bean.color_from = color;
        }
        if let Some(color) = self.color_to {
            bean.color_to = color;
        }
    }
}

/// Add a bean to a shelf, at the end or at `at`
pub fn add(
    store: &Store,
    shelf_id: i64,
    name: String,
    fields: BeanFields,
    at: Option<usize>,
    output: &Output,
) -> Result<()> {
    let mut bean = IngredientItem::new(name);
    fields.apply(&mut bean);

    let beans = store.ingredients();
    bean.id = match at {
        Some(index) => beans.insert_item(shelf_id, index, bean.clone()),
        None => beans.add_item(shelf_id, bean.clone()),
    }
    .context("Failed to add bean")?;

    output.success(&format!("Added bean {}", bean.id));
    output.print_bean(&bean);
    Ok(())
}

/// Change fields of an existing bean
pub fn edit(
    store: &Store,
    id: i64,
    name: Option<String>,
    fields: BeanFields,
    output: &Output,
) -> Result<()> {
    if name.is_none() && fields.is_empty() {
        bail!("Nothing to change. Pass at least one field, e.g. --notes \"Cocoa\"");
    }

    let (shelf_id, mut bean) = find(store, id)?;
    if let Some(name) = name {
        bean.name = name;
    }
    fields.apply(&mut bean);

    store
        .ingredients()
        .update_item(shelf_id, bean.clone())
        .context("Failed to update bean")?;

    output.success("Bean updated");
    output.print_bean(&bean);
    Ok(())
}

/// Remove a bean
pub fn delete(store: &Store, id: i64, output: &Output) -> Result<()> {
    let (shelf_id, bean) = find(store, id)?;

    store
        .ingredients()
        .delete_item(shelf_id, id)
        .context("Failed to delete bean")?;

    output.success(&format!("Deleted bean: {} - {}", id, bean.name));
    Ok(())
}

fn find(store: &Store, id: i64) -> Result<(i64, IngredientItem)> {
    store
        .ingredients()
        .find_item(id)
        .ok_or_else(|| anyhow!("No bean with id {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use palace_core::{DurableStore, MemoryBackend};

    async fn store() -> Store {
        let store = Store::with_durable(DurableStore::new(MemoryBackend::new()));
        store.ready().await;
        store
    }

    #[tokio::test]
    async fn test_add_at_index_then_edit() {
        let store = store().await;
        let output = Output::new(OutputFormat::Quiet);

        let fields = BeanFields {
            region: Some("Nyeri".to_string()),
            roast: Some(Roast::Dark),
            ..BeanFields::default()
        };
        add(&store, 1, "Kenya AA".to_string(), fields, Some(0), &output).unwrap();

        let shelf = store.ingredients().shelf(1).unwrap();
        let bean = shelf.items[0].clone();
        assert_eq!(bean.name, "Kenya AA");
        assert_eq!(bean.region, "Nyeri");
        assert_eq!(bean.roast, Roast::Dark);

        let fields = BeanFields {
            notes: Some("Blackcurrant".to_string()),
            ..BeanFields::default()
        };
        edit(&store, bean.id, None, fields, &output).unwrap();

        let (_, edited) = store.ingredients().find_item(bean.id).unwrap();
        assert_eq!(edited.notes, "Blackcurrant");
        assert_eq!(edited.region, "Nyeri");
    }

    #[tokio::test]
    async fn test_edit_without_changes_fails() {
        let store = store().await;
        let output = Output::new(OutputFormat::Quiet);

        assert!(edit(&store, 101, None, BeanFields::default(), &output).is_err());
        assert!(delete(&store, 4242, &output).is_err());
    }
}
