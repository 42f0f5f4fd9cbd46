use crate::io::store::{DocumentStore, StoreError, base_name};
use crate::model::config::Settings;
use crate::model::item::ChecklistItem;
use crate::parse::unchecked_items;

/// Gather every open checklist item in the vault.
///
/// Documents come in store order and items in line order. The aggregate
/// itself and excluded folders are skipped. Nothing is deduplicated here.
/// A document that cannot be read is logged and skipped.
pub fn collect<S: DocumentStore + ?Sized>(
    store: &S,
    settings: &Settings,
) -> Result<Vec<ChecklistItem>, StoreError> {
    let mut items = Vec::new();
    for path in store.list()? {
        if path == settings.output_file_path || settings.is_excluded(&path) {
            continue;
        }
        let text = match store.read(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "skipping unreadable document");
                continue;
            }
        };
        let source = base_name(&path);
        items.extend(unchecked_items(&text).map(|m| ChecklistItem::new(m.text, source)));
    }
    tracing::debug!(count = items.len(), "collected open items");
    Ok(items)
}

/// Find the document a `[[Source]]` backlink points at.
pub fn find_source<S: DocumentStore + ?Sized>(
    store: &S,
    settings: &Settings,
    source_name: &str,
) -> Result<Option<String>, StoreError> {
    Ok(store.list()?.into_iter().find(|path| {
        *path != settings.output_file_path
            && !settings.is_excluded(path)
            && base_name(path) == source_name
    }))
}
