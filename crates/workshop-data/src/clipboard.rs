//! Queue exchange format: a JSON array of `{"Id": craftId, "Q": quantity}`.

use serde::{Deserialize, Serialize};

use workshop_core::catalog::WorkshopCatalog;
use workshop_core::id::CraftId;
use workshop_core::state::QueuedItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClipboardEntry {
    #[serde(rename = "Id")]
    id: u32,
    #[serde(rename = "Q")]
    quantity: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard does not hold a workshop queue: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn export_queue(queue: &[QueuedItem]) -> Result<String, ClipboardError> {
    let entries: Vec<ClipboardEntry> = queue
        .iter()
        .map(|entry| ClipboardEntry {
            id: entry.craft_id.0,
            quantity: i64::from(entry.quantity),
        })
        .collect();
    Ok(serde_json::to_string(&entries)?)
}

/// Parse a queue. Crafts missing from `catalog` are skipped and negative
/// quantities become zero.
pub fn import_queue(
    text: &str,
    catalog: &WorkshopCatalog,
) -> Result<Vec<QueuedItem>, ClipboardError> {
    let entries: Vec<ClipboardEntry> = serde_json::from_str(text.trim())?;
    let mut queue = Vec::with_capacity(entries.len());
    for entry in entries {
        let craft_id = CraftId(entry.id);
        if catalog.get(craft_id).is_none() {
            tracing::warn!(craft = %craft_id, "skipping unknown craft in imported queue");
            continue;
        }
        queue.push(QueuedItem::new(craft_id, entry.quantity));
    }
    Ok(queue)
}
