//! Workshop Data -- everything that comes from or goes to disk.
//!
//! - [`schema`] / [`loader`]: the reference data (items, workshop crafts,
//!   recipes, vendors, gathering points) and automation settings, read from
//!   RON, TOML or JSON files.
//! - [`store::JsonFileStore`]: the persisted queue and in-progress craft.
//! - [`clipboard`]: the queue exchange format.

pub mod clipboard;
pub mod loader;
pub mod schema;
pub mod store;

pub use clipboard::{ClipboardError, export_queue, import_queue};
pub use loader::{DataLoadError, WorkshopData, load_workshop_data};
pub use store::JsonFileStore;
