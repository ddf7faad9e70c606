//! The read-only entity catalog: parsing the listing service's JSON and the
//! one-shot loader that fetches it at startup.

mod entity;
mod loader;

pub use entity::{parse_catalog, Entity, ParseResult, Tier, UNKNOWN_LEVEL};
pub use loader::{fetch_catalog, CatalogState, FetchError, DEFAULT_CATALOG_URL};
