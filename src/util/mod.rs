//! Small helpers shared by the catalog parser and the TUI.
//!
//! - **URL validation**: http(s)-only checks for the catalog endpoint and image links
//! - **Text processing**: Unicode-aware width, truncation and label sanitizing
//!
//! ```
//! use digidex::util::{display_width, truncate_to_width, validate_http_url};
//!
//! let url = validate_http_url("https://digimon-api.vercel.app/api/digimon").unwrap();
//! assert_eq!(url.host_str(), Some("digimon-api.vercel.app"));
//! assert_eq!(display_width("Agumon"), 6);
//! assert_eq!(truncate_to_width("Greymon", 4), "Gre…");
//! ```

mod text;
mod url;

pub use text::{display_width, pad_to_width, sanitize_label, truncate_to_width};
pub use self::url::{validate_http_url, validate_url_for_open, UrlValidationError};

/// Maximum accepted search term length, in characters.
pub const MAX_SEARCH_TERM_LENGTH: usize = 64;
