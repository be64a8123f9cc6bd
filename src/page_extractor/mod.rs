//! Page text extraction module
//!
//! Fetches a page over plain HTTP and reduces its HTML to the fields the
//! copy analysis cares about: title, description, headings, calls to action,
//! form labels, prices and a bounded body excerpt.

mod fetch;
pub mod html;
mod preview;

pub use fetch::PageTextExtractor;
pub use html::parse_document;
pub use preview::{PreviewError, UrlPreview, preview_url};
