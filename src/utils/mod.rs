pub mod constants;
mod text;
mod timeout;

pub use text::{collapse_whitespace, truncate_chars};
pub use timeout::{validate_navigation_timeout, validate_step_timeout};
