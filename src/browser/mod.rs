//! Browser infrastructure for launching and owning Chrome instances

mod wrapper;

pub use wrapper::BrowserWrapper;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to find browser executable: {0}")]
    NotFound(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Navigation timeout after {0}ms")]
    NavigationTimeout(u128),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for BrowserError {
    fn from(err: std::io::Error) -> Self {
        BrowserError::IoError(err.to_string())
    }
}

pub type BrowserResult<T> = Result<T, BrowserError>;
