//! Shared configuration constants for the analysis pipeline
//!
//! Default values used by the extractor, the capturer and the composer so
//! the numbers live in one place.

/// Chrome user agent sent with every page fetch and browser launch
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Desktop viewport used for rendering landing pages
pub const VIEWPORT_WIDTH: u32 = 1366;
pub const VIEWPORT_HEIGHT: u32 = 768;

/// Character budget for the body excerpt of a page digest
pub const BODY_EXCERPT_CHARS: usize = 4000;

/// Maximum characters kept from a page title in URL previews
pub const PREVIEW_TITLE_CHARS: usize = 100;

/// Capture attempts per URL before giving up on a screenshot
pub const MAX_CAPTURE_ATTEMPTS: u32 = 3;

/// Hard navigation timeout (30 seconds)
pub const NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Fixed pause between capture attempts
pub const RETRY_PAUSE_MS: u64 = 1_000;

/// Script evaluated before any page script runs.
///
/// Hides the automation markers headless Chrome exposes and gives the
/// navigator a plausible plugin list and language set.
pub const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en', 'pt-BR'] });
window.chrome = window.chrome || { runtime: {} };
"#;
