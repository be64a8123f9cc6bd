//! Full-page screenshot capture
//!
//! A capture owns one browser for its whole duration: launch (with the
//! executable fallback chain), then up to three attempts of navigate →
//! readiness probes → screenshot, then close. Every failure is absorbed and
//! reported as an unavailable screenshot.

pub mod readiness;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chromiumoxide::page::{Page, ScreenshotParams};
use chromiumoxide_cdp::cdp::browser_protocol::page::CaptureScreenshotFormat;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::analysis::ScreenshotResult;
use crate::browser::{BrowserError, BrowserResult, BrowserWrapper};
use crate::browser_setup::{LaunchStrategy, find_browser_executable, launch_with_fallback};
use crate::utils::validate_navigation_timeout;
use crate::utils::constants::{NAVIGATION_TIMEOUT_MS, RETRY_PAUSE_MS};
use crate::{BrowserConfig, CaptureConfig};
use readiness::{ProbeOutcome, ReadinessProbe, default_probes, run_probes};

/// First attempt number that falls back to a viewport-only capture
const VIEWPORT_FALLBACK_ATTEMPT: u32 = 3;

/// Upper bound for the screenshot call itself
const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(30);

/// Network is considered idle once the resource count stops growing for this long
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);

const RESOURCE_COUNT: &str = "performance.getEntriesByType('resource').length";

/// Anything that can produce the website screenshot for an analysis
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    /// False when capture is disabled or no browser can be resolved.
    fn is_available(&self) -> bool;

    /// Capture `url`. Never fails; unavailability is part of the result.
    async fn capture(&self, url: &str) -> ScreenshotResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    FullPage,
    Viewport,
}

impl CaptureMode {
    /// Full page on the early attempts; full-page capture breaks on some
    /// pages so the last attempt only grabs the viewport.
    pub fn for_attempt(attempt: u32) -> Self {
        if attempt >= VIEWPORT_FALLBACK_ATTEMPT {
            CaptureMode::Viewport
        } else {
            CaptureMode::FullPage
        }
    }

    fn is_full_page(self) -> bool {
        matches!(self, CaptureMode::FullPage)
    }
}

/// Run `op` up to `max_attempts` times, pausing between failures.
///
/// `op` receives the 1-based attempt number. Returns the first success or
/// the last error.
pub async fn retry_attempts<T, E, F, Fut>(
    max_attempts: u32,
    pause: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                warn!(attempt, max_attempts, "Attempt failed, retrying: {}", e);
                tokio::time::sleep(pause).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(attempt, max_attempts, "Final attempt failed: {}", e);
                return Err(e);
            }
        }
    }
}

/// Screenshot capturer backed by headless Chrome
pub struct ScreenshotCapturer {
    browser_config: BrowserConfig,
    max_attempts: u32,
    navigation_timeout: Duration,
    retry_pause: Duration,
    launch_chain: Vec<LaunchStrategy>,
    probes: Vec<ReadinessProbe>,
    /// Resolved when the chain is set, not per capture
    available: bool,
}

impl ScreenshotCapturer {
    pub fn new(browser_config: BrowserConfig, capture_config: &CaptureConfig) -> Self {
        let launch_chain = LaunchStrategy::default_chain(&browser_config);
        let available = resolve_availability(&browser_config, &launch_chain);
        Self {
            browser_config,
            max_attempts: capture_config.max_attempts.max(1),
            navigation_timeout: validate_navigation_timeout(
                capture_config.navigation_timeout_ms,
                NAVIGATION_TIMEOUT_MS,
            ),
            retry_pause: Duration::from_millis(if capture_config.retry_pause_ms == 0 {
                RETRY_PAUSE_MS
            } else {
                capture_config.retry_pause_ms
            }),
            launch_chain,
            probes: default_probes(),
            available,
        }
    }

    /// Replace the readiness probe sequence
    pub fn with_probes(mut self, probes: Vec<ReadinessProbe>) -> Self {
        self.probes = probes;
        self
    }

    /// Replace the executable fallback chain
    pub fn with_launch_chain(mut self, chain: Vec<LaunchStrategy>) -> Self {
        self.available = resolve_availability(&self.browser_config, &chain);
        self.launch_chain = chain;
        self
    }

    async fn capture_with_browser(&self, url: &str) -> BrowserResult<Vec<u8>> {
        let initial = launch_with_fallback(&self.browser_config, &self.launch_chain).await?;
        let slot = Mutex::new(Some(initial));

        let outcome = retry_attempts(self.max_attempts, self.retry_pause, |attempt| {
            let slot = &slot;
            async move {
                let mut guard = slot.lock().await;
                let wrapper = self.ensure_browser(&mut guard, attempt).await?;
                let mode = CaptureMode::for_attempt(attempt);
                let png = self.attempt(wrapper, url, mode).await?;
                info!(url = %url, attempt, ?mode, bytes = png.len(), "Screenshot captured");
                Ok::<_, BrowserError>(png)
            }
        })
        .await;

        if let Some(wrapper) = slot.into_inner() {
            wrapper.close().await;
        }
        outcome
    }

    /// Reuse the browser across attempts, relaunching only if it crashed.
    async fn ensure_browser<'a>(
        &self,
        slot: &'a mut Option<BrowserWrapper>,
        attempt: u32,
    ) -> BrowserResult<&'a BrowserWrapper> {
        let healthy = match slot.as_ref() {
            Some(wrapper) => attempt == 1 || wrapper.is_healthy().await,
            None => false,
        };

        if !healthy {
            if let Some(crashed) = slot.take() {
                info!("Relaunching browser after crash");
                crashed.close().await;
            }
            *slot = Some(launch_with_fallback(&self.browser_config, &self.launch_chain).await?);
        }

        slot.as_ref()
            .ok_or_else(|| BrowserError::LaunchFailed("browser unavailable".into()))
    }

    /// One navigate → probe → capture cycle on a fresh page.
    async fn attempt(
        &self,
        wrapper: &BrowserWrapper,
        url: &str,
        mode: CaptureMode,
    ) -> BrowserResult<Vec<u8>> {
        let page = wrapper.new_stealth_page().await?;
        let result = self.render_and_capture(&page, url, mode).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close capture page: {}", e);
        }
        result
    }

    async fn render_and_capture(
        &self,
        page: &Page,
        url: &str,
        mode: CaptureMode,
    ) -> BrowserResult<Vec<u8>> {
        tokio::time::timeout(self.navigation_timeout, navigate_until_idle(page, url))
            .await
            .map_err(|_| BrowserError::NavigationTimeout(self.navigation_timeout.as_millis()))??;

        let reports = run_probes(page, &self.probes).await;
        let settled = reports
            .iter()
            .filter(|r| r.outcome == ProbeOutcome::Passed)
            .count();
        debug!(url = %url, settled, total = reports.len(), "Readiness probes finished");

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(mode.is_full_page())
            .build();

        tokio::time::timeout(SCREENSHOT_TIMEOUT, page.screenshot(params))
            .await
            .map_err(|_| BrowserError::ScreenshotFailed("screenshot timed out".into()))?
            .map_err(|e| BrowserError::ScreenshotFailed(e.to_string()))
    }
}

/// Whether any rung of `chain` can produce a browser. Probes the filesystem
/// and spawns `which`.
fn resolve_availability(config: &BrowserConfig, chain: &[LaunchStrategy]) -> bool {
    if !config.enabled {
        return false;
    }
    if chain.contains(&LaunchStrategy::ManagedDownload) {
        return true;
    }
    chain.contains(&LaunchStrategy::SystemExecutable)
        && find_browser_executable(config.chrome_path.as_deref()).is_ok()
}

/// Navigate and wait until the page stops requesting new resources.
async fn navigate_until_idle(page: &Page, url: &str) -> BrowserResult<()> {
    page.goto(url)
        .await
        .map_err(|e| BrowserError::NavigationFailed(format!("{url}: {e}")))?;

    let mut last_count = resource_count(page).await;
    loop {
        tokio::time::sleep(NETWORK_QUIET_WINDOW).await;
        let count = resource_count(page).await;
        if count <= last_count {
            return Ok(());
        }
        last_count = count;
    }
}

async fn resource_count(page: &Page) -> u64 {
    match page.evaluate_expression(RESOURCE_COUNT).await {
        Ok(result) => result.into_value::<u64>().unwrap_or(0),
        Err(e) => {
            debug!("Resource count unavailable: {}", e);
            0
        }
    }
}

#[async_trait]
impl ScreenshotSource for ScreenshotCapturer {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn capture(&self, url: &str) -> ScreenshotResult {
        if !self.is_available() {
            info!(url = %url, "Screenshot capture unavailable, skipping");
            return ScreenshotResult::unavailable(url);
        }

        match self.capture_with_browser(url).await {
            Ok(png) => ScreenshotResult::captured(url, BASE64.encode(png)),
            Err(e) => {
                warn!(url = %url, "No screenshot for site: {}", e);
                ScreenshotResult::unavailable(url)
            }
        }
    }
}
