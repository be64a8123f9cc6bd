//! Owned browser handle for one screenshot capture
//!
//! A capture acquires exactly one `BrowserWrapper`, and `close()` must run
//! before control returns to the aggregator. `Drop` is the backstop for
//! early returns: it aborts the CDP handler and chromiumoxide kills the
//! child process.

use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BrowserError, BrowserResult};
use crate::utils::constants::STEALTH_SCRIPT;

/// Upper bound for each shutdown step
const SHUTDOWN_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Wrapper for Browser, its event handler task and its profile directory
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    /// True when the browser still answers CDP commands
    pub async fn is_healthy(&self) -> bool {
        match self.browser.version().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Browser health check failed: {}", e);
                false
            }
        }
    }

    /// Open a blank page with the automation markers hidden.
    ///
    /// The stealth script is registered before navigation so it runs ahead
    /// of any page script.
    pub async fn new_stealth_page(&self) -> BrowserResult<Page> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        page.evaluate_on_new_document(STEALTH_SCRIPT.to_string())
            .await
            .map_err(|e| BrowserError::PageCreationFailed(format!("stealth injection: {e}")))?;

        debug!("Created blank page with stealth injection");
        Ok(page)
    }

    /// Close the browser, wait for the process to exit and remove the profile.
    ///
    /// `close()` sends the CDP close command and `wait()` reaps the process;
    /// dropping alone would leave a zombie Chrome behind.
    ///
    /// Each step is bounded; a process that does not exit in time is killed.
    pub async fn close(mut self) {
        info!("Closing capture browser");

        bounded_step("close browser", SHUTDOWN_STEP_TIMEOUT, self.browser.close()).await;

        let exited = bounded_step(
            "wait for browser exit",
            SHUTDOWN_STEP_TIMEOUT,
            self.browser.wait(),
        )
        .await
        .is_some();
        if !exited {
            match self.browser.kill().await {
                Some(Err(e)) => warn!("Failed to kill browser process: {}", e),
                Some(Ok(())) => info!("Killed unresponsive browser process"),
                None => debug!("No browser child process to kill"),
            }
        }

        self.cleanup_temp_dir();
    }

    /// Remove the profile directory. Must run after the process exited so no
    /// file handles are held.
    fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            debug!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

/// Run one shutdown step under `limit`. `None` when it failed or timed out.
async fn bounded_step<T, E, F>(step: &str, limit: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("Failed to {}: {}", step, e);
            None
        }
        Err(_) => {
            warn!("Timed out after {:?} trying to {}", limit, step);
            None
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();

        if let Some(path) = &self.user_data_dir {
            warn!(
                "BrowserWrapper dropped without close(); profile left at {}",
                path.display()
            );
        }
    }
}
