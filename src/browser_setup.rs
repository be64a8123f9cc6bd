use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task;
use tracing::{error, info, trace, warn};

use crate::BrowserConfig;
use crate::browser::{BrowserError, BrowserResult, BrowserWrapper};
use crate::utils::constants::CHROME_USER_AGENT;

/// One rung of the executable fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStrategy {
    /// Configured path, `CHROMIUM_PATH`, or a browser installed on the system
    SystemExecutable,
    /// Chromium downloaded into the user cache by the chromiumoxide fetcher
    ManagedDownload,
}

impl LaunchStrategy {
    /// Rungs tried in order, the managed download only when allowed
    pub fn default_chain(config: &BrowserConfig) -> Vec<LaunchStrategy> {
        let mut chain = vec![LaunchStrategy::SystemExecutable];
        if config.allow_download {
            chain.push(LaunchStrategy::ManagedDownload);
        }
        chain
    }

    pub async fn resolve_executable(self, config: &BrowserConfig) -> Result<PathBuf> {
        match self {
            LaunchStrategy::SystemExecutable => {
                find_browser_executable(config.chrome_path.as_deref())
            }
            LaunchStrategy::ManagedDownload => download_managed_browser().await,
        }
    }
}

/// RAII guard for the profile directory of a browser that has not launched yet
///
/// Removes the directory on drop unless consumed by `into_path()`.
struct TempDirGuard {
    path: PathBuf,
    keep: bool,
}

impl TempDirGuard {
    fn new(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path).context("Failed to create user data directory")?;
        Ok(Self { path, keep: false })
    }

    /// Hand the directory over to the `BrowserWrapper`
    fn into_path(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if !self.keep {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to clean up temp dir {}: {}", self.path.display(), e);
            } else {
                info!(
                    "Cleaned up temp dir after launch failure: {}",
                    self.path.display()
                );
            }
        }
    }
}

/// Find a Chrome/Chromium executable.
///
/// Order: explicit path, `CHROMIUM_PATH`, well-known install locations,
/// then `which` on Unix.
pub fn find_browser_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            info!("Using configured browser: {}", path.display());
            return Ok(path.to_path_buf());
        }
        warn!("Configured chrome_path does not exist: {}", path.display());
    }

    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(
                "Using browser from CHROMIUM_PATH environment variable: {}",
                path.display()
            );
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH environment variable points to non-existent file: {}",
            path.display()
        );
    }

    let paths: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
        ]
    };

    for path_str in paths {
        let path = match path_str.strip_prefix("~/") {
            Some(rest) => match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => continue,
            },
            None => PathBuf::from(path_str),
        };

        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!("Found browser using 'which' command: {}", path.display());
                    return Ok(path);
                }
            }
        }
    }

    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium into the user cache and return its executable.
pub async fn download_managed_browser() -> Result<PathBuf> {
    info!("Downloading managed Chromium browser...");

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| std::env::temp_dir().join(".cache"))
        .join("copy_critic/chromium");

    std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );

    let revision_info = fetcher.fetch().await.context("Failed to fetch browser")?;

    info!(
        "Downloaded Chromium to: {}",
        revision_info.folder_path.display()
    );

    Ok(revision_info.executable_path)
}

/// Launch a browser from `executable` with stealth flags and the configured
/// desktop viewport. The profile lives in a fresh temp directory.
pub async fn launch_browser(config: &BrowserConfig, executable: PathBuf) -> Result<BrowserWrapper> {
    let user_data_dir =
        std::env::temp_dir().join(format!("copy_critic_chrome_{}", uuid::Uuid::new_v4()));
    let temp_guard = TempDirGuard::new(user_data_dir)?;

    let (width, height) = (config.window.width, config.window.height);
    let mut config_builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(width, height)
        .viewport(Viewport {
            width,
            height,
            ..Viewport::default()
        })
        .user_data_dir(temp_guard.path.clone())
        .chrome_executable(executable);

    if config.headless {
        config_builder = config_builder.headless_mode(HeadlessMode::default());
    } else {
        config_builder = config_builder.with_head();
    }

    config_builder = config_builder
        .arg(format!("--user-agent={}", CHROME_USER_AGENT))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-notifications")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-software-rasterizer")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-extensions")
        .arg("--disable-popup-blocking")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-backgrounding-occluded-windows")
        .arg("--disable-features=TranslateUI")
        .arg("--lang=en-US")
        .arg("--hide-scrollbars")
        .arg("--mute-audio");

    if config.disable_security {
        info!("WARNING: Disabling browser security features (disable_security=true)");
        config_builder = config_builder
            .arg("--disable-web-security")
            .arg("--ignore-certificate-errors");
    }

    if should_disable_sandbox() || config.disable_security {
        info!("Disabling Chrome sandbox");
        config_builder = config_builder
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox");
    }

    let browser_config = config_builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(h) = handler.next().await {
            if let Err(e) = h {
                let error_msg = e.to_string();

                // chromiumoxide cannot decode every CDP event Chrome emits
                let is_benign_serialization_error = error_msg
                    .contains("data did not match any variant of untagged enum Message")
                    || error_msg.contains("Failed to deserialize WS response");

                if is_benign_serialization_error {
                    trace!("Suppressed benign CDP serialization error: {}", error_msg);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        trace!("Browser handler task completed");
    });

    Ok(BrowserWrapper::new(
        browser,
        handler_task,
        temp_guard.into_path(),
    ))
}

/// Walk the launch chain and return the first browser that starts.
pub async fn launch_with_fallback(
    config: &BrowserConfig,
    chain: &[LaunchStrategy],
) -> BrowserResult<BrowserWrapper> {
    let mut failures = Vec::with_capacity(chain.len());

    for strategy in chain {
        let attempt = async {
            let executable = strategy.resolve_executable(config).await?;
            launch_browser(config, executable).await
        };

        match attempt.await {
            Ok(wrapper) => {
                info!(?strategy, "Browser launched");
                return Ok(wrapper);
            }
            Err(e) => {
                warn!(?strategy, "Browser launch failed: {:#}", e);
                failures.push(format!("{strategy:?}: {e:#}"));
            }
        }
    }

    if failures.is_empty() {
        return Err(BrowserError::NotFound("no launch strategy configured".into()));
    }
    Err(BrowserError::LaunchFailed(failures.join("; ")))
}

/// In containers the setuid sandbox does not work
fn should_disable_sandbox() -> bool {
    Path::new("/.dockerenv").exists()
        || std::env::var("container").is_ok()
        || std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
}
