//! Readiness probes run between navigation and the screenshot
//!
//! Each probe has its own timeout and none of them can fail the capture: a
//! probe that times out or errors is logged and the next one runs.

use async_trait::async_trait;
use chromiumoxide::page::Page;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::utils::validate_step_timeout;

/// How often a script probe re-evaluates its condition
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Used when a probe is given a zero timeout
const DEFAULT_STEP_TIMEOUT_MS: u64 = 5_000;

const IMAGES_COMPLETE: &str = "Array.from(document.images).every(img => img.complete)";

const FONTS_READY: &str = "!document.fonts || document.fonts.status === 'loaded'";

const NO_LOADING_INDICATORS: &str = r#"
Array.from(document.querySelectorAll(
  '[class*="loading"], [class*="spinner"], [class*="loader"], [class*="skeleton"]'
)).every(el => {
  const style = window.getComputedStyle(el);
  return el.offsetParent === null
    || style.display === 'none'
    || style.visibility === 'hidden'
    || style.opacity === '0';
})
"#;

const MEDIA_READY: &str = r#"
Array.from(document.querySelectorAll('video')).every(v => v.readyState >= 3)
  && Array.from(document.querySelectorAll('iframe')).every(f => !!f.src)
"#;

const LOAD_COMPLETE: &str = r#"
(() => {
  const nav = performance.getEntriesByType('navigation')[0];
  return nav ? nav.loadEventEnd > 0 : document.readyState === 'complete';
})()
"#;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
const SCROLL_TO_TOP: &str = "window.scrollTo(0, 0)";

/// Page surface the probes need; implemented for chromiumoxide pages and
/// by fakes in tests.
#[async_trait]
pub trait ProbeTarget: Send + Sync {
    /// Evaluate an expression that yields a boolean
    async fn check(&self, expression: &str) -> anyhow::Result<bool>;

    /// Evaluate an expression for its side effects
    async fn run(&self, expression: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl ProbeTarget for Page {
    async fn check(&self, expression: &str) -> anyhow::Result<bool> {
        let value = self
            .evaluate_expression(expression)
            .await?
            .into_value::<bool>()?;
        Ok(value)
    }

    async fn run(&self, expression: &str) -> anyhow::Result<()> {
        self.evaluate_expression(expression).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeKind {
    /// Poll a boolean expression until it is true
    Condition(&'static str),
    /// Sleep for a fixed time
    Settle(Duration),
    /// Scroll to the bottom and back to trigger lazy loading
    ScrollCycle { bottom_pause: Duration, top_pause: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessProbe {
    pub name: &'static str,
    pub kind: ProbeKind,
    pub timeout: Duration,
}

impl ReadinessProbe {
    /// Timeouts above the per-step ceiling are clamped.
    pub fn new(name: &'static str, kind: ProbeKind, timeout: Duration) -> Self {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        Self {
            name,
            kind,
            timeout: validate_step_timeout(timeout_ms, DEFAULT_STEP_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Passed,
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub name: &'static str,
    pub outcome: ProbeOutcome,
    pub elapsed: Duration,
}

/// The fixed probe sequence used before every screenshot
pub fn default_probes() -> Vec<ReadinessProbe> {
    vec![
        ReadinessProbe::new(
            "images_complete",
            ProbeKind::Condition(IMAGES_COMPLETE),
            Duration::from_secs(10),
        ),
        ReadinessProbe::new(
            "fonts_ready",
            ProbeKind::Condition(FONTS_READY),
            Duration::from_secs(5),
        ),
        ReadinessProbe::new(
            "css_transitions",
            ProbeKind::Settle(Duration::from_secs(3)),
            Duration::from_secs(5),
        ),
        ReadinessProbe::new(
            "lazy_content_scroll",
            ProbeKind::ScrollCycle {
                bottom_pause: Duration::from_secs(2),
                top_pause: Duration::from_secs(1),
            },
            Duration::from_secs(10),
        ),
        ReadinessProbe::new(
            "no_loading_indicators",
            ProbeKind::Condition(NO_LOADING_INDICATORS),
            Duration::from_secs(5),
        ),
        ReadinessProbe::new(
            "media_ready",
            ProbeKind::Condition(MEDIA_READY),
            Duration::from_secs(5),
        ),
        ReadinessProbe::new(
            "load_complete",
            ProbeKind::Condition(LOAD_COMPLETE),
            Duration::from_secs(5),
        ),
        ReadinessProbe::new(
            "final_settle",
            ProbeKind::Settle(Duration::from_secs(1)),
            Duration::from_secs(2),
        ),
    ]
}

/// Run every probe in order. Never aborts early.
pub async fn run_probes<T: ProbeTarget + ?Sized>(
    target: &T,
    probes: &[ReadinessProbe],
) -> Vec<ProbeReport> {
    let mut reports = Vec::with_capacity(probes.len());

    for probe in probes {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(probe.timeout, execute(target, &probe.kind)).await
        {
            Ok(Ok(())) => ProbeOutcome::Passed,
            Ok(Err(e)) => ProbeOutcome::Failed(format!("{:#}", e)),
            Err(_) => ProbeOutcome::TimedOut,
        };

        match &outcome {
            ProbeOutcome::Passed => debug!(probe = probe.name, "Readiness probe passed"),
            ProbeOutcome::TimedOut => warn!(
                probe = probe.name,
                timeout_ms = probe.timeout.as_millis() as u64,
                "Readiness probe timed out, continuing"
            ),
            ProbeOutcome::Failed(reason) => warn!(
                probe = probe.name,
                "Readiness probe failed, continuing: {}", reason
            ),
        }

        reports.push(ProbeReport {
            name: probe.name,
            outcome,
            elapsed: started.elapsed(),
        });
    }

    reports
}

async fn execute<T: ProbeTarget + ?Sized>(target: &T, kind: &ProbeKind) -> anyhow::Result<()> {
    match kind {
        ProbeKind::Condition(expression) => loop {
            if target.check(expression).await? {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        },
        ProbeKind::Settle(delay) => {
            tokio::time::sleep(*delay).await;
            Ok(())
        }
        ProbeKind::ScrollCycle {
            bottom_pause,
            top_pause,
        } => {
            target.run(SCROLL_TO_BOTTOM).await?;
            tokio::time::sleep(*bottom_pause).await;
            target.run(SCROLL_TO_TOP).await?;
            tokio::time::sleep(*top_pause).await;
            Ok(())
        }
    }
}
