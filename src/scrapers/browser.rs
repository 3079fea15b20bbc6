//! Headless Chrome source for the live listing page.
//!
//! The listing is rendered client-side, so a plain HTTP fetch only returns an
//! empty shell. This module drives Chrome over CDP (via `chromiumoxide`):
//!
//! 1. Launch with a desktop user agent, a 1920x1080 viewport and flags that
//!    hide the most obvious automation markers
//! 2. Navigate to the target and wait for the load event
//! 3. Wait until no request has been in flight for [`IDLE_WINDOW`]
//! 4. Copy each card's agent link onto the card itself (see below)
//! 5. Serialize the DOM and release the browser
//!
//! Cards are rendered inside an `<a href="/agents/...">` that can also hold a
//! nested profile `<a>`. Browsers build that tree from script, but an HTML
//! parser never nests anchors, so re-parsing the serialized DOM would move the
//! card out of its agent anchor. The link is therefore recorded in the live
//! DOM, as an [`AGENT_HREF_ATTR`] attribute on the card, before serializing.
//!
//! Navigation and the idle wait are each bounded by the configured timeout.
//! The browser is closed on every path, success or not.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, RequestId,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{PageSource, RenderedPage};
use crate::error::ScrapeError;
use crate::extract::AGENT_HREF_ATTR;
use crate::locators::Locators;
use crate::utils::truncate_for_log;

/// Listing page scraped by default.
pub const TARGET_URL: &str = "https://fun.virtuals.io/";

/// Desktop Chrome on macOS.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36";

pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// Extra Chrome flags; `--no-sandbox` is set through the config builder.
const LAUNCH_FLAGS: [&str; 2] = [
    "--disable-blink-features=AutomationControlled",
    "--disable-setuid-sandbox",
];

/// How long the network must stay quiet to count as idle.
pub const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Default bound on navigation and on the idle wait, each.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Knobs for a browser run.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Page to load.
    pub url: Url,
    /// Run without a visible window.
    pub headless: bool,
    /// Pause inserted after each browser step, for watching a headed run.
    pub slow_mo: Duration,
    /// Bound on navigation and on the network idle wait.
    pub timeout: Duration,
    /// Chrome binary; detected from the system when unset.
    pub chrome_executable: Option<PathBuf>,
}

impl BrowserSettings {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headless: true,
            slow_mo: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            chrome_executable: None,
        }
    }
}

/// A [`PageSource`] that renders the target in Chrome.
#[derive(Debug, Clone)]
pub struct BrowserSource {
    settings: BrowserSettings,
    /// Script run in the page before serializing; see [`agent_link_script`].
    annotate: String,
}

impl BrowserSource {
    pub fn new(settings: BrowserSettings, locators: &Locators) -> Self {
        Self {
            settings,
            annotate: agent_link_script(locators),
        }
    }

    /// Launch configuration derived from the settings.
    pub fn config(&self) -> Result<BrowserConfig, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Default::default()
            })
            .request_timeout(self.settings.timeout)
            .arg(format!("--user-agent={USER_AGENT}"));

        for flag in LAUNCH_FLAGS {
            builder = builder.arg(flag);
        }
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(ScrapeError::Launch)
    }

    async fn pause(&self) {
        if !self.settings.slow_mo.is_zero() {
            time::sleep(self.settings.slow_mo).await;
        }
    }

    /// Open the page, wait for it to settle and serialize it.
    async fn load(&self, browser: &Browser) -> Result<RenderedPage, ScrapeError> {
        let timeout = self.settings.timeout;

        let page = browser.new_page("about:blank").await?;
        self.pause().await;

        // Subscribe before navigating so no request goes unseen.
        let sent = page
            .event_listener::<EventRequestWillBeSent>()
            .await?
            .map(|e| (e.request_id.clone(), e.request.url.clone()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|e| e.request_id.clone());
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await?
            .map(|e| e.request_id.clone());

        info!("Navigating to target");
        time::timeout(timeout, page.goto(self.settings.url.as_str()))
            .await
            .map_err(|_| ScrapeError::Timeout {
                stage: "navigation",
                after: timeout,
            })??;
        self.pause().await;

        time::timeout(timeout, wait_for_network_idle(sent, finished, failed))
            .await
            .map_err(|_| ScrapeError::Timeout {
                stage: "network idle",
                after: timeout,
            })?;
        self.pause().await;

        let annotated: usize = page
            .evaluate(self.annotate.as_str())
            .await?
            .into_value()
            .map_err(CdpError::from)?;
        debug!(cards = annotated, "Recorded agent links on cards");

        let html = page.content().await?;
        let url = page
            .url()
            .await?
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| self.settings.url.clone());

        info!(bytes = html.len(), %url, "Captured rendered document");
        debug!(preview = %truncate_for_log(&html, 300), "Document preview");
        Ok(RenderedPage { url, html })
    }
}

impl PageSource for BrowserSource {
    #[instrument(level = "info", skip_all, fields(url = %self.settings.url, headless = self.settings.headless))]
    async fn render(&self) -> Result<RenderedPage, ScrapeError> {
        let config = self.config()?;

        info!("Launching browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler error");
                }
            }
        });
        self.pause().await;

        let outcome = self.load(&browser).await;
        release(browser, handler_task).await;
        outcome
    }
}

/// Close the browser and stop its handler. Failures are logged only.
async fn release(mut browser: Browser, handler_task: JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        warn!(error = %e, "Failed to close browser cleanly");
    }
    if let Err(e) = browser.wait().await {
        warn!(error = %e, "Failed to reap browser process");
    }
    handler_task.abort();
    let _ = handler_task.await;
    info!("Browser released");
}

/// In-page script that copies the href of each card's closest agent anchor
/// onto the card as [`AGENT_HREF_ATTR`]. Evaluates to the number of cards
/// marked.
pub fn agent_link_script(locators: &Locators) -> String {
    // JSON string literals are valid JS string literals.
    let card = serde_json::Value::from(locators.card.as_str());
    let anchor = serde_json::Value::from(locators.agent_anchor());
    let attr = serde_json::Value::from(AGENT_HREF_ATTR);
    format!(
        r#"(function () {{
    let marked = 0;
    for (const card of document.querySelectorAll({card})) {{
        const anchor = card.closest({anchor});
        if (anchor) {{
            card.setAttribute({attr}, anchor.getAttribute("href"));
            marked += 1;
        }}
    }}
    return marked;
}})()"#
    )
}

/// Resolve once no request has been pending for [`IDLE_WINDOW`].
///
/// `sent` yields the id and URL of each outgoing request; `finished` and
/// `failed` yield the ids of requests that completed. The quiet timer
/// restarts on every event. Returns early if all three streams end while a
/// request is still pending.
async fn wait_for_network_idle<S, F, X>(mut sent: S, mut finished: F, mut failed: X)
where
    S: Stream<Item = (RequestId, String)> + Unpin,
    F: Stream<Item = RequestId> + Unpin,
    X: Stream<Item = RequestId> + Unpin,
{
    let mut in_flight: HashSet<RequestId> = HashSet::new();

    loop {
        tokio::select! {
            Some((id, url)) = sent.next() => {
                // data: URLs never report completion
                if !url.starts_with("data:") {
                    in_flight.insert(id);
                }
            }
            Some(id) = finished.next() => {
                in_flight.remove(&id);
            }
            Some(id) = failed.next() => {
                in_flight.remove(&id);
            }
            _ = time::sleep(IDLE_WINDOW), if in_flight.is_empty() => {
                debug!("Network idle");
                return;
            }
            else => {
                debug!(pending = in_flight.len(), "Event streams closed before idle");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::stream;
    use tokio::time::Instant;

    #[test]
    fn test_settings_default_to_headless_without_delay() {
        let settings = BrowserSettings::new(Url::parse(TARGET_URL).unwrap());
        assert!(settings.headless);
        assert!(settings.slow_mo.is_zero());
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert!(settings.chrome_executable.is_none());
    }

    #[test]
    fn test_user_agent_is_desktop_chrome() {
        assert!(USER_AGENT.contains("Chrome/"));
        assert!(!USER_AGENT.contains("Headless"));
    }

    #[test]
    fn test_agent_link_script_uses_locators() {
        let locators = Locators {
            card: r#"li[data-kind="token"]"#.to_string(),
            agent_prefix: "/agent/".to_string(),
            ..Locators::default()
        };
        let script = agent_link_script(&locators);

        assert!(script.starts_with("(function () {"));
        assert!(script.trim_end().ends_with("})()"));
        assert!(script.contains(r#"document.querySelectorAll("li[data-kind=\"token\"]")"#));
        assert!(script.contains(r#"card.closest("a[href^=\"/agent/\"]")"#));
        assert!(script.contains(r#"card.setAttribute("data-agent-href", "#));
    }

    fn request(id: &str, url: &str) -> (RequestId, String) {
        (RequestId::new(id), url.to_string())
    }

    fn no_requests() -> stream::Pending<(RequestId, String)> {
        stream::pending()
    }

    fn no_completions() -> stream::Pending<RequestId> {
        stream::pending()
    }

    /// The paused clock lands on millisecond timer ticks; allow a little slack.
    fn assert_idle_at(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed <= expected + Duration::from_millis(5),
            "went idle after {elapsed:?}, expected {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_network_is_idle_after_window() {
        let start = Instant::now();
        wait_for_network_idle(no_requests(), no_completions(), no_completions()).await;
        assert_idle_at(start, IDLE_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timer_restarts_after_each_event() {
        let (sent_tx, sent_rx) = mpsc::unbounded();
        let (done_tx, done_rx) = mpsc::unbounded();

        let traffic = tokio::spawn(async move {
            time::sleep(Duration::from_millis(300)).await;
            sent_tx.unbounded_send(request("1", "https://fun.virtuals.io/app.js")).unwrap();
            time::sleep(Duration::from_millis(700)).await;
            done_tx.unbounded_send(RequestId::new("1")).unwrap();
            // Keep both senders open past the expected idle point.
            time::sleep(Duration::from_secs(5)).await;
            drop((sent_tx, done_tx));
        });

        let start = Instant::now();
        wait_for_network_idle(sent_rx, done_rx, no_completions()).await;
        assert_idle_at(start, Duration::from_millis(1000) + IDLE_WINDOW);
        traffic.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_request_counts_as_done() {
        let (fail_tx, fail_rx) = mpsc::unbounded();
        let sent = stream::iter([request("7", "https://fun.virtuals.io/api")]).chain(no_requests());

        let traffic = tokio::spawn(async move {
            time::sleep(Duration::from_millis(100)).await;
            fail_tx.unbounded_send(RequestId::new("7")).unwrap();
            time::sleep(Duration::from_secs(5)).await;
            drop(fail_tx);
        });

        let start = Instant::now();
        wait_for_network_idle(sent, no_completions(), fail_rx).await;
        assert_idle_at(start, Duration::from_millis(100) + IDLE_WINDOW);
        traffic.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_data_urls_do_not_hold_idle() {
        let sent = stream::iter([request("1", "data:image/png;base64,AAAA")]).chain(no_requests());

        let start = Instant::now();
        wait_for_network_idle(sent, no_completions(), no_completions()).await;
        assert_idle_at(start, IDLE_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_streams_end_the_wait_early() {
        let sent = stream::iter([request("1", "https://fun.virtuals.io/app.js")]);

        let start = Instant::now();
        wait_for_network_idle(sent, stream::empty(), stream::empty()).await;
        assert!(start.elapsed() < IDLE_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_request_never_goes_idle() {
        let sent = stream::iter([request("1", "https://fun.virtuals.io/ws")]).chain(no_requests());

        let outcome = time::timeout(
            DEFAULT_TIMEOUT,
            wait_for_network_idle(sent, no_completions(), no_completions()),
        )
        .await;
        assert!(outcome.is_err());
    }
}
