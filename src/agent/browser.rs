//! Browser session lifecycle for a room agent
//!
//! Each agent exclusively owns one chromiumoxide `Browser` and, while
//! running, one `Page` joined to its room URL. The status cell is shared
//! with the registry so status reads never wait on a lifecycle call.

use crate::config::AutomationConfig;
use crate::state::{AgentConfig, AgentId, AgentStatus, IllegalTransition, StatusCell};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use url::Url;

use super::ui_map::UiMap;

/// Known Chrome install locations, probed before falling back to
/// chromiumoxide's own detection.
const CHROME_CANDIDATES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/opt/google/chrome/chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Reference page used by the cold-start smoke test
const REFERENCE_URL: &str = "https://example.com/";
/// Title the reference page must report for the smoke test to pass
const REFERENCE_TITLE: &str = "Example Domain";

/// Errors from agent lifecycle and automation
#[derive(Debug, Error)]
pub enum AgentError {
    /// Browser process could not be launched
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Navigation to the room URL failed or timed out
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Underlying CDP error
    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// A UI element did not show up within its wait window
    #[error("Timed out waiting for {0}")]
    WaitTimeout(String),

    /// A UI interaction step failed outside of CDP transport
    #[error("Automation error: {0}")]
    Automation(String),

    /// The requested lifecycle transition is not allowed
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// Operation requires a live page
    #[error("Agent has no live browser session")]
    NoSession,
}

/// Live browser session owned by one agent
struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    console_task: JoinHandle<()>,
}

/// One managed room agent
pub struct Agent {
    id: AgentId,
    config: AgentConfig,
    automation: AutomationConfig,
    invite_host: String,
    ui: UiMap,
    status: Arc<StatusCell>,
    session: Option<BrowserSession>,
}

impl Agent {
    /// Create an idle agent. Does not launch anything.
    pub fn new(
        id: AgentId,
        config: AgentConfig,
        automation: AutomationConfig,
        invite_host: String,
        status: Arc<StatusCell>,
    ) -> Self {
        Self {
            id,
            config,
            automation,
            invite_host,
            ui: UiMap::default(),
            status,
            session: None,
        }
    }

    /// Agent identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Agent configuration (immutable after creation)
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current lifecycle status
    pub fn status(&self) -> AgentStatus {
        self.status.get()
    }

    pub(crate) fn ui(&self) -> &UiMap {
        &self.ui
    }

    pub(crate) fn automation(&self) -> &AutomationConfig {
        &self.automation
    }

    pub(crate) fn invite_host(&self) -> &str {
        &self.invite_host
    }

    /// Live page, if the session is up
    pub(crate) fn page(&self) -> Option<&Page> {
        self.session.as_ref().map(|s| &s.page)
    }

    /// Launch the browser, join the room, and mark the agent running.
    ///
    /// On any failure the agent transitions to `Error`, tears its session
    /// down (ending in `Stopped`), and the error is returned to the caller.
    pub async fn start(&mut self) -> Result<(), AgentError> {
        self.status.transition(AgentStatus::Starting)?;
        info!(agent_id = %self.id, url = %self.config.start_url, "Starting agent");

        match self.launch_and_join().await {
            Ok(session) => {
                self.session = Some(session);
                self.status.transition(AgentStatus::Running)?;
                info!(agent_id = %self.id, "Agent running");

                if self.config.scrape_on_start {
                    self.log_page_title().await;
                }
                Ok(())
            }
            Err(e) => {
                error!(agent_id = %self.id, error = %e, "Agent start failed");
                // Record the failure, then clean up whatever half-started.
                if let Err(t) = self.status.transition(AgentStatus::Error) {
                    warn!(agent_id = %self.id, error = %t, "Could not mark agent errored");
                }
                self.stop().await;
                Err(e)
            }
        }
    }

    /// Tear the session down. Idempotent; always ends in `Stopped`.
    /// Teardown errors are logged, never surfaced.
    pub async fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.console_task.abort();
            if let Err(e) = session.page.close().await {
                warn!(agent_id = %self.id, error = %e, "Page close failed");
            }
            let mut browser = session.browser;
            if let Err(e) = browser.close().await {
                warn!(agent_id = %self.id, error = %e, "Browser close failed");
            }
            let _ = browser.wait().await;
            session.handler_task.abort();
        }
        if let Err(e) = self.status.transition(AgentStatus::Stopped) {
            // Unreachable: the table allows stop from every state.
            warn!(agent_id = %self.id, error = %e, "Stop transition rejected");
        }
        info!(agent_id = %self.id, "Agent stopped");
    }

    /// Capture the current page as PNG bytes. None without a live page or
    /// when the capture fails.
    pub async fn screenshot(&self) -> Option<Vec<u8>> {
        let page = self.page()?;
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        match page.screenshot(params).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(agent_id = %self.id, error = %e, "Screenshot failed");
                None
            }
        }
    }

    /// Self-contained smoke test of the automation stack.
    ///
    /// Launches an independent throwaway browser with a hardened flag set,
    /// loads the reference page, and checks its title against the known
    /// literal within the wait window. Never touches the calling agent's
    /// session and never propagates an error.
    pub async fn cold_start(automation: &AutomationConfig) -> bool {
        match Self::run_cold_start(automation).await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "Cold start failed");
                false
            }
        }
    }

    async fn run_cold_start(automation: &AutomationConfig) -> Result<bool, AgentError> {
        let mut builder = BrowserConfig::builder().args(vec![
            "--no-sandbox",
            "--disable-gpu",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--mute-audio",
        ]);
        if let Some(path) = resolve_chrome(automation) {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(AgentError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Cold start handler event error");
                }
            }
        });

        let result = async {
            let page = browser.new_page(REFERENCE_URL).await?;
            let deadline = tokio::time::Instant::now() + automation.ui_wait_timeout;
            loop {
                if let Some(title) = page.get_title().await? {
                    if title == REFERENCE_TITLE {
                        return Ok::<bool, AgentError>(true);
                    }
                }
                if tokio::time::Instant::now() >= deadline {
                    return Ok(false);
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
        .await;

        if let Err(e) = browser.close().await {
            debug!(error = %e, "Cold start browser close failed");
        }
        let _ = browser.wait().await;
        handler_task.abort();

        result
    }

    async fn launch_and_join(&self) -> Result<BrowserSession, AgentError> {
        let mut builder = BrowserConfig::builder().args(vec![
            "--no-first-run",
            "--no-default-browser-check",
            "--disable-dev-shm-usage",
            "--use-fake-ui-for-media-stream",
        ]);
        if !self.config.headless {
            builder = builder.with_head();
        }
        if self.config.mute_audio {
            builder = builder.arg("--mute-audio");
        }
        if let Some(path) = resolve_chrome(&self.automation) {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(AgentError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(config).await?;
        let handler_id = self.id.clone();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(agent_id = %handler_id, error = %e, "CDP handler event error");
                }
            }
        });

        let setup = self.join_room(&browser).await;
        match setup {
            Ok((page, console_task)) => Ok(BrowserSession {
                browser,
                page,
                handler_task,
                console_task,
            }),
            Err(e) => {
                // The browser launched but the join failed; reap the child
                // so a failed start leaks nothing.
                if let Err(close_err) = browser.close().await {
                    debug!(agent_id = %self.id, error = %close_err, "Browser close after failed join");
                }
                let _ = browser.wait().await;
                handler_task.abort();
                Err(e)
            }
        }
    }

    async fn join_room(&self, browser: &Browser) -> Result<(Page, JoinHandle<()>), AgentError> {
        // Clipboard access is needed by the invite-link routine.
        if let Ok(url) = Url::parse(&self.config.start_url) {
            let grant = GrantPermissionsParams {
                permissions: vec![
                    PermissionType::ClipboardReadWrite,
                    PermissionType::ClipboardSanitizedWrite,
                ],
                origin: Some(url.origin().ascii_serialization()),
                browser_context_id: None,
            };
            if let Err(e) = browser.execute(grant).await {
                warn!(agent_id = %self.id, error = %e, "Clipboard permission grant failed");
            }
        }

        let page = browser.new_page("about:blank").await?;
        let console_task = self.forward_console(&page).await?;

        let navigation = async {
            page.goto(self.config.start_url.as_str()).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        let result = match timeout(self.automation.nav_timeout, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AgentError::Navigation(e.to_string())),
            Err(_) => Err(AgentError::Navigation(format!(
                "no load event within {:?}",
                self.automation.nav_timeout
            ))),
        };
        match result {
            Ok(()) => Ok((page, console_task)),
            Err(e) => {
                console_task.abort();
                Err(e)
            }
        }
    }

    /// Forward page console messages to the debug log sink.
    async fn forward_console(&self, page: &Page) -> Result<JoinHandle<()>, AgentError> {
        let mut events = page.event_listener::<EventConsoleApiCalled>().await?;
        let agent_id = self.id.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let text = event
                    .args
                    .iter()
                    .filter_map(|arg| {
                        arg.value
                            .as_ref()
                            .map(|v| v.to_string())
                            .or_else(|| arg.description.clone())
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                debug!(agent_id = %agent_id, kind = ?event.r#type, "console: {}", text);
            }
        }))
    }

    async fn log_page_title(&self) {
        let Some(page) = self.page() else { return };
        match page.get_title().await {
            Ok(title) => {
                info!(
                    agent_id = %self.id,
                    title = %title.unwrap_or_default(),
                    "Joined page title"
                );
            }
            Err(e) => warn!(agent_id = %self.id, error = %e, "Title scrape failed"),
        }
    }
}

/// Pick a Chrome executable: explicit config first, then known install
/// paths. None lets chromiumoxide run its own detection.
fn resolve_chrome(automation: &AutomationConfig) -> Option<String> {
    if let Some(path) = &automation.chrome_path {
        return Some(path.clone());
    }
    CHROME_CANDIDATES
        .iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(|s| s.to_string())
}
