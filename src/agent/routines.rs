//! UI interaction routines
//!
//! Named macros over a running agent's page: enumerate the participants
//! pane, drive the invite-link copy flow, read the meeting timer. Every
//! routine catches its own failures, logs them, and degrades to `None`;
//! only `start()` surfaces errors to callers.

use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::browser::{Agent, AgentError};

/// Poll interval for element waits
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One row of the participants pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Display name as rendered in the pane
    pub name: String,
    /// Camera-off icon present in the row
    pub video_muted: bool,
    /// Microphone-off icon present in the row
    pub audio_muted: bool,
}

/// Extract the first invite link for `host` from clipboard text.
pub fn extract_invite_link(text: &str, host: &str) -> Option<String> {
    let pattern = format!(r"https?://{}/[\w\-./?=&#%~]+", regex::escape(host));
    let re = Regex::new(&pattern).ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

impl Agent {
    /// Enumerate the participants pane.
    ///
    /// Opens the pane, reads every row (name plus the two muted-icon
    /// flags), closes the pane again. `None` when the pane fails to open
    /// within its timeout, renders zero rows, or any step errors.
    pub async fn list_participants(&self) -> Option<Vec<Participant>> {
        match self.try_list_participants().await {
            Ok(participants) => Some(participants),
            Err(e) => {
                warn!(agent_id = %self.id(), error = %e, "List participants failed");
                None
            }
        }
    }

    async fn try_list_participants(&self) -> Result<Vec<Participant>, AgentError> {
        let page = self.page().ok_or(AgentError::NoSession)?.clone();
        self.open_pane(&page).await?;
        let result = self.collect_participant_rows(&page).await;
        self.close_pane(&page).await;
        result
    }

    async fn collect_participant_rows(&self, page: &Page) -> Result<Vec<Participant>, AgentError> {
        let rows = page.find_elements(self.ui().participant_row.as_str()).await?;
        if rows.is_empty() {
            return Err(AgentError::Automation(
                "participants pane rendered zero rows".to_string(),
            ));
        }

        let mut participants = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = match row.find_element(self.ui().participant_name.as_str()).await {
                Ok(el) => el.inner_text().await?.unwrap_or_default(),
                Err(_) => String::new(),
            };
            let video_muted = row
                .find_element(self.ui().video_muted_icon.as_str())
                .await
                .is_ok();
            let audio_muted = row
                .find_element(self.ui().audio_muted_icon.as_str())
                .await
                .is_ok();
            participants.push(Participant {
                name: name.trim().to_string(),
                video_muted,
                audio_muted,
            });
        }
        Ok(participants)
    }

    /// Drive the invite flow and read the invite link off the clipboard.
    ///
    /// Clicks invite, then copy-invitation, then the confirmation dialog's
    /// close control (waiting for the dialog to disappear), closes the
    /// pane, and matches the clipboard text against the configured invite
    /// host. `None` when any control is missing within its wait window or
    /// the clipboard does not contain a matching link.
    pub async fn click_share_link(&self) -> Option<String> {
        match self.try_click_share_link().await {
            Ok(link) => link,
            Err(e) => {
                warn!(agent_id = %self.id(), error = %e, "Share link routine failed");
                None
            }
        }
    }

    async fn try_click_share_link(&self) -> Result<Option<String>, AgentError> {
        let page = self.page().ok_or(AgentError::NoSession)?.clone();
        self.open_pane(&page).await?;

        let flow = async {
            let invite = self.wait_for_element(&page, &self.ui().invite_button).await?;
            invite.click().await?;

            let copy = self
                .wait_for_element(&page, &self.ui().copy_invite_button)
                .await?;
            copy.click().await?;

            let close = self
                .wait_for_element(&page, &self.ui().dialog_close_button)
                .await?;
            close.click().await?;
            if !self.wait_for_gone(&page, &self.ui().confirm_dialog).await {
                warn!(agent_id = %self.id(), "Confirmation dialog did not disappear");
            }
            Ok::<(), AgentError>(())
        }
        .await;

        self.close_pane(&page).await;
        flow?;

        let clipboard: String = page
            .evaluate("navigator.clipboard.readText()")
            .await?
            .into_value()
            .map_err(|e| AgentError::Automation(format!("clipboard read: {}", e)))?;
        debug!(agent_id = %self.id(), len = clipboard.len(), "Clipboard read");
        Ok(extract_invite_link(&clipboard, self.invite_host()))
    }

    /// Read the in-call elapsed-time element. `None` when absent.
    pub async fn meeting_duration(&self) -> Option<String> {
        let page = self.page()?;
        let timer = page
            .find_element(self.ui().meeting_timer.as_str())
            .await
            .ok()?;
        match timer.inner_text().await {
            Ok(text) => text
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(agent_id = %self.id(), error = %e, "Timer read failed");
                None
            }
        }
    }

    /// Send the toggle keystroke and wait for both the pane container and
    /// its content region.
    pub(crate) async fn open_pane(&self, page: &Page) -> Result<(), AgentError> {
        self.send_pane_toggle(page).await?;
        let container = self.ui().pane_container.clone();
        let content = self.ui().pane_content.clone();
        self.wait_for_element(page, &container).await?;
        self.wait_for_element(page, &content).await?;
        Ok(())
    }

    /// Best-effort pane close: toggle keystroke, then explicit close
    /// button, then a no-op mouse move as a focus nudge. Never raises; a
    /// pane still open afterwards is only a logged warning.
    pub(crate) async fn close_pane(&self, page: &Page) {
        if let Err(e) = self.send_pane_toggle(page).await {
            warn!(agent_id = %self.id(), error = %e, "Pane toggle keystroke failed");
        }
        sleep(self.automation().pane_settle).await;

        let container = self.ui().pane_container.clone();
        if page.find_element(container.as_str()).await.is_err() {
            return;
        }

        match page
            .find_element(self.ui().pane_close_button.as_str())
            .await
        {
            Ok(button) => {
                if let Err(e) = button.click().await {
                    warn!(agent_id = %self.id(), error = %e, "Pane close button click failed");
                } else if !self.wait_for_gone(page, &container).await {
                    warn!(agent_id = %self.id(), "Pane still open after close button");
                }
            }
            Err(_) => {
                // Last resort: nudge focus so the client notices input.
                if let Err(e) = self.nudge_mouse(page).await {
                    debug!(agent_id = %self.id(), error = %e, "Mouse nudge failed");
                }
                if page.find_element(container.as_str()).await.is_ok() {
                    warn!(agent_id = %self.id(), "Pane still open after close attempts");
                }
            }
        }
    }

    async fn send_pane_toggle(&self, page: &Page) -> Result<(), AgentError> {
        let chord = self.ui().pane_toggle.clone();
        for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let params = DispatchKeyEventParams::builder()
                .r#type(kind)
                .key(chord.key.clone())
                .code(chord.code.clone())
                .modifiers(chord.modifiers)
                .build()
                .map_err(AgentError::Automation)?;
            page.execute(params).await?;
        }
        Ok(())
    }

    async fn nudge_mouse(&self, page: &Page) -> Result<(), AgentError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(1.0)
            .y(1.0)
            .build()
            .map_err(AgentError::Automation)?;
        page.execute(params).await?;
        Ok(())
    }

    /// Poll for a selector until it resolves or the per-step wait expires.
    pub(crate) async fn wait_for_element(
        &self,
        page: &Page,
        selector: &str,
    ) -> Result<Element, AgentError> {
        let deadline = Instant::now() + self.automation().ui_wait_timeout;
        loop {
            if let Ok(element) = page.find_element(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(AgentError::WaitTimeout(selector.to_string()));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll until the selector no longer resolves. False when it is still
    /// present at the deadline.
    pub(crate) async fn wait_for_gone(&self, page: &Page, selector: &str) -> bool {
        let deadline = Instant::now() + self.automation().ui_wait_timeout;
        loop {
            if page.find_element(selector).await.is_err() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}
