//! UI capability map for the automated conference client
//!
//! Every DOM selector and keystroke the interaction routines touch lives
//! here, so a client redesign means editing this map, not lifecycle logic.

/// A keyboard chord sent through CDP `Input.dispatchKeyEvent`.
///
/// `modifiers` is the CDP bitmask: Alt=1, Ctrl=2, Meta=4, Shift=8.
#[derive(Debug, Clone)]
pub struct KeyChord {
    /// DOM `key` value (e.g. "p")
    pub key: String,
    /// DOM `code` value (e.g. "KeyP")
    pub code: String,
    /// CDP modifier bitmask
    pub modifiers: i64,
}

/// Selectors and UI literals of the automated web client
#[derive(Debug, Clone)]
pub struct UiMap {
    /// Chord that toggles the participants side pane
    pub pane_toggle: KeyChord,
    /// Side pane container
    pub pane_container: String,
    /// Content region inside the pane (rendered after the container)
    pub pane_content: String,
    /// Explicit close control of the pane (fallback when the chord fails)
    pub pane_close_button: String,
    /// One participant row
    pub participant_row: String,
    /// Name element inside a row
    pub participant_name: String,
    /// Icon present in a row when the participant's camera is off
    pub video_muted_icon: String,
    /// Icon present in a row when the participant's microphone is off
    pub audio_muted_icon: String,
    /// "Invite" control inside the pane
    pub invite_button: String,
    /// "Copy invitation" control in the invite flow
    pub copy_invite_button: String,
    /// Close control of the copy-confirmation dialog
    pub dialog_close_button: String,
    /// The dialog itself (waited on to disappear)
    pub confirm_dialog: String,
    /// In-call elapsed-time element
    pub meeting_timer: String,
}

impl Default for UiMap {
    fn default() -> Self {
        Self {
            pane_toggle: KeyChord {
                key: "p".to_string(),
                code: "KeyP".to_string(),
                modifiers: 3, // Ctrl+Alt
            },
            pane_container: ".participants-pane".to_string(),
            pane_content: ".participants-pane .participants-list".to_string(),
            pane_close_button: ".participants-pane .pane-close".to_string(),
            participant_row: ".participants-pane .participant-item".to_string(),
            participant_name: ".participant-name".to_string(),
            video_muted_icon: ".icon-video-muted".to_string(),
            audio_muted_icon: ".icon-audio-muted".to_string(),
            invite_button: ".participants-pane .invite-button".to_string(),
            copy_invite_button: ".invite-dialog .copy-invite-link".to_string(),
            dialog_close_button: ".invite-dialog .dialog-close".to_string(),
            confirm_dialog: ".invite-dialog".to_string(),
            meeting_timer: ".meeting-header .elapsed-time".to_string(),
        }
    }
}
