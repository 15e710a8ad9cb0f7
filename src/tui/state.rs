// The controller's exclusive UI state
//
// Each variant owns the overlay data it needs, so leaving a state drops that
// data and no handler can read another state's leftovers.

use super::modal::{ContextMenu, Picker, TextInput};
use crate::session::PaneKind;
use std::path::PathBuf;

/// Which help screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    General,
    /// Explains what checkout does before pausing the session
    Checkout,
}

/// A deferred operation, captured by value when a confirmation or help
/// screen opens and executed later. Sessions are referenced by id so a
/// rename in between cannot redirect the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    KillSession { id: String },
    PushSession { id: String },
    PauseSession { id: String },
    KillTopicMembers { topic: String },
    /// Remove the topic; members are killed or just ungrouped
    DeleteTopic { topic: String, kill_members: bool },
    PushTopic { topic: String },
}

/// The active yes/no question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub message: String,
    pub action: PendingAction,
}

/// Entries of the session and topic context menus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    // Session
    Focus,
    Zen,
    Kill,
    Pause,
    Resume,
    Restart,
    Rename,
    MoveToTopic,
    PushBranch,
    CreatePr,
    CopyWorktreePath,
    CopyBranch,
    // Topic
    KillTopic,
    DeleteTopicAndInstances,
    DeleteTopic,
    RenameTopic,
    PushTopic,
}

#[derive(Debug, Clone, Default)]
pub enum UiState {
    #[default]
    Default,
    /// Naming a session that was just added with an empty title
    CreatingSession {
        id: String,
        input: TextInput,
        prompt_after: bool,
    },
    EnteringPrompt {
        id: String,
        input: TextInput,
    },
    Help {
        topic: HelpTopic,
        /// Runs when the help screen is dismissed
        then: Option<PendingAction>,
    },
    Confirm(PendingConfirmation),
    /// Push target diverged from the remote: y sync, n plain push, Esc cancel
    SyncConfirm {
        id: String,
        message: String,
    },
    AddingProject {
        input: TextInput,
    },
    ManagingIntegrations {
        picker: Picker,
    },
    ProjectHistory {
        picker: Picker,
        /// `/` was pressed; keys now edit the filter
        filtering: bool,
    },
    ContextMenu(ContextMenu<MenuAction>),
    CreatingTopic {
        input: TextInput,
        repo: PathBuf,
    },
    ConfirmingTopicSharing {
        name: String,
        repo: PathBuf,
    },
    MovingToTopic {
        picker: Picker,
        id: String,
    },
    /// Last entry is "Open folder..." and maps to None
    SwitchingRepo {
        picker: Picker,
        paths: Vec<Option<PathBuf>>,
    },
    PickingRepoForTopic {
        picker: Picker,
        paths: Vec<PathBuf>,
    },
    Searching {
        input: TextInput,
    },
    RenamingSession {
        input: TextInput,
        id: String,
    },
    RenamingTopic {
        input: TextInput,
        old: String,
    },
    EditingPrTitle {
        input: TextInput,
        id: String,
    },
    EditingPrBody {
        input: TextInput,
        id: String,
        pr_title: String,
    },
    SendingPrompt {
        input: TextInput,
        id: String,
    },
    FocusedOnPane {
        pane: PaneKind,
    },
}

impl UiState {
    pub fn name(&self) -> &'static str {
        match self {
            UiState::Default => "Default",
            UiState::CreatingSession { .. } => "CreatingSession",
            UiState::EnteringPrompt { .. } => "EnteringPrompt",
            UiState::Help { .. } => "Help",
            UiState::Confirm(_) => "Confirm",
            UiState::SyncConfirm { .. } => "SyncConfirm",
            UiState::AddingProject { .. } => "AddingProject",
            UiState::ManagingIntegrations { .. } => "ManagingIntegrations",
            UiState::ProjectHistory { .. } => "ProjectHistory",
            UiState::ContextMenu(_) => "ContextMenu",
            UiState::CreatingTopic { .. } => "CreatingTopic",
            UiState::ConfirmingTopicSharing { .. } => "ConfirmingTopicSharing",
            UiState::MovingToTopic { .. } => "MovingToTopic",
            UiState::SwitchingRepo { .. } => "SwitchingRepo",
            UiState::PickingRepoForTopic { .. } => "PickingRepoForTopic",
            UiState::Searching { .. } => "Searching",
            UiState::RenamingSession { .. } => "RenamingSession",
            UiState::RenamingTopic { .. } => "RenamingTopic",
            UiState::EditingPrTitle { .. } => "EditingPrTitle",
            UiState::EditingPrBody { .. } => "EditingPrBody",
            UiState::SendingPrompt { .. } => "SendingPrompt",
            UiState::FocusedOnPane { .. } => "FocusedOnPane",
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, UiState::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_data_belongs_to_its_state() {
        let mut state = UiState::Searching {
            input: TextInput::new("Search").with_value("auth"),
        };
        assert!(matches!(&state, UiState::Searching { input } if input.value == "auth"));

        state = UiState::Confirm(PendingConfirmation {
            message: "[!] Kill session 'a'?".into(),
            action: PendingAction::KillSession { id: "1".into() },
        });
        assert!(!state.is_default());
        assert_eq!(state.name(), "Confirm");
    }
}
