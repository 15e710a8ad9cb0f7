// Messages folded into the controller, one at a time, in arrival order
//
// Terminal input, timers, background results and brain actions all share
// this one type. Background tasks only ever produce a Msg; they never touch
// controller state.

use crate::brain::{ActionIntake, ActionRequest, Responder};
use crate::session::{DiffStats, Snapshot, SharedWorktree, StartInfo, Status};
use anyhow::Result;
use crossterm::event::{KeyEvent, MouseEvent};

/// What one session looked like during a status sweep
#[derive(Debug)]
pub struct SweepResult {
    pub id: String,
    pub alive: bool,
    pub snapshot: Option<Snapshot>,
    pub diff: Option<DiffStats>,
    /// Auto-accept pressed Enter on a waiting prompt
    pub tapped: bool,
}

pub enum Msg {
    // Terminal
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Clears the menu highlight set by the key pre-filter
    KeyUp,
    /// Clears the error banner, unless a newer error replaced it
    HideError(u64),
    Error(anyhow::Error),
    Toast(String),

    // Refresh timers
    PreviewTick,
    PreviewCaptured {
        generation: u64,
        content: String,
    },
    MetadataTick,
    MetadataSwept(Vec<SweepResult>),

    // Brain gateway
    Action {
        request: ActionRequest,
        intake: ActionIntake,
    },
    IntakeClosed,

    // Session lifecycle results, keyed by session id
    SessionStarted {
        id: String,
        result: Result<StartInfo>,
        reply: Option<Responder>,
        prompt: Option<String>,
    },
    SessionPaused {
        id: String,
        result: Result<()>,
        reply: Option<Responder>,
    },
    SessionResumed {
        id: String,
        result: Result<()>,
        reply: Option<Responder>,
        restarted: bool,
    },
    SessionKilled {
        id: String,
        title: String,
        result: Result<()>,
        reply: Option<Responder>,
        prior_status: Status,
    },
    PromptSent {
        title: String,
        result: Result<()>,
        /// Set when a brain inject_message asked for the prompt
        reply: Option<Responder>,
    },

    // Push and pull requests
    PushChecked {
        id: String,
        result: Result<(bool, String)>,
    },
    PushFinished {
        title: String,
        result: Result<()>,
    },
    PrBodyGenerated {
        id: String,
        pr_title: String,
        result: Result<String>,
    },
    PrCreated {
        title: String,
        result: Result<String>,
    },

    // Topics
    TopicReady {
        name: String,
        result: Result<Option<SharedWorktree>>,
    },
    TopicCleaned {
        name: String,
        result: Result<()>,
    },

    ZenFinished(Result<()>),
}

impl Msg {
    /// Variant name for debug logs; payloads can be large
    pub fn name(&self) -> &'static str {
        match self {
            Msg::Key(_) => "Key",
            Msg::Mouse(_) => "Mouse",
            Msg::Resize(..) => "Resize",
            Msg::KeyUp => "KeyUp",
            Msg::HideError(_) => "HideError",
            Msg::Error(_) => "Error",
            Msg::Toast(_) => "Toast",
            Msg::PreviewTick => "PreviewTick",
            Msg::PreviewCaptured { .. } => "PreviewCaptured",
            Msg::MetadataTick => "MetadataTick",
            Msg::MetadataSwept(_) => "MetadataSwept",
            Msg::Action { .. } => "Action",
            Msg::IntakeClosed => "IntakeClosed",
            Msg::SessionStarted { .. } => "SessionStarted",
            Msg::SessionPaused { .. } => "SessionPaused",
            Msg::SessionResumed { .. } => "SessionResumed",
            Msg::SessionKilled { .. } => "SessionKilled",
            Msg::PromptSent { .. } => "PromptSent",
            Msg::PushChecked { .. } => "PushChecked",
            Msg::PushFinished { .. } => "PushFinished",
            Msg::PrBodyGenerated { .. } => "PrBodyGenerated",
            Msg::PrCreated { .. } => "PrCreated",
            Msg::TopicReady { .. } => "TopicReady",
            Msg::TopicCleaned { .. } => "TopicCleaned",
            Msg::ZenFinished(_) => "ZenFinished",
        }
    }
}
