// Brain action protocol - how one agent asks the controller to act on a sibling
//
// Requests arrive on a bounded channel and are folded into the controller's
// event queue one at a time. Every request carries a oneshot reply slot that
// receives exactly one ActionResponse.

use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

/// Queue depth for pending action requests
const ACTION_QUEUE_DEPTH: usize = 64;

/// Kind of lifecycle operation requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionType {
    CreateSession,
    InjectMessage,
    PauseSession,
    ResumeSession,
    KillSession,
    /// Anything we don't recognize; answered with an error
    Unknown(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::CreateSession => "create_instance",
            ActionType::InjectMessage => "inject_message",
            ActionType::PauseSession => "pause_instance",
            ActionType::ResumeSession => "resume_instance",
            ActionType::KillSession => "kill_instance",
            ActionType::Unknown(kind) => kind,
        }
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        match s {
            "create_instance" => ActionType::CreateSession,
            "inject_message" => ActionType::InjectMessage,
            "pause_instance" => ActionType::PauseSession,
            "resume_instance" => ActionType::ResumeSession,
            "kill_instance" => ActionType::KillSession,
            other => ActionType::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply sent back to the requesting agent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn ok_with(data: Map<String, Value>) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Reply slot; consumed by the single send it permits
#[derive(Debug)]
pub struct Responder(oneshot::Sender<ActionResponse>);

impl Responder {
    pub fn send(self, response: ActionResponse) {
        if self.0.send(response).is_err() {
            tracing::debug!("Action requester went away before the reply");
        }
    }
}

/// An agent's request, as seen by the controller
#[derive(Debug)]
pub struct ActionRequest {
    pub kind: ActionType,
    pub params: Map<String, Value>,
    pub reply: Responder,
}

impl ActionRequest {
    /// Build a request plus the receiver its reply will land on
    pub fn new(
        kind: ActionType,
        params: Map<String, Value>,
    ) -> (Self, oneshot::Receiver<ActionResponse>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                kind,
                params,
                reply: Responder(tx),
            },
            rx,
        )
    }

    /// String parameter; missing or non-string values read as empty
    pub fn str_param(&self, key: &str) -> &str {
        self.params.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Bool parameter, only when explicitly present as a bool
    pub fn bool_param(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(Value::as_bool)
    }
}

/// Submitting side, cloned into agents and servers
#[derive(Debug, Clone)]
pub struct ActionSender {
    tx: mpsc::Sender<ActionRequest>,
}

impl ActionSender {
    /// Enqueue a request and wait for the controller's answer
    pub async fn submit(&self, kind: ActionType, params: Map<String, Value>) -> Result<ActionResponse> {
        let (request, reply_rx) = ActionRequest::new(kind, params);
        self.tx
            .send(request)
            .await
            .map_err(|_| anyhow!("controller is not accepting actions"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("controller dropped the action without replying"))
    }
}

/// Receiving side, owned by exactly one pending intake task at a time
#[derive(Debug)]
pub struct ActionIntake {
    rx: mpsc::Receiver<ActionRequest>,
}

impl ActionIntake {
    /// Next request, or None once every sender is gone
    pub async fn next(&mut self) -> Option<ActionRequest> {
        self.rx.recv().await
    }
}

/// Create a connected sender/intake pair
pub fn channel() -> (ActionSender, ActionIntake) {
    let (tx, rx) = mpsc::channel(ACTION_QUEUE_DEPTH);
    (ActionSender { tx }, ActionIntake { rx })
}

/// Build a params map from key/value pairs
pub fn params<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_type_wire_names() {
        assert_eq!(ActionType::from("kill_instance"), ActionType::KillSession);
        assert_eq!(ActionType::CreateSession.as_str(), "create_instance");
        assert_eq!(
            ActionType::from("merge_everything"),
            ActionType::Unknown("merge_everything".into())
        );
    }

    #[test]
    fn response_omits_empty_fields() {
        let json = serde_json::to_string(&ActionResponse::ok()).unwrap();
        assert_eq!(json, r#"{"ok":true}"#);

        let json = serde_json::to_string(&ActionResponse::err("nope")).unwrap();
        assert_eq!(json, r#"{"ok":false,"error":"nope"}"#);
    }

    #[tokio::test]
    async fn submit_waits_for_reply() {
        let (sender, mut intake) = channel();

        let handle = tokio::spawn(async move {
            sender
                .submit(
                    ActionType::InjectMessage,
                    params([("to", json!("worker")), ("content", json!("hi"))]),
                )
                .await
        });

        let req = intake.next().await.unwrap();
        assert_eq!(req.kind, ActionType::InjectMessage);
        assert_eq!(req.str_param("to"), "worker");
        assert_eq!(req.str_param("missing"), "");
        assert_eq!(req.bool_param("to"), None);
        req.reply.send(ActionResponse::ok());

        let resp = handle.await.unwrap().unwrap();
        assert!(resp.ok);
    }

    #[tokio::test]
    async fn dropped_reply_is_an_error() {
        let (sender, mut intake) = channel();
        let handle =
            tokio::spawn(async move { sender.submit(ActionType::KillSession, Map::new()).await });
        drop(intake.next().await);
        assert!(handle.await.unwrap().is_err());
    }
}
