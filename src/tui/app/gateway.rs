// Brain action gateway
//
// Agents ask for lifecycle operations on themselves or siblings through
// ActionRequests. Each request is folded in like a keypress and turned into
// the same transitions; its Responder is consumed exactly once, either right
// here on a validation failure or when the backend result comes back.

use super::App;
use crate::brain::{ActionIntake, ActionRequest, ActionResponse, ActionType};
use crate::session::{ControllerError, Session, SessionOptions, MAX_TITLE_WIDTH};
use crate::tui::task::Task;
use crate::util::display_width;
use std::time::Duration;

/// Prefix marking a message as coming from another agent
fn inject_text(from: &str, content: &str) -> String {
    let from = if from.is_empty() { "brain" } else { from };
    format!("[HIVE] {} says: {}", from, content)
}

impl App {
    pub(super) fn on_action(&mut self, request: ActionRequest, intake: ActionIntake) -> Vec<Task> {
        tracing::info!("Brain action {}", request.kind);
        let mut tasks = match request.kind.clone() {
            ActionType::CreateSession => self.gateway_create(request),
            ActionType::InjectMessage => self.gateway_inject(request),
            ActionType::PauseSession => self.gateway_pause(request),
            ActionType::ResumeSession => self.gateway_resume(request),
            ActionType::KillSession => self.gateway_kill(request),
            ActionType::Unknown(kind) => {
                let error = ControllerError::UnknownAction(kind);
                tracing::warn!("{}", error);
                request.reply.send(ActionResponse::err(error.to_string()));
                vec![]
            }
        };

        if !self.cancel.is_cancelled() {
            tasks.push(Task::Intake(intake));
        }
        tasks
    }

    /// Reply with a validation error and change nothing
    fn reject(request: ActionRequest, error: ControllerError) -> Vec<Task> {
        tracing::warn!("Rejected brain {}: {}", request.kind, error);
        request.reply.send(ActionResponse::err(error.to_string()));
        vec![]
    }

    fn gateway_create(&mut self, request: ActionRequest) -> Vec<Task> {
        let title = request.str_param("title").to_string();
        if title.is_empty() {
            return Self::reject(request, ControllerError::TitleRequired);
        }
        let limit = self.config.instance_limit;
        if self.list.len() >= limit {
            return Self::reject(request, ControllerError::InstanceLimit(limit));
        }
        if self.list.by_title(&title).is_some() {
            return Self::reject(request, ControllerError::AlreadyExists(title));
        }
        if display_width(&title) > MAX_TITLE_WIDTH {
            return Self::reject(request, ControllerError::TitleTooLong(MAX_TITLE_WIDTH));
        }

        let program = match request.str_param("program") {
            "" => self.config.default_program.clone(),
            program => program.to_string(),
        };

        // The requesting agent, if it named itself
        let source_title = request.str_param("source_instance");
        let source = self.list.by_title(source_title).cloned();
        if source.is_none() && !source_title.is_empty() {
            tracing::warn!("Source instance {} not found", source_title);
        }

        let mut topic_name = request.str_param("topic").to_string();
        if topic_name.is_empty() {
            if let Some(source) = &source {
                topic_name = source.topic_name.clone();
            }
        }
        let topic = match self.list.topic(&topic_name) {
            Some(topic) => Some(topic.clone()),
            None => {
                if !topic_name.is_empty() {
                    tracing::warn!("Topic {} not found; creating {} ungrouped", topic_name, title);
                    topic_name.clear();
                }
                None
            }
        };

        let repo = source
            .as_ref()
            .map(|s| s.repo_path.clone())
            .or_else(|| topic.as_ref().map(|t| t.repo_path.clone()))
            .or_else(|| self.list.current_repo());
        let Some(repo_path) = repo else {
            request
                .reply
                .send(ActionResponse::err("no repository is open"));
            return vec![];
        };

        let mut session = Session::new(SessionOptions {
            title: title.clone(),
            repo_path,
            program,
            topic_name,
            skip_permissions: request.bool_param("skip_permissions").unwrap_or(true),
            role: request.str_param("role").to_string(),
            parent_title: source.map(|s| s.title).unwrap_or_default(),
        });
        session.auto_yes = self.config.auto_yes || topic.is_some_and(|t| t.auto_yes);
        session.set_loading("Starting...");

        let prompt = Some(request.str_param("prompt").to_string()).filter(|p| !p.is_empty());
        let id = session.id.clone();
        self.list.add(session);
        tracing::info!("Brain created session {}", title);

        vec![self.start_task(&id, Some(request.reply), prompt)]
    }

    fn gateway_inject(&mut self, request: ActionRequest) -> Vec<Task> {
        let to = request.str_param("to").to_string();
        let content = request.str_param("content").to_string();
        if to.is_empty() || content.is_empty() {
            return Self::reject(request, ControllerError::InjectParamsRequired);
        }
        let Some(session) = self.list.by_title(&to) else {
            return Self::reject(request, ControllerError::NotFound(to));
        };
        if !session.is_live() {
            return Self::reject(request, ControllerError::NotRunning(to));
        }
        if session.is_busy() {
            return Self::reject(request, ControllerError::Busy(to));
        }

        let id = session.id.clone();
        let text = inject_text(request.str_param("from"), &content);
        self.list
            .update(&id, |s| s.set_status(crate::session::Status::Running));
        vec![self.prompt_task(&id, &to, text, Duration::ZERO, Some(request.reply))]
    }

    /// Resolve the `target` parameter to a session id, or reply with the error
    fn gateway_target(&self, request: ActionRequest) -> Result<(String, ActionRequest), Vec<Task>> {
        let target = request.str_param("target").to_string();
        if target.is_empty() {
            return Err(Self::reject(request, ControllerError::TargetRequired));
        }
        match self.list.by_title(&target) {
            Some(session) => Ok((session.id.clone(), request)),
            None => Err(Self::reject(request, ControllerError::NotFound(target))),
        }
    }

    fn gateway_pause(&mut self, request: ActionRequest) -> Vec<Task> {
        let (id, request) = match self.gateway_target(request) {
            Ok(found) => found,
            Err(tasks) => return tasks,
        };
        if let Some(session) = self.list.get(&id) {
            if session.is_busy() {
                let title = session.title.clone();
                return Self::reject(request, ControllerError::Busy(title));
            }
            if session.is_paused() {
                let title = session.title.clone();
                return Self::reject(request, ControllerError::AlreadyPaused(title));
            }
            if !session.started {
                let title = session.title.clone();
                return Self::reject(request, ControllerError::NotRunning(title));
            }
        }
        self.pause_session(&id, Some(request.reply))
    }

    fn gateway_resume(&mut self, request: ActionRequest) -> Vec<Task> {
        let (id, request) = match self.gateway_target(request) {
            Ok(found) => found,
            Err(tasks) => return tasks,
        };
        if let Some(session) = self.list.get(&id) {
            if session.is_busy() {
                let title = session.title.clone();
                return Self::reject(request, ControllerError::Busy(title));
            }
            if !session.is_paused() {
                let title = session.title.clone();
                return Self::reject(request, ControllerError::NotPaused(title));
            }
        }
        self.resume_session(&id, Some(request.reply))
    }

    fn gateway_kill(&mut self, request: ActionRequest) -> Vec<Task> {
        let (id, request) = match self.gateway_target(request) {
            Ok(found) => found,
            Err(tasks) => return tasks,
        };
        self.kill_session(&id, Some(request.reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_text_names_the_sender() {
        assert_eq!(
            inject_text("planner", "run the tests"),
            "[HIVE] planner says: run the tests"
        );
        assert_eq!(inject_text("", "hi"), "[HIVE] brain says: hi");
    }
}
