// Topics, repositories and project history
//
// Topic names are unique across every repository. Membership changes write
// through to storage; topic worktree setup and cleanup run in the background.

use super::App;
use crate::session::{ControllerError, SharedWorktree, Topic};
use crate::tui::list::SidebarItem;
use crate::tui::modal::{Picker, TextInput};
use crate::tui::msg::Msg;
use crate::tui::state::{PendingAction, PendingConfirmation, UiState};
use crate::tui::task::Task;
use crate::util::{expand_home, repo_name};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Entry of the move-to-topic picker that clears the topic
pub(super) const UNGROUPED_LABEL: &str = "(Ungrouped)";
/// Last entry of the repository picker
pub(super) const OPEN_FOLDER_LABEL: &str = "Open folder...";
/// How many repositories `c` keeps in the history
const HISTORY_KEEP: usize = 10;

/// A topic being deleted together with its members
#[derive(Debug, Default)]
pub(super) struct TopicDeletion {
    /// Members whose kill is still running
    waiting: HashSet<String>,
    /// Some member refused to die
    failed: bool,
}

/// Repository label: basename, or parent/basename when the basename is ambiguous
fn repo_labels(repos: &[PathBuf]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for repo in repos {
        *seen.entry(repo_name(repo)).or_default() += 1;
    }
    repos
        .iter()
        .map(|repo| {
            let name = repo_name(repo);
            if seen.get(&name).copied().unwrap_or(0) > 1 {
                match repo.parent() {
                    Some(parent) => format!("{}/{}", repo_name(parent), name),
                    None => name,
                }
            } else {
                name
            }
        })
        .collect()
}

impl App {
    // ─────────────────────────────────────────────────────────────────────
    // Topic creation
    // ─────────────────────────────────────────────────────────────────────

    pub(super) fn begin_new_topic(&mut self) -> Vec<Task> {
        if self.list.is_multi_repo() {
            let paths = self.list.active_repos().to_vec();
            let picker = Picker::new("Repository for the new topic", repo_labels(&paths));
            self.state = UiState::PickingRepoForTopic { picker, paths };
            return vec![];
        }
        let Some(repo) = self.list.current_repo() else {
            return self.show_error(anyhow!("no repository is open"));
        };
        self.state = UiState::CreatingTopic {
            input: TextInput::new("Topic name"),
            repo,
        };
        vec![]
    }

    /// Check a proposed topic name; `current` is the topic being renamed
    pub(super) fn validate_topic_name(&self, name: &str, current: Option<&str>) -> Result<(), ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::TopicNameEmpty);
        }
        if Some(name) != current && self.list.topic(name).is_some() {
            return Err(ControllerError::TopicExists(name.to_string()));
        }
        Ok(())
    }

    pub(super) fn create_topic(&mut self, name: String, repo: PathBuf, shared: bool) -> Vec<Task> {
        let topic = Topic::new(name.clone(), repo, shared);
        self.list.add_topic(topic.clone());
        self.list.select_sidebar_item(&SidebarItem::Topic(name.clone()));
        tracing::info!("Created topic {} (shared worktree: {})", name, shared);

        let mut tasks = self.save_topics();
        let backend = self.backend.clone();
        tasks.push(Task::spawn(async move {
            let result = backend.setup_topic(&topic).await;
            Msg::TopicReady { name, result }
        }));
        tasks
    }

    pub(super) fn on_topic_ready(
        &mut self,
        name: String,
        result: Result<Option<SharedWorktree>>,
    ) -> Vec<Task> {
        match result {
            Ok(worktree) => {
                let Some(topic) = self.list.topic_mut(&name) else {
                    return vec![];
                };
                if let Some(worktree) = worktree {
                    topic.worktree_path = Some(worktree.path);
                    topic.branch = worktree.branch;
                }
                topic.started = true;
                self.save_topics()
            }
            Err(e) => {
                self.list.remove_topic(&name);
                let mut tasks = self.save_topics();
                tasks.extend(self.show_error(e.context(format!("failed to set up topic {}", name))));
                tasks
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Topic removal, rename and push
    // ─────────────────────────────────────────────────────────────────────

    pub(super) fn confirm_kill_topic(&mut self) -> Vec<Task> {
        let Some(topic) = self.list.sidebar_topic() else {
            return self.show_error(ControllerError::NoTopicSelected);
        };
        self.state = UiState::Confirm(PendingConfirmation {
            message: format!("[!] Kill all instances in topic '{}'?", topic.name),
            action: PendingAction::KillTopicMembers {
                topic: topic.name.clone(),
            },
        });
        vec![]
    }

    pub(super) fn kill_topic_members(&mut self, topic: &str) -> Vec<Task> {
        let mut tasks = Vec::new();
        for id in self.list.members(topic) {
            tasks.extend(self.kill_session(&id, None));
        }
        tasks
    }

    /// Remove a topic. Members are killed first, or just ungrouped.
    ///
    /// With `kill_members` the topic and its worktree stay until every
    /// member's kill has come back; if any kill fails the topic is kept.
    pub(super) fn delete_topic(&mut self, name: &str, kill_members: bool) -> Vec<Task> {
        if self.list.topic(name).is_none() {
            return self.show_error(anyhow!("topic {:?} not found", name));
        }
        if !kill_members {
            return self.finish_topic_deletion(name);
        }
        if self.topic_deletions.contains_key(name) {
            return vec![];
        }

        let mut deletion = TopicDeletion::default();
        let mut tasks = Vec::new();
        for id in self.list.members(name) {
            match self.list.get(&id) {
                // Refused on the spot with an error banner
                Some(s) if s.is_busy() => deletion.failed = true,
                // Killed in the background; the result arrives as SessionKilled
                Some(s) if s.started => {
                    deletion.waiting.insert(id.clone());
                }
                // Unstarted sessions are removed right away
                _ => {}
            }
            tasks.extend(self.kill_session(&id, None));
        }
        tracing::info!(
            "Deleting topic {} after {} kills",
            name,
            deletion.waiting.len()
        );

        if deletion.waiting.is_empty() {
            tasks.extend(self.settle_topic_deletion(name, deletion.failed));
        } else {
            self.topic_deletions.insert(name.to_string(), deletion);
        }
        tasks
    }

    /// Account for one finished kill; the last one settles its topic
    pub(super) fn on_member_killed(&mut self, id: &str, killed: bool) -> Vec<Task> {
        let Some(name) = self
            .topic_deletions
            .iter()
            .find(|(_, deletion)| deletion.waiting.contains(id))
            .map(|(name, _)| name.clone())
        else {
            return vec![];
        };
        let Some(deletion) = self.topic_deletions.get_mut(&name) else {
            return vec![];
        };
        deletion.waiting.remove(id);
        deletion.failed |= !killed;
        if !deletion.waiting.is_empty() {
            return vec![];
        }
        let failed = deletion.failed;
        self.topic_deletions.remove(&name);
        self.settle_topic_deletion(&name, failed)
    }

    fn settle_topic_deletion(&mut self, name: &str, failed: bool) -> Vec<Task> {
        if failed {
            return self.show_error(anyhow!(
                "kept topic {}: not every instance could be killed",
                name
            ));
        }
        self.finish_topic_deletion(name)
    }

    /// Ungroup whatever is left, drop the topic and clean up its worktree
    fn finish_topic_deletion(&mut self, name: &str) -> Vec<Task> {
        let members = self.list.members(name);
        for id in &members {
            self.list.update(id, |s| s.topic_name.clear());
        }
        let Some(topic) = self.list.remove_topic(name) else {
            return vec![];
        };
        tracing::info!("Deleted topic {} ({} members ungrouped)", name, members.len());

        let backend = self.backend.clone();
        let name = name.to_string();
        let mut tasks = vec![Task::spawn(async move {
            let result = backend.cleanup_topic(&topic).await;
            Msg::TopicCleaned { name, result }
        })];
        tasks.extend(self.save_topics());
        tasks.extend(self.save_instances());
        tasks
    }

    pub(super) fn rename_topic(&mut self, old: &str, new: &str) -> Vec<Task> {
        if old == new {
            return vec![];
        }
        if !self.list.rename_topic(old, new) {
            return self.show_error(anyhow!("topic {:?} not found", old));
        }
        tracing::info!("Renamed topic {} to {}", old, new);
        let mut tasks = self.save_topics();
        tasks.extend(self.save_instances());
        tasks
    }

    /// Push a shared topic's branch through its first started member
    pub(super) fn push_topic(&mut self, name: &str) -> Vec<Task> {
        let member = self
            .list
            .members(name)
            .into_iter()
            .find(|id| self.list.get(id).is_some_and(|s| s.started && !s.is_paused()));
        match member {
            Some(id) => self.push_check(&id),
            None => self.show_error(anyhow!("topic {} has no running instances", name)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Moving sessions between topics
    // ─────────────────────────────────────────────────────────────────────

    pub(super) fn begin_move_to_topic(&mut self) -> Vec<Task> {
        let Some(session) = self.list.selected() else {
            return vec![];
        };
        if self.list.topic(&session.topic_name).is_some_and(|t| t.shared_worktree) {
            return self.show_error(ControllerError::SharedTopicMove);
        }

        let mut items = vec![UNGROUPED_LABEL.to_string()];
        items.extend(
            self.list
                .topics_for_repo(&session.repo_path)
                .into_iter()
                .map(|t| t.name.clone()),
        );
        let id = session.id.clone();
        self.state = UiState::MovingToTopic {
            picker: Picker::new(format!("Move {} to", session.title), items),
            id,
        };
        vec![]
    }

    /// `topic` empty ungroups the session
    pub(super) fn move_to_topic(&mut self, id: &str, topic: &str) -> Vec<Task> {
        if let Some(target) = self.list.topic(topic) {
            if target.shared_worktree {
                return self.show_error(ControllerError::SharedTopicMove);
            }
        }
        let auto_yes = self.list.topic(topic).map(|t| t.auto_yes);
        self.list.update(id, |s| {
            s.topic_name = topic.to_string();
            if let Some(auto_yes) = auto_yes {
                s.auto_yes = s.auto_yes || auto_yes;
            }
        });
        self.save_instances()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Repositories
    // ─────────────────────────────────────────────────────────────────────

    /// `name (count)` labels with a dot on active repositories
    pub(super) fn repo_picker_items(&self) -> (Vec<String>, Vec<Option<PathBuf>>) {
        let repos = self.list.known_repos();
        let active = self.list.active_repos();
        let mut labels: Vec<String> = repo_labels(&repos)
            .into_iter()
            .zip(&repos)
            .map(|(label, repo)| {
                let marker = if active.contains(repo) { " ●" } else { "" };
                format!("{} ({}){}", label, self.list.count_in_repo(repo), marker)
            })
            .collect();
        labels.push(OPEN_FOLDER_LABEL.to_string());

        let mut paths: Vec<Option<PathBuf>> = repos.into_iter().map(Some).collect();
        paths.push(None);
        (labels, paths)
    }

    pub(super) fn open_repo_picker(&mut self) -> Vec<Task> {
        let (labels, paths) = self.repo_picker_items();
        self.state = UiState::SwitchingRepo {
            picker: Picker::new("Repositories", labels),
            paths,
        };
        vec![]
    }

    /// Show only `repo` and remember it
    pub(super) fn switch_repo(&mut self, repo: PathBuf) -> Vec<Task> {
        tracing::info!("Switching to {}", repo.display());
        self.list.set_active_repos(vec![repo.clone()]);
        self.focus.detach();
        self.record_recent(&repo)
    }

    /// Add or remove `repo` from the multi-repo view. The last active
    /// repository cannot be removed.
    pub(super) fn toggle_repo(&mut self, repo: &Path) -> Vec<Task> {
        let mut active = self.list.active_repos().to_vec();
        if let Some(pos) = active.iter().position(|r| r == repo) {
            if active.len() == 1 {
                return vec![];
            }
            active.remove(pos);
            self.list.set_active_repos(active);
            vec![]
        } else {
            active.push(repo.to_path_buf());
            self.list.set_active_repos(active);
            self.record_recent(repo)
        }
    }

    fn record_recent(&mut self, repo: &Path) -> Vec<Task> {
        self.recent_repos.retain(|r| r != repo);
        self.recent_repos.insert(0, repo.to_path_buf());
        self.save_recent_repos()
    }

    /// Open a folder typed by the operator
    pub(super) fn open_folder(&mut self, input: &str) -> Result<Vec<Task>, ControllerError> {
        let path = expand_home(input);
        if !path.is_dir() {
            return Err(ControllerError::NotADirectory(path.display().to_string()));
        }
        Ok(self.switch_repo(path))
    }

    pub(super) fn history_items(&self) -> Vec<String> {
        self.recent_repos
            .iter()
            .map(|repo| repo.display().to_string())
            .collect()
    }

    pub(super) fn open_project_history(&mut self) -> Vec<Task> {
        self.state = UiState::ProjectHistory {
            picker: Picker::new("Recent projects", self.history_items()),
            filtering: false,
        };
        vec![]
    }

    /// Keep only the most recent entries
    pub(super) fn trim_history(&mut self) -> Vec<Task> {
        self.recent_repos.truncate(HISTORY_KEEP);
        self.save_recent_repos()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Integrations
    // ─────────────────────────────────────────────────────────────────────

    pub(super) fn integration_items(&self) -> Vec<String> {
        self.config
            .integration_names()
            .into_iter()
            .map(|name| {
                let enabled = self.config.integrations[&name].enabled;
                format!("[{}] {}", if enabled { "x" } else { " " }, name)
            })
            .collect()
    }

    pub(super) fn open_integrations(&mut self) -> Vec<Task> {
        self.state = UiState::ManagingIntegrations {
            picker: Picker::new("Integrations", self.integration_items()),
        };
        vec![]
    }

    /// Flip an integration for this run only
    pub(super) fn toggle_integration(&mut self, index: usize) {
        let Some(name) = self.config.integration_names().into_iter().nth(index) else {
            return;
        };
        if let Some(integration) = self.config.integrations.get_mut(&name) {
            integration.enabled = !integration.enabled;
            tracing::info!(
                "Integration {} {}",
                name,
                if integration.enabled { "enabled" } else { "disabled" }
            );
        }
    }
}
