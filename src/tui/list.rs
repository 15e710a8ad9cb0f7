// Session list - the master set of sessions and topics plus the filtered view
//
// `all` holds every session across every repository; `visible` is the
// ordered subset shown in the list, derived from the active repositories,
// the sidebar selection, the status filter and the search text. Every
// membership change goes through here so both views stay in step.

use crate::session::{Session, Status, Topic};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Hide paused sessions
    Active,
}

impl StatusFilter {
    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Active,
            StatusFilter::Active => StatusFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Active => "Active",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Newest,
    Oldest,
    Name,
    Status,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::Newest => SortMode::Oldest,
            SortMode::Oldest => SortMode::Name,
            SortMode::Name => SortMode::Status,
            SortMode::Status => SortMode::Newest,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Newest => "Newest",
            SortMode::Oldest => "Oldest",
            SortMode::Name => "Name",
            SortMode::Status => "Status",
        }
    }
}

fn status_rank(status: Status) -> u8 {
    match status {
        Status::Running => 0,
        Status::Loading => 1,
        Status::Ready => 2,
        Status::Paused => 3,
    }
}

/// Rows of the topic sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarItem {
    All,
    Ungrouped,
    Topic(String),
}

impl SidebarItem {
    fn admits(&self, session: &Session) -> bool {
        match self {
            SidebarItem::All => true,
            SidebarItem::Ungrouped => session.topic_name.is_empty(),
            SidebarItem::Topic(name) => &session.topic_name == name,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionList {
    all: Vec<Session>,
    topics: Vec<Topic>,
    active_repos: Vec<PathBuf>,
    /// Ids in display order
    visible: Vec<String>,
    selected: usize,
    selected_id: Option<String>,
    /// Bumped whenever the selected session changes
    generation: u64,
    pub filter: StatusFilter,
    pub sort: SortMode,
    pub expanded: bool,
    search: String,
    sidebar: Vec<SidebarItem>,
    sidebar_selected: usize,
}

impl SessionList {
    pub fn new(sessions: Vec<Session>, topics: Vec<Topic>, active_repos: Vec<PathBuf>) -> Self {
        let mut list = Self {
            all: sessions,
            topics,
            active_repos,
            ..Default::default()
        };
        list.refresh();
        list
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────

    pub fn all(&self) -> &[Session] {
        &self.all
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.all.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.all.iter_mut().find(|s| s.id == id)
    }

    pub fn by_title(&self, title: &str) -> Option<&Session> {
        self.all.iter().find(|s| s.title == title)
    }

    pub fn title_taken(&self, title: &str, except_id: &str) -> bool {
        self.all.iter().any(|s| s.title == title && s.id != except_id)
    }

    pub fn visible_ids(&self) -> &[String] {
        &self.visible
    }

    pub fn visible_sessions(&self) -> impl Iterator<Item = &Session> {
        self.visible.iter().filter_map(|id| self.get(id))
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Session> {
        self.selected_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_id.as_deref() == Some(id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Membership
    // ─────────────────────────────────────────────────────────────────────

    pub fn add(&mut self, session: Session) {
        self.all.push(session);
        self.refresh();
    }

    pub fn remove(&mut self, id: &str) -> Option<Session> {
        let pos = self.all.iter().position(|s| s.id == id)?;
        let removed = self.all.remove(pos);
        self.refresh();
        Some(removed)
    }

    /// Apply a change that may affect filtering or ordering
    pub fn update<F: FnOnce(&mut Session)>(&mut self, id: &str, f: F) -> bool {
        match self.get_mut(id) {
            Some(session) => {
                f(session);
                self.refresh();
                true
            }
            None => false,
        }
    }

    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.name == name)
    }

    pub fn topic_mut(&mut self, name: &str) -> Option<&mut Topic> {
        self.topics.iter_mut().find(|t| t.name == name)
    }

    pub fn add_topic(&mut self, topic: Topic) {
        self.topics.push(topic);
        self.rebuild_sidebar();
    }

    pub fn remove_topic(&mut self, name: &str) -> Option<Topic> {
        let pos = self.topics.iter().position(|t| t.name == name)?;
        let removed = self.topics.remove(pos);
        self.refresh();
        Some(removed)
    }

    /// Rename a topic and move every member, across all repositories
    pub fn rename_topic(&mut self, old: &str, new: &str) -> bool {
        let Some(topic) = self.topic_mut(old) else {
            return false;
        };
        topic.name = new.to_string();
        for session in self.all.iter_mut().filter(|s| s.topic_name == old) {
            session.topic_name = new.to_string();
        }
        if self.sidebar_item() == SidebarItem::Topic(old.to_string()) {
            self.refresh();
            self.select_sidebar_item(&SidebarItem::Topic(new.to_string()));
        } else {
            self.refresh();
        }
        true
    }

    /// Ids of every session in a topic
    pub fn members(&self, topic: &str) -> Vec<String> {
        self.all
            .iter()
            .filter(|s| s.topic_name == topic)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Topics owned by one repository
    pub fn topics_for_repo(&self, repo: &Path) -> Vec<&Topic> {
        self.topics.iter().filter(|t| t.repo_path == repo).collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Repositories
    // ─────────────────────────────────────────────────────────────────────

    pub fn active_repos(&self) -> &[PathBuf] {
        &self.active_repos
    }

    pub fn is_multi_repo(&self) -> bool {
        self.active_repos.len() > 1
    }

    pub fn set_active_repos(&mut self, repos: Vec<PathBuf>) {
        self.active_repos = repos;
        self.sidebar_selected = 0;
        self.refresh();
    }

    /// Repository new sessions land in: the selected session's, else the first active
    pub fn current_repo(&self) -> Option<PathBuf> {
        self.selected()
            .map(|s| s.repo_path.clone())
            .or_else(|| self.active_repos.first().cloned())
    }

    /// Every repository that has sessions, plus the active ones
    pub fn known_repos(&self) -> Vec<PathBuf> {
        let mut repos: Vec<PathBuf> = self.active_repos.clone();
        for session in &self.all {
            if !repos.contains(&session.repo_path) {
                repos.push(session.repo_path.clone());
            }
        }
        repos
    }

    pub fn count_in_repo(&self, repo: &Path) -> usize {
        self.all.iter().filter(|s| s.repo_path == repo).count()
    }

    fn in_active_repo(&self, session: &Session) -> bool {
        self.active_repos.is_empty() || self.active_repos.contains(&session.repo_path)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Filtering and ordering
    // ─────────────────────────────────────────────────────────────────────

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_lowercase();
        self.refresh();
    }

    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
        self.refresh();
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        self.refresh();
    }

    fn passes(&self, session: &Session, item: &SidebarItem) -> bool {
        // A session still being named is always shown so it can be typed into
        if session.title.is_empty() {
            return true;
        }
        self.in_active_repo(session)
            && item.admits(session)
            && (self.filter == StatusFilter::All || !session.is_paused())
            && (self.search.is_empty() || session.matches(&self.search))
    }

    /// Recompute the visible list, keeping the selection on the same session
    /// when it is still visible
    pub fn refresh(&mut self) {
        self.rebuild_sidebar();
        let item = self.sidebar_item();

        let mut visible: Vec<&Session> = self
            .all
            .iter()
            .filter(|s| self.passes(s, &item))
            .collect();
        match self.sort {
            SortMode::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortMode::Oldest => visible.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortMode::Name => {
                visible.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            }
            SortMode::Status => visible.sort_by_key(|s| status_rank(s.status)),
        }
        self.visible = visible.into_iter().map(|s| s.id.clone()).collect();

        let keep = self
            .selected_id
            .as_ref()
            .and_then(|id| self.visible.iter().position(|v| v == id));
        match keep {
            Some(pos) => self.selected = pos,
            None => {
                let index = self.selected.min(self.visible.len().saturating_sub(1));
                self.select_index(index);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────────────────────

    pub fn select_index(&mut self, index: usize) {
        self.selected = index;
        let id = self.visible.get(index).cloned();
        if id != self.selected_id {
            self.selected_id = id;
            self.generation += 1;
            // Looking at a session acknowledges its notification
            if let Some(id) = self.selected_id.clone() {
                if let Some(session) = self.get_mut(&id) {
                    session.notified = false;
                }
            }
        }
    }

    pub fn select_id(&mut self, id: &str) -> bool {
        match self.visible.iter().position(|v| v == id) {
            Some(pos) => {
                self.select_index(pos);
                true
            }
            None => false,
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.visible.len() {
            self.select_index(self.selected + 1);
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.select_index(self.selected - 1);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sidebar
    // ─────────────────────────────────────────────────────────────────────

    fn rebuild_sidebar(&mut self) {
        let current = self.sidebar.get(self.sidebar_selected).cloned();
        let mut names: Vec<String> = self
            .topics
            .iter()
            .filter(|t| self.active_repos.is_empty() || self.active_repos.contains(&t.repo_path))
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names.dedup();

        self.sidebar = vec![SidebarItem::All, SidebarItem::Ungrouped];
        self.sidebar.extend(names.into_iter().map(SidebarItem::Topic));

        self.sidebar_selected = current
            .and_then(|item| self.sidebar.iter().position(|i| *i == item))
            .unwrap_or(0);
    }

    pub fn sidebar(&self) -> &[SidebarItem] {
        &self.sidebar
    }

    pub fn sidebar_selected(&self) -> usize {
        self.sidebar_selected
    }

    pub fn sidebar_item(&self) -> SidebarItem {
        self.sidebar
            .get(self.sidebar_selected)
            .cloned()
            .unwrap_or(SidebarItem::All)
    }

    /// The topic the sidebar points at, if any
    pub fn sidebar_topic(&self) -> Option<&Topic> {
        match self.sidebar_item() {
            SidebarItem::Topic(name) => self.topic(&name),
            _ => None,
        }
    }

    pub fn set_sidebar(&mut self, index: usize) {
        if index < self.sidebar.len() {
            self.sidebar_selected = index;
            self.selected = 0;
            self.refresh();
        }
    }

    pub fn select_sidebar_item(&mut self, item: &SidebarItem) {
        if let Some(pos) = self.sidebar.iter().position(|i| i == item) {
            self.set_sidebar(pos);
        }
    }

    pub fn sidebar_next(&mut self) {
        let next = self.sidebar_selected + 1;
        self.set_sidebar(if next >= self.sidebar.len() { 0 } else { next });
    }

    pub fn sidebar_prev(&mut self) {
        let prev = match self.sidebar_selected {
            0 => self.sidebar.len().saturating_sub(1),
            n => n - 1,
        };
        self.set_sidebar(prev);
    }

    /// Sessions under a sidebar row that match the current search
    pub fn match_count(&self, item: &SidebarItem) -> usize {
        self.all
            .iter()
            .filter(|s| !s.title.is_empty() && self.passes(s, item))
            .count()
    }

    /// A topic has a running member or one that finished unseen
    pub fn topic_active(&self, name: &str) -> bool {
        self.all
            .iter()
            .any(|s| s.topic_name == name && (s.status == Status::Running || s.notified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionOptions;
    use chrono::Duration;

    fn session(title: &str, topic: &str, repo: &str, age_secs: i64) -> Session {
        let mut s = Session::new(SessionOptions {
            title: title.to_string(),
            topic_name: topic.to_string(),
            repo_path: PathBuf::from(repo),
            program: "claude".to_string(),
            ..Default::default()
        });
        s.created_at -= Duration::seconds(age_secs);
        s
    }

    fn titles(list: &SessionList) -> Vec<String> {
        list.visible_sessions().map(|s| s.title.clone()).collect()
    }

    fn fixture() -> SessionList {
        SessionList::new(
            vec![
                session("alpha", "auth", "/r1", 30),
                session("beta", "", "/r1", 20),
                session("gamma", "auth", "/r2", 10),
            ],
            vec![Topic::new("auth", PathBuf::from("/r1"), false)],
            vec![PathBuf::from("/r1")],
        )
    }

    #[test]
    fn visible_is_scoped_to_active_repos() {
        let list = fixture();
        assert_eq!(titles(&list), vec!["beta", "alpha"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn sidebar_scopes_by_topic() {
        let mut list = fixture();
        assert_eq!(
            list.sidebar(),
            &[
                SidebarItem::All,
                SidebarItem::Ungrouped,
                SidebarItem::Topic("auth".into())
            ]
        );
        list.sidebar_next();
        assert_eq!(titles(&list), vec!["beta"]);
        list.sidebar_next();
        assert_eq!(titles(&list), vec!["alpha"]);
        // Wraps back to All
        list.sidebar_next();
        assert_eq!(list.sidebar_item(), SidebarItem::All);
        list.sidebar_prev();
        assert_eq!(list.sidebar_item(), SidebarItem::Topic("auth".into()));
    }

    #[test]
    fn search_counts_per_topic() {
        let mut list = fixture();
        list.set_active_repos(vec![PathBuf::from("/r1"), PathBuf::from("/r2")]);
        list.set_search("A");
        // alpha, beta, gamma all contain "a"
        assert_eq!(list.match_count(&SidebarItem::All), 3);
        assert_eq!(list.match_count(&SidebarItem::Topic("auth".into())), 2);
        list.set_search("gam");
        assert_eq!(list.match_count(&SidebarItem::All), 1);
        assert_eq!(list.match_count(&SidebarItem::Ungrouped), 0);
        assert_eq!(titles(&list), vec!["gamma"]);
    }

    #[test]
    fn selection_follows_session_across_reorder() {
        let mut list = fixture();
        list.select_index(1);
        let id = list.selected_id().unwrap().to_string();
        let generation = list.generation();
        list.cycle_sort(); // Oldest first flips the order
        assert_eq!(list.selected_id(), Some(id.as_str()));
        assert_eq!(list.selected_index(), 0);
        assert_eq!(list.generation(), generation);
    }

    #[test]
    fn generation_bumps_on_selection_change() {
        let mut list = fixture();
        let before = list.generation();
        list.select_next();
        assert_eq!(list.generation(), before + 1);
        // Already at the end; nothing changes
        list.select_next();
        assert_eq!(list.generation(), before + 1);
    }

    #[test]
    fn unnamed_session_is_always_visible() {
        let mut list = fixture();
        list.set_search("zzz");
        assert!(titles(&list).is_empty());
        list.add(session("", "", "/elsewhere", 0));
        assert_eq!(titles(&list), vec![""]);
    }

    #[test]
    fn active_filter_hides_paused() {
        let mut list = fixture();
        let id = list.by_title("beta").unwrap().id.clone();
        list.update(&id, |s| s.set_status(Status::Paused));
        list.cycle_filter();
        assert_eq!(titles(&list), vec!["alpha"]);
    }

    #[test]
    fn removing_selected_moves_selection() {
        let mut list = fixture();
        let first = list.selected_id().unwrap().to_string();
        list.remove(&first);
        assert_eq!(titles(&list), vec!["alpha"]);
        assert_eq!(list.selected().unwrap().title, "alpha");
    }

    #[test]
    fn selecting_clears_notification() {
        let mut list = fixture();
        let id = list.by_title("alpha").unwrap().id.clone();
        list.update(&id, |s| s.notified = true);
        assert!(list.topic_active("auth"));
        list.select_id(&id);
        assert!(!list.get(&id).unwrap().notified);
        assert!(!list.topic_active("auth"));
    }

    #[test]
    fn rename_topic_moves_members_everywhere() {
        let mut list = fixture();
        list.select_sidebar_item(&SidebarItem::Topic("auth".into()));
        assert!(list.rename_topic("auth", "login"));
        assert_eq!(list.members("login").len(), 2);
        assert_eq!(list.sidebar_item(), SidebarItem::Topic("login".into()));
    }
}
