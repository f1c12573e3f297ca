//! The task view: list state, filters, and the command handlers that keep
//! the in-memory list in step with the data store.
//!
//! Every handler follows one protocol: raise its transient flag, issue one
//! store call, patch the list only once that call succeeded, surface the
//! result as a notification, and drop the flag on every exit path.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{AuthProvider, DataStore, Filter};
use crate::debounce::{DEFAULT_QUIET_PERIOD, SearchDebouncer};
use crate::error::{Error, Result};
use crate::guard::{GuardOutcome, SessionGuard};
use crate::list::{FlagKind, TaskList, TransientFlags};
use crate::navigation::{Navigator, Route};
use crate::notify::{DEFAULT_TOAST_DURATION, Notifier};
use crate::query::{FilterState, TaskQuery};
use crate::task::{NewTask, Status, StatusFilter, Task, TaskStats};

pub const DEFAULT_TABLE: &str = "tasks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    pub table: String,
    pub search_debounce: Duration,
    pub toast_duration: Duration,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            search_debounce: DEFAULT_QUIET_PERIOD,
            toast_duration: DEFAULT_TOAST_DURATION,
        }
    }
}

/// Result of a command or query. Failures have already been reported
/// through the notifier by the time the caller sees them.
#[derive(Debug)]
pub enum Outcome {
    Applied,
    /// Nothing was sent: the control is disabled or there was nothing to do.
    Skipped,
    Failed(Error),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped)
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ViewState {
    ready: bool,
    list: TaskList,
    flags: TransientFlags,
    filter: FilterState,
    /// Ticket of the most recently issued query.
    latest_query: u64,
}

/// Raises a transient flag and lowers it when dropped, so the flag clears
/// on success, failure, and cancellation alike.
struct FlagGuard<'a> {
    state: &'a Mutex<ViewState>,
    kind: FlagKind,
}

impl<'a> FlagGuard<'a> {
    fn raise(state: &'a Mutex<ViewState>, kind: FlagKind) -> Self {
        lock(state).flags.set(&kind, true);
        Self { state, kind }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).flags.set(&self.kind, false);
    }
}

fn lock(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct TaskView<A, D, N> {
    auth: A,
    store: D,
    nav: N,
    table: String,
    state: Mutex<ViewState>,
    search: Mutex<SearchDebouncer>,
    notifier: Notifier,
}

impl<A: AuthProvider, D: DataStore, N: Navigator> TaskView<A, D, N> {
    pub fn new(auth: A, store: D, nav: N, options: ViewOptions) -> Self {
        Self {
            auth,
            store,
            nav,
            table: options.table,
            state: Mutex::new(ViewState::default()),
            search: Mutex::new(SearchDebouncer::new(options.search_debounce)),
            notifier: Notifier::new(options.toast_duration),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        lock(&self.state)
    }

    fn patch(&self, apply: impl FnOnce(TaskList) -> TaskList) {
        let mut state = self.state();
        let list = std::mem::take(&mut state.list);
        state.list = apply(list);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Enter the view: check the session, then load tasks for the current
    /// filters. Without a session the navigator has already been sent to the
    /// login page and nothing is loaded.
    pub async fn mount(&self) -> Outcome {
        match SessionGuard::check(&self.auth, &self.nav).await {
            GuardOutcome::Ready(_) => {
                self.state().ready = true;
                self.refresh().await
            }
            GuardOutcome::Redirected => {
                Outcome::Failed(Error::AuthRequired("no active session".to_string()))
            }
        }
    }

    pub async fn logout(&self) {
        if let Err(e) = self.auth.end_session().await {
            warn!(error = %e, "sign-out failed");
        }
        self.state().ready = false;
        self.nav.push(Route::Login);
    }

    // -----------------------------------------------------------------------
    // Query executor
    // -----------------------------------------------------------------------

    /// Fetch the list for the current filters and replace it wholesale.
    ///
    /// Each call takes a ticket; a response that arrives after a newer query
    /// was issued is dropped instead of overwriting fresher results.
    pub async fn refresh(&self) -> Outcome {
        let (ticket, select) = {
            let mut state = self.state();
            if !state.ready {
                return Outcome::Skipped;
            }
            state.latest_query += 1;
            let select = TaskQuery::from_filter(&state.filter).to_select(&self.table);
            (state.latest_query, select)
        };
        debug!(ticket, filters = ?select.filters, "loading tasks");

        let result = self.store.query(&select).await.and_then(|rows| {
            rows.into_iter()
                .map(Task::from_record)
                .collect::<Result<Vec<_>>>()
        });

        let mut state = self.state();
        if ticket != state.latest_query {
            debug!(ticket, latest = state.latest_query, "discarding stale query result");
            return Outcome::Skipped;
        }
        match result {
            Ok(tasks) => {
                debug!(count = tasks.len(), "tasks loaded");
                let list = std::mem::take(&mut state.list);
                state.list = list.replace(tasks);
                Outcome::Applied
            }
            Err(e) => {
                drop(state);
                warn!(error = %e, "failed to load tasks");
                self.notifier.error("Failed to load tasks");
                Outcome::Failed(Error::RemoteRead(e.to_string()))
            }
        }
    }

    pub async fn set_status_filter(&self, status_filter: StatusFilter) -> Outcome {
        {
            let mut state = self.state();
            if state.filter.status_filter == status_filter {
                return Outcome::Skipped;
            }
            state.filter.status_filter = status_filter;
        }
        self.refresh().await
    }

    // -----------------------------------------------------------------------
    // Debounced search
    // -----------------------------------------------------------------------

    /// Record a keystroke in the search box. Queries follow later, once the
    /// debounced term settles.
    pub fn search_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.search
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .input(text.clone());
        self.state().filter.search_term = text;
    }

    /// Receiver that wakes on every debounced search transition.
    pub fn search_updates(&self) -> watch::Receiver<String> {
        self.search
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe()
    }

    /// Adopt a settled search term and re-query if it differs.
    pub async fn apply_search(&self, term: String) -> Outcome {
        {
            let mut state = self.state();
            if state.filter.debounced_search_term == term {
                return Outcome::Skipped;
            }
            state.filter.debounced_search_term = term;
        }
        self.refresh().await
    }

    /// Wait for the next debounced transition on `updates` and apply it.
    pub async fn next_search(&self, updates: &mut watch::Receiver<String>) -> Option<Outcome> {
        updates.changed().await.ok()?;
        let term = updates.borrow_and_update().clone();
        Some(self.apply_search(term).await)
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    pub async fn create_task(&self, title: &str, description: &str, status: Status) -> Outcome {
        if title.trim().is_empty() {
            return Outcome::Failed(Error::Validation("title must not be empty".to_string()));
        }
        {
            let state = self.state();
            if !state.ready || state.flags.creating() {
                return Outcome::Skipped;
            }
        }
        let _flag = FlagGuard::raise(&self.state, FlagKind::Creating);

        let user = match self.auth.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => return self.auth_required("no signed-in user".to_string()),
            Err(e) => return self.auth_required(e.to_string()),
        };

        let row = NewTask {
            title: title.to_string(),
            description: description.to_string(),
            status,
            user_id: user.id,
        };
        let result = match serde_json::to_value(&row) {
            Ok(record) => self
                .store
                .insert(&self.table, record)
                .await
                .and_then(Task::from_record),
            Err(e) => Err(Error::Decode(e.to_string())),
        };

        match result {
            Ok(task) => {
                info!(id = %task.id, "task created");
                self.patch(|list| list.insert(task));
                self.notifier.success("Task created successfully");
                Outcome::Applied
            }
            Err(e) => self.write_failed("create task", "Failed to create task", e),
        }
    }

    pub async fn delete_task(&self, id: &str) -> Outcome {
        if !self.can_delete(id) {
            return Outcome::Skipped;
        }
        let _flag = FlagGuard::raise(&self.state, FlagKind::Deleting(id.to_string()));

        match self.store.delete(&self.table, &[Filter::eq("id", id)]).await {
            Ok(()) => {
                info!(id, "task deleted");
                self.patch(|list| list.remove(id));
                self.notifier.success("Task deleted");
                Outcome::Applied
            }
            Err(e) => self.write_failed("delete task", "Failed to delete task", e),
        }
    }

    pub async fn change_status(&self, id: &str, status: Status) -> Outcome {
        if !self.can_change_status(id) {
            return Outcome::Skipped;
        }
        let _flag = FlagGuard::raise(&self.state, FlagKind::Updating(id.to_string()));

        let patch = serde_json::json!({ "status": status });
        match self
            .store
            .update(&self.table, patch, &[Filter::eq("id", id)])
            .await
        {
            Ok(()) => {
                info!(id, %status, "task status updated");
                self.patch(|list| list.update_status(id, status));
                self.notifier.success("Task status updated");
                Outcome::Applied
            }
            Err(e) => self.write_failed("update task", "Failed to update task", e),
        }
    }

    pub async fn mark_all_done(&self) -> Outcome {
        {
            let state = self.state();
            if !state.ready || state.flags.marking_all_done() {
                return Outcome::Skipped;
            }
        }
        let _flag = FlagGuard::raise(&self.state, FlagKind::MarkingAllDone);

        let ids = self.state().list.open_ids();
        if ids.is_empty() {
            self.notifier.info("All tasks are already done");
            return Outcome::Skipped;
        }

        let patch = serde_json::json!({ "status": Status::Done });
        match self
            .store
            .update(&self.table, patch, &[Filter::is_in("id", ids.clone())])
            .await
        {
            Ok(()) => {
                info!(count = ids.len(), "marked tasks done");
                self.patch(|list| list.update_status_bulk(&ids, Status::Done));
                self.notifier
                    .success(format!("Marked {} tasks as done", ids.len()));
                Outcome::Applied
            }
            Err(e) => self.write_failed("mark all done", "Failed to mark all done", e),
        }
    }

    fn auth_required(&self, reason: String) -> Outcome {
        warn!(%reason, "create rejected: not authenticated");
        self.notifier.error("User not authenticated");
        Outcome::Failed(Error::AuthRequired(reason))
    }

    fn write_failed(&self, op: &str, message: &str, e: Error) -> Outcome {
        warn!(error = %e, "failed to {op}");
        self.notifier.error(message);
        Outcome::Failed(Error::RemoteWrite(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Read-side accessors
    // -----------------------------------------------------------------------

    pub fn is_ready(&self) -> bool {
        self.state().ready
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state().list.tasks().to_vec()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.state().list.get(id).cloned()
    }

    pub fn stats(&self) -> TaskStats {
        self.state().list.stats()
    }

    pub fn flags(&self) -> TransientFlags {
        self.state().flags.clone()
    }

    pub fn filter(&self) -> FilterState {
        self.state().filter.clone()
    }

    pub fn can_submit(&self, title: &str) -> bool {
        let state = self.state();
        state.ready && !state.flags.creating() && !title.trim().is_empty()
    }

    pub fn can_delete(&self, id: &str) -> bool {
        let state = self.state();
        state.ready && !state.flags.row(id).busy()
    }

    pub fn can_change_status(&self, id: &str) -> bool {
        self.can_delete(id)
    }

    pub fn can_mark_all_done(&self) -> bool {
        let state = self.state();
        state.ready && !state.flags.marking_all_done() && state.list.stats().open() > 0
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn navigator(&self) -> &N {
        &self.nav
    }
}
