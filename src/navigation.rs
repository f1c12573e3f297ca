use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Tasks,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Tasks => "/tasks",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub trait Navigator: Send + Sync {
    /// Redirect without leaving a history entry.
    fn replace(&self, route: Route);

    /// Redirect and record a history entry.
    fn push(&self, route: Route);
}

#[derive(Debug)]
struct HistoryState {
    current: Route,
    entries: Vec<Route>,
}

/// In-process navigation history.
#[derive(Debug)]
pub struct History {
    state: Mutex<HistoryState>,
}

impl History {
    pub fn new(start: Route) -> Self {
        Self {
            state: Mutex::new(HistoryState {
                current: start,
                entries: vec![start],
            }),
        }
    }

    pub fn current(&self) -> Route {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
    }

    /// Every route that holds a history entry, oldest first.
    pub fn entries(&self) -> Vec<Route> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Route::Root)
    }
}

impl Navigator for History {
    fn replace(&self, route: Route) {
        info!(%route, "navigate (replace)");
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current = route;
        if let Some(last) = state.entries.last_mut() {
            *last = route;
        }
    }

    fn push(&self, route: Route) {
        info!(%route, "navigate (push)");
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current = route;
        state.entries.push(route);
    }
}
