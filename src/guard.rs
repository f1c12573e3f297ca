use tracing::{info, warn};

use crate::backend::{AuthProvider, Session};
use crate::navigation::{Navigator, Route};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Ready(Session),
    Redirected,
}

impl GuardOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, GuardOutcome::Ready(_))
    }
}

/// Look up the current session once. A failed lookup counts as signed out.
async fn lookup<A: AuthProvider>(auth: &A) -> Option<Session> {
    match auth.current_session().await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "session lookup failed");
            None
        }
    }
}

/// Gate for the task view: sends signed-out users to the login page.
/// Checked once on entry; expiry later surfaces as a failed read or write.
pub struct SessionGuard;

impl SessionGuard {
    pub async fn check<A: AuthProvider, N: Navigator>(auth: &A, nav: &N) -> GuardOutcome {
        match lookup(auth).await {
            Some(session) => {
                info!(user = %session.user.id, "session active");
                GuardOutcome::Ready(session)
            }
            None => {
                nav.push(Route::Login);
                GuardOutcome::Redirected
            }
        }
    }
}

/// Decide where the root route lands: the task view when signed in,
/// otherwise the login page.
pub async fn resolve_entry<A: AuthProvider, N: Navigator>(auth: &A, nav: &N) -> Route {
    let route = if lookup(auth).await.is_some() {
        Route::Tasks
    } else {
        Route::Login
    };
    nav.replace(route);
    route
}
