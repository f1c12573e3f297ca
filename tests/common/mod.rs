#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskdeck::backend::{
    AuthProvider, Credentials, DataStore, Filter, Select, Session, User,
};
use taskdeck::error::{Error, Result};
use taskdeck::navigation::{History, Route};
use taskdeck::notify::{Notification, Severity};
use taskdeck::task::Status;
use taskdeck::view::{TaskView, ViewOptions};
use tokio::sync::{Semaphore, broadcast};

pub type TestView = TaskView<MockAuth, MockStore, History>;

// --- Shared tracking state ---

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Query(Select),
    Insert(String, serde_json::Value),
    Update(String, serde_json::Value, Vec<Filter>),
    Delete(String, Vec<Filter>),
}

#[derive(Default)]
pub struct StoreTracker {
    pub calls: Vec<StoreCall>,
    /// Queued query responses with a simulated latency; the default is an
    /// immediate empty page.
    pub query_responses: VecDeque<(Duration, Result<Vec<serde_json::Value>>)>,
    pub fail_writes: bool,
    pub next_id: u64,
    /// When set, every write waits for a permit before answering.
    pub write_gate: Option<Arc<Semaphore>>,
}

impl StoreTracker {
    pub fn queries(&self) -> Vec<Select> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                StoreCall::Query(select) => Some(select.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls
            .iter()
            .filter(|c| !matches!(c, StoreCall::Query(_)))
            .cloned()
            .collect()
    }
}

// --- Mock implementations ---

#[derive(Clone)]
pub struct MockStore {
    pub tracker: Arc<Mutex<StoreTracker>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            tracker: Arc::new(Mutex::new(StoreTracker::default())),
        }
    }

    pub fn push_query(&self, rows: Vec<serde_json::Value>) {
        self.push_query_after(Duration::ZERO, Ok(rows));
    }

    pub fn push_query_after(&self, delay: Duration, response: Result<Vec<serde_json::Value>>) {
        self.tracker
            .lock()
            .unwrap()
            .query_responses
            .push_back((delay, response));
    }

    pub fn fail_writes(&self) {
        self.tracker.lock().unwrap().fail_writes = true;
    }

    /// Hold every write until the returned semaphore hands out a permit.
    pub fn hold_writes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.tracker.lock().unwrap().write_gate = Some(Arc::clone(&gate));
        gate
    }

    async fn wait_for_gate(&self) {
        let gate = self.tracker.lock().unwrap().write_gate.clone();
        match gate {
            Some(gate) => gate.acquire().await.unwrap().forget(),
            None => tokio::task::yield_now().await,
        }
    }

    fn write_result(&self) -> Result<()> {
        if self.tracker.lock().unwrap().fail_writes {
            Err(Error::HttpStatus {
                status: 500,
                message: "database unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl DataStore for MockStore {
    async fn query(&self, select: &Select) -> Result<Vec<serde_json::Value>> {
        let (delay, response) = {
            let mut tracker = self.tracker.lock().unwrap();
            tracker.calls.push(StoreCall::Query(select.clone()));
            tracker
                .query_responses
                .pop_front()
                .unwrap_or((Duration::ZERO, Ok(vec![])))
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }

    async fn insert(&self, table: &str, record: serde_json::Value) -> Result<serde_json::Value> {
        let id = {
            let mut tracker = self.tracker.lock().unwrap();
            tracker
                .calls
                .push(StoreCall::Insert(table.to_string(), record.clone()));
            tracker.next_id += 1;
            tracker.next_id
        };
        self.wait_for_gate().await;
        self.write_result()?;
        let mut stored = record;
        stored["id"] = serde_json::json!(format!("new-{id}"));
        stored["created_at"] = serde_json::json!("2026-01-01T00:00:00Z");
        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        patch: serde_json::Value,
        filters: &[Filter],
    ) -> Result<()> {
        self.tracker.lock().unwrap().calls.push(StoreCall::Update(
            table.to_string(),
            patch,
            filters.to_vec(),
        ));
        self.wait_for_gate().await;
        self.write_result()
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        self.tracker
            .lock()
            .unwrap()
            .calls
            .push(StoreCall::Delete(table.to_string(), filters.to_vec()));
        self.wait_for_gate().await;
        self.write_result()
    }
}

#[derive(Default)]
pub struct AuthTracker {
    pub session: Option<Session>,
    /// When false, `current_user` reports no user even with a session.
    pub user_lookup: bool,
    pub ended: usize,
}

#[derive(Clone)]
pub struct MockAuth {
    pub tracker: Arc<Mutex<AuthTracker>>,
}

impl MockAuth {
    pub fn signed_in() -> Self {
        Self {
            tracker: Arc::new(Mutex::new(AuthTracker {
                session: Some(test_session()),
                user_lookup: true,
                ended: 0,
            })),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            tracker: Arc::new(Mutex::new(AuthTracker::default())),
        }
    }

    pub fn lose_user(&self) {
        self.tracker.lock().unwrap().user_lookup = false;
    }
}

impl AuthProvider for MockAuth {
    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.tracker.lock().unwrap().session.clone())
    }

    async fn current_user(&self) -> Result<Option<User>> {
        let tracker = self.tracker.lock().unwrap();
        if !tracker.user_lookup {
            return Ok(None);
        }
        Ok(tracker.session.as_ref().map(|s| s.user.clone()))
    }

    async fn end_session(&self) -> Result<()> {
        let mut tracker = self.tracker.lock().unwrap();
        tracker.session = None;
        tracker.ended += 1;
        Ok(())
    }

    async fn begin_session(&self, credentials: &Credentials) -> Result<Session> {
        let mut session = test_session();
        session.user.email = Some(credentials.email.clone());
        self.tracker.lock().unwrap().session = Some(session.clone());
        Ok(session)
    }
}

// --- Helpers ---

/// Yield until `done` holds, so a test can observe a call mid-flight.
pub async fn wait_until(done: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached");
}

pub fn numeric_record(id: u64, status: Status) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": format!("Task {id}"),
        "description": "",
        "status": status.as_str(),
        "created_at": "2026-01-01T00:00:00Z",
    })
}

pub fn test_session() -> Session {
    Session {
        access_token: "token".to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_at: None,
        user: User {
            id: "user-1".to_string(),
            email: Some("me@example.com".to_string()),
        },
    }
}

pub fn record(id: &str, status: Status) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": format!("Task {id}"),
        "description": null,
        "status": status.as_str(),
        "created_at": "2026-01-01T00:00:00Z",
        "user_id": "user-1",
    })
}

pub fn make_view(auth: MockAuth, store: MockStore) -> TestView {
    TaskView::new(
        auth,
        store,
        History::new(Route::Tasks),
        ViewOptions::default(),
    )
}

/// A mounted view whose first load returns `rows`.
pub async fn mounted_view(rows: Vec<serde_json::Value>) -> (TestView, MockStore, MockAuth) {
    let auth = MockAuth::signed_in();
    let store = MockStore::new();
    store.push_query(rows);
    let view = make_view(auth.clone(), store.clone());
    assert!(view.mount().await.is_applied());
    (view, store, auth)
}

/// Drain every notification emitted since `rx` subscribed.
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut seen = Vec::new();
    while let Ok(n) = rx.try_recv() {
        seen.push(n);
    }
    seen
}

pub fn count(notes: &[Notification], severity: Severity) -> usize {
    notes.iter().filter(|n| n.severity == severity).count()
}
