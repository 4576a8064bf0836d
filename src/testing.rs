//! In-memory client doubles shared by the panel and shell tests.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::client::{ApiError, ResourceClient, UploadClient, UploadFile};
use crate::schema::PlanResource;

/// A request as seen by [`FakeClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Get(i64),
    Create(Value),
    Update(i64, Value),
    Delete(i64),
}

struct FakeState<R> {
    calls: Vec<Call>,
    stored: Vec<R>,
    next_id: i64,
    fail_list: bool,
    fail_mutations: bool,
}

/// Resource client that keeps everything in memory and records each call.
pub struct FakeClient<R> {
    state: Arc<Mutex<FakeState<R>>>,
}

impl<R> Clone for FakeClient<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<R: PlanResource> FakeClient<R> {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn with_items(stored: Vec<R>) -> Self {
        let next_id = stored.iter().filter_map(R::id).max().unwrap_or(0) + 1;
        Self {
            state: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                stored,
                next_id,
                fail_list: false,
                fail_mutations: false,
            })),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn stored(&self) -> Vec<R> {
        self.state.lock().unwrap().stored.clone()
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.state.lock().unwrap().fail_mutations = fail;
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, FakeState<R>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

fn offline() -> ApiError {
    ApiError::Network("connection refused".to_string())
}

impl<R: PlanResource> ResourceClient<R> for FakeClient<R> {
    async fn list_all(&self) -> Result<Vec<R>, ApiError> {
        let state = self.record(Call::List);
        if state.fail_list {
            return Err(offline());
        }
        Ok(state.stored.clone())
    }

    async fn get(&self, id: i64) -> Result<R, ApiError> {
        let state = self.record(Call::Get(id));
        state
            .stored
            .iter()
            .find(|r| r.id() == Some(id))
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create(&self, payload: &R) -> Result<R, ApiError> {
        let value = serde_json::to_value(payload).unwrap();
        let mut state = self.record(Call::Create(value));
        if state.fail_mutations {
            return Err(offline());
        }
        let id = state.next_id;
        state.next_id += 1;
        let created = payload.clone().with_id(id);
        state.stored.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, payload: &R) -> Result<R, ApiError> {
        let value = serde_json::to_value(payload).unwrap();
        let mut state = self.record(Call::Update(id, value));
        if state.fail_mutations {
            return Err(offline());
        }
        let updated = payload.clone().with_id(id);
        let slot = state
            .stored
            .iter_mut()
            .find(|r| r.id() == Some(id))
            .ok_or(ApiError::NotFound)?;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let mut state = self.record(Call::Delete(id));
        if state.fail_mutations {
            return Err(offline());
        }
        let before = state.stored.len();
        state.stored.retain(|r| r.id() != Some(id));
        if state.stored.len() == before {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}

/// Upload client answering with `https://cdn.test/<file name>`.
///
/// With a gate, each upload waits for one `notify_one` before answering.
#[derive(Clone, Default)]
pub struct FakeUploader {
    pub gate: Option<Arc<Notify>>,
    pub fail: bool,
    pub received: Arc<Mutex<Vec<String>>>,
}

impl FakeUploader {
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let uploader = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (uploader, gate)
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl UploadClient for FakeUploader {
    async fn upload(&self, file: UploadFile) -> Result<String, ApiError> {
        self.received.lock().unwrap().push(file.file_name.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(ApiError::Unexpected {
                status: 500,
                body: "storage unavailable".to_string(),
            });
        }
        Ok(format!("https://cdn.test/{}", file.file_name))
    }
}
