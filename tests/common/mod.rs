//! In-memory stand-ins for the platform, the upstream sources and the store.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use xelis_stats_bot::database::StoreError;
use xelis_stats_bot::platform::{Platform, PlatformError, RemoteSlot};
use xelis_stats_bot::registry::SlotStore;
use xelis_stats_bot::sources::DataSource;
use xelis_stats_bot::types::{RawObservation, SlotBinding, SlotId, Source};

pub const CATEGORY: SlotId = SlotId(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CurrentUser,
    GetContainer(SlotId),
    RenameContainer(SlotId, String),
    GetSlot(SlotId),
    RenameSlot(SlotId, String),
    CreateSlot(SlotId, String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::RenameContainer(..) | Call::RenameSlot(..) | Call::CreateSlot(..)
        )
    }
}

/// Failure injected into the next slot write.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    RateLimited(Option<Duration>),
    Api(u16),
}

impl Fault {
    fn into_error(self) -> PlatformError {
        match self {
            Fault::RateLimited(retry_after) => PlatformError::RateLimited { retry_after },
            Fault::Api(status) => PlatformError::Api {
                status,
                message: "Missing Permissions".to_string(),
            },
        }
    }
}

#[derive(Default)]
struct PlatformState {
    slots: HashMap<SlotId, RemoteSlot>,
    next_id: u64,
    calls: Vec<Call>,
    write_faults: VecDeque<Fault>,
    not_ready_polls: usize,
    ready_rate_limit: Option<Duration>,
}

pub struct FakePlatform {
    state: Mutex<PlatformState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let mut state = PlatformState {
            next_id: 5000,
            ..Default::default()
        };
        state.slots.insert(
            CATEGORY,
            RemoteSlot {
                id: CATEGORY,
                name: "stats".to_string(),
                parent_id: None,
            },
        );
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn fail_next_write(&self, fault: Fault) {
        self.state.lock().unwrap().write_faults.push_back(fault);
    }

    pub fn not_ready_for(&self, polls: usize) {
        self.state.lock().unwrap().not_ready_polls = polls;
    }

    /// The next readiness check is rate limited with the given retry-after.
    pub fn rate_limit_readiness(&self, retry_after: Duration) {
        self.state.lock().unwrap().ready_rate_limit = Some(retry_after);
    }

    pub fn delete_slot(&self, id: SlotId) {
        self.state.lock().unwrap().slots.remove(&id);
    }

    pub fn slot(&self, id: SlotId) -> Option<RemoteSlot> {
        self.state.lock().unwrap().slots.get(&id).cloned()
    }

    /// Slots under the stats category, sorted by name.
    pub fn children(&self) -> Vec<RemoteSlot> {
        let state = self.state.lock().unwrap();
        let mut children: Vec<_> = state
            .slots
            .values()
            .filter(|slot| slot.parent_id == Some(CATEGORY))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> usize {
        self.calls().iter().filter(|call| call.is_write()).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn take_fault(&self) -> Option<PlatformError> {
        self.state
            .lock()
            .unwrap()
            .write_faults
            .pop_front()
            .map(Fault::into_error)
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn current_user(&self) -> Result<String, PlatformError> {
        self.record(Call::CurrentUser);
        let mut state = self.state.lock().unwrap();
        if let Some(retry_after) = state.ready_rate_limit.take() {
            return Err(PlatformError::RateLimited {
                retry_after: Some(retry_after),
            });
        }
        if state.not_ready_polls > 0 {
            state.not_ready_polls -= 1;
            return Err(PlatformError::Api {
                status: 502,
                message: "Bad Gateway".to_string(),
            });
        }
        Ok("stats-bot".to_string())
    }

    async fn get_container(&self, id: SlotId) -> Result<Option<RemoteSlot>, PlatformError> {
        self.record(Call::GetContainer(id));
        Ok(self.slot(id))
    }

    async fn rename_container(&self, id: SlotId, name: &str) -> Result<(), PlatformError> {
        self.record(Call::RenameContainer(id, name.to_string()));
        if let Some(error) = self.take_fault() {
            return Err(error);
        }
        let mut state = self.state.lock().unwrap();
        let slot = state.slots.get_mut(&id).ok_or(PlatformError::NotFound)?;
        slot.name = name.to_string();
        Ok(())
    }

    async fn get_slot(&self, id: SlotId) -> Result<Option<RemoteSlot>, PlatformError> {
        self.record(Call::GetSlot(id));
        Ok(self.slot(id))
    }

    async fn rename_slot(&self, id: SlotId, name: &str) -> Result<(), PlatformError> {
        self.record(Call::RenameSlot(id, name.to_string()));
        if let Some(error) = self.take_fault() {
            return Err(error);
        }
        let mut state = self.state.lock().unwrap();
        let slot = state.slots.get_mut(&id).ok_or(PlatformError::NotFound)?;
        slot.name = name.to_string();
        Ok(())
    }

    async fn create_slot(&self, container: SlotId, name: &str) -> Result<SlotId, PlatformError> {
        self.record(Call::CreateSlot(container, name.to_string()));
        if let Some(error) = self.take_fault() {
            return Err(error);
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = SlotId(state.next_id);
        state.slots.insert(
            id,
            RemoteSlot {
                id,
                name: name.to_string(),
                parent_id: Some(container),
            },
        );
        Ok(id)
    }
}

/// Store that keeps bindings in a map and can be told to fail writes.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, SlotId>>,
    fail_upserts: AtomicBool,
}

impl MemoryStore {
    pub fn with_rows(rows: &[(&str, u64)]) -> Self {
        let store = Self::default();
        {
            let mut map = store.rows.lock().unwrap();
            for (name, id) in rows {
                map.insert(name.to_string(), SlotId(*id));
            }
        }
        store
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, name: &str) -> Option<SlotId> {
        self.rows.lock().unwrap().get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl SlotStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<SlotBinding>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(name, id)| SlotBinding::new(name, *id))
            .collect())
    }

    async fn upsert(&self, binding: &SlotBinding) -> Result<(), StoreError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.rows
            .lock()
            .unwrap()
            .insert(binding.name.clone(), binding.id);
        Ok(())
    }
}

/// Canned upstream responses with per-source fetch counters.
#[derive(Default)]
pub struct FakeSource {
    responses: Mutex<HashMap<Source, RawObservation>>,
    fetches: Mutex<HashMap<Source, usize>>,
}

impl FakeSource {
    pub fn set(&self, source: Source, observation: RawObservation) {
        self.responses.lock().unwrap().insert(source, observation);
    }

    pub fn fetches(&self, source: &Source) -> usize {
        self.fetches.lock().unwrap().get(source).copied().unwrap_or(0)
    }
}

#[async_trait]
impl DataSource for FakeSource {
    async fn fetch(&self, source: &Source) -> RawObservation {
        *self.fetches.lock().unwrap().entry(source.clone()).or_default() += 1;
        self.responses
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .unwrap_or_else(|| RawObservation::unavailable("connection refused"))
    }
}
