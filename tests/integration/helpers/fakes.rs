// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use provisionrs::domain::models::worker_process::{
    ProcessState, WorkerProcess, LABEL_PROXY_HOST, LABEL_PROXY_PORT, LABEL_TASK_OWNER,
    LABEL_VPN_REGION, PROXY_OWNER_SENTINEL,
};
use provisionrs::domain::repositories::lock_repository::{LockError, LockRepository};
use provisionrs::domain::repositories::runtime_repository::{
    RuntimeError, RuntimeRepository, WorkerSpec,
};
use provisionrs::domain::repositories::storage_repository::{
    StorageError, StorageRepository, StoredObject,
};

/// Scripted behaviour for the next created worker.
#[derive(Debug, Clone)]
pub struct WorkerScript {
    pub exit_code: i64,
    pub wait_error: bool,
    pub result_file: Option<Vec<u8>>,
}

impl WorkerScript {
    pub fn succeeding(result_file: &[u8]) -> Self {
        Self {
            exit_code: 0,
            wait_error: false,
            result_file: Some(result_file.to_vec()),
        }
    }

    pub fn exiting(exit_code: i64) -> Self {
        Self {
            exit_code,
            wait_error: false,
            result_file: None,
        }
    }

    pub fn wait_failing() -> Self {
        Self {
            exit_code: 0,
            wait_error: true,
            result_file: None,
        }
    }
}

#[derive(Debug)]
struct FakeProcess {
    spec: Option<WorkerSpec>,
    labels: HashMap<String, String>,
    script: WorkerScript,
    running: bool,
    removed: bool,
}

#[derive(Default)]
struct RuntimeState {
    processes: HashMap<String, FakeProcess>,
    scripts: VecDeque<WorkerScript>,
    next_id: usize,
    remove_calls: HashMap<String, usize>,
}

/// In-memory container runtime.
///
/// Seeded proxies and scripted workers; every mutation is observable so
/// tests can assert the exactly-once properties.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-provision a proxy process with usable address labels.
    pub fn seed_proxy(&self, id: &str, region: &str) {
        let mut labels = HashMap::new();
        labels.insert(
            LABEL_TASK_OWNER.to_string(),
            PROXY_OWNER_SENTINEL.to_string(),
        );
        labels.insert(LABEL_VPN_REGION.to_string(), region.to_string());
        labels.insert(LABEL_PROXY_HOST.to_string(), format!("{}.proxy.local", id));
        labels.insert(LABEL_PROXY_PORT.to_string(), "8888".to_string());

        let mut state = self.state.lock().unwrap();
        state.processes.insert(
            id.to_string(),
            FakeProcess {
                spec: None,
                labels,
                script: WorkerScript::exiting(0),
                running: true,
                removed: false,
            },
        );
    }

    /// Seed an already-running scraper process (for reaper tests).
    pub fn seed_scraper(&self, id: &str, owner: &str) {
        let mut labels = HashMap::new();
        labels.insert(LABEL_TASK_OWNER.to_string(), owner.to_string());

        let mut state = self.state.lock().unwrap();
        state.processes.insert(
            id.to_string(),
            FakeProcess {
                spec: None,
                labels,
                script: WorkerScript::exiting(0),
                running: true,
                removed: false,
            },
        );
    }

    /// Queue the behaviour for the next `create` call.
    pub fn script_next_worker(&self, script: WorkerScript) {
        self.state.lock().unwrap().scripts.push_back(script);
    }

    pub fn created_spec(&self, id: &str) -> Option<WorkerSpec> {
        self.state
            .lock()
            .unwrap()
            .processes
            .get(id)
            .and_then(|p| p.spec.clone())
    }

    pub fn remove_calls(&self, id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .remove_calls
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_removed(&self, id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .processes
            .get(id)
            .map(|p| p.removed)
            .unwrap_or(false)
    }

    pub fn created_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.processes.values().filter(|p| p.spec.is_some()).count()
    }
}

#[async_trait]
impl RuntimeRepository for FakeRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn pull_image(&self, _image: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn create(&self, spec: &WorkerSpec) -> Result<String, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("worker-{:04}", state.next_id);
        let script = state
            .scripts
            .pop_front()
            .unwrap_or_else(|| WorkerScript::succeeding(b"title,rating\n"));
        state.processes.insert(
            id.clone(),
            FakeProcess {
                labels: spec.labels.clone(),
                spec: Some(spec.clone()),
                script,
                running: false,
                removed: false,
            },
        );
        Ok(id)
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        match state.processes.get_mut(id) {
            Some(process) if !process.removed => {
                process.running = true;
                Ok(())
            }
            _ => Err(RuntimeError::NotFound(id.to_string())),
        }
    }

    async fn wait(&self, id: &str) -> Result<i64, RuntimeError> {
        let script = {
            let mut state = self.state.lock().unwrap();
            let process = state
                .processes
                .get_mut(id)
                .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
            process.running = false;
            process.script.clone()
        };
        if script.wait_error {
            return Err(RuntimeError::Wait("wait stream broke".to_string()));
        }
        Ok(script.exit_code)
    }

    async fn copy_file(&self, id: &str, _path: &str) -> Result<Bytes, RuntimeError> {
        let state = self.state.lock().unwrap();
        let process = state
            .processes
            .get(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        process
            .script
            .result_file
            .clone()
            .map(Bytes::from)
            .ok_or_else(|| RuntimeError::Io("no result file in worker".to_string()))
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        *state.remove_calls.entry(id.to_string()).or_insert(0) += 1;
        match state.processes.get_mut(id) {
            Some(process) if !process.removed => {
                process.removed = true;
                process.running = false;
                Ok(())
            }
            _ => Err(RuntimeError::NotFound(id.to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<WorkerProcess>, RuntimeError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .processes
            .iter()
            .filter(|(_, p)| p.running && !p.removed)
            .map(|(id, p)| WorkerProcess {
                id: id.clone(),
                labels: p.labels.clone(),
                state: ProcessState::Running,
            })
            .collect())
    }

    async fn log_stream(
        &self,
        _id: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, RuntimeError>>, RuntimeError> {
        let lines = vec![
            Ok(Bytes::from_static(b"scraping page 1\n")),
            Ok(Bytes::from_static(b"scraping page 2\n")),
        ];
        Ok(futures::stream::iter(lines).boxed())
    }
}

/// In-memory lock service with set-if-absent semantics.
#[derive(Default)]
pub struct FakeLockService {
    held: Mutex<HashSet<String>>,
    cache: Mutex<HashMap<String, String>>,
}

impl FakeLockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holds(&self, key: &str) -> bool {
        self.held.lock().unwrap().contains(key)
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    pub fn hold(&self, key: &str) {
        self.held.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl LockRepository for FakeLockService {
    async fn acquire(&self, key: &str, _ttl_seconds: usize) -> Result<bool, LockError> {
        Ok(self.held.lock().unwrap().insert(key.to_string()))
    }

    async fn release(&self, key: &str) -> Result<(), LockError> {
        self.held.lock().unwrap().remove(key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, LockError> {
        Ok(self.cache.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl_seconds: usize) -> Result<(), LockError> {
        self.cache
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// In-memory object store.
///
/// `put` reads the staging file eagerly, which also proves the staging
/// copy existed at upload time.
#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<Vec<(String, Vec<u8>, String)>>,
    fail_puts: Mutex<bool>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_puts(&self) {
        *self.fail_puts.lock().unwrap() = true;
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn find(&self, uploaded_by: &str) -> Option<(String, Vec<u8>)> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(_, _, by)| by == uploaded_by)
            .map(|(key, contents, _)| (key.clone(), contents.clone()))
    }
}

#[async_trait]
impl StorageRepository for FakeStorage {
    async fn put(
        &self,
        key: &str,
        path: &std::path::Path,
        uploaded_by: &str,
    ) -> Result<(), StorageError> {
        if *self.fail_puts.lock().unwrap() {
            return Err(StorageError::Other("bucket unavailable".to_string()));
        }
        let contents = std::fs::read(path)?;
        self.objects.lock().unwrap().push((
            key.to_string(),
            contents,
            uploaded_by.to_string(),
        ));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StoredObject>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, contents, _)| StoredObject {
                key: key.clone(),
                size: contents.len() as i64,
                last_modified: "2025-03-08T21:15:30Z".to_string(),
                uploaded_by: None,
            })
            .collect())
    }

    async fn head(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _, _)| k == key)
            .map(|(_, _, by)| by.clone()))
    }
}
