//! Hand-written mock stores shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use idsync_engine::{SyncResult, WatermarkStore};
use idsync_store::{
    CrossReference, DirectoryStore, GroupRef, HrStore, Record, RecordKey, RegistryLookup,
    RegistryPerson, ReportEnvelope, Reporter, StoreError, StoreResult,
};

pub fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
}

/// Directory store over an in-memory record map.
pub struct MockDirectory {
    records: Mutex<HashMap<String, Record>>,
    groups: HashMap<String, BTreeSet<RecordKey>>,
    save_calls: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_save_for: Mutex<HashSet<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MockDirectory {
    pub fn new(records: Vec<Record>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.key.as_str().to_lowercase(), r))
            .collect();
        Self {
            records: Mutex::new(records),
            groups: HashMap::new(),
            save_calls: AtomicUsize::new(0),
            fail_fetch: AtomicBool::new(false),
            fail_save_for: Mutex::new(HashSet::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_group(mut self, name: &str, members: &[&str]) -> Self {
        self.groups.insert(
            name.to_string(),
            members.iter().map(|m| RecordKey::new(*m)).collect(),
        );
        self
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_save_for(&self, key: &str) {
        self.fail_save_for
            .lock()
            .unwrap()
            .insert(key.to_lowercase());
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, key: &str) -> Option<Record> {
        self.records.lock().unwrap().get(&key.to_lowercase()).cloned()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryStore for MockDirectory {
    async fn fetch_modified_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Record>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("directory down"));
        }
        let mut records: Vec<Record> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.modified_at > since)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    async fn fetch_by_key(&self, key: &RecordKey) -> StoreResult<Option<Record>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&key.as_str().to_lowercase())
            .cloned())
    }

    async fn fetch_group_members(&self, group: &GroupRef) -> StoreResult<BTreeSet<RecordKey>> {
        self.groups
            .get(group.as_str())
            .cloned()
            .ok_or_else(|| StoreError::group_not_found(group.as_str()))
    }

    async fn save(&self, record: &Record) -> StoreResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let key = record.key.as_str().to_lowercase();
        if self.fail_save_for.lock().unwrap().contains(&key) {
            return Err(StoreError::save_failed(record.key.as_str(), "directory busy"));
        }
        self.records.lock().unwrap().insert(key, record.clone());
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<()> {
        let lower = key.as_str().to_lowercase();
        self.deleted.lock().unwrap().push(lower.clone());
        self.records.lock().unwrap().remove(&lower);
        Ok(())
    }
}

/// HR store over an in-memory record map.
pub struct MockHr {
    records: Mutex<HashMap<String, Record>>,
    save_calls: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_save_for: Mutex<HashSet<String>>,
}

impl MockHr {
    pub fn new(records: Vec<Record>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.key.as_str().to_lowercase(), r))
            .collect();
        Self {
            records: Mutex::new(records),
            save_calls: AtomicUsize::new(0),
            fail_fetch: AtomicBool::new(false),
            fail_save_for: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_save_for(&self, key: &str) {
        self.fail_save_for
            .lock()
            .unwrap()
            .insert(key.to_lowercase());
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, key: &str) -> Option<Record> {
        self.records.lock().unwrap().get(&key.to_lowercase()).cloned()
    }
}

#[async_trait]
impl HrStore for MockHr {
    async fn fetch_modified_since(
        &self,
        since: DateTime<Utc>,
        _active_only: bool,
    ) -> StoreResult<Vec<Record>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("hr store down"));
        }
        let mut records: Vec<Record> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.modified_at > since)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    async fn save(&self, record: &Record, _cascade: bool) -> StoreResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let key = record.key.as_str().to_lowercase();
        if self.fail_save_for.lock().unwrap().contains(&key) {
            return Err(StoreError::save_failed(record.key.as_str(), "hr store busy"));
        }
        self.records.lock().unwrap().insert(key, record.clone());
        Ok(())
    }
}

/// Cross-reference over in-memory maps.
#[derive(Default)]
pub struct MockXref {
    pub hr_records: HashMap<String, Record>,
    pub keys_by_id: HashMap<String, RecordKey>,
}

impl MockXref {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_hr_record(mut self, key_or_dn: &str, record: Record) -> Self {
        self.hr_records.insert(key_or_dn.to_lowercase(), record);
        self
    }
}

#[async_trait]
impl CrossReference for MockXref {
    async fn directory_key_for_hr(&self, hr_id: &str) -> StoreResult<Option<RecordKey>> {
        Ok(self.keys_by_id.get(hr_id).cloned())
    }

    async fn hr_record_for_directory_key(&self, key: &RecordKey) -> StoreResult<Option<Record>> {
        Ok(self.hr_records.get(&key.as_str().to_lowercase()).cloned())
    }
}

/// In-memory watermark store.
#[derive(Default)]
pub struct MockWatermarks {
    values: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MockWatermarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, job: &str) -> Option<DateTime<Utc>> {
        self.values.lock().unwrap().get(job).copied()
    }

    pub fn clear(&self, job: &str) {
        self.values.lock().unwrap().remove(job);
    }
}

#[async_trait]
impl WatermarkStore for MockWatermarks {
    async fn get(&self, job: &str) -> SyncResult<Option<DateTime<Utc>>> {
        Ok(self.values.lock().unwrap().get(job).copied())
    }

    async fn set(&self, job: &str, value: DateTime<Utc>) -> SyncResult<()> {
        self.values.lock().unwrap().insert(job.to_string(), value);
        Ok(())
    }
}

/// Reporter capturing every delivered envelope.
#[derive(Default)]
pub struct MockReporter {
    envelopes: Mutex<Vec<ReportEnvelope>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<ReportEnvelope> {
        self.envelopes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reporter for MockReporter {
    async fn deliver(&self, envelope: &ReportEnvelope) -> StoreResult<()> {
        self.envelopes.lock().unwrap().push(envelope.clone());
        Ok(())
    }
}

/// Registry lookup over an in-memory map.
#[derive(Default)]
pub struct MockRegistry {
    pub persons: HashMap<String, RegistryPerson>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_person(mut self, national_id: &str, person: RegistryPerson) -> Self {
        self.persons.insert(national_id.to_string(), person);
        self
    }
}

#[async_trait]
impl RegistryLookup for MockRegistry {
    async fn lookup(&self, national_id: &str) -> StoreResult<Option<RegistryPerson>> {
        Ok(self.persons.get(national_id).cloned())
    }
}
