use crate::config::ReplicationConfig;
use async_trait::async_trait;
use shared::config::EnvLookup;
use shared::storage::{ClientFactory, CredentialError, ObjectReader, ScopedClient, StorageError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

pub fn env_from(vars: &[(&str, &str)]) -> EnvLookup {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(move |name| vars.get(name).cloned())
}

pub fn replication_config(source_bucket: &str, target_bucket: &str) -> ReplicationConfig {
    ReplicationConfig {
        source_role_arn: "arn:aws:iam::111111111111:role/reader".into(),
        source_bucket: source_bucket.into(),
        source_region: "us-west-2".into(),
        target_role_arn: "arn:aws:iam::222222222222:role/writer".into(),
        target_bucket: target_bucket.into(),
        target_region: "eu-central-1".into(),
    }
}

pub fn record_json(source: &str, event_name: &str, bucket: &str, key: &str) -> String {
    serde_json::json!({
        "eventVersion": "2.1",
        "eventSource": source,
        "awsRegion": "us-west-2",
        "eventTime": "2019-02-05T21:04:39.123Z",
        "eventName": event_name,
        "s3": {
            "s3SchemaVersion": "1.0",
            "bucket": {"name": bucket, "arn": format!("arn:aws:s3:::{bucket}")},
            "object": {"key": key, "size": 4, "eTag": "8d777f385d3dfec8815d20f7496026dc", "sequencer": "0055AED6DCD90281E5"}
        }
    })
    .to_string()
}

pub fn notification_json(records: &[String]) -> String {
    format!(r#"{{"Records": [{}]}}"#, records.join(","))
}

/// Storage calls as observed by the fake, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Assume { role: String, region: String },
    Get { role: String, bucket: String, key: String },
    Put { role: String, bucket: String, key: String },
    Delete { role: String, bucket: String, key: String },
    WaitUntilAbsent { role: String, bucket: String, key: String },
}

#[derive(Clone, Debug)]
pub struct PutRecord {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, String), Vec<u8>>,
    calls: Vec<Call>,
    puts: Vec<PutRecord>,
    rejected_roles: HashSet<String>,
    deny_writes: bool,
    never_confirm: bool,
    remove_staged_on_put: bool,
}

/// In-memory buckets shared by every client the fake factory hands out.
#[derive(Clone, Default)]
pub struct FakeStorage {
    state: Arc<Mutex<State>>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, body: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert((bucket.into(), key.into()), body.to_vec());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn objects_in(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.state.lock().unwrap().puts.clone()
    }

    pub fn reject_role(&self, role: &str) {
        self.state.lock().unwrap().rejected_roles.insert(role.into());
    }

    pub fn deny_writes(&self) {
        self.state.lock().unwrap().deny_writes = true;
    }

    pub fn never_confirm_absence(&self) {
        self.state.lock().unwrap().never_confirm = true;
    }

    /// Simulates the staged file vanishing underneath the executor.
    pub fn remove_staged_file_on_put(&self) {
        self.state.lock().unwrap().remove_staged_on_put = true;
    }
}

#[async_trait]
impl ClientFactory for FakeStorage {
    async fn client_for(
        &self,
        role: &str,
        region: &str,
    ) -> Result<Box<dyn ScopedClient>, CredentialError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Assume {
            role: role.into(),
            region: region.into(),
        });
        if state.rejected_roles.contains(role) {
            return Err(CredentialError {
                role: role.into(),
                region: region.into(),
                reason: "not authorized to perform sts:AssumeRole".into(),
            });
        }

        Ok(Box::new(FakeClient {
            role: role.into(),
            region: region.into(),
            state: self.state.clone(),
        }))
    }
}

struct FakeClient {
    role: String,
    region: String,
    state: Arc<Mutex<State>>,
}

fn object_id(bucket: &str, key: &str) -> (String, String) {
    (bucket.to_string(), key.to_string())
}

#[async_trait]
impl ScopedClient for FakeClient {
    fn role(&self) -> &str {
        &self.role
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn expires_at(&self) -> Option<SystemTime> {
        None
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader, StorageError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Get {
            role: self.role.clone(),
            bucket: bucket.into(),
            key: key.into(),
        });
        match state.objects.get(&object_id(bucket, key)) {
            Some(body) => Ok(Box::pin(std::io::Cursor::new(body.clone()))),
            None => Err(StorageError::NotFound {
                bucket: bucket.into(),
                key: key.into(),
            }),
        }
    }

    async fn put(&self, bucket: &str, key: &str, source: &Path) -> Result<(), StorageError> {
        let body = tokio::fs::read(source).await?;

        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Put {
            role: self.role.clone(),
            bucket: bucket.into(),
            key: key.into(),
        });
        if state.deny_writes {
            return Err(StorageError::AccessDenied {
                bucket: bucket.into(),
                key: key.into(),
            });
        }
        if state.remove_staged_on_put {
            std::fs::remove_file(source)?;
        }
        state.puts.push(PutRecord {
            bucket: bucket.into(),
            key: key.into(),
            body: body.clone(),
        });
        state.objects.insert(object_id(bucket, key), body);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete {
            role: self.role.clone(),
            bucket: bucket.into(),
            key: key.into(),
        });
        if state.deny_writes {
            return Err(StorageError::AccessDenied {
                bucket: bucket.into(),
                key: key.into(),
            });
        }
        state.objects.remove(&object_id(bucket, key));
        Ok(())
    }

    async fn wait_until_absent(
        &self,
        bucket: &str,
        key: &str,
        _timeout: Duration,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::WaitUntilAbsent {
            role: self.role.clone(),
            bucket: bucket.into(),
            key: key.into(),
        });
        if state.never_confirm || state.objects.contains_key(&object_id(bucket, key)) {
            return Err(StorageError::Timeout {
                bucket: bucket.into(),
                key: key.into(),
            });
        }
        Ok(())
    }
}
