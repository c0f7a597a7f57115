use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::types::{Role, User, UserStatus};

/// The remote user directory holds the canonical multi-device User records.
/// Every call may fail; callers catch and degrade to local-only operation.
#[async_trait]
pub trait RemoteUserDirectory: Send + Sync {
    async fn list(&self) -> Result<Vec<User>>;
    async fn upsert(&self, id: &str, user: &User) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// DynamoDB-backed directory. User records live in a single table under
/// PK = SK = "USER#<id>".
pub struct DynamoUserDirectory {
    client: DynamoClient,
    table_name: String,
}

impl DynamoUserDirectory {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl RemoteUserDirectory for DynamoUserDirectory {
    async fn list(&self) -> Result<Vec<User>> {
        let result = self
            .client
            .scan()
            .table_name(&self.table_name)
            .filter_expression("begins_with(PK, :prefix)")
            .expression_attribute_values(":prefix", AttributeValue::S("USER#".to_string()))
            .send()
            .await
            .map_err(|e| Error::Remote(format!("scan failed: {e}")))?;

        let mut users = Vec::new();
        for item in result.items() {
            if let Some(user) = user_from_item(item) {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn upsert(&self, id: &str, user: &User) -> Result<()> {
        let pk = format!("USER#{}", id);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(pk.clone()))
            .item("SK", AttributeValue::S(pk))
            .item("name", AttributeValue::S(user.name.clone()))
            .item("email", AttributeValue::S(user.email.clone()))
            .item("role", AttributeValue::S(user.role.as_str().to_string()))
            .item("member_since", AttributeValue::S(user.member_since.clone()))
            .item("total_flights", AttributeValue::N(user.total_flights.to_string()))
            .item("loyalty_points", AttributeValue::N(user.loyalty_points.to_string()))
            .item("status", AttributeValue::S(user.status.as_str().to_string()))
            .item("last_login", AttributeValue::S(user.last_login.clone()))
            .send()
            .await
            .map_err(|e| Error::Remote(format!("put_item failed: {e}")))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let pk = format!("USER#{}", id);

        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .send()
            .await
            .map_err(|e| Error::Remote(format!("delete_item failed: {e}")))?;
        Ok(())
    }
}

fn user_from_item(item: &HashMap<String, AttributeValue>) -> Option<User> {
    let id = item
        .get("PK")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| s.strip_prefix("USER#"))?
        .to_string();

    let string_attr = |name: &str| {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default()
    };
    let number_attr = |name: &str| {
        item.get(name)
            .and_then(|v| v.as_n().ok())
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or_default()
    };

    Some(User {
        id,
        name: string_attr("name"),
        email: string_attr("email"),
        role: parse_role(&string_attr("role")),
        member_since: string_attr("member_since"),
        total_flights: number_attr("total_flights"),
        loyalty_points: number_attr("loyalty_points"),
        status: parse_status(&string_attr("status")),
        last_login: string_attr("last_login"),
    })
}

fn parse_role(s: &str) -> Role {
    match s {
        "Admin" => Role::Admin,
        _ => Role::User,
    }
}

fn parse_status(s: &str) -> UserStatus {
    match s {
        "Suspended" => UserStatus::Suspended,
        "Inactive" => UserStatus::Inactive,
        _ => UserStatus::Active,
    }
}

/// Process-local directory. Backs tests and fully offline operation, and
/// can be switched into a failing mode to exercise degradation paths.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    docs: Mutex<HashMap<String, User>>,
    failing: std::sync::atomic::AtomicBool,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        let directory = Self::default();
        {
            let mut docs = directory.docs.lock().expect("directory lock");
            for user in users {
                docs.insert(user.id.clone(), user);
            }
        }
        directory
    }

    /// Makes every subsequent call fail, simulating an unreachable backend.
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<User> {
        let mut users: Vec<User> = self
            .docs
            .lock()
            .expect("directory lock")
            .values()
            .cloned()
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::Remote("directory unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteUserDirectory for InMemoryUserDirectory {
    async fn list(&self) -> Result<Vec<User>> {
        self.check_available()?;
        Ok(self.snapshot())
    }

    async fn upsert(&self, id: &str, user: &User) -> Result<()> {
        self.check_available()?;
        self.docs
            .lock()
            .expect("directory lock")
            .insert(id.to_string(), user.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check_available()?;
        self.docs.lock().expect("directory lock").remove(id);
        Ok(())
    }
}

/// A pending remote write. Writes carry value copies, so a later local
/// mutation never changes what an already-queued write sends.
#[derive(Debug)]
pub enum RemoteWrite {
    Upsert(User),
    Delete(String),
    /// Acks once every write queued before it has been attempted.
    Flush(oneshot::Sender<()>),
}

/// Background queue that decouples remote writes from the caller's control
/// flow. Writes are attempted in order with one retry; failures are logged
/// and dropped; they never roll back the local mutation that queued them.
pub struct RemoteSyncQueue {
    tx: mpsc::UnboundedSender<RemoteWrite>,
}

impl RemoteSyncQueue {
    /// Starts the drain task on the current runtime.
    pub fn start(remote: std::sync::Arc<dyn RemoteUserDirectory>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(write) = rx.recv().await {
                match write {
                    RemoteWrite::Upsert(user) => {
                        let mut result = remote.upsert(&user.id, &user).await;
                        if let Err(e) = &result {
                            tracing::warn!("Remote upsert failed, retrying once: {e}");
                            result = remote.upsert(&user.id, &user).await;
                        }
                        if let Err(e) = result {
                            tracing::error!("Remote upsert for {} failed: {e}", user.id);
                        }
                    }
                    RemoteWrite::Delete(id) => {
                        let mut result = remote.delete(&id).await;
                        if let Err(e) = &result {
                            tracing::warn!("Remote delete failed, retrying once: {e}");
                            result = remote.delete(&id).await;
                        }
                        if let Err(e) = result {
                            tracing::error!("Remote delete for {} failed: {e}", id);
                        }
                    }
                    RemoteWrite::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self { tx }
    }

    pub fn enqueue(&self, write: RemoteWrite) {
        if self.tx.send(write).is_err() {
            tracing::warn!("Remote sync queue is gone; dropping write");
        }
    }

    /// Waits until every previously queued write has been attempted.
    /// Test and shutdown aid; ordinary callers never wait on the queue.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(RemoteWrite::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample_user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            name: "Test User".into(),
            email: email.into(),
            role: Role::User,
            member_since: "Jan 2024".into(),
            total_flights: 0,
            loyalty_points: 0,
            status: UserStatus::Active,
            last_login: "Just now".into(),
        }
    }

    #[tokio::test]
    async fn in_memory_directory_round_trips() {
        let directory = InMemoryUserDirectory::new();
        let user = sample_user("USR-001", "a@b.com");
        directory.upsert(&user.id, &user).await.expect("upsert");
        assert_eq!(directory.list().await.expect("list"), vec![user.clone()]);
        directory.delete(&user.id).await.expect("delete");
        assert!(directory.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn failing_directory_rejects_every_call() {
        let directory = InMemoryUserDirectory::new();
        directory.set_failing(true);
        assert!(directory.list().await.is_err());
        assert!(directory.delete("USR-001").await.is_err());
    }

    #[tokio::test]
    async fn queue_applies_writes_in_order() {
        let directory = Arc::new(InMemoryUserDirectory::new());
        let queue = RemoteSyncQueue::start(directory.clone());

        let user = sample_user("USR-001", "a@b.com");
        queue.enqueue(RemoteWrite::Upsert(user.clone()));
        queue.enqueue(RemoteWrite::Delete(user.id.clone()));
        queue.enqueue(RemoteWrite::Upsert(sample_user("USR-002", "c@d.com")));
        queue.flush().await;

        let remaining = directory.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "USR-002");
    }

    #[tokio::test]
    async fn queue_swallows_remote_failures() {
        let directory = Arc::new(InMemoryUserDirectory::new());
        let queue = RemoteSyncQueue::start(directory.clone());

        directory.set_failing(true);
        queue.enqueue(RemoteWrite::Upsert(sample_user("USR-001", "a@b.com")));
        queue.flush().await;
        assert!(directory.snapshot().is_empty());

        // The queue keeps draining after failures.
        directory.set_failing(false);
        queue.enqueue(RemoteWrite::Upsert(sample_user("USR-002", "c@d.com")));
        queue.flush().await;
        assert_eq!(directory.snapshot().len(), 1);
    }
}
