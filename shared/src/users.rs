use std::sync::Arc;

use crate::auth::RoleMap;
use crate::remote::{RemoteSyncQueue, RemoteUserDirectory, RemoteWrite};
use crate::types::{NewUser, Role, User, UserPatch, UserStatus};

/// Where the current user list came from. Surfaced to the admin screens so
/// they can show that the remote directory is not providing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorySource {
    Remote,
    Local,
}

/// Authoritative in-memory account directory for the current session.
/// Mutations apply locally and synchronously; the matching remote write is
/// queued as a background task and its failure never rolls anything back.
pub struct UserDirectory {
    users: Vec<User>,
    source: DirectorySource,
    remote: Option<Arc<dyn RemoteUserDirectory>>,
    queue: Option<RemoteSyncQueue>,
}

impl UserDirectory {
    pub fn new(remote: Option<Arc<dyn RemoteUserDirectory>>) -> Self {
        let queue = remote.clone().and_then(|r| {
            if tokio::runtime::Handle::try_current().is_ok() {
                Some(RemoteSyncQueue::start(r))
            } else {
                tracing::warn!("No async runtime; remote user-directory writes are disabled");
                None
            }
        });
        Self {
            users: seed_users(),
            source: DirectorySource::Local,
            remote,
            queue,
        }
    }

    pub fn local_only() -> Self {
        Self::new(None)
    }

    pub fn with_remote(remote: Arc<dyn RemoteUserDirectory>) -> Self {
        Self::new(Some(remote))
    }

    pub fn all(&self) -> &[User] {
        &self.users
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn source(&self) -> DirectorySource {
        self.source
    }

    /// Count of role = User accounts, the dashboard's "total users" figure.
    pub fn user_count(&self) -> usize {
        self.users.iter().filter(|u| u.role == Role::User).count()
    }

    /// Best-effort refresh from the remote directory. On success the whole
    /// list is replaced; on any failure the existing list stays untouched
    /// so the admin screens remain usable, and the source flips to Local.
    /// Never raises.
    pub async fn reload(&mut self) {
        let Some(remote) = self.remote.clone() else {
            self.source = DirectorySource::Local;
            return;
        };
        match remote.list().await {
            Ok(users) => {
                self.users = users;
                self.source = DirectorySource::Remote;
            }
            Err(e) => {
                tracing::error!("Failed to load users from the remote directory: {e}");
                self.source = DirectorySource::Local;
            }
        }
    }

    /// Registers an account. The id derives from the current count of
    /// role = User records, so ids can repeat after deletions. Accepted:
    /// the directory is keyed by the session's list position in practice.
    pub fn add(&mut self, new: NewUser, roles: &mut RoleMap) -> User {
        let user_count = self.user_count();
        let user = User {
            id: format!("USR-{:03}", user_count + 1),
            name: new.name,
            email: new.email,
            role: new.role,
            member_since: new.member_since,
            total_flights: new.total_flights,
            loyalty_points: new.loyalty_points,
            status: new.status,
            last_login: new.last_login,
        };
        self.users.push(user.clone());
        roles.set_role(&user.email, user.role);
        self.queue_write(RemoteWrite::Upsert(user.clone()));
        tracing::info!("Registered user {} ({})", user.id, user.email);
        user
    }

    /// Merges the patch into the matching account, re-syncs the role map
    /// for its email, and queues a remote upsert of the merged record.
    /// Unknown ids are a silent no-op.
    pub fn update(&mut self, id: &str, patch: UserPatch, roles: &mut RoleMap) {
        let Some(user) = self.users.iter_mut().find(|u| u.id == id) else {
            return;
        };
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(member_since) = patch.member_since {
            user.member_since = member_since;
        }
        if let Some(total_flights) = patch.total_flights {
            user.total_flights = total_flights;
        }
        if let Some(loyalty_points) = patch.loyalty_points {
            user.loyalty_points = loyalty_points;
        }
        if let Some(status) = patch.status {
            user.status = status;
        }
        if let Some(last_login) = patch.last_login {
            user.last_login = last_login;
        }

        let updated = user.clone();
        roles.set_role(&updated.email, updated.role);
        self.queue_write(RemoteWrite::Upsert(updated));
    }

    /// Removes the account. The role map entry for its email resets to the
    /// default role rather than keeping a stale Admin mapping around.
    pub fn delete(&mut self, id: &str, roles: &mut RoleMap) {
        let removed = self.users.iter().find(|u| u.id == id).cloned();
        self.users.retain(|u| u.id != id);
        if let Some(user) = removed {
            roles.set_role(&user.email, Role::User);
            self.queue_write(RemoteWrite::Delete(user.id));
        }
    }

    /// Waits for queued remote writes to be attempted. Test/shutdown aid.
    pub async fn flush_remote(&self) {
        if let Some(queue) = &self.queue {
            queue.flush().await;
        }
    }

    fn queue_write(&self, write: RemoteWrite) {
        if let Some(queue) = &self.queue {
            queue.enqueue(write);
        }
    }
}

/// Accounts shown until the remote directory has answered once.
fn seed_users() -> Vec<User> {
    vec![
        User {
            id: "USR-001".into(),
            name: "John Smith".into(),
            email: "john.smith@example.com".into(),
            role: Role::User,
            member_since: "Jan 2023".into(),
            total_flights: 24,
            loyalty_points: 3450,
            status: UserStatus::Active,
            last_login: "2 hours ago".into(),
        },
        User {
            id: "USR-002".into(),
            name: "Sarah Mitchell".into(),
            email: "sarah.mitchell@example.com".into(),
            role: Role::User,
            member_since: "Mar 2023".into(),
            total_flights: 18,
            loyalty_points: 2890,
            status: UserStatus::Active,
            last_login: "1 day ago".into(),
        },
        User {
            id: "USR-003".into(),
            name: "Michael Chen".into(),
            email: "michael.chen@example.com".into(),
            role: Role::User,
            member_since: "May 2023".into(),
            total_flights: 31,
            loyalty_points: 4720,
            status: UserStatus::Active,
            last_login: "3 hours ago".into(),
        },
        User {
            id: "USR-004".into(),
            name: "Emily Davis".into(),
            email: "emily.davis@example.com".into(),
            role: Role::User,
            member_since: "Feb 2023".into(),
            total_flights: 42,
            loyalty_points: 6180,
            status: UserStatus::Active,
            last_login: "5 days ago".into(),
        },
        User {
            id: "USR-005".into(),
            name: "David Wilson".into(),
            email: "david.wilson@example.com".into(),
            role: Role::User,
            member_since: "Jul 2023".into(),
            total_flights: 12,
            loyalty_points: 1560,
            status: UserStatus::Active,
            last_login: "1 week ago".into(),
        },
        User {
            id: "USR-006".into(),
            name: "Jessica Brown".into(),
            email: "jessica.brown@example.com".into(),
            role: Role::User,
            member_since: "Apr 2023".into(),
            total_flights: 8,
            loyalty_points: 920,
            status: UserStatus::Inactive,
            last_login: "2 weeks ago".into(),
        },
        User {
            id: "ADM-001".into(),
            name: "Admin User".into(),
            email: "admin@skywings.com".into(),
            role: Role::Admin,
            member_since: "Jan 2023".into(),
            total_flights: 0,
            loyalty_points: 0,
            status: UserStatus::Active,
            last_login: "Just now".into(),
        },
    ]
}
