use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::types::AttributeType;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::store::{LocalStore, MOCK_USER_KEY, ROLES_KEY};
use crate::types::Role;

// ========== ROLE MAP ==========

/// Durable lowercase-email -> role map. This is the actual authorization
/// signal consulted when a principal is resolved, independent of the user
/// directory, which may be stale or remote-sourced.
pub struct RoleMap {
    store: LocalStore,
    map: HashMap<String, Role>,
}

impl RoleMap {
    pub fn load(store: LocalStore) -> Self {
        let map = store.read_json_or(ROLES_KEY, HashMap::new);
        Self { store, map }
    }

    pub fn role_for(&self, email: &str) -> Option<Role> {
        self.map.get(&email.to_lowercase()).copied()
    }

    pub fn set_role(&mut self, email: &str, role: Role) {
        self.map.insert(email.to_lowercase(), role);
        self.store.write_json(ROLES_KEY, &self.map);
    }
}

// ========== PRINCIPAL ==========

/// The authenticated identity as supplied by the provider, before role
/// resolution.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: Option<String>,
    pub last_sign_in: Option<String>,
}

/// A principal wrapped with its resolved role. `role` is None when the
/// email has no mapping; callers treat that as the default, non-admin case.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(flatten)]
    pub principal: Principal,
    pub role: Option<Role>,
}

pub fn resolve(principal: Principal, roles: &RoleMap) -> AuthUser {
    let role = principal
        .email
        .as_deref()
        .and_then(|email| roles.role_for(email));
    AuthUser { principal, role }
}

/// The session principal the app starts with: a mock session persisted by a
/// previous run wins over whatever the real provider reports.
pub fn startup_principal(store: &LocalStore, provider: &dyn IdentityProvider) -> Option<Principal> {
    if let Some(raw) = store.get(MOCK_USER_KEY) {
        match serde_json::from_str::<Principal>(&raw) {
            Ok(principal) => return Some(principal),
            Err(e) => {
                tracing::warn!("Discarding unreadable mock session: {e}");
                store.remove(MOCK_USER_KEY);
            }
        }
    }
    provider.subscribe().borrow().clone()
}

// ========== IDENTITY PROVIDER ==========

/// External identity provider contract. `subscribe` yields the current
/// session immediately (or None when signed out) and every change after.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal>;
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Principal>;
    async fn sign_out(&self) -> Result<()>;
    fn subscribe(&self) -> watch::Receiver<Option<Principal>>;
}

type HmacSha256 = Hmac<Sha256>;

/// Compute the SECRET_HASH for Cognito authentication
fn compute_secret_hash(username: &str, client_id: &str, client_secret: &str) -> String {
    let message = format!("{}{}", username, client_id);
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    general_purpose::STANDARD.encode(result.into_bytes())
}

/// Cognito-backed identity provider.
pub struct CognitoIdentityProvider {
    client: CognitoClient,
    client_id: String,
    client_secret: String,
    user_pool_id: Option<String>,
    state: watch::Sender<Option<Principal>>,
}

impl CognitoIdentityProvider {
    pub fn new(
        client: CognitoClient,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_pool_id: Option<String>,
    ) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_pool_id,
            state,
        }
    }

    fn principal_for(&self, email: &str, display_name: Option<&str>) -> Principal {
        let now = chrono::Utc::now().to_rfc3339();
        Principal {
            uid: email.to_lowercase(),
            email: Some(email.to_string()),
            display_name: display_name.map(str::to_string),
            photo_url: None,
            created_at: None,
            last_sign_in: Some(now),
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal> {
        tracing::info!("Authenticating user: {}", email);

        let secret_hash = compute_secret_hash(email, &self.client_id, &self.client_secret);

        let auth_result = self
            .client
            .initiate_auth()
            .auth_flow(aws_sdk_cognitoidentityprovider::types::AuthFlowType::UserPasswordAuth)
            .client_id(&self.client_id)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password)
            .auth_parameters("SECRET_HASH", &secret_hash)
            .send()
            .await;

        match auth_result {
            Ok(response) => {
                if response.authentication_result().is_none() {
                    tracing::error!("No authentication result returned");
                    return Err(Error::Auth("No authentication result returned".into()));
                }
                tracing::info!("Authentication successful for user: {}", email);
                let principal = self.principal_for(email, None);
                self.state.send_replace(Some(principal.clone()));
                Ok(principal)
            }
            Err(e) => {
                let error_message = format!("{:?}", e);
                tracing::error!("Cognito authentication error: {}", error_message);

                // Extract user-friendly error message
                let user_message = if error_message.contains("NotAuthorizedException") {
                    "Incorrect email or password"
                } else if error_message.contains("UserNotConfirmedException") {
                    "Please verify your email before logging in"
                } else if error_message.contains("UserNotFoundException") {
                    "No account found with this email"
                } else if error_message.contains("PasswordResetRequiredException") {
                    "Password reset required"
                } else if error_message.contains("TooManyRequestsException") {
                    "Too many login attempts. Please try again later"
                } else {
                    "Login failed. Please check your credentials"
                };
                Err(Error::Auth(user_message.into()))
            }
        }
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Principal> {
        tracing::info!("Signing up user: {}", email);

        let secret_hash = compute_secret_hash(email, &self.client_id, &self.client_secret);

        let mut signup = self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .secret_hash(&secret_hash)
            .user_attributes(
                AttributeType::builder()
                    .name("email")
                    .value(email)
                    .build()
                    .map_err(|e| Error::Auth(format!("invalid email attribute: {e}")))?,
            );
        if let Some(name) = display_name {
            signup = signup.user_attributes(
                AttributeType::builder()
                    .name("name")
                    .value(name)
                    .build()
                    .map_err(|e| Error::Auth(format!("invalid name attribute: {e}")))?,
            );
        }

        match signup.send().await {
            Ok(_response) => {
                tracing::info!("Signup successful for user: {}", email);

                // Best-effort auto-confirm; the user can still verify via
                // email if this fails.
                if let Some(user_pool_id) = &self.user_pool_id {
                    if let Err(e) = self
                        .client
                        .admin_confirm_sign_up()
                        .user_pool_id(user_pool_id)
                        .username(email)
                        .send()
                        .await
                    {
                        tracing::error!("Failed to auto-confirm user: {:?}", e);
                    } else {
                        tracing::info!("User auto-confirmed: {}", email);
                    }
                } else {
                    tracing::warn!("No user pool id configured; skipping auto-confirm");
                }

                let mut principal = self.principal_for(email, display_name);
                principal.created_at = principal.last_sign_in.clone();
                self.state.send_replace(Some(principal.clone()));
                Ok(principal)
            }
            Err(e) => {
                let error_message = format!("{:?}", e);
                tracing::error!("Cognito signup error: {}", error_message);

                let user_message = if error_message.contains("InvalidPasswordException") {
                    "Password must contain at least 8 characters with uppercase, lowercase, number, and special character"
                } else if error_message.contains("UsernameExistsException") {
                    "An account with this email already exists"
                } else if error_message.contains("InvalidParameterException") {
                    "Invalid email or password format"
                } else {
                    "Signup failed. Please check your credentials and try again."
                };
                Err(Error::Auth(user_message.into()))
            }
        }
    }

    async fn sign_out(&self) -> Result<()> {
        self.state.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.state.subscribe()
    }
}

// ========== MOCK PROVIDER ==========

/// Identity provider for environments without a real one. Sessions persist
/// under the mock-principal store key and restore on the next start.
pub struct MockIdentityProvider {
    store: LocalStore,
    state: watch::Sender<Option<Principal>>,
}

impl MockIdentityProvider {
    pub fn new(store: LocalStore) -> Self {
        let restored = store.get(MOCK_USER_KEY).and_then(|raw| {
            match serde_json::from_str::<Principal>(&raw) {
                Ok(principal) => Some(principal),
                Err(e) => {
                    tracing::warn!("Discarding unreadable mock session: {e}");
                    store.remove(MOCK_USER_KEY);
                    None
                }
            }
        });
        let (state, _) = watch::channel(restored);
        Self { store, state }
    }

    fn mock_principal(&self, email: &str, display_name: Option<&str>) -> Principal {
        let now = chrono::Utc::now().to_rfc3339();
        Principal {
            uid: format!("mock_{}", uuid::Uuid::new_v4().simple()),
            email: Some(email.to_string()),
            display_name: display_name
                .map(str::to_string)
                .or_else(|| email.split('@').next().map(str::to_string)),
            photo_url: None,
            created_at: Some(now.clone()),
            last_sign_in: Some(now),
        }
    }

    fn establish(&self, principal: Principal) -> Principal {
        self.store.write_json(MOCK_USER_KEY, &principal);
        self.state.send_replace(Some(principal.clone()));
        principal
    }

    /// Creates and signs in a mock session with an explicit role mapping.
    pub fn create_mock_user(
        &self,
        email: &str,
        role: Role,
        display_name: Option<&str>,
        roles: &mut RoleMap,
    ) -> Principal {
        roles.set_role(email, role);
        self.establish(self.mock_principal(email, display_name))
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    /// Accepts any credentials; the mock exists to exercise the signed-in
    /// flows, not to gate them.
    async fn sign_in(&self, email: &str, _password: &str) -> Result<Principal> {
        Ok(self.establish(self.mock_principal(email, None)))
    }

    async fn register(
        &self,
        email: &str,
        _password: &str,
        display_name: Option<&str>,
    ) -> Result<Principal> {
        Ok(self.establish(self.mock_principal(email, display_name)))
    }

    async fn sign_out(&self) -> Result<()> {
        self.store.remove(MOCK_USER_KEY);
        self.state.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open(dir.path());
        (dir, store)
    }

    #[test]
    fn role_lookup_is_case_insensitive() {
        let (_dir, store) = temp_store();
        let mut roles = RoleMap::load(store);
        roles.set_role("A@B.com", Role::Admin);
        assert_eq!(roles.role_for("a@b.com"), Some(Role::Admin));
        assert_eq!(roles.role_for("A@B.COM"), Some(Role::Admin));
    }

    #[test]
    fn unknown_email_resolves_to_no_role() {
        let (_dir, store) = temp_store();
        let roles = RoleMap::load(store);
        assert_eq!(roles.role_for("nobody@example.com"), None);
    }

    #[test]
    fn role_map_survives_a_reload() {
        let (_dir, store) = temp_store();
        let mut roles = RoleMap::load(store.clone());
        roles.set_role("admin@skywings.com", Role::Admin);

        let reloaded = RoleMap::load(store);
        assert_eq!(reloaded.role_for("admin@skywings.com"), Some(Role::Admin));
    }

    #[test]
    fn resolve_attaches_the_mapped_role() {
        let (_dir, store) = temp_store();
        let mut roles = RoleMap::load(store);
        roles.set_role("admin@skywings.com", Role::Admin);

        let principal = Principal {
            uid: "abc".into(),
            email: Some("Admin@SkyWings.com".into()),
            display_name: None,
            photo_url: None,
            created_at: None,
            last_sign_in: None,
        };
        let user = resolve(principal, &roles);
        assert_eq!(user.role, Some(Role::Admin));
    }

    #[tokio::test]
    async fn mock_session_persists_and_restores() {
        let (_dir, store) = temp_store();
        let mut roles = RoleMap::load(store.clone());
        let provider = MockIdentityProvider::new(store.clone());
        let principal =
            provider.create_mock_user("admin@skywings.com", Role::Admin, Some("Admin"), &mut roles);

        // A fresh provider over the same store restores the session.
        let restored = MockIdentityProvider::new(store);
        assert_eq!(restored.subscribe().borrow().clone(), Some(principal));
    }

    #[tokio::test]
    async fn mock_sign_out_clears_the_session() {
        let (_dir, store) = temp_store();
        let provider = MockIdentityProvider::new(store.clone());
        provider.sign_in("john@example.com", "pw").await.expect("sign in");
        provider.sign_out().await.expect("sign out");
        assert!(provider.subscribe().borrow().is_none());
        assert!(store.get(MOCK_USER_KEY).is_none());
    }

    #[tokio::test]
    async fn startup_prefers_the_persisted_mock_session() {
        let (_dir, store) = temp_store();
        let mut roles = RoleMap::load(store.clone());
        let mock = MockIdentityProvider::new(store.clone());
        let mock_principal =
            mock.create_mock_user("admin@skywings.com", Role::Admin, None, &mut roles);

        // A different provider instance is signed in as someone else; the
        // persisted mock session still wins.
        let (_other_dir, other_store) = temp_store();
        let other = MockIdentityProvider::new(other_store);
        other.sign_in("someone@example.com", "pw").await.expect("sign in");
        assert_eq!(startup_principal(&store, &other), Some(mock_principal));
    }

    #[test]
    fn startup_discards_an_unreadable_mock_session() {
        let (_dir, store) = temp_store();
        let (_other_dir, other_store) = temp_store();
        let provider = MockIdentityProvider::new(other_store);
        store.put(MOCK_USER_KEY, "{not json");
        assert_eq!(startup_principal(&store, &provider), None);
        assert!(store.get(MOCK_USER_KEY).is_none());
    }

    #[test]
    fn secret_hash_is_stable_for_fixed_inputs() {
        let a = compute_secret_hash("john@example.com", "client-id", "client-secret");
        let b = compute_secret_hash("john@example.com", "client-id", "client-secret");
        assert_eq!(a, b);
        assert_ne!(a, compute_secret_hash("jane@example.com", "client-id", "client-secret"));
    }
}
