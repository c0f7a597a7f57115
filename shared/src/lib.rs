pub mod auth;
pub mod bookings;
pub mod error;
pub mod flights;
pub mod remote;
pub mod store;
pub mod types;
pub mod users;
pub mod views;

pub use error::{Error, Result};

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::{AuthUser, CognitoIdentityProvider, IdentityProvider, MockIdentityProvider, RoleMap};
use crate::bookings::BookingLedger;
use crate::flights::FlightDirectory;
use crate::remote::{DynamoUserDirectory, RemoteUserDirectory};
use crate::store::LocalStore;
use crate::types::{Booking, CabinClass, NewUser, Role, User, UserPatch};
use crate::users::UserDirectory;
use crate::views::DashboardSnapshot;

/// Runtime configuration, read from the environment at startup. The remote
/// directory and the Cognito provider are both optional; leaving them
/// unconfigured gives a fully local installation.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub table_name: Option<String>,
    pub cognito_client_id: Option<String>,
    pub cognito_client_secret: Option<String>,
    pub cognito_user_pool_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("SKYWINGS_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
            table_name: std::env::var("TABLE_NAME").ok(),
            cognito_client_id: std::env::var("COGNITO_CLIENT_ID").ok(),
            cognito_client_secret: std::env::var("COGNITO_CLIENT_SECRET").ok(),
            cognito_user_pool_id: std::env::var("COGNITO_USER_POOL_ID").ok(),
        }
    }
}

/// Shared application state: the three domain containers, the role map and
/// the identity provider, constructed once at startup and handed to the
/// screens. Tests build fresh instances instead of sharing globals.
pub struct AppState {
    pub store: LocalStore,
    pub flights: FlightDirectory,
    pub bookings: BookingLedger,
    pub users: UserDirectory,
    pub roles: RoleMap,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Full startup: load every container from the durable store, wire the
    /// configured collaborators, and do a best-effort first load of the
    /// remote user directory. Collaborator outages never fail startup.
    pub async fn init(config: Config) -> Self {
        let store = LocalStore::open(&config.data_dir);
        let flights = FlightDirectory::load(store.clone());
        let bookings = BookingLedger::load(store.clone());
        let roles = RoleMap::load(store.clone());

        let needs_aws = config.table_name.is_some() || config.cognito_client_id.is_some();
        let aws = if needs_aws {
            Some(aws_config::load_from_env().await)
        } else {
            None
        };

        let remote: Option<Arc<dyn RemoteUserDirectory>> = match (&config.table_name, &aws) {
            (Some(table), Some(aws)) => Some(Arc::new(DynamoUserDirectory::new(
                aws_sdk_dynamodb::Client::new(aws),
                table.clone(),
            ))),
            _ => None,
        };
        let mut users = UserDirectory::new(remote);
        users.reload().await;

        let identity: Arc<dyn IdentityProvider> = match (
            &config.cognito_client_id,
            &config.cognito_client_secret,
            &aws,
        ) {
            (Some(client_id), Some(client_secret), Some(aws)) => {
                Arc::new(CognitoIdentityProvider::new(
                    aws_sdk_cognitoidentityprovider::Client::new(aws),
                    client_id.clone(),
                    client_secret.clone(),
                    config.cognito_user_pool_id.clone(),
                ))
            }
            _ => {
                tracing::info!("No identity provider configured; using mock sessions");
                Arc::new(MockIdentityProvider::new(store.clone()))
            }
        };

        Self {
            store,
            flights,
            bookings,
            users,
            roles,
            identity,
        }
    }

    /// Local-only state: no remote directory, mock identity. What tests and
    /// offline installations use.
    pub fn offline(data_dir: impl Into<PathBuf>) -> Self {
        let store = LocalStore::open(data_dir);
        Self {
            flights: FlightDirectory::load(store.clone()),
            bookings: BookingLedger::load(store.clone()),
            users: UserDirectory::local_only(),
            roles: RoleMap::load(store.clone()),
            identity: Arc::new(MockIdentityProvider::new(store.clone())),
            store,
        }
    }

    /// The signed-in user, if any, wrapped with its resolved role. A
    /// persisted mock session takes precedence over the real provider.
    pub fn current_user(&self) -> Option<AuthUser> {
        auth::startup_principal(&self.store, self.identity.as_ref())
            .map(|principal| auth::resolve(principal, &self.roles))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let principal = self.identity.sign_in(email, password).await?;
        Ok(auth::resolve(principal, &self.roles))
    }

    /// Registers with the identity provider and records the chosen role for
    /// the new account's email.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        role: Role,
    ) -> Result<AuthUser> {
        let principal = self.identity.register(email, password, display_name).await?;
        self.roles.set_role(email, role);
        Ok(auth::resolve(principal, &self.roles))
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.identity.sign_out().await
    }

    // Directory mutations route through here so the role-map side effects
    // always happen.

    pub fn add_user(&mut self, new: NewUser) -> User {
        self.users.add(new, &mut self.roles)
    }

    pub fn update_user(&mut self, id: &str, patch: UserPatch) {
        self.users.update(id, patch, &mut self.roles);
    }

    pub fn delete_user(&mut self, id: &str) {
        self.users.delete(id, &mut self.roles);
    }

    /// Books a seat on a flight for a passenger, copying the flight fields
    /// into the booking by value.
    pub fn book_flight(
        &mut self,
        flight_id: u32,
        passenger: &str,
        seat: &str,
        cabin: CabinClass,
    ) -> Result<Booking> {
        let Some(flight) = self.flights.get(flight_id) else {
            return Err(Error::Validation(format!("unknown flight {flight_id}")));
        };
        let draft = views::booking_draft(flight, passenger, seat, cabin);
        self.bookings.create(draft)
    }

    pub fn dashboard(&self) -> DashboardSnapshot {
        views::dashboard(&self.flights, &self.users, &self.bookings)
    }
}
