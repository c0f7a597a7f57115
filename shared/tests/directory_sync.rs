use std::sync::Arc;

use skywings_shared::auth::{MockIdentityProvider, RoleMap};
use skywings_shared::bookings::BookingLedger;
use skywings_shared::flights::FlightDirectory;
use skywings_shared::remote::InMemoryUserDirectory;
use skywings_shared::store::LocalStore;
use skywings_shared::types::{NewUser, Role, UserPatch, UserStatus};
use skywings_shared::users::{DirectorySource, UserDirectory};
use skywings_shared::AppState;

fn app_with_remote(
    dir: &tempfile::TempDir,
    remote: Arc<InMemoryUserDirectory>,
) -> AppState {
    let store = LocalStore::open(dir.path());
    AppState {
        flights: FlightDirectory::load(store.clone()),
        bookings: BookingLedger::load(store.clone()),
        users: UserDirectory::with_remote(remote),
        roles: RoleMap::load(store.clone()),
        identity: Arc::new(MockIdentityProvider::new(store.clone())),
        store,
    }
}

fn new_user(name: &str, email: &str, role: Role) -> NewUser {
    NewUser {
        name: name.into(),
        email: email.into(),
        role,
        member_since: "Aug 2025".into(),
        total_flights: 0,
        loyalty_points: 0,
        status: UserStatus::Active,
        last_login: "Just now".into(),
    }
}

#[tokio::test]
async fn user_management_syncs_the_remote_directory_and_role_map() {
    let dir = tempfile::tempdir().expect("tempdir");
    let remote = Arc::new(InMemoryUserDirectory::new());
    let mut app = app_with_remote(&dir, remote.clone());

    let added = app.add_user(new_user("New Person", "new@example.com", Role::User));
    app.users.flush_remote().await;
    assert_eq!(remote.snapshot().len(), 1);
    assert_eq!(app.roles.role_for("new@example.com"), Some(Role::User));

    app.update_user(
        &added.id,
        UserPatch {
            role: Some(Role::Admin),
            ..UserPatch::default()
        },
    );
    app.users.flush_remote().await;
    assert_eq!(remote.snapshot()[0].role, Role::Admin);
    assert_eq!(app.roles.role_for("new@example.com"), Some(Role::Admin));

    app.delete_user(&added.id);
    app.users.flush_remote().await;
    assert!(remote.snapshot().is_empty());
    // The mapping resets to the default role instead of disappearing.
    assert_eq!(app.roles.role_for("new@example.com"), Some(Role::User));
}

#[tokio::test]
async fn remote_outage_degrades_reload_to_local() {
    let dir = tempfile::tempdir().expect("tempdir");
    let remote = Arc::new(InMemoryUserDirectory::with_users(vec![]));
    let mut app = app_with_remote(&dir, remote.clone());

    let added = app.add_user(new_user("Kept Locally", "kept@example.com", Role::User));
    remote.set_failing(true);

    app.users.reload().await;
    assert_eq!(app.users.source(), DirectorySource::Local);
    // The in-memory list is untouched by the failed reload.
    assert!(app.users.get(&added.id).is_some());
}

#[tokio::test]
async fn local_mutations_apply_before_the_remote_write_lands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let remote = Arc::new(InMemoryUserDirectory::new());
    remote.set_failing(true);
    let mut app = app_with_remote(&dir, remote.clone());

    // The remote is down, but the local mutation is immediately visible.
    let added = app.add_user(new_user("New Person", "new@example.com", Role::User));
    assert!(app.users.get(&added.id).is_some());

    app.users.flush_remote().await;
    assert!(remote.snapshot().is_empty());
    assert!(app.users.get(&added.id).is_some());
}

#[tokio::test]
async fn a_persisted_mock_session_wins_at_startup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LocalStore::open(dir.path());
    let mock = MockIdentityProvider::new(store.clone());
    let mut roles = RoleMap::load(store.clone());
    mock.create_mock_user("admin@skywings.com", Role::Admin, Some("Admin"), &mut roles);

    let app = AppState::offline(dir.path());
    let current = app.current_user().expect("restored session");
    assert_eq!(current.principal.email.as_deref(), Some("admin@skywings.com"));
    assert_eq!(current.role, Some(Role::Admin));
}

#[tokio::test]
async fn register_records_the_chosen_role() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut app = AppState::offline(dir.path());

    let registered = app
        .register("traveller@example.com", "pw", Some("Traveller"), Role::User)
        .await
        .expect("register");
    assert_eq!(registered.role, Some(Role::User));
    assert_eq!(app.roles.role_for("Traveller@Example.com"), Some(Role::User));

    let current = app.current_user().expect("signed in");
    assert_eq!(current.principal.email.as_deref(), Some("traveller@example.com"));

    app.sign_out().await.expect("sign out");
    assert!(app.current_user().is_none());
}
