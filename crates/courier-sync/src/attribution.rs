use courier_db::models::{NewUser, UserRow};
use courier_db::{Change, Store};
use tracing::{debug, info};

use crate::error::{Result, SyncError};

/// Returns the local user for a journalist, creating it if needed.
///
/// Usernames can change upstream, so an existing row is brought in line with
/// the supplied one. Both the insert and the rename are persisted immediately.
pub fn find_or_create_user(uuid: &str, username: &str, store: &dyn Store) -> Result<UserRow> {
    match store.user_by_uuid(uuid)? {
        Some(mut user) => {
            if user.username != username {
                debug!("User {} renamed from {} to {}", uuid, user.username, username);
                user.username = username.to_string();
                store.commit(Change::UpdateUser(user.clone()).into())?;
            }
            Ok(user)
        }
        None => {
            let user = store.insert_user(NewUser {
                uuid: uuid.to_string(),
                username: username.to_string(),
                firstname: None,
                lastname: None,
            })?;
            info!("Created user {} ({})", user.username, user.uuid);
            Ok(user)
        }
    }
}

/// Like [`find_or_create_user`], also refreshing the name fields.
pub fn update_and_get_user(
    uuid: &str,
    username: &str,
    firstname: Option<&str>,
    lastname: Option<&str>,
    store: &dyn Store,
) -> Result<UserRow> {
    let mut user = find_or_create_user(uuid, username, store)?;

    let firstname = firstname.map(str::to_string);
    let lastname = lastname.map(str::to_string);
    if user.firstname != firstname || user.lastname != lastname {
        user.firstname = firstname;
        user.lastname = lastname;
        store.commit(Change::UpdateUser(user.clone()).into())?;
    }
    Ok(user)
}

/// Looks up a user that must already exist.
pub fn get_user(uuid: &str, store: &dyn Store) -> Result<UserRow> {
    store
        .user_by_uuid(uuid)?
        .ok_or_else(|| SyncError::UserNotFound(uuid.to_string()))
}
