//! Local accounts. Credentials never leave the browser; they only decide
//! which project list is shown.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::store::{load_json, save_json, KeyValueStore, StoreError, SESSION_KEY, USERS_KEY};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountError {
    #[error("usernames are {MIN_USERNAME_LEN} to {MAX_USERNAME_LEN} characters of a-z, 0-9, '_', '.' or '-'")]
    InvalidUsername,
    #[error("passwords need at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,
    #[error("that username is already taken")]
    UsernameTaken,
    #[error("wrong username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub salt: String,
    pub hash: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
struct Session {
    username: String,
}

pub fn normalize_username(raw: &str) -> Result<String, AccountError> {
    let username = raw.trim().to_lowercase();
    let valid_len = (MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&username.chars().count());
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'));
    if valid_len && valid_chars {
        Ok(username)
    } else {
        Err(AccountError::InvalidUsername)
    }
}

/// `hex(sha256(salt ":" password))`
pub fn hash_password(salt: &str, password: &str) -> String {
    let digest = Sha256::digest(format!("{salt}:{password}").as_bytes());
    format!("{digest:x}")
}

fn users(store: &dyn KeyValueStore) -> BTreeMap<String, UserRecord> {
    load_json(store, USERS_KEY).unwrap_or_default()
}

/// Creates an account and signs it in.
pub fn register(
    store: &mut dyn KeyValueStore,
    username: &str,
    password: &str,
) -> Result<String, AccountError> {
    let username = normalize_username(username)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::PasswordTooShort);
    }
    let mut users = users(store);
    if users.contains_key(&username) {
        return Err(AccountError::UsernameTaken);
    }
    let salt = Uuid::new_v4().simple().to_string();
    let hash = hash_password(&salt, password);
    users.insert(username.clone(), UserRecord { salt, hash });
    save_json(store, USERS_KEY, &users)?;
    start_session(store, &username)?;
    info!(%username, "account registered");
    Ok(username)
}

pub fn login(
    store: &mut dyn KeyValueStore,
    username: &str,
    password: &str,
) -> Result<String, AccountError> {
    let username = normalize_username(username).map_err(|_| AccountError::InvalidCredentials)?;
    let record = users(store)
        .remove(&username)
        .ok_or(AccountError::InvalidCredentials)?;
    if hash_password(&record.salt, password) != record.hash {
        return Err(AccountError::InvalidCredentials);
    }
    start_session(store, &username)?;
    info!(%username, "signed in");
    Ok(username)
}

pub fn logout(store: &mut dyn KeyValueStore) {
    store.remove(SESSION_KEY);
}

/// The signed-in user, if the session still names a known account.
pub fn current_user(store: &dyn KeyValueStore) -> Option<String> {
    let session: Session = load_json(store, SESSION_KEY)?;
    users(store)
        .contains_key(&session.username)
        .then_some(session.username)
}

fn start_session(store: &mut dyn KeyValueStore, username: &str) -> Result<(), StoreError> {
    save_json(
        store,
        SESSION_KEY,
        &Session {
            username: username.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn usernames_are_normalized() {
        assert_eq!(normalize_username("  Ana.B_1 "), Ok("ana.b_1".into()));
        assert_eq!(normalize_username("ab"), Err(AccountError::InvalidUsername));
        assert_eq!(normalize_username("no spaces"), Err(AccountError::InvalidUsername));
        assert_eq!(normalize_username(&"x".repeat(33)), Err(AccountError::InvalidUsername));
    }

    #[test]
    fn hash_is_salted_sha256_hex() {
        let hash = hash_password("salt", "secret");
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, hash_password("pepper", "secret"));
        assert_eq!(hash, hash_password("salt", "secret"));
    }

    #[test]
    fn register_then_login() {
        let mut store = MemoryStore::new();
        assert_eq!(register(&mut store, "Ana", "hunter22"), Ok("ana".into()));
        assert_eq!(current_user(&store).as_deref(), Some("ana"));
        assert_eq!(
            register(&mut store, "ana", "another1"),
            Err(AccountError::UsernameTaken)
        );

        logout(&mut store);
        assert_eq!(current_user(&store), None);
        assert_eq!(
            login(&mut store, "ana", "wrong-pass"),
            Err(AccountError::InvalidCredentials)
        );
        assert_eq!(login(&mut store, "ANA", "hunter22"), Ok("ana".into()));
        assert_eq!(current_user(&store).as_deref(), Some("ana"));
    }

    #[test]
    fn short_password_is_rejected() {
        let mut store = MemoryStore::new();
        assert_eq!(
            register(&mut store, "bob", "12345"),
            Err(AccountError::PasswordTooShort)
        );
        assert_eq!(store.get(USERS_KEY), None);
    }

    #[test]
    fn stored_password_is_not_plaintext() {
        let mut store = MemoryStore::new();
        register(&mut store, "carol", "plaintext-pw").unwrap();
        assert!(!store.get(USERS_KEY).unwrap().contains("plaintext-pw"));
    }
}
