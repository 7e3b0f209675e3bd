//! # Identity
//!
//! Per-browser user ids, no accounts.
//!
//! - The browser keeps its id in the `user_id` cookie, a UUID v4 string
//! - First visit: generate an id, hand it back in `Set-Cookie`, register it in the users table
//! - Registration runs in the background; if it fails we log it and keep using the id
//! - Prefetch/prerender requests cannot keep a cookie, they get [`Identity::Unavailable`]
//!   and must not vote
use std::{sync::Arc, time::Duration};

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use bank::{User, UserId};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{Store, new_id};

pub const USER_COOKIE: &str = "user_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Known(UserId),
    Unavailable,
}

impl Identity {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::Known(id) => Some(id.as_str()),
            Identity::Unavailable => None,
        }
    }
}

/// Where an identity lives between requests.
pub trait IdentityStorage {
    fn load(&self) -> Option<UserId>;

    fn save(&mut self, id: &UserId);

    fn is_persistent(&self) -> bool {
        true
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn Store>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Must be called from within a Tokio runtime, registration is spawned onto it.
    pub fn resolve<S: IdentityStorage>(&self, storage: &mut S) -> Identity {
        if !storage.is_persistent() {
            return Identity::Unavailable;
        }

        if let Some(id) = storage.load() {
            return Identity::Known(id);
        }

        let id = new_id();
        storage.save(&id);
        self.register(id.clone());

        Identity::Known(id)
    }

    fn register(&self, id: UserId) {
        let store = self.store.clone();

        tokio::spawn(async move {
            match store.insert_user(&User { id: id.clone() }).await {
                Ok(()) => debug!("Registered user {id}"),
                Err(e) => warn!("Failed to register user {id}: {e}"),
            }
        });
    }
}

/// Identity storage backed by the request's cookies.
///
/// A saved id is not sent anywhere until [`CookieStorage::into_set_cookie`] is attached to
/// the response.
pub struct CookieStorage {
    stored: Option<UserId>,
    persistent: bool,
    max_age: Duration,
    set_cookie: Option<HeaderValue>,
}

impl CookieStorage {
    pub fn from_headers(headers: &HeaderMap, max_age: Duration) -> Self {
        Self {
            stored: read_user_cookie(headers),
            persistent: !is_prefetch(headers),
            max_age,
            set_cookie: None,
        }
    }

    pub fn into_set_cookie(self) -> Option<HeaderValue> {
        self.set_cookie
    }
}

impl IdentityStorage for CookieStorage {
    fn load(&self) -> Option<UserId> {
        self.stored.clone()
    }

    fn save(&mut self, id: &UserId) {
        let cookie = format!(
            "{USER_COOKIE}={id}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.max_age.as_secs()
        );

        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                self.stored = Some(id.clone());
                self.set_cookie = Some(value);
            }
            Err(e) => warn!("Unable to build {SET_COOKIE} header: {e}"),
        }
    }

    fn is_persistent(&self) -> bool {
        self.persistent
    }
}

fn read_user_cookie(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == USER_COOKIE)
        .and_then(|(_, value)| canonical_id(value.trim()))
}

/// Only the lowercase hyphenated v4 form we hand out. Anything else, even a UUID that
/// parses, is treated as no cookie.
fn canonical_id(value: &str) -> Option<UserId> {
    let id = Uuid::parse_str(value).ok()?;

    (id.get_version_num() == 4 && id.to_string() == value).then(|| value.to_string())
}

fn is_prefetch(headers: &HeaderMap) -> bool {
    ["sec-purpose", "purpose"].iter().any(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| {
                let value = value.to_ascii_lowercase();
                value.contains("prefetch") || value.contains("prerender")
            })
    })
}
