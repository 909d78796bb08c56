//! Server-side admin sessions.
//!
//! The cookie carries `<token>.<signature>`, where the token is 32 random
//! bytes and the signature is HMAC-SHA256 over the token with the configured
//! secret key. The store only keeps the SHA-256 of each token, so a leaked
//! session map cannot be replayed as cookies.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "gallery_session";

/// Identity attached to a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub admin_id: i64,
    pub username: String,
}

#[derive(Debug, Clone)]
struct Entry {
    session: AdminSession,
    expires_at: Instant,
}

pub struct SessionStore {
    key: Vec<u8>,
    ttl: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionStore {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session and return the signed cookie value.
    pub async fn create(&self, admin_id: i64, username: &str) -> String {
        let mut raw = [0u8; 32];
        OsRng.fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&token));

        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(
            token_key(&token),
            Entry {
                session: AdminSession {
                    admin_id,
                    username: username.to_string(),
                },
                expires_at: now + self.ttl,
            },
        );

        format!("{token}.{signature}")
    }

    /// Resolve a cookie value to its session, if the signature checks out
    /// and the session has not expired.
    pub async fn resolve(&self, cookie_value: &str) -> Option<AdminSession> {
        let token = self.verified_token(cookie_value)?;
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.get(&token_key(token)).map(|e| e.session.clone())
    }

    /// End a session. Unknown or forged values are ignored.
    pub async fn destroy(&self, cookie_value: &str) {
        if let Some(token) = self.verified_token(cookie_value) {
            self.sessions.lock().await.remove(&token_key(token));
        }
    }

    fn verified_token<'a>(&self, cookie_value: &'a str) -> Option<&'a str> {
        let (token, signature) = cookie_value.split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(token.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(token)
    }

    fn sign(&self, token: &str) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(token.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length")
    }
}

fn token_key(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
