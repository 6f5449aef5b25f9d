//! Bearer token caching for the Flight connection

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// How long a server-issued token is trusted before re-authenticating.
const TOKEN_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Default)]
pub struct TokenStore {
    slot: Mutex<Option<(String, Instant)>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token, unless it has aged out.
    pub fn get(&self) -> Option<String> {
        let slot = self.slot.lock();
        match slot.as_ref() {
            Some((token, issued)) if issued.elapsed() < TOKEN_TTL => Some(token.clone()),
            _ => None,
        }
    }

    pub fn set(&self, token: String) {
        let mut slot = self.slot.lock();
        *slot = Some((token, Instant::now()));
    }

    pub fn clear(&self) {
        let mut slot = self.slot.lock();
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let store = TokenStore::new();
        assert_eq!(store.get(), None);

        store.set("bearer-token".to_string());
        assert_eq!(store.get(), Some("bearer-token".to_string()));

        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_stale_token_is_dropped() {
        let store = TokenStore::new();
        {
            let mut slot = store.slot.lock();
            *slot = Some((
                "old".to_string(),
                Instant::now() - TOKEN_TTL - Duration::from_secs(1),
            ));
        }
        assert_eq!(store.get(), None);
    }
}
