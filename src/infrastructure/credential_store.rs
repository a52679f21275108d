use crate::domain::models::OAuthToken;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

/// Process-wide calendar session. Held in memory for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct SessionTokenStore {
    token: Mutex<Option<OAuthToken>>,
}

impl SessionTokenStore {
    pub fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|error| InfraError::OAuth(format!("session lock poisoned: {error}")))?;
        *guard = Some(token.clone());
        Ok(())
    }

    pub fn load_token(&self) -> Result<Option<OAuthToken>, InfraError> {
        let guard = self
            .token
            .lock()
            .map_err(|error| InfraError::OAuth(format!("session lock poisoned: {error}")))?;
        Ok(guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn token_pattern() -> impl Strategy<Value = String> {
        "[A-Za-z0-9._\\-]{1,64}".prop_map(|value| value.to_string())
    }

    proptest! {
        #[test]
        fn saved_token_is_returned_unchanged(
            access_token in token_pattern(),
            scope in prop::option::of(token_pattern()),
            expires_in in 1i64..86400i64
        ) {
            let store = SessionTokenStore::default();
            let token = OAuthToken {
                access_token,
                expires_at: Utc::now() + Duration::seconds(expires_in),
                token_type: "Bearer".to_string(),
                scope,
            };
            store.save_token(&token).expect("save token");
            let loaded = store.load_token().expect("load token").expect("token exists");
            prop_assert_eq!(loaded, token);
        }
    }

    #[test]
    fn new_store_has_no_session() {
        let store = SessionTokenStore::default();
        assert!(store.load_token().expect("load").is_none());
    }
}
