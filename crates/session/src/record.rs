use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The persisted login. Past its expiry it counts as absent, whether or not
/// it is still physically stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAuthorization {
    pub access_token: String,
    pub session_expiry_unix_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
}

impl StoredAuthorization {
    pub fn new(access_token: impl Into<String>, session_expiry_unix_seconds: i64) -> Self {
        Self {
            access_token: access_token.into(),
            session_expiry_unix_seconds,
            user_type: None,
        }
    }

    pub fn with_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }

    pub fn is_valid_at(&self, now: i64) -> bool {
        self.session_expiry_unix_seconds > now
    }

    /// Time left until expiry; zero once expired.
    pub fn remaining(&self, now: i64) -> Duration {
        let secs = self.session_expiry_unix_seconds.saturating_sub(now).max(0);
        Duration::from_secs(secs as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn storage_schema() {
        let record = StoredAuthorization::new("tok", 1_700_000_000).with_user_type("local");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "accessToken": "tok",
                "sessionExpiryUnixSeconds": 1_700_000_000,
                "userType": "local"
            })
        );
        let parsed: StoredAuthorization =
            serde_json::from_value(json!({ "accessToken": "t", "sessionExpiryUnixSeconds": 5 }))
                .unwrap();
        assert_eq!(parsed.user_type, None);
    }

    #[test]
    fn expiry_is_exclusive() {
        let record = StoredAuthorization::new("tok", 100);
        assert!(record.is_valid_at(99));
        assert!(!record.is_valid_at(100));
        assert_eq!(record.remaining(95), Duration::from_secs(5));
        assert_eq!(record.remaining(120), Duration::ZERO);
    }
}
