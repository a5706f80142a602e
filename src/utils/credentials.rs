// utils/credentials.rs - API credentials and their cache-partition fingerprint

use serde_json::json;
use sha2::{Digest, Sha256};
use std::fmt;

/// API key material for one exchange account.
/// The `Debug` impl masks secrets so credentials can appear in logs safely.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: Option<String>,
}

impl Credentials {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Credentials {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            passphrase: None,
        }
    }

    pub fn with_passphrase(api_key: &str, api_secret: &str, passphrase: &str) -> Self {
        Credentials {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            passphrase: Some(passphrase.to_string()),
        }
    }

    /// Both key and secret are present.
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Stable hash of the full credential set. Used as the cache partition
    /// name and as a pooling key, so two accounts never share state.
    pub fn fingerprint(&self) -> String {
        let canonical = json!({
            "apiKey": self.api_key,
            "apiSecret": self.api_secret,
            "passphrase": self.passphrase,
        })
        .to_string();

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!("{}...{}", &self.api_key[..4], &self.api_key[self.api_key.len() - 4..])
        } else {
            "***".to_string()
        };
        f.debug_struct("Credentials")
            .field("api_key", &masked_key)
            .field("api_secret", &"***")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .finish()
    }
}
