use std::env;
use std::fmt;
use std::path::Path;

use rusoto_core::Region;
use tracing::debug;

use super::Error;

pub const ACCOUNT_ID: &str = "ACCOUNT_ID";
pub const ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
pub const BUCKET: &str = "R2_BUCKET";

/// R2 only accepts this pseudo-region when signing requests.
pub const REGION_NAME: &str = "auto";

#[derive(Clone)]
pub struct Config {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl Config {
    /// Reads the env file into the process environment, then builds the config from it.
    /// Variables that are already set are not overridden by the file.
    pub fn load(env_file: &Path) -> Result<Self, Error> {
        match dotenvy::from_path(env_file) {
            Ok(()) => debug!(path = %env_file.display(), "loaded env file"),
            Err(dotenvy::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %env_file.display(), "no env file, using process environment");
            }
            Err(e) => return Err(e.into()),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, Error> {
            match lookup(key) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(format!("missing required configuration value {}", key).into()),
            }
        };
        Ok(Config {
            account_id: required(ACCOUNT_ID)?,
            access_key_id: required(ACCESS_KEY_ID)?,
            secret_access_key: required(SECRET_ACCESS_KEY)?,
            bucket: required(BUCKET)?,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }

    pub fn region(&self) -> Region {
        Region::Custom {
            name: REGION_NAME.to_owned(),
            endpoint: self.endpoint(),
        }
    }
}
