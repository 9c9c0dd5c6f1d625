use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bearer session acquired from `/auth/token` or `/auth/register`.
///
/// Created at login, destroyed at logout, and handed to [`crate::api::ApiClient`]
/// explicitly instead of being looked up from ambient storage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
}

impl Session {
    pub fn new(access_token: String) -> Self {
        Session { access_token }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn load(path: &Path) -> Result<Session> {
        let mut file_data = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut file_data)?;

        let session: Session = serde_json::from_str(&file_data)?;
        Ok(session)
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        let file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        serde_json::to_writer(file, self)?;
        Ok(())
    }

    pub fn clear(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
