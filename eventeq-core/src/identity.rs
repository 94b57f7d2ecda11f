use async_trait::async_trait;
use eventeq_shared::Masked;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::BoxError;

/// Contact details of a marketplace user, as needed by bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Masked<String>,
    pub phone: Option<Masked<String>>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, BoxError>;
}

#[derive(Default)]
pub struct MockUserDirectory {
    users: RwLock<HashMap<Uuid, UserProfile>>,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserProfile) {
        if let Ok(mut users) = self.users.write() {
            users.insert(user.id, user);
        }
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, BoxError> {
        let users = self.users.read().map_err(|_| "user directory poisoned")?;
        Ok(users.get(&id).cloned())
    }
}
