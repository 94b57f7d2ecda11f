use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::BoxError;

/// Listing availability. Stored as 0..=3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Disabled,
    Available,
    Rented,
    Reserved,
}

impl ItemStatus {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(ItemStatus::Disabled),
            1 => Some(ItemStatus::Available),
            2 => Some(ItemStatus::Rented),
            3 => Some(ItemStatus::Reserved),
            _ => None,
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            ItemStatus::Disabled => 0,
            ItemStatus::Available => 1,
            ItemStatus::Rented => 2,
            ItemStatus::Reserved => 3,
        }
    }

    /// Only disabled listings refuse new bookings; date overlap is not tracked here.
    pub fn is_bookable(&self) -> bool {
        !matches!(self, ItemStatus::Disabled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub price: f64,
    pub status: ItemStatus,
    pub images: Vec<String>,
}

#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn find_item(&self, id: Uuid) -> Result<Option<CatalogItem>, BoxError>;
}

#[derive(Default)]
pub struct MockItemCatalog {
    items: RwLock<HashMap<Uuid, CatalogItem>>,
}

impl MockItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: CatalogItem) {
        if let Ok(mut items) = self.items.write() {
            items.insert(item.id, item);
        }
    }
}

#[async_trait]
impl ItemCatalog for MockItemCatalog {
    async fn find_item(&self, id: Uuid) -> Result<Option<CatalogItem>, BoxError> {
        let items = self.items.read().map_err(|_| "item catalog poisoned")?;
        Ok(items.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_and_bookability() {
        for code in 0..=3 {
            let status = ItemStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert!(ItemStatus::from_code(4).is_none());
        assert!(!ItemStatus::Disabled.is_bookable());
        assert!(ItemStatus::Reserved.is_bookable());
    }
}
