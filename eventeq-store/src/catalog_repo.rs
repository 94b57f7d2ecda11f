use async_trait::async_trait;
use eventeq_core::catalog::{CatalogItem, ItemCatalog, ItemStatus};
use eventeq_core::BoxError;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgItemCatalog {
    pool: PgPool,
}

impl PgItemCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    price: f64,
    status: i16,
    images: Json<Vec<String>>,
}

impl TryFrom<ItemRow> for CatalogItem {
    type Error = BoxError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let status = ItemStatus::from_code(row.status)
            .ok_or_else(|| format!("item {} has unknown status code {}", row.id, row.status))?;
        Ok(CatalogItem {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            price: row.price,
            status,
            images: row.images.0,
        })
    }
}

#[async_trait]
impl ItemCatalog for PgItemCatalog {
    async fn find_item(&self, id: Uuid) -> Result<Option<CatalogItem>, BoxError> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT id, owner_id, name, price, status, images FROM items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CatalogItem::try_from).transpose()
    }
}
