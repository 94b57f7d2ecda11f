use async_trait::async_trait;
use eventeq_core::identity::{UserDirectory, UserProfile};
use eventeq_core::BoxError;
use eventeq_shared::Masked;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    no_phone: Option<String>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        UserProfile {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: Masked::new(row.email),
            phone: row.no_phone.filter(|p| !p.is_empty()).map(Masked::new),
        }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, BoxError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, first_name, last_name, email, no_phone FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserProfile::from))
    }
}
