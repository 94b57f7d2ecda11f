use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use eventeq_booking::models::{Booking, BookingStatus, Feedback, LineItem, PaymentRecord};
use eventeq_booking::repository::{BookingFilter, BookingRepository};
use eventeq_core::payment::BillStatus;
use eventeq_core::BoxError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, user_id, owner_id, items, start_date, end_date, sub_total, \
     service_fee, grand_total, status, bill_code, feedback, created_at, updated_at";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    owner_id: Uuid,
    items: Json<Vec<LineItem>>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    sub_total: f64,
    service_fee: f64,
    grand_total: f64,
    status: i16,
    bill_code: String,
    feedback: Option<Json<Feedback>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BoxError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::from_code(row.status)
            .ok_or_else(|| format!("booking {} has unknown status code {}", row.id, row.status))?;
        Ok(Booking {
            id: row.id,
            requester_id: row.user_id,
            owner_id: row.owner_id,
            items: row.items.0,
            start_date: row.start_date,
            end_date: row.end_date,
            sub_total: row.sub_total,
            service_fee: row.service_fee,
            grand_total: row.grand_total,
            status,
            bill_code: row.bill_code,
            feedback: row.feedback.map(|f| f.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    booking_id: Uuid,
    bill_code: String,
    status: i16,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn bill_status_code(status: BillStatus) -> i16 {
    match status {
        BillStatus::Success => 1,
        BillStatus::Pending => 2,
        BillStatus::Failed => 3,
    }
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = BoxError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = BillStatus::from_code(&row.status.to_string())
            .ok_or_else(|| format!("payment {} has unknown status code {}", row.bill_code, row.status))?;
        Ok(PaymentRecord {
            booking_id: row.booking_id,
            bill_code: row.bill_code,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn status_codes(statuses: &[BookingStatus]) -> Vec<i16> {
    let mut codes: Vec<i16> = statuses.iter().map(BookingStatus::code).collect();
    // Legacy rows may still carry 7 for overdue.
    if statuses.contains(&BookingStatus::Overdue) {
        codes.push(7);
    }
    codes
}

/// JSONB containment value matching any line item with this id.
fn item_containment(item_id: Uuid) -> serde_json::Value {
    serde_json::json!([{ "id": item_id }])
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, owner_id, items, start_date, end_date, sub_total,
                                  service_fee, grand_total, status, bill_code, feedback, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(booking.id)
        .bind(booking.requester_id)
        .bind(booking.owner_id)
        .bind(Json(&booking.items))
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.sub_total)
        .bind(booking.service_fee)
        .bind(booking.grand_total)
        .bind(booking.status.code())
        .bind(&booking.bill_code)
        .bind(booking.feedback.as_ref().map(Json))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BoxError> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_by_bill_code(&self, bill_code: &str) -> Result<Option<Booking>, BoxError> {
        if bill_code.is_empty() {
            return Ok(None);
        }
        let sql = format!("SELECT {} FROM bookings WHERE bill_code = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(bill_code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn find(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BoxError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM bookings WHERE TRUE", BOOKING_COLUMNS));

        if let Some(requester_id) = filter.requester_id {
            qb.push(" AND user_id = ").push_bind(requester_id);
        }
        if let Some(owner_id) = filter.owner_id {
            qb.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(item_id) = filter.item_id {
            qb.push(" AND items @> ").push_bind(Json(item_containment(item_id)));
        }
        if !filter.statuses.is_empty() {
            qb.push(" AND status = ANY(")
                .push_bind(status_codes(&filter.statuses))
                .push(")");
        }

        let rows = qb.build_query_as::<BookingRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: &[BookingStatus],
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $1, updated_at = $2 WHERE id = $3 AND status = ANY($4)",
        )
        .bind(to.code())
        .bind(at)
        .bind(id)
        .bind(status_codes(expected))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_bill_code(&self, id: Uuid, bill_code: &str, at: DateTime<Utc>) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE bookings SET bill_code = $1, updated_at = $2 WHERE id = $3 AND bill_code = ''",
        )
        .bind(bill_code)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_feedback(&self, id: Uuid, feedback: &Feedback, at: DateTime<Utc>) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE bookings SET feedback = $1, updated_at = $2 WHERE id = $3 AND status = $4",
        )
        .bind(Json(feedback))
        .bind(at)
        .bind(id)
        .bind(BookingStatus::Returned.code())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn save_payment(&self, record: &PaymentRecord) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO payments (booking_id, bill_code, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (bill_code) DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.booking_id)
        .bind(&record.bill_code)
        .bind(bill_status_code(record.status))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_payment(&self, bill_code: &str) -> Result<Option<PaymentRecord>, BoxError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT booking_id, bill_code, status, created_at, updated_at FROM payments WHERE bill_code = $1",
        )
        .bind(bill_code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PaymentRecord::try_from).transpose()
    }

    async fn update_payment(&self, bill_code: &str, status: BillStatus, at: DateTime<Utc>) -> Result<bool, BoxError> {
        let success = bill_status_code(BillStatus::Success);
        let result = sqlx::query(
            "UPDATE payments SET status = $1, updated_at = $2 \
             WHERE bill_code = $3 AND (status <> $4 OR $1 = $4)",
        )
        .bind(bill_status_code(status))
        .bind(at)
        .bind(bill_code)
        .bind(success)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overdue_filter_includes_legacy_code() {
        assert_eq!(status_codes(&[BookingStatus::Active]), vec![1]);
        assert_eq!(
            status_codes(&[BookingStatus::Returned, BookingStatus::Overdue]),
            vec![3, 6, 7]
        );
    }

    #[test]
    fn payment_codes_match_gateway() {
        for status in [BillStatus::Success, BillStatus::Pending, BillStatus::Failed] {
            assert_eq!(bill_status_code(status).to_string(), status.code());
        }
    }

    #[test]
    fn row_with_unknown_status_is_rejected() {
        let now = Utc::now();
        let row = BookingRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            items: Json(vec![]),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            sub_total: 0.0,
            service_fee: 0.0,
            grand_total: 0.0,
            status: 42,
            bill_code: String::new(),
            feedback: None,
            created_at: now,
            updated_at: now,
        };
        assert!(Booking::try_from(row).is_err());
    }

    #[test]
    fn item_containment_shape() {
        let id = Uuid::new_v4();
        assert_eq!(item_containment(id), serde_json::json!([{ "id": id.to_string() }]));
    }
}
