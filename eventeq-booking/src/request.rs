//! Typed request parsing. A payload either becomes a fully-typed request or
//! yields every field problem at once.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::dates;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// A line item as requested. Name and price are advisory; the catalog snapshot wins.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedItem {
    pub item_id: Uuid,
    pub quantity: u32,
    pub name: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateBookingRequest {
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sub_total: f64,
    pub service_fee: f64,
    pub grand_total: f64,
    pub items: Vec<RequestedItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
    pub booking_id: Uuid,
    pub rating: u8,
    pub review: String,
}

/// Walks a JSON object, recording a field error for anything missing or mistyped.
struct Fields<'b, 'e> {
    body: &'b Map<String, Value>,
    prefix: String,
    errors: &'e mut ValidationErrors,
}

impl<'b, 'e> Fields<'b, 'e> {
    fn name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn fail(&mut self, key: &str, message: &str) {
        let field = self.name(key);
        self.errors.push(&field, message);
    }

    fn get(&mut self, key: &str) -> Option<&'b Value> {
        let body = self.body;
        match body.get(key) {
            None | Some(Value::Null) => {
                self.fail(key, "is required");
                None
            }
            Some(value) => Some(value),
        }
    }

    fn uuid(&mut self, key: &str) -> Option<Uuid> {
        match self.get(key)? {
            Value::String(raw) => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    self.fail(key, "must be a valid id");
                    None
                }
            },
            _ => {
                self.fail(key, "must be a string id");
                None
            }
        }
    }

    fn date(&mut self, key: &str) -> Option<NaiveDate> {
        match self.get(key)? {
            Value::String(raw) => match dates::parse_date(raw) {
                Ok(date) => Some(date),
                Err(_) => {
                    self.fail(key, "must be a date in DD/MM/YYYY format");
                    None
                }
            },
            _ => {
                self.fail(key, "must be a date string");
                None
            }
        }
    }

    fn amount(&mut self, key: &str) -> Option<f64> {
        match self.get(key)?.as_f64() {
            Some(v) if v.is_finite() && v >= 0.0 => Some(v),
            Some(_) => {
                self.fail(key, "must be a non-negative amount");
                None
            }
            None => {
                self.fail(key, "must be a number");
                None
            }
        }
    }
}

fn as_object<'a>(value: &'a Value, errors: &mut ValidationErrors) -> Option<&'a Map<String, Value>> {
    match value.as_object() {
        Some(body) => Some(body),
        None => {
            errors.push("body", "must be a JSON object");
            None
        }
    }
}

fn whole_number(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|v| v.fract() == 0.0 && *v >= 0.0).map(|v| v as u64))
}

fn parse_item(index: usize, value: &Value, errors: &mut ValidationErrors) -> Option<RequestedItem> {
    let prefix = format!("items[{}].", index);
    let Some(body) = value.as_object() else {
        errors.push(&format!("items[{}]", index), "must be an object");
        return None;
    };
    let mut fields = Fields { body, prefix, errors };

    let item_id = fields.uuid("id");
    let quantity = match fields.get("quantity") {
        Some(raw) => match whole_number(raw) {
            Some(q) if q >= 1 && q <= u32::MAX as u64 => Some(q as u32),
            _ => {
                fields.fail("quantity", "must be a positive whole number");
                None
            }
        },
        None => None,
    };
    let name = body.get("name").and_then(Value::as_str).map(str::to_string);
    let price = body.get("price").and_then(Value::as_f64);

    Some(RequestedItem {
        item_id: item_id?,
        quantity: quantity?,
        name,
        price,
    })
}

impl CreateBookingRequest {
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Some(body) = as_object(value, &mut errors) else {
            return Err(errors);
        };

        let mut fields = Fields {
            body,
            prefix: String::new(),
            errors: &mut errors,
        };
        let requester_id = fields.uuid("user_id");
        let owner_id = fields.uuid("owner_id");
        let start_date = fields.date("start_date");
        let end_date = fields.date("end_date");
        let sub_total = fields.amount("sub_total");
        let service_fee = fields.amount("service_fee");
        let grand_total = fields.amount("grand_total");

        let mut items = Vec::new();
        match fields.get("items") {
            Some(Value::Array(raw)) if !raw.is_empty() => {
                for (index, raw_item) in raw.iter().enumerate() {
                    if let Some(item) = parse_item(index, raw_item, &mut errors) {
                        items.push(item);
                    }
                }
            }
            Some(Value::Array(_)) => errors.push("items", "must contain at least one item"),
            Some(_) => errors.push("items", "must be an array"),
            None => {}
        }

        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                errors.push("end_date", "must not be before start_date");
            }
        }

        match (
            requester_id,
            owner_id,
            start_date,
            end_date,
            sub_total,
            service_fee,
            grand_total,
        ) {
            (
                Some(requester_id),
                Some(owner_id),
                Some(start_date),
                Some(end_date),
                Some(sub_total),
                Some(service_fee),
                Some(grand_total),
            ) if errors.is_empty() => Ok(Self {
                requester_id,
                owner_id,
                start_date,
                end_date,
                sub_total,
                service_fee,
                grand_total,
                items,
            }),
            _ => Err(errors),
        }
    }
}

impl FeedbackRequest {
    /// Accepts `bookingId` (legacy) or `booking_id`.
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Some(body) = as_object(value, &mut errors) else {
            return Err(errors);
        };

        let key = if body.contains_key("bookingId") { "bookingId" } else { "booking_id" };
        let mut fields = Fields {
            body,
            prefix: String::new(),
            errors: &mut errors,
        };
        let booking_id = fields.uuid(key);
        let rating = match fields.get("rating") {
            Some(raw) => match whole_number(raw) {
                Some(r @ 1..=5) => Some(r as u8),
                _ => {
                    fields.fail("rating", "must be a whole number from 1 to 5");
                    None
                }
            },
            None => None,
        };
        let review = match body.get("review") {
            None | Some(Value::Null) => Some(String::new()),
            Some(Value::String(text)) => Some(text.trim().to_string()),
            Some(_) => {
                fields.fail("review", "must be a string");
                None
            }
        };

        match (booking_id, rating, review) {
            (Some(booking_id), Some(rating), Some(review)) if errors.is_empty() => Ok(Self {
                booking_id,
                rating,
                review,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "user_id": Uuid::new_v4().to_string(),
            "owner_id": Uuid::new_v4().to_string(),
            "start_date": "01/06/2025",
            "end_date": "03/06/2025",
            "sub_total": 90.0,
            "service_fee": 9.0,
            "grand_total": 99.0,
            "items": [{ "id": Uuid::new_v4().to_string(), "name": "Tent", "price": 30.0, "quantity": 1.0 }]
        })
    }

    #[test]
    fn parses_valid_payload() {
        let request = CreateBookingRequest::from_json(&valid_body()).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 1);
        assert_eq!(request.grand_total, 99.0);
        assert_eq!(request.items[0].name.as_deref(), Some("Tent"));
    }

    #[test]
    fn collects_every_bad_field() {
        let mut body = valid_body();
        body["user_id"] = json!("not-a-uuid");
        body["start_date"] = json!("2025-06-01");
        body["grand_total"] = json!("99");
        body.as_object_mut().unwrap().remove("owner_id");
        body["items"] = json!([{ "id": "x", "quantity": 0 }]);

        let errors = CreateBookingRequest::from_json(&body).unwrap_err();
        for field in ["user_id", "owner_id", "start_date", "grand_total", "items[0].id", "items[0].quantity"] {
            assert!(errors.has(field), "missing error for {}", field);
        }
    }

    #[test]
    fn rejects_reversed_range_and_empty_items() {
        let mut body = valid_body();
        body["start_date"] = json!("05/06/2025");
        body["items"] = json!([]);

        let errors = CreateBookingRequest::from_json(&body).unwrap_err();
        assert!(errors.has("end_date"));
        assert!(errors.has("items"));
    }

    #[test]
    fn non_object_body() {
        let errors = CreateBookingRequest::from_json(&json!([1, 2])).unwrap_err();
        assert!(errors.has("body"));
    }

    #[test]
    fn feedback_accepts_legacy_key() {
        let id = Uuid::new_v4();
        let request = FeedbackRequest::from_json(&json!({
            "bookingId": id.to_string(), "rating": 4, "review": " Great tent "
        }))
        .unwrap();
        assert_eq!(request.booking_id, id);
        assert_eq!(request.rating, 4);
        assert_eq!(request.review, "Great tent");
    }

    #[test]
    fn feedback_rating_bounds() {
        let errors = FeedbackRequest::from_json(&json!({
            "booking_id": Uuid::new_v4().to_string(), "rating": 6
        }))
        .unwrap_err();
        assert!(errors.has("rating"));
    }
}
