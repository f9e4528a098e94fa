use bson::{oid::ObjectId, Bson};
use chrono::{NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// Serialize a model into response JSON with `ObjectId` as a hex string and
/// `DateTime` as RFC 3339, instead of the extended-JSON forms `serde_json`
/// would otherwise produce.
pub fn to_api_json<T: Serialize>(value: &T) -> Result<Value, AppError> {
    Ok(bson_to_json(bson::to_bson(value)?))
}

fn bson_to_json(bson: Bson) -> Value {
    match bson {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(date) => Value::String(
            date.try_to_rfc3339_string()
                .unwrap_or_else(|_| date.to_string()),
        ),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

pub fn parse_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::BadRequest(format!("Invalid id: {id}")))
}

/// Inclusive lower bound of a `YYYY-MM-DD` day in UTC.
pub fn day_start(date: &str) -> Option<bson::DateTime> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let start = day.and_hms_opt(0, 0, 0)?;

    Some(bson::DateTime::from_chrono(Utc.from_utc_datetime(&start)))
}

/// Inclusive upper bound of a `YYYY-MM-DD` day in UTC.
pub fn day_end(date: &str) -> Option<bson::DateTime> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let end = day.and_hms_opt(23, 59, 59)?;

    Some(bson::DateTime::from_chrono(Utc.from_utc_datetime(&end)))
}

/// Academic years look like `2024-2025` or `2024/2025`. Empty is allowed, the
/// settings autofill may legitimately be blank.
pub fn valid_academic_year(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }

    let re = Regex::new(r"^(20\d{2})[/-](20\d{2})$").unwrap();
    re.is_match(value)
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};
    use serde_json::Value;

    use super::{day_end, day_start, parse_id, to_api_json, valid_academic_year};

    #[test]
    fn test_api_json_object_id() {
        let oid = ObjectId::new();
        let json = to_api_json(&doc! { "_id": oid }).unwrap();

        assert_eq!(json["_id"], Value::String(oid.to_hex()));
    }

    #[test]
    fn test_api_json_date() {
        let json = to_api_json(&doc! { "at": bson::DateTime::from_millis(0) }).unwrap();

        assert_eq!(json["at"], Value::String("1970-01-01T00:00:00Z".into()));
    }

    #[test]
    fn test_api_json_nested() {
        let oid = ObjectId::new();
        let json = to_api_json(&doc! { "items": [ { "_id": oid, "n": 3 } ] }).unwrap();

        assert_eq!(json["items"][0]["_id"], Value::String(oid.to_hex()));
        assert_eq!(json["items"][0]["n"], Value::from(3));
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("not-an-id").is_err());
        assert!(parse_id(&ObjectId::new().to_hex()).is_ok());
    }

    #[test]
    fn test_day_bounds() {
        let start = day_start("2025-03-10").unwrap();
        let end = day_end("2025-03-10").unwrap();

        assert!(start < end);
        assert_eq!(
            start.try_to_rfc3339_string().unwrap(),
            "2025-03-10T00:00:00Z"
        );
        assert!(day_start("March 10").is_none());
    }

    #[test]
    fn test_academic_year() {
        assert!(valid_academic_year(""));
        assert!(valid_academic_year("2024-2025"));
        assert!(valid_academic_year("2024/2025"));
        assert!(!valid_academic_year("24-25"));
        assert!(!valid_academic_year("2024_2025"));
        assert!(!valid_academic_year("1999-2000"));
    }
}
