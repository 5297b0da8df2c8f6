//! Student record types
//!
//! A `StudentRecord` is the persisted row; `StudentFields` is the mutable part
//! that callers supply on create and on full-record update.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Required fields, in the order they are validated and reported.
pub const REQUIRED_FIELDS: [&str; 6] = ["name", "address", "city", "state", "email", "phone"];

/// A student row as stored.
///
/// Values handed out by a store are snapshots; mutating one has no effect on
/// the persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Store-assigned identifier, never reused
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    /// Unique across all records
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentRecord {
    /// The mutable part of this record
    pub fn fields(&self) -> StudentFields {
        StudentFields {
            name: self.name.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// The caller-supplied fields of a student.
///
/// Updates are full-record: every field must be resupplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFields {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub email: String,
    pub phone: String,
}

impl StudentFields {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            city: city.into(),
            state: state.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    /// Parse fields out of a JSON request body.
    ///
    /// Fails with `Validation` naming the first field (in `REQUIRED_FIELDS`
    /// order) that is absent, null, not a string, or empty.
    pub fn from_json(body: &Value) -> Result<Self> {
        let object = body.as_object().ok_or(Error::InvalidBody)?;

        let mut values: Vec<String> = Vec::with_capacity(REQUIRED_FIELDS.len());
        for field in REQUIRED_FIELDS {
            match object.get(field).and_then(Value::as_str) {
                Some(value) if !value.is_empty() => values.push(value.to_string()),
                _ => return Err(Error::Validation(field)),
            }
        }

        let [name, address, city, state, email, phone]: [String; 6] =
            values.try_into().map_err(|_| Error::InvalidBody)?;
        Ok(Self { name, address, city, state, email, phone })
    }

    /// Check that every required field is non-empty
    pub fn validate(&self) -> Result<()> {
        for (field, value) in REQUIRED_FIELDS.into_iter().zip(self.values()) {
            if value.is_empty() {
                return Err(Error::Validation(field));
            }
        }
        Ok(())
    }

    /// Field values in `REQUIRED_FIELDS` order
    pub fn values(&self) -> [&str; 6] {
        [
            self.name.as_str(),
            self.address.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.email.as_str(),
            self.phone.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ana() -> Value {
        json!({
            "name": "Ana",
            "address": "1 St",
            "city": "X",
            "state": "Y",
            "email": "a@b.com",
            "phone": "123"
        })
    }

    #[test]
    fn test_from_json_complete() {
        let fields = StudentFields::from_json(&ana()).unwrap();
        assert_eq!(fields, StudentFields::new("Ana", "1 St", "X", "Y", "a@b.com", "123"));
    }

    #[test]
    fn test_from_json_reports_missing_field() {
        let mut body = ana();
        body.as_object_mut().unwrap().remove("phone");

        let err = StudentFields::from_json(&body).unwrap_err();
        assert!(matches!(err, Error::Validation("phone")));
        assert_eq!(err.to_string(), "Missing required field: phone");
    }

    #[test]
    fn test_from_json_reports_first_failing_field() {
        let mut body = ana();
        body["city"] = json!("");
        body["email"] = json!(null);

        let err = StudentFields::from_json(&body).unwrap_err();
        assert!(matches!(err, Error::Validation("city")));
    }

    #[test]
    fn test_from_json_rejects_non_string_values() {
        let mut body = ana();
        body["phone"] = json!(123);

        assert!(matches!(
            StudentFields::from_json(&body),
            Err(Error::Validation("phone"))
        ));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(
            StudentFields::from_json(&json!(["Ana"])),
            Err(Error::InvalidBody)
        ));
    }

    #[test]
    fn test_validate() {
        let mut fields = StudentFields::new("Ana", "1 St", "X", "Y", "a@b.com", "123");
        assert!(fields.validate().is_ok());

        fields.state.clear();
        assert!(matches!(fields.validate(), Err(Error::Validation("state"))));
    }
}
