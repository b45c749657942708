//! Request body extractors and the loose field types the browser sends.

use crate::error::{ApiError, INVALID_BODY, NO_DATA};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// JSON body that must be a non-empty object; anything else is
/// `400 No data provided`. An object whose fields have the wrong types is
/// `400 Invalid request body`.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(%rejection, "rejected request body");
            ApiError::BadRequest(NO_DATA.to_string())
        })?;

        if !value.as_object().is_some_and(|fields| !fields.is_empty()) {
            return Err(ApiError::BadRequest(NO_DATA.to_string()));
        }

        serde_json::from_value(value).map(Self).map_err(|e| {
            tracing::debug!("request body has an unexpected shape: {e}");
            ApiError::BadRequest(INVALID_BODY.to_string())
        })
    }
}

/// JSON body where a missing or unreadable body means "no fields".
pub struct LenientJson<T>(pub T);

impl<S, T> FromRequest<S> for LenientJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.unwrap_or_default();
        Ok(Self(serde_json::from_slice(&bytes).unwrap_or_default()))
    }
}

/// Accepts `"1"`, `1` or `null` for catalog keys and session ids.
pub fn key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts a positive number or numeric string; anything else is `None`.
pub fn positive_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number
        .filter(|n| n.is_finite() && *n >= 1.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32))
}

/// Treats `null` like a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "key")]
        role: Option<String>,
        #[serde(default, deserialize_with = "positive_number")]
        minutes: Option<u32>,
        #[serde(default, deserialize_with = "null_as_default")]
        asked: Vec<String>,
    }

    fn probe(raw: &str) -> Probe {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn keys_accept_strings_and_numbers() {
        assert_eq!(probe(r#"{"role": "2"}"#).role.as_deref(), Some("2"));
        assert_eq!(probe(r#"{"role": 3}"#).role.as_deref(), Some("3"));
        assert_eq!(probe(r#"{"role": null}"#).role, None);
        assert_eq!(probe("{}").role, None);
    }

    #[test]
    fn durations_must_be_positive() {
        assert_eq!(probe(r#"{"minutes": 10}"#).minutes, Some(10));
        assert_eq!(probe(r#"{"minutes": "15"}"#).minutes, Some(15));
        assert_eq!(probe(r#"{"minutes": 0}"#).minutes, None);
        assert_eq!(probe(r#"{"minutes": "soon"}"#).minutes, None);
    }

    #[test]
    fn null_lists_become_empty() {
        assert!(probe(r#"{"asked": null}"#).asked.is_empty());
        assert_eq!(probe(r#"{"asked": ["a"]}"#).asked, vec!["a"]);
    }
}
