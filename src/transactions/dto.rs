use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use crate::error::ApiError;

/// Request body for creating or overwriting a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
}

/// Query string for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Parse optional RFC 3339 range bounds, naming the offending field in the
/// rejection.
pub(crate) fn parse_date_range(
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> Result<(Option<OffsetDateTime>, Option<OffsetDateTime>), ApiError> {
    let parse = |value: Option<&str>, field: &str| {
        value
            .map(|s| {
                OffsetDateTime::parse(s, &Rfc3339).map_err(|_| {
                    ApiError::Validation(format!(
                        "invalid '{field}' format, use RFC 3339 (e.g. 2006-01-02T15:04:05Z)"
                    ))
                })
            })
            .transpose()
    };
    Ok((parse(date_from, "date_from")?, parse(date_to, "date_to")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_bounds() {
        let (from, to) = parse_date_range(Some("2024-03-01T00:00:00Z"), Some("2024-03-31T23:59:59Z"))
            .expect("both bounds parse");
        assert!(from.unwrap() < to.unwrap());
    }

    #[test]
    fn missing_bounds_stay_open() {
        let (from, to) = parse_date_range(None, None).expect("open range");
        assert!(from.is_none());
        assert!(to.is_none());
    }

    #[test]
    fn a_malformed_bound_names_the_field() {
        let err = parse_date_range(Some("yesterday"), None).unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("date_from")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
