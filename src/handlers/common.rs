use crate::{
    auth::{presented_token, AccessGate, AuthContext, ACCESS_TOKEN_FIELD},
    errors::ServiceError,
};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;

pub const INVALID_BODY_MESSAGE: &str = "Invalid request body.";
pub const INVALID_ID_MESSAGE: &str = "Invalid ID format.";

/// Query parameter used to filter list endpoints; may repeat (`?id=1&id=2`)
const ID_PARAM: &str = "id";

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Decoded query string: the token plus every `id` value, in order.
#[derive(Debug, Default)]
pub struct QueryParams {
    access_token: Option<String>,
    ids: Vec<String>,
}

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(raw) = raw else {
            return params;
        };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                ACCESS_TOKEN_FIELD if params.access_token.is_none() => {
                    params.access_token = Some(value.into_owned());
                }
                ID_PARAM => params.ids.push(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// Parses the `id` filter. Every supplied value must be an integer;
    /// blanks and `1,2` are rejected. An empty result means no filter.
    pub fn ids(&self) -> Result<Vec<i64>, ServiceError> {
        self.ids
            .iter()
            .map(|raw| {
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| ServiceError::ValidationError(INVALID_ID_MESSAGE.to_string()))
            })
            .collect()
    }
}

#[derive(Debug)]
enum RequestBody {
    Empty,
    Object(Map<String, Value>),
    Malformed,
}

impl RequestBody {
    fn parse(bytes: &[u8], form_encoded: bool) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }

        if form_encoded {
            let fields = url::form_urlencoded::parse(bytes)
                .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
                .collect();
            return Self::Object(fields);
        }

        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => Self::Object(fields),
            Ok(Value::Null) => Self::Empty,
            _ => Self::Malformed,
        }
    }

    fn access_token(&self) -> Option<&str> {
        match self {
            Self::Object(fields) => fields.get(ACCESS_TOKEN_FIELD).and_then(Value::as_str),
            Self::Empty | Self::Malformed => None,
        }
    }
}

/// Raw API request: query string and body, held undecoded until the access
/// token has been checked.
///
/// Extraction never fails, so a bad token is reported even when the body
/// is unreadable.
#[derive(Debug)]
pub struct ApiRequest {
    query: QueryParams,
    body: RequestBody,
}

impl ApiRequest {
    pub fn new(raw_query: Option<&str>, body: &[u8], form_encoded: bool) -> Self {
        Self {
            query: QueryParams::parse(raw_query),
            body: RequestBody::parse(body, form_encoded),
        }
    }

    /// Runs the access gate on the body token, falling back to the query token.
    pub fn authorize(&self, gate: &AccessGate) -> Result<AuthContext, ServiceError> {
        gate.authorize(presented_token(
            self.body.access_token(),
            self.query.access_token.as_deref(),
        ))
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Decodes the body into a typed request. A missing body decodes like `{}`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ServiceError> {
        let fields = match self.body {
            RequestBody::Object(fields) => fields,
            RequestBody::Empty => Map::new(),
            RequestBody::Malformed => {
                return Err(ServiceError::ValidationError(INVALID_BODY_MESSAGE.to_string()));
            }
        };

        serde_json::from_value(Value::Object(fields))
            .map_err(|e| ServiceError::ValidationError(e.to_string()))
    }
}

#[async_trait]
impl<S> FromRequest<S> for ApiRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let raw_query = req.uri().query().map(str::to_owned);
        let form_encoded = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        let request = match Bytes::from_request(req, state).await {
            Ok(body) => Self::new(raw_query.as_deref(), &body, form_encoded),
            Err(_) => Self {
                query: QueryParams::parse(raw_query.as_deref()),
                body: RequestBody::Malformed,
            },
        };
        Ok(request)
    }
}

/// Parses an `{id}` path segment. Non-integers name no record, so they are
/// reported like a missing one.
pub fn path_id(raw: &str, not_found: &str) -> Result<i32, ServiceError> {
    raw.parse::<i32>()
        .map_err(|_| ServiceError::NotFound(not_found.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use serde::Deserialize;

    fn gate() -> AccessGate {
        AccessGate::new("omni_pretest_token")
    }

    #[derive(Debug, Deserialize)]
    struct Named {
        name: Option<String>,
    }

    #[test]
    fn repeated_id_keys_are_collected() {
        let query = QueryParams::parse(Some("id=1&access_token=t&id=2&id=%203%20"));
        assert_eq!(query.ids().unwrap(), vec![1, 2, 3]);
        assert_eq!(query.access_token.as_deref(), Some("t"));
    }

    #[rstest]
    #[case("id=abc")]
    #[case("id=1,2")]
    #[case("id=1&id=1.5")]
    fn malformed_ids_are_rejected(#[case] raw: &str) {
        assert_matches!(
            QueryParams::parse(Some(raw)).ids(),
            Err(ServiceError::ValidationError(msg)) if msg == INVALID_ID_MESSAGE
        );
    }

    #[test]
    fn blank_id_is_malformed() {
        assert_matches!(
            QueryParams::parse(Some("id=&access_token=t")).ids(),
            Err(ServiceError::ValidationError(msg)) if msg == INVALID_ID_MESSAGE
        );
        assert!(QueryParams::parse(Some("access_token=t")).ids().unwrap().is_empty());
        assert!(QueryParams::parse(None).ids().unwrap().is_empty());
    }

    #[test]
    fn ids_beyond_key_range_still_parse() {
        let query = QueryParams::parse(Some("id=3000000000&id=-7"));
        assert_eq!(query.ids().unwrap(), vec![3_000_000_000, -7]);
    }

    #[test]
    fn body_token_wins_over_query_token() {
        let request = ApiRequest::new(
            Some("access_token=wrong"),
            br#"{"access_token": "omni_pretest_token"}"#,
            false,
        );
        assert!(request.authorize(&gate()).is_ok());
    }

    #[test]
    fn query_token_is_used_without_body_token() {
        let request = ApiRequest::new(Some("access_token=omni_pretest_token"), b"", false);
        assert!(request.authorize(&gate()).is_ok());
    }

    #[test]
    fn malformed_body_still_reports_bad_token_first() {
        let request = ApiRequest::new(None, b"{not json", false);
        assert_matches!(request.authorize(&gate()), Err(ServiceError::Forbidden(_)));
        assert_matches!(
            request.json::<Named>(),
            Err(ServiceError::ValidationError(msg)) if msg == INVALID_BODY_MESSAGE
        );
    }

    #[test]
    fn non_object_json_body_is_malformed() {
        let request = ApiRequest::new(None, b"[1, 2]", false);
        assert_matches!(request.json::<Named>(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn form_encoded_body_is_accepted() {
        let request = ApiRequest::new(None, b"access_token=omni_pretest_token&name=Widget", true);
        assert!(request.authorize(&gate()).is_ok());
        assert_eq!(request.json::<Named>().unwrap().name.as_deref(), Some("Widget"));
    }

    #[test]
    fn empty_body_decodes_as_empty_object() {
        let request = ApiRequest::new(None, b"", false);
        assert!(request.json::<Named>().unwrap().name.is_none());
    }

    #[test]
    fn path_ids_must_be_integers() {
        assert_eq!(path_id("42", "Order not found.").unwrap(), 42);
        assert_matches!(
            path_id("abc", "Order not found."),
            Err(ServiceError::NotFound(msg)) if msg == "Order not found."
        );
    }
}
