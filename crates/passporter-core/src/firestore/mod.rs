//! Minimal Firestore REST client.
//!
//! Documents are exchanged as plain serde types; the typed `Value` wire
//! encoding is handled by [`value`].

pub mod value;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::FirebaseConfig;
use crate::error::{Error, Result};
use crate::util::compact_text;

const PAGE_SIZE: u32 = 300;

/// Comparison operators supported by [`FieldFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl FilterOp {
    const fn as_wire(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Self::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        }
    }
}

/// A single-field predicate for [`FirestoreClient::run_query`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// Firestore REST client bound to one project's default database.
#[derive(Clone)]
pub struct FirestoreClient {
    documents_url: String,
    api_key: String,
    id_token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("FirestoreClient")
            .field("documents_url", &self.documents_url)
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl FirestoreClient {
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        Ok(Self {
            documents_url: config.documents_url.clone(),
            api_key: config.api_key.clone(),
            id_token: None,
            client: Client::builder().build()?,
        })
    }

    /// A copy of this client that authenticates as the signed-in user.
    #[must_use]
    pub fn with_id_token(&self, id_token: impl Into<String>) -> Self {
        Self {
            id_token: Some(id_token.into()),
            ..self.clone()
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.id_token.is_some()
    }

    /// Fetch one document, `None` when it does not exist.
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>> {
        let request = self.request(self.client.get(self.document_url(collection, id)));
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document: Document = Self::parse_response(response).await?;
        Ok(Some(document.into_model()?))
    }

    /// List every document in a collection, following pagination.
    pub async fn list_documents<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.documents_url, collection);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let request = self.request(self.client.get(&url).query(&query));
            let page: ListDocumentsResponse = Self::parse_response(request.send().await?).await?;
            for document in page.documents {
                models.push(document.into_model()?);
            }
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Listed {} documents from {collection}", models.len());
        Ok(models)
    }

    /// Create a document with a client-chosen id; fails if it already exists.
    pub async fn create_document<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        model: &T,
    ) -> Result<()> {
        let body = json!({ "fields": value::encode_fields(&serde_json::to_value(model)?)? });
        let request = self.request(
            self.client
                .post(format!("{}/{}", self.documents_url, collection))
                .query(&[("documentId", id)])
                .json(&body),
        );
        let _: Value = Self::parse_response(request.send().await?).await?;
        Ok(())
    }

    /// Replace a document wholesale, creating it when missing.
    pub async fn set_document<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        model: &T,
    ) -> Result<()> {
        let body = json!({ "fields": value::encode_fields(&serde_json::to_value(model)?)? });
        let request = self.request(
            self.client
                .patch(self.document_url(collection, id))
                .json(&body),
        );
        let _: Value = Self::parse_response(request.send().await?).await?;
        Ok(())
    }

    /// Replace an existing document wholesale; `NotFound` when it is missing.
    pub async fn update_document<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        model: &T,
    ) -> Result<()> {
        let body = json!({ "fields": value::encode_fields(&serde_json::to_value(model)?)? });
        let request = self.request(
            self.client
                .patch(self.document_url(collection, id))
                .query(&[("currentDocument.exists", "true")])
                .json(&body),
        );
        let _: Value = Self::parse_response(request.send().await?).await?;
        Ok(())
    }

    /// Run a structured query with AND-combined field filters.
    pub async fn run_query<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<T>> {
        let body = build_structured_query(collection, filters);
        let request = self.request(
            self.client
                .post(format!("{}:runQuery", self.documents_url))
                .json(&body),
        );
        let results: Vec<RunQueryResult> = Self::parse_response(request.send().await?).await?;
        results
            .into_iter()
            .filter_map(|result| result.document)
            .map(Document::into_model)
            .collect()
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_url,
            collection,
            urlencoding::encode(id)
        )
    }

    fn request(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.query(&[("key", self.api_key.as_str())]);
        match &self.id_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(status, &body));
        }
        Ok(response.json::<T>().await?)
    }
}

/// Build the `runQuery` request body for AND-combined filters.
pub fn build_structured_query(collection: &str, filters: &[FieldFilter]) -> Value {
    let field_filters: Vec<Value> = filters
        .iter()
        .map(|filter| {
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": filter.field },
                    "op": filter.op.as_wire(),
                    "value": value::encode_value(&filter.value),
                }
            })
        })
        .collect();

    let mut query = json!({ "from": [{ "collectionId": collection }] });
    match field_filters.len() {
        0 => {}
        1 => query["where"] = field_filters.into_iter().next().unwrap_or_default(),
        _ => {
            query["where"] = json!({
                "compositeFilter": { "op": "AND", "filters": field_filters }
            });
        }
    }
    json!({ "structuredQuery": query })
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Value,
}

impl Document {
    /// Decode fields, filling `id` from the document path when absent.
    fn into_model<T: DeserializeOwned>(self) -> Result<T> {
        let mut object = value::decode_fields(&self.fields)?;
        let id = self.name.rsplit('/').next().unwrap_or_default();
        if let Value::Object(entries) = &mut object {
            entries
                .entry("id")
                .or_insert_with(|| Value::String(id.to_string()));
        }
        Ok(serde_json::from_value(object)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryResult {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: Option<String>,
    status: Option<String>,
}

/// Map a failed Firestore response onto the error taxonomy.
pub fn map_api_error(status: StatusCode, body: &str) -> Error {
    let parsed = serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|payload| payload.error);
    let message = parsed
        .as_ref()
        .and_then(|error| error.message.clone())
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            let trimmed = compact_text(body);
            if trimmed.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                trimmed
            }
        });
    let code = parsed.and_then(|error| error.status).unwrap_or_default();

    match (status, code.as_str()) {
        (StatusCode::NOT_FOUND, _) | (_, "NOT_FOUND") => Error::NotFound(message),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _)
        | (_, "PERMISSION_DENIED" | "UNAUTHENTICATED") => Error::PermissionDenied(message),
        (StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT, _)
        | (_, "UNAVAILABLE" | "DEADLINE_EXCEEDED") => Error::Network(message),
        _ => Error::Unknown(format!("{message} ({})", status.as_u16())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BorderPoint;
    use pretty_assertions::assert_eq;

    #[test]
    fn structured_query_combines_filters_with_and() {
        let body = build_structured_query(
            "borderPoints",
            &[
                FieldFilter::new("latitude", FilterOp::GreaterThanOrEqual, 45.0),
                FieldFilter::new("latitude", FilterOp::LessThanOrEqual, 48.0),
            ],
        );
        assert_eq!(
            body["structuredQuery"]["where"]["compositeFilter"]["op"],
            json!("AND")
        );
        let filters = body["structuredQuery"]["where"]["compositeFilter"]["filters"]
            .as_array()
            .unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(
            filters[0]["fieldFilter"]["op"],
            json!("GREATER_THAN_OR_EQUAL")
        );
        assert_eq!(
            filters[1]["fieldFilter"]["value"],
            json!({ "doubleValue": 48.0 })
        );
    }

    #[test]
    fn structured_query_single_filter_is_unwrapped() {
        let body = build_structured_query(
            "borderUpdates",
            &[FieldFilter::new("borderPointId", FilterOp::Equal, "p1")],
        );
        assert_eq!(
            body["structuredQuery"]["where"]["fieldFilter"]["value"],
            json!({ "stringValue": "p1" })
        );
        assert_eq!(
            body["structuredQuery"]["from"],
            json!([{ "collectionId": "borderUpdates" }])
        );
    }

    #[test]
    fn document_id_comes_from_path_when_missing() {
        let document: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/borderPoints/karawanken",
            "fields": {
                "latitude": { "doubleValue": 46.44 },
                "longitude": { "doubleValue": 14.02 },
                "status": { "stringValue": "OPEN" }
            }
        }))
        .unwrap();
        let point: BorderPoint = document.into_model().unwrap();
        assert_eq!(point.id.as_str(), "karawanken");
    }

    #[test]
    fn api_errors_map_to_taxonomy() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        assert!(matches!(
            map_api_error(StatusCode::FORBIDDEN, body),
            Error::PermissionDenied(message) if message == "Missing or insufficient permissions."
        ));
        assert!(matches!(
            map_api_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            Error::Network(message) if message == "HTTP 503"
        ));
        assert!(matches!(
            map_api_error(StatusCode::CONFLICT, r#"{"error":{"message":"Document already exists","status":"ALREADY_EXISTS"}}"#),
            Error::Unknown(message) if message == "Document already exists (409)"
        ));
    }
}
