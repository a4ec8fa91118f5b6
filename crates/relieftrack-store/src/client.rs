//! HTTP client for the hosted tabular store.
//!
//! The store exposes tables and views over REST: reads are `GET
//! /<table>?<column>=eq.<value>&order=<column>.<asc|desc>`, inserts are
//! `POST /<table>` with a `Prefer` header choosing between a minimal ack and
//! the created rows, and partial updates are `PATCH /<table>` filtered by an
//! equality predicate. Every request authenticates with an `apikey` header
//! plus the same key as a bearer token.

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// Sort direction for an `order` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Ascending (`<column>.asc`).
    Ascending,
    /// Descending (`<column>.desc`).
    Descending,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// What the store should return from a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnPreference {
    /// Acknowledge only (`return=minimal`).
    Minimal,
    /// Echo the affected rows back (`return=representation`).
    Representation,
}

impl fmt::Display for ReturnPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimal => write!(f, "return=minimal"),
            Self::Representation => write!(f, "return=representation"),
        }
    }
}

/// Client for one tabular store endpoint.
///
/// Cheap to clone; the underlying HTTP client is shared.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    /// Build a client for the store rooted at `base_url`, authenticating
    /// every request with `api_key`.
    ///
    /// `base_url` is the REST root (for a hosted project this usually ends
    /// in `/rest/v1`); a trailing slash is tolerated.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty, the key cannot be carried
    /// in a header, or the HTTP client cannot be constructed.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StoreError::settings("base URL is empty"));
        }
        if api_key.is_empty() {
            return Err(StoreError::settings("API key is empty"));
        }

        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| StoreError::settings("API key contains invalid header characters"))?;
        key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| StoreError::settings("API key contains invalid header characters"))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Start a read against a table or view.
    #[must_use]
    pub fn select(&self, table: &str) -> SelectRequest<'_> {
        SelectRequest {
            client: self,
            table: table.to_string(),
            query: Vec::new(),
        }
    }

    /// Start an insert into a table.
    #[must_use]
    pub fn insert(&self, table: &str) -> InsertRequest<'_> {
        InsertRequest {
            client: self,
            table: table.to_string(),
        }
    }

    /// Start a partial update against a table.
    #[must_use]
    pub fn update(&self, table: &str) -> UpdateRequest<'_> {
        UpdateRequest {
            client: self,
            table: table.to_string(),
            query: Vec::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }
}

/// Read the response body and map non-success statuses to [`StoreError::Http`].
async fn read_success(response: reqwest::Response) -> Result<(u16, String)> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        warn!(status = status.as_u16(), "store request rejected");
        return Err(StoreError::http(status.as_u16(), body));
    }
    Ok((status.as_u16(), body))
}

/// A pending read, built up from equality filters and ordering.
#[derive(Debug)]
pub struct SelectRequest<'a> {
    client: &'a StoreClient,
    table: String,
    query: Vec<(String, String)>,
}

impl SelectRequest<'_> {
    /// Keep only rows where `column` equals `value`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.query.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Order the result by `column` in the given direction.
    #[must_use]
    pub fn order(mut self, column: &str, direction: Order) -> Self {
        self.query
            .push(("order".to_string(), format!("{column}.{direction}")));
        self
    }

    /// Restrict the projection (`select=` parameter).
    #[must_use]
    pub fn columns(mut self, projection: &str) -> Self {
        self.query
            .push(("select".to_string(), projection.to_string()));
        self
    }

    /// Execute the read and decode the rows.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success response, or a
    /// body that does not decode as rows of `T`.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let url = self.client.table_url(&self.table);
        debug!(table = %self.table, params = self.query.len(), "store select");
        let response = self.client.http.get(&url).query(&self.query).send().await?;
        let (_, body) = read_success(response).await?;
        serde_json::from_str(&body).map_err(|source| StoreError::decode(&self.table, source))
    }

    /// Execute the read and decode the first row, if any.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SelectRequest::fetch`].
    pub async fn fetch_first<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let mut rows: Vec<T> = self.fetch().await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.remove(0)))
        }
    }
}

/// A pending insert.
#[derive(Debug)]
pub struct InsertRequest<'a> {
    client: &'a StoreClient,
    table: String,
}

impl InsertRequest<'_> {
    /// Insert `payload`, asking for a minimal ack.
    ///
    /// Returns the response status so callers can distinguish a plain
    /// success from the created status the store answers with.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success response.
    pub async fn send_minimal<P: Serialize + ?Sized>(self, payload: &P) -> Result<u16> {
        let url = self.client.table_url(&self.table);
        debug!(table = %self.table, "store insert (minimal)");
        let response = self
            .client
            .http
            .post(&url)
            .header("Prefer", ReturnPreference::Minimal.to_string())
            .json(payload)
            .send()
            .await?;
        let (status, _) = read_success(response).await?;
        Ok(status)
    }

    /// Insert `payload` and decode the created rows.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success response, or a
    /// body that does not decode as rows of `T`.
    pub async fn send_returning<P, T>(self, payload: &P) -> Result<Vec<T>>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.client.table_url(&self.table);
        debug!(table = %self.table, "store insert (representation)");
        let response = self
            .client
            .http
            .post(&url)
            .header("Prefer", ReturnPreference::Representation.to_string())
            .json(payload)
            .send()
            .await?;
        let (_, body) = read_success(response).await?;
        serde_json::from_str(&body).map_err(|source| StoreError::decode(&self.table, source))
    }
}

/// A pending partial update, filtered by equality predicates.
#[derive(Debug)]
pub struct UpdateRequest<'a> {
    client: &'a StoreClient,
    table: String,
    query: Vec<(String, String)>,
}

impl UpdateRequest<'_> {
    /// Update only rows where `column` equals `value`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.query.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Send the partial update.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success response.
    pub async fn send<P: Serialize + ?Sized>(self, payload: &P) -> Result<u16> {
        let url = self.client.table_url(&self.table);
        debug!(table = %self.table, params = self.query.len(), "store update");
        let response = self
            .client
            .http
            .patch(&url)
            .query(&self.query)
            .header("Prefer", ReturnPreference::Minimal.to_string())
            .json(payload)
            .send()
            .await?;
        let (status, _) = read_success(response).await?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> StoreClient {
        StoreClient::new("https://store.example/rest/v1", "test-key")
            .expect("failed to build test client")
    }

    #[test]
    fn test_new_rejects_empty_base_url() {
        let result = StoreClient::new("", "key");
        assert!(matches!(result, Err(StoreError::Settings { .. })));
    }

    #[test]
    fn test_new_rejects_empty_api_key() {
        let result = StoreClient::new("https://store.example", "");
        assert!(matches!(result, Err(StoreError::Settings { .. })));
    }

    #[test]
    fn test_new_rejects_invalid_api_key() {
        let result = StoreClient::new("https://store.example", "bad\nkey");
        assert!(matches!(result, Err(StoreError::Settings { .. })));
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let client = StoreClient::new("https://store.example/rest/v1/", "key")
            .expect("failed to build client");
        assert_eq!(
            client.table_url("camiones"),
            "https://store.example/rest/v1/camiones"
        );
    }

    #[test]
    fn test_select_builds_eq_and_order_params() {
        let client = test_client();
        let request = client
            .select("recorrido_puntos")
            .eq("camion_id", 7)
            .order("recorded_at", Order::Ascending);
        assert_eq!(
            request.query,
            vec![
                ("camion_id".to_string(), "eq.7".to_string()),
                ("order".to_string(), "recorded_at.asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_columns_param() {
        let client = test_client();
        let request = client.select("kits_entregados").columns("*");
        assert_eq!(
            request.query,
            vec![("select".to_string(), "*".to_string())]
        );
    }

    #[test]
    fn test_update_builds_eq_param() {
        let client = test_client();
        let request = client
            .update("codigos_qr")
            .eq("uuid", "abc-123");
        assert_eq!(
            request.query,
            vec![("uuid".to_string(), "eq.abc-123".to_string())]
        );
    }

    #[test]
    fn test_order_display() {
        assert_eq!(Order::Ascending.to_string(), "asc");
        assert_eq!(Order::Descending.to_string(), "desc");
    }

    #[test]
    fn test_return_preference_display() {
        assert_eq!(ReturnPreference::Minimal.to_string(), "return=minimal");
        assert_eq!(
            ReturnPreference::Representation.to_string(),
            "return=representation"
        );
    }
}
