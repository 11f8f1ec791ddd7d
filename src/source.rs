//! Data-source capability
//!
//! The controller is parameterized by a pluggable fetch capability instead of
//! subclassing a static-grid base: [`HttpDataSource`] talks to a server,
//! [`StaticDataSource`] answers synchronously from pre-loaded rows, and tests
//! substitute recording fakes. `fetch` returns a boxed future so the trait
//! stays object-safe behind `Arc<dyn DataSource>`.

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{json, Value};

use crate::error::SourceError;
use crate::query::TransportParams;
use crate::types::ServerResponse;

/// A capability that resolves serialized query parameters to a page of rows.
pub trait DataSource: Send + Sync {
    /// Issues one fetch for the given parameters.
    ///
    /// The engine never cancels a fetch once issued; implementations should
    /// not assume the caller is still interested by the time they resolve.
    fn fetch(&self, params: TransportParams) -> BoxFuture<'static, Result<ServerResponse, SourceError>>;
}

/// Server-backed source: `GET <path>?<params>` with `Accept: application/json`.
pub struct HttpDataSource {
    client: reqwest::Client,
    path: String,
}

impl HttpDataSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), path)
    }

    /// Uses a caller-supplied client, e.g. one with custom middleware or TLS
    /// configuration.
    pub fn with_client(client: reqwest::Client, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl DataSource for HttpDataSource {
    fn fetch(&self, params: TransportParams) -> BoxFuture<'static, Result<ServerResponse, SourceError>> {
        let request = self
            .client
            .get(&self.path)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&params);

        async move {
            let body: Value = request.send().await?.error_for_status()?.json().await?;
            Ok(ServerResponse::from_body(body))
        }
        .boxed()
    }
}

/// In-memory source for grids with pre-loaded data.
///
/// Slices the stored rows by the `page`/`rows` parameters and reports the
/// full row count, so pagination behaves the same as against a server.
pub struct StaticDataSource {
    rows: Vec<Value>,
}

impl StaticDataSource {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }

    fn page(&self, params: &TransportParams) -> ServerResponse {
        let param = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.parse::<usize>().ok())
        };
        let page = param("page").unwrap_or(1).max(1);
        let page_size = param("rows").unwrap_or(self.rows.len().max(1));

        let start = (page - 1).saturating_mul(page_size).min(self.rows.len());
        let end = start.saturating_add(page_size).min(self.rows.len());
        let data: Vec<Value> = self.rows[start..end].to_vec();

        ServerResponse::from_body(json!({
            "records": self.rows.len(),
            "data": data,
        }))
    }
}

impl DataSource for StaticDataSource {
    fn fetch(&self, params: TransportParams) -> BoxFuture<'static, Result<ServerResponse, SourceError>> {
        future::ready(Ok(self.page(&params))).boxed()
    }
}
