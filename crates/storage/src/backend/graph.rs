//! Microsoft Graph (OneDrive) storage backend.
//!
//! Talks to the drive of the signed-in user through the Graph REST API.
//!
//! # Listing
//!
//! Children are fetched by expanding them inline on the folder itself
//! (`root:{path}?$expand=children`), which yields the folder's `childCount`
//! alongside the children in one request. The service caps expanded
//! collections (around 200 entries) and offers no continuation link for them;
//! callers are expected to re-list after moving items out of the folder.
//!
//! # Credentials
//!
//! A [`TokenHandle`] is asked for a bearer token before every request.

use crate::auth::TokenHandle;
use crate::error::{ErrorKind, Result};
use crate::models::{FolderFacet, FolderReference, Listing, RemoteItem};
use crate::{StorageBackend, validate_path};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const DEFAULT_ENDPOINT: &str = "https://graph.microsoft.com/v1.0/me/drive";
/// Error bodies are only logged; keep them short.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    id: String,
    name: String,
    created_date_time: Option<String>,
    file: Option<FileFacet>,
    folder: Option<FolderFacetWire>,
    photo: Option<PhotoFacet>,
    #[serde(default)]
    children: Vec<DriveItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileFacet {
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderFacetWire {
    #[serde(default)]
    child_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotoFacet {
    taken_date_time: Option<String>,
}

impl DriveItem {
    fn into_remote(self) -> RemoteItem {
        let created = parse_timestamp(&self.id, "createdDateTime", self.created_date_time.as_deref());
        let taken = parse_timestamp(&self.id, "takenDateTime", self.photo.and_then(|p| p.taken_date_time).as_deref());
        RemoteItem {
            id: self.id,
            name: self.name,
            mime_type: self.file.and_then(|f| f.mime_type),
            created,
            taken,
            folder: self.folder.map(|f| FolderFacet { child_count: f.child_count }),
        }
    }
}

/// Unparseable timestamps are treated as absent rather than failing the whole
/// listing; date resolution decides whether the item is still usable.
fn parse_timestamp(id: &str, field: &str, value: Option<&str>) -> Option<OffsetDateTime> {
    let value = value?;
    match OffsetDateTime::parse(value, &Rfc3339) {
        Ok(ts) => Some(ts),
        Err(e) => {
            tracing::warn!(item = id, field, value, error = %e, "Ignoring unparseable timestamp");
            None
        },
    }
}

/// OneDrive storage backend.
///
/// # Examples
///
/// ```no_run
/// use drivesort_storage::StaticToken;
/// use drivesort_storage::backend::GraphBackend;
/// use std::sync::Arc;
///
/// let backend = GraphBackend::new("onedrive", Arc::new(StaticToken::new("eyJ0eXAi...")));
/// ```
#[derive(Clone)]
pub struct GraphBackend {
    name: String,
    client: Client,
    endpoint: Url,
    tokens: TokenHandle,
}

impl GraphBackend {
    pub fn new(name: impl Into<String>, tokens: TokenHandle) -> Self {
        Self::with_client(name, Client::new(), tokens)
    }

    /// Use an existing HTTP client (shared connection pool, custom timeouts).
    pub fn with_client(name: impl Into<String>, client: Client, tokens: TokenHandle) -> Self {
        // Infallible: the default endpoint is a valid URL literal.
        let endpoint = Url::parse(DEFAULT_ENDPOINT).expect("default Graph endpoint is a valid URL");
        Self {
            name: name.into(),
            client,
            endpoint,
            tokens,
        }
    }

    /// Point the backend at a different drive root, e.g.
    /// `https://graph.microsoft.com/v1.0/drives/{drive-id}`.
    pub fn with_endpoint(mut self, endpoint: impl AsRef<str>) -> Result<Self> {
        let endpoint = endpoint.as_ref();
        self.endpoint = Url::parse(endpoint).or_raise(|| ErrorKind::InvalidPath(endpoint.to_string()))?;
        Ok(self)
    }

    /// `{endpoint}/root:/{segments...}`
    fn path_url(&self, path: &str) -> Result<Url> {
        let path = validate_path(path)?;
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| exn::Exn::from(ErrorKind::InvalidPath(self.endpoint.to_string())))?
            .pop_if_empty()
            .push("root:")
            .extend(path.trim_start_matches('/').split('/'));
        Ok(url)
    }

    /// `{endpoint}/items/{id}`
    fn item_url(&self, id: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| exn::Exn::from(ErrorKind::InvalidPath(self.endpoint.to_string())))?
            .pop_if_empty()
            .push("items")
            .push(id);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder, subject: &str) -> Result<DriveItem> {
        let response = request.send().await.or_raise(|| ErrorKind::Network(subject.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(body.floor_char_boundary(MAX_ERROR_BODY));
            tracing::debug!(%status, subject, body = %body, "Graph request rejected");
            exn::bail!(status_error(status, subject));
        }
        response.json::<DriveItem>().await.or_raise(|| ErrorKind::InvalidResponse(subject.to_string()))
    }
}

fn status_error(status: StatusCode, subject: &str) -> ErrorKind {
    let subject = subject.to_string();
    match status {
        StatusCode::UNAUTHORIZED => ErrorKind::Auth(format!("token rejected for {subject}")),
        StatusCode::FORBIDDEN => ErrorKind::PermissionDenied(subject),
        StatusCode::NOT_FOUND => ErrorKind::NotFound(subject),
        StatusCode::CONFLICT => ErrorKind::AlreadyExists(subject),
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::Throttled,
        s if s.is_server_error() => ErrorKind::Network(format!("{s} for {subject}")),
        s => ErrorKind::BackendError(format!("{s} for {subject}")),
    }
}

#[async_trait]
impl StorageBackend for GraphBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self), fields(backend = %self.name))]
    async fn list_children(&self, folder: &str) -> Result<Listing> {
        let mut url = self.path_url(folder)?;
        url.query_pairs_mut().append_pair("$expand", "children");
        let request = self.request(Method::GET, url).await?;
        let item = self.send(request, folder).await?;
        let Some(facet) = item.folder else {
            exn::bail!(ErrorKind::InvalidPath(folder.to_string()));
        };
        let children = item.children.into_iter().map(DriveItem::into_remote);
        let listing = Listing::new(children, facet.child_count);
        tracing::debug!(returned = listing.len(), total = listing.total, "Listed folder");
        Ok(listing)
    }

    #[tracing::instrument(skip(self), fields(backend = %self.name))]
    async fn ensure_folder(&self, path: &str) -> Result<FolderReference> {
        // PATCH on a path creates the item (and every missing parent) when it
        // does not exist yet, and is a no-op update when it does.
        let url = self.path_url(path)?;
        let request = self.request(Method::PATCH, url).await?.json(&json!({ "folder": {} }));
        let item = self.send(request, path).await?;
        Ok(FolderReference { id: item.id, path: validate_path(path)? })
    }

    #[tracing::instrument(skip(self), fields(backend = %self.name))]
    async fn move_item(&self, item_id: &str, destination_id: &str, name: &str) -> Result<RemoteItem> {
        let url = self.item_url(item_id)?;
        let body = json!({
            "parentReference": { "id": destination_id },
            "name": name,
        });
        let request = self.request(Method::PATCH, url).await?.json(&body);
        Ok(self.send(request, name).await?.into_remote())
    }
}
