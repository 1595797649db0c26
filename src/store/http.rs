//! Paperless-style REST client
//!
//! Resources live under `/api/<kind>/`, list endpoints are paginated with a
//! `next` link, and documents reference their type by id.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{
    CustomField, CustomFieldType, Document, DocumentStore, DocumentType, DocumentUpdate,
    ResourceId, ResourceKind, StoragePath, Tag,
};
use crate::config::DocumentStoreConfig;
use crate::error::{StoreError, StoreResult};

const TAGS: &str = "api/tags/";
const DOCUMENT_TYPES: &str = "api/document_types/";
const STORAGE_PATHS: &str = "api/storage_paths/";
const CUSTOM_FIELDS: &str = "api/custom_fields/";
const DOCUMENTS: &str = "api/documents/";

#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

/// Document as the API returns it
#[derive(Debug, Deserialize)]
struct ApiDocument {
    id: ResourceId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    document_type: Option<ResourceId>,
    #[serde(default)]
    tags: Vec<ResourceId>,
}

impl ApiDocument {
    fn resolve(self, type_names: &HashMap<ResourceId, String>) -> Document {
        Document {
            id: self.id,
            title: self.title,
            document_type: self
                .document_type
                .and_then(|id| type_names.get(&id).cloned()),
            tags: self.tags,
        }
    }
}

pub struct HttpDocumentStore {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(config: DocumentStoreConfig) -> StoreResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: normalize_base(&config.base_url)?,
            token: config.token,
        })
    }

    /// Build from `DOCUMENT_STORE_URL` / `DOCUMENT_STORE_TOKEN`
    pub fn from_env() -> anyhow::Result<Self> {
        let config = DocumentStoreConfig::from_env()?;
        Ok(Self::new(config)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> StoreResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn item(&self, collection: &str, id: ResourceId) -> StoreResult<Url> {
        self.endpoint(&format!("{}{}/", collection, id))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("Token {}", token)),
            None => request,
        }
    }

    async fn checked(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        })
    }

    /// GET every page of a list endpoint
    async fn list_all<T: DeserializeOwned>(&self, mut url: Url) -> StoreResult<Vec<T>> {
        let mut items = Vec::new();
        loop {
            debug!("GET {}", url);
            let response = self.authorized(self.http.get(url.clone())).send().await?;
            let page: Page<T> = Self::checked(response).await?.json().await?;
            items.extend(page.results);

            match page.next {
                Some(next) => url = Url::parse(&next)?,
                None => break,
            }
        }
        Ok(items)
    }

    /// First item whose `name` equals `name` ignoring case
    async fn find_named<T: DeserializeOwned>(
        &self,
        collection: &str,
        name: &str,
        name_of: impl Fn(&T) -> &str,
    ) -> StoreResult<Option<T>> {
        let mut url = self.endpoint(collection)?;
        url.query_pairs_mut().append_pair("name__iexact", name);
        let wanted = name.to_lowercase();
        Ok(self
            .list_all::<T>(url)
            .await?
            .into_iter()
            .find(|item| name_of(item).to_lowercase() == wanted))
    }

    async fn create<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        collection: &str,
        name: &str,
        body: serde_json::Value,
    ) -> StoreResult<T> {
        let url = self.endpoint(collection)?;
        debug!("POST {} {}", url, name);
        let response = self.authorized(self.http.post(url)).json(&body).send().await?;
        match Self::checked(response).await {
            Ok(response) => Ok(response.json().await?),
            Err(StoreError::Rejected { status, message }) => Err(StoreError::CreateFailed {
                kind,
                name: name.to_string(),
                message: format!("{}: {}", status, message),
            }),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, kind: ResourceKind, collection: &str, id: ResourceId) -> StoreResult<()> {
        let url = self.item(collection, id)?;
        debug!("DELETE {}", url);
        let response = self.authorized(self.http.delete(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound { kind, id });
        }
        match Self::checked(response).await {
            Ok(_) => Ok(()),
            Err(StoreError::Rejected { status, message }) => Err(StoreError::DeleteFailed {
                kind,
                id,
                message: format!("{}: {}", status, message),
            }),
            Err(e) => Err(e),
        }
    }

    async fn type_names(&self) -> StoreResult<HashMap<ResourceId, String>> {
        Ok(self
            .list_document_types()
            .await?
            .into_iter()
            .map(|dt| (dt.id, dt.name))
            .collect())
    }
}

/// Base URL with a trailing slash so relative joins append rather than replace
fn normalize_base(base_url: &str) -> StoreResult<Url> {
    let trimmed = base_url.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{}/", trimmed))?)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get_or_create_tag(&self, name: &str, color: Option<&str>) -> StoreResult<Tag> {
        if let Some(tag) = self.find_named::<Tag>(TAGS, name, |t| &t.name).await? {
            return Ok(tag);
        }
        let body = match color {
            Some(color) => json!({ "name": name, "color": color }),
            None => json!({ "name": name }),
        };
        self.create(ResourceKind::Tag, TAGS, name, body).await
    }

    async fn get_or_create_document_type(&self, name: &str) -> StoreResult<DocumentType> {
        if let Some(dt) = self
            .find_named::<DocumentType>(DOCUMENT_TYPES, name, |d| &d.name)
            .await?
        {
            return Ok(dt);
        }
        self.create(
            ResourceKind::DocumentType,
            DOCUMENT_TYPES,
            name,
            json!({ "name": name }),
        )
        .await
    }

    async fn get_or_create_storage_path(&self, path: &str) -> StoreResult<StoragePath> {
        if let Some(sp) = self
            .find_named::<StoragePath>(STORAGE_PATHS, path, |s| &s.name)
            .await?
        {
            return Ok(sp);
        }
        self.create(
            ResourceKind::StoragePath,
            STORAGE_PATHS,
            path,
            json!({ "name": path, "path": path }),
        )
        .await
    }

    async fn create_custom_field(
        &self,
        name: &str,
        data_type: CustomFieldType,
    ) -> StoreResult<CustomField> {
        self.create(
            ResourceKind::CustomField,
            CUSTOM_FIELDS,
            name,
            json!({ "name": name, "data_type": data_type }),
        )
        .await
    }

    async fn delete_tag(&self, id: ResourceId) -> StoreResult<()> {
        self.delete(ResourceKind::Tag, TAGS, id).await
    }

    async fn delete_document_type(&self, id: ResourceId) -> StoreResult<()> {
        self.delete(ResourceKind::DocumentType, DOCUMENT_TYPES, id).await
    }

    async fn delete_storage_path(&self, id: ResourceId) -> StoreResult<()> {
        self.delete(ResourceKind::StoragePath, STORAGE_PATHS, id).await
    }

    async fn delete_custom_field(&self, id: ResourceId) -> StoreResult<()> {
        self.delete(ResourceKind::CustomField, CUSTOM_FIELDS, id).await
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        self.list_all(self.endpoint(TAGS)?).await
    }

    async fn list_document_types(&self) -> StoreResult<Vec<DocumentType>> {
        self.list_all(self.endpoint(DOCUMENT_TYPES)?).await
    }

    async fn list_storage_paths(&self) -> StoreResult<Vec<StoragePath>> {
        self.list_all(self.endpoint(STORAGE_PATHS)?).await
    }

    async fn list_custom_fields(&self) -> StoreResult<Vec<CustomField>> {
        self.list_all(self.endpoint(CUSTOM_FIELDS)?).await
    }

    async fn get_documents(&self) -> StoreResult<Vec<Document>> {
        let type_names = self.type_names().await?;
        let docs: Vec<ApiDocument> = self.list_all(self.endpoint(DOCUMENTS)?).await?;
        Ok(docs.into_iter().map(|d| d.resolve(&type_names)).collect())
    }

    async fn get_document(&self, id: ResourceId) -> StoreResult<Option<Document>> {
        let url = self.item(DOCUMENTS, id)?;
        let response = self.authorized(self.http.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: ApiDocument = Self::checked(response).await?.json().await?;
        let type_names = self.type_names().await?;
        Ok(Some(doc.resolve(&type_names)))
    }

    async fn update_document(
        &self,
        id: ResourceId,
        update: DocumentUpdate,
    ) -> StoreResult<Document> {
        let url = self.item(DOCUMENTS, id)?;
        debug!("PATCH {}", url);
        let response = self
            .authorized(self.http.patch(url))
            .json(&update)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                kind: ResourceKind::Document,
                id,
            });
        }
        let doc: ApiDocument = match Self::checked(response).await {
            Ok(response) => response.json().await?,
            Err(StoreError::Rejected { status, message }) => {
                return Err(StoreError::UpdateFailed {
                    id,
                    message: format!("{}: {}", status, message),
                })
            }
            Err(e) => return Err(e),
        };
        let type_names = self.type_names().await?;
        Ok(doc.resolve(&type_names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let base = normalize_base("http://paperless.local:8000/root").unwrap();
        assert_eq!(base.as_str(), "http://paperless.local:8000/root/");
        assert_eq!(
            base.join(TAGS).unwrap().as_str(),
            "http://paperless.local:8000/root/api/tags/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpDocumentStore::new(DocumentStoreConfig::new("not a url")).err();
        assert!(matches!(err, Some(StoreError::InvalidUrl(_))));
    }

    #[test]
    fn test_item_url() {
        let store = HttpDocumentStore::new(DocumentStoreConfig::new("http://localhost:8000"))
            .unwrap();
        assert_eq!(
            store.item(DOCUMENTS, 17).unwrap().as_str(),
            "http://localhost:8000/api/documents/17/"
        );
    }

    #[test]
    fn test_page_and_document_resolution() {
        let page: Page<ApiDocument> = serde_json::from_str(
            r#"{
                "count": 2,
                "next": "http://localhost:8000/api/documents/?page=2",
                "results": [
                    {"id": 1, "title": "Scan", "document_type": 5, "tags": [2, 3], "notes": []},
                    {"id": 2, "title": "Untyped", "document_type": null, "tags": []}
                ]
            }"#,
        )
        .unwrap();
        assert!(page.next.is_some());

        let names: HashMap<ResourceId, String> = [(5, "Medical".to_string())].into();
        let docs: Vec<Document> = page.results.into_iter().map(|d| d.resolve(&names)).collect();
        assert_eq!(docs[0].document_type.as_deref(), Some("Medical"));
        assert_eq!(docs[0].tags, vec![2, 3]);
        assert_eq!(docs[1].document_type, None);
    }
}
