use async_trait::async_trait;
use crate::core::error::DirectoryError;
use crate::core::store::ProfileDirectory;
use crate::models::{Profile, UserId};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<AppwriteError> for DirectoryError {
    fn from(err: AppwriteError) -> Self {
        match err {
            AppwriteError::InvalidResponse(msg) => DirectoryError::InvalidResponse(msg),
            other => DirectoryError::Unavailable(other.to_string()),
        }
    }
}

/// Appwrite API client
///
/// Read-only access to the profile collection:
/// - Fetching a single profile by user id
/// - Listing every profile of a university
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
    page_size: usize,
}

/// Documents requested per listing page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub user_profiles: String,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        timeout: Duration,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the listing page size (at least 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn documents_url(&self, queries: &[String]) -> Result<String, AppwriteError> {
        let queries_json = serde_json::to_string(queries)
            .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to encode query: {}", e)))?;

        Ok(format!(
            "{}/databases/{}/collections/{}/documents?query={}",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            self.collections.user_profiles,
            urlencoding::encode(&queries_json)
        ))
    }

    /// Run one document query against the profile collection
    async fn list_page(&self, queries: &[String]) -> Result<ProfilePage, AppwriteError> {
        let url = self.documents_url(queries)?;

        tracing::debug!("Querying profiles: {:?}", queries);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppwriteError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Profile query failed: {} - {}", status, body);
            return Err(AppwriteError::ApiError(format!("Failed to query profiles: {}", status)));
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        // Incomplete profile documents are skipped rather than failing the listing
        let profiles: Vec<Profile> = documents
            .iter()
            .filter_map(|doc| {
                let data = doc.get("data").unwrap_or(doc);
                match serde_json::from_value(data.clone()) {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        tracing::warn!("Skipping unparseable profile document: {}", e);
                        None
                    }
                }
            })
            .collect();

        Ok(ProfilePage {
            profiles,
            documents: documents.len(),
            total: json.get("total").and_then(Value::as_u64),
        })
    }

    /// Get a single profile by user ID
    pub async fn fetch_profile(&self, user_id: &UserId) -> Result<Option<Profile>, AppwriteError> {
        let queries = [equal_query("userId", user_id.as_str())?, "limit(1)".to_string()];
        let page = self.list_page(&queries).await?;

        Ok(page.profiles.into_iter().find(|p| &p.id == user_id))
    }

    /// List all profiles of a university, following pages until the listing
    /// is exhausted
    pub async fn fetch_university(&self, university: &str) -> Result<Vec<Profile>, AppwriteError> {
        let filter = equal_query("university", university)?;
        let mut profiles = Vec::new();
        let mut offset = 0;

        loop {
            let queries = [
                filter.clone(),
                format!("limit({})", self.page_size),
                format!("offset({})", offset),
            ];
            let page = self.list_page(&queries).await?;

            offset += page.documents;
            profiles.extend(page.profiles);

            let exhausted = page.total.map_or(false, |total| offset as u64 >= total);
            if page.documents < self.page_size || exhausted {
                break;
            }
        }

        tracing::debug!("Fetched {} profiles for {}", profiles.len(), university);

        Ok(profiles
            .into_iter()
            .filter(|p| p.university == university)
            .collect())
    }
}

/// Documents returned by one listing request
struct ProfilePage {
    profiles: Vec<Profile>,
    /// Raw document count, including skipped documents
    documents: usize,
    total: Option<u64>,
}

/// `equal("attribute", "value")` with the value JSON-escaped
fn equal_query(attribute: &str, value: &str) -> Result<String, AppwriteError> {
    let quoted = serde_json::to_string(value)
        .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to encode query: {}", e)))?;
    Ok(format!("equal(\"{}\", {})", attribute, quoted))
}

#[async_trait]
impl ProfileDirectory for AppwriteClient {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, DirectoryError> {
        Ok(self.fetch_profile(id).await?)
    }

    async fn query_by_university(&self, university: &str) -> Result<Vec<Profile>, DirectoryError> {
        Ok(self.fetch_university(university).await?)
    }
}
