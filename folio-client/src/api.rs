//! REST backend client.
//!
//! Every read follows one contract: `GET <path>` answers `{ <field>: ... }`
//! on success and `{ "detail": ... }` otherwise. Writes reuse the same error
//! shape.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use folio_core::error::{FolioError, Result};
use folio_core::types::{ArticleDraft, ChatMessage};

use crate::config::ClientConfig;

/// Client for the content backend.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl ApiClient {
    /// Creates a client from validated configuration.
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| FolioError::ConfigError(e.to_string()))?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| FolioError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Returns the backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FolioError::ConfigError(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn endpoint_for_path(&self, path: &str) -> Result<Url> {
        self.endpoint(path.split('/').filter(|s| !s.is_empty()))
    }

    fn authorized(builder: reqwest::RequestBuilder, bearer: Option<&str>) -> reqwest::RequestBuilder {
        match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetches one resource through the generic read contract.
    #[instrument(skip(self, bearer), fields(authenticated = bearer.is_some()))]
    pub async fn get_resource<V: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
        bearer: Option<&str>,
    ) -> Result<V> {
        let url = self.endpoint_for_path(path)?;
        let response = Self::authorized(self.http_client.get(url), bearer)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        let mut body: serde_json::Value = response.json().await.map_err(|e| FolioError::Api {
            status: status.as_u16(),
            detail: format!("response body is not JSON: {}", e),
        })?;

        let value = body
            .get_mut(field)
            .map(serde_json::Value::take)
            .ok_or_else(|| FolioError::Api {
                status: status.as_u16(),
                detail: format!("response is missing '{}'", field),
            })?;

        debug!(path, "Fetched resource");
        Ok(serde_json::from_value(value)?)
    }

    /// Publishes a new article, returning its id.
    #[instrument(skip(self, draft, bearer))]
    pub async fn create_article(&self, draft: &ArticleDraft, bearer: &str) -> Result<String> {
        let url = self.endpoint(["api", "articles"])?;
        let response = self
            .http_client
            .post(url)
            .bearer_auth(bearer)
            .json(draft)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let created: Created = response.json().await.map_err(|e| FolioError::Api {
            status: 201,
            detail: format!("unexpected create response: {}", e),
        })?;
        debug!(id = %created.id, "Article created");
        Ok(created.id)
    }

    /// Replaces an existing article.
    #[instrument(skip(self, draft, bearer))]
    pub async fn update_article(&self, id: &str, draft: &ArticleDraft, bearer: &str) -> Result<()> {
        let url = self.endpoint(["api", "articles", id])?;
        let response = self
            .http_client
            .put(url)
            .bearer_auth(bearer)
            .json(draft)
            .send()
            .await
            .map_err(transport_error)?;
        expect_success(response).await
    }

    /// Points the current user's avatar at `avatar_url`.
    #[instrument(skip(self, bearer))]
    pub async fn update_avatar(&self, avatar_url: &str, bearer: &str) -> Result<()> {
        let url = self.endpoint(["api", "user", "avatar"])?;
        let response = self
            .http_client
            .put(url)
            .bearer_auth(bearer)
            .json(&serde_json::json!({ "avatar": avatar_url }))
            .send()
            .await
            .map_err(transport_error)?;
        expect_success(response).await
    }

    /// Uploads an image, returning its public URL.
    #[instrument(skip(self, data, bearer), fields(bytes = data.len()))]
    pub async fn upload_image(&self, data: Vec<u8>, file_name: &str, bearer: &str) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(image_mime(file_name))
            .map_err(|e| FolioError::ValidationError(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let url = self.endpoint(["upload_image"])?;
        let response = self
            .http_client
            .post(url)
            .bearer_auth(bearer)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let uploaded: Uploaded = response.json().await.map_err(|e| FolioError::Api {
            status: 200,
            detail: format!("unexpected upload response: {}", e),
        })?;
        debug!(url = %uploaded.image_url, "Image uploaded");
        Ok(uploaded.image_url)
    }

    /// Deletes a previously uploaded image.
    #[instrument(skip(self, bearer))]
    pub async fn delete_image(&self, image_url: &str, bearer: &str) -> Result<()> {
        let url = self.endpoint(["delete_image"])?;
        let response = self
            .http_client
            .delete(url)
            .bearer_auth(bearer)
            .json(&serde_json::json!({ "image_url": image_url }))
            .send()
            .await
            .map_err(transport_error)?;
        expect_success(response).await
    }

    /// Loads the user's chat transcript from the backend.
    pub async fn get_chat_history(&self, bearer: &str) -> Result<Vec<ChatMessage>> {
        self.get_resource("/chat/history", "messages", Some(bearer)).await
    }

    /// Appends one message to the user's chat transcript on the backend.
    #[instrument(skip(self, message, bearer))]
    pub async fn post_chat_message(&self, message: &ChatMessage, bearer: &str) -> Result<()> {
        let url = self.endpoint(["chat", "history"])?;
        let response = self
            .http_client
            .post(url)
            .bearer_auth(bearer)
            .json(message)
            .send()
            .await
            .map_err(transport_error)?;
        expect_success(response).await
    }
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Uploaded {
    image_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

fn transport_error(e: reqwest::Error) -> FolioError {
    if e.is_timeout() {
        FolioError::ConnectionTimeout(e.to_string())
    } else {
        FolioError::HttpError(e.to_string())
    }
}

/// Builds an error from a non-success response, preferring its `detail`.
async fn api_error(response: reqwest::Response) -> FolioError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let detail = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !text.trim().is_empty() => text,
        Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
    };

    FolioError::Api {
        status: status.as_u16(),
        detail,
    }
}

async fn expect_success(response: reqwest::Response) -> Result<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(api_error(response).await)
    }
}

fn image_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
