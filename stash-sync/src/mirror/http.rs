//! HTTP mirror client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use stash_types::RemoteAsset;

use super::{RemoteMirror, UploadRequest};
use crate::error::MirrorError;

/// Longest response body kept in a [`MirrorError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// A mirror reached over HTTP.
///
/// The identity is sent as a bearer token.
#[derive(Debug, Clone)]
pub struct HttpMirror {
    client: Client,
    base_url: String,
}

impl HttpMirror {
    /// Create a client for the mirror at `base_url`, e.g. `https://host/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// The base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn assets_url(&self) -> String {
        format!("{}/assets", self.base_url)
    }

    /// `{base}/assets/{remote_id}` with the id as one percent-encoded segment.
    fn asset_url(&self, remote_id: &str) -> Result<Url, MirrorError> {
        let mut url = parse_url(&self.assets_url())?;
        url.path_segments_mut()
            .map_err(|()| MirrorError::InvalidUrl(self.base_url.clone()))?
            .push(remote_id);
        Ok(url)
    }

    fn locator_url(&self, locator: &str) -> Result<Url, MirrorError> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            parse_url(locator)
        } else {
            parse_url(&format!("{}/{}", self.base_url, locator.trim_start_matches('/')))
        }
    }

    async fn fetch_bytes(&self, identity: &str, url: Url) -> Result<Vec<u8>, MirrorError> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(identity)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MirrorError::NotFound(url.to_string()));
        }
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn parse_url(url: &str) -> Result<Url, MirrorError> {
    Url::parse(url).map_err(|e| MirrorError::InvalidUrl(format!("{}: {}", url, e)))
}

/// Turn a non-success response into [`MirrorError::Status`].
async fn check_status(response: Response) -> Result<Response, MirrorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    Err(MirrorError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RemoteMirror for HttpMirror {
    async fn list(&self, identity: &str) -> Result<Vec<RemoteAsset>, MirrorError> {
        let response = self
            .client
            .get(self.assets_url())
            .bearer_auth(identity)
            .send()
            .await?;
        let assets = check_status(response).await?.json().await?;
        Ok(assets)
    }

    async fn upload(
        &self,
        identity: &str,
        request: UploadRequest,
    ) -> Result<RemoteAsset, MirrorError> {
        let part = Part::bytes(request.bytes)
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)?;
        let mut form = Form::new()
            .part("file", part)
            .text("fileName", request.file_name)
            .text("fileType", request.file_type)
            .text("mimeType", request.mime_type);
        if let Some(width) = request.width {
            form = form.text("width", width.to_string());
        }
        if let Some(height) = request.height {
            form = form.text("height", height.to_string());
        }

        let response = self
            .client
            .post(self.assets_url())
            .bearer_auth(identity)
            .multipart(form)
            .send()
            .await?;
        let asset = check_status(response).await?.json().await?;
        Ok(asset)
    }

    async fn download(&self, identity: &str, remote_id: &str) -> Result<Vec<u8>, MirrorError> {
        self.fetch_bytes(identity, self.asset_url(remote_id)?).await
    }

    async fn download_locator(
        &self,
        identity: &str,
        locator: &str,
    ) -> Result<Vec<u8>, MirrorError> {
        self.fetch_bytes(identity, self.locator_url(locator)?).await
    }

    async fn delete(&self, identity: &str, remote_id: &str) -> Result<(), MirrorError> {
        let response = self
            .client
            .delete(self.asset_url(remote_id)?)
            .bearer_auth(identity)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn asset_json(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "path": format!("/files/{}/{}", id, name),
            "createdAt": "2024-05-01T12:00:00Z",
            "updatedAt": "2024-05-01T12:00:00Z",
            "fileName": name,
            "fileType": "image",
            "mimeType": "image/jpeg",
            "size": 4,
            "width": 10,
            "height": 10
        })
    }

    fn upload(name: &str) -> UploadRequest {
        UploadRequest {
            file_name: name.to_string(),
            file_type: "image".to_string(),
            mime_type: "image/jpeg".to_string(),
            width: Some(10),
            height: Some(10),
            bytes: vec![1, 2, 3, 4],
        }
    }

    #[tokio::test]
    async fn list_sends_bearer_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/assets"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([asset_json("R1", "a.jpg"), asset_json("R2", "b.jpg")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mirror = HttpMirror::new(format!("{}/api/", server.uri()));
        let assets = mirror.list("token-1").await.unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].id, "R1");
        assert_eq!(assets[1].file_name, "b.jpg");
        assert_eq!(assets[0].width, Some(10));
    }

    #[tokio::test]
    async fn upload_posts_multipart_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/assets"))
            .and(body_string_contains("name=\"fileName\""))
            .and(body_string_contains("name=\"mimeType\""))
            .and(body_string_contains("name=\"width\""))
            .and(body_string_contains("a.jpg"))
            .respond_with(ResponseTemplate::new(201).set_body_json(asset_json("R9", "a.jpg")))
            .expect(1)
            .mount(&server)
            .await;

        let mirror = HttpMirror::new(server.uri());
        let remote = mirror.upload("token", upload("a.jpg")).await.unwrap();
        assert_eq!(remote.id, "R9");
        assert_eq!(remote.path, "/files/R9/a.jpg");
    }

    #[tokio::test]
    async fn upload_failure_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/assets"))
            .respond_with(ResponseTemplate::new(413).set_body_string("too large"))
            .mount(&server)
            .await;

        let mirror = HttpMirror::new(server.uri());
        let err = mirror.upload("token", upload("big.jpg")).await.unwrap_err();
        match err {
            MirrorError::Status { status, body } => {
                assert_eq!(status, 413);
                assert_eq!(body, "too large");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_list_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let mirror = HttpMirror::new(server.uri());
        assert!(matches!(
            mirror.list("token").await,
            Err(MirrorError::Http(_))
        ));
    }

    #[tokio::test]
    async fn download_by_id_and_locator() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/R1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8, 8, 7]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/R1/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2]))
            .mount(&server)
            .await;

        let mirror = HttpMirror::new(server.uri());
        assert_eq!(mirror.download("t", "R1").await.unwrap(), vec![9, 8, 7]);
        assert_eq!(
            mirror.download_locator("t", "/files/R1/a.jpg").await.unwrap(),
            vec![1, 2]
        );
        let absolute = format!("{}/files/R1/a.jpg", server.uri());
        assert_eq!(mirror.download_locator("t", &absolute).await.unwrap(), vec![1, 2]);

        assert!(matches!(
            mirror.download("t", "missing").await,
            Err(MirrorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_surfaces_non_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/assets/R1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/assets/R2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mirror = HttpMirror::new(server.uri());
        mirror.delete("t", "R1").await.unwrap();
        assert!(matches!(
            mirror.delete("t", "R2").await,
            Err(MirrorError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn remote_ids_are_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/assets/a%2Fb"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/assets/x%3Fy%23z"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8]))
            .expect(1)
            .mount(&server)
            .await;

        let mirror = HttpMirror::new(server.uri());
        mirror.delete("t", "a/b").await.unwrap();
        assert_eq!(mirror.download("t", "x?y#z").await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn invalid_base_url_is_an_error() {
        let mirror = HttpMirror::new("not a url");
        assert!(matches!(
            mirror.delete("t", "R1").await,
            Err(MirrorError::InvalidUrl(_))
        ));
    }
}
