//! Cliente HTTP para la API de Gesticar
//!
//! Habla el mismo contrato JSON que expone el servidor de este crate. El
//! token Bearer se guarda en el cliente tras `auth/login` y se agrega a
//! cada request.

use http::{Method, StatusCode};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::utils::errors::{AppError, AppResult, ErrorResponse};

pub struct GesticarApiClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl GesticarApiClient {
    pub fn new(base_url: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Segmento de ruta codificado para URL
    pub fn segment(value: &str) -> String {
        urlencoding::encode(value).into_owned()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header("Accept", "application/json");
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> AppResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        debug!("🌐 {} {}", status.as_u16(), response.url().path());
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => format!("Error HTTP: {}", status),
        };
        warn!("⚠️ API respondió {}: {}", status, message);
        Err(match status {
            StatusCode::BAD_REQUEST => AppError::BadRequest(message),
            StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
            StatusCode::FORBIDDEN => AppError::Forbidden(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::CONFLICT => AppError::Conflict(message),
            _ => AppError::ExternalApi(message),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let builder = self.request(Method::GET, path).await;
        Ok(self.send(builder).await?.json().await?)
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> AppResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path).await.query(query);
        Ok(self.send(builder).await?.json().await?)
    }

    /// GET donde un 404 significa "no existe"
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> AppResult<Option<T>> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> AppResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(method, path).await.json(body);
        Ok(self.send(builder).await?.json().await?)
    }

    /// Request sin cuerpo que solo interesa por su estado
    pub async fn send_empty(&self, method: Method, path: &str) -> AppResult<()> {
        let builder = self.request(method, path).await;
        self.send(builder).await?;
        Ok(())
    }

    pub async fn send_for<T: DeserializeOwned>(&self, method: Method, path: &str) -> AppResult<T> {
        let builder = self.request(method, path).await;
        Ok(self.send(builder).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let client = GesticarApiClient::new("http://localhost:8080/api/").unwrap();
        assert_eq!(client.url("ots/1"), "http://localhost:8080/api/ots/1");
        assert_eq!(client.url("/auth/login"), "http://localhost:8080/api/auth/login");
    }

    #[test]
    fn test_segment_encoding() {
        assert_eq!(GesticarApiClient::segment("12.345 678-5"), "12.345%20678-5");
    }

    #[tokio::test]
    async fn test_token_store() {
        let client = GesticarApiClient::new("http://localhost").unwrap();
        assert!(!client.has_token().await);
        client.set_token(Some("abc".to_string())).await;
        assert!(client.has_token().await);
        client.set_token(None).await;
        assert!(!client.has_token().await);
    }
}
