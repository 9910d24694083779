use anyhow::{anyhow, Context, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    Document, DocumentDraft, DocumentSummary, DocumentUpdate, Envelope, HealthResponse,
    LoginPayload, LoginRequest,
};

/// Thin typed wrapper over the documentation server's JSON API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.request(Method::GET, "/health").send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Server health check failed: {}", response.status()));
        }
        Ok(response.json().await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginPayload> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .request(Method::POST, "/api/users/auth/login")
            .json(&body)
            .send()
            .await?;
        data(response).await
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let response = self.request(Method::GET, "/api/docs").send().await?;
        data(response).await
    }

    pub async fn get_document(&self, identifier: &str) -> Result<Document> {
        let response = self
            .request(Method::GET, &format!("/api/docs/id/{identifier}"))
            .send()
            .await?;
        data(response).await
    }

    pub async fn create_document(&self, draft: &DocumentDraft) -> Result<Document> {
        self.send_json(Method::POST, "/api/docs", draft).await
    }

    pub async fn update_document(&self, identifier: &str, update: &DocumentUpdate) -> Result<Document> {
        self.send_json(Method::PUT, &format!("/api/docs/{identifier}"), update)
            .await
    }

    pub async fn delete_document(&self, identifier: &str) -> Result<Document> {
        let response = self
            .request(Method::DELETE, &format!("/api/docs/{identifier}"))
            .send()
            .await?;
        data(response).await
    }

    /// Server-rendered HTML page for a document.
    pub async fn render(&self, identifier: &str) -> Result<String> {
        let response = self
            .request(Method::GET, &format!("/render/{identifier}"))
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("{status}: {text}"));
        }
        Ok(text)
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.request(method, path).json(body).send().await?;
        data(response).await
    }
}

/// Unwrap an envelope, turning `sucesso: false` into an error carrying the
/// server's message.
async fn data<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let envelope: Envelope<T> = response
        .json()
        .await
        .with_context(|| format!("Unexpected response ({status})"))?;
    unwrap_envelope(status, envelope)
}

fn unwrap_envelope<T>(status: StatusCode, envelope: Envelope<T>) -> Result<T> {
    if !envelope.sucesso || !status.is_success() {
        return Err(anyhow!(
            "{status}: {}",
            envelope.mensagem.unwrap_or_else(|| "request failed".to_string())
        ));
    }
    envelope
        .dados
        .ok_or_else(|| anyhow!("Response ({status}) carried no data"))
}
