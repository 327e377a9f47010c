//! Typed client for the processor REST API.
//!
//! A client built with [`Credentials`] signs every request with the project
//! key; a client built without them (e.g. pointed at a local mock processor)
//! sends plain requests.

use std::time::Duration;

use reqwest::{Client, Method, header};
use serde::de::DeserializeOwned;
use url::Url;

use super::{ClientError, Credentials, Environment};
use crate::objects::{
    Invoice, InvoiceEnvelope, InvoicePage, InvoiceRequest, PublicKeyEntry, PublicKeyList,
    Transfer, TransferEnvelope, TransferRequest, Webhook, WebhookEnvelope, WebhookList,
    WebhookRequest,
};
use crate::signature::{
    ACCESS_ID_HEADER, ACCESS_SIGNATURE_HEADER, ACCESS_TIME_HEADER, access_message, sign_message,
};

const USER_AGENT: &str = concat!("payflow-sdk/", env!("CARGO_PKG_VERSION"));

/// Typed HTTP client for the processor API.
#[derive(Debug, Clone)]
pub struct ProcessorClient {
    http: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl ProcessorClient {
    /// Create an unauthenticated client rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
            credentials: None,
        }
    }

    /// Create an authenticated client for one of the hosted environments.
    pub fn for_environment(
        environment: Environment,
        credentials: Credentials,
    ) -> Result<Self, ClientError> {
        Ok(Self::new(environment.base_url()?).with_credentials(credentials))
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Bound every request (connect, send and body read) by `timeout`.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(self.with_http_client(http))
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    // -----------------------------------------------------------------------
    // Invoices
    // -----------------------------------------------------------------------

    /// `POST /v2/invoice` – create all invoices in one call.
    pub async fn create_invoices(
        &self,
        invoices: Vec<InvoiceRequest>,
    ) -> Result<Vec<Invoice>, ClientError> {
        let body = serde_json::to_string(&InvoiceEnvelope { invoices })?;
        let created: InvoiceEnvelope<Invoice> =
            self.send(Method::POST, "/v2/invoice", &[], Some(body)).await?;
        Ok(created.invoices)
    }

    /// `GET /v2/invoice` – first page of invoices, optionally filtered by status.
    pub async fn list_invoices(
        &self,
        status: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Invoice>, ClientError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        let page: InvoicePage = self.send(Method::GET, "/v2/invoice", &query, None).await?;
        Ok(page.invoices)
    }

    // -----------------------------------------------------------------------
    // Transfers
    // -----------------------------------------------------------------------

    /// `POST /v2/transfer`
    pub async fn create_transfers(
        &self,
        transfers: Vec<TransferRequest>,
    ) -> Result<Vec<Transfer>, ClientError> {
        let body = serde_json::to_string(&TransferEnvelope { transfers })?;
        let created: TransferEnvelope<Transfer> =
            self.send(Method::POST, "/v2/transfer", &[], Some(body)).await?;
        Ok(created.transfers)
    }

    // -----------------------------------------------------------------------
    // Public keys
    // -----------------------------------------------------------------------

    /// `GET /v2/public-key` – the processor's event-signing keys, newest first.
    pub async fn public_keys(&self, limit: u32) -> Result<Vec<PublicKeyEntry>, ClientError> {
        let list: PublicKeyList = self
            .send(
                Method::GET,
                "/v2/public-key",
                &[("limit", limit.to_string())],
                None,
            )
            .await?;
        Ok(list.public_keys)
    }

    // -----------------------------------------------------------------------
    // Webhooks
    // -----------------------------------------------------------------------

    /// `GET /v2/webhook`
    pub async fn list_webhooks(&self) -> Result<Vec<Webhook>, ClientError> {
        let list: WebhookList = self.send(Method::GET, "/v2/webhook", &[], None).await?;
        Ok(list.webhooks)
    }

    /// `POST /v2/webhook`
    pub async fn create_webhook(
        &self,
        url: &str,
        subscriptions: Vec<String>,
    ) -> Result<Webhook, ClientError> {
        let body = serde_json::to_string(&WebhookRequest {
            url: url.to_string(),
            subscriptions,
        })?;
        let created: WebhookEnvelope =
            self.send(Method::POST, "/v2/webhook", &[], Some(body)).await?;
        Ok(created.webhook)
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<String>,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let body = body.unwrap_or_default();

        let mut request = self
            .http
            .request(method, url)
            .query(query)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT_LANGUAGE, "en-US");

        for (name, value) in self.auth_headers(&body, time::OffsetDateTime::now_utc()) {
            request = request.header(name, value);
        }

        if !body.is_empty() {
            request = request.body(body);
        }

        parse_response(request.send().await?).await
    }

    /// Authentication headers for a request carrying `body`, empty when the
    /// client has no credentials.
    fn auth_headers(&self, body: &str, now: time::OffsetDateTime) -> Vec<(&'static str, String)> {
        let Some(credentials) = &self.credentials else {
            return Vec::new();
        };
        let access_id = credentials.access_id();
        let access_time = format!("{}.{:06}", now.unix_timestamp(), now.microsecond());
        let signature = sign_message(
            access_message(&access_id, &access_time, body).as_bytes(),
            &credentials.signing_key,
        );
        vec![
            (ACCESS_ID_HEADER, access_id),
            (ACCESS_TIME_HEADER, access_time),
            (ACCESS_SIGNATURE_HEADER, signature),
        ]
    }
}

async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
