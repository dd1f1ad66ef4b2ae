use crate::client::error::ClientError;
use crate::core::helpers::{Request, Response};
use crate::core::store::Store;
use crate::router;

/// Moves one request to a server and brings back its response. Non-success
/// statuses are returned as responses, not errors.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, req: Request) -> Result<Response, ClientError>;
}

/// Talks to a running server over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, req: Request) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, req.uri());
        let (parts, body) = req.into_parts();

        let resp = self
            .client
            .request(parts.method, url)
            .headers(parts.headers)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;

        let mut response = Response::new(bytes.to_vec());
        *response.status_mut() = status;
        Ok(response)
    }
}

/// Calls the router in-process against a store, without a socket.
#[derive(Clone)]
pub struct LocalTransport {
    store: Store,
}

impl LocalTransport {
    pub fn new(store: Store) -> Self {
        LocalTransport { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl Transport for LocalTransport {
    async fn send(&self, req: Request) -> Result<Response, ClientError> {
        Ok(router::handle(&self.store, &req))
    }
}
