//! The Taskboard API's endpoints.

mod login;
mod logout;
mod register;
mod tasks;

pub use login::login;
pub use logout::logout;
pub use register::{register, Registration};
pub use tasks::{create_task, delete_task, get_all_tasks, update_task};

pub(crate) use tasks::{
    CREATE_FAILED, DELETE_FAILED, FETCH_FAILED, UPDATE_FAILED,
};

use crate::{error::ErrorBody, error::Failure, Config};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Sends requests to a Taskboard backend, attaching the bearer token when
/// there is one.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    base_url: Url,
}

impl Gateway {
    /// Create a [`Gateway`] with its own HTTP client.
    pub fn new(config: &Config) -> Result<Gateway, reqwest::Error> {
        let mut builder =
            Client::builder().user_agent(crate::DEFAULT_USER_AGENT);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Gateway::with_client(builder.build()?, config))
    }

    /// Create a [`Gateway`] which reuses an existing HTTP client.
    pub fn with_client(client: Client, config: &Config) -> Gateway {
        Gateway {
            client,
            base_url: config.base_url().clone(),
        }
    }

    pub fn base_url(&self) -> &Url { &self.base_url }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> Result<RequestBuilder, Failure> {
        let url = self.base_url.join(path)?;
        log::debug!("Sending a {} request to {}", method, url);

        let request = self.client.request(method, url);

        Ok(match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    /// Send a request, making sure the backend gave us a successful response.
    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
    ) -> Result<Response, Failure> {
        let response = request.send().await?;
        log::trace!("Headers: {:#?}", response.headers());

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await?;
        log::trace!("Error response: {}", String::from_utf8_lossy(&body));

        match ErrorBody::parse(&body) {
            Some(body) => {
                log::debug!("The backend rejected the request with {}", status);
                Err(Failure::Rejected { status, body })
            },
            None => Err(Failure::Status { status }),
        }
    }

    /// Send a request and deserialize the JSON it responds with.
    pub(crate) async fn send_json<T>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, Failure>
    where
        T: DeserializeOwned,
    {
        let body = self.send(request).await?.bytes().await?;
        log::trace!("Response: {}", String::from_utf8_lossy(&body));

        serde_json::from_slice(&body).map_err(Failure::Decode)
    }

    /// Send a request whose response we don't interpret. JSON bodies are
    /// parsed, an empty body becomes `null`, and anything else is kept as a
    /// string.
    pub(crate) async fn send_opaque(
        &self,
        request: RequestBuilder,
    ) -> Result<Value, Failure> {
        let body = self.send(request).await?.bytes().await?;
        log::trace!("Response: {}", String::from_utf8_lossy(&body));

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).into_owned())
        }))
    }
}
