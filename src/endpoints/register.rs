use crate::{
    endpoints::Gateway,
    error::{ApiError, Failure},
};
use reqwest::Method;
use serde_derive::Serialize;
use serde_json::Value;

const REGISTRATION_FAILED: &str = "Registration failed";

/// The details needed to create an account.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// Create a new account, returning whatever the backend responds with.
pub async fn register(
    gateway: &Gateway,
    registration: &Registration<'_>,
) -> Result<Value, ApiError> {
    send_registration(gateway, registration)
        .await
        .map_err(|e| e.into_api_error(REGISTRATION_FAILED))
}

async fn send_registration(
    gateway: &Gateway,
    registration: &Registration<'_>,
) -> Result<Value, Failure> {
    log::debug!("Registering {}", registration.email);

    let request = gateway
        .request(Method::POST, "registerUser", None)?
        .form(registration);

    gateway.send_opaque(request).await
}
