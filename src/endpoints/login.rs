use crate::{
    endpoints::Gateway,
    error::{ApiError, Failure},
    session::{LoggedIn, Session},
};
use reqwest::Method;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

const LOGIN_FAILED: &str = "Login failed";

/// Exchange an email and password for a new [`Session`].
pub async fn login(
    gateway: &Gateway,
    email: &str,
    password: &str,
) -> Result<LoggedIn, ApiError> {
    send_login(gateway, email, password)
        .await
        .map_err(|e| e.into_api_error(LOGIN_FAILED))
}

async fn send_login(
    gateway: &Gateway,
    email: &str,
    password: &str,
) -> Result<LoggedIn, Failure> {
    let data = Data { email, password };
    log::trace!("Logging in as {}", email);

    let request = gateway.request(Method::POST, "loginUser", None)?.form(&data);
    let payload: Value = gateway.send_json(request).await?;

    interpret_response(payload, email)
}

fn interpret_response(
    payload: Value,
    email: &str,
) -> Result<LoggedIn, Failure> {
    let response: LoginResponse = serde_json::from_value(payload.clone())
        .map_err(|_| Failure::InvalidLoginResponse)?;

    let user = response.user.ok_or(Failure::InvalidLoginResponse)?;
    let user_id = user
        .user_id
        .and_then(identifier)
        .ok_or(Failure::InvalidLoginResponse)?;
    let token = response
        .token
        .filter(|token| !token.is_empty())
        .ok_or(Failure::InvalidLoginResponse)?;
    let email = user
        .email
        .filter(|email| !email.is_empty())
        .unwrap_or_else(|| email.to_string());

    Ok(LoggedIn {
        session: Session::new(user_id, email, token),
        payload,
    })
}

/// User ids may come back as strings or numbers.
fn identifier(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Copy, Clone, Serialize)]
struct Data<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct User {
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    email: Option<String>,
}
