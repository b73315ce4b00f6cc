use crate::{
    endpoints::Gateway,
    error::{ApiError, Failure},
};
use reqwest::Method;

const LOGOUT_FAILED: &str = "Logout failed";

/// Tell the server to invalidate a user's session, logging them out.
pub async fn logout(gateway: &Gateway, token: &str) -> Result<(), ApiError> {
    send_logout(gateway, token)
        .await
        .map_err(|e| e.into_api_error(LOGOUT_FAILED))
}

async fn send_logout(gateway: &Gateway, token: &str) -> Result<(), Failure> {
    let request = gateway.request(Method::POST, "logoutUser", Some(token))?;
    gateway.send(request).await?;

    Ok(())
}
