//! Sign-in, sign-out and device session management.

use chrono::Utc;
use clubhouse_core::{SessionId, UserType};
use secrecy::SecretString;
use serde::de::IgnoredAny;
use tracing::instrument;

use super::types::{AccountSummary, DeviceSession, LoginRequest, LoginResponse};
use super::{ApiClient, ApiError, segment};
use crate::session::Session;

impl ApiClient {
    /// Sign in and make the returned session current.
    ///
    /// The session is persisted through the client's [`AuthContext`](crate::AuthContext).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials, or a session
    /// error if the session cannot be persisted.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        user_type: UserType,
        device_name: &str,
    ) -> Result<AccountSummary, ApiError> {
        let request = LoginRequest {
            email,
            password,
            user_type,
            device_name,
        };
        let response: LoginResponse = self.post("auth/login", &request).await?;

        let session = Session {
            token: SecretString::from(response.token),
            user_type: response.user.user_type,
            user_id: response.user.id.clone(),
            signed_in_at: Utc::now(),
        };
        self.auth().sign_in(session).await?;

        tracing::info!(user_type = %response.user.user_type, "Signed in");
        Ok(response.user)
    }

    /// Sign out on the backend and tear down the local session.
    ///
    /// The local session is torn down even when the backend call fails.
    ///
    /// # Errors
    ///
    /// Returns the backend error, if any, after tearing down.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let remote: Result<IgnoredAny, ApiError> = self.post("auth/logout", &()).await;
        self.auth().teardown().await?;

        match remote {
            // An expired token means the backend already forgot us
            Ok(_) | Err(ApiError::Unauthorized(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Devices signed in to the current account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_sessions(&self) -> Result<Vec<DeviceSession>, ApiError> {
        self.get("auth/sessions").await
    }

    /// Sign a device out remotely.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the session does not exist.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn revoke_session(&self, id: &SessionId) -> Result<(), ApiError> {
        let _: IgnoredAny = self.delete(&format!("auth/sessions/{}", segment(id.as_str())?)).await?;
        Ok(())
    }
}
