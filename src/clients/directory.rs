//! Typed client for the directory REST API. One method per endpoint, bearer
//! token kept in memory and attached to every request. Non-2xx responses
//! surface as `Err` carrying the server-provided error message. No retry,
//! no caching, no offline queue.

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::models::{
    AdminBusinessQuery, AdminUpdateBusinessRequest, AdminUpdateUserRequest, AdminUserQuery,
    ApiResponse, ApprovalRequest, AuthResponse, Business,
    BusinessAnalytics, ChangePasswordRequest, CreateBusinessRequest, DirectoryQuery,
    DistributionDashboard, FeatureRequest, LoginRequest, Paged, PlatformStats, RegisterRequest,
    SaveToggleResponse, UpdateBusinessRequest, UpdateProfileRequest, UserInfo,
    WhiteLabelConfig, WhiteLabelDirectory, WhiteLabelRequest,
};
use crate::locations::LocationAggregate;

#[derive(Clone)]
pub struct DirectoryClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl DirectoryClient {
    pub fn new(base_url: String) -> Self {
        let normalized = normalize_base_url(&base_url);
        Self {
            client: reqwest::Client::new(),
            base_url: normalized,
            token: None,
        }
    }

    /// Token attached to subsequent requests. Login and register set this
    /// automatically; `None` clears it.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    pub async fn register(&mut self, payload: &RegisterRequest) -> Result<AuthResponse, String> {
        let response = self
            .request(Method::POST, "/auth/register")
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let auth: AuthResponse = parse_data(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn login(&mut self, payload: &LoginRequest) -> Result<AuthResponse, String> {
        let response = self
            .request(Method::POST, "/auth/login")
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let auth: AuthResponse = parse_data(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn logout(&mut self) -> Result<(), String> {
        let response = self
            .request(Method::POST, "/auth/logout")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        expect_success(response).await?;
        self.token = None;
        Ok(())
    }

    pub async fn current_user(&self) -> Result<UserInfo, String> {
        let response = self
            .request(Method::GET, "/auth/me")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    // ------------------------------------------------------------------
    // Public directory
    // ------------------------------------------------------------------

    pub async fn list_businesses(
        &self,
        query: &DirectoryQuery,
    ) -> Result<Paged<Business>, String> {
        let response = self
            .request(Method::GET, "/businesses")
            .query(query)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn list_categories(&self) -> Result<Vec<String>, String> {
        let response = self
            .request(Method::GET, "/businesses/categories")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn get_business(&self, business_id: Uuid) -> Result<Business, String> {
        let response = self
            .request(Method::GET, &format!("/businesses/{}", business_id))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    // ------------------------------------------------------------------
    // Saved deals
    // ------------------------------------------------------------------

    pub async fn list_saved_deals(&self) -> Result<Vec<Business>, String> {
        let response = self
            .request(Method::GET, "/saved-deals")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn toggle_saved_deal(
        &self,
        business_id: Uuid,
    ) -> Result<SaveToggleResponse, String> {
        let response = self
            .request(
                Method::POST,
                &format!("/saved-deals/{}/toggle", business_id),
            )
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    // ------------------------------------------------------------------
    // Owner listings
    // ------------------------------------------------------------------

    pub async fn list_my_businesses(&self) -> Result<Vec<Business>, String> {
        let response = self
            .request(Method::GET, "/my/businesses")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn create_business(
        &self,
        payload: &CreateBusinessRequest,
    ) -> Result<Business, String> {
        let response = self
            .request(Method::POST, "/my/businesses")
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn update_business(
        &self,
        business_id: Uuid,
        payload: &UpdateBusinessRequest,
    ) -> Result<Business, String> {
        let response = self
            .request(Method::PUT, &format!("/my/businesses/{}", business_id))
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn delete_business(&self, business_id: Uuid) -> Result<(), String> {
        let response = self
            .request(Method::DELETE, &format!("/my/businesses/{}", business_id))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        expect_success(response).await
    }

    pub async fn get_business_analytics(
        &self,
        business_id: Uuid,
    ) -> Result<BusinessAnalytics, String> {
        let response = self
            .request(
                Method::GET,
                &format!("/my/businesses/{}/analytics", business_id),
            )
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    pub async fn admin_stats(&self) -> Result<PlatformStats, String> {
        let response = self
            .request(Method::GET, "/admin/stats")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn admin_list_locations(&self) -> Result<Vec<LocationAggregate>, String> {
        let response = self
            .request(Method::GET, "/admin/locations")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn admin_list_users(
        &self,
        query: &AdminUserQuery,
    ) -> Result<Paged<UserInfo>, String> {
        let response = self
            .request(Method::GET, "/admin/users")
            .query(query)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn admin_list_businesses(
        &self,
        query: &AdminBusinessQuery,
    ) -> Result<Paged<Business>, String> {
        let response = self
            .request(Method::GET, "/admin/businesses")
            .query(query)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn admin_update_business(
        &self,
        business_id: Uuid,
        payload: &AdminUpdateBusinessRequest,
    ) -> Result<Business, String> {
        let response = self
            .request(Method::PUT, &format!("/admin/businesses/{}", business_id))
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn admin_update_user(
        &self,
        user_id: Uuid,
        payload: &AdminUpdateUserRequest,
    ) -> Result<UserInfo, String> {
        let response = self
            .request(Method::PUT, &format!("/admin/users/{}", user_id))
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn admin_delete_user(&self, user_id: Uuid) -> Result<(), String> {
        let response = self
            .request(Method::DELETE, &format!("/admin/users/{}", user_id))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        expect_success(response).await
    }

    pub async fn admin_feature_business(
        &self,
        business_id: Uuid,
        featured: bool,
    ) -> Result<Business, String> {
        let response = self
            .request(
                Method::PATCH,
                &format!("/admin/businesses/{}/feature", business_id),
            )
            .json(&FeatureRequest { featured })
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn admin_review_business(
        &self,
        business_id: Uuid,
        payload: &ApprovalRequest,
    ) -> Result<Business, String> {
        let response = self
            .request(
                Method::PATCH,
                &format!("/admin/businesses/{}/approval", business_id),
            )
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn admin_delete_business(&self, business_id: Uuid) -> Result<(), String> {
        let response = self
            .request(Method::DELETE, &format!("/admin/businesses/{}", business_id))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        expect_success(response).await
    }

    // ------------------------------------------------------------------
    // Distribution partners
    // ------------------------------------------------------------------

    pub async fn distribution_dashboard(&self) -> Result<DistributionDashboard, String> {
        let response = self
            .request(Method::GET, "/distribution/dashboard")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn distribution_list_businesses(&self) -> Result<Vec<Business>, String> {
        let response = self
            .request(Method::GET, "/distribution/businesses")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn distribution_create_business(
        &self,
        payload: &CreateBusinessRequest,
    ) -> Result<Business, String> {
        let response = self
            .request(Method::POST, "/distribution/businesses")
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn get_white_label(&self) -> Result<WhiteLabelConfig, String> {
        let response = self
            .request(Method::GET, "/distribution/white-label")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn update_white_label(
        &self,
        payload: &WhiteLabelRequest,
    ) -> Result<WhiteLabelConfig, String> {
        let response = self
            .request(Method::PUT, "/distribution/white-label")
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn get_public_directory(
        &self,
        subdomain: &str,
    ) -> Result<WhiteLabelDirectory, String> {
        let response = self
            .request(Method::GET, &format!("/directories/{}", subdomain))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    pub async fn update_profile(
        &self,
        payload: &UpdateProfileRequest,
    ) -> Result<UserInfo, String> {
        let response = self
            .request(Method::PUT, "/users/me")
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        parse_data(response).await
    }

    pub async fn change_password(
        &self,
        payload: &ChangePasswordRequest,
    ) -> Result<(), String> {
        let response = self
            .request(Method::PUT, "/users/me/password")
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        expect_success(response).await
    }

    pub async fn delete_account(&mut self) -> Result<(), String> {
        let response = self
            .request(Method::DELETE, "/users/me")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        expect_success(response).await?;
        self.token = None;
        Ok(())
    }
}

/// Unwrap the `data` field of a successful envelope, or surface the
/// server-provided error message.
async fn parse_data<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    let status = response.status();
    let text = response.text().await.map_err(|e| e.to_string())?;

    if !status.is_success() {
        return Err(error_message(status, &text));
    }

    let envelope: ApiResponse<T> =
        serde_json::from_str(&text).map_err(|e| format!("Invalid response body: {}", e))?;
    envelope
        .data
        .ok_or_else(|| "Response contained no data".to_string())
}

/// Accept any 2xx (including 204 No Content), otherwise surface the error.
async fn expect_success(response: Response) -> Result<(), String> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    Err(error_message(status, &text))
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .unwrap_or_else(|| format!("Request failed with status {}", status))
}

fn normalize_base_url(value: &str) -> String {
    let trimmed = value.trim_end_matches('/');
    if trimmed.ends_with("/api/v1") {
        trimmed.to_string()
    } else {
        format!("{}/api/v1", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            normalize_base_url("http://localhost:8080"),
            "http://localhost:8080/api/v1"
        );
        assert_eq!(
            normalize_base_url("http://localhost:8080/"),
            "http://localhost:8080/api/v1"
        );
        assert_eq!(
            normalize_base_url("http://localhost:8080/api/v1/"),
            "http://localhost:8080/api/v1"
        );
    }

    #[test]
    fn error_message_prefers_server_envelope() {
        let body = r#"{"success":false,"data":null,"error":"Business not found","timestamp":"2026-01-01T00:00:00Z"}"#;
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, body),
            "Business not found"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>"),
            "Request failed with status 502 Bad Gateway"
        );
    }
}
