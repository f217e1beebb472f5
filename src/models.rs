use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// ENUMS
// ============================================================================

/// Account type stored on every user (this is also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "account_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    User,
    Partner,
    Distribution,
    Admin,
}

/// Listing approval lifecycle (also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "listing_approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Action applied by an admin to a pending listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

// ============================================================================
// USERS
// ============================================================================

/// User account persisted in database. Never serialized directly; responses
/// carry the [`UserInfo`] projection instead.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-safe projection of a user (no password hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            user_type: self.user_type,
            suspended: self.suspended,
            created_at: self.created_at,
        }
    }
}

/// Helper struct used when inserting a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// BUSINESSES
// ============================================================================

/// Business listing entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Business {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub distribution_id: Option<Uuid>,
    pub name: String,
    pub category: String,
    pub description: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub image_url: Option<String>,
    pub gallery: Vec<String>,
    pub featured: bool,
    pub has_deals: bool,
    pub deal: Option<String>,
    pub hours: Value,
    pub amenities: Vec<String>,
    pub approval_status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Helper struct used when inserting a new business
#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub distribution_id: Option<Uuid>,
    pub name: String,
    pub category: String,
    pub description: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub image_url: Option<String>,
    pub gallery: Vec<String>,
    pub featured: bool,
    pub has_deals: bool,
    pub deal: Option<String>,
    pub hours: Value,
    pub amenities: Vec<String>,
    pub approval_status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// SAVED DEALS
// ============================================================================

/// Favorite join row between a user and a business
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SavedDeal {
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// WHITE-LABEL CONFIGS
// ============================================================================

/// Branding configuration for a distribution partner's sub-directory
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WhiteLabelConfig {
    pub distribution_id: Uuid,
    pub directory_name: String,
    pub subdomain: String,
    pub logo_url: Option<String>,
    pub primary_color: String,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// REQUEST/RESPONSE DTOs
// ============================================================================

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

/// Paginated list wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Signup payload
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub user_type: Option<UserType>,
}

impl RegisterRequest {
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        let now = Utc::now();
        NewUser {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password_hash,
            user_type: self.user_type.unwrap_or(UserType::User),
            suspended: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Login payload
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Returned by register and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserInfo,
    pub token: String,
}

/// Query parameters accepted by the public directory listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub featured: Option<bool>,
    pub deals: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Payload sent by owners (and distribution partners) to create a listing
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateBusinessRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[validate(length(min = 2, max = 60))]
    pub category: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 5, max = 300))]
    pub address: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 300))]
    pub website: Option<String>,
    #[validate(length(max = 1024))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub has_deals: bool,
    #[validate(length(max = 500))]
    pub deal: Option<String>,
    pub hours: Option<Value>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl CreateBusinessRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        deal_fields_consistent(self.has_deals, self.deal.as_deref())
    }

    pub fn into_new_business(
        self,
        owner_user_id: Uuid,
        distribution_id: Option<Uuid>,
    ) -> NewBusiness {
        let now = Utc::now();
        NewBusiness {
            id: Uuid::new_v4(),
            owner_user_id,
            distribution_id,
            name: self.name,
            category: self.category,
            description: self.description.unwrap_or_default(),
            address: self.address,
            phone: self.phone,
            email: self.email,
            website: self.website,
            rating: 0.0,
            review_count: 0,
            image_url: self.image_url,
            gallery: self.gallery,
            featured: false,
            has_deals: self.has_deals,
            deal: self.deal,
            hours: self
                .hours
                .unwrap_or_else(|| Value::Object(Default::default())),
            amenities: self.amenities,
            approval_status: ApprovalStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload sent by owners to update their listing. Platform-managed fields
/// (featured, rating, review count, approval status) are not touched here.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateBusinessRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[validate(length(min = 2, max = 60))]
    pub category: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 5, max = 300))]
    pub address: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 300))]
    pub website: Option<String>,
    #[validate(length(max = 1024))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub has_deals: bool,
    #[validate(length(max = 500))]
    pub deal: Option<String>,
    pub hours: Option<Value>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl UpdateBusinessRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        deal_fields_consistent(self.has_deals, self.deal.as_deref())
    }

    pub fn apply_to_existing(&self, existing: &mut Business) {
        existing.name = self.name.clone();
        existing.category = self.category.clone();
        existing.description = self.description.clone().unwrap_or_default();
        existing.address = self.address.clone();
        existing.phone = self.phone.clone();
        existing.email = self.email.clone();
        existing.website = self.website.clone();
        existing.image_url = self.image_url.clone();
        existing.gallery = self.gallery.clone();
        existing.has_deals = self.has_deals;
        existing.deal = self.deal.clone();
        if let Some(hours) = &self.hours {
            existing.hours = hours.clone();
        }
        existing.amenities = self.amenities.clone();
        existing.updated_at = Utc::now();
    }
}

/// Full listing edit available to admins, including platform-managed fields
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdminUpdateBusinessRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[validate(length(min = 2, max = 60))]
    pub category: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 5, max = 300))]
    pub address: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 300))]
    pub website: Option<String>,
    #[validate(length(max = 1024))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub has_deals: bool,
    #[validate(length(max = 500))]
    pub deal: Option<String>,
    pub hours: Option<Value>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: f64,
    #[validate(range(min = 0))]
    pub review_count: i32,
    pub featured: bool,
}

impl AdminUpdateBusinessRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        deal_fields_consistent(self.has_deals, self.deal.as_deref())
    }

    pub fn apply_to_existing(&self, existing: &mut Business) {
        existing.name = self.name.clone();
        existing.category = self.category.clone();
        existing.description = self.description.clone().unwrap_or_default();
        existing.address = self.address.clone();
        existing.phone = self.phone.clone();
        existing.email = self.email.clone();
        existing.website = self.website.clone();
        existing.image_url = self.image_url.clone();
        existing.gallery = self.gallery.clone();
        existing.has_deals = self.has_deals;
        existing.deal = self.deal.clone();
        if let Some(hours) = &self.hours {
            existing.hours = hours.clone();
        }
        existing.amenities = self.amenities.clone();
        existing.rating = self.rating;
        existing.review_count = self.review_count;
        existing.featured = self.featured;
        existing.updated_at = Utc::now();
    }
}

fn deal_fields_consistent(has_deals: bool, deal: Option<&str>) -> Result<(), String> {
    if has_deals && deal.map(str::trim).unwrap_or("").is_empty() {
        return Err("A deal description is required when has_deals is set".into());
    }
    Ok(())
}

/// Set or clear the featured flag on a listing
#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub featured: bool,
}

/// Approve or reject a pending listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub action: ApprovalAction,
    pub reason: Option<String>,
}

/// Admin query parameters for the user list
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminUserQuery {
    pub user_type: Option<UserType>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Admin query parameters for the business list
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminBusinessQuery {
    pub approval_status: Option<ApprovalStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Admin edit of a user account
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub user_type: UserType,
    pub suspended: bool,
}

/// Self-service profile edit
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

/// Self-service password change
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Branding payload for a distribution partner's sub-directory
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct WhiteLabelRequest {
    #[validate(length(min = 2, max = 80))]
    pub directory_name: String,
    #[validate(length(min = 2, max = 40))]
    pub subdomain: String,
    #[validate(length(max = 1024))]
    pub logo_url: Option<String>,
    #[validate(length(min = 4, max = 7))]
    pub primary_color: String,
}

impl WhiteLabelRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        let sub = self.subdomain.as_str();
        let charset_ok = sub
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !charset_ok || sub.starts_with('-') || sub.ends_with('-') {
            return Err(
                "Subdomain must be lowercase letters, digits and inner hyphens only".into(),
            );
        }

        let color = self.primary_color.as_str();
        let hex_ok = color.starts_with('#')
            && matches!(color.len(), 4 | 7)
            && color[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !hex_ok {
            return Err("Primary color must be a #rgb or #rrggbb hex value".into());
        }

        Ok(())
    }
}

// ============================================================================
// COMPOSITE RESPONSE TYPES
// ============================================================================

/// Result of toggling a saved deal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveToggleResponse {
    pub business_id: Uuid,
    pub saved: bool,
}

/// Platform-wide totals for the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_businesses: i64,
    pub pending_approvals: i64,
    pub active_deals: i64,
    pub saved_deals: i64,
}

/// Per-listing analytics for business owners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessAnalytics {
    pub business_id: Uuid,
    pub name: String,
    pub rating: f64,
    pub review_count: i32,
    pub total_saves: i64,
    pub has_deals: bool,
    pub featured: bool,
    pub approval_status: ApprovalStatus,
}

/// Dashboard payload for distribution partners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionDashboard {
    pub total_businesses: i64,
    pub active_deals: i64,
    pub pending_approvals: i64,
    pub locations: Vec<crate::locations::LocationAggregate>,
    pub white_label: Option<WhiteLabelConfig>,
}

/// Public white-label sub-directory: branding plus approved listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhiteLabelDirectory {
    pub config: WhiteLabelConfig,
    pub businesses: Vec<Business>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateBusinessRequest {
        CreateBusinessRequest {
            name: "Corner Bakery".into(),
            category: "Bakery".into(),
            description: Some("Fresh bread daily".into()),
            address: "12 Oak St, Portland, OR 97201".into(),
            phone: None,
            email: None,
            website: None,
            image_url: None,
            gallery: Vec::new(),
            has_deals: false,
            deal: None,
            hours: None,
            amenities: Vec::new(),
        }
    }

    #[test]
    fn new_business_starts_pending_and_unfeatured() {
        let owner = Uuid::new_v4();
        let business = create_request().into_new_business(owner, None);
        assert_eq!(business.approval_status, ApprovalStatus::Pending);
        assert!(!business.featured);
        assert_eq!(business.rating, 0.0);
        assert_eq!(business.review_count, 0);
        assert_eq!(business.owner_user_id, owner);
        assert_eq!(business.distribution_id, None);
    }

    #[test]
    fn deal_flag_requires_deal_text() {
        let mut request = create_request();
        request.has_deals = true;
        assert!(request.validate_business_rules().is_err());

        request.deal = Some("2-for-1 croissants".into());
        assert!(request.validate_business_rules().is_ok());
    }

    #[test]
    fn subdomain_and_color_rules() {
        let mut request = WhiteLabelRequest {
            directory_name: "Riverside Deals".into(),
            subdomain: "riverside".into(),
            logo_url: None,
            primary_color: "#2563eb".into(),
        };
        assert!(request.validate_business_rules().is_ok());

        request.subdomain = "River Side".into();
        assert!(request.validate_business_rules().is_err());

        request.subdomain = "riverside".into();
        request.primary_color = "blue".into();
        assert!(request.validate_business_rules().is_err());
    }
}
