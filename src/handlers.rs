use actix_web::{delete, get, patch, post, put, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth;
use crate::database::Database;
use crate::directory;
use crate::locations;
use crate::models::{
    AdminBusinessQuery, AdminUpdateBusinessRequest, AdminUpdateUserRequest, AdminUserQuery,
    ApiResponse, ApprovalAction, ApprovalStatus, AuthResponse, BusinessAnalytics,
    ChangePasswordRequest, CreateBusinessRequest, DirectoryQuery, DistributionDashboard,
    FeatureRequest, ApprovalRequest, LoginRequest, Paged, RegisterRequest, SaveToggleResponse,
    UpdateBusinessRequest, UpdateProfileRequest, UserInfo, UserType, WhiteLabelDirectory,
    WhiteLabelRequest,
};

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "local-directory-service",
        "timestamp": chrono::Utc::now()
    }))
}

// ============================================================================
// AUTH
// ============================================================================

#[post("/auth/register")]
pub async fn register(
    db: web::Data<Database>,
    payload: web::Json<RegisterRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    if body.user_type == Some(UserType::Admin) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "Admin accounts cannot be self-registered".into(),
        ));
    }

    let email = body.email.trim().to_lowercase();
    match db.get_user_by_email(&email).await {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
                "An account with this email already exists".into(),
            ));
        }
        Ok(None) => {}
        Err(err) => {
            log::error!("Failed to check existing email: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to register".into()));
        }
    }

    let password_hash = match auth::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(err) => {
            log::error!("Failed to hash password: {err}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to register".into()));
        }
    };

    let new_user = body.into_new_user(password_hash);
    let user = match db.create_user(new_user).await {
        Ok(user) => user,
        Err(err) => {
            log::error!("Failed to create user: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to register".into()));
        }
    };

    let token = auth::generate_token();
    match db.insert_token(&token, user.id).await {
        Ok(()) => HttpResponse::Created().json(ApiResponse::success(AuthResponse {
            user: user.to_info(),
            token,
        })),
        Err(err) => {
            log::error!("Failed to issue token: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to register".into()))
        }
    }
}

#[post("/auth/login")]
pub async fn login(db: web::Data<Database>, payload: web::Json<LoginRequest>) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let email = body.email.trim().to_lowercase();
    let user = match db.get_user_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("Invalid email or password".into()));
        }
        Err(err) => {
            log::error!("Failed to look up user: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to log in".into()));
        }
    };

    match auth::verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("Invalid email or password".into()));
        }
        Err(err) => {
            log::error!("Failed to verify password: {err}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to log in".into()));
        }
    }

    if user.suspended {
        return HttpResponse::Forbidden()
            .json(ApiResponse::<()>::error("Account is suspended".into()));
    }

    let token = auth::generate_token();
    match db.insert_token(&token, user.id).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(AuthResponse {
            user: user.to_info(),
            token,
        })),
        Err(err) => {
            log::error!("Failed to issue token: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to log in".into()))
        }
    }
}

#[post("/auth/logout")]
pub async fn logout(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    let token = match auth::presented_token(&req) {
        Ok(token) => token,
        Err(err) => return err.to_response(),
    };

    match db.delete_token(&token).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(())),
        Err(err) => {
            log::error!("Failed to delete token: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to log out".into()))
        }
    }
}

#[get("/auth/me")]
pub async fn current_user(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    match auth::authenticate(&req, &db).await {
        Ok(user) => HttpResponse::Ok().json(ApiResponse::success(user.to_info())),
        Err(err) => err.to_response(),
    }
}

// ============================================================================
// PUBLIC DIRECTORY
// ============================================================================

#[get("/businesses")]
pub async fn list_businesses(
    db: web::Data<Database>,
    query: web::Query<DirectoryQuery>,
) -> impl Responder {
    let query = query.into_inner();
    match db.list_approved_businesses().await {
        Ok(businesses) => {
            let filtered = directory::apply_filters(businesses, &query);
            let page = directory::paginate(filtered, query.page, query.per_page);
            HttpResponse::Ok().json(ApiResponse::success(page))
        }
        Err(err) => {
            log::error!("Failed to list businesses: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list businesses".into()))
        }
    }
}

#[get("/businesses/categories")]
pub async fn list_categories(db: web::Data<Database>) -> impl Responder {
    match db.list_categories().await {
        Ok(categories) => HttpResponse::Ok().json(ApiResponse::success(categories)),
        Err(err) => {
            log::error!("Failed to list categories: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list categories".into()))
        }
    }
}

#[get("/businesses/{business_id}")]
pub async fn get_business(
    req: HttpRequest,
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
) -> impl Responder {
    let business_id = business_id.into_inner();
    let business = match db.get_business(business_id).await {
        Ok(Some(business)) => business,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Business not found".into()));
        }
        Err(err) => {
            log::error!("Failed to get business: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to get business".into()));
        }
    };

    if business.approval_status == ApprovalStatus::Approved {
        return HttpResponse::Ok().json(ApiResponse::success(business));
    }

    // Unapproved listings are only visible to their owner, their referring
    // distribution partner, and admins.
    match auth::authenticate(&req, &db).await {
        Ok(user)
            if user.id == business.owner_user_id
                || user.user_type == UserType::Admin
                || business.distribution_id == Some(user.id) =>
        {
            HttpResponse::Ok().json(ApiResponse::success(business))
        }
        _ => HttpResponse::NotFound().json(ApiResponse::<()>::error("Business not found".into())),
    }
}

// ============================================================================
// SAVED DEALS
// ============================================================================

#[get("/saved-deals")]
pub async fn list_saved_deals(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    let user = match auth::authenticate(&req, &db).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    match db.list_saved_businesses(user.id).await {
        Ok(businesses) => HttpResponse::Ok().json(ApiResponse::success(businesses)),
        Err(err) => {
            log::error!("Failed to list saved deals: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list saved deals".into()))
        }
    }
}

#[post("/saved-deals/{business_id}/toggle")]
pub async fn toggle_saved_deal(
    req: HttpRequest,
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
) -> impl Responder {
    let user = match auth::authenticate(&req, &db).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let business_id = business_id.into_inner();
    match db.get_business(business_id).await {
        Ok(Some(business)) if business.approval_status == ApprovalStatus::Approved => {}
        Ok(_) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Business not found".into()));
        }
        Err(err) => {
            log::error!("Failed to get business: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to toggle saved deal".into()));
        }
    }

    match db.toggle_saved_deal(user.id, business_id).await {
        Ok(saved) => HttpResponse::Ok().json(ApiResponse::success(SaveToggleResponse {
            business_id,
            saved,
        })),
        Err(err) => {
            log::error!("Failed to toggle saved deal: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to toggle saved deal".into()))
        }
    }
}

// ============================================================================
// OWNER LISTINGS
// ============================================================================

#[get("/my/businesses")]
pub async fn list_my_businesses(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Partner, UserType::Admin]).await
    {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    match db.list_businesses_for_owner(user.id).await {
        Ok(businesses) => HttpResponse::Ok().json(ApiResponse::success(businesses)),
        Err(err) => {
            log::error!("Failed to list owned businesses: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list businesses".into()))
        }
    }
}

#[post("/my/businesses")]
pub async fn create_my_business(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<CreateBusinessRequest>,
) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Partner, UserType::Admin]).await
    {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }
    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    let new_business = body.into_new_business(user.id, None);
    match db.create_business(new_business).await {
        Ok(business) => HttpResponse::Created().json(ApiResponse::success(business)),
        Err(err) => {
            log::error!("Failed to create business: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to create business".into()))
        }
    }
}

#[put("/my/businesses/{business_id}")]
pub async fn update_my_business(
    req: HttpRequest,
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
    payload: web::Json<UpdateBusinessRequest>,
) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Partner, UserType::Admin]).await
    {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }
    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    let business_id = business_id.into_inner();
    let mut existing = match db.get_business(business_id).await {
        Ok(Some(business)) => business,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Business not found".into()));
        }
        Err(err) => {
            log::error!("Failed to fetch business: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load business".into()));
        }
    };

    if existing.owner_user_id != user.id {
        return HttpResponse::Forbidden()
            .json(ApiResponse::<()>::error("You can only edit your own listing".into()));
    }

    body.apply_to_existing(&mut existing);

    match db.update_business(existing).await {
        Ok(updated) => HttpResponse::Ok().json(ApiResponse::success(updated)),
        Err(err) => {
            log::error!("Failed to update business: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update business".into()))
        }
    }
}

#[delete("/my/businesses/{business_id}")]
pub async fn delete_my_business(
    req: HttpRequest,
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Partner, UserType::Admin]).await
    {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let business_id = business_id.into_inner();
    match db.get_business(business_id).await {
        Ok(Some(business)) if business.owner_user_id == user.id => {}
        Ok(Some(_)) => {
            return HttpResponse::Forbidden()
                .json(ApiResponse::<()>::error("You can only delete your own listing".into()));
        }
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Business not found".into()));
        }
        Err(err) => {
            log::error!("Failed to fetch business: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load business".into()));
        }
    }

    match db.delete_business(business_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Business not found".into()))
        }
        Err(err) => {
            log::error!("Failed to delete business: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete business".into()))
        }
    }
}

#[get("/my/businesses/{business_id}/analytics")]
pub async fn get_business_analytics(
    req: HttpRequest,
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Partner, UserType::Admin]).await
    {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let business_id = business_id.into_inner();
    let business = match db.get_business(business_id).await {
        Ok(Some(business)) => business,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Business not found".into()));
        }
        Err(err) => {
            log::error!("Failed to fetch business: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load analytics".into()));
        }
    };

    if business.owner_user_id != user.id && user.user_type != UserType::Admin {
        return HttpResponse::Forbidden().json(ApiResponse::<()>::error(
            "You can only view analytics for your own listing".into(),
        ));
    }

    match db.count_saves_for_business(business_id).await {
        Ok(total_saves) => HttpResponse::Ok().json(ApiResponse::success(BusinessAnalytics {
            business_id: business.id,
            name: business.name,
            rating: business.rating,
            review_count: business.review_count,
            total_saves,
            has_deals: business.has_deals,
            featured: business.featured,
            approval_status: business.approval_status,
        })),
        Err(err) => {
            log::error!("Failed to count saves: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load analytics".into()))
        }
    }
}

// ============================================================================
// ADMIN: USERS
// ============================================================================

#[get("/admin/stats")]
pub async fn admin_stats(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    if let Err(err) = auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        return err.to_response();
    }

    match db.get_platform_stats().await {
        Ok(stats) => HttpResponse::Ok().json(ApiResponse::success(stats)),
        Err(err) => {
            log::error!("Failed to fetch platform stats: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch platform stats".into()))
        }
    }
}

#[get("/admin/users")]
pub async fn admin_list_users(
    req: HttpRequest,
    db: web::Data<Database>,
    query: web::Query<AdminUserQuery>,
) -> impl Responder {
    if let Err(err) = auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        return err.to_response();
    }

    let query = query.into_inner();
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let total = match db.count_users(query.user_type, search).await {
        Ok(total) => total,
        Err(err) => {
            log::error!("Failed to count users: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list users".into()));
        }
    };

    match db.list_users(query.user_type, search, per_page, offset).await {
        Ok(users) => {
            let items: Vec<UserInfo> = users.iter().map(|u| u.to_info()).collect();
            HttpResponse::Ok().json(ApiResponse::success(Paged {
                items,
                total,
                page,
                per_page,
                total_pages: (total + per_page - 1) / per_page,
            }))
        }
        Err(err) => {
            log::error!("Failed to list users: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list users".into()))
        }
    }
}

#[put("/admin/users/{user_id}")]
pub async fn admin_update_user(
    req: HttpRequest,
    db: web::Data<Database>,
    user_id: web::Path<Uuid>,
    payload: web::Json<AdminUpdateUserRequest>,
) -> impl Responder {
    let admin = match auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let user_id = user_id.into_inner();
    if user_id == admin.id && (body.user_type != UserType::Admin || body.suspended) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "Admins cannot demote or suspend their own account".into(),
        ));
    }

    let mut existing = match db.get_user_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("User not found".into()));
        }
        Err(err) => {
            log::error!("Failed to fetch user: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load user".into()));
        }
    };

    existing.name = body.name;
    existing.user_type = body.user_type;
    existing.suspended = body.suspended;
    existing.updated_at = Utc::now();

    match db.update_user(existing).await {
        Ok(updated) => HttpResponse::Ok().json(ApiResponse::success(updated.to_info())),
        Err(err) => {
            log::error!("Failed to update user: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update user".into()))
        }
    }
}

#[delete("/admin/users/{user_id}")]
pub async fn admin_delete_user(
    req: HttpRequest,
    db: web::Data<Database>,
    user_id: web::Path<Uuid>,
) -> impl Responder {
    let admin = match auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let user_id = user_id.into_inner();
    if user_id == admin.id {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "Use account deletion to remove your own account".into(),
        ));
    }

    match db.delete_user(user_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("User not found".into()))
        }
        Err(err) => {
            log::error!("Failed to delete user: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete user".into()))
        }
    }
}

// ============================================================================
// ADMIN: BUSINESSES & LOCATIONS
// ============================================================================

#[get("/admin/businesses")]
pub async fn admin_list_businesses(
    req: HttpRequest,
    db: web::Data<Database>,
    query: web::Query<AdminBusinessQuery>,
) -> impl Responder {
    if let Err(err) = auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        return err.to_response();
    }

    let query = query.into_inner();
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let total = match db.count_businesses(query.approval_status, search).await {
        Ok(total) => total,
        Err(err) => {
            log::error!("Failed to count businesses: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list businesses".into()));
        }
    };

    match db
        .list_businesses_admin(query.approval_status, search, per_page, offset)
        .await
    {
        Ok(items) => HttpResponse::Ok().json(ApiResponse::success(Paged {
            items,
            total,
            page,
            per_page,
            total_pages: (total + per_page - 1) / per_page,
        })),
        Err(err) => {
            log::error!("Failed to list businesses: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list businesses".into()))
        }
    }
}

#[put("/admin/businesses/{business_id}")]
pub async fn admin_update_business(
    req: HttpRequest,
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
    payload: web::Json<AdminUpdateBusinessRequest>,
) -> impl Responder {
    if let Err(err) = auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        return err.to_response();
    }

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }
    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    let business_id = business_id.into_inner();
    let mut existing = match db.get_business(business_id).await {
        Ok(Some(business)) => business,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Business not found".into()));
        }
        Err(err) => {
            log::error!("Failed to fetch business: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load business".into()));
        }
    };

    body.apply_to_existing(&mut existing);

    match db.update_business(existing).await {
        Ok(updated) => HttpResponse::Ok().json(ApiResponse::success(updated)),
        Err(err) => {
            log::error!("Failed to update business: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update business".into()))
        }
    }
}

#[patch("/admin/businesses/{business_id}/feature")]
pub async fn admin_feature_business(
    req: HttpRequest,
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
    payload: web::Json<FeatureRequest>,
) -> impl Responder {
    if let Err(err) = auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        return err.to_response();
    }

    let business_id = business_id.into_inner();
    match db.set_featured(business_id, payload.featured).await {
        Ok(updated) => HttpResponse::Ok().json(ApiResponse::success(updated)),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Business not found".into()))
        }
        Err(err) => {
            log::error!("Failed to set featured flag: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to set featured flag".into()))
        }
    }
}

#[patch("/admin/businesses/{business_id}/approval")]
pub async fn admin_review_business(
    req: HttpRequest,
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
    payload: web::Json<ApprovalRequest>,
) -> impl Responder {
    if let Err(err) = auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        return err.to_response();
    }

    let body = payload.into_inner();
    let reason = body
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    if body.action == ApprovalAction::Reject && reason.is_none() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "A reason is required when rejecting a listing".into(),
        ));
    }

    let new_status = match body.action {
        ApprovalAction::Approve => ApprovalStatus::Approved,
        ApprovalAction::Reject => ApprovalStatus::Rejected,
    };

    let business_id = business_id.into_inner();
    match db.set_approval_status(business_id, new_status).await {
        Ok(updated) => {
            if let Some(reason) = reason {
                log::info!("Listing {} rejected: {}", business_id, reason);
            }
            HttpResponse::Ok().json(ApiResponse::success(updated))
        }
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Business not found".into()))
        }
        Err(err) => {
            log::error!("Failed to update approval status: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update approval status".into()))
        }
    }
}

#[delete("/admin/businesses/{business_id}")]
pub async fn admin_delete_business(
    req: HttpRequest,
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(err) = auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        return err.to_response();
    }

    let business_id = business_id.into_inner();
    match db.delete_business(business_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Business not found".into()))
        }
        Err(err) => {
            log::error!("Failed to delete business: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete business".into()))
        }
    }
}

#[get("/admin/locations")]
pub async fn admin_list_locations(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    if let Err(err) = auth::authenticate_as(&req, &db, &[UserType::Admin]).await {
        return err.to_response();
    }

    match db.list_all_businesses().await {
        Ok(businesses) => {
            let aggregates = locations::aggregate_locations(&businesses);
            HttpResponse::Ok().json(ApiResponse::success(aggregates))
        }
        Err(err) => {
            log::error!("Failed to aggregate locations: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to aggregate locations".into()))
        }
    }
}

// ============================================================================
// DISTRIBUTION PARTNERS
// ============================================================================

#[get("/distribution/dashboard")]
pub async fn distribution_dashboard(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Distribution]).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let businesses = match db.list_businesses_for_distribution(user.id).await {
        Ok(businesses) => businesses,
        Err(err) => {
            log::error!("Failed to list referred businesses: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load dashboard".into()));
        }
    };

    let white_label = match db.get_white_label(user.id).await {
        Ok(config) => config,
        Err(err) => {
            log::error!("Failed to load white-label config: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load dashboard".into()));
        }
    };

    let dashboard = DistributionDashboard {
        total_businesses: businesses.len() as i64,
        active_deals: businesses.iter().filter(|b| b.has_deals).count() as i64,
        pending_approvals: businesses
            .iter()
            .filter(|b| b.approval_status == ApprovalStatus::Pending)
            .count() as i64,
        locations: locations::aggregate_locations(&businesses),
        white_label,
    };

    HttpResponse::Ok().json(ApiResponse::success(dashboard))
}

#[get("/distribution/businesses")]
pub async fn distribution_list_businesses(
    req: HttpRequest,
    db: web::Data<Database>,
) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Distribution]).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    match db.list_businesses_for_distribution(user.id).await {
        Ok(businesses) => HttpResponse::Ok().json(ApiResponse::success(businesses)),
        Err(err) => {
            log::error!("Failed to list referred businesses: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list businesses".into()))
        }
    }
}

#[post("/distribution/businesses")]
pub async fn distribution_create_business(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<CreateBusinessRequest>,
) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Distribution]).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }
    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    let new_business = body.into_new_business(user.id, Some(user.id));
    match db.create_business(new_business).await {
        Ok(business) => HttpResponse::Created().json(ApiResponse::success(business)),
        Err(err) => {
            log::error!("Failed to create referred business: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to create business".into()))
        }
    }
}

#[get("/distribution/white-label")]
pub async fn get_white_label(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Distribution]).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    match db.get_white_label(user.id).await {
        Ok(Some(config)) => HttpResponse::Ok().json(ApiResponse::success(config)),
        Ok(None) => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error("White-label config not set".into())),
        Err(err) => {
            log::error!("Failed to load white-label config: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load white-label config".into()))
        }
    }
}

#[put("/distribution/white-label")]
pub async fn update_white_label(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<WhiteLabelRequest>,
) -> impl Responder {
    let user = match auth::authenticate_as(&req, &db, &[UserType::Distribution]).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }
    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    match db.get_white_label_by_subdomain(&body.subdomain).await {
        Ok(Some(existing)) if existing.distribution_id != user.id => {
            return HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error("Subdomain is already taken".into()));
        }
        Ok(_) => {}
        Err(err) => {
            log::error!("Failed to check subdomain: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to save white-label config".into()));
        }
    }

    match db.upsert_white_label(user.id, &body).await {
        Ok(config) => HttpResponse::Ok().json(ApiResponse::success(config)),
        Err(err) => {
            log::error!("Failed to save white-label config: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to save white-label config".into()))
        }
    }
}

#[get("/directories/{subdomain}")]
pub async fn get_public_directory(
    db: web::Data<Database>,
    subdomain: web::Path<String>,
) -> impl Responder {
    let subdomain = subdomain.into_inner();
    let config = match db.get_white_label_by_subdomain(&subdomain).await {
        Ok(Some(config)) => config,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Directory not found".into()));
        }
        Err(err) => {
            log::error!("Failed to load white-label config: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load directory".into()));
        }
    };

    match db.list_approved_for_distribution(config.distribution_id).await {
        Ok(businesses) => HttpResponse::Ok().json(ApiResponse::success(WhiteLabelDirectory {
            config,
            businesses,
        })),
        Err(err) => {
            log::error!("Failed to list directory businesses: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load directory".into()))
        }
    }
}

// ============================================================================
// PROFILE
// ============================================================================

#[put("/users/me")]
pub async fn update_profile(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<UpdateProfileRequest>,
) -> impl Responder {
    let mut user = match auth::authenticate(&req, &db).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let email = body.email.trim().to_lowercase();
    match db.get_user_by_email(&email).await {
        Ok(Some(other)) if other.id != user.id => {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
                "An account with this email already exists".into(),
            ));
        }
        Ok(_) => {}
        Err(err) => {
            log::error!("Failed to check email: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update profile".into()));
        }
    }

    user.name = body.name.trim().to_string();
    user.email = email;
    user.updated_at = Utc::now();

    match db.update_user(user).await {
        Ok(updated) => HttpResponse::Ok().json(ApiResponse::success(updated.to_info())),
        Err(err) => {
            log::error!("Failed to update profile: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update profile".into()))
        }
    }
}

#[put("/users/me/password")]
pub async fn change_password(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<ChangePasswordRequest>,
) -> impl Responder {
    let mut user = match auth::authenticate(&req, &db).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    match auth::verify_password(&body.current_password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error("Current password is incorrect".into()));
        }
        Err(err) => {
            log::error!("Failed to verify password: {err}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to change password".into()));
        }
    }

    let password_hash = match auth::hash_password(&body.new_password) {
        Ok(hash) => hash,
        Err(err) => {
            log::error!("Failed to hash password: {err}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to change password".into()));
        }
    };

    user.password_hash = password_hash;
    user.updated_at = Utc::now();

    match db.update_user(user).await {
        Ok(_) => HttpResponse::Ok().json(ApiResponse::success(())),
        Err(err) => {
            log::error!("Failed to change password: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to change password".into()))
        }
    }
}

#[delete("/users/me")]
pub async fn delete_account(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    let user = match auth::authenticate(&req, &db).await {
        Ok(user) => user,
        Err(err) => return err.to_response(),
    };

    match db.delete_user(user.id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => {
            log::error!("Failed to delete account: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete account".into()))
        }
    }
}
