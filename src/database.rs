use std::{borrow::Cow, time::Duration};

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, Executor, PgPool,
};
use uuid::Uuid;

use crate::models::{
    ApprovalStatus, Business, NewBusiness, NewUser, PlatformStats, User, UserType,
    WhiteLabelConfig, WhiteLabelRequest,
};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = match PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600)))
            .test_before_acquire(true)
            .connect(database_url)
            .await
        {
            Ok(pool) => pool,
            Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("3D000")) => {
                log::info!("Database missing, attempting to create it");
                create_database_if_missing(database_url).await?;

                PgPoolOptions::new()
                    .max_connections(10)
                    .min_connections(2)
                    .acquire_timeout(Duration::from_secs(5))
                    .idle_timeout(Some(Duration::from_secs(600)))
                    .test_before_acquire(true)
                    .connect(database_url)
                    .await?
            }
            Err(err) => return Err(err),
        };

        // Run embedded migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    // ========================================================================
    // USERS
    // ========================================================================

    pub async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let record = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, user_type, suspended,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING
                id, name, email, password_hash, user_type, suspended,
                created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.user_type)
        .bind(user.suspended)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, name, email, password_hash, user_type, suspended,
                created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, name, email, password_hash, user_type, suspended,
                created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn update_user(&self, user: User) -> Result<User, sqlx::Error> {
        let record = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                name = $2,
                email = $3,
                password_hash = $4,
                user_type = $5,
                suspended = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING
                id, name, email, password_hash, user_type, suspended,
                created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.user_type)
        .bind(user.suspended)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    pub async fn count_users(
        &self,
        user_type: Option<UserType>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE ($1 IS NULL OR user_type = $1)
              AND (
                    $2 IS NULL
                    OR name ILIKE '%' || $2 || '%'
                    OR email ILIKE '%' || $2 || '%'
                  )
            "#,
        )
        .bind(user_type)
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn list_users(
        &self,
        user_type: Option<UserType>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let records = sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, name, email, password_hash, user_type, suspended,
                created_at, updated_at
            FROM users
            WHERE ($1 IS NULL OR user_type = $1)
              AND (
                    $2 IS NULL
                    OR name ILIKE '%' || $2 || '%'
                    OR email ILIKE '%' || $2 || '%'
                  )
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_type)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    // ========================================================================
    // API TOKENS
    // ========================================================================

    pub async fn insert_token(&self, token: &str, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(r#"INSERT INTO api_tokens (token, user_id) VALUES ($1, $2)"#)
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, sqlx::Error> {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT
                u.id, u.name, u.email, u.password_hash, u.user_type, u.suspended,
                u.created_at, u.updated_at
            FROM users u
            JOIN api_tokens t ON t.user_id = u.id
            WHERE t.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_token(&self, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query(r#"DELETE FROM api_tokens WHERE token = $1"#)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ========================================================================
    // BUSINESSES
    // ========================================================================

    pub async fn create_business(&self, business: NewBusiness) -> Result<Business, sqlx::Error> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            INSERT INTO businesses (
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22
            )
            RETURNING
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            "#,
        )
        .bind(business.id)
        .bind(business.owner_user_id)
        .bind(business.distribution_id)
        .bind(business.name)
        .bind(business.category)
        .bind(business.description)
        .bind(business.address)
        .bind(business.phone)
        .bind(business.email)
        .bind(business.website)
        .bind(business.rating)
        .bind(business.review_count)
        .bind(business.image_url)
        .bind(business.gallery)
        .bind(business.featured)
        .bind(business.has_deals)
        .bind(business.deal)
        .bind(business.hours)
        .bind(business.amenities)
        .bind(business.approval_status)
        .bind(business.created_at)
        .bind(business.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_business(&self, business_id: Uuid) -> Result<Option<Business>, sqlx::Error> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            FROM businesses
            WHERE id = $1
            "#,
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn update_business(&self, business: Business) -> Result<Business, sqlx::Error> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            UPDATE businesses
            SET
                name = $2,
                category = $3,
                description = $4,
                address = $5,
                phone = $6,
                email = $7,
                website = $8,
                rating = $9,
                review_count = $10,
                image_url = $11,
                gallery = $12,
                featured = $13,
                has_deals = $14,
                deal = $15,
                hours = $16,
                amenities = $17,
                approval_status = $18,
                updated_at = $19
            WHERE id = $1
            RETURNING
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            "#,
        )
        .bind(business.id)
        .bind(business.name)
        .bind(business.category)
        .bind(business.description)
        .bind(business.address)
        .bind(business.phone)
        .bind(business.email)
        .bind(business.website)
        .bind(business.rating)
        .bind(business.review_count)
        .bind(business.image_url)
        .bind(business.gallery)
        .bind(business.featured)
        .bind(business.has_deals)
        .bind(business.deal)
        .bind(business.hours)
        .bind(business.amenities)
        .bind(business.approval_status)
        .bind(business.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_business(&self, business_id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM businesses WHERE id = $1"#)
            .bind(business_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    /// Approved listings for the public directory, featured first.
    pub async fn list_approved_businesses(&self) -> Result<Vec<Business>, sqlx::Error> {
        let records = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            FROM businesses
            WHERE approval_status = $1
            ORDER BY featured DESC, rating DESC, created_at DESC
            "#,
        )
        .bind(ApprovalStatus::Approved)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Every listing regardless of status, for admin aggregation views.
    pub async fn list_all_businesses(&self) -> Result<Vec<Business>, sqlx::Error> {
        let records = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            FROM businesses
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn list_businesses_for_owner(
        &self,
        owner_user_id: Uuid,
    ) -> Result<Vec<Business>, sqlx::Error> {
        let records = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            FROM businesses
            WHERE owner_user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn list_businesses_for_distribution(
        &self,
        distribution_id: Uuid,
    ) -> Result<Vec<Business>, sqlx::Error> {
        let records = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            FROM businesses
            WHERE distribution_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(distribution_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Approved referred listings for a partner's public sub-directory.
    pub async fn list_approved_for_distribution(
        &self,
        distribution_id: Uuid,
    ) -> Result<Vec<Business>, sqlx::Error> {
        let records = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            FROM businesses
            WHERE distribution_id = $1 AND approval_status = $2
            ORDER BY featured DESC, rating DESC, created_at DESC
            "#,
        )
        .bind(distribution_id)
        .bind(ApprovalStatus::Approved)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count_businesses(
        &self,
        approval_status: Option<ApprovalStatus>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM businesses
            WHERE ($1 IS NULL OR approval_status = $1)
              AND (
                    $2 IS NULL
                    OR name ILIKE '%' || $2 || '%'
                    OR category ILIKE '%' || $2 || '%'
                    OR address ILIKE '%' || $2 || '%'
                  )
            "#,
        )
        .bind(approval_status)
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn list_businesses_admin(
        &self,
        approval_status: Option<ApprovalStatus>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Business>, sqlx::Error> {
        let records = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            FROM businesses
            WHERE ($1 IS NULL OR approval_status = $1)
              AND (
                    $2 IS NULL
                    OR name ILIKE '%' || $2 || '%'
                    OR category ILIKE '%' || $2 || '%'
                    OR address ILIKE '%' || $2 || '%'
                  )
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(approval_status)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn list_categories(&self) -> Result<Vec<String>, sqlx::Error> {
        let records = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT category
            FROM businesses
            WHERE approval_status = $1
            ORDER BY category ASC
            "#,
        )
        .bind(ApprovalStatus::Approved)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn set_featured(
        &self,
        business_id: Uuid,
        featured: bool,
    ) -> Result<Business, sqlx::Error> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            UPDATE businesses
            SET featured = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            "#,
        )
        .bind(business_id)
        .bind(featured)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn set_approval_status(
        &self,
        business_id: Uuid,
        status: ApprovalStatus,
    ) -> Result<Business, sqlx::Error> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            UPDATE businesses
            SET approval_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, owner_user_id, distribution_id, name, category, description,
                address, phone, email, website, rating, review_count, image_url,
                gallery, featured, has_deals, deal, hours, amenities,
                approval_status, created_at, updated_at
            "#,
        )
        .bind(business_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    // ========================================================================
    // SAVED DEALS
    // ========================================================================

    /// Save the business for the user, or unsave it when already saved.
    /// Returns the new saved state.
    pub async fn toggle_saved_deal(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            r#"DELETE FROM saved_deals WHERE user_id = $1 AND business_id = $2"#,
        )
        .bind(user_id)
        .bind(business_id)
        .execute(tx.as_mut())
        .await?;

        let saved = if deleted.rows_affected() == 0 {
            sqlx::query(
                r#"INSERT INTO saved_deals (user_id, business_id) VALUES ($1, $2)"#,
            )
            .bind(user_id)
            .bind(business_id)
            .execute(tx.as_mut())
            .await?;
            true
        } else {
            false
        };

        tx.commit().await?;

        Ok(saved)
    }

    pub async fn list_saved_businesses(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Business>, sqlx::Error> {
        let records = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                b.id, b.owner_user_id, b.distribution_id, b.name, b.category,
                b.description, b.address, b.phone, b.email, b.website, b.rating,
                b.review_count, b.image_url, b.gallery, b.featured, b.has_deals,
                b.deal, b.hours, b.amenities, b.approval_status, b.created_at,
                b.updated_at
            FROM businesses b
            JOIN saved_deals s ON s.business_id = b.id
            WHERE s.user_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count_saves_for_business(&self, business_id: Uuid) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM saved_deals WHERE business_id = $1"#,
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // ========================================================================
    // PLATFORM STATS
    // ========================================================================

    pub async fn get_platform_stats(&self) -> Result<PlatformStats, sqlx::Error> {
        let (total_users, total_businesses, pending_approvals, active_deals, saved_deals) =
            futures_util::try_join!(
                sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM users"#)
                    .fetch_one(&self.pool),
                sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM businesses"#)
                    .fetch_one(&self.pool),
                sqlx::query_scalar::<_, i64>(
                    r#"SELECT COUNT(*) FROM businesses WHERE approval_status = 'pending'"#
                )
                .fetch_one(&self.pool),
                sqlx::query_scalar::<_, i64>(
                    r#"SELECT COUNT(*) FROM businesses WHERE has_deals = TRUE"#
                )
                .fetch_one(&self.pool),
                sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM saved_deals"#)
                    .fetch_one(&self.pool),
            )?;

        Ok(PlatformStats {
            total_users,
            total_businesses,
            pending_approvals,
            active_deals,
            saved_deals,
        })
    }

    // ========================================================================
    // WHITE-LABEL CONFIGS
    // ========================================================================

    pub async fn get_white_label(
        &self,
        distribution_id: Uuid,
    ) -> Result<Option<WhiteLabelConfig>, sqlx::Error> {
        let record = sqlx::query_as::<_, WhiteLabelConfig>(
            r#"
            SELECT
                distribution_id, directory_name, subdomain, logo_url,
                primary_color, updated_at
            FROM white_label_configs
            WHERE distribution_id = $1
            "#,
        )
        .bind(distribution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_white_label_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<WhiteLabelConfig>, sqlx::Error> {
        let record = sqlx::query_as::<_, WhiteLabelConfig>(
            r#"
            SELECT
                distribution_id, directory_name, subdomain, logo_url,
                primary_color, updated_at
            FROM white_label_configs
            WHERE subdomain = $1
            "#,
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn upsert_white_label(
        &self,
        distribution_id: Uuid,
        config: &WhiteLabelRequest,
    ) -> Result<WhiteLabelConfig, sqlx::Error> {
        let record = sqlx::query_as::<_, WhiteLabelConfig>(
            r#"
            INSERT INTO white_label_configs (
                distribution_id, directory_name, subdomain, logo_url,
                primary_color, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (distribution_id) DO UPDATE SET
                directory_name = $2,
                subdomain = $3,
                logo_url = $4,
                primary_color = $5,
                updated_at = NOW()
            RETURNING
                distribution_id, directory_name, subdomain, logo_url,
                primary_color, updated_at
            "#,
        )
        .bind(distribution_id)
        .bind(&config.directory_name)
        .bind(&config.subdomain)
        .bind(&config.logo_url)
        .bind(&config.primary_color)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }
}

async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    let options: PgConnectOptions = database_url.parse()?;
    let database_name = options
        .get_database()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "postgres".to_string());

    // If we're already targeting the default maintenance database, nothing to do.
    if database_name.eq_ignore_ascii_case("postgres") {
        return Ok(());
    }

    let maintenance_options = options.clone().database("postgres");

    let mut connection = sqlx::postgres::PgConnection::connect_with(&maintenance_options).await?;

    let escaped_name = database_name.replace('"', "\"");
    let create_stmt = format!("CREATE DATABASE \"{}\"", escaped_name);

    match connection.execute(create_stmt.as_str()).await {
        Ok(_) => {
            log::info!("Created database '{}'", database_name);
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("42P04")) => {
            log::info!("Database '{}' already exists", database_name);
            Ok(())
        }
        Err(err) => Err(err),
    }
}
