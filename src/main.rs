use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::env;

use local_directory_service::database::Database;
use local_directory_service::handlers;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("{}:{}", host, port);

    let database_url = env::var("DATABASE_URL").map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "DATABASE_URL must be set in environment",
        )
    })?;

    let db = Database::connect(&database_url).await.map_err(|err| {
        log::error!("Failed to initialize database: {err:?}");
        std::io::Error::new(std::io::ErrorKind::Other, err)
    })?;

    let db_data = web::Data::new(db);

    log::info!(
        "🚀 Starting Local Business Directory Service on {}",
        bind_address
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(db_data.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .service(
                web::scope("/api/v1")
                    // Health
                    .service(handlers::health_check)
                    // Auth
                    .service(handlers::register)
                    .service(handlers::login)
                    .service(handlers::logout)
                    .service(handlers::current_user)
                    // Public directory (categories before the {business_id} catch-all)
                    .service(handlers::list_businesses)
                    .service(handlers::list_categories)
                    .service(handlers::get_business)
                    // Saved deals
                    .service(handlers::list_saved_deals)
                    .service(handlers::toggle_saved_deal)
                    // Owner listings
                    .service(handlers::list_my_businesses)
                    .service(handlers::create_my_business)
                    .service(handlers::update_my_business)
                    .service(handlers::delete_my_business)
                    .service(handlers::get_business_analytics)
                    // Admin
                    .service(handlers::admin_stats)
                    .service(handlers::admin_list_users)
                    .service(handlers::admin_update_user)
                    .service(handlers::admin_delete_user)
                    .service(handlers::admin_list_businesses)
                    .service(handlers::admin_update_business)
                    .service(handlers::admin_feature_business)
                    .service(handlers::admin_review_business)
                    .service(handlers::admin_delete_business)
                    .service(handlers::admin_list_locations)
                    // Distribution partners
                    .service(handlers::distribution_dashboard)
                    .service(handlers::distribution_list_businesses)
                    .service(handlers::distribution_create_business)
                    .service(handlers::get_white_label)
                    .service(handlers::update_white_label)
                    .service(handlers::get_public_directory)
                    // Profile
                    .service(handlers::update_profile)
                    .service(handlers::change_password)
                    .service(handlers::delete_account),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
