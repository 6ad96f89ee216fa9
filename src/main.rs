use std::net::TcpListener;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use dotenv::dotenv;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use worldly_server::api::{account, country, travel, user};
use worldly_server::auth::handlers::{login, logout, logout_all, register};
use worldly_server::{health_check, AppError, AppState, SessionAuth, Settings};

#[actix_web::main]
async fn main() -> worldly_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();

    // Load configuration; malformed or missing values abort startup here.
    let config = Settings::new()?;
    info!("Configuration loaded successfully");

    info!(
        "Starting server at {}:{}",
        config.server.host, config.server.port
    );

    // Initialize application state
    let state = AppState::new(config.clone())?;
    let state = web::Data::new(state);

    // Create and bind TCP listener
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;

    let web_origin = config.cors.web_origin.clone();
    let workers = config.server.workers as usize;

    // Sweep idle rate-limit windows so the login path cannot grow the map
    // without bound, one entry per distinct email.
    let auth = state.auth.clone();
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            auth.sweep_rate_limits().await;
        }
    });

    // Start HTTP server
    HttpServer::new(move || {
        // Credentialed requests are only accepted from the configured
        // web application origin.
        let cors = Cors::default()
            .allowed_origin(&web_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/logout", web::post().to(logout))
                    .service(
                        web::scope("")
                            .wrap(SessionAuth)
                            .route("/logout-all", web::post().to(logout_all)),
                    ),
            )
            .service(
                web::scope("/api/account")
                    .wrap(SessionAuth)
                    .route("", web::get().to(account::get_profile))
                    .route("", web::put().to(account::update_profile))
                    .route("", web::delete().to(account::delete_account))
                    .route("/password", web::put().to(account::change_password))
                    .route("/stats", web::get().to(account::get_stats))
                    .route("/travels", web::get().to(travel::list_travels))
                    .route("/travels", web::post().to(travel::create_travel))
                    .route("/travels/{id}", web::get().to(travel::get_travel))
                    .route("/travels/{id}", web::put().to(travel::update_travel))
                    .route("/travels/{id}", web::delete().to(travel::delete_travel)),
            )
            .service(
                web::scope("/api/countries")
                    .wrap(SessionAuth)
                    .route("", web::get().to(country::list_countries)),
            )
            .service(
                web::scope("/api/country")
                    .wrap(SessionAuth)
                    .route("/{code}", web::get().to(country::get_country))
                    .route("/{code}/cities", web::get().to(country::list_country_cities)),
            )
            .service(
                web::scope("/api/users")
                    .route("/{username}", web::get().to(user::get_public_profile)),
            )
    })
    .listen(listener)?
    .workers(workers)
    .run()
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(())
}
