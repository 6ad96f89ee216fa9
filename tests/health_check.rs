use actix_web::{test, web, App};
use chrono::DateTime;
use worldly_server::{AppState, Settings};

#[actix_web::test]
async fn test_health_check() {
    let config = Settings::new().expect("Failed to load config");
    let state = web::Data::new(AppState::new(config).expect("Failed to build app state"));

    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(worldly_server::health_check)),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());

    let body = test::read_body(resp).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "healthy");
    assert!(DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
}
