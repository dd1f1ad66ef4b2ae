use actix_web::{test, web, App};
use serde_json::{json, Value};
use star::core::store::Store;

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($store))
                .default_service(web::route().to(star::server::handle_all)),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health_over_actix() {
    let app = app!(Store::memory());

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_register_then_post_over_actix() {
    let app = app!(Store::memory());

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Dana",
            "username": "dana",
            "email": "dana@example.com",
            "password": "secret",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    assert_eq!(
        resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let auth: Value = test::read_body_json(resp).await;
    let token = auth["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "content": "<b>bold</b> claim" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let post: Value = test::read_body_json(resp).await;
    assert_eq!(post["content"], "bold claim");
    assert_eq!(post["user_id"], auth["user"]["id"]);
}

#[actix_web::test]
async fn test_errors_are_json_over_actix() {
    let app = app!(Store::memory());

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unauthorized");

    let req = test::TestRequest::get().uri("/api/nowhere").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No route found");
}
