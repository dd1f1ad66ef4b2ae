use actix_web::middleware::Logger;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

use crate::core::store::Store;
use crate::router;

mod adapter {
    use actix_web::http::StatusCode;
    use actix_web::{web, HttpRequest, HttpResponse};

    use crate::core::helpers::{Request, Response};

    pub fn actix_to_http_request(req: &HttpRequest, body: web::Bytes) -> anyhow::Result<Request> {
        let mut builder = http::Request::builder()
            .method(req.method().as_str())
            .uri(req.uri().to_string());

        // Copy headers
        for (name, value) in req.headers() {
            builder = builder.header(name.as_str(), value.as_bytes());
        }

        Ok(builder.body(body.to_vec())?)
    }

    pub fn http_to_actix_response(resp: Response) -> HttpResponse {
        let status = StatusCode::from_u16(resp.status().as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = HttpResponse::build(status);
        for (name, value) in resp.headers() {
            if let Ok(val_str) = value.to_str() {
                response.insert_header((name.as_str(), val_str));
            }
        }

        response.body(resp.into_body())
    }
}

/// Catch-all actix handler forwarding to [`router::handle`].
pub async fn handle_all(store: web::Data<Store>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let request = match adapter::actix_to_http_request(&req, body) {
        Ok(r) => r,
        Err(_) => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "Invalid request"}))
        }
    };

    // Store access and password hashing are blocking.
    let store = store.get_ref().clone();
    match web::block(move || router::handle(&store, &request)).await {
        Ok(response) => adapter::http_to_actix_response(response),
        Err(e) => {
            log::error!("request handler failed: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

pub async fn run(store: Store, addr: &str) -> std::io::Result<()> {
    let data = web::Data::new(store);
    log::info!("Server listening on http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .default_service(web::route().to(handle_all))
    })
    .bind(addr)?
    .run()
    .await
}
