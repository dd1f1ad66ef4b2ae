pub mod auth;
pub mod config;
pub mod core;
pub mod follow;
pub mod messages;
pub mod models;
pub mod posts;
pub mod router;
pub mod tribes;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod client;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(target_arch = "wasm32")]
use spin_sdk::{
    http::{IntoResponse, Request, Response},
    http_component,
};

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let store = crate::core::store::Store::spin_default();
    if config::seed_demo_data() {
        if let Err(e) = crate::core::db::init_test_data(&store) {
            log::error!("failed to seed demo data: {}", e);
        }
    }

    let mut builder = http::Request::builder()
        .method(req.method().to_string().as_str())
        .uri(req.uri());
    for (name, value) in req.headers() {
        if let Some(val_str) = value.as_str() {
            builder = builder.header(name, val_str);
        }
    }
    let request = builder.body(req.body().to_vec())?;

    let response = router::handle(&store, &request);

    let mut out = Response::builder();
    out.status(response.status().as_u16());
    for (name, value) in response.headers() {
        if let Ok(val_str) = value.to_str() {
            out.header(name.as_str(), val_str);
        }
    }
    Ok(out.body(response.into_body()).build())
}
