#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    use star::config;
    use star::core::db::init_test_data;
    use star::core::store::Store;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let store = Store::memory();
    if config::seed_demo_data() {
        if let Err(e) = init_test_data(&store) {
            log::error!("failed to seed demo data: {:#}", e);
        }
    }

    star::server::run(store, &config::bind_addr()).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
