use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use vectura::directory::HttpDriverDirectory;
use vectura::engine::Engine;
use vectura::fare::FareEngine;
use vectura::matching::DriverMatcher;
use vectura::server::serve;
use vectura::simulation;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    if env::args().nth(1).as_deref() == Some("simulate") {
        simulation::run().await;
        return;
    }

    let base_url = env::var("DRIVER_DIRECTORY_URL").unwrap();
    let service_token = env::var("INTERNAL_SERVICE_TOKEN").unwrap();

    let directory = HttpDriverDirectory::new(base_url, service_token).unwrap();
    let matcher = DriverMatcher::new(Arc::new(directory));
    let engine = Engine::new(FareEngine::new(), matcher);

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".into())
        .parse()
        .unwrap();
    serve(engine, addr).await;
}
