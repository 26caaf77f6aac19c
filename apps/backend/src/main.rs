use actix_web::{web, App, HttpServer};
use food_backend::config::auth::AuthConfig;
use food_backend::middleware::request_trace::RequestTrace;
use food_backend::middleware::structured_logger::StructuredLogger;
use food_backend::routes;
use food_backend::state::builder::build_state;
use food_backend::telemetry;
use tracing::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    let host = std::env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("BACKEND_PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            eprintln!("❌ BACKEND_PORT must be a valid port number");
            std::process::exit(1);
        });

    let config = match AuthConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid auth configuration: {e}");
            std::process::exit(1);
        }
    };
    let sweep_interval = config.rate_limit_sweep_interval;

    let app_state = build_state().with_config(config).build();
    let _sweeper = app_state.rate_limiter.start_sweeper(sweep_interval);

    info!(
        env = ?app_state.config.env,
        revocation = app_state.sessions().revocation_enabled(),
        bcrypt_cost = app_state.hasher.cost(),
        "starting food backend on http://{host}:{port}"
    );

    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .wrap(StructuredLogger)
            .wrap(RequestTrace)
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
