use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};

use tradecopier_backend::{
    account_manager::AccountManager,
    adapter::registry::AdapterRegistry,
    config::settings::Settings,
    db::{pool, redis::RedisPool},
    engine::{FanoutContext, Supervisor},
    middleware::{auth::Auth, metrics::Metrics},
    routes::{
        accounts::accounts_scope, copiers::copiers_scope, health::health_scope,
        trades::trades_scope,
    },
};

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();
    log::info!("starting trade copier backend");

    let settings = Settings::new().unwrap_or_else(|e| {
        eprintln!("failed to load settings: {e}");
        std::process::exit(1);
    });

    let port = settings.server_port;
    let jwt_secret = settings.jwt_secret.clone();
    let heartbeat_interval = settings.heartbeat_interval;

    let pg_pool = pool::connect(&settings.database_url)
        .await
        .expect("failed to connect to postgres");

    let redis_pool = RedisPool::new(&settings.redis_url)
        .await
        .expect("failed to connect to redis");

    let adapters = Arc::new(AdapterRegistry::new(settings.clone()));
    let account_manager = web::Data::new(AccountManager::new(pg_pool.clone(), adapters.clone()));

    let fanout_ctx = Arc::new(FanoutContext {
        pool: pg_pool.clone(),
        adapters: adapters.clone(),
    });
    let supervisor = web::Data::new(Supervisor::new(
        fanout_ctx,
        adapters.clone(),
        heartbeat_interval,
    ));

    if let Err(e) = supervisor.recover_on_boot().await {
        log::error!("crash-recovery boot scan failed: {e}");
    }

    let pg_data = web::Data::new(pg_pool.clone());
    let redis_data = web::Data::new(redis_pool.clone());
    let settings_data = web::Data::new(settings.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Metrics)
            .app_data(settings_data.clone())
            .app_data(pg_data.clone())
            .app_data(redis_data.clone())
            .app_data(account_manager.clone())
            .app_data(supervisor.clone())
            .service(health_scope())
            .service(
                web::scope("")
                    .wrap(Auth {
                        jwt_secret: jwt_secret.clone(),
                    })
                    .service(accounts_scope())
                    .service(copiers_scope())
                    .service(trades_scope()),
            )
    })
    .bind(("0.0.0.0", port))?
    .run();

    let result = server.await;

    log::info!("shutting down, stopping all running copiers");
    supervisor.stop_all().await;

    result
}
