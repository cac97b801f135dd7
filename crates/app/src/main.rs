/// Delivery Backend Application
///
/// This is the main entry point for the delivery backend service.
/// The application provides REST API endpoints for the order lifecycle
/// (pricing, status machine, courier assignment) and CRUD over the
/// catalog and account entities.
///
/// # Architecture
///
/// The application follows a modular architecture with:
/// - Repository layer for data access (deadpool-postgres)
/// - Service layer for business logic (order flow, auth)
/// - HTTP gateway for the API surface
/// - Metrics for monitoring
///
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{error, info};

use app_config::AppConfig;
use repository::{
    PgBranchesRepository, PgCategoriesRepository, PgClientsRepository, PgCouriersRepository,
    PgOrdersRepository, PgProductsRepository, PgTariffsRepository, PgUsersRepository,
};
use server::{Dependencies, Server};
use service::{AuthService, OrderFlowService};

/// Initialize the tracing subscriber for logging
fn init_logger() -> Result<()> {
    tracing_subscriber::fmt::init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = init_logger() {
        eprintln!("Failed to initialize logger: {}", err);
        return Err(anyhow::anyhow!("Failed to initialize logger"));
    }

    info!("Delivery backend starting...");

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize database pool and apply migrations
    let db_pool = match db::init_db_pool(&config).await {
        Ok(pool) => {
            info!("Database initialized successfully");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(anyhow::anyhow!("Failed to initialize database"));
        }
    };

    // Initialize repositories over the shared pool
    let orders_repo = PgOrdersRepository::new(db_pool.clone());
    let clients_repo = PgClientsRepository::new(db_pool.clone());
    let branches_repo = PgBranchesRepository::new(db_pool.clone());
    let tariffs_repo = PgTariffsRepository::new(db_pool.clone());
    let couriers_repo = PgCouriersRepository::new(db_pool.clone());
    let users_repo = PgUsersRepository::new(db_pool.clone());
    let products_repo = PgProductsRepository::new(db_pool.clone());
    let categories_repo = PgCategoriesRepository::new(db_pool.clone());

    // Initialize services
    let order_flow = Arc::new(OrderFlowService::new(
        orders_repo,
        clients_repo,
        branches_repo,
        tariffs_repo,
        couriers_repo,
    ));
    let auth = Arc::new(AuthService::new(
        PgCouriersRepository::new(db_pool.clone()),
        PgUsersRepository::new(db_pool.clone()),
        config.jwt_secret.clone(),
        config.jwt_expiry,
    ));

    let deps = Dependencies {
        orders: order_flow,
        auth,
        products: Arc::new(products_repo),
        categories: Arc::new(categories_repo),
        branches: Arc::new(PgBranchesRepository::new(db_pool.clone())),
        users: Arc::new(users_repo),
        clients: Arc::new(PgClientsRepository::new(db_pool.clone())),
        couriers: Arc::new(PgCouriersRepository::new(db_pool.clone())),
        tariffs: Arc::new(PgTariffsRepository::new(db_pool.clone())),
    };

    // Create a JoinSet to manage all our tasks
    let mut tasks = JoinSet::new();

    let http_server = Server::new(&config, deps);
    tasks.spawn(async move {
        if let Err(err) = http_server.start().await {
            error!("HTTP server error: {}", err);
            // Exit the application if the server fails to start
            std::process::exit(1);
        }
    });

    // Wait for all tasks to complete
    while let Some(res) = tasks.join_next().await {
        if let Err(err) = res {
            error!("Task error: {}", err);
        }
    }

    info!("Application stopped");
    Ok(())
}
