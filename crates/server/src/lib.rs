//! Server crate provides the HTTP gateway.
//!
//! This module implements the axum HTTP gateway in front of the order,
//! auth and entity services: routing, the CORS and admission middleware,
//! metrics collection and graceful shutdown.

pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use repository::{
    BranchesRepository, CategoriesRepository, ClientsRepository, CouriersRepository,
    ProductsRepository, TariffsRepository, UsersRepository,
};
use service::{Auth, OrderFlow};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Everything the gateway calls into, wired once at startup.
pub struct Dependencies {
    pub orders: Arc<dyn OrderFlow>,
    pub auth: Arc<dyn Auth>,
    pub products: Arc<dyn ProductsRepository>,
    pub categories: Arc<dyn CategoriesRepository>,
    pub branches: Arc<dyn BranchesRepository>,
    pub users: Arc<dyn UsersRepository>,
    pub clients: Arc<dyn ClientsRepository>,
    pub couriers: Arc<dyn CouriersRepository>,
    pub tariffs: Arc<dyn TariffsRepository>,
}

/// Server represents the HTTP gateway.
pub struct Server {
    port: u16,
    state: AppState,
}

/// Application state shared between request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderFlow>,
    pub auth: Arc<dyn Auth>,
    pub products: Arc<dyn ProductsRepository>,
    pub categories: Arc<dyn CategoriesRepository>,
    pub branches: Arc<dyn BranchesRepository>,
    pub users: Arc<dyn UsersRepository>,
    pub clients: Arc<dyn ClientsRepository>,
    pub couriers: Arc<dyn CouriersRepository>,
    pub tariffs: Arc<dyn TariffsRepository>,
    pub default_page: i64,
    pub default_limit: i64,
    metrics: Arc<Metrics>,
    admission: Arc<Semaphore>,
}

/// Metrics collects and exposes HTTP server metrics.
struct Metrics {
    registry: Registry,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
    errors_total: CounterVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )
        .expect("Failed to create http_requests_total metric");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint"],
        )
        .expect("Failed to create http_request_duration_seconds metric");

        let errors_total = CounterVec::new(
            Opts::new("errors_total", "Total number of errors"),
            &["source", "endpoint"],
        )
        .expect("Failed to create errors_total metric");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("Failed to register http_requests_total metric");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("Failed to register http_request_duration_seconds metric");
        registry
            .register(Box::new(errors_total.clone()))
            .expect("Failed to register errors_total metric");

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
        }
    }

    fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    fn record_error(&self, source: &str, endpoint: &str) {
        self.errors_total
            .with_label_values(&[source, endpoint])
            .inc();
    }
}

impl Server {
    /// Creates a new Server instance.
    ///
    /// The admission semaphore and the metrics registry are built here,
    /// once, and travel through the router state.
    pub fn new(cfg: &app_config::AppConfig, deps: Dependencies) -> Self {
        info!("Initializing HTTP gateway on port {}", cfg.http_port);

        let state = AppState {
            orders: deps.orders,
            auth: deps.auth,
            products: deps.products,
            categories: deps.categories,
            branches: deps.branches,
            users: deps.users,
            clients: deps.clients,
            couriers: deps.couriers,
            tariffs: deps.tariffs,
            default_page: cfg.default_page,
            default_limit: cfg.default_limit,
            metrics: Arc::new(Metrics::new()),
            admission: Arc::new(Semaphore::new(cfg.max_inflight_requests)),
        };

        Self {
            port: cfg.http_port,
            state,
        }
    }

    /// Starts the server and blocks until it's shut down.
    pub async fn start(&self) -> Result<()> {
        let app = self.create_router();

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP gateway listening on port {}", self.port);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("HTTP gateway shut down gracefully");
        Ok(())
    }

    fn create_router(&self) -> Router {
        let metrics = self.state.metrics.clone();
        let admission = self.state.admission.clone();

        let v1 = Router::new()
            .route("/login", post(handlers::auth::login))
            .route(
                "/order",
                post(handlers::orders::create_order).get(handlers::orders::list_orders),
            )
            .route(
                "/order/{id}",
                get(handlers::orders::get_order)
                    .put(handlers::orders::update_order)
                    .delete(handlers::orders::delete_order),
            )
            .route(
                "/logic/{order_uid}",
                put(handlers::orders::update_order_status),
            )
            .route(
                "/courier/active-orders/list",
                get(handlers::couriers::accept_order),
            )
            .route(
                "/courier/get_order/{courier_id}",
                get(handlers::couriers::courier_orders),
            )
            .route(
                "/courier/delete_order/{order_uid}",
                get(handlers::couriers::drop_order),
            )
            .route("/branch/active", get(handlers::entities::list_active_branches))
            .route(
                "/product",
                post(handlers::entities::create_product).get(handlers::entities::list_products),
            )
            .route(
                "/product/{id}",
                get(handlers::entities::get_product)
                    .put(handlers::entities::update_product)
                    .delete(handlers::entities::delete_product),
            )
            .route(
                "/category",
                post(handlers::entities::create_category).get(handlers::entities::list_categories),
            )
            .route(
                "/category/{id}",
                get(handlers::entities::get_category)
                    .put(handlers::entities::update_category)
                    .delete(handlers::entities::delete_category),
            )
            .route(
                "/delivery_tariff",
                post(handlers::entities::create_tariff).get(handlers::entities::list_tariffs),
            )
            .route(
                "/delivery_tariff/{id}",
                get(handlers::entities::get_tariff)
                    .put(handlers::entities::update_tariff)
                    .delete(handlers::entities::delete_tariff),
            )
            .route(
                "/branch",
                post(handlers::entities::create_branch).get(handlers::entities::list_branches),
            )
            .route(
                "/branch/{id}",
                get(handlers::entities::get_branch)
                    .put(handlers::entities::update_branch)
                    .delete(handlers::entities::delete_branch),
            )
            .route(
                "/client",
                post(handlers::entities::create_client).get(handlers::entities::list_clients),
            )
            .route(
                "/client/{id}",
                get(handlers::entities::get_client)
                    .put(handlers::entities::update_client)
                    .delete(handlers::entities::delete_client),
            )
            .route(
                "/courier",
                post(handlers::entities::create_courier).get(handlers::entities::list_couriers),
            )
            .route(
                "/courier/{id}",
                get(handlers::entities::get_courier)
                    .put(handlers::entities::update_courier)
                    .delete(handlers::entities::delete_courier),
            )
            .route(
                "/user",
                post(handlers::entities::create_user).get(handlers::entities::list_users),
            )
            .route(
                "/user/{id}",
                get(handlers::entities::get_user)
                    .put(handlers::entities::update_user)
                    .delete(handlers::entities::delete_user),
            );

        Router::new()
            .nest("/v1", v1)
            .route("/health", get(Self::handle_health))
            .route("/metrics", get(Self::handle_metrics))
            .layer(axum::middleware::from_fn_with_state(
                admission,
                Self::admission_middleware,
            ))
            .layer(axum::middleware::from_fn(Self::cors_middleware))
            .layer(axum::middleware::from_fn_with_state(
                metrics,
                Self::metrics_middleware,
            ))
            .with_state(self.state.clone())
    }

    /// Middleware for collecting metrics on HTTP requests
    async fn metrics_middleware(
        State(metrics): State<Arc<Metrics>>,
        req: axum::extract::Request,
        next: axum::middleware::Next,
    ) -> Response {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let start = std::time::Instant::now();
        let response = next.run(req).await;
        let duration = start.elapsed();

        let status = response.status().as_u16();
        metrics.record_request(&method, &path, status, duration);

        if status >= 400 {
            metrics.record_error("http", &path);
        }

        response
    }

    /// Middleware capping the number of in-flight requests. The permit is
    /// held across the whole handler, so requests beyond the cap queue
    /// rather than pile onto the pool.
    async fn admission_middleware(
        State(admission): State<Arc<Semaphore>>,
        req: axum::extract::Request,
        next: axum::middleware::Next,
    ) -> Response {
        let _permit = match admission.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down")
                    .into_response()
            }
        };
        next.run(req).await
    }

    /// Permissive CORS for the web and mobile clients; preflight requests
    /// are answered here without reaching a handler.
    async fn cors_middleware(
        req: axum::extract::Request,
        next: axum::middleware::Next,
    ) -> Response {
        let preflight = req.method() == Method::OPTIONS;

        let mut response = if preflight {
            StatusCode::NO_CONTENT.into_response()
        } else {
            next.run(req).await
        };

        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        );
        response
    }

    async fn handle_health() -> &'static str {
        "OK"
    }

    async fn handle_metrics(State(state): State<AppState>) -> Response {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&state.metrics.registry.gather(), &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
        }

        match String::from_utf8(buffer) {
            Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
            Err(e) => {
                error!("Failed to convert metrics to UTF-8: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Invalid metrics data").into_response()
            }
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use model::{
        Branch, Category, Client, Courier, NewOrder, Order, OrderFilter, OrderStatus, Product,
        User,
    };
    use repository::{
        BranchData, CategoryData, ClientData, CourierData, ProductData, RepositoryError,
        TariffData, UserData,
    };
    use service::{Claims, CourierOrders, ServiceError};

    struct Stub;

    #[async_trait]
    impl OrderFlow for Stub {
        async fn create_order(&self, _order: &NewOrder) -> Result<String, ServiceError> {
            unimplemented!()
        }
        async fn get_order(&self, _order_uid: &str) -> Result<Order, ServiceError> {
            unimplemented!()
        }
        async fn list_orders(
            &self,
            _filter: &OrderFilter,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Order>, i64), ServiceError> {
            unimplemented!()
        }
        async fn update_order(&self, _order: &Order) -> Result<(), ServiceError> {
            unimplemented!()
        }
        async fn delete_order(&self, _id: i32) -> Result<(), ServiceError> {
            unimplemented!()
        }
        async fn advance_status(
            &self,
            _order_uid: &str,
            _target: OrderStatus,
        ) -> Result<(), ServiceError> {
            unimplemented!()
        }
        async fn courier_accept(
            &self,
            _order_uid: &str,
            _courier_id: i32,
        ) -> Result<(), ServiceError> {
            unimplemented!()
        }
        async fn remove_courier(&self, _order_uid: &str) -> Result<(), ServiceError> {
            unimplemented!()
        }
        async fn courier_orders(&self, _courier_id: i32) -> Result<CourierOrders, ServiceError> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl Auth for Stub {
        async fn login(
            &self,
            _login: &str,
            _password: &str,
            _role: &str,
        ) -> Result<String, ServiceError> {
            unimplemented!()
        }
        fn verify(&self, _token: &str) -> Result<Claims, ServiceError> {
            unimplemented!()
        }
        fn hash_password(&self, _password: &str) -> Result<String, ServiceError> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl ProductsRepository for Stub {
        async fn create(&self, _product: &ProductData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }
        async fn get(&self, _id: i32) -> Result<Product, RepositoryError> {
            unimplemented!()
        }
        async fn list(
            &self,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Product>, i64), RepositoryError> {
            unimplemented!()
        }
        async fn update(&self, _id: i32, _product: &ProductData) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl CategoriesRepository for Stub {
        async fn create(&self, _category: &CategoryData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }
        async fn get(&self, _id: i32) -> Result<Category, RepositoryError> {
            unimplemented!()
        }
        async fn list(
            &self,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Category>, i64), RepositoryError> {
            unimplemented!()
        }
        async fn update(&self, _id: i32, _category: &CategoryData) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl BranchesRepository for Stub {
        async fn create(&self, _branch: &BranchData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }
        async fn get(&self, _id: i32) -> Result<Branch, RepositoryError> {
            unimplemented!()
        }
        async fn list(
            &self,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Branch>, i64), RepositoryError> {
            unimplemented!()
        }
        async fn update(&self, _id: i32, _branch: &BranchData) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn list_active(
            &self,
            _now: &str,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Branch>, i64), RepositoryError> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl UsersRepository for Stub {
        async fn create(&self, _user: &UserData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }
        async fn get(&self, _id: i32) -> Result<User, RepositoryError> {
            unimplemented!()
        }
        async fn get_by_login(&self, _login: &str) -> Result<User, RepositoryError> {
            unimplemented!()
        }
        async fn list(&self, _page: i64, _limit: i64) -> Result<(Vec<User>, i64), RepositoryError> {
            unimplemented!()
        }
        async fn update(&self, _id: i32, _user: &UserData) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl ClientsRepository for Stub {
        async fn create(&self, _client: &ClientData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }
        async fn get(&self, _id: i32) -> Result<Client, RepositoryError> {
            unimplemented!()
        }
        async fn list(
            &self,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Client>, i64), RepositoryError> {
            unimplemented!()
        }
        async fn update(&self, _id: i32, _client: &ClientData) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn apply_finished_order(&self, _id: i32, _price: f64) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl CouriersRepository for Stub {
        async fn create(&self, _courier: &CourierData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }
        async fn get(&self, _id: i32) -> Result<Courier, RepositoryError> {
            unimplemented!()
        }
        async fn get_by_login(&self, _login: &str) -> Result<Courier, RepositoryError> {
            unimplemented!()
        }
        async fn list(
            &self,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Courier>, i64), RepositoryError> {
            unimplemented!()
        }
        async fn update(&self, _id: i32, _courier: &CourierData) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl TariffsRepository for Stub {
        async fn create(&self, _tariff: &TariffData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }
        async fn get(&self, _id: i32) -> Result<model::DeliveryTariff, RepositoryError> {
            unimplemented!()
        }
        async fn list(
            &self,
            _tariff_type: Option<&str>,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<model::DeliveryTariff>, i64), RepositoryError> {
            unimplemented!()
        }
        async fn update(&self, _id: i32, _tariff: &TariffData) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    fn create_test_server() -> Server {
        let cfg = app_config::AppConfig::load().expect("default config loads");
        let stub = Arc::new(Stub);
        Server::new(
            &cfg,
            Dependencies {
                orders: stub.clone(),
                auth: stub.clone(),
                products: stub.clone(),
                categories: stub.clone(),
                branches: stub.clone(),
                users: stub.clone(),
                clients: stub.clone(),
                couriers: stub.clone(),
                tariffs: stub.clone(),
            },
        )
    }

    #[test]
    fn test_server_creation() {
        let server = create_test_server();
        assert_eq!(server.port, 8081);
        assert_eq!(server.state.default_page, 1);
        assert_eq!(server.state.default_limit, 10);
    }

    #[test]
    fn test_router_builds_without_route_conflicts() {
        let server = create_test_server();
        let _router = server.create_router();
    }
}
