use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthError, TokenSigner};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::Store;
use crate::grocery::FamilyLocks;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;

/// Shared state cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub signer: Arc<TokenSigner>,
    pub grocery_locks: FamilyLocks,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Result<Self, AuthError> {
        let signer = TokenSigner::from_config(&config.security)?;
        Ok(Self {
            config: Arc::new(config),
            store,
            signer: Arc::new(signer),
            grocery_locks: FamilyLocks::new(),
        })
    }
}

pub fn app(state: AppState) -> Router {
    let router = Router::new()
        // Public
        .merge(public_routes())
        // Protected API, bearer token required
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(TraceLayer::new_for_http());

    let router = match cors_layer(&state.config.security) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, system};

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        // Registration and login are the only unauthenticated operations
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{family, grocery, meals, recipes, tasks, thoughts, whoami};

    Router::new()
        .route("/me", get(whoami::whoami))
        // Family membership
        .route("/family/users", get(family::list_users))
        .route("/family/users/:id/accept", put(family::accept_user))
        // Tasks
        .route("/tasks", get(tasks::list).post(tasks::create))
        .route("/tasks/:id", get(tasks::get).put(tasks::update).delete(tasks::delete))
        // Meals
        .route("/meals", get(meals::list).post(meals::create))
        .route("/meals/:id", get(meals::get).put(meals::update).delete(meals::delete))
        // Recipes
        .route("/recipes", get(recipes::list).post(recipes::create))
        .route("/recipes/:id", get(recipes::get).put(recipes::update).delete(recipes::delete))
        // Grocery items, inserts go through reconciliation
        .route("/grocery_items", get(grocery::list).post(grocery::create))
        .route(
            "/grocery_items/:id",
            get(grocery::get).put(grocery::update).delete(grocery::delete),
        )
        // Thoughts
        .route("/thoughts", get(thoughts::list).post(thoughts::create))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
