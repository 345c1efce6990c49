//! API routes.

use crate::{
    handlers::{admin, auth, categories, contacts, frontend, health, suppliers, tokens, vendors},
    middleware::{auth::auth_layer, cors::cors_layer, logging::logging_layer},
    state::AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

type AppRouter = Router<Arc<AppState>>;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(frontend::index_handler))
        .route("/healthz", get(health::healthz_handler))
        .route("/health/ready", get(health::readiness_handler))
        .merge(auth_routes())
        .merge(resource_routes())
        .merge(admin_routes())
        // Middleware; the last layer added runs first.
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.cors_origins))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(middleware::from_fn(logging_layer))
        .with_state(state)
}

/// Registers a route with and without the trailing slash.
fn route(router: AppRouter, path: &str, handler: MethodRouter<Arc<AppState>>) -> AppRouter {
    router
        .route(path, handler.clone())
        .route(&format!("{path}/"), handler)
}

/// Session and token routes.
fn auth_routes() -> AppRouter {
    let router = Router::new();
    let router = route(router, "/api/auth/csrf", get(auth::csrf_handler));
    let router = route(router, "/api/auth/login", post(auth::login_handler));
    let router = route(router, "/api/auth/logout", post(auth::logout_handler));
    let router = route(router, "/api/auth/me", get(auth::me_handler));
    let router = route(router, "/api/token", post(tokens::obtain_pair_handler));
    let router = route(router, "/api/token/refresh", post(tokens::refresh_handler));
    route(router, "/api/token/blacklist", post(tokens::blacklist_handler))
}

/// Vendor, supplier, category and contact CRUD.
fn resource_routes() -> AppRouter {
    let router = Router::new();
    let router = route(
        router,
        "/routes/vendors",
        get(vendors::list_vendors).post(vendors::create_vendor),
    );
    let router = route(
        router,
        "/routes/vendors/:id",
        get(vendors::get_vendor)
            .put(vendors::update_vendor)
            .patch(vendors::patch_vendor)
            .delete(vendors::delete_vendor),
    );
    let router = route(
        router,
        "/routes/suppliers",
        get(suppliers::list_suppliers).post(suppliers::create_supplier),
    );
    let router = route(
        router,
        "/routes/suppliers/:id",
        get(suppliers::get_supplier)
            .put(suppliers::update_supplier)
            .patch(suppliers::patch_supplier)
            .delete(suppliers::delete_supplier),
    );
    let router = route(router, "/routes/suppliers/:id/password", get(suppliers::reveal_password));
    let router = route(
        router,
        "/routes/categories",
        get(categories::list_categories).post(categories::create_category),
    );
    let router = route(
        router,
        "/routes/categories/:id",
        get(categories::get_category)
            .put(categories::update_category)
            .patch(categories::patch_category)
            .delete(categories::delete_category),
    );
    let router = route(
        router,
        "/routes/contacts",
        get(contacts::list_contacts).post(contacts::create_contact),
    );
    route(
        router,
        "/routes/contacts/:id",
        get(contacts::get_contact)
            .put(contacts::update_contact)
            .patch(contacts::patch_contact)
            .delete(contacts::delete_contact),
    )
}

/// Staff-only admin routes.
fn admin_routes() -> AppRouter {
    let router = Router::new();
    let router = route(router, "/admin/api/vendors", get(admin::list_vendors));
    let router = route(router, "/admin/api/suppliers", get(admin::list_suppliers));
    let router = route(router, "/admin/api/suppliers/:id", get(admin::supplier_detail));
    let router = route(router, "/admin/api/categories", get(admin::list_categories));
    route(
        router,
        "/admin/api/vendors/:id/suppliers/:supplier_id",
        post(admin::link_supplier).delete(admin::unlink_supplier),
    )
}
