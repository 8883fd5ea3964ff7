//! Route definitions for the Stockroom API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .nest("/auth", auth_routes(state))
        // Protected routes - user administration
        .nest("/users", user_routes(state))
        .nest("/products", product_routes(state))
        .nest("/departments", department_routes(state))
        .nest("/recipes", recipe_routes(state))
        .nest("/calcule", daily_calculation_routes(state))
        // Protected routes - stock ledger
        .nest("/stocks", stock_routes(state))
        // Protected routes - movement log and audit trail
        .nest("/logs", log_routes(state))
        // Protected routes - reports
        .nest("/reports", report_routes(state))
}

/// Authentication routes
fn auth_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .merge(protected)
}

/// User administration routes (protected, admin checked in handlers)
fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:user_id",
            put(handlers::update_user).delete(handlers::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Product routes (reads public, writes protected)
fn product_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(handlers::create_product))
        .route(
            "/:product_id",
            put(handlers::update_product).delete(handlers::delete_product),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(handlers::list_products))
        .route("/:product_id", get(handlers::get_product))
        .merge(protected)
}

/// Department routes (reads public, writes protected)
fn department_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(handlers::create_department))
        .route(
            "/:department_id",
            put(handlers::update_department).delete(handlers::delete_department),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(handlers::list_departments))
        .route("/:department_id", get(handlers::get_department))
        .merge(protected)
}

/// Recipe routes (reads public, writes protected)
fn recipe_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(handlers::create_recipe))
        .route("/calculate", post(handlers::calculate_requirements))
        .route(
            "/:recipe_id",
            put(handlers::update_recipe).delete(handlers::delete_recipe),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(handlers::list_recipes))
        .route("/search", get(handlers::search_recipes))
        .route("/:recipe_id", get(handlers::get_recipe))
        .merge(protected)
}

/// Daily calculation routes (reads public, upsert protected)
fn daily_calculation_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(handlers::save_daily_calculation))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/:date", get(handlers::get_daily_calculation))
        .route(
            "/range/:start_date/:end_date",
            get(handlers::list_daily_calculations),
        )
        .merge(protected)
}

/// Stock ledger routes (protected)
fn stock_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stocks))
        .route("/low", get(handlers::low_stock))
        .route("/total-value", get(handlers::total_value))
        .route("/department/:department", get(handlers::stocks_by_department))
        .route("/add", post(handlers::add_stock))
        .route("/transfer", post(handlers::transfer_stock))
        .route("/transfer-to-trash", post(handlers::transfer_to_trash))
        .route("/transfer-to-used", post(handlers::transfer_to_used))
        .route("/remove", post(handlers::remove_stock))
        .route("/adjust", post(handlers::adjust_stock))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Movement log and audit routes (protected)
fn log_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/stock-movements", get(handlers::list_stock_movements))
        .route("/products/:product_id/movements", get(handlers::product_movements))
        .route("/activity-logs", get(handlers::list_activity_logs))
        .route("/activity/:entity_type/:entity_id", get(handlers::entity_activity))
        .route("/department-transfers", get(handlers::department_transfers))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Report routes (protected)
fn report_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/ingredient-comparison", get(handlers::ingredient_comparison))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
