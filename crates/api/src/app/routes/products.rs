use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, Sse},
    },
    routing::{get, post},
};
use serde_json::json;

use stockroom_core::ProductId;
use stockroom_products::{NewProduct, ProductPatch, Target};

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route(
            "/",
            get(list_products)
                .post(create_product)
                .patch(update_products)
                .delete(delete_products),
        )
        .route("/stream", get(stream))
        .route(
            "/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/:id/sale", post(sell_product))
        .route("/:id/restock", post(restock_product))
}

fn parse_id(raw: &str) -> Result<ProductId, Response> {
    raw.parse::<ProductId>()
        .map_err(errors::store_error_to_response)
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::SelectionParams>,
) -> Response {
    let query = match params.to_query() {
        Ok(q) => q,
        Err(e) => return errors::store_error_to_response(e),
    };

    match services.store().cursor(query).collect_remaining().await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewProduct>,
) -> Response {
    match services.store().create(&body).await {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::SelectionParams>,
    Json(patch): Json<ProductPatch>,
) -> Response {
    let target = Target::Collection(params.to_filter());
    match services.store().update(target, &patch).await {
        Ok(rows) => Json(json!({ "rows_affected": rows })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::SelectionParams>,
) -> Response {
    let target = Target::Collection(params.to_filter());
    match services.store().delete(target).await {
        Ok(rows) => Json(json!({ "rows_deleted": rows })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store().read(id).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store().update(id, &patch).await {
        Ok(rows) => Json(json!({ "rows_affected": rows })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store().delete(id).await {
        Ok(rows) => Json(json!({ "rows_deleted": rows })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn sell_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store().decrement_quantity(id).await {
        Ok(outcome) => Json(json!({
            "id": id,
            "quantity": outcome.quantity,
            "floored": outcome.floored,
        }))
        .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn restock_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::RestockRequest>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store().restock(id, body.amount).await {
        Ok(quantity) => Json(json!({ "id": id, "quantity": quantity })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::products_sse_stream(services)
}
