use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRef, Path, Query, State,
    },
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use greatbig::model::{Entity, Note, Talk};
use greatbig::services::{EntityService, PaginationConfig, Saved, Sort};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{auth_middleware, require_write, ApiKeyAuth};
use crate::error::ApiError;
use crate::headers::{
    entity_creation_alert, entity_deletion_alert, entity_update_alert, pagination_headers,
    search_pagination_headers,
};
use crate::state::AppState;

type Service<E> = State<Arc<EntityService<E>>>;

#[derive(Deserialize)]
pub struct PageParams {
    page: Option<u64>,
    size: Option<u64>,
    sort: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    query: String,
    page: Option<u64>,
    size: Option<u64>,
}

fn collection_url<E: Entity>() -> String {
    format!("/api/{}", E::COLLECTION)
}

fn search_url<E: Entity>() -> String {
    format!("/api/_search/{}", E::COLLECTION)
}

fn id_param<E: Entity>(entity: &E) -> String {
    entity.id().map(|id| id.to_string()).unwrap_or_default()
}

fn created<E: Entity>(entity: E) -> Response {
    let id = id_param(&entity);
    let location = format!("{}/{}", collection_url::<E>(), id);
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        entity_creation_alert(E::NAME, &id),
        Json(entity),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn create_entity<E: Entity>(
    State(service): Service<E>,
    payload: Result<Json<E>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(entity) = payload.map_err(|e| ApiError::MalformedPayload(e.body_text()))?;
    tracing::debug!("REST request to save {} : {:?}", E::NAME, entity);

    let saved = service.create(entity).await?;
    Ok(created(saved))
}

async fn update_entity<E: Entity>(
    State(service): Service<E>,
    payload: Result<Json<E>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(entity) = payload.map_err(|e| ApiError::MalformedPayload(e.body_text()))?;
    tracing::debug!("REST request to update {} : {:?}", E::NAME, entity);

    match service.update(entity).await? {
        Saved::Created(entity) => Ok(created(entity)),
        Saved::Updated(entity) => {
            let headers = entity_update_alert(E::NAME, &id_param(&entity));
            Ok((StatusCode::OK, headers, Json(entity)).into_response())
        },
    }
}

async fn list_entities<E: Entity>(
    State(service): Service<E>,
    State(pagination): State<PaginationConfig>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::MalformedPayload(e.body_text()))?;
    tracing::debug!("REST request to get a page of {}", E::COLLECTION);

    let mut pageable = pagination.pageable(params.page, params.size);
    if let Some(sort) = params.sort.as_deref().filter(|s| !s.trim().is_empty()) {
        let sort: Sort = sort.parse().map_err(|e: anyhow::Error| ApiError::BadRequestAlert {
            message: e.to_string(),
            entity_name: E::NAME,
            error_key: "invalidsort",
        })?;
        pageable = pageable.with_sort(sort);
    }

    let page = service.list(&pageable).await?;
    let headers = pagination_headers(&page, &collection_url::<E>());
    Ok((StatusCode::OK, headers, Json(page.content)).into_response())
}

async fn get_entity<E: Entity>(
    State(service): Service<E>,
    Path(id): Path<i64>,
) -> Result<Json<E>, ApiError> {
    tracing::debug!("REST request to get {} : {}", E::NAME, id);
    service.get(id).await?.map(Json).ok_or(ApiError::NotFound)
}

async fn delete_entity<E: Entity>(
    State(service): Service<E>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    tracing::debug!("REST request to delete {} : {}", E::NAME, id);
    service.delete(id).await?;
    Ok((StatusCode::OK, entity_deletion_alert(E::NAME, &id.to_string())).into_response())
}

async fn search_entities<E: Entity>(
    State(service): Service<E>,
    State(pagination): State<PaginationConfig>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::MalformedPayload(e.body_text()))?;
    tracing::debug!(
        "REST request to search for a page of {} for query {}",
        E::COLLECTION,
        params.query
    );

    let pageable = pagination.pageable(params.page, params.size);
    let page = service.search(&params.query, &pageable).await?;
    let headers = search_pagination_headers(&params.query, &page, &search_url::<E>());
    Ok((StatusCode::OK, headers, Json(page.content)).into_response())
}

/// CRUD and search routes for one entity type
fn resource_routes<E: Entity>() -> Router<AppState>
where
    Arc<EntityService<E>>: FromRef<AppState>,
{
    let collection = collection_url::<E>();
    let item = format!("{}/{{id}}", collection);

    // Routes that require write access
    let write_routes = Router::new()
        .route(&collection, post(create_entity::<E>).put(update_entity::<E>))
        .route(&item, delete(delete_entity::<E>))
        .route_layer(middleware::from_fn(require_write));

    let read_routes = Router::new()
        .route(&collection, get(list_entities::<E>))
        .route(&item, get(get_entity::<E>))
        .route(&search_url::<E>(), get(search_entities::<E>));

    write_routes.merge(read_routes)
}

pub fn build_router(state: AppState) -> Router {
    let api_key_auth = ApiKeyAuth::from_config(&state.config.auth);

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::LOCATION, header::LINK]);

    let api_routes = Router::new()
        .merge(resource_routes::<Note>())
        .merge(resource_routes::<Talk>())
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(Extension(api_key_auth));

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
