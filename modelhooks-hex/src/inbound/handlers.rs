//! HTTP request handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Path, Query, Request, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde_json::{Map, Value};

use modelhooks_types::{
    AppError, DocumentId, DocumentStore, Filter, Pagination, RouteError, Update, UpdateResponse,
};

use super::errors::HttpError;
use crate::model::{Model, Statics};

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// CRUD routes for one model, rooted at `/{collection}`.
///
/// Read routes are only mounted when the model was built with static
/// methods.
pub fn resource_routes<S: DocumentStore>(model: Arc<Model<S>>) -> Router {
    let base = format!("/{}", model.collection());

    let mut router = Router::new();
    if model.statics().is_some() {
        router = router
            .route(&base, get(list::<S>).post(create::<S>))
            .route(&format!("{base}/active"), get(list_actives::<S>))
            .route(&format!("{base}/{{id}}"), get(get_one::<S>).patch(update::<S>));
    } else {
        router = router
            .route(&base, axum::routing::post(create::<S>))
            .route(&format!("{base}/{{id}}"), axum::routing::patch(update::<S>));
    }

    router.with_state(model)
}

/// A request body given as JSON or as an URL-encoded form.
///
/// Form values arrive as strings.
#[derive(Debug)]
pub struct Payload(pub Map<String, Value>);

impl<S: Send + Sync> FromRequest<S> for Payload {
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state).await?;
            Ok(Payload(
                fields
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect(),
            ))
        } else {
            let Json(fields) = Json::<Map<String, Value>>::from_request(req, state).await?;
            Ok(Payload(fields))
        }
    }
}

fn parse_id(id: &str) -> Result<DocumentId, HttpError> {
    id.parse()
        .map_err(|_| HttpError(RouteError::Message("Invalid id".into())))
}

fn statics_of<S: DocumentStore>(model: &Model<S>) -> Result<Statics<'_, S>, HttpError> {
    model.statics().ok_or_else(|| {
        HttpError(RouteError::other(format!(
            "static methods are not enabled on {}",
            model.collection()
        )))
    })
}

#[tracing::instrument(skip(model), fields(collection = %model.collection()))]
pub async fn list<S: DocumentStore>(
    State(model): State<Arc<Model<S>>>,
    page: Result<Query<Pagination>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Query(page) = page?;
    let docs = statics_of(&model)?.list(page).await?;
    Ok(Json(docs))
}

#[tracing::instrument(skip(model), fields(collection = %model.collection()))]
pub async fn list_actives<S: DocumentStore>(
    State(model): State<Arc<Model<S>>>,
    page: Result<Query<Pagination>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Query(page) = page?;
    let docs = statics_of(&model)?.list_actives(page).await?;
    Ok(Json(docs))
}

#[tracing::instrument(skip(model), fields(collection = %model.collection(), doc_id = %id))]
pub async fn get_one<S: DocumentStore>(
    State(model): State<Arc<Model<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let id = parse_id(&id)?;
    let doc = statics_of(&model)?.get(id).await?;
    Ok(Json(doc))
}

#[tracing::instrument(skip(model, body), fields(collection = %model.collection()))]
pub async fn create<S: DocumentStore>(
    State(model): State<Arc<Model<S>>>,
    Payload(body): Payload,
) -> Result<impl IntoResponse, HttpError> {
    let doc = model.create(body).await?;
    tracing::info!(id = %doc.id, "document created");
    Ok((StatusCode::CREATED, Json(doc)))
}

#[tracing::instrument(skip(model, set), fields(collection = %model.collection(), doc_id = %id))]
pub async fn update<S: DocumentStore>(
    State(model): State<Arc<Model<S>>>,
    Path(id): Path<String>,
    Payload(set): Payload,
) -> Result<impl IntoResponse, HttpError> {
    let id = parse_id(&id)?;

    let outcome = model.update(Filter::by_id(id), Update { set }).await?;
    if outcome.matched == 0 {
        return Err(AppError::NotFound("Element does not exist".into()).into());
    }

    let document = model.find_by_id(id).await?;
    Ok(Json(UpdateResponse { outcome, document }))
}
