//! Error chain: coercion, 404 fallback, JSON responder, error logging.
//!
//! Handlers fail with `HttpError`. Its plain rendering carries the original
//! `RouteError` in the response extensions; the normalizing middleware
//! swaps that response for the canonical JSON one when the chain is on.

use axum::{
    Json,
    body::Body,
    extract::{
        State,
        rejection::{FormRejection, JsonRejection, QueryRejection},
    },
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use modelhooks_types::{ApiError, AppError, Environment, RouteError, ValidationError};

/// Wrapper to implement IntoResponse for RouteError (orphan rule workaround).
#[derive(Debug)]
pub struct HttpError(pub RouteError);

/// The error a response was produced from, kept for later middleware.
#[derive(Debug, Clone)]
pub struct RaisedError(pub RouteError);

impl From<RouteError> for HttpError {
    fn from(err: RouteError) -> Self {
        HttpError(err)
    }
}

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        HttpError(err.into())
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        HttpError(RouteError::Api(err))
    }
}

impl From<ValidationError> for HttpError {
    fn from(err: ValidationError) -> Self {
        HttpError(RouteError::Validation(err))
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError(RouteError::Other {
            message: rejection.body_text(),
            status: Some(rejection.status().as_u16()),
            is_public: None,
        })
    }
}

impl From<FormRejection> for HttpError {
    fn from(rejection: FormRejection) -> Self {
        HttpError(RouteError::Other {
            message: rejection.body_text(),
            status: Some(rejection.status().as_u16()),
            is_public: None,
        })
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        HttpError(RouteError::Other {
            message: rejection.body_text(),
            status: Some(rejection.status().as_u16()),
            is_public: None,
        })
    }
}

impl IntoResponse for HttpError {
    /// Plain-text rendering used when the error chain is disabled.
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = (status, self.0.to_string()).into_response();
        response.extensions_mut().insert(RaisedError(self.0));
        response
    }
}

/// Renders the canonical `{message, stack}` body.
///
/// Non-public errors only show the status reason phrase; the stack is
/// revealed in development only.
pub fn render_api_error(err: &ApiError, environment: &Environment) -> Response {
    let stack = if environment.is_development() {
        json!(err.stack)
    } else {
        json!({})
    };

    let body = json!({
        "message": err.public_message(),
        "stack": stack,
    });

    (err.status_code(), Json(body)).into_response()
}

/// Converts any raised error into an `ApiError` and answers with JSON.
pub async fn normalize_errors(
    State(environment): State<Environment>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let Some(raised) = response.extensions().get::<RaisedError>().cloned() else {
        return response;
    };

    let api_error = raised.0.clone().into_api_error();
    let mut rendered = render_api_error(&api_error, &environment);
    rendered.extensions_mut().insert(raised);
    rendered
}

/// Catch-all for paths no route claims.
pub async fn api_not_found() -> HttpError {
    ApiError::with_status("API not found", StatusCode::NOT_FOUND.as_u16()).into()
}

/// Logs every raised error that made it into a response.
pub async fn log_errors(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    if let Some(RaisedError(err)) = response.extensions().get::<RaisedError>() {
        tracing::error!(
            %method,
            %uri,
            status = response.status().as_u16(),
            "request failed: {}",
            err
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_render_private_error_in_production() {
        let err = ApiError::with_status("db password leaked", 500);

        let response = render_api_error(&err, &Environment::Production);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal Server Error");
        assert_eq!(body["stack"], json!({}));
    }

    #[tokio::test]
    async fn test_render_public_error_in_development() {
        let err = ApiError::new("name is taken", 409, true);

        let response = render_api_error(&err, &Environment::Development);

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["message"], "name is taken");
        assert!(body["stack"].as_str().unwrap().starts_with("APIError: name is taken"));
    }

    #[tokio::test]
    async fn test_plain_rendering_keeps_raised_error() {
        let response = HttpError(RouteError::Message("gone".into())).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<RaisedError>().is_some());
    }
}
