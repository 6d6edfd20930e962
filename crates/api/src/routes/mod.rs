use axum::extract::{Extension, Path, State};
use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use lexohub_domain::error::DomainError;
use lexohub_domain::identity::PractitionerIdentity;
use lexohub_domain::intake::{IntakeSubmission, IntakeView};
use lexohub_domain::issuance::{IssueInput, IssuedLink};
use lexohub_domain::pro_forma::{
    EntityRef, IntakeCompleteness, IntakeDetails, RequestedAction, UrgencyLevel,
};
use lexohub_domain::worklist::WorklistEntry;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::middleware::AuthContext;
use crate::{error::ApiError, middleware as app_middleware, observability, state::AppState, validation};

pub fn router(state: AppState) -> Router {
    let practitioner = Router::new()
        .route(
            "/v1/pro-forma-requests",
            post(issue_request).get(list_worklist),
        )
        .route(
            "/v1/pro-forma-requests/:request_id/resolve",
            post(resolve_request),
        )
        .route(
            "/v1/pro-forma-requests/:request_id/decline",
            post(decline_request),
        )
        .route_layer(middleware::from_fn(app_middleware::require_auth_middleware));

    // The token is the only credential on these routes; they stay outside
    // the auth requirement by design.
    let public = Router::new()
        .route("/pro-forma-request/:token", get(view_public_request))
        .route("/pro-forma-request/:token/submit", post(submit_public_request));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(practitioner)
        .merge(public)
        .layer(middleware::from_fn(app_middleware::metrics_layer))
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(
            app_middleware::correlation_id_middleware,
        ));

    if !state.config.app_env.eq_ignore_ascii_case("test") {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
    })
}

async fn metrics() -> Response {
    match observability::render_metrics() {
        Some(body) => body.into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder offline").into_response(),
    }
}

fn practitioner_identity(auth: &AuthContext) -> Result<PractitionerIdentity, ApiError> {
    let Some(practitioner_id) = auth.practitioner_id.clone() else {
        return Err(ApiError::Unauthorized);
    };
    let display_name = auth
        .display_name
        .clone()
        .unwrap_or_else(|| practitioner_id.clone());
    Ok(PractitionerIdentity {
        practitioner_id,
        display_name,
    })
}

#[derive(Debug, Default, Deserialize, Validate)]
struct IntakeBody {
    #[validate(length(max = 200))]
    client_name: Option<String>,
    #[validate(length(max = 320))]
    client_email: Option<String>,
    #[validate(length(max = 40))]
    client_phone: Option<String>,
    #[validate(length(max = 2000))]
    matter_description: Option<String>,
    #[validate(length(max = 100))]
    matter_type: Option<String>,
    urgency_level: Option<UrgencyLevel>,
    #[validate(length(max = 2000))]
    notes: Option<String>,
}

impl IntakeBody {
    fn into_details(self) -> IntakeDetails {
        IntakeDetails {
            client_name: self.client_name,
            client_email: self.client_email,
            client_phone: self.client_phone,
            matter_description: self.matter_description,
            matter_type: self.matter_type,
            urgency_level: self.urgency_level,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct IssueRequestBody {
    requested_action: RequestedAction,
    #[serde(default)]
    #[validate(nested)]
    intake: IntakeBody,
    intake_completeness: IntakeCompleteness,
}

async fn issue_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<IssueRequestBody>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let owner = practitioner_identity(&auth)?;
    let requested_action = payload.requested_action.clone();
    let issued: IssuedLink = state
        .issuance
        .issue(
            owner,
            IssueInput {
                requested_action: payload.requested_action,
                intake: payload.intake.into_details(),
                intake_completeness: payload.intake_completeness,
            },
        )
        .await?;
    observability::register_request_issued(requested_action.as_str());
    Ok((StatusCode::CREATED, Json(issued)).into_response())
}

#[derive(Serialize)]
struct WorklistResponse {
    requests: Vec<WorklistEntry>,
}

async fn list_worklist(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<WorklistResponse>, ApiError> {
    let owner = practitioner_identity(&auth)?;
    let requests = state.worklist.list_open(&owner.practitioner_id).await?;
    Ok(Json(WorklistResponse { requests }))
}

#[derive(Serialize)]
struct ResolveResponse {
    entity: EntityRef,
}

async fn resolve_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<String>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let actor = practitioner_identity(&auth)?;
    match state.dispatch.resolve(&request_id, &actor).await {
        Ok(entity) => {
            observability::register_dispatch("processed");
            Ok(Json(ResolveResponse { entity }))
        }
        Err(err) => {
            if matches!(err, DomainError::AlreadyActed) {
                observability::register_dispatch("already_acted");
            }
            Err(err.into())
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct DeclineRequestBody {
    #[validate(length(min = 1, max = 500))]
    reason: String,
}

#[derive(Serialize)]
struct DeclineResponse {
    request_id: String,
    status: String,
}

async fn decline_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<String>,
    Json(payload): Json<DeclineRequestBody>,
) -> Result<Json<DeclineResponse>, ApiError> {
    validation::validate(&payload)?;
    let actor = practitioner_identity(&auth)?;
    let declined = state
        .dispatch
        .decline(&request_id, &actor, &payload.reason)
        .await?;
    observability::register_dispatch("declined");
    Ok(Json(DeclineResponse {
        request_id: declined.request_id,
        status: declined.status.as_str().to_string(),
    }))
}

async fn view_public_request(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let view = state.intake.resolve(&token).await?;
    Ok(render_view(view))
}

#[derive(Debug, Deserialize, Validate)]
struct SubmitRequestBody {
    #[validate(length(max = 200))]
    client_name: String,
    #[validate(length(max = 320))]
    client_email: String,
    #[validate(length(max = 40))]
    client_phone: Option<String>,
    #[validate(length(max = 2000))]
    matter_description: String,
    #[validate(length(max = 100))]
    matter_type: Option<String>,
    urgency_level: Option<UrgencyLevel>,
    #[validate(length(max = 2000))]
    notes: Option<String>,
}

async fn submit_public_request(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<SubmitRequestBody>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let submission = IntakeSubmission {
        client_name: payload.client_name,
        client_email: payload.client_email,
        client_phone: payload.client_phone,
        matter_description: payload.matter_description,
        matter_type: payload.matter_type,
        urgency_level: payload.urgency_level,
        notes: payload.notes,
    };

    match state.intake.submit(&token, submission).await {
        Ok(ack) => {
            observability::register_public_submission("accepted");
            Ok(Json(ack).into_response())
        }
        // The outcome already happened from the requester's point of view:
        // answer with the terminal confirmation view, not a failure.
        Err(DomainError::AlreadyActed) => {
            observability::register_public_submission("already_acted");
            let view = state.intake.resolve(&token).await?;
            Ok(render_view(view))
        }
        Err(err) => {
            observability::register_public_submission("rejected");
            Err(err.into())
        }
    }
}

fn render_view(view: IntakeView) -> Response {
    let status = if view == IntakeView::NotFound {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (status, Json(view)).into_response()
}
