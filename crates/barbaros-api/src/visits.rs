//! Handlers for visit history.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/clients/{id}/visits` | Staff or the client; newest first |
//! | `POST`   | `/clients/{id}/visits` | Staff only; body: [`NewVisit`] |
//! | `GET`    | `/visits` | Staff only; `?from=&to=` (RFC 3339, inclusive), `&page=&limit=` |
//! | `PUT`    | `/visits/{id}` | Staff only; body: [`VisitPatch`] |
//! | `DELETE` | `/visits/{id}` | Staff only; 204, or 404 if unknown |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use barbaros_core::{
  client::ClientRecord,
  loyalty::{LoyaltyPolicy, LoyaltyStatus},
  page::{Page, PageRequest},
  store::ClientRepository,
  visit::{NewVisit, Visit, VisitPatch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{AdminCaller, Caller},
  clients::{PageParams, resolve_client},
  error::ApiError,
};

/// `GET /clients/{id}/visits[?page=&limit=]`
pub async fn list<S>(
  caller: Caller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<Visit>>, ApiError>
where
  S: ClientRepository,
{
  let client = resolve_client(state.store.as_ref(), &id).await?;
  caller.ensure_may_view(&client.id)?;

  let visits = state
    .store
    .list_visits(&client.id, params.request())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(visits))
}

#[derive(Debug, Serialize)]
pub struct VisitRecorded {
  pub visit:   Visit,
  pub client:  ClientRecord,
  pub loyalty: LoyaltyStatus,
}

/// `POST /clients/{id}/visits`
pub async fn record<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(mut body): Json<NewVisit>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClientRepository,
{
  let client = resolve_client(state.store.as_ref(), &id).await?;
  body.client_id = client.id;

  let policy = LoyaltyPolicy::new(state.config.visits_per_reward);
  let (visit, client) = state
    .store
    .record_visit(body, policy.visits_per_reward)
    .await
    .map_err(ApiError::store)?;

  let loyalty = policy.status(&client);
  tracing::info!(
    client_id = %client.id,
    visit_number = visit.visit_number,
    rewards_available = loyalty.rewards_available,
    by = %admin.user_id,
    "visit recorded"
  );
  Ok((StatusCode::CREATED, Json(VisitRecorded { visit, client, loyalty })))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub from:  DateTime<Utc>,
  pub to:    DateTime<Utc>,
  pub page:  Option<u32>,
  pub limit: Option<u32>,
}

/// `GET /visits?from=...&to=...`
pub async fn between<S>(
  _: AdminCaller,
  State(state): State<AppState<S>>,
  Query(params): Query<RangeParams>,
) -> Result<Json<Page<Visit>>, ApiError>
where
  S: ClientRepository,
{
  let visits = state
    .store
    .list_visits_between(params.from, params.to, PageRequest::new(params.page, params.limit))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(visits))
}

/// `PUT /visits/{id}`
pub async fn update<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(patch): Json<VisitPatch>,
) -> Result<Json<Visit>, ApiError>
where
  S: ClientRepository,
{
  let visit = state
    .store
    .update_visit(&id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("visit {id} not found")))?;
  tracing::info!(
    visit_id = %visit.id,
    total_price_cents = visit.total_price_cents,
    by = %admin.user_id,
    "visit updated"
  );
  Ok(Json(visit))
}

/// `DELETE /visits/{id}`
pub async fn delete_one<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: ClientRepository,
{
  if !state.store.delete_visit(&id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("visit {id} not found")));
  }
  tracing::info!(visit_id = %id, by = %admin.user_id, "visit deleted");
  Ok(StatusCode::NO_CONTENT)
}
