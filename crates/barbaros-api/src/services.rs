//! Handlers for the service catalog.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/services` | Signed in; most popular first, `?page=&limit=` |
//! | `POST`   | `/services` | Staff only; body: [`NewService`] |
//! | `GET`    | `/services/{id}` | Signed in |
//! | `PUT`    | `/services/{id}` | Staff only; body: [`ServicePatch`] |
//! | `DELETE` | `/services/{id}` | Staff only; 204 |
//! | `GET`    | `/service-categories` | Signed in; `?all=true` adds inactive ones for staff |
//! | `POST`   | `/service-categories` | Staff only; body: [`NewServiceCategory`] |
//! | `GET`    | `/service-categories/{id}/services` | Signed in; `?all=true` as above |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use barbaros_core::{
  page::Page,
  service::{NewService, NewServiceCategory, Service, ServiceCategory, ServicePatch},
  store::ClientRepository,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{AdminCaller, Caller},
  clients::PageParams,
  error::ApiError,
};

#[derive(Debug, Default, Deserialize)]
pub struct MenuParams {
  /// Include inactive entries. Ignored for clients.
  #[serde(default)]
  pub all: bool,
}

impl MenuParams {
  fn active_only(&self, caller: &Caller) -> bool { !(self.all && caller.identity.is_admin()) }
}

fn not_found(id: &str) -> ApiError { ApiError::NotFound(format!("service {id} not found")) }

// ─── Services ─────────────────────────────────────────────────────────────────

/// `GET /services[?page=&limit=]`
pub async fn list<S>(
  _: Caller,
  State(state): State<AppState<S>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<Service>>, ApiError>
where
  S: ClientRepository,
{
  let page = state.store.list_services(params.request()).await.map_err(ApiError::store)?;
  Ok(Json(page))
}

/// `POST /services`
pub async fn create<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Json(body): Json<NewService>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClientRepository,
{
  let service = state.store.create_service(body).await.map_err(ApiError::store)?;
  tracing::info!(
    service_id = %service.id,
    name = %service.name,
    by = %admin.user_id,
    "service created"
  );
  Ok((StatusCode::CREATED, Json(service)))
}

/// `GET /services/{id}`
pub async fn get_one<S>(
  _: Caller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Service>, ApiError>
where
  S: ClientRepository,
{
  state
    .store
    .find_service(&id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| not_found(&id))
}

/// `PUT /services/{id}`
pub async fn update<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(patch): Json<ServicePatch>,
) -> Result<Json<Service>, ApiError>
where
  S: ClientRepository,
{
  let service = state
    .store
    .update_service(&id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(&id))?;
  tracing::info!(service_id = %service.id, by = %admin.user_id, "service updated");
  Ok(Json(service))
}

/// `DELETE /services/{id}`
pub async fn delete_one<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: ClientRepository,
{
  if !state.store.delete_service(&id).await.map_err(ApiError::store)? {
    return Err(not_found(&id));
  }
  tracing::info!(service_id = %id, by = %admin.user_id, "service deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Categories ───────────────────────────────────────────────────────────────

/// `GET /service-categories[?all=true]`
pub async fn categories<S>(
  caller: Caller,
  State(state): State<AppState<S>>,
  Query(params): Query<MenuParams>,
) -> Result<Json<Vec<ServiceCategory>>, ApiError>
where
  S: ClientRepository,
{
  let list = state
    .store
    .list_categories(params.active_only(&caller))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(list))
}

/// `POST /service-categories`
pub async fn create_category<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Json(body): Json<NewServiceCategory>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClientRepository,
{
  let category = state.store.create_category(body).await.map_err(ApiError::store)?;
  tracing::info!(
    category_id = %category.id,
    name = %category.name,
    by = %admin.user_id,
    "category created"
  );
  Ok((StatusCode::CREATED, Json(category)))
}

/// `GET /service-categories/{id}/services[?all=true]`
pub async fn by_category<S>(
  caller: Caller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Query(params): Query<MenuParams>,
) -> Result<Json<Vec<Service>>, ApiError>
where
  S: ClientRepository,
{
  let list = state
    .store
    .services_by_category(&id, params.active_only(&caller))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(list))
}
