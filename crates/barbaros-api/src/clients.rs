//! Handlers for `/clients` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/clients` | Staff only; `?page=&limit=` |
//! | `POST`   | `/clients` | Staff only; body: [`NewClient`] |
//! | `GET`    | `/clients/search` | Staff only; `?q=` |
//! | `GET`    | `/clients/lookup` | Staff only; `?email=` or `?phone=` |
//! | `GET`    | `/clients/{id}` | Staff or the client themselves |
//! | `PUT`    | `/clients/{id}` | Staff only; body: [`ClientPatch`] |
//! | `DELETE` | `/clients/{id}` | Staff only; 204 |
//!
//! `{id}` is the record id, the client code, or an issued badge id.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use barbaros_core::{
  client::{ClientPatch, ClientRecord, ClientSummary, NewClient},
  page::{MAX_PAGE_SIZE, Page, PageRequest},
  store::ClientRepository,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{AdminCaller, Caller},
  error::ApiError,
};

// ─── Shared ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub page:  Option<u32>,
  pub limit: Option<u32>,
}

impl PageParams {
  pub fn request(&self) -> PageRequest { PageRequest::new(self.page, self.limit) }
}

/// Look `id` up as a primary key first, then as a client code or badge id.
pub(crate) async fn find_client<S>(store: &S, id: &str) -> Result<Option<ClientRecord>, ApiError>
where
  S: ClientRepository,
{
  if let Some(client) = store.find_by_id(id).await.map_err(ApiError::store)? {
    return Ok(Some(client));
  }
  store.find_by_alternate_id(id).await.map_err(ApiError::store)
}

/// [`find_client`], with a 404 for unknown ids.
pub(crate) async fn resolve_client<S>(store: &S, id: &str) -> Result<ClientRecord, ApiError>
where
  S: ClientRepository,
{
  find_client(store, id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))
}

fn digits(s: &str) -> String { s.chars().filter(char::is_ascii_digit).collect() }

/// Walk the client list comparing digits only; stored numbers keep whatever
/// punctuation they were entered with.
async fn find_by_phone_digits<S>(store: &S, wanted: &str) -> Result<Option<ClientRecord>, ApiError>
where
  S: ClientRepository,
{
  let mut page = 1;
  loop {
    let batch = store
      .list_clients(PageRequest::new(Some(page), Some(MAX_PAGE_SIZE)))
      .await
      .map_err(ApiError::store)?;
    if let Some(found) = batch.items.iter().find(|c| digits(&c.phone_number) == wanted) {
      return Ok(Some(found.clone()));
    }
    if u64::from(page) >= batch.pages {
      return Ok(None);
    }
    page += 1;
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /clients[?page=&limit=]`
pub async fn list<S>(
  _: AdminCaller,
  State(state): State<AppState<S>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<ClientRecord>>, ApiError>
where
  S: ClientRepository,
{
  let page = state.store.list_clients(params.request()).await.map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /clients`
pub async fn create<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Json(body): Json<NewClient>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClientRepository,
{
  let client = state.store.create_client(body).await.map_err(ApiError::store)?;
  tracing::info!(client_id = %client.id, by = %admin.user_id, "client created");
  Ok((StatusCode::CREATED, Json(client)))
}

// ─── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
  /// Matched against names, email, phone number and client code.
  pub q:     Option<String>,
  pub page:  Option<u32>,
  pub limit: Option<u32>,
}

/// `GET /clients/search?q=...`
pub async fn search<S>(
  _: AdminCaller,
  State(state): State<AppState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Page<ClientRecord>>, ApiError>
where
  S: ClientRepository,
{
  let query = params.q.as_deref().unwrap_or("").trim();
  let page = state
    .store
    .search_clients(query, PageRequest::new(params.page, params.limit))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Lookup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct LookupParams {
  pub email: Option<String>,
  pub phone: Option<String>,
}

/// `GET /clients/lookup?email=...` or `?phone=...`
///
/// Phone numbers match on their digits only, so `(555) 010-2000` finds
/// `555-010-2000`.
pub async fn lookup<S>(
  _: AdminCaller,
  State(state): State<AppState<S>>,
  Query(params): Query<LookupParams>,
) -> Result<Json<ClientSummary>, ApiError>
where
  S: ClientRepository,
{
  let email = params.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
  let phone = params.phone.as_deref().map(digits).filter(|s| !s.is_empty());

  let found = match (email, phone) {
    (Some(email), _) => state.store.find_by_email(email).await.map_err(ApiError::store)?,
    (None, Some(phone)) => find_by_phone_digits(state.store.as_ref(), &phone).await?,
    (None, None) => {
      return Err(ApiError::BadRequest("provide an email or phone number".into()));
    }
  };

  let client = found.ok_or_else(|| ApiError::NotFound("no client matches".into()))?;
  Ok(Json(ClientSummary::from(&client)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /clients/{id}`
pub async fn get_one<S>(
  caller: Caller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<ClientRecord>, ApiError>
where
  S: ClientRepository,
{
  let client = resolve_client(state.store.as_ref(), &id).await?;
  caller.ensure_may_view(&client.id)?;
  Ok(Json(client))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /clients/{id}`
pub async fn update<S>(
  _: AdminCaller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(patch): Json<ClientPatch>,
) -> Result<Json<ClientRecord>, ApiError>
where
  S: ClientRepository,
{
  let client = resolve_client(state.store.as_ref(), &id).await?;
  let updated = state
    .store
    .update_client(&client.id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;
  Ok(Json(updated))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /clients/{id}`
pub async fn delete_one<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: ClientRepository,
{
  let client = resolve_client(state.store.as_ref(), &id).await?;
  if !state.store.delete_client(&client.id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("client {id} not found")));
  }
  tracing::info!(client_id = %client.id, by = %admin.user_id, "client deleted");
  Ok(StatusCode::NO_CONTENT)
}
