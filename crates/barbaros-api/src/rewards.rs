//! Handlers for loyalty rewards.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/clients/{id}/rewards` | Staff or the client |
//! | `POST` | `/clients/{id}/rewards/redeem` | Staff only; 409 if nothing to redeem |

use axum::{
  Json,
  extract::{Path, State},
};
use barbaros_core::{
  loyalty::{LoyaltyPolicy, LoyaltyStatus},
  store::ClientRepository,
};

use crate::{
  AppState,
  auth::{AdminCaller, Caller},
  clients::resolve_client,
  error::ApiError,
};

/// `GET /clients/{id}/rewards`
pub async fn status<S>(
  caller: Caller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<LoyaltyStatus>, ApiError>
where
  S: ClientRepository,
{
  let client = resolve_client(state.store.as_ref(), &id).await?;
  caller.ensure_may_view(&client.id)?;
  Ok(Json(LoyaltyPolicy::new(state.config.visits_per_reward).status(&client)))
}

/// `POST /clients/{id}/rewards/redeem`
pub async fn redeem<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<LoyaltyStatus>, ApiError>
where
  S: ClientRepository,
{
  let client = resolve_client(state.store.as_ref(), &id).await?;
  let client = state.store.redeem_reward(&client.id).await.map_err(ApiError::store)?;

  let status = LoyaltyPolicy::new(state.config.visits_per_reward).status(&client);
  tracing::info!(
    client_id = %client.id,
    rewards_available = status.rewards_available,
    by = %admin.user_id,
    "reward redeemed"
  );
  Ok(Json(status))
}
