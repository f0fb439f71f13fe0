//! The `ClientRepository` trait.
//!
//! Implemented by storage backends (e.g. `barbaros-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend. The scan
//! pipeline never calls it: it hands back an identifier, and the caller looks
//! that identifier up here.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  account::{Account, Admin, NewAdmin, Role},
  client::{ClientPatch, ClientRecord, NewClient},
  page::{Page, PageRequest},
  service::{NewService, NewServiceCategory, Service, ServiceCategory, ServicePatch},
  visit::{NewVisit, Visit, VisitPatch},
};

/// Abstraction over a client store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ClientRepository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Clients ───────────────────────────────────────────────────────────

  /// Persist a new client. The store assigns `id`, `date_created`, and a
  /// client code when none is supplied.
  fn create_client(
    &self,
    input: NewClient,
  ) -> impl Future<Output = Result<ClientRecord, Self::Error>> + Send + '_;

  /// Look up by primary key. Returns `None` for unknown or malformed ids.
  fn find_by_id<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<ClientRecord>, Self::Error>> + Send + 'a;

  /// Look up by client code or by cached badge id.
  fn find_by_alternate_id<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<ClientRecord>, Self::Error>> + Send + 'a;

  fn find_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<ClientRecord>, Self::Error>> + Send + 'a;

  /// Apply `patch`; `None` if the client does not exist.
  fn update_client<'a>(
    &'a self,
    id: &'a str,
    patch: ClientPatch,
  ) -> impl Future<Output = Result<Option<ClientRecord>, Self::Error>> + Send + 'a;

  /// Cache the identifier embedded in the client's badge.
  fn set_badge_id<'a>(
    &'a self,
    id: &'a str,
    badge_id: &'a str,
  ) -> impl Future<Output = Result<Option<ClientRecord>, Self::Error>> + Send + 'a;

  /// Remove a client and their visit history. `false` if nothing was deleted.
  fn delete_client<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// All clients ordered by last name, then first name.
  fn list_clients(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<ClientRecord>, Self::Error>> + Send + '_;

  /// Case-insensitive substring match over names, email, phone number and
  /// client code.
  fn search_clients<'a>(
    &'a self,
    query: &'a str,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<ClientRecord>, Self::Error>> + Send + 'a;

  // ── Visits and loyalty ────────────────────────────────────────────────

  /// Record a visit and credit it to the client's loyalty counters.
  /// `visits_per_reward` comes from the caller's [`crate::loyalty::LoyaltyPolicy`].
  ///
  /// Each service received that names a catalog entry adds one to that
  /// entry's popularity in the same transaction; an unknown entry fails the
  /// whole visit.
  fn record_visit(
    &self,
    input: NewVisit,
    visits_per_reward: u32,
  ) -> impl Future<Output = Result<(Visit, ClientRecord), Self::Error>> + Send + '_;

  /// A client's visits, newest first.
  fn list_visits<'a>(
    &'a self,
    client_id: &'a str,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Visit>, Self::Error>> + Send + 'a;

  /// Every client's visits dated within `from..=to`, newest first.
  fn list_visits_between(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Visit>, Self::Error>> + Send + '_;

  /// Correct a recorded visit; `None` if it does not exist. Loyalty counters
  /// are left alone.
  fn update_visit<'a>(
    &'a self,
    visit_id: &'a str,
    patch: VisitPatch,
  ) -> impl Future<Output = Result<Option<Visit>, Self::Error>> + Send + 'a;

  /// Delete a visit and debit the client's visit count.
  fn delete_visit<'a>(
    &'a self,
    visit_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Mark one earned reward as redeemed.
  fn redeem_reward<'a>(
    &'a self,
    client_id: &'a str,
  ) -> impl Future<Output = Result<ClientRecord, Self::Error>> + Send + 'a;

  // ── Service catalog ───────────────────────────────────────────────────

  fn create_category(
    &self,
    input: NewServiceCategory,
  ) -> impl Future<Output = Result<ServiceCategory, Self::Error>> + Send + '_;

  /// Categories by display order, then name.
  fn list_categories(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<ServiceCategory>, Self::Error>> + Send + '_;

  /// Add a service to an existing category.
  fn create_service(
    &self,
    input: NewService,
  ) -> impl Future<Output = Result<Service, Self::Error>> + Send + '_;

  fn find_service<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Service>, Self::Error>> + Send + 'a;

  /// Apply `patch`; `None` if the service does not exist.
  fn update_service<'a>(
    &'a self,
    id: &'a str,
    patch: ServicePatch,
  ) -> impl Future<Output = Result<Option<Service>, Self::Error>> + Send + 'a;

  /// `false` if nothing was deleted. Past visits keep their copy.
  fn delete_service<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// The whole catalog, most popular first, then by name.
  fn list_services(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Service>, Self::Error>> + Send + '_;

  /// One category's services, most popular first. Unknown categories are
  /// simply empty.
  fn services_by_category<'a>(
    &'a self,
    category_id: &'a str,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Service>, Self::Error>> + Send + 'a;

  // ── Accounts ──────────────────────────────────────────────────────────

  fn create_admin(
    &self,
    input: NewAdmin,
  ) -> impl Future<Output = Result<Admin, Self::Error>> + Send + '_;

  fn find_admin_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Admin>, Self::Error>> + Send + 'a;

  /// Credentials for `email`. Staff accounts take precedence over clients.
  fn find_account<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Stamp the last-login time on an account.
  fn touch_login<'a>(
    &'a self,
    user_id: &'a str,
    role: Role,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
