//! [`SqliteStore`], the SQLite implementation of [`ClientRepository`].

use std::path::Path;

use barbaros_core::{
  Error as CoreError,
  account::{Account, Admin, NewAdmin, Role},
  client::{ClientPatch, ClientRecord, NewClient},
  id::{is_record_id, new_client_code, new_record_id},
  loyalty::LoyaltyPolicy,
  page::{Page, PageRequest},
  service::{NewService, NewServiceCategory, Service, ServiceCategory, ServicePatch},
  store::ClientRepository,
  visit::{NewVisit, Visit, VisitPatch},
};
use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{
    ADMIN_COLUMNS, CATEGORY_COLUMNS, CLIENT_COLUMNS, RawAdmin, RawCategory, RawClient, RawService,
    RawVisit, SERVICE_COLUMNS, VISIT_COLUMNS, encode_dt, encode_names, encode_services,
  },
  schema::SCHEMA,
};

/// Matches every client when `?1` is NULL, otherwise a case-insensitive
/// substring match on names, email, phone number and client code.
const CLIENT_FILTER: &str = "WHERE ?1 IS NULL
  OR first_name LIKE ?1 ESCAPE '\\'
  OR last_name LIKE ?1 ESCAPE '\\'
  OR (first_name || ' ' || last_name) LIKE ?1 ESCAPE '\\'
  OR email LIKE ?1 ESCAPE '\\'
  OR phone_number LIKE ?1 ESCAPE '\\'
  OR client_code LIKE ?1 ESCAPE '\\'";

/// Current time at the precision the store keeps.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// Record ids are stored lowercase; anything not shaped like one cannot match.
fn normalize_id(id: &str) -> Option<String> {
  is_record_id(id).then(|| id.to_ascii_lowercase())
}

/// `%query%` with LIKE wildcards in `query` escaped.
fn like_pattern(query: &str) -> String {
  let mut pattern = String::with_capacity(query.len() + 2);
  pattern.push('%');
  for c in query.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

fn exists(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, params, |_| Ok(())).optional()?.is_some())
}

fn sql_limit(page: PageRequest) -> (i64, i64) {
  (i64::from(page.limit), i64::try_from(page.offset()).unwrap_or(i64::MAX))
}

fn unknown_category(id: &str) -> CoreError {
  CoreError::Validation { field: "category_id", reason: format!("no service category {id}") }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Barbaros client store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Close the connection. Clones still held elsewhere fail from then on.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_client(
    &self,
    condition: &'static str,
    key: String,
  ) -> Result<Option<ClientRecord>> {
    let raw: Option<RawClient> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE {condition}"),
            [key],
            RawClient::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawClient::into_client).transpose()
  }

  async fn page_clients(
    &self,
    pattern: Option<String>,
    page: PageRequest,
  ) -> Result<Page<ClientRecord>> {
    let (limit, offset) = sql_limit(page);

    let (total, raws): (u64, Vec<RawClient>) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM clients {CLIENT_FILTER}"),
          rusqlite::params![pattern.as_deref()],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {CLIENT_COLUMNS} FROM clients {CLIENT_FILTER}
           ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE, client_id
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![pattern.as_deref(), limit, offset],
            RawClient::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total.max(0) as u64, rows))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawClient::into_client)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, total, page))
  }

  /// Visits matching `filter`, whose placeholders are bound to `keys`.
  async fn page_visits(
    &self,
    filter: &'static str,
    keys: Vec<String>,
    page: PageRequest,
  ) -> Result<Page<Visit>> {
    let (limit, offset) = sql_limit(page);

    let (total, raws): (u64, Vec<RawVisit>) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM visits WHERE {filter}"),
          rusqlite::params_from_iter(&keys),
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {VISIT_COLUMNS} FROM visits WHERE {filter}
           ORDER BY visit_date DESC, visit_number DESC, visit_id
           LIMIT {limit} OFFSET {offset}"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(&keys), RawVisit::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total.max(0) as u64, rows))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawVisit::into_visit)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, total, page))
  }

  async fn query_services(
    &self,
    condition: &'static str,
    params: Vec<String>,
  ) -> Result<Vec<Service>> {
    let raws: Vec<RawService> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SERVICE_COLUMNS} FROM services WHERE {condition}
           ORDER BY popularity_score DESC, name COLLATE NOCASE, service_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(&params), RawService::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawService::into_service).collect()
  }
}

// ─── ClientRepository impl ───────────────────────────────────────────────────

impl ClientRepository for SqliteStore {
  type Error = Error;

  // ── Clients ───────────────────────────────────────────────────────────────

  async fn create_client(&self, input: NewClient) -> Result<ClientRecord> {
    input.validate()?;

    let mut client = ClientRecord {
      id:                 new_record_id(),
      client_code:        String::new(),
      first_name:         input.first_name.trim().to_owned(),
      last_name:          input.last_name.trim().to_owned(),
      email:              input.email.trim().to_owned(),
      phone_number:       input.phone_number.trim().to_owned(),
      date_created:       now(),
      last_login:         None,
      visit_count:        0,
      rewards_earned:     0,
      rewards_redeemed:   0,
      account_active:     true,
      preferred_services: input.preferred_services,
      badge_id:           None,
      last_visit:         None,
    };

    let requested_code = input.client_code;
    let password_hash  = input.password_hash;
    let preferred_str  = encode_names(&client.preferred_services)?;
    let created_str    = encode_dt(client.date_created);
    let row            = client.clone();

    client.client_code = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if exists(&tx, "SELECT 1 FROM clients WHERE email = ?1", [&row.email])? {
          return Ok(Err(CoreError::EmailInUse(row.email)));
        }

        let taken = "SELECT 1 FROM clients WHERE client_code = ?1 OR badge_id = ?1";
        let code = match requested_code {
          Some(code) => {
            if exists(&tx, taken, [&code])? {
              return Ok(Err(CoreError::Validation {
                field:  "client_code",
                reason: format!("{code} is already assigned"),
              }));
            }
            code
          }
          None => loop {
            let code = new_client_code();
            if !exists(&tx, taken, [&code])? {
              break code;
            }
          },
        };

        tx.execute(
          "INSERT INTO clients (
             client_id, client_code, first_name, last_name, email,
             phone_number, password_hash, date_created, preferred_services
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            row.id,
            code,
            row.first_name,
            row.last_name,
            row.email,
            row.phone_number,
            password_hash,
            created_str,
            preferred_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(code))
      })
      .await??;

    Ok(client)
  }

  async fn find_by_id(&self, id: &str) -> Result<Option<ClientRecord>> {
    let Some(id) = normalize_id(id) else { return Ok(None) };
    self.query_client("client_id = ?1", id).await
  }

  async fn find_by_alternate_id(&self, id: &str) -> Result<Option<ClientRecord>> {
    self
      .query_client("client_code = ?1 OR badge_id = ?1", id.to_owned())
      .await
  }

  async fn find_by_email(&self, email: &str) -> Result<Option<ClientRecord>> {
    self.query_client("email = ?1", email.trim().to_owned()).await
  }

  async fn update_client(
    &self,
    id: &str,
    patch: ClientPatch,
  ) -> Result<Option<ClientRecord>> {
    patch.validate()?;
    let Some(mut client) = self.find_by_id(id).await? else {
      return Ok(None);
    };
    patch.apply(&mut client);

    let preferred_str = encode_names(&client.preferred_services)?;
    let row           = client.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if exists(
          &tx,
          "SELECT 1 FROM clients WHERE email = ?1 AND client_id != ?2",
          [&row.email, &row.id],
        )? {
          return Ok(Err(CoreError::EmailInUse(row.email)));
        }

        tx.execute(
          "UPDATE clients SET
             first_name = ?2, last_name = ?3, email = ?4, phone_number = ?5,
             account_active = ?6, preferred_services = ?7
           WHERE client_id = ?1",
          rusqlite::params![
            row.id,
            row.first_name,
            row.last_name,
            row.email,
            row.phone_number,
            row.account_active,
            preferred_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(Some(client))
  }

  async fn set_badge_id(&self, id: &str, badge_id: &str) -> Result<Option<ClientRecord>> {
    let Some(id) = normalize_id(id) else { return Ok(None) };
    let key   = id.clone();
    let badge = badge_id.to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if exists(
          &tx,
          "SELECT 1 FROM clients WHERE (client_code = ?1 OR badge_id = ?1) AND client_id != ?2",
          [&badge, &key],
        )? {
          return Ok(Err(CoreError::Validation {
            field:  "badge_id",
            reason: format!("{badge} already identifies another client"),
          }));
        }

        let changed = tx.execute(
          "UPDATE clients SET badge_id = ?2 WHERE client_id = ?1",
          [&key, &badge],
        )?;
        tx.commit()?;
        Ok(Ok(changed > 0))
      })
      .await??;

    if !updated {
      return Ok(None);
    }
    self.find_by_id(&id).await
  }

  async fn delete_client(&self, id: &str) -> Result<bool> {
    let Some(id) = normalize_id(id) else { return Ok(false) };

    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM clients WHERE client_id = ?1", [id])?))
      .await?;

    Ok(changed > 0)
  }

  async fn list_clients(&self, page: PageRequest) -> Result<Page<ClientRecord>> {
    self.page_clients(None, page).await
  }

  async fn search_clients(&self, query: &str, page: PageRequest) -> Result<Page<ClientRecord>> {
    let query = query.trim();
    let pattern = (!query.is_empty()).then(|| like_pattern(query));
    self.page_clients(pattern, page).await
  }

  // ── Visits and loyalty ────────────────────────────────────────────────────

  async fn record_visit(
    &self,
    mut input: NewVisit,
    visits_per_reward: u32,
  ) -> Result<(Visit, ClientRecord)> {
    input.validate()?;
    let policy = LoyaltyPolicy::new(visits_per_reward);
    let Some(client_id) = normalize_id(&input.client_id) else {
      return Err(CoreError::ClientNotFound(input.client_id).into());
    };

    for service in &mut input.services {
      if let Some(id) = service.service_id.as_mut()
        && let Some(normal) = normalize_id(id)
      {
        *id = normal;
      }
    }
    let service_ids: Vec<String> = input.service_ids().map(str::to_owned).collect();

    let mut visit = Visit {
      id:                new_record_id(),
      client_id:         client_id.clone(),
      visit_date:        input.visit_date.map_or_else(now, |d| d.trunc_subsecs(6)),
      total_price_cents: input.total_price_cents(),
      services:          input.services,
      barber:            input.barber.trim().to_owned(),
      notes:             input.notes,
      reward_redeemed:   input.reward_redeemed,
      visit_number:      0,
    };

    let services_str = encode_services(&visit.services)?;
    let date_str     = encode_dt(visit.visit_date);
    let row          = visit.clone();

    visit.visit_number = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let counters: Option<(u32, u32, u32)> = tx
          .query_row(
            "SELECT visit_count, rewards_earned, rewards_redeemed
             FROM clients WHERE client_id = ?1",
            [&row.client_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;
        let Some((visit_count, rewards_earned, mut rewards_redeemed)) = counters else {
          return Ok(Err(CoreError::ClientNotFound(row.client_id)));
        };

        let credit = policy.credit_visit(visit_count, rewards_earned);
        if row.reward_redeemed {
          if rewards_redeemed >= credit.rewards_earned {
            return Ok(Err(CoreError::NoRewardAvailable(row.client_id)));
          }
          rewards_redeemed += 1;
        }

        for service_id in &service_ids {
          let bumped = tx.execute(
            "UPDATE services SET popularity_score = popularity_score + 1 WHERE service_id = ?1",
            [service_id],
          )?;
          if bumped == 0 {
            return Ok(Err(CoreError::Validation {
              field:  "services",
              reason: format!("no catalog service {service_id}"),
            }));
          }
        }

        tx.execute(
          "INSERT INTO visits (
             visit_id, client_id, visit_date, services, total_price_cents,
             barber, notes, reward_redeemed, visit_number
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            row.id,
            row.client_id,
            date_str,
            services_str,
            row.total_price_cents,
            row.barber,
            row.notes,
            row.reward_redeemed,
            credit.visit_count,
          ],
        )?;
        tx.execute(
          "UPDATE clients SET
             visit_count = ?2, rewards_earned = ?3, rewards_redeemed = ?4,
             last_visit = CASE WHEN last_visit IS NULL OR last_visit < ?5
                               THEN ?5 ELSE last_visit END
           WHERE client_id = ?1",
          rusqlite::params![
            row.client_id,
            credit.visit_count,
            credit.rewards_earned,
            rewards_redeemed,
            date_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(credit.visit_count))
      })
      .await??;

    let client = self
      .find_by_id(&client_id)
      .await?
      .ok_or(CoreError::ClientNotFound(client_id))?;
    Ok((visit, client))
  }

  async fn list_visits(&self, client_id: &str, page: PageRequest) -> Result<Page<Visit>> {
    let Some(client_id) = normalize_id(client_id) else {
      return Ok(Page::new(Vec::new(), 0, page));
    };
    self.page_visits("client_id = ?1", vec![client_id], page).await
  }

  async fn list_visits_between(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    page: PageRequest,
  ) -> Result<Page<Visit>> {
    if from > to {
      return Err(
        CoreError::Validation { field: "from", reason: "must not be after `to`".into() }.into(),
      );
    }
    self
      .page_visits(
        "visit_date >= ?1 AND visit_date <= ?2",
        vec![encode_dt(from), encode_dt(to)],
        page,
      )
      .await
  }

  async fn update_visit(&self, visit_id: &str, patch: VisitPatch) -> Result<Option<Visit>> {
    patch.validate()?;
    let key = visit_id.to_owned();

    let raw: Option<RawVisit> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {VISIT_COLUMNS} FROM visits WHERE visit_id = ?1"),
            [key],
            RawVisit::from_row,
          )
          .optional()?)
      })
      .await?;
    let Some(mut visit) = raw.map(RawVisit::into_visit).transpose()? else {
      return Ok(None);
    };

    patch.apply(&mut visit)?;
    visit.visit_date = visit.visit_date.trunc_subsecs(6);

    let services_str = encode_services(&visit.services)?;
    let date_str     = encode_dt(visit.visit_date);
    let row          = visit.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE visits SET
             visit_date = ?2, services = ?3, total_price_cents = ?4, barber = ?5, notes = ?6
           WHERE visit_id = ?1",
          rusqlite::params![
            row.id,
            date_str,
            services_str,
            row.total_price_cents,
            row.barber,
            row.notes,
          ],
        )?;
        tx.execute(
          "UPDATE clients SET
             last_visit = (SELECT MAX(visit_date) FROM visits WHERE client_id = ?1)
           WHERE client_id = ?1",
          [&row.client_id],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(Some(visit))
  }

  async fn delete_visit(&self, visit_id: &str) -> Result<bool> {
    let visit_id = visit_id.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let client_id: Option<String> = tx
          .query_row(
            "SELECT client_id FROM visits WHERE visit_id = ?1",
            [&visit_id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(client_id) = client_id else { return Ok(false) };

        tx.execute("DELETE FROM visits WHERE visit_id = ?1", [&visit_id])?;
        let visit_count: u32 = tx.query_row(
          "SELECT visit_count FROM clients WHERE client_id = ?1",
          [&client_id],
          |r| r.get(0),
        )?;
        tx.execute(
          "UPDATE clients SET
             visit_count = ?2,
             last_visit  = (SELECT MAX(visit_date) FROM visits WHERE client_id = ?1)
           WHERE client_id = ?1",
          rusqlite::params![client_id, LoyaltyPolicy::debit_visit(visit_count)],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(deleted)
  }

  async fn redeem_reward(&self, client_id: &str) -> Result<ClientRecord> {
    let Some(client_id) = normalize_id(client_id) else {
      return Err(CoreError::ClientNotFound(client_id.to_owned()).into());
    };
    let key = client_id.clone();

    self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE clients SET rewards_redeemed = rewards_redeemed + 1
           WHERE client_id = ?1 AND rewards_redeemed < rewards_earned",
          [&key],
        )?;
        if changed > 0 {
          Ok(Ok(()))
        } else if exists(conn, "SELECT 1 FROM clients WHERE client_id = ?1", [&key])? {
          Ok(Err(CoreError::NoRewardAvailable(key)))
        } else {
          Ok(Err(CoreError::ClientNotFound(key)))
        }
      })
      .await??;

    self
      .find_by_id(&client_id)
      .await?
      .ok_or(Error::Core(CoreError::ClientNotFound(client_id)))
  }

  // ── Service catalog ───────────────────────────────────────────────────────

  async fn create_category(&self, input: NewServiceCategory) -> Result<ServiceCategory> {
    input.validate()?;

    let category = ServiceCategory {
      id:            new_record_id(),
      name:          input.name.trim().to_owned(),
      description:   input.description,
      display_order: input.display_order,
      active:        input.active,
      created_at:    now(),
    };

    let created_str = encode_dt(category.created_at);
    let row         = category.clone();

    self
      .conn
      .call(move |conn| {
        if exists(conn, "SELECT 1 FROM service_categories WHERE name = ?1", [&row.name])? {
          return Ok(Err(CoreError::CategoryNameInUse(row.name)));
        }
        conn.execute(
          "INSERT INTO service_categories (
             category_id, name, description, display_order, active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            row.id,
            row.name,
            row.description,
            row.display_order,
            row.active,
            created_str,
          ],
        )?;
        Ok(Ok(()))
      })
      .await??;

    Ok(category)
  }

  async fn list_categories(&self, active_only: bool) -> Result<Vec<ServiceCategory>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CATEGORY_COLUMNS} FROM service_categories
           WHERE ?1 = 0 OR active = 1
           ORDER BY display_order, name COLLATE NOCASE"
        ))?;
        let rows = stmt
          .query_map([active_only], RawCategory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCategory::into_category).collect()
  }

  async fn create_service(&self, input: NewService) -> Result<Service> {
    input.validate()?;
    let Some(category_id) = normalize_id(&input.category_id) else {
      return Err(unknown_category(&input.category_id).into());
    };

    let created = now();
    let service = Service {
      id: new_record_id(),
      category_id,
      name: input.name.trim().to_owned(),
      description: input.description,
      price_cents: input.price_cents,
      duration_minutes: input.duration_minutes,
      image_url: input.image_url,
      active: input.active,
      popularity_score: 0,
      created_at: created,
      updated_at: created,
    };

    let created_str = encode_dt(created);
    let row         = service.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(
          &tx,
          "SELECT 1 FROM service_categories WHERE category_id = ?1",
          [&row.category_id],
        )? {
          return Ok(Err(unknown_category(&row.category_id)));
        }
        tx.execute(
          "INSERT INTO services (
             service_id, category_id, name, description, price_cents,
             duration_minutes, image_url, active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            row.id,
            row.category_id,
            row.name,
            row.description,
            row.price_cents,
            row.duration_minutes,
            row.image_url,
            row.active,
            created_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(service)
  }

  async fn find_service(&self, id: &str) -> Result<Option<Service>> {
    let Some(id) = normalize_id(id) else { return Ok(None) };
    Ok(self.query_services("service_id = ?1", vec![id]).await?.pop())
  }

  async fn update_service(&self, id: &str, patch: ServicePatch) -> Result<Option<Service>> {
    patch.validate()?;
    let Some(mut service) = self.find_service(id).await? else {
      return Ok(None);
    };
    patch.apply(&mut service);
    service.category_id = normalize_id(&service.category_id)
      .ok_or_else(|| unknown_category(&service.category_id))?;
    service.updated_at = now();

    let updated_str = encode_dt(service.updated_at);
    let row         = service.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(
          &tx,
          "SELECT 1 FROM service_categories WHERE category_id = ?1",
          [&row.category_id],
        )? {
          return Ok(Err(unknown_category(&row.category_id)));
        }
        tx.execute(
          "UPDATE services SET
             category_id = ?2, name = ?3, description = ?4, price_cents = ?5,
             duration_minutes = ?6, image_url = ?7, active = ?8, updated_at = ?9
           WHERE service_id = ?1",
          rusqlite::params![
            row.id,
            row.category_id,
            row.name,
            row.description,
            row.price_cents,
            row.duration_minutes,
            row.image_url,
            row.active,
            updated_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(Some(service))
  }

  async fn delete_service(&self, id: &str) -> Result<bool> {
    let Some(id) = normalize_id(id) else { return Ok(false) };

    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM services WHERE service_id = ?1", [id])?))
      .await?;

    Ok(changed > 0)
  }

  async fn list_services(&self, page: PageRequest) -> Result<Page<Service>> {
    let (limit, offset) = sql_limit(page);

    let (total, raws): (u64, Vec<RawService>) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM services", [], |r| r.get(0))?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {SERVICE_COLUMNS} FROM services
           ORDER BY popularity_score DESC, name COLLATE NOCASE, service_id
           LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawService::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total.max(0) as u64, rows))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawService::into_service)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, total, page))
  }

  async fn services_by_category(
    &self,
    category_id: &str,
    active_only: bool,
  ) -> Result<Vec<Service>> {
    let Some(category_id) = normalize_id(category_id) else {
      return Ok(Vec::new());
    };
    let condition = if active_only {
      "category_id = ?1 AND active = 1"
    } else {
      "category_id = ?1"
    };
    self.query_services(condition, vec![category_id]).await
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_admin(&self, input: NewAdmin) -> Result<Admin> {
    let email = input.email.trim().to_lowercase();
    if !email.contains('@') {
      return Err(
        CoreError::Validation {
          field:  "email",
          reason: format!("{email:?} is not an email address"),
        }
        .into(),
      );
    }

    let admin = Admin {
      id: new_record_id(),
      email,
      name: input.name.trim().to_owned(),
      staff_role: input.staff_role,
      active: true,
      last_login: None,
    };

    let row           = admin.clone();
    let password_hash = input.password_hash;
    let created_str   = encode_dt(now());

    self
      .conn
      .call(move |conn| {
        if exists(conn, "SELECT 1 FROM admins WHERE email = ?1", [&row.email])? {
          return Ok(Err(CoreError::EmailInUse(row.email)));
        }
        conn.execute(
          "INSERT INTO admins (admin_id, email, name, staff_role, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            row.id,
            row.email,
            row.name,
            row.staff_role.as_str(),
            password_hash,
            created_str,
          ],
        )?;
        Ok(Ok(()))
      })
      .await??;

    Ok(admin)
  }

  async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>> {
    let email = email.trim().to_owned();

    let raw: Option<RawAdmin> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE email = ?1"),
            [email],
            RawAdmin::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAdmin::into_admin).transpose()
  }

  async fn find_account(&self, email: &str) -> Result<Option<Account>> {
    let email = email.trim().to_owned();

    let account = self
      .conn
      .call(move |conn| {
        let admin: Option<(String, String, bool)> = conn
          .query_row(
            "SELECT admin_id, password_hash, active FROM admins WHERE email = ?1",
            [&email],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;
        if let Some((user_id, password_hash, active)) = admin {
          return Ok(Some(Account {
            user_id,
            role: Role::Admin,
            password_hash: Some(password_hash),
            active,
          }));
        }

        let client: Option<(String, Option<String>, bool)> = conn
          .query_row(
            "SELECT client_id, password_hash, account_active FROM clients WHERE email = ?1",
            [&email],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;
        Ok(client.map(|(user_id, password_hash, active)| Account {
          user_id,
          role: Role::Client,
          password_hash,
          active,
        }))
      })
      .await?;

    Ok(account)
  }

  async fn touch_login(&self, user_id: &str, role: Role) -> Result<()> {
    let sql = match role {
      Role::Admin => "UPDATE admins SET last_login = ?2 WHERE admin_id = ?1",
      Role::Client => "UPDATE clients SET last_login = ?2 WHERE client_id = ?1",
    };
    let user_id = user_id.to_owned();
    let at_str  = encode_dt(now());

    self
      .conn
      .call(move |conn| {
        conn.execute(sql, [user_id, at_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
