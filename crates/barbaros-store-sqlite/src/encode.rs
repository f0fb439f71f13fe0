//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with a fixed microsecond precision, so
//! they sort correctly as text. Lists are compact JSON.

use barbaros_core::{
  account::{Admin, StaffRole},
  client::ClientRecord,
  service::{Service, ServiceCategory},
  visit::{ServiceReceived, Visit},
};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Columns read by [`RawClient::from_row`], in order.
pub const CLIENT_COLUMNS: &str = "client_id, client_code, first_name, last_name, email, \
  phone_number, date_created, last_login, visit_count, rewards_earned, rewards_redeemed, \
  account_active, preferred_services, badge_id, last_visit";

/// Columns read by [`RawVisit::from_row`], in order.
pub const VISIT_COLUMNS: &str = "visit_id, client_id, visit_date, services, \
  total_price_cents, barber, notes, reward_redeemed, visit_number";

/// Columns read by [`RawAdmin::from_row`], in order.
pub const ADMIN_COLUMNS: &str = "admin_id, email, name, staff_role, active, last_login";

/// Columns read by [`RawCategory::from_row`], in order.
pub const CATEGORY_COLUMNS: &str =
  "category_id, name, description, display_order, active, created_at";

/// Columns read by [`RawService::from_row`], in order.
pub const SERVICE_COLUMNS: &str = "service_id, category_id, name, description, price_cents, \
  duration_minutes, image_url, active, popularity_score, created_at, updated_at";

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── StaffRole ───────────────────────────────────────────────────────────────

pub fn decode_staff_role(s: &str) -> Result<StaffRole> {
  StaffRole::parse(s).ok_or_else(|| Error::Corrupt { column: "staff_role", value: s.to_owned() })
}

// ─── JSON lists ──────────────────────────────────────────────────────────────

pub fn encode_names(names: &[String]) -> Result<String> { Ok(serde_json::to_string(names)?) }

pub fn encode_services(services: &[ServiceReceived]) -> Result<String> {
  Ok(serde_json::to_string(services)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `clients` row.
pub struct RawClient {
  pub client_id:          String,
  pub client_code:        String,
  pub first_name:         String,
  pub last_name:          String,
  pub email:              String,
  pub phone_number:       String,
  pub date_created:       String,
  pub last_login:         Option<String>,
  pub visit_count:        u32,
  pub rewards_earned:     u32,
  pub rewards_redeemed:   u32,
  pub account_active:     bool,
  pub preferred_services: String,
  pub badge_id:           Option<String>,
  pub last_visit:         Option<String>,
}

impl RawClient {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      client_id:          row.get(0)?,
      client_code:        row.get(1)?,
      first_name:         row.get(2)?,
      last_name:          row.get(3)?,
      email:              row.get(4)?,
      phone_number:       row.get(5)?,
      date_created:       row.get(6)?,
      last_login:         row.get(7)?,
      visit_count:        row.get(8)?,
      rewards_earned:     row.get(9)?,
      rewards_redeemed:   row.get(10)?,
      account_active:     row.get(11)?,
      preferred_services: row.get(12)?,
      badge_id:           row.get(13)?,
      last_visit:         row.get(14)?,
    })
  }

  pub fn into_client(self) -> Result<ClientRecord> {
    Ok(ClientRecord {
      id:                 self.client_id,
      client_code:        self.client_code,
      first_name:         self.first_name,
      last_name:          self.last_name,
      email:              self.email,
      phone_number:       self.phone_number,
      date_created:       decode_dt(&self.date_created)?,
      last_login:         decode_opt_dt(self.last_login)?,
      visit_count:        self.visit_count,
      rewards_earned:     self.rewards_earned,
      rewards_redeemed:   self.rewards_redeemed,
      account_active:     self.account_active,
      preferred_services: serde_json::from_str(&self.preferred_services)?,
      badge_id:           self.badge_id,
      last_visit:         decode_opt_dt(self.last_visit)?,
    })
  }
}

/// Raw values read directly from a `visits` row.
pub struct RawVisit {
  pub visit_id:          String,
  pub client_id:         String,
  pub visit_date:        String,
  pub services:          String,
  pub total_price_cents: i64,
  pub barber:            String,
  pub notes:             Option<String>,
  pub reward_redeemed:   bool,
  pub visit_number:      u32,
}

impl RawVisit {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      visit_id:          row.get(0)?,
      client_id:         row.get(1)?,
      visit_date:        row.get(2)?,
      services:          row.get(3)?,
      total_price_cents: row.get(4)?,
      barber:            row.get(5)?,
      notes:             row.get(6)?,
      reward_redeemed:   row.get(7)?,
      visit_number:      row.get(8)?,
    })
  }

  pub fn into_visit(self) -> Result<Visit> {
    Ok(Visit {
      id:                self.visit_id,
      client_id:         self.client_id,
      visit_date:        decode_dt(&self.visit_date)?,
      services:          serde_json::from_str(&self.services)?,
      total_price_cents: self.total_price_cents,
      barber:            self.barber,
      notes:             self.notes,
      reward_redeemed:   self.reward_redeemed,
      visit_number:      self.visit_number,
    })
  }
}

/// Raw values read directly from an `admins` row.
pub struct RawAdmin {
  pub admin_id:   String,
  pub email:      String,
  pub name:       String,
  pub staff_role: String,
  pub active:     bool,
  pub last_login: Option<String>,
}

impl RawAdmin {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      admin_id:   row.get(0)?,
      email:      row.get(1)?,
      name:       row.get(2)?,
      staff_role: row.get(3)?,
      active:     row.get(4)?,
      last_login: row.get(5)?,
    })
  }

  pub fn into_admin(self) -> Result<Admin> {
    Ok(Admin {
      id:         self.admin_id,
      email:      self.email,
      name:       self.name,
      staff_role: decode_staff_role(&self.staff_role)?,
      active:     self.active,
      last_login: decode_opt_dt(self.last_login)?,
    })
  }
}

/// Raw values read directly from a `service_categories` row.
pub struct RawCategory {
  pub category_id:   String,
  pub name:          String,
  pub description:   String,
  pub display_order: i32,
  pub active:        bool,
  pub created_at:    String,
}

impl RawCategory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id:   row.get(0)?,
      name:          row.get(1)?,
      description:   row.get(2)?,
      display_order: row.get(3)?,
      active:        row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_category(self) -> Result<ServiceCategory> {
    Ok(ServiceCategory {
      id:            self.category_id,
      name:          self.name,
      description:   self.description,
      display_order: self.display_order,
      active:        self.active,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `services` row.
pub struct RawService {
  pub service_id:       String,
  pub category_id:      String,
  pub name:             String,
  pub description:      String,
  pub price_cents:      i64,
  pub duration_minutes: u32,
  pub image_url:        Option<String>,
  pub active:           bool,
  pub popularity_score: i64,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawService {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      service_id:       row.get(0)?,
      category_id:      row.get(1)?,
      name:             row.get(2)?,
      description:      row.get(3)?,
      price_cents:      row.get(4)?,
      duration_minutes: row.get(5)?,
      image_url:        row.get(6)?,
      active:           row.get(7)?,
      popularity_score: row.get(8)?,
      created_at:       row.get(9)?,
      updated_at:       row.get(10)?,
    })
  }

  pub fn into_service(self) -> Result<Service> {
    let popularity_score = u64::try_from(self.popularity_score).map_err(|_| Error::Corrupt {
      column: "popularity_score",
      value:  self.popularity_score.to_string(),
    })?;
    Ok(Service {
      id: self.service_id,
      category_id: self.category_id,
      name: self.name,
      description: self.description,
      price_cents: self.price_cents,
      duration_minutes: self.duration_minutes,
      image_url: self.image_url,
      active: self.active,
      popularity_score,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
