//! Client records: the people whose visits and rewards the shop tracks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored client. The password hash never leaves the repository; see
/// [`crate::account::Account`] for credential lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
  /// Repository primary key (24 hex digits).
  pub id:                 String,
  /// Human-facing code, `C` plus eight alphanumerics.
  pub client_code:        String,
  pub first_name:         String,
  pub last_name:          String,
  pub email:              String,
  pub phone_number:       String,
  pub date_created:       DateTime<Utc>,
  pub last_login:         Option<DateTime<Utc>>,
  pub visit_count:        u32,
  pub rewards_earned:     u32,
  pub rewards_redeemed:   u32,
  pub account_active:     bool,
  pub preferred_services: Vec<String>,
  /// Alternate identifier embedded in the client's printed badge. Set the
  /// first time a badge is issued and replaced when an admin rotates it.
  pub badge_id:           Option<String>,
  pub last_visit:         Option<DateTime<Utc>>,
}

impl ClientRecord {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }

  /// The identifier to embed in a badge: the cached badge id if one was
  /// already issued, otherwise the client code.
  pub fn badge_subject(&self) -> &str {
    self.badge_id.as_deref().unwrap_or(&self.client_code)
  }
}

// ─── NewClient ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::ClientRepository::create_client`].
///
/// `id` and `date_created` are always assigned by the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClient {
  /// Minted by the store when absent.
  #[serde(default)]
  pub client_code:        Option<String>,
  pub first_name:         String,
  pub last_name:          String,
  pub email:              String,
  #[serde(default)]
  pub phone_number:       String,
  /// Argon2 PHC string. Clients created by staff may have no password and
  /// cannot log in until one is set.
  #[serde(skip)]
  pub password_hash:      Option<String>,
  #[serde(default)]
  pub preferred_services: Vec<String>,
}

impl NewClient {
  /// Check the fields every client must carry.
  pub fn validate(&self) -> Result<()> {
    require("first_name", &self.first_name)?;
    require("last_name", &self.last_name)?;
    require("email", &self.email)?;
    if !self.email.contains('@') {
      return Err(Error::Validation {
        field:  "email",
        reason: format!("{:?} is not an email address", self.email),
      });
    }
    if let Some(code) = &self.client_code
      && !crate::id::is_client_code(code)
    {
      return Err(Error::Validation {
        field:  "client_code",
        reason: format!("{code:?} is not of the form C + 8 alphanumerics"),
      });
    }
    Ok(())
  }
}

fn require(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    Err(Error::Validation { field, reason: "must not be empty".into() })
  } else {
    Ok(())
  }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// A partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientPatch {
  pub first_name:         Option<String>,
  pub last_name:          Option<String>,
  pub email:              Option<String>,
  pub phone_number:       Option<String>,
  pub account_active:     Option<bool>,
  pub preferred_services: Option<Vec<String>>,
}

impl ClientPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(v) = &self.first_name {
      require("first_name", v)?;
    }
    if let Some(v) = &self.last_name {
      require("last_name", v)?;
    }
    if let Some(email) = &self.email {
      require("email", email)?;
      if !email.contains('@') {
        return Err(Error::Validation {
          field:  "email",
          reason: format!("{email:?} is not an email address"),
        });
      }
    }
    Ok(())
  }

  pub fn apply(self, client: &mut ClientRecord) {
    if let Some(v) = self.first_name {
      client.first_name = v;
    }
    if let Some(v) = self.last_name {
      client.last_name = v;
    }
    if let Some(v) = self.email {
      client.email = v;
    }
    if let Some(v) = self.phone_number {
      client.phone_number = v;
    }
    if let Some(v) = self.account_active {
      client.account_active = v;
    }
    if let Some(v) = self.preferred_services {
      client.preferred_services = v;
    }
  }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// The compact view shown at the front desk after a lookup or scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSummary {
  pub id:               String,
  pub name:             String,
  pub email:            String,
  pub phone:            String,
  pub client_code:      String,
  pub visit_count:      u32,
  pub rewards_earned:   u32,
  pub rewards_redeemed: u32,
}

impl From<&ClientRecord> for ClientSummary {
  fn from(c: &ClientRecord) -> Self {
    Self {
      id:               c.id.clone(),
      name:             c.full_name(),
      email:            c.email.clone(),
      phone:            c.phone_number.clone(),
      client_code:      c.client_code.clone(),
      visit_count:      c.visit_count,
      rewards_earned:   c.rewards_earned,
      rewards_redeemed: c.rewards_redeemed,
    }
  }
}
