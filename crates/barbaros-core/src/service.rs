//! The service catalog: what the shop offers, grouped into categories.
//!
//! Visits copy name and price out of the catalog at the time they are
//! recorded, so editing or deleting a service never rewrites history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

fn yes() -> bool { true }

fn require(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    Err(Error::Validation { field, reason: "must not be empty".into() })
  } else {
    Ok(())
  }
}

fn check_price(price_cents: i64) -> Result<()> {
  if price_cents < 0 {
    return Err(Error::Validation { field: "price_cents", reason: "must not be negative".into() });
  }
  Ok(())
}

fn check_duration(minutes: u32) -> Result<()> {
  if minutes == 0 {
    return Err(Error::Validation {
      field:  "duration_minutes",
      reason: "must be at least one minute".into(),
    });
  }
  Ok(())
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCategory {
  pub id:            String,
  /// Unique, compared case-insensitively.
  pub name:          String,
  pub description:   String,
  /// Menu position; lower comes first.
  pub display_order: i32,
  pub active:        bool,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ClientRepository::create_category`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewServiceCategory {
  pub name:          String,
  pub description:   String,
  #[serde(default)]
  pub display_order: i32,
  #[serde(default = "yes")]
  pub active:        bool,
}

impl NewServiceCategory {
  pub fn validate(&self) -> Result<()> {
    require("name", &self.name)?;
    require("description", &self.description)
  }
}

// ─── Services ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
  pub id:               String,
  pub category_id:      String,
  pub name:             String,
  pub description:      String,
  pub price_cents:      i64,
  pub duration_minutes: u32,
  pub image_url:        Option<String>,
  /// Inactive services stay on record but drop off the menu.
  pub active:           bool,
  /// Times the service has been performed.
  pub popularity_score: u64,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// Input to [`crate::store::ClientRepository::create_service`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
  pub category_id:      String,
  pub name:             String,
  pub description:      String,
  pub price_cents:      i64,
  pub duration_minutes: u32,
  #[serde(default)]
  pub image_url:        Option<String>,
  #[serde(default = "yes")]
  pub active:           bool,
}

impl NewService {
  pub fn validate(&self) -> Result<()> {
    require("category_id", &self.category_id)?;
    require("name", &self.name)?;
    require("description", &self.description)?;
    check_price(self.price_cents)?;
    check_duration(self.duration_minutes)
  }
}

/// A partial update; `None` leaves the stored value untouched. Popularity is
/// only ever changed by recording visits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePatch {
  pub category_id:      Option<String>,
  pub name:             Option<String>,
  pub description:      Option<String>,
  pub price_cents:      Option<i64>,
  pub duration_minutes: Option<u32>,
  pub image_url:        Option<String>,
  pub active:           Option<bool>,
}

impl ServicePatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(v) = &self.category_id {
      require("category_id", v)?;
    }
    if let Some(v) = &self.name {
      require("name", v)?;
    }
    if let Some(v) = &self.description {
      require("description", v)?;
    }
    if let Some(v) = self.price_cents {
      check_price(v)?;
    }
    if let Some(v) = self.duration_minutes {
      check_duration(v)?;
    }
    Ok(())
  }

  pub fn apply(self, service: &mut Service) {
    if let Some(v) = self.category_id {
      service.category_id = v;
    }
    if let Some(v) = self.name {
      service.name = v.trim().to_owned();
    }
    if let Some(v) = self.description {
      service.description = v;
    }
    if let Some(v) = self.price_cents {
      service.price_cents = v;
    }
    if let Some(v) = self.duration_minutes {
      service.duration_minutes = v;
    }
    if let Some(v) = self.image_url {
      service.image_url = Some(v);
    }
    if let Some(v) = self.active {
      service.active = v;
    }
  }
}
