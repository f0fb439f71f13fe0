//! Visits, one row per trip to the chair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A service performed during a visit, priced at the time it was performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReceived {
  /// The catalog entry this was taken from. Recording the visit bumps that
  /// entry's popularity.
  #[serde(default)]
  pub service_id:       Option<String>,
  pub name:             String,
  pub price_cents:      i64,
  pub duration_minutes: u32,
}

/// Sum of `services`, refusing negative prices and totals that overflow.
pub fn price_services(services: &[ServiceReceived]) -> Result<i64> {
  services.iter().try_fold(0i64, |total, s| {
    if s.price_cents < 0 {
      return Err(Error::Validation {
        field:  "services",
        reason: "prices must not be negative".into(),
      });
    }
    total.checked_add(s.price_cents).ok_or_else(|| Error::Validation {
      field:  "services",
      reason: "total price is too large".into(),
    })
  })
}

fn check_total(total: Option<i64>) -> Result<()> {
  if total.is_some_and(|t| t < 0) {
    return Err(Error::Validation {
      field:  "total_price_cents",
      reason: "must not be negative".into(),
    });
  }
  Ok(())
}

fn check_barber(barber: &str) -> Result<()> {
  if barber.trim().is_empty() {
    return Err(Error::Validation {
      field:  "barber",
      reason: "barber name is required".into(),
    });
  }
  Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
  pub id:                String,
  pub client_id:         String,
  pub visit_date:        DateTime<Utc>,
  pub services:          Vec<ServiceReceived>,
  pub total_price_cents: i64,
  pub barber:            String,
  pub notes:             Option<String>,
  pub reward_redeemed:   bool,
  /// The client's visit count including this visit.
  pub visit_number:      u32,
}

// ─── NewVisit ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ClientRepository::record_visit`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewVisit {
  #[serde(skip)]
  pub client_id:         String,
  /// Defaults to now.
  #[serde(default)]
  pub visit_date:        Option<DateTime<Utc>>,
  #[serde(default)]
  pub services:          Vec<ServiceReceived>,
  /// Defaults to the sum of `services`.
  #[serde(default)]
  pub total_price_cents: Option<i64>,
  pub barber:            String,
  #[serde(default)]
  pub notes:             Option<String>,
  #[serde(default)]
  pub reward_redeemed:   bool,
}

impl NewVisit {
  pub fn validate(&self) -> Result<()> {
    check_barber(&self.barber)?;
    price_services(&self.services)?;
    check_total(self.total_price_cents)
  }

  /// The explicit total, or the sum of the listed services. Saturates on
  /// input that [`Self::validate`] would refuse.
  pub fn total_price_cents(&self) -> i64 {
    self.total_price_cents.unwrap_or_else(|| {
      self
        .services
        .iter()
        .fold(0i64, |total, s| total.saturating_add(s.price_cents))
    })
  }

  /// Catalog ids referenced by the services, once per service received.
  pub fn service_ids(&self) -> impl Iterator<Item = &str> {
    self.services.iter().filter_map(|s| s.service_id.as_deref())
  }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// A correction to a recorded visit; `None` leaves the stored value untouched.
///
/// The client, visit number and redemption flag are fixed once recorded since
/// the loyalty counters were derived from them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitPatch {
  pub visit_date:        Option<DateTime<Utc>>,
  /// Replacing the services recomputes the total unless one is also given.
  pub services:          Option<Vec<ServiceReceived>>,
  pub total_price_cents: Option<i64>,
  pub barber:            Option<String>,
  pub notes:             Option<String>,
}

impl VisitPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(barber) = &self.barber {
      check_barber(barber)?;
    }
    if let Some(services) = &self.services {
      price_services(services)?;
    }
    check_total(self.total_price_cents)
  }

  /// Apply to `visit`. Call [`Self::validate`] first.
  pub fn apply(self, visit: &mut Visit) -> Result<()> {
    if let Some(services) = self.services {
      visit.total_price_cents = match self.total_price_cents {
        Some(total) => total,
        None => price_services(&services)?,
      };
      visit.services = services;
    } else if let Some(total) = self.total_price_cents {
      visit.total_price_cents = total;
    }
    if let Some(v) = self.visit_date {
      visit.visit_date = v;
    }
    if let Some(v) = self.barber {
      visit.barber = v.trim().to_owned();
    }
    if let Some(v) = self.notes {
      visit.notes = Some(v);
    }
    Ok(())
  }
}
