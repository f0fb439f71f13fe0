//! Accounts, staff records, and the identity attached to each request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two kinds of user that can sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  /// Shop staff; may manage every client.
  Admin,
  /// A client; may only see their own record.
  Client,
}

/// Who is making the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub user_id: String,
  pub role:    Role,
}

impl Identity {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// Admins may act on any client; a client only on themselves.
  pub fn may_view_client(&self, client_id: &str) -> bool {
    self.is_admin() || self.user_id == client_id
  }
}

/// Credential material returned by
/// [`crate::store::ClientRepository::find_account`].
#[derive(Debug, Clone)]
pub struct Account {
  pub user_id:       String,
  pub role:          Role,
  /// Argon2 PHC string; `None` for accounts created without a password.
  pub password_hash: Option<String>,
  pub active:        bool,
}

// ─── Staff ───────────────────────────────────────────────────────────────────

/// The job a staff member does in the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
  Owner,
  Barber,
  Receptionist,
}

impl StaffRole {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Owner => "owner",
      Self::Barber => "barber",
      Self::Receptionist => "receptionist",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "owner" => Some(Self::Owner),
      "barber" => Some(Self::Barber),
      "receptionist" => Some(Self::Receptionist),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
  pub id:         String,
  pub email:      String,
  pub name:       String,
  pub staff_role: StaffRole,
  pub active:     bool,
  pub last_login: Option<DateTime<Utc>>,
}

/// Input to [`crate::store::ClientRepository::create_admin`].
#[derive(Debug, Clone)]
pub struct NewAdmin {
  /// Stored lowercased.
  pub email:         String,
  pub name:          String,
  pub staff_role:    StaffRole,
  pub password_hash: String,
}
