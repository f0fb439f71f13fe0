//! SQL schema for the Barbaros SQLite store.
//!
//! Executed once at connection startup. Version 2 only added tables, so a
//! version 1 file upgrades in place; later migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS clients (
    client_id          TEXT PRIMARY KEY,          -- 24 lowercase hex digits
    client_code        TEXT NOT NULL UNIQUE,      -- C + 8 alphanumerics
    first_name         TEXT NOT NULL,
    last_name          TEXT NOT NULL,
    email              TEXT NOT NULL UNIQUE COLLATE NOCASE,
    phone_number       TEXT NOT NULL DEFAULT '',
    password_hash      TEXT,                      -- NULL: cannot sign in
    date_created       TEXT NOT NULL,             -- RFC 3339 UTC
    last_login         TEXT,
    visit_count        INTEGER NOT NULL DEFAULT 0,
    rewards_earned     INTEGER NOT NULL DEFAULT 0,
    rewards_redeemed   INTEGER NOT NULL DEFAULT 0,
    account_active     INTEGER NOT NULL DEFAULT 1,
    preferred_services TEXT NOT NULL DEFAULT '[]', -- JSON array of names
    badge_id           TEXT UNIQUE,               -- subject of the printed badge
    last_visit         TEXT,
    CHECK (rewards_redeemed <= rewards_earned)
);

CREATE TABLE IF NOT EXISTS admins (
    admin_id      TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    name          TEXT NOT NULL,
    staff_role    TEXT NOT NULL,   -- 'owner' | 'barber' | 'receptionist'
    password_hash TEXT NOT NULL,
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    last_login    TEXT
);

CREATE TABLE IF NOT EXISTS visits (
    visit_id          TEXT PRIMARY KEY,
    client_id         TEXT NOT NULL REFERENCES clients(client_id) ON DELETE CASCADE,
    visit_date        TEXT NOT NULL,
    services          TEXT NOT NULL DEFAULT '[]',  -- JSON array of services
    total_price_cents INTEGER NOT NULL DEFAULT 0,
    barber            TEXT NOT NULL,
    notes             TEXT,
    reward_redeemed   INTEGER NOT NULL DEFAULT 0,
    visit_number      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS service_categories (
    category_id   TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description   TEXT NOT NULL,
    display_order INTEGER NOT NULL DEFAULT 0,
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS services (
    service_id       TEXT PRIMARY KEY,
    category_id      TEXT NOT NULL REFERENCES service_categories(category_id),
    name             TEXT NOT NULL,
    description      TEXT NOT NULL,
    price_cents      INTEGER NOT NULL CHECK (price_cents >= 0),
    duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
    image_url        TEXT,
    active           INTEGER NOT NULL DEFAULT 1,
    popularity_score INTEGER NOT NULL DEFAULT 0, -- bumped once per service received
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS clients_name_idx        ON clients(last_name, first_name);
CREATE INDEX IF NOT EXISTS visits_client_idx       ON visits(client_id, visit_date);
CREATE INDEX IF NOT EXISTS visits_date_idx         ON visits(visit_date);
CREATE INDEX IF NOT EXISTS services_category_idx   ON services(category_id, popularity_score DESC);
CREATE INDEX IF NOT EXISTS services_popularity_idx ON services(popularity_score DESC, name);

PRAGMA user_version = 2;
";
