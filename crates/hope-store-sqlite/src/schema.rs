//! SQL schema for the Hope SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id    TEXT PRIMARY KEY,
    email      TEXT NOT NULL UNIQUE,   -- lower-cased
    name       TEXT NOT NULL,
    photo_url  TEXT,
    geohash    TEXT,
    last_seen  INTEGER NOT NULL        -- unix seconds; compare-and-swap target
);

CREATE TABLE IF NOT EXISTS ride_offers (
    offer_id   TEXT PRIMARY KEY,
    driver_id  TEXT REFERENCES users(user_id) ON DELETE SET NULL,
    from_geo   TEXT NOT NULL,
    to_geo     TEXT NOT NULL,
    fare       REAL NOT NULL DEFAULT 0,
    depart_at  TEXT NOT NULL,
    seats      INTEGER NOT NULL,
    status     TEXT NOT NULL DEFAULT 'active'   -- 'active' | 'matched' | 'completed'
);

CREATE TABLE IF NOT EXISTS ride_requests (
    request_id TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    from_geo   TEXT NOT NULL,
    to_geo     TEXT NOT NULL,
    depart_at  TEXT NOT NULL,
    seats      INTEGER NOT NULL,
    status     TEXT NOT NULL DEFAULT 'active'   -- 'active' | 'matched' | 'completed'
);

-- rider, driver and ride are fixed at insert; only status is ever updated.
CREATE TABLE IF NOT EXISTS matches (
    match_id   TEXT PRIMARY KEY,
    rider_id   TEXT NOT NULL,
    driver_id  TEXT NOT NULL,
    ride_id    TEXT NOT NULL REFERENCES ride_offers(offer_id) ON DELETE CASCADE,
    status     TEXT NOT NULL,   -- 'requested' | 'accepted' | 'rejected' | 'completed'
    created_at TEXT NOT NULL,
    CHECK (rider_id != driver_id)
);

CREATE INDEX IF NOT EXISTS ride_offers_driver_idx  ON ride_offers(driver_id);
CREATE INDEX IF NOT EXISTS ride_offers_from_idx    ON ride_offers(from_geo);
CREATE INDEX IF NOT EXISTS ride_requests_user_idx  ON ride_requests(user_id);
CREATE INDEX IF NOT EXISTS ride_requests_from_idx  ON ride_requests(from_geo);
CREATE INDEX IF NOT EXISTS matches_ride_idx        ON matches(ride_id, created_at);
CREATE INDEX IF NOT EXISTS matches_rider_idx       ON matches(rider_id, created_at);
CREATE INDEX IF NOT EXISTS matches_driver_idx      ON matches(driver_id, created_at);

PRAGMA user_version = 1;
";
