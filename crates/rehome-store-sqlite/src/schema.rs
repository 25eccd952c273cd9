//! SQL schema for the rehome SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS organizations (
    organization_id TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id    TEXT PRIMARY KEY,
    username   TEXT NOT NULL UNIQUE,
    role       TEXT NOT NULL,   -- 'adopter' | 'shelter_staff' | 'admin'
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memberships (
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id),
    user_id         TEXT NOT NULL REFERENCES users(user_id),
    role            TEXT NOT NULL,   -- 'admin' | 'staff' | 'volunteer'
    is_active       INTEGER NOT NULL DEFAULT 1,
    joined_at       TEXT NOT NULL,
    PRIMARY KEY (organization_id, user_id)
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id      TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id),
    name            TEXT NOT NULL,
    age_years       INTEGER NOT NULL DEFAULT 0,
    age_months      INTEGER NOT NULL DEFAULT 0 CHECK (age_months BETWEEN 0 AND 11),
    description     TEXT NOT NULL DEFAULT '',
    status          TEXT NOT NULL,   -- derived; see rehome_core::sync
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- Append-only log of availability changes.
CREATE TABLE IF NOT EXISTS subject_status_changes (
    change_id      TEXT PRIMARY KEY,
    subject_id     TEXT NOT NULL REFERENCES subjects(subject_id),
    from_status    TEXT NOT NULL,
    to_status      TEXT NOT NULL,
    cause          TEXT NOT NULL,   -- 'synchronized' | 'paused' | 'unpaused'
    application_id TEXT REFERENCES applications(application_id),
    actor_id       TEXT REFERENCES users(user_id),
    recorded_at    TEXT NOT NULL
);

-- Never deleted; status changes only through a transition.
CREATE TABLE IF NOT EXISTS applications (
    application_id  TEXT PRIMARY KEY,
    subject_id      TEXT NOT NULL REFERENCES subjects(subject_id),
    applicant_id    TEXT NOT NULL REFERENCES users(user_id),
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id),
    status          TEXT NOT NULL,
    form_json       TEXT NOT NULL,
    version         INTEGER NOT NULL DEFAULT 1,
    applied_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- Backstop for the application-layer check in apply_to.
CREATE UNIQUE INDEX IF NOT EXISTS applications_one_active_idx
    ON applications(subject_id, applicant_id)
    WHERE status IN ('pending', 'reviewing', 'trial', 'accepted');

-- Audit log. No UPDATE is ever accepted; DELETE happens only through the
-- administrative purge, which records itself.
CREATE TABLE IF NOT EXISTS events (
    event_id       TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(application_id),
    event_type     TEXT NOT NULL,   -- 'status_changed' | 'note' | 'system'
    from_status    TEXT,
    to_status      TEXT,
    actor_type     TEXT NOT NULL,   -- 'applicant' | 'organization' | 'admin' | 'system'
    actor_id       TEXT REFERENCES users(user_id),
    note           TEXT NOT NULL DEFAULT '',
    created_at     TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS events_append_only
BEFORE UPDATE ON events
BEGIN
    SELECT RAISE(ABORT, 'events are append-only');
END;

CREATE TABLE IF NOT EXISTS messages (
    message_id     TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(application_id),
    sender_id      TEXT NOT NULL REFERENCES users(user_id),
    sender_type    TEXT NOT NULL,   -- 'user' | 'shelter' | 'admin'
    content        TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    read_at        TEXT
);

-- read_at goes from NULL to a timestamp exactly once; nothing else changes.
CREATE TRIGGER IF NOT EXISTS messages_read_once
BEFORE UPDATE ON messages
WHEN OLD.read_at IS NOT NULL
  OR NEW.read_at IS NULL
  OR NEW.content IS NOT OLD.content
  OR NEW.sender_id IS NOT OLD.sender_id
BEGIN
    SELECT RAISE(ABORT, 'messages are immutable once read');
END;

CREATE TABLE IF NOT EXISTS media (
    media_id   TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL REFERENCES subjects(subject_id),
    kind       TEXT NOT NULL,   -- 'image' | 'video'
    uri        TEXT NOT NULL,
    caption    TEXT NOT NULL DEFAULT '',
    is_primary INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Backstop for the primary selector.
CREATE UNIQUE INDEX IF NOT EXISTS media_one_primary_idx
    ON media(subject_id, kind)
    WHERE is_primary = 1;

CREATE INDEX IF NOT EXISTS applications_subject_idx   ON applications(subject_id, status);
CREATE INDEX IF NOT EXISTS applications_applicant_idx ON applications(applicant_id);
CREATE INDEX IF NOT EXISTS events_application_idx     ON events(application_id, created_at);
CREATE INDEX IF NOT EXISTS messages_application_idx   ON messages(application_id, created_at);
CREATE INDEX IF NOT EXISTS media_subject_idx          ON media(subject_id, sort_order);
CREATE INDEX IF NOT EXISTS status_changes_subject_idx ON subject_status_changes(subject_id);

PRAGMA user_version = 1;
";
