//! Users, organizations and memberships.

use rehome_core::{
  Error as CoreError,
  principal::{Membership, MembershipRole, Organization, Principal, User, UserRole},
};
use rusqlite::{Connection, OptionalExtension as _, Transaction};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawMembership, RawUser, decode_uuid, encode_dt, encode_uuid, now},
};

pub fn add_organization(tx: &Transaction<'_>, name: String) -> Result<Organization> {
  let organization = Organization { organization_id: Uuid::new_v4(), name, created_at: now() };

  tx.execute(
    "INSERT INTO organizations (organization_id, name, created_at) VALUES (?1, ?2, ?3)",
    rusqlite::params![
      encode_uuid(organization.organization_id),
      organization.name,
      encode_dt(organization.created_at),
    ],
  )?;

  tracing::info!(organization_id = %organization.organization_id, "organization added");
  Ok(organization)
}

pub fn add_user(tx: &Transaction<'_>, username: String, role: UserRole) -> Result<User> {
  let user = User { user_id: Uuid::new_v4(), username, role, created_at: now() };

  tx.execute(
    "INSERT INTO users (user_id, username, role, created_at) VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![
      encode_uuid(user.user_id),
      user.username,
      user.role.as_ref(),
      encode_dt(user.created_at),
    ],
  )?;

  tracing::info!(user_id = %user.user_id, role = %user.role, "user added");
  Ok(user)
}

/// Insert a membership, or reactivate an existing one with the new role.
pub fn add_membership(
  tx: &Transaction<'_>,
  organization_id: Uuid,
  user_id: Uuid,
  role: MembershipRole,
) -> Result<Membership> {
  find_user(tx, user_id)?.ok_or(CoreError::UserNotFound(user_id))?;

  tx.execute(
    "INSERT INTO memberships (organization_id, user_id, role, is_active, joined_at)
     VALUES (?1, ?2, ?3, 1, ?4)
     ON CONFLICT (organization_id, user_id)
     DO UPDATE SET role = excluded.role, is_active = 1",
    rusqlite::params![
      encode_uuid(organization_id),
      encode_uuid(user_id),
      role.as_ref(),
      encode_dt(now()),
    ],
  )?;

  tracing::info!(%organization_id, %user_id, %role, "membership active");
  require_membership(tx, organization_id, user_id)
}

pub fn deactivate_membership(
  tx: &Transaction<'_>,
  organization_id: Uuid,
  user_id: Uuid,
) -> Result<Membership> {
  let changed = tx.execute(
    "UPDATE memberships SET is_active = 0 WHERE organization_id = ?1 AND user_id = ?2",
    rusqlite::params![encode_uuid(organization_id), encode_uuid(user_id)],
  )?;
  if changed == 0 {
    return Err(
      CoreError::Conflict(format!(
        "user {user_id} has no membership in organization {organization_id}"
      ))
      .into(),
    );
  }

  tracing::info!(%organization_id, %user_id, "membership deactivated");
  require_membership(tx, organization_id, user_id)
}

/// Global role plus the organizations where the user holds an active
/// membership.
pub fn get_principal(conn: &Connection, user_id: Uuid) -> Result<Principal> {
  let user = find_user(conn, user_id)?.ok_or(CoreError::UserNotFound(user_id))?;

  let organizations = conn
    .prepare(
      "SELECT organization_id FROM memberships
       WHERE user_id = ?1 AND is_active = 1
       ORDER BY joined_at, rowid",
    )?
    .query_map(rusqlite::params![encode_uuid(user_id)], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .iter()
    .map(|s| decode_uuid(s))
    .collect::<Result<Vec<_>>>()?;

  Ok(Principal { user_id, role: user.role, organizations })
}

fn find_user(conn: &Connection, user_id: Uuid) -> Result<Option<User>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
      rusqlite::params![encode_uuid(user_id)],
      RawUser::from_row,
    )
    .optional()?;
  raw.map(RawUser::into_user).transpose()
}

fn require_membership(conn: &Connection, organization_id: Uuid, user_id: Uuid) -> Result<Membership> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM memberships WHERE organization_id = ?1 AND user_id = ?2",
        RawMembership::COLUMNS
      ),
      rusqlite::params![encode_uuid(organization_id), encode_uuid(user_id)],
      RawMembership::from_row,
    )?
    .into_membership()
}
