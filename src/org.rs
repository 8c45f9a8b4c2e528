//! Organization directory
//!
//! Police stations, courts and the users that belong to them. Every access
//! check in the crate resolves to membership questions answered here: does
//! the actor's organization match the one linked (directly or through
//! Case -> FIR -> station, or Case -> latest submission -> court) to the
//! record being touched.

use crate::db::{last_insert_rowid, now, record_audit, Database, DbError, Result};
use crate::schema::*;
use diesel::prelude::*;

/// Kind of organization a user can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgKind {
    PoliceStation,
    Court,
}

impl OrgKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgKind::PoliceStation => "POLICE_STATION",
            OrgKind::Court => "COURT",
        }
    }
}

/// Role a user holds within their organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    /// Investigating officer in a police station
    Police,
    /// Station House Officer - station-wide assignment/approval authority
    Sho,
    /// Court-side clerical role
    CourtClerk,
    /// Judicial role
    Judge,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Police => "POLICE",
            Role::Sho => "SHO",
            Role::CourtClerk => "COURT_CLERK",
            Role::Judge => "JUDGE",
        }
    }

    pub fn parse(s: &str) -> Result<Role> {
        match s {
            "POLICE" => Ok(Role::Police),
            "SHO" => Ok(Role::Sho),
            "COURT_CLERK" => Ok(Role::CourtClerk),
            "JUDGE" => Ok(Role::Judge),
            other => Err(DbError::Validation(format!("Unknown role: {}", other))),
        }
    }

    /// Roles that act on the police side of a case
    pub fn is_police_side(&self) -> bool {
        matches!(self, Role::Police | Role::Sho)
    }

    /// Roles that act on the court side of a case
    pub fn is_court_side(&self) -> bool {
        matches!(self, Role::CourtClerk | Role::Judge)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller identity supplied by the authentication layer. The core trusts
/// this without re-verifying credentials.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
    pub organization_id: i32,
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable organization
#[derive(Insertable)]
#[diesel(table_name = organizations)]
pub struct NewOrganization<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub district: &'a str,
    pub state: &'a str,
    pub court_type: Option<&'a str>,
    pub created_at: &'a str,
}

/// Queryable organization (police station or court)
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = organizations)]
pub struct Organization {
    pub id: i32,
    pub kind: String,
    pub name: String,
    pub district: String,
    pub state: String,
    pub court_type: Option<String>,
    pub created_at: String,
}

/// Insertable user
#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub organization_id: i32,
    pub name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    pub is_active: bool,
    pub created_at: &'a str,
}

/// Queryable user
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub organization_id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
}

impl Database {
    // ========================================================================
    // Organization Directory Operations
    // ========================================================================

    /// Register a police station
    pub fn create_police_station(&self, name: &str, district: &str, state: &str) -> Result<i32> {
        self.create_organization(OrgKind::PoliceStation, name, district, state, None)
    }

    /// Register a court
    pub fn create_court(
        &self,
        name: &str,
        district: &str,
        state: &str,
        court_type: &str,
    ) -> Result<i32> {
        self.create_organization(OrgKind::Court, name, district, state, Some(court_type))
    }

    fn create_organization(
        &self,
        kind: OrgKind,
        name: &str,
        district: &str,
        state: &str,
        court_type: Option<&str>,
    ) -> Result<i32> {
        if name.trim().is_empty() {
            return Err(DbError::Validation(
                "Organization name must not be empty".to_string(),
            ));
        }
        let mut conn = self.get_conn()?;
        let new_org = NewOrganization {
            kind: kind.as_str(),
            name,
            district,
            state,
            court_type,
            created_at: &now(),
        };
        diesel::insert_into(organizations::table)
            .values(&new_org)
            .execute(&mut conn)?;
        last_insert_rowid(&mut conn)
    }

    /// Create a user inside an organization. Police-side roles require a
    /// police station, court-side roles a court.
    pub fn create_user(
        &self,
        organization_id: i32,
        name: &str,
        email: &str,
        role: Role,
    ) -> Result<i32> {
        let mut conn = self.get_conn()?;
        let org = organizations::table
            .find(organization_id)
            .first::<Organization>(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::NotFound("Organization not found".to_string()))?;

        let expected = if role.is_police_side() {
            OrgKind::PoliceStation
        } else {
            OrgKind::Court
        };
        if org.kind != expected.as_str() {
            return Err(DbError::Validation(format!(
                "Role {} cannot belong to a {}",
                role, org.kind
            )));
        }

        let new_user = NewUser {
            organization_id,
            name,
            email,
            role: role.as_str(),
            is_active: true,
            created_at: &now(),
        };
        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(&mut conn)?;
        last_insert_rowid(&mut conn)
    }

    /// Deactivate a user. Keeps the row for audit integrity.
    pub fn deactivate_user(&self, actor: &Actor, user_id: i32) -> Result<()> {
        if actor.role != Role::Sho {
            return Err(DbError::Forbidden(
                "Only an SHO can deactivate users".to_string(),
            ));
        }
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let user = users::table
                .find(user_id)
                .first::<User>(conn)
                .optional()?
                .ok_or_else(|| DbError::NotFound("User not found".to_string()))?;
            if user.organization_id != actor.organization_id {
                return Err(DbError::Forbidden("Access denied".to_string()));
            }
            diesel::update(users::table.find(user_id))
                .set(users::is_active.eq(false))
                .execute(conn)?;
            record_audit(conn, actor.user_id, "USER_DEACTIVATED", "USER", user_id)?;
            Ok(())
        })
    }

    /// All police stations, by name
    pub fn police_stations(&self) -> Result<Vec<Organization>> {
        self.organizations_of_kind(OrgKind::PoliceStation)
    }

    /// All courts, by name
    pub fn courts(&self) -> Result<Vec<Organization>> {
        self.organizations_of_kind(OrgKind::Court)
    }

    fn organizations_of_kind(&self, kind: OrgKind) -> Result<Vec<Organization>> {
        let mut conn = self.get_conn()?;
        let rows = organizations::table
            .filter(organizations::kind.eq(kind.as_str()))
            .order(organizations::name.asc())
            .load::<Organization>(&mut conn)?;
        Ok(rows)
    }

    /// Active POLICE officers of a station, for the SHO to pick an assignee
    pub fn officers_by_station(&self, police_station_id: i32) -> Result<Vec<User>> {
        let mut conn = self.get_conn()?;
        let rows = users::table
            .filter(users::organization_id.eq(police_station_id))
            .filter(users::role.eq(Role::Police.as_str()))
            .filter(users::is_active.eq(true))
            .order(users::name.asc())
            .load::<User>(&mut conn)?;
        Ok(rows)
    }

    /// Organization a user belongs to
    pub fn resolve_organization(&self, user_id: i32) -> Result<i32> {
        let mut conn = self.get_conn()?;
        let org_id = users::table
            .find(user_id)
            .select(users::organization_id)
            .first::<i32>(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::NotFound("User not found".to_string()))?;
        Ok(org_id)
    }

    /// Whether a user belongs to an organization
    pub fn is_member(&self, user_id: i32, organization_id: i32) -> Result<bool> {
        Ok(self.resolve_organization(user_id)? == organization_id)
    }

    /// Load a stored user as an Actor. The CLI uses this in place of a real
    /// authentication layer; inactive users are rejected.
    pub fn actor_for_user(&self, user_id: i32) -> Result<Actor> {
        let mut conn = self.get_conn()?;
        let user = users::table
            .find(user_id)
            .first::<User>(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::NotFound("User not found".to_string()))?;
        if !user.is_active {
            return Err(DbError::Forbidden("User is deactivated".to_string()));
        }
        Ok(Actor {
            user_id: user.id,
            role: Role::parse(&user.role)?,
            organization_id: user.organization_id,
        })
    }

    /// Look up a user row
    pub fn get_user(&self, user_id: i32) -> Result<User> {
        let mut conn = self.get_conn()?;
        let user = users::table
            .find(user_id)
            .first::<User>(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::NotFound("User not found".to_string()))?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path().join("t.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Police, Role::Sho, Role::CourtClerk, Role::Judge] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
        assert!(Role::parse("MAGISTRATE").is_err());
    }

    #[test]
    fn test_user_must_match_org_kind() {
        let (_dir, db) = test_db();
        let station = db.create_police_station("Central PS", "North", "KA").unwrap();
        let court = db.create_court("Sessions Court", "North", "KA", "SESSIONS").unwrap();

        assert!(db.create_user(station, "Asha", "asha@ps.gov", Role::Police).is_ok());
        assert!(matches!(
            db.create_user(station, "Ravi", "ravi@court.gov", Role::Judge),
            Err(DbError::Validation(_))
        ));
        assert!(db.create_user(court, "Ravi", "ravi@court.gov", Role::Judge).is_ok());
    }

    #[test]
    fn test_membership_resolution() {
        let (_dir, db) = test_db();
        let station = db.create_police_station("Central PS", "North", "KA").unwrap();
        let other = db.create_police_station("East PS", "East", "KA").unwrap();
        let officer = db.create_user(station, "Asha", "asha@ps.gov", Role::Police).unwrap();

        assert_eq!(db.resolve_organization(officer).unwrap(), station);
        assert!(db.is_member(officer, station).unwrap());
        assert!(!db.is_member(officer, other).unwrap());

        let actor = db.actor_for_user(officer).unwrap();
        assert_eq!(actor.role, Role::Police);
        assert_eq!(actor.organization_id, station);
    }
}
