//! Investigation records: events, evidence, witnesses and accused persons.
//!
//! All writes require the actor to hold the active assignment on the case and
//! run in one transaction with their audit entry. Evidence and witness
//! statements carry an uploaded file; a storage failure fails the call, there
//! is no record without its file.

use crate::case::{case_station, ensure_assigned, load_case};
use crate::court::latest_submission;
use crate::db::{last_insert_rowid, now, record_audit, Database, DbError, Result};
use crate::org::Actor;
use crate::schema::*;
use crate::storage::{FileStore, Folder};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Disposition of an accused person on a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AccusedStatus {
    Absconding,
    Arrested,
    OnBail,
    Charged,
}

impl AccusedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccusedStatus::Absconding => "ABSCONDING",
            AccusedStatus::Arrested => "ARRESTED",
            AccusedStatus::OnBail => "ON_BAIL",
            AccusedStatus::Charged => "CHARGED",
        }
    }

    pub fn parse(s: &str) -> Result<AccusedStatus> {
        match s {
            "ABSCONDING" => Ok(AccusedStatus::Absconding),
            "ARRESTED" => Ok(AccusedStatus::Arrested),
            "ON_BAIL" => Ok(AccusedStatus::OnBail),
            "CHARGED" => Ok(AccusedStatus::Charged),
            other => Err(DbError::Validation(format!(
                "Unknown accused status: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Diesel Models
// ============================================================================

#[derive(Insertable)]
#[diesel(table_name = investigation_events)]
pub struct NewInvestigationEvent<'a> {
    pub case_id: i32,
    pub event_type: &'a str,
    pub event_date: &'a str,
    pub description: &'a str,
    pub performed_by: i32,
    pub created_at: &'a str,
}

#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = investigation_events)]
pub struct InvestigationEvent {
    pub id: i32,
    pub case_id: i32,
    pub event_type: String,
    pub event_date: String,
    pub description: String,
    pub performed_by: i32,
    pub created_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = evidence)]
pub struct NewEvidence<'a> {
    pub case_id: i32,
    pub category: &'a str,
    pub file_url: &'a str,
    pub uploaded_by: i32,
    pub uploaded_at: &'a str,
}

#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = evidence)]
pub struct Evidence {
    pub id: i32,
    pub case_id: i32,
    pub category: String,
    pub file_url: String,
    pub uploaded_by: i32,
    pub uploaded_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = witnesses)]
pub struct NewWitness<'a> {
    pub case_id: i32,
    pub name: &'a str,
    pub contact: Option<&'a str>,
    pub address: Option<&'a str>,
    pub statement_file_url: &'a str,
    pub created_at: &'a str,
}

#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = witnesses)]
pub struct Witness {
    pub id: i32,
    pub case_id: i32,
    pub name: String,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub statement_file_url: String,
    pub created_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = accused)]
pub struct NewAccused<'a> {
    pub case_id: i32,
    pub name: &'a str,
    pub status: &'a str,
    pub created_at: &'a str,
}

#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = accused)]
pub struct Accused {
    pub id: i32,
    pub case_id: i32,
    pub name: String,
    pub status: String,
    pub created_at: String,
}

/// Read access to a case's investigation record: police-side actors must
/// belong to the case's station, court-side actors must belong to the court
/// the case was last submitted to.
fn verify_read_access(conn: &mut SqliteConnection, actor: &Actor, case_id: i32) -> Result<()> {
    let case = load_case(conn, case_id)?;
    if actor.role.is_police_side() {
        if case_station(conn, &case)? != actor.organization_id {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        return Ok(());
    }
    match latest_submission(conn, case_id)? {
        Some(sub) if sub.court_id == actor.organization_id => Ok(()),
        _ => Err(DbError::Forbidden("Access denied".to_string())),
    }
}

impl Database {
    /// Record an investigation event (a raid, a seizure, an interrogation)
    pub fn add_investigation_event(
        &self,
        actor: &Actor,
        case_id: i32,
        event_type: &str,
        event_date: &str,
        description: &str,
    ) -> Result<InvestigationEvent> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            load_case(conn, case_id)?;
            ensure_assigned(conn, case_id, actor.user_id)?;

            let row = NewInvestigationEvent {
                case_id,
                event_type,
                event_date,
                description,
                performed_by: actor.user_id,
                created_at: &now(),
            };
            diesel::insert_into(investigation_events::table)
                .values(&row)
                .execute(conn)?;
            let event_id = last_insert_rowid(conn)?;

            record_audit(
                conn,
                actor.user_id,
                "INVESTIGATION_EVENT_ADDED",
                "INVESTIGATION_EVENT",
                event_id,
            )?;

            let stored = investigation_events::table
                .find(event_id)
                .first::<InvestigationEvent>(conn)?;
            Ok(stored)
        })
    }

    /// Attach a piece of evidence. The file upload happens before the
    /// transaction and its failure fails the call.
    pub fn add_evidence(
        &self,
        actor: &Actor,
        case_id: i32,
        category: &str,
        file_bytes: &[u8],
        file_name: &str,
        store: &dyn FileStore,
    ) -> Result<Evidence> {
        let mut conn = self.get_conn()?;
        ensure_assigned(&mut conn, case_id, actor.user_id)?;

        let stored_file = store
            .upload(file_bytes, Folder::Evidence, file_name)
            .map_err(|e| DbError::Storage(e.to_string()))?;

        conn.immediate_transaction::<_, DbError, _>(|conn| {
            load_case(conn, case_id)?;
            ensure_assigned(conn, case_id, actor.user_id)?;

            let row = NewEvidence {
                case_id,
                category,
                file_url: &stored_file.url,
                uploaded_by: actor.user_id,
                uploaded_at: &now(),
            };
            diesel::insert_into(evidence::table).values(&row).execute(conn)?;
            let evidence_id = last_insert_rowid(conn)?;

            record_audit(conn, actor.user_id, "EVIDENCE_ADDED", "EVIDENCE", evidence_id)?;

            let stored = evidence::table.find(evidence_id).first::<Evidence>(conn)?;
            Ok(stored)
        })
    }

    /// Record a witness together with their statement file
    pub fn add_witness(
        &self,
        actor: &Actor,
        case_id: i32,
        name: &str,
        contact: Option<&str>,
        address: Option<&str>,
        statement_bytes: &[u8],
        statement_name: &str,
        store: &dyn FileStore,
    ) -> Result<Witness> {
        let mut conn = self.get_conn()?;
        ensure_assigned(&mut conn, case_id, actor.user_id)?;

        let stored_file = store
            .upload(statement_bytes, Folder::WitnessStatements, statement_name)
            .map_err(|e| DbError::Storage(e.to_string()))?;

        conn.immediate_transaction::<_, DbError, _>(|conn| {
            load_case(conn, case_id)?;
            ensure_assigned(conn, case_id, actor.user_id)?;

            let row = NewWitness {
                case_id,
                name,
                contact,
                address,
                statement_file_url: &stored_file.url,
                created_at: &now(),
            };
            diesel::insert_into(witnesses::table).values(&row).execute(conn)?;
            let witness_id = last_insert_rowid(conn)?;

            record_audit(conn, actor.user_id, "WITNESS_ADDED", "WITNESS", witness_id)?;

            let stored = witnesses::table.find(witness_id).first::<Witness>(conn)?;
            Ok(stored)
        })
    }

    /// Record an accused person on the case
    pub fn add_accused(
        &self,
        actor: &Actor,
        case_id: i32,
        name: &str,
        status: AccusedStatus,
    ) -> Result<Accused> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            load_case(conn, case_id)?;
            ensure_assigned(conn, case_id, actor.user_id)?;

            let row = NewAccused {
                case_id,
                name,
                status: status.as_str(),
                created_at: &now(),
            };
            diesel::insert_into(accused::table).values(&row).execute(conn)?;
            let accused_id = last_insert_rowid(conn)?;

            record_audit(conn, actor.user_id, "ACCUSED_ADDED", "ACCUSED", accused_id)?;

            let stored = accused::table.find(accused_id).first::<Accused>(conn)?;
            Ok(stored)
        })
    }

    /// Update an accused person's disposition
    pub fn update_accused_status(
        &self,
        actor: &Actor,
        accused_id: i32,
        status: AccusedStatus,
    ) -> Result<Accused> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let row = accused::table
                .find(accused_id)
                .first::<Accused>(conn)
                .optional()?
                .ok_or_else(|| DbError::NotFound("Accused not found".to_string()))?;
            ensure_assigned(conn, row.case_id, actor.user_id)?;

            diesel::update(accused::table.find(accused_id))
                .set(accused::status.eq(status.as_str()))
                .execute(conn)?;

            record_audit(
                conn,
                actor.user_id,
                "ACCUSED_STATUS_UPDATED",
                "ACCUSED",
                accused_id,
            )?;

            let stored = accused::table.find(accused_id).first::<Accused>(conn)?;
            Ok(stored)
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn investigation_events(
        &self,
        actor: &Actor,
        case_id: i32,
    ) -> Result<Vec<InvestigationEvent>> {
        let mut conn = self.get_conn()?;
        verify_read_access(&mut conn, actor, case_id)?;
        let rows = investigation_events::table
            .filter(investigation_events::case_id.eq(case_id))
            .order(investigation_events::id.desc())
            .load::<InvestigationEvent>(&mut conn)?;
        Ok(rows)
    }

    pub fn evidence_for_case(&self, actor: &Actor, case_id: i32) -> Result<Vec<Evidence>> {
        let mut conn = self.get_conn()?;
        verify_read_access(&mut conn, actor, case_id)?;
        let rows = evidence::table
            .filter(evidence::case_id.eq(case_id))
            .order(evidence::id.desc())
            .load::<Evidence>(&mut conn)?;
        Ok(rows)
    }

    pub fn witnesses_for_case(&self, actor: &Actor, case_id: i32) -> Result<Vec<Witness>> {
        let mut conn = self.get_conn()?;
        verify_read_access(&mut conn, actor, case_id)?;
        let rows = witnesses::table
            .filter(witnesses::case_id.eq(case_id))
            .order(witnesses::id.desc())
            .load::<Witness>(&mut conn)?;
        Ok(rows)
    }

    pub fn accused_for_case(&self, actor: &Actor, case_id: i32) -> Result<Vec<Accused>> {
        let mut conn = self.get_conn()?;
        verify_read_access(&mut conn, actor, case_id)?;
        let rows = accused::table
            .filter(accused::case_id.eq(case_id))
            .order(accused::id.desc())
            .load::<Accused>(&mut conn)?;
        Ok(rows)
    }
}
