//! Case records, the assignment tracker and the police-side use cases.
//!
//! The assignment tracker maintains the single active officer assignment per
//! case: re-assignment soft-closes every active row and inserts a fresh one
//! in the same transaction, so at most one row per case ever has
//! `unassigned_at IS NULL` (backed by a partial unique index).

use crate::db::{last_insert_rowid, now, record_audit, Database, DbError, Result};
use crate::fir::Fir;
use crate::lifecycle::{self, legal_sources, CaseState, StateHistoryEntry};
use crate::org::{Actor, Role};
use crate::schema::*;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable case
#[derive(Insertable)]
#[diesel(table_name = cases)]
pub struct NewCase<'a> {
    pub case_number: &'a str,
    pub fir_id: i32,
    pub is_archived: bool,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Queryable case
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = cases)]
pub struct Case {
    pub id: i32,
    pub case_number: String,
    pub fir_id: i32,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Insertable assignment
#[derive(Insertable)]
#[diesel(table_name = case_assignments)]
pub struct NewAssignment<'a> {
    pub case_id: i32,
    pub assigned_to: i32,
    pub assigned_by: i32,
    pub assignment_reason: &'a str,
    pub assigned_at: &'a str,
    pub unassigned_at: Option<&'a str>,
}

/// Queryable assignment
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = case_assignments)]
pub struct CaseAssignment {
    pub id: i32,
    pub case_id: i32,
    pub assigned_to: i32,
    pub assigned_by: i32,
    pub assignment_reason: String,
    pub assigned_at: String,
    pub unassigned_at: Option<String>,
}

/// Everything a caller usually wants about one case
#[derive(Debug, Clone, serde::Serialize)]
pub struct CaseDetail {
    pub case: Case,
    pub fir: Fir,
    pub current_state: CaseState,
    pub active_assignment: Option<CaseAssignment>,
    pub recent_history: Vec<StateHistoryEntry>,
}

/// One row of a case listing
#[derive(Debug, Clone, serde::Serialize)]
pub struct CaseSummary {
    pub case: Case,
    pub current_state: CaseState,
    pub assigned_to: Option<i32>,
}

// ============================================================================
// Shared loaders - crate-internal, run on the caller's connection so access
// checks and the writes they guard share one transaction when needed
// ============================================================================

pub(crate) fn load_case(conn: &mut SqliteConnection, case_id: i32) -> Result<Case> {
    cases::table
        .find(case_id)
        .first::<Case>(conn)
        .optional()?
        .ok_or_else(|| DbError::NotFound("Case not found".to_string()))
}

/// Police station a case belongs to, through its FIR
pub(crate) fn case_station(conn: &mut SqliteConnection, case: &Case) -> Result<i32> {
    let station = firs::table
        .find(case.fir_id)
        .select(firs::police_station_id)
        .first::<i32>(conn)
        .optional()?
        .ok_or_else(|| DbError::Consistency(format!("Case {} has no FIR", case.id)))?;
    Ok(station)
}

/// Load a case and require the police-side actor to belong to its station
pub(crate) fn load_station_case(
    conn: &mut SqliteConnection,
    actor: &Actor,
    case_id: i32,
) -> Result<Case> {
    let case = load_case(conn, case_id)?;
    if case_station(conn, &case)? != actor.organization_id {
        return Err(DbError::Forbidden("Access denied".to_string()));
    }
    Ok(case)
}

/// The zero-or-one active assignment. More than one active row means a prior
/// atomicity bug and is surfaced as a fatal consistency error.
pub(crate) fn active_assignment_row(
    conn: &mut SqliteConnection,
    case_id: i32,
) -> Result<Option<CaseAssignment>> {
    let mut rows = case_assignments::table
        .filter(case_assignments::case_id.eq(case_id))
        .filter(case_assignments::unassigned_at.is_null())
        .load::<CaseAssignment>(conn)?;
    if rows.len() > 1 {
        return Err(DbError::Consistency(format!(
            "Case {} has {} active assignments",
            case_id,
            rows.len()
        )));
    }
    Ok(rows.pop())
}

/// Most recent assignment regardless of whether it is still active
pub(crate) fn latest_assignment_row(
    conn: &mut SqliteConnection,
    case_id: i32,
) -> Result<Option<CaseAssignment>> {
    let row = case_assignments::table
        .filter(case_assignments::case_id.eq(case_id))
        .order(case_assignments::id.desc())
        .first::<CaseAssignment>(conn)
        .optional()?;
    Ok(row)
}

/// Require the actor to hold the active assignment on the case
pub(crate) fn ensure_assigned(
    conn: &mut SqliteConnection,
    case_id: i32,
    user_id: i32,
) -> Result<CaseAssignment> {
    match active_assignment_row(conn, case_id)? {
        Some(a) if a.assigned_to == user_id => Ok(a),
        _ => Err(DbError::Forbidden(
            "Case is not assigned to you".to_string(),
        )),
    }
}

/// Soft-close every active assignment row for a case
pub(crate) fn close_active_assignments(conn: &mut SqliteConnection, case_id: i32) -> Result<()> {
    diesel::update(
        case_assignments::table
            .filter(case_assignments::case_id.eq(case_id))
            .filter(case_assignments::unassigned_at.is_null()),
    )
    .set(case_assignments::unassigned_at.eq(now()))
    .execute(conn)?;
    Ok(())
}

/// Insert a fresh active assignment row
pub(crate) fn insert_assignment(
    conn: &mut SqliteConnection,
    case_id: i32,
    assigned_to: i32,
    assigned_by: i32,
    reason: &str,
) -> Result<i32> {
    let row = NewAssignment {
        case_id,
        assigned_to,
        assigned_by,
        assignment_reason: reason,
        assigned_at: &now(),
        unassigned_at: None,
    };
    diesel::insert_into(case_assignments::table)
        .values(&row)
        .execute(conn)?;
    last_insert_rowid(conn)
}

impl Database {
    // ========================================================================
    // Assignment Tracker
    // ========================================================================

    /// Assign a case to an officer.
    ///
    /// SHO of the case's station only. Always soft-closes the previous active
    /// assignment and inserts a new row, even when re-assigning to the same
    /// officer, and drives the case to CASE_ASSIGNED.
    pub fn assign_case(
        &self,
        actor: &Actor,
        case_id: i32,
        assigned_to: i32,
        reason: &str,
    ) -> Result<CaseAssignment> {
        if actor.role != Role::Sho {
            return Err(DbError::Forbidden("Only an SHO can assign cases".to_string()));
        }
        let mut conn = self.get_conn()?;

        // Assignee must be an active officer of the same station
        let assignee = users::table
            .find(assigned_to)
            .first::<crate::org::User>(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::NotFound("Assignee not found".to_string()))?;
        if assignee.organization_id != actor.organization_id || !assignee.is_active {
            return Err(DbError::Forbidden(
                "Assignee is not an active officer of this station".to_string(),
            ));
        }

        conn.immediate_transaction::<_, DbError, _>(|conn| {
            load_station_case(conn, actor, case_id)?;
            close_active_assignments(conn, case_id)?;
            let assignment_id = insert_assignment(conn, case_id, assigned_to, actor.user_id, reason)?;
            lifecycle::transition_case(
                conn,
                case_id,
                legal_sources(CaseState::CaseAssigned),
                CaseState::CaseAssigned,
                reason,
                actor.user_id,
            )?;
            record_audit(conn, actor.user_id, "CASE_ASSIGNED", "CASE", case_id)?;

            let row = case_assignments::table
                .find(assignment_id)
                .first::<CaseAssignment>(conn)?;
            Ok(row)
        })
    }

    /// The single active assignment, if any
    pub fn active_assignment(&self, case_id: i32) -> Result<Option<CaseAssignment>> {
        let mut conn = self.get_conn()?;
        active_assignment_row(&mut conn, case_id)
    }

    /// Full assignment history, newest first
    pub fn assignment_history(&self, case_id: i32) -> Result<Vec<CaseAssignment>> {
        let mut conn = self.get_conn()?;
        let rows = case_assignments::table
            .filter(case_assignments::case_id.eq(case_id))
            .order(case_assignments::id.desc())
            .load::<CaseAssignment>(&mut conn)?;
        Ok(rows)
    }

    // ========================================================================
    // Police-side lifecycle use cases
    // ========================================================================

    /// Assigned officer starts the investigation
    pub fn start_investigation(&self, actor: &Actor, case_id: i32) -> Result<()> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            load_station_case(conn, actor, case_id)?;
            ensure_assigned(conn, case_id, actor.user_id)?;
            lifecycle::transition_case(
                conn,
                case_id,
                legal_sources(CaseState::UnderInvestigation),
                CaseState::UnderInvestigation,
                "Investigation started by assigned officer",
                actor.user_id,
            )?;
            record_audit(conn, actor.user_id, "INVESTIGATION_STARTED", "CASE", case_id)?;
            Ok(())
        })
    }

    /// Assigned officer marks the investigation complete
    pub fn complete_investigation(&self, actor: &Actor, case_id: i32) -> Result<()> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            load_station_case(conn, actor, case_id)?;
            ensure_assigned(conn, case_id, actor.user_id)?;
            lifecycle::transition_case(
                conn,
                case_id,
                legal_sources(CaseState::InvestigationCompleted),
                CaseState::InvestigationCompleted,
                "Investigation marked as complete by investigating officer",
                actor.user_id,
            )?;
            record_audit(conn, actor.user_id, "INVESTIGATION_COMPLETED", "CASE", case_id)?;
            Ok(())
        })
    }

    /// Record that the charge sheet is ready for submission
    pub fn prepare_charge_sheet(&self, actor: &Actor, case_id: i32) -> Result<()> {
        if !actor.role.is_police_side() {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            load_station_case(conn, actor, case_id)?;
            lifecycle::transition_case(
                conn,
                case_id,
                legal_sources(CaseState::ChargeSheetPrepared),
                CaseState::ChargeSheetPrepared,
                "Charge sheet prepared",
                actor.user_id,
            )?;
            record_audit(conn, actor.user_id, "CHARGE_SHEET_PREPARED", "CASE", case_id)?;
            Ok(())
        })
    }

    /// Archive a case. Legal from any post-investigation state; the only way
    /// back out is an approved reopen request.
    pub fn archive_case(&self, actor: &Actor, case_id: i32, reason: &str) -> Result<()> {
        if actor.role != Role::Sho && !actor.role.is_court_side() {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let case = load_case(conn, case_id)?;
            if actor.role == Role::Sho && case_station(conn, &case)? != actor.organization_id {
                return Err(DbError::Forbidden("Access denied".to_string()));
            }
            lifecycle::transition_case(
                conn,
                case_id,
                legal_sources(CaseState::Archived),
                CaseState::Archived,
                reason,
                actor.user_id,
            )?;
            diesel::update(cases::table.find(case_id))
                .set((cases::is_archived.eq(true), cases::updated_at.eq(now())))
                .execute(conn)?;
            close_active_assignments(conn, case_id)?;
            record_audit(conn, actor.user_id, "CASE_ARCHIVED", "CASE", case_id)?;
            Ok(())
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// One case with its FIR, state, active assignment and recent history.
    /// Police-side actors only see cases of their own station.
    pub fn get_case(&self, actor: &Actor, case_id: i32) -> Result<CaseDetail> {
        let mut conn = self.get_conn()?;
        let case = load_case(&mut conn, case_id)?;
        let fir = firs::table
            .find(case.fir_id)
            .first::<Fir>(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::Consistency(format!("Case {} has no FIR", case.id)))?;
        if actor.role.is_police_side() && fir.police_station_id != actor.organization_id {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }

        let current_state = lifecycle::load_state(&mut conn, case_id)?;
        let active_assignment = active_assignment_row(&mut conn, case_id)?;
        let recent_history = case_state_history::table
            .filter(case_state_history::case_id.eq(case_id))
            .order(case_state_history::id.desc())
            .limit(10)
            .load::<StateHistoryEntry>(&mut conn)?;

        Ok(CaseDetail {
            case,
            fir,
            current_state,
            active_assignment,
            recent_history,
        })
    }

    /// Cases where the officer currently holds the active assignment
    pub fn my_cases(&self, actor: &Actor, limit: i64, offset: i64) -> Result<Vec<CaseSummary>> {
        let mut conn = self.get_conn()?;
        let case_ids = case_assignments::table
            .filter(case_assignments::assigned_to.eq(actor.user_id))
            .filter(case_assignments::unassigned_at.is_null())
            .select(case_assignments::case_id)
            .load::<i32>(&mut conn)?;
        let rows = cases::table
            .filter(cases::id.eq_any(case_ids))
            .order(cases::id.desc())
            .limit(limit)
            .offset(offset)
            .load::<Case>(&mut conn)?;
        summarize(&mut conn, rows)
    }

    /// All cases of a police station, newest first
    pub fn station_cases(&self, actor: &Actor, limit: i64, offset: i64) -> Result<Vec<CaseSummary>> {
        if !actor.role.is_police_side() {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        let mut conn = self.get_conn()?;
        let fir_ids = firs::table
            .filter(firs::police_station_id.eq(actor.organization_id))
            .select(firs::id)
            .load::<i32>(&mut conn)?;
        let rows = cases::table
            .filter(cases::fir_id.eq_any(fir_ids))
            .order(cases::id.desc())
            .limit(limit)
            .offset(offset)
            .load::<Case>(&mut conn)?;
        summarize(&mut conn, rows)
    }
}

fn summarize(conn: &mut SqliteConnection, rows: Vec<Case>) -> Result<Vec<CaseSummary>> {
    let mut out = Vec::with_capacity(rows.len());
    for case in rows {
        let current_state = lifecycle::load_state(conn, case.id)?;
        let assigned_to = active_assignment_row(conn, case.id)?.map(|a| a.assigned_to);
        out.push(CaseSummary {
            case,
            current_state,
            assigned_to,
        });
    }
    Ok(out)
}
