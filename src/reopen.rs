//! Case Reopen workflow
//!
//! An archived case can only come back to life through this pipeline: the
//! officer who last held the case requests a reopen, and a judge of the court
//! the case was last submitted to approves or rejects. Approval un-archives
//! the case, moves it to UNDER_INVESTIGATION and re-creates the assignment to
//! that same officer, all in one transaction. At most one request per case is
//! pending at any time (partial unique index backs the check).

use crate::case::{close_active_assignments, insert_assignment, latest_assignment_row, load_case};
use crate::court::latest_submission;
use crate::db::{last_insert_rowid, now, record_audit, Database, DbError, Result};
use crate::lifecycle::{self, CaseState};
use crate::org::{Actor, Role};
use crate::schema::*;
use crate::workflow::{
    advance, REOPEN_APPROVED, REOPEN_REJECTED, REOPEN_REQUESTED, REOPEN_RULES,
};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable reopen request
#[derive(Insertable)]
#[diesel(table_name = case_reopen_requests)]
pub struct NewReopenRequest<'a> {
    pub case_id: i32,
    pub requested_by: i32,
    pub police_reason: &'a str,
    pub status: &'a str,
    pub created_at: &'a str,
}

/// Queryable reopen request
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = case_reopen_requests)]
pub struct ReopenRequest {
    pub id: i32,
    pub case_id: i32,
    pub requested_by: i32,
    pub police_reason: String,
    pub status: String,
    pub reviewed_by: Option<i32>,
    pub judge_note: Option<String>,
    pub decided_at: Option<String>,
    pub created_at: String,
}

fn load_request(conn: &mut SqliteConnection, request_id: i32) -> Result<ReopenRequest> {
    case_reopen_requests::table
        .find(request_id)
        .first::<ReopenRequest>(conn)
        .optional()?
        .ok_or_else(|| DbError::NotFound("Reopen request not found".to_string()))
}

/// Require the judge's court to match the case's latest submission
fn ensure_latest_court(conn: &mut SqliteConnection, case_id: i32, court_id: i32) -> Result<()> {
    match latest_submission(conn, case_id)? {
        Some(sub) if sub.court_id == court_id => Ok(()),
        _ => Err(DbError::Forbidden("Access denied".to_string())),
    }
}

impl Database {
    /// Officer asks to reopen an archived case they last held
    pub fn request_reopen(
        &self,
        actor: &Actor,
        case_id: i32,
        police_reason: &str,
    ) -> Result<ReopenRequest> {
        if actor.role != Role::Police {
            return Err(DbError::Forbidden(
                "Only a police officer can request a reopen".to_string(),
            ));
        }
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let case = load_case(conn, case_id)?;
            let state = lifecycle::load_state(conn, case_id)?;
            if !case.is_archived || state != CaseState::Archived {
                return Err(DbError::Validation("Case is not archived".to_string()));
            }

            // The most recent holder keeps standing even though archiving
            // closed the assignment
            match latest_assignment_row(conn, case_id)? {
                Some(a) if a.assigned_to == actor.user_id => {}
                _ => {
                    return Err(DbError::Forbidden(
                        "Case was not assigned to you".to_string(),
                    ))
                }
            }

            let pending: i64 = case_reopen_requests::table
                .filter(case_reopen_requests::case_id.eq(case_id))
                .filter(case_reopen_requests::status.eq(REOPEN_REQUESTED))
                .count()
                .get_result(conn)?;
            if pending > 0 {
                return Err(DbError::StateConflict(
                    "There is already a pending reopen request for this case".to_string(),
                ));
            }

            let row = NewReopenRequest {
                case_id,
                requested_by: actor.user_id,
                police_reason,
                status: REOPEN_REQUESTED,
                created_at: &now(),
            };
            diesel::insert_into(case_reopen_requests::table)
                .values(&row)
                .execute(conn)?;
            let request_id = last_insert_rowid(conn)?;

            record_audit(
                conn,
                actor.user_id,
                "CASE_REOPEN_REQUESTED",
                "CASE_REOPEN_REQUEST",
                request_id,
            )?;

            let stored = case_reopen_requests::table
                .find(request_id)
                .first::<ReopenRequest>(conn)?;
            Ok(stored)
        })
    }

    /// Requests filed by this user, newest first
    pub fn my_reopen_requests(&self, actor: &Actor) -> Result<Vec<ReopenRequest>> {
        let mut conn = self.get_conn()?;
        let rows = case_reopen_requests::table
            .filter(case_reopen_requests::requested_by.eq(actor.user_id))
            .order(case_reopen_requests::id.desc())
            .load::<ReopenRequest>(&mut conn)?;
        Ok(rows)
    }

    /// Pending requests for cases submitted to the judge's court
    pub fn pending_reopens_for_judge(&self, actor: &Actor) -> Result<Vec<ReopenRequest>> {
        if actor.role != Role::Judge {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        let mut conn = self.get_conn()?;
        let pending = case_reopen_requests::table
            .filter(case_reopen_requests::status.eq(REOPEN_REQUESTED))
            .order(case_reopen_requests::id.desc())
            .load::<ReopenRequest>(&mut conn)?;
        let mut out = Vec::new();
        for req in pending {
            let seen: i64 = court_submissions::table
                .filter(court_submissions::case_id.eq(req.case_id))
                .filter(court_submissions::court_id.eq(actor.organization_id))
                .count()
                .get_result(&mut conn)?;
            if seen > 0 {
                out.push(req);
            }
        }
        Ok(out)
    }

    /// Judge approves a reopen: request APPROVED, case un-archived and back
    /// under investigation, assignment restored to the officer who last held
    /// it. One transaction, three audit entries.
    pub fn approve_reopen(
        &self,
        actor: &Actor,
        request_id: i32,
        judge_note: &str,
    ) -> Result<ReopenRequest> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let req = load_request(conn, request_id)?;
            advance(REOPEN_RULES, &req.status, REOPEN_APPROVED, actor.role)?;
            ensure_latest_court(conn, req.case_id, actor.organization_id)?;

            let ts = now();
            diesel::update(case_reopen_requests::table.find(request_id))
                .set((
                    case_reopen_requests::status.eq(REOPEN_APPROVED),
                    case_reopen_requests::reviewed_by.eq(actor.user_id),
                    case_reopen_requests::judge_note.eq(judge_note),
                    case_reopen_requests::decided_at.eq(&ts),
                ))
                .execute(conn)?;

            diesel::update(cases::table.find(req.case_id))
                .set((cases::is_archived.eq(false), cases::updated_at.eq(&ts)))
                .execute(conn)?;

            // The one legal exit from ARCHIVED
            lifecycle::transition_case(
                conn,
                req.case_id,
                &[CaseState::Archived],
                CaseState::UnderInvestigation,
                "Re-opened by court",
                actor.user_id,
            )?;

            // Hand the case back to the officer who last held it
            if let Some(last) = latest_assignment_row(conn, req.case_id)? {
                close_active_assignments(conn, req.case_id)?;
                insert_assignment(
                    conn,
                    req.case_id,
                    last.assigned_to,
                    actor.user_id,
                    "Re-opened by court",
                )?;
                record_audit(conn, actor.user_id, "CASE_ASSIGNED", "CASE", req.case_id)?;
            }

            record_audit(
                conn,
                actor.user_id,
                "CASE_REOPEN_APPROVED",
                "CASE_REOPEN_REQUEST",
                request_id,
            )?;
            record_audit(conn, actor.user_id, "CASE_REOPENED", "CASE", req.case_id)?;

            let stored = case_reopen_requests::table
                .find(request_id)
                .first::<ReopenRequest>(conn)?;
            Ok(stored)
        })
    }

    /// Judge rejects a reopen request; the case stays archived
    pub fn reject_reopen(
        &self,
        actor: &Actor,
        request_id: i32,
        reason: &str,
    ) -> Result<ReopenRequest> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let req = load_request(conn, request_id)?;
            advance(REOPEN_RULES, &req.status, REOPEN_REJECTED, actor.role)?;
            ensure_latest_court(conn, req.case_id, actor.organization_id)?;

            diesel::update(case_reopen_requests::table.find(request_id))
                .set((
                    case_reopen_requests::status.eq(REOPEN_REJECTED),
                    case_reopen_requests::reviewed_by.eq(actor.user_id),
                    case_reopen_requests::judge_note.eq(reason),
                    case_reopen_requests::decided_at.eq(now()),
                ))
                .execute(conn)?;

            record_audit(
                conn,
                actor.user_id,
                "CASE_REOPEN_REJECTED",
                "CASE_REOPEN_REQUEST",
                request_id,
            )?;

            let stored = case_reopen_requests::table
                .find(request_id)
                .first::<ReopenRequest>(conn)?;
            Ok(stored)
        })
    }
}
