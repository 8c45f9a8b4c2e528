//! Court Submission Ledger and Court Action Log
//!
//! Each submission of a case to a court gets a gapless, monotonically
//! increasing version number, preserved across rejections and reopens. The
//! version is computed inside the submitting transaction and backed by a
//! unique index on (case_id, submission_version).

use crate::db::{last_insert_rowid, now, record_audit, Database, DbError, Result};
use crate::lifecycle::{self, legal_sources, CaseState};
use crate::org::{Actor, Role};
use crate::schema::*;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Status of one submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SubmissionStatus {
    Submitted,
    Accepted,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "SUBMITTED",
            SubmissionStatus::Accepted => "ACCEPTED",
            SubmissionStatus::Rejected => "REJECTED",
        }
    }
}

/// Judicial action recorded against a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CourtActionType {
    Cognizance,
    Hearing,
    Summons,
    Warrant,
    BailOrder,
    Judgment,
}

impl CourtActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourtActionType::Cognizance => "COGNIZANCE",
            CourtActionType::Hearing => "HEARING",
            CourtActionType::Summons => "SUMMONS",
            CourtActionType::Warrant => "WARRANT",
            CourtActionType::BailOrder => "BAIL_ORDER",
            CourtActionType::Judgment => "JUDGMENT",
        }
    }

    pub fn parse(s: &str) -> Result<CourtActionType> {
        match s {
            "COGNIZANCE" => Ok(CourtActionType::Cognizance),
            "HEARING" => Ok(CourtActionType::Hearing),
            "SUMMONS" => Ok(CourtActionType::Summons),
            "WARRANT" => Ok(CourtActionType::Warrant),
            "BAIL_ORDER" => Ok(CourtActionType::BailOrder),
            "JUDGMENT" => Ok(CourtActionType::Judgment),
            other => Err(DbError::Validation(format!(
                "Unknown court action type: {}",
                other
            ))),
        }
    }

    /// Case state this action deterministically drives to, if any
    pub fn drives_state(&self) -> Option<CaseState> {
        match self {
            CourtActionType::Cognizance => Some(CaseState::TrialOngoing),
            CourtActionType::Judgment => Some(CaseState::JudgmentReserved),
            _ => None,
        }
    }
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable submission
#[derive(Insertable)]
#[diesel(table_name = court_submissions)]
pub struct NewSubmission<'a> {
    pub case_id: i32,
    pub submission_version: i32,
    pub submitted_by: i32,
    pub court_id: i32,
    pub status: &'a str,
    pub submitted_at: &'a str,
}

/// Queryable submission
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = court_submissions)]
pub struct CourtSubmission {
    pub id: i32,
    pub case_id: i32,
    pub submission_version: i32,
    pub submitted_by: i32,
    pub court_id: i32,
    pub status: String,
    pub submitted_at: String,
}

/// Insertable acknowledgement
#[derive(Insertable)]
#[diesel(table_name = acknowledgements)]
pub struct NewAcknowledgement<'a> {
    pub submission_id: i32,
    pub ack_number: &'a str,
    pub ack_time: &'a str,
}

/// Queryable acknowledgement (1:1 with an accepted submission)
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = acknowledgements)]
pub struct Acknowledgement {
    pub id: i32,
    pub submission_id: i32,
    pub ack_number: String,
    pub ack_time: String,
}

/// Insertable court action
#[derive(Insertable)]
#[diesel(table_name = court_actions)]
pub struct NewCourtAction<'a> {
    pub case_id: i32,
    pub action_type: &'a str,
    pub order_file_url: Option<&'a str>,
    pub action_date: &'a str,
    pub created_at: &'a str,
}

/// Queryable court action
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = court_actions)]
pub struct CourtAction {
    pub id: i32,
    pub case_id: i32,
    pub action_type: String,
    pub order_file_url: Option<String>,
    pub action_date: String,
    pub created_at: String,
}

// ============================================================================
// Shared loaders
// ============================================================================

/// Most recent submission of a case, any status
pub(crate) fn latest_submission(
    conn: &mut SqliteConnection,
    case_id: i32,
) -> Result<Option<CourtSubmission>> {
    let row = court_submissions::table
        .filter(court_submissions::case_id.eq(case_id))
        .order(court_submissions::submission_version.desc())
        .first::<CourtSubmission>(conn)
        .optional()?;
    Ok(row)
}

fn submission_with_status(
    conn: &mut SqliteConnection,
    case_id: i32,
    court_id: i32,
    status: SubmissionStatus,
) -> Result<Option<CourtSubmission>> {
    let row = court_submissions::table
        .filter(court_submissions::case_id.eq(case_id))
        .filter(court_submissions::court_id.eq(court_id))
        .filter(court_submissions::status.eq(status.as_str()))
        .order(court_submissions::submission_version.desc())
        .first::<CourtSubmission>(conn)
        .optional()?;
    Ok(row)
}

fn require_court_actor(actor: &Actor) -> Result<()> {
    if !actor.role.is_court_side() {
        return Err(DbError::Forbidden("Access denied".to_string()));
    }
    Ok(())
}

impl Database {
    /// Submit a case to a court.
    ///
    /// Police-side, scoped to the case's station. The submission version is
    /// the count of prior submissions plus one, computed inside the
    /// transaction so concurrent submitters cannot reuse a version.
    pub fn submit_to_court(&self, actor: &Actor, case_id: i32, court_id: i32) -> Result<CourtSubmission> {
        if !actor.role.is_police_side() {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        let mut conn = self.get_conn()?;

        let court_kind = organizations::table
            .find(court_id)
            .select(organizations::kind)
            .first::<String>(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::NotFound("Court not found".to_string()))?;
        if court_kind != "COURT" {
            return Err(DbError::Validation(
                "Target organization is not a court".to_string(),
            ));
        }

        conn.immediate_transaction::<_, DbError, _>(|conn| {
            crate::case::load_station_case(conn, actor, case_id)?;

            let prior: i64 = court_submissions::table
                .filter(court_submissions::case_id.eq(case_id))
                .count()
                .get_result(conn)?;
            let version = i32::try_from(prior)
                .map_err(|_| DbError::Consistency("Submission count overflow".to_string()))?
                + 1;

            let row = NewSubmission {
                case_id,
                submission_version: version,
                submitted_by: actor.user_id,
                court_id,
                status: SubmissionStatus::Submitted.as_str(),
                submitted_at: &now(),
            };
            diesel::insert_into(court_submissions::table)
                .values(&row)
                .execute(conn)?;
            let submission_id = last_insert_rowid(conn)?;

            lifecycle::transition_case(
                conn,
                case_id,
                legal_sources(CaseState::SubmittedToCourt),
                CaseState::SubmittedToCourt,
                "Submitted to court",
                actor.user_id,
            )?;
            record_audit(conn, actor.user_id, "SUBMITTED_TO_COURT", "CASE", case_id)?;

            let stored = court_submissions::table
                .find(submission_id)
                .first::<CourtSubmission>(conn)?;
            Ok(stored)
        })
    }

    /// Court accepts a submitted case, optionally issuing an acknowledgement
    pub fn intake_case(
        &self,
        actor: &Actor,
        case_id: i32,
        ack_number: Option<&str>,
    ) -> Result<()> {
        require_court_actor(actor)?;
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            crate::case::load_case(conn, case_id)?;
            let submission = submission_with_status(
                conn,
                case_id,
                actor.organization_id,
                SubmissionStatus::Submitted,
            )?
            .ok_or_else(|| {
                DbError::StateConflict("No pending submission for this court".to_string())
            })?;

            diesel::update(court_submissions::table.find(submission.id))
                .set(court_submissions::status.eq(SubmissionStatus::Accepted.as_str()))
                .execute(conn)?;

            if let Some(number) = ack_number {
                let ack = NewAcknowledgement {
                    submission_id: submission.id,
                    ack_number: number,
                    ack_time: &now(),
                };
                diesel::insert_into(acknowledgements::table)
                    .values(&ack)
                    .execute(conn)?;
            }

            lifecycle::transition_case(
                conn,
                case_id,
                legal_sources(CaseState::CourtAccepted),
                CaseState::CourtAccepted,
                "Case accepted by court",
                actor.user_id,
            )?;
            record_audit(conn, actor.user_id, "COURT_INTAKE", "CASE", case_id)?;
            Ok(())
        })
    }

    /// Court rejects a submitted case, returning it to the station for
    /// resubmission
    pub fn reject_submission(&self, actor: &Actor, case_id: i32, reason: &str) -> Result<()> {
        require_court_actor(actor)?;
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            crate::case::load_case(conn, case_id)?;
            let submission = submission_with_status(
                conn,
                case_id,
                actor.organization_id,
                SubmissionStatus::Submitted,
            )?
            .ok_or_else(|| {
                DbError::StateConflict("No pending submission for this court".to_string())
            })?;

            diesel::update(court_submissions::table.find(submission.id))
                .set(court_submissions::status.eq(SubmissionStatus::Rejected.as_str()))
                .execute(conn)?;

            lifecycle::transition_case(
                conn,
                case_id,
                legal_sources(CaseState::ResubmittedToCourt),
                CaseState::ResubmittedToCourt,
                reason,
                actor.user_id,
            )?;
            record_audit(conn, actor.user_id, "SUBMISSION_REJECTED", "CASE", case_id)?;
            Ok(())
        })
    }

    /// Judge records a judicial action. COGNIZANCE and JUDGMENT drive the
    /// mapped state transition in the same transaction; other action types
    /// leave the case state untouched.
    pub fn record_court_action(
        &self,
        actor: &Actor,
        case_id: i32,
        action_type: CourtActionType,
        order_file_url: Option<&str>,
        action_date: &str,
    ) -> Result<CourtAction> {
        if actor.role != Role::Judge {
            return Err(DbError::Forbidden(
                "Only a judge can record court actions".to_string(),
            ));
        }
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            crate::case::load_case(conn, case_id)?;
            let accepted = submission_with_status(
                conn,
                case_id,
                actor.organization_id,
                SubmissionStatus::Accepted,
            )?;
            if accepted.is_none() {
                return Err(DbError::Forbidden(
                    "Case is not under this court".to_string(),
                ));
            }

            let row = NewCourtAction {
                case_id,
                action_type: action_type.as_str(),
                order_file_url,
                action_date,
                created_at: &now(),
            };
            diesel::insert_into(court_actions::table)
                .values(&row)
                .execute(conn)?;
            let action_id = last_insert_rowid(conn)?;

            if let Some(to) = action_type.drives_state() {
                lifecycle::transition_case(
                    conn,
                    case_id,
                    legal_sources(to),
                    to,
                    &format!("Court action: {}", action_type.as_str()),
                    actor.user_id,
                )?;
            }

            record_audit(
                conn,
                actor.user_id,
                "COURT_ACTION_CREATED",
                "COURT_ACTION",
                action_id,
            )?;

            let stored = court_actions::table
                .find(action_id)
                .first::<CourtAction>(conn)?;
            Ok(stored)
        })
    }

    /// Actions recorded against a case, newest action date first. Court-side
    /// only, and only for courts the case was submitted to.
    pub fn court_actions(&self, actor: &Actor, case_id: i32) -> Result<Vec<CourtAction>> {
        require_court_actor(actor)?;
        let mut conn = self.get_conn()?;
        crate::case::load_case(&mut conn, case_id)?;
        let any_submission: i64 = court_submissions::table
            .filter(court_submissions::case_id.eq(case_id))
            .filter(court_submissions::court_id.eq(actor.organization_id))
            .count()
            .get_result(&mut conn)?;
        if any_submission == 0 {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        let rows = court_actions::table
            .filter(court_actions::case_id.eq(case_id))
            .order(court_actions::action_date.desc())
            .load::<CourtAction>(&mut conn)?;
        Ok(rows)
    }

    /// Submission ledger for a case, version order
    pub fn submissions(&self, case_id: i32) -> Result<Vec<CourtSubmission>> {
        let mut conn = self.get_conn()?;
        let rows = court_submissions::table
            .filter(court_submissions::case_id.eq(case_id))
            .order(court_submissions::submission_version.asc())
            .load::<CourtSubmission>(&mut conn)?;
        Ok(rows)
    }

    /// Acknowledgement for a submission, if the court issued one
    pub fn acknowledgement(&self, submission_id: i32) -> Result<Option<Acknowledgement>> {
        let mut conn = self.get_conn()?;
        let row = acknowledgements::table
            .filter(acknowledgements::submission_id.eq(submission_id))
            .first::<Acknowledgement>(&mut conn)
            .optional()?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_state_mapping() {
        assert_eq!(
            CourtActionType::Cognizance.drives_state(),
            Some(CaseState::TrialOngoing)
        );
        assert_eq!(
            CourtActionType::Judgment.drives_state(),
            Some(CaseState::JudgmentReserved)
        );
        assert_eq!(CourtActionType::Hearing.drives_state(), None);
        assert_eq!(CourtActionType::Summons.drives_state(), None);
    }

    #[test]
    fn test_action_type_round_trip() {
        for t in [
            CourtActionType::Cognizance,
            CourtActionType::Hearing,
            CourtActionType::Summons,
            CourtActionType::Warrant,
            CourtActionType::BailOrder,
            CourtActionType::Judgment,
        ] {
            assert_eq!(CourtActionType::parse(t.as_str()).unwrap(), t);
        }
        assert!(CourtActionType::parse("ADJOURNMENT").is_err());
    }
}
