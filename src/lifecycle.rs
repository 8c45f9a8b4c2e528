//! Case State Machine
//!
//! One authoritative `current_case_state` row per case, mutated only through
//! [`transition_case`], which re-reads the current state on the caller's
//! connection so the history row always records the true prior state even
//! under concurrent load. History is append-only.

use crate::db::{now, record_audit, Database, DbError, Result};
use crate::schema::*;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Lifecycle state of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CaseState {
    FirRegistered,
    CaseAssigned,
    UnderInvestigation,
    InvestigationCompleted,
    ChargeSheetPrepared,
    ResubmittedToCourt,
    SubmittedToCourt,
    CourtAccepted,
    TrialOngoing,
    JudgmentReserved,
    Archived,
}

/// All states, in rough lifecycle order
pub const ALL_STATES: [CaseState; 11] = [
    CaseState::FirRegistered,
    CaseState::CaseAssigned,
    CaseState::UnderInvestigation,
    CaseState::InvestigationCompleted,
    CaseState::ChargeSheetPrepared,
    CaseState::ResubmittedToCourt,
    CaseState::SubmittedToCourt,
    CaseState::CourtAccepted,
    CaseState::TrialOngoing,
    CaseState::JudgmentReserved,
    CaseState::Archived,
];

impl CaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseState::FirRegistered => "FIR_REGISTERED",
            CaseState::CaseAssigned => "CASE_ASSIGNED",
            CaseState::UnderInvestigation => "UNDER_INVESTIGATION",
            CaseState::InvestigationCompleted => "INVESTIGATION_COMPLETED",
            CaseState::ChargeSheetPrepared => "CHARGE_SHEET_PREPARED",
            CaseState::ResubmittedToCourt => "RESUBMITTED_TO_COURT",
            CaseState::SubmittedToCourt => "SUBMITTED_TO_COURT",
            CaseState::CourtAccepted => "COURT_ACCEPTED",
            CaseState::TrialOngoing => "TRIAL_ONGOING",
            CaseState::JudgmentReserved => "JUDGMENT_RESERVED",
            CaseState::Archived => "ARCHIVED",
        }
    }

    pub fn parse(s: &str) -> Result<CaseState> {
        ALL_STATES
            .iter()
            .find(|state| state.as_str() == s)
            .copied()
            .ok_or_else(|| DbError::Validation(format!("Unknown case state: {}", s)))
    }

    /// States a case can be archived from: everything once the investigation
    /// has concluded.
    pub fn post_investigation(&self) -> bool {
        matches!(
            self,
            CaseState::InvestigationCompleted
                | CaseState::ChargeSheetPrepared
                | CaseState::ResubmittedToCourt
                | CaseState::SubmittedToCourt
                | CaseState::CourtAccepted
                | CaseState::TrialOngoing
                | CaseState::JudgmentReserved
        )
    }
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal source states per target, for transitions driven by the use cases in
/// this crate. Each use case passes its own slice to [`transition_case`]; this
/// table is the reference the slices are drawn from.
pub fn legal_sources(to: CaseState) -> &'static [CaseState] {
    match to {
        CaseState::FirRegistered => &[],
        CaseState::CaseAssigned => &[
            CaseState::FirRegistered,
            CaseState::CaseAssigned,
            CaseState::UnderInvestigation,
        ],
        CaseState::UnderInvestigation => &[CaseState::CaseAssigned],
        CaseState::InvestigationCompleted => {
            &[CaseState::CaseAssigned, CaseState::UnderInvestigation]
        }
        CaseState::ChargeSheetPrepared => &[CaseState::InvestigationCompleted],
        CaseState::ResubmittedToCourt => &[CaseState::SubmittedToCourt],
        CaseState::SubmittedToCourt => &[
            CaseState::InvestigationCompleted,
            CaseState::ChargeSheetPrepared,
            CaseState::ResubmittedToCourt,
        ],
        CaseState::CourtAccepted => &[CaseState::SubmittedToCourt],
        CaseState::TrialOngoing => &[CaseState::CourtAccepted],
        CaseState::JudgmentReserved => &[CaseState::CourtAccepted, CaseState::TrialOngoing],
        CaseState::Archived => &[
            CaseState::InvestigationCompleted,
            CaseState::ChargeSheetPrepared,
            CaseState::ResubmittedToCourt,
            CaseState::SubmittedToCourt,
            CaseState::CourtAccepted,
            CaseState::TrialOngoing,
            CaseState::JudgmentReserved,
        ],
    }
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Queryable current state row (one per case)
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = current_case_state)]
pub struct CurrentCaseState {
    pub case_id: i32,
    pub current_state: String,
    pub updated_at: String,
}

/// Insertable current state row
#[derive(Insertable)]
#[diesel(table_name = current_case_state)]
pub struct NewCurrentCaseState<'a> {
    pub case_id: i32,
    pub current_state: &'a str,
    pub updated_at: &'a str,
}

/// Insertable history row
#[derive(Insertable)]
#[diesel(table_name = case_state_history)]
pub struct NewStateHistory<'a> {
    pub case_id: i32,
    pub from_state: &'a str,
    pub to_state: &'a str,
    pub changed_by: i32,
    pub change_reason: &'a str,
    pub changed_at: &'a str,
}

/// Queryable history row
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = case_state_history)]
pub struct StateHistoryEntry {
    pub id: i32,
    pub case_id: i32,
    pub from_state: String,
    pub to_state: String,
    pub changed_by: i32,
    pub change_reason: String,
    pub changed_at: String,
}

// ============================================================================
// Transition core
// ============================================================================

/// Read the authoritative state for a case on this connection
pub(crate) fn load_state(conn: &mut SqliteConnection, case_id: i32) -> Result<CaseState> {
    let row = current_case_state::table
        .find(case_id)
        .first::<CurrentCaseState>(conn)
        .optional()?
        .ok_or_else(|| DbError::NotFound("Case not found".to_string()))?;
    CaseState::parse(&row.current_state)
}

/// Move a case to `to`, recording history and an audit entry.
///
/// Must be called inside the use case's transaction: the prior state is read
/// on the same connection, so the history row cannot skip an intermediate
/// state that a concurrent writer committed. Fails with `StateConflict` when
/// the loaded state is not in `allowed_from`. Returns the prior state.
pub(crate) fn transition_case(
    conn: &mut SqliteConnection,
    case_id: i32,
    allowed_from: &[CaseState],
    to: CaseState,
    reason: &str,
    actor_id: i32,
) -> Result<CaseState> {
    let from = load_state(conn, case_id)?;
    if !allowed_from.contains(&from) {
        return Err(DbError::StateConflict(format!(
            "Cannot move case to {} from state: {}",
            to, from
        )));
    }

    let ts = now();
    diesel::update(current_case_state::table.find(case_id))
        .set((
            current_case_state::current_state.eq(to.as_str()),
            current_case_state::updated_at.eq(&ts),
        ))
        .execute(conn)?;

    let history = NewStateHistory {
        case_id,
        from_state: from.as_str(),
        to_state: to.as_str(),
        changed_by: actor_id,
        change_reason: reason,
        changed_at: &ts,
    };
    diesel::insert_into(case_state_history::table)
        .values(&history)
        .execute(conn)?;

    record_audit(conn, actor_id, "STATE_CHANGED", "CASE", case_id)?;
    Ok(from)
}

/// Seed the state row for a freshly registered case
pub(crate) fn init_state(conn: &mut SqliteConnection, case_id: i32) -> Result<()> {
    let row = NewCurrentCaseState {
        case_id,
        current_state: CaseState::FirRegistered.as_str(),
        updated_at: &now(),
    };
    diesel::insert_into(current_case_state::table)
        .values(&row)
        .execute(conn)?;
    Ok(())
}

impl Database {
    /// Current state of a case
    pub fn case_state(&self, case_id: i32) -> Result<CaseState> {
        let mut conn = self.get_conn()?;
        load_state(&mut conn, case_id)
    }

    /// Full transition history of a case, oldest first
    pub fn state_history(&self, case_id: i32) -> Result<Vec<StateHistoryEntry>> {
        let mut conn = self.get_conn()?;
        let rows = case_state_history::table
            .filter(case_state_history::case_id.eq(case_id))
            .order(case_state_history::id.asc())
            .load::<StateHistoryEntry>(&mut conn)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_state_round_trip() {
        for state in ALL_STATES {
            assert_eq!(CaseState::parse(state.as_str()).unwrap(), state);
        }
        assert!(CaseState::parse("CLOSED").is_err());
    }

    #[test]
    fn test_no_sources_lead_into_fir_registered() {
        // FIR_REGISTERED is only ever seeded, never transitioned into
        assert!(legal_sources(CaseState::FirRegistered).is_empty());
    }

    #[test]
    fn test_archive_sources_are_post_investigation() {
        for from in legal_sources(CaseState::Archived) {
            assert!(from.post_investigation(), "{} should not be archivable", from);
        }
        assert!(!legal_sources(CaseState::Archived).contains(&CaseState::UnderInvestigation));
    }

    #[test]
    fn test_reopen_is_the_only_exit_from_archived() {
        // No regular target lists ARCHIVED as a source; reopen approval
        // bypasses this table deliberately.
        for to in ALL_STATES {
            assert!(
                !legal_sources(to).contains(&CaseState::Archived),
                "ARCHIVED must not be a legal source for {}",
                to
            );
        }
    }

    proptest! {
        #[test]
        fn prop_sources_never_include_target(idx in 0usize..ALL_STATES.len()) {
            // Self-loops other than reassignment are illegal
            let to = ALL_STATES[idx];
            if to != CaseState::CaseAssigned {
                prop_assert!(!legal_sources(to).contains(&to));
            }
        }

        #[test]
        fn prop_parse_rejects_garbage(s in "[a-z_]{1,24}") {
            // Stored states are upper snake case; lowercase never parses
            prop_assert!(CaseState::parse(&s).is_err());
        }
    }
}
