//! Approval Workflow Engine
//!
//! Document requests and case reopen requests share the same shape: a single
//! in-flight request per case whose status only moves forward along a small
//! graph, with each move permitted to a fixed set of roles. The status graph
//! lives here once, as a transition table; the relational scoping (station
//! vs. court linkage) differs between the two workflows and stays with each
//! instantiation.

use crate::db::{DbError, Result};
use crate::org::Role;

/// One legal move in an approval workflow
pub struct StatusRule {
    pub from: &'static [&'static str],
    pub to: &'static str,
    pub roles: &'static [Role],
}

/// Validate moving `current -> to` as `role` against a workflow's rule table.
///
/// `Forbidden` when no rule targeting `to` admits the role; `StateConflict`
/// when a rule admits the role but the current status is not a legal source.
pub fn advance(rules: &[StatusRule], current: &str, to: &str, role: Role) -> Result<()> {
    let candidates: Vec<&StatusRule> = rules.iter().filter(|r| r.to == to).collect();
    if candidates.is_empty() {
        return Err(DbError::Validation(format!("Unknown target status: {}", to)));
    }
    let permitted: Vec<&&StatusRule> = candidates
        .iter()
        .filter(|r| r.roles.contains(&role))
        .collect();
    if permitted.is_empty() {
        return Err(DbError::Forbidden(format!(
            "Role {} may not move a request to {}",
            role, to
        )));
    }
    if permitted.iter().any(|r| r.from.contains(&current)) {
        Ok(())
    } else {
        Err(DbError::StateConflict(format!(
            "Request is not in a state that allows {} (current: {})",
            to, current
        )))
    }
}

// ============================================================================
// Case Reopen workflow: REQUESTED -> APPROVED | REJECTED
// ============================================================================

pub const REOPEN_REQUESTED: &str = "REQUESTED";
pub const REOPEN_APPROVED: &str = "APPROVED";
pub const REOPEN_REJECTED: &str = "REJECTED";

pub const REOPEN_RULES: &[StatusRule] = &[
    StatusRule {
        from: &[REOPEN_REQUESTED],
        to: REOPEN_APPROVED,
        roles: &[Role::Judge],
    },
    StatusRule {
        from: &[REOPEN_REQUESTED],
        to: REOPEN_REJECTED,
        roles: &[Role::Judge],
    },
];

// ============================================================================
// Document Request workflow:
// REQUESTED -> SHO_APPROVED -> ISSUED, REJECTED terminal from either side
// ============================================================================

pub const DOC_REQUESTED: &str = "REQUESTED";
pub const DOC_SHO_APPROVED: &str = "SHO_APPROVED";
pub const DOC_REJECTED: &str = "REJECTED";
pub const DOC_ISSUED: &str = "ISSUED";

pub const DOCUMENT_RULES: &[StatusRule] = &[
    StatusRule {
        from: &[DOC_REQUESTED],
        to: DOC_SHO_APPROVED,
        roles: &[Role::Sho],
    },
    // Station rejection before approval
    StatusRule {
        from: &[DOC_REQUESTED],
        to: DOC_REJECTED,
        roles: &[Role::Sho],
    },
    // Court rejection only after SHO approval
    StatusRule {
        from: &[DOC_SHO_APPROVED],
        to: DOC_REJECTED,
        roles: &[Role::CourtClerk, Role::Judge],
    },
    StatusRule {
        from: &[DOC_SHO_APPROVED],
        to: DOC_ISSUED,
        roles: &[Role::CourtClerk, Role::Judge],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reopen_only_judge_decides() {
        assert!(advance(REOPEN_RULES, REOPEN_REQUESTED, REOPEN_APPROVED, Role::Judge).is_ok());
        assert!(matches!(
            advance(REOPEN_RULES, REOPEN_REQUESTED, REOPEN_APPROVED, Role::Sho),
            Err(DbError::Forbidden(_))
        ));
    }

    #[test]
    fn test_reopen_decision_is_terminal() {
        for decided in [REOPEN_APPROVED, REOPEN_REJECTED] {
            assert!(matches!(
                advance(REOPEN_RULES, decided, REOPEN_APPROVED, Role::Judge),
                Err(DbError::StateConflict(_))
            ));
        }
    }

    #[test]
    fn test_document_forward_path() {
        assert!(advance(DOCUMENT_RULES, DOC_REQUESTED, DOC_SHO_APPROVED, Role::Sho).is_ok());
        assert!(advance(DOCUMENT_RULES, DOC_SHO_APPROVED, DOC_ISSUED, Role::CourtClerk).is_ok());
        assert!(advance(DOCUMENT_RULES, DOC_SHO_APPROVED, DOC_ISSUED, Role::Judge).is_ok());
    }

    #[test]
    fn test_document_reject_paths_depend_on_role() {
        // Station rejects only before approval
        assert!(advance(DOCUMENT_RULES, DOC_REQUESTED, DOC_REJECTED, Role::Sho).is_ok());
        assert!(matches!(
            advance(DOCUMENT_RULES, DOC_SHO_APPROVED, DOC_REJECTED, Role::Sho),
            Err(DbError::StateConflict(_))
        ));
        // Court rejects only after approval
        assert!(advance(DOCUMENT_RULES, DOC_SHO_APPROVED, DOC_REJECTED, Role::Judge).is_ok());
        assert!(matches!(
            advance(DOCUMENT_RULES, DOC_REQUESTED, DOC_REJECTED, Role::CourtClerk),
            Err(DbError::StateConflict(_))
        ));
    }

    #[test]
    fn test_issued_is_terminal() {
        assert!(matches!(
            advance(DOCUMENT_RULES, DOC_ISSUED, DOC_REJECTED, Role::Judge),
            Err(DbError::StateConflict(_))
        ));
        assert!(matches!(
            advance(DOCUMENT_RULES, DOC_REJECTED, DOC_ISSUED, Role::Judge),
            Err(DbError::StateConflict(_))
        ));
    }

    #[test]
    fn test_police_cannot_decide_anything() {
        for to in [DOC_SHO_APPROVED, DOC_REJECTED, DOC_ISSUED] {
            assert!(matches!(
                advance(DOCUMENT_RULES, DOC_REQUESTED, to, Role::Police),
                Err(DbError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn test_unknown_target_is_validation() {
        assert!(matches!(
            advance(DOCUMENT_RULES, DOC_REQUESTED, "ESCALATED", Role::Sho),
            Err(DbError::Validation(_))
        ));
    }
}
