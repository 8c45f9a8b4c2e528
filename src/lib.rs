//! Casetrack - criminal case lifecycle tracking for police stations and courts
//!
//! Tracks a case from FIR registration through investigation, court
//! submission and judicial action to archival, with a full audit trail.
//!
//! # Overview
//!
//! Every case starts from a FIR registered at a police station. The station's
//! SHO assigns an officer, the officer investigates and the case is submitted
//! to a court, which accepts or rejects it and records judicial actions.
//! Archived cases can only come back through a judge-approved reopen request.
//! Every mutation lands in one transaction together with its audit entry.
//!
//! # Case States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `FIR_REGISTERED` | FIR filed, case opened |
//! | `CASE_ASSIGNED` | Officer holds the case |
//! | `UNDER_INVESTIGATION` | Investigation in progress |
//! | `INVESTIGATION_COMPLETED` | Investigation closed out |
//! | `CHARGE_SHEET_PREPARED` | Ready for court |
//! | `SUBMITTED_TO_COURT` | Awaiting court intake |
//! | `COURT_ACCEPTED` | Court took the case |
//! | `RESUBMITTED_TO_COURT` | Returned by the court |
//! | `TRIAL_ONGOING` | Cognizance taken |
//! | `JUDGMENT_RESERVED` | Judgment recorded |
//! | `ARCHIVED` | Closed; reopen requires a judge |
//!
//! # Quick Start
//!
//! ```no_run
//! use casetrack::{Database, FirInput};
//! use casetrack::storage::LocalFileStore;
//!
//! use casetrack::Role;
//!
//! let db = Database::new(".casetrack/casetrack.db").unwrap();
//! let station = db.create_police_station("Koramangala PS", "Bengaluru", "Karnataka").unwrap();
//! let officer = db.create_user(station, "A. Kumar", "kumar@example.in", Role::Police).unwrap();
//! let actor = db.actor_for_user(officer).unwrap();
//!
//! let store = LocalFileStore::new(".casetrack/files");
//! let input = FirInput {
//!     fir_number: "FIR-2026-0042".to_string(),
//!     incident_date: "2026-08-01".to_string(),
//!     sections_applied: "IPC 379".to_string(),
//!     description: Some("Theft of a two-wheeler".to_string()),
//! };
//! let fir = db.register_fir(&actor, &input, None, &store).unwrap();
//! println!("Registered {} as {}", fir.fir_id, fir.case_number);
//! ```

pub mod case;
pub mod config;
pub mod court;
pub mod db;
pub mod documents;
pub mod fir;
pub mod investigation;
pub mod lifecycle;
pub mod org;
pub mod reopen;
pub mod schema;
pub mod storage;
pub mod workflow;

pub use case::{Case, CaseAssignment, CaseDetail, CaseSummary};
pub use config::Config;
pub use court::{CourtAction, CourtActionType, CourtSubmission, SubmissionStatus};
pub use db::{AuditEntry, Database, DbError, Result, CURRENT_SCHEMA};
pub use documents::{DocumentRequest, DocumentType};
pub use fir::{Fir, FirInput, RegisteredFir};
pub use investigation::{Accused, AccusedStatus, Evidence, InvestigationEvent, Witness};
pub use lifecycle::{CaseState, StateHistoryEntry};
pub use org::{Actor, Organization, OrgKind, Role, User};
pub use reopen::ReopenRequest;
pub use storage::{FileStore, Folder, LocalFileStore, StoredFile};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify core types are re-exported from crate root
        let _ = CURRENT_SCHEMA;
    }
}
