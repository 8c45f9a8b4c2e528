//! End-to-end lifecycle tests against a real temporary database
//!
//! These walk whole workflows through the public API: registration through
//! judgment, court rejection and resubmission, reopen after archival and the
//! document request pipeline. No mocking.

use casetrack::storage::LocalFileStore;
use casetrack::{
    Actor, CaseState, CourtActionType, Database, DbError, DocumentType, FirInput, Role,
};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    db: Database,
    store: LocalFileStore,
    station: i32,
    court: i32,
    officer: Actor,
    sho: Actor,
    clerk: Actor,
    judge: Actor,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(dir.path().join("test.db")).unwrap();
    let store = LocalFileStore::new(dir.path().join("files"));

    let station = db.create_police_station("Central PS", "North", "KA").unwrap();
    let court = db.create_court("Sessions Court", "North", "KA", "SESSIONS").unwrap();

    let officer_id = db.create_user(station, "Asha", "asha@ps.gov", Role::Police).unwrap();
    let sho_id = db.create_user(station, "Bhaskar", "bhaskar@ps.gov", Role::Sho).unwrap();
    let clerk_id = db.create_user(court, "Chitra", "chitra@court.gov", Role::CourtClerk).unwrap();
    let judge_id = db.create_user(court, "Devi", "devi@court.gov", Role::Judge).unwrap();

    let officer = db.actor_for_user(officer_id).unwrap();
    let sho = db.actor_for_user(sho_id).unwrap();
    let clerk = db.actor_for_user(clerk_id).unwrap();
    let judge = db.actor_for_user(judge_id).unwrap();

    Fixture {
        _dir: dir,
        db,
        store,
        station,
        court,
        officer,
        sho,
        clerk,
        judge,
    }
}

fn register_case(f: &Fixture, fir_number: &str) -> i32 {
    let input = FirInput {
        fir_number: fir_number.to_string(),
        incident_date: "2026-08-01".to_string(),
        sections_applied: "IPC 379".to_string(),
        description: Some("Theft of a two-wheeler".to_string()),
    };
    f.db.register_fir(&f.officer, &input, None, &f.store)
        .unwrap()
        .case_id
}

/// Drive a case from registration up to court acceptance
fn case_before_court(f: &Fixture, fir_number: &str) -> i32 {
    let case_id = register_case(f, fir_number);
    f.db.assign_case(&f.sho, case_id, f.officer.user_id, "initial").unwrap();
    f.db.start_investigation(&f.officer, case_id).unwrap();
    f.db.complete_investigation(&f.officer, case_id).unwrap();
    f.db.prepare_charge_sheet(&f.officer, case_id).unwrap();
    f.db.submit_to_court(&f.officer, case_id, f.court).unwrap();
    f.db.intake_case(&f.clerk, case_id, Some("ACK-1")).unwrap();
    case_id
}

// =============================================================================
// Happy path
// =============================================================================

#[test]
fn test_full_lifecycle_to_judgment() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-001");
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::FirRegistered);

    f.db.assign_case(&f.sho, case_id, f.officer.user_id, "initial").unwrap();
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::CaseAssigned);

    f.db.start_investigation(&f.officer, case_id).unwrap();
    f.db.complete_investigation(&f.officer, case_id).unwrap();
    f.db.prepare_charge_sheet(&f.officer, case_id).unwrap();
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::ChargeSheetPrepared);

    let sub = f.db.submit_to_court(&f.officer, case_id, f.court).unwrap();
    assert_eq!(sub.submission_version, 1);

    f.db.intake_case(&f.clerk, case_id, Some("ACK-42")).unwrap();
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::CourtAccepted);
    let ack = f.db.acknowledgement(sub.id).unwrap().unwrap();
    assert_eq!(ack.ack_number, "ACK-42");

    f.db.record_court_action(&f.judge, case_id, CourtActionType::Cognizance, None, "2026-08-10")
        .unwrap();
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::TrialOngoing);

    f.db.record_court_action(&f.judge, case_id, CourtActionType::Judgment, None, "2026-08-20")
        .unwrap();
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::JudgmentReserved);

    f.db.archive_case(&f.judge, case_id, "Judgment delivered").unwrap();
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::Archived);

    // History forms an unbroken chain from FIR_REGISTERED to ARCHIVED
    let history = f.db.state_history(case_id).unwrap();
    assert_eq!(history[0].from_state, "FIR_REGISTERED");
    for pair in history.windows(2) {
        assert_eq!(pair[0].to_state, pair[1].from_state);
    }
    assert_eq!(history.last().unwrap().to_state, "ARCHIVED");
}

#[test]
fn test_every_mutation_is_audited() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-002");
    f.db.assign_case(&f.sho, case_id, f.officer.user_id, "initial").unwrap();

    let trail = f.db.audit_for_entity("CASE", case_id).unwrap();
    let actions: Vec<&str> = trail.iter().map(|e| e.action.as_str()).collect();
    assert!(actions.contains(&"CASE_CREATED"));
    assert!(actions.contains(&"CASE_ASSIGNED"));
    assert!(actions.contains(&"STATE_CHANGED"));
}

// =============================================================================
// Authorization and state guards
// =============================================================================

#[test]
fn test_other_station_cannot_touch_case() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-003");

    let other = f.db.create_police_station("East PS", "East", "KA").unwrap();
    let other_sho_id = f.db.create_user(other, "Eshan", "eshan@ps.gov", Role::Sho).unwrap();
    let other_officer_id = f.db.create_user(other, "Farah", "farah@ps.gov", Role::Police).unwrap();
    let other_sho = f.db.actor_for_user(other_sho_id).unwrap();

    assert!(matches!(
        f.db.assign_case(&other_sho, case_id, other_officer_id, "grab"),
        Err(DbError::Forbidden(_))
    ));
    assert!(matches!(
        f.db.get_case(&other_sho, case_id),
        Err(DbError::Forbidden(_))
    ));
}

#[test]
fn test_only_assigned_officer_investigates() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-004");
    let second_id = f.db.create_user(f.station, "Gauri", "gauri@ps.gov", Role::Police).unwrap();
    let second = f.db.actor_for_user(second_id).unwrap();

    f.db.assign_case(&f.sho, case_id, f.officer.user_id, "initial").unwrap();
    assert!(matches!(
        f.db.start_investigation(&second, case_id),
        Err(DbError::Forbidden(_))
    ));
    f.db.start_investigation(&f.officer, case_id).unwrap();
}

#[test]
fn test_illegal_transition_is_state_conflict() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-005");

    // Cannot complete an investigation that never started or was assigned
    assert!(matches!(
        f.db.submit_to_court(&f.officer, case_id, f.court),
        Err(DbError::StateConflict(_))
    ));
    // Cannot archive a freshly registered case
    assert!(matches!(
        f.db.archive_case(&f.sho, case_id, "premature"),
        Err(DbError::StateConflict(_))
    ));
}

#[test]
fn test_reassignment_keeps_single_active_row() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-006");
    let second_id = f.db.create_user(f.station, "Gauri", "gauri@ps.gov", Role::Police).unwrap();

    f.db.assign_case(&f.sho, case_id, f.officer.user_id, "first").unwrap();
    f.db.assign_case(&f.sho, case_id, second_id, "handover").unwrap();

    let active = f.db.active_assignment(case_id).unwrap().unwrap();
    assert_eq!(active.assigned_to, second_id);
    let history = f.db.assignment_history(case_id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|a| a.unassigned_at.is_none()).count(), 1);
}

#[test]
fn test_concurrent_assigns_leave_one_active_row() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-100");
    let second_id = f.db.create_user(f.station, "Gauri", "gauri@ps.gov", Role::Police).unwrap();

    let db = Arc::new(f.db);
    let sho = f.sho;
    let officers = [f.officer.user_id, second_id];

    let mut handles = Vec::new();
    for officer_id in officers {
        let db = Arc::clone(&db);
        handles.push(std::thread::spawn(move || {
            db.assign_case(&sho, case_id, officer_id, "race")
        }));
    }
    for h in handles {
        // Writers queue on the database lock, so both assignments land
        h.join().unwrap().unwrap();
    }

    let history = db.assignment_history(case_id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|a| a.unassigned_at.is_none()).count(), 1);
}

// =============================================================================
// Court rejection and resubmission
// =============================================================================

#[test]
fn test_rejection_and_resubmission_versions_are_gapless() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-007");
    f.db.assign_case(&f.sho, case_id, f.officer.user_id, "initial").unwrap();
    f.db.start_investigation(&f.officer, case_id).unwrap();
    f.db.complete_investigation(&f.officer, case_id).unwrap();

    f.db.submit_to_court(&f.officer, case_id, f.court).unwrap();
    f.db.reject_submission(&f.clerk, case_id, "Charge sheet incomplete").unwrap();
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::ResubmittedToCourt);

    let second = f.db.submit_to_court(&f.officer, case_id, f.court).unwrap();
    assert_eq!(second.submission_version, 2);
    f.db.intake_case(&f.judge, case_id, None).unwrap();

    let versions: Vec<i32> = f
        .db
        .submissions(case_id)
        .unwrap()
        .iter()
        .map(|s| s.submission_version)
        .collect();
    assert_eq!(versions, vec![1, 2]);
}

#[test]
fn test_wrong_court_cannot_intake_or_act() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-008");
    f.db.assign_case(&f.sho, case_id, f.officer.user_id, "initial").unwrap();
    f.db.start_investigation(&f.officer, case_id).unwrap();
    f.db.complete_investigation(&f.officer, case_id).unwrap();
    f.db.submit_to_court(&f.officer, case_id, f.court).unwrap();

    let other_court = f.db.create_court("High Court", "Central", "KA", "HIGH").unwrap();
    let other_judge_id = f
        .db
        .create_user(other_court, "Hari", "hari@hc.gov", Role::Judge)
        .unwrap();
    let other_judge = f.db.actor_for_user(other_judge_id).unwrap();

    assert!(matches!(
        f.db.intake_case(&other_judge, case_id, None),
        Err(DbError::StateConflict(_))
    ));
    assert!(matches!(
        f.db.record_court_action(&other_judge, case_id, CourtActionType::Hearing, None, "2026-08-12"),
        Err(DbError::Forbidden(_))
    ));
}

// =============================================================================
// Reopen workflow
// =============================================================================

fn archived_case(f: &Fixture, fir_number: &str) -> i32 {
    let case_id = case_before_court(f, fir_number);
    f.db.archive_case(&f.judge, case_id, "Closed").unwrap();
    case_id
}

#[test]
fn test_reopen_round_trip_restores_assignment() {
    let f = fixture();
    let case_id = archived_case(&f, "FIR-009");

    // Archival closed the assignment, but the last holder keeps standing
    assert!(f.db.active_assignment(case_id).unwrap().is_none());
    let req = f.db.request_reopen(&f.officer, case_id, "New witness surfaced").unwrap();

    let pending = f.db.pending_reopens_for_judge(&f.judge).unwrap();
    assert_eq!(pending.len(), 1);

    f.db.approve_reopen(&f.judge, req.id, "Grounds are sufficient").unwrap();
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::UnderInvestigation);

    let detail = f.db.get_case(&f.officer, case_id).unwrap();
    assert!(!detail.case.is_archived);
    assert_eq!(
        detail.active_assignment.unwrap().assigned_to,
        f.officer.user_id
    );
}

#[test]
fn test_reopen_rejection_keeps_case_archived() {
    let f = fixture();
    let case_id = archived_case(&f, "FIR-010");
    let req = f.db.request_reopen(&f.officer, case_id, "Please").unwrap();

    f.db.reject_reopen(&f.judge, req.id, "No new grounds").unwrap();
    assert_eq!(f.db.case_state(case_id).unwrap(), CaseState::Archived);

    // A rejected request no longer blocks a fresh one
    f.db.request_reopen(&f.officer, case_id, "New evidence now").unwrap();
}

#[test]
fn test_reopen_requires_archived_case_and_last_holder() {
    let f = fixture();
    let open_case = register_case(&f, "FIR-011");
    assert!(matches!(
        f.db.request_reopen(&f.officer, open_case, "nope"),
        Err(DbError::Validation(_))
    ));

    let case_id = archived_case(&f, "FIR-012");
    let stranger_id = f.db.create_user(f.station, "Indra", "indra@ps.gov", Role::Police).unwrap();
    let stranger = f.db.actor_for_user(stranger_id).unwrap();
    assert!(matches!(
        f.db.request_reopen(&stranger, case_id, "mine now"),
        Err(DbError::Forbidden(_))
    ));
}

#[test]
fn test_only_latest_court_judge_decides_reopen() {
    let f = fixture();
    let case_id = archived_case(&f, "FIR-013");
    let req = f.db.request_reopen(&f.officer, case_id, "New facts").unwrap();

    let other_court = f.db.create_court("High Court", "Central", "KA", "HIGH").unwrap();
    let other_judge_id = f
        .db
        .create_user(other_court, "Hari", "hari@hc.gov", Role::Judge)
        .unwrap();
    let other_judge = f.db.actor_for_user(other_judge_id).unwrap();

    assert!(matches!(
        f.db.approve_reopen(&other_judge, req.id, "not mine"),
        Err(DbError::Forbidden(_))
    ));
    // Clerks hold no reopen authority at all
    assert!(matches!(
        f.db.approve_reopen(&f.clerk, req.id, "clerk"),
        Err(DbError::Forbidden(_))
    ));
}

#[test]
fn test_concurrent_reopen_requests_yield_one_pending() {
    let f = fixture();
    let case_id = archived_case(&f, "FIR-014");
    let db = Arc::new(f.db);
    let officer = f.officer;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let db = Arc::clone(&db);
        handles.push(std::thread::spawn(move || {
            db.request_reopen(&officer, case_id, "race")
        }));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1, "exactly one request must win: {:?}", results);
    assert!(results
        .iter()
        .all(|r| r.is_ok() || matches!(r, Err(DbError::StateConflict(_)))));
}

// =============================================================================
// Document request workflow
// =============================================================================

#[test]
fn test_document_request_issue_round_trip() {
    let f = fixture();
    let case_id = case_before_court(&f, "FIR-015");

    let req = f
        .db
        .create_document_request(&f.officer, case_id, DocumentType::CourtOrder, "Need the order")
        .unwrap();
    assert_eq!(req.status, "REQUESTED");

    let approved = f.db.sho_approve_document_request(&f.sho, req.id).unwrap();
    assert_eq!(approved.status, "SHO_APPROVED");
    assert_eq!(approved.approved_by, Some(f.sho.user_id));

    let issued = f
        .db
        .issue_document(&f.clerk, req.id, b"order body", "order.pdf", Some("certified"), &f.store)
        .unwrap();
    assert_eq!(issued.status, "ISSUED");
    assert_eq!(issued.issued_by, Some(f.clerk.user_id));
    assert!(issued.issued_file_url.unwrap().contains("issued-documents"));
}

#[test]
fn test_document_request_needs_active_assignment() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-016");
    // Unassigned case: even the registering officer cannot request
    assert!(matches!(
        f.db.create_document_request(&f.officer, case_id, DocumentType::FirCopy, "copy"),
        Err(DbError::Forbidden(_))
    ));
}

#[test]
fn test_document_rejection_stages() {
    let f = fixture();
    let case_id = case_before_court(&f, "FIR-017");

    // SHO rejects before approval
    let first = f
        .db
        .create_document_request(&f.officer, case_id, DocumentType::FirCopy, "copy")
        .unwrap();
    let rejected = f
        .db
        .reject_document_request(&f.sho, first.id, "Not needed")
        .unwrap();
    assert_eq!(rejected.status, "REJECTED");
    assert_eq!(rejected.remarks.as_deref(), Some("Not needed"));

    // Court rejects only after SHO approval
    let second = f
        .db
        .create_document_request(&f.officer, case_id, DocumentType::ChargeSheet, "copy")
        .unwrap();
    assert!(matches!(
        f.db.reject_document_request(&f.judge, second.id, "early"),
        Err(DbError::StateConflict(_))
    ));
    f.db.sho_approve_document_request(&f.sho, second.id).unwrap();
    f.db.reject_document_request(&f.judge, second.id, "Malformed request").unwrap();
}

#[test]
fn test_storage_failure_fails_issuance() {
    struct FailingStore;
    impl casetrack::FileStore for FailingStore {
        fn upload(
            &self,
            _bytes: &[u8],
            _folder: casetrack::Folder,
            _name: &str,
        ) -> std::io::Result<casetrack::StoredFile> {
            Err(std::io::Error::other("bucket offline"))
        }
    }

    let f = fixture();
    let case_id = case_before_court(&f, "FIR-018");
    let req = f
        .db
        .create_document_request(&f.officer, case_id, DocumentType::CourtOrder, "order")
        .unwrap();
    f.db.sho_approve_document_request(&f.sho, req.id).unwrap();

    let result = f.db.issue_document(&f.clerk, req.id, b"x", "o.pdf", None, &FailingStore);
    assert!(matches!(result, Err(DbError::Storage(_))));

    // Request untouched, still issuable with a working store
    let issued = f
        .db
        .issue_document(&f.clerk, req.id, b"x", "o.pdf", None, &f.store)
        .unwrap();
    assert_eq!(issued.status, "ISSUED");
}

#[test]
fn test_court_scoping_of_approved_requests() {
    let f = fixture();
    let case_id = case_before_court(&f, "FIR-019");
    let req = f
        .db
        .create_document_request(&f.officer, case_id, DocumentType::CourtOrder, "order")
        .unwrap();
    f.db.sho_approve_document_request(&f.sho, req.id).unwrap();

    assert_eq!(f.db.approved_document_requests_for_court(&f.clerk).unwrap().len(), 1);

    let other_court = f.db.create_court("High Court", "Central", "KA", "HIGH").unwrap();
    let other_clerk_id = f
        .db
        .create_user(other_court, "Jaya", "jaya@hc.gov", Role::CourtClerk)
        .unwrap();
    let other_clerk = f.db.actor_for_user(other_clerk_id).unwrap();
    assert!(f
        .db
        .approved_document_requests_for_court(&other_clerk)
        .unwrap()
        .is_empty());
}

// =============================================================================
// Investigation records
// =============================================================================

#[test]
fn test_investigation_records_require_assignment() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-020");

    assert!(matches!(
        f.db.add_investigation_event(&f.officer, case_id, "RAID", "2026-08-03", "Premises searched"),
        Err(DbError::Forbidden(_))
    ));

    f.db.assign_case(&f.sho, case_id, f.officer.user_id, "initial").unwrap();
    f.db.add_investigation_event(&f.officer, case_id, "RAID", "2026-08-03", "Premises searched")
        .unwrap();
    let evidence = f
        .db
        .add_evidence(&f.officer, case_id, "PHOTO", b"jpeg bytes", "scene.jpg", &f.store)
        .unwrap();
    assert!(evidence.file_url.contains("evidence"));

    f.db.add_witness(
        &f.officer,
        case_id,
        "K. Rao",
        Some("98xxxx"),
        None,
        b"statement text",
        "rao.txt",
        &f.store,
    )
    .unwrap();
    f.db.add_accused(&f.officer, case_id, "Unknown rider", casetrack::AccusedStatus::Absconding)
        .unwrap();

    assert_eq!(f.db.investigation_events(&f.officer, case_id).unwrap().len(), 1);
    assert_eq!(f.db.evidence_for_case(&f.officer, case_id).unwrap().len(), 1);
    assert_eq!(f.db.witnesses_for_case(&f.officer, case_id).unwrap().len(), 1);
    assert_eq!(f.db.accused_for_case(&f.officer, case_id).unwrap().len(), 1);
}

#[test]
fn test_court_reads_investigation_after_submission() {
    let f = fixture();
    let case_id = register_case(&f, "FIR-021");
    f.db.assign_case(&f.sho, case_id, f.officer.user_id, "initial").unwrap();
    f.db.add_accused(&f.officer, case_id, "Suspect A", casetrack::AccusedStatus::Arrested)
        .unwrap();

    // Court has no visibility before a submission links the case to it
    assert!(matches!(
        f.db.accused_for_case(&f.judge, case_id),
        Err(DbError::Forbidden(_))
    ));

    f.db.start_investigation(&f.officer, case_id).unwrap();
    f.db.complete_investigation(&f.officer, case_id).unwrap();
    f.db.submit_to_court(&f.officer, case_id, f.court).unwrap();
    assert_eq!(f.db.accused_for_case(&f.judge, case_id).unwrap().len(), 1);
}
