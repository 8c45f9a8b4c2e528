//! Document Request workflow
//!
//! Officer asks for a document, the SHO clears it, the court either rejects
//! or issues it with the signed file attached. Statuses only move forward;
//! REJECTED is terminal from either review stage and nothing moves after
//! ISSUED. Unlike a FIR attachment, the issued file is the point of the
//! operation, so an upload failure fails the call.

use crate::case::{active_assignment_row, case_station, ensure_assigned, load_case};
use crate::court::latest_submission;
use crate::db::{last_insert_rowid, now, record_audit, Database, DbError, Result};
use crate::org::{Actor, Role};
use crate::schema::*;
use crate::storage::{FileStore, Folder};
use crate::workflow::{
    advance, DOCUMENT_RULES, DOC_ISSUED, DOC_REJECTED, DOC_REQUESTED, DOC_SHO_APPROVED,
};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Kind of document being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DocumentType {
    FirCopy,
    ChargeSheet,
    CourtOrder,
    PostMortemReport,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::FirCopy => "FIR_COPY",
            DocumentType::ChargeSheet => "CHARGE_SHEET",
            DocumentType::CourtOrder => "COURT_ORDER",
            DocumentType::PostMortemReport => "POST_MORTEM_REPORT",
            DocumentType::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Result<DocumentType> {
        match s {
            "FIR_COPY" => Ok(DocumentType::FirCopy),
            "CHARGE_SHEET" => Ok(DocumentType::ChargeSheet),
            "COURT_ORDER" => Ok(DocumentType::CourtOrder),
            "POST_MORTEM_REPORT" => Ok(DocumentType::PostMortemReport),
            "OTHER" => Ok(DocumentType::Other),
            other => Err(DbError::Validation(format!(
                "Unknown document type: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable document request
#[derive(Insertable)]
#[diesel(table_name = document_requests)]
pub struct NewDocumentRequest<'a> {
    pub case_id: i32,
    pub requested_by: i32,
    pub document_type: &'a str,
    pub request_reason: &'a str,
    pub status: &'a str,
    pub created_at: &'a str,
}

/// Queryable document request
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = document_requests)]
pub struct DocumentRequest {
    pub id: i32,
    pub case_id: i32,
    pub requested_by: i32,
    pub document_type: String,
    pub request_reason: String,
    pub status: String,
    pub approved_by: Option<i32>,
    pub issued_by: Option<i32>,
    pub issued_file_url: Option<String>,
    pub remarks: Option<String>,
    pub created_at: String,
}

fn load_doc_request(conn: &mut SqliteConnection, request_id: i32) -> Result<DocumentRequest> {
    document_requests::table
        .find(request_id)
        .first::<DocumentRequest>(conn)
        .optional()?
        .ok_or_else(|| DbError::NotFound("Document request not found".to_string()))
}

/// Station check for police-side reviewers of a request
fn ensure_request_station(
    conn: &mut SqliteConnection,
    req: &DocumentRequest,
    organization_id: i32,
) -> Result<()> {
    let case = load_case(conn, req.case_id)?;
    if case_station(conn, &case)? != organization_id {
        return Err(DbError::Forbidden("Access denied".to_string()));
    }
    Ok(())
}

/// Court check for court-side reviewers: the case's latest submission must
/// belong to the actor's court
fn ensure_request_court(
    conn: &mut SqliteConnection,
    req: &DocumentRequest,
    organization_id: i32,
) -> Result<()> {
    match latest_submission(conn, req.case_id)? {
        Some(sub) if sub.court_id == organization_id => Ok(()),
        _ => Err(DbError::Forbidden("Access denied".to_string())),
    }
}

/// Role-dependent access to a case's document requests: police-side must
/// match the station (plain POLICE additionally must hold the active
/// assignment), court-side must match the latest submission's court.
fn verify_case_access(conn: &mut SqliteConnection, actor: &Actor, case_id: i32) -> Result<()> {
    let case = load_case(conn, case_id)?;
    if actor.role.is_police_side() {
        if case_station(conn, &case)? != actor.organization_id {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        if actor.role == Role::Police {
            let assigned = active_assignment_row(conn, case_id)?
                .map(|a| a.assigned_to == actor.user_id)
                .unwrap_or(false);
            if !assigned {
                return Err(DbError::Forbidden("Access denied".to_string()));
            }
        }
        return Ok(());
    }
    match latest_submission(conn, case_id)? {
        Some(sub) if sub.court_id == actor.organization_id => Ok(()),
        _ => Err(DbError::Forbidden("Access denied".to_string())),
    }
}

impl Database {
    /// Actively assigned officer requests a document for their case
    pub fn create_document_request(
        &self,
        actor: &Actor,
        case_id: i32,
        document_type: DocumentType,
        request_reason: &str,
    ) -> Result<DocumentRequest> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            load_case(conn, case_id)?;
            ensure_assigned(conn, case_id, actor.user_id)?;

            let row = NewDocumentRequest {
                case_id,
                requested_by: actor.user_id,
                document_type: document_type.as_str(),
                request_reason,
                status: DOC_REQUESTED,
                created_at: &now(),
            };
            diesel::insert_into(document_requests::table)
                .values(&row)
                .execute(conn)?;
            let request_id = last_insert_rowid(conn)?;

            record_audit(
                conn,
                actor.user_id,
                "DOCUMENT_REQUEST_CREATED",
                "DOCUMENT_REQUEST",
                request_id,
            )?;

            load_doc_request(conn, request_id)
        })
    }

    /// SHO of the case's station clears the request for the court
    pub fn sho_approve_document_request(
        &self,
        actor: &Actor,
        request_id: i32,
    ) -> Result<DocumentRequest> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let req = load_doc_request(conn, request_id)?;
            advance(DOCUMENT_RULES, &req.status, DOC_SHO_APPROVED, actor.role)?;
            ensure_request_station(conn, &req, actor.organization_id)?;

            diesel::update(document_requests::table.find(request_id))
                .set((
                    document_requests::status.eq(DOC_SHO_APPROVED),
                    document_requests::approved_by.eq(actor.user_id),
                ))
                .execute(conn)?;

            record_audit(
                conn,
                actor.user_id,
                "DOCUMENT_REQUEST_APPROVED",
                "DOCUMENT_REQUEST",
                request_id,
            )?;

            load_doc_request(conn, request_id)
        })
    }

    /// Reject a document request. The legal source status depends on who is
    /// rejecting: the station before approval, the court after.
    pub fn reject_document_request(
        &self,
        actor: &Actor,
        request_id: i32,
        reason: &str,
    ) -> Result<DocumentRequest> {
        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let req = load_doc_request(conn, request_id)?;
            advance(DOCUMENT_RULES, &req.status, DOC_REJECTED, actor.role)?;
            if actor.role.is_police_side() {
                ensure_request_station(conn, &req, actor.organization_id)?;
            } else {
                ensure_request_court(conn, &req, actor.organization_id)?;
            }

            diesel::update(document_requests::table.find(request_id))
                .set((
                    document_requests::status.eq(DOC_REJECTED),
                    document_requests::remarks.eq(reason),
                ))
                .execute(conn)?;

            record_audit(
                conn,
                actor.user_id,
                "DOCUMENT_REQUEST_REJECTED",
                "DOCUMENT_REQUEST",
                request_id,
            )?;

            load_doc_request(conn, request_id)
        })
    }

    /// Court issues the document. The file is uploaded first; a storage
    /// failure fails the whole operation and leaves the request untouched.
    pub fn issue_document(
        &self,
        actor: &Actor,
        request_id: i32,
        file_bytes: &[u8],
        file_name: &str,
        remarks: Option<&str>,
        store: &dyn FileStore,
    ) -> Result<DocumentRequest> {
        let mut conn = self.get_conn()?;

        // Pre-flight checks so we never upload for a request that cannot move
        {
            let conn = &mut conn;
            let req = load_doc_request(conn, request_id)?;
            advance(DOCUMENT_RULES, &req.status, DOC_ISSUED, actor.role)?;
            ensure_request_court(conn, &req, actor.organization_id)?;
        }

        let stored = store
            .upload(file_bytes, Folder::IssuedDocuments, file_name)
            .map_err(|e| DbError::Storage(e.to_string()))?;

        conn.immediate_transaction::<_, DbError, _>(|conn| {
            // Re-validate inside the transaction; a concurrent rejection
            // between upload and commit must still win
            let req = load_doc_request(conn, request_id)?;
            advance(DOCUMENT_RULES, &req.status, DOC_ISSUED, actor.role)?;

            diesel::update(document_requests::table.find(request_id))
                .set((
                    document_requests::status.eq(DOC_ISSUED),
                    document_requests::issued_by.eq(actor.user_id),
                    document_requests::issued_file_url.eq(&stored.url),
                    document_requests::remarks.eq(remarks),
                ))
                .execute(conn)?;

            record_audit(
                conn,
                actor.user_id,
                "DOCUMENT_REQUEST_ISSUED",
                "DOCUMENT_REQUEST",
                request_id,
            )?;

            load_doc_request(conn, request_id)
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Requests filed by this user, newest first
    pub fn my_document_requests(&self, actor: &Actor) -> Result<Vec<DocumentRequest>> {
        let mut conn = self.get_conn()?;
        let rows = document_requests::table
            .filter(document_requests::requested_by.eq(actor.user_id))
            .order(document_requests::id.desc())
            .load::<DocumentRequest>(&mut conn)?;
        Ok(rows)
    }

    /// Requests awaiting station review, for cases of the SHO's station
    pub fn pending_document_requests_for_sho(&self, actor: &Actor) -> Result<Vec<DocumentRequest>> {
        if actor.role != Role::Sho {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        let mut conn = self.get_conn()?;
        let pending = document_requests::table
            .filter(document_requests::status.eq(DOC_REQUESTED))
            .order(document_requests::id.desc())
            .load::<DocumentRequest>(&mut conn)?;
        let mut out = Vec::new();
        for req in pending {
            let case = load_case(&mut conn, req.case_id)?;
            if case_station(&mut conn, &case)? == actor.organization_id {
                out.push(req);
            }
        }
        Ok(out)
    }

    /// SHO-approved requests for cases currently before the actor's court
    pub fn approved_document_requests_for_court(
        &self,
        actor: &Actor,
    ) -> Result<Vec<DocumentRequest>> {
        if !actor.role.is_court_side() {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        let mut conn = self.get_conn()?;
        let approved = document_requests::table
            .filter(document_requests::status.eq(DOC_SHO_APPROVED))
            .order(document_requests::id.desc())
            .load::<DocumentRequest>(&mut conn)?;
        let mut out = Vec::new();
        for req in approved {
            let latest = latest_submission(&mut conn, req.case_id)?;
            if latest.map(|s| s.court_id == actor.organization_id).unwrap_or(false) {
                out.push(req);
            }
        }
        Ok(out)
    }

    /// All requests on one case, with role-dependent access checks
    pub fn document_requests_by_case(
        &self,
        actor: &Actor,
        case_id: i32,
    ) -> Result<Vec<DocumentRequest>> {
        let mut conn = self.get_conn()?;
        verify_case_access(&mut conn, actor, case_id)?;
        let rows = document_requests::table
            .filter(document_requests::case_id.eq(case_id))
            .order(document_requests::id.desc())
            .load::<DocumentRequest>(&mut conn)?;
        Ok(rows)
    }
}
