//! FIR registration
//!
//! A First Information Report is the originating police record; registering
//! one atomically spawns the Case, its state row at FIR_REGISTERED and the
//! audit trail. The FIR document upload is best-effort: a storage failure is
//! logged and the registration still commits without the attachment.

use crate::db::{last_insert_rowid, now, record_audit, Database, DbError, Result};
use crate::lifecycle;
use crate::org::{Actor, Role};
use crate::schema::*;
use crate::storage::{FileStore, Folder};
use diesel::prelude::*;
use tracing::warn;

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable FIR
#[derive(Insertable)]
#[diesel(table_name = firs)]
pub struct NewFir<'a> {
    pub fir_number: &'a str,
    pub police_station_id: i32,
    pub registered_by: i32,
    pub incident_date: &'a str,
    pub sections_applied: &'a str,
    pub description: Option<&'a str>,
    pub document_url: Option<&'a str>,
    pub created_at: &'a str,
}

/// Queryable FIR
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = firs)]
pub struct Fir {
    pub id: i32,
    pub fir_number: String,
    pub police_station_id: i32,
    pub registered_by: i32,
    pub incident_date: String,
    pub sections_applied: String,
    pub description: Option<String>,
    pub document_url: Option<String>,
    pub created_at: String,
}

/// Input for registering a FIR
#[derive(Debug, Clone)]
pub struct FirInput {
    pub fir_number: String,
    pub incident_date: String,
    pub sections_applied: String,
    pub description: Option<String>,
}

/// Outcome of a registration
#[derive(Debug, Clone, serde::Serialize)]
pub struct RegisteredFir {
    pub fir_id: i32,
    pub case_id: i32,
    pub case_number: String,
    pub document_url: Option<String>,
}

impl Database {
    /// Register a FIR and create its case.
    ///
    /// POLICE only; the FIR is filed under the actor's station. The optional
    /// document is uploaded first and never blocks the registration - on
    /// storage failure the record is created without the attachment.
    pub fn register_fir(
        &self,
        actor: &Actor,
        input: &FirInput,
        document: Option<(&[u8], &str)>,
        store: &dyn FileStore,
    ) -> Result<RegisteredFir> {
        if actor.role != Role::Police {
            return Err(DbError::Forbidden(
                "Only a police officer can register a FIR".to_string(),
            ));
        }
        if input.fir_number.trim().is_empty() {
            return Err(DbError::Validation("FIR number must not be empty".to_string()));
        }

        // Best-effort side effect, outside the transaction
        let document_url = document.and_then(|(bytes, name)| {
            match store.upload(bytes, Folder::Firs, name) {
                Ok(stored) => Some(stored.url),
                Err(e) => {
                    warn!(fir_number = %input.fir_number, error = %e,
                          "FIR document upload failed; registering without attachment");
                    None
                }
            }
        });

        let mut conn = self.get_conn()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let ts = now();
            let new_fir = NewFir {
                fir_number: &input.fir_number,
                police_station_id: actor.organization_id,
                registered_by: actor.user_id,
                incident_date: &input.incident_date,
                sections_applied: &input.sections_applied,
                description: input.description.as_deref(),
                document_url: document_url.as_deref(),
                created_at: &ts,
            };
            diesel::insert_into(firs::table)
                .values(&new_fir)
                .execute(conn)?;
            let fir_id = last_insert_rowid(conn)?;

            let case_number = format!(
                "CASE-{}-{}",
                chrono::Utc::now().format("%Y"),
                &uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
            );
            let new_case = crate::case::NewCase {
                case_number: &case_number,
                fir_id,
                is_archived: false,
                created_at: &ts,
                updated_at: &ts,
            };
            diesel::insert_into(cases::table)
                .values(&new_case)
                .execute(conn)?;
            let case_id = last_insert_rowid(conn)?;

            lifecycle::init_state(conn, case_id)?;

            record_audit(conn, actor.user_id, "FIR_REGISTERED", "FIR", fir_id)?;
            record_audit(conn, actor.user_id, "CASE_CREATED", "CASE", case_id)?;

            Ok(RegisteredFir {
                fir_id,
                case_id,
                case_number,
                document_url,
            })
        })
    }

    /// Load a FIR; police-side callers must belong to its station
    pub fn get_fir(&self, actor: &Actor, fir_id: i32) -> Result<Fir> {
        let mut conn = self.get_conn()?;
        let fir = firs::table
            .find(fir_id)
            .first::<Fir>(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::NotFound("FIR not found".to_string()))?;
        if actor.role.is_police_side() && fir.police_station_id != actor.organization_id {
            return Err(DbError::Forbidden("Access denied".to_string()));
        }
        Ok(fir)
    }
}
