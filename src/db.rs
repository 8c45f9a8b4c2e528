//! SQLite database with Diesel ORM
//!
//! Stores the full case lifecycle: organizations, FIRs, cases, assignments,
//! court submissions, approval workflows and the audit log. Every mutating
//! operation runs as one immediate transaction so partial writes can never
//! become visible, and the audit entry is written on the same connection
//! inside that transaction.

use crate::schema::*;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::path::Path;

/// Current schema version for casetrack
pub const CURRENT_SCHEMA: TrackSchema = TrackSchema {
    major: 1,
    minor: 0,
    patch: 0,
    name: "case-lifecycle",
    features: &[
        "organizations",
        "firs",
        "cases",
        "case_assignments",
        "court_submissions",
        "court_actions",
        "case_reopen_requests",
        "document_requests",
        "investigation_records",
        "audit_log",
    ],
};

/// Describes the version and capabilities of the schema
#[derive(Debug, Clone)]
pub struct TrackSchema {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub name: &'static str,
    pub features: &'static [&'static str],
}

impl TrackSchema {
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(&feature)
    }
}

impl std::fmt::Display for TrackSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{} ({})", self.version_string(), self.name)
    }
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable schema version
#[derive(Insertable)]
#[diesel(table_name = schema_versions)]
pub struct NewSchemaVersion<'a> {
    pub version: &'a str,
    pub name: &'a str,
    pub features: &'a str,
    pub introduced_at: &'a str,
}

/// Queryable schema version
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = schema_versions)]
pub struct StoredSchema {
    pub id: i32,
    pub version: String,
    pub name: String,
    pub features: String,
    pub introduced_at: String,
}

/// Insertable audit entry
#[derive(Insertable)]
#[diesel(table_name = audit_log)]
pub struct NewAuditEntry<'a> {
    pub user_id: i32,
    pub action: &'a str,
    pub entity: &'a str,
    pub entity_id: i32,
    pub created_at: &'a str,
}

/// Queryable audit entry
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = audit_log)]
pub struct AuditEntry {
    pub id: i32,
    pub user_id: i32,
    pub action: String,
    pub entity: String,
    pub entity_id: i32,
    pub created_at: String,
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub(crate) type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database connection wrapper with connection pool
pub struct Database {
    pool: DbPool,
}

/// Error type for all core operations
#[derive(Debug)]
pub enum DbError {
    Connection(String),
    Query(diesel::result::Error),
    Pool(String),
    /// Case, request or submission absent
    NotFound(String),
    /// Organization, role or assignment mismatch
    Forbidden(String),
    /// Operation illegal from the current case or workflow state
    StateConflict(String),
    /// Malformed input rejected before any write
    Validation(String),
    /// Invariant breakage that indicates a prior atomicity bug; fatal
    Consistency(String),
    /// File store collaborator failure on a critical attachment
    Storage(String),
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbError::Connection(msg) => write!(f, "Connection error: {}", msg),
            DbError::Query(e) => write!(f, "Query error: {}", e),
            DbError::Pool(msg) => write!(f, "Pool error: {}", msg),
            DbError::NotFound(msg) => write!(f, "{}", msg),
            DbError::Forbidden(msg) => write!(f, "{}", msg),
            DbError::StateConflict(msg) => write!(f, "{}", msg),
            DbError::Validation(msg) => write!(f, "{}", msg),
            DbError::Consistency(msg) => write!(f, "Consistency violation: {}", msg),
            DbError::Storage(msg) => write!(f, "File store error: {}", msg),
        }
    }
}

impl std::error::Error for DbError {}

impl From<diesel::result::Error> for DbError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => DbError::NotFound("Record not found".to_string()),
            // The partial unique indexes on active assignments and pending
            // reopen requests turn lost races into unique violations.
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => DbError::StateConflict(format!("Conflicting concurrent write: {}", info.message())),
            other => DbError::Query(other),
        }
    }
}

impl From<diesel::r2d2::Error> for DbError {
    fn from(e: diesel::r2d2::Error) -> Self {
        DbError::Pool(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// RFC 3339 UTC timestamp used for every stored time column
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Id of the row inserted last on this connection
pub(crate) fn last_insert_rowid(conn: &mut SqliteConnection) -> Result<i32> {
    let id: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>(
        "last_insert_rowid()",
    ))
    .first(conn)?;
    Ok(id)
}

/// Append an audit entry on the caller's connection. Callers invoke this
/// inside their own transaction so the audit write commits with the mutation
/// it describes, or not at all.
pub(crate) fn record_audit(
    conn: &mut SqliteConnection,
    user_id: i32,
    action: &str,
    entity: &str,
    entity_id: i32,
) -> Result<()> {
    let entry = NewAuditEntry {
        user_id,
        action,
        entity,
        entity_id,
        created_at: &now(),
    };
    diesel::insert_into(audit_log::table)
        .values(&entry)
        .execute(conn)?;
    Ok(())
}

/// Per-connection setup. The busy timeout makes queued writers wait for the
/// lock instead of failing immediately under concurrent load.
#[derive(Debug)]
struct ConnectionSetup;

impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionSetup {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Walk up directory tree to find .casetrack folder (like git finds .git)
/// Can be overridden with CASETRACK_DB_PATH env var
fn get_db_path() -> std::path::PathBuf {
    // Check env var first - always takes priority
    if let Ok(path) = std::env::var("CASETRACK_DB_PATH") {
        return std::path::PathBuf::from(path);
    }

    if let Ok(current_dir) = std::env::current_dir() {
        let mut dir = current_dir.as_path();
        loop {
            let casetrack_dir = dir.join(".casetrack");
            if casetrack_dir.exists() && casetrack_dir.is_dir() {
                return casetrack_dir.join("casetrack.db");
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break, // Reached filesystem root
            }
        }
    }

    std::path::PathBuf::from(".casetrack/casetrack.db")
}

impl Database {
    /// Get the database path that will be used
    pub fn db_path() -> std::path::PathBuf {
        get_db_path()
    }

    /// Create a new database at a custom path
    pub fn new(path: &str) -> Result<Self> {
        Self::open_at(path)
    }

    /// Open database at default path (respects CASETRACK_DB_PATH env var)
    pub fn open() -> Result<Self> {
        let path = get_db_path();
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).ok();
            }
        }
        Self::open_at(&path)
    }

    /// Open database at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .connection_customizer(Box::new(ConnectionSetup))
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    pub(crate) fn get_conn(&self) -> Result<DbConn> {
        self.pool
            .get()
            .map_err(|e| DbError::Connection(e.to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        // Run raw SQL to create tables if they don't exist
        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                version TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                features TEXT NOT NULL,
                introduced_at TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS organizations (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                district TEXT NOT NULL,
                state TEXT NOT NULL,
                court_type TEXT,
                created_at TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                organization_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                FOREIGN KEY (organization_id) REFERENCES organizations(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS firs (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                fir_number TEXT NOT NULL UNIQUE,
                police_station_id INTEGER NOT NULL,
                registered_by INTEGER NOT NULL,
                incident_date TEXT NOT NULL,
                sections_applied TEXT NOT NULL,
                description TEXT,
                document_url TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (police_station_id) REFERENCES organizations(id),
                FOREIGN KEY (registered_by) REFERENCES users(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS cases (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_number TEXT NOT NULL UNIQUE,
                fir_id INTEGER NOT NULL UNIQUE,
                is_archived BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (fir_id) REFERENCES firs(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS current_case_state (
                case_id INTEGER PRIMARY KEY NOT NULL,
                current_state TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS case_state_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                from_state TEXT NOT NULL,
                to_state TEXT NOT NULL,
                changed_by INTEGER NOT NULL,
                change_reason TEXT NOT NULL,
                changed_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id),
                FOREIGN KEY (changed_by) REFERENCES users(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS case_assignments (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                assigned_to INTEGER NOT NULL,
                assigned_by INTEGER NOT NULL,
                assignment_reason TEXT NOT NULL,
                assigned_at TEXT NOT NULL,
                unassigned_at TEXT,
                FOREIGN KEY (case_id) REFERENCES cases(id),
                FOREIGN KEY (assigned_to) REFERENCES users(id),
                FOREIGN KEY (assigned_by) REFERENCES users(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS court_submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                submission_version INTEGER NOT NULL,
                submitted_by INTEGER NOT NULL,
                court_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                submitted_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id),
                FOREIGN KEY (submitted_by) REFERENCES users(id),
                FOREIGN KEY (court_id) REFERENCES organizations(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS acknowledgements (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                submission_id INTEGER NOT NULL UNIQUE,
                ack_number TEXT NOT NULL,
                ack_time TEXT NOT NULL,
                FOREIGN KEY (submission_id) REFERENCES court_submissions(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS court_actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                action_type TEXT NOT NULL,
                order_file_url TEXT,
                action_date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS case_reopen_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                requested_by INTEGER NOT NULL,
                police_reason TEXT NOT NULL,
                status TEXT NOT NULL,
                reviewed_by INTEGER,
                judge_note TEXT,
                decided_at TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id),
                FOREIGN KEY (requested_by) REFERENCES users(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS document_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                requested_by INTEGER NOT NULL,
                document_type TEXT NOT NULL,
                request_reason TEXT NOT NULL,
                status TEXT NOT NULL,
                approved_by INTEGER,
                issued_by INTEGER,
                issued_file_url TEXT,
                remarks TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id),
                FOREIGN KEY (requested_by) REFERENCES users(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS investigation_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                event_date TEXT NOT NULL,
                description TEXT NOT NULL,
                performed_by INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id),
                FOREIGN KEY (performed_by) REFERENCES users(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS evidence (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                category TEXT NOT NULL,
                file_url TEXT NOT NULL,
                uploaded_by INTEGER NOT NULL,
                uploaded_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id),
                FOREIGN KEY (uploaded_by) REFERENCES users(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS witnesses (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                contact TEXT,
                address TEXT,
                statement_file_url TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS accused (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                case_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (case_id) REFERENCES cases(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                user_id INTEGER NOT NULL,
                action TEXT NOT NULL,
                entity TEXT NOT NULL,
                entity_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
        "#,
        )
        .execute(&mut conn)?;

        // Create indexes
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_users_org ON users(organization_id)")
            .execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_firs_station ON firs(police_station_id)")
            .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_history_case ON case_state_history(case_id)",
        )
        .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_assignments_case ON case_assignments(case_id)",
        )
        .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_assignments_user ON case_assignments(assigned_to)",
        )
        .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_submissions_case ON court_submissions(case_id)",
        )
        .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_submissions_court ON court_submissions(court_id)",
        )
        .execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_actions_case ON court_actions(case_id)")
            .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_doc_requests_case ON document_requests(case_id)",
        )
        .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity, entity_id)",
        )
        .execute(&mut conn)?;

        // Storage-level invariants. Application code checks these too, but the
        // partial unique indexes hold even when two writers race.
        diesel::sql_query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_one_active_assignment
             ON case_assignments(case_id) WHERE unassigned_at IS NULL",
        )
        .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_one_pending_reopen
             ON case_reopen_requests(case_id) WHERE status = 'REQUESTED'",
        )
        .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_submission_version
             ON court_submissions(case_id, submission_version)",
        )
        .execute(&mut conn)?;

        // Register current schema
        self.register_schema(&CURRENT_SCHEMA)?;
        Ok(())
    }

    fn register_schema(&self, schema: &TrackSchema) -> Result<()> {
        let mut conn = self.get_conn()?;
        let now = now();
        let features_json = serde_json::to_string(&schema.features).unwrap_or_default();

        let new_schema = NewSchemaVersion {
            version: &schema.version_string(),
            name: schema.name,
            features: &features_json,
            introduced_at: &now,
        };

        diesel::insert_or_ignore_into(schema_versions::table)
            .values(&new_schema)
            .execute(&mut conn)?;

        Ok(())
    }

    /// All registered schema versions, oldest first
    pub fn schema_versions(&self) -> Result<Vec<StoredSchema>> {
        let mut conn = self.get_conn()?;
        let rows = schema_versions::table
            .order(schema_versions::id.asc())
            .load::<StoredSchema>(&mut conn)?;
        Ok(rows)
    }

    // ========================================================================
    // Audit Recorder - read side
    // ========================================================================

    /// Audit trail for one entity, newest first
    pub fn audit_for_entity(&self, entity: &str, entity_id: i32) -> Result<Vec<AuditEntry>> {
        let mut conn = self.get_conn()?;
        let rows = audit_log::table
            .filter(audit_log::entity.eq(entity))
            .filter(audit_log::entity_id.eq(entity_id))
            .order(audit_log::id.desc())
            .load::<AuditEntry>(&mut conn)?;
        Ok(rows)
    }

    /// Most recent audit entries across all entities
    pub fn recent_audit(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let mut conn = self.get_conn()?;
        let rows = audit_log::table
            .order(audit_log::id.desc())
            .limit(limit)
            .load::<AuditEntry>(&mut conn)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_string() {
        assert_eq!(CURRENT_SCHEMA.version_string(), "1.0.0");
        assert!(CURRENT_SCHEMA.has_feature("audit_log"));
        assert!(!CURRENT_SCHEMA.has_feature("telemetry"));
    }

    #[test]
    fn test_open_registers_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path().join("t.db")).unwrap();
        let versions = db.schema_versions().unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, "1.0.0");
    }

    #[test]
    fn test_not_found_mapping() {
        let err: DbError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
