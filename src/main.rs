use casetrack::storage::LocalFileStore;
use casetrack::{
    AccusedStatus, Actor, CourtActionType, Database, DbError, DocumentType, FirInput, Role,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "casetrack")]
#[command(author, version, about = "Case lifecycle tracking for police stations and courts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage police stations
    Station {
        #[command(subcommand)]
        command: StationCommand,
    },
    /// Manage courts
    Court {
        #[command(subcommand)]
        command: CourtCommand,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Register and inspect FIRs
    Fir {
        #[command(subcommand)]
        command: FirCommand,
    },
    /// Case lifecycle operations
    Case {
        #[command(subcommand)]
        command: CaseCommand,
    },
    /// Court submissions and judicial actions
    Submission {
        #[command(subcommand)]
        command: SubmissionCommand,
    },
    /// Investigation records
    Investigation {
        #[command(subcommand)]
        command: InvestigationCommand,
    },
    /// Case reopen requests
    Reopen {
        #[command(subcommand)]
        command: ReopenCommand,
    },
    /// Document requests
    Doc {
        #[command(subcommand)]
        command: DocCommand,
    },
    /// Inspect the audit trail
    Audit {
        /// Entity kind (CASE, FIR, DOCUMENT_REQUEST, ...)
        entity: Option<String>,
        /// Entity id
        entity_id: Option<i32>,
        /// Max entries to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
    /// Generate shell completions
    Completion {
        /// Shell to generate for
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum StationCommand {
    /// Register a police station
    Create {
        name: String,
        #[arg(short, long)]
        district: String,
        #[arg(short, long)]
        state: String,
    },
    /// List police stations
    List,
    /// List active officers of a station
    Officers { station_id: i32 },
}

#[derive(Subcommand, Debug)]
enum CourtCommand {
    /// Register a court
    Create {
        name: String,
        #[arg(short, long)]
        district: String,
        #[arg(short, long)]
        state: String,
        /// Court type (e.g. SESSIONS, MAGISTRATE, HIGH)
        #[arg(short = 't', long, default_value = "SESSIONS")]
        court_type: String,
    },
    /// List courts
    List,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create a user inside an organization
    Create {
        organization_id: i32,
        name: String,
        #[arg(short, long)]
        email: String,
        /// POLICE, SHO, COURT_CLERK or JUDGE
        #[arg(short, long)]
        role: String,
    },
    /// Deactivate a user (SHO only)
    Deactivate {
        user_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Show a user
    Show { user_id: i32 },
}

#[derive(Subcommand, Debug)]
enum FirCommand {
    /// Register a FIR (creates its case)
    Register {
        fir_number: String,
        #[arg(short, long)]
        incident_date: String,
        #[arg(short, long)]
        sections: String,
        #[arg(long)]
        description: Option<String>,
        /// FIR document to attach (best-effort)
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Show a FIR
    Show {
        fir_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
}

#[derive(Subcommand, Debug)]
enum CaseCommand {
    /// Assign a case to an officer (SHO only)
    Assign {
        case_id: i32,
        officer_id: i32,
        #[arg(short, long, default_value = "Assigned by SHO")]
        reason: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Start the investigation
    Start {
        case_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Mark the investigation complete
    Complete {
        case_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Record the charge sheet as prepared
    ChargeSheet {
        case_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Archive a case
    Archive {
        case_id: i32,
        #[arg(short, long)]
        reason: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Show one case with state, assignment and history
    Show {
        case_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
        /// Emit JSON instead of the table view
        #[arg(long)]
        json: bool,
    },
    /// Cases currently assigned to you
    Mine {
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
        #[arg(short, long, default_value = "20")]
        limit: i64,
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// All cases of your station
    List {
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
        #[arg(short, long, default_value = "20")]
        limit: i64,
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Assignment history of a case
    Assignments { case_id: i32 },
}

#[derive(Subcommand, Debug)]
enum SubmissionCommand {
    /// Submit a case to a court
    Submit {
        case_id: i32,
        court_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Accept a submitted case into your court
    Intake {
        case_id: i32,
        /// Acknowledgement number to issue
        #[arg(long)]
        ack: Option<String>,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Reject the pending submission, returning the case for resubmission
    Reject {
        case_id: i32,
        #[arg(short, long)]
        reason: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Record a judicial action (judge only)
    Action {
        case_id: i32,
        /// COGNIZANCE, HEARING, SUMMONS, WARRANT, BAIL_ORDER or JUDGMENT
        action_type: String,
        #[arg(short, long)]
        date: String,
        #[arg(long)]
        order_url: Option<String>,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Actions recorded against a case
    Actions {
        case_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Submission ledger of a case
    List { case_id: i32 },
}

#[derive(Subcommand, Debug)]
enum InvestigationCommand {
    /// Record an investigation event
    Event {
        case_id: i32,
        event_type: String,
        #[arg(short, long)]
        date: String,
        #[arg(long)]
        description: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Attach evidence (upload failure fails the command)
    Evidence {
        case_id: i32,
        #[arg(short, long)]
        category: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Record a witness with their statement file
    Witness {
        case_id: i32,
        name: String,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        statement: PathBuf,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Record an accused person
    Accused {
        case_id: i32,
        name: String,
        /// ABSCONDING, ARRESTED, ON_BAIL or CHARGED
        #[arg(short, long, default_value = "ABSCONDING")]
        status: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// List investigation records of a case
    Show {
        case_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
}

#[derive(Subcommand, Debug)]
enum ReopenCommand {
    /// Request reopening an archived case
    Request {
        case_id: i32,
        #[arg(short, long)]
        reason: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Approve a reopen request (judge only)
    Approve {
        request_id: i32,
        #[arg(short, long)]
        note: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Reject a reopen request (judge only)
    Reject {
        request_id: i32,
        #[arg(short, long)]
        reason: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Your own reopen requests
    Mine {
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Pending requests for your court (judge only)
    Pending {
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
}

#[derive(Subcommand, Debug)]
enum DocCommand {
    /// Request a document for your case
    Request {
        case_id: i32,
        /// FIR_COPY, CHARGE_SHEET, COURT_ORDER, POST_MORTEM_REPORT or OTHER
        document_type: String,
        #[arg(short, long)]
        reason: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Approve a request for court review (SHO only)
    Approve {
        request_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Reject a request
    Reject {
        request_id: i32,
        #[arg(short, long)]
        reason: String,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Issue the requested document with its file (court side)
    Issue {
        request_id: i32,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        remarks: Option<String>,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Your own document requests
    Mine {
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// Requests awaiting your station review (SHO only)
    Pending {
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// SHO-approved requests before your court
    Approved {
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
    /// All requests on one case
    ByCase {
        case_id: i32,
        #[arg(long = "as", value_name = "USER_ID")]
        actor: i32,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::Completion { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "casetrack", &mut io::stdout());
        return;
    }

    if let Err(e) = run(cli.command) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = casetrack::Config::load();
    let store = LocalFileStore::new(&config.storage.files_dir);

    match command {
        Command::Station { command } => match command {
            StationCommand::Create {
                name,
                district,
                state,
            } => {
                let id = db.create_police_station(&name, &district, &state)?;
                println!("{} station {} (id {})", "Created".green(), name.bold(), id);
            }
            StationCommand::List => {
                for org in db.police_stations()? {
                    println!(
                        "{:>4}  {}  {} / {}",
                        org.id,
                        org.name.bold(),
                        org.district,
                        org.state
                    );
                }
            }
            StationCommand::Officers { station_id } => {
                for user in db.officers_by_station(station_id)? {
                    println!("{:>4}  {}  <{}>", user.id, user.name.bold(), user.email);
                }
            }
        },

        Command::Court { command } => match command {
            CourtCommand::Create {
                name,
                district,
                state,
                court_type,
            } => {
                let id = db.create_court(&name, &district, &state, &court_type)?;
                println!("{} court {} (id {})", "Created".green(), name.bold(), id);
            }
            CourtCommand::List => {
                for org in db.courts()? {
                    println!(
                        "{:>4}  {}  {}  {} / {}",
                        org.id,
                        org.name.bold(),
                        org.court_type.as_deref().unwrap_or("-"),
                        org.district,
                        org.state
                    );
                }
            }
        },

        Command::User { command } => match command {
            UserCommand::Create {
                organization_id,
                name,
                email,
                role,
            } => {
                let role = Role::parse(&role)?;
                let id = db.create_user(organization_id, &name, &email, role)?;
                println!(
                    "{} user {} as {} (id {})",
                    "Created".green(),
                    name.bold(),
                    role,
                    id
                );
            }
            UserCommand::Deactivate { user_id, actor } => {
                let actor = db.actor_for_user(actor)?;
                db.deactivate_user(&actor, user_id)?;
                println!("{} user {}", "Deactivated".yellow(), user_id);
            }
            UserCommand::Show { user_id } => {
                let user = db.get_user(user_id)?;
                println!("{}", serde_json::to_string_pretty(&user)?);
            }
        },

        Command::Fir { command } => match command {
            FirCommand::Register {
                fir_number,
                incident_date,
                sections,
                description,
                file,
                actor,
            } => {
                let actor = db.actor_for_user(actor)?;
                let input = FirInput {
                    fir_number,
                    incident_date,
                    sections_applied: sections,
                    description,
                };
                let bytes = file.as_ref().map(std::fs::read).transpose()?;
                let document = match (&bytes, &file) {
                    (Some(b), Some(p)) => Some((
                        b.as_slice(),
                        p.file_name().and_then(|n| n.to_str()).unwrap_or("fir.pdf"),
                    )),
                    _ => None,
                };
                let registered = db.register_fir(&actor, &input, document, &store)?;
                println!(
                    "{} FIR {} -> case {} ({})",
                    "Registered".green(),
                    registered.fir_id,
                    registered.case_id,
                    registered.case_number.bold()
                );
                if let Some(url) = registered.document_url {
                    println!("  document: {}", url);
                }
            }
            FirCommand::Show { fir_id, actor } => {
                let actor = db.actor_for_user(actor)?;
                let fir = db.get_fir(&actor, fir_id)?;
                println!("{}", serde_json::to_string_pretty(&fir)?);
            }
        },

        Command::Case { command } => run_case(&db, command)?,
        Command::Submission { command } => run_submission(&db, command)?,
        Command::Investigation { command } => run_investigation(&db, &store, command)?,
        Command::Reopen { command } => run_reopen(&db, command)?,
        Command::Doc { command } => run_doc(&db, &store, command)?,

        Command::Audit {
            entity,
            entity_id,
            limit,
        } => {
            let entries = match (entity, entity_id) {
                (Some(entity), Some(id)) => db.audit_for_entity(&entity, id)?,
                (None, _) => db.recent_audit(limit)?,
                (Some(_), None) => {
                    return Err(Box::new(DbError::Validation(
                        "Entity id required when an entity kind is given".to_string(),
                    )))
                }
            };
            for e in entries {
                println!(
                    "{}  {}  {}#{} by user {}",
                    e.created_at.dimmed(),
                    e.action.bold(),
                    e.entity,
                    e.entity_id,
                    e.user_id
                );
            }
        }

        // Handled in main before the database is opened
        Command::Completion { .. } => unreachable!(),
    }
    Ok(())
}

fn resolve(db: &Database, user_id: i32) -> Result<Actor, DbError> {
    db.actor_for_user(user_id)
}

fn run_case(db: &Database, command: CaseCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        CaseCommand::Assign {
            case_id,
            officer_id,
            reason,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let assignment = db.assign_case(&actor, case_id, officer_id, &reason)?;
            println!(
                "{} case {} to officer {}",
                "Assigned".green(),
                case_id,
                assignment.assigned_to
            );
        }
        CaseCommand::Start { case_id, actor } => {
            let actor = resolve(db, actor)?;
            db.start_investigation(&actor, case_id)?;
            println!("{} investigation on case {}", "Started".green(), case_id);
        }
        CaseCommand::Complete { case_id, actor } => {
            let actor = resolve(db, actor)?;
            db.complete_investigation(&actor, case_id)?;
            println!("{} investigation on case {}", "Completed".green(), case_id);
        }
        CaseCommand::ChargeSheet { case_id, actor } => {
            let actor = resolve(db, actor)?;
            db.prepare_charge_sheet(&actor, case_id)?;
            println!("{} charge sheet for case {}", "Prepared".green(), case_id);
        }
        CaseCommand::Archive {
            case_id,
            reason,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            db.archive_case(&actor, case_id, &reason)?;
            println!("{} case {}", "Archived".yellow(), case_id);
        }
        CaseCommand::Show {
            case_id,
            actor,
            json,
        } => {
            let actor = resolve(db, actor)?;
            let detail = db.get_case(&actor, case_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                println!(
                    "{} ({})  state: {}",
                    detail.case.case_number.bold(),
                    if detail.case.is_archived {
                        "archived".yellow()
                    } else {
                        "open".green()
                    },
                    detail.current_state.as_str().cyan()
                );
                println!("  FIR {}  sections: {}", detail.fir.fir_number, detail.fir.sections_applied);
                match &detail.active_assignment {
                    Some(a) => println!("  assigned to officer {}", a.assigned_to),
                    None => println!("  {}", "unassigned".dimmed()),
                }
                for h in &detail.recent_history {
                    println!(
                        "  {}  {} -> {}  ({})",
                        h.changed_at.dimmed(),
                        h.from_state,
                        h.to_state,
                        h.change_reason
                    );
                }
            }
        }
        CaseCommand::Mine {
            actor,
            limit,
            offset,
        } => {
            let actor = resolve(db, actor)?;
            for s in db.my_cases(&actor, limit, offset)? {
                println!(
                    "{:>4}  {}  {}",
                    s.case.id,
                    s.case.case_number.bold(),
                    s.current_state.as_str().cyan()
                );
            }
        }
        CaseCommand::List {
            actor,
            limit,
            offset,
        } => {
            let actor = resolve(db, actor)?;
            for s in db.station_cases(&actor, limit, offset)? {
                let assignee = s
                    .assigned_to
                    .map(|id| format!("officer {}", id))
                    .unwrap_or_else(|| "unassigned".to_string());
                println!(
                    "{:>4}  {}  {}  {}",
                    s.case.id,
                    s.case.case_number.bold(),
                    s.current_state.as_str().cyan(),
                    assignee.dimmed()
                );
            }
        }
        CaseCommand::Assignments { case_id } => {
            for a in db.assignment_history(case_id)? {
                let status = match &a.unassigned_at {
                    Some(t) => format!("closed {}", t),
                    None => "active".to_string(),
                };
                println!(
                    "{:>4}  officer {} by {}  {}  ({})",
                    a.id, a.assigned_to, a.assigned_by, status, a.assignment_reason
                );
            }
        }
    }
    Ok(())
}

fn run_submission(
    db: &Database,
    command: SubmissionCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SubmissionCommand::Submit {
            case_id,
            court_id,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let sub = db.submit_to_court(&actor, case_id, court_id)?;
            println!(
                "{} case {} to court {} (version {})",
                "Submitted".green(),
                case_id,
                court_id,
                sub.submission_version
            );
        }
        SubmissionCommand::Intake {
            case_id,
            ack,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            db.intake_case(&actor, case_id, ack.as_deref())?;
            println!("{} case {}", "Accepted".green(), case_id);
        }
        SubmissionCommand::Reject {
            case_id,
            reason,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            db.reject_submission(&actor, case_id, &reason)?;
            println!("{} submission for case {}", "Rejected".yellow(), case_id);
        }
        SubmissionCommand::Action {
            case_id,
            action_type,
            date,
            order_url,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let action_type = CourtActionType::parse(&action_type)?;
            let action =
                db.record_court_action(&actor, case_id, action_type, order_url.as_deref(), &date)?;
            println!(
                "{} {} on case {} (action {})",
                "Recorded".green(),
                action.action_type,
                case_id,
                action.id
            );
        }
        SubmissionCommand::Actions { case_id, actor } => {
            let actor = resolve(db, actor)?;
            for a in db.court_actions(&actor, case_id)? {
                println!(
                    "{:>4}  {}  {}  {}",
                    a.id,
                    a.action_date,
                    a.action_type.bold(),
                    a.order_file_url.as_deref().unwrap_or("-").dimmed()
                );
            }
        }
        SubmissionCommand::List { case_id } => {
            for s in db.submissions(case_id)? {
                println!(
                    "v{}  court {}  {}  {}",
                    s.submission_version,
                    s.court_id,
                    s.status.bold(),
                    s.submitted_at.dimmed()
                );
            }
        }
    }
    Ok(())
}

fn run_investigation(
    db: &Database,
    store: &LocalFileStore,
    command: InvestigationCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        InvestigationCommand::Event {
            case_id,
            event_type,
            date,
            description,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let event =
                db.add_investigation_event(&actor, case_id, &event_type, &date, &description)?;
            println!("{} event {} on case {}", "Recorded".green(), event.id, case_id);
        }
        InvestigationCommand::Evidence {
            case_id,
            category,
            file,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let bytes = std::fs::read(&file)?;
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("evidence");
            let evidence = db.add_evidence(&actor, case_id, &category, &bytes, name, store)?;
            println!(
                "{} evidence {} ({})",
                "Attached".green(),
                evidence.id,
                evidence.file_url
            );
        }
        InvestigationCommand::Witness {
            case_id,
            name,
            contact,
            address,
            statement,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let bytes = std::fs::read(&statement)?;
            let file_name = statement
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("statement");
            let witness = db.add_witness(
                &actor,
                case_id,
                &name,
                contact.as_deref(),
                address.as_deref(),
                &bytes,
                file_name,
                store,
            )?;
            println!("{} witness {} on case {}", "Recorded".green(), witness.id, case_id);
        }
        InvestigationCommand::Accused {
            case_id,
            name,
            status,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let status = AccusedStatus::parse(&status)?;
            let accused = db.add_accused(&actor, case_id, &name, status)?;
            println!("{} accused {} on case {}", "Recorded".green(), accused.id, case_id);
        }
        InvestigationCommand::Show { case_id, actor } => {
            let actor = resolve(db, actor)?;
            println!("{}", "Events".bold());
            for e in db.investigation_events(&actor, case_id)? {
                println!("  {}  {}  {}", e.event_date, e.event_type.bold(), e.description);
            }
            println!("{}", "Evidence".bold());
            for e in db.evidence_for_case(&actor, case_id)? {
                println!("  {:>4}  {}  {}", e.id, e.category, e.file_url.dimmed());
            }
            println!("{}", "Witnesses".bold());
            for w in db.witnesses_for_case(&actor, case_id)? {
                println!("  {:>4}  {}", w.id, w.name);
            }
            println!("{}", "Accused".bold());
            for a in db.accused_for_case(&actor, case_id)? {
                println!("  {:>4}  {}  {}", a.id, a.name, a.status.yellow());
            }
        }
    }
    Ok(())
}

fn run_reopen(db: &Database, command: ReopenCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ReopenCommand::Request {
            case_id,
            reason,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let req = db.request_reopen(&actor, case_id, &reason)?;
            println!("{} reopen request {} for case {}", "Filed".green(), req.id, case_id);
        }
        ReopenCommand::Approve {
            request_id,
            note,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let req = db.approve_reopen(&actor, request_id, &note)?;
            println!(
                "{} reopen request {}; case {} is back under investigation",
                "Approved".green(),
                req.id,
                req.case_id
            );
        }
        ReopenCommand::Reject {
            request_id,
            reason,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let req = db.reject_reopen(&actor, request_id, &reason)?;
            println!("{} reopen request {}", "Rejected".yellow(), req.id);
        }
        ReopenCommand::Mine { actor } => {
            let actor = resolve(db, actor)?;
            for r in db.my_reopen_requests(&actor)? {
                println!("{:>4}  case {}  {}  {}", r.id, r.case_id, r.status.bold(), r.police_reason);
            }
        }
        ReopenCommand::Pending { actor } => {
            let actor = resolve(db, actor)?;
            for r in db.pending_reopens_for_judge(&actor)? {
                println!("{:>4}  case {}  {}", r.id, r.case_id, r.police_reason);
            }
        }
    }
    Ok(())
}

fn run_doc(
    db: &Database,
    store: &LocalFileStore,
    command: DocCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        DocCommand::Request {
            case_id,
            document_type,
            reason,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let document_type = DocumentType::parse(&document_type)?;
            let req = db.create_document_request(&actor, case_id, document_type, &reason)?;
            println!("{} document request {} for case {}", "Filed".green(), req.id, case_id);
        }
        DocCommand::Approve { request_id, actor } => {
            let actor = resolve(db, actor)?;
            let req = db.sho_approve_document_request(&actor, request_id)?;
            println!("{} document request {}", "Approved".green(), req.id);
        }
        DocCommand::Reject {
            request_id,
            reason,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let req = db.reject_document_request(&actor, request_id, &reason)?;
            println!("{} document request {}", "Rejected".yellow(), req.id);
        }
        DocCommand::Issue {
            request_id,
            file,
            remarks,
            actor,
        } => {
            let actor = resolve(db, actor)?;
            let bytes = std::fs::read(&file)?;
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("document");
            let req =
                db.issue_document(&actor, request_id, &bytes, name, remarks.as_deref(), store)?;
            println!(
                "{} document request {} ({})",
                "Issued".green(),
                req.id,
                req.issued_file_url.as_deref().unwrap_or("-")
            );
        }
        DocCommand::Mine { actor } => {
            let actor = resolve(db, actor)?;
            for r in db.my_document_requests(&actor)? {
                println!(
                    "{:>4}  case {}  {}  {}",
                    r.id,
                    r.case_id,
                    r.document_type,
                    r.status.bold()
                );
            }
        }
        DocCommand::Pending { actor } => {
            let actor = resolve(db, actor)?;
            for r in db.pending_document_requests_for_sho(&actor)? {
                println!("{:>4}  case {}  {}  {}", r.id, r.case_id, r.document_type, r.request_reason);
            }
        }
        DocCommand::Approved { actor } => {
            let actor = resolve(db, actor)?;
            for r in db.approved_document_requests_for_court(&actor)? {
                println!("{:>4}  case {}  {}  {}", r.id, r.case_id, r.document_type, r.request_reason);
            }
        }
        DocCommand::ByCase { case_id, actor } => {
            let actor = resolve(db, actor)?;
            for r in db.document_requests_by_case(&actor, case_id)? {
                println!("{:>4}  {}  {}", r.id, r.document_type, r.status.bold());
            }
        }
    }
    Ok(())
}
