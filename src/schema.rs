// Casetrack schema - case lifecycle tables for Diesel ORM

diesel::table! {
    schema_versions (id) {
        id -> Integer,
        version -> Text,
        name -> Text,
        features -> Text,
        introduced_at -> Text,
    }
}

// ============================================================================
// Organization Directory
// ============================================================================

diesel::table! {
    organizations (id) {
        id -> Integer,
        kind -> Text,
        name -> Text,
        district -> Text,
        state -> Text,
        court_type -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        organization_id -> Integer,
        name -> Text,
        email -> Text,
        role -> Text,
        is_active -> Bool,
        created_at -> Text,
    }
}

// ============================================================================
// FIR and Case
// ============================================================================

diesel::table! {
    firs (id) {
        id -> Integer,
        fir_number -> Text,
        police_station_id -> Integer,
        registered_by -> Integer,
        incident_date -> Text,
        sections_applied -> Text,
        description -> Nullable<Text>,
        document_url -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    cases (id) {
        id -> Integer,
        case_number -> Text,
        fir_id -> Integer,
        is_archived -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    current_case_state (case_id) {
        case_id -> Integer,
        current_state -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    case_state_history (id) {
        id -> Integer,
        case_id -> Integer,
        from_state -> Text,
        to_state -> Text,
        changed_by -> Integer,
        change_reason -> Text,
        changed_at -> Text,
    }
}

diesel::table! {
    case_assignments (id) {
        id -> Integer,
        case_id -> Integer,
        assigned_to -> Integer,
        assigned_by -> Integer,
        assignment_reason -> Text,
        assigned_at -> Text,
        unassigned_at -> Nullable<Text>,
    }
}

// ============================================================================
// Court Submission Ledger and Court Action Log
// ============================================================================

diesel::table! {
    court_submissions (id) {
        id -> Integer,
        case_id -> Integer,
        submission_version -> Integer,
        submitted_by -> Integer,
        court_id -> Integer,
        status -> Text,
        submitted_at -> Text,
    }
}

diesel::table! {
    acknowledgements (id) {
        id -> Integer,
        submission_id -> Integer,
        ack_number -> Text,
        ack_time -> Text,
    }
}

diesel::table! {
    court_actions (id) {
        id -> Integer,
        case_id -> Integer,
        action_type -> Text,
        order_file_url -> Nullable<Text>,
        action_date -> Text,
        created_at -> Text,
    }
}

// ============================================================================
// Approval workflows
// ============================================================================

diesel::table! {
    case_reopen_requests (id) {
        id -> Integer,
        case_id -> Integer,
        requested_by -> Integer,
        police_reason -> Text,
        status -> Text,
        reviewed_by -> Nullable<Integer>,
        judge_note -> Nullable<Text>,
        decided_at -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    document_requests (id) {
        id -> Integer,
        case_id -> Integer,
        requested_by -> Integer,
        document_type -> Text,
        request_reason -> Text,
        status -> Text,
        approved_by -> Nullable<Integer>,
        issued_by -> Nullable<Integer>,
        issued_file_url -> Nullable<Text>,
        remarks -> Nullable<Text>,
        created_at -> Text,
    }
}

// ============================================================================
// Investigation records
// ============================================================================

diesel::table! {
    investigation_events (id) {
        id -> Integer,
        case_id -> Integer,
        event_type -> Text,
        event_date -> Text,
        description -> Text,
        performed_by -> Integer,
        created_at -> Text,
    }
}

diesel::table! {
    evidence (id) {
        id -> Integer,
        case_id -> Integer,
        category -> Text,
        file_url -> Text,
        uploaded_by -> Integer,
        uploaded_at -> Text,
    }
}

diesel::table! {
    witnesses (id) {
        id -> Integer,
        case_id -> Integer,
        name -> Text,
        contact -> Nullable<Text>,
        address -> Nullable<Text>,
        statement_file_url -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    accused (id) {
        id -> Integer,
        case_id -> Integer,
        name -> Text,
        status -> Text,
        created_at -> Text,
    }
}

// ============================================================================
// Audit log - written inside the same transaction as the mutation it records
// ============================================================================

diesel::table! {
    audit_log (id) {
        id -> Integer,
        user_id -> Integer,
        action -> Text,
        entity -> Text,
        entity_id -> Integer,
        created_at -> Text,
    }
}
