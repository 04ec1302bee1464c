use serde::{Deserialize, Serialize};

/// An enrollment record scoping a person to a session within one year.
///
/// At most one enrollment exists per `(person_cm_id, year)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendeeInfo {
    pub person_cm_id: i64,
    pub session_cm_id: i64,
    pub school: Option<String>,
    pub grade: Option<i32>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Groups siblings for social-graph construction; `None` when the
    /// roster has no family linkage for this enrollment.
    pub family_id: Option<String>,
    /// Groups current-year bunkmates for social-graph construction.
    pub current_bunk_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    Main,
    Ag,
    Embedded,
    Taste,
    Family,
    Other,
}

/// A camp time-slice. Sessions form a forest: a `main` session may have
/// `embedded`/`ag` children via `parent_session_cm_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_cm_id: i64,
    pub year: i32,
    pub name: String,
    pub session_type: SessionType,
    pub parent_session_cm_id: Option<i64>,
}
