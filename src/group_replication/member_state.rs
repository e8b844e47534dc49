//! Member State Resolver
//!
//! Reads Group Replication status from `performance_schema` and maps the
//! server's strings onto closed enums. Unknown strings are errors, never a
//! fallback to an existing state.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::errors::{GrError, GrResult};
use crate::instance::{Instance, Row};
use crate::version::Version;

const APPLIER_GROUP_NAME_SQL: &str = "SELECT GROUP_NAME \
     FROM performance_schema.replication_connection_status \
     WHERE CHANNEL_NAME = 'group_replication_applier'";

const OWN_MEMBER_STATE_SQL: &str = "SELECT m.MEMBER_STATE \
     FROM performance_schema.replication_group_members m \
     LEFT JOIN performance_schema.replication_group_member_stats s \
     ON m.MEMBER_ID = s.MEMBER_ID AND s.CHANNEL_NAME = 'group_replication_applier' \
     WHERE m.MEMBER_ID = @@server_uuid";

/// Columns MEMBER_ROLE and MEMBER_VERSION exist from this release on
const MEMBER_ROLE_VERSION: Version = Version::new(8, 0, 2);

/// State a member reports for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberState {
    Online,
    Recovering,
    Offline,
    Error,
    Unreachable,
    /// No monitoring row exists for the instance
    NotFound,
}

impl MemberState {
    pub const ALL: [MemberState; 6] = [
        MemberState::Online,
        MemberState::Recovering,
        MemberState::Offline,
        MemberState::Error,
        MemberState::Unreachable,
        MemberState::NotFound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberState::Online => "ONLINE",
            MemberState::Recovering => "RECOVERING",
            MemberState::Offline => "OFFLINE",
            MemberState::Error => "ERROR",
            MemberState::Unreachable => "UNREACHABLE",
            MemberState::NotFound => "NOT_FOUND",
        }
    }

    /// Member takes part in the group (counts towards quorum)
    pub fn is_active(&self) -> bool {
        matches!(self, MemberState::Online | MemberState::Recovering)
    }
}

impl fmt::Display for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberState {
    type Err = GrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_member_state(s)
    }
}

/// Case-insensitive mapping of a state string
pub fn to_member_state(state: &str) -> GrResult<MemberState> {
    match state.to_ascii_uppercase().as_str() {
        "ONLINE" => Ok(MemberState::Online),
        "RECOVERING" => Ok(MemberState::Recovering),
        "OFFLINE" => Ok(MemberState::Offline),
        "ERROR" => Ok(MemberState::Error),
        "UNREACHABLE" => Ok(MemberState::Unreachable),
        "NOT_FOUND" => Ok(MemberState::NotFound),
        _ => Err(GrError::UnsupportedState(state.to_string())),
    }
}

/// Role of a member in single-primary mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Primary,
    Secondary,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Primary => "PRIMARY",
            MemberRole::Secondary => "SECONDARY",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Empty role (servers without the column, or members not yet ONLINE)
/// maps to `None`.
pub fn to_member_role(role: &str) -> GrResult<Option<MemberRole>> {
    match role.to_ascii_uppercase().as_str() {
        "" => Ok(None),
        "PRIMARY" => Ok(Some(MemberRole::Primary)),
        "SECONDARY" => Ok(Some(MemberRole::Secondary)),
        _ => Err(GrError::UnsupportedState(format!("role {}", role))),
    }
}

/// One row of `replication_group_members`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub uuid: String,
    pub host: String,
    pub port: u16,
    pub state: MemberState,
    pub role: Option<MemberRole>,
    pub version: Option<String>,
}

impl Member {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn from_row(row: &Row) -> GrResult<Self> {
        let port_text = row.get_or_empty("MEMBER_PORT");
        let port = port_text.parse::<u16>().map_err(|_| {
            GrError::validation(format!("invalid MEMBER_PORT '{}'", port_text))
        })?;
        Ok(Self {
            uuid: row.get_or_empty("MEMBER_ID").to_string(),
            host: row.get_or_empty("MEMBER_HOST").to_string(),
            port,
            state: to_member_state(row.get_or_empty("MEMBER_STATE"))?,
            role: to_member_role(row.get_or_empty("MEMBER_ROLE"))?,
            version: row
                .get("MEMBER_VERSION")
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        })
    }
}

/// Quorum view computed from the member list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuorumStatus {
    pub total: usize,
    pub reachable: usize,
    pub unreachable: usize,
    pub has_quorum: bool,
}

fn applier_group_name(instance: &dyn Instance) -> GrResult<Option<String>> {
    let rows = instance.session().query(APPLIER_GROUP_NAME_SQL)?;
    Ok(rows
        .first()
        .and_then(|row| row.get("GROUP_NAME"))
        .filter(|name| !name.is_empty())
        .map(str::to_string))
}

/// The applier channel reports a group name
pub fn is_member(instance: &dyn Instance) -> GrResult<bool> {
    Ok(applier_group_name(instance)?.is_some())
}

/// The applier channel reports exactly `group_name`, byte for byte
pub fn is_member_of(instance: &dyn Instance, group_name: &str) -> GrResult<bool> {
    Ok(applier_group_name(instance)?.is_some_and(|name| name == group_name))
}

/// State of the instance's own member row, `NotFound` without one
pub fn get_member_state(instance: &dyn Instance) -> GrResult<MemberState> {
    let rows = instance.session().query(OWN_MEMBER_STATE_SQL)?;
    match rows.first() {
        None => Ok(MemberState::NotFound),
        Some(row) => to_member_state(row.get_or_empty("MEMBER_STATE")),
    }
}

/// Every member the instance knows about
pub fn get_members(instance: &dyn Instance) -> GrResult<Vec<Member>> {
    let columns = if instance.get_version() >= MEMBER_ROLE_VERSION {
        "MEMBER_ID, MEMBER_HOST, MEMBER_PORT, MEMBER_STATE, MEMBER_ROLE, MEMBER_VERSION"
    } else {
        "MEMBER_ID, MEMBER_HOST, MEMBER_PORT, MEMBER_STATE, NULL AS MEMBER_ROLE, NULL AS MEMBER_VERSION"
    };
    let sql = format!(
        "SELECT {} FROM performance_schema.replication_group_members",
        columns
    );

    instance
        .session()
        .query(&sql)?
        .iter()
        .map(Member::from_row)
        .collect()
}

/// Majority of members ONLINE or RECOVERING
pub fn has_quorum(instance: &dyn Instance) -> GrResult<QuorumStatus> {
    let members = get_members(instance)?;
    let total = members.len();
    let reachable = members.iter().filter(|m| m.state.is_active()).count();
    let unreachable = members
        .iter()
        .filter(|m| m.state == MemberState::Unreachable)
        .count();

    Ok(QuorumStatus {
        total,
        reachable,
        unreachable,
        has_quorum: reachable * 2 > total,
    })
}
