//! Role-based access policy for documents and user accounts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "adm")]
    Admin,
    #[serde(alias = "tecnico")]
    Technician,
    #[serde(alias = "visualizador")]
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Technician => "technician",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role `{0}`; expected admin, technician or viewer")]
pub struct InvalidRole(pub String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" | "adm" => Ok(Role::Admin),
            "technician" | "tecnico" => Ok(Role::Technician),
            "viewer" | "visualizador" => Ok(Role::Viewer),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("your role cannot modify documents")]
    ReadOnlyRole,
    #[error("you can only modify documents you created")]
    NotOwner,
    #[error("only administrators can perform this action")]
    AdminOnly,
}

/// Decide whether `caller` may perform `action` on a document created by
/// `owner`. Callers look the document up first so a missing document is
/// reported as not found before any ownership denial.
///
/// | role       | read | create | update/delete own | others' |
/// |------------|------|--------|-------------------|---------|
/// | admin      | yes  | yes    | yes               | yes     |
/// | technician | yes  | yes    | yes               | no      |
/// | viewer     | yes  | no     | no                | no      |
pub fn authorize(caller: &Caller, action: Action, owner: Option<&str>) -> Result<(), AccessDenied> {
    match (caller.role, action) {
        (_, Action::Read) => Ok(()),
        (Role::Admin, _) => Ok(()),
        (Role::Viewer, _) => Err(AccessDenied::ReadOnlyRole),
        (Role::Technician, Action::Create) => Ok(()),
        (Role::Technician, Action::Update | Action::Delete) => {
            if owner == Some(caller.user_id.as_str()) {
                Ok(())
            } else {
                Err(AccessDenied::NotOwner)
            }
        }
    }
}

pub fn require_admin(caller: &Caller) -> Result<(), AccessDenied> {
    match caller.role {
        Role::Admin => Ok(()),
        _ => Err(AccessDenied::AdminOnly),
    }
}

/// Account access: administrators manage everyone, other users only
/// themselves.
pub fn authorize_account(caller: &Caller, account_id: &str) -> Result<(), AccessDenied> {
    if caller.role == Role::Admin || caller.user_id == account_id {
        Ok(())
    } else {
        Err(AccessDenied::AdminOnly)
    }
}
