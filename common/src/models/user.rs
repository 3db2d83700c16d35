// common/src/models/user.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Version of the identity-check contract this crate speaks.
///
/// v2: success is signalled by the HTTP status alone and the body is
/// `{ "results": <user> }`. Legacy `error`/`message` fields are ignored.
pub const IDENTITY_CONTRACT_VERSION: u32 = 2;

/// Authenticated identity as reported by the backend `/me` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(rename = "nome")]
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub role: RoleAttributes,
    #[serde(rename = "permissoes", default)]
    pub permissions: BTreeSet<String>,
}

/// Organisational attributes attached to the user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RoleAttributes {
    #[serde(rename = "departamento", default)]
    pub department: String,
    #[serde(rename = "cargo", default)]
    pub title: String,
    #[serde(rename = "empresa", default)]
    pub company: String,
    #[serde(rename = "ativo", default)]
    pub active: String,
    #[serde(rename = "possui_ramal", default)]
    pub has_extension: String,
    #[serde(default)]
    pub line_id: String,
}

impl CurrentUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Identity-check response body (contract v2).
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEnvelope {
    pub results: CurrentUser,
}
