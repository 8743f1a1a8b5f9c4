use crate::id::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct SignupRequest<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub passphrase: &'a str,
    pub email: &'a str,
    pub invite_code: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub email: &'a str,
    pub passphrase: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateKeypairsRequest<'a> {
    pub org_id: &'a Id,
}

/// The user record returned by signup. Only the email is guaranteed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Id,
    pub body: UserBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBody {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Org {
    pub id: Id,
    pub body: OrgBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgBody {
    pub name: String,
}
