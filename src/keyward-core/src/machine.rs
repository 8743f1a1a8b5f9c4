//! Machine identities: non-human accounts that authenticate with a token
//! secret generated on this side.
use crate::daemon::{CancelToken, DaemonClient, Method, ProgressSink};
use crate::error::create_machine::CreateMachineError;
use crate::error::create_machine::CreateMachineError::{DaemonCallFailed, GenerateSecretFailed};
use crate::id::Id;
use crate::secret::{EntropySource, TokenSecret};
use crate::validation::validate_slug;
use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};
use slog::{debug, info, Logger};

/// Sent exactly once per creation attempt, always with a freshly generated
/// secret.
#[derive(Debug, Serialize)]
pub struct MachineCreateRequest<'a> {
    pub name: &'a str,
    pub org_id: &'a Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<&'a Id>,
    pub secret: &'a TokenSecret,
}

/// The daemon's record of a newly created machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineIdentity {
    pub machine: Machine,
    #[serde(default)]
    pub memberships: Vec<Membership>,
    #[serde(default)]
    pub tokens: Vec<MachineToken>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: Id,
    pub body: MachineBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineBody {
    pub name: String,
    pub org_id: Id,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_by: Option<Id>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: Id,
    pub team_id: Id,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineToken {
    pub id: Id,
    #[serde(default)]
    pub state: Option<String>,
}

impl MachineIdentity {
    pub fn id(&self) -> &Id {
        &self.machine.id
    }

    pub fn name(&self) -> &str {
        &self.machine.body.name
    }

    pub fn org_id(&self) -> &Id {
        &self.machine.body.org_id
    }
}

/// Creates machines through the daemon.
pub struct MachineProvisioner<'a> {
    client: &'a DaemonClient,
    entropy: Box<dyn EntropySource>,
    log: Logger,
}

impl<'a> MachineProvisioner<'a> {
    pub fn new(client: &'a DaemonClient, log: &Logger) -> Self {
        MachineProvisioner {
            client,
            entropy: Box::new(SystemRandom::new()),
            log: log.clone(),
        }
    }

    pub fn with_entropy(mut self, entropy: impl EntropySource + 'static) -> Self {
        self.entropy = Box::new(entropy);
        self
    }

    /// Creates machine `name` in `org`, optionally in `team`.
    ///
    /// On success the secret is returned alongside the identity; this is the
    /// only time it is available. On failure the secret is dropped and a
    /// retry generates a new one.
    pub async fn create(
        &self,
        org: &Id,
        team: Option<&Id>,
        name: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<(MachineIdentity, TokenSecret), CreateMachineError> {
        self.create_until(org, team, name, progress, &CancelToken::new())
            .await
    }

    pub async fn create_until(
        &self,
        org: &Id,
        team: Option<&Id>,
        name: &str,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(MachineIdentity, TokenSecret), CreateMachineError> {
        validate_slug("machine name", name)?;

        let secret =
            TokenSecret::generate_from(self.entropy.as_ref()).map_err(GenerateSecretFailed)?;
        let request = MachineCreateRequest {
            name,
            org_id: org,
            team_id: team,
            secret: &secret,
        };

        debug!(self.log, "Creating machine"; "name" => name, "org" => %org);
        let identity: MachineIdentity = self
            .client
            .send_until(Method::Post, "/machines", Some(&request), progress, cancel)
            .await
            .map_err(|err| DaemonCallFailed(name.to_string(), err))?;

        info!(self.log, "Created machine {}", identity.id(); "name" => identity.name());
        Ok((identity, secret))
    }
}
