//! First-run account setup: collect details, sign up, log in, then have the
//! daemon generate the account's keypairs.
//!
//! The stages run strictly in order and nothing is undone on failure. An
//! account created by signup stays created even if a later stage fails, so
//! the pipeline can be resumed at login or at keypair generation.
use crate::config::Config;
use crate::daemon::{CancelToken, DaemonClient, Method, ProgressEvent, ProgressSink};
use crate::error::bootstrap::{BootstrapError, StageFailureCause};
use crate::error::daemon_call::{DaemonCallError, DaemonErrorKind};
use serde::de::IgnoredAny;
use slog::{debug, info, Logger};
use std::fmt;
use url::form_urlencoded;

pub mod context;
pub(crate) mod wire;

pub use context::{BootstrapContext, CollectRequest, InputCollector, SignupDefaults};
pub use wire::{Org, OrgBody, User, UserBody};

use wire::{GenerateKeypairsRequest, LoginRequest, SignupRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Collecting,
    SigningUp,
    LoggingIn,
    GeneratingKeypairs,
    Complete,
}

impl Stage {
    /// Stages that are safe to run again against an account that already
    /// exists.
    pub fn is_resumable(self) -> bool {
        matches!(self, Stage::LoggingIn | Stage::GeneratingKeypairs)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Collecting => "collecting account details",
            Stage::SigningUp => "signing up",
            Stage::LoggingIn => "logging in",
            Stage::GeneratingKeypairs => "generating keypairs",
            Stage::Complete => "complete",
        })
    }
}

/// Observes the pipeline: stage transitions plus the daemon's progress
/// events, each tagged with the stage that produced it.
pub trait BootstrapProgress {
    fn stage_started(&mut self, _stage: Stage) {}

    fn on_progress(&mut self, stage: Stage, event: &ProgressEvent);
}

impl<F> BootstrapProgress for F
where
    F: FnMut(Stage, &ProgressEvent),
{
    fn on_progress(&mut self, stage: Stage, event: &ProgressEvent) {
        self(stage, event)
    }
}

struct StageSink<'p> {
    stage: Stage,
    inner: &'p mut dyn BootstrapProgress,
}

impl ProgressSink for StageSink<'_> {
    fn on_progress(&mut self, event: &ProgressEvent) {
        self.inner.on_progress(self.stage, event);
    }
}

/// The result of a completed setup.
#[derive(Clone, Debug)]
pub struct Account {
    /// Only present when this run performed the signup.
    pub user: Option<User>,
    pub email: String,
    pub org: Org,
}

pub struct AccountBootstrapper<'a> {
    client: &'a DaemonClient,
    config: &'a Config,
    log: Logger,
}

impl<'a> AccountBootstrapper<'a> {
    pub fn new(client: &'a DaemonClient, config: &'a Config, log: &Logger) -> Self {
        AccountBootstrapper {
            client,
            config,
            log: log.clone(),
        }
    }

    /// The collecting stage: asks `collector` for account details. The
    /// invite code is only requested when the configuration does not skip
    /// it.
    pub fn collect(
        &self,
        collector: &mut dyn InputCollector,
        defaults: SignupDefaults,
    ) -> Result<BootstrapContext, BootstrapError> {
        let request = CollectRequest {
            default_email: defaults.email,
            default_invite_code: defaults.invite_code,
            ask_invite_code: !self.config.skip_invite_code(),
        };
        collector
            .collect(&request)
            .map_err(BootstrapError::CollectFailed)
    }

    /// Validates `context`, then signs up, logs in and generates keypairs.
    pub async fn run(
        &self,
        context: BootstrapContext,
        progress: &mut dyn BootstrapProgress,
        cancel: &CancelToken,
    ) -> Result<Account, BootstrapError> {
        self.run_from(Stage::SigningUp, context, progress, cancel)
            .await
    }

    /// Picks up a pipeline that stopped at `stage`. Only stages after
    /// signup can be resumed.
    pub async fn resume(
        &self,
        stage: Stage,
        context: BootstrapContext,
        progress: &mut dyn BootstrapProgress,
        cancel: &CancelToken,
    ) -> Result<Account, BootstrapError> {
        if !stage.is_resumable() {
            return Err(BootstrapError::CannotResumeAt(stage));
        }
        self.run_from(stage, context, progress, cancel).await
    }

    async fn run_from(
        &self,
        start: Stage,
        context: BootstrapContext,
        progress: &mut dyn BootstrapProgress,
        cancel: &CancelToken,
    ) -> Result<Account, BootstrapError> {
        context.validate(!self.config.skip_invite_code())?;

        let mut user = None;
        let mut email = context.email.clone();

        if start <= Stage::SigningUp {
            let created = self.sign_up(&context, progress, cancel).await?;
            // The daemon may normalize the address.
            email = created.body.email.clone();
            user = Some(created);
        }
        if start <= Stage::LoggingIn {
            self.log_in(&email, &context.passphrase, progress, cancel)
                .await?;
        }
        let org = self
            .generate_keypairs(&context.username, progress, cancel)
            .await?;

        progress.stage_started(Stage::Complete);
        info!(self.log, "Account setup complete"; "username" => &context.username, "org" => %org.id);
        Ok(Account { user, email, org })
    }

    async fn sign_up(
        &self,
        context: &BootstrapContext,
        progress: &mut dyn BootstrapProgress,
        cancel: &CancelToken,
    ) -> Result<User, BootstrapError> {
        let stage = Stage::SigningUp;
        progress.stage_started(stage);
        debug!(self.log, "Signing up"; "username" => &context.username);

        let request = SignupRequest {
            name: &context.full_name,
            username: &context.username,
            passphrase: &context.passphrase,
            email: &context.email,
            invite_code: context.invite_code.as_deref().unwrap_or(""),
        };
        let mut sink = StageSink {
            stage,
            inner: progress,
        };
        self.client
            .send_until(Method::Post, "/signup", Some(&request), &mut sink, cancel)
            .await
            .map_err(|err| match err {
                DaemonCallError::Canceled => BootstrapError::Canceled { stage },
                DaemonCallError::Daemon(err) if err.kind == DaemonErrorKind::ResourceExists => {
                    BootstrapError::EmailInUse(err)
                }
                other => BootstrapError::SignupFailed(other),
            })
    }

    async fn log_in(
        &self,
        email: &str,
        passphrase: &str,
        progress: &mut dyn BootstrapProgress,
        cancel: &CancelToken,
    ) -> Result<(), BootstrapError> {
        let stage = Stage::LoggingIn;
        progress.stage_started(stage);
        debug!(self.log, "Logging in"; "email" => email);

        let request = LoginRequest {
            kind: "user",
            email,
            passphrase,
        };
        let mut sink = StageSink {
            stage,
            inner: progress,
        };
        let _: IgnoredAny = self
            .client
            .send_until(Method::Post, "/login", Some(&request), &mut sink, cancel)
            .await
            .map_err(|err| BootstrapError::from_stage_call(stage, err))?;
        Ok(())
    }

    async fn generate_keypairs(
        &self,
        username: &str,
        progress: &mut dyn BootstrapProgress,
        cancel: &CancelToken,
    ) -> Result<Org, BootstrapError> {
        let stage = Stage::GeneratingKeypairs;
        progress.stage_started(stage);

        let mut sink = StageSink {
            stage,
            inner: progress,
        };
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("name", username)
            .finish();
        let orgs: Vec<Org> = self
            .client
            .send_until::<(), _>(
                Method::Get,
                &format!("/orgs?{}", query),
                None,
                &mut sink,
                cancel,
            )
            .await
            .map_err(|err| BootstrapError::from_stage_call(stage, err))?;
        let org = orgs
            .into_iter()
            .find(|org| org.body.name == username)
            .ok_or_else(|| BootstrapError::StageFailure {
                stage,
                cause: StageFailureCause::MissingOrganization(username.to_string()),
            })?;

        debug!(self.log, "Generating keypairs"; "org" => %org.id);
        let request = GenerateKeypairsRequest { org_id: &org.id };
        let _: IgnoredAny = self
            .client
            .send_until(
                Method::Post,
                "/keypairs/generate",
                Some(&request),
                &mut sink,
                cancel,
            )
            .await
            .map_err(|err| BootstrapError::from_stage_call(stage, err))?;
        Ok(org)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::frame::RequestFrame;
    use crate::daemon::test_daemon::{
        spawn_daemon, spawn_daemon_with, test_config, test_logger, Reply,
    };
    use crate::error::bootstrap::CollectError;
    use crate::error::daemon_call::TransportError;
    use crate::id::Id;
    use serde_json::json;

    struct FixedCollector {
        invite_code: Option<String>,
        seen: Vec<CollectRequest>,
    }

    impl FixedCollector {
        fn new() -> Self {
            FixedCollector {
                invite_code: Some("invite-123".to_string()),
                seen: Vec::new(),
            }
        }
    }

    impl InputCollector for FixedCollector {
        fn collect(&mut self, request: &CollectRequest) -> Result<BootstrapContext, CollectError> {
            self.seen.push(request.clone());
            Ok(BootstrapContext {
                invite_code: self.invite_code.clone(),
                ..context()
            })
        }
    }

    fn context() -> BootstrapContext {
        BootstrapContext {
            full_name: "Jo Doe".to_string(),
            username: "jodoe".to_string(),
            email: "Jo@Example.com".to_string(),
            invite_code: Some("invite-123".to_string()),
            passphrase: "correct horse battery staple".to_string(),
        }
    }

    struct FailingCollector;

    impl InputCollector for FailingCollector {
        fn collect(&mut self, _request: &CollectRequest) -> Result<BootstrapContext, CollectError> {
            Err("prompt closed".into())
        }
    }

    #[derive(Default)]
    struct Recorder {
        stages: Vec<Stage>,
        events: Vec<(Stage, String)>,
        cancel_during: Option<(Stage, CancelToken)>,
    }

    impl BootstrapProgress for Recorder {
        fn stage_started(&mut self, stage: Stage) {
            self.stages.push(stage);
        }

        fn on_progress(&mut self, stage: Stage, event: &ProgressEvent) {
            self.events.push((stage, event.stage.clone()));
            if let Some((target, cancel)) = &self.cancel_during {
                if *target == stage {
                    cancel.cancel();
                }
            }
        }
    }

    fn healthy(request: &RequestFrame) -> Vec<Reply> {
        match request.path.as_str() {
            "/signup" => {
                let body = request.body.clone().unwrap_or_default();
                vec![
                    Reply::progress("signup.user", "Creating user"),
                    Reply::ok(json!({
                        "id": "user-1",
                        "body": {
                            "email": "jo@example.com",
                            "name": body["name"],
                            "username": body["username"],
                            "state": "unverified",
                        }
                    })),
                ]
            }
            "/login" => vec![Reply::ok(json!({}))],
            "/orgs?name=jodoe" => vec![Reply::ok(json!([
                { "id": "org-other", "body": { "name": "someone-else" } },
                { "id": "org-1", "body": { "name": "jodoe" } },
            ]))],
            "/keypairs/generate" => vec![
                Reply::progress("keypairs.signing", "Generating signing keypair"),
                Reply::progress("keypairs.encryption", "Generating encryption keypair"),
                Reply::ok(json!(null)),
            ],
            other => vec![Reply::error(404, "not_found", other)],
        }
    }

    fn failing_at(
        path: &'static str,
        replies: fn() -> Vec<Reply>,
    ) -> impl FnMut(&RequestFrame) -> Vec<Reply> + Send + 'static {
        move |request| {
            if request.path == path {
                replies()
            } else {
                healthy(request)
            }
        }
    }

    #[tokio::test]
    async fn runs_every_stage_in_order() {
        let (client, daemon) = spawn_daemon(healthy);
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());
        let mut progress = Recorder::default();

        let account = bootstrapper
            .run(context(), &mut progress, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(account.email, "jo@example.com");
        assert_eq!(account.org.id, Id::new("org-1"));
        assert_eq!(account.user.unwrap().id, Id::new("user-1"));
        assert_eq!(
            daemon.paths(),
            vec!["/signup", "/login", "/orgs?name=jodoe", "/keypairs/generate"]
        );
        assert_eq!(
            progress.stages,
            vec![
                Stage::SigningUp,
                Stage::LoggingIn,
                Stage::GeneratingKeypairs,
                Stage::Complete,
            ]
        );
        assert_eq!(
            progress.events,
            vec![
                (Stage::SigningUp, "signup.user".to_string()),
                (Stage::GeneratingKeypairs, "keypairs.signing".to_string()),
                (Stage::GeneratingKeypairs, "keypairs.encryption".to_string()),
            ]
        );

        let requests = daemon.requests();
        let login = requests[1].body.as_ref().unwrap();
        assert_eq!(login["type"], "user");
        assert_eq!(login["email"], "jo@example.com");
        assert_eq!(requests[0].body.as_ref().unwrap()["invite_code"], "invite-123");
        assert_eq!(requests[3].body.as_ref().unwrap()["org_id"], "org-1");
    }

    #[tokio::test]
    async fn email_in_use_stops_after_signup() {
        let (client, daemon) = spawn_daemon(failing_at("/signup", || {
            vec![Reply::error(409, "resource_exists", "resource exists")]
        }));
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());

        let err = bootstrapper
            .run(context(), &mut Recorder::default(), &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::EmailInUse(_)));
        assert_eq!(err.stage(), Stage::SigningUp);
        assert_eq!(err.resume_point(), None);
        assert_eq!(daemon.paths(), vec!["/signup"]);
    }

    #[tokio::test]
    async fn other_signup_errors_are_generic() {
        let (client, _daemon) = spawn_daemon(failing_at("/signup", || {
            vec![Reply::error(400, "bad_request", "invalid invite code")]
        }));
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());

        let err = bootstrapper
            .run(context(), &mut Recorder::default(), &CancelToken::new())
            .await
            .unwrap_err();

        match err {
            BootstrapError::SignupFailed(call) => {
                assert_eq!(call.daemon_error().unwrap().kind, DaemonErrorKind::BadRequest)
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn keypair_failure_leaves_the_account_in_place() {
        let (client, daemon) = spawn_daemon(failing_at("/keypairs/generate", || {
            vec![
                Reply::progress("keypairs.signing", "Generating signing keypair"),
                Reply::error(500, "internal_server", "keyring unavailable"),
            ]
        }));
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());

        let err = bootstrapper
            .run(context(), &mut Recorder::default(), &CancelToken::new())
            .await
            .unwrap_err();

        match &err {
            BootstrapError::StageFailure {
                stage: Stage::GeneratingKeypairs,
                cause: StageFailureCause::Rejected(rejected),
            } => assert_eq!(rejected.kind, DaemonErrorKind::Internal),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.resume_point(), Some(Stage::GeneratingKeypairs));
        // No compensating requests follow the failure.
        assert_eq!(
            daemon.paths(),
            vec!["/signup", "/login", "/orgs?name=jodoe", "/keypairs/generate"]
        );
    }

    #[tokio::test]
    async fn missing_org_is_a_stage_failure() {
        let (client, daemon) = spawn_daemon(failing_at("/orgs?name=jodoe", || {
            vec![Reply::ok(json!([]))]
        }));
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());

        let err = bootstrapper
            .run(context(), &mut Recorder::default(), &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::StageFailure {
                stage: Stage::GeneratingKeypairs,
                cause: StageFailureCause::MissingOrganization(ref name),
            } if name == "jodoe"
        ));
        assert!(!daemon.paths().contains(&"/keypairs/generate".to_string()));
    }

    #[tokio::test]
    async fn cancel_during_login_names_the_stage() {
        let (client, daemon) = spawn_daemon(failing_at("/login", || {
            vec![Reply::progress("login.verify", "Verifying credentials"), Reply::Hang]
        }));
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());
        let cancel = CancelToken::new();
        let mut progress = Recorder {
            cancel_during: Some((Stage::LoggingIn, cancel.clone())),
            ..Recorder::default()
        };

        let err = bootstrapper
            .run(context(), &mut progress, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::Canceled {
                stage: Stage::LoggingIn
            }
        ));
        assert_eq!(err.resume_point(), Some(Stage::LoggingIn));
        assert_eq!(daemon.paths(), vec!["/signup", "/login"]);
    }

    #[tokio::test]
    async fn lost_connection_during_login_is_indeterminate() {
        let (client, _daemon) = spawn_daemon(failing_at("/login", || vec![Reply::Close]));
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());

        let err = bootstrapper
            .run(context(), &mut Recorder::default(), &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::StageFailure {
                stage: Stage::LoggingIn,
                cause: StageFailureCause::Transport(TransportError::ConnectionLost(_)),
            }
        ));
    }

    #[tokio::test]
    async fn resume_at_login_skips_signup() {
        let (client, daemon) = spawn_daemon(healthy);
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());

        let account = bootstrapper
            .resume(
                Stage::LoggingIn,
                context(),
                &mut Recorder::default(),
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert!(account.user.is_none());
        assert_eq!(account.email, "Jo@Example.com");
        assert_eq!(
            daemon.paths(),
            vec!["/login", "/orgs?name=jodoe", "/keypairs/generate"]
        );
    }

    #[tokio::test]
    async fn signup_is_not_a_resume_point() {
        let (client, daemon) = spawn_daemon(healthy);
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());

        let err = bootstrapper
            .resume(
                Stage::SigningUp,
                context(),
                &mut Recorder::default(),
                &CancelToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::CannotResumeAt(Stage::SigningUp)));
        assert_eq!(err.resume_point(), None);
        assert!(daemon.paths().is_empty());
    }

    #[tokio::test]
    async fn invalid_details_make_no_request() {
        let (client, daemon) = spawn_daemon(healthy);
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());
        let mut missing_invite = context();
        missing_invite.invite_code = None;

        let err = bootstrapper
            .run(missing_invite, &mut Recorder::default(), &CancelToken::new())
            .await
            .unwrap_err();

        match &err {
            BootstrapError::Validation(err) => assert_eq!(err.field, "invite code"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.stage(), Stage::Collecting);
        assert!(daemon.paths().is_empty());
    }

    #[tokio::test]
    async fn collector_failure_is_reported() {
        let (client, _daemon) = spawn_daemon(healthy);
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());

        let err = bootstrapper
            .collect(&mut FailingCollector, SignupDefaults::default())
            .unwrap_err();

        assert!(matches!(err, BootstrapError::CollectFailed(_)));
        assert_eq!(err.stage(), Stage::Collecting);
    }

    #[tokio::test]
    async fn collector_is_told_what_to_ask() {
        let (client, _daemon) = spawn_daemon(healthy);
        let config = test_config();
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());
        let mut collector = FixedCollector::new();

        bootstrapper
            .collect(
                &mut collector,
                SignupDefaults {
                    email: Some("jo@example.com".to_string()),
                    invite_code: Some("invite-123".to_string()),
                },
            )
            .unwrap();

        assert!(collector.seen[0].ask_invite_code);
        assert_eq!(
            collector.seen[0].default_email.as_deref(),
            Some("jo@example.com")
        );
        assert_eq!(
            collector.seen[0].default_invite_code.as_deref(),
            Some("invite-123")
        );
    }

    #[tokio::test]
    async fn invite_code_is_skipped_when_configured() {
        let config = test_config().with_skip_invite_code(true);
        let (client, daemon) = spawn_daemon_with(config.clone(), healthy);
        let bootstrapper = AccountBootstrapper::new(&client, &config, &test_logger());
        let mut collector = FixedCollector {
            invite_code: None,
            ..FixedCollector::new()
        };

        let context = bootstrapper
            .collect(&mut collector, SignupDefaults::default())
            .unwrap();
        bootstrapper
            .run(context, &mut Recorder::default(), &CancelToken::new())
            .await
            .unwrap();

        assert!(!collector.seen[0].ask_invite_code);
        assert_eq!(daemon.requests()[0].body.as_ref().unwrap()["invite_code"], "");
    }
}
