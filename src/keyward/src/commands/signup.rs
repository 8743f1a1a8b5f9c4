use crate::lib::environment::Environment;
use crate::lib::error::KwResult;
use crate::lib::interrupt::InterruptGuard;
use crate::lib::prompt::TerminalCollector;
use anyhow::{anyhow, bail, Context};
use clap::{Parser, ValueEnum};
use keyward_core::bootstrap::{AccountBootstrapper, SignupDefaults, Stage};
use keyward_core::daemon::DaemonClient;
use keyward_core::error::bootstrap::BootstrapError;
use slog::info;
use tokio::runtime::Runtime;

/// Creates a new account. An invite code is required.
#[derive(Parser)]
pub struct SignupOpts {
    /// Prefills the email prompt. Must be given together with an invite code.
    email: Option<String>,

    /// Prefills the invite code prompt.
    invite_code: Option<String>,

    /// Finishes setting up an account whose signup already succeeded.
    #[arg(long, value_enum)]
    resume: Option<ResumeAt>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ResumeAt {
    Login,
    Keypairs,
}

impl ResumeAt {
    fn stage(self) -> Stage {
        match self {
            ResumeAt::Login => Stage::LoggingIn,
            ResumeAt::Keypairs => Stage::GeneratingKeypairs,
        }
    }

    fn for_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::LoggingIn => Some(ResumeAt::Login),
            Stage::GeneratingKeypairs => Some(ResumeAt::Keypairs),
            _ => None,
        }
    }

    fn flag(self) -> &'static str {
        match self {
            ResumeAt::Login => "login",
            ResumeAt::Keypairs => "keypairs",
        }
    }
}

fn defaults_from(email: Option<String>, invite_code: Option<String>) -> KwResult<SignupDefaults> {
    match (email, invite_code) {
        (email @ Some(_), invite_code @ Some(_)) => Ok(SignupDefaults { email, invite_code }),
        (None, None) => Ok(SignupDefaults::default()),
        _ => bail!("Too few arguments supplied. Give both an email and an invite code, or neither."),
    }
}

/// Turns a pipeline failure into what the user should read.
fn explain(err: BootstrapError) -> anyhow::Error {
    match err {
        BootstrapError::EmailInUse(_) => anyhow!("Email address in use, please try again."),
        BootstrapError::SignupFailed(source) => {
            anyhow::Error::new(source).context("Signup failed, please try again.")
        }
        err => match err.resume_point().and_then(ResumeAt::for_stage) {
            Some(resume) => {
                let hint = format!(
                    "Your account was created, but setup stopped while {}. \
                     Run 'keyward signup --resume {}' to finish.",
                    err.stage(),
                    resume.flag()
                );
                anyhow::Error::new(err).context(hint)
            }
            None => anyhow::Error::new(err),
        },
    }
}

pub fn exec(env: &dyn Environment, opts: SignupOpts) -> KwResult {
    let defaults = defaults_from(opts.email, opts.invite_code)?;
    let config = env.get_config();
    let log = env.get_logger();

    let runtime = Runtime::new().context("Unable to create a runtime.")?;
    let client = runtime.block_on(DaemonClient::connect(config, log))?;
    let bootstrapper = AccountBootstrapper::new(&client, config, log);

    let context = bootstrapper
        .collect(&mut TerminalCollector::default(), defaults)
        .map_err(explain)?;
    println!();

    let outcome = runtime.block_on(async {
        let interrupt = InterruptGuard::install(log);
        let mut spinner = env.new_spinner("Signing up...".into());
        let outcome = match opts.resume {
            Some(resume) => {
                bootstrapper
                    .resume(resume.stage(), context, &mut spinner, interrupt.token())
                    .await
            }
            None => {
                bootstrapper
                    .run(context, &mut spinner, interrupt.token())
                    .await
            }
        };
        spinner.finish_and_clear();
        outcome
    });
    let account = outcome.map_err(explain)?;

    info!(log, "Signed up as {}.", account.email; "org" => %account.org.id);
    println!("Your account has been created!");
    Ok(())
}
