use crate::lib::environment::Environment;
use crate::lib::error::KwResult;
use crate::lib::interrupt::InterruptGuard;
use anyhow::Context;
use clap::Parser;
use keyward_core::daemon::DaemonClient;
use keyward_core::id::Id;
use keyward_core::machine::MachineProvisioner;
use slog::info;
use tokio::runtime::Runtime;

/// Creates a machine and prints its token secret. The secret is shown only once.
#[derive(Parser)]
pub struct CreateMachineOpts {
    /// The name of the machine, e.g. "api-server".
    name: String,

    /// The organization the machine belongs to.
    #[arg(long, value_name = "ORG_ID")]
    org: Id,

    /// Adds the machine to this team.
    #[arg(long, value_name = "TEAM_ID")]
    team: Option<Id>,
}

pub fn exec(env: &dyn Environment, opts: CreateMachineOpts) -> KwResult {
    let config = env.get_config();
    let log = env.get_logger();

    let runtime = Runtime::new().context("Unable to create a runtime.")?;
    let (identity, secret) = runtime.block_on(async {
        let client = DaemonClient::connect(config, log).await?;
        let interrupt = InterruptGuard::install(log);
        let mut spinner = env.new_spinner("Creating machine...".into());

        let created = MachineProvisioner::new(&client, log)
            .create_until(
                &opts.org,
                opts.team.as_ref(),
                &opts.name,
                &mut spinner,
                interrupt.token(),
            )
            .await;
        spinner.finish_and_clear();
        Ok::<_, anyhow::Error>(created?)
    })?;

    info!(log, r#"Created machine "{}"."#, identity.name());
    println!("Machine ID:   {}", identity.id());
    println!("Org ID:       {}", identity.org_id());
    for membership in &identity.memberships {
        println!("Team ID:      {}", membership.team_id);
    }
    println!("Token secret: {}", secret.encoded());
    println!();
    println!("Store the token secret now; it cannot be retrieved later.");
    Ok(())
}
