use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ditio_integration::{
    config::Config,
    ditio::model::{Machine, Task},
    scenario,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Example integration against the Ditio API
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch an access token and print it
    Token,
    /// Create, fetch, rename and delete a task
    Tasks(TaskArgs),
    /// Create, fetch, rename and delete a machine
    Machines(MachineArgs),
}

#[derive(Args)]
struct TaskArgs {
    #[arg(long, default_value = "3210105")]
    external_project_number: String,
    #[arg(long, default_value = "3210105-0120-999")]
    external_id: String,
    #[arg(long, default_value = "3210")]
    external_dim01: String,
    #[arg(long, default_value = "TEST TEST")]
    name: String,
}

#[derive(Args)]
struct MachineArgs {
    #[arg(long, default_value = "44444")]
    machine_number: String,
    #[arg(long, default_value = "LOKR")]
    type_id: String,
    #[arg(long, default_value = "Lokomotiv ABCD")]
    name: String,
    #[arg(long, default_value = "1998")]
    build_year: String,
    #[arg(long, default_value = "3210")]
    department: String,
}

impl TaskArgs {
    fn into_draft(self) -> Task {
        Task {
            external_project_number: self.external_project_number,
            external_id: self.external_id,
            external_dim01: Some(self.external_dim01),
            name: self.name,
            active: true,
            ..Task::default()
        }
    }
}

impl MachineArgs {
    fn into_draft(self, company_id: String) -> Machine {
        Machine {
            company_id,
            machine_number: self.machine_number,
            type_id: Some(self.type_id),
            name: self.name,
            build_year: Some(self.build_year),
            department: Some(self.department),
            active: true,
            ..Machine::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Cli { config, command } = Cli::parse();
    let client = config.build().context("unable to set up the API client")?;

    match command {
        Command::Token => {
            let record = client
                .auth_token_provider
                .get_token()
                .await
                .context("authentication failed, check the client id, secret and scope")?;
            println!("{}", record.access_token);
        }
        Command::Tasks(args) => {
            let outcome = scenario::run_task_round_trip(&client, &args.into_draft()).await?;
            info!(message = "Task integration done", outcome = ?outcome);
        }
        Command::Machines(args) => {
            let draft = args.into_draft(config.company_id.clone());
            let outcome = scenario::run_machine_round_trip(&client, &draft).await?;
            info!(message = "Machine integration done", outcome = ?outcome);
        }
    }

    Ok(())
}
