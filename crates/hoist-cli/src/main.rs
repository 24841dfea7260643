//! Hoist - deploy GitHub repositories to Cloud Foundry
//!
//! Usage:
//!   hoist deploy                     # Pick a registered app, or register one
//!   hoist deploy <app>               # Deploy a registered app
//!   hoist deploy <owner>/<repo> ...  # Register and deploy
//!   hoist apps list                  # Show registered apps

mod interactive;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hoist_core::context::AppContext;
use hoist_core::dialog::Notifier;
use hoist_core::error::ResolutionError;
use hoist_core::launch::{DeploymentOutcome, OutcomeState};
use hoist_core::registry::AppRegistry;
use hoist_core::request::DeploymentRequest;
use hoist_core::resolver::{DeployCommand, InputResolver};

use crate::interactive::{ConsoleNotifier, TerminalDialog};

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Deploy GitHub repositories to Cloud Foundry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy an application
    ///
    /// Tokens may be an app name, a repository (`owner/repo`, optionally
    /// with `/tree/<branch>`), or both in either order. Anything missing
    /// is asked for interactively. `hoist deploy help` lists the forms.
    Deploy(DeployArgs),

    /// Manage registered applications
    Apps(AppsArgs),
}

#[derive(Args)]
struct DeployArgs {
    /// App name and/or repository reference
    tokens: Vec<String>,

    /// App name, skipping token interpretation
    #[arg(long)]
    app: Option<String>,

    /// Repository reference, skipping token interpretation
    #[arg(long)]
    url: Option<String>,

    /// Return after start instead of waiting for the status check
    #[arg(long)]
    no_wait: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct AppsArgs {
    #[command(subcommand)]
    command: AppsSubcommand,
}

#[derive(Subcommand)]
enum AppsSubcommand {
    /// List registered applications
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Forget a registered application
    #[command(alias = "rm")]
    Remove {
        /// App name
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hoist=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_cli(cli.command));
    // A timed-out prompt may still be blocked on stdin.
    runtime.shutdown_background();
    result
}

async fn run_cli(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Deploy(args) => run_deploy(args).await,
        Commands::Apps(args) => {
            run_apps(args).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn deploy_command(args: &DeployArgs) -> Result<DeployCommand> {
    if args.app.is_some() || args.url.is_some() {
        if !args.tokens.is_empty() {
            anyhow::bail!("Pass either positional tokens or --app/--url, not both");
        }
        return Ok(DeployCommand::Intent {
            app: args.app.clone(),
            url: args.url.clone(),
        });
    }
    Ok(DeployCommand::from_tokens(&args.tokens)?)
}

fn is_help(tokens: &[String]) -> bool {
    matches!(tokens, [only] if only.eq_ignore_ascii_case("help"))
}

async fn run_deploy(args: DeployArgs) -> Result<ExitCode> {
    if is_help(&args.tokens) {
        print_deploy_help();
        return Ok(ExitCode::SUCCESS);
    }

    let command = deploy_command(&args)?;
    let ctx = AppContext::load()?;
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let Some(request) = resolve(&ctx, notifier.as_ref(), command).await? else {
        return Ok(ExitCode::SUCCESS);
    };

    let pipeline = ctx.pipeline(Arc::clone(&notifier)).await?;
    let deployment = match pipeline.deploy(&request).await {
        Ok(deployment) => deployment,
        Err(err) => {
            // The pipeline already sent the failure through the notifier.
            let outcome = DeploymentOutcome::failed(&err);
            print_outcome(&request, &outcome, args.format)?;
            return Ok(exit_code(&outcome));
        }
    };

    if args.no_wait {
        deployment.detach();
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = tokio::select! {
        outcome = deployment.outcome() => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(app = %request.app, "Status check cancelled");
            notifier.progress("Status check cancelled.");
            DeploymentOutcome::unknown()
        }
    };

    print_outcome(&request, &outcome, args.format)?;
    Ok(exit_code(&outcome))
}

fn exit_code(outcome: &DeploymentOutcome) -> ExitCode {
    match outcome.state {
        OutcomeState::Failed => ExitCode::FAILURE,
        OutcomeState::Started | OutcomeState::Unknown => ExitCode::SUCCESS,
    }
}

/// Run the dialog. `None` when the user declined or stopped answering.
async fn resolve(
    ctx: &AppContext,
    notifier: &dyn Notifier,
    command: DeployCommand,
) -> Result<Option<DeploymentRequest>> {
    let dialog = TerminalDialog::new(ctx.config().deploy.prompt_timeout());
    let registry = ctx.registry();
    let repo_host = ctx.repo_host()?;

    match InputResolver::new(&dialog, notifier, &repo_host, &registry)
        .resolve(command)
        .await
    {
        Ok(request) => Ok(Some(request)),
        Err(ResolutionError::Declined(message)) => {
            notifier.progress(&message);
            Ok(None)
        }
        Err(ResolutionError::TimedOut) => {
            notifier.progress("No answer received, the deployment is cancelled.");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn print_outcome(
    request: &DeploymentRequest,
    outcome: &DeploymentOutcome,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!();
            println!("  App:     {}", request.app);
            println!(
                "  Source:  {}/{} ({})",
                request.owner, request.repo, request.branch
            );
            let state = match outcome.state {
                OutcomeState::Started => "started",
                OutcomeState::Unknown => "unknown",
                OutcomeState::Failed => "failed",
            };
            println!("  State:   {}", state);
            if !outcome.url.is_empty() {
                println!("  URL:     {}", outcome.url);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "request": request,
                "outcome": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_deploy_help() {
    println!("Deploy a GitHub repository to Cloud Foundry.");
    println!();
    println!("  hoist deploy                              Choose a registered app, or register one");
    println!("  hoist deploy <app>                        Deploy a registered app");
    println!("  hoist deploy <owner>/<repo>               Register the repository under a name you choose");
    println!("  hoist deploy <app> <owner>/<repo>         Register and deploy (either order)");
    println!("  hoist deploy <owner>/<repo>/tree/<branch> Deploy a specific branch");
    println!("  hoist deploy --app <app> --url <repo>     Deploy with both values given up front");
    println!();
    println!("Without a branch, a repository with one branch deploys it; otherwise you pick one.");
    println!("A manifest.yml at the repository root supplies memory, disk, instances, env,");
    println!("host, domain, buildpack and command for newly created apps.");
}

async fn run_apps(args: AppsArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let registry = ctx.registry();

    match args.command {
        AppsSubcommand::List { format } => {
            let entries = registry.entries().await?;
            match format {
                OutputFormat::Table => {
                    if entries.is_empty() {
                        println!("No applications registered.");
                        println!("Register one with: hoist deploy <app> <owner>/<repo>");
                        return Ok(());
                    }
                    println!("{:<24} Repository", "App");
                    println!("{}", "-".repeat(60));
                    for (app, url) in &entries {
                        println!("{:<24} {}", app, url);
                    }
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                }
            }
        }
        AppsSubcommand::Remove { name } => {
            if !registry.remove(&name).await? {
                anyhow::bail!("No application named '{}' is registered", name);
            }
            println!("Removed application '{}'", name);
        }
    }

    Ok(())
}
