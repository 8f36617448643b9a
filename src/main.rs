use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthStr;

use assm::aws::{AwsClients, AwsError};
use assm::config::{self, Settings};
use assm::directory::{self, InstanceSummary};
use assm::dispatch::{self, Context, Dispatcher, SshOptions};
use assm::error::AppError;
use assm::menu;
use assm::transport::{self, SystemRunner};
use assm::ui;

#[derive(Parser)]
#[command(
    name = "assm",
    about = "Pick an EC2 instance and reach it through AWS Systems Manager.",
    long_about = "assm lists the instances whose SSM agent is online and lets you\n\
                  open a shell session, SSH through Session Manager, run a\n\
                  one-off command or print the instance ID.\n\n\
                  Run without a command for the interactive picker.",
    version
)]
struct Cli {
    /// AWS profile (defaults to AWS_PROFILE, then ~/.assm/config)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// AWS region (defaults to the profile's region)
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the settings file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// SSH to an instance, tunnelled through Session Manager
    Ssh {
        instance_id: String,

        /// Remote login (default: ~/.assm/config, then $USER, then ec2-user)
        #[arg(short, long)]
        user: Option<String>,

        /// Private key file passed to ssh
        #[arg(short, long, value_name = "FILE", value_parser = existing_file)]
        identity: Option<PathBuf>,
    },
    /// Open an interactive shell session
    Ssm { instance_id: String },
    /// Run a shell command and print its output
    Cmd {
        instance_id: String,

        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Print the instance ID
    Output { instance_id: String },
    /// List online instances
    List,
}

fn existing_file(value: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("{} does not exist", value))
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("Warning: {:#}", err);
    }

    match run(cli) {
        Ok(()) => {}
        Err(err) => {
            report(&err);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let fallback = if verbose { "assm=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .context("failed to initialize tracing filter")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .try_init();

    Ok(())
}

fn report(err: &anyhow::Error) {
    eprintln!("Error: {:#}", err);
    let guidance = err
        .downcast_ref::<AppError>()
        .and_then(AppError::guidance)
        .or_else(|| err.downcast_ref::<AwsError>().and_then(AwsError::guidance));
    if let Some(hint) = guidance {
        eprintln!("{}", hint);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Shell completions (no AWS needed)
    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "assm", &mut io::stdout());
        return Ok(());
    }

    let settings = match cli.config.clone().or_else(config::default_path) {
        Some(path) => Settings::load(&path),
        None => Settings::default(),
    };
    let mut out = io::stdout();

    // Printing an id needs no credentials
    if let Some(Commands::Output { instance_id }) = &cli.command {
        dispatch::print_id(instance_id, &mut out)?;
        return Ok(());
    }

    let env_profile = std::env::var("AWS_PROFILE").ok();
    let profile = settings.resolve_profile(cli.profile.as_deref(), env_profile.as_deref());
    let region = settings.resolve_region(cli.region.as_deref());
    let local_user = std::env::var("USER").ok();

    let runner = SystemRunner;
    let needs_plugin = !matches!(cli.command, Some(Commands::List | Commands::Cmd { .. }));
    if needs_plugin {
        transport::verify(&runner, &settings.plugin)?;
    }

    let clients = AwsClients::connect(profile.as_deref(), region.as_deref())?;
    let context = Context {
        plugin: settings.plugin.clone(),
        region: clients.region().to_string(),
        profile: config::profile_label(profile.as_deref()).to_string(),
        output: settings.output_location(),
    };
    let dispatcher = Dispatcher::new(&clients, &runner, &context);

    match cli.command {
        Some(Commands::Ssh {
            instance_id,
            user,
            identity,
        }) => {
            let options = SshOptions {
                user: settings.resolve_ssh_user(user.as_deref(), local_user.as_deref()),
                identity,
            };
            dispatcher.ssh(&instance_id, &options)?;
        }
        Some(Commands::Ssm { instance_id }) => dispatcher.shell(&instance_id, &mut out)?,
        Some(Commands::Cmd {
            instance_id,
            command,
        }) => dispatcher.send_command(&instance_id, &command.join(" "), &mut out)?,
        Some(Commands::List) => {
            let instances = online_instances(&clients)?;
            if instances.is_empty() {
                println!("No online instances found.");
            }
            for line in format_table(&instances) {
                println!("{}", line);
            }
        }
        Some(Commands::Output { .. }) => {}
        None => {
            let instances = online_instances(&clients)?;
            if instances.is_empty() {
                return Err(AppError::NoInstances.into());
            }
            ui::theme::init();
            let Some(selection) = menu::run(instances)? else {
                println!("No selection was made.");
                return Ok(());
            };
            debug!(?selection, "dispatching");
            let options = SshOptions {
                user: settings.resolve_ssh_user(None, local_user.as_deref()),
                identity: None,
            };
            dispatcher.dispatch(&selection, &options, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn online_instances(clients: &AwsClients) -> Result<Vec<InstanceSummary>, AwsError> {
    let ids = directory::list_reachable_instances(clients)?;
    directory::describe(clients, &ids, Utc::now())
}

/// Rows for `assm list`, header first. Names are padded by display width.
fn format_table(instances: &[InstanceSummary]) -> Vec<String> {
    if instances.is_empty() {
        return Vec::new();
    }

    let name_width = instances
        .iter()
        .map(|i| i.display_name().width())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let id_width = instances
        .iter()
        .map(|i| i.id.len())
        .max()
        .unwrap_or(0)
        .max("ID".len());

    let row = |name: &str, id: &str, state: &str, kind: &str, uptime: &str| {
        let pad = " ".repeat(name_width.saturating_sub(name.width()));
        format!(
            "{}{}  {:<id_width$}  {:<10}  {:<12}  {}",
            name, pad, id, state, kind, uptime
        )
        .trim_end()
        .to_string()
    };

    let mut lines = vec![row("NAME", "ID", "STATE", "TYPE", "UPTIME")];
    for i in instances {
        lines.push(row(
            i.display_name(),
            &i.id,
            i.state.as_deref().unwrap_or("-"),
            i.instance_type.as_deref().unwrap_or("-"),
            &i.uptime,
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, name: Option<&str>) -> InstanceSummary {
        InstanceSummary {
            id: id.to_string(),
            name: name.map(str::to_string),
            uptime: "0 hours, 5 minutes".to_string(),
            image_id: None,
            instance_type: Some("t3.micro".to_string()),
            private_ip: None,
            state: Some("running".to_string()),
            vpc_id: None,
            subnet_id: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_parse_menu_mode() {
        let cli = Cli::try_parse_from(["assm", "-p", "ops", "-r", "eu-west-1"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.profile.as_deref(), Some("ops"));
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_parse_cmd_joins_words() {
        let cli = Cli::try_parse_from(["assm", "cmd", "i-1", "df", "-h", "/"]).unwrap();
        match cli.command {
            Some(Commands::Cmd {
                instance_id,
                command,
            }) => {
                assert_eq!(instance_id, "i-1");
                assert_eq!(command.join(" "), "df -h /");
            }
            _ => panic!("expected cmd"),
        }
    }

    #[test]
    fn test_parse_cmd_requires_command() {
        assert!(Cli::try_parse_from(["assm", "cmd", "i-1"]).is_err());
    }

    #[test]
    fn test_identity_must_exist() {
        assert!(
            Cli::try_parse_from(["assm", "ssh", "i-1", "-i", "/nonexistent/assm-key"]).is_err()
        );

        let key = tempfile::NamedTempFile::new().unwrap();
        let path = key.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["assm", "ssh", "i-1", "-u", "ubuntu", "-i", path]).unwrap();
        match cli.command {
            Some(Commands::Ssh { user, identity, .. }) => {
                assert_eq!(user.as_deref(), Some("ubuntu"));
                assert_eq!(identity.as_deref(), Some(key.path()));
            }
            _ => panic!("expected ssh"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["assm", "list", "-v", "--region", "us-east-2"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.region.as_deref(), Some("us-east-2"));
    }

    #[test]
    fn test_format_table_aligns_wide_names() {
        let lines = format_table(&[summary("i-1", Some("日本")), summary("i-22", None)]);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME  ID  "));
        assert!(lines[1].starts_with("日本  i-1 "));
        assert!(lines[2].starts_with("-     i-22"));
        assert!(lines[1].ends_with("0 hours, 5 minutes"));
    }

    #[test]
    fn test_format_table_empty() {
        assert!(format_table(&[]).is_empty());
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }
}
