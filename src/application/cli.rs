#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::io::IsTerminal;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Agent;
use crate::domain::models::CleanupPolicy;
use crate::domain::models::DisplayMessage;
use crate::domain::models::Gateway;
use crate::domain::models::SpawnRequest;
use crate::domain::services::loader::LoaderSettings;
use crate::domain::services::MessageNormalizer;
use crate::infrastructure::gateways::http::HttpGateway;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString, strum::EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum HistoryFormat {
    Text,
    Html,
    Json,
}

pub fn help_text() -> String {
    let text = r#"
HOTKEYS:
- Tab - Switch focus between the session list and the message input.
- Up arrow - Move the session cursor up, or scroll the chat up while typing.
- Down arrow - Move the session cursor down, or scroll the chat down while typing.
- CTRL+U - Page up
- CTRL+D - Page down
- Enter - Open the session under the cursor, or send the typed message.
- CTRL+R - Reload the history of the open session.
- CTRL+C - Exit.
        "#;

    return text.trim().to_string();
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

pub fn format_session(agent: &Agent) -> String {
    return format!(
        "{} {} ({}) {}",
        agent.icon(),
        agent.display_label(),
        agent.kind,
        agent.key
    );
}

pub fn format_history(messages: &[DisplayMessage], format: HistoryFormat) -> Result<String> {
    if format == HistoryFormat::Json {
        return Ok(serde_json::to_string_pretty(messages)?);
    }

    let res = messages
        .iter()
        .map(|msg| {
            let mut header = msg.role.to_string();
            let time = msg.formatted_time();
            if !time.is_empty() {
                header = format!("[{time}] {header}");
            }

            let mut lines = vec![format!("{header}:")];
            if format == HistoryFormat::Html {
                lines.push(msg.rendered_text.trim_end().to_string());
            } else if !msg.text.is_empty() {
                lines.push(msg.text.to_string());
            }
            for media in msg.media.iter() {
                lines.push(format!("[image] {}", media.url));
            }

            return lines.join("\n");
        })
        .collect::<Vec<String>>()
        .join("\n\n");

    return Ok(res);
}

async fn print_sessions_list() -> Result<()> {
    let settings = LoaderSettings::from_config()?;
    let sessions = HttpGateway::default()
        .list_sessions(settings.session_limit)
        .await?
        .iter()
        .map(|agent| {
            return format_session(agent);
        })
        .collect::<Vec<String>>();

    if sessions.is_empty() {
        println!("No agents found");
    } else {
        println!("{}", sessions.join("\n"));
    }

    return Ok(());
}

async fn print_history(session_key: &str, format: HistoryFormat) -> Result<()> {
    let settings = LoaderSettings::from_config()?;
    let raw = HttpGateway::default()
        .fetch_history(session_key, settings.history_limit)
        .await?;
    let messages = MessageNormalizer::normalize_all(&raw);

    if messages.is_empty() && format != HistoryFormat::Json {
        println!("No messages yet");
        return Ok(());
    }

    println!("{}", format_history(&messages, format)?);
    return Ok(());
}

async fn send_message(session_key: &str, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Refusing to send an empty message");
    }

    let settings = LoaderSettings::from_config()?;
    let reply = HttpGateway::default()
        .send(session_key, text, settings.send_timeout)
        .await?;

    match reply {
        Some(reply) => println!("{reply}"),
        None => eprintln!("{}", Paint::yellow("The agent did not reply in time.")),
    }

    return Ok(());
}

async fn print_status(session_key: &str) -> Result<()> {
    let status = HttpGateway::default().status(session_key).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    return Ok(());
}

async fn spawn_agent(spawn_matches: &ArgMatches) -> Result<()> {
    let task = match spawn_matches.get_one::<String>("task") {
        Some(task) => task,
        None => bail!("A task is required"),
    };

    let mut request = SpawnRequest::new(task);
    request.label = spawn_matches.get_one::<String>("label").cloned();
    request.model = spawn_matches.get_one::<String>("model").cloned();
    request.run_timeout_seconds = spawn_matches.get_one::<u64>("run-timeout").copied();
    if let Some(agent_id) = spawn_matches.get_one::<String>("agent-id") {
        request.agent_id = agent_id.to_string();
    }
    if let Some(cleanup) = spawn_matches.get_one::<String>("cleanup") {
        request.cleanup = cleanup.parse::<CleanupPolicy>()?;
    }

    let res = HttpGateway::default().spawn(request).await?;
    println!("{}", serde_json::to_string_pretty(&res)?);
    return Ok(());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

/// Asks for the gateway token when none is configured. The answer only lives
/// in memory for this run.
fn prompt_for_token() -> Result<()> {
    if !Config::get(ConfigKey::GatewayToken).is_empty() || !io::stdin().is_terminal() {
        return Ok(());
    }

    let token = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Gateway token for {}",
            Config::get(ConfigKey::GatewayURL)
        ))
        .allow_empty_password(true)
        .interact()?;

    Config::set(ConfigKey::GatewayToken, token.trim());
    return Ok(());
}

fn arg_session_key() -> Arg {
    return Arg::new("key")
        .short('k')
        .long("key")
        .help("Session key, such as agent:main:main.")
        .num_args(1)
        .required(true);
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_sessions_spawn() -> Command {
    return Command::new("spawn")
        .about("Spawn a sub-agent working on a task.")
        .arg(
            Arg::new("task")
                .short('t')
                .long("task")
                .help("What the agent should work on.")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new("label")
                .short('l')
                .long("label")
                .help("Human readable label for the new session.")
                .num_args(1),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .help("Model the agent should run on. Defaults to the gateway's choice.")
                .num_args(1),
        )
        .arg(
            Arg::new("agent-id")
                .long("agent-id")
                .help("Agent to spawn. [default: default]")
                .num_args(1),
        )
        .arg(
            Arg::new("run-timeout")
                .long("run-timeout")
                .help("Time in seconds the agent may run for.")
                .num_args(1)
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("cleanup")
                .long("cleanup")
                .help(format!(
                    "What happens to the session when the run ends. [default: {}]",
                    CleanupPolicy::default()
                ))
                .num_args(1)
                .value_parser(PossibleValuesParser::new(CleanupPolicy::VARIANTS)),
        );
}

fn subcommand_sessions() -> Command {
    return Command::new("sessions")
        .about("Inspect and talk to agent sessions without the interactive view.")
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("List all sessions known to the gateway."))
        .subcommand(
            Command::new("history")
                .about("Print the normalized history of a session.")
                .arg(arg_session_key())
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .help("Output format.")
                        .num_args(1)
                        .default_value("text")
                        .value_parser(PossibleValuesParser::new(HistoryFormat::VARIANTS)),
                ),
        )
        .subcommand(
            Command::new("send")
                .about("Send a message to a session and print the reply.")
                .arg(arg_session_key())
                .arg(
                    Arg::new("message")
                        .short('m')
                        .long("message")
                        .help("Message to send.")
                        .num_args(1)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Print the status of a session.")
                .arg(arg_session_key()),
        )
        .subcommand(subcommand_sessions_spawn());
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("HOTKEYS:") {
                return Paint::new(format!("VIEW {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("agentdeck")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(Command::new("view").about("Open the interactive terminal view. This is the default."))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_sessions())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("AGENTDECK_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::ErrorDismiss.to_string())
                .long(ConfigKey::ErrorDismiss.to_string())
                .env("AGENTDECK_ERROR_DISMISS")
                .num_args(1)
                .help(format!("Time in milliseconds before an error message is dismissed. [default: {}]", Config::default(ConfigKey::ErrorDismiss)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::GatewayToken.to_string())
                .long(ConfigKey::GatewayToken.to_string())
                .env("AGENTDECK_GATEWAY_TOKEN")
                .num_args(1)
                .hide_env_values(true)
                .help("Bearer token used to authenticate with the gateway.")
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::GatewayURL.to_string())
                .short('u')
                .long(ConfigKey::GatewayURL.to_string())
                .env("AGENTDECK_GATEWAY_URL")
                .num_args(1)
                .help(format!("Gateway base URL. [default: {}]", Config::default(ConfigKey::GatewayURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::HistoryLimit.to_string())
                .long(ConfigKey::HistoryLimit.to_string())
                .env("AGENTDECK_HISTORY_LIMIT")
                .num_args(1)
                .help(format!("Maximum number of history messages fetched per session. [default: {}]", Config::default(ConfigKey::HistoryLimit)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RefreshInterval.to_string())
                .long(ConfigKey::RefreshInterval.to_string())
                .env("AGENTDECK_REFRESH_INTERVAL")
                .num_args(1)
                .help(format!("Time in milliseconds between session list refreshes. [default: {}]", Config::default(ConfigKey::RefreshInterval)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::SendTimeout.to_string())
                .long(ConfigKey::SendTimeout.to_string())
                .env("AGENTDECK_SEND_TIMEOUT")
                .num_args(1)
                .help(format!("Time in seconds to wait for an agent to reply to a message. [default: {}]", Config::default(ConfigKey::SendTimeout)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::SessionLimit.to_string())
                .long(ConfigKey::SessionLimit.to_string())
                .env("AGENTDECK_SESSION_LIMIT")
                .num_args(1)
                .help(format!("Maximum number of sessions listed. [default: {}]", Config::default(ConfigKey::SessionLimit)))
                .global(true),
        );
}

pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(false);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        Some(("sessions", subcmd_matches)) => {
            let leaf_matches = match subcmd_matches.subcommand() {
                Some((_, leaf_matches)) => leaf_matches,
                None => {
                    subcommand_sessions().print_long_help()?;
                    return Ok(false);
                }
            };
            Config::load(vec![&matches, subcmd_matches, leaf_matches]).await?;

            match subcmd_matches.subcommand() {
                Some(("list", _)) => {
                    print_sessions_list().await?;
                }
                Some(("history", history_matches)) => {
                    let key = history_matches
                        .get_one::<String>("key")
                        .map(|e| return e.as_str())
                        .unwrap_or_default();
                    let format = history_matches
                        .get_one::<String>("format")
                        .map(|e| return e.parse::<HistoryFormat>())
                        .transpose()?
                        .unwrap_or(HistoryFormat::Text);
                    print_history(key, format).await?;
                }
                Some(("send", send_matches)) => {
                    let key = send_matches
                        .get_one::<String>("key")
                        .map(|e| return e.as_str())
                        .unwrap_or_default();
                    let message = send_matches
                        .get_one::<String>("message")
                        .map(|e| return e.as_str())
                        .unwrap_or_default();
                    send_message(key, message).await?;
                }
                Some(("status", status_matches)) => {
                    let key = status_matches
                        .get_one::<String>("key")
                        .map(|e| return e.as_str())
                        .unwrap_or_default();
                    print_status(key).await?;
                }
                Some(("spawn", spawn_matches)) => {
                    spawn_agent(spawn_matches).await?;
                }
                _ => {
                    subcommand_sessions().print_long_help()?;
                }
            }

            return Ok(false);
        }
        Some(("view", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            prompt_for_token()?;
        }
        _ => {
            Config::load(vec![&matches]).await?;
            prompt_for_token()?;
        }
    }

    return Ok(true);
}
