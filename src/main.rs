#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Error;
use anyhow::Result;
use domain::models::Action;
use domain::models::Gateway;
use domain::services::loader::LoaderSettings;
use domain::services::Store;
use infrastructure::gateways::http::HttpGateway;
use tokio::sync::mpsc;
use tokio::task;
use yansi::Paint;

use crate::application::cli;
use crate::application::ui;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::services::actions::ActionsService;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! AgentDeck has failed with the following app version and error.\n\nVersion: {}\nCommit: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            env!("VERGEN_GIT_DESCRIBE"),
            err
        ))
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

async fn run() -> Result<()> {
    let settings = LoaderSettings::from_config()?;
    let refresh_interval =
        Duration::from_millis(Config::get(ConfigKey::RefreshInterval).parse::<u64>()?);

    let store = Rc::new(Store::new());
    let gateway: Rc<dyn Gateway> = Rc::new(HttpGateway::default());
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let actions_store = store.clone();
    let actions_future = async move {
        return ActionsService::start(
            gateway,
            actions_store,
            settings,
            refresh_interval,
            &mut action_rx,
        )
        .await;
    };

    // The UI owns the terminal, so it finishing ends the session even while
    // gateway calls are still in flight.
    return tokio::select!(
        res = actions_future => res,
        res = ui::start(action_tx, store) => res,
    );
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        ui::destruct_terminal_for_panic();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let debug_log_dir = env::var("AGENTDECK_LOG_DIR").unwrap_or_else(|_| {
        return dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("agentdeck")
            .to_string_lossy()
            .to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("agentdeck")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    match cli::parse().await {
        Ok(true) => {}
        Ok(false) => process::exit(0),
        Err(ready_err) => {
            handle_error(ready_err);
            return;
        }
    }

    let local = task::LocalSet::new();
    if let Err(err) = local.run_until(run()).await {
        ui::destruct_terminal_for_panic();
        handle_error(err);
    }

    process::exit(0);
}
