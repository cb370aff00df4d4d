//! `fortune` command-line driver
//!
//! Runs the pipeline over an in-memory store (optionally persisted to a JSON
//! state file between runs) with the deterministic fallback as generator.

mod logging;
mod output;
mod parse;
mod state;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use fortune_batch::{BatchOrchestrator, BatchRequest};
use fortune_cache::{CachedStore, DailyCacheController, InMemoryStore};
use fortune_core::{FortuneConfig, FortuneRequest, FortuneType};
use fortune_gateway::GenerationGateway;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Exit code when a regeneration is refused by the daily quota
const EXIT_LIMIT_EXCEEDED: i32 = 2;

fn user_arg() -> Arg {
    Arg::new("user")
        .long("user")
        .required(true)
        .help("User identifier")
}

fn date_arg() -> Arg {
    Arg::new("date")
        .long("date")
        .help("Target date (YYYY-MM-DD); defaults to today in the configured offset")
}

fn attr_arg() -> Arg {
    Arg::new("attr")
        .long("attr")
        .short('a')
        .action(ArgAction::Append)
        .help("Request attribute as key=value (repeatable)")
}

fn single_type_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .arg(user_arg())
        .arg(
            Arg::new("type")
                .long("type")
                .short('t')
                .required(true)
                .help("Fortune type, e.g. daily, saju, blood-type, dream-interpretation"),
        )
        .arg(date_arg())
        .arg(attr_arg())
}

fn cli() -> Command {
    Command::new("fortune")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Deterministic fortune generation with per-day caching")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("state")
                .long("state")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON file holding records between runs"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(single_type_command(
            "generate",
            "Fetch today's record for one fortune type, creating it if absent",
        ))
        .subcommand(single_type_command(
            "regenerate",
            "Replace the record for one fortune type within the daily quota",
        ))
        .subcommand(
            Command::new("batch")
                .about("Generate every fortune type in a package")
                .arg(user_arg())
                .arg(
                    Arg::new("package")
                        .long("package")
                        .short('p')
                        .required(true)
                        .help("Package id (see `fortune packages`)"),
                )
                .arg(date_arg())
                .arg(attr_arg())
                .arg(
                    Arg::new("timeout-ms")
                        .long("timeout-ms")
                        .value_parser(value_parser!(u64))
                        .help("Batch deadline in milliseconds"),
                )
                .arg(
                    Arg::new("regenerate")
                        .long("regenerate")
                        .action(ArgAction::SetTrue)
                        .help("Regenerate every type instead of reusing today's records"),
                ),
        )
        .subcommand(Command::new("packages").about("List available packages"))
}

/// Wired pipeline for one invocation
struct Pipeline {
    store: Arc<InMemoryStore>,
    controller: DailyCacheController,
    config: FortuneConfig,
}

impl Pipeline {
    fn build(config: FortuneConfig, store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        let cached = CachedStore::new(store.clone(), config.read_cache_capacity);
        let gateway = GenerationGateway::from_config(&config);
        let controller = DailyCacheController::from_config(Arc::new(cached), gateway, &config);
        Self {
            store,
            controller,
            config,
        }
    }

    fn request(&self, args: &ArgMatches, regenerate: bool) -> Result<FortuneRequest> {
        let user = required(args, "user")?;
        let fortune_type: FortuneType = required(args, "type")?.parse()?;
        let date = match args.get_one::<String>("date") {
            Some(raw) => parse::date(raw)?,
            None => self.controller.today(),
        };
        Ok(FortuneRequest::new(user, fortune_type, date)
            .with_attributes(attributes(args)?)
            .with_regenerate(regenerate))
    }

    async fn single(&self, args: &ArgMatches, regenerate: bool) -> Result<(Value, bool)> {
        let request = self.request(args, regenerate)?;
        let outcome = if regenerate {
            self.controller.regenerate(&request).await?
        } else {
            self.controller.fetch_or_create(&request).await?
        };
        Ok((output::fetch_view(&outcome), outcome.is_limit_exceeded()))
    }

    async fn batch(&self, args: &ArgMatches) -> Result<Value> {
        let mut request = BatchRequest::new(required(args, "user")?, required(args, "package")?)
            .with_attributes(attributes(args)?)
            .with_regenerate(args.get_flag("regenerate"));
        if let Some(raw) = args.get_one::<String>("date") {
            request = request.with_date(parse::date(raw)?);
        }
        if let Some(ms) = args.get_one::<u64>("timeout-ms") {
            request = request.with_timeout(Duration::from_millis(*ms));
        }

        let orchestrator = BatchOrchestrator::from_config(self.controller.clone(), &self.config);
        let batch = orchestrator.generate_batch(&request).await?;
        Ok(output::batch_view(&batch))
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{name}"))
}

fn attributes(args: &ArgMatches) -> Result<fortune_core::Attributes> {
    parse::attributes(args.get_many::<String>("attr").unwrap_or_default())
}

fn print(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    logging::init_tracing(matches.get_flag("log-json"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => FortuneConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FortuneConfig::default(),
    };
    let state_path = matches.get_one::<PathBuf>("state");
    let store = match state_path {
        Some(path) => state::load(path)?,
        None => InMemoryStore::new(),
    };
    let pipeline = Pipeline::build(config, store);

    let mut limited = false;
    match matches.subcommand() {
        Some(("generate", args)) => {
            let (view, _) = pipeline.single(args, false).await?;
            print(&view)?;
        }
        Some(("regenerate", args)) => {
            let (view, refused) = pipeline.single(args, true).await?;
            print(&view)?;
            limited = refused;
        }
        Some(("batch", args)) => print(&pipeline.batch(args).await?)?,
        Some(("packages", _)) => {
            let orchestrator = BatchOrchestrator::new(pipeline.controller.clone());
            print(&output::packages_view(orchestrator.packages().iter()))?;
        }
        _ => {
            cli().print_help()?;
        }
    }

    if let Some(path) = state_path {
        state::save(path, &pipeline.store)?;
    }
    if limited {
        std::process::exit(EXIT_LIMIT_EXCEEDED);
    }
    Ok(())
}
