use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use uuid::Uuid;

use herald_config::{ConfigLoader, HeraldConfig, LoggingConfig, WarningSeverity};
use herald_core::{HeraldError, Namespace, Result, RunStatus};
use herald_llm::{DecisionPort, OpenAiDecider};
use herald_memory::MemoryStore;
use herald_runtime::Orchestrator;
use herald_tools::{Calendar, Outbox, ToolRegistry};

use crate::input::{EmailArgs, parse_key_val, parse_namespace, parse_status};
use crate::style;

mod prefs;
mod runs;

/// Herald: supervised email assistant with human review and learned preferences
#[derive(Parser, Debug)]
#[command(name = "herald", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to herald.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Classify an email without starting a run
    Triage {
        #[command(flatten)]
        email: EmailArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Process emails end to end; runs that need review stop and wait
    Run {
        #[command(flatten)]
        email: EmailArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List actions waiting for review
    Pending {
        #[arg(long)]
        json: bool,
    },
    /// Execute a pending action as proposed
    Approve {
        run_id: Uuid,
        /// Interrupt to answer (defaults to the run's current one)
        #[arg(long)]
        interrupt: Option<Uuid>,
    },
    /// Execute a pending action with edited arguments
    Edit {
        run_id: Uuid,
        #[arg(long)]
        interrupt: Option<Uuid>,
        /// Replacement arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
        /// Change one argument, e.g. --set duration_minutes=15
        #[arg(short, long = "set", value_parser = parse_key_val)]
        set: Vec<(String, String)>,
    },
    /// Refuse a pending action; the assistant chooses another
    Reject {
        run_id: Uuid,
        #[arg(long)]
        interrupt: Option<Uuid>,
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Answer the email yourself and finish the run
    Respond {
        run_id: Uuid,
        text: String,
        #[arg(long)]
        interrupt: Option<Uuid>,
    },
    /// Cancel a run waiting for review
    Cancel {
        run_id: Uuid,
        /// Fail a run left running by a process that has exited
        #[arg(long)]
        abandon: bool,
    },
    /// List runs, newest first
    Runs {
        /// Filter by status: running, suspended, completed, failed
        #[arg(short, long, value_parser = parse_status)]
        status: Option<RunStatus>,
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show one run in full
    Show {
        run_id: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Inspect and edit learned preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Show current configuration
    Config {
        #[arg(long)]
        json: bool,
    },
    /// Audit configuration
    Doctor,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PrefsAction {
    /// Show one namespace, or all of them
    Show {
        #[arg(value_parser = parse_namespace)]
        namespace: Option<Namespace>,
        #[arg(long)]
        json: bool,
    },
    /// Set one keyed rule
    Set {
        #[arg(value_parser = parse_namespace)]
        namespace: Namespace,
        key: String,
        text: String,
    },
    /// Show recent corrections, oldest first
    History {
        #[arg(value_parser = parse_namespace)]
        namespace: Namespace,
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Replace a namespace's rules from a file (JSON array or one rule per line)
    Replace {
        #[arg(value_parser = parse_namespace)]
        namespace: Namespace,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Seed default rules into namespaces never written
    Seed,
}

/// The runtime plus the simulated backends its tools write to.
pub(crate) struct App {
    pub orchestrator: Orchestrator,
    pub outbox: Arc<Outbox>,
    pub calendar: Arc<Calendar>,
}

impl App {
    fn build(config: HeraldConfig) -> Result<Self> {
        let memory = open_memory(&config)?;
        let decider = build_decider(&config)?;
        let outbox = Arc::new(Outbox::new());
        let calendar = Arc::new(Calendar::new());
        let tools = Arc::new(ToolRegistry::with_builtins(
            Arc::clone(&outbox),
            Arc::clone(&calendar),
        )?);
        let orchestrator = Orchestrator::new(config, decider, tools, memory);
        orchestrator.seed_preferences()?;
        Ok(Self {
            orchestrator,
            outbox,
            calendar,
        })
    }
}

pub(crate) fn open_memory(config: &HeraldConfig) -> Result<Arc<MemoryStore>> {
    let path = &config.memory.db_path;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(MemoryStore::open(path)?))
}

fn build_decider(config: &HeraldConfig) -> Result<Arc<dyn DecisionPort>> {
    let key = config.services.openai_api_key.clone().ok_or_else(|| {
        HeraldError::Config(
            "no OpenAI API key: set [services] openai_api_key in herald.toml or export OPENAI_API_KEY"
                .into(),
        )
    })?;
    let mut decider = OpenAiDecider::new(key);
    if let Some(url) = &config.services.openai_base_url {
        decider = decider.with_base_url(url.clone(), "openai-compatible".into());
    }
    if config.agent.request_timeout_secs > 0 {
        decider = decider.with_timeout(Duration::from_secs(config.agent.request_timeout_secs))?;
    }
    Ok(Arc::new(decider))
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
fn init_tracing(logging: &LoggingConfig, level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let writer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    let installed = match logging.format.as_str() {
        "json" => builder.json().with_target(true).try_init(),
        "compact" => builder.compact().with_target(false).try_init(),
        _ => builder.with_target(false).try_init(),
    };
    installed.map_err(|e| HeraldError::Config(format!("cannot install log subscriber: {e}")))
}

impl Cli {
    /// Resolve log level: --verbose > --quiet > --log-level > config
    fn log_level<'a>(&'a self, config: &'a HeraldConfig) -> &'a str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(&config.logging.level)
        }
    }

    pub async fn run(self) -> Result<()> {
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();
        init_tracing(&config.logging, self.log_level(&config))?;

        match self.command {
            Commands::Triage { email, json } => {
                let emails = email.emails(&config.user.email)?;
                runs::cmd_triage(&App::build(config)?, emails, json).await
            }
            Commands::Run { email, json } => {
                let emails = email.emails(&config.user.email)?;
                runs::cmd_run(&App::build(config)?, emails, json).await
            }
            Commands::Pending { json } => runs::cmd_pending(&*open_memory(&config)?, json),
            Commands::Approve { run_id, interrupt } => {
                runs::cmd_approve(&App::build(config)?, run_id, interrupt).await
            }
            Commands::Edit {
                run_id,
                interrupt,
                args,
                set,
            } => runs::cmd_edit(&App::build(config)?, run_id, interrupt, args, set).await,
            Commands::Reject {
                run_id,
                interrupt,
                reason,
            } => runs::cmd_reject(&App::build(config)?, run_id, interrupt, reason).await,
            Commands::Respond {
                run_id,
                text,
                interrupt,
            } => runs::cmd_respond(&App::build(config)?, run_id, interrupt, text).await,
            Commands::Cancel { run_id, abandon } => {
                runs::cmd_cancel(&*open_memory(&config)?, run_id, abandon)
            }
            Commands::Runs {
                status,
                limit,
                json,
            } => runs::cmd_runs(&*open_memory(&config)?, status, limit, json),
            Commands::Show { run_id, json } => runs::cmd_show(&*open_memory(&config)?, run_id, json),
            Commands::Prefs { action } => prefs::cmd_prefs(&config, action),
            Commands::Config { json } => Self::cmd_config(config, json),
            Commands::Doctor => Self::cmd_doctor(&config),
        }
    }

    fn cmd_config(mut config: HeraldConfig, json: bool) -> Result<()> {
        if config.services.openai_api_key.is_some() {
            config.services.openai_api_key = Some("********".into());
        }
        let rendered = if json {
            serde_json::to_string_pretty(&config)?
        } else {
            toml::to_string_pretty(&config).map_err(|e| HeraldError::Config(e.to_string()))?
        };
        println!("{rendered}");
        Ok(())
    }

    fn cmd_doctor(config: &HeraldConfig) -> Result<()> {
        println!("{}", style::header("Herald configuration audit"));
        println!();

        let warnings = match config.validate() {
            Ok(w) => w,
            Err(e) => {
                println!("{e}");
                return Ok(());
            }
        };

        let mut warn_count = 0;
        let mut info_count = 0;
        for w in &warnings {
            println!("  {w}");
            match w.severity {
                WarningSeverity::Warning => warn_count += 1,
                WarningSeverity::Info => info_count += 1,
                WarningSeverity::Error => {}
            }
        }

        if config.services.openai_api_key.is_none() {
            println!("  warning services.openai_api_key: not set; triage and run will not work");
            warn_count += 1;
        }
        for tool in &config.approval.never_review {
            if matches!(tool.as_str(), "write_email" | "schedule_meeting") {
                println!("  info approval.never_review: '{tool}' will act without review");
                info_count += 1;
            }
        }

        println!();
        println!(
            "  {} warnings, {} suggestions",
            if warn_count == 0 {
                style::success(warn_count)
            } else {
                style::pending(warn_count)
            },
            info_count
        );
        Ok(())
    }
}
