use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use somnia_core::{Config, DailyKind};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "somnia", version, about = "Somnia dream journal scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily dream-journal reminder
    Reminder {
        #[command(subcommand)]
        action: commands::daily::DailyAction,
    },
    /// Wake-back-to-bed alarm
    Alarm {
        #[command(subcommand)]
        action: commands::daily::DailyAction,
    },
    /// Repeating reality-check timer
    RealityCheck {
        #[command(subcommand)]
        action: commands::reality_check::RealityCheckAction,
    },
    /// Print every schedule's state as JSON
    Status,
    /// Compute the next reality check from the saved settings
    Next {
        /// Local time to compute from (YYYY-MM-DDTHH:MM), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Re-arm saved schedules and print notifications as they fire
    Watch {
        /// Deliver whatever is due once and exit
        #[arg(long)]
        once: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env("SOMNIA_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "somnia", &mut std::io::stdout());
        return;
    }

    let config = Config::load_or_default();
    init_logging(&config);

    let result = match cli.command {
        Commands::Reminder { action } => commands::daily::run(DailyKind::Reminder, action, &config),
        Commands::Alarm { action } => commands::daily::run(DailyKind::WbtbAlarm, action, &config),
        Commands::RealityCheck { action } => commands::reality_check::run(action, &config),
        Commands::Status => commands::status::run(&config),
        Commands::Next { at } => commands::status::next(at.as_deref(), &config),
        Commands::Watch { once } => commands::watch::run(once, &config),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
