//! quizforge CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizforge", version, about = "Quiz scoring and progress tracking engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score answers against a quiz file without recording anything
    Score {
        /// Path to the quiz .toml file
        #[arg(long)]
        quiz: PathBuf,

        /// JSON file mapping question ids to answers
        #[arg(long)]
        answers: PathBuf,

        /// Optional JSON telemetry file
        #[arg(long)]
        telemetry: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Submit answers for a learner and record the attempt
    Submit {
        /// Learner id
        #[arg(long)]
        learner: String,

        /// Quiz id
        #[arg(long)]
        quiz: String,

        /// JSON file mapping question ids to answers
        #[arg(long)]
        answers: PathBuf,

        /// Optional JSON telemetry file
        #[arg(long)]
        telemetry: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Enroll a learner in a training
    Enroll {
        #[arg(long)]
        learner: String,

        #[arg(long)]
        training: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show a learner's progress in a training
    Progress {
        #[arg(long)]
        learner: String,

        #[arg(long)]
        training: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Set a module's status
    Module {
        #[arg(long)]
        learner: String,

        #[arg(long)]
        training: String,

        #[arg(long)]
        module: String,

        /// not-started, in-progress, completed
        #[arg(long)]
        status: String,

        /// Module progress percent (0-100)
        #[arg(long, default_value = "0")]
        progress: u8,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Record a section's progress
    Section {
        #[arg(long)]
        learner: String,

        #[arg(long)]
        training: String,

        #[arg(long)]
        module: String,

        #[arg(long)]
        section: String,

        /// Mark the section completed
        #[arg(long)]
        completed: bool,

        /// Section progress percent (0-100)
        #[arg(long, default_value = "0")]
        progress: u8,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List a learner's attempts at a quiz
    Attempts {
        #[arg(long)]
        learner: String,

        #[arg(long)]
        quiz: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate quiz TOML files
    Validate {
        /// Path to quiz file or directory
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Create starter config and example quiz
    Init,
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "quizforge=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            quiz,
            answers,
            telemetry,
            format,
            config,
        } => commands::score::execute(quiz, answers, telemetry, format, config),
        Commands::Submit {
            learner,
            quiz,
            answers,
            telemetry,
            format,
            config,
        } => commands::submit::execute(learner, quiz, answers, telemetry, format, config).await,
        Commands::Enroll {
            learner,
            training,
            config,
        } => commands::progress::enroll(learner, training, config).await,
        Commands::Progress {
            learner,
            training,
            format,
            config,
        } => commands::progress::execute(learner, training, format, config).await,
        Commands::Module {
            learner,
            training,
            module,
            status,
            progress,
            config,
        } => commands::module::execute(learner, training, module, status, progress, config).await,
        Commands::Section {
            learner,
            training,
            module,
            section,
            completed,
            progress,
            config,
        } => {
            commands::module::section(learner, training, module, section, completed, progress, config)
                .await
        }
        Commands::Attempts {
            learner,
            quiz,
            config,
        } => commands::attempts::execute(learner, quiz, config).await,
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
