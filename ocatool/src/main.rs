use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use colored::Colorize;
use ocaform::FormError;
use ocatool::{
    config::ToolConfig,
    ctx::AppContext,
    report::{check_answers, failures_report, outline},
    submit::questions,
};

#[derive(Parser)]
#[command(name = "ocatool", version, about = "Inspect, compile and check OCA questionnaire packages")]
struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Configuration file (default: .ocatool.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a package into ordered steps
    Compile {
        package: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fail when steps reference each other in a cycle
        #[arg(long)]
        strict: bool,
    },
    /// Print an outline of the compiled form
    Inspect {
        package: PathBuf,
        #[arg(short, long)]
        lang: Option<String>,
    },
    /// Validate an answers document
    Check {
        package: PathBuf,
        answers: PathBuf,
        #[arg(short, long)]
        lang: Option<String>,
    },
    /// Build the submission questions document
    Questions {
        package: PathBuf,
        answers: PathBuf,
        #[arg(short, long)]
        lang: Option<String>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the JSON schema of the configuration file
    ConfigSchema,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let config = ToolConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile {
            package,
            output,
            strict,
        } => {
            let ctx = AppContext::load(package, config)?;
            if strict && let Some(cycle) = ctx.form.cycle() {
                return Err(FormError::from(cycle.clone()).into());
            }
            ctx.write_json(ctx.form.steps(), output.as_deref())?;
        }
        Commands::Inspect { package, lang } => {
            let ctx = AppContext::load(package, config)?;
            println!("{}", outline(&ctx.form, ctx.language(lang.as_deref())));
        }
        Commands::Check {
            package,
            answers,
            lang,
        } => {
            let ctx = AppContext::load(package, config)?;
            let data = AppContext::load_answers(&answers)?;
            let lang = ctx.language(lang.as_deref());
            let failures = check_answers(&ctx.form, &data, lang);
            println!("{}", failures_report(&ctx.form, &failures, lang));
            if ctx.config.enforce_validation && !failures.is_empty() {
                bail!("{} answer(s) failed validation", failures.len());
            }
        }
        Commands::Questions {
            package,
            answers,
            lang,
            output,
        } => {
            let ctx = AppContext::load(package, config)?;
            let data = AppContext::load_answers(&answers)?;
            let doc = questions(&ctx.form, &data, ctx.language(lang.as_deref()));
            ctx.write_json(&doc, output.as_deref())?;
        }
        Commands::ConfigSchema => {
            let schema = ToolConfig::schema()?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            eprintln!("{}", format!("save as {}", ocatool::config::CONFIG_FILE).dimmed());
        }
    }
    Ok(())
}
