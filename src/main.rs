use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use traced_completion::{CompletionError, CompletionRunner, Settings};

const DEMO_PROMPT: &str = "Hello, world!";

#[derive(Parser)]
#[command(name = "traced-completion")]
#[command(author, version, long_about = None)]
#[command(about = "Send one prompt to a chat-completion API and print the reply")]
struct Cli {
    /// Prompt to send; a fixed greeting when omitted
    prompt: Option<String>,

    /// Model identifier, overriding OPENAI_MODEL
    #[arg(short, long)]
    model: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: could not install log subscriber: {e}");
    }

    let mut settings = Settings::load();
    if let Some(model) = cli.model {
        settings.model = model;
    }
    let prompt = cli.prompt.as_deref().unwrap_or(DEMO_PROMPT);

    match complete(&settings, prompt).await {
        Ok(text) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{text}") {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn complete(settings: &Settings, prompt: &str) -> Result<String, CompletionError> {
    let runner = CompletionRunner::from_settings(settings)?;
    runner.run(prompt).await
}
