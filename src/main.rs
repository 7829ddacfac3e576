use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use revimg::api::{self, Reply};
use revimg::facade;
use revimg::intent::{
    Intent, ACTION_SEND, EXTRA_PROCESS_TEXT, EXTRA_STREAM, EXTRA_TEXT,
};
use revimg::platform::ChannelHost;
use revimg::update::{self, UpdateChecker};
use revimg::{Config, DesktopPlatform, Dispatcher, Engine, Platform};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;

/// How long a finished command waits for a still-running update check.
const UPDATE_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "revimg", version, about = "Reverse image search dispatcher")]
struct Cli {
    /// Print the query URL instead of opening a browser
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search an image URL or a local image file
    Search {
        #[arg(short, long, default_value = "google")]
        engine: Engine,
        /// Decode and re-encode a local file before sending it
        #[arg(long)]
        bitmap: bool,
        subject: String,
    },
    /// Replay an organic share/view/process-text event
    Share {
        #[arg(short, long, default_value = "google")]
        engine: Engine,
        #[arg(long, default_value = ACTION_SEND)]
        action: String,
        #[arg(long = "type")]
        mime_type: Option<String>,
        #[arg(long)]
        data: Option<String>,
        #[arg(long)]
        clip: Vec<String>,
        #[arg(long)]
        stream: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        process_text: Option<String>,
    },
    /// Receive a JSON-encoded intent from a file, or stdin when omitted
    Intent {
        /// Engine for organic shares; API actions carry their own
        #[arg(short, long, default_value = "google")]
        engine: Engine,
        path: Option<PathBuf>,
    },
    /// List supported engines
    Engines {
        #[arg(long)]
        json: bool,
    },
    /// Check for a newer release
    CheckUpdate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let platform = Arc::new(DesktopPlatform::new(cli.dry_run));
    let dispatcher = Arc::new(Dispatcher::from_config(&config, platform.clone())?);

    let ok = match cli.command {
        Command::Engines { json } => {
            print_engines(json)?;
            true
        }
        Command::CheckUpdate => {
            let checker = UpdateChecker::from_config(&config)?;
            match checker.check().await? {
                Some(info) => platform.notify_update(&info),
                None => println!("revimg {} is up to date", config.current_version),
            }
            true
        }
        Command::Search {
            engine,
            bitmap,
            subject,
        } => {
            let (host, mut rx) = ChannelHost::new(std::env::temp_dir());
            if config.url_policy.is_valid(&subject) {
                facade::search_image_url(&host, &subject, engine)?;
            } else if bitmap {
                let image = image::open(&subject)
                    .with_context(|| format!("could not open image {}", subject))?;
                facade::search_image(&host, &image, engine)?;
            } else {
                let path = std::fs::canonicalize(&subject)
                    .with_context(|| format!("not a URL or readable file: {}", subject))?;
                let uri = url::Url::from_file_path(&path)
                    .map_err(|_| anyhow!("cannot build file URI for {}", path.display()))?;
                facade::search_image_uri(&host, uri.as_str(), engine)?;
            }
            drop(host);

            let mut ok = true;
            while let Some(json) = rx.recv().await {
                let intent = api::decode(&json)?;
                ok &= run(&dispatcher, &config, intent, engine).await?;
            }
            ok
        }
        Command::Share {
            engine,
            action,
            mime_type,
            data,
            clip,
            stream,
            text,
            process_text,
        } => {
            let mut intent = Intent::new(action);
            intent.mime_type = mime_type;
            intent.data = data;
            intent.clip_data = clip;
            if let Some(stream) = stream {
                intent = intent.put_extra(EXTRA_STREAM, stream);
            }
            if let Some(text) = text {
                intent = intent.put_extra(EXTRA_TEXT, text);
            }
            if let Some(process_text) = process_text {
                intent = intent.put_extra(EXTRA_PROCESS_TEXT, process_text);
            }
            run(&dispatcher, &config, intent, engine).await?
        }
        Command::Intent { engine, path } => {
            let json = match path {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("could not read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                }
            };
            let intent = api::decode(&json)?;
            run(&dispatcher, &config, intent, engine).await?
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Receive one intent, with the update check running beside it.
async fn run(dispatcher: &Arc<Dispatcher>, config: &Config, intent: Intent, engine: Engine) -> Result<bool> {
    let runtime = Handle::current();

    let update = if config.check_updates {
        let checker = UpdateChecker::from_config(config)?;
        Some(update::spawn_check(&runtime, checker, dispatcher.platform().clone()))
    } else {
        None
    };

    let task = {
        let dispatcher = Arc::clone(dispatcher);
        runtime.spawn(async move { api::receive(&dispatcher, &intent, engine).await })
    };
    let reply = task.await?;

    if let Some(update) = update {
        if tokio::time::timeout(UPDATE_GRACE, update).await.is_err() {
            log::debug!("update check still running, abandoning it");
        }
    }

    Ok(match reply {
        Reply::Search(outcome) => outcome.is_delivered(),
        Reply::Engines(_) => true,
    })
}

fn print_engines(json: bool) -> Result<()> {
    let engines = facade::engines();
    if json {
        println!("{}", serde_json::to_string_pretty(&engines)?);
        return Ok(());
    }
    for info in engines {
        println!("{:<10} {:<12} {}", info.id, info.label, info.description);
    }
    Ok(())
}
