use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photostrip::{api, config::Config, service::CollageService};
use photostrip_core::SourceImage;

#[derive(Parser)]
#[command(name = "photostrip")]
#[command(about = "Stack received photos into a square photo strip")]
struct Cli {
    /// JSON config file (default: <config dir>/photostrip/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for the HTTP API
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Compose image files into a collage without starting the server
    Compose {
        /// Where to write the PNG
        #[arg(short, long)]
        output: PathBuf,

        /// Side length of the square collage in pixels
        #[arg(short, long)]
        side: Option<u32>,

        /// Images to stack, top to bottom
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

/// Initialize tracing with output to stderr (for compose) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "photostrip=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // compose prints the output path on stdout
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = matches!(cli.command, Some(Commands::Compose { .. }));
    init_tracing(use_stderr);

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await?;
        }
        Some(Commands::Compose {
            output,
            side,
            inputs,
        }) => {
            if let Some(side) = side {
                config.side_length = side;
                config.validate()?;
            }
            compose_files(&config, &inputs, &output)?;
        }
        None => serve(config).await?,
    }

    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting photostrip server on port {}", config.port);

    let service = CollageService::from_config(&config)?;
    let app = api::create_router(service, config.max_upload_bytes);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("photostrip server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn compose_files(config: &Config, inputs: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    let images = inputs
        .iter()
        .enumerate()
        .map(|(rank, path)| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            SourceImage::decode(path.display().to_string(), rank as i64, &bytes)
                .with_context(|| format!("Failed to decode {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let collage = config.composer().compose(&images)?;
    std::fs::write(output, collage.to_png()?)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(
        "Composed {} images into a {}px collage",
        images.len(),
        collage.side()
    );
    println!("{}", output.display());
    Ok(())
}
