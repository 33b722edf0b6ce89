use anyhow::Context;
use clap::{Parser, Subcommand};
use pixel_insights::config::{Settings, RUST_LOG};
use pixel_insights::fetch::{ImageSource, SAMPLES};
use pixel_insights::flows::{self, Analysis, Inference, InputData};
use pixel_insights::server::{self, AppState};
use pixel_insights::view::{Interaction, ViewText};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// See how a hosted multimodal model classifies, detects, explains and
/// embeds photos of cats and dogs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ./pixel-insights.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the JSON web server
    Serve {
        /// Listen address, overrides the configured one
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Predict whether an image shows a cat or a dog
    Classify {
        /// Image file, http(s) URL or sample id
        image: String,
    },

    /// Find the cats and dogs in an image
    Detect {
        /// Image file, http(s) URL or sample id
        image: String,
    },

    /// Generate an attention map of an image
    Attention {
        /// Image file, http(s) URL or sample id
        image: String,

        /// Write the attention map image to this file
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },

    /// Compute the embedding vector of an image
    EmbedImage {
        /// Image file, http(s) URL or sample id
        image: String,
    },

    /// Compute the embedding vector of a text
    EmbedText { text: String },

    /// List the built-in sample images
    Samples,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(RUST_LOG));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one analysis through an interaction and print every state it goes
/// through. Returns the result when the analysis succeeded.
async fn analyze(
    state: &AppState,
    analysis: Analysis,
    input: &str,
) -> anyhow::Result<Option<Inference>> {
    let text = ViewText::for_analysis(analysis);
    let mut interaction: Interaction<Inference> = Interaction::default();

    interaction.begin()?;
    eprintln!("{}", interaction.render(&text));

    let data = match analysis {
        Analysis::EmbedText => Ok(InputData::Text(input.to_string())),
        _ => match input.parse::<ImageSource>() {
            Ok(source) => state.fetcher.load(&source).await.map(InputData::Image),
            Err(err) => Err(err),
        },
    };
    let outcome = match data {
        Ok(data) => flows::run(&state.client, analysis, &data).await,
        Err(err) => Err(err),
    };

    interaction.finish(outcome);
    println!("{}", interaction.render(&text));

    Ok(match interaction {
        Interaction::Ready(inference) => Some(inference),
        _ => None,
    })
}

#[actix_web::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let args = Args::parse();

    if let Command::Samples = args.command {
        for sample in SAMPLES {
            println!("{:6} {:40} {}", sample.id, sample.url, sample.alt);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;
    let state = AppState::new(&settings)?;

    let (analysis, input, save) = match args.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            server::serve(state, &bind).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Classify { image } => (Analysis::Classify, image, None),
        Command::Detect { image } => (Analysis::Detect, image, None),
        Command::Attention { image, save } => (Analysis::AttentionMap, image, save),
        Command::EmbedImage { image } => (Analysis::EmbedImage, image, None),
        Command::EmbedText { text } => (Analysis::EmbedText, text, None),
        Command::Samples => unreachable!("handled above"),
    };

    let Some(inference) = analyze(&state, analysis, &input).await? else {
        return Ok(ExitCode::FAILURE);
    };

    if let (Some(path), Inference::Attention(result)) = (save, &inference) {
        let overlay = result.overlay_image.decode()?;
        tokio::fs::write(&path, &overlay.bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("saved attention map to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}
