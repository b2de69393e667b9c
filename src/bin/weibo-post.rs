//! Command-line entry point.
//!
//! ```text
//! weibo-post "post text" --image photo.jpg --submit
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use weibo_autopost::{PostOptions, sequencer};

/// Post to Weibo through a visible Chrome window.
#[derive(Parser, Debug)]
#[command(name = "weibo-post", version, about)]
struct Cli {
    /// Post text; multiple words are joined with spaces.
    text: Vec<String>,

    /// Image file to attach (repeatable).
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Actually submit the post instead of previewing it.
    #[arg(long)]
    submit: bool,

    /// Chrome profile directory (defaults to a persistent app profile).
    #[arg(long, value_name = "DIR")]
    profile: Option<PathBuf>,

    /// Path to the Chrome executable.
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Editor wait budget in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

impl Cli {
    fn into_options(self) -> PostOptions {
        let mut options = PostOptions::new();
        let text = self.text.join(" ");
        if !text.is_empty() {
            options = options.with_text(text);
        }
        for image in self.images {
            options = options.with_image(image);
        }
        if self.submit {
            options = options.with_submit();
        }
        if let Some(dir) = self.profile {
            options = options.with_profile_dir(dir);
        }
        if let Some(path) = self.chrome {
            options = options.with_executable(path);
        }
        if let Some(ms) = self.timeout_ms {
            options = options.with_timeout(Duration::from_millis(ms));
        }
        options
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let options = Cli::parse().into_options();
    if options.is_empty() {
        eprintln!("Error: nothing to post; provide text and/or --image");
        return ExitCode::FAILURE;
    }

    match sequencer::post(&options).await {
        Ok(outcome) => {
            if outcome.submitted {
                println!("Posted ({} image(s) attached).", outcome.images_attached);
            } else {
                println!("Previewed without submitting. Pass --submit to post.");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
