//! CLI for veo-chain - generate and extend Veo videos.

use clap::{Args, Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use veo_chain::pipeline::{DEFAULT_EXTENSION_PROMPT, DEFAULT_PROMPT};
use veo_chain::{
    ArtifactReference, Config, Pipeline, PipelineReport, Poller, RetryPolicy,
    SourceVideo, VertexVeoProvider,
};

#[derive(Parser)]
#[command(name = "veo-chain")]
#[command(about = "Generate a Veo video on Vertex AI and extend it")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a video, then extend it (default)
    Run {
        /// Prompt for the first clip
        #[arg(long, default_value = DEFAULT_PROMPT)]
        prompt: String,

        /// Prompt describing what happens in the extension
        #[arg(long, default_value = DEFAULT_EXTENSION_PROMPT)]
        extension_prompt: String,
    },

    /// Generate a single video
    Generate {
        /// The text prompt describing the video
        prompt: String,
    },

    /// Extend an existing video
    Extend {
        /// Storage URI of the video to extend (gs://...)
        #[arg(short, long)]
        input: String,

        /// The text prompt describing what happens next
        prompt: String,
    },
}

#[derive(Args)]
struct SettingsArgs {
    /// GCP project ID [env: GOOGLE_CLOUD_PROJECT]
    #[arg(long, global = true)]
    project: Option<String>,

    /// GCP location [env: GOOGLE_CLOUD_LOCATION]
    #[arg(long, global = true)]
    location: Option<String>,

    /// Storage prefix for generated videos [env: VEO_OUTPUT_GCS_URI]
    #[arg(long, global = true)]
    output_uri: Option<String>,

    /// Veo model identifier [env: VEO_MODEL]
    #[arg(long, global = true)]
    model: Option<String>,

    /// Aspect ratio (e.g., 16:9)
    #[arg(long, global = true)]
    aspect_ratio: Option<String>,

    /// Resolution (e.g., 720p, 1080p, 4k)
    #[arg(long, global = true)]
    resolution: Option<String>,

    /// Maximum submissions per video when throttled (at least 1)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,

    /// Seconds between operation status checks
    #[arg(long, global = true)]
    poll_interval: Option<u64>,
}

impl SettingsArgs {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(project) = &self.project {
            config.project = Some(project.clone());
        }
        if let Some(location) = &self.location {
            config.location = location.clone();
        }
        if let Some(uri) = &self.output_uri {
            config.output_uri = uri.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(ratio) = &self.aspect_ratio {
            config.aspect_ratio = ratio.clone();
        }
        if let Some(resolution) = &self.resolution {
            config.resolution = resolution.clone();
        }
        config
    }

    fn policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(attempts) = self.max_attempts {
            policy = policy.with_max_attempts(attempts);
        }
        if let Some(secs) = self.poll_interval {
            policy = policy.with_poll_interval(Duration::from_secs(secs));
        }
        policy
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.settings.apply(Config::from_env());
    if let Err(e) = config.validate() {
        println!("ERROR: {e}");
        return Ok(());
    }

    let provider = VertexVeoProvider::from_config(&config)?;
    tracing::info!(
        project = %provider.project(),
        location = %provider.location(),
        output_uri = %config.output_uri,
        model = %config.model,
        "using Veo on Vertex AI"
    );

    let poller = Poller::new(provider).with_policy(cli.settings.policy());

    match cli.command.unwrap_or(Commands::Run {
        prompt: DEFAULT_PROMPT.to_string(),
        extension_prompt: DEFAULT_EXTENSION_PROMPT.to_string(),
    }) {
        Commands::Run {
            prompt,
            extension_prompt,
        } => {
            let pipeline = Pipeline::new(poller, config);
            let report = pipeline.run(&prompt, &extension_prompt).await;
            print_report(&report, cli.json)?;
        }
        Commands::Generate { prompt } => {
            let request = config.request(prompt);
            let result = poller.submit_and_await(&request).await;
            print_single("generate", result.ok(), cli.json)?;
        }
        Commands::Extend { input, prompt } => {
            let request = config
                .request(prompt)
                .with_source_video(SourceVideo::mp4(input));
            let result = poller.submit_and_await(&request).await;
            print_single("extend", result.ok(), cli.json)?;
        }
    }

    Ok(())
}

fn print_report(report: &PipelineReport, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let result = serde_json::json!({
            "success": report.extended.is_some(),
            "generated": report.generated.as_ref().map(|a| a.uri.as_str()),
            "extended": report.extended.as_ref().map(|a| a.uri.as_str()),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match (&report.generated, &report.extended) {
        (None, _) => println!("Video generation failed; extension skipped."),
        (Some(generated), None) => {
            println!("Video URI: {}", generated);
            println!("Video extension failed.");
        }
        (Some(generated), Some(extended)) => {
            println!("Video URI: {}", generated);
            println!("Extended Video URI: {}", extended);
        }
    }
    Ok(())
}

fn print_single(
    action: &str,
    artifact: Option<ArtifactReference>,
    json_output: bool,
) -> anyhow::Result<()> {
    if json_output {
        let result = serde_json::json!({
            "type": action,
            "success": artifact.is_some(),
            "uri": artifact.as_ref().map(|a| a.uri.as_str()),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        match artifact {
            Some(artifact) => println!("Video URI: {}", artifact),
            None => println!("Video {action} failed."),
        }
    }
    Ok(())
}
