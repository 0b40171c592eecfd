//! Copysmith - structured marketing copy from generative text providers
//!
//! Turns a short content brief into SEO-ready landing pages and other
//! marketing content, then corrects and validates the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use copysmith_adapters::{keyring, Config, FileCredentialStore};
use copysmith_core::normalize::normalize_value;
use copysmith_core::rules::strip_trailing_phrase;
use copysmith_core::{ContentType, CredentialOverride, GenerationRequest, Mode, ProviderTag};
use copysmith_engine::{BackendRegistry, DefaultCredentials, Pipeline};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "copysmith",
    about = "Structured marketing copy from generative text providers",
    version
)]
struct Args {
    /// Log pipeline progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate new content from a brief
    Generate {
        #[arg(long, default_value = "landing-page")]
        content_type: String,

        /// Brief field as key=value (repeatable), e.g. --field topic=glassware
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Refine an existing landing page read from a JSON file ('-' for stdin)
    Refine {
        #[arg(long, default_value = "landing-page")]
        content_type: String,

        #[arg(long)]
        input: PathBuf,

        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Run a full request read from a JSON file ('-' for stdin)
    Run {
        #[arg(long)]
        request: PathBuf,
    },
    /// Store a default API key for a provider
    Setup {
        #[arg(long, default_value = "openai")]
        provider: String,
    },
}

#[derive(clap::Args, Debug, Default)]
struct CredentialArgs {
    /// Provider tag (openai, openrouter, groq, anthropic, gemini)
    #[arg(long)]
    provider: Option<String>,

    #[arg(long)]
    model: Option<String>,

    /// API key for this run only
    #[arg(long)]
    api_key: Option<String>,

    /// Tenant whose stored credentials and templates apply
    #[arg(long)]
    tenant: Option<String>,
}

impl CredentialArgs {
    fn apply(self, request: &mut GenerationRequest) {
        if self.provider.is_some() || self.model.is_some() || self.api_key.is_some() {
            request.credential_override = Some(CredentialOverride {
                api_key: self.api_key,
                model: self.model,
                provider: self.provider,
            });
        }
        request.tenant_id = self.tenant;
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let request = match args.command {
        Command::Setup { provider } => return setup_api_key(&provider),
        Command::Generate {
            content_type,
            fields,
            credentials,
        } => {
            let mut request = GenerationRequest::new(content_type.parse::<ContentType>()?);
            request.fields.extend(fields);
            credentials.apply(&mut request);
            request
        }
        Command::Refine {
            content_type,
            input,
            fields,
            credentials,
        } => {
            let existing: serde_json::Value = serde_json::from_str(&read_input(&input)?)
                .with_context(|| format!("{} is not valid JSON", input.display()))?;
            let mut request = GenerationRequest::new(content_type.parse::<ContentType>()?);
            request.mode = Mode::Refine;
            request.fields.extend(fields);
            request.existing = Some(existing);
            credentials.apply(&mut request);
            request
        }
        Command::Run { request } => serde_json::from_str(&read_input(&request)?)
            .with_context(|| format!("{} is not a valid request", request.display()))?,
    };

    let config = Config::load();
    let request = with_inferred_topic(request, &config.keyword_suffix);
    let pipeline = build_pipeline(config)?;

    match pipeline.run(&request).await {
        Ok(result) => {
            for warning in &result.warnings {
                eprintln!("  ! {}", warning.message);
            }
            let json = serde_json::to_string_pretty(&result.into_json())?;
            println!("{}", json);
            Ok(())
        }
        Err(err) => Err(anyhow::anyhow!("{}", err.user_message())),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "copysmith=debug,copysmith_engine=debug,copysmith_adapters=debug,info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Refine requests without a topic take it from the content's focus keyword.
fn with_inferred_topic(mut request: GenerationRequest, suffix: &str) -> GenerationRequest {
    if request.mode != Mode::Refine || !request.topic().is_empty() {
        return request;
    }
    let Some(existing) = request.existing.clone() else {
        return request;
    };
    let keyword = normalize_value(existing).seo.focus_keyword;
    let topic =
        strip_trailing_phrase(&keyword, suffix).unwrap_or_else(|| keyword.trim().to_string());
    if !topic.is_empty() {
        tracing::debug!(%topic, "inferred topic from focus keyword");
        request.fields.insert("topic".to_string(), topic);
    }
    request
}

fn build_pipeline(config: Config) -> Result<Pipeline> {
    let registry = BackendRegistry::http(&config)?;
    let defaults = DefaultCredentials::from_config(&config, config.default_api_keys());
    let tenants = match &config.tenant_credentials_path {
        Some(path) => Some(FileCredentialStore::load(path).map_err(anyhow::Error::msg)?),
        None => None,
    };

    let mut pipeline = Pipeline::new(config, registry).with_default_credentials(defaults);
    if let Some(store) = tenants {
        tracing::debug!(tenants = store.tenant_count(), "loaded tenant credentials");
        pipeline = pipeline.with_tenant_credentials(Arc::new(store));
    }
    Ok(pipeline)
}

/// Read a key from stdin and store it as the provider's default.
fn setup_api_key(provider: &str) -> Result<()> {
    let provider: ProviderTag = provider.parse()?;

    println!();
    println!("  Paste your {} API key and press Enter.", provider);
    println!(
        "  It will be stored in your {}.",
        keyring::credentials_store_label()
    );
    println!("  Prefer env vars? Set {} instead.", provider.env_key());
    println!();
    print!("  API Key: ");
    io::stdout().flush()?;

    let mut key = String::new();
    io::stdin().read_line(&mut key)?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("No API key provided");
    }

    let config = Config::load();
    config.set_api_key(provider, key).map_err(anyhow::Error::msg)?;

    println!();
    println!("  + API key saved for {}", provider);
    println!("  Settings live in {}", Config::config_location());
    Ok(())
}
