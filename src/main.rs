use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use safebites_agents::agents::{Orchestrator, SessionGateway};
use safebites_agents::config::Config;
use safebites_agents::llm::{LLMAdapter, LLMProviderConfig, LLM};
use safebites_agents::models::UserPreferences;
use safebites_agents::services::{AnalyzeService, RecommendService};
use safebites_agents::utils::init_logger;
use safebites_agents::vision::{VisionOcr, DEFAULT_IMAGE_MIME_TYPE};

#[derive(Parser, Debug)]
#[command(name = "safebites", version, about = "Score food products and find healthier alternatives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search ingredients and score the product
    Analyze {
        product: String,
        #[command(flatten)]
        prefs: PrefArgs,
    },
    /// Analyze, then recommend and rescore alternatives until the score is acceptable
    Improve {
        product: String,
        #[command(flatten)]
        prefs: PrefArgs,
    },
    /// Recommend alternatives for a product with a known score
    Recommend {
        product: String,
        #[arg(long)]
        score: f64,
    },
    /// Read the product name from a photo, then run the full workflow
    #[command(alias = "scan")]
    Ocr {
        image: PathBuf,
        #[arg(long, help = "Image mime type (guessed from the extension when omitted)")]
        mime_type: Option<String>,
        #[command(flatten)]
        prefs: PrefArgs,
    },
}

#[derive(Args, Debug, Default)]
struct PrefArgs {
    #[arg(long = "allergy", help = "Allergy to respect (repeatable)")]
    allergies: Vec<String>,
    #[arg(long = "diet-goal", help = "Diet goal to respect (repeatable)")]
    diet_goals: Vec<String>,
    #[arg(long = "avoid", help = "Ingredient to avoid (repeatable)")]
    avoid_ingredients: Vec<String>,
}

impl PrefArgs {
    fn into_preferences(self) -> Option<UserPreferences> {
        let prefs = UserPreferences {
            allergies: self.allergies,
            diet_goals: self.diet_goals,
            avoid_ingredients: self.avoid_ingredients,
        };
        (!prefs.is_empty()).then_some(prefs)
    }
}

/// Mime type guessed from the file extension; unsupported types are rejected later by the OCR step
fn mime_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_IMAGE_MIME_TYPE)
        .to_string()
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    info!(model = %config.llm.model, workflow = ?config.workflow, "Configuration loaded");

    let llm = LLM::new(LLMProviderConfig {
        name: config.llm.provider.clone(),
        api_key: config.llm.google_api_key.clone(),
        api_base: Some(config.llm.api_base.clone()),
    })?;
    let adapter: Arc<dyn LLMAdapter> = Arc::new(llm);
    let gateway = Arc::new(SessionGateway::new(adapter.clone(), config.llm.model.clone()));
    let orchestrator = Arc::new(Orchestrator::from_gateway(gateway, config.workflow));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling workflow");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Commands::Analyze { product, prefs } => {
            let prefs = prefs.into_preferences();
            let (search, score) = orchestrator
                .analyze_only(&product, prefs.as_ref(), &cancel)
                .await?;
            print_json(&serde_json::json!({
                "productName": product,
                "search": search,
                "score": score,
            }))?;
        }
        Commands::Improve { product, prefs } => {
            let prefs = prefs.into_preferences();
            let result = orchestrator
                .analyze_and_improve(&product, prefs.as_ref(), &cancel)
                .await?;
            print_json(&result)?;
        }
        Commands::Recommend { product, score } => {
            let service = RecommendService::new(orchestrator);
            let result = service.recommend(&product, score, &cancel).await?;
            print_json(&result)?;
        }
        Commands::Ocr {
            image,
            mime_type,
            prefs,
        } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("read image {}", image.display()))?;
            let mime_type = mime_type.unwrap_or_else(|| mime_type_for(&image));
            let vision = Arc::new(VisionOcr::new(adapter, config.llm.model.clone()));
            let service = AnalyzeService::new(vision, orchestrator);
            let prefs = prefs.into_preferences();
            let outcome = service
                .analyze(&bytes, &mime_type, prefs.as_ref(), &cancel)
                .await?;
            print_json(&outcome)?;
        }
    }

    Ok(())
}
