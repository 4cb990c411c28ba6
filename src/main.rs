use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use floatchat_engine::config::EngineConfig;
use floatchat_engine::engine::QueryEngine;
use floatchat_engine::lexicon::DomainLexicon;
use floatchat_engine::schema::CanonicalSchema;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "floatchat-engine")]
#[command(about = "Natural-language query engine for ARGO float profiles")]
struct Args {
    /// The question in natural language
    query: String,

    /// Path to a lexicon JSON file (default: built-in region set)
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// OpenAI-compatible API key (or set OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Model endpoint base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Timeout for the external model call, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Number of retrieved examples included in the prompt
    #[arg(long)]
    retrieval_k: Option<usize>,

    /// Reference date for relative time expressions (default: today)
    #[arg(long)]
    now: Option<NaiveDate>,

    /// Emit the full answer as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = EngineConfig::from_env();
    if args.api_key.is_some() {
        config.api_key = args.api_key;
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(k) = args.retrieval_k {
        config.retrieval_k = k;
    }

    let lexicon = match &args.lexicon {
        Some(path) => DomainLexicon::load(path)?,
        None => DomainLexicon::builtin(),
    };
    let schema = CanonicalSchema::full(config.schema_version.clone());

    let engine = QueryEngine::new(&config, Arc::new(lexicon), schema)?;
    info!("FloatChat engine starting ({:?} path)", engine.choice());

    let now = args.now.unwrap_or_else(|| chrono::Local::now().date_naive());
    let answer = engine.answer(&args.query, now).await;

    if args.json {
        let payload = serde_json::json!({
            "query_id": &answer.query_id,
            "explanation": &answer.explanation,
            "descriptor": &answer.descriptor,
            "sql": &*answer.sql,
            "warnings": &answer.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("\n=== FloatChat Interpretation ===");
    println!("{}", answer.explanation);
    println!("\nSQL: {}", answer.sql.statement);
    if !answer.sql.params.is_empty() {
        let bound: Vec<String> = answer.sql.params.iter().map(|p| p.to_string()).collect();
        println!("Bound values: {}", bound.join(", "));
    }
    for group in &answer.sql.groups {
        let bound: Vec<String> = group.params.iter().map(|p| p.to_string()).collect();
        println!(
            "Group '{}': {} [{}]",
            group.label,
            group.predicate,
            bound.join(", ")
        );
    }
    if let Some(similarity) = &answer.descriptor.similarity {
        println!(
            "Similarity search around ({:.2}, {:.2})",
            similarity.lat, similarity.lon
        );
    }
    for warning in &answer.warnings {
        println!("⚠ {}", warning);
    }

    Ok(())
}
