// src/main.rs

mod cli;

use std::sync::Arc;

use clap::Parser;

use cli::{AnalyzeArgs, Cli, Commands, ConfigCommands};
use trapwire::forensics::{
    CandidateAttack, ConfigStore, ForensicConfig, ForensicEngine, RecordFilter, RequestRecord,
    SledStore, TimeWindowRequest,
};
use trapwire::logging::{init_logging, level_from_str};
use trapwire::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(level_from_str(&cli.log_level)) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = dispatch(cli).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let store = SledStore::open(&cli.db)?;

    match cli.command {
        Commands::Analyze(args) => {
            let config = match &cli.config_file {
                Some(path) => ForensicConfig::from_yaml_file(path)?,
                None => ForensicConfig::load(&store).await?,
            };
            analyze(store, config, args).await
        }
        Commands::Import(args) => import(store, &args.file).await,
        Commands::Config { command } => manage_config(store, command).await,
    }
}

fn window_request(args: &AnalyzeArgs) -> Option<TimeWindowRequest> {
    let request = TimeWindowRequest {
        from_date: args.from.clone(),
        to_date: args.to.clone(),
        minutes: args.minutes,
        hours: args.hours,
        days: args.days,
        ..Default::default()
    };
    if request == TimeWindowRequest::default() {
        None
    } else {
        Some(request)
    }
}

async fn analyze(store: SledStore, config: ForensicConfig, args: AnalyzeArgs) -> Result<()> {
    let filter = RecordFilter {
        source_address: args.address.clone(),
        url: args.url.clone(),
        ..Default::default()
    };
    let window = window_request(&args);

    let engine = ForensicEngine::new(Arc::new(store), config);
    let mut result = engine
        .run_pipeline(&filter, args.min_logs, window.as_ref())
        .await?;

    // Presentation order and pagination live above the pipeline.
    result
        .items
        .sort_by(|a, b| b.danger_score.total_cmp(&a.danger_score));
    let start = args.page.saturating_sub(1) * args.page_size;
    let page: Vec<&CandidateAttack> =
        result.items.iter().skip(start).take(args.page_size).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        println!(
            "{} candidate attacks (showing {} from page {})",
            result.total_count,
            page.len(),
            args.page
        );
        for attack in page {
            println!(
                "{:<18} {:>6} reqs  {:>10.5} rps  {:>9}  score {:>6.2}  {}  [{}]",
                attack.source_address,
                attack.total_logs,
                attack.requests_per_second,
                attack.human_duration,
                attack.danger_score,
                attack.danger_level,
                attack.intensity_label,
            );
        }
    }
    Ok(())
}

async fn import(store: SledStore, file: &std::path::Path) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    let records: Vec<RequestRecord> = serde_json::from_str(&content)?;
    let count = records.len();
    for record in &records {
        store.store_record(record)?;
    }
    store.flush()?;
    log::info!("imported {} records from {}", count, file.display());
    println!("Imported {} records", count);
    Ok(())
}

async fn manage_config(store: SledStore, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            store.set_value(&key, &value).await?;
            println!("{}={}", key, value);
        }
        ConfigCommands::Get { key } => match store.get_value(&key).await? {
            Some(value) => println!("{}", value),
            None => println!("(not set)"),
        },
        ConfigCommands::List => {
            for (key, value) in store.list_values().await? {
                println!("{}={}", key, value);
            }
        }
        ConfigCommands::Delete { key } => {
            if store.delete_value(&key).await? {
                println!("deleted {}", key);
            } else {
                println!("(not set)");
            }
        }
    }
    Ok(())
}
