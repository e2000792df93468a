use airport_resolver::adapters::seed;
use airport_resolver::config::cli::{Cli, Command};
use airport_resolver::core::resolver::MAX_BATCH_SIZE;
use airport_resolver::utils::monitor::ProcessMonitor;
use airport_resolver::utils::{logger, validation::Validate};
use airport_resolver::{
    LookupOptions, Resolver, ResolverConfig, ResolverError, Result, SqliteAirportStore,
};
use clap::Parser;
use std::fs::File;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match ResolverConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path.display(), e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => ResolverConfig::default(),
    };

    // 初始化日誌
    if config.logging.json {
        logger::init_json_logger(&config.logging.level);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }

    let monitor = ProcessMonitor::new(cli.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 Process monitoring enabled");
    }

    let outcome = run(cli.command, &config, &monitor).await;
    monitor.log_stats("Finished");

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("❌ {} (category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}

/// Returns the process exit code on completion.
async fn run(command: Command, config: &ResolverConfig, monitor: &ProcessMonitor) -> Result<i32> {
    match command {
        Command::Resolve {
            queries,
            airport_only,
            exact,
            max_results,
            json,
        } => {
            let resolver = Resolver::from_config(config).await?;
            let defaults = resolver.default_options();
            let options = LookupOptions {
                prefer_metro: defaults.prefer_metro && !airport_only,
                fuzzy: defaults.fuzzy && !exact,
                max_results: max_results.unwrap_or(defaults.max_results),
            };

            let mut exit_code = 0;
            for query in &queries {
                match resolver.lookup(query, options).await {
                    Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
                    Ok(result) => {
                        println!(
                            "{}\t{}\t{} ({:.2}, {})",
                            query, result.iata_code, result.name, result.confidence, result.source
                        );
                        for alternative in &result.alternatives {
                            println!("\t  or {}\t{} ({:.2})", alternative.iata_code, alternative.name, alternative.confidence);
                        }
                    }
                    Err(e @ ResolverError::InvalidInput { .. }) => return Err(e),
                    Err(e) => {
                        eprintln!("❌ {}", e.user_friendly_message());
                        exit_code = e.exit_code();
                    }
                }
            }

            tracing::debug!("Stats: {:?}", resolver.get_stats());
            Ok(exit_code)
        }

        Command::Batch { file, airport_only } => {
            let content = std::fs::read_to_string(&file)?;
            let queries: Vec<serde_json::Value> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| serde_json::Value::String(line.to_string()))
                .collect();

            let resolver = Resolver::from_config(config).await?;
            let options = LookupOptions {
                prefer_metro: resolver.default_options().prefer_metro && !airport_only,
                ..resolver.default_options()
            };

            let mut items = Vec::with_capacity(queries.len());
            for (i, chunk) in queries.chunks(MAX_BATCH_SIZE).enumerate() {
                items.extend(resolver.batch_lookup(chunk, options).await?);
                monitor.log_stats(&format!("Batch chunk {}", i + 1));
            }

            println!("{}", serde_json::to_string_pretty(&items)?);
            let stats = resolver.get_stats();
            tracing::info!(
                "📊 hits {:?}, misses {}, errors {}, hit rate {}",
                stats.hits,
                stats.misses,
                stats.errors,
                stats.hit_rate
            );
            Ok(if items.iter().all(|item| item.success) { 0 } else { 2 })
        }

        Command::Import {
            airports,
            metros,
            aliases,
        } => {
            let store = SqliteAirportStore::connect(&config.database).await?;
            if let Some(path) = airports {
                let count = seed::import_airports(&store, File::open(&path)?).await?;
                println!("✅ {} airports from {}", count, path.display());
            }
            if let Some(path) = metros {
                let count = seed::import_metros(&store, File::open(&path)?).await?;
                println!("✅ {} metro areas from {}", count, path.display());
            }
            if let Some(path) = aliases {
                let count = seed::import_aliases(&store, File::open(&path)?).await?;
                println!("✅ {} aliases from {}", count, path.display());
            }
            monitor.log_stats("Import");
            Ok(0)
        }

        Command::Purge { older_than_days } => {
            let resolver = Resolver::from_config(config).await?;
            let removed = resolver.clear_db_cache(older_than_days).await?;
            println!("✅ Removed {} persisted lookups", removed);
            Ok(0)
        }
    }
}
