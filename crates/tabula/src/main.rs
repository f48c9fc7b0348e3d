// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tabula - natural-language analytics to validated SQL.
//!
//! Binary entry point. The heavy lifting lives in the library crates;
//! this wires configuration, logging, the SQLite executor, the retriever,
//! and the coordinator together for command-line use. The binary bundles
//! no network model backend: `generate` drives the full validation
//! pipeline over a caller-proposed candidate statement.

use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tabula_config::TabulaConfig;
use tabula_core::{
    LogSink, Message, ModelBackend, ModelResponse, QueryExecutor, TabulaError,
};
use tabula_limiter::RateLimiter;
use tabula_schema::{SchemaRetriever, Stage};
use tabula_sqlgen::{ContextSnapshot, SqlCoordinator, TimeWindow};
use tabula_sqlite::SqliteExecutor;
use tracing_subscriber::EnvFilter;

/// Tabula - natural-language analytics to validated SQL.
#[derive(Parser, Debug)]
#[command(name = "tabula", version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database to analyze.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect the schema: list tables, or describe one table.
    Schema {
        /// Table to describe; lists all tables when omitted.
        table: Option<String>,
    },
    /// Rank tables by relevance to a natural-language query.
    Relevance {
        /// The natural-language analytic request.
        query: String,
    },
    /// Validate a candidate SQL statement through the full pipeline.
    Generate {
        /// The natural-language analytic request.
        query: String,
        /// Candidate SQL to validate (stands in for a model backend).
        #[arg(long)]
        candidate_sql: String,
        /// Start of the analysis window (YYYY-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,
        /// End of the analysis window (YYYY-MM-DD).
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

/// Model backend that always proposes one fixed statement. Lets the
/// binary exercise the coordinator without bundling a network provider.
struct CandidateModel {
    sql: String,
}

#[async_trait]
impl ModelBackend for CandidateModel {
    async fn generate(
        &self,
        _messages: &[Message],
        _tools: Option<&[serde_json::Value]>,
    ) -> Result<ModelResponse, TabulaError> {
        Ok(ModelResponse {
            content: self.sql.clone(),
            tool_calls: Vec::new(),
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match tabula_config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tabula: failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(errors) = tabula_config::validate_config(&config) {
        for error in &errors {
            eprintln!("tabula: config error: {error}");
        }
        return ExitCode::FAILURE;
    }
    init_tracing(&config);
    tabula_core::recording::register_metrics();

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("tabula: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &TabulaConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.agent.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli, config: TabulaConfig) -> Result<ExitCode, TabulaError> {
    let Some(command) = cli.command else {
        println!("tabula: use --help for available commands");
        return Ok(ExitCode::SUCCESS);
    };
    let Some(db) = cli.db else {
        eprintln!("tabula: --db <path> is required");
        return Ok(ExitCode::FAILURE);
    };

    let executor: Arc<dyn QueryExecutor> = Arc::new(SqliteExecutor::open(&db).await?);
    let retriever = Arc::new(SchemaRetriever::new(
        Arc::clone(&executor),
        config.retrieval.clone(),
    ));
    retriever.initialize().await?;

    match command {
        Commands::Schema { table: None } => {
            for name in retriever.table_names().await {
                println!("{name}");
            }
        }
        Commands::Schema { table: Some(table) } => {
            let entry = retriever.load_table(&table).await?;
            println!("{}", entry.schema.table_name);
            for column in &entry.schema.columns {
                match &column.comment {
                    Some(comment) => {
                        println!("  {} {}  -- {comment}", column.name, column.column_type)
                    }
                    None => println!("  {} {}", column.name, column.column_type),
                }
            }
        }
        Commands::Relevance { query } => {
            let contexts = retriever
                .retrieve(&query, config.retrieval.top_k, Stage::SqlGeneration)
                .await?;
            if contexts.is_empty() {
                println!("no relevant tables found");
            }
            for context in contexts {
                println!("{:.3}  {}", context.score, context.table_name);
            }
        }
        Commands::Generate {
            query,
            candidate_sql,
            from,
            to,
        } => {
            let mut tables = Vec::new();
            for name in retriever.table_names().await {
                tables.push(retriever.load_table(&name).await?.schema.clone());
            }
            let snapshot = ContextSnapshot {
                time_window: from.zip(to).map(|(start, end)| TimeWindow { start, end }),
                tables,
            };

            let model = Arc::new(CandidateModel { sql: candidate_sql });
            let limiter = Arc::new(RateLimiter::new(&config.limiter));
            let coordinator = SqlCoordinator::new(
                model,
                Arc::clone(&retriever),
                executor,
                limiter,
                Arc::new(LogSink),
                config,
            );
            let result = coordinator.generate(&query, &snapshot).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&result)
                    .map_err(|e| TabulaError::Internal(e.to_string()))?
            );
            if !result.success {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = tabula_config::load_config_from_str("").expect("defaults should parse");
        assert!(tabula_config::validate_config(&config).is_ok());
    }
}
