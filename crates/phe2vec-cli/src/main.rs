//! phe2vec batch command line.
//!
//! # Commands
//!
//! - `embed`: build and persist denoised patient sentence embeddings
//! - `evaluate`: retrieve and score ground-truth cohorts
//! - `phenotypes`: write the ICD-9 phenotype catalogue
//! - `concept-eval`: score concept neighbourhoods against code categories
//!
//! Every option can also be set through a `PHE2VEC_*` environment variable.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{ConceptEvalArgs, EmbedArgs, EvaluateArgs, PhenotypesArgs};

/// Patient embeddings and phenotype cohort retrieval
#[derive(Parser, Debug)]
#[command(name = "phe2vec")]
#[command(version)]
#[command(about = "Patient embeddings and phenotype cohort retrieval from clinical events")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build denoised patient sentence embeddings from an events file
    Embed(EmbedArgs),
    /// Rank patients for each ground-truth cohort and report metrics
    Evaluate(EvaluateArgs),
    /// Expand every ICD-9 code of the vocabulary into a phenotype
    Phenotypes(PhenotypesArgs),
    /// Evaluate concept neighbourhoods against a code categorisation
    ConceptEval(ConceptEvalArgs),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Embed(args) => commands::embed(&args)?,
        Commands::Evaluate(args) => commands::evaluate(&args)?,
        Commands::Phenotypes(args) => commands::phenotypes(&args)?,
        Commands::ConceptEval(args) => commands::concept_eval(&args)?,
    }

    tracing::info!("Task completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_embed_defaults() {
        let cli = Cli::try_parse_from([
            "phe2vec",
            "embed",
            "--vectors",
            "v.txt",
            "--events",
            "e.csv",
        ])
        .unwrap();
        let Commands::Embed(args) = cli.command else {
            panic!("expected embed");
        };
        let config = args.pipeline_config();
        assert_eq!(config.window.length, 15);
        assert_eq!(config.window.step, 5);
        assert_eq!(config.window.merge_factor, Some(3));
        assert_eq!(config.backend.name(), "word2vec");
    }

    #[test]
    fn test_parse_embed_options() {
        let cli = Cli::try_parse_from([
            "phe2vec",
            "embed",
            "--vectors",
            "v.txt",
            "--events",
            "e.csv",
            "--backend",
            "glove",
            "--window-length",
            "30",
            "--no-merge",
        ])
        .unwrap();
        let Commands::Embed(args) = cli.command else {
            panic!("expected embed");
        };
        let config = args.pipeline_config();
        assert_eq!(config.window.length, 30);
        assert_eq!(config.window.merge_factor, None);
        assert_eq!(config.backend.name(), "glove");
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let result = Cli::try_parse_from([
            "phe2vec",
            "embed",
            "--vectors",
            "v.txt",
            "--events",
            "e.csv",
            "--backend",
            "bert",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_evaluate_expansion() {
        let cli = Cli::try_parse_from([
            "phe2vec",
            "evaluate",
            "--vectors",
            "v.txt",
            "--embedding",
            "p.csv",
            "--cohorts",
            "c.json",
            "--expansion",
            "none",
        ])
        .unwrap();
        let Commands::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert!(!args.expansion.config().enabled);
    }
}
