//! Subcommand arguments and handlers.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::{Args, ValueEnum};

use phe2vec_core::{
    evaluate_concepts, io, patient_embedding, CohortRetriever, ConceptEvalConfig, ConceptWeighter,
    DenoiseConfig, EmbeddingBackend, EvaluationConfig, ExpansionConfig, PhenotypeCatalog,
    PhenotypeMetrics, PhenotypeQueryExpander, PipelineConfig, RetrievalEvaluator, WindowConfig,
};
use phe2vec_types::well_known;

type CommandResult = Result<(), Box<dyn Error>>;

/// Arguments of `embed`.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Concept vectors in word2vec text format
    #[arg(long, env = "PHE2VEC_VECTORS")]
    vectors: PathBuf,

    /// Events CSV (patient_id,concept_id,age_in_days)
    #[arg(long, env = "PHE2VEC_EVENTS")]
    events: PathBuf,

    /// Directory receiving the patient embedding CSV
    #[arg(long, env = "PHE2VEC_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Algorithm that produced the concept vectors (word2vec, fasttext, glove)
    #[arg(long, env = "PHE2VEC_BACKEND", default_value = "word2vec")]
    backend: EmbeddingBackend,

    /// Window length in days
    #[arg(long, env = "PHE2VEC_WINDOW_LENGTH", default_value_t = well_known::DEFAULT_WINDOW_LENGTH)]
    window_length: u32,

    /// Window step in days
    #[arg(long, env = "PHE2VEC_WINDOW_STEP", default_value_t = well_known::DEFAULT_WINDOW_STEP)]
    window_step: u32,

    /// Isolated events within this many window lengths join the previous window
    #[arg(long, env = "PHE2VEC_MERGE_FACTOR", default_value_t = well_known::DEFAULT_MERGE_FACTOR)]
    merge_factor: u32,

    /// Never merge isolated events into the previous window
    #[arg(long, env = "PHE2VEC_NO_MERGE")]
    no_merge: bool,

    /// Power iterations of the principal-component estimate
    #[arg(long, env = "PHE2VEC_DENOISE_ITERATIONS", default_value_t = 10)]
    denoise_iterations: usize,

    /// Seed of the principal-component estimate
    #[arg(long, env = "PHE2VEC_SEED", default_value_t = 0)]
    seed: u64,
}

impl EmbedArgs {
    /// Pipeline configuration described by the arguments.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            window: WindowConfig {
                length: self.window_length,
                step: self.window_step,
                merge_factor: (!self.no_merge).then_some(self.merge_factor),
            },
            weighting: ConceptWeighter::default(),
            denoise: DenoiseConfig {
                iterations: self.denoise_iterations,
                seed: self.seed,
            },
            backend: self.backend,
        }
    }
}

/// Query expansion presets.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpansionMode {
    /// Top 500 neighbours with similarity above 0.7
    #[default]
    Retrieval,
    /// Top 100 neighbours
    Discovery,
    /// Seed concepts only
    None,
}

impl ExpansionMode {
    /// Expansion configuration of the preset.
    pub fn config(self) -> ExpansionConfig {
        match self {
            Self::Retrieval => ExpansionConfig::cohort_retrieval(),
            Self::Discovery => ExpansionConfig::phenotype_discovery(),
            Self::None => ExpansionConfig::seeds_only(),
        }
    }
}

/// Arguments of `evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Concept vectors in word2vec text format
    #[arg(long, env = "PHE2VEC_VECTORS")]
    vectors: PathBuf,

    /// Patient embedding CSV written by `embed`
    #[arg(long, env = "PHE2VEC_EMBEDDING")]
    embedding: PathBuf,

    /// Ground-truth cohorts JSON
    #[arg(long, env = "PHE2VEC_COHORTS")]
    cohorts: PathBuf,

    /// Query expansion preset
    #[arg(long, env = "PHE2VEC_EXPANSION", value_enum, default_value_t = ExpansionMode::Retrieval)]
    pub expansion: ExpansionMode,

    /// Write the report as JSON to this file
    #[arg(long, env = "PHE2VEC_REPORT")]
    report: Option<PathBuf>,
}

/// Arguments of `phenotypes`.
#[derive(Args, Debug)]
pub struct PhenotypesArgs {
    /// Concept vectors in word2vec text format
    #[arg(long, env = "PHE2VEC_VECTORS")]
    vectors: PathBuf,

    /// Directory receiving icd9-phenotypes.csv and icd9-vocab.csv
    #[arg(long, env = "PHE2VEC_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,
}

/// Arguments of `concept-eval`.
#[derive(Args, Debug)]
pub struct ConceptEvalArgs {
    /// Concept vectors in word2vec text format
    #[arg(long, env = "PHE2VEC_VECTORS")]
    vectors: PathBuf,

    /// Code categories CSV (code,category)
    #[arg(long, env = "PHE2VEC_CATEGORIES")]
    categories: PathBuf,

    /// Neighbour categories compared per code
    #[arg(long, env = "PHE2VEC_KNN", default_value_t = 50)]
    knn: usize,
}

/// Runs `embed`.
pub fn embed(args: &EmbedArgs) -> CommandResult {
    let config = args.pipeline_config();
    let vectors = config.backend.load(&args.vectors)?;
    let timelines = io::read_events(&args.events)?;

    let outcome = patient_embedding(&timelines, &vectors, &config)?;
    if !outcome.empty_timelines.is_empty() {
        tracing::warn!("Skipped {} patients without events", outcome.empty_timelines.len());
    }
    if !outcome.dropped_patients.is_empty() {
        tracing::warn!(
            "Skipped {} patients without sentences: {:?}",
            outcome.dropped_patients.len(),
            outcome.dropped_patients
        );
    }

    let path = io::save_patient_embedding(
        &args.output_dir,
        config.backend,
        &config.window,
        &outcome.embeddings,
    )?;
    tracing::info!("Patient embedding written to {}", path.display());
    Ok(())
}

/// Runs `evaluate`.
pub fn evaluate(args: &EvaluateArgs) -> CommandResult {
    let vectors = EmbeddingBackend::default().load(&args.vectors)?;
    let embeddings = io::load_patient_embedding(&args.embedding)?;
    let cohorts = io::read_cohorts(&args.cohorts)?;

    let retriever = CohortRetriever::new(&embeddings);
    let expander = PhenotypeQueryExpander::new(args.expansion.config());
    let evaluator = RetrievalEvaluator::new(EvaluationConfig::default());
    let report = evaluator.evaluate_phenotypes(&vectors, &expander, &retriever, &cohorts);

    for (phenotype, metrics) in &report.per_phenotype {
        log_metrics(phenotype, metrics);
    }
    match &report.summary {
        Some(summary) => {
            let label = format!("Mean over {} phenotypes", report.per_phenotype.len());
            log_metrics(&label, summary);
        }
        None => tracing::warn!("No phenotype could be evaluated"),
    }

    if let Some(path) = &args.report {
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &report)?;
        tracing::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn log_metrics(label: &str, metrics: &PhenotypeMetrics) {
    tracing::info!(
        "{}: P={:.3} R={:.3} F1={:.3} P@10={:.3} R-P={:.3} MAP={:.3} AUC-ROC={:.3} AUC-PR={:.3}",
        label,
        metrics.precision,
        metrics.recall,
        metrics.f1,
        metrics.precision_at_n,
        metrics.r_precision,
        metrics.map,
        metrics.auc_roc,
        metrics.auc_pr
    );
}

/// Runs `phenotypes`.
pub fn phenotypes(args: &PhenotypesArgs) -> CommandResult {
    let vectors = EmbeddingBackend::default().load(&args.vectors)?;
    let catalog = PhenotypeCatalog::icd9(&vectors);
    io::write_phenotype_catalog(&args.output_dir, &catalog)?;
    Ok(())
}

/// Runs `concept-eval`.
pub fn concept_eval(args: &ConceptEvalArgs) -> CommandResult {
    let vectors = EmbeddingBackend::default().load(&args.vectors)?;
    let categories = io::read_categories(&args.categories)?;
    let config = ConceptEvalConfig {
        knn: args.knn,
        ..Default::default()
    };
    let report = evaluate_concepts(&vectors, &categories, &config);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
