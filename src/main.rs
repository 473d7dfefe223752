//! cloze-similarity command line
//!
//! Batch entry point: every subcommand reads its tables, computes one result
//! and writes it under the output directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use cloze_similarity::analysis::{self, CountBy, Selection};
use cloze_similarity::config::{parse_delimiter, Config};
use cloze_similarity::error::Result;
use cloze_similarity::logging::{init_tracing, LogSettings};
use cloze_similarity::{AnalysisError, CorrelationMethod, EditMeasure, ExclusionPolicy, LabelBy};

#[derive(Parser)]
#[command(name = "cloze-similarity")]
#[command(about = "Item similarity for fill-in-the-blank answer logs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory with the raw tables
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory for relative output paths
    #[arg(long, env = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Field delimiter of input tables
    #[arg(long, env = "CSV_DELIMITER")]
    delimiter: Option<String>,

    /// Log filter, e.g. "debug" or "cloze_similarity=trace"
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the raw tables and write a processed answer table
    Prepare {
        /// Practice set ids, comma separated
        #[arg(long, value_delimiter = ',', conflicts_with = "knowledge_component")]
        practice_sets: Vec<i64>,

        /// Knowledge component id
        #[arg(long)]
        knowledge_component: Option<i64>,

        #[arg(short, long, default_value = "answers.csv")]
        output: PathBuf,
    },

    /// Count answers per practice set or knowledge component
    Counts {
        #[arg(long, value_enum, default_value = "practice-set")]
        by: CountTarget,

        #[arg(short, long, default_value = "counts.csv")]
        output: PathBuf,
    },

    /// Correlation of correctness between items
    Performance {
        /// Processed answer table or pivoted correctness table
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "pearson")]
        method: CorrelationMethod,

        /// Keep items with undefined correlations as NaN cells
        #[arg(long)]
        keep_nans: bool,

        /// Only items labelling this similarity matrix, e.g. an embedding
        /// matrix written with `--label item-id`
        #[arg(long)]
        items_from: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Edit-distance similarity of fill-in words
    Lexical {
        #[arg(short, long)]
        input: PathBuf,

        /// Cap distances at this value instead of normalizing by length
        #[arg(long, num_args = 0..=1, default_missing_value = "5")]
        threshold: Option<usize>,

        #[arg(long, value_enum, default_value = "solution")]
        label: LabelTarget,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Cosine similarity of word vectors
    Embedding {
        #[arg(short, long)]
        input: PathBuf,

        /// Word vectors in word2vec text format
        #[arg(long, env = "EMBEDDING_MODEL_PATH")]
        model: Option<PathBuf>,

        /// Word to leave out, may be repeated
        #[arg(long)]
        exclude: Vec<String>,

        #[arg(long, value_enum, default_value = "solution")]
        label: LabelTarget,

        /// Log every dropped item
        #[arg(short, long)]
        verbose: bool,

        #[arg(short, long, default_value = "word2vec.csv")]
        output: PathBuf,
    },

    /// Correlate persisted similarity matrices
    Compare {
        #[arg(required = true, num_args = 2..)]
        matrices: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CountTarget {
    PracticeSet,
    KnowledgeComponent,
}

impl From<CountTarget> for CountBy {
    fn from(target: CountTarget) -> Self {
        match target {
            CountTarget::PracticeSet => CountBy::PracticeSet,
            CountTarget::KnowledgeComponent => CountBy::KnowledgeComponent,
        }
    }
}

/// Row labels of lexical and embedding matrices
#[derive(Clone, Copy, ValueEnum)]
enum LabelTarget {
    /// Item ids, comparable with performance matrices
    ItemId,
    /// Full solutions, e.g. "léčivá bylina"
    Solution,
}

impl From<LabelTarget> for LabelBy {
    fn from(target: LabelTarget) -> Self {
        match target {
            LabelTarget::ItemId => LabelBy::ItemId,
            LabelTarget::Solution => LabelBy::Solution,
        }
    }
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let mut log_settings = LogSettings::from_env(&log_level);
    log_settings.show_dropped = matches!(cli.command, Commands::Embedding { verbose: true, .. });
    let _log_guard = init_tracing(&log_settings);

    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir.clone() {
        config.output_dir = dir;
    }
    if let Some(value) = cli.delimiter.as_deref() {
        match parse_delimiter(value) {
            Some(delimiter) => config.delimiter = delimiter,
            None => {
                error!(value, "delimiter must be a single ASCII character");
                return ExitCode::FAILURE;
            }
        }
    }

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, configuration = e.is_configuration(), "command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Prepare {
            practice_sets,
            knowledge_component,
            output,
        } => {
            let selection = match knowledge_component {
                Some(kc) => Selection::KnowledgeComponent(kc),
                None if !practice_sets.is_empty() => Selection::PracticeSets(practice_sets),
                None => Selection::All,
            };
            analysis::prepare(config, &selection, config.output_path(output))?;
        }

        Commands::Counts { by, output } => {
            let counts = analysis::counts(config, by.into(), config.output_path(output))?;
            info!(rows = counts.len(), "counts written");
        }

        Commands::Performance {
            input,
            method,
            keep_nans,
            items_from,
            output,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{method}.csv")));
            let items = items_from.map(analysis::item_ids_from_matrix).transpose()?;
            analysis::performance_for_items(
                &input,
                config.delimiter,
                method,
                !keep_nans,
                items.as_deref(),
                config.output_path(output),
            )?;
        }

        Commands::Lexical {
            input,
            threshold,
            label,
            output,
        } => {
            let (measure, default_name) = match threshold {
                Some(m) => (EditMeasure::Threshold(m), "levenshtein_threshold.csv"),
                None => (EditMeasure::Normalized, "levenshtein.csv"),
            };
            let output = output.unwrap_or_else(|| PathBuf::from(default_name));
            analysis::lexical(
                &input,
                config.delimiter,
                measure,
                label.into(),
                config.output_path(output),
            )?;
        }

        Commands::Embedding {
            input,
            model,
            exclude,
            label,
            output,
            ..
        } => {
            let model = model
                .or_else(|| config.embedding_model_path.clone())
                .ok_or_else(|| {
                    AnalysisError::invalid_value(
                        "model",
                        "",
                        "pass --model or set EMBEDDING_MODEL_PATH",
                    )
                })?;
            let exclusions = ExclusionPolicy::new(exclude);
            let outcome = analysis::embedding(
                &input,
                config.delimiter,
                &model,
                &exclusions,
                label.into(),
                config.output_path(output),
            )?;
            if !outcome.dropped.is_empty() {
                info!(
                    dropped = outcome.dropped.len(),
                    "items without a vector left out, --verbose lists them"
                );
            }
        }

        Commands::Compare { matrices } => {
            let report = analysis::compare_files(&matrices)?;
            for (a, b, r) in report.pairs() {
                println!("{a}\t{b}\t{r:.4}");
            }
        }
    }
    Ok(())
}
