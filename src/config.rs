use std::path::{Path, PathBuf};

use crate::types::DEFAULT_DELIMITER;

pub const LOGS_FILE: &str = "nova_doplnovacka_log.csv";
pub const QUESTIONS_FILE: &str = "nova_doplnovacka_questions.csv";
pub const MEMBERSHIPS_FILE: &str = "system_ps_problem.csv";
pub const PRACTICE_SETS_FILE: &str = "system_ps.csv";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub delimiter: u8,
    pub embedding_model_path: Option<PathBuf>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("processed"));

        let delimiter = std::env::var("CSV_DELIMITER")
            .ok()
            .and_then(|value| parse_delimiter(&value))
            .unwrap_or(DEFAULT_DELIMITER);

        let embedding_model_path = std::env::var("EMBEDDING_MODEL_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            data_dir,
            output_dir,
            delimiter,
            embedding_model_path,
            log_level,
        }
    }

    pub fn logs_path(&self) -> PathBuf {
        self.data_dir.join(LOGS_FILE)
    }

    pub fn questions_path(&self) -> PathBuf {
        self.data_dir.join(QUESTIONS_FILE)
    }

    pub fn memberships_path(&self) -> PathBuf {
        self.data_dir.join(MEMBERSHIPS_FILE)
    }

    pub fn practice_sets_path(&self) -> PathBuf {
        self.data_dir.join(PRACTICE_SETS_FILE)
    }

    /// Relative output names land in `output_dir`, absolute ones are kept
    pub fn output_path(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.output_dir.join(name)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data/processed"),
            delimiter: DEFAULT_DELIMITER,
            embedding_model_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// Single ASCII character, or the names `tab` / `\t`
pub fn parse_delimiter(value: &str) -> Option<u8> {
    match value {
        "tab" | "\\t" | "\t" => Some(b'\t'),
        v if v.len() == 1 && v.is_ascii() => v.bytes().next(),
        _ => None,
    }
}
