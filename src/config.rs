//! Configuração do tailor carregada a partir de `tailor.toml`.
//!
//! A struct [`TailorConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `ANTHROPIC_API_KEY` e `MAX_CONCURRENT_JOBS` têm
//! precedência sobre o arquivo.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TailorError};
use crate::pipeline::PipelineTimeouts;

pub const CONFIG_FILE: &str = "tailor.toml";

/// Configuração de nível superior carregada de `tailor.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TailorConfig {
    /// Chave da API Anthropic.
    #[serde(default)]
    pub api_key: String,

    /// Identificador do modelo usado em todas as chamadas.
    #[serde(default = "default_model")]
    pub model: String,

    /// Limite de tokens por resposta.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Máximo de jobs não terminais por solicitante.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Tempo máximo do pré-processamento da descrição da vaga.
    #[serde(default = "default_preprocess_timeout_secs")]
    pub preprocess_timeout_secs: u64,

    #[serde(default = "default_summary_timeout_secs")]
    pub summary_timeout_secs: u64,

    #[serde(default = "default_experience_timeout_secs")]
    pub experience_timeout_secs: u64,

    #[serde(default = "default_skills_timeout_secs")]
    pub skills_timeout_secs: u64,

    /// Jobs ativos mais antigos que isso são marcados como falhos.
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: u64,

    /// Diretório do banco sled com os jobs.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

// Valor padrão do limite de concorrência: 2 jobs por solicitante.
fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_preprocess_timeout_secs() -> u64 {
    90
}

fn default_summary_timeout_secs() -> u64 {
    60
}

// O branch de experiência faz chamadas extras de balanceamento.
fn default_experience_timeout_secs() -> u64 {
    90
}

fn default_skills_timeout_secs() -> u64 {
    60
}

fn default_stale_after_minutes() -> u64 {
    10
}

fn default_store_path() -> PathBuf {
    PathBuf::from("tailor-jobs.db")
}

impl Default for TailorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            preprocess_timeout_secs: default_preprocess_timeout_secs(),
            summary_timeout_secs: default_summary_timeout_secs(),
            experience_timeout_secs: default_experience_timeout_secs(),
            skills_timeout_secs: default_skills_timeout_secs(),
            stale_after_minutes: default_stale_after_minutes(),
            store_path: default_store_path(),
        }
    }
}

impl TailorConfig {
    /// Carrega a configuração de `tailor.toml` no diretório atual e aplica
    /// as variáveis de ambiente.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))?.with_env(|name| std::env::var(name).ok())
    }

    /// Lê o arquivo indicado. Usa valores padrão se ele não existir.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str::<TailorConfig>(&contents)?;
        config.validate()
    }

    /// Aplica as variáveis de ambiente obtidas por `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(key) = lookup("ANTHROPIC_API_KEY")
            && !key.is_empty()
        {
            self.api_key = key;
        }

        if let Some(raw) = lookup("MAX_CONCURRENT_JOBS")
            && !raw.trim().is_empty()
        {
            self.max_concurrent_jobs = raw.trim().parse().map_err(|_| {
                TailorError::Config(format!("MAX_CONCURRENT_JOBS must be a number, got {raw:?}"))
            })?;
        }

        self.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.max_concurrent_jobs == 0 {
            return Err(TailorError::Config(
                "max_concurrent_jobs must be at least 1".into(),
            ));
        }
        Ok(self)
    }

    pub fn timeouts(&self) -> PipelineTimeouts {
        PipelineTimeouts {
            preprocess: Duration::from_secs(self.preprocess_timeout_secs),
            summary: Duration::from_secs(self.summary_timeout_secs),
            experience: Duration::from_secs(self.experience_timeout_secs),
            skills: Duration::from_secs(self.skills_timeout_secs),
        }
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.stale_after_minutes as i64)
    }
}
