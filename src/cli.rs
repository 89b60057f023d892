//! Interface de linha de comando do tailor baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, status, result,
//! jobs, stats, reap) e flags globais (--store, --submitter,
//! --max-concurrent-jobs, --verbose, --json-logs).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::state_machine::{JobStatus, Mode};

/// tailor: adapta um currículo estruturado a uma descrição de vaga.
#[derive(Debug, Parser)]
#[command(name = "tailor", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Diretório do banco de jobs (sobrepõe `store_path` do tailor.toml).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Identificador do solicitante dono dos jobs.
    #[arg(long, global = true, default_value = "local")]
    pub submitter: String,

    /// Limite de jobs ativos por solicitante.
    #[arg(long, global = true)]
    pub max_concurrent_jobs: Option<usize>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Emite logs em JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,
}

/// Modo aceito pela CLI, mapeado para [`Mode`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Reescreve resumo, experiência e habilidades.
    GenerateFresh,
    /// Mantém o conteúdo e edita levemente a experiência.
    LightEdit,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::GenerateFresh => Mode::GenerateFresh,
            ModeArg::LightEdit => Mode::LightEdit,
        }
    }
}

/// Filtro de status para a listagem de jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<StatusArg> for JobStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => JobStatus::Pending,
            StatusArg::Processing => JobStatus::Processing,
            StatusArg::Completed => JobStatus::Completed,
            StatusArg::Failed => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submete um job e acompanha o progresso até o fim.
    Run {
        /// Currículo de origem em JSON.
        source: PathBuf,

        /// Arquivo de texto com a descrição da vaga.
        target: PathBuf,

        #[arg(long, value_enum, default_value_t = ModeArg::GenerateFresh)]
        mode: ModeArg,

        /// Identificador do pedido; gerado se omitido.
        #[arg(long)]
        request_id: Option<String>,

        /// Título da vaga, usado como contexto do pré-processamento.
        #[arg(long)]
        job_title: Option<String>,

        #[arg(long)]
        company: Option<String>,

        /// Grava o currículo resultante neste arquivo em vez da saída padrão.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Mostra status e progresso de um job.
    Status {
        request_id: String,
    },

    /// Imprime o currículo resultante de um job concluído.
    Result {
        request_id: String,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Lista os jobs do solicitante, mais recentes primeiro.
    Jobs {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Mostra contagens e vagas restantes do solicitante.
    Stats,

    /// Marca como falhos os jobs presos além do tempo máximo.
    Reap,
}
