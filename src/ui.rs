//! Interface de terminal do tailor: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente
//! a execução de um job no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::progress::JobStatusView;
use crate::service::SubmitterStats;
use crate::state_machine::{JobStatus, JobSummary};

/// Indicador visual de progresso para a execução de um job no terminal.
///
/// Exibe um spinner animado com o percentual e a última mensagem do job,
/// e uma linha colorida no fim: verde para concluído, vermelho para falha.
pub struct JobProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl JobProgress {
    /// Inicia o spinner com a descrição do job.
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Submitted: {description}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Atualiza o spinner com o status mais recente.
    pub fn update(&self, view: &JobStatusView) {
        self.pb.set_message(progress_line(view));
    }

    /// Finaliza o spinner e exibe o resultado final do job.
    pub fn finish(&self, view: &JobStatusView) {
        self.pb.finish_and_clear();
        match view.status {
            JobStatus::Completed => {
                eprintln!("  {} Resume tailored", self.green.apply_to("✓"));
            }
            _ => {
                let detail = view.error_detail.as_deref().unwrap_or("unknown error");
                eprintln!("  {} Job failed: {detail}", self.red.apply_to("✗"));
            }
        }
    }
}

/// Linha `[ 45%] processing: summary ready`.
pub fn progress_line(view: &JobStatusView) -> String {
    format!(
        "[{:>3}%] {}: {}",
        view.progress_percent, view.status, view.message
    )
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Completed => Style::new().green(),
        JobStatus::Failed => Style::new().red(),
        _ => Style::new().yellow(),
    }
}

/// Imprime o status de um job com a cor do estado.
pub fn print_status(view: &JobStatusView) {
    println!(
        "{}  {}",
        view.request_id,
        status_style(view.status).apply_to(progress_line(view))
    );
    if let Some(detail) = &view.error_detail {
        println!("  {detail}");
    }
}

/// Imprime a listagem de jobs, um por linha.
pub fn print_jobs(jobs: &[JobSummary]) {
    if jobs.is_empty() {
        println!("No jobs.");
        return;
    }
    for job in jobs {
        let duration = job
            .duration_ms
            .map(|ms| format!("{:.1}s", ms as f64 / 1000.0))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<36}  {:<14}  {:>3}%  {:>7}  {}",
            job.request_id,
            job.mode.to_string(),
            job.progress_percent,
            duration,
            status_style(job.status).apply_to(job.status),
        );
    }
}

pub fn print_stats(stats: &SubmitterStats) {
    println!("Submitter: {}", stats.submitter_id);
    println!("  active:    {}/{}", stats.active, stats.cap);
    println!("  remaining: {}", stats.remaining);
    println!("  completed: {}", stats.completed);
    println!("  failed:    {}", stats.failed);
}
