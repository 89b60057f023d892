use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use uuid::Uuid;

use tailor::admission::Submission;
use tailor::cli::{Cli, Command};
use tailor::config::TailorConfig;
use tailor::document::ResumeDocument;
use tailor::service::JobService;
use tailor::state_machine::JobStatus;
use tailor::ui::{self, JobProgress};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tailor::logging::init(cli.verbose, cli.json_logs);

    let mut config = TailorConfig::load().context("loading tailor.toml")?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    if let Some(cap) = cli.max_concurrent_jobs {
        if cap == 0 {
            bail!("--max-concurrent-jobs must be at least 1");
        }
        config.max_concurrent_jobs = cap;
    }
    let submitter = cli.submitter;

    match cli.command {
        Command::Run {
            source,
            target,
            mode,
            request_id,
            job_title,
            company,
            output,
        } => {
            if config.api_key.is_empty() {
                bail!("no API key: set ANTHROPIC_API_KEY or api_key in tailor.toml");
            }
            let source_document: ResumeDocument = serde_json::from_str(
                &std::fs::read_to_string(&source)
                    .with_context(|| format!("reading {}", source.display()))?,
            )
            .with_context(|| format!("parsing {}", source.display()))?;
            let target_spec_text = std::fs::read_to_string(&target)
                .with_context(|| format!("reading {}", target.display()))?;

            let service = JobService::start(&config).await?;
            let receipt = service
                .submit(Submission {
                    submitter_id: submitter.clone(),
                    request_id: request_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                    mode: mode.into(),
                    source_document,
                    target_spec_text,
                    job_title,
                    company_name: company,
                })
                .await?;

            let progress = JobProgress::start(&receipt.request_id);
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            let view = loop {
                ticker.tick().await;
                let view = service.status(&receipt.request_id, &submitter).await?;
                progress.update(&view);
                if view.status.is_terminal() {
                    break view;
                }
            };
            progress.finish(&view);
            service.wait_idle().await;

            if view.status != JobStatus::Completed {
                bail!("job {} failed", receipt.request_id);
            }
            let document = service.result(&receipt.request_id, &submitter).await?;
            write_document(&document, output.as_deref())?;
        }
        Command::Status { request_id } => {
            let service = JobService::start(&config).await?;
            ui::print_status(&service.status(&request_id, &submitter).await?);
        }
        Command::Result { request_id, output } => {
            let service = JobService::start(&config).await?;
            let document = service.result(&request_id, &submitter).await?;
            write_document(&document, output.as_deref())?;
        }
        Command::Jobs { status, limit } => {
            let service = JobService::start(&config).await?;
            let jobs = service
                .jobs(&submitter, status.map(JobStatus::from), limit)
                .await?;
            ui::print_jobs(&jobs);
        }
        Command::Stats => {
            let service = JobService::start(&config).await?;
            ui::print_stats(&service.stats(&submitter).await?);
        }
        Command::Reap => {
            let service = JobService::from_config(&config)?;
            let reaped = service.reap_stale().await?;
            println!("Reaped {reaped} stale job(s).");
        }
    }

    Ok(())
}

fn write_document(document: &ResumeDocument, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
