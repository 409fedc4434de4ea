mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    media::is_valid_email, ControllerEvent, DubbingApi, HttpDubbingApi, JobController, JobDriver,
    JobOutcome, JobPhase, JobState, MediaFile, NoPlayback, SymphoniaProbe,
};
use shared::{domain::{JobId, LanguageSide}, languages::languages_for};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dubctl", about = "Submit clips for dubbing and collect the translated media")]
struct Cli {
    /// Base URL of the dubbing service.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a clip, wait for the translation and save it.
    Translate {
        file: PathBuf,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        target: Option<String>,
        /// Address notified when the job finishes.
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Skip the duration probe and keep polling through status errors.
        #[arg(long)]
        lenient: bool,
    },
    /// List the selectable languages.
    Languages {
        #[arg(long, value_enum, default_value_t = Side::Target)]
        side: Side,
    },
    /// Show the status of an already submitted job.
    Status { job_id: String },
    /// Attach a notification address to an already submitted job.
    AttachEmail { job_id: String, email: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    Source,
    Target,
}

impl From<Side> for LanguageSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Source => LanguageSide::Source,
            Side::Target => LanguageSide::Target,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = config::load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }

    match cli.command {
        Commands::Translate {
            file,
            source,
            target,
            email,
            output_dir,
            lenient,
        } => {
            if let Some(v) = source {
                settings.source_language = v;
            }
            if let Some(v) = target {
                settings.target_language = v;
            }
            if email.is_some() {
                settings.email = email;
            }
            if let Some(v) = output_dir {
                settings.output_dir = v;
            }
            settings.lenient |= lenient;
            translate(&settings, file).await
        }
        Commands::Languages { side } => {
            for language in languages_for(side.into()) {
                println!("{:<10} {}", language.locale, language.label);
            }
            Ok(())
        }
        Commands::Status { job_id } => {
            let api = HttpDubbingApi::new(settings.api_url.as_str())?;
            let status = api
                .job_status(&JobId::from(job_id.as_str()))
                .await
                .with_context(|| format!("failed to fetch status of job {job_id}"))?;
            println!("status: {:?}", status.status);
            if let Some(url) = status.download_url() {
                println!("download: {url}");
            }
            if let Some(reason) = status.failure_reason.as_deref() {
                println!("reason: {reason}");
            }
            Ok(())
        }
        Commands::AttachEmail { job_id, email } => {
            if !is_valid_email(&email) {
                bail!("'{email}' is not a valid email address");
            }
            let api = HttpDubbingApi::new(settings.api_url.as_str())?;
            api.update_email(&JobId::from(job_id.as_str()), &email)
                .await
                .with_context(|| format!("failed to attach email to job {job_id}"))?;
            println!("Email updated to {email}");
            Ok(())
        }
    }
}

async fn translate(settings: &config::Settings, path: PathBuf) -> Result<()> {
    let file = MediaFile::from_path(&path).await?;
    info!(
        api_url = %settings.api_url,
        source = %settings.source_language,
        target = %settings.target_language,
        policy = %settings.describe_policy(),
        "starting translation"
    );

    let controller = JobController::with_languages(
        settings.policy(),
        settings.source_language.clone(),
        settings.target_language.clone(),
    );
    let mut driver = JobDriver::from_controller(
        controller,
        Arc::new(HttpDubbingApi::new(settings.api_url.as_str())?),
        Arc::new(SymphoniaProbe),
        Arc::new(NoPlayback),
    );

    let events = driver.event_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling job");
            let _ = events.send(ControllerEvent::Cancel);
        }
    });
    tokio::spawn(report_progress(driver.subscribe()));

    if let Some(email) = &settings.email {
        driver.dispatch(ControllerEvent::EmailEdited(email.clone()));
    }
    driver.dispatch(ControllerEvent::FileSelected(file));

    match driver.run_until_settled().await {
        JobOutcome::Completed { file_name, data } => {
            tokio::fs::create_dir_all(&settings.output_dir)
                .await
                .with_context(|| {
                    format!("failed to create output dir {}", settings.output_dir.display())
                })?;
            let target = settings.output_dir.join(&file_name);
            tokio::fs::write(&target, &data)
                .await
                .with_context(|| format!("failed to write {}", target.display()))?;
            println!("Saved {} ({} bytes)", target.display(), data.len());
            Ok(())
        }
        JobOutcome::Cancelled => {
            println!("Job cancelled");
            Ok(())
        }
        JobOutcome::Failed(reason) => bail!("translation failed: {reason}"),
        JobOutcome::Rejected(message) => bail!("{message}"),
        JobOutcome::Idle => bail!("job ended without a result"),
    }
}

async fn report_progress(mut snapshots: watch::Receiver<JobState>) {
    let mut last = (JobPhase::Idle, 0);
    while snapshots.changed().await.is_ok() {
        let (phase, progress, job_id) = {
            let state = snapshots.borrow_and_update();
            (state.phase, state.progress, state.job_id.clone())
        };
        if (phase, progress) == last {
            continue;
        }
        last = (phase, progress);
        match job_id {
            Some(job_id) => eprintln!("[{phase:?}] {progress:>3}% job {job_id}"),
            None => eprintln!("[{phase:?}] {progress:>3}%"),
        }
    }
}
