// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use cvat_ingest::{
    Client, CreateFailurePolicy, Error, IngestConfig, IngestReport, Ingestor, Progress,
    SegmentOutcome, split_file,
};
use inquire::{CustomType, InquireError, Password, PasswordDisplayMode, Text};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file, defaults to ingest.toml in the user config
    /// directory when present
    #[clap(long, env = "CVAT_INGEST_CONFIG")]
    config: Option<PathBuf>,

    /// CVAT Server URL
    #[clap(long, env = "CVAT_SERVER")]
    server: Option<String>,

    /// CVAT Username
    #[clap(long, env = "CVAT_USERNAME")]
    username: Option<String>,

    /// CVAT Password
    #[clap(long, env = "CVAT_PASSWORD")]
    password: Option<String>,

    /// Client Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Returns the CVAT server version and the client version.
    Version,
    /// Split a COCO annotation file into segment files without contacting
    /// the server.
    Split {
        /// COCO annotation file
        annotations: Option<PathBuf>,

        /// Directory for the segment files, defaults to <stem>_splits next
        /// to the annotation file
        #[clap(long)]
        output: Option<PathBuf>,

        /// Maximum number of images per segment
        #[clap(long)]
        segment_size: Option<usize>,
    },
    /// Split the annotation file and ingest every segment as its own task.
    Ingest {
        /// Directory holding the images named in the annotation file
        #[clap(long)]
        images: Option<PathBuf>,

        /// COCO annotation file
        #[clap(long)]
        annotations: Option<PathBuf>,

        /// Directory for the segment files
        #[clap(long)]
        output: Option<PathBuf>,

        /// Maximum number of images per segment
        #[clap(long)]
        segment_size: Option<usize>,

        /// Name of the project to create
        #[clap(long)]
        project_name: Option<String>,

        /// Use this existing project instead of creating one
        #[clap(long)]
        project_id: Option<u64>,

        /// Do not create a project; the id is prompted for when not given
        #[clap(long)]
        no_create_project: bool,

        /// Base name of created tasks
        #[clap(long)]
        task_name: Option<String>,

        /// Existing task ids, one per segment, comma separated
        #[clap(long, value_delimiter = ',')]
        task_ids: Vec<u64>,

        /// Do not create tasks; the ids are prompted for when not given
        #[clap(long)]
        no_create_task: bool,

        /// User id assigned to created tasks
        #[clap(long)]
        assignee: Option<u64>,

        /// Skip a segment whose task cannot be created instead of stopping
        #[clap(long)]
        skip_failed_tasks: bool,

        /// Seconds between upload confirmation polls
        #[clap(long)]
        poll_interval: Option<f64>,

        /// Give up after this many upload confirmation polls
        #[clap(long)]
        poll_max_attempts: Option<u32>,
    },
}

fn prompt_error(err: InquireError) -> Error {
    Error::InvalidParameters(format!("Prompt failed: {}", err))
}

async fn handle_version(server: Option<String>) -> Result<(), Error> {
    if let Some(server) = server {
        let about = Client::new(&server)?.server_version().await?;
        println!("{} Server Version: {}", about.name, about.version);
    }
    println!("cvat-ingest Version: {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn handle_split(config: IngestConfig) -> Result<(), Error> {
    config.validate_split()?;

    let output = config.output_dir();
    let summary = split_file(&config.annotations, &output, config.segment_size)?;

    for segment in summary.segments() {
        println!(
            "{}: {} images, {} annotations",
            segment.path().display(),
            segment.image_count(),
            segment.annotation_count()
        );
    }
    println!(
        "Split {} images into {} segments in {}",
        summary.image_count(),
        summary.segments().len(),
        output.display()
    );
    if summary.dropped_annotations() > 0 {
        println!(
            "Dropped {} annotations referencing unknown images",
            summary.dropped_annotations()
        );
    }

    Ok(())
}

/// Prompt for whatever the run needs but neither the configuration nor the
/// command line supplied.
fn prompt_missing(config: &mut IngestConfig) -> Result<(), Error> {
    if config.username.is_empty() {
        config.username = Text::new("CVAT Username")
            .prompt()
            .map_err(prompt_error)?;
    }
    if config.password.is_empty() {
        config.password = Password::new("CVAT Password")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .map_err(prompt_error)?;
    }
    if !config.create_project && config.project.id.is_none() {
        let id = CustomType::<u64>::new("CVAT Project ID")
            .with_error_message("Please enter a numeric project id")
            .prompt()
            .map_err(prompt_error)?;
        config.project.id = Some(id);
    }
    if !config.create_task && config.task.ids.is_empty() {
        let ids = Text::new("CVAT Task IDs (comma separated, one per segment)")
            .prompt()
            .map_err(prompt_error)?;
        config.task.ids = ids
            .split(',')
            .filter(|id| !id.trim().is_empty())
            .map(|id| id.trim().parse::<u64>())
            .collect::<Result<_, _>>()?;
    }
    Ok(())
}

fn print_report(report: &IngestReport) {
    for segment in &report.segments {
        match &segment.outcome {
            SegmentOutcome::Done => println!(
                "Segment {}: task {} with {} images (upload {:.1}s, import {:.1}s)",
                segment.index,
                segment
                    .task_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                segment.image_count,
                segment.upload_wait.as_secs_f64(),
                segment.import_time.as_secs_f64()
            ),
            SegmentOutcome::Skipped { reason } => {
                println!("Segment {}: skipped ({})", segment.index, reason)
            }
        }
    }
    println!(
        "Project {}: {} segments done, {} skipped, {} images in {:.1}s",
        report.project,
        report.done(),
        report.skipped(),
        report.image_count(),
        report.total.as_secs_f64()
    );
}

async fn handle_ingest(mut config: IngestConfig) -> Result<(), Error> {
    use indicatif::{ProgressBar, ProgressStyle};
    use tokio::sync::mpsc;

    prompt_missing(&mut config)?;
    config.validate()?;

    let client = Client::new(&config.server)?
        .with_login(&config.username, &config.password)
        .await?
        .with_import_poll(config.poll_policy()?);

    let output = config.output_dir();
    let summary = split_file(&config.annotations, &output, config.segment_size)?;
    log::info!(
        "Split {} images into {} segments in {:?}",
        summary.image_count(),
        summary.segments().len(),
        output
    );

    let ingestor = Ingestor::new(client, config.ingest_options()?);
    ingestor.scan_images(summary.image_count())?;

    let bar = ProgressBar::new(summary.segments().len() as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .map_err(|err| Error::InvalidParameters(err.to_string()))?
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message("Segments");

    let (tx, mut rx) = mpsc::channel::<Progress>(1);

    let progress_bar = bar.clone();
    let progress = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if progress.total > 0 {
                progress_bar.set_length(progress.total as u64);
                progress_bar.set_position(progress.current as u64);
            }
        }
    });

    let result = ingestor.run(summary.segments(), Some(tx)).await;
    let _ = progress.await;
    bar.finish_and_clear();

    print_report(&result?);
    Ok(())
}

#[cfg(feature = "profiling")]
fn init_profiling() {
    use tracing_subscriber::fmt::format::FmtSpan;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        log::warn!("Profiling disabled: {}", err);
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "profiling")]
    init_profiling();

    let args = Args::parse();

    if args.cmd == Command::Version {
        return handle_version(args.server).await;
    }

    let mut config = IngestConfig::load(args.config.as_deref())?;
    if let Some(server) = args.server {
        config.server = server;
    }
    if let Some(username) = args.username {
        config.username = username;
    }
    if let Some(password) = args.password {
        config.password = password;
    }

    match args.cmd {
        Command::Version => unreachable!(),
        Command::Split {
            annotations,
            output,
            segment_size,
        } => {
            if let Some(annotations) = annotations {
                config.annotations = annotations;
            }
            if output.is_some() {
                config.output_dir = output;
            }
            if let Some(segment_size) = segment_size {
                config.segment_size = segment_size;
            }
            handle_split(config)
        }
        Command::Ingest {
            images,
            annotations,
            output,
            segment_size,
            project_name,
            project_id,
            no_create_project,
            task_name,
            task_ids,
            no_create_task,
            assignee,
            skip_failed_tasks,
            poll_interval,
            poll_max_attempts,
        } => {
            if let Some(images) = images {
                config.images_dir = images;
            }
            if let Some(annotations) = annotations {
                config.annotations = annotations;
            }
            if output.is_some() {
                config.output_dir = output;
            }
            if let Some(segment_size) = segment_size {
                config.segment_size = segment_size;
            }
            if let Some(name) = project_name {
                config.project.name = name;
            }
            if project_id.is_some() || no_create_project {
                config.create_project = false;
                config.project.id = project_id.or(config.project.id);
            }
            if let Some(name) = task_name {
                config.task.name = name;
            }
            if !task_ids.is_empty() || no_create_task {
                config.create_task = false;
                if !task_ids.is_empty() {
                    config.task.ids = task_ids;
                }
            }
            if assignee.is_some() {
                config.task.assignee = assignee;
            }
            if skip_failed_tasks {
                config.on_create_failure = CreateFailurePolicy::Skip;
            }
            if let Some(interval) = poll_interval {
                config.poll.interval_secs = interval;
            }
            if poll_max_attempts.is_some() {
                config.poll.max_attempts = poll_max_attempts;
            }
            handle_ingest(config).await
        }
    }
}
