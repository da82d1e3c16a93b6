use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::info;
use rustdok_client::bucket::{create_bucket, delete_empty_bucket};
use rustdok_client::folder::{create_folder, move_to_folder};
use rustdok_client::object::{format_size, normalize_prefix};
use rustdok_client::transport::{list_buckets, ObjectLister, ObjectRemover, UploadTransport};
use rustdok_client::{
    collect_folder_files, listing_snapshot, ApiConfig, ConflictPrompt, HttpStore, LocalFile,
    Resolution, UploadEvent, UploadOrchestrator, UploadStatus,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "rustdok", about = "Browse, upload and organize objects in a rustdok store")]
struct Cli {
    /// Object store URL (defaults to RUSTDOK_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// API version segment (defaults to RUSTDOK_API_VERSION or v1)
    #[arg(long, global = true)]
    api_version: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Turn verbose logging on
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// list buckets
    Buckets,
    /// list objects and folders under a prefix
    Ls {
        bucket: String,
        #[arg(short, long, default_value = "")]
        prefix: String,
    },
    /// upload files into a bucket prefix
    Upload(UploadArgs),
    /// create a folder
    Mkdir {
        bucket: String,
        name: String,
        #[arg(short, long, default_value = "")]
        prefix: String,
    },
    /// move an object into a folder
    Mv {
        bucket: String,
        key: String,
        folder: String,
    },
    /// delete an object
    Rm { bucket: String, key: String },
    /// print the download URL of an object
    Url { bucket: String, key: String },
    /// create a bucket
    Mb { name: String },
    /// delete an empty bucket
    Rb { name: String },
}

#[derive(Args, Debug)]
struct UploadArgs {
    bucket: String,

    /// Files (or folders with --recursive) to upload
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Target folder inside the bucket
    #[arg(short, long, default_value = "")]
    prefix: String,

    /// What to do when a key already exists
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Ask)]
    on_conflict: ConflictPolicy,

    /// Upload folder contents, keeping their relative paths
    #[arg(short, long)]
    recursive: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ConflictPolicy {
    Ask,
    Skip,
    Rename,
    Replace,
}

fn load_config(cli: &Cli) -> Result<ApiConfig> {
    let mut config = match (&cli.api_url, ApiConfig::from_env()) {
        (Some(url), Ok(mut config)) => {
            config.base_url = url.clone();
            config
        }
        (Some(url), Err(_)) => ApiConfig::new(url.clone()),
        (None, result) => result.context("no object store configured; pass --api-url")?,
    };
    if let Some(version) = &cli.api_version {
        config.api_version = version.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

async fn gather_files(paths: &[PathBuf], recursive: bool) -> Result<Vec<LocalFile>> {
    let mut files = Vec::new();
    for path in paths {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if !metadata.is_dir() {
            files.push(LocalFile::open(path).await?);
            continue;
        }
        if !recursive {
            bail!("{} is a directory (use --recursive)", path.display());
        }

        let folder_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        for file in collect_folder_files(path).await? {
            let name = match &folder_name {
                Some(folder) => format!("{}/{}", folder, file.name),
                None => file.name.clone(),
            };
            files.push(file.renamed(name));
        }
    }
    Ok(files)
}

type StdinLines = Lines<BufReader<Stdin>>;

async fn ask_resolution(lines: &mut StdinLines, prompt: &ConflictPrompt) -> Option<Resolution> {
    let mut stdout = tokio::io::stdout();
    loop {
        let question = format!(
            "\"{}\" already exists ({}/{}). [s]kip, [r]ename, [o]verwrite, [q]uit: ",
            prompt.conflict.full_path, prompt.position, prompt.total
        );
        stdout.write_all(question.as_bytes()).await.ok()?;
        stdout.flush().await.ok()?;

        let line = lines.next_line().await.ok()??;
        if matches!(line.trim(), "q" | "quit") {
            return None;
        }
        match line.parse::<Resolution>() {
            Ok(resolution) => return Some(resolution),
            Err(e) => eprintln!("{}", e),
        }
    }
}

async fn answer_prompts(mut prompts: mpsc::Receiver<ConflictPrompt>, policy: ConflictPolicy) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(prompt) = prompts.recv().await {
        let resolution = match policy {
            ConflictPolicy::Ask => ask_resolution(&mut lines, &prompt).await,
            ConflictPolicy::Skip => Some(Resolution::Skip),
            ConflictPolicy::Rename => Some(Resolution::Rename),
            ConflictPolicy::Replace => Some(Resolution::Replace),
        };
        match resolution {
            Some(resolution) => prompt.respond(resolution),
            None => prompt.dismiss(),
        }
    }
}

async fn show_progress(mut events: mpsc::UnboundedReceiver<UploadEvent>) {
    let multi = MultiProgress::new();
    let mut bars: Vec<ProgressBar> = Vec::new();
    let style = ProgressStyle::with_template(
        "{msg:30} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
    )
    .map(|s| s.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::BatchStarted { items, .. } => {
                bars = items
                    .iter()
                    .map(|item| {
                        let bar = multi.add(ProgressBar::new(item.size_bytes));
                        bar.set_style(style.clone());
                        bar.set_message(item.target_name.clone());
                        bar
                    })
                    .collect();
            }
            UploadEvent::Progress(progress) => {
                if let Some(bar) = bars.get(progress.index) {
                    bar.set_position(progress.uploaded_bytes);
                }
            }
            UploadEvent::StatusChanged {
                index,
                status,
                error,
                ..
            } => {
                if let Some(bar) = bars.get(index) {
                    match status {
                        UploadStatus::Completed => bar.finish(),
                        UploadStatus::Error => bar.abandon_with_message(format!(
                            "failed: {}",
                            error.unwrap_or_default()
                        )),
                        _ => {}
                    }
                }
            }
            UploadEvent::BatchSettled(_) => break,
        }
    }
}

async fn run_upload(config: &ApiConfig, args: UploadArgs) -> Result<ExitCode> {
    let store = Arc::new(HttpStore::new(config, &args.bucket)?);
    let files = gather_files(&args.paths, args.recursive).await?;
    let prefix = normalize_prefix(&args.prefix);

    let existing = listing_snapshot(&*store, &prefix, &files)
        .await
        .context("Failed to list existing objects")?;

    let transport: Arc<dyn UploadTransport> = store.clone();
    let (orchestrator, channels) = UploadOrchestrator::new(transport);
    let bucket = args.bucket.clone();
    let orchestrator = orchestrator.with_settled_callback(move |report| {
        info!(
            "batch_settled: {} refresh {:?} in {}",
            report.batch_id, report.affected_prefixes, bucket
        );
    });

    let prompt_task = tokio::spawn(answer_prompts(channels.prompts, args.on_conflict));
    let progress_task = tokio::spawn(show_progress(channels.events));

    let result = orchestrator.submit_batch(files, &prefix, &existing).await;
    drop(orchestrator);
    let _ = prompt_task.await;
    let _ = progress_task.await;
    let report = result?;

    for item in &report.items {
        match item.status {
            UploadStatus::Completed if item.was_renamed() => println!(
                "uploaded {} (renamed from {})",
                item.full_path, item.original_name
            ),
            UploadStatus::Completed => println!("uploaded {}", item.full_path),
            _ => println!(
                "failed   {}: {}",
                item.full_path,
                item.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!(
        "{} uploaded, {} failed",
        report.completed(),
        report.failed()
    );

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_ls(config: &ApiConfig, bucket: &str, prefix: &str) -> Result<()> {
    let store = HttpStore::new(config, bucket)?;
    let prefix = normalize_prefix(prefix);
    let listing_prefix = (!prefix.is_empty()).then_some(prefix.as_str());
    let mut entries = store.list_objects(listing_prefix).await?;

    entries.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.cmp(&b.name))
    });
    for entry in &entries {
        if entry.is_folder() {
            println!("{:>12}  {:<25}  {}/", "DIR", "", entry.display_name());
        } else {
            println!(
                "{:>12}  {:<25}  {}",
                format_size(entry.size),
                entry.last_modified.as_deref().unwrap_or("-"),
                entry.display_name()
            );
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    match cli.command {
        Commands::Buckets => {
            for bucket in list_buckets(&config).await? {
                println!("{}", bucket.name);
            }
        }
        Commands::Ls { bucket, prefix } => run_ls(&config, &bucket, &prefix).await?,
        Commands::Upload(args) => return run_upload(&config, args).await,
        Commands::Mkdir {
            bucket,
            name,
            prefix,
        } => {
            let store = HttpStore::new(&config, &bucket)?;
            let prefix = normalize_prefix(&prefix);
            let listing_prefix = (!prefix.is_empty()).then_some(prefix.as_str());
            let existing = store.list_objects(listing_prefix).await?;
            let key = create_folder(&store, &prefix, &name, &existing).await?;
            println!("created {}", key);
        }
        Commands::Mv {
            bucket,
            key,
            folder,
        } => {
            let store = HttpStore::new(&config, &bucket)?;
            let destination = move_to_folder(&store, &key, &folder).await?;
            println!("moved {} -> {}", key, destination);
        }
        Commands::Rm { bucket, key } => {
            let store = HttpStore::new(&config, &bucket)?;
            store.delete_object(&key).await?;
            println!("deleted {}", key);
        }
        Commands::Url { bucket, key } => {
            let store = HttpStore::new(&config, &bucket)?;
            println!("{}", store.download_url(&key));
        }
        Commands::Mb { name } => {
            let name = create_bucket(&config, &name).await?;
            println!("created bucket {}", name);
        }
        Commands::Rb { name } => {
            delete_empty_bucket(&config, &name).await?;
            println!("deleted bucket {}", name);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli).await
}
