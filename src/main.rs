//! td-bulk-import - prepare and upload bulk import parts

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use bulk_import::client::{BulkImportApi, CreateOptions, HttpClient};
use bulk_import::commands;
use bulk_import::config::{
    Config, ConfigOptions, PrepareOptions, UploadOptions, DEFAULT_ENDPOINT, DEFAULT_PARALLEL,
    DEFAULT_RETRY_LIMIT, DEFAULT_RETRY_WAIT_SECS, PART_SPLIT_SIZE,
};
use bulk_import::prepare::{prepare_parts, JsonLinesSource};
use bulk_import::upload::upload_parts;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "td-bulk-import")]
#[command(about = "Prepare record files as parts and upload them into bulk import sessions")]
struct Args {
    #[command(flatten)]
    remote: RemoteArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct RemoteArgs {
    /// API endpoint
    #[arg(long, env = "TD_API_SERVER", default_value = DEFAULT_ENDPOINT, global = true)]
    endpoint: String,

    /// API key
    #[arg(long, env = "TD_API_KEY", hide_env_values = true, global = true)]
    apikey: Option<String>,

    /// Reattempts after a failed part upload
    #[arg(long, default_value_t = DEFAULT_RETRY_LIMIT, global = true)]
    retry_limit: u32,

    /// Seconds to wait between upload attempts
    #[arg(long, default_value_t = DEFAULT_RETRY_WAIT_SECS, global = true)]
    retry_wait_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List bulk import sessions
    List,
    /// Create a new bulk import session
    Create {
        name: String,
        database: String,
        table: String,
        /// Create the session under this organization
        #[arg(short = 'g', long = "org")]
        organization: Option<String>,
    },
    /// Delete a bulk import session
    Delete { name: String },
    /// Show a bulk import session and its uploaded parts
    Show { name: String },
    /// Upload one file as a named part
    UploadPart {
        name: String,
        part_name: String,
        path: PathBuf,
    },
    /// Upload files as parts in parallel
    UploadParts {
        name: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Add prefix to parts name
        #[arg(short = 'P', long, default_value = "")]
        prefix: String,
        /// Use COUNT number of . (dots) in the source file name to the parts name
        #[arg(short = 's', long = "use-suffix", default_value_t = 0)]
        suffix_count: usize,
        /// Perform bulk import job automatically
        #[arg(long)]
        auto_perform: bool,
        /// Perform uploading in parallel (max 8)
        #[arg(long, default_value_t = DEFAULT_PARALLEL, allow_negative_numbers = true)]
        parallel: i64,
    },
    /// Delete uploaded parts
    DeleteParts {
        name: String,
        #[arg(required = true)]
        part_names: Vec<String>,
        /// Add prefix to parts name
        #[arg(short = 'P', long, default_value = "")]
        prefix: String,
    },
    /// Start a bulk import job
    Perform {
        name: String,
        /// Force start performing
        #[arg(short, long)]
        force: bool,
    },
    /// Commit a performed bulk import session
    Commit { name: String },
    /// Print records rejected by the last perform as JSON lines
    ErrorRecords { name: String },
    /// Reject further part uploads
    Freeze { name: String },
    /// Accept part uploads again
    Unfreeze { name: String },
    /// Convert JSON-lines files into msgpack.gz parts
    PrepareParts {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Size of each part in KB
        #[arg(short, long = "split-size", default_value_t = PART_SPLIT_SIZE / 1024)]
        split_size: u64,
        /// Number of input files encoded at the same time
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        parallel: i64,
    },
}

fn connect(remote: &RemoteArgs) -> Result<(Arc<Config>, Arc<dyn BulkImportApi>)> {
    let config = Config::new(
        remote.endpoint.clone(),
        remote.apikey.clone().unwrap_or_default(),
        ConfigOptions {
            retry_limit: Some(remote.retry_limit),
            retry_wait_secs: Some(remote.retry_wait_secs),
            request_timeout_secs: None,
        },
    )?;
    let client: Arc<dyn BulkImportApi> = Arc::new(HttpClient::new(&config)?);
    Ok((config, client))
}

fn prepare(files: Vec<PathBuf>, options: PrepareOptions) -> Result<()> {
    let config = options.validate()?;
    let results = prepare_parts(&files, &config, &JsonLinesSource)?;

    let parts: usize = results.iter().map(|(_, s)| s.parts.len()).sum();
    info!("{} parts prepared from {} files.", parts, results.len());
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    if let Command::PrepareParts {
        files,
        output,
        split_size,
        parallel,
    } = args.command
    {
        let options = PrepareOptions {
            output_dir: output,
            split_size_kb: split_size,
            parallel,
        };
        return tokio::task::spawn_blocking(move || prepare(files, options)).await?;
    }

    remote(args.command, &args.remote).await
}

async fn remote(command: Command, remote: &RemoteArgs) -> Result<()> {
    let (config, client) = connect(remote)?;
    let client_ref = client.as_ref();

    match command {
        Command::List => {
            let sessions = commands::list(client_ref).await?;
            if !sessions.is_empty() {
                println!("{}", commands::render_sessions(&sessions));
            }
        }
        Command::Create {
            name,
            database,
            table,
            organization,
        } => {
            commands::create(
                client_ref,
                &name,
                &database,
                &table,
                &CreateOptions { organization },
            )
            .await?;
        }
        Command::Delete { name } => commands::delete(client_ref, &name).await?,
        Command::Show { name } => {
            let (session, parts) = commands::show(client_ref, &name).await?;
            println!("{}", commands::render_session(&session, &parts));
        }
        Command::UploadPart {
            name,
            part_name,
            path,
        } => {
            commands::upload_part(client_ref, &config.retry, &name, &part_name, &path).await?;
        }
        Command::UploadParts {
            name,
            files,
            prefix,
            suffix_count,
            auto_perform,
            parallel,
        } => {
            let options = UploadOptions {
                prefix,
                suffix_count,
                auto_perform,
                parallel,
            };
            let outcome = upload_parts(client.clone(), config.retry, &name, files, &options).await?;

            if !outcome.report.is_success() {
                eprint!("{}", outcome.report.failure_summary());
                bail!(
                    "failed to upload {} files",
                    outcome.report.failure_count()
                );
            }
            info!("done.");
        }
        Command::DeleteParts {
            name,
            part_names,
            prefix,
        } => commands::delete_parts(client_ref, &name, &prefix, &part_names).await?,
        Command::Perform { name, force } => {
            let job = commands::perform(client_ref, &name, force).await?;
            println!("{}", job.job_id);
        }
        Command::Commit { name } => {
            let job = commands::commit(client_ref, &name).await?;
            println!("{}", job.job_id);
        }
        Command::ErrorRecords { name } => {
            for record in commands::error_records(client_ref, &name).await? {
                println!("{}", record.to_json());
            }
        }
        Command::Freeze { name } => commands::freeze(client_ref, &name).await?,
        Command::Unfreeze { name } => commands::unfreeze(client_ref, &name).await?,
        Command::PrepareParts { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; command output goes to stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
