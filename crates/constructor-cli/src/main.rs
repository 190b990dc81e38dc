//! `constructor` - command line access to a Genetic Constructor storage root.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use constructor_core::config::{default_storage_root, STORAGE_ENV};
use constructor_core::permissions;
use constructor_core::{
    BlockId, CommitAuthor, ErrorKind, OrderId, Persistence, ProjectId, SequenceHash, Sha,
    StorageConfig, StoreError, UserId,
};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "constructor")]
#[command(about = "Inspect and edit Genetic Constructor project storage")]
struct Cli {
    /// Storage root (defaults to ~/.constructor/storage)
    #[arg(long, global = true, env = STORAGE_ENV)]
    storage: Option<PathBuf>,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    Block {
        #[command(subcommand)]
        command: BlockCommand,
    },
    Order {
        #[command(subcommand)]
        command: OrderCommand,
    },
    Sequence {
        #[command(subcommand)]
        command: SequenceCommand,
    },
    Access {
        #[command(subcommand)]
        command: AccessCommand,
    },
}

/// JSON (or raw text, for sequences) supplied inline, from a file, or on stdin.
#[derive(Args, Default)]
struct Input {
    #[arg(long, conflicts_with = "file")]
    data: Option<String>,
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ProjectCommand {
    Exists {
        id: ProjectId,
        #[arg(long)]
        sha: Option<Sha>,
    },
    Get {
        id: ProjectId,
        #[arg(long)]
        sha: Option<Sha>,
    },
    Create {
        /// Generated when omitted
        id: Option<ProjectId>,
        #[arg(long)]
        owner: UserId,
        #[command(flatten)]
        input: Input,
    },
    Write {
        id: ProjectId,
        /// Required when the project does not exist yet
        #[arg(long)]
        owner: Option<UserId>,
        #[command(flatten)]
        input: Input,
    },
    Merge {
        id: ProjectId,
        #[command(flatten)]
        input: Input,
    },
    Delete {
        id: ProjectId,
    },
    Restore {
        id: ProjectId,
    },
    Save {
        id: ProjectId,
        #[arg(long, short)]
        message: Option<String>,
    },
    Snapshot {
        id: ProjectId,
        #[arg(long, short)]
        message: Option<String>,
    },
    History {
        id: ProjectId,
        /// Only list snapshots
        #[arg(long)]
        snapshots: bool,
    },
}

#[derive(Subcommand)]
enum BlockCommand {
    Exists {
        id: BlockId,
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        sha: Option<Sha>,
    },
    Get {
        id: BlockId,
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        sha: Option<Sha>,
    },
    Create {
        /// Generated when omitted
        id: Option<BlockId>,
        #[arg(long)]
        project: ProjectId,
        #[command(flatten)]
        input: Input,
    },
    Write {
        id: BlockId,
        #[arg(long)]
        project: ProjectId,
        #[command(flatten)]
        input: Input,
    },
    Merge {
        id: BlockId,
        #[arg(long)]
        project: ProjectId,
        #[command(flatten)]
        input: Input,
    },
    Delete {
        id: BlockId,
        #[arg(long)]
        project: ProjectId,
    },
    History {
        id: BlockId,
        #[arg(long)]
        project: ProjectId,
    },
}

#[derive(Subcommand)]
enum OrderCommand {
    Exists {
        id: OrderId,
        #[arg(long)]
        project: ProjectId,
    },
    Get {
        id: OrderId,
        #[arg(long)]
        project: ProjectId,
    },
    Write {
        /// Generated when omitted
        id: Option<OrderId>,
        #[arg(long)]
        project: ProjectId,
        #[command(flatten)]
        input: Input,
    },
    Delete {
        id: OrderId,
        #[arg(long)]
        project: ProjectId,
    },
}

#[derive(Subcommand)]
enum SequenceCommand {
    Exists {
        hash: SequenceHash,
    },
    Get {
        hash: SequenceHash,
    },
    /// Store raw sequence text, hashing it when no hash is given
    Write {
        #[arg(long)]
        hash: Option<SequenceHash>,
        #[arg(long, requires = "project")]
        block: Option<BlockId>,
        #[arg(long, requires = "block")]
        project: Option<ProjectId>,
        #[command(flatten)]
        input: Input,
    },
    /// Print the hash of raw sequence text without storing it
    Hash {
        #[command(flatten)]
        input: Input,
    },
    /// Delete stored sequence text. Blocks referencing it are not updated.
    Delete {
        hash: SequenceHash,
    },
    /// Commit a block's project recording that the block lost its sequence
    Remove {
        #[arg(long)]
        block: BlockId,
        #[arg(long)]
        project: ProjectId,
    },
}

#[derive(Subcommand)]
enum AccessCommand {
    Show {
        project: ProjectId,
    },
    Check {
        project: ProjectId,
        #[arg(long)]
        user: UserId,
    },
    Grant {
        project: ProjectId,
        #[arg(long)]
        user: UserId,
    },
    List {
        #[arg(long)]
        user: UserId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match storage_config(cli.storage) {
        Ok(config) => config,
        Err(err) => return report(&err),
    };
    log::debug!("Using storage root {}", config.storage_root.display());
    let store = Persistence::new(config);

    match run(&store, cli.command).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(err) => report(&StoreError::InvalidInput(err.to_string())),
        },
        Err(err) => report(&err),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn storage_config(storage: Option<PathBuf>) -> Result<StorageConfig, StoreError> {
    let root = match storage {
        Some(root) => root,
        None => default_storage_root().map_err(StoreError::InvalidInput)?,
    };
    Ok(StorageConfig::new(root).with_commit_author(CommitAuthor::from_env()))
}

fn report(err: &StoreError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(exit_code(err.kind()))
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Io => 1,
        ErrorKind::InvalidInput | ErrorKind::InvalidModel => 2,
        ErrorKind::DoesNotExist => 3,
        ErrorKind::AlreadyExists => 4,
        ErrorKind::Versioning => 5,
    }
}

fn read_text(input: &Input) -> Result<String, StoreError> {
    if let Some(data) = &input.data {
        return Ok(data.clone());
    }
    if let Some(path) = &input.file {
        return std::fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidInput(format!("cannot read {}: {e}", path.display()))
        });
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| StoreError::InvalidInput(format!("cannot read stdin: {e}")))?;
    Ok(buffer)
}

fn read_json(input: &Input) -> Result<Value, StoreError> {
    let text = read_text(input)?;
    serde_json::from_str(&text).map_err(|e| StoreError::InvalidInput(format!("invalid JSON: {e}")))
}

fn to_json(value: impl serde::Serialize) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::InvalidInput(e.to_string()))
}

fn or_null(value: Option<Value>) -> Value {
    value.unwrap_or(Value::Null)
}

async fn run(store: &Persistence, command: Commands) -> Result<Value, StoreError> {
    match command {
        Commands::Project { command } => run_project(store, command).await,
        Commands::Block { command } => run_block(store, command).await,
        Commands::Order { command } => run_order(store, command).await,
        Commands::Sequence { command } => run_sequence(store, command).await,
        Commands::Access { command } => run_access(store, command).await,
    }
}

async fn run_project(store: &Persistence, command: ProjectCommand) -> Result<Value, StoreError> {
    match command {
        ProjectCommand::Exists { id, sha } => to_json(store.project_presence(&id, sha.as_ref()).await?),
        ProjectCommand::Get { id, sha } => Ok(or_null(store.project_get(&id, sha.as_ref()).await?)),
        ProjectCommand::Create { id, owner, input } => {
            let id = id.unwrap_or_else(ProjectId::generate);
            store.project_create(&id, read_json(&input)?, &owner).await
        }
        ProjectCommand::Write { id, owner, input } => {
            store.project_write(&id, read_json(&input)?, owner.as_ref()).await
        }
        ProjectCommand::Merge { id, input } => {
            store.project_merge(&id, &read_json(&input)?, None).await
        }
        ProjectCommand::Delete { id } => to_json(store.project_delete(&id).await?),
        ProjectCommand::Restore { id } => to_json(store.project_restore(&id).await?),
        ProjectCommand::Save { id, message } => {
            to_json(store.project_save(&id, message.as_deref()).await?)
        }
        ProjectCommand::Snapshot { id, message } => {
            to_json(store.project_snapshot(&id, message.as_deref()).await?)
        }
        ProjectCommand::History { id, snapshots } => {
            let records = if snapshots {
                store.project_snapshots(&id).await?
            } else {
                store.project_history(&id).await?
            };
            to_json(records)
        }
    }
}

async fn run_block(store: &Persistence, command: BlockCommand) -> Result<Value, StoreError> {
    match command {
        BlockCommand::Exists { id, project, sha } => {
            to_json(store.block_presence(&id, &project, sha.as_ref()).await?)
        }
        BlockCommand::Get { id, project, sha } => {
            Ok(or_null(store.block_get(&id, &project, sha.as_ref()).await?))
        }
        BlockCommand::Create { id, project, input } => {
            let id = id.unwrap_or_else(BlockId::generate);
            store.block_create(&id, read_json(&input)?, &project).await
        }
        BlockCommand::Write { id, project, input } => {
            store.block_write(&id, read_json(&input)?, &project).await
        }
        BlockCommand::Merge { id, project, input } => {
            store.block_merge(&id, &read_json(&input)?, &project).await
        }
        BlockCommand::Delete { id, project } => to_json(store.block_delete(&id, &project).await?),
        BlockCommand::History { id, project } => to_json(store.block_history(&id, &project).await?),
    }
}

async fn run_order(store: &Persistence, command: OrderCommand) -> Result<Value, StoreError> {
    match command {
        OrderCommand::Exists { id, project } => Ok(json!(store.order_exists(&id, &project).await?)),
        OrderCommand::Get { id, project } => Ok(or_null(store.order_get(&id, &project).await?)),
        OrderCommand::Write { id, project, input } => {
            let id = id.unwrap_or_else(OrderId::generate);
            store.order_write(&id, read_json(&input)?, &project).await
        }
        OrderCommand::Delete { id, project } => to_json(store.order_delete(&id, &project).await?),
    }
}

async fn run_sequence(store: &Persistence, command: SequenceCommand) -> Result<Value, StoreError> {
    match command {
        SequenceCommand::Exists { hash } => Ok(json!(store.sequence_exists(&hash).await?)),
        SequenceCommand::Get { hash } => Ok(json!(store.sequence_get(&hash).await?)),
        SequenceCommand::Write {
            hash,
            block,
            project,
            input,
        } => {
            let data = read_text(&input)?;
            let hash = hash.unwrap_or_else(|| constructor_core::sequence_hash(&data));
            let owner = block.as_ref().zip(project.as_ref());
            to_json(store.sequence_write(&hash, &data, owner).await?)
        }
        SequenceCommand::Hash { input } => to_json(constructor_core::sequence_hash(&read_text(&input)?)),
        SequenceCommand::Delete { hash } => to_json(store.sequence_delete(&hash).await?),
        SequenceCommand::Remove { block, project } => {
            to_json(store.sequence_remove(&block, &project).await?)
        }
    }
}

async fn run_access(store: &Persistence, command: AccessCommand) -> Result<Value, StoreError> {
    let paths = store.paths();
    match command {
        AccessCommand::Show { project } => {
            to_json(permissions::read_project_permissions(paths, &project).await?)
        }
        AccessCommand::Check { project, user } => {
            Ok(json!(permissions::user_has_access(paths, &project, &user).await?))
        }
        AccessCommand::Grant { project, user } => {
            to_json(permissions::grant_project_access(paths, &project, &user).await?)
        }
        AccessCommand::List { user } => {
            to_json(permissions::list_projects_with_access(paths, &user).await?)
        }
    }
}
