use clap::{Parser, Subcommand};
use composer::actions::{ExecutionRequest, Executor};
use composer::actions::builtin::DryRunExecutor;
use composer::actions::http::ChatCompletionExecutor;
use composer::compiler::compile;
use composer::compiler::loader::{load_tree_from_yaml, write_tree};
use composer::config::{ComposerConfig, StorageBackend, StorageConfig};
use composer::runtime::redis_storage::RedisTreeRepository;
use composer::runtime::storage::{InMemoryTreeRepository, TreeRepository, UuidAllocator};
use composer::runtime::store::TreeStore;
use std::sync::Arc;
use std::path::PathBuf;
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a tree file and print the document
    Compile {
        /// Path to the tree file (YAML or JSON)
        file: PathBuf,

        /// Print the expansion sequence as JSON instead of the document
        #[arg(long)]
        trace: bool,
    },

    /// Compile a tree file and send the document to the execution backend
    Run {
        file: PathBuf,

        /// Override the configured system instruction
        #[arg(long)]
        system: Option<String>,

        /// Log the request and echo the document instead of calling the API
        #[arg(long)]
        dry_run: bool,
    },

    /// Store a tree file, optionally overwriting an existing tree
    Save {
        file: PathBuf,

        #[arg(long, short)]
        name: String,

        /// Existing tree id to overwrite
        #[arg(long)]
        id: Option<String>,
    },

    /// Fetch a stored tree
    Load {
        id: String,

        /// Write to this file (JSON, or YAML by extension) instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// List stored trees
    List,

    /// Delete a stored tree
    Delete { id: String },
}

fn open_repository(config: &StorageConfig) -> Result<Arc<dyn TreeRepository>> {
    match config.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage: nothing persists after this command");
            Ok(Arc::new(InMemoryTreeRepository::new()))
        }
        StorageBackend::Redis => {
            info!("Using Redis storage: {}", config.redis_url);
            Ok(Arc::new(RedisTreeRepository::open(&config.redis_url, &config.key_prefix)?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ComposerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile { file, trace } => {
            let tree = load_tree_from_yaml(&file.to_string_lossy())?;
            let compiled = compile(&tree);
            if trace {
                println!("{}", serde_json::to_string_pretty(&compiled.expanded)?);
            } else {
                println!("{}", compiled.document);
            }
            if !compiled.is_clean() {
                warn!("Compiled with {} warning(s)", compiled.warnings.len());
            }
        }

        Commands::Run { file, system, dry_run } => {
            let tree = load_tree_from_yaml(&file.to_string_lossy())?;
            let compiled = compile(&tree);
            let system = system.unwrap_or_else(|| config.execution.system_instruction.clone());
            let request = ExecutionRequest::from_compiled(&compiled, system);

            let executor: Box<dyn Executor> = if dry_run {
                Box::new(DryRunExecutor)
            } else {
                Box::new(ChatCompletionExecutor::from_config(&config.execution)?)
            };
            info!("Executing with {}", executor.name());
            let response = executor.execute(request).await?;
            println!("{}", response);
        }

        Commands::Save { file, name, id } => {
            let repository = open_repository(&config.storage)?;
            let mut store = TreeStore::new_with_storage(repository, Arc::new(UuidAllocator));
            if let Some(id) = id {
                store.load(&id).await?;
            }
            store.set_root(load_tree_from_yaml(&file.to_string_lossy())?);
            let tree_id = store.save(&name).await?;
            println!("{}", tree_id);
        }

        Commands::Load { id, out } => {
            let repository = open_repository(&config.storage)?;
            let mut store = TreeStore::new_with_storage(repository, Arc::new(UuidAllocator));
            let root = store.load(&id).await?;
            match out {
                Some(path) => {
                    write_tree(&path, &root)?;
                    info!("Wrote tree {} to {}", id, path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&*root)?),
            }
        }

        Commands::List => {
            let repository = open_repository(&config.storage)?;
            let mut store = TreeStore::new_with_storage(repository, Arc::new(UuidAllocator));
            for tree in store.list().await? {
                println!("{}\t{}", tree.id, tree.name);
            }
        }

        Commands::Delete { id } => {
            let repository = open_repository(&config.storage)?;
            let mut store = TreeStore::new_with_storage(repository, Arc::new(UuidAllocator));
            store.delete(&id).await?;
            info!("Deleted tree {}", id);
        }
    }

    Ok(())
}
