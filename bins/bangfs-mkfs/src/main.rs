use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use bangfs_kv::{FileKvStore, KvStore, RiakKvStore};
use bangfs_types::ROOT_INODE;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Backend {
    File,
    Riak,
}

/// Create a BangFS filesystem: writes the root inode into the configured
/// namespace. Refuses if a filesystem already exists there.
#[derive(Parser, Debug)]
#[command(name = "bangfs-mkfs", version, about)]
struct Args {
    /// Backend holding the filesystem state.
    #[arg(long, value_enum, default_value_t = Backend::Riak)]
    backend: Backend,

    /// Namespace scoping the metadata and chunk buckets.
    #[arg(short, long, default_value = "default")]
    namespace: String,

    /// Base URL of the Riak HTTP interface.
    #[arg(long, default_value = "http://127.0.0.1:8098")]
    riak_url: String,
}

async fn open_backend(args: &Args) -> anyhow::Result<Arc<dyn KvStore>> {
    Ok(match args.backend {
        Backend::File => Arc::new(FileKvStore::new(&args.namespace).await?),
        Backend::Riak => Arc::new(RiakKvStore::new(&args.riak_url, &args.namespace)?),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let kv = open_backend(&args).await?;
    kv.init_backend().await?;

    let (root, _) = kv.get_metadata(ROOT_INODE).await?;
    tracing::info!(
        backend = ?args.backend,
        namespace = %args.namespace,
        "filesystem created"
    );
    tracing::debug!("root inode:\n{}", root.dump(ROOT_INODE));
    Ok(())
}
