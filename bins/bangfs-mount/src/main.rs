use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use bangfs_fuse::{BangFs, FsConfig, DEFAULT_CHUNK_SIZE};
use bangfs_kv::{FileKvStore, KvStore, RiakKvStore};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Backend {
    File,
    Riak,
}

/// BangFS mount daemon: serves the filesystem rooted in the configured
/// namespace to the host's kernel bridge.
#[derive(Parser, Debug)]
#[command(name = "bangfs-mount", version, about)]
struct Args {
    /// Mount point path.
    mountpoint: String,

    /// Backend holding the filesystem state.
    #[arg(long, value_enum, default_value_t = Backend::Riak)]
    backend: Backend,

    /// Namespace scoping the metadata and chunk buckets.
    #[arg(short, long, default_value = "default")]
    namespace: String,

    /// Base URL of the Riak HTTP interface.
    #[arg(long, default_value = "http://127.0.0.1:8098")]
    riak_url: String,

    /// Chunk size in bytes. Must match the value the filesystem was
    /// written with.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: u32,

    /// Stable client identifier for ID generation (defaults to the
    /// hostname).
    #[arg(long)]
    client_id: Option<String>,
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
    let fs = BangFs::new(
        kv,
        FsConfig {
            chunk_size: args.chunk_size,
            client_id: args.client_id.clone(),
        },
    )
    .await?;
    let root = fs.root();

    tracing::info!(
        mountpoint = %args.mountpoint,
        namespace = %args.namespace,
        root = %root.ino(),
        "serving filesystem; press ctrl-c to unmount"
    );

    // The kernel bridge dispatches operations against `root` from here on;
    // its wiring is host-specific. Park until asked to shut down.
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
