//! Length-framed JSON front end for the Azrael world-state service.
//!
//! Not a production RPC surface: no TLS, no auth, no load shedding.
//! It exists so `Clerk` can be driven end-to-end over a real socket
//! instead of only from in-process tests — the stepping engine, the
//! asset web server's HTTP surface, and any viewer/demo client all
//! stay out of scope here.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use azrael_clerk::{Clerk, ClerkConfig, InMemoryPhysicsQueue};
use azrael_dibbler::Dibbler;
use azrael_igor::Igor;
use azrael_protocol::{Command, Response};
use azrael_store::{persistence, Store, StoreConfig};
use bytes::Bytes;
use clap::Parser;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "azrael-server", about = "Azrael world-state service")]
struct Args {
    /// Address to bind the length-framed JSON socket to.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Directory snapshots are written to and loaded from.
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Load a snapshot from `data_dir` on startup, if one exists.
    #[arg(long, default_value_t = false)]
    restore: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let store_config = StoreConfig {
        data_dir: args.data_dir.clone(),
        ..StoreConfig::default()
    };
    let store = Arc::new(Store::new(store_config.clone()));

    if args.restore {
        match persistence::load(&store, &store_config) {
            Ok(true) => info!(data_dir = %args.data_dir.display(), "restored snapshot"),
            Ok(false) => info!(data_dir = %args.data_dir.display(), "no snapshot found, starting fresh"),
            Err(err) => error!(%err, "failed to restore snapshot, starting fresh"),
        }
    }

    let igor = Arc::new(Igor::new());
    let dibbler = Arc::new(Dibbler::new());
    let queue = Arc::new(InMemoryPhysicsQueue::new());
    let clerk = Arc::new(Clerk::new(store.clone(), igor, dibbler, queue, ClerkConfig::default()));

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %args.bind, "azrael-server listening");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted.context("accepting connection")?;
                let clerk = clerk.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(socket, clerk).await {
                        warn!(%peer, %err, "connection closed with error");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("received shutdown signal");
                break;
            }
        }
    }

    if let Err(err) = persistence::save(&store, &store_config) {
        error!(%err, "failed to save snapshot on shutdown");
    }

    Ok(())
}

/// One connection, one length-delimited frame stream. Each frame in
/// is a `Command`, each frame out is a `Response`; a frame that fails
/// to decode gets `Response::decode_error()` rather than dropping the
/// connection, since one bad request shouldn't cost a client its
/// whole session.
async fn handle_connection(socket: TcpStream, clerk: Arc<Clerk>) -> Result<()> {
    let mut framed = Framed::new(socket, LengthDelimitedCodec::new());

    while let Some(frame) = framed.next().await {
        let frame = frame.context("reading frame")?;
        let response = match serde_json::from_slice::<Command>(&frame) {
            Ok(command) => clerk.dispatch(command),
            Err(err) => {
                warn!(%err, "malformed command frame");
                Response::decode_error()
            }
        };
        let bytes = serde_json::to_vec(&response).context("encoding response")?;
        framed.send(Bytes::from(bytes)).await.context("writing frame")?;
    }

    Ok(())
}
