//! Connection management.
//!
//! Establishes the client handle shared by all repositories. [`connect`]
//! returns an owned [`Database`] handle for callers that manage their own
//! lifetime (tests inject fakes this way); [`init`] additionally publishes
//! the handle process-wide so application code can retrieve it with
//! [`database`]. There is no teardown API: the process lifetime owns the
//! connection.

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::event::command::CommandEvent;
use mongodb::event::EventHandler;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use once_cell::sync::OnceCell;

use crate::config::MongoConfig;
use crate::error::{Error, Result};

/// Deadline for the liveness check performed at connection time.
const PING_TIMEOUT: Duration = Duration::from_secs(10);

static SHARED: OnceCell<Database> = OnceCell::new();

/// Connects to MongoDB and verifies liveness with a bounded ping.
///
/// The URI is credential-less when the configuration has no username or
/// password. With `config.debug` enabled, every started command is mirrored
/// to `tracing::debug!` before execution.
///
/// # Errors
///
/// [`Error::Connection`] when the URI cannot be parsed, the client cannot be
/// constructed, or the ping fails or does not answer within 10 seconds.
pub async fn connect(config: &MongoConfig) -> Result<Database> {
    let uri = config.uri();
    let mut options = ClientOptions::parse(&uri)
        .await
        .map_err(|e| Error::Connection {
            message: e.to_string(),
        })?;

    if config.debug {
        options.command_event_handler = Some(EventHandler::callback(|event: CommandEvent| {
            if let CommandEvent::Started(started) = event {
                tracing::debug!(
                    database = %started.db,
                    command = %started.command,
                    "mongodb command exec"
                );
            }
        }));
    }

    let client = Client::with_options(options).map_err(|e| Error::Connection {
        message: e.to_string(),
    })?;
    let database = client.database(&config.database);

    tokio::time::timeout(PING_TIMEOUT, database.run_command(doc! { "ping": 1 }))
        .await
        .map_err(|_| Error::Connection {
            message: format!("ping timed out after {PING_TIMEOUT:?}"),
        })?
        .map_err(|e| Error::Connection {
            message: e.to_string(),
        })?;

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "connected to mongodb"
    );
    Ok(database)
}

/// Connects and publishes the process-wide shared handle.
///
/// Subsequent calls return the already-published handle without reconnecting.
pub async fn init(config: &MongoConfig) -> Result<&'static Database> {
    if let Some(database) = SHARED.get() {
        return Ok(database);
    }
    let database = connect(config).await?;
    Ok(SHARED.get_or_init(|| database))
}

/// Returns the shared handle published by [`init`], if any.
pub fn database() -> Option<&'static Database> {
    SHARED.get()
}
