//! Hook entry point for the MongoDB application: maps the running hook to a
//! cluster notification and dispatches it on this unit.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod hook;

use error::Error;

use std::path::PathBuf;

use clap::Parser;
use mongo_admin::MongoshInitiator;
use mongo_cluster::{BootstrapOutcome, PeerIdentity, Unit, UnitOptions};
use mongo_hook_tools::HookTools;
use mongo_resolver::ReverseDnsResolver;
use mongo_store_fs::FsStore;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the hook being run
    #[arg(long, env = "JUJU_DISPATCH_PATH")]
    dispatch_path: String,

    /// Log level
    #[arg(long, default_value_t = Level::INFO, env = "MONGO_CLUSTER_LOG_LEVEL")]
    log_level: Level,

    /// Path to the mongosh binary
    #[arg(long, default_value = "mongosh", env = "MONGO_CLUSTER_MONGOSH")]
    mongosh: PathBuf,

    /// Name of the peer relation
    #[arg(long, default_value = "cluster")]
    relation: String,

    /// Id of the relation the hook runs for
    #[arg(long, env = "JUJU_RELATION_ID")]
    relation_id: Option<String>,

    /// Unit on the other side of the relation
    #[arg(long, env = "JUJU_REMOTE_UNIT")]
    remote_unit: Option<String>,

    /// Directory for unit-local state
    #[arg(long, default_value = ".mongo-cluster", env = "MONGO_CLUSTER_STATE_DIR")]
    state_dir: PathBuf,

    /// This unit's name
    #[arg(long, env = "JUJU_UNIT_NAME")]
    unit_name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    // Hook tools use stdout, keep logs off it
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(args.log_level)
            .with_writer(std::io::stderr)
            .finish(),
    )?;

    let hook = hook::hook_name(&args.dispatch_path)?;
    let Some(notification) =
        hook::notification_for(hook, &args.relation, args.remote_unit.as_deref())?
    else {
        debug!("nothing to do for {}", hook);
        return Ok(());
    };

    let identity = PeerIdentity::new(args.unit_name.as_str());
    let mut tools = HookTools::new(identity.clone(), None);

    let relation_prefix = format!("{}:", args.relation);
    let relation_id = match args.relation_id {
        Some(id) if id.starts_with(&relation_prefix) => Some(id),
        _ => tools.relation_ids(&args.relation).await?.into_iter().next(),
    };
    if relation_id.is_none() {
        debug!("{} relation not established yet", args.relation);
    }
    tools = tools.for_relation(relation_id);

    let ctx = tools.hook_context().await?;

    let mut unit = Unit::new(UnitOptions {
        identity,
        initiator: MongoshInitiator::new(&args.mongosh, ctx.config.port),
        pod_spec_sink: tools.clone(),
        relation: tools.clone(),
        resolver: ReverseDnsResolver::new(args.relation.as_str(), tools),
        store: FsStore::new(&args.state_dir),
    });

    info!("{} on {}", notification, unit.identity());
    let report = unit.dispatch(&ctx, notification).await?;

    for outcome in &report.bootstrap {
        if let BootstrapOutcome::Initiated {
            succeeded: false, ..
        } = outcome
        {
            warn!("replica set initiation failed; not retried");
        }
    }
    if !report.deferred.is_empty() {
        info!("{} notification(s) deferred", report.deferred.len());
    }

    Ok(())
}
