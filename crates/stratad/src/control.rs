//! Operator commands — thin wrappers over the control RPCs of one node.

use clap::Subcommand;
use strata_auth::Credentials;
use strata_control::AuthRpcClient;
use strata_control::rpc::{
    self, GenericArgs, GenericReply, HealListArgs, HealListReply, HealObjectArgs, ServiceArgs,
    ServiceReply, ServiceSignal,
};
use strata_storage::gateway::MAX_LIST_KEYS;

#[derive(Subcommand)]
pub enum ControlCommand {
    /// Inspect and repair object replicas.
    Heal {
        #[command(subcommand)]
        command: HealCommand,
    },
    /// Report status, or restart / stop every node of the cluster.
    Service {
        /// One of: status, restart, stop.
        signal: ServiceSignal,
    },
    /// Wake the node's background heal loop.
    Wake,
}

#[derive(Subcommand)]
pub enum HealCommand {
    /// List objects in a bucket that need healing.
    List {
        bucket: String,
        #[arg(long, default_value = "")]
        prefix: String,
        /// Start listing strictly after this name.
        #[arg(long, default_value = "")]
        marker: String,
        #[arg(long, default_value = "")]
        delimiter: String,
        #[arg(long, default_value_t = MAX_LIST_KEYS)]
        max_keys: usize,
    },
    /// Heal a single object.
    Object { bucket: String, object: String },
    /// Repair format metadata on the node's disks.
    Disks,
}

/// Run one operator command against `server` and print the outcome.
pub async fn run(server: String, credentials: Credentials, command: ControlCommand) -> anyhow::Result<()> {
    let client = AuthRpcClient::new(server, credentials);

    match command {
        ControlCommand::Heal {
            command:
                HealCommand::List {
                    bucket,
                    prefix,
                    marker,
                    delimiter,
                    max_keys,
                },
        } => {
            let args = HealListArgs {
                token: String::new(),
                bucket,
                prefix,
                marker,
                delimiter,
                max_keys,
            };
            let reply: HealListReply = client.invoke(rpc::LIST_HEAL_TARGETS, args).await?;
            print!("{}", render_heal_list(&reply));
        }
        ControlCommand::Heal {
            command: HealCommand::Object { bucket, object },
        } => {
            let args = HealObjectArgs {
                token: String::new(),
                bucket: bucket.clone(),
                object: object.clone(),
            };
            let _: GenericReply = client.invoke(rpc::HEAL_OBJECT, args).await?;
            println!("healed {bucket}/{object}");
        }
        ControlCommand::Heal {
            command: HealCommand::Disks,
        } => {
            let _: GenericReply = client
                .invoke(rpc::REPAIR_DISK_METADATA, GenericArgs::default())
                .await?;
            println!("disk metadata repaired on {}", client.addr());
        }
        ControlCommand::Service { signal } => {
            let args = ServiceArgs {
                token: String::new(),
                remote_hop: true,
                signal,
            };
            let reply: ServiceReply = client.invoke(rpc::SERVICE_SIGNAL, args).await?;
            match reply.storage_info {
                Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                None => println!("{signal} sent to every node"),
            }
        }
        ControlCommand::Wake => {
            let _: GenericReply = client.invoke(rpc::TRY_INIT, GenericArgs::default()).await?;
            println!("heal loop woken on {}", client.addr());
        }
    }

    Ok(())
}

fn render_heal_list(reply: &HealListReply) -> String {
    let mut out = String::new();
    for object in &reply.objects {
        out.push_str(object);
        out.push('\n');
    }
    if reply.is_truncated {
        out.push_str(&format!("(truncated, continue with --marker {})\n", reply.next_marker));
    }
    out
}
