//! wgconf CLI - WireGuard interface and peer management
//!
//! Provisions peers against an existing server interface file, creates new
//! interface files, removes peers, and inspects configurations. Peer
//! documents are printed on stdout unless `--out` is given; logs go to
//! stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{Args as ClapArgs, CommandFactory, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use wgconf::config::{DEFAULT_KEEPALIVE, DEFAULT_PORT};
use wgconf::keys::DEFAULT_KEYGEN_TIMEOUT;
use wgconf::provision::load_document;
use wgconf::{
    CommitOrder, InterfaceSpec, KeyTool, NativeKeys, PeerDestination, PeerRequest, PeerSelector,
    Provisioner, ProvisionerConfig, WgConfError, WgTool,
};

/// wgconf - WireGuard configuration and peer provisioning
#[derive(Parser, Debug)]
#[command(name = "wgconf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the `wg` binary used for key generation
    #[arg(long, global = true, default_value = "wg")]
    wg: PathBuf,

    /// Generate keys in-process instead of calling `wg`
    #[arg(long, global = true)]
    native_keys: bool,

    /// Seconds to wait for each `wg` invocation
    #[arg(long, global = true, default_value_t = DEFAULT_KEYGEN_TIMEOUT.as_secs())]
    keygen_timeout: u64,

    /// Which artifact add-peer writes first
    #[arg(long, global = true, value_enum, default_value_t = OrderArg::PeerFirst)]
    commit_order: OrderArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OrderArg {
    PeerFirst,
    ServerFirst,
}

impl From<OrderArg> for CommitOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::PeerFirst => CommitOrder::PeerFirst,
            OrderArg::ServerFirst => CommitOrder::ServerFirst,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a peer to a server interface and print the peer's configuration
    AddPeer(AddPeerArgs),
    /// Create a new interface configuration file
    Init(InitArgs),
    /// Remove one peer from an interface configuration
    RemovePeer(RemovePeerArgs),
    /// Parse a configuration and print it back normalized
    Show {
        /// Interface configuration file name
        #[arg(long)]
        ifc_cfg: PathBuf,

        /// Print as JSON instead of WireGuard format
        #[arg(long)]
        json: bool,
    },
    /// Print the public key of an interface
    Pubkey {
        /// Interface configuration file name
        #[arg(long)]
        ifc_cfg: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
struct AddPeerArgs {
    /// Interface configuration file name
    #[arg(long)]
    ifc_cfg: PathBuf,

    /// Networks to allow on the server
    #[arg(long)]
    srv_allow: Vec<String>,

    /// Networks to allow on the peer
    #[arg(long)]
    peer_allow: Vec<String>,

    /// Peer private key to use; generated when omitted
    #[arg(long)]
    peer_priv_key: Option<String>,

    /// Server listen address and port as reachable by the peer
    #[arg(long)]
    endpoint: Option<String>,

    /// Keepalive interval for the peer entry on the server
    #[arg(long, default_value_t = DEFAULT_KEEPALIVE)]
    keepalive: u16,

    /// Optional name for the peer
    #[arg(long)]
    name: Option<String>,

    /// Tunnel address for the peer, without prefix
    #[arg(long)]
    address: String,

    /// Tunnel network in CIDR form
    #[arg(long)]
    network: String,

    /// Port for the peer to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    listen: u16,

    /// Write the peer configuration here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct InitArgs {
    /// Interface configuration file to create
    #[arg(long)]
    ifc_cfg: PathBuf,

    /// Interface address in CIDR form
    #[arg(long)]
    address: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    listen: u16,

    /// Private key to use; generated when omitted
    #[arg(long)]
    priv_key: Option<String>,

    #[arg(long)]
    dns: Vec<String>,

    #[arg(long)]
    table: Option<String>,

    #[arg(long, default_value_t = 0)]
    mtu: i32,

    /// Commands written verbatim as PreUp/PostUp/PreDown/PostDown
    #[arg(long)]
    pre_up: Option<String>,
    #[arg(long)]
    post_up: Option<String>,
    #[arg(long)]
    pre_down: Option<String>,
    #[arg(long)]
    post_down: Option<String>,

    #[arg(long)]
    name: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct RemovePeerArgs {
    /// Interface configuration file name
    #[arg(long)]
    ifc_cfg: PathBuf,

    #[command(flatten)]
    selector: SelectorArgs,
}

/// Exactly one way of picking the peer
#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
struct SelectorArgs {
    /// Public key of the peer to remove
    #[arg(long)]
    public_key: Option<String>,

    /// Name of the peer to remove
    #[arg(long)]
    name: Option<String>,
}

impl SelectorArgs {
    fn into_selector(self) -> Option<PeerSelector> {
        match (self.public_key, self.name) {
            (Some(key), _) => Some(PeerSelector::PublicKey(key)),
            (None, Some(name)) => Some(PeerSelector::Name(name)),
            (None, None) => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<(), WgConfError> {
    let keys: Box<dyn KeyTool> = if args.native_keys {
        Box::new(NativeKeys)
    } else {
        Box::new(WgTool::new(&args.wg, Duration::from_secs(args.keygen_timeout)))
    };
    let provisioner = Provisioner::new(
        keys,
        ProvisionerConfig {
            commit_order: args.commit_order.into(),
        },
    );

    match args.command {
        Command::AddPeer(add) => add_peer(&provisioner, add).await,
        Command::Init(init) => {
            let spec = InterfaceSpec {
                address: init.address,
                listen_port: init.listen,
                private_key: init.priv_key,
                dns_servers: init.dns,
                routing_table: init.table,
                mtu: init.mtu,
                pre_up: init.pre_up,
                post_up: init.post_up,
                pre_down: init.pre_down,
                post_down: init.post_down,
                name: init.name,
            };
            let created = provisioner.init_interface(&init.ifc_cfg, spec).await?;
            println!("{}", created.public_key);
            Ok(())
        }
        Command::RemovePeer(remove) => {
            let Some(selector) = remove.selector.into_selector() else {
                Args::command()
                    .error(
                        ErrorKind::MissingRequiredArgument,
                        "remove-peer needs --public-key or --name",
                    )
                    .exit();
            };
            let removed = provisioner.remove_peer(&remove.ifc_cfg, &selector)?;
            println!("{}", removed.public_key);
            Ok(())
        }
        Command::Show { ifc_cfg, json } => {
            let document = load_document(&ifc_cfg)?;
            if json {
                let out = serde_json::to_string_pretty(&document)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                println!("{}", out);
            } else {
                print!("{}", document.serialize()?);
            }
            Ok(())
        }
        Command::Pubkey { ifc_cfg } => {
            println!("{}", provisioner.public_key(&ifc_cfg).await?);
            Ok(())
        }
    }
}

async fn add_peer(provisioner: &Provisioner, add: AddPeerArgs) -> Result<(), WgConfError> {
    tracing::info!("Adding peer {} to {}", add.address, add.ifc_cfg.display());

    let mut request = PeerRequest::new(&add.ifc_cfg, add.address, add.network);
    request.server_allow = add.srv_allow;
    request.peer_allow = add.peer_allow;
    request.endpoint = add.endpoint;
    request.peer_private_key = add.peer_priv_key;
    request.keepalive = add.keepalive;
    request.name = add.name;
    request.peer_listen_port = add.listen;
    request.destination = match add.out {
        Some(path) => PeerDestination::File(path),
        None => PeerDestination::Caller,
    };

    let provisioned = provisioner.provision_peer(&request).await?;
    if request.destination == PeerDestination::Caller {
        print!("{}", provisioned.peer_text);
    }
    Ok(())
}
