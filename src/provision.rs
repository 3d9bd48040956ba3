//! Peer provisioning and interface file management
//!
//! Provisioning a peer produces two linked documents: the server interface
//! file gains a `[Peer]` entry for the new peer, and a standalone interface
//! document is built for the peer itself, pointing back at the server.
//!
//! All work is staged in memory first: the server file is loaded, every key
//! is obtained, and both documents are built and serialized before anything
//! is written. Only then are the artifacts committed, in the order chosen by
//! [`CommitOrder`]. Server file writes go through a temporary file in the
//! same directory followed by a rename, so a failed write never truncates
//! the existing configuration.
//!
//! There is no locking. Concurrent invocations against the same interface
//! file race, and callers that may run concurrently must serialize
//! themselves (e.g. with an external lock file).

use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use ipnet::IpNet;
use tempfile::NamedTempFile;

use crate::config::{label_for, InterfaceDocument, PeerEntry, DEFAULT_KEEPALIVE, DEFAULT_PORT};
use crate::error::ProvisionError;
use crate::keys::KeyTool;

/// Which artifact is written first once everything is staged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitOrder {
    /// Emit the peer document, then update the server file.
    ///
    /// A failure emitting the peer document leaves the server untouched.
    #[default]
    PeerFirst,
    /// Update the server file, then emit the peer document
    ServerFirst,
}

/// Provisioner settings
#[derive(Debug, Clone, Default)]
pub struct ProvisionerConfig {
    pub commit_order: CommitOrder,
}

/// Where the new peer's own document goes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PeerDestination {
    /// Returned to the caller only
    #[default]
    Caller,
    /// Written to this path, replacing any existing file
    File(PathBuf),
}

/// Inputs for [`Provisioner::provision_peer`]
#[derive(Debug, Clone)]
pub struct PeerRequest {
    /// Server interface file to extend
    pub server_config: PathBuf,
    /// Tunnel address of the new peer, without prefix (e.g. `10.0.0.2`)
    pub peer_address: String,
    /// Tunnel network in CIDR form (e.g. `10.0.0.0/24`)
    pub network: String,
    /// Extra networks the server routes to the peer
    pub server_allow: Vec<String>,
    /// Extra networks the peer routes to the server
    pub peer_allow: Vec<String>,
    /// Server endpoint as seen by the peer (`host:port`)
    pub endpoint: Option<String>,
    /// Use this private key instead of generating one
    pub peer_private_key: Option<String>,
    pub keepalive: u16,
    /// Human-readable peer name
    pub name: Option<String>,
    pub peer_listen_port: u16,
    pub destination: PeerDestination,
}

impl PeerRequest {
    pub fn new(
        server_config: impl Into<PathBuf>,
        peer_address: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            server_config: server_config.into(),
            peer_address: peer_address.into(),
            network: network.into(),
            server_allow: Vec::new(),
            peer_allow: Vec::new(),
            endpoint: None,
            peer_private_key: None,
            keepalive: DEFAULT_KEEPALIVE,
            name: None,
            peer_listen_port: DEFAULT_PORT,
            destination: PeerDestination::Caller,
        }
    }
}

/// Result of a successful provisioning run
#[derive(Debug, Clone)]
pub struct Provisioned {
    /// Server document as written back to disk
    pub server: InterfaceDocument,
    /// The new peer's own interface document
    pub peer: InterfaceDocument,
    /// Serialized peer document
    pub peer_text: String,
    /// Public key of the new peer
    pub peer_public_key: String,
}

/// Inputs for [`Provisioner::init_interface`]
#[derive(Debug, Clone, Default)]
pub struct InterfaceSpec {
    pub address: String,
    pub listen_port: u16,
    /// Use this private key instead of generating one
    pub private_key: Option<String>,
    pub dns_servers: Vec<String>,
    pub routing_table: Option<String>,
    pub mtu: i32,
    pub pre_up: Option<String>,
    pub post_up: Option<String>,
    pub pre_down: Option<String>,
    pub post_down: Option<String>,
    pub name: Option<String>,
}

/// A freshly created interface file
#[derive(Debug, Clone)]
pub struct Initialized {
    pub document: InterfaceDocument,
    pub public_key: String,
}

/// How to pick the peer for [`Provisioner::remove_peer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerSelector {
    PublicKey(String),
    Name(String),
}

impl PeerSelector {
    fn matches(&self, peer: &PeerEntry) -> bool {
        match self {
            Self::PublicKey(key) => peer.public_key == *key,
            Self::Name(name) => peer.name() == Some(name.as_str()),
        }
    }
}

impl fmt::Display for PeerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicKey(key) => write!(f, "public key {}", key),
            Self::Name(name) => write!(f, "name {}", name),
        }
    }
}

/// Orchestrates key generation and document updates
pub struct Provisioner {
    keys: Box<dyn KeyTool>,
    config: ProvisionerConfig,
}

impl Provisioner {
    pub fn new(keys: Box<dyn KeyTool>, config: ProvisionerConfig) -> Self {
        Self { keys, config }
    }

    /// Add a new peer to a server interface file and build the peer's document
    pub async fn provision_peer(&self, request: &PeerRequest) -> Result<Provisioned, ProvisionError> {
        // Stage: load and validate the server document
        let mut server = load_document(&request.server_config)?;
        server.validate()?;
        let prefix_len = network_prefix(&request.network)?;

        // Stage: keys
        let peer_private_key = match request.peer_private_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                tracing::debug!("No peer private key supplied, generating one");
                self.keys.generate_key().await?
            }
        };
        let peer_public_key = self.keys.derive_public_key(&peer_private_key).await?;
        let server_public_key = self.keys.derive_public_key(&server.private_key).await?;

        let label = request.name.as_deref().filter(|n| !n.is_empty()).map(label_for);

        // Stage: server side entry
        let mut entry = PeerEntry::new(peer_public_key.clone());
        entry.label = label.clone();
        entry.allowed_ips.push(format!("{}/32", request.peer_address));
        entry.allowed_ips.extend(request.server_allow.iter().cloned());
        entry.persistent_keepalive_seconds = request.keepalive;
        server.peers.push(entry);

        // Stage: the peer's own document
        let mut peer = InterfaceDocument::new(
            format!("{}/{}", request.peer_address, prefix_len),
            peer_private_key,
        );
        peer.label = label;
        peer.listen_port = request.peer_listen_port;

        let mut upstream = PeerEntry::new(server_public_key);
        upstream.endpoint = request.endpoint.clone().filter(|e| !e.is_empty());
        upstream.allowed_ips.push(request.network.clone());
        upstream.allowed_ips.extend(request.peer_allow.iter().cloned());
        peer.peers.push(upstream);

        let server_text = server.serialize()?;
        let peer_text = peer.serialize()?;

        // Commit
        match self.config.commit_order {
            CommitOrder::PeerFirst => {
                emit_peer(&request.destination, &peer_text)?;
                write_document(&request.server_config, &server_text)?;
            }
            CommitOrder::ServerFirst => {
                write_document(&request.server_config, &server_text)?;
                emit_peer(&request.destination, &peer_text)?;
            }
        }

        tracing::info!(
            "Added peer {} to {} ({} peers)",
            peer_public_key,
            request.server_config.display(),
            server.peers.len()
        );

        Ok(Provisioned {
            server,
            peer,
            peer_text,
            peer_public_key,
        })
    }

    /// Create a new interface file; refuses to overwrite an existing one
    pub async fn init_interface(
        &self,
        path: &Path,
        spec: InterfaceSpec,
    ) -> Result<Initialized, ProvisionError> {
        if path.exists() {
            return Err(ProvisionError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        let private_key = match spec.private_key {
            Some(key) if !key.is_empty() => key,
            _ => self.keys.generate_key().await?,
        };
        let public_key = self.keys.derive_public_key(&private_key).await?;

        let document = InterfaceDocument {
            label: spec.name.as_deref().filter(|n| !n.is_empty()).map(label_for),
            address: spec.address,
            listen_port: spec.listen_port,
            private_key,
            dns_servers: spec.dns_servers,
            routing_table: spec.routing_table,
            mtu: spec.mtu,
            pre_up: spec.pre_up,
            post_up: spec.post_up,
            pre_down: spec.pre_down,
            post_down: spec.post_down,
            peers: Vec::new(),
        };

        create_document(path, &document.serialize()?)?;
        tracing::info!("Created interface {} at {}", document.address, path.display());

        Ok(Initialized {
            document,
            public_key,
        })
    }

    /// Remove exactly one peer from an interface file
    pub fn remove_peer(&self, path: &Path, selector: &PeerSelector) -> Result<PeerEntry, ProvisionError> {
        let mut document = load_document(path)?;

        let matching: Vec<usize> = document
            .peers
            .iter()
            .enumerate()
            .filter(|(_, p)| selector.matches(p))
            .map(|(idx, _)| idx)
            .collect();
        let removed = match matching.as_slice() {
            [] => {
                return Err(ProvisionError::PeerNotFound {
                    selector: selector.to_string(),
                })
            }
            [idx] => document.peers.remove(*idx),
            many => {
                return Err(ProvisionError::AmbiguousPeer {
                    selector: selector.to_string(),
                    count: many.len(),
                })
            }
        };

        write_document(path, &document.serialize()?)?;
        tracing::info!("Removed peer {} from {}", removed.public_key, path.display());
        Ok(removed)
    }

    /// Public key of the interface described by a file
    pub async fn public_key(&self, path: &Path) -> Result<String, ProvisionError> {
        let document = load_document(path)?;
        document.validate()?;
        Ok(self.keys.derive_public_key(&document.private_key).await?)
    }
}

/// Read and parse an interface file.
///
/// Anything that is not a readable regular file (missing, a directory,
/// permission denied) is reported as [`ProvisionError::NotFound`].
pub fn load_document(path: &Path) -> Result<InterfaceDocument, ProvisionError> {
    let not_found = || ProvisionError::NotFound {
        path: path.to_path_buf(),
    };
    let unreadable = |e: std::io::Error| match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => not_found(),
        _ => ProvisionError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    };

    let meta = std::fs::metadata(path).map_err(unreadable)?;
    if !meta.is_file() {
        return Err(not_found());
    }
    let content = std::fs::read_to_string(path).map_err(unreadable)?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(InterfaceDocument::parse(&content)?)
}

/// Replace `path` with `text` via a temporary file and rename.
///
/// An existing file keeps its permissions; new files are created owner-only.
pub fn write_document(path: &Path, text: &str) -> Result<(), ProvisionError> {
    let tmp = stage(path, text)?;
    if let Ok(meta) = std::fs::metadata(path) {
        std::fs::set_permissions(tmp.path(), meta.permissions()).map_err(|e| io_error(path, e))?;
    }
    tmp.persist(path).map_err(|e| io_error(path, e.error))?;
    tracing::debug!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}

/// Create `path` with `text`, failing if it already exists.
///
/// The existence check and the rename are a single step, so a file created
/// concurrently by someone else is never replaced.
pub fn create_document(path: &Path, text: &str) -> Result<(), ProvisionError> {
    let tmp = stage(path, text)?;
    tmp.persist_noclobber(path).map_err(|e| match e.error.kind() {
        ErrorKind::AlreadyExists => ProvisionError::AlreadyExists {
            path: path.to_path_buf(),
        },
        _ => io_error(path, e.error),
    })?;
    tracing::debug!("Created {} ({} bytes)", path.display(), text.len());
    Ok(())
}

/// Write `text` to a synced temporary file next to `path`
fn stage(path: &Path, text: &str) -> Result<NamedTempFile, ProvisionError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_error(path, e))?;
    tmp.write_all(text.as_bytes()).map_err(|e| io_error(path, e))?;
    tmp.as_file().sync_all().map_err(|e| io_error(path, e))?;
    Ok(tmp)
}

fn io_error(path: &Path, source: std::io::Error) -> ProvisionError {
    ProvisionError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn emit_peer(destination: &PeerDestination, text: &str) -> Result<(), ProvisionError> {
    match destination {
        PeerDestination::Caller => Ok(()),
        PeerDestination::File(path) => {
            write_document(path, text)?;
            tracing::info!("Wrote peer configuration to {}", path.display());
            Ok(())
        }
    }
}

/// Prefix length of a CIDR network such as `10.0.0.0/24`
fn network_prefix(network: &str) -> Result<u8, ProvisionError> {
    network
        .trim()
        .parse::<IpNet>()
        .map(|net| net.prefix_len())
        .map_err(|_| ProvisionError::InvalidNetwork {
            value: network.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::KeygenError;
    use crate::keys::NativeKeys;

    const SERVER_PRIVATE: &str = "UOvtcWdILFwjb1UnsnK+a9lcqYvNTmtPv+fvqIVOz3w=";

    /// Deterministic key tool that counts generate calls
    #[derive(Default)]
    struct FakeKeys {
        generated: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl KeyTool for FakeKeys {
        async fn generate_key(&self) -> Result<String, KeygenError> {
            let n = self.generated.fetch_add(1, Ordering::SeqCst);
            Ok(format!("generated-private-{}", n))
        }

        async fn derive_public_key(&self, private_key: &str) -> Result<String, KeygenError> {
            Ok(format!("pub-of-{}", private_key))
        }
    }

    struct BrokenKeys;

    #[async_trait]
    impl KeyTool for BrokenKeys {
        async fn generate_key(&self) -> Result<String, KeygenError> {
            Err(KeygenError::EmptyOutput {
                command: "wg genkey".to_string(),
            })
        }

        async fn derive_public_key(&self, _private_key: &str) -> Result<String, KeygenError> {
            Err(KeygenError::InvalidKey)
        }
    }

    fn server_file(dir: &Path) -> PathBuf {
        let path = dir.join("wg0.conf");
        let mut doc = InterfaceDocument::new("10.0.0.1/24", SERVER_PRIVATE);
        doc.listen_port = 51820;
        std::fs::write(&path, doc.serialize().unwrap()).unwrap();
        path
    }

    fn request(path: &Path) -> PeerRequest {
        let mut request = PeerRequest::new(path, "10.0.0.2", "10.0.0.0/24");
        request.endpoint = Some("vpn.example.com:51820".to_string());
        request.keepalive = 30;
        request
    }

    fn provisioner(keys: impl KeyTool + 'static) -> Provisioner {
        Provisioner::new(Box::new(keys), ProvisionerConfig::default())
    }

    #[tokio::test]
    async fn test_provision_peer_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());

        let result = provisioner(NativeKeys).provision_peer(&request(&path)).await.unwrap();

        // Server side, as persisted
        let server = load_document(&path).unwrap();
        assert_eq!(server, result.server);
        assert_eq!(server.peers.len(), 1);
        let entry = &server.peers[0];
        assert_eq!(entry.allowed_ips, vec!["10.0.0.2/32"]);
        assert!(!entry.public_key.is_empty());
        assert_eq!(entry.public_key, result.peer_public_key);
        assert_eq!(entry.persistent_keepalive_seconds, 30);
        assert!(entry.endpoint.is_none());

        // Peer side
        let peer = &result.peer;
        assert_eq!(peer.address, "10.0.0.2/24");
        assert_eq!(peer.listen_port, DEFAULT_PORT);
        assert_eq!(NativeKeys.derive(&peer.private_key).unwrap(), entry.public_key);
        assert_eq!(peer.peers.len(), 1);
        let upstream = &peer.peers[0];
        assert_eq!(upstream.allowed_ips, vec!["10.0.0.0/24"]);
        assert_eq!(upstream.endpoint.as_deref(), Some("vpn.example.com:51820"));
        assert_eq!(upstream.public_key, NativeKeys.derive(SERVER_PRIVATE).unwrap());
        assert_eq!(upstream.persistent_keepalive_seconds, 0);

        assert_eq!(InterfaceDocument::parse(&result.peer_text).unwrap(), result.peer);
    }

    #[tokio::test]
    async fn test_reprovision_appends_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        let provisioner = provisioner(FakeKeys::default());

        let mut req = request(&path);
        req.peer_private_key = Some("fixed-private".to_string());

        provisioner.provision_peer(&req).await.unwrap();
        let second = provisioner.provision_peer(&req).await.unwrap();

        assert_eq!(second.server.peers.len(), 2);
        assert_eq!(second.server.peers[0], second.server.peers[1]);
        assert_eq!(load_document(&path).unwrap().peers.len(), 2);
    }

    #[tokio::test]
    async fn test_supplied_key_skips_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        let keys = FakeKeys::default();
        let generated = keys.generated.clone();

        let mut req = request(&path);
        req.peer_private_key = Some("supplied-private".to_string());
        let result = provisioner(keys).provision_peer(&req).await.unwrap();

        assert_eq!(generated.load(Ordering::SeqCst), 0);
        assert_eq!(result.peer.private_key, "supplied-private");
        assert_eq!(result.server.peers[0].public_key, "pub-of-supplied-private");
        assert_eq!(result.peer.peers[0].public_key, format!("pub-of-{}", SERVER_PRIVATE));
    }

    #[tokio::test]
    async fn test_allow_lists_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());

        let mut req = request(&path);
        req.server_allow = vec!["192.168.50.0/24".to_string()];
        req.peer_allow = vec!["172.16.0.0/12".to_string(), "10.8.0.0/16".to_string()];
        req.name = Some("alice".to_string());
        req.peer_listen_port = 41000;

        let result = provisioner(FakeKeys::default()).provision_peer(&req).await.unwrap();

        let entry = &load_document(&path).unwrap().peers[0];
        assert_eq!(entry.allowed_ips, vec!["10.0.0.2/32", "192.168.50.0/24"]);
        assert_eq!(entry.name(), Some("alice"));

        assert_eq!(result.peer.listen_port, 41000);
        assert_eq!(result.peer.label.as_deref(), Some("Name = alice"));
        assert_eq!(
            result.peer.peers[0].allowed_ips,
            vec!["10.0.0.0/24", "172.16.0.0/12", "10.8.0.0/16"]
        );
    }

    #[tokio::test]
    async fn test_missing_server_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = provisioner(FakeKeys::default())
            .provision_peer(&request(&dir.path().join("absent.conf")))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_directory_as_server_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = provisioner(FakeKeys::default())
            .provision_peer(&request(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::NotFound { .. }));
        assert!(matches!(load_document(dir.path()), Err(ProvisionError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_server_config() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores file modes
        if std::fs::read_to_string(&path).is_ok() {
            return;
        }
        let err = provisioner(FakeKeys::default())
            .provision_peer(&request(&path))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_malformed_server_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wg0.conf");
        std::fs::write(&path, "[Interface]\nEndpoint = 1.2.3.4:51820\n").unwrap();

        let err = provisioner(FakeKeys::default())
            .provision_peer(&request(&path))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_invalid_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        let mut req = request(&path);
        req.network = "10.0.0.0".to_string();

        let err = provisioner(FakeKeys::default()).provision_peer(&req).await.unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidNetwork { .. }));
    }

    #[tokio::test]
    async fn test_keygen_failure_leaves_server_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        let before = std::fs::read_to_string(&path).unwrap();

        let err = provisioner(BrokenKeys).provision_peer(&request(&path)).await.unwrap_err();
        assert!(matches!(err, ProvisionError::KeygenFailed(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_peer_first_commit_protects_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        let before = std::fs::read_to_string(&path).unwrap();

        let mut req = request(&path);
        req.destination = PeerDestination::File(dir.path().join("missing-dir").join("peer.conf"));

        let err = provisioner(FakeKeys::default()).provision_peer(&req).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Io { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_server_first_commit_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());

        let mut req = request(&path);
        req.destination = PeerDestination::File(dir.path().join("missing-dir").join("peer.conf"));

        let provisioner = Provisioner::new(
            Box::new(FakeKeys::default()),
            ProvisionerConfig {
                commit_order: CommitOrder::ServerFirst,
            },
        );
        assert!(provisioner.provision_peer(&req).await.is_err());
        // Server already committed when the peer write failed
        assert_eq!(load_document(&path).unwrap().peers.len(), 1);
    }

    #[tokio::test]
    async fn test_peer_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        let peer_path = dir.path().join("peer.conf");

        let mut req = request(&path);
        req.destination = PeerDestination::File(peer_path.clone());
        let result = provisioner(FakeKeys::default()).provision_peer(&req).await.unwrap();

        assert_eq!(std::fs::read_to_string(&peer_path).unwrap(), result.peer_text);
    }

    #[tokio::test]
    async fn test_init_interface() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wg1.conf");
        let provisioner = provisioner(FakeKeys::default());

        let spec = InterfaceSpec {
            address: "10.9.0.1/24".to_string(),
            listen_port: 51821,
            post_up: Some("iptables -A FORWARD -i wg1 -j ACCEPT".to_string()),
            name: Some("office".to_string()),
            ..Default::default()
        };
        let created = provisioner.init_interface(&path, spec.clone()).await.unwrap();
        assert_eq!(created.public_key, "pub-of-generated-private-0");
        assert_eq!(load_document(&path).unwrap(), created.document);

        let err = provisioner.init_interface(&path, spec).await.unwrap_err();
        assert!(matches!(err, ProvisionError::AlreadyExists { .. }));
    }

    #[test]
    fn test_create_document_never_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wg1.conf");
        std::fs::write(&path, "created elsewhere\n").unwrap();

        let err = create_document(&path, "[Interface]\n").unwrap_err();
        assert!(matches!(err, ProvisionError::AlreadyExists { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "created elsewhere\n");

        let fresh = dir.path().join("wg2.conf");
        create_document(&fresh, "[Interface]\n").unwrap();
        assert_eq!(std::fs::read_to_string(&fresh).unwrap(), "[Interface]\n");
        // no temporary files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_remove_peer() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        let provisioner = provisioner(FakeKeys::default());

        for name in ["alice", "bob", "bob"] {
            let mut req = request(&path);
            req.name = Some(name.to_string());
            provisioner.provision_peer(&req).await.unwrap();
        }

        let removed = provisioner
            .remove_peer(&path, &PeerSelector::Name("alice".to_string()))
            .unwrap();
        assert_eq!(removed.name(), Some("alice"));
        assert_eq!(load_document(&path).unwrap().peers.len(), 2);

        let err = provisioner
            .remove_peer(&path, &PeerSelector::Name("bob".to_string()))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::AmbiguousPeer { count: 2, .. }));

        let bob_key = load_document(&path).unwrap().peers[1].public_key.clone();
        provisioner
            .remove_peer(&path, &PeerSelector::PublicKey(bob_key))
            .unwrap();
        assert_eq!(load_document(&path).unwrap().peers.len(), 1);

        let err = provisioner
            .remove_peer(&path, &PeerSelector::Name("carol".to_string()))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::PeerNotFound { .. }));
    }

    #[tokio::test]
    async fn test_remove_ambiguous_peer_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        let provisioner = provisioner(FakeKeys::default());

        let mut req = request(&path);
        req.peer_private_key = Some("shared-private".to_string());
        for _ in 0..3 {
            provisioner.provision_peer(&req).await.unwrap();
        }
        let before = std::fs::read_to_string(&path).unwrap();

        let err = provisioner
            .remove_peer(&path, &PeerSelector::PublicKey("pub-of-shared-private".to_string()))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::AmbiguousPeer { count: 3, .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_public_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = server_file(dir.path());
        let key = provisioner(NativeKeys).public_key(&path).await.unwrap();
        assert_eq!(key, NativeKeys.derive(SERVER_PRIVATE).unwrap());
    }
}
