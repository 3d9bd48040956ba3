//! Deterministic serialization of an [`InterfaceDocument`] back to text

use crate::error::ValidationError;

use super::document::{InterfaceDocument, PeerEntry};

/// Separator used when writing the DNS list.
///
/// DNS is read comma-separated but written dot-joined, matching the files
/// existing deployments already carry. Multi-server lists therefore do not
/// survive a round trip.
pub const DNS_JOIN: &str = ".";

/// Separator used when writing AllowedIPs
pub const ALLOWED_IPS_JOIN: &str = ",";

impl InterfaceDocument {
    /// Check required fields without producing output
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.address.is_empty() {
            return Err(ValidationError::MissingField {
                section: "[Interface]".to_string(),
                field: "Address",
            });
        }
        if self.private_key.is_empty() {
            return Err(ValidationError::MissingField {
                section: "[Interface]".to_string(),
                field: "PrivateKey",
            });
        }
        for (idx, peer) in self.peers.iter().enumerate() {
            if peer.public_key.is_empty() {
                return Err(ValidationError::MissingField {
                    section: format!("[Peer] #{}", idx + 1),
                    field: "PublicKey",
                });
            }
        }
        Ok(())
    }

    /// Render the full configuration text.
    ///
    /// Validation runs before anything is rendered, so a failing document
    /// never yields partial output.
    pub fn serialize(&self) -> Result<String, ValidationError> {
        self.validate()?;

        let mut buf = String::from("[Interface]\n");
        push_label(&mut buf, self.label.as_deref());
        push_directive(&mut buf, "Address", &self.address);
        if self.listen_port > 0 {
            push_directive(&mut buf, "ListenPort", &self.listen_port.to_string());
        }
        push_directive(&mut buf, "PrivateKey", &self.private_key);
        if !self.dns_servers.is_empty() {
            push_directive(&mut buf, "DNS", &self.dns_servers.join(DNS_JOIN));
        }
        push_optional(&mut buf, "Table", self.routing_table.as_deref());
        if self.mtu > 0 {
            push_directive(&mut buf, "MTU", &self.mtu.to_string());
        }
        push_optional(&mut buf, "PreUp", self.pre_up.as_deref());
        push_optional(&mut buf, "PostUp", self.post_up.as_deref());
        push_optional(&mut buf, "PreDown", self.pre_down.as_deref());
        push_optional(&mut buf, "PostDown", self.post_down.as_deref());
        buf.push('\n');

        for peer in &self.peers {
            push_peer(&mut buf, peer);
        }
        Ok(buf)
    }
}

fn push_peer(buf: &mut String, peer: &PeerEntry) {
    buf.push_str("[Peer]\n");
    push_label(buf, peer.label.as_deref());
    if !peer.allowed_ips.is_empty() {
        push_directive(buf, "AllowedIPs", &peer.allowed_ips.join(ALLOWED_IPS_JOIN));
    }
    push_optional(buf, "Endpoint", peer.endpoint.as_deref());
    push_directive(buf, "PublicKey", &peer.public_key);
    if peer.persistent_keepalive_seconds > 0 {
        push_directive(
            buf,
            "PersistentKeepalive",
            &peer.persistent_keepalive_seconds.to_string(),
        );
    }
    buf.push('\n');
}

fn push_label(buf: &mut String, label: Option<&str>) {
    let Some(label) = label.filter(|l| !l.is_empty()) else {
        return;
    };
    buf.push_str("# ");
    buf.push_str(label);
    buf.push('\n');
}

fn push_optional(buf: &mut String, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        push_directive(buf, key, value);
    }
}

fn push_directive(buf: &mut String, key: &str, value: &str) {
    buf.push_str(key);
    buf.push_str(" = ");
    buf.push_str(value);
    buf.push('\n');
}
