use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single DNS SRV answer for a peer's federation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvTarget {
    /// Host name of the federation endpoint.
    pub target: String,
    pub port: u16,
    #[serde(default)]
    pub priority: u16,
    #[serde(default)]
    pub weight: u16,
}

impl SrvTarget {
    pub fn new(target: impl Into<String>, port: u16) -> Self {
        Self {
            target: target.into(),
            port,
            priority: 0,
            weight: 0,
        }
    }

    /// Returns `host:port`, with the trailing root dot of a DNS name removed.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.target.trim_end_matches('.'), self.port)
    }
}

/// A resolved, trust-anchored federation peer.
///
/// Records are immutable once cached. A record is only usable when it
/// carries both a public key and at least one SRV target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationRecord {
    pub domain: String,
    pub created: DateTime<Utc>,
    /// Base64-encoded PEM public key of the peer.
    pub public_key: String,
    pub srv: Vec<SrvTarget>,
}

impl FederationRecord {
    pub fn new(domain: impl Into<String>, public_key: impl Into<String>, srv: Vec<SrvTarget>) -> Self {
        Self {
            domain: domain.into(),
            created: Utc::now(),
            public_key: public_key.into(),
            srv,
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.public_key.trim().is_empty() && !self.srv.is_empty()
    }

    /// The SRV target relay calls are sent to.
    pub fn primary_target(&self) -> Option<&SrvTarget> {
        self.srv.first()
    }
}

/// A candidate peer as listed by the public federation directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub domain: String,
    #[serde(rename = "publicKey", alias = "publickey", default)]
    pub public_key: String,
}

/// Body returned by the directory for a domain lookup.
///
/// Older directory deployments group entries per license, producing a list
/// of lists; newer ones return a flat list. Both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DirectoryResponse {
    Flat(Vec<DirectoryEntry>),
    Grouped(Vec<Vec<DirectoryEntry>>),
}

impl DirectoryResponse {
    pub fn into_entries(self) -> Vec<DirectoryEntry> {
        match self {
            Self::Flat(entries) => entries,
            Self::Grouped(groups) => groups.into_iter().flatten().collect(),
        }
    }
}

/// Body returned by the directory's public key endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryPublicKey {
    pub publickey: String,
}

/// Location of the public federation directory, as served by the config
/// service under the `federation` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationDirectoryConfig {
    /// Host (and optional port) of the directory service.
    #[serde(rename = "publicFederationService", alias = "publicFederationSerivce")]
    pub public_federation_service: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_without_key_or_srv_is_unusable() {
        let srv = vec![SrvTarget::new("fed.peer.example.", 443)];
        assert!(FederationRecord::new("peer.example", "a2V5", srv.clone()).is_usable());
        assert!(!FederationRecord::new("peer.example", "", srv).is_usable());
        assert!(!FederationRecord::new("peer.example", "a2V5", vec![]).is_usable());
    }

    #[test]
    fn authority_strips_root_dot() {
        assert_eq!(
            SrvTarget::new("fed.peer.example.", 8443).authority(),
            "fed.peer.example:8443"
        );
    }

    #[test]
    fn directory_response_accepts_flat_and_grouped_bodies() {
        let flat: DirectoryResponse =
            serde_json::from_str(r#"[{"domain":"a.example","publicKey":"k1"}]"#).unwrap();
        assert_eq!(flat.into_entries().len(), 1);

        let grouped: DirectoryResponse = serde_json::from_str(
            r#"[[{"domain":"a.example","publicKey":"k1"}],[{"domain":"b.example","publicKey":"k2"}]]"#,
        )
        .unwrap();
        let entries = grouped.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].domain, "b.example");
        assert_eq!(entries[1].public_key, "k2");
    }

    #[test]
    fn directory_config_reads_legacy_field_name() {
        let cfg: FederationDirectoryConfig =
            serde_json::from_str(r#"{"publicFederationSerivce":"dir.example"}"#).unwrap();
        assert_eq!(cfg.public_federation_service, "dir.example");
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = FederationRecord::new("peer.example", "k", vec![SrvTarget::new("h", 1)]);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("publicKey").is_some());
        assert_eq!(json["srv"][0]["target"], "h");
    }
}
