use std::fmt;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use ringlet_codec::header::DEFAULT_TTL;
use ringlet_core::{HashAlgorithm, NodeId, OverlayLinkType, MAX_ID_LEN};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::error::NodeError;

/// Overlay-wide settings, read-only once the node is built.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    pub overlay_name: String,
    /// Hex encoded local node id; generated when absent.
    pub node_id: Option<String>,
    pub local_address: SocketAddr,
    #[serde(deserialize_with = "deserialize_list")]
    pub bootstrap_addresses: Vec<SocketAddr>,
    #[serde(deserialize_with = "deserialize_list")]
    pub link_types: Vec<OverlayLinkType>,
    pub node_id_length: usize,
    pub resource_id_length: usize,
    pub hash_algorithm: HashAlgorithm,
    pub initial_ttl: u8,
    pub max_message_size: usize,
    /// Neighbors each locally stored resource is replicated to.
    pub replicas: usize,
    pub is_overlay_initiator: bool,
    pub verify_message_signatures: bool,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            overlay_name: "ringlet.local".to_string(),
            node_id: None,
            local_address: SocketAddr::from(([127, 0, 0, 1], 6084)),
            bootstrap_addresses: Vec::new(),
            link_types: vec![OverlayLinkType::TlsTcpFhNoIce],
            node_id_length: 16,
            resource_id_length: 16,
            hash_algorithm: HashAlgorithm::Sha256,
            initial_ttl: DEFAULT_TTL,
            max_message_size: 5_000_000,
            replicas: 1,
            is_overlay_initiator: false,
            verify_message_signatures: true,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Accepts a comma/semicolon separated string or a sequence, parsing each item.
fn deserialize_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    struct ListVisitor<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for ListVisitor<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        type Value = Vec<T>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a sequence of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            value
                .split(|c| c == ',' || c == ';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().map_err(E::custom))
                .collect()
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: de::SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(element) = seq.next_element::<String>()? {
                vec.push(element.trim().parse().map_err(de::Error::custom)?);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(ListVisitor(PhantomData))
}

fn link_names(links: &[OverlayLinkType]) -> Vec<String> {
    links.iter().map(|l| l.name().to_string()).collect()
}

impl OverlayConfig {
    /// Loads defaults, then `path` (TOML) if given, then `RINGLET_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("overlay_name", defaults.overlay_name.clone())?
            .set_default("node_id", None::<String>)?
            .set_default("local_address", defaults.local_address.to_string())?
            .set_default("bootstrap_addresses", Vec::<String>::new())?
            .set_default("link_types", link_names(&defaults.link_types))?
            .set_default("node_id_length", defaults.node_id_length as i64)?
            .set_default("resource_id_length", defaults.resource_id_length as i64)?
            .set_default("hash_algorithm", "sha256")?
            .set_default("initial_ttl", i64::from(defaults.initial_ttl))?
            .set_default("max_message_size", defaults.max_message_size as i64)?
            .set_default("replicas", defaults.replicas as i64)?
            .set_default("is_overlay_initiator", defaults.is_overlay_initiator)?
            .set_default("verify_message_signatures", defaults.verify_message_signatures)?
            .set_default("request_timeout", "5s")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(Environment::with_prefix("RINGLET").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    /// Checks the settings the node cannot run without.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.node_id_length == 0 || self.node_id_length > MAX_ID_LEN {
            return Err(NodeError::Config(format!(
                "node id length {} out of range",
                self.node_id_length
            )));
        }
        if self.resource_id_length == 0
            || self.resource_id_length > self.hash_algorithm.output_len()
        {
            return Err(NodeError::Config(format!(
                "resource id length {} does not fit {:?} digests",
                self.resource_id_length, self.hash_algorithm
            )));
        }
        if self.link_types.is_empty() {
            return Err(NodeError::Config("no overlay link types configured".into()));
        }
        if !self.is_overlay_initiator && self.bootstrap_addresses.is_empty() {
            return Err(NodeError::Config(
                "a joining node needs at least one bootstrap address".into(),
            ));
        }
        Ok(())
    }

    /// Truncated hash of the overlay name carried in every header.
    pub fn overlay_hash(&self) -> u32 {
        let digest = HashAlgorithm::Sha256.digest(self.overlay_name.as_bytes());
        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    /// The configured node id, if any, checked against the overlay id length.
    pub fn parsed_node_id(&self) -> Result<Option<NodeId>, NodeError> {
        let Some(raw) = &self.node_id else {
            return Ok(None);
        };
        let bytes = hex::decode(raw.trim())
            .map_err(|err| NodeError::Config(format!("node id is not hex: {err}")))?;
        if bytes.len() != self.node_id_length {
            return Err(NodeError::Config(format!(
                "node id has {} bytes, overlay uses {}",
                bytes.len(),
                self.node_id_length
            )));
        }
        Ok(Some(NodeId::new(bytes)?))
    }
}
