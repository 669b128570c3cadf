use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Transport flavours a peer can be reached over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayLinkType {
    DtlsUdpSr,
    DtlsUdpSrNoIce,
    TlsTcpFhNoIce,
}

impl OverlayLinkType {
    pub const fn code(self) -> u8 {
        match self {
            Self::DtlsUdpSr => 1,
            Self::DtlsUdpSrNoIce => 3,
            Self::TlsTcpFhNoIce => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::DtlsUdpSr),
            3 => Some(Self::DtlsUdpSrNoIce),
            4 => Some(Self::TlsTcpFhNoIce),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::DtlsUdpSr => "dtls-udp-sr",
            Self::DtlsUdpSrNoIce => "dtls-udp-sr-no-ice",
            Self::TlsTcpFhNoIce => "tls-tcp-fh-no-ice",
        }
    }
}

impl fmt::Display for OverlayLinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OverlayLinkType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dtls-udp-sr" => Ok(Self::DtlsUdpSr),
            "dtls-udp-sr-no-ice" => Ok(Self::DtlsUdpSrNoIce),
            "tls-tcp-fh-no-ice" => Ok(Self::TlsTcpFhNoIce),
            other => Err(CoreError::UnknownLinkType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OverlayLinkType;

    #[test]
    fn names_parse_back() {
        for link in [
            OverlayLinkType::DtlsUdpSr,
            OverlayLinkType::DtlsUdpSrNoIce,
            OverlayLinkType::TlsTcpFhNoIce,
        ] {
            assert_eq!(link.name().parse::<OverlayLinkType>(), Ok(link));
            assert_eq!(OverlayLinkType::from_code(link.code()), Some(link));
        }
        assert!("udp".parse::<OverlayLinkType>().is_err());
        assert_eq!(OverlayLinkType::from_code(2), None);
    }
}
