use serde::{Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;

/// Placeholder the capture process sends when a frame carries no IP layer.
const NO_IP_PLACEHOLDER: &str = "N/A";

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("payload does not match the packet record schema: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WifiSubtype {
    Beacon,
    ProbeReq,
    Data,
    Eapol,
}

impl WifiSubtype {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "BEACON" => Some(WifiSubtype::Beacon),
            "PROBE_REQ" => Some(WifiSubtype::ProbeReq),
            "DATA" => Some(WifiSubtype::Data),
            "EAPOL" => Some(WifiSubtype::Eapol),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WifiSubtype::Beacon => "BEACON",
            WifiSubtype::ProbeReq => "PROBE_REQ",
            WifiSubtype::Data => "DATA",
            WifiSubtype::Eapol => "EAPOL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Tcp,
    Udp,
    Arp,
    Icmp,
    Icmpv6,
    Wifi(Option<WifiSubtype>),
    /// Anything the dashboard has no dedicated handling for, with the raw tag.
    Other(String),
}

impl PacketKind {
    /// Maps the wire `type` tag (and `subtype`, for 802.11 frames) to a kind.
    pub fn from_wire(tag: &str, subtype: &str) -> Self {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("TCP") {
            PacketKind::Tcp
        } else if tag.eq_ignore_ascii_case("UDP") {
            PacketKind::Udp
        } else if tag.eq_ignore_ascii_case("ARP") {
            PacketKind::Arp
        } else if tag.eq_ignore_ascii_case("ICMP") {
            PacketKind::Icmp
        } else if tag.eq_ignore_ascii_case("ICMPv6") {
            PacketKind::Icmpv6
        } else if ["802.11", "WiFi", "WLAN"].iter().any(|t| tag.eq_ignore_ascii_case(t)) {
            PacketKind::Wifi(WifiSubtype::parse(subtype))
        } else {
            PacketKind::Other(tag.to_string())
        }
    }

    /// Canonical kind name used for protocol breakdowns.
    pub fn name(&self) -> &'static str {
        match self {
            PacketKind::Tcp => "TCP",
            PacketKind::Udp => "UDP",
            PacketKind::Arp => "ARP",
            PacketKind::Icmp => "ICMP",
            PacketKind::Icmpv6 => "ICMPv6",
            PacketKind::Wifi(_) => "WiFi",
            PacketKind::Other(_) => "Other",
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Other(raw) if !raw.is_empty() => write!(f, "{}", raw),
            kind => write!(f, "{}", kind.name()),
        }
    }
}

/// One decoded packet as reported by the capture process.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketDescriptor {
    pub kind: PacketKind,
    pub src_ip: String,
    pub dest_ip: String,
    pub src_port: u16,
    pub dest_port: u16,
    pub src_mac: String,
    pub dest_mac: String,
    pub size: u64,
    pub tcp_flags: u8,
    pub ssid: String,
    pub channel: u32,
    pub signal_dbm: i32,
    pub payload_hex: String,
    pub is_monitor: bool,
}

impl PacketDescriptor {
    /// An all-defaults descriptor of the given kind and size.
    pub fn new(kind: PacketKind, size: u64) -> Self {
        Self {
            kind,
            src_ip: String::new(),
            dest_ip: String::new(),
            src_port: 0,
            dest_port: 0,
            src_mac: String::new(),
            dest_mac: String::new(),
            size,
            tcp_flags: 0,
            ssid: String::new(),
            channel: 0,
            signal_dbm: 0,
            payload_hex: String::new(),
            is_monitor: false,
        }
    }

    pub fn from_slice(payload: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(payload)?;
        let record: WireRecord = serde_json::from_str(text)?;
        Ok(record.into())
    }
}

/// JSON shape emitted by the capture process. Only `type` and `size` are required.
#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(rename = "type")]
    kind: String,
    size: u64,
    #[serde(default, deserialize_with = "nullable")]
    subtype: String,
    #[serde(default, deserialize_with = "nullable")]
    src_ip: String,
    #[serde(default, deserialize_with = "nullable")]
    dest_ip: String,
    #[serde(default, deserialize_with = "nullable")]
    src_port: u16,
    #[serde(default, deserialize_with = "nullable")]
    dest_port: u16,
    #[serde(default, deserialize_with = "nullable")]
    src_mac: String,
    #[serde(default, deserialize_with = "nullable")]
    dest_mac: String,
    #[serde(default, deserialize_with = "nullable")]
    tcp_flags: u8,
    #[serde(default, deserialize_with = "nullable")]
    ssid: String,
    #[serde(default, deserialize_with = "nullable")]
    channel: u32,
    #[serde(default, deserialize_with = "nullable")]
    signal_dbm: i32,
    #[serde(default, deserialize_with = "nullable")]
    payload_hex: String,
    #[serde(default, deserialize_with = "nullable")]
    is_monitor: u8,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn normalize_ip(ip: String) -> String {
    if ip.trim() == NO_IP_PLACEHOLDER {
        String::new()
    } else {
        ip
    }
}

impl From<WireRecord> for PacketDescriptor {
    fn from(record: WireRecord) -> Self {
        Self {
            kind: PacketKind::from_wire(&record.kind, &record.subtype),
            src_ip: normalize_ip(record.src_ip),
            dest_ip: normalize_ip(record.dest_ip),
            src_port: record.src_port,
            dest_port: record.dest_port,
            src_mac: record.src_mac,
            dest_mac: record.dest_mac,
            size: record.size,
            tcp_flags: record.tcp_flags,
            ssid: record.ssid,
            channel: record.channel,
            signal_dbm: record.signal_dbm,
            payload_hex: record.payload_hex,
            is_monitor: record.is_monitor != 0,
        }
    }
}
