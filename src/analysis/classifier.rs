use std::fmt;

use crate::capture::descriptor::{PacketDescriptor, PacketKind, WifiSubtype};
use crate::utils::formatting::format_endpoint;

const HIDDEN_SSID: &str = "<HIDDEN>";
const BROADCAST_SSID: &str = "[BROADCAST]";

/// TCP flag bits in display order. The order is fixed and does not follow bit position.
const TCP_FLAGS: [(u8, &str); 6] = [
    (0x02, "SYN"),
    (0x10, "ACK"),
    (0x01, "FIN"),
    (0x04, "RST"),
    (0x08, "PSH"),
    (0x20, "URG"),
];

/// Label used for WiFi frames without a recognized subtype.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleHint {
    Normal,
    Tcp,
    Udp,
    Beacon,
    Probe,
    Muted,
    /// Security-relevant event, rendered high-visibility.
    Alert,
}

impl StyleHint {
    pub fn is_high_visibility(&self) -> bool {
        matches!(self, StyleHint::Alert)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalHint {
    /// Wired frame, no radio measurement.
    Wired,
    /// Radio frame without a usable dBm reading.
    NotAvailable,
    Good(i32),
    Fair(i32),
    Poor(i32),
}

impl SignalHint {
    pub fn band(&self) -> &'static str {
        match self {
            SignalHint::Wired => "wired",
            SignalHint::NotAvailable => "n/a",
            SignalHint::Good(_) => "good",
            SignalHint::Fair(_) => "fair",
            SignalHint::Poor(_) => "poor",
        }
    }
}

impl fmt::Display for SignalHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalHint::Wired => write!(f, "Wired"),
            SignalHint::NotAvailable => write!(f, "-"),
            SignalHint::Good(dbm) | SignalHint::Fair(dbm) | SignalHint::Poor(dbm) => {
                write!(f, "{} dBm", dbm)
            }
        }
    }
}

/// Display attributes derived from one packet descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: String,
    pub source: String,
    pub destination: String,
    pub annotation: String,
    pub signal: SignalHint,
    pub style: StyleHint,
}

/// Key under which a packet is counted in the session statistics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregationKey {
    pub talker_id: String,
    pub protocol_label: String,
}

/// Bands a radio signal reading. Readings at or above 0 dBm are treated as absent.
pub fn signal_band(signal_dbm: i32) -> SignalHint {
    if signal_dbm >= 0 {
        SignalHint::NotAvailable
    } else if signal_dbm > -65 {
        SignalHint::Good(signal_dbm)
    } else if signal_dbm >= -80 {
        SignalHint::Fair(signal_dbm)
    } else {
        SignalHint::Poor(signal_dbm)
    }
}

pub fn decode_tcp_flags(flags: u8) -> Vec<&'static str> {
    TCP_FLAGS
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

/// Well-known UDP services, matched on either port.
pub fn udp_service(src_port: u16, dest_port: u16) -> Option<&'static str> {
    let either = |port: u16| src_port == port || dest_port == port;

    if either(53) {
        Some("DNS")
    } else if either(67) || either(68) {
        Some("DHCP")
    } else if either(443) {
        Some("QUIC")
    } else {
        None
    }
}

pub fn wifi_label(subtype: Option<WifiSubtype>) -> &'static str {
    subtype.map(|s| s.as_str()).unwrap_or(UNKNOWN_LABEL)
}

fn ssid_line(ssid: &str, channel: u32) -> String {
    match ssid {
        HIDDEN_SSID => format!("[Hidden] (Ch:{})", channel),
        BROADCAST_SSID => format!("[Searching...] (Ch:{})", channel),
        name => format!("{} (Ch:{})", name, channel),
    }
}

fn size_note(size: u64) -> String {
    format!("Size: {} bytes", size)
}

fn first_non_empty<'a>(primary: &'a str, fallback: &'a str) -> &'a str {
    if primary.is_empty() {
        fallback
    } else {
        primary
    }
}

/// Derives the display attributes of a packet. Pure; missing fields degrade to
/// empty strings or zero rather than failing.
pub fn classify(packet: &PacketDescriptor) -> Classification {
    match &packet.kind {
        PacketKind::Wifi(subtype) => classify_wifi(packet, *subtype),
        PacketKind::Tcp => {
            let flags = decode_tcp_flags(packet.tcp_flags);
            let annotation = if flags.is_empty() {
                size_note(packet.size)
            } else {
                format!("[{}] {}", flags.join(","), size_note(packet.size))
            };

            Classification {
                label: packet.kind.name().to_string(),
                source: format_endpoint(&packet.src_ip, packet.src_port),
                destination: format_endpoint(&packet.dest_ip, packet.dest_port),
                annotation,
                signal: SignalHint::Wired,
                style: StyleHint::Tcp,
            }
        }
        PacketKind::Udp => {
            let annotation = match udp_service(packet.src_port, packet.dest_port) {
                Some(service) => service.to_string(),
                None => format!("UDP {}", size_note(packet.size)),
            };

            Classification {
                label: packet.kind.name().to_string(),
                source: format_endpoint(&packet.src_ip, packet.src_port),
                destination: format_endpoint(&packet.dest_ip, packet.dest_port),
                annotation,
                signal: SignalHint::Wired,
                style: StyleHint::Udp,
            }
        }
        PacketKind::Arp => Classification {
            label: packet.kind.name().to_string(),
            source: packet.src_mac.clone(),
            destination: packet.dest_mac.clone(),
            annotation: "ARP request/reply".to_string(),
            signal: SignalHint::Wired,
            style: StyleHint::Normal,
        },
        PacketKind::Icmp | PacketKind::Icmpv6 => Classification {
            label: packet.kind.name().to_string(),
            source: packet.src_ip.clone(),
            destination: packet.dest_ip.clone(),
            annotation: size_note(packet.size),
            signal: SignalHint::Wired,
            style: StyleHint::Normal,
        },
        PacketKind::Other(raw) => Classification {
            label: packet.kind.name().to_string(),
            source: first_non_empty(&packet.src_ip, &packet.src_mac).to_string(),
            destination: first_non_empty(&packet.dest_ip, &packet.dest_mac).to_string(),
            annotation: format!(
                "{} | {}",
                first_non_empty(raw, packet.kind.name()),
                size_note(packet.size)
            ),
            signal: SignalHint::Wired,
            style: StyleHint::Normal,
        },
    }
}

fn classify_wifi(packet: &PacketDescriptor, subtype: Option<WifiSubtype>) -> Classification {
    // Signal and SSID line come first; subtype styling only picks between them.
    let signal = signal_band(packet.signal_dbm);
    let ssid = ssid_line(&packet.ssid, packet.channel);

    let (annotation, style) = match subtype {
        Some(WifiSubtype::Beacon) => (ssid, StyleHint::Beacon),
        Some(WifiSubtype::ProbeReq) => (ssid, StyleHint::Probe),
        Some(WifiSubtype::Data) => (String::new(), StyleHint::Muted),
        Some(WifiSubtype::Eapol) => ("KEY EXCHANGE".to_string(), StyleHint::Alert),
        None if packet.ssid.is_empty() => (String::new(), StyleHint::Normal),
        None => (ssid, StyleHint::Normal),
    };

    Classification {
        label: wifi_label(subtype).to_string(),
        source: packet.src_mac.clone(),
        destination: packet.dest_mac.clone(),
        annotation,
        signal,
        style,
    }
}

/// Talker and protocol label a packet is counted under.
pub fn aggregation_key(packet: &PacketDescriptor) -> AggregationKey {
    let (talker_id, protocol_label) = match &packet.kind {
        PacketKind::Wifi(subtype) => (packet.src_mac.as_str(), wifi_label(*subtype)),
        PacketKind::Arp => (packet.src_mac.as_str(), packet.kind.name()),
        kind => (first_non_empty(&packet.src_ip, &packet.src_mac), kind.name()),
    };

    AggregationKey {
        talker_id: talker_id.to_string(),
        protocol_label: protocol_label.to_string(),
    }
}
