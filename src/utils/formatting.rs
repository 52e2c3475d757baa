/// Byte total as kibibytes with two decimals, e.g. `350 -> "0.34 KB"`.
pub fn format_kib(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// Shortens a talker address for the side panel, keeping `max_len` columns.
pub fn truncate_address(addr: &str, max_len: usize) -> String {
    if addr.chars().count() <= max_len || max_len < 2 {
        addr.to_string()
    } else {
        let head: String = addr.chars().take(max_len - 2).collect();
        format!("{}..", head)
    }
}

/// Joins an address and port as `ip:port`; IPv6 addresses are bracketed.
pub fn format_endpoint(ip: &str, port: u16) -> String {
    if ip.contains(':') {
        format!("[{}]:{}", ip, port)
    } else {
        format!("{}:{}", ip, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_kib() {
        assert_eq!(format_kib(0), "0.00 KB");
        assert_eq!(format_kib(350), "0.34 KB");
        assert_eq!(format_kib(1536), "1.50 KB");
        assert_eq!(format_kib(10 * 1024 * 1024), "10240.00 KB");
    }

    #[test]
    fn test_truncate_address() {
        assert_eq!(truncate_address("10.0.0.5", 18), "10.0.0.5");
        assert_eq!(truncate_address("fe80::1234:5678:9abc:def0", 18), "fe80::1234:5678:..");
        assert_eq!(truncate_address("fe80::1234:5678:..", 18).chars().count(), 18);
    }

    #[test]
    fn test_format_endpoint() {
        assert_eq!(format_endpoint("10.0.0.5", 443), "10.0.0.5:443");
        assert_eq!(format_endpoint("", 0), ":0");
        assert_eq!(format_endpoint("fe80::1", 53), "[fe80::1]:53");
    }
}
