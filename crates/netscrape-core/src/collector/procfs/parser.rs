//! Parsers for `/proc` network statistics files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

// ============ Boot Time Parser ============

/// Extracts the `btime` line from `/proc/stat`.
///
/// Unlike the other counters a missing boot time is an error: it anchors
/// every cumulative series the scraper produces.
pub fn parse_boot_time(content: &str) -> Result<u64, ParseError> {
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("btime") {
            continue;
        }
        let value = parts
            .next()
            .ok_or_else(|| ParseError::new("btime line has no value"))?;
        return value
            .parse()
            .map_err(|_| ParseError::new(format!("invalid btime value {:?}", value)));
    }

    Err(ParseError::new("missing btime line"))
}

// ============ Network Device Stats Parser ============

/// Parsed data from `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errs: u64,
    pub rx_drop: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errs: u64,
    pub tx_drop: u64,
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let mut devices = Vec::new();

    for line in content.lines() {
        // Skip header lines
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 16 {
            return Err(ParseError::new(format!(
                "interface {}: expected 16 counters, got {}",
                interface.trim(),
                values.len()
            )));
        }

        let get_val =
            |idx: usize| -> u64 { values.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        devices.push(NetDevStats {
            interface: interface.trim().to_string(),
            rx_bytes: get_val(0),
            rx_packets: get_val(1),
            rx_errs: get_val(2),
            rx_drop: get_val(3),
            tx_bytes: get_val(8),
            tx_packets: get_val(9),
            tx_errs: get_val(10),
            tx_drop: get_val(11),
        });
    }

    Ok(devices)
}

// ============ Network SNMP Parser ============

/// One protocol table from `/proc/net/snmp`, counters in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnmpTable {
    /// Table prefix without the trailing colon (`Ip`, `Tcp`, `Udp`, ...).
    pub protocol: String,
    pub counters: Vec<(String, i64)>,
}

/// Parses `/proc/net/snmp` content.
///
/// Format: Each protocol has two lines - keys and values
/// Udp: key1 key2 key3...
/// Udp: val1 val2 val3...
///
/// Values are signed: `Tcp: MaxConn` is reported as -1.
pub fn parse_net_snmp(content: &str) -> Result<Vec<SnmpTable>, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    let mut tables = Vec::new();

    let mut i = 0;
    while i + 1 < lines.len() {
        let key_parts: Vec<&str> = lines[i].split_whitespace().collect();
        let val_parts: Vec<&str> = lines[i + 1].split_whitespace().collect();

        if key_parts.is_empty() || val_parts.is_empty() || key_parts[0] != val_parts[0] {
            i += 1;
            continue;
        }

        let protocol = key_parts[0].trim_end_matches(':');
        let keys = &key_parts[1..];
        let vals = &val_parts[1..];

        if keys.len() != vals.len() {
            return Err(ParseError::new(format!(
                "{} table has {} names but {} values",
                protocol,
                keys.len(),
                vals.len()
            )));
        }

        let counters = keys
            .iter()
            .zip(vals)
            .map(|(key, val)| {
                val.parse::<i64>()
                    .map(|v| (key.to_string(), v))
                    .map_err(|_| {
                        ParseError::new(format!("invalid {}.{} value {:?}", protocol, key, val))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tables.push(SnmpTable {
            protocol: protocol.to_string(),
            counters,
        });
        i += 2;
    }

    Ok(tables)
}

// ============ TCP Socket Table Parser ============

/// One socket row from `/proc/net/tcp` or `/proc/net/tcp6`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSocketEntry {
    pub local: SocketAddr,
    pub remote: SocketAddr,
    /// Kernel state code (`st` column).
    pub state: u8,
}

/// Parses `/proc/net/tcp` or `/proc/net/tcp6` content.
///
/// Format:
///   sl  local_address rem_address   st tx_queue rx_queue ...
///    0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 ...
///
/// Addresses are hex words in host byte order, ports are big-endian hex.
pub fn parse_tcp_table(content: &str) -> Result<Vec<TcpSocketEntry>, ParseError> {
    let mut entries = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() || fields[0] == "sl" {
            continue;
        }
        if fields.len() < 4 {
            return Err(ParseError::new(format!(
                "line {}: expected at least 4 fields, got {}",
                idx + 1,
                fields.len()
            )));
        }

        let local = parse_socket_addr(fields[1]).ok_or_else(|| {
            ParseError::new(format!("line {}: invalid local address {:?}", idx + 1, fields[1]))
        })?;
        let remote = parse_socket_addr(fields[2]).ok_or_else(|| {
            ParseError::new(format!("line {}: invalid remote address {:?}", idx + 1, fields[2]))
        })?;
        let state = u8::from_str_radix(fields[3], 16).map_err(|_| {
            ParseError::new(format!("line {}: invalid state {:?}", idx + 1, fields[3]))
        })?;

        entries.push(TcpSocketEntry {
            local,
            remote,
            state,
        });
    }

    Ok(entries)
}

fn parse_socket_addr(field: &str) -> Option<SocketAddr> {
    let (addr, port) = field.split_once(':')?;
    let port = u16::from_str_radix(port, 16).ok()?;

    let ip = match addr.len() {
        8 => {
            let raw = u32::from_str_radix(addr, 16).ok()?;
            IpAddr::V4(Ipv4Addr::from(raw.to_ne_bytes()))
        }
        32 => {
            let mut octets = [0u8; 16];
            for (word, chunk) in octets.chunks_exact_mut(4).enumerate() {
                let raw = u32::from_str_radix(addr.get(word * 8..word * 8 + 8)?, 16).ok()?;
                chunk.copy_from_slice(&raw.to_ne_bytes());
            }
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return None,
    };

    Some(SocketAddr::new(ip, port))
}

/// Maps a kernel TCP state code to its conventional label.
pub fn tcp_state_label(state: u8) -> Option<&'static str> {
    let label = match state {
        0x01 => "ESTABLISHED",
        0x02 => "SYN_SENT",
        0x03 => "SYN_RECV",
        0x04 => "FIN_WAIT1",
        0x05 => "FIN_WAIT2",
        0x06 => "TIME_WAIT",
        0x07 => "CLOSE",
        0x08 => "CLOSE_WAIT",
        0x09 => "LAST_ACK",
        0x0A => "LISTEN",
        0x0B => "CLOSING",
        _ => return None,
    };
    Some(label)
}

// ============ Single Value Parser ============

/// Parses a file holding one unsigned integer, e.g. `nf_conntrack_count`.
pub fn parse_single_value(content: &str) -> Result<u64, ParseError> {
    let value = content.trim();
    value
        .parse()
        .map_err(|_| ParseError::new(format!("expected an integer, got {:?}", value)))
}
