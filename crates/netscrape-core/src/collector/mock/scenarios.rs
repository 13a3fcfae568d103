//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` network statistics for
//! exercising the stat source and the scraper end to end.

use super::filesystem::MockFs;

/// `/proc/net/dev` with loopback and two ethernet interfaces.
///
/// `eth0` carries round numbers so scrape results are easy to assert on.
pub const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  123456      789    0    0    0     0          0         0   123456      789    0    0    0     0       0          0
  eth0:    2000      200    2    0    0     0          0         0     1000      100    0    1    0     0       0          0
  eth1: 9876543     5678    1    3    0     0          0        10 87654321     4321    4    5    0     0       0          0
";

/// `/proc/net/tcp`: one listener, two established sockets, one in TIME_WAIT.
pub const NET_TCP: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 12345 1 0000000000000000 100 0 0 10 0
   1: 0100007F:1F90 0100007F:C350 01 00000000:00000000 00:00000000 00000000  1000        0 23456 1 0000000000000000 20 4 30 10 -1
   2: 0F02000A:0016 0202000A:D2F4 01 00000000:00000000 02:0000A3D1 00000000     0        0 34567 4 0000000000000000 20 4 31 10 -1
   3: 0F02000A:9C40 22D8B85D:01BB 06 00000000:00000000 03:00000F5A 00000000     0        0 0 3 0000000000000000
";

/// `/proc/net/tcp6`: one wildcard listener.
pub const NET_TCP6: &str = "\
  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000000000000000000000000000:0016 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 45678 1 0000000000000000 100 0 0 10 0
";

/// `/proc/net/snmp` with IP, ICMP, TCP and UDP tables.
pub const NET_SNMP: &str = "\
Ip: Forwarding DefaultTTL InReceives InHdrErrors InAddrErrors ForwDatagrams InUnknownProtos InDiscards InDelivers OutRequests OutDiscards OutNoRoutes ReasmTimeout ReasmReqds ReasmOKs ReasmFails FragOKs FragFails FragCreates
Ip: 1 64 1234567 0 0 0 0 0 1234000 1100000 12 0 0 0 0 0 0 0 0
Icmp: InMsgs InErrors InCsumErrors InDestUnreachs OutMsgs OutErrors OutDestUnreachs
Icmp: 45 0 0 40 50 0 48
IcmpMsg: InType3 OutType3
IcmpMsg: 40 48
Tcp: RtoAlgorithm RtoMin RtoMax MaxConn ActiveOpens PassiveOpens AttemptFails EstabResets CurrEstab InSegs OutSegs RetransSegs InErrs OutRsts InCsumErrors
Tcp: 1 200 120000 -1 5000 3000 10 20 42 900000 850000 150 0 300 0
Udp: InDatagrams NoPorts InErrors OutDatagrams RcvbufErrors SndbufErrors InCsumErrors IgnoredMulti MemErrors
Udp: 5000 12 3 4000 1 2 0 0 0
UdpLite: InDatagrams NoPorts InErrors OutDatagrams RcvbufErrors SndbufErrors InCsumErrors IgnoredMulti MemErrors
UdpLite: 0 0 0 0 0 0 0 0 0
";

/// `/proc/stat` boot time of the mock host, in seconds since the epoch.
pub const BOOT_TIME: u64 = 1_700_000_000;

impl MockFs {
    /// Creates a typical Linux host with the netfilter conntrack module loaded.
    pub fn typical_host() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/proc/stat",
            format!(
                "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 10000 500 3000 80000 1000 200 100 0 0 0
intr 1000000 50 0 0 0
ctxt 500000
btime {BOOT_TIME}
processes 10000
procs_running 2
procs_blocked 0
"
            ),
        );
        fs.add_file("/proc/sys/kernel/hostname", "web-01\n");

        fs.add_file("/proc/net/dev", NET_DEV);
        fs.add_file("/proc/net/tcp", NET_TCP);
        fs.add_file("/proc/net/tcp6", NET_TCP6);
        fs.add_file("/proc/net/snmp", NET_SNMP);

        fs.add_file("/proc/sys/net/netfilter/nf_conntrack_count", "42\n");
        fs.add_file("/proc/sys/net/netfilter/nf_conntrack_max", "262144\n");

        fs
    }

    /// Creates a host without the netfilter conntrack subsystem.
    pub fn host_without_conntrack() -> Self {
        let mut fs = Self::typical_host();
        fs.remove_dir_all("/proc/sys/net/netfilter");
        fs
    }

    /// Creates a host with IPv6 disabled (no `/proc/net/tcp6`).
    pub fn host_without_ipv6() -> Self {
        let mut fs = Self::typical_host();
        fs.remove_file("/proc/net/tcp6");
        fs
    }
}
