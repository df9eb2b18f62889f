use std::{
    fs,
    net::{Ipv4Addr, SocketAddrV4, UdpSocket},
};

/// Mountpoints hidden from the telemetry by default when they are mounted.
/// `/var/hdd.log` comes from log2ram.
pub const HIDEABLE_MOUNTPOINTS: [&str; 3] = ["/boot", "/boot/efi", "/var/hdd.log"];

pub const FIREWALL_TOOL: &str = "ufw";

// ── Data types ────────────────────────────────────────────────────────────────

/// What the installer could learn about this machine. Every probe is
/// best-effort; a missing value falls back to a placeholder.
#[derive(Debug, Clone, Default)]
pub struct HostFacts {
    pub hostname: Option<String>,
    pub local_address: Option<String>,
    pub hidden_mountpoints: Vec<String>,
    pub has_firewall: bool,
}

impl HostFacts {
    pub fn probe() -> Self {
        let facts = Self {
            hostname: sysinfo::System::host_name().filter(|h| !h.is_empty()),
            local_address: local_address(),
            hidden_mountpoints: fs::read_to_string("/proc/self/mounts")
                .map(|table| hidden_mountpoints(&table))
                .unwrap_or_default(),
            has_firewall: which::which(FIREWALL_TOOL).is_ok(),
        };
        log::debug!("host facts: {facts:?}");
        facts
    }
}

// ── Probes ────────────────────────────────────────────────────────────────────

/// First non-loopback IPv4 address on any interface. Falls back to the
/// address of the default route when interfaces cannot be listed.
fn local_address() -> Option<String> {
    let listed = match nix::ifaddrs::getifaddrs() {
        Ok(addrs) => first_ipv4(addrs.filter_map(|ifa| {
            let sin = *ifa.address?.as_sockaddr_in()?;
            Some(*SocketAddrV4::from(sin).ip())
        })),
        Err(e) => {
            log::debug!("listing interface addresses: {e}");
            None
        }
    };
    listed.or_else(routed_address).map(|ip| ip.to_string())
}

fn first_ipv4(addrs: impl IntoIterator<Item = Ipv4Addr>) -> Option<Ipv4Addr> {
    addrs
        .into_iter()
        .find(|ip| !ip.is_loopback() && !ip.is_unspecified())
}

/// Connecting a UDP socket only selects a route; nothing is sent.
fn routed_address() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
    socket.connect(("192.0.2.1", 80)).ok()?;
    match socket.local_addr().ok()?.ip() {
        std::net::IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

// ── Mount table parser ────────────────────────────────────────────────────────
//
// Each line looks like:   /dev/sda1 /boot/efi vfat rw,relatime 0 0
// Spaces inside a mountpoint are written as \040.

fn hidden_mountpoints(table: &str) -> Vec<String> {
    let mut found = Vec::new();
    for line in table.lines() {
        let Some(raw) = line.split_whitespace().nth(1) else {
            continue;
        };
        let mountpoint = raw.replace("\\040", " ");
        if HIDEABLE_MOUNTPOINTS.contains(&mountpoint.as_str()) && !found.contains(&mountpoint) {
            found.push(mountpoint);
        }
    }
    found
}
