use std::net::IpAddr;

use tracing::debug;

/// Interfaces whose address is shown in preference to any other
pub const PREFERRED_INTERFACES: &[&str] = &["en0", "WLAN"];

/// Host shown when no usable interface address is found
pub const FALLBACK_HOST: &str = "localhost";

/// Host name used in the advertised URL.
pub fn display_host() -> String {
    match local_ip_address::list_afinet_netifas() {
        Ok(interfaces) => pick_host(&interfaces),
        Err(err) => {
            debug!("Failed to list network interfaces: {}", err);
            FALLBACK_HOST.to_string()
        }
    }
}

/// Choose the address to advertise from `(interface name, address)` pairs.
///
/// The first IPv4 address of a preferred interface wins, then the first non-loopback
/// IPv4 address of any interface, then [`FALLBACK_HOST`].
pub fn pick_host(interfaces: &[(String, IpAddr)]) -> String {
    let preferred = PREFERRED_INTERFACES.iter().find_map(|wanted| {
        interfaces
            .iter()
            .find(|(name, addr)| name == wanted && addr.is_ipv4())
    });

    let any = || {
        interfaces
            .iter()
            .find(|(_, addr)| addr.is_ipv4() && !addr.is_loopback())
    };

    match preferred.or_else(any) {
        Some((name, addr)) => {
            debug!("Advertising address {} of interface {}", addr, name);
            addr.to_string()
        }
        None => FALLBACK_HOST.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn iface(name: &str, addr: IpAddr) -> (String, IpAddr) {
        (name.to_string(), addr)
    }

    #[test]
    fn test_pick_host_prefers_en0() {
        let interfaces = vec![
            iface("lo", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            iface("eth0", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))),
            iface("en0", IpAddr::V6(Ipv6Addr::LOCALHOST)),
            iface("en0", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))),
        ];
        assert_eq!(pick_host(&interfaces), "192.168.1.20");
    }

    #[test]
    fn test_pick_host_accepts_wlan() {
        let interfaces = vec![
            iface("eth0", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))),
            iface("WLAN", IpAddr::V4(Ipv4Addr::new(192, 168, 0, 7))),
        ];
        assert_eq!(pick_host(&interfaces), "192.168.0.7");
    }

    #[test]
    fn test_pick_host_falls_back_to_any_ipv4() {
        let interfaces = vec![
            iface("lo", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            iface("eth0", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))),
        ];
        assert_eq!(pick_host(&interfaces), "10.0.0.5");
    }

    #[test]
    fn test_pick_host_defaults_to_localhost() {
        assert_eq!(pick_host(&[]), FALLBACK_HOST);

        let interfaces = vec![
            iface("lo", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            iface("en0", IpAddr::V6(Ipv6Addr::LOCALHOST)),
        ];
        assert_eq!(pick_host(&interfaces), FALLBACK_HOST);
    }
}
