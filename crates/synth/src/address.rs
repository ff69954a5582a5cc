use ipnetwork::{IpNetwork, Ipv4Network};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Reachability class of a candidate address, most preferred first.
///
/// Same-host and container-internal addresses come before anything that
/// crosses a network boundary; private beats public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressClass {
    Loopback,
    ContainerBridge,
    PrivateV4,
    PrivateV6,
    OtherV6,
    /// Public IPv4 and anything unmatched
    Public,
}

impl AddressClass {
    /// Preference weight reported in logs (higher is preferred)
    pub fn weight(&self) -> u8 {
        match self {
            Self::Loopback => 10,
            Self::ContainerBridge => 9,
            Self::PrivateV4 => 8,
            Self::PrivateV6 => 7,
            Self::OtherV6 => 6,
            Self::Public => 5,
        }
    }
}

/// Picks the address the agent should use to reach an instance.
///
/// Candidates are classified (first matching rule wins: loopback, container
/// bridge network, private IPv4, private IPv6 `fc00::/7`, other IPv6,
/// fallback), sorted by class and then by canonical string form, and the
/// first one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSelector {
    bridge_network: IpNetwork,
}

impl AddressSelector {
    pub fn new(bridge_network: IpNetwork) -> Self {
        Self { bridge_network }
    }

    pub fn bridge_network(&self) -> IpNetwork {
        self.bridge_network
    }

    pub fn classify(&self, ip: IpAddr) -> AddressClass {
        if ip.is_loopback() {
            return AddressClass::Loopback;
        }
        if self.bridge_network.contains(ip) {
            return AddressClass::ContainerBridge;
        }
        match ip {
            IpAddr::V4(v4) if is_private_v4(v4) => AddressClass::PrivateV4,
            IpAddr::V6(v6) if is_private_v6(v6) => AddressClass::PrivateV6,
            IpAddr::V6(_) => AddressClass::OtherV6,
            IpAddr::V4(_) => AddressClass::Public,
        }
    }

    /// Best candidate, or `None` for an empty set
    pub fn select(&self, candidates: &[IpAddr]) -> Option<IpAddr> {
        match candidates {
            [] => None,
            [only] => Some(*only),
            _ => {
                let mut ranked: Vec<(AddressClass, String, IpAddr)> = candidates
                    .iter()
                    .map(|&ip| (self.classify(ip), ip.to_string(), ip))
                    .collect();
                ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
                ranked.first().map(|(class, text, ip)| {
                    log::trace!(
                        "Selected {text} ({class:?}, weight {}) out of {} candidates",
                        class.weight(),
                        candidates.len()
                    );
                    *ip
                })
            }
        }
    }
}

impl Default for AddressSelector {
    /// Docker's default `docker0` bridge, `172.17.0.0/16`
    fn default() -> Self {
        let docker0 = Ipv4Network::new(Ipv4Addr::new(172, 17, 0, 0), 16)
            .expect("valid docker0 prefix");
        Self::new(IpNetwork::V4(docker0))
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_private()
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    // unique local, fc00::/7
    (ip.segments()[0] & 0xfe00) == 0xfc00
}
