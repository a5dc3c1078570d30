use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Netmask for a prefix length, e.g. 24 -> 0xffffff00.
pub fn mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len.min(32)))
    }
}

/// Parsed IPv4 CIDR. Host bits in the address are kept as written;
/// `network()` masks them off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    addr: u32,
    prefix_len: u8,
}

impl Ipv4Cidr {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, String> {
        if prefix_len > 32 {
            return Err(format!("prefix length {} out of range 0..32", prefix_len));
        }
        Ok(Self {
            addr: u32::from(addr),
            prefix_len,
        })
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn network(&self) -> u32 {
        self.addr & mask(self.prefix_len)
    }

    pub fn broadcast(&self) -> u32 {
        self.network() | !mask(self.prefix_len)
    }

    /// First address handed out. network+1 for ordinary subnets; on a /31
    /// both addresses are hosts (RFC 3021) and a /32 is its own host.
    pub fn first_usable(&self) -> u32 {
        match self.prefix_len {
            31 | 32 => self.network(),
            _ => self.network() + 1,
        }
    }

    /// Last address a host may hold. Excludes broadcast except on /31 and /32.
    pub fn last_usable(&self) -> u32 {
        match self.prefix_len {
            31 | 32 => self.broadcast(),
            _ => self.broadcast() - 1,
        }
    }

    /// Whether `ip` may be assigned to a host in this subnet.
    pub fn is_usable_host(&self, ip: Ipv4Addr) -> bool {
        let ip = u32::from(ip);
        ip >= self.first_usable() && ip <= self.last_usable()
    }

    /// Numeric range overlap of `[network, broadcast]`.
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.network() <= other.broadcast() && other.network() <= self.broadcast()
    }

    /// Pool string the server expects: `<first-usable>-<broadcast>`.
    pub fn pool_range(&self) -> String {
        format!(
            "{}-{}",
            Ipv4Addr::from(self.first_usable()),
            Ipv4Addr::from(self.broadcast())
        )
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| format!("invalid CIDR '{}': missing prefix length", s))?;

        if addr.contains(':') {
            return Err(format!("invalid CIDR '{}': not an IPv4 network", s));
        }
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("invalid CIDR '{}': bad address", s))?;

        if len.is_empty() || !len.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("invalid CIDR '{}': bad prefix length", s));
        }
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| format!("invalid CIDR '{}': bad prefix length", s))?;

        Self::new(addr, prefix_len).map_err(|e| format!("invalid CIDR '{}': {}", s, e))
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_cidr(self.network(), self.prefix_len))
    }
}

pub fn format_cidr(network: u32, prefix_len: u8) -> String {
    format!("{}/{}", Ipv4Addr::from(network), prefix_len)
}

/// Next address, carrying across octets. None past 255.255.255.255.
pub fn successor(ip: Ipv4Addr) -> Option<Ipv4Addr> {
    u32::from(ip).checked_add(1).map(Ipv4Addr::from)
}

/// Validate a hostname as a sequence of DNS labels.
/// Labels are 1-63 chars of alphanumerics and hyphens, not starting or ending with a hyphen.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    hostname.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
