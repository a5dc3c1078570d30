use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Workflow describes a newly activated device as handed over by the upstream activation system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub hostname: String,
    pub vendor: String,
    pub model: String,
    /// Subnets the device serves, in provisioning order
    #[serde(alias = "subnet")]
    pub subnets: Vec<String>,
}

/// StencilPort is one port descriptor of a per-model stencil
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StencilPort {
    pub port: String,
    pub subnet: String,
    #[serde(rename = "type")]
    pub port_type: String,
    pub mask: u8,
}

/// Stencil maps port ordinals to port descriptors, ordered numerically
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Stencil {
    ports: BTreeMap<u32, StencilPort>,
}

impl Stencil {
    /// Build from the raw JSON mapping. Keys must be canonical positive decimals,
    /// so "1", "2", "10" sort as 1, 2, 10.
    pub fn from_raw(raw: HashMap<String, StencilPort>) -> Result<Self, String> {
        let mut ports = BTreeMap::new();
        for (key, port) in raw {
            let ordinal: u32 = key
                .parse()
                .map_err(|_| format!("stencil key '{}' is not a port ordinal", key))?;
            if ordinal == 0 || ordinal.to_string() != key {
                return Err(format!("stencil key '{}' is not a port ordinal", key));
            }
            ports.insert(ordinal, port);
        }
        Ok(Self { ports })
    }

    /// Ports in ascending ordinal order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &StencilPort)> {
        self.ports.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
