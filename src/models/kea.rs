use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::Ipv4Addr;

/// Kea control channel result codes
pub mod result_code {
    pub const SUCCESS: i64 = 0;
    /// Command succeeded but found nothing, e.g. subnet4-list on an empty server
    pub const EMPTY: i64 = 3;
}

/// Service name every command of this tool is addressed to
pub const DHCP4: &str = "dhcp4";

/// CommandEnvelope is the JSON object posted to the control agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command: String,
    pub service: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl CommandEnvelope {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            service: vec![DHCP4.to_string()],
            arguments: None,
        }
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }
}

/// CommandResult is one element of the control agent's response array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub result: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl CommandResult {
    pub fn success(text: &str) -> Self {
        Self {
            result: result_code::SUCCESS,
            text: text.to_string(),
            arguments: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == result_code::SUCCESS
    }

    /// Look up a named argument of the result
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.as_ref().and_then(|a| a.get(name))
    }
}

/// Subnet as reported by subnet4-list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingSubnet {
    pub id: u32,
    pub subnet: String,
}

/// Kea option-data entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionData {
    pub name: String,
    pub data: String,
}

/// Address pool inside a subnet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Pool {
    pub pool: String,
    pub option_data: Vec<OptionData>,
}

/// Subnet definition sent with subnet4-add
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Subnet4 {
    pub id: u32,
    pub subnet: String,
    pub valid_lifetime: u32,
    pub min_valid_lifetime: u32,
    pub max_valid_lifetime: u32,
    pub pools: Vec<Pool>,
    pub option_data: Vec<OptionData>,
}

/// Host reservation sent with reservation-add
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Reservation {
    pub subnet_id: u32,
    pub ip_address: Ipv4Addr,
    pub flex_id: String,
    pub hostname: String,
}

impl Reservation {
    /// Flex-id for a device port. The surrounding single quotes are part of the value.
    pub fn flex_id(hostname: &str, port: &str) -> String {
        format!("'{}-{}'", hostname, port)
    }
}
