use serde_json::json;

use crate::models::{CommandEnvelope, Reservation, Subnet4};

pub const LIST_COMMANDS: &str = "list-commands";
pub const SUBNET4_LIST: &str = "subnet4-list";
pub const SUBNET4_ADD: &str = "subnet4-add";
pub const SUBNET4_DEL: &str = "subnet4-del";
pub const RESERVATION_ADD: &str = "reservation-add";
pub const CONFIG_WRITE: &str = "config-write";

const READ_ONLY: &[&str] = &[
    LIST_COMMANDS,
    SUBNET4_LIST,
    "reservation-get",
    "config-get",
    "status-get",
    "version-get",
];

/// Classify a command by name. Anything not known to be read-only is treated as mutating.
pub fn is_read_only(command: &str) -> bool {
    READ_ONLY.contains(&command) || command.starts_with("list-")
}

pub fn list_commands() -> CommandEnvelope {
    CommandEnvelope::new(LIST_COMMANDS)
}

pub fn subnet4_list() -> CommandEnvelope {
    CommandEnvelope::new(SUBNET4_LIST)
}

pub fn subnet4_add(subnet: &Subnet4) -> CommandEnvelope {
    CommandEnvelope::new(SUBNET4_ADD).with_arguments(json!({ "subnet4": [subnet] }))
}

pub fn subnet4_del(id: u32) -> CommandEnvelope {
    CommandEnvelope::new(SUBNET4_DEL).with_arguments(json!({ "id": id }))
}

pub fn reservation_add(reservation: &Reservation) -> CommandEnvelope {
    CommandEnvelope::new(RESERVATION_ADD).with_arguments(json!({ "reservation": reservation }))
}

pub fn config_write() -> CommandEnvelope {
    CommandEnvelope::new(CONFIG_WRITE)
}
