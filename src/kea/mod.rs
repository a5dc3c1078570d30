pub mod client;
pub mod commands;
pub mod inventory;
#[cfg(test)]
pub mod testing;

pub use client::{HttpTransport, KeaClient};
pub use inventory::{find_overlap, list_subnets, next_free_id};
