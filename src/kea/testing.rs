//! In-memory stand-in for the Kea control agent, used by the unit tests.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

use crate::error::{ProvisionError, Result};
use crate::models::{result_code, CommandEnvelope, CommandResult, ExistingSubnet};

use super::client::Transport;

#[derive(Default)]
struct State {
    subnets: Vec<ExistingSubnet>,
    sent: Vec<CommandEnvelope>,
    subnet_adds: usize,
    reservation_adds: usize,
    failing_subnet_adds: Vec<usize>,
    failing_reservation_adds: Vec<usize>,
    failing_config_write: bool,
    failing_subnet_list: bool,
    unreachable_for: Vec<String>,
}

/// Clones share state, so a test keeps one handle while the client owns another
#[derive(Clone, Default)]
pub struct FakeKea {
    state: Arc<Mutex<State>>,
}

impl FakeKea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subnets(subnets: &[(u32, &str)]) -> Self {
        let kea = Self::new();
        kea.state.lock().unwrap().subnets = subnets
            .iter()
            .map(|(id, subnet)| ExistingSubnet {
                id: *id,
                subnet: subnet.to_string(),
            })
            .collect();
        kea
    }

    /// Make the nth (1-based) subnet4-add answer with result 1
    pub fn fail_subnet_add(self, nth: usize) -> Self {
        self.state.lock().unwrap().failing_subnet_adds.push(nth);
        self
    }

    /// Make the nth (1-based) reservation-add answer with result 1
    pub fn fail_reservation_add(self, nth: usize) -> Self {
        self.state.lock().unwrap().failing_reservation_adds.push(nth);
        self
    }

    pub fn fail_config_write(self) -> Self {
        self.state.lock().unwrap().failing_config_write = true;
        self
    }

    /// Make subnet4-list answer with result 1 instead of listing
    pub fn fail_subnet_list(self) -> Self {
        self.state.lock().unwrap().failing_subnet_list = true;
        self
    }

    /// Drop the connection on every request for `command`, after recording it
    pub fn fail_transport_on(self, command: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .unreachable_for
            .push(command.to_string());
        self
    }

    pub fn sent(&self) -> Vec<CommandEnvelope> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_commands(&self) -> Vec<String> {
        self.sent().into_iter().map(|e| e.command).collect()
    }

    /// Envelopes sent for one command, in order
    pub fn sent_for(&self, command: &str) -> Vec<CommandEnvelope> {
        self.sent()
            .into_iter()
            .filter(|e| e.command == command)
            .collect()
    }

    pub fn subnets(&self) -> Vec<ExistingSubnet> {
        self.state.lock().unwrap().subnets.clone()
    }
}

fn failure(text: &str) -> Vec<CommandResult> {
    vec![CommandResult {
        result: 1,
        text: text.to_string(),
        arguments: None,
    }]
}

#[async_trait]
impl Transport for FakeKea {
    async fn send(&self, envelope: &CommandEnvelope) -> Result<Vec<CommandResult>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProvisionError::Transport("fake server poisoned".to_string()))?;
        state.sent.push(envelope.clone());
        if state.unreachable_for.contains(&envelope.command) {
            return Err(ProvisionError::Transport("connection reset by peer".to_string()));
        }
        let args = envelope.arguments.clone().unwrap_or_default();

        let results = match envelope.command.as_str() {
            "list-commands" => vec![CommandResult {
                result: result_code::SUCCESS,
                text: "4 commands".to_string(),
                arguments: Some(json!([
                    "config-write",
                    "reservation-add",
                    "subnet4-add",
                    "subnet4-list"
                ])),
            }],
            "subnet4-list" if state.failing_subnet_list => failure("Unable to list subnets"),
            "subnet4-list" => {
                let code = if state.subnets.is_empty() {
                    result_code::EMPTY
                } else {
                    result_code::SUCCESS
                };
                vec![CommandResult {
                    result: code,
                    text: format!("{} IPv4 subnet(s) found", state.subnets.len()),
                    arguments: Some(json!({ "subnets": state.subnets })),
                }]
            }
            "subnet4-add" => {
                state.subnet_adds += 1;
                if state.failing_subnet_adds.contains(&state.subnet_adds) {
                    failure("subnet configuration failed")
                } else {
                    let subnet = &args["subnet4"][0];
                    let added = ExistingSubnet {
                        id: subnet["id"].as_u64().unwrap_or_default() as u32,
                        subnet: subnet["subnet"].as_str().unwrap_or_default().to_string(),
                    };
                    let text = format!("IPv4 subnet added with id {}", added.id);
                    state.subnets.push(added);
                    vec![CommandResult::success(&text)]
                }
            }
            "subnet4-del" => {
                let id = args["id"].as_u64().unwrap_or_default() as u32;
                state.subnets.retain(|s| s.id != id);
                vec![CommandResult::success("IPv4 subnet deleted")]
            }
            "reservation-add" => {
                state.reservation_adds += 1;
                if state.failing_reservation_adds.contains(&state.reservation_adds) {
                    failure("Host already exists")
                } else {
                    vec![CommandResult::success("Host added.")]
                }
            }
            "config-write" if state.failing_config_write => failure("Unable to open file"),
            "config-write" => vec![CommandResult::success("Configuration written")],
            other => failure(&format!("'{}' command not supported", other)),
        };
        Ok(results)
    }
}
