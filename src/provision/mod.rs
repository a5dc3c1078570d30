mod journal;

pub use journal::{CreatedReservation, CreatedSubnet, FatalRun, RunSummary};

use std::net::Ipv4Addr;

use crate::config::Config;
use crate::error::{ProvisionError, Result};
use crate::kea::{commands, find_overlap, list_subnets, next_free_id, KeaClient};
use crate::models::{
    ExistingSubnet, OptionData, Pool, Reservation, Stencil, StencilPort, Subnet4, Workflow,
};
use crate::utils::{self, Ipv4Cidr};

/// Knobs of a provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    /// Written as valid, min and max lifetime of every new subnet
    pub lifetime_secs: u32,
    /// Delete journaled subnets when the run aborts
    pub rollback: bool,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            lifetime_secs: 300,
            rollback: true,
        }
    }
}

impl From<&Config> for ProvisionOptions {
    fn from(config: &Config) -> Self {
        Self {
            lifetime_secs: config.lifetime_secs,
            rollback: config.rollback,
        }
    }
}

/// Check the inputs before anything goes on the wire
pub fn validate(workflow: &Workflow, stencil: &Stencil) -> Result<()> {
    if workflow.subnets.is_empty() {
        return Err(ProvisionError::Config(format!(
            "workflow for {} has no subnets",
            workflow.hostname
        )));
    }
    if !utils::is_valid_hostname(&workflow.hostname) {
        return Err(ProvisionError::Config(format!(
            "invalid hostname '{}'",
            workflow.hostname
        )));
    }
    for (ordinal, port) in stencil.iter() {
        if !workflow.subnets.iter().any(|s| s.trim() == port.subnet.trim()) {
            return Err(ProvisionError::Config(format!(
                "stencil port {} ({}) uses subnet {} which is not in the workflow",
                ordinal, port.port, port.subnet
            )));
        }
    }
    Ok(())
}

/// Materialize a workflow on the DHCP server: one subnet per workflow CIDR and one
/// reservation per stencil port, then persist the configuration.
pub async fn provision(
    workflow: &Workflow,
    stencil: &Stencil,
    client: &KeaClient,
    options: &ProvisionOptions,
) -> std::result::Result<RunSummary, FatalRun> {
    let mut run = Provisioner {
        workflow,
        stencil,
        client,
        options,
        summary: RunSummary::new(&workflow.hostname, client.mode(), workflow.subnets.len()),
    };

    if let Err(error) = validate(workflow, stencil) {
        return Err(run.abort(error));
    }

    tracing::info!(
        "Provisioning {} ({} {}) with {} subnet(s), mode {}",
        workflow.hostname,
        workflow.vendor,
        workflow.model,
        workflow.subnets.len(),
        client.mode()
    );

    for raw in &workflow.subnets {
        if let Err(error) = run.provision_subnet(raw).await {
            tracing::error!("Aborting run for {}: {}", workflow.hostname, error);
            if options.rollback {
                run.rollback().await;
            }
            return Err(run.abort(error));
        }
    }

    run.write_config().await;
    let summary = run.summary.finish();
    tracing::info!("{}", summary.message);
    Ok(summary)
}

struct Provisioner<'a> {
    workflow: &'a Workflow,
    stencil: &'a Stencil,
    client: &'a KeaClient,
    options: &'a ProvisionOptions,
    summary: RunSummary,
}

impl Provisioner<'_> {
    async fn provision_subnet(&mut self, raw: &str) -> Result<()> {
        tracing::info!("Building subnet [{}]", raw);

        let cidr: Ipv4Cidr = match raw.parse() {
            Ok(cidr) => cidr,
            Err(e) => {
                self.summary.record_skip(raw, ProvisionError::InvalidCidr(e).to_string());
                return Ok(());
            }
        };

        // refetched every time: earlier iterations changed the server
        let inventory = self.inventory().await?;
        let ids: Vec<u32> = inventory.iter().map(|s| s.id).collect();
        let id = next_free_id(&ids);
        tracing::debug!("First free subnet id is {}", id);

        if let Some(existing) = find_overlap(&inventory, &cidr, raw) {
            self.summary.record_skip(
                raw,
                format!(
                    "overlaps existing subnet {} (id {})",
                    existing.subnet, existing.id
                ),
            );
            return Ok(());
        }

        self.add_subnet(id, &cidr).await?;
        self.add_reservations(id, raw, &cidr).await
    }

    /// Server inventory plus anything this run created that the server does not list.
    /// Only dry runs differ from the plain listing, since simulated subnets never land.
    async fn inventory(&self) -> Result<Vec<ExistingSubnet>> {
        let mut inventory = list_subnets(self.client).await?;
        for created in &self.summary.journal.subnets {
            if !inventory.iter().any(|s| s.id == created.id) {
                inventory.push(ExistingSubnet {
                    id: created.id,
                    subnet: created.subnet.clone(),
                });
            }
        }
        Ok(inventory)
    }

    async fn add_subnet(&mut self, id: u32, cidr: &Ipv4Cidr) -> Result<()> {
        let pool = cidr.pool_range();
        tracing::info!(
            "Building subnet {} as index {} with pool {} (/{})",
            cidr,
            id,
            pool,
            cidr.prefix_len()
        );

        let lifetime = self.options.lifetime_secs;
        let subnet = Subnet4 {
            id,
            subnet: cidr.to_string(),
            valid_lifetime: lifetime,
            min_valid_lifetime: lifetime,
            max_valid_lifetime: lifetime,
            pools: vec![Pool {
                pool: pool.clone(),
                option_data: vec![],
            }],
            option_data: vec![OptionData {
                name: "routers".to_string(),
                data: Ipv4Addr::from(cidr.network()).to_string(),
            }],
        };

        self.client.execute(&commands::subnet4_add(&subnet)).await?;
        self.summary.record_subnet(CreatedSubnet {
            id,
            subnet: subnet.subnet,
            pool,
        });
        Ok(())
    }

    /// Walk the stencil in ordinal order. The cursor starts at first-usable on the subnet's
    /// first port and then advances once per port, matching or not.
    async fn add_reservations(&mut self, id: u32, raw: &str, cidr: &Ipv4Cidr) -> Result<()> {
        let stencil = self.stencil;
        let mut cursor = Some(Ipv4Addr::from(cidr.first_usable()));
        let mut started = false;

        for (ordinal, port) in stencil.iter() {
            let matches = port.subnet.trim() == raw.trim();
            if !matches && !started {
                continue;
            }
            started = true;

            if matches {
                match cursor {
                    Some(ip) if cidr.is_usable_host(ip) => {
                        self.add_reservation(id, ordinal, port, ip).await?;
                    }
                    Some(ip) => self.summary.record_failed_reservation(format!(
                        "port {} ({}): {} is outside the usable range of {}",
                        ordinal, port.port, ip, cidr
                    )),
                    None => self.summary.record_failed_reservation(format!(
                        "port {} ({}): {}",
                        ordinal,
                        port.port,
                        ProvisionError::AddressExhausted(cidr.to_string())
                    )),
                }
            }
            cursor = cursor.and_then(utils::successor);
        }
        Ok(())
    }

    async fn add_reservation(
        &mut self,
        subnet_id: u32,
        ordinal: u32,
        port: &StencilPort,
        ip: Ipv4Addr,
    ) -> Result<()> {
        let reservation = Reservation {
            subnet_id,
            ip_address: ip,
            flex_id: Reservation::flex_id(&self.workflow.hostname, &port.port),
            hostname: self.workflow.hostname.clone(),
        };
        tracing::info!(
            "Adding host reservation for interface [{}] {} -> {} (flex-id {})",
            ordinal,
            port.port,
            ip,
            reservation.flex_id
        );

        match self.client.execute(&commands::reservation_add(&reservation)).await {
            Ok(_) => {
                self.summary.record_reservation(CreatedReservation {
                    subnet_id,
                    ip_address: ip,
                    ordinal,
                    port: port.port.clone(),
                });
                Ok(())
            }
            Err(e) if !e.is_fatal() => {
                self.summary.record_failed_reservation(format!(
                    "reservation for port {} ({}) at {}: {}",
                    ordinal, port.port, ip, e
                ));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Persist the server configuration. Skipped when the run changed nothing.
    async fn write_config(&mut self) {
        if self.summary.journal.subnets.is_empty() {
            tracing::info!("No subnets created, skipping config-write");
            return;
        }
        match self.client.execute(&commands::config_write()).await {
            Ok(result) => {
                tracing::info!("config-write: {}", result.text);
                self.summary.config_written = true;
            }
            Err(e) => self
                .summary
                .record_warning(format!("config-write failed, changes are not persisted: {}", e)),
        }
    }

    /// Best-effort removal of the subnets this run created, newest first
    async fn rollback(&mut self) {
        let ids: Vec<u32> = self
            .summary
            .journal
            .subnets
            .iter()
            .rev()
            .map(|s| s.id)
            .collect();

        for id in ids {
            match self.client.execute(&commands::subnet4_del(id)).await {
                Ok(_) => {
                    tracing::info!("Rolled back subnet id {}", id);
                    self.summary.rolled_back.push(id);
                }
                Err(e) => self
                    .summary
                    .record_warning(format!("rollback of subnet id {} failed: {}", id, e)),
            }
        }
    }

    fn abort(self, error: ProvisionError) -> FatalRun {
        FatalRun {
            error,
            summary: Box::new(self.summary.finish()),
        }
    }
}
