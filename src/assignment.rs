//! Client-to-container assignment and fleet-wide loading runs.
//!
//! Every client is routed to exactly one active container. The coordinator
//! filters the shipment by that routing and packs each container on its own,
//! so per-container results never depend on the order of the runs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::cache::PackingCache;
use crate::catalog::active_containers;
use crate::model::{BoxType, ClientId, Container, ContainerId, Item, ItemId, expand_item};
use crate::packer::{PackingConfig, PackingResult, UnpackedEntry, pack_container_with_config};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssignmentError {
    #[error("Container '{0}' is not part of the fleet")]
    UnknownContainer(ContainerId),
    #[error("Container '{0}' is not active")]
    InactiveContainer(ContainerId),
}

/// Routing of clients to containers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = BTreeMap<String, String>)]
pub struct ClientAssignments(BTreeMap<ClientId, ContainerId>);

impl ClientAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container_for(&self, client: &ClientId) -> Option<&ContainerId> {
        self.0.get(client)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClientId, &ContainerId)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Routes a client to an active fleet container.
    pub fn assign(
        &mut self,
        client: ClientId,
        container: &ContainerId,
        fleet: &[Container],
    ) -> Result<(), AssignmentError> {
        let target = fleet
            .iter()
            .find(|c| &c.id == container)
            .ok_or_else(|| AssignmentError::UnknownContainer(container.clone()))?;
        if !target.is_active {
            return Err(AssignmentError::InactiveContainer(container.clone()));
        }

        tracing::debug!(client = %client, container = %container, "client reassigned");
        self.0.insert(client, container.clone());
        Ok(())
    }

    /// Routes every client of `items` that has no active container to the
    /// first active one. Clients are visited in id order.
    ///
    /// Returns whether anything changed. With no active container nothing is
    /// touched.
    pub fn reconcile(&mut self, items: &[Item], fleet: &[Container]) -> bool {
        let active = active_containers(fleet);
        let Some(first) = active.first() else {
            return false;
        };

        let clients: BTreeSet<&ClientId> = items.iter().map(|i| &i.client_id).collect();
        let mut changed = false;
        for client in clients {
            let routed = self
                .0
                .get(client)
                .is_some_and(|current| active.iter().any(|c| &c.id == current));
            if !routed {
                self.0.insert(client.clone(), first.id.clone());
                changed = true;
            }
        }
        changed
    }
}

/// Per-container figures for dashboards and overflow warnings.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ContainerStats {
    pub container_id: ContainerId,
    pub item_count: usize,
    pub package_count: usize,
    pub utilization_pct: f64,
    pub total_weight_kg: f64,
    /// At least one package or item did not make it in.
    pub overflow: bool,
    pub over_weight_limit: bool,
}

/// One container's share of a fleet run.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ContainerRun {
    /// Clients with items in this run, in id order.
    pub clients: Vec<ClientId>,
    /// Items routed to this container, in shipment order.
    pub item_ids: Vec<ItemId>,
    pub result: PackingResult,
    pub stats: ContainerStats,
}

/// Totals over all active containers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct FleetStats {
    pub active_containers: usize,
    pub total_items: usize,
    pub total_packed: usize,
    pub total_unpacked: usize,
    pub total_weight_kg: f64,
    pub overflowing: Vec<ContainerId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct FleetReport {
    pub assignments: ClientAssignments,
    pub containers: Vec<ContainerRun>,
    pub fleet: FleetStats,
}

impl FleetReport {
    pub fn run_for(&self, container: &ContainerId) -> Option<&ContainerRun> {
        self.containers
            .iter()
            .find(|run| &run.result.container_id == container)
    }

    /// Item ids a confirmed shipment of `container` would remove.
    pub fn shipment_for(&self, container: &ContainerId) -> Vec<ItemId> {
        self.run_for(container)
            .map(|run| run.item_ids.clone())
            .unwrap_or_default()
    }
}

/// Drops shipped items from a working set and returns how many went.
pub fn retain_unshipped(working_set: &mut Vec<Item>, shipped: &[ItemId]) -> usize {
    let shipped: BTreeSet<&ItemId> = shipped.iter().collect();
    let before = working_set.len();
    working_set.retain(|item| !shipped.contains(&item.id));
    before - working_set.len()
}

/// Packs the whole shipment, one independent run per active container.
///
/// Missing routes are filled in through [`ClientAssignments::reconcile`]
/// first. Items whose box cannot be resolved land in the `unpacked` list of
/// their client's container. With no active container the report is empty.
pub fn run_fleet(
    items: &[Item],
    catalog: &[BoxType],
    fleet: &[Container],
    assignments: &mut ClientAssignments,
    config: &PackingConfig,
    cache: Option<&PackingCache>,
) -> FleetReport {
    assignments.reconcile(items, fleet);

    let active = active_containers(fleet);
    if active.is_empty() {
        tracing::warn!(items = items.len(), "no active container, nothing packed");
        return FleetReport {
            assignments: assignments.clone(),
            ..FleetReport::default()
        };
    }

    let mut runs = Vec::with_capacity(active.len());
    for container in active {
        let routed: Vec<&Item> = items
            .iter()
            .filter(|item| assignments.container_for(&item.client_id) == Some(&container.id))
            .collect();

        let run = pack_routed(&routed, container, catalog, config, cache);
        tracing::debug!(
            container = %container.id,
            items = run.stats.item_count,
            packed = run.result.packed.len(),
            unpacked = run.result.unpacked.len(),
            "container run finished"
        );
        runs.push(run);
    }

    let fleet_stats = FleetStats {
        active_containers: runs.len(),
        total_items: runs.iter().map(|r| r.stats.item_count).sum(),
        total_packed: runs.iter().map(|r| r.result.packed.len()).sum(),
        total_unpacked: runs.iter().map(|r| r.result.unpacked.len()).sum(),
        total_weight_kg: runs.iter().map(|r| r.stats.total_weight_kg).sum(),
        overflowing: runs
            .iter()
            .filter(|r| r.stats.overflow)
            .map(|r| r.stats.container_id.clone())
            .collect(),
    };

    FleetReport {
        assignments: assignments.clone(),
        containers: runs,
        fleet: fleet_stats,
    }
}

fn pack_routed(
    routed: &[&Item],
    container: &Container,
    catalog: &[BoxType],
    config: &PackingConfig,
    cache: Option<&PackingCache>,
) -> ContainerRun {
    let mut packages = Vec::new();
    let mut unresolved = Vec::new();
    for item in routed {
        match expand_item(item, catalog) {
            Ok(expanded) => packages.extend(expanded),
            Err(err) => {
                tracing::debug!(item = %item.id, error = %err, "item left out of packing");
                unresolved.push(UnpackedEntry::from_unresolved(item, &err));
            }
        }
    }

    let mut result = if packages.is_empty() {
        PackingResult::empty(container)
    } else {
        match cache {
            Some(cache) => cache.get_or_pack(packages, container, config),
            None => pack_container_with_config(packages, container, config),
        }
    };
    result.unpacked.extend(unresolved);

    let stats = ContainerStats {
        container_id: container.id.clone(),
        item_count: routed.len(),
        package_count: result.metrics.package_count,
        utilization_pct: result.metrics.volume_utilization_pct,
        total_weight_kg: result.metrics.total_weight_kg,
        overflow: !result.unpacked.is_empty(),
        over_weight_limit: result.metrics.over_weight_limit,
    };

    ContainerRun {
        clients: routed
            .iter()
            .map(|item| item.client_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        item_ids: routed.iter().map(|item| item.id.clone()).collect(),
        result,
        stats,
    }
}
