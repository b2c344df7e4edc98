//! Device pairing: map OS device nodes onto logical pendants
//!
//! Some platforms expose one node per USB interface (pick the primary
//! interface), others one node per top-level collection of the same
//! interface (probe which node accepts display writes). Nothing outside
//! this module looks at interface numbers.

use super::commands;
use super::transport::{HidDeviceDescriptor, HidTransport};
use crate::core::config::HidConfig;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Read and write endpoints of one logical pendant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendantEndpointPair {
    pub read: HidDeviceDescriptor,
    pub write: HidDeviceDescriptor,
}

impl PendantEndpointPair {
    /// Pair a node with itself
    pub fn single(descriptor: HidDeviceDescriptor) -> Self {
        Self {
            read: descriptor.clone(),
            write: descriptor,
        }
    }

    /// Whether reads and writes go through the same node
    pub fn is_shared(&self) -> bool {
        self.read.path == self.write.path
    }
}

/// Outcome of probing one candidate node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capability {
    Read,
    Write,
    Unavailable,
}

/// Resolve device nodes of one vendor/product id into logical pendants.
///
/// When the nodes carry more than one distinct interface number, only nodes
/// on `config.primary_interface` are kept and each becomes one self-paired
/// pendant; the other interfaces are never reported. A single pendant
/// exposing interfaces 0 and 1 therefore resolves to one pendant, not two.
/// Nodes sharing one interface are probed for a read/write collection split.
pub fn resolve<T: HidTransport>(
    transport: &T,
    descriptors: Vec<HidDeviceDescriptor>,
    config: &HidConfig,
) -> Vec<PendantEndpointPair> {
    let interfaces: BTreeSet<i32> = descriptors
        .iter()
        .filter_map(|d| d.interface_number)
        .collect();

    if interfaces.len() > 1 {
        debug!(
            "Device nodes split across interfaces {:?}, keeping interface {}",
            interfaces, config.primary_interface
        );
        return descriptors
            .into_iter()
            .filter(|d| d.interface_number == Some(config.primary_interface))
            .map(PendantEndpointPair::single)
            .collect();
    }

    match descriptors.len() {
        0 => Vec::new(),
        1 => descriptors
            .into_iter()
            .map(PendantEndpointPair::single)
            .collect(),
        _ => pair_collections(transport, descriptors).into_iter().collect(),
    }
}

/// Pair nodes that share an interface by probing for display write support
fn pair_collections<T: HidTransport>(
    transport: &T,
    candidates: Vec<HidDeviceDescriptor>,
) -> Option<PendantEndpointPair> {
    let capabilities: Vec<Capability> = candidates.iter().map(|d| probe(transport, d)).collect();

    let reader = capabilities.iter().position(|c| *c == Capability::Read);
    let writer = capabilities.iter().position(|c| *c == Capability::Write);

    match (reader, writer) {
        (Some(r), Some(w)) => {
            info!(
                "Paired pendant collections: read={} write={}",
                candidates[r].path, candidates[w].path
            );
            Some(PendantEndpointPair {
                read: candidates[r].clone(),
                write: candidates[w].clone(),
            })
        }
        _ => {
            debug!("Probing found no read/write split, using first node for both");
            candidates.into_iter().next().map(PendantEndpointPair::single)
        }
    }
}

/// Open a node, try a display write, and close it again
fn probe<T: HidTransport>(transport: &T, descriptor: &HidDeviceDescriptor) -> Capability {
    let mut handle = match transport.open(&descriptor.path) {
        Ok(handle) => handle,
        Err(e) => {
            debug!("Probe could not open {}: {}", descriptor.path, e);
            return Capability::Unavailable;
        }
    };

    let report = commands::build_probe_report();
    let capability = match transport.send_feature_report(&mut handle, report.as_bytes()) {
        Ok(()) => Capability::Write,
        Err(e) => {
            debug!("Probe write rejected by {}: {}", descriptor.path, e);
            Capability::Read
        }
    };
    transport.close(handle);

    debug!("Probed {}: {:?}", descriptor.path, capability);
    capability
}
