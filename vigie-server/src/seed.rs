/**
 * SEED - Infrastructure d'exemple pour base vide
 *
 * RÔLE : Insère un petit parc réseau de démonstration quand la table des
 * nodes est vide, pour que le dashboard ait quelque chose à afficher au
 * premier démarrage.
 *
 * FONCTIONNEMENT : No-op dès qu'un node existe. Les équipements couvrent
 * les statuts intéressants (online, warning, offline).
 */

use crate::models::{NewNode, NodeStatus, NodeType};
use crate::store::{Storage, StoreError};

struct SampleNode {
    name: &'static str,
    node_type: NodeType,
    ip: &'static str,
    status: NodeStatus,
    location: &'static str,
}

const SAMPLE_NODES: &[SampleNode] = &[
    SampleNode { name: "Core-Router-01", node_type: NodeType::Router, ip: "192.168.1.1", status: NodeStatus::Online, location: "Datacenter A" },
    SampleNode { name: "Edge-Switch-02", node_type: NodeType::Switch, ip: "192.168.1.10", status: NodeStatus::Online, location: "Datacenter B" },
    SampleNode { name: "Web-Server-01", node_type: NodeType::Server, ip: "192.168.1.100", status: NodeStatus::Online, location: "Server room 1" },
    SampleNode { name: "DB-Server-Primary", node_type: NodeType::Server, ip: "192.168.1.200", status: NodeStatus::Warning, location: "Server room 2" },
    SampleNode { name: "Backup-Router-01", node_type: NodeType::Router, ip: "192.168.1.5", status: NodeStatus::Offline, location: "Datacenter A" },
    SampleNode { name: "Access-Switch-03", node_type: NodeType::Switch, ip: "192.168.1.15", status: NodeStatus::Online, location: "Office floor 3" },
    SampleNode { name: "Load-Balancer-01", node_type: NodeType::Server, ip: "192.168.1.50", status: NodeStatus::Online, location: "DMZ" },
    SampleNode { name: "Firewall-Gateway", node_type: NodeType::Router, ip: "192.168.1.254", status: NodeStatus::Online, location: "Network edge" },
];

/// Retourne le nombre de nodes insérés (0 si la base était déjà peuplée)
pub fn seed_sample_nodes(store: &Storage) -> Result<usize, StoreError> {
    if !store.list_nodes()?.is_empty() {
        return Ok(0);
    }
    for sample in SAMPLE_NODES {
        store.create_node(&NewNode {
            name: sample.name.to_string(),
            node_type: sample.node_type,
            ip_address: sample.ip.to_string(),
            mac_address: None,
            location: Some(sample.location.to_string()),
            group_id: None,
            status: Some(sample.status),
            metadata: None,
        })?;
    }
    Ok(SAMPLE_NODES.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_only_when_empty() {
        let store = Storage::open(":memory:").unwrap();
        assert_eq!(seed_sample_nodes(&store).unwrap(), SAMPLE_NODES.len());
        assert_eq!(seed_sample_nodes(&store).unwrap(), 0);

        let nodes = store.list_nodes().unwrap();
        assert_eq!(nodes.len(), SAMPLE_NODES.len());
        assert!(nodes.iter().any(|n| n.status == NodeStatus::Offline));
    }
}
