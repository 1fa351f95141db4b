use serde::{Deserialize, Serialize};

/// Types d'équipements supervisés
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Router,
    Switch,
    Server,
    Endpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
    Warning,
    Error,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Inactive,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Cpu,
    Memory,
    Disk,
    NetworkIo,
    Latency,
    PacketLoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Performance,
    Connectivity,
    Security,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

macro_rules! str_enum {
    ($ty:ty { $($variant:path => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self { $($variant => $text),+ }
            }
            pub fn parse(s: &str) -> Option<Self> {
                match s { $($text => Some($variant)),+ , _ => None }
            }
        }
    };
}

str_enum!(NodeType {
    NodeType::Router => "router",
    NodeType::Switch => "switch",
    NodeType::Server => "server",
    NodeType::Endpoint => "endpoint",
});

str_enum!(NodeStatus {
    NodeStatus::Online => "online",
    NodeStatus::Offline => "offline",
    NodeStatus::Warning => "warning",
    NodeStatus::Error => "error",
    NodeStatus::Unknown => "unknown",
});

str_enum!(ConnectionStatus {
    ConnectionStatus::Active => "active",
    ConnectionStatus::Inactive => "inactive",
    ConnectionStatus::Degraded => "degraded",
});

str_enum!(MetricType {
    MetricType::Cpu => "cpu",
    MetricType::Memory => "memory",
    MetricType::Disk => "disk",
    MetricType::NetworkIo => "network_io",
    MetricType::Latency => "latency",
    MetricType::PacketLoss => "packet_loss",
});

str_enum!(AlertType {
    AlertType::Performance => "performance",
    AlertType::Connectivity => "connectivity",
    AlertType::Security => "security",
});

str_enum!(Severity {
    Severity::Info => "info",
    Severity::Warning => "warning",
    Severity::Critical => "critical",
});

str_enum!(AlertStatus {
    AlertStatus::Active => "active",
    AlertStatus::Acknowledged => "acknowledged",
    AlertStatus::Resolved => "resolved",
});

/// Fenêtre temporelle des requêtes de métriques (?time_range=)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    OneHour,
    OneDay,
    SevenDays,
}

impl TimeRange {
    /// "1h", "24h", "7d" — tout le reste retombe sur 1h (comportement historique)
    pub fn parse(s: &str) -> Self {
        match s {
            "24h" => TimeRange::OneDay,
            "7d" => TimeRange::SevenDays,
            _ => TimeRange::OneHour,
        }
    }

    pub fn as_duration(&self) -> time::Duration {
        match self {
            TimeRange::OneHour => time::Duration::hours(1),
            TimeRange::OneDay => time::Duration::hours(24),
            TimeRange::SevenDays => time::Duration::days(7),
        }
    }
}

// Enregistrements persistés. Timestamps en RFC3339 (comme last_seen côté API).

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub ip_address: String,
    pub mac_address: Option<String>,
    pub location: Option<String>,
    pub group_id: Option<String>,
    pub status: NodeStatus,
    pub last_seen: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub ip_address: String,
    pub mac_address: Option<String>,
    pub location: Option<String>,
    pub group_id: Option<String>,
    pub status: Option<NodeStatus>,
    pub metadata: Option<serde_json::Value>,
}

impl NewNode {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.ip_address.trim().is_empty() {
            return Err("ip_address must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
}

impl NewGroup {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConnection {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    pub connection_type: Option<String>, // ethernet, fiber, wireless
    pub bandwidth_mbps: Option<i64>,
    pub status: ConnectionStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewConnection {
    pub source_node_id: String,
    pub target_node_id: String,
    pub connection_type: Option<String>,
    pub bandwidth_mbps: Option<i64>,
    pub status: Option<ConnectionStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub id: String,
    pub node_id: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub unit: String, // percent, ms, mbps...
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMetric {
    pub node_id: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub node_id: Option<String>,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: Option<String>,
    pub status: AlertStatus,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<String>,
    pub resolved_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAlert {
    pub node_id: Option<String>,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: Option<String>,
}

impl NewAlert {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticSession {
    pub id: String,
    pub operator: String,
    pub node_id: Option<String>,
    pub query: String,
    pub response: Option<String>,
    pub context: Option<serde_json::Value>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewDiagnosticSession {
    pub operator: String,
    pub node_id: Option<String>,
    pub query: String,
    pub response: Option<String>,
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub snapshot_data: serde_json::Value,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub snapshot_data: serde_json::Value,
    pub created_by: String,
}

/// Compteurs agrégés poussés vers le dashboard (REST + WebSocket)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_nodes: u32,
    pub online_nodes: u32,
    pub active_connections: u32,
    pub active_alerts: u32,
    pub critical_alerts: u32,
    /// Moyenne des métriques `latency` sur la dernière heure (null si aucune)
    pub avg_latency_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_str_round_trips() {
        assert_eq!(NodeType::parse("router"), Some(NodeType::Router));
        assert_eq!(NodeType::Endpoint.as_str(), "endpoint");
        assert_eq!(MetricType::parse("network_io"), Some(MetricType::NetworkIo));
        assert_eq!(MetricType::PacketLoss.as_str(), "packet_loss");
        assert_eq!(AlertStatus::parse("acknowledged"), Some(AlertStatus::Acknowledged));
        assert_eq!(NodeStatus::parse("rebooting"), None);
    }

    #[test]
    fn test_time_range_parse() {
        assert_eq!(TimeRange::parse("24h"), TimeRange::OneDay);
        assert_eq!(TimeRange::parse("7d"), TimeRange::SevenDays);
        assert_eq!(TimeRange::parse("whatever"), TimeRange::OneHour);
    }

    #[test]
    fn test_new_node_deserialization() {
        let node: NewNode = serde_json::from_value(serde_json::json!({
            "name": "Core-Router-01",
            "type": "router",
            "ip_address": "192.168.1.1"
        }))
        .unwrap();
        assert_eq!(node.node_type, NodeType::Router);
        assert!(node.validate().is_ok());

        let bad = serde_json::from_value::<NewNode>(serde_json::json!({
            "name": "x",
            "type": "toaster",
            "ip_address": "192.168.1.2"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_new_node_validation() {
        let node: NewNode = serde_json::from_value(serde_json::json!({
            "name": "  ",
            "type": "switch",
            "ip_address": "192.168.1.3"
        }))
        .unwrap();
        assert!(node.validate().is_err());
    }
}
