/**
 * STORE SQLITE - Persistance relationnelle de Vigie
 *
 * RÔLE :
 * Ce module gère le stockage de tout l'inventaire réseau : nodes, groupes,
 * connexions, métriques de performance, alertes, sessions de diagnostic IA
 * et snapshots de topologie.
 *
 * FONCTIONNEMENT :
 * - SQLite embarqué (WAL + foreign_keys ON), schéma créé au démarrage
 * - Connexion unique derrière un Mutex, requêtes courtes et synchrones
 * - IDs UUID v4, timestamps RFC3339 en TEXT
 * - Intégrité référentielle déléguée à la base (FK + UNIQUE)
 *
 * UTILITÉ DANS VIGIE :
 * 🎯 API REST : CRUD complet des entités du dashboard
 * 🎯 WebSocket : re-lecture périodique des stats agrégées
 * 🎯 Diagnostic IA : historisation des sessions opérateur
 */

use crate::models::*;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Erreurs possibles lors des opérations sur le store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Horodatage courant au format RFC3339 (format commun API + store).
/// Tronqué à la seconde : toutes les dates stockées ont la même largeur,
/// la comparaison lexicographique des colonnes TEXT est donc exacte.
pub fn now_rfc3339() -> String {
    format_rfc3339(OffsetDateTime::now_utc())
}

fn format_rfc3339(t: OffsetDateTime) -> String {
    t.replace_nanosecond(0)
        .unwrap_or(t)
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Violations de contrainte (UNIQUE, FK) → Conflict, le reste passe tel quel
fn map_sqlite_err(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref failure, ref msg) = e {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            let detail = msg.clone().unwrap_or_else(|| "constraint violation".to_string());
            return StoreError::Conflict(detail);
        }
    }
    StoreError::Sqlite(e)
}

/// Conversion d'une valeur TEXT illisible en erreur de colonne rusqlite
fn bad_column<T>(idx: usize, detail: String) -> rusqlite::Result<T> {
    Err(rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        detail.into(),
    ))
}

fn parse_json_column(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<serde_json::Value>> {
    match raw {
        None => Ok(None),
        Some(txt) => match serde_json::from_str(&txt) {
            Ok(v) => Ok(Some(v)),
            Err(e) => bad_column(idx, format!("invalid JSON: {e}")),
        },
    }
}

/// Store SQLite de Vigie : une connexion partagée derrière un Mutex
pub struct Storage {
    conn: Mutex<Connection>,
    path: String,
}

impl Storage {
    /// Ouvre (ou crée) la base au chemin donné et installe le schéma.
    /// `":memory:"` donne une base éphémère, pratique pour les tests.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS network_groups (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                description TEXT,
                parent_id   TEXT REFERENCES network_groups(id),
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS network_nodes (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                type        TEXT NOT NULL,
                ip_address  TEXT NOT NULL UNIQUE,
                mac_address TEXT,
                location    TEXT,
                group_id    TEXT REFERENCES network_groups(id) ON DELETE SET NULL,
                status      TEXT NOT NULL DEFAULT 'unknown',
                last_seen   TEXT,
                metadata    TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS network_connections (
                id              TEXT PRIMARY KEY,
                source_node_id  TEXT NOT NULL REFERENCES network_nodes(id) ON DELETE CASCADE,
                target_node_id  TEXT NOT NULL REFERENCES network_nodes(id) ON DELETE CASCADE,
                connection_type TEXT,
                bandwidth_mbps  INTEGER,
                status          TEXT NOT NULL DEFAULT 'active',
                created_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS performance_metrics (
                id          TEXT PRIMARY KEY,
                node_id     TEXT NOT NULL REFERENCES network_nodes(id) ON DELETE CASCADE,
                metric_type TEXT NOT NULL,
                value       REAL NOT NULL,
                unit        TEXT NOT NULL,
                timestamp   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alerts (
                id              TEXT PRIMARY KEY,
                node_id         TEXT REFERENCES network_nodes(id) ON DELETE SET NULL,
                alert_type      TEXT NOT NULL,
                severity        TEXT NOT NULL,
                title           TEXT NOT NULL,
                description     TEXT,
                status          TEXT NOT NULL DEFAULT 'active',
                acknowledged_by TEXT,
                acknowledged_at TEXT,
                resolved_at     TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS diagnostic_sessions (
                id         TEXT PRIMARY KEY,
                operator   TEXT NOT NULL,
                node_id    TEXT REFERENCES network_nodes(id) ON DELETE SET NULL,
                query      TEXT NOT NULL,
                response   TEXT,
                context    TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS topology_snapshots (
                id            TEXT PRIMARY KEY,
                name          TEXT NOT NULL,
                description   TEXT,
                snapshot_data TEXT NOT NULL,
                created_by    TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_metrics_node_ts
                ON performance_metrics(node_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_alerts_status
                ON alerts(status);
            ",
        )?;

        Ok(Self { conn: Mutex::new(conn), path: path.to_string() })
    }

    /// Chemin de la base ouverte (exposé par /api/system/health)
    pub fn path(&self) -> &str {
        &self.path
    }

    // ---- Nodes ----

    pub fn list_nodes(&self) -> Result<Vec<NetworkNode>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, type, ip_address, mac_address, location, group_id,
                    status, last_seen, metadata, created_at, updated_at
             FROM network_nodes ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], node_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_node(&self, id: &str) -> Result<NetworkNode, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, type, ip_address, mac_address, location, group_id,
                    status, last_seen, metadata, created_at, updated_at
             FROM network_nodes WHERE id = ?1",
        )?;
        stmt.query_row(params![id], node_from_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    pub fn create_node(&self, input: &NewNode) -> Result<NetworkNode, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();
        let status = input.status.unwrap_or(NodeStatus::Unknown);
        let metadata = match &input.metadata {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        };
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO network_nodes
                   (id, name, type, ip_address, mac_address, location, group_id,
                    status, last_seen, metadata, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10, ?10)",
                params![
                    id,
                    input.name,
                    input.node_type.as_str(),
                    input.ip_address,
                    input.mac_address,
                    input.location,
                    input.group_id,
                    status.as_str(),
                    metadata,
                    now,
                ],
            )
            .map_err(map_sqlite_err)?;
        }
        self.get_node(&id)
    }

    pub fn update_node(&self, id: &str, input: &NewNode) -> Result<NetworkNode, StoreError> {
        let now = now_rfc3339();
        let status = input.status.unwrap_or(NodeStatus::Unknown);
        let metadata = match &input.metadata {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        };
        let affected = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE network_nodes
                 SET name = ?2, type = ?3, ip_address = ?4, mac_address = ?5,
                     location = ?6, group_id = ?7, status = ?8, metadata = ?9,
                     updated_at = ?10
                 WHERE id = ?1",
                params![
                    id,
                    input.name,
                    input.node_type.as_str(),
                    input.ip_address,
                    input.mac_address,
                    input.location,
                    input.group_id,
                    status.as_str(),
                    metadata,
                    now,
                ],
            )
            .map_err(map_sqlite_err)?
        };
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_node(id)
    }

    pub fn delete_node(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let affected = conn
            .execute("DELETE FROM network_nodes WHERE id = ?1", params![id])
            .map_err(map_sqlite_err)?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ---- Groups ----

    pub fn list_groups(&self) -> Result<Vec<NetworkGroup>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, parent_id, created_at
             FROM network_groups ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(NetworkGroup {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                parent_id: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn create_group(&self, input: &NewGroup) -> Result<NetworkGroup, StoreError> {
        let group = NetworkGroup {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            description: input.description.clone(),
            parent_id: input.parent_id.clone(),
            created_at: now_rfc3339(),
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO network_groups (id, name, description, parent_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![group.id, group.name, group.description, group.parent_id, group.created_at],
        )
        .map_err(map_sqlite_err)?;
        Ok(group)
    }

    // ---- Connections ----

    pub fn list_connections(&self) -> Result<Vec<NetworkConnection>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, source_node_id, target_node_id, connection_type,
                    bandwidth_mbps, status, created_at
             FROM network_connections ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], connection_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn create_connection(&self, input: &NewConnection) -> Result<NetworkConnection, StoreError> {
        let connection = NetworkConnection {
            id: Uuid::new_v4().to_string(),
            source_node_id: input.source_node_id.clone(),
            target_node_id: input.target_node_id.clone(),
            connection_type: input.connection_type.clone(),
            bandwidth_mbps: input.bandwidth_mbps,
            status: input.status.unwrap_or(ConnectionStatus::Active),
            created_at: now_rfc3339(),
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO network_connections
               (id, source_node_id, target_node_id, connection_type, bandwidth_mbps, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                connection.id,
                connection.source_node_id,
                connection.target_node_id,
                connection.connection_type,
                connection.bandwidth_mbps,
                connection.status.as_str(),
                connection.created_at,
            ],
        )
        .map_err(map_sqlite_err)?;
        Ok(connection)
    }

    // ---- Performance metrics ----

    /// Métriques les plus récentes d'abord, bornées par la fenêtre temporelle,
    /// optionnellement filtrées par node.
    pub fn metrics(
        &self,
        node_id: Option<&str>,
        range: TimeRange,
    ) -> Result<Vec<PerformanceMetric>, StoreError> {
        let cutoff = format_rfc3339(OffsetDateTime::now_utc() - range.as_duration());
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, node_id, metric_type, value, unit, timestamp
             FROM performance_metrics
             WHERE timestamp >= ?1 AND (?2 IS NULL OR node_id = ?2)
             ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map(params![cutoff, node_id], metric_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn record_metric(&self, input: &NewMetric) -> Result<PerformanceMetric, StoreError> {
        let metric = PerformanceMetric {
            id: Uuid::new_v4().to_string(),
            node_id: input.node_id.clone(),
            metric_type: input.metric_type,
            value: input.value,
            unit: input.unit.clone(),
            timestamp: now_rfc3339(),
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO performance_metrics (id, node_id, metric_type, value, unit, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                metric.id,
                metric.node_id,
                metric.metric_type.as_str(),
                metric.value,
                metric.unit,
                metric.timestamp,
            ],
        )
        .map_err(map_sqlite_err)?;
        Ok(metric)
    }

    // ---- Alerts ----

    pub fn list_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, node_id, alert_type, severity, title, description, status,
                    acknowledged_by, acknowledged_at, resolved_at, created_at
             FROM alerts ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], alert_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn create_alert(&self, input: &NewAlert) -> Result<Alert, StoreError> {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            node_id: input.node_id.clone(),
            alert_type: input.alert_type,
            severity: input.severity,
            title: input.title.clone(),
            description: input.description.clone(),
            status: AlertStatus::Active,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_at: None,
            created_at: now_rfc3339(),
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO alerts
               (id, node_id, alert_type, severity, title, description, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                alert.id,
                alert.node_id,
                alert.alert_type.as_str(),
                alert.severity.as_str(),
                alert.title,
                alert.description,
                alert.status.as_str(),
                alert.created_at,
            ],
        )
        .map_err(map_sqlite_err)?;
        Ok(alert)
    }

    pub fn acknowledge_alert(&self, id: &str, acknowledged_by: &str) -> Result<Alert, StoreError> {
        let now = now_rfc3339();
        let affected = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE alerts
                 SET status = 'acknowledged', acknowledged_by = ?2, acknowledged_at = ?3
                 WHERE id = ?1",
                params![id, acknowledged_by, now],
            )?
        };
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_alert(id)
    }

    fn get_alert(&self, id: &str) -> Result<Alert, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, node_id, alert_type, severity, title, description, status,
                    acknowledged_by, acknowledged_at, resolved_at, created_at
             FROM alerts WHERE id = ?1",
        )?;
        stmt.query_row(params![id], alert_from_row).map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Sqlite(other),
        })
    }

    // ---- Diagnostic sessions ----

    pub fn create_session(
        &self,
        input: &NewDiagnosticSession,
    ) -> Result<DiagnosticSession, StoreError> {
        let context = match &input.context {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        };
        let session = DiagnosticSession {
            id: Uuid::new_v4().to_string(),
            operator: input.operator.clone(),
            node_id: input.node_id.clone(),
            query: input.query.clone(),
            response: input.response.clone(),
            context: input.context.clone(),
            created_at: now_rfc3339(),
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO diagnostic_sessions
               (id, operator, node_id, query, response, context, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id,
                session.operator,
                session.node_id,
                session.query,
                session.response,
                context,
                session.created_at,
            ],
        )
        .map_err(map_sqlite_err)?;
        Ok(session)
    }

    pub fn list_sessions(
        &self,
        operator: Option<&str>,
    ) -> Result<Vec<DiagnosticSession>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, operator, node_id, query, response, context, created_at
             FROM diagnostic_sessions
             WHERE ?1 IS NULL OR operator = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![operator], |row| {
            Ok(DiagnosticSession {
                id: row.get(0)?,
                operator: row.get(1)?,
                node_id: row.get(2)?,
                query: row.get(3)?,
                response: row.get(4)?,
                context: parse_json_column(5, row.get(5)?)?,
                created_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ---- Topology snapshots ----

    pub fn create_snapshot(&self, input: &NewSnapshot) -> Result<TopologySnapshot, StoreError> {
        let snapshot = TopologySnapshot {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            description: input.description.clone(),
            snapshot_data: input.snapshot_data.clone(),
            created_by: input.created_by.clone(),
            created_at: now_rfc3339(),
        };
        let data = serde_json::to_string(&snapshot.snapshot_data)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO topology_snapshots
               (id, name, description, snapshot_data, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                snapshot.id,
                snapshot.name,
                snapshot.description,
                data,
                snapshot.created_by,
                snapshot.created_at,
            ],
        )
        .map_err(map_sqlite_err)?;
        Ok(snapshot)
    }

    pub fn list_snapshots(&self) -> Result<Vec<TopologySnapshot>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, snapshot_data, created_by, created_at
             FROM topology_snapshots ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let data = parse_json_column(3, row.get(3)?)?;
            Ok(TopologySnapshot {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                snapshot_data: data.unwrap_or(serde_json::Value::Null),
                created_by: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ---- Dashboard stats ----

    /// Compteurs agrégés du dashboard, re-calculés à chaque appel
    /// (REST /api/dashboard/stats + push WebSocket)
    pub fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        let one_hour_ago = format_rfc3339(OffsetDateTime::now_utc() - time::Duration::hours(1));
        let conn = self.conn.lock();
        let count = |sql: &str| -> rusqlite::Result<u32> { conn.query_row(sql, [], |r| r.get(0)) };

        let total_nodes = count("SELECT COUNT(*) FROM network_nodes")?;
        let online_nodes = count("SELECT COUNT(*) FROM network_nodes WHERE status = 'online'")?;
        let active_connections =
            count("SELECT COUNT(*) FROM network_connections WHERE status = 'active'")?;
        let active_alerts = count("SELECT COUNT(*) FROM alerts WHERE status = 'active'")?;
        let critical_alerts = count(
            "SELECT COUNT(*) FROM alerts WHERE status = 'active' AND severity = 'critical'",
        )?;
        let avg_latency_ms: Option<f64> = conn.query_row(
            "SELECT AVG(value) FROM performance_metrics
             WHERE metric_type = 'latency' AND timestamp >= ?1",
            params![one_hour_ago],
            |r| r.get(0),
        )?;

        Ok(DashboardStats {
            total_nodes,
            online_nodes,
            active_connections,
            active_alerts,
            critical_alerts,
            avg_latency_ms,
        })
    }
}

fn node_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NetworkNode> {
    let type_raw: String = row.get(2)?;
    let status_raw: String = row.get(7)?;
    let node_type = match NodeType::parse(&type_raw) {
        Some(t) => t,
        None => return bad_column(2, format!("invalid node type: {type_raw}")),
    };
    let status = match NodeStatus::parse(&status_raw) {
        Some(s) => s,
        None => return bad_column(7, format!("invalid node status: {status_raw}")),
    };
    Ok(NetworkNode {
        id: row.get(0)?,
        name: row.get(1)?,
        node_type,
        ip_address: row.get(3)?,
        mac_address: row.get(4)?,
        location: row.get(5)?,
        group_id: row.get(6)?,
        status,
        last_seen: row.get(8)?,
        metadata: parse_json_column(9, row.get(9)?)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn connection_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NetworkConnection> {
    let status_raw: String = row.get(5)?;
    let status = match ConnectionStatus::parse(&status_raw) {
        Some(s) => s,
        None => return bad_column(5, format!("invalid connection status: {status_raw}")),
    };
    Ok(NetworkConnection {
        id: row.get(0)?,
        source_node_id: row.get(1)?,
        target_node_id: row.get(2)?,
        connection_type: row.get(3)?,
        bandwidth_mbps: row.get(4)?,
        status,
        created_at: row.get(6)?,
    })
}

fn metric_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PerformanceMetric> {
    let type_raw: String = row.get(2)?;
    let metric_type = match MetricType::parse(&type_raw) {
        Some(t) => t,
        None => return bad_column(2, format!("invalid metric type: {type_raw}")),
    };
    Ok(PerformanceMetric {
        id: row.get(0)?,
        node_id: row.get(1)?,
        metric_type,
        value: row.get(3)?,
        unit: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

fn alert_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    let type_raw: String = row.get(2)?;
    let severity_raw: String = row.get(3)?;
    let status_raw: String = row.get(6)?;
    let alert_type = match AlertType::parse(&type_raw) {
        Some(t) => t,
        None => return bad_column(2, format!("invalid alert type: {type_raw}")),
    };
    let severity = match Severity::parse(&severity_raw) {
        Some(s) => s,
        None => return bad_column(3, format!("invalid severity: {severity_raw}")),
    };
    let status = match AlertStatus::parse(&status_raw) {
        Some(s) => s,
        None => return bad_column(6, format!("invalid alert status: {status_raw}")),
    };
    Ok(Alert {
        id: row.get(0)?,
        node_id: row.get(1)?,
        alert_type,
        severity,
        title: row.get(4)?,
        description: row.get(5)?,
        status,
        acknowledged_by: row.get(7)?,
        acknowledged_at: row.get(8)?,
        resolved_at: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Storage {
        Storage::open(":memory:").unwrap()
    }

    fn sample_node(name: &str, ip: &str) -> NewNode {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "type": "router",
            "ip_address": ip,
            "status": "online"
        }))
        .unwrap()
    }

    #[test]
    fn test_timestamps_are_whole_seconds() {
        let ts = now_rfc3339();
        assert!(ts.ends_with('Z'));
        // pas de fraction de seconde : largeur fixe, tri TEXT fiable
        assert!(!ts.contains('.'));
        assert_eq!(ts.len(), "2026-08-29T00:00:00Z".len());
    }

    #[test]
    fn test_node_crud_round_trip() {
        let store = store();
        let created = store.create_node(&sample_node("Core-Router-01", "10.0.0.1")).unwrap();
        assert_eq!(created.status, NodeStatus::Online);

        let fetched = store.get_node(&created.id).unwrap();
        assert_eq!(fetched.name, "Core-Router-01");

        let mut update = sample_node("Core-Router-01", "10.0.0.1");
        update.location = Some("Datacenter A".to_string());
        let updated = store.update_node(&created.id, &update).unwrap();
        assert_eq!(updated.location.as_deref(), Some("Datacenter A"));
        assert_eq!(updated.id, created.id);

        store.delete_node(&created.id).unwrap();
        assert!(matches!(store.get_node(&created.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_duplicate_ip_is_conflict() {
        let store = store();
        store.create_node(&sample_node("A", "10.0.0.1")).unwrap();
        let err = store.create_node(&sample_node("B", "10.0.0.1")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_update_missing_node_is_not_found() {
        let store = store();
        let err = store.update_node("nope", &sample_node("A", "10.0.0.9")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn test_node_group_fk() {
        let store = store();
        let group = store
            .create_group(&NewGroup {
                name: "Datacenter".to_string(),
                description: None,
                parent_id: None,
            })
            .unwrap();

        let mut node = sample_node("A", "10.0.0.1");
        node.group_id = Some(group.id.clone());
        assert!(store.create_node(&node).is_ok());

        let mut orphan = sample_node("B", "10.0.0.2");
        orphan.group_id = Some("missing-group".to_string());
        assert!(matches!(store.create_node(&orphan), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_connection_fk_and_cascade() {
        let store = store();
        let a = store.create_node(&sample_node("A", "10.0.0.1")).unwrap();
        let b = store.create_node(&sample_node("B", "10.0.0.2")).unwrap();

        let conn = store
            .create_connection(&NewConnection {
                source_node_id: a.id.clone(),
                target_node_id: b.id.clone(),
                connection_type: Some("fiber".to_string()),
                bandwidth_mbps: Some(10_000),
                status: None,
            })
            .unwrap();
        assert_eq!(conn.status, ConnectionStatus::Active);

        let dangling = store.create_connection(&NewConnection {
            source_node_id: a.id.clone(),
            target_node_id: "missing-node".to_string(),
            connection_type: None,
            bandwidth_mbps: None,
            status: None,
        });
        assert!(matches!(dangling, Err(StoreError::Conflict(_))));

        // la suppression du node emporte ses connexions
        store.delete_node(&a.id).unwrap();
        assert!(store.list_connections().unwrap().is_empty());
    }

    #[test]
    fn test_metric_time_window() {
        let store = store();
        let node = store.create_node(&sample_node("A", "10.0.0.1")).unwrap();
        let metric = store
            .record_metric(&NewMetric {
                node_id: node.id.clone(),
                metric_type: MetricType::Latency,
                value: 24.0,
                unit: "ms".to_string(),
            })
            .unwrap();

        assert_eq!(store.metrics(Some(&node.id), TimeRange::OneHour).unwrap().len(), 1);
        assert_eq!(store.metrics(Some("other"), TimeRange::OneHour).unwrap().len(), 0);

        // vieillit artificiellement la mesure au-delà de la fenêtre 1h
        store
            .conn
            .lock()
            .execute(
                "UPDATE performance_metrics SET timestamp = '2020-01-01T00:00:00Z' WHERE id = ?1",
                params![metric.id],
            )
            .unwrap();
        assert_eq!(store.metrics(None, TimeRange::OneHour).unwrap().len(), 0);
        assert_eq!(store.metrics(None, TimeRange::SevenDays).unwrap().len(), 0);
    }

    #[test]
    fn test_alert_acknowledge_flow() {
        let store = store();
        let alert = store
            .create_alert(&NewAlert {
                node_id: None,
                alert_type: AlertType::Connectivity,
                severity: Severity::Critical,
                title: "Link down".to_string(),
                description: None,
            })
            .unwrap();
        assert_eq!(alert.status, AlertStatus::Active);

        let acked = store.acknowledge_alert(&alert.id, "N. Morel").unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);
        assert_eq!(acked.acknowledged_by.as_deref(), Some("N. Morel"));
        assert!(acked.acknowledged_at.is_some());

        assert!(matches!(
            store.acknowledge_alert("missing", "x"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_sessions_filtered_by_operator() {
        let store = store();
        for operator in ["alice", "alice", "bob"] {
            store
                .create_session(&NewDiagnosticSession {
                    operator: operator.to_string(),
                    node_id: None,
                    query: "why is the link flapping?".to_string(),
                    response: Some("check the SFP".to_string()),
                    context: Some(serde_json::json!({"vlan": 12})),
                })
                .unwrap();
        }
        assert_eq!(store.list_sessions(Some("alice")).unwrap().len(), 2);
        assert_eq!(store.list_sessions(None).unwrap().len(), 3);
        let session = &store.list_sessions(Some("bob")).unwrap()[0];
        assert_eq!(session.context, Some(serde_json::json!({"vlan": 12})));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = store();
        let data = serde_json::json!({"nodes": [], "connections": []});
        store
            .create_snapshot(&NewSnapshot {
                name: "baseline".to_string(),
                description: Some("before migration".to_string()),
                snapshot_data: data.clone(),
                created_by: "alice".to_string(),
            })
            .unwrap();
        let snapshots = store.list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].snapshot_data, data);
    }

    #[test]
    fn test_dashboard_stats_counts() {
        let store = store();
        let a = store.create_node(&sample_node("A", "10.0.0.1")).unwrap();
        let mut offline = sample_node("B", "10.0.0.2");
        offline.status = Some(NodeStatus::Offline);
        store.create_node(&offline).unwrap();

        store
            .create_alert(&NewAlert {
                node_id: Some(a.id.clone()),
                alert_type: AlertType::Performance,
                severity: Severity::Critical,
                title: "CPU pegged".to_string(),
                description: None,
            })
            .unwrap();
        store
            .record_metric(&NewMetric {
                node_id: a.id.clone(),
                metric_type: MetricType::Latency,
                value: 30.0,
                unit: "ms".to_string(),
            })
            .unwrap();
        store
            .record_metric(&NewMetric {
                node_id: a.id.clone(),
                metric_type: MetricType::Latency,
                value: 18.0,
                unit: "ms".to_string(),
            })
            .unwrap();

        let stats = store.dashboard_stats().unwrap();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.online_nodes, 1);
        assert_eq!(stats.active_alerts, 1);
        assert_eq!(stats.critical_alerts, 1);
        assert_eq!(stats.avg_latency_ms, Some(24.0));
    }
}
