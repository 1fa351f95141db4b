/**
 * VIGIE SERVER - Point d'entrée du serveur de supervision réseau
 *
 * RÔLE : Orchestration des modules : config, store SQLite, API REST,
 * push WebSocket, diagnostic IA. Bootstrap complet avec gestion d'erreurs.
 *
 * ARCHITECTURE : API REST + store relationnel + push périodique 30s + appel
 * sortant vers API chat-completion.
 * UTILITÉ : Backend unique du dashboard de supervision.
 */

mod config;
mod diagnosis;
mod health;
mod http;
mod models;
mod seed;
mod store;
mod ws;

use crate::config::ServerConfig;
use crate::diagnosis::DiagnosisClient;
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::store::Storage;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok(); // Ok si .env n'existe pas

    let cfg: ServerConfig = config::load_config().await;

    // store SQLite
    if let Some(parent) = std::path::Path::new(&cfg.database_path).parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| {
            eprintln!("[kernel] warning: failed to create data dir: {}", e);
        });
    }
    let store = match Storage::open(&cfg.database_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("[kernel] failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    // parc d'exemple au premier démarrage
    match seed::seed_sample_nodes(&store) {
        Ok(0) => {}
        Ok(n) => println!("[kernel] seeded {} sample nodes", n),
        Err(e) => eprintln!("[kernel] failed to seed sample nodes: {}", e),
    }

    // health tracker
    let health = HealthTracker::new();

    // client IA (optionnel : sans clé, les endpoints /api/ai répondent 503)
    let ai = match DiagnosisClient::from_env(&cfg.llm) {
        Some(client) => {
            println!("[kernel] AI diagnostics enabled ({})", cfg.llm.model);
            Some(Arc::new(client))
        }
        None => {
            eprintln!("[kernel] VIGIE_LLM_API_KEY not set, AI diagnostics disabled");
            None
        }
    };

    // fabrique l'état unique pour Axum
    let app_state = AppState { store, health, ai };

    // HTTP + WebSocket
    let app = http::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    println!("[kernel] listening on http://{addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
