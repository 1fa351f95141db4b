/**
 * DIAGNOSTIC IA - Client chat-completion pour l'analyse réseau assistée
 *
 * RÔLE :
 * Ce module porte les trois opérations IA du dashboard : diagnostic
 * structuré d'un problème, chat assistant libre, et génération d'insights
 * depuis les métriques récentes.
 *
 * FONCTIONNEMENT :
 * - Appel HTTPS sortant vers une API chat-completion hébergée (clé bearer)
 * - Prompts "JSON only" pour les réponses structurées (response_format)
 * - Parsing défensif : champs manquants → valeurs de repli, confidence
 *   bornée à [0,1]
 *
 * UTILITÉ DANS VIGIE :
 * 🎯 /api/ai/diagnose : verdict structuré enregistré en session
 * 🎯 /api/ai/chat : assistant de supervision conversationnel
 * 🎯 /api/ai/insights : tendances tirées des métriques de performance
 */

use crate::config::LlmConf;
use crate::models::Severity;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("LLM API call failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed LLM response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticQuery {
    pub query: String,
    pub node_id: Option<String>,
    pub context: Option<Value>,
}

/// Verdict structuré retourné par /api/ai/diagnose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticVerdict {
    pub analysis: String,
    pub recommendations: Vec<String>,
    pub severity: Severity,
    pub confidence: f64,
}

pub struct DiagnosisClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl DiagnosisClient {
    /// Construit le client si VIGIE_LLM_API_KEY est présente, None sinon
    /// (les endpoints IA répondent alors 503 sans appel sortant).
    pub fn from_env(conf: &LlmConf) -> Option<Self> {
        let api_key = std::env::var("VIGIE_LLM_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: conf.base_url.clone(),
            model: conf.model.clone(),
        })
    }

    pub async fn analyze_problem(&self, query: &DiagnosticQuery) -> Result<DiagnosticVerdict, AiError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert network diagnostician. Analyze network issues and provide actionable recommendations. Always respond with valid JSON."
                },
                { "role": "user", "content": diagnose_prompt(query) }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.3,
        });
        let content = self.call(body).await?;
        Ok(parse_verdict(&content))
    }

    pub async fn chat(&self, message: &str, context: Option<&Value>) -> Result<String, AiError> {
        let system_prompt = format!(
            "You are an AI network monitoring assistant. You help users understand network performance, diagnose issues, and provide recommendations. Keep responses concise but informative.\n\nCurrent context: {}",
            context.map(|c| c.to_string()).unwrap_or_else(|| "No additional context".to_string())
        );
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": message }
            ],
            "temperature": 0.7,
            "max_tokens": 500,
        });
        self.call(body).await
    }

    pub async fn generate_insights(&self, performance_data: &Value) -> Result<Vec<String>, AiError> {
        let prompt = format!(
            "Analyze the following network performance data and generate 3-5 key insights:\n\n{}\n\nProvide insights as a JSON object with an \"insights\" array of strings, focusing on performance trends, potential issues, and optimization opportunities.",
            performance_data
        );
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a network performance analyst. Generate actionable insights from network data. Respond with a JSON object containing an \"insights\" array of strings."
                },
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.4,
        });
        let content = self.call(body).await?;
        Ok(parse_insights(&content))
    }

    /// Appel brut : retourne le content du premier choice
    async fn call(&self, body: Value) -> Result<String, AiError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let payload: Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AiError::Malformed("no content in LLM response".to_string()))?;
        Ok(content.to_string())
    }
}

fn diagnose_prompt(query: &DiagnosticQuery) -> String {
    let mut prompt = format!(
        "You are an expert network diagnostician. Analyze the following network issue and provide detailed recommendations.\n\nQuery: {}\n",
        query.query
    );
    if let Some(node_id) = &query.node_id {
        prompt.push_str(&format!("Node ID: {node_id}\n"));
    }
    if let Some(context) = &query.context {
        prompt.push_str(&format!("Context: {context}\n"));
    }
    prompt.push_str(
        "\nPlease provide your analysis in JSON format with the following structure:\n{\n  \"analysis\": \"Detailed analysis of the problem\",\n  \"recommendations\": [\"Recommendation 1\", \"Recommendation 2\", \"...\"],\n  \"severity\": \"info|warning|critical\",\n  \"confidence\": 0.0-1.0\n}",
    );
    prompt
}

/// Parsing tolérant du verdict : chaque champ manquant ou illisible prend
/// sa valeur de repli, confidence est bornée à [0,1].
fn parse_verdict(content: &str) -> DiagnosticVerdict {
    let parsed: Value = serde_json::from_str(content).unwrap_or_else(|_| json!({}));
    let analysis = parsed["analysis"]
        .as_str()
        .unwrap_or("Unable to analyze the problem.")
        .to_string();
    let recommendations = parsed["recommendations"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec!["Contact technical support".to_string()]);
    let severity = parsed["severity"]
        .as_str()
        .and_then(Severity::parse)
        .unwrap_or(Severity::Info);
    let confidence = parsed["confidence"].as_f64().unwrap_or(0.5).clamp(0.0, 1.0);

    DiagnosticVerdict { analysis, recommendations, severity, confidence }
}

fn parse_insights(content: &str) -> Vec<String> {
    let parsed: Value = serde_json::from_str(content).unwrap_or_else(|_| json!({}));
    parsed["insights"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict_complete() {
        let verdict = parse_verdict(
            r#"{"analysis": "Interface saturated", "recommendations": ["Increase bandwidth"], "severity": "critical", "confidence": 0.9}"#,
        );
        assert_eq!(verdict.analysis, "Interface saturated");
        assert_eq!(verdict.recommendations, vec!["Increase bandwidth"]);
        assert_eq!(verdict.severity, Severity::Critical);
        assert_eq!(verdict.confidence, 0.9);
    }

    #[test]
    fn test_parse_verdict_fallbacks() {
        let verdict = parse_verdict("not json at all");
        assert_eq!(verdict.analysis, "Unable to analyze the problem.");
        assert_eq!(verdict.recommendations, vec!["Contact technical support"]);
        assert_eq!(verdict.severity, Severity::Info);
        assert_eq!(verdict.confidence, 0.5);
    }

    #[test]
    fn test_parse_verdict_clamps_confidence() {
        let verdict = parse_verdict(r#"{"analysis": "x", "confidence": 3.5}"#);
        assert_eq!(verdict.confidence, 1.0);
        let verdict = parse_verdict(r#"{"analysis": "x", "confidence": -1.0}"#);
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn test_parse_insights() {
        assert_eq!(
            parse_insights(r#"{"insights": ["Latency rising", "Packet loss stable"]}"#),
            vec!["Latency rising", "Packet loss stable"]
        );
        assert!(parse_insights("garbage").is_empty());
    }

    #[test]
    fn test_diagnose_prompt_includes_node_and_context() {
        let prompt = diagnose_prompt(&DiagnosticQuery {
            query: "link flapping".to_string(),
            node_id: Some("node-42".to_string()),
            context: Some(json!({"vlan": 12})),
        });
        assert!(prompt.contains("Query: link flapping"));
        assert!(prompt.contains("Node ID: node-42"));
        assert!(prompt.contains(r#""vlan":12"#));
    }
}
