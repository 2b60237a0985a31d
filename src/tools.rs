//! Tool surface over the project memory stores
//!
//! Every operation returns rendered text. Store failures are rendered as
//! messages too; nothing here returns an error to the transport.

use crate::config::ToolsConfig;
use crate::memory::{DocumentMeta, ProjectMemory, SearchHit, SearchOutcome};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Description of one tool, as advertised to clients
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ContentArgs {
    content: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    n_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct FactSetArgs {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct FactGetArgs {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SessionSaveArgs {
    summary: String,
    #[serde(default)]
    project: String,
}

#[derive(Debug, Default, Deserialize)]
struct SessionListArgs {
    #[serde(default)]
    n: Option<usize>,
}

/// Memory tool dispatcher bound to one project's stores
#[derive(Clone)]
pub struct MemoryTools {
    memory: ProjectMemory,
    defaults: ToolsConfig,
}

impl MemoryTools {
    pub fn new(memory: ProjectMemory, defaults: ToolsConfig) -> Self {
        Self { memory, defaults }
    }

    /// Dispatch a tool call by name with JSON arguments
    pub fn call(&self, name: &str, arguments: serde_json::Value) -> String {
        tracing::debug!(tool = name, "Tool call");
        match name {
            "memory_store" => self.with_args(name, arguments, |a: ContentArgs| {
                self.memory_store(&a.content)
            }),
            "memory_search" => self.with_args(name, arguments, |a: SearchArgs| {
                self.memory_search(&a.query, a.n_results)
            }),
            "fact_set" => self.with_args(name, arguments, |a: FactSetArgs| {
                self.fact_set(&a.key, &a.value)
            }),
            "fact_get" => self.with_args(name, arguments, |a: FactGetArgs| self.fact_get(&a.key)),
            "facts_list" => self.facts_list(),
            "session_save" => self.with_args(name, arguments, |a: SessionSaveArgs| {
                self.session_save(&a.summary, &a.project)
            }),
            "session_list" => {
                let arguments = if arguments.is_null() {
                    serde_json::json!({})
                } else {
                    arguments
                };
                self.with_args(name, arguments, |a: SessionListArgs| self.session_list(a.n))
            }
            "session_search" => self.with_args(name, arguments, |a: SearchArgs| {
                self.session_search(&a.query, a.n_results)
            }),
            other => {
                tracing::warn!(tool = other, "Unknown tool");
                format!("Unknown tool: {other}")
            }
        }
    }

    fn with_args<A: DeserializeOwned>(
        &self,
        name: &str,
        arguments: serde_json::Value,
        op: impl FnOnce(A) -> String,
    ) -> String {
        match serde_json::from_value::<A>(arguments) {
            Ok(args) => op(args),
            Err(e) => format!("Invalid arguments for {name}: {e}"),
        }
    }

    /// Store a free-text note
    pub fn memory_store(&self, content: &str) -> String {
        match self.memory.notes.store(content) {
            Ok(id) => format!("Stored (id={id})."),
            Err(e) => failure("memory_store", e),
        }
    }

    /// Similarity search over notes
    pub fn memory_search(&self, query: &str, n_results: Option<usize>) -> String {
        let n = n_results.unwrap_or(self.defaults.default_results);
        match self.memory.notes.search(query, n) {
            Ok(SearchOutcome::EmptyIndex) => "No memories stored.".to_string(),
            Ok(SearchOutcome::Hits(hits)) if hits.is_empty() => {
                "No matching memories found.".to_string()
            }
            Ok(SearchOutcome::Hits(hits)) => render_hits(&hits),
            Err(e) => failure("memory_search", e),
        }
    }

    /// Insert or overwrite a fact
    pub fn fact_set(&self, key: &str, value: &str) -> String {
        match self.memory.facts.set(key, value) {
            Ok(fact) => format!("Fact stored: {} = {}", fact.key, fact.value),
            Err(e) => failure("fact_set", e),
        }
    }

    /// Read one fact
    pub fn fact_get(&self, key: &str) -> String {
        match self.memory.facts.get(key) {
            Ok(Some(fact)) => format!("{} = {} (updated: {})", fact.key, fact.value, fact.updated_at),
            Ok(None) => format!("No fact found for key '{key}'."),
            Err(e) => failure("fact_get", e),
        }
    }

    /// All facts sorted by key
    pub fn facts_list(&self) -> String {
        match self.memory.facts.list() {
            Ok(facts) if facts.is_empty() => "No facts stored.".to_string(),
            Ok(facts) => facts
                .iter()
                .map(|f| format!("- {} = {} ({})", f.key, f.value, f.updated_at))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => failure("facts_list", e),
        }
    }

    /// Save a session summary
    pub fn session_save(&self, summary: &str, project: &str) -> String {
        match self.memory.sessions.save(summary, project) {
            Ok(record) => format!("Session saved (id={}).", record.id),
            Err(e) => failure("session_save", e),
        }
    }

    /// Most recent sessions first
    pub fn session_list(&self, n: Option<usize>) -> String {
        let n = n.unwrap_or(self.defaults.default_session_list);
        match self.memory.sessions.list(n) {
            Ok(records) if records.is_empty() => "No sessions stored.".to_string(),
            Ok(records) => records
                .iter()
                .map(|r| {
                    let mut line = String::from("-");
                    if let Some(time) = r.created_at.display_time() {
                        line.push_str(&format!(" {time}"));
                    }
                    if let Some(project) = &r.project {
                        line.push_str(&format!(" [{project}]"));
                    }
                    line.push_str(&format!(" {}", r.summary));
                    line
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => failure("session_list", e),
        }
    }

    /// Similarity search over session summaries
    pub fn session_search(&self, query: &str, n_results: Option<usize>) -> String {
        let n = n_results.unwrap_or(self.defaults.default_results);
        match self.memory.sessions.search(query, n) {
            Ok(SearchOutcome::EmptyIndex) => "No sessions stored.".to_string(),
            Ok(SearchOutcome::Hits(hits)) if hits.is_empty() => {
                "No matching sessions found.".to_string()
            }
            Ok(SearchOutcome::Hits(hits)) => render_hits(&hits),
            Err(e) => failure("session_search", e),
        }
    }

    /// Definitions of every tool
    pub fn definitions() -> Vec<ToolDefinition> {
        use serde_json::json;
        vec![
            ToolDefinition {
                name: "memory_store",
                description: "Store a text or note in the semantic memory archive.",
                input_schema: json!({
                    "type": "object",
                    "properties": { "content": { "type": "string", "description": "Text to store" } },
                    "required": ["content"]
                }),
            },
            ToolDefinition {
                name: "memory_search",
                description: "Semantic search over stored memories.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search term or question" },
                        "n_results": { "type": "integer", "description": "Maximum number of results", "default": 5 }
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "fact_set",
                description: "Store a structured fact, overwriting any existing value.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "key": { "type": "string" },
                        "value": { "type": "string" }
                    },
                    "required": ["key", "value"]
                }),
            },
            ToolDefinition {
                name: "fact_get",
                description: "Read a single fact by key.",
                input_schema: json!({
                    "type": "object",
                    "properties": { "key": { "type": "string" } },
                    "required": ["key"]
                }),
            },
            ToolDefinition {
                name: "facts_list",
                description: "List all stored facts, sorted by key.",
                input_schema: json!({ "type": "object", "properties": {} }),
            },
            ToolDefinition {
                name: "session_save",
                description: "Save a session summary for later listing and search.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "summary": { "type": "string" },
                        "project": { "type": "string", "default": "" }
                    },
                    "required": ["summary"]
                }),
            },
            ToolDefinition {
                name: "session_list",
                description: "List the most recent session summaries.",
                input_schema: json!({
                    "type": "object",
                    "properties": { "n": { "type": "integer", "default": 10 } }
                }),
            },
            ToolDefinition {
                name: "session_search",
                description: "Semantic search over session summaries.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "n_results": { "type": "integer", "default": 5 }
                    },
                    "required": ["query"]
                }),
            },
        ]
    }
}

/// Numbered hit list: `N. [pct%] (time) [project] content`
fn render_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let mut line = format!("{}. [{:.0}%]", i + 1, hit.similarity * 100.0);
            if let Some(time) = hit.id.display_time() {
                line.push_str(&format!(" ({time})"));
            }
            if let DocumentMeta::Session {
                project: Some(project),
                ..
            } = &hit.metadata
            {
                line.push_str(&format!(" [{project}]"));
            }
            line.push_str(&format!(" {}", hit.content));
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn failure(tool: &str, err: crate::error::Error) -> String {
    tracing::warn!(tool, error = %err, "Tool failed");
    format!("Error in {tool}: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::memory::OrdinalId;
    use serde_json::json;

    fn tools(dir: &tempfile::TempDir) -> MemoryTools {
        let config = MemoryConfig::default();
        let memory = ProjectMemory::open(dir.path(), &config).unwrap();
        MemoryTools::new(memory, config.tools)
    }

    #[test]
    fn test_memory_store_and_search() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(&dir);

        assert_eq!(tools.memory_search("deploy", None), "No memories stored.");

        let stored = tools.call("memory_store", json!({ "content": "Remember to deploy on Friday" }));
        assert!(stored.starts_with("Stored (id="));

        let result = tools.call("memory_search", json!({ "query": "deploy", "n_results": 5 }));
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("1. ["));
        assert!(lines[0].ends_with(") Remember to deploy on Friday"));
    }

    #[test]
    fn test_memory_search_zero_results() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(&dir);
        tools.memory_store("something");
        assert_eq!(
            tools.memory_search("something", Some(0)),
            "No matching memories found."
        );
    }

    #[test]
    fn test_fact_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(&dir);

        assert_eq!(
            tools.call("fact_set", json!({ "key": "env", "value": "prod" })),
            "Fact stored: env = prod"
        );
        let first = tools.call("fact_get", json!({ "key": "env" }));
        assert!(first.starts_with("env = prod (updated: "));

        tools.call("fact_set", json!({ "key": "env", "value": "staging" }));
        let second = tools.call("fact_get", json!({ "key": "env" }));
        assert!(second.starts_with("env = staging (updated: "));
        assert_ne!(
            first.trim_start_matches("env = prod "),
            second.trim_start_matches("env = staging ")
        );
    }

    #[test]
    fn test_fact_get_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            tools(&dir).call("fact_get", json!({ "key": "missing" })),
            "No fact found for key 'missing'."
        );
    }

    #[test]
    fn test_facts_list() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(&dir);
        assert_eq!(tools.call("facts_list", serde_json::Value::Null), "No facts stored.");

        tools.fact_set("b", "2");
        tools.fact_set("a", "1");
        let listed = tools.facts_list();
        let lines: Vec<&str> = listed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("- a = 1 ("));
        assert!(lines[1].starts_with("- b = 2 ("));
    }

    #[test]
    fn test_session_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(&dir);
        assert_eq!(tools.session_list(None), "No sessions stored.");
        assert_eq!(tools.session_search("x", None), "No sessions stored.");

        let saved = tools.call("session_save", json!({ "summary": "Did X", "project": "demo" }));
        assert!(saved.starts_with("Session saved (id="));

        let listed = tools.call("session_list", json!({ "n": 1 }));
        assert_eq!(listed.lines().count(), 1);
        assert!(listed.contains("[demo]"));
        assert!(listed.contains("Did X"));

        let found = tools.call("session_search", json!({ "query": "Did X" }));
        assert!(found.starts_with("1. [100%]"));
        assert!(found.contains("[demo] Did X"));
    }

    #[test]
    fn test_session_list_defaults_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(&dir);
        for i in 0..12 {
            tools.session_save(&format!("summary {i}"), "");
        }
        let listed = tools.call("session_list", serde_json::Value::Null);
        let lines: Vec<&str> = listed.lines().collect();
        assert_eq!(lines.len(), 10);
        assert!(lines[0].ends_with(" summary 11"));
        assert!(lines[9].ends_with(" summary 2"));
        assert!(!lines[0].contains('['));
    }

    #[test]
    fn test_invalid_and_unknown_calls() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(&dir);
        assert!(tools
            .call("memory_store", json!({}))
            .starts_with("Invalid arguments for memory_store"));
        assert_eq!(tools.call("drop_tables", json!({})), "Unknown tool: drop_tables");
    }

    #[test]
    fn test_render_hits_keeps_unclamped_similarity() {
        let hits = vec![
            SearchHit {
                id: OrdinalId::from_stored("20261018T140312123456"),
                content: "over".to_string(),
                similarity: 1.2,
                metadata: DocumentMeta::Session {
                    project: Some("demo".to_string()),
                    created_at: OrdinalId::from_stored("20261018T140312123456"),
                },
            },
            SearchHit {
                id: OrdinalId::from_stored("custom-id"),
                content: "under".to_string(),
                similarity: -0.25,
                metadata: DocumentMeta::Note {
                    stored_at: OrdinalId::from_stored("custom-id"),
                },
            },
        ];
        assert_eq!(
            render_hits(&hits),
            "1. [120%] (2026-10-18 14:03) [demo] over\n2. [-25%] under"
        );
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let names: Vec<&str> = MemoryTools::definitions().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "memory_store",
                "memory_search",
                "fact_set",
                "fact_get",
                "facts_list",
                "session_save",
                "session_list",
                "session_search"
            ]
        );
    }
}
