//! Placeholder substitution with per-session variable caching.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use futures::future::join_all;
use parking_lot::Mutex;
use regex::{Captures, Regex};
use retrace_protocols::{
    CustomVariable, GenerationProvider, JsonFetcher, RecordedEvent, VariableSource,
};
use tracing::{debug, warn};

use crate::error::TemplateError;
use crate::path::{extract_path, value_to_text};

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("token pattern is valid")
});

/// Distinct variable names referenced in `text`, in first-seen order.
pub fn token_names(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    TOKEN
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Outcome of the pre-pass over an event list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompileReport {
    /// Variables resolved by this pass.
    pub resolved: usize,
    /// Event fields whose text changed.
    pub substituted_fields: usize,
    /// Referenced names with no matching variable.
    pub unmatched: Vec<String>,
}

/// Resolves `{{ name }}` tokens.
///
/// One compiler serves one playback session: every variable is resolved at
/// most once and then served from the cache.
pub struct TemplateCompiler {
    generator: Arc<dyn GenerationProvider>,
    fetcher: Arc<dyn JsonFetcher>,
    cache: Mutex<HashMap<String, String>>,
}

impl TemplateCompiler {
    pub fn new(generator: Arc<dyn GenerationProvider>, fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self {
            generator,
            fetcher,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves every token in `text`.
    pub async fn compile(&self, text: &str, variables: &[CustomVariable]) -> String {
        let names = token_names(text);
        if names.is_empty() {
            return text.to_string();
        }
        self.resolve_all(&names, variables).await;
        self.substitute(text)
    }

    /// Pre-pass over input, change and submit values of a whole event list.
    pub async fn compile_events(
        &self,
        events: &mut [RecordedEvent],
        variables: &[CustomVariable],
    ) -> CompileReport {
        let mut names = Vec::new();
        for event in events.iter_mut() {
            for value in event.payload.templated_values_mut() {
                for name in token_names(value) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }

        let mut report = CompileReport::default();
        if names.is_empty() {
            return report;
        }

        report.resolved = self.resolve_all(&names, variables).await;
        report.unmatched = names
            .iter()
            .filter(|n| !variables.iter().any(|v| &v.name == *n))
            .cloned()
            .collect();

        for event in events.iter_mut() {
            for value in event.payload.templated_values_mut() {
                let compiled = self.substitute(value);
                if compiled != *value {
                    *value = compiled;
                    report.substituted_fields += 1;
                }
            }
        }

        debug!(
            resolved = report.resolved,
            fields = report.substituted_fields,
            "Template pre-pass complete"
        );
        report
    }

    /// Cached value of a variable, if it has been resolved.
    pub fn cached(&self, name: &str) -> Option<String> {
        self.cache.lock().get(name).cloned()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Resolves the uncached variables among `names` concurrently.
    async fn resolve_all(&self, names: &[String], variables: &[CustomVariable]) -> usize {
        let pending: Vec<&CustomVariable> = {
            let cache = self.cache.lock();
            names
                .iter()
                .filter(|n| !cache.contains_key(n.as_str()))
                .filter_map(|n| variables.iter().find(|v| &v.name == n))
                .collect()
        };

        let values = join_all(pending.iter().map(|v| self.resolve_variable(v))).await;

        let mut cache = self.cache.lock();
        for (var, value) in pending.iter().zip(values) {
            cache.insert(var.name.clone(), value);
        }
        pending.len()
    }

    async fn resolve_variable(&self, var: &CustomVariable) -> String {
        let result = match &var.source {
            VariableSource::Plain => Ok(var.fallback().to_string()),
            VariableSource::Generated { prompt } => self
                .generator
                .generate(&var.name, prompt)
                .await
                .map_err(TemplateError::from),
            VariableSource::Remote {
                endpoint_url,
                extract_path,
            } => self.fetch_remote(endpoint_url, extract_path).await,
        };

        match result {
            Ok(value) => {
                debug!(variable = %var.name, kind = var.kind_name(), "Resolved variable");
                value
            }
            Err(e) => {
                warn!(variable = %var.name, error = %e, "Variable resolution failed, using fallback");
                var.fallback().to_string()
            }
        }
    }

    async fn fetch_remote(&self, url: &str, path: &str) -> Result<String, TemplateError> {
        let document = self.fetcher.fetch_json(url).await?;
        extract_path(&document, path)
            .and_then(value_to_text)
            .ok_or_else(|| TemplateError::PathNotFound(path.to_string()))
    }

    fn substitute(&self, text: &str) -> String {
        let cache = self.cache.lock();
        TOKEN
            .replace_all(text, |caps: &Captures<'_>| match cache.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    warn!(token = &caps[0], "No variable for template token, leaving it unchanged");
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
