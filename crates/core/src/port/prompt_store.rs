// Prompt Store Port

use crate::domain::{PromptMap, PromptTemplate, PromptVariable, VariableMap};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Insert built-in templates and variables that are not stored yet.
    /// Existing rows (user edits) are left alone.
    async fn seed_defaults(&self) -> Result<()>;

    /// Stored content overlaid on the built-in catalog
    async fn load_prompt_map(&self) -> Result<PromptMap>;

    /// Stored variables plus missing built-ins, sorted per key
    async fn load_variable_map(&self) -> Result<VariableMap>;

    /// Stored templates ordered by key
    async fn list_templates(&self) -> Result<Vec<PromptTemplate>>;

    /// Replace a template's content, creating the row if needed
    async fn update_template(&self, key: &str, content: &str) -> Result<PromptTemplate>;

    /// Create or replace a variable definition
    async fn upsert_variable(&self, variable: &PromptVariable) -> Result<PromptVariable>;

    /// Returns false when no such variable exists
    async fn delete_variable(&self, prompt_key: &str, name: &str) -> Result<bool>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::prompt::{default_prompt_map, default_variable_map, sort_variables};

    /// Serves the built-in catalog, optionally with overrides
    #[derive(Default)]
    pub struct StaticPromptStore {
        overrides: PromptMap,
        variables: Option<VariableMap>,
    }

    impl StaticPromptStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_prompt(mut self, key: &str, content: &str) -> Self {
            self.overrides.insert(key.to_string(), content.to_string());
            self
        }

        pub fn with_variables(mut self, variables: VariableMap) -> Self {
            self.variables = Some(variables);
            self
        }
    }

    #[async_trait]
    impl PromptStore for StaticPromptStore {
        async fn seed_defaults(&self) -> Result<()> {
            Ok(())
        }

        async fn load_prompt_map(&self) -> Result<PromptMap> {
            let mut map = default_prompt_map();
            map.extend(self.overrides.clone());
            Ok(map)
        }

        async fn load_variable_map(&self) -> Result<VariableMap> {
            let mut map = self.variables.clone().unwrap_or_else(default_variable_map);
            for list in map.values_mut() {
                sort_variables(list);
            }
            Ok(map)
        }

        async fn list_templates(&self) -> Result<Vec<PromptTemplate>> {
            Ok(Vec::new())
        }

        async fn update_template(&self, key: &str, content: &str) -> Result<PromptTemplate> {
            Ok(PromptTemplate {
                key: key.to_string(),
                label: crate::domain::prompt::default_label(key).to_string(),
                content: content.to_string(),
                updated_at: 0,
            })
        }

        async fn upsert_variable(&self, variable: &PromptVariable) -> Result<PromptVariable> {
            Ok(variable.clone())
        }

        async fn delete_variable(&self, _prompt_key: &str, _name: &str) -> Result<bool> {
            Ok(false)
        }
    }
}
