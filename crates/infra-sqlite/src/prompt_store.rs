// SQLite PromptStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use contentforge_core::domain::prompt::{
    default_label, default_prompt_map, default_variables, sort_variables, DEFAULT_PROMPTS,
};
use contentforge_core::domain::{
    PromptMap, PromptTemplate, PromptVariable, VariableKind, VariableMap,
};
use contentforge_core::error::{AppError, Result};
use contentforge_core::port::{PromptStore, TimeProvider};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SqlitePromptStore {
    pool: SqlitePool,
    time: Arc<dyn TimeProvider>,
}

impl SqlitePromptStore {
    pub fn new(pool: SqlitePool, time: Arc<dyn TimeProvider>) -> Self {
        Self { pool, time }
    }

    async fn find_template(&self, key: &str) -> Result<Option<PromptTemplate>> {
        let row = sqlx::query_as::<_, TemplateRow>(
            "SELECT key, label, content, updated_at FROM prompt_templates WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(TemplateRow::into_template))
    }

    async fn stored_variables(&self) -> Result<Vec<PromptVariable>> {
        let rows = sqlx::query_as::<_, VariableRow>(
            r#"
            SELECT prompt_key, name, value_type, default_value, description,
                   ai_instruction, sort_order
            FROM prompt_variables
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(VariableRow::into_variable).collect())
    }
}

#[async_trait]
impl PromptStore for SqlitePromptStore {
    async fn seed_defaults(&self) -> Result<()> {
        let now = self.time.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let mut templates = 0u64;
        for prompt in DEFAULT_PROMPTS {
            templates += sqlx::query(
                "INSERT OR IGNORE INTO prompt_templates (key, label, content, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(prompt.key)
            .bind(prompt.label)
            .bind(prompt.content)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();
        }

        let mut variables = 0u64;
        for variable in default_variables() {
            variables += insert_variable(&mut tx, &variable, "INSERT OR IGNORE")
                .await?
                .rows_affected();
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        if templates > 0 || variables > 0 {
            info!(templates, variables, "Seeded default prompts");
        } else {
            debug!("Default prompts already present");
        }
        Ok(())
    }

    async fn load_prompt_map(&self) -> Result<PromptMap> {
        let mut map = default_prompt_map();
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, content FROM prompt_templates")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        map.extend(rows);
        Ok(map)
    }

    async fn load_variable_map(&self) -> Result<VariableMap> {
        let stored = self.stored_variables().await?;
        let present: HashSet<(String, String)> = stored
            .iter()
            .map(|v| (v.prompt_key.clone(), v.name.clone()))
            .collect();

        let mut map = VariableMap::new();
        let missing = default_variables()
            .into_iter()
            .filter(|v| !present.contains(&(v.prompt_key.clone(), v.name.clone())));
        for variable in stored.into_iter().chain(missing) {
            map.entry(variable.prompt_key.clone())
                .or_default()
                .push(variable);
        }
        for list in map.values_mut() {
            sort_variables(list);
        }
        Ok(map)
    }

    async fn list_templates(&self) -> Result<Vec<PromptTemplate>> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            "SELECT key, label, content, updated_at FROM prompt_templates ORDER BY key ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(TemplateRow::into_template).collect())
    }

    async fn update_template(&self, key: &str, content: &str) -> Result<PromptTemplate> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::Validation("prompt key is required".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO prompt_templates (key, label, content, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(default_label(key))
        .bind(content)
        .bind(self.time.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        info!(prompt_key = %key, "Prompt template updated");
        self.find_template(key)
            .await?
            .ok_or_else(|| AppError::Internal(format!("template vanished after update: {}", key)))
    }

    async fn upsert_variable(&self, variable: &PromptVariable) -> Result<PromptVariable> {
        if variable.prompt_key.trim().is_empty() || variable.name.trim().is_empty() {
            return Err(AppError::Validation(
                "prompt_key and name are required".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        insert_variable(&mut tx, variable, "INSERT OR REPLACE").await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        info!(
            prompt_key = %variable.prompt_key,
            name = %variable.name,
            value_type = variable.kind.as_str(),
            "Prompt variable saved"
        );
        Ok(variable.clone())
    }

    async fn delete_variable(&self, prompt_key: &str, name: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM prompt_variables WHERE prompt_key = ? AND name = ?")
                .bind(prompt_key)
                .bind(name)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_variable(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    variable: &PromptVariable,
    verb: &str,
) -> Result<sqlx::sqlite::SqliteQueryResult> {
    let sql = format!(
        r#"
        {verb} INTO prompt_variables (
            prompt_key, name, value_type, default_value, description,
            ai_instruction, sort_order
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#
    );
    sqlx::query(&sql)
        .bind(&variable.prompt_key)
        .bind(&variable.name)
        .bind(variable.kind.as_str())
        .bind(&variable.default_value)
        .bind(&variable.description)
        .bind(variable.kind.instruction())
        .bind(variable.sort_order)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)
}

#[derive(sqlx::FromRow)]
struct TemplateRow {
    key: String,
    label: String,
    content: String,
    updated_at: i64,
}

impl TemplateRow {
    fn into_template(self) -> PromptTemplate {
        PromptTemplate {
            key: self.key,
            label: self.label,
            content: self.content,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VariableRow {
    prompt_key: String,
    name: String,
    value_type: String,
    default_value: String,
    description: String,
    ai_instruction: String,
    sort_order: i64,
}

impl VariableRow {
    fn into_variable(self) -> PromptVariable {
        PromptVariable {
            kind: VariableKind::from_parts(&self.value_type, &self.ai_instruction),
            prompt_key: self.prompt_key,
            name: self.name,
            default_value: self.default_value,
            description: self.description,
            sort_order: self.sort_order,
        }
    }
}
