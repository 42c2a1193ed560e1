use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tracing::{info, warn};

use zam_agent::{GeminiClient, LlmError, NarrativeRefiner, RefinerPolicy};
use zam_core::config::{AppConfig, ConfigError, LoadOptions};
use zam_db::{
    connect_with_settings, migrations, DbPool, ReferenceSeed, SqlAnalysisRepository,
    SqlReferenceRepository,
};

use crate::api::{self, ApiState};
use crate::health;
use crate::rate_limit::RateLimiter;
use crate::reference_cache::ReferenceCache;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: ApiState,
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("model client setup failed: {0}")]
    ModelClient(#[source] LlmError),
    #[error("prompt template failed to compile: {0}")]
    PromptTemplate(#[source] tera::Error),
}

impl Application {
    pub fn router(&self) -> Router {
        api::router(
            self.state.clone(),
            self.rate_limiter.clone(),
            self.config.server.cors_allow_any,
        )
        .merge(health::router(
            self.db_pool.clone(),
            Arc::clone(&self.state.reference),
            self.state.refiner.is_some(),
        ))
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", correlation_id = "bootstrap", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    // Reference reads fall back to the built-in seed, so a failed seed only degrades.
    if let Err(error) = ReferenceSeed::load(&db_pool).await {
        warn!(
            event_name = "system.bootstrap.seed_failed",
            correlation_id = "bootstrap",
            error = %error,
            "reference seed could not be applied"
        );
    }

    let refiner = build_refiner(&config)?;
    if refiner.is_none() {
        warn!(
            event_name = "system.bootstrap.ai_disabled",
            correlation_id = "bootstrap",
            "no model API key configured; /api/ai/analyze will report the service as not configured"
        );
    }

    let state = ApiState {
        analyses: Arc::new(SqlAnalysisRepository::new(db_pool.clone())),
        reference: Arc::new(ReferenceCache::new(Arc::new(SqlReferenceRepository::new(
            db_pool.clone(),
        )))),
        refiner,
        sizing: Arc::new(config.sizing.clone()),
    };
    let rate_limiter = RateLimiter::from_config(&config.rate_limit).map(Arc::new);

    Ok(Application { config, db_pool, state, rate_limiter })
}

fn build_refiner(config: &AppConfig) -> Result<Option<Arc<NarrativeRefiner>>, BootstrapError> {
    let Some(api_key) = config.llm.api_key.clone().filter(|_| config.llm.has_api_key()) else {
        return Ok(None);
    };

    let client = GeminiClient::new(
        config.llm.base_url.clone(),
        api_key,
        Duration::from_secs(config.llm.request_timeout_secs),
    )
    .map_err(BootstrapError::ModelClient)?;
    let policy = RefinerPolicy::from(&config.llm);
    info!(
        event_name = "system.bootstrap.ai_enabled",
        correlation_id = "bootstrap",
        models = ?policy.models,
        retries_per_model = policy.retries_per_model,
        "model refinement enabled"
    );

    let refiner =
        NarrativeRefiner::new(Arc::new(client), policy).map_err(BootstrapError::PromptTemplate)?;
    Ok(Some(Arc::new(refiner)))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use zam_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn options(api_key: Option<&str>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                llm_api_key: Some(api_key.unwrap_or_default().to_string()),
                rate_limit_enabled: Some(false),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_database_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://localhost/zam".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }

    #[tokio::test]
    async fn bootstrap_seeds_reference_data_and_serves_it() {
        let app = bootstrap(options(None)).await.expect("bootstrap should succeed");

        let (industries,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM industry")
            .fetch_one(&app.db_pool)
            .await
            .expect("industry count");
        assert_eq!(industries, 5);
        assert!(app.state.refiner.is_none());
        assert!(app.rate_limiter.is_none());

        let response = app
            .router()
            .oneshot(Request::builder().uri("/api/constants").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let constants: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(constants["GEOGRAPHIES"].as_array().map(Vec::len), Some(6));
        assert!(app.state.reference.is_frozen());

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn api_key_enables_refiner() {
        let app = bootstrap(options(Some("test-key"))).await.expect("bootstrap should succeed");

        assert!(app.state.refiner.is_some());
        let health = app
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health");
        assert_eq!(health.status(), StatusCode::OK);

        app.db_pool.close().await;
    }
}
