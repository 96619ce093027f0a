// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{CampaignRepository, CrmRepository, UserRepository},
    services::{
        auth::AuthService,
        campaign_service::{CampaignService, TracingDispatcher},
        crm_service::CrmService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub i18n_store: I18nStore,
    pub auth_service: AuthService,
    pub crm_service: CrmService,
    pub campaign_service: CampaignService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL deve ser definida"))?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET deve ser definido"))?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let crm_repo = CrmRepository::new();
        let campaign_repo = CampaignRepository::new();

        let auth_service = AuthService::new(user_repo, jwt_secret.clone(), db_pool.clone());
        let crm_service = CrmService::new(crm_repo.clone());
        let campaign_service = CampaignService::new(
            campaign_repo,
            crm_repo,
            Arc::new(TracingDispatcher),
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            jwt_secret,
            i18n_store: I18nStore::new(),
            auth_service,
            crm_service,
            campaign_service,
        })
    }
}
