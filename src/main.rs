//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Rotas de usuário (protegidas pelo middleware)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Administração de usuários da empresa (exige claims de tenant)
    let user_admin_routes = Router::new()
        .route(
            "/",
            post(handlers::auth::create_user).get(handlers::auth::list_users),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let crm_routes = Router::new()
        // Configuração de Campos
        .route(
            "/fields",
            post(handlers::crm::create_field_definition)
                .get(handlers::crm::list_field_definitions),
        )
        .route(
            "/fields/{id}",
            axum::routing::patch(handlers::crm::update_field_definition)
                .delete(handlers::crm::retire_field_definition),
        )
        // Leads
        .route(
            "/leads",
            post(handlers::crm::create_lead).get(handlers::crm::list_leads),
        )
        .route(
            "/leads/{id}",
            get(handlers::crm::get_lead)
                .patch(handlers::crm::update_lead)
                .delete(handlers::crm::delete_lead),
        )
        // Oportunidades
        .route(
            "/opportunities",
            post(handlers::crm::create_opportunity).get(handlers::crm::list_opportunities),
        )
        .route(
            "/opportunities/{id}",
            axum::routing::patch(handlers::crm::update_opportunity)
                .delete(handlers::crm::delete_opportunity),
        )
        // Clientes
        .route(
            "/customers",
            post(handlers::crm::create_customer).get(handlers::crm::list_customers),
        )
        // Aplica o middleware de Auth + Tenancy em tudo
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let campaign_routes = Router::new()
        .route(
            "/",
            post(handlers::campaigns::create_campaign).get(handlers::campaigns::list_campaigns),
        )
        .route(
            "/{id}",
            get(handlers::campaigns::get_campaign)
                .patch(handlers::campaigns::update_campaign)
                .delete(handlers::campaigns::delete_campaign),
        )
        .route("/{id}/send", post(handlers::campaigns::send_campaign))
        .route("/{id}/tracking", get(handlers::tracking::list_campaign_tracking))
        .route("/{id}/report", get(handlers::reports::get_campaign_report))
        .route(
            "/{id}/report.csv",
            get(handlers::reports::get_campaign_report_csv),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    // Callbacks do colaborador de entrega (sem JWT: pixel e redirecionador)
    let tracking_routes = Router::new()
        .route("/{campaign_id}/open", get(handlers::tracking::track_open))
        .route("/{campaign_id}/click", get(handlers::tracking::track_click))
        .route(
            "/{campaign_id}/attachment",
            get(handlers::tracking::track_attachment),
        );

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes.merge(user_admin_routes))
        .nest("/api/crm", crm_routes)
        .nest("/api/campaigns", campaign_routes)
        .nest("/api/track", tracking_routes)
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
