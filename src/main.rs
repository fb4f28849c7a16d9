//src/main.rs

use axum::{
    Router,
    routing::{get, post},
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

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização (só no modo Postgres).
    if let Some(pool) = &app_state.db_pool {
        sqlx::migrate!()
            .run(pool)
            .await
            .expect("Falha ao rodar as migrações do banco de dados.");
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    }

    let estoque_routes = Router::new()
        .route(
            "/produtos",
            post(handlers::estoque::criar_produto).get(handlers::estoque::listar_produtos),
        )
        .route(
            "/produtos/{produto_id}",
            get(handlers::estoque::buscar_produto).delete(handlers::estoque::desativar_produto),
        )
        .route(
            "/produtos/{produto_id}/entrada",
            post(handlers::estoque::entrada_estoque),
        )
        .route(
            "/produtos/{produto_id}/saida",
            post(handlers::estoque::saida_estoque),
        )
        .route(
            "/produtos/{produto_id}/movimentacoes",
            get(handlers::estoque::listar_movimentacoes),
        );

    let depara_routes = Router::new()
        .route(
            "/",
            post(handlers::depara::criar_mapeamento).get(handlers::depara::listar_mapeamentos),
        )
        .route(
            "/{sku_pedido}",
            axum::routing::delete(handlers::depara::desativar_mapeamento),
        )
        .route("/importar", post(handlers::depara::importar_planilha));

    let vendas_routes = Router::new()
        .route("/", get(handlers::vendas::listar_vendas))
        .route("/{venda_id}", get(handlers::vendas::buscar_venda))
        .route(
            "/{venda_id}/estornar",
            post(handlers::vendas::estornar_venda),
        );

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/estoque", estoque_routes)
        .nest("/api/depara", depara_routes)
        .route(
            "/api/pedidos/processar",
            post(handlers::processamento::processar_pedidos),
        )
        .route(
            "/api/previsao/{produto_id}",
            get(handlers::previsao::prever_reposicao),
        )
        .nest("/api/vendas", vendas_routes)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
        )
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
