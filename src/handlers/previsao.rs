// src/handlers/previsao.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, middleware::tenancy::TenantContext};

#[derive(Debug, Deserialize)]
pub struct PrevisaoQuery {
    /// Janela de análise em dias (padrão: 30).
    pub dias: Option<i64>,
}

// GET /api/previsao/{produto_id}
#[utoipa::path(
    get,
    path = "/api/previsao/{produto_id}",
    tag = "Previsão",
    responses(
        (status = 200, description = "Previsão de reposição", body = crate::models::previsao::PrevisaoReposicao),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("produto_id" = Uuid, Path, description = "ID do Produto"),
        ("dias" = Option<i64>, Query, description = "Janela de análise em dias"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn prever_reposicao(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(produto_id): Path<Uuid>,
    Query(query): Query<PrevisaoQuery>,
) -> Result<impl IntoResponse, AppError> {
    let previsao = app_state
        .previsao_service
        .prever(tenant.0, produto_id, query.dias)
        .await?;
    Ok(Json(previsao))
}
