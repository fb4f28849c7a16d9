// src/handlers/depara.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::depara::{NovoMapeamento, Prioridade},
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CriarMapeamentoPayload {
    #[validate(length(min = 1, message = "O SKU do pedido é obrigatório."))]
    pub sku_pedido: String,

    #[validate(length(min = 1, message = "O SKU correspondente é obrigatório."))]
    pub sku_correspondente: String,

    pub sku_simples: Option<String>,

    /// Multiplicador de kit: unidades internas por unidade do pedido.
    #[validate(range(min = 1, message = "O multiplicador deve ser positivo."))]
    #[serde(default = "multiplicador_padrao")]
    pub quantidade: i32,

    #[serde(default = "prioridade_padrao")]
    pub prioridade: Prioridade,

    pub observacoes: Option<String>,
}

fn multiplicador_padrao() -> i32 {
    1
}

fn prioridade_padrao() -> Prioridade {
    Prioridade::Normal
}

#[derive(Debug, Deserialize)]
pub struct ListarMapeamentosQuery {
    #[serde(default)]
    pub apenas_ativos: bool,
}

// ---
// Handlers
// ---

// POST /api/depara
#[utoipa::path(
    post,
    path = "/api/depara",
    tag = "DE/PARA",
    request_body = CriarMapeamentoPayload,
    responses(
        (status = 201, description = "Mapeamento criado", body = crate::models::depara::MapeamentoDePara),
        (status = 409, description = "Já existe mapeamento ativo para o SKU")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn criar_mapeamento(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CriarMapeamentoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mapeamento = app_state
        .depara_service
        .criar(
            tenant.0,
            NovoMapeamento {
                sku_pedido: payload.sku_pedido,
                sku_correspondente: payload.sku_correspondente,
                sku_simples: payload.sku_simples,
                quantidade: payload.quantidade,
                prioridade: payload.prioridade,
                observacoes: payload.observacoes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(mapeamento)))
}

// GET /api/depara
#[utoipa::path(
    get,
    path = "/api/depara",
    tag = "DE/PARA",
    responses(
        (status = 200, description = "Mapeamentos", body = [crate::models::depara::MapeamentoDePara])
    ),
    params(
        ("apenas_ativos" = Option<bool>, Query, description = "Filtra mapeamentos desativados"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn listar_mapeamentos(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListarMapeamentosQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mapeamentos = app_state
        .depara_service
        .listar(tenant.0, query.apenas_ativos)
        .await?;
    Ok(Json(mapeamentos))
}

// DELETE /api/depara/{sku_pedido}
#[utoipa::path(
    delete,
    path = "/api/depara/{sku_pedido}",
    tag = "DE/PARA",
    responses(
        (status = 204, description = "Mapeamento desativado"),
        (status = 404, description = "Mapeamento não encontrado")
    ),
    params(
        ("sku_pedido" = String, Path, description = "SKU de pedido mapeado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn desativar_mapeamento(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(sku_pedido): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .depara_service
        .desativar(tenant.0, &sku_pedido)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/depara/importar — corpo é o CSV cru da planilha.
#[utoipa::path(
    post,
    path = "/api/depara/importar",
    tag = "DE/PARA",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Resultado da importação", body = crate::models::depara::ResultadoImportacao),
        (status = 422, description = "Lote rejeitado na pré-checagem (duplicados ou já mapeados)")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn importar_planilha(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    corpo: String,
) -> Result<impl IntoResponse, AppError> {
    let resultado = app_state
        .depara_service
        .importar_planilha(tenant.0, &corpo)
        .await?;
    Ok(Json(resultado))
}
