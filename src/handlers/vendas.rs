// src/handlers/vendas.rs

use axum::{
    Json,
    extract::{Path, Query, State},
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
    models::vendas::FiltroVendas,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstornoPayload {
    #[validate(length(min = 1, message = "O motivo do estorno é obrigatório."))]
    pub motivo: String,
}

// GET /api/vendas
#[utoipa::path(
    get,
    path = "/api/vendas",
    tag = "Vendas",
    responses(
        (status = 200, description = "Histórico de vendas", body = [crate::models::vendas::RegistroVenda])
    ),
    params(
        ("numeroPedido" = Option<String>, Query, description = "Filtra por número de pedido"),
        ("status" = Option<String>, Query, description = "registrada | estornada"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn listar_vendas(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filtro): Query<FiltroVendas>,
) -> Result<impl IntoResponse, AppError> {
    let vendas = app_state.vendas_service.listar(tenant.0, filtro).await?;
    Ok(Json(vendas))
}

// GET /api/vendas/{id}
#[utoipa::path(
    get,
    path = "/api/vendas/{venda_id}",
    tag = "Vendas",
    responses(
        (status = 200, description = "Registro de venda", body = crate::models::vendas::RegistroVenda),
        (status = 404, description = "Venda não encontrada")
    ),
    params(
        ("venda_id" = Uuid, Path, description = "ID da Venda"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn buscar_venda(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(venda_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let venda = app_state.vendas_service.buscar(tenant.0, venda_id).await?;
    Ok(Json(venda))
}

// POST /api/vendas/{id}/estornar
#[utoipa::path(
    post,
    path = "/api/vendas/{venda_id}/estornar",
    tag = "Vendas",
    request_body = EstornoPayload,
    responses(
        (status = 200, description = "Venda estornada e estoque devolvido", body = crate::models::vendas::RegistroVenda),
        (status = 400, description = "Motivo ausente"),
        (status = 404, description = "Venda não encontrada"),
        (status = 409, description = "Venda já estornada")
    ),
    params(
        ("venda_id" = Uuid, Path, description = "ID da Venda"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn estornar_venda(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(venda_id): Path<Uuid>,
    Json(payload): Json<EstornoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let venda = app_state
        .vendas_service
        .estornar(tenant.0, venda_id, &payload.motivo)
        .await?;
    Ok(Json(venda))
}
