// src/handlers/processamento.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::vendas::ItemPedido,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessarPedidosPayload {
    pub itens: Vec<ItemPedido>,
}

impl ProcessarPedidosPayload {
    // Validação de consistência: tudo rejeitado antes de tocar no estoque.
    fn validar(&self) -> Result<(), AppError> {
        if self.itens.is_empty() {
            return Err(AppError::BadRequest(
                "O lote precisa de ao menos um item.".to_string(),
            ));
        }
        for (i, item) in self.itens.iter().enumerate() {
            if item.numero_pedido.trim().is_empty() || item.sku_pedido.trim().is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Item {}: número do pedido e SKU são obrigatórios.",
                    i + 1
                )));
            }
            if item.quantidade < 1 {
                return Err(AppError::BadRequest(format!(
                    "Item {}: a quantidade deve ser positiva.",
                    i + 1
                )));
            }
        }
        Ok(())
    }
}

// POST /api/pedidos/processar
#[utoipa::path(
    post,
    path = "/api/pedidos/processar",
    tag = "Pedidos",
    request_body = ProcessarPedidosPayload,
    responses(
        (status = 200, description = "Resumo do processamento, item a item", body = crate::models::vendas::ResumoProcessamento)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn processar_pedidos(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<ProcessarPedidosPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validar()?;

    let resumo = app_state
        .processamento_service
        .processar_pedidos(tenant.0, &payload.itens)
        .await?;
    Ok(Json(resumo))
}
