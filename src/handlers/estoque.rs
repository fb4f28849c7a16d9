// src/handlers/estoque.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::estoque::NovoProduto,
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CriarProdutoPayload {
    #[validate(length(min = 1, message = "O SKU é obrigatório."))]
    pub sku: String,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub nome: String,

    pub categoria: Option<String>,

    #[validate(range(min = 0, message = "A quantidade inicial não pode ser negativa."))]
    #[serde(default)]
    pub quantidade_inicial: i32,

    #[validate(range(min = 0, message = "O estoque mínimo não pode ser negativo."))]
    #[serde(default)]
    pub estoque_minimo: i32,

    #[validate(range(min = 0, message = "O estoque máximo não pode ser negativo."))]
    #[serde(default)]
    pub estoque_maximo: i32,

    pub preco_custo: Option<Decimal>,
    pub preco_venda: Option<Decimal>,
    pub codigo_barras: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovimentacaoPayload {
    #[validate(range(min = 1, message = "A quantidade deve ser positiva."))]
    pub quantidade: i32,

    #[validate(length(min = 1, message = "O motivo é obrigatório."))]
    pub motivo: String,

    pub observacoes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListarProdutosQuery {
    #[serde(default)]
    pub apenas_ativos: bool,
}

#[derive(Debug, Deserialize)]
pub struct MovimentacoesQuery {
    pub desde: Option<DateTime<Utc>>,
}

// ---
// Handlers
// ---

// POST /api/estoque/produtos
#[utoipa::path(
    post,
    path = "/api/estoque/produtos",
    tag = "Estoque",
    request_body = CriarProdutoPayload,
    responses(
        (status = 201, description = "Produto criado", body = crate::models::estoque::Produto),
        (status = 409, description = "SKU já em uso")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn criar_produto(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CriarProdutoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let produto = app_state
        .estoque_service
        .criar_produto(
            tenant.0,
            NovoProduto {
                sku: payload.sku,
                nome: payload.nome,
                categoria: payload.categoria,
                quantidade_inicial: payload.quantidade_inicial,
                estoque_minimo: payload.estoque_minimo,
                estoque_maximo: payload.estoque_maximo,
                preco_custo: payload.preco_custo,
                preco_venda: payload.preco_venda,
                codigo_barras: payload.codigo_barras,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(produto)))
}

// GET /api/estoque/produtos
#[utoipa::path(
    get,
    path = "/api/estoque/produtos",
    tag = "Estoque",
    responses(
        (status = 200, description = "Lista de produtos", body = [crate::models::estoque::Produto])
    ),
    params(
        ("apenas_ativos" = Option<bool>, Query, description = "Filtra produtos desativados"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn listar_produtos(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListarProdutosQuery>,
) -> Result<impl IntoResponse, AppError> {
    let produtos = app_state
        .estoque_service
        .listar_produtos(tenant.0, query.apenas_ativos)
        .await?;
    Ok(Json(produtos))
}

// GET /api/estoque/produtos/{id}
#[utoipa::path(
    get,
    path = "/api/estoque/produtos/{produto_id}",
    tag = "Estoque",
    responses(
        (status = 200, description = "Produto", body = crate::models::estoque::Produto),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("produto_id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn buscar_produto(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(produto_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let produto = app_state
        .estoque_service
        .buscar_produto(tenant.0, produto_id)
        .await?;
    Ok(Json(produto))
}

// DELETE /api/estoque/produtos/{id} (soft-delete)
#[utoipa::path(
    delete,
    path = "/api/estoque/produtos/{produto_id}",
    tag = "Estoque",
    responses(
        (status = 204, description = "Produto desativado"),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("produto_id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn desativar_produto(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(produto_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .estoque_service
        .desativar_produto(tenant.0, produto_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/estoque/produtos/{id}/entrada
#[utoipa::path(
    post,
    path = "/api/estoque/produtos/{produto_id}/entrada",
    tag = "Estoque",
    request_body = MovimentacaoPayload,
    responses(
        (status = 201, description = "Entrada registrada", body = crate::models::estoque::MovimentacaoEstoque),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("produto_id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn entrada_estoque(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(produto_id): Path<Uuid>,
    Json(payload): Json<MovimentacaoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let movimentacao = app_state
        .estoque_service
        .entrada_manual(
            tenant.0,
            produto_id,
            payload.quantidade,
            &payload.motivo,
            payload.observacoes.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movimentacao)))
}

// POST /api/estoque/produtos/{id}/saida
#[utoipa::path(
    post,
    path = "/api/estoque/produtos/{produto_id}/saida",
    tag = "Estoque",
    request_body = MovimentacaoPayload,
    responses(
        (status = 201, description = "Saída registrada", body = crate::models::estoque::MovimentacaoEstoque),
        (status = 404, description = "Produto não encontrado"),
        (status = 409, description = "Saldo insuficiente")
    ),
    params(
        ("produto_id" = Uuid, Path, description = "ID do Produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn saida_estoque(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(produto_id): Path<Uuid>,
    Json(payload): Json<MovimentacaoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let movimentacao = app_state
        .estoque_service
        .saida_manual(
            tenant.0,
            produto_id,
            payload.quantidade,
            &payload.motivo,
            payload.observacoes.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movimentacao)))
}

// GET /api/estoque/produtos/{id}/movimentacoes
#[utoipa::path(
    get,
    path = "/api/estoque/produtos/{produto_id}/movimentacoes",
    tag = "Estoque",
    responses(
        (status = 200, description = "Movimentações em ordem cronológica", body = [crate::models::estoque::MovimentacaoEstoque])
    ),
    params(
        ("produto_id" = Uuid, Path, description = "ID do Produto"),
        ("desde" = Option<String>, Query, description = "Recorte inicial (RFC 3339)"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn listar_movimentacoes(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(produto_id): Path<Uuid>,
    Query(query): Query<MovimentacoesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let movimentacoes = app_state
        .estoque_service
        .movimentacoes(tenant.0, produto_id, query.desde)
        .await?;
    Ok(Json(movimentacoes))
}
