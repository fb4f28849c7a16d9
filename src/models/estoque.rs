// src/models/estoque.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Produto (item de estoque) ---
// O SKU interno identifica o produto dentro do tenant. O saldo
// (`quantidade_atual`) só muda através do livro de movimentações.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Produto {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku: String,
    pub nome: String,
    pub categoria: Option<String>,

    // Saldo físico atual. Nunca negativo (CHECK no banco).
    pub quantidade_atual: i32,

    pub estoque_minimo: i32,
    pub estoque_maximo: i32,

    pub preco_custo: Option<Decimal>,
    pub preco_venda: Option<Decimal>,

    // Único entre produtos ativos do tenant (índice parcial).
    pub codigo_barras: Option<String>,

    pub ativo: bool,
    pub ultima_movimentacao: Option<DateTime<Utc>>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

// --- 2. Tipo de movimentação ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tipo_movimentacao", rename_all = "snake_case")] // Banco
#[serde(rename_all = "snake_case")] // JSON
pub enum TipoMovimentacao {
    Entrada,
    Saida,
}

// --- 3. Movimentação (livro-razão, append-only) ---
// Cada mudança de saldo gera exatamente uma linha aqui, com o saldo
// anterior e o novo. Nunca é alterada nem apagada; um estorno gera uma
// nova linha compensatória de `entrada`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovimentacaoEstoque {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub produto_id: Uuid,
    pub tipo: TipoMovimentacao,
    pub quantidade: i32,
    pub quantidade_anterior: i32,
    pub quantidade_nova: i32,
    pub motivo: String,
    pub observacoes: Option<String>,
    pub criado_em: DateTime<Utc>,
}

// --- 4. Dados de criação de produto ---
// Separado do `Produto` porque id, saldo e timestamps nascem no store.
#[derive(Debug, Clone)]
pub struct NovoProduto {
    pub sku: String,
    pub nome: String,
    pub categoria: Option<String>,
    pub quantidade_inicial: i32,
    pub estoque_minimo: i32,
    pub estoque_maximo: i32,
    pub preco_custo: Option<Decimal>,
    pub preco_venda: Option<Decimal>,
    pub codigo_barras: Option<String>,
}
