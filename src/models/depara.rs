// src/models/depara.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Prioridade de um mapeamento ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "prioridade", rename_all = "snake_case")] // Banco
#[serde(rename_all = "snake_case")] // JSON
pub enum Prioridade {
    Baixa,
    Normal,
    Alta,
    Urgente,
}

// --- 2. Mapeamento DE/PARA ---
// Traduz o SKU vendido no marketplace (`sku_pedido`) para o SKU do
// estoque interno (`sku_correspondente`). `quantidade` é o multiplicador
// de kit: quantas unidades internas uma unidade do pedido consome.
// No máximo um mapeamento ATIVO por sku_pedido (índice parcial no banco).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapeamentoDePara {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku_pedido: String,
    pub sku_correspondente: String,
    pub sku_simples: Option<String>,
    pub quantidade: i32,
    pub prioridade: Prioridade,
    pub ativo: bool,
    pub observacoes: Option<String>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NovoMapeamento {
    pub sku_pedido: String,
    pub sku_correspondente: String,
    pub sku_simples: Option<String>,
    pub quantidade: i32,
    pub prioridade: Prioridade,
    pub observacoes: Option<String>,
}

// --- 3. Resultado da resolução de um SKU de pedido ---
// "Não mapeado" é um resultado normal (Option::None no service), nunca erro.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolucaoSku {
    pub sku_estoque: String,
    pub quantidade_multiplicador: i32,
    pub prioridade: Prioridade,
}

// --- 4. Importação em lote (planilha) ---

/// Uma linha já extraída da planilha, antes de qualquer validação.
#[derive(Debug, Clone, Default)]
pub struct LinhaImportacao {
    pub numero_linha: usize,
    pub sku_pedido: Option<String>,
    pub sku_correspondente: Option<String>,
    pub sku_simples: Option<String>,
    pub quantidade: Option<i32>,
    pub observacoes: Option<String>,
}

/// Rejeição do lote inteiro na pré-checagem (nenhuma linha importada).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejeicaoLote {
    /// SKUs que aparecem mais de uma vez dentro da própria planilha.
    pub duplicados_no_lote: Vec<String>,
    /// SKUs que já possuem mapeamento ativo no tenant.
    pub ja_mapeados: Vec<String>,
}

/// Erro tolerado de uma linha individual (a importação continua).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErroLinha {
    pub numero_linha: usize,
    pub motivo: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultadoImportacao {
    pub importados: usize,
    pub erros: Vec<ErroLinha>,
}
