// src/models/vendas.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Status de um registro de venda ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "status_venda", rename_all = "snake_case")] // Banco
#[serde(rename_all = "snake_case")] // JSON
pub enum StatusVenda {
    Registrada,
    Estornada,
}

// --- 2. Registro de venda (histórico durável) ---
// Uma linha por (numero_pedido, sku_pedido) — chave de idempotência do
// processamento em lote (constraint única no banco). `quantidade_baixada`
// é a quantidade efetivamente deduzida do estoque (pedido × multiplicador)
// e `movimentacao_id` aponta para a saída correspondente no livro-razão.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistroVenda {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub numero_pedido: String,
    pub sku_pedido: String,
    pub sku_estoque: String,
    pub nome_produto: String,
    pub quantidade: i32,
    pub quantidade_baixada: i32,
    pub valor_unitario: Option<Decimal>,
    pub valor_total: Option<Decimal>,
    pub cliente_nome: Option<String>,
    pub cliente_documento: Option<String>,
    pub status: StatusVenda,
    pub movimentacao_id: Option<Uuid>,
    pub observacoes: Option<String>,
    pub data_venda: DateTime<Utc>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NovoRegistroVenda {
    pub numero_pedido: String,
    pub sku_pedido: String,
    pub sku_estoque: String,
    pub nome_produto: String,
    pub quantidade: i32,
    pub quantidade_baixada: i32,
    pub valor_unitario: Option<Decimal>,
    pub cliente_nome: Option<String>,
    pub cliente_documento: Option<String>,
    pub movimentacao_id: Option<Uuid>,
    pub observacoes: Option<String>,
}

/// Filtro simples de listagem do histórico.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FiltroVendas {
    pub numero_pedido: Option<String>,
    pub status: Option<StatusVenda>,
}

// --- 3. Itens de pedido (entrada do processamento em lote) ---
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemPedido {
    pub numero_pedido: String,
    pub sku_pedido: String,
    pub quantidade: i32,
    pub valor_unitario: Option<Decimal>,
    pub cliente_nome: Option<String>,
    pub cliente_documento: Option<String>,
}

// --- 4. Resultado por item (soma de variantes, não contadores soltos) ---
#[derive(Debug, Clone, PartialEq)]
pub enum ResultadoItem {
    Sucesso {
        sku_pedido: String,
        quantidade_baixada: i32,
    },
    FaltaEstoque {
        produto: String,
        disponivel: i32,
        necessario: i32,
    },
    FaltaMapeamento {
        sku_pedido: String,
    },
    ProdutoInativo {
        produto: String,
    },
    // Linha já registrada no histórico: pulada, não conta como erro nem sucesso.
    JaProcessado {
        numero_pedido: String,
        sku_pedido: String,
    },
}

// --- 5. Diagnóstico de falta de estoque ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetalheFaltaEstoque {
    pub produto: String,
    pub disponivel: i32,
    pub necessario: i32,
}

// --- 6. Resumo do processamento ---
// Este é exatamente o payload entregue ao despachante de notificações,
// configurado ou não. Não mudar o formato sem combinar com o bot.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumoProcessamento {
    pub total: usize,
    pub sucesso: usize,
    pub falta_estoque: Vec<DetalheFaltaEstoque>,
    pub falta_mapeamento: Vec<String>,
    pub produtos_inativos: Vec<String>,
}

impl ResumoProcessamento {
    /// Agrega os resultados por item no formato do despachante.
    pub fn a_partir_de(resultados: &[ResultadoItem]) -> Self {
        let mut resumo = Self {
            total: resultados.len(),
            sucesso: 0,
            falta_estoque: Vec::new(),
            falta_mapeamento: Vec::new(),
            produtos_inativos: Vec::new(),
        };

        for resultado in resultados {
            match resultado {
                ResultadoItem::Sucesso { .. } => resumo.sucesso += 1,
                ResultadoItem::FaltaEstoque {
                    produto,
                    disponivel,
                    necessario,
                } => resumo.falta_estoque.push(DetalheFaltaEstoque {
                    produto: produto.clone(),
                    disponivel: *disponivel,
                    necessario: *necessario,
                }),
                ResultadoItem::FaltaMapeamento { sku_pedido } => {
                    resumo.falta_mapeamento.push(sku_pedido.clone())
                }
                ResultadoItem::ProdutoInativo { produto } => {
                    resumo.produtos_inativos.push(produto.clone())
                }
                // Itens já processados são no-op: ficam fora de todas as listas.
                ResultadoItem::JaProcessado { .. } => {}
            }
        }

        resumo
    }
}
