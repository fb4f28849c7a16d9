// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::depara::RejeicaoLote;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Faltas de mapeamento/estoque durante o processamento em lote NÃO passam
// por aqui: são resultados normais por item (ver models::vendas::ResultadoItem).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("O motivo do estorno é obrigatório")]
    MotivoObrigatorio,

    #[error("Produto não encontrado")]
    ProdutoNaoEncontrado,

    #[error("Venda não encontrada")]
    VendaNaoEncontrada,

    #[error("Venda já estornada")]
    VendaJaEstornada,

    #[error("Venda já registrada para este pedido/SKU")]
    VendaJaRegistrada,

    #[error("SKU já existe")]
    SkuJaExiste,

    #[error("Já existe mapeamento ativo para o SKU '{0}'")]
    MapeamentoJaExiste(String),

    #[error("Mapeamento não encontrado")]
    MapeamentoNaoEncontrado,

    #[error("Lote de importação rejeitado na pré-checagem")]
    LoteRejeitado(RejeicaoLote),

    #[error("Saldo insuficiente (disponível: {disponivel}, necessário: {necessario})")]
    SaldoInsuficiente { disponivel: i32, necessario: i32 },

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // A rejeição do lote carrega as listas de SKUs ofensores.
            AppError::LoteRejeitado(rejeicao) => {
                let body = Json(json!({
                    "error": "Lote de importação rejeitado na pré-checagem.",
                    "details": rejeicao,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }

            AppError::SaldoInsuficiente {
                disponivel,
                necessario,
            } => {
                let body = Json(json!({
                    "error": "Saldo insuficiente em estoque.",
                    "details": { "disponivel": disponivel, "necessario": necessario },
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }

            AppError::BadRequest(mensagem) => {
                let body = Json(json!({ "error": mensagem }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::MotivoObrigatorio => {
                (StatusCode::BAD_REQUEST, "O motivo do estorno é obrigatório.")
            }
            AppError::ProdutoNaoEncontrado => (StatusCode::NOT_FOUND, "Produto não encontrado."),
            AppError::VendaNaoEncontrada => (StatusCode::NOT_FOUND, "Venda não encontrada."),
            AppError::VendaJaEstornada => {
                (StatusCode::CONFLICT, "Esta venda já foi estornada.")
            }
            AppError::VendaJaRegistrada => (
                StatusCode::CONFLICT,
                "Já existe registro de venda para este pedido/SKU.",
            ),
            AppError::SkuJaExiste => (StatusCode::CONFLICT, "Este SKU já está em uso."),
            AppError::MapeamentoJaExiste(_) => (
                StatusCode::CONFLICT,
                "Já existe mapeamento ativo para este SKU de pedido.",
            ),
            AppError::MapeamentoNaoEncontrado => {
                (StatusCode::NOT_FOUND, "Mapeamento não encontrado.")
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
