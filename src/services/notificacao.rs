// src/services/notificacao.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{common::error::AppError, models::vendas::ResumoProcessamento};

// ---
// Despachante de notificações (bot de chat, e-mail...).
// ---
// O formato do resumo é contrato: ver models::vendas::ResumoProcessamento.
// Falha ou demora do despachante nunca afeta o resultado do processamento.
#[async_trait]
pub trait Notificador: Send + Sync {
    async fn notificar_processamento(
        &self,
        tenant_id: Uuid,
        resumo: &ResumoProcessamento,
    ) -> Result<(), AppError>;
}

/// Despachante padrão quando nenhum bot está configurado: só loga.
pub struct NotificadorLog;

#[async_trait]
impl Notificador for NotificadorLog {
    async fn notificar_processamento(
        &self,
        tenant_id: Uuid,
        resumo: &ResumoProcessamento,
    ) -> Result<(), AppError> {
        tracing::info!(
            %tenant_id,
            total = resumo.total,
            sucesso = resumo.sucesso,
            falta_estoque = resumo.falta_estoque.len(),
            falta_mapeamento = resumo.falta_mapeamento.len(),
            produtos_inativos = resumo.produtos_inativos.len(),
            "📦 Processamento de pedidos concluído"
        );
        Ok(())
    }
}
