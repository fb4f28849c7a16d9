// src/db/atividade_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Sink de auditoria (fire-and-forget).
// ---
// Falhas aqui NUNCA afetam a operação principal: os services registram o
// erro via tracing e seguem em frente.
#[async_trait]
pub trait AtividadeStore: Send + Sync {
    async fn registrar(
        &self,
        tenant_id: Uuid,
        tipo: &str,
        descricao: &str,
        detalhes: serde_json::Value,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgAtividadeRepository {
    pool: PgPool,
}

impl PgAtividadeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AtividadeStore for PgAtividadeRepository {
    async fn registrar(
        &self,
        tenant_id: Uuid,
        tipo: &str,
        descricao: &str,
        detalhes: serde_json::Value,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO registros_atividade (tenant_id, tipo, descricao, detalhes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(tenant_id)
        .bind(tipo)
        .bind(descricao)
        .bind(detalhes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
