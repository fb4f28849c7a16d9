// src/db/estoque_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::estoque::{MovimentacaoEstoque, NovoProduto, Produto, TipoMovimentacao},
};

// ---
// O contrato do estoque: produtos + livro de movimentações.
// ---
// A dupla "atualiza saldo + grava movimentação" é SEMPRE atômica aqui
// dentro; nenhum service escreve saldo diretamente.
#[async_trait]
pub trait EstoqueStore: Send + Sync {
    async fn criar_produto(&self, tenant_id: Uuid, novo: NovoProduto) -> Result<Produto, AppError>;

    async fn buscar_produto(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
    ) -> Result<Option<Produto>, AppError>;

    async fn buscar_por_sku(
        &self,
        tenant_id: Uuid,
        sku: &str,
    ) -> Result<Option<Produto>, AppError>;

    async fn listar_produtos(
        &self,
        tenant_id: Uuid,
        apenas_ativos: bool,
    ) -> Result<Vec<Produto>, AppError>;

    /// Soft-delete: `ativo = false`, histórico preservado.
    async fn desativar_produto(&self, tenant_id: Uuid, produto_id: Uuid)
    -> Result<bool, AppError>;

    /// Baixa condicional e atômica: só deduz se `quantidade_atual >= quantidade`.
    /// `None` = saldo insuficiente, nada foi alterado. É o ÚNICO caminho de
    /// saída de estoque (processamento em lote e baixa manual).
    async fn baixa_condicional(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        quantidade: i32,
        motivo: &str,
        observacoes: Option<&str>,
    ) -> Result<Option<MovimentacaoEstoque>, AppError>;

    /// Entrada de estoque (compra, ajuste, estorno). Sempre bem-sucedida
    /// para produto existente.
    async fn registrar_entrada(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        quantidade: i32,
        motivo: &str,
        observacoes: Option<&str>,
    ) -> Result<MovimentacaoEstoque, AppError>;

    /// Movimentações do produto a partir de `inicio`, em ordem cronológica.
    async fn movimentacoes_desde(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        inicio: DateTime<Utc>,
    ) -> Result<Vec<MovimentacaoEstoque>, AppError>;

    async fn buscar_movimentacao(
        &self,
        tenant_id: Uuid,
        movimentacao_id: Uuid,
    ) -> Result<Option<MovimentacaoEstoque>, AppError>;
}

// ---
// Implementação Postgres
// ---
#[derive(Clone)]
pub struct PgEstoqueRepository {
    pool: PgPool,
}

impl PgEstoqueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EstoqueStore for PgEstoqueRepository {
    async fn criar_produto(&self, tenant_id: Uuid, novo: NovoProduto) -> Result<Produto, AppError> {
        let mut tx = self.pool.begin().await?;

        let produto = sqlx::query_as::<_, Produto>(
            r#"
            INSERT INTO produtos
                (tenant_id, sku, nome, categoria, quantidade_atual, estoque_minimo,
                 estoque_maximo, preco_custo, preco_venda, codigo_barras)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&novo.sku)
        .bind(&novo.nome)
        .bind(&novo.categoria)
        .bind(novo.quantidade_inicial)
        .bind(novo.estoque_minimo)
        .bind(novo.estoque_maximo)
        .bind(novo.preco_custo)
        .bind(novo.preco_venda)
        .bind(&novo.codigo_barras)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::SkuJaExiste;
                }
            }
            e.into()
        })?;

        // Estoque inicial entra pelo livro, como qualquer outra entrada.
        if novo.quantidade_inicial > 0 {
            sqlx::query(
                r#"
                INSERT INTO movimentacoes_estoque
                    (tenant_id, produto_id, tipo, quantidade, quantidade_anterior,
                     quantidade_nova, motivo)
                VALUES ($1, $2, $3, $4, 0, $4, 'Estoque inicial')
                "#,
            )
            .bind(tenant_id)
            .bind(produto.id)
            .bind(TipoMovimentacao::Entrada)
            .bind(novo.quantidade_inicial)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(produto)
    }

    async fn buscar_produto(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
    ) -> Result<Option<Produto>, AppError> {
        let produto = sqlx::query_as::<_, Produto>(
            "SELECT * FROM produtos WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(produto_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(produto)
    }

    async fn buscar_por_sku(
        &self,
        tenant_id: Uuid,
        sku: &str,
    ) -> Result<Option<Produto>, AppError> {
        let produto = sqlx::query_as::<_, Produto>(
            "SELECT * FROM produtos WHERE tenant_id = $1 AND sku = $2",
        )
        .bind(tenant_id)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;
        Ok(produto)
    }

    async fn listar_produtos(
        &self,
        tenant_id: Uuid,
        apenas_ativos: bool,
    ) -> Result<Vec<Produto>, AppError> {
        let produtos = sqlx::query_as::<_, Produto>(
            r#"
            SELECT * FROM produtos
            WHERE tenant_id = $1 AND ($2 = false OR ativo)
            ORDER BY nome ASC
            "#,
        )
        .bind(tenant_id)
        .bind(apenas_ativos)
        .fetch_all(&self.pool)
        .await?;
        Ok(produtos)
    }

    async fn desativar_produto(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
    ) -> Result<bool, AppError> {
        let resultado = sqlx::query(
            r#"
            UPDATE produtos SET ativo = false, atualizado_em = now()
            WHERE tenant_id = $1 AND id = $2 AND ativo
            "#,
        )
        .bind(tenant_id)
        .bind(produto_id)
        .execute(&self.pool)
        .await?;
        Ok(resultado.rows_affected() > 0)
    }

    async fn baixa_condicional(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        quantidade: i32,
        motivo: &str,
        observacoes: Option<&str>,
    ) -> Result<Option<MovimentacaoEstoque>, AppError> {
        let mut tx = self.pool.begin().await?;

        // O WHERE carrega a checagem de saldo: duas baixas concorrentes não
        // conseguem passar ambas — a segunda não casa a condição e vira None.
        let produto = sqlx::query_as::<_, Produto>(
            r#"
            UPDATE produtos
            SET quantidade_atual = quantidade_atual - $3,
                ultima_movimentacao = now(),
                atualizado_em = now()
            WHERE tenant_id = $1 AND id = $2 AND ativo AND quantidade_atual >= $3
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(produto_id)
        .bind(quantidade)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(produto) = produto else {
            tx.rollback().await?;
            return Ok(None);
        };

        let movimentacao = sqlx::query_as::<_, MovimentacaoEstoque>(
            r#"
            INSERT INTO movimentacoes_estoque
                (tenant_id, produto_id, tipo, quantidade, quantidade_anterior,
                 quantidade_nova, motivo, observacoes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(produto_id)
        .bind(TipoMovimentacao::Saida)
        .bind(quantidade)
        .bind(produto.quantidade_atual + quantidade)
        .bind(produto.quantidade_atual)
        .bind(motivo)
        .bind(observacoes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(movimentacao))
    }

    async fn registrar_entrada(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        quantidade: i32,
        motivo: &str,
        observacoes: Option<&str>,
    ) -> Result<MovimentacaoEstoque, AppError> {
        let mut tx = self.pool.begin().await?;

        let produto = sqlx::query_as::<_, Produto>(
            r#"
            UPDATE produtos
            SET quantidade_atual = quantidade_atual + $3,
                ultima_movimentacao = now(),
                atualizado_em = now()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(produto_id)
        .bind(quantidade)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::ProdutoNaoEncontrado)?;

        let movimentacao = sqlx::query_as::<_, MovimentacaoEstoque>(
            r#"
            INSERT INTO movimentacoes_estoque
                (tenant_id, produto_id, tipo, quantidade, quantidade_anterior,
                 quantidade_nova, motivo, observacoes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(produto_id)
        .bind(TipoMovimentacao::Entrada)
        .bind(quantidade)
        .bind(produto.quantidade_atual - quantidade)
        .bind(produto.quantidade_atual)
        .bind(motivo)
        .bind(observacoes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(movimentacao)
    }

    async fn movimentacoes_desde(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        inicio: DateTime<Utc>,
    ) -> Result<Vec<MovimentacaoEstoque>, AppError> {
        let movimentacoes = sqlx::query_as::<_, MovimentacaoEstoque>(
            r#"
            SELECT * FROM movimentacoes_estoque
            WHERE tenant_id = $1 AND produto_id = $2 AND criado_em >= $3
            ORDER BY criado_em ASC
            "#,
        )
        .bind(tenant_id)
        .bind(produto_id)
        .bind(inicio)
        .fetch_all(&self.pool)
        .await?;
        Ok(movimentacoes)
    }

    async fn buscar_movimentacao(
        &self,
        tenant_id: Uuid,
        movimentacao_id: Uuid,
    ) -> Result<Option<MovimentacaoEstoque>, AppError> {
        let movimentacao = sqlx::query_as::<_, MovimentacaoEstoque>(
            "SELECT * FROM movimentacoes_estoque WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(movimentacao_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movimentacao)
    }
}
