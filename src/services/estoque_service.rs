// src/services/estoque_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AtividadeStore, EstoqueStore},
    models::estoque::{MovimentacaoEstoque, NovoProduto, Produto},
};

// ---
// Regras de negócio do estoque: produtos + movimentações manuais.
// ---
// Toda mudança de saldo passa pelo EstoqueStore, que pareia saldo e
// movimentação atomicamente. Aqui fica só a orquestração e a auditoria.
#[derive(Clone)]
pub struct EstoqueService {
    estoque: Arc<dyn EstoqueStore>,
    atividade: Arc<dyn AtividadeStore>,
}

impl EstoqueService {
    pub fn new(estoque: Arc<dyn EstoqueStore>, atividade: Arc<dyn AtividadeStore>) -> Self {
        Self { estoque, atividade }
    }

    pub async fn criar_produto(
        &self,
        tenant_id: Uuid,
        novo: NovoProduto,
    ) -> Result<Produto, AppError> {
        let produto = self.estoque.criar_produto(tenant_id, novo).await?;

        self.auditar(
            tenant_id,
            "produto_criado",
            &format!("Produto '{}' criado", produto.nome),
            serde_json::json!({ "sku": produto.sku, "quantidade": produto.quantidade_atual }),
        )
        .await;

        Ok(produto)
    }

    pub async fn listar_produtos(
        &self,
        tenant_id: Uuid,
        apenas_ativos: bool,
    ) -> Result<Vec<Produto>, AppError> {
        self.estoque.listar_produtos(tenant_id, apenas_ativos).await
    }

    pub async fn buscar_produto(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
    ) -> Result<Produto, AppError> {
        self.estoque
            .buscar_produto(tenant_id, produto_id)
            .await?
            .ok_or(AppError::ProdutoNaoEncontrado)
    }

    pub async fn desativar_produto(&self, tenant_id: Uuid, produto_id: Uuid) -> Result<(), AppError> {
        if !self.estoque.desativar_produto(tenant_id, produto_id).await? {
            return Err(AppError::ProdutoNaoEncontrado);
        }
        self.auditar(
            tenant_id,
            "produto_desativado",
            "Produto desativado",
            serde_json::json!({ "produtoId": produto_id }),
        )
        .await;
        Ok(())
    }

    // --- ENTRADA MANUAL ---
    pub async fn entrada_manual(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        quantidade: i32,
        motivo: &str,
        observacoes: Option<&str>,
    ) -> Result<MovimentacaoEstoque, AppError> {
        let movimentacao = self
            .estoque
            .registrar_entrada(tenant_id, produto_id, quantidade, motivo, observacoes)
            .await?;

        self.auditar(
            tenant_id,
            "entrada_estoque",
            motivo,
            serde_json::json!({
                "produtoId": produto_id,
                "quantidade": quantidade,
                "saldo": movimentacao.quantidade_nova,
            }),
        )
        .await;

        Ok(movimentacao)
    }

    // --- SAÍDA MANUAL ---
    // Mesmo caminho condicional do processamento em lote: saldo nunca fica
    // negativo, a baixa que não cabe é recusada (não é truncada para zero).
    pub async fn saida_manual(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        quantidade: i32,
        motivo: &str,
        observacoes: Option<&str>,
    ) -> Result<MovimentacaoEstoque, AppError> {
        let movimentacao = self
            .estoque
            .baixa_condicional(tenant_id, produto_id, quantidade, motivo, observacoes)
            .await?;

        let Some(movimentacao) = movimentacao else {
            let disponivel = self
                .estoque
                .buscar_produto(tenant_id, produto_id)
                .await?
                .ok_or(AppError::ProdutoNaoEncontrado)?
                .quantidade_atual;
            return Err(AppError::SaldoInsuficiente {
                disponivel,
                necessario: quantidade,
            });
        };

        self.auditar(
            tenant_id,
            "saida_estoque",
            motivo,
            serde_json::json!({
                "produtoId": produto_id,
                "quantidade": quantidade,
                "saldo": movimentacao.quantidade_nova,
            }),
        )
        .await;

        Ok(movimentacao)
    }

    pub async fn movimentacoes(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        desde: Option<DateTime<Utc>>,
    ) -> Result<Vec<MovimentacaoEstoque>, AppError> {
        // Sem recorte: desde a época. Movimentação nenhuma é anterior a isso.
        let inicio = desde.unwrap_or(DateTime::UNIX_EPOCH);
        self.estoque
            .movimentacoes_desde(tenant_id, produto_id, inicio)
            .await
    }

    // Auditoria é fire-and-forget: falha vira warning, nunca erro.
    async fn auditar(&self, tenant_id: Uuid, tipo: &str, descricao: &str, detalhes: serde_json::Value) {
        if let Err(e) = self
            .atividade
            .registrar(tenant_id, tipo, descricao, detalhes)
            .await
        {
            tracing::warn!(%tenant_id, tipo, erro = %e, "Falha ao registrar atividade");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BancoMemoria;
    use crate::models::estoque::TipoMovimentacao;

    fn novo_produto(sku: &str, quantidade: i32) -> NovoProduto {
        NovoProduto {
            sku: sku.to_string(),
            nome: format!("Produto {sku}"),
            categoria: None,
            quantidade_inicial: quantidade,
            estoque_minimo: 5,
            estoque_maximo: 100,
            preco_custo: None,
            preco_venda: None,
            codigo_barras: None,
        }
    }

    fn servico() -> (EstoqueService, Arc<BancoMemoria>, Uuid) {
        let banco = Arc::new(BancoMemoria::new());
        let servico = EstoqueService::new(banco.clone(), banco.clone());
        (servico, banco, Uuid::new_v4())
    }

    #[tokio::test]
    async fn entrada_e_saida_mantem_o_livro_consistente() {
        let (servico, banco, tenant) = servico();
        let produto = servico
            .criar_produto(tenant, novo_produto("SKU-1", 10))
            .await
            .unwrap();

        let entrada = servico
            .entrada_manual(tenant, produto.id, 5, "Compra", None)
            .await
            .unwrap();
        assert_eq!(entrada.tipo, TipoMovimentacao::Entrada);
        assert_eq!(entrada.quantidade_anterior, 10);
        assert_eq!(entrada.quantidade_nova, 15);

        let saida = servico
            .saida_manual(tenant, produto.id, 7, "Ajuste", None)
            .await
            .unwrap();
        assert_eq!(saida.tipo, TipoMovimentacao::Saida);
        assert_eq!(saida.quantidade_anterior, 15);
        assert_eq!(saida.quantidade_nova, 8);

        let atual = servico.buscar_produto(tenant, produto.id).await.unwrap();
        assert_eq!(atual.quantidade_atual, 8);
        assert!(atual.ultima_movimentacao.is_some());

        // Cada operação deixa rastro de auditoria.
        let atividades = banco.atividades().await;
        let auditoria = atividades
            .iter()
            .find(|a| a.tipo == "entrada_estoque")
            .unwrap();
        assert_eq!(auditoria.tenant_id, tenant);
        assert_eq!(auditoria.descricao, "Compra");
        assert_eq!(auditoria.detalhes["quantidade"], 5);
        assert!(atividades.iter().any(|a| a.tipo == "saida_estoque"));
    }

    #[tokio::test]
    async fn saida_maior_que_o_saldo_e_recusada_sem_mutacao() {
        let (servico, banco, tenant) = servico();
        let produto = servico
            .criar_produto(tenant, novo_produto("SKU-1", 10))
            .await
            .unwrap();

        let erro = servico
            .saida_manual(tenant, produto.id, 11, "Ajuste", None)
            .await
            .unwrap_err();
        assert!(matches!(
            erro,
            AppError::SaldoInsuficiente {
                disponivel: 10,
                necessario: 11
            }
        ));

        let atual = servico.buscar_produto(tenant, produto.id).await.unwrap();
        assert_eq!(atual.quantidade_atual, 10);
        // Só a movimentação do estoque inicial existe.
        assert_eq!(banco.movimentacoes_do_produto(produto.id).await.len(), 1);
    }

    #[tokio::test]
    async fn sku_duplicado_e_recusado() {
        let (servico, _, tenant) = servico();
        servico
            .criar_produto(tenant, novo_produto("SKU-1", 0))
            .await
            .unwrap();
        let erro = servico
            .criar_produto(tenant, novo_produto("SKU-1", 0))
            .await
            .unwrap_err();
        assert!(matches!(erro, AppError::SkuJaExiste));
    }

    #[tokio::test]
    async fn produto_desativado_nao_aceita_baixa() {
        let (servico, _, tenant) = servico();
        let produto = servico
            .criar_produto(tenant, novo_produto("SKU-1", 10))
            .await
            .unwrap();
        servico.desativar_produto(tenant, produto.id).await.unwrap();

        let erro = servico
            .saida_manual(tenant, produto.id, 1, "Ajuste", None)
            .await
            .unwrap_err();
        assert!(matches!(erro, AppError::SaldoInsuficiente { .. }));
    }

    // Propriedade do livro-razão: o saldo visível é sempre o saldo inicial
    // somado a todas as entradas menos todas as saídas aplicadas.
    #[test]
    fn saldo_e_sempre_a_soma_dos_deltas() {
        use proptest::prelude::*;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        proptest!(|(inicial in 0..500i32, operacoes in proptest::collection::vec((any::<bool>(), 1..50i32), 0..40))| {
            runtime.block_on(async {
                let banco = Arc::new(BancoMemoria::new());
                let servico = EstoqueService::new(banco.clone(), banco.clone());
                let tenant = Uuid::new_v4();
                let produto = servico
                    .criar_produto(tenant, novo_produto("SKU-P", inicial))
                    .await
                    .unwrap();

                let mut esperado = inicial;
                for (entrada, quantidade) in operacoes {
                    if entrada {
                        servico
                            .entrada_manual(tenant, produto.id, quantidade, "Compra", None)
                            .await
                            .unwrap();
                        esperado += quantidade;
                    } else {
                        match servico
                            .saida_manual(tenant, produto.id, quantidade, "Venda", None)
                            .await
                        {
                            Ok(_) => esperado -= quantidade,
                            // Recusada: nada muda.
                            Err(AppError::SaldoInsuficiente { .. }) => {}
                            Err(e) => panic!("erro inesperado: {e}"),
                        }
                    }
                }

                let atual = servico.buscar_produto(tenant, produto.id).await.unwrap();
                prop_assert!(atual.quantidade_atual >= 0);
                prop_assert_eq!(atual.quantidade_atual, esperado);

                // O livro fecha: inicial + entradas - saídas == saldo.
                let movimentacoes = banco.movimentacoes_do_produto(produto.id).await;
                let soma: i32 = movimentacoes
                    .iter()
                    .map(|m| match m.tipo {
                        TipoMovimentacao::Entrada => m.quantidade,
                        TipoMovimentacao::Saida => -m.quantidade,
                    })
                    .sum();
                prop_assert_eq!(soma, atual.quantidade_atual);

                // E cada linha é consistente consigo mesma.
                for m in &movimentacoes {
                    let delta = match m.tipo {
                        TipoMovimentacao::Entrada => m.quantidade,
                        TipoMovimentacao::Saida => -m.quantidade,
                    };
                    prop_assert_eq!(m.quantidade_nova, m.quantidade_anterior + delta);
                }
                Ok(())
            })?;
        });
    }
}
