// src/services/vendas_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AtividadeStore, EstoqueStore, HistoricoVendasStore},
    models::estoque::MovimentacaoEstoque,
    models::vendas::{FiltroVendas, RegistroVenda},
};

// ---
// Histórico de vendas + estorno.
// ---
// O estorno marca o registro primeiro (transição condicional no store) e só
// então devolve o estoque: estornar a mesma venda duas vezes é recusado na
// marcação, antes de qualquer movimentação.
#[derive(Clone)]
pub struct VendasService {
    historico: Arc<dyn HistoricoVendasStore>,
    estoque: Arc<dyn EstoqueStore>,
    atividade: Arc<dyn AtividadeStore>,
}

impl VendasService {
    pub fn new(
        historico: Arc<dyn HistoricoVendasStore>,
        estoque: Arc<dyn EstoqueStore>,
        atividade: Arc<dyn AtividadeStore>,
    ) -> Self {
        Self {
            historico,
            estoque,
            atividade,
        }
    }

    pub async fn listar(
        &self,
        tenant_id: Uuid,
        filtro: FiltroVendas,
    ) -> Result<Vec<RegistroVenda>, AppError> {
        self.historico.listar(tenant_id, filtro).await
    }

    pub async fn buscar(&self, tenant_id: Uuid, venda_id: Uuid) -> Result<RegistroVenda, AppError> {
        self.historico
            .buscar(tenant_id, venda_id)
            .await?
            .ok_or(AppError::VendaNaoEncontrada)
    }

    /// Estorna uma venda: marca o registro como estornado e devolve ao
    /// estoque a quantidade originalmente baixada, com uma movimentação de
    /// entrada referenciando a baixa original. O registro é mantido.
    pub async fn estornar(
        &self,
        tenant_id: Uuid,
        venda_id: Uuid,
        motivo: &str,
    ) -> Result<RegistroVenda, AppError> {
        // Nenhuma mutação sem motivo.
        let motivo = motivo.trim();
        if motivo.is_empty() {
            return Err(AppError::MotivoObrigatorio);
        }

        let venda = self
            .historico
            .buscar(tenant_id, venda_id)
            .await?
            .ok_or(AppError::VendaNaoEncontrada)?;

        // A transição condicional é a guarda: se outra chamada marcou
        // primeiro, esta é recusada sem tocar no estoque.
        if !self.historico.marcar_estornada(tenant_id, venda_id).await? {
            return Err(AppError::VendaJaEstornada);
        }

        let movimentacao = match self.creditar_estorno(tenant_id, &venda, motivo).await {
            Ok(movimentacao) => movimentacao,
            Err(erro) => {
                // Sem o crédito, a marcação sozinha perderia o estoque para
                // sempre (o reenvio seria recusado como estorno duplo). A
                // transição é desfeita e a venda continua estornável.
                if let Err(e) = self.historico.reabrir(tenant_id, venda_id).await {
                    tracing::error!(
                        %tenant_id,
                        %venda_id,
                        erro = %e,
                        "Falha ao desfazer a marcação de estorno após crédito recusado"
                    );
                }
                return Err(erro);
            }
        };

        if let Err(e) = self
            .atividade
            .registrar(
                tenant_id,
                "venda_estornada",
                &format!(
                    "Pedido {} estornado: {} un. devolvidas a '{}'",
                    venda.numero_pedido, venda.quantidade_baixada, venda.nome_produto
                ),
                serde_json::json!({
                    "vendaId": venda.id,
                    "numeroPedido": venda.numero_pedido,
                    "quantidadeDevolvida": venda.quantidade_baixada,
                    "motivo": motivo,
                    "saldo": movimentacao.quantidade_nova,
                }),
            )
            .await
        {
            tracing::warn!(%tenant_id, erro = %e, "Falha ao registrar atividade do estorno");
        }

        // Relê para devolver o registro já com o status atualizado.
        self.historico
            .buscar(tenant_id, venda_id)
            .await?
            .ok_or(AppError::VendaNaoEncontrada)
    }

    // O crédito do estorno: localiza o produto e devolve a quantidade
    // baixada, com o motivo referenciando a baixa original.
    async fn creditar_estorno(
        &self,
        tenant_id: Uuid,
        venda: &RegistroVenda,
        motivo: &str,
    ) -> Result<MovimentacaoEstoque, AppError> {
        let produto = self
            .estoque
            .buscar_por_sku(tenant_id, &venda.sku_estoque)
            .await?
            .ok_or(AppError::ProdutoNaoEncontrado)?;

        let referencia = match venda.movimentacao_id {
            Some(id) => match self.estoque.buscar_movimentacao(tenant_id, id).await? {
                Some(original) => format!(
                    "movimentação {} de {}",
                    original.id,
                    original.criado_em.format("%d/%m/%Y %H:%M")
                ),
                None => format!("movimentação {id}"),
            },
            None => format!("venda de {}", venda.data_venda.format("%d/%m/%Y %H:%M")),
        };
        self.estoque
            .registrar_entrada(
                tenant_id,
                produto.id,
                venda.quantidade_baixada,
                &format!(
                    "Estorno - Pedido {} ({}): {}",
                    venda.numero_pedido, referencia, motivo
                ),
                None,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BancoMemoria;
    use crate::models::estoque::{NovoProduto, Produto, TipoMovimentacao};
    use crate::models::vendas::{ItemPedido, StatusVenda};
    use crate::services::{DeParaService, NotificadorLog, ProcessamentoService};
    use crate::models::depara::{NovoMapeamento, Prioridade};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    // Delega tudo ao banco em memória, menos a entrada: simula o banco
    // caindo exatamente entre a marcação do estorno e o crédito.
    struct EstoqueSemCredito(Arc<BancoMemoria>);

    #[async_trait]
    impl EstoqueStore for EstoqueSemCredito {
        async fn criar_produto(
            &self,
            tenant_id: Uuid,
            novo: NovoProduto,
        ) -> Result<Produto, AppError> {
            self.0.criar_produto(tenant_id, novo).await
        }

        async fn buscar_produto(
            &self,
            tenant_id: Uuid,
            produto_id: Uuid,
        ) -> Result<Option<Produto>, AppError> {
            self.0.buscar_produto(tenant_id, produto_id).await
        }

        async fn buscar_por_sku(
            &self,
            tenant_id: Uuid,
            sku: &str,
        ) -> Result<Option<Produto>, AppError> {
            self.0.buscar_por_sku(tenant_id, sku).await
        }

        async fn listar_produtos(
            &self,
            tenant_id: Uuid,
            apenas_ativos: bool,
        ) -> Result<Vec<Produto>, AppError> {
            self.0.listar_produtos(tenant_id, apenas_ativos).await
        }

        async fn desativar_produto(
            &self,
            tenant_id: Uuid,
            produto_id: Uuid,
        ) -> Result<bool, AppError> {
            self.0.desativar_produto(tenant_id, produto_id).await
        }

        async fn baixa_condicional(
            &self,
            tenant_id: Uuid,
            produto_id: Uuid,
            quantidade: i32,
            motivo: &str,
            observacoes: Option<&str>,
        ) -> Result<Option<MovimentacaoEstoque>, AppError> {
            self.0
                .baixa_condicional(tenant_id, produto_id, quantidade, motivo, observacoes)
                .await
        }

        async fn registrar_entrada(
            &self,
            _tenant_id: Uuid,
            _produto_id: Uuid,
            _quantidade: i32,
            _motivo: &str,
            _observacoes: Option<&str>,
        ) -> Result<MovimentacaoEstoque, AppError> {
            Err(anyhow::anyhow!("banco fora do ar").into())
        }

        async fn movimentacoes_desde(
            &self,
            tenant_id: Uuid,
            produto_id: Uuid,
            inicio: DateTime<Utc>,
        ) -> Result<Vec<MovimentacaoEstoque>, AppError> {
            self.0
                .movimentacoes_desde(tenant_id, produto_id, inicio)
                .await
        }

        async fn buscar_movimentacao(
            &self,
            tenant_id: Uuid,
            movimentacao_id: Uuid,
        ) -> Result<Option<MovimentacaoEstoque>, AppError> {
            self.0.buscar_movimentacao(tenant_id, movimentacao_id).await
        }
    }

    struct Ambiente {
        vendas: VendasService,
        banco: Arc<BancoMemoria>,
        tenant: Uuid,
    }

    fn ambiente() -> Ambiente {
        let banco = Arc::new(BancoMemoria::new());
        let vendas = VendasService::new(banco.clone(), banco.clone(), banco.clone());
        Ambiente {
            vendas,
            banco,
            tenant: Uuid::new_v4(),
        }
    }

    /// Processa um pedido de verdade para ter uma venda estornável.
    async fn venda_processada(amb: &Ambiente) -> (Uuid, RegistroVenda) {
        let produto = amb
            .banco
            .criar_produto(
                amb.tenant,
                NovoProduto {
                    sku: "INT-1".to_string(),
                    nome: "Produto INT-1".to_string(),
                    categoria: None,
                    quantidade_inicial: 10,
                    estoque_minimo: 5,
                    estoque_maximo: 100,
                    preco_custo: None,
                    preco_venda: None,
                    codigo_barras: None,
                },
            )
            .await
            .unwrap();
        crate::db::DeParaStore::criar(
            &*amb.banco,
            amb.tenant,
            NovoMapeamento {
                sku_pedido: "KIT".to_string(),
                sku_correspondente: "INT-1".to_string(),
                sku_simples: None,
                quantidade: 3,
                prioridade: Prioridade::Normal,
                observacoes: None,
            },
        )
        .await
        .unwrap();

        let processamento = ProcessamentoService::new(
            DeParaService::new(amb.banco.clone()),
            amb.banco.clone(),
            amb.banco.clone(),
            amb.banco.clone(),
            Arc::new(NotificadorLog),
        );
        processamento
            .processar_pedidos(
                amb.tenant,
                &[ItemPedido {
                    numero_pedido: "PED-1".to_string(),
                    sku_pedido: "KIT".to_string(),
                    quantidade: 2,
                    valor_unitario: None,
                    cliente_nome: None,
                    cliente_documento: None,
                }],
            )
            .await
            .unwrap();

        let venda = amb
            .banco
            .listar(amb.tenant, FiltroVendas::default())
            .await
            .unwrap()
            .remove(0);
        (produto.id, venda)
    }

    #[tokio::test]
    async fn estorno_devolve_o_estoque_e_marca_a_venda() {
        let amb = ambiente();
        let (produto_id, venda) = venda_processada(&amb).await;
        // 10 - 6 = 4 após o processamento.
        assert_eq!(venda.quantidade_baixada, 6);

        let estornada = amb
            .vendas
            .estornar(amb.tenant, venda.id, "Pedido cancelado pelo cliente")
            .await
            .unwrap();
        assert_eq!(estornada.status, StatusVenda::Estornada);

        let produto = amb
            .banco
            .buscar_produto(amb.tenant, produto_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(produto.quantidade_atual, 10);

        let movimentacoes = amb.banco.movimentacoes_do_produto(produto_id).await;
        // Estoque inicial + saída da venda + entrada do estorno.
        assert_eq!(movimentacoes.len(), 3);
        let estorno = &movimentacoes[2];
        assert_eq!(estorno.tipo, TipoMovimentacao::Entrada);
        assert_eq!(estorno.quantidade, 6);
        assert_eq!(estorno.quantidade_anterior, 4);
        assert_eq!(estorno.quantidade_nova, 10);
        // O motivo referencia a movimentação original.
        assert!(estorno
            .motivo
            .contains(&venda.movimentacao_id.unwrap().to_string()));
    }

    // Cenário D: motivo vazio é recusado antes de qualquer mutação.
    #[tokio::test]
    async fn estorno_sem_motivo_e_recusado_sem_mutacao() {
        let amb = ambiente();
        let (produto_id, venda) = venda_processada(&amb).await;

        for motivo in ["", "   "] {
            let erro = amb
                .vendas
                .estornar(amb.tenant, venda.id, motivo)
                .await
                .unwrap_err();
            assert!(matches!(erro, AppError::MotivoObrigatorio));
        }

        let produto = amb
            .banco
            .buscar_produto(amb.tenant, produto_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(produto.quantidade_atual, 4);
        assert_eq!(amb.banco.movimentacoes_do_produto(produto_id).await.len(), 2);
        let venda = amb.vendas.buscar(amb.tenant, venda.id).await.unwrap();
        assert_eq!(venda.status, StatusVenda::Registrada);
    }

    // Estorno duplo: o segundo é recusado e não credita estoque de novo.
    #[tokio::test]
    async fn estorno_duplo_e_recusado() {
        let amb = ambiente();
        let (produto_id, venda) = venda_processada(&amb).await;

        amb.vendas
            .estornar(amb.tenant, venda.id, "Devolução")
            .await
            .unwrap();
        let erro = amb
            .vendas
            .estornar(amb.tenant, venda.id, "Devolução de novo")
            .await
            .unwrap_err();
        assert!(matches!(erro, AppError::VendaJaEstornada));

        let produto = amb
            .banco
            .buscar_produto(amb.tenant, produto_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(produto.quantidade_atual, 10);
        assert_eq!(amb.banco.movimentacoes_do_produto(produto_id).await.len(), 3);
    }

    // Crédito recusado pelo banco: a marcação é desfeita, nada se perde e
    // o estorno pode ser reenviado quando o banco voltar.
    #[tokio::test]
    async fn falha_no_credito_desfaz_a_marcacao_do_estorno() {
        let amb = ambiente();
        let (produto_id, venda) = venda_processada(&amb).await;

        let quebrado = VendasService::new(
            amb.banco.clone(),
            Arc::new(EstoqueSemCredito(amb.banco.clone())),
            amb.banco.clone(),
        );
        let erro = quebrado
            .estornar(amb.tenant, venda.id, "Devolução")
            .await
            .unwrap_err();
        assert!(matches!(erro, AppError::InternalServerError(_)));

        // A venda volta a `registrada`, sem movimentação fantasma.
        let atual = amb.vendas.buscar(amb.tenant, venda.id).await.unwrap();
        assert_eq!(atual.status, StatusVenda::Registrada);
        assert_eq!(amb.banco.movimentacoes_do_produto(produto_id).await.len(), 2);

        // O reenvio contra o banco saudável completa o estorno.
        let estornada = amb
            .vendas
            .estornar(amb.tenant, venda.id, "Devolução")
            .await
            .unwrap();
        assert_eq!(estornada.status, StatusVenda::Estornada);
        let produto = amb
            .banco
            .buscar_produto(amb.tenant, produto_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(produto.quantidade_atual, 10);
    }

    #[tokio::test]
    async fn estornar_venda_inexistente_e_404() {
        let amb = ambiente();
        let erro = amb
            .vendas
            .estornar(amb.tenant, Uuid::new_v4(), "Motivo qualquer")
            .await
            .unwrap_err();
        assert!(matches!(erro, AppError::VendaNaoEncontrada));
    }

    #[tokio::test]
    async fn listar_filtra_por_status() {
        let amb = ambiente();
        let (_, venda) = venda_processada(&amb).await;
        amb.vendas
            .estornar(amb.tenant, venda.id, "Devolução")
            .await
            .unwrap();

        let estornadas = amb
            .vendas
            .listar(
                amb.tenant,
                FiltroVendas {
                    status: Some(StatusVenda::Estornada),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(estornadas.len(), 1);

        let registradas = amb
            .vendas
            .listar(
                amb.tenant,
                FiltroVendas {
                    status: Some(StatusVenda::Registrada),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(registradas.is_empty());
    }
}
