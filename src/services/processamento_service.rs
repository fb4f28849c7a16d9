// src/services/processamento_service.rs

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AtividadeStore, EstoqueStore, HistoricoVendasStore},
    models::vendas::{ItemPedido, NovoRegistroVenda, ResultadoItem, ResumoProcessamento},
    services::{DeParaService, Notificador},
};

// Tempo máximo dado ao despachante de notificações.
const TIMEOUT_NOTIFICACAO: Duration = Duration::from_secs(5);

// Em que etapa do item uma falha de infraestrutura aconteceu. Usado só
// para devolver o item na categoria mais próxima do resumo.
enum EtapaItem {
    Resolucao,
    Produto,
    Baixa,
}

struct FalhaItem {
    etapa: EtapaItem,
    erro: AppError,
    produto: Option<String>,
    necessario: Option<i32>,
}

impl FalhaItem {
    fn em(etapa: EtapaItem) -> impl FnOnce(AppError) -> FalhaItem {
        move |erro| FalhaItem {
            etapa,
            erro,
            produto: None,
            necessario: None,
        }
    }
}

// ---
// Processador de pedidos em lote.
// ---
// Recebe as linhas de pedido vindas dos marketplaces, resolve cada SKU via
// DE/PARA, checa elegibilidade e baixa o estoque atomicamente, gravando o
// registro de venda. Itens inelegíveis viram resultados normais (não
// exceções); uma falha de infraestrutura em um item não derruba o lote.
#[derive(Clone)]
pub struct ProcessamentoService {
    depara: DeParaService,
    estoque: Arc<dyn EstoqueStore>,
    historico: Arc<dyn HistoricoVendasStore>,
    atividade: Arc<dyn AtividadeStore>,
    notificador: Arc<dyn Notificador>,
}

impl ProcessamentoService {
    pub fn new(
        depara: DeParaService,
        estoque: Arc<dyn EstoqueStore>,
        historico: Arc<dyn HistoricoVendasStore>,
        atividade: Arc<dyn AtividadeStore>,
        notificador: Arc<dyn Notificador>,
    ) -> Self {
        Self {
            depara,
            estoque,
            historico,
            atividade,
            notificador,
        }
    }

    /// Processa o lote item a item, na ordem recebida. Sempre devolve o
    /// resumo completo — o mesmo payload entregue ao despachante de
    /// notificações.
    pub async fn processar_pedidos(
        &self,
        tenant_id: Uuid,
        itens: &[ItemPedido],
    ) -> Result<ResumoProcessamento, AppError> {
        let mut resultados = Vec::with_capacity(itens.len());

        for item in itens {
            let resultado = match self.processar_item(tenant_id, item).await {
                Ok(resultado) => resultado,
                Err(falha) => {
                    tracing::error!(
                        %tenant_id,
                        numero_pedido = %item.numero_pedido,
                        sku_pedido = %item.sku_pedido,
                        erro = %falha.erro,
                        "Falha de infraestrutura ao processar item; o lote continua"
                    );
                    classificar_falha(item, falha)
                }
            };
            resultados.push(resultado);
        }

        let resumo = ResumoProcessamento::a_partir_de(&resultados);

        // Auditoria e notificação são colaterais: falha vira log, nunca erro.
        if let Err(e) = self
            .atividade
            .registrar(
                tenant_id,
                "processamento_pedidos",
                &format!(
                    "Lote processado: {} de {} itens com sucesso",
                    resumo.sucesso, resumo.total
                ),
                serde_json::to_value(&resumo).unwrap_or_default(),
            )
            .await
        {
            tracing::warn!(%tenant_id, erro = %e, "Falha ao registrar atividade do lote");
        }

        match tokio::time::timeout(
            TIMEOUT_NOTIFICACAO,
            self.notificador.notificar_processamento(tenant_id, &resumo),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(%tenant_id, erro = %e, "Despachante de notificações falhou")
            }
            Err(_) => {
                tracing::warn!(%tenant_id, "Despachante de notificações estourou o tempo limite")
            }
        }

        Ok(resumo)
    }

    // A sequência por item. O saldo usado em cada item é relido na hora, e a
    // baixa em si é condicional no store: o item N+1 sempre enxerga a
    // dedução do item N, mesmo dentro do mesmo lote.
    async fn processar_item(
        &self,
        tenant_id: Uuid,
        item: &ItemPedido,
    ) -> Result<ResultadoItem, FalhaItem> {
        // 1. DE/PARA
        let resolucao = self
            .depara
            .resolver(tenant_id, &item.sku_pedido)
            .await
            .map_err(FalhaItem::em(EtapaItem::Resolucao))?;
        let Some(resolucao) = resolucao else {
            return Ok(ResultadoItem::FaltaMapeamento {
                sku_pedido: item.sku_pedido.clone(),
            });
        };

        // 2. Produto interno
        let produto = self
            .estoque
            .buscar_por_sku(tenant_id, &resolucao.sku_estoque)
            .await
            .map_err(FalhaItem::em(EtapaItem::Produto))?;
        let Some(produto) = produto else {
            return Ok(ResultadoItem::ProdutoInativo {
                produto: resolucao.sku_estoque.clone(),
            });
        };
        if !produto.ativo {
            return Ok(ResultadoItem::ProdutoInativo {
                produto: produto.nome.clone(),
            });
        }

        // 3. Quantidade exigida do estoque interno. A multiplicação roda em
        //    i64: um pedido desproporcional não pode estourar a aritmética.
        let necessario =
            i64::from(item.quantidade) * i64::from(resolucao.quantidade_multiplicador);

        // 4. Guarda de idempotência: linha de pedido já registrada é no-op.
        let ja_processado = self
            .historico
            .existe(tenant_id, &item.numero_pedido, &item.sku_pedido)
            .await
            .map_err(FalhaItem::em(EtapaItem::Produto))?;
        if ja_processado {
            return Ok(ResultadoItem::JaProcessado {
                numero_pedido: item.numero_pedido.clone(),
                sku_pedido: item.sku_pedido.clone(),
            });
        }

        // 5. Elegibilidade de saldo (diagnóstico); a checagem que vale é a
        //    condicional dentro da baixa. O que não cabe em i32 nunca cabe
        //    no saldo: vira falta_estoque, com o necessário saturado.
        let Ok(necessario) = i32::try_from(necessario) else {
            return Ok(ResultadoItem::FaltaEstoque {
                produto: produto.nome.clone(),
                disponivel: produto.quantidade_atual,
                necessario: i32::MAX,
            });
        };
        if produto.quantidade_atual < necessario {
            return Ok(ResultadoItem::FaltaEstoque {
                produto: produto.nome.clone(),
                disponivel: produto.quantidade_atual,
                necessario,
            });
        }

        // 6. Baixa atômica + venda + auditoria
        let motivo = format!("Venda - Pedido {}", item.numero_pedido);
        let movimentacao = self
            .estoque
            .baixa_condicional(tenant_id, produto.id, necessario, &motivo, None)
            .await
            .map_err(|erro| FalhaItem {
                etapa: EtapaItem::Baixa,
                erro,
                produto: Some(produto.nome.clone()),
                necessario: Some(necessario),
            })?;

        let Some(movimentacao) = movimentacao else {
            // Alguém baixou o saldo entre a leitura e o update condicional.
            let disponivel = self
                .estoque
                .buscar_produto(tenant_id, produto.id)
                .await
                .ok()
                .flatten()
                .map(|p| p.quantidade_atual)
                .unwrap_or(0);
            return Ok(ResultadoItem::FaltaEstoque {
                produto: produto.nome.clone(),
                disponivel,
                necessario,
            });
        };

        let venda = self
            .historico
            .inserir(
                tenant_id,
                NovoRegistroVenda {
                    numero_pedido: item.numero_pedido.clone(),
                    sku_pedido: item.sku_pedido.clone(),
                    sku_estoque: produto.sku.clone(),
                    nome_produto: produto.nome.clone(),
                    quantidade: item.quantidade,
                    quantidade_baixada: necessario,
                    valor_unitario: item.valor_unitario,
                    cliente_nome: item.cliente_nome.clone(),
                    cliente_documento: item.cliente_documento.clone(),
                    movimentacao_id: Some(movimentacao.id),
                    observacoes: None,
                },
            )
            .await;

        match venda {
            Ok(_) => {}
            // Corrida na guarda de idempotência: outra invocação registrou a
            // mesma linha primeiro. Devolvemos a baixa para não deduzir duas
            // vezes e tratamos como já processado.
            Err(AppError::VendaJaRegistrada) => {
                self.estoque
                    .registrar_entrada(
                        tenant_id,
                        produto.id,
                        necessario,
                        &format!(
                            "Reversão automática - pedido {} já registrado",
                            item.numero_pedido
                        ),
                        None,
                    )
                    .await
                    .map_err(FalhaItem::em(EtapaItem::Baixa))?;
                return Ok(ResultadoItem::JaProcessado {
                    numero_pedido: item.numero_pedido.clone(),
                    sku_pedido: item.sku_pedido.clone(),
                });
            }
            Err(erro) => {
                return Err(FalhaItem {
                    etapa: EtapaItem::Baixa,
                    erro,
                    produto: Some(produto.nome.clone()),
                    necessario: Some(necessario),
                });
            }
        }

        if let Err(e) = self
            .atividade
            .registrar(
                tenant_id,
                "venda_processada",
                &format!(
                    "Pedido {} baixou {} un. de '{}'",
                    item.numero_pedido, necessario, produto.nome
                ),
                serde_json::json!({
                    "numeroPedido": item.numero_pedido,
                    "skuPedido": item.sku_pedido,
                    "skuEstoque": produto.sku,
                    "quantidadeBaixada": necessario,
                    "saldo": movimentacao.quantidade_nova,
                }),
            )
            .await
        {
            tracing::warn!(%tenant_id, erro = %e, "Falha ao registrar atividade do item");
        }

        Ok(ResultadoItem::Sucesso {
            sku_pedido: item.sku_pedido.clone(),
            quantidade_baixada: necessario,
        })
    }
}

// Devolve o item na categoria mais próxima da etapa onde a falha ocorreu.
fn classificar_falha(item: &ItemPedido, falha: FalhaItem) -> ResultadoItem {
    match falha.etapa {
        EtapaItem::Resolucao => ResultadoItem::FaltaMapeamento {
            sku_pedido: item.sku_pedido.clone(),
        },
        EtapaItem::Produto => ResultadoItem::ProdutoInativo {
            produto: falha
                .produto
                .unwrap_or_else(|| item.sku_pedido.clone()),
        },
        EtapaItem::Baixa => ResultadoItem::FaltaEstoque {
            produto: falha
                .produto
                .unwrap_or_else(|| item.sku_pedido.clone()),
            disponivel: 0,
            necessario: falha.necessario.unwrap_or(item.quantidade),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BancoMemoria;
    use crate::models::depara::{NovoMapeamento, Prioridade};
    use crate::models::estoque::{NovoProduto, TipoMovimentacao};
    use crate::models::vendas::{FiltroVendas, StatusVenda};
    use crate::services::NotificadorLog;
    use async_trait::async_trait;

    struct Ambiente {
        servico: ProcessamentoService,
        banco: Arc<BancoMemoria>,
        tenant: Uuid,
    }

    fn ambiente() -> Ambiente {
        let banco = Arc::new(BancoMemoria::new());
        let servico = ProcessamentoService::new(
            DeParaService::new(banco.clone()),
            banco.clone(),
            banco.clone(),
            banco.clone(),
            Arc::new(NotificadorLog),
        );
        Ambiente {
            servico,
            banco,
            tenant: Uuid::new_v4(),
        }
    }

    async fn produto(amb: &Ambiente, sku: &str, quantidade: i32) -> crate::models::estoque::Produto {
        amb.banco
            .criar_produto(
                amb.tenant,
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
                },
            )
            .await
            .unwrap()
    }

    async fn mapeamento(amb: &Ambiente, sku_pedido: &str, sku_estoque: &str, multiplicador: i32) {
        use crate::db::DeParaStore;
        amb.banco
            .criar(
                amb.tenant,
                NovoMapeamento {
                    sku_pedido: sku_pedido.to_string(),
                    sku_correspondente: sku_estoque.to_string(),
                    sku_simples: None,
                    quantidade: multiplicador,
                    prioridade: Prioridade::Normal,
                    observacoes: None,
                },
            )
            .await
            .unwrap();
    }

    fn item(numero_pedido: &str, sku_pedido: &str, quantidade: i32) -> ItemPedido {
        ItemPedido {
            numero_pedido: numero_pedido.to_string(),
            sku_pedido: sku_pedido.to_string(),
            quantidade,
            valor_unitario: None,
            cliente_nome: None,
            cliente_documento: None,
        }
    }

    // Cenário A: kit com multiplicador 3, pedido de 2 → baixa 6 de 10.
    #[tokio::test]
    async fn kit_elegivel_baixa_estoque_e_registra_venda() {
        let amb = ambiente();
        let p = produto(&amb, "INT-1", 10).await;
        mapeamento(&amb, "KIT-3X", "INT-1", 3).await;

        let resumo = amb
            .servico
            .processar_pedidos(amb.tenant, &[item("PED-1", "KIT-3X", 2)])
            .await
            .unwrap();

        assert_eq!(resumo.total, 1);
        assert_eq!(resumo.sucesso, 1);
        assert!(resumo.falta_estoque.is_empty());

        let atual = amb.banco.buscar_produto(amb.tenant, p.id).await.unwrap().unwrap();
        assert_eq!(atual.quantidade_atual, 4);

        let movimentacoes = amb.banco.movimentacoes_do_produto(p.id).await;
        // Estoque inicial + a saída da venda.
        assert_eq!(movimentacoes.len(), 2);
        let saida = &movimentacoes[1];
        assert_eq!(saida.tipo, TipoMovimentacao::Saida);
        assert_eq!(saida.quantidade, 6);
        assert_eq!(saida.quantidade_anterior, 10);
        assert_eq!(saida.quantidade_nova, 4);

        let vendas = amb
            .banco
            .listar(amb.tenant, FiltroVendas::default())
            .await
            .unwrap();
        assert_eq!(vendas.len(), 1);
        assert_eq!(vendas[0].quantidade_baixada, 6);
        assert_eq!(vendas[0].status, StatusVenda::Registrada);
        assert_eq!(vendas[0].movimentacao_id, Some(saida.id));
    }

    // Cenário B: necessário 11 > disponível 10 → falta_estoque, sem mutação.
    #[tokio::test]
    async fn saldo_insuficiente_nao_muta_e_reporta_diagnostico() {
        let amb = ambiente();
        let p = produto(&amb, "INT-1", 10).await;
        mapeamento(&amb, "KIT-11", "INT-1", 11).await;

        let resumo = amb
            .servico
            .processar_pedidos(amb.tenant, &[item("PED-1", "KIT-11", 1)])
            .await
            .unwrap();

        assert_eq!(resumo.sucesso, 0);
        assert_eq!(resumo.falta_estoque.len(), 1);
        assert_eq!(resumo.falta_estoque[0].disponivel, 10);
        assert_eq!(resumo.falta_estoque[0].necessario, 11);

        let atual = amb.banco.buscar_produto(amb.tenant, p.id).await.unwrap().unwrap();
        assert_eq!(atual.quantidade_atual, 10);
        assert_eq!(amb.banco.movimentacoes_do_produto(p.id).await.len(), 1);
        assert!(amb
            .banco
            .listar(amb.tenant, FiltroVendas::default())
            .await
            .unwrap()
            .is_empty());
    }

    // Cenário C: SKU sem mapeamento ativo → falta_mapeamento.
    #[tokio::test]
    async fn sku_sem_mapeamento_vira_falta_mapeamento() {
        let amb = ambiente();
        produto(&amb, "INT-1", 10).await;

        let resumo = amb
            .servico
            .processar_pedidos(amb.tenant, &[item("PED-1", "SKU-X", 1)])
            .await
            .unwrap();

        assert_eq!(resumo.sucesso, 0);
        assert_eq!(resumo.falta_mapeamento, vec!["SKU-X".to_string()]);
    }

    #[tokio::test]
    async fn produto_inativo_nao_e_baixado() {
        let amb = ambiente();
        let p = produto(&amb, "INT-1", 10).await;
        mapeamento(&amb, "KIT", "INT-1", 1).await;
        amb.banco.desativar_produto(amb.tenant, p.id).await.unwrap();

        let resumo = amb
            .servico
            .processar_pedidos(amb.tenant, &[item("PED-1", "KIT", 1)])
            .await
            .unwrap();

        assert_eq!(resumo.sucesso, 0);
        assert_eq!(resumo.produtos_inativos, vec!["Produto INT-1".to_string()]);
        let atual = amb.banco.buscar_produto(amb.tenant, p.id).await.unwrap().unwrap();
        assert_eq!(atual.quantidade_atual, 10);
    }

    // Idempotência: a mesma linha de pedido duas vezes gera exatamente uma
    // movimentação e um registro; a segunda passada é no-op.
    #[tokio::test]
    async fn reprocessar_a_mesma_linha_e_no_op() {
        let amb = ambiente();
        let p = produto(&amb, "INT-1", 10).await;
        mapeamento(&amb, "KIT", "INT-1", 2).await;

        let primeiro = amb
            .servico
            .processar_pedidos(amb.tenant, &[item("PED-1", "KIT", 1)])
            .await
            .unwrap();
        assert_eq!(primeiro.sucesso, 1);

        let segundo = amb
            .servico
            .processar_pedidos(amb.tenant, &[item("PED-1", "KIT", 1)])
            .await
            .unwrap();
        // Não conta como sucesso nem aparece em nenhuma lista de erro.
        assert_eq!(segundo.total, 1);
        assert_eq!(segundo.sucesso, 0);
        assert!(segundo.falta_estoque.is_empty());
        assert!(segundo.falta_mapeamento.is_empty());
        assert!(segundo.produtos_inativos.is_empty());

        let atual = amb.banco.buscar_produto(amb.tenant, p.id).await.unwrap().unwrap();
        assert_eq!(atual.quantidade_atual, 8);
        assert_eq!(amb.banco.movimentacoes_do_produto(p.id).await.len(), 2);
        assert_eq!(
            amb.banco
                .listar(amb.tenant, FiltroVendas::default())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    // Itens do mesmo lote enxergam as deduções anteriores: o segundo item
    // do mesmo produto é avaliado contra o saldo já baixado.
    #[tokio::test]
    async fn itens_do_lote_enxergam_deducoes_anteriores() {
        let amb = ambiente();
        let p = produto(&amb, "INT-1", 10).await;
        mapeamento(&amb, "KIT", "INT-1", 4).await;

        let resumo = amb
            .servico
            .processar_pedidos(
                amb.tenant,
                &[
                    item("PED-1", "KIT", 1), // baixa 4, sobra 6
                    item("PED-2", "KIT", 1), // baixa 4, sobra 2
                    item("PED-3", "KIT", 1), // precisa 4, só tem 2
                ],
            )
            .await
            .unwrap();

        assert_eq!(resumo.sucesso, 2);
        assert_eq!(resumo.falta_estoque.len(), 1);
        assert_eq!(resumo.falta_estoque[0].disponivel, 2);
        assert_eq!(resumo.falta_estoque[0].necessario, 4);

        let atual = amb.banco.buscar_produto(amb.tenant, p.id).await.unwrap().unwrap();
        assert_eq!(atual.quantidade_atual, 2);
    }

    // Quantidade desproporcional: a multiplicação pelo kit não estoura a
    // aritmética nem corrompe o saldo; o item cai em falta_estoque e o
    // resto do lote segue normalmente.
    #[tokio::test]
    async fn quantidade_desproporcional_vira_falta_estoque() {
        let amb = ambiente();
        let p = produto(&amb, "INT-1", 10).await;
        mapeamento(&amb, "KIT", "INT-1", 2).await;

        let resumo = amb
            .servico
            .processar_pedidos(
                amb.tenant,
                &[item("PED-1", "KIT", i32::MAX), item("PED-2", "KIT", 1)],
            )
            .await
            .unwrap();

        assert_eq!(resumo.total, 2);
        assert_eq!(resumo.sucesso, 1);
        assert_eq!(resumo.falta_estoque.len(), 1);
        assert_eq!(resumo.falta_estoque[0].disponivel, 10);

        let atual = amb.banco.buscar_produto(amb.tenant, p.id).await.unwrap().unwrap();
        assert_eq!(atual.quantidade_atual, 8);
        // Só o estoque inicial e a saída do item válido.
        assert_eq!(amb.banco.movimentacoes_do_produto(p.id).await.len(), 2);
    }

    // Uma falha de infraestrutura colateral (sink de auditoria fora do ar)
    // não muda o resultado do lote.
    #[tokio::test]
    async fn falha_na_auditoria_nao_afeta_o_lote() {
        struct AuditoriaQuebrada;

        #[async_trait]
        impl crate::db::AtividadeStore for AuditoriaQuebrada {
            async fn registrar(
                &self,
                _tenant_id: Uuid,
                _tipo: &str,
                _descricao: &str,
                _detalhes: serde_json::Value,
            ) -> Result<(), AppError> {
                Err(anyhow::anyhow!("sink de auditoria fora do ar").into())
            }
        }

        let banco = Arc::new(BancoMemoria::new());
        let servico = ProcessamentoService::new(
            DeParaService::new(banco.clone()),
            banco.clone(),
            banco.clone(),
            Arc::new(AuditoriaQuebrada),
            Arc::new(NotificadorLog),
        );
        let amb = Ambiente {
            servico,
            banco,
            tenant: Uuid::new_v4(),
        };

        let p = produto(&amb, "INT-1", 10).await;
        mapeamento(&amb, "KIT", "INT-1", 2).await;

        let resumo = amb
            .servico
            .processar_pedidos(amb.tenant, &[item("PED-1", "KIT", 1)])
            .await
            .unwrap();
        assert_eq!(resumo.sucesso, 1);
        let atual = amb.banco.buscar_produto(amb.tenant, p.id).await.unwrap().unwrap();
        assert_eq!(atual.quantidade_atual, 8);
    }

    // Um notificador lento não trava o processamento além do timeout.
    #[tokio::test]
    async fn notificador_lento_nao_trava_o_lote() {
        struct NotificadorLento;

        #[async_trait]
        impl Notificador for NotificadorLento {
            async fn notificar_processamento(
                &self,
                _tenant_id: Uuid,
                _resumo: &ResumoProcessamento,
            ) -> Result<(), AppError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }

        tokio::time::pause();

        let banco = Arc::new(BancoMemoria::new());
        let servico = ProcessamentoService::new(
            DeParaService::new(banco.clone()),
            banco.clone(),
            banco.clone(),
            banco.clone(),
            Arc::new(NotificadorLento),
        );
        let amb = Ambiente {
            servico,
            banco,
            tenant: Uuid::new_v4(),
        };

        produto(&amb, "INT-1", 10).await;
        mapeamento(&amb, "KIT", "INT-1", 1).await;

        let resumo = amb
            .servico
            .processar_pedidos(amb.tenant, &[item("PED-1", "KIT", 1)])
            .await
            .unwrap();
        assert_eq!(resumo.sucesso, 1);
    }

    // Lote misto: categorias certas, ordem preservada, tudo processado.
    #[tokio::test]
    async fn lote_misto_reparte_resultados_nas_categorias_certas() {
        let amb = ambiente();
        produto(&amb, "INT-1", 10).await;
        produto(&amb, "INT-2", 1).await;
        mapeamento(&amb, "KIT-OK", "INT-1", 2).await;
        mapeamento(&amb, "KIT-GRANDE", "INT-2", 9).await;

        let resumo = amb
            .servico
            .processar_pedidos(
                amb.tenant,
                &[
                    item("PED-1", "KIT-OK", 1),
                    item("PED-2", "KIT-GRANDE", 1),
                    item("PED-3", "SEM-MAPA", 1),
                ],
            )
            .await
            .unwrap();

        assert_eq!(resumo.total, 3);
        assert_eq!(resumo.sucesso, 1);
        assert_eq!(resumo.falta_estoque.len(), 1);
        assert_eq!(resumo.falta_mapeamento, vec!["SEM-MAPA".to_string()]);
        assert!(resumo.produtos_inativos.is_empty());
    }
}
