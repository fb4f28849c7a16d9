// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Estoque ---
        handlers::estoque::criar_produto,
        handlers::estoque::listar_produtos,
        handlers::estoque::buscar_produto,
        handlers::estoque::desativar_produto,
        handlers::estoque::entrada_estoque,
        handlers::estoque::saida_estoque,
        handlers::estoque::listar_movimentacoes,

        // --- DE/PARA ---
        handlers::depara::criar_mapeamento,
        handlers::depara::listar_mapeamentos,
        handlers::depara::desativar_mapeamento,
        handlers::depara::importar_planilha,

        // --- Pedidos ---
        handlers::processamento::processar_pedidos,

        // --- Previsão ---
        handlers::previsao::prever_reposicao,

        // --- Vendas ---
        handlers::vendas::listar_vendas,
        handlers::vendas::buscar_venda,
        handlers::vendas::estornar_venda,
    ),
    components(
        schemas(
            // --- Estoque ---
            models::estoque::Produto,
            models::estoque::TipoMovimentacao,
            models::estoque::MovimentacaoEstoque,
            handlers::estoque::CriarProdutoPayload,
            handlers::estoque::MovimentacaoPayload,

            // --- DE/PARA ---
            models::depara::Prioridade,
            models::depara::MapeamentoDePara,
            models::depara::ResolucaoSku,
            models::depara::RejeicaoLote,
            models::depara::ErroLinha,
            models::depara::ResultadoImportacao,
            handlers::depara::CriarMapeamentoPayload,

            // --- Pedidos ---
            models::vendas::ItemPedido,
            models::vendas::DetalheFaltaEstoque,
            models::vendas::ResumoProcessamento,
            handlers::processamento::ProcessarPedidosPayload,

            // --- Previsão ---
            models::previsao::Tendencia,
            models::previsao::Variabilidade,
            models::previsao::PrevisaoReposicao,

            // --- Vendas ---
            models::vendas::StatusVenda,
            models::vendas::RegistroVenda,
            handlers::vendas::EstornoPayload,
        )
    ),
    tags(
        (name = "Estoque", description = "Produtos e livro de movimentações"),
        (name = "DE/PARA", description = "Mapeamento de SKUs de pedido para SKUs internos"),
        (name = "Pedidos", description = "Processamento de pedidos em lote"),
        (name = "Previsão", description = "Previsão de reposição de estoque"),
        (name = "Vendas", description = "Histórico de vendas e estornos"),
    ),
    info(
        title = "REISTOQ API",
        description = "Gestão de estoque multi-tenant: DE/PARA, processamento de pedidos, previsão de reposição e histórico de vendas.",
    )
)]
pub struct ApiDoc;
