pub mod depara;
pub mod estoque;
pub mod previsao;
pub mod processamento;
pub mod vendas;
