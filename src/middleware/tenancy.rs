// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// O extrator de tenant: todo endpoint de dados exige o X-Tenant-ID e todas
// as queries são filtradas por ele.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    // AppError já implementa IntoResponse
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(valor) = parts.headers.get(TENANT_ID_HEADER) else {
            return Err(AppError::BadRequest(
                "O cabeçalho X-Tenant-ID é obrigatório.".to_string(),
            ));
        };

        let valor = valor.to_str().map_err(|_| {
            AppError::BadRequest("Cabeçalho X-Tenant-ID contém caracteres inválidos.".to_string())
        })?;

        let tenant_id = Uuid::parse_str(valor).map_err(|_| {
            AppError::BadRequest("Cabeçalho X-Tenant-ID inválido (não é um UUID).".to_string())
        })?;

        Ok(TenantContext(tenant_id))
    }
}
