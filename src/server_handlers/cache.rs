use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::server::AppState;

/// POST /api/cache/invalidar
/// Descarta la tabla memorizada; la próxima visita a "Carregar Dados" vuelve a consultar.
pub async fn cache_invalidar_handler(state: web::Data<AppState>) -> impl Responder {
    let invalidado = state.provider.invalidate();
    HttpResponse::Ok().json(json!({"status": "ok", "invalidado": invalidado}))
}
