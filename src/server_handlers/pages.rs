use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder, Responder};
use serde_json::json;

use crate::server::{AppState, COOKIE_SESSAO};
use crate::view::{self, html::render_html, Page, UiTree, WidgetValues};

/// Renderiza la página para la sesión de la petición y guarda el contexto
/// resultante. La carga puede bloquear (consulta a la base), así que se
/// ejecuta fuera del worker.
async fn renderizar(
    req: &HttpRequest,
    state: &web::Data<AppState>,
    page: Page,
    pairs: Vec<(String, String)>,
) -> Result<(Option<String>, UiTree), actix_web::error::BlockingError> {
    let cookie = req.cookie(COOKIE_SESSAO);
    let (id, mut ctx) = state.sessions.checkout(cookie.as_ref().map(|c| c.value()));
    let widgets = WidgetValues::from_pairs(pairs);
    let provider = state.provider.clone();
    let preview_rows = state.preview_rows;

    let (ui, ctx) = web::block(move || {
        let ui = view::render_page(page, &mut ctx, &widgets, provider.as_ref(), preview_rows);
        (ui, ctx)
    })
    .await?;

    tracing::debug!(sessao = ?id, pagina = page.slug(), estado = ?ctx.state(), "página renderizada");
    let id = state.sessions.save(id.as_deref(), ctx);
    Ok((id, ui))
}

// Sin sesión guardada no hay cookie que enviar
fn com_cookie(mut resp: HttpResponseBuilder, id: Option<String>) -> HttpResponseBuilder {
    if let Some(id) = id {
        resp.cookie(Cookie::build(COOKIE_SESSAO, id).path("/").http_only(true).finish());
    }
    resp
}

fn responder_html(req: &HttpRequest, result: Result<(Option<String>, UiTree), actix_web::error::BlockingError>, page: Page) -> HttpResponse {
    match result {
        Ok((id, ui)) => com_cookie(HttpResponse::Ok(), id)
            .content_type("text/html; charset=utf-8")
            .body(render_html(&ui)),
        Err(e) => {
            tracing::error!(error = %e, pagina = page.slug(), path = req.path(), "fallo al renderizar");
            HttpResponse::InternalServerError().body("error rendering page")
        }
    }
}

/// GET /
pub async fn raiz_handler(req: HttpRequest, state: web::Data<AppState>, query: web::Query<Vec<(String, String)>>) -> impl Responder {
    let page = Page::Carregar;
    let result = renderizar(&req, &state, page, query.into_inner()).await;
    responder_html(&req, result, page)
}

/// GET /pagina/{pagina}
/// Identificadores desconocidos caen en la página de carga.
pub async fn pagina_handler(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
) -> impl Responder {
    let page = Page::from_slug(&path.into_inner());
    let result = renderizar(&req, &state, page, query.into_inner()).await;
    responder_html(&req, result, page)
}

/// GET /api/pagina/{pagina}
/// Mismo árbol de UI que la versión HTML, serializado como JSON.
pub async fn pagina_json_handler(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
) -> impl Responder {
    let page = Page::from_slug(&path.into_inner());
    match renderizar(&req, &state, page, query.into_inner()).await {
        Ok((id, ui)) => com_cookie(HttpResponse::Ok(), id).json(ui),
        Err(e) => {
            tracing::error!(error = %e, pagina = page.slug(), "fallo al renderizar");
            HttpResponse::InternalServerError().json(json!({"error": format!("failed to render page: {}", e)}))
        }
    }
}
