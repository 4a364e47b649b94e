use actix_web::{web, App, HttpServer};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::data::{CachedDbProvider, DatasetProvider};
use crate::server_handlers::{cache_invalidar_handler, help_handler, pagina_handler, pagina_json_handler, raiz_handler};
use crate::view::{SessionContext, SessionState};

/// Nombre de la cookie que identifica la sesión.
pub const COOKIE_SESSAO: &str = "popdash_sessao";
/// Horas sin uso tras las cuales una sesión vence.
pub const VALIDADE_SESSAO_HORAS: i64 = 2;
/// Máximo de sesiones guardadas; al pasarlo se descarta la menos usada.
pub const MAX_SESSOES: usize = 1000;

#[derive(Debug, Clone)]
struct Entrada {
    ctx: SessionContext,
    visto: DateTime<Utc>,
}

/// Sesiones en memoria, una por cookie. Sólo se guardan sesiones con tabla
/// cargada: visitar una página sin datos no ocupa lugar.
pub struct SessionStore {
    inner: Mutex<HashMap<String, Entrada>>,
    validade: Duration,
    max: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::with_limits(Duration::hours(VALIDADE_SESSAO_HORAS), MAX_SESSOES)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore::default()
    }

    pub fn with_limits(validade: Duration, max: usize) -> Self {
        SessionStore { inner: Mutex::new(HashMap::new()), validade, max: max.max(1) }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entrada>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Contexto de la sesión `id` si existe y no venció. No crea sesiones:
    /// un id ausente, vencido o desconocido recibe un contexto vacío sin id.
    pub fn checkout(&self, id: Option<&str>) -> (Option<String>, SessionContext) {
        self.checkout_em(id, Utc::now())
    }

    fn checkout_em(&self, id: Option<&str>, agora: DateTime<Utc>) -> (Option<String>, SessionContext) {
        let Some(id) = id else { return (None, SessionContext::new()) };
        let mut sessions = self.lock();
        match sessions.get_mut(id) {
            Some(e) if agora - e.visto < self.validade => {
                e.visto = agora;
                (Some(id.to_string()), e.ctx.clone())
            }
            Some(_) => {
                sessions.remove(id);
                tracing::debug!(sessao = %id, "sesión vencida");
                (None, SessionContext::new())
            }
            None => (None, SessionContext::new()),
        }
    }

    /// Guarda el contexto resultante de una petición y devuelve el id bajo el
    /// que quedó, si quedó. Un contexto sin tabla nunca reemplaza a uno cargado
    /// ni abre una sesión nueva.
    pub fn save(&self, id: Option<&str>, ctx: SessionContext) -> Option<String> {
        self.save_em(id, ctx, Utc::now())
    }

    fn save_em(&self, id: Option<&str>, ctx: SessionContext, agora: DateTime<Utc>) -> Option<String> {
        let mut sessions = self.lock();
        if let Some(id) = id {
            if let Some(e) = sessions.get_mut(id) {
                if ctx.state() == SessionState::Loaded {
                    e.ctx = ctx;
                }
                e.visto = agora;
                return Some(id.to_string());
            }
        }
        if ctx.state() == SessionState::NoData {
            return None;
        }

        let antes = sessions.len();
        sessions.retain(|_, e| agora - e.visto < self.validade);
        while sessions.len() >= self.max {
            let Some(mais_antiga) = sessions.iter().min_by_key(|(_, e)| e.visto).map(|(k, _)| k.clone()) else { break };
            sessions.remove(&mais_antiga);
        }
        let descartadas = antes - sessions.len();
        if descartadas > 0 {
            tracing::debug!(descartadas, "sesiones vencidas o excedentes descartadas");
        }

        let novo = Uuid::new_v4().to_string();
        sessions.insert(novo.clone(), Entrada { ctx, visto: agora });
        tracing::debug!(sessao = %novo, "nueva sesión");
        Some(novo)
    }

    pub fn get(&self, id: &str) -> Option<SessionContext> {
        self.lock().get(id).map(|e| e.ctx.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Estado compartido por todos los workers.
pub struct AppState {
    pub provider: Arc<dyn DatasetProvider>,
    pub sessions: SessionStore,
    pub preview_rows: usize,
}

impl AppState {
    pub fn new(provider: Arc<dyn DatasetProvider>, preview_rows: usize) -> Self {
        AppState { provider, sessions: SessionStore::new(), preview_rows }
    }
}

/// Registra las rutas; el `web::Data<AppState>` lo añade quien construye la `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(raiz_handler))
        .route("/pagina/{pagina}", web::get().to(pagina_handler))
        .route("/api/pagina/{pagina}", web::get().to(pagina_json_handler))
        .route("/api/cache/invalidar", web::post().to(cache_invalidar_handler))
        .route("/help", web::get().to(help_handler));
}

pub async fn run_server(config: AppConfig) -> std::io::Result<()> {
    let provider: Arc<dyn DatasetProvider> = Arc::new(CachedDbProvider::new(config.db.clone()));
    let state = web::Data::new(AppState::new(provider, config.preview_rows));

    tracing::info!(bind = %config.bind_addr, "iniciando servidor");
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(&config.bind_addr)?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::DataFrame;

    fn carregada() -> SessionContext {
        let mut ctx = SessionContext::new();
        ctx.store(Arc::new(DataFrame::empty()));
        ctx
    }

    #[test]
    fn test_so_sessoes_carregadas_sao_guardadas() {
        let store = SessionStore::new();
        let (id, ctx) = store.checkout(None);
        assert!(id.is_none());
        assert!(store.save(None, ctx).is_none());
        assert!(store.is_empty());

        let id = store.save(None, carregada()).unwrap();
        let (mesmo, ctx) = store.checkout(Some(&id));
        assert_eq!(mesmo.as_deref(), Some(id.as_str()));
        assert_eq!(ctx.state(), SessionState::Loaded);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ids_desconhecidos_nao_criam_sessoes() {
        let store = SessionStore::new();
        for i in 0..10_000 {
            let (id, _) = store.checkout(Some(&format!("bogus-{}", i)));
            assert!(id.is_none());
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_contexto_sem_dados_nao_substitui_o_carregado() {
        let store = SessionStore::new();
        // dos peticiones concurrentes sin cookie; sólo una carga
        let (_, mut primeira) = store.checkout(None);
        let (_, segunda) = store.checkout(None);
        primeira.store(Arc::new(DataFrame::empty()));
        let id = store.save(None, primeira).unwrap();
        assert!(store.save(None, segunda).is_none());
        assert_eq!(store.get(&id).map(|c| c.state()), Some(SessionState::Loaded));

        // copia vieja sin tabla guardada con la misma cookie
        let (_, atual) = store.checkout(Some(&id));
        assert_eq!(store.save(Some(&id), SessionContext::new()).as_deref(), Some(id.as_str()));
        assert_eq!(store.get(&id).map(|c| c.state()), Some(SessionState::Loaded));
        assert_eq!(atual.state(), SessionState::Loaded);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sessoes_vencidas_sao_descartadas() {
        let store = SessionStore::with_limits(Duration::hours(2), 100);
        let t0 = Utc::now();
        let velha = store.save_em(None, carregada(), t0).unwrap();
        let depois = t0 + Duration::hours(3);

        let (id, ctx) = store.checkout_em(Some(&velha), depois);
        assert!(id.is_none());
        assert_eq!(ctx.state(), SessionState::NoData);
        assert!(store.get(&velha).is_none());

        let _ = store.save_em(None, carregada(), t0);
        let nova = store.save_em(None, carregada(), depois).unwrap();
        // guardar una sesión nueva barre las vencidas
        assert_eq!(store.len(), 1);
        assert!(store.get(&nova).is_some());
    }

    #[test]
    fn test_limite_descarta_a_menos_usada() {
        let store = SessionStore::with_limits(Duration::hours(2), 2);
        let t0 = Utc::now();
        let a = store.save_em(None, carregada(), t0).unwrap();
        let b = store.save_em(None, carregada(), t0 + Duration::seconds(1)).unwrap();
        // usar `a` la vuelve la más reciente
        let _ = store.checkout_em(Some(&a), t0 + Duration::seconds(2));
        let c = store.save_em(None, carregada(), t0 + Duration::seconds(3)).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(&a).is_some());
        assert!(store.get(&b).is_none());
        assert!(store.get(&c).is_some());
    }

    #[test]
    fn test_ids_aleatorios() {
        let store = SessionStore::new();
        let a = store.save(None, carregada()).unwrap();
        let b = store.save(None, carregada()).unwrap();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
