//! Configuración leída del entorno (y de `.env` si existe).

use std::env;

/// Destino de la base de datos de población.
#[derive(Clone, PartialEq)]
pub enum DbTarget {
    /// Archivo SQLite (se abre en modo sólo lectura).
    Sqlite(String),
    /// URL o cadena clave/valor aceptada por `postgres::Client::connect`.
    Postgres(String),
}

// No mostrar credenciales en logs
impl std::fmt::Debug for DbTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbTarget::Sqlite(p) => write!(f, "DbTarget::Sqlite({})", p),
            DbTarget::Postgres(_) => write!(f, "DbTarget::Postgres(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Filas mostradas en la vista previa de la página de carga.
    pub preview_rows: usize,
    /// `Err` con el motivo cuando la configuración de la base está incompleta;
    /// se informa al usuario al intentar cargar, no al arrancar.
    pub db: Result<DbTarget, String>,
}

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

impl AppConfig {
    /// Lee la configuración del entorno del proceso, cargando `.env` antes.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de variables.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let preview_rows = lookup("PREVIEW_ROWS")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PREVIEW_ROWS);
        AppConfig { bind_addr, preview_rows, db: db_target(&lookup) }
    }
}

fn db_target<F>(lookup: &F) -> Result<DbTarget, String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()) {
        return parse_database_url(&url);
    }

    // Variables separadas: DB_HOST, DB_NAME, DB_USERNAME, DB_PASSWORD
    let mut faltantes = Vec::new();
    let mut get = |k: &'static str| match lookup(k).filter(|s| !s.is_empty()) {
        Some(v) => v,
        None => {
            faltantes.push(k);
            String::new()
        }
    };
    let host = get("DB_HOST");
    let name = get("DB_NAME");
    let user = get("DB_USERNAME");
    let password = get("DB_PASSWORD");
    if !faltantes.is_empty() {
        return Err(format!(
            "configuración de base de datos incompleta: defina DATABASE_URL o {}",
            faltantes.join(", ")
        ));
    }
    Ok(DbTarget::Postgres(format!(
        "host={} dbname={} user={} password={}",
        quote_kv(&host),
        quote_kv(&name),
        quote_kv(&user),
        quote_kv(&password)
    )))
}

/// Interpreta `DATABASE_URL`: postgres://, postgresql://, sqlite:// o file://.
pub fn parse_database_url(url: &str) -> Result<DbTarget, String> {
    let url = url.trim();
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(DbTarget::Postgres(url.to_string()))
    } else if let Some(path) = url.strip_prefix("sqlite://") {
        Ok(DbTarget::Sqlite(path.to_string()))
    } else if let Some(path) = url.strip_prefix("file://") {
        Ok(DbTarget::Sqlite(path.to_string()))
    } else {
        Err(format!("DATABASE_URL usa un esquema no soportado: {}", url))
    }
}

// Valores de la cadena clave/valor de libpq: comillas simples y escapes
fn quote_kv(v: &str) -> String {
    let escaped = v.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}
