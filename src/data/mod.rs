//! Cargador de datos de población.
//!
//! `try_load` ejecuta la consulta fija, renombra y convierte columnas.
//! `load` es la frontera hacia la interfaz: nunca falla, devuelve una tabla
//! vacía junto con el mensaje de error para mostrar al usuario.

pub mod cache;
pub mod db;
pub mod rename;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use polars::prelude::*;
use thiserror::Error;

use crate::config::DbTarget;
use crate::models::{self, has_column, tipo_numerico};

pub use cache::{dataset_cache, DatasetCache};
pub use rename::{rename_columns, MAPEAMENTO_COLUNAS};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{0}")]
    Config(String),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("postgres: {0}")]
    Postgres(#[from] postgres::Error),
    #[error("polars: {0}")]
    Polars(#[from] PolarsError),
    #[error("{0}")]
    Worker(String),
}

/// Resultado de una carga vista desde la interfaz.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub dataset: Arc<DataFrame>,
    /// Mensaje visible cuando la carga falló.
    pub error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl LoadOutcome {
    pub fn ok(dataset: Arc<DataFrame>) -> Self {
        LoadOutcome { dataset, error: None, loaded_at: Some(Utc::now()) }
    }

    pub fn failed(message: String) -> Self {
        LoadOutcome { dataset: Arc::new(DataFrame::empty()), error: Some(message), loaded_at: None }
    }
}

/// Fuente de la tabla para la página de carga.
pub trait DatasetProvider: Send + Sync {
    fn load(&self) -> LoadOutcome;

    /// Descarta la tabla memorizada, si la hay. Devuelve si había algo.
    fn invalidate(&self) -> bool {
        false
    }
}

/// Proveedor real: base de datos configurada + caché del proceso.
pub struct CachedDbProvider {
    target: Result<DbTarget, String>,
    cache: &'static DatasetCache,
}

impl CachedDbProvider {
    pub fn new(target: Result<DbTarget, String>) -> Self {
        CachedDbProvider { target, cache: dataset_cache() }
    }
}

impl DatasetProvider for CachedDbProvider {
    fn load(&self) -> LoadOutcome {
        let result = self.cache.get_or_load(|| match &self.target {
            Ok(t) => try_load(t),
            Err(msg) => Err(LoadError::Config(msg.clone())),
        });
        match result {
            Ok(df) => LoadOutcome::ok(df),
            Err(e) => {
                tracing::error!(error = %e, "fallo al cargar los datos");
                LoadOutcome::failed(format!("Erro ao carregar os dados: {}", e))
            }
        }
    }

    fn invalidate(&self) -> bool {
        self.cache.invalidate()
    }
}

/// Carga sin caché: nunca propaga errores.
pub fn load(target: &DbTarget) -> LoadOutcome {
    match try_load(target) {
        Ok(df) => LoadOutcome::ok(Arc::new(df)),
        Err(e) => {
            tracing::error!(error = %e, "fallo al cargar los datos");
            LoadOutcome::failed(format!("Erro ao carregar os dados: {}", e))
        }
    }
}

/// Consulta, renombra y convierte tipos.
pub fn try_load(target: &DbTarget) -> Result<DataFrame, LoadError> {
    tracing::debug!(destino = ?target, "consultando población");
    let raw = db::fetch_raw(target)?;
    let df = prepare(&raw)?;
    tracing::info!(rows = df.height(), "datos de población cargados");
    Ok(df)
}

/// Renombra columnas y aplica las conversiones de tipo a las columnas presentes.
pub fn prepare(raw: &DataFrame) -> PolarsResult<DataFrame> {
    let mut df = rename_columns(raw, &MAPEAMENTO_COLUNAS)?;
    let conversoes: [(&str, fn(&Series) -> PolarsResult<Series>); 3] = [
        (models::COL_ANO, ano_como_texto),
        (models::COL_POPULACAO, populacao_como_numero),
        (models::COL_RIDE, ride_como_bool),
    ];
    for (nome, converter) in conversoes {
        if has_column(&df, nome) {
            let convertida = converter(df.column(nome)?.as_materialized_series())?;
            df.with_column(convertida)?;
        }
    }
    Ok(df)
}

// 2020.0 y "2020.0" quedan como "2020"
fn normalizar_ano(s: &str) -> String {
    match s.trim().parse::<f64>() {
        Ok(x) if x.fract() == 0.0 && x.is_finite() && x.abs() < 1e15 => format!("{}", x as i64),
        _ => s.to_string(),
    }
}

fn ano_como_texto(s: &Series) -> PolarsResult<Series> {
    let texto = s.cast(&DataType::String)?;
    let ca: StringChunked = texto.str()?.into_iter().map(|v| v.map(normalizar_ano)).collect();
    Ok(ca.with_name(s.name().clone()).into_series())
}

/// Cast no estricto: el texto que no es número queda nulo.
fn populacao_como_numero(s: &Series) -> PolarsResult<Series> {
    s.cast(&DataType::Float64)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "t" | "true" | "1" | "s" | "sim" | "y" | "yes" => Some(true),
        "f" | "false" | "0" | "n" | "não" | "nao" | "no" => Some(false),
        _ => None,
    }
}

fn ride_como_bool(s: &Series) -> PolarsResult<Series> {
    let ca: BooleanChunked = match s.dtype() {
        DataType::Boolean => return Ok(s.clone()),
        dt if tipo_numerico(dt) => {
            let num = s.cast(&DataType::Float64)?;
            num.f64()?.into_iter().map(|v| v.map(|x| x != 0.0)).collect()
        }
        _ => {
            let texto = s.cast(&DataType::String)?;
            texto.str()?.into_iter().map(|v| v.and_then(parse_bool)).collect()
        }
    };
    Ok(ca.with_name(s.name().clone()).into_series())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{column_names, frame_from_rows, rows_of, Value};

    #[test]
    fn test_prepare_converte_tipos() {
        let raw = frame_from_rows(
            &["ano_pesquisa".into(), "numero_habitantes".into(), "ride_brasilia".into()],
            vec![
                vec![Value::Int(2020), Value::Text("1500".into()), Value::Int(1)],
                vec![Value::Float(2021.0), Value::Text("n/d".into()), Value::Text("f".into())],
            ],
        )
        .unwrap();
        let df = prepare(&raw).unwrap();
        assert_eq!(df.column("Ano").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("População").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("RIDE Brasília").unwrap().dtype(), &DataType::Boolean);
        let linhas = rows_of(&df).unwrap();
        assert_eq!(
            linhas[0],
            vec![Value::Text("2020".into()), Value::Float(1500.0), Value::Bool(true)]
        );
        assert_eq!(
            linhas[1],
            vec![Value::Text("2021".into()), Value::Null, Value::Bool(false)]
        );
    }

    #[test]
    fn test_ano_numerico_como_texto_sem_decimais() {
        // NUMERIC del servidor llega como "2020.0" o "2020"
        let raw = df!("ano_pesquisa" => [Some("2020.0"), Some("2021"), None]).unwrap();
        let df = prepare(&raw).unwrap();
        assert_eq!(
            models::text_column(&df, "Ano").unwrap(),
            vec![Some("2020".to_string()), Some("2021".to_string()), None]
        );
    }

    #[test]
    fn test_prepare_tolera_colunas_ausentes() {
        let raw = df!("nome_municipio" => ["Goiânia"]).unwrap();
        let df = prepare(&raw).unwrap();
        assert_eq!(column_names(&df), vec!["Município".to_string()]);
    }

    #[test]
    fn test_provider_com_config_incompleta() {
        // no toca la caché global si la configuración falta: el error no se guarda
        let provider = CachedDbProvider { target: Err("sin DB_HOST".into()), cache: Box::leak(Box::new(DatasetCache::new())) };
        let out = provider.load();
        assert_eq!(out.dataset.height(), 0);
        assert!(out.error.unwrap().contains("sin DB_HOST"));
    }
}
