//! Caché en memoria de la tabla de población.
//!
//! La tabla se calcula una sola vez por proceso y se comparte como `Arc`.
//! `get_or_load` mantiene el mutex durante la carga, así dos primeras llamadas
//! concurrentes no consultan la base dos veces. Sólo se guardan cargas exitosas.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use polars::prelude::DataFrame;

#[derive(Debug, Default)]
pub struct DatasetCache {
    slot: Mutex<Option<Arc<DataFrame>>>,
}

static DATASET_CACHE: OnceLock<DatasetCache> = OnceLock::new();

/// Caché global del proceso.
pub fn dataset_cache() -> &'static DatasetCache {
    DATASET_CACHE.get_or_init(DatasetCache::new)
}

impl DatasetCache {
    pub fn new() -> Self {
        DatasetCache { slot: Mutex::new(None) }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<DataFrame>>> {
        // un pánico dentro de `load` no deja la tabla a medio escribir
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Devuelve la tabla guardada o ejecuta `load` y guarda su resultado si es `Ok`.
    pub fn get_or_load<E, F>(&self, load: F) -> Result<Arc<DataFrame>, E>
    where
        F: FnOnce() -> Result<DataFrame, E>,
    {
        let mut guard = self.lock();
        if let Some(existing) = guard.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let arc = Arc::new(load()?);
        *guard = Some(Arc::clone(&arc));
        Ok(arc)
    }

    pub fn get(&self) -> Option<Arc<DataFrame>> {
        self.lock().as_ref().map(Arc::clone)
    }

    /// Descarta la tabla guardada; la próxima llamada vuelve a consultar la base.
    pub fn invalidate(&self) -> bool {
        let had = self.lock().take().is_some();
        if had {
            tracing::info!("caché de población invalidada");
        }
        had
    }
}
