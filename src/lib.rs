// Biblioteca raíz del crate `popdash`.
// Panel de población por municipio: carga desde la base, filtros,
// estadísticas descriptivas y gráficos, servidos por HTTP.
pub mod models;
pub mod config;
pub mod data;
pub mod filter;
pub mod stats;
pub mod suggest;
pub mod charts;
pub mod view;
pub mod server;
mod server_handlers;

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
