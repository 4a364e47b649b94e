use polars::prelude::*;
use serde::Serialize;

/// Estadísticas descriptivas de una columna numérica.
/// Los valores indefinidos (tabla vacía, desviación con un solo valor) son `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl Describe {
    /// Pares (etiqueta, valor) en el orden en que se muestran.
    pub fn rows(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("count", Some(self.count as f64)),
            ("mean", self.mean),
            ("std", self.std),
            ("min", self.min),
            ("25%", self.p25),
            ("50%", self.p50),
            ("75%", self.p75),
            ("max", self.max),
        ]
    }
}

/// Calcula count, media, desviación estándar muestral (n-1), mínimo,
/// cuartiles (interpolación lineal) y máximo. Nulos y NaN se ignoran.
pub fn describe(values: &Float64Chunked) -> PolarsResult<Describe> {
    let xs: Float64Chunked = values.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect();
    let n = xs.len() - xs.null_count();

    if n == 0 {
        return Ok(Describe { count: 0, mean: None, std: None, min: None, p25: None, p50: None, p75: None, max: None });
    }

    Ok(Describe {
        count: n,
        mean: xs.mean(),
        std: if n > 1 { xs.std(1) } else { None },
        min: xs.min(),
        p25: xs.quantile(0.25, QuantileMethod::Linear)?,
        p50: xs.quantile(0.50, QuantileMethod::Linear)?,
        p75: xs.quantile(0.75, QuantileMethod::Linear)?,
        max: xs.max(),
    })
}

/// `describe` sobre una columna de la tabla, convertida a número.
pub fn describe_column(df: &DataFrame, name: &str) -> PolarsResult<Describe> {
    let serie = df.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
    describe(serie.f64()?)
}
