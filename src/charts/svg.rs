// Dibujo con plotters sobre el backend SVG (en memoria).

use plotters::prelude::*;
use std::error::Error;

use super::{group_by_state, sum_by};
use polars::prelude::DataFrame;

use crate::models::{has_column, numeric_column, text_column, COL_ESTADOS, COL_LATITUDE, COL_LONGITUDE, COL_POPULACAO};

const SIZE: (u32, u32) = (800, 480);
const FONT: &str = "sans-serif";
// radio máximo de las burbujas del mapa, en píxeles
const MAX_BUBBLE: f64 = 30.0;

fn color(i: usize) -> RGBColor {
    let c = Palette99::pick(i).to_rgba();
    RGBColor(c.0, c.1, c.2)
}

fn y_upper(max: f64) -> f64 {
    if max > 0.0 { max * 1.1 } else { 1.0 }
}

/// Barras agrupadas: una barra por estado dentro de cada categoría de `x`.
pub fn bar_chart(df: &DataFrame, x_col: &str, y_col: &str, title: &str) -> Result<String, Box<dyn Error>> {
    let grouped = group_by_state(df, x_col, y_col)?;
    let n = grouped.categories.len() as i32;
    let max = grouped
        .series
        .iter()
        .flat_map(|(_, v)| v.iter().flatten())
        .fold(0.0_f64, |a, b| a.max(*b));

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d((0..n).into_segmented(), 0f64..y_upper(max))?;

        let categories = &grouped.categories;
        let label = |v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(i) => categories.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(categories.len() + 1)
            .x_label_formatter(&label)
            .x_desc(x_col)
            .y_desc(y_col)
            .draw()?;

        // ancho en píxeles de cada categoría, repartido entre las series
        let (plot_w, _) = chart.plotting_area().dim_in_pixel();
        let seg_w = plot_w / (n as u32 + 1).max(1);
        let k = grouped.series.len().max(1) as u32;
        let pad = seg_w / 10;
        let bar_w = (seg_w.saturating_sub(2 * pad) / k).max(1);

        for (si, (state, values)) in grouped.series.iter().enumerate() {
            let c = color(si);
            let left = pad + si as u32 * bar_w;
            let right = seg_w.saturating_sub(left + bar_w);
            let bars = values.iter().enumerate().filter_map(|(ci, v)| {
                v.map(|y| {
                    let ci = ci as i32;
                    let mut r = Rectangle::new(
                        [(SegmentValue::Exact(ci), 0.0), (SegmentValue::Exact(ci + 1), y)],
                        c.filled(),
                    );
                    r.set_margin(0, 0, left, right);
                    r
                })
            });
            chart
                .draw_series(bars)?
                .label(state.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], c.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        root.present()?;
    }
    Ok(buf)
}

/// Pizza: porciones por valor de `x`, ponderadas por la suma de `y`.
pub fn pie_chart(df: &DataFrame, x_col: &str, y_col: &str, title: &str) -> Result<String, Box<dyn Error>> {
    let slices: Vec<(String, f64)> = sum_by(df, x_col, y_col)?.into_iter().filter(|(_, v)| *v > 0.0).collect();
    let total: f64 = slices.iter().map(|(_, v)| v).sum();

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(title, (FONT, 22))?;
        let (w, h) = root.dim_in_pixel();
        let center = ((w as f64 * 0.35), (h as f64 * 0.5));
        let radius = (w.min(h) as f64) * 0.4;

        let mut start = -std::f64::consts::FRAC_PI_2;
        for (i, (name, value)) in slices.iter().enumerate() {
            let sweep = value / total * std::f64::consts::TAU;
            let steps = ((sweep / 0.05).ceil() as usize).max(2);
            let mut points = vec![(center.0 as i32, center.1 as i32)];
            for s in 0..=steps {
                let a = start + sweep * s as f64 / steps as f64;
                points.push(((center.0 + radius * a.cos()) as i32, (center.1 + radius * a.sin()) as i32));
            }
            root.draw(&Polygon::new(points, color(i).filled()))?;

            // leyenda: nombre y porcentaje
            let ly = 30 + i as i32 * 20;
            let lx = (w as f64 * 0.72) as i32;
            root.draw(&Rectangle::new([(lx, ly), (lx + 12, ly + 12)], color(i).filled()))?;
            let text = format!("{} ({:.1}%)", name, value / total * 100.0);
            root.draw(&Text::new(text, (lx + 18, ly), (FONT, 14).into_font().color(&BLACK)))?;
            start += sweep;
        }
        root.present()?;
    }
    Ok(buf)
}

/// Líneas: una serie por estado sobre las categorías de `x` (ordenadas).
pub fn line_chart(df: &DataFrame, x_col: &str, y_col: &str, title: &str) -> Result<String, Box<dyn Error>> {
    let mut grouped = group_by_state(df, x_col, y_col)?;
    // eje X ordenado (p. ej. años)
    let mut order: Vec<usize> = (0..grouped.categories.len()).collect();
    order.sort_by(|a, b| grouped.categories[*a].cmp(&grouped.categories[*b]));
    grouped.categories = order.iter().map(|i| grouped.categories[*i].clone()).collect();
    for (_, values) in grouped.series.iter_mut() {
        *values = order.iter().map(|i| values[*i]).collect();
    }

    let n = grouped.categories.len() as i32;
    let max = grouped
        .series
        .iter()
        .flat_map(|(_, v)| v.iter().flatten())
        .fold(0.0_f64, |a, b| a.max(*b));

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d((0..n).into_segmented(), 0f64..y_upper(max))?;

        let categories = &grouped.categories;
        let label = |v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(i) => categories.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .x_labels(categories.len() + 1)
            .x_label_formatter(&label)
            .x_desc(x_col)
            .y_desc(y_col)
            .draw()?;

        for (si, (state, values)) in grouped.series.iter().enumerate() {
            let c = color(si);
            let points: Vec<(SegmentValue<i32>, f64)> = values
                .iter()
                .enumerate()
                .filter_map(|(ci, v)| v.map(|y| (SegmentValue::CenterOf(ci as i32), y)))
                .collect();
            chart
                .draw_series(LineSeries::new(points.clone(), c.stroke_width(2)))?
                .label(state.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], c.stroke_width(2)));
            chart.draw_series(points.into_iter().map(|p| Circle::new(p, 3, c.filled())))?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        root.present()?;
    }
    Ok(buf)
}

/// Mapa de burbujas: longitud en X, latitud en Y, radio proporcional a la raíz
/// de la población y color por estado. Filas sin coordenadas se omiten.
pub fn bubble_map(df: &DataFrame, title: &str) -> Result<String, Box<dyn Error>> {
    let mut states: Vec<String> = Vec::new();
    let mut points: Vec<(f64, f64, f64, usize)> = Vec::new();
    let lats = numeric_column(df, COL_LATITUDE)?;
    let lons = numeric_column(df, COL_LONGITUDE)?;
    let pops = if has_column(df, COL_POPULACAO) { numeric_column(df, COL_POPULACAO)? } else { vec![None; df.height()] };
    let estados = if has_column(df, COL_ESTADOS) { text_column(df, COL_ESTADOS)? } else { vec![None; df.height()] };
    for i in 0..df.height() {
        let (Some(lat), Some(lon)) = (lats[i], lons[i]) else { continue };
        let pop = pops[i].unwrap_or(0.0).max(0.0);
        let state = estados[i].clone().unwrap_or_default();
        let si = match states.iter().position(|s| *s == state) {
            Some(si) => si,
            None => {
                states.push(state);
                states.len() - 1
            }
        };
        points.push((lon, lat, pop, si));
    }
    if points.is_empty() {
        return Err("nenhuma linha com latitude e longitude".into());
    }

    let (mut lon_min, mut lon_max, mut lat_min, mut lat_max) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    let mut pop_max = 0.0_f64;
    for (lon, lat, pop, _) in &points {
        lon_min = lon_min.min(*lon);
        lon_max = lon_max.max(*lon);
        lat_min = lat_min.min(*lat);
        lat_max = lat_max.max(*lat);
        pop_max = pop_max.max(*pop);
    }
    // margen alrededor de los puntos (también evita rangos de ancho cero)
    let pad_lon = ((lon_max - lon_min) * 0.1).max(1.0);
    let pad_lat = ((lat_max - lat_min) * 0.1).max(1.0);

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((lon_min - pad_lon)..(lon_max + pad_lon), (lat_min - pad_lat)..(lat_max + pad_lat))?;

        chart.configure_mesh().x_desc("Longitude").y_desc("Latitude").draw()?;

        for (si, state) in states.iter().enumerate() {
            let c = color(si);
            let bubbles = points.iter().filter(|p| p.3 == si).map(|(lon, lat, pop, _)| {
                let r = if pop_max > 0.0 { (pop / pop_max).sqrt() * MAX_BUBBLE } else { 0.0 };
                Circle::new((*lon, *lat), (r.max(2.0)) as i32, c.mix(0.6).filled())
            });
            chart
                .draw_series(bubbles)?
                .label(state.clone())
                .legend(move |(x, y)| Circle::new((x + 5, y), 5, c.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        root.present()?;
    }
    Ok(buf)
}
