//! Serialización del árbol de UI a una página HTML.
//!
//! La barra lateral es un formulario GET que se reenvía al cambiar cualquier
//! control, así cada interacción vuelve a renderizar la página completa.

use std::fmt::Write;

use super::{Element, Page, UiTree, Widget};

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn fmt_num(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{:.2}", x),
        None => "NaN".to_string(),
    }
}

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex}\
aside{width:280px;padding:16px;background:#f0f2f6;min-height:100vh}\
main{flex:1;padding:16px 32px}label{display:block;margin-top:12px;font-size:14px}\
select,input[type=text]{width:100%}\
.info{background:#e8f0fe;padding:8px}.success{background:#e6f4ea;padding:8px}\
.warning{background:#fef7e0;padding:8px}.error{background:#fce8e6;padding:8px}\
table{border-collapse:collapse}td,th{border:1px solid #ddd;padding:4px 8px}";

fn render_widget(out: &mut String, w: &Widget) {
    let submit = "onchange=\"this.form.submit()\"";
    match w {
        Widget::Select { key, label, options, selected } => {
            let _ = write!(out, "<label>{}<select name=\"{}\" {}>", escape(label), escape(key), submit);
            for o in options {
                let sel = if o == selected { " selected" } else { "" };
                let _ = write!(out, "<option value=\"{0}\"{1}>{0}</option>", escape(o), sel);
            }
            out.push_str("</select></label>");
        }
        Widget::MultiSelect { key, label, options, selected } => {
            let _ = write!(out, "<fieldset><legend>{}</legend>", escape(label));
            // presente aunque no se marque nada: distingue "ninguno" de "por defecto"
            let _ = write!(out, "<input type=\"hidden\" name=\"{}\" value=\"\">", escape(key));
            for o in options {
                let checked = if selected.contains(o) { " checked" } else { "" };
                let _ = write!(
                    out,
                    "<label><input type=\"checkbox\" name=\"{}\" value=\"{}\"{} {}> {}</label>",
                    escape(key),
                    escape(o),
                    checked,
                    submit,
                    escape(o)
                );
            }
            out.push_str("</fieldset>");
        }
        Widget::Checkbox { key, label, checked } => {
            let c = if *checked { " checked" } else { "" };
            let _ = write!(out, "<label><input type=\"checkbox\" name=\"{}\" value=\"on\"{} {}> {}</label>", escape(key), c, submit, escape(label));
        }
        Widget::Slider { key, label, min, max, value } => {
            let _ = write!(
                out,
                "<label>{} ({})<input type=\"range\" name=\"{}\" min=\"{}\" max=\"{}\" value=\"{}\" {}></label>",
                escape(label),
                value,
                escape(key),
                min,
                max,
                value,
                submit
            );
        }
        Widget::TextInput { key, label, value } => {
            let _ = write!(out, "<label>{}<input type=\"text\" name=\"{}\" value=\"{}\" {}></label>", escape(label), escape(key), escape(value), submit);
        }
    }
}

fn render_element(out: &mut String, e: &Element) {
    match e {
        Element::Heading { text } => {
            let _ = write!(out, "<h2>{}</h2>", escape(text));
        }
        Element::Text { text } => {
            let _ = write!(out, "<p>{}</p>", escape(text));
        }
        Element::Info { text } => {
            let _ = write!(out, "<div class=\"info\">{}</div>", escape(text));
        }
        Element::Success { text } => {
            let _ = write!(out, "<div class=\"success\">{}</div>", escape(text));
        }
        Element::Warning { text } => {
            let _ = write!(out, "<div class=\"warning\">{}</div>", escape(text));
        }
        Element::Error { text } => {
            let _ = write!(out, "<div class=\"error\">{}</div>", escape(text));
        }
        Element::Table { columns, rows } => {
            out.push_str("<table><tr>");
            for c in columns {
                let _ = write!(out, "<th>{}</th>", escape(c));
            }
            out.push_str("</tr>");
            for r in rows {
                out.push_str("<tr>");
                for v in r {
                    let _ = write!(out, "<td>{}</td>", escape(&v.to_string()));
                }
                out.push_str("</tr>");
            }
            out.push_str("</table>");
        }
        Element::Stats { column, describe } => {
            let _ = write!(out, "<table><tr><th></th><th>{}</th></tr>", escape(column));
            for (name, v) in describe.rows() {
                let _ = write!(out, "<tr><td>{}</td><td>{}</td></tr>", name, fmt_num(v));
            }
            out.push_str("</table>");
        }
        Element::Chart { title, svg, .. } => {
            // SVG en línea
            let _ = write!(out, "<figure><figcaption>{}</figcaption>{}</figure>", escape(title), svg);
        }
    }
}

/// Página HTML completa.
pub fn render_html(ui: &UiTree) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head><body>",
        escape(&ui.title),
        STYLE
    );

    out.push_str("<aside><nav><b>Menu</b><ul>");
    for p in Page::TODAS {
        let marca = if p == ui.page { " aria-current=\"page\"" } else { "" };
        let _ = write!(out, "<li><a href=\"/pagina/{}\"{}>{}</a></li>", p.slug(), marca, escape(p.label()));
    }
    out.push_str("</ul></nav>");
    if !ui.sidebar.is_empty() {
        let _ = write!(out, "<form method=\"get\" action=\"/pagina/{}\">", ui.page.slug());
        for w in &ui.sidebar {
            render_widget(&mut out, w);
        }
        out.push_str("<noscript><button type=\"submit\">Aplicar</button></noscript></form>");
    }
    out.push_str("</aside><main>");
    let _ = write!(out, "<h1>{}</h1>", escape(&ui.title));
    for e in &ui.body {
        render_element(&mut out, e);
    }
    out.push_str("</main></body></html>");
    out
}
