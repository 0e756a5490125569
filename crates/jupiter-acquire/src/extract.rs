use crate::error::{Error, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use indexmap::IndexMap;
use jupiter_model::CourseRecord;
use scraper::{ElementRef, Html, Node, Selector};
use std::borrow::Cow;
use std::ops::Deref;

/// Marker for the course title on Júpiter Web pages.
const TITLE_SELECTOR: &str = "span.titulo";
/// Dedicated marker for the program / objectives block.
const SYLLABUS_SELECTOR: &str = "div.programa";
/// Elements scanned, in document order, when the program marker is missing.
const SYLLABUS_FALLBACK_SELECTOR: &str = "div, p, span";
/// Case-sensitive substrings that identify program text in the fallback scan.
const SYLLABUS_MARKERS: [&str; 2] = ["Programa", "Objetivos"];
/// Trailing separator stripped from attribute names ("Créditos Aula:").
const KEY_SEPARATOR: char = ':';
/// A body with more than one control byte in this many is not markup.
const BINARY_THRESHOLD: usize = 3;
/// How far into the page to look for a declared charset.
const CHARSET_SNIFF_LIMIT: usize = 1024;
/// Elements whose text never counts as visible.
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Extract a course record from the raw bytes of a course page.
///
/// Unexpected structure never fails: missing landmarks leave the
/// corresponding fields unset and `full_text` still carries the body text.
/// Only input that is not markup at all (mostly control bytes) is rejected.
pub fn extract(code: &str, source_url: &str, html: &[u8]) -> Result<CourseRecord> {
    let markup = decode(code, html)?;
    let document = Html::parse_document(&markup);

    let record = CourseRecord {
        code: code.to_string(),
        source_url: source_url.to_string(),
        title: extract_title(&document),
        attributes: extract_attributes(&document),
        syllabus: extract_syllabus(&document),
        full_text: extract_full_text(&document),
    };

    tracing::debug!(
        code = %code,
        title = record.title.is_some(),
        attributes = record.attributes.len(),
        syllabus = record.syllabus.is_some(),
        lines = record.full_text_lines(),
        "Extracted course record"
    );

    Ok(record)
}

/// Turn response bytes into text.
///
/// Valid UTF-8 is used as is. Anything else is decoded with the charset the
/// page declares, or Windows-1252 (the superset of the ISO-8859-1 Júpiter Web
/// serves) when it declares none. Only bodies that are mostly control bytes
/// are rejected; an empty body is an empty document.
fn decode<'a>(code: &str, html: &'a [u8]) -> Result<Cow<'a, str>> {
    let control = html
        .iter()
        .filter(|b| b.is_ascii_control() && !b.is_ascii_whitespace())
        .count();
    if control * BINARY_THRESHOLD > html.len() {
        return Err(Error::Parse {
            code: code.to_string(),
            reason: format!(
                "response body is binary, not markup ({control} of {} bytes are control bytes)",
                html.len()
            ),
        });
    }

    if let Ok(text) = std::str::from_utf8(html) {
        return Ok(Cow::Borrowed(text.trim_start_matches('\u{feff}')));
    }

    let encoding = declared_encoding(html)
        .filter(|enc| *enc != UTF_8)
        .unwrap_or(WINDOWS_1252);
    tracing::debug!(code = %code, encoding = encoding.name(), "Body is not UTF-8, decoding");
    let (text, _, _) = encoding.decode(html);
    Ok(text)
}

/// Charset named by a `<meta charset>` or `content="...; charset=..."` near the top of the page.
fn declared_encoding(html: &[u8]) -> Option<&'static Encoding> {
    let head = html[..html.len().min(CHARSET_SNIFF_LIMIT)].to_ascii_lowercase();
    let start = head.windows(8).position(|w| w == b"charset=")? + 8;
    let label: Vec<u8> = head[start..]
        .iter()
        .copied()
        .skip_while(|b| matches!(b, b'"' | b'\'' | b' '))
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
        .collect();
    Encoding::for_label(&label)
}

fn extract_title(document: &Html) -> Option<String> {
    let title_sel = Selector::parse(TITLE_SELECTOR).expect("valid selector");
    document
        .select(&title_sel)
        .next()
        .and_then(|title| non_empty(stripped_text(title)))
}

/// Collect key/value pairs from every two-cell table row.
///
/// Later rows overwrite earlier values for the same key, but the key keeps
/// the position where it first appeared.
fn extract_attributes(document: &Html) -> IndexMap<String, String> {
    let table_sel = Selector::parse("table").expect("valid selector");
    let tr_sel = Selector::parse("tr").expect("valid selector");

    let mut attributes = IndexMap::new();

    for table in document.select(&table_sel) {
        for (index, tr) in table.select(&tr_sel).enumerate() {
            let mut cells = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| cell.value().name() == "td");

            let (Some(key_cell), Some(value_cell)) = (cells.next(), cells.next()) else {
                tracing::trace!(row = index, "Skipping row with < 2 cells");
                continue;
            };

            let key_text = stripped_text(key_cell);
            let key = key_text
                .strip_suffix(KEY_SEPARATOR)
                .unwrap_or(&key_text)
                .trim();
            let value = stripped_text(value_cell);

            if key.is_empty() || value.is_empty() {
                continue;
            }

            attributes.insert(key.to_string(), value);
        }
    }

    attributes
}

/// Locate the program text: the dedicated marker when present (even if
/// blank), otherwise the first `div`/`p`/`span` in document order
/// mentioning a program marker.
fn extract_syllabus(document: &Html) -> Option<String> {
    let marker_sel = Selector::parse(SYLLABUS_SELECTOR).expect("valid selector");
    if let Some(marker) = document.select(&marker_sel).next() {
        return non_empty(stripped_text(marker));
    }

    let candidate_sel = Selector::parse(SYLLABUS_FALLBACK_SELECTOR).expect("valid selector");
    let mut found = None;
    for candidate in document.select(&candidate_sel) {
        let text = stripped_text(candidate);
        if SYLLABUS_MARKERS.iter().any(|marker| text.contains(marker)) {
            found = Some(text);
            break;
        }
    }

    found.and_then(non_empty)
}

fn extract_full_text(document: &Html) -> String {
    let body_sel = Selector::parse("body").expect("valid selector");
    match document.select(&body_sel).next() {
        Some(body) => visible_text_nodes(body).join("\n"),
        None => String::new(),
    }
}

/// Trimmed, non-empty text nodes under an element, in document order.
fn visible_text_nodes(element: ElementRef) -> Vec<String> {
    let mut nodes = Vec::new();
    collect_text_nodes(*element, &mut nodes);
    nodes
}

fn collect_text_nodes(node: ego_tree::NodeRef<Node>, out: &mut Vec<String>) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.deref().trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            }
            Node::Element(elem) if HIDDEN_TAGS.contains(&elem.name()) => {}
            Node::Element(_) => collect_text_nodes(child, out),
            _ => {}
        }
    }
}

/// Visible text of an element with each text node trimmed and concatenated.
fn stripped_text(element: ElementRef) -> String {
    visible_text_nodes(element).concat()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://uspdigital.usp.br/jupiterweb/obterDisciplina?sgldis=ACH0021";

    fn run(html: &str) -> CourseRecord {
        extract("ACH0021", URL, html.as_bytes()).unwrap()
    }

    const COURSE_PAGE: &str = r#"
    <html>
    <head><title>Júpiter - Sistema de Gestão Acadêmica</title>
    <script>var tracking = "Programa de rastreamento";</script></head>
    <body>
      <table width="100%">
        <tr><td><span class="titulo">Disciplina: ACH0021 - Tratamento e Análise de Dados</span></td></tr>
      </table>
      <table>
        <tr><td>Créditos Aula:</td><td>4</td></tr>
        <tr><td>Créditos Trabalho:</td><td>0</td></tr>
        <tr><td>Carga Horária Total:</td><td>60 h</td></tr>
      </table>
      <div class="programa">
        Programa: Estatística descritiva. Probabilidade.
      </div>
    </body>
    </html>
    "#;

    #[test]
    fn test_parse_course_page() {
        let rec = run(COURSE_PAGE);

        assert_eq!(rec.code, "ACH0021");
        assert_eq!(rec.source_url, URL);
        assert_eq!(
            rec.title.as_deref(),
            Some("Disciplina: ACH0021 - Tratamento e Análise de Dados")
        );

        let keys: Vec<&str> = rec.attributes.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["Créditos Aula", "Créditos Trabalho", "Carga Horária Total"]
        );
        assert_eq!(rec.attributes["Carga Horária Total"], "60 h");
        assert_eq!(
            rec.syllabus.as_deref(),
            Some("Programa: Estatística descritiva. Probabilidade.")
        );

        assert!(rec.full_text.contains("Créditos Aula:\n4"));
        assert!(!rec.full_text.contains("rastreamento"));
        assert!(!rec.full_text.contains("Sistema de Gestão"));
    }

    #[test]
    fn test_later_tables_overwrite_value_but_keep_position() {
        let html = r#"<html><body>
            <table><tr><td>k1</td><td>v1</td></tr><tr><td>k2</td><td>v2</td></tr></table>
            <table><tr><td>k1</td><td>v3</td></tr></table>
        </body></html>"#;
        let rec = run(html);

        let keys: Vec<&str> = rec.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["k1", "k2"]);
        assert_eq!(rec.attributes["k1"], "v3");
        assert_eq!(rec.attributes["k2"], "v2");
    }

    #[test]
    fn test_rows_without_two_usable_cells_are_skipped() {
        let html = r#"<html><body>
            <table>
              <tr><td>Only one cell</td></tr>
              <tr><td>Blank value:</td><td>   &nbsp; </td></tr>
              <tr><td> : </td><td>orphan value</td></tr>
              <tr><td>Docente:</td><td>Maria</td><td>ignored third cell</td></tr>
            </table>
            <table></table>
        </body></html>"#;
        let rec = run(html);

        assert_eq!(rec.attributes.len(), 1);
        assert_eq!(rec.attributes["Docente"], "Maria");
    }

    #[test]
    fn test_header_rows_are_not_attributes() {
        let html = r#"<html><body>
            <table>
              <tr><th>Disciplina</th><th>Docente</th></tr>
              <tr><th>Período Ideal:</th><td>3</td></tr>
              <tr><td>Docente:</td><td>Maria</td></tr>
            </table>
        </body></html>"#;
        let rec = run(html);

        let keys: Vec<&str> = rec.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Docente"]);
        assert_eq!(rec.attributes["Docente"], "Maria");
    }

    #[test]
    fn test_only_trailing_separator_is_removed() {
        let html = r#"<html><body>
            <table><tr><td>Horário: 14:00:</td><td>Segunda</td></tr></table>
        </body></html>"#;
        let rec = run(html);
        assert_eq!(rec.attributes["Horário: 14:00"], "Segunda");
    }

    #[test]
    fn test_blank_title_is_absent() {
        let html = r#"<html><body><span class="titulo">
        </span><p>Texto</p></body></html>"#;
        let rec = run(html);
        assert_eq!(rec.title, None);
    }

    #[test]
    fn test_missing_title_is_absent() {
        let html = r#"<html><body><h1>ACH0021</h1></body></html>"#;
        let rec = run(html);
        assert_eq!(rec.title, None);
    }

    #[test]
    fn test_syllabus_fallback_scan() {
        let html = r#"<html><body>
            <p>Introdução ao curso.</p>
            <p>  Programa: Conjuntos, funções e gráficos.  </p>
            <p>Objetivos: formar o aluno.</p>
        </body></html>"#;
        let rec = run(html);
        assert_eq!(
            rec.syllabus.as_deref(),
            Some("Programa: Conjuntos, funções e gráficos.")
        );
    }

    #[test]
    fn test_syllabus_fallback_first_match_wins_in_document_order() {
        let html = r#"<html><body>
            <span>Objetivos: aprender</span>
            <div>Programa: depois</div>
        </body></html>"#;
        let rec = run(html);
        assert_eq!(rec.syllabus.as_deref(), Some("Objetivos: aprender"));
    }

    #[test]
    fn test_syllabus_markers_are_case_sensitive() {
        let html = r#"<html><body><p>programa em minúsculas</p></body></html>"#;
        let rec = run(html);
        assert_eq!(rec.syllabus, None);
    }

    #[test]
    fn test_blank_syllabus_marker_leaves_syllabus_unset() {
        let html = r#"<html><body>
            <div class="programa">  </div>
            <p>Objetivos: outro bloco</p>
        </body></html>"#;
        let rec = run(html);
        assert_eq!(rec.syllabus, None);
    }

    #[test]
    fn test_unstructured_page_keeps_full_text() {
        let html = "<html><body><div>Disciplina inexistente</div><br>\n<em>tente novamente</em></body></html>";
        let rec = run(html);

        assert!(rec.is_unstructured());
        assert_eq!(rec.full_text, "Disciplina inexistente\ntente novamente");
    }

    #[test]
    fn test_fragment_without_markup_still_gets_body() {
        let rec = run("texto solto sem tags");
        assert_eq!(rec.full_text, "texto solto sem tags");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        assert_eq!(run(COURSE_PAGE), run(COURSE_PAGE));
    }

    #[test]
    fn test_latin1_body_is_decoded() {
        // "Créditos" with é as a single ISO-8859-1 byte
        let mut html = b"<html><body><table><tr><td>Cr".to_vec();
        html.push(0xE9);
        html.extend_from_slice(b"ditos:</td><td>4</td></tr></table></body></html>");

        let rec = extract("ACH0021", URL, &html).unwrap();
        assert_eq!(rec.attributes["Créditos"], "4");
    }

    #[test]
    fn test_windows_1252_punctuation_is_decoded() {
        // 0x96 is an en dash in Windows-1252, a C1 control in strict ISO-8859-1
        let mut html = b"<html><body><span class=\"titulo\">ACH0021 ".to_vec();
        html.push(0x96);
        html.extend_from_slice(b" Tratamento</span></body></html>");

        let rec = extract("ACH0021", URL, &html).unwrap();
        assert_eq!(rec.title.as_deref(), Some("ACH0021 \u{2013} Tratamento"));
    }

    #[test]
    fn test_declared_charset_is_honoured() {
        // ISO-8859-2 "Łódź": Ł = 0xA3, ó = 0xF3, ź = 0xBC
        let mut html = b"<html><head><meta charset=\"iso-8859-2\"></head><body><p>".to_vec();
        html.extend_from_slice(&[0xA3, 0xF3, b'd', 0xBC]);
        html.extend_from_slice(b"</p></body></html>");

        let rec = extract("ACH0021", URL, &html).unwrap();
        assert_eq!(rec.full_text, "Łódź");
    }

    #[test]
    fn test_empty_body_yields_record_with_empty_text() {
        let rec = extract("ACH0021", URL, b"").unwrap();
        assert_eq!(rec.code, "ACH0021");
        assert_eq!(rec.source_url, URL);
        assert!(rec.is_unstructured());
        assert_eq!(rec.full_text, "");

        let rec = extract("ACH0021", URL, b"  \n ").unwrap();
        assert_eq!(rec.full_text, "");
    }

    #[test]
    fn test_stray_nul_byte_does_not_lose_the_page() {
        let mut html = b"<html><body><span class=\"titulo\">ACH0021</span>".to_vec();
        html.push(0x00);
        html.extend_from_slice(b"<table><tr><td>Cr:</td><td>4</td></tr></table></body></html>");

        let rec = extract("ACH0021", URL, &html).unwrap();
        assert_eq!(rec.title.as_deref(), Some("ACH0021"));
        assert_eq!(rec.attributes["Cr"], "4");
    }

    #[test]
    fn test_binary_input_is_a_parse_error() {
        // PNG signature and IHDR chunk start
        let png = [
            0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H',
            b'D', b'R', 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
            0x00,
        ];
        let err = extract("ACH0021", URL, &png).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
