use std::io::Read;
use std::path::Path;

use anyhow::Context;
use spanlens_core::model::document::SpanDocument;

pub fn read_document(input: &str) -> anyhow::Result<SpanDocument> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read spans from stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(input))
            .with_context(|| format!("failed to read spans from {input}"))?
    };

    if raw.trim().is_empty() {
        return Ok(SpanDocument::Flat(Vec::new()));
    }
    SpanDocument::parse(&raw).with_context(|| format!("failed to decode {input}"))
}

/// Narrows the document to a single trace. Without an explicit id the first
/// trace in input order wins. `None` means there is nothing to show.
pub fn select_trace(doc: &SpanDocument, trace_id: Option<&str>) -> Option<SpanDocument> {
    let ids = doc.trace_ids();
    let chosen = match trace_id {
        Some(id) => id.to_string(),
        None => {
            let first = ids.first()?.clone();
            if ids.len() > 1 {
                tracing::info!(
                    trace_id = %first,
                    traces = ids.len(),
                    "input holds several traces, showing the first"
                );
            }
            first
        }
    };

    let selected = doc.select_trace(&chosen);
    if selected.is_empty() {
        tracing::info!(trace_id = %chosen, "trace not present in input");
        return None;
    }
    Some(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> SpanDocument {
        SpanDocument::parse(
            r#"[{"trace_id":"t1","span_id":"a"},{"trace_id":"t2","span_id":"b"}]"#,
        )
        .unwrap()
    }

    #[test]
    fn defaults_to_first_trace() {
        let selected = select_trace(&doc(), None).unwrap();
        assert_eq!(selected.trace_ids(), vec!["t1".to_string()]);
    }

    #[test]
    fn explicit_and_missing_trace() {
        let selected = select_trace(&doc(), Some("t2")).unwrap();
        assert_eq!(selected.to_flat()[0].span_id, "b");
        assert!(select_trace(&doc(), Some("t9")).is_none());
        assert!(select_trace(&SpanDocument::Flat(Vec::new()), None).is_none());
    }

    #[test]
    fn reads_files_and_blank_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spans.json");
        std::fs::write(&path, "  \n").unwrap();
        assert!(read_document(path.to_str().unwrap()).unwrap().is_empty());

        std::fs::write(&path, "{").unwrap();
        assert!(read_document(path.to_str().unwrap()).is_err());
        assert!(read_document(dir.path().join("missing.json").to_str().unwrap()).is_err());
    }
}
