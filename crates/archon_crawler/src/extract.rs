//! Text extraction for the binary document formats in spec §4.5's
//! format allow-list (PDF, DOC, DOCX). Extraction happens here, inside
//! the crawler, rather than being deferred to an upstream step that
//! doesn't exist: a fetched page that can't be turned into text is a
//! fetch failure, not an empty success.

use crate::error::CrawlError;
use crate::fetch::MediaType;

pub fn extract_text(media_type: MediaType, body: &[u8]) -> Result<String, CrawlError> {
    match media_type {
        MediaType::Pdf => extract_pdf(body),
        MediaType::Docx => extract_docx(body),
        MediaType::Doc => Err(CrawlError::UnsupportedMediaType(
            "legacy .doc (binary OLE2) is not supported; convert to .docx or .pdf".to_string(),
        )),
        MediaType::Html | MediaType::Txt | MediaType::Md => {
            Ok(String::from_utf8_lossy(body).into_owned())
        }
    }
}

fn extract_pdf(body: &[u8]) -> Result<String, CrawlError> {
    pdf_extract::extract_text_from_mem(body)
        .map_err(|e| CrawlError::ExtractionFailed(format!("pdf: {e}")))
}

fn extract_docx(body: &[u8]) -> Result<String, CrawlError> {
    let docx = docx_rs::read_docx(body).map_err(|e| CrawlError::ExtractionFailed(format!("docx: {e}")))?;

    let mut text = String::new();
    for child in &docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for para_child in &paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = para_child {
                    for run_child in &run.children {
                        if let docx_rs::RunChild::Text(t) = run_child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_legacy_doc() {
        let result = extract_text(MediaType::Doc, b"\xd0\xcf\x11\xe0");
        assert!(result.is_err());
    }

    #[test]
    fn passes_through_text_media_types() {
        let result = extract_text(MediaType::Txt, b"hello world").unwrap();
        assert_eq!(result, "hello world");
    }
}
