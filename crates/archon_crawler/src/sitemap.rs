//! Sitemap detection and parsing (spec §4.5).

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// True if `url` names a sitemap by extension or conventional path.
pub fn looks_like_sitemap(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.ends_with(".xml") || lower.ends_with("sitemap.xml") || lower.contains("/sitemap")
}

/// Extracts every `<loc>` URL from a sitemap XML body, including nested
/// sitemap indexes (a `<sitemapindex>` of `<sitemap><loc>` entries is
/// returned flat; the caller is responsible for recursing if it wants to
/// fetch those sub-sitemaps too).
pub fn parse_urls(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"loc" => {
                in_loc = true;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
            }
            Ok(Event::Text(t)) if in_loc => {
                if let Ok(text) = t.unescape() {
                    urls.push(text.into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_sitemap_by_extension() {
        assert!(looks_like_sitemap("https://example.com/sitemap.xml"));
        assert!(looks_like_sitemap("https://example.com/docs/sub.xml"));
        assert!(!looks_like_sitemap("https://example.com/docs/"));
    }

    #[test]
    fn parses_loc_entries() {
        let xml = r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/a</loc></url>
  <url><loc>https://example.com/b</loc></url>
</urlset>"#;
        assert_eq!(
            parse_urls(xml),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn empty_body_yields_no_urls() {
        assert!(parse_urls("").is_empty());
    }
}
