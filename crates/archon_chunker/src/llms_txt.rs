//! `llms.txt` / `llms-full.txt` section splitting (spec §4.4, §6).
//!
//! The community convention (llmstxt.org) is: an H1 title, an optional
//! blockquote summary, then a sequence of H2 (`##`) sections, each
//! containing a markdown list of links or (`llms-full.txt`) the full
//! body text inline. We resolve spec §9's open question here: a
//! section boundary is any line starting with `## `; everything from
//! one `## ` line up to (not including) the next is that section's
//! body, and the H1 title plus any text before the first `## ` becomes
//! a synthetic "overview" section. This matches how every published
//! `llms-full.txt` sample we've seen structures itself, and is cheap to
//! parse without a full markdown AST.

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// Splits an `llms.txt`/`llms-full.txt` document into ordered sections.
/// Each becomes a synthetic page for the chunker to process
/// independently, per spec §4.4.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_title: Option<String> = None;
    let mut current_body = String::new();
    let mut overview = String::new();
    let mut seen_h2 = false;

    for line in text.lines() {
        if let Some(title) = line.strip_prefix("## ") {
            if seen_h2 {
                sections.push(Section {
                    title: current_title.take().unwrap_or_default(),
                    body: current_body.trim().to_string(),
                });
            } else if !overview.trim().is_empty() {
                sections.push(Section {
                    title: title_from_overview(&overview),
                    body: overview.trim().to_string(),
                });
            }
            seen_h2 = true;
            current_title = Some(title.trim().to_string());
            current_body.clear();
            continue;
        }

        if seen_h2 {
            current_body.push_str(line);
            current_body.push('\n');
        } else {
            overview.push_str(line);
            overview.push('\n');
        }
    }

    if seen_h2 {
        sections.push(Section {
            title: current_title.unwrap_or_default(),
            body: current_body.trim().to_string(),
        });
    } else if !overview.trim().is_empty() {
        sections.push(Section {
            title: title_from_overview(&overview),
            body: overview.trim().to_string(),
        });
    }

    sections.retain(|s| !s.body.is_empty());
    sections
}

fn title_from_overview(overview: &str) -> String {
    overview
        .lines()
        .find_map(|l| l.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| "overview".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_h2_headings() {
        let doc = "# My Project\n\n> a summary\n\n## Docs\n\n- [a](http://a)\n\n## Examples\n\nsome text\n";
        let sections = split_sections(doc);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, "My Project");
        assert_eq!(sections[1].title, "Docs");
        assert_eq!(sections[2].title, "Examples");
        assert!(sections[2].body.contains("some text"));
    }

    #[test]
    fn no_h2_headings_yields_single_overview_section() {
        let doc = "# Title\n\njust some text\n";
        let sections = split_sections(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Title");
    }

    #[test]
    fn empty_document_yields_no_sections() {
        assert!(split_sections("").is_empty());
    }
}
