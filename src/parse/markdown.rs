use tracing::debug;

/// Metadata the host would expose for a markdown note.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedNote {
    /// Inline `#tags` in first-seen order, `#` included, case preserved.
    pub inline_tags: Vec<String>,
    pub frontmatter: Option<serde_yaml::Mapping>,
    /// Raw link and embed targets (without alias or subpath).
    pub links: Vec<String>,
}

pub(crate) fn parse_markdown_note(content: &str) -> ParsedNote {
    let (frontmatter, body) = split_frontmatter(content);
    let mut note = ParsedNote {
        frontmatter,
        ..Default::default()
    };

    let mut in_fenced = false;
    for line in body.lines() {
        if is_fence(line) {
            in_fenced = !in_fenced;
            continue;
        }
        if in_fenced {
            continue;
        }

        for tag in extract_inline_tags_from_line(line) {
            if !note.inline_tags.contains(&tag) {
                note.inline_tags.push(tag);
            }
        }
        for link in extract_links_from_line(line) {
            if !note.links.contains(&link) {
                note.links.push(link);
            }
        }
    }

    note
}

fn split_frontmatter(content: &str) -> (Option<serde_yaml::Mapping>, &str) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0usize;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let fm_text = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return match serde_yaml::from_str::<serde_yaml::Value>(fm_text) {
                Ok(serde_yaml::Value::Mapping(map)) => (Some(map), body),
                Ok(_) => (None, body),
                Err(err) => {
                    debug!(error = %err, "broken frontmatter ignored");
                    (None, body)
                }
            };
        }
        offset += line.len();
    }

    // Unclosed fence: the whole file is body.
    (None, content)
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '/')
}

fn extract_inline_tags_from_line(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let chars: Vec<(usize, char)> = line.char_indices().collect();

    let mut i = 0usize;
    while i < chars.len() {
        let (start, c) = chars[i];
        if c != '#' {
            i += 1;
            continue;
        }

        // Require a boundary before '#'.
        if i > 0 {
            let prev = chars[i - 1].1;
            if prev.is_alphanumeric() || matches!(prev, '/' | '#' | '&') {
                i += 1;
                continue;
            }
        }

        let mut j = i + 1;
        while j < chars.len() && is_tag_char(chars[j].1) {
            j += 1;
        }
        let end = chars.get(j).map(|(ix, _)| *ix).unwrap_or(line.len());
        let body = &line[start + 1..end];
        // Headings ("# Title") and numeric-only runs ("#1") are not tags.
        if !body.is_empty() && !body.chars().all(|c| c.is_ascii_digit()) {
            out.push(format!("#{}", body.trim_end_matches('/')));
        }

        i = j.max(i + 1);
    }

    out
}

fn extract_links_from_line(line: &str) -> Vec<String> {
    let mut out = extract_wikilinks(line);
    out.extend(extract_markdown_links(line));
    out
}

fn extract_wikilinks(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find("[[") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("]]") else {
            break;
        };
        if let Some(target) = normalize_wikilink_target(&after[..close]) {
            out.push(target);
        }
        rest = &after[close + 2..];
    }
    out
}

fn normalize_wikilink_target(inner: &str) -> Option<String> {
    let target = inner.split('|').next().unwrap_or("");
    let target = target.split(['#', '^']).next().unwrap_or("").trim();
    if target.is_empty() {
        return None;
    }
    Some(target.to_string())
}

fn extract_markdown_links(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find("](") {
        let after = &rest[open + 2..];
        let Some(close) = after.find(')') else {
            break;
        };
        let raw = after[..close].trim();
        let raw = raw.trim_start_matches('<').trim_end_matches('>');
        let is_external = raw.contains("://") || raw.starts_with("mailto:");
        let target = raw.split('#').next().unwrap_or("").replace("%20", " ");
        if !is_external && !target.is_empty() {
            out.push(target);
        }
        rest = &after[close + 1..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontmatter_and_inline_tags_are_extracted() {
        let note = parse_markdown_note(
            "---\ntags: [Work]\nstatus: open\n---\n# Heading\nBody #Pending and #pending #2024\n",
        );
        let fm = note.frontmatter.expect("frontmatter");
        assert_eq!(
            fm.get(serde_yaml::Value::String("status".into()))
                .and_then(|v| v.as_str()),
            Some("open")
        );
        assert_eq!(note.inline_tags, vec!["#Pending", "#pending"]);
    }

    #[test]
    fn tags_inside_code_fences_are_ignored() {
        let note = parse_markdown_note("```\n#not-a-tag\n```\n#real\n");
        assert_eq!(note.inline_tags, vec!["#real"]);
    }

    #[test]
    fn broken_frontmatter_is_dropped_but_body_parsed() {
        let note = parse_markdown_note("---\ntags: [\n---\n#body\n");
        assert!(note.frontmatter.is_none());
        assert_eq!(note.inline_tags, vec!["#body"]);
    }

    #[test]
    fn wiki_and_markdown_links_are_collected() {
        let note = parse_markdown_note(
            "See [[Target|alias]] and ![[img.png]] and [doc](sub/My%20Doc.md#part) and [web](https://x.y)\n",
        );
        assert_eq!(note.links, vec!["Target", "img.png", "sub/My Doc.md"]);
    }
}
