use {
    serde::{Deserialize, Serialize},
    serde_yaml::{Mapping, Value},
};

use crate::{
    error::ParseError,
    types::{DEFAULT_VERSION, Skill, SkillSource},
};

/// Front matter with the keys skillport edits pulled out. Everything else
/// lands in `extra` untouched.
#[derive(Deserialize, Default)]
struct Frontmatter {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(flatten)]
    extra: Mapping,
}

#[derive(Serialize)]
struct FrontmatterOut<'a> {
    name: &'a str,
    description: &'a str,
    version: &'a str,
    #[serde(flatten)]
    extra: &'a Mapping,
}

/// Parse SKILL.md text into a skill.
///
/// The installation state is left empty and `path` unset; discovery fills
/// those in. Fails only when no name can be determined or the header is
/// malformed.
pub fn parse(content: &str, id: &str, source: SkillSource) -> Result<Skill, ParseError> {
    let (header, body) = match split_frontmatter(content)? {
        Some((header, body)) => (header, body),
        None => return Err(ParseError::MissingName),
    };

    let frontmatter: Frontmatter = if header.is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(header).map_err(|e| ParseError::InvalidFrontmatter(e.to_string()))?
    };

    let name = frontmatter
        .name
        .and_then(scalar_to_string)
        .filter(|n| !n.is_empty())
        .ok_or(ParseError::MissingName)?;

    Ok(Skill {
        id: id.to_string(),
        name,
        description: frontmatter
            .description
            .and_then(scalar_to_string)
            .unwrap_or_default(),
        version: frontmatter
            .version
            .and_then(scalar_to_string)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        content: body.to_string(),
        extra: frontmatter.extra,
        path: None,
        source,
        installed_providers: Default::default(),
        directory: None,
    })
}

/// Render a skill back into SKILL.md text, editable fields first.
pub fn serialize(skill: &Skill) -> Result<String, serde_yaml::Error> {
    let header = serde_yaml::to_string(&FrontmatterOut {
        name: &skill.name,
        description: &skill.description,
        version: &skill.version,
        extra: &skill.extra,
    })?;

    let body = skill.content.trim();
    if body.is_empty() {
        Ok(format!("---\n{header}---\n"))
    } else {
        Ok(format!("---\n{header}---\n\n{body}\n"))
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Split SKILL.md content at `---` delimiters into (frontmatter, body).
///
/// Returns `None` when the document has no header block at all.
fn split_frontmatter(content: &str) -> Result<Option<(&str, &str)>, ParseError> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    let Some(after_open) = trimmed.strip_prefix("---") else {
        return Ok(None);
    };
    // `----` or `--- text` is a horizontal rule, not a header.
    if !after_open.starts_with(['\n', '\r']) {
        return Ok(None);
    }

    let close_pos = after_open
        .find("\n---")
        .ok_or(ParseError::UnterminatedFrontmatter)?;

    let frontmatter = after_open[..close_pos].trim();
    let body = after_open[close_pos + 4..].trim();
    Ok(Some((frontmatter, body)))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::Provider};

    fn remote() -> SkillSource {
        SkillSource::Remote("owner/repo".into())
    }

    #[test]
    fn parses_full_manifest() {
        let content = r#"---
name: PDF Tools
description: Extract text and tables from PDFs
version: 2.1.0
license: MIT
allowed-tools:
  - Read
---

# PDF Tools

Use `pdftotext` first.
"#;
        let skill = parse(content, "pdf", remote()).unwrap();
        assert_eq!(skill.id, "pdf");
        assert_eq!(skill.name, "PDF Tools");
        assert_eq!(skill.description, "Extract text and tables from PDFs");
        assert_eq!(skill.version, "2.1.0");
        assert!(skill.content.starts_with("# PDF Tools"));
        assert!(skill.content.ends_with("first."));
        assert_eq!(skill.path, None);
        assert!(skill.installed_providers.is_empty());
        assert_eq!(skill.extra.len(), 2);
        assert_eq!(skill.extra.get("license"), Some(&Value::from("MIT")));
    }

    #[test]
    fn unrecognized_keys_survive_serialize() {
        let content = concat!(
            "---\nname: pdf\nlicense: MIT\n",
            "allowed-tools:\n  - Read\n  - Bash\n---\nbody\n",
        );
        let mut skill = parse(content, "pdf", remote()).unwrap();
        skill.description = "edited".into();

        let text = serialize(&skill).unwrap();
        assert!(text.contains("license: MIT"), "{text}");
        assert!(text.contains("allowed-tools:"), "{text}");

        let back = parse(&text, "pdf", remote()).unwrap();
        assert_eq!(back.description, "edited");
        assert_eq!(back.extra, skill.extra);
        let tools = back.extra.get("allowed-tools").and_then(Value::as_sequence).unwrap();
        assert_eq!(tools, &vec![Value::from("Read"), Value::from("Bash")]);
    }

    #[test]
    fn missing_optional_fields_are_defaulted() {
        let skill = parse("---\nname: bare\n---\nbody", "bare", remote()).unwrap();
        assert_eq!(skill.description, "");
        assert_eq!(skill.version, DEFAULT_VERSION);
        assert_eq!(skill.content, "body");
    }

    #[test]
    fn numeric_version_is_stringified() {
        let skill = parse("---\nname: n\nversion: 3\n---\n", "n", remote()).unwrap();
        assert_eq!(skill.version, "3");
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = parse("---\ndescription: nameless\n---\nbody", "x", remote()).unwrap_err();
        assert_eq!(err, ParseError::MissingName);

        let err = parse("---\nname: \"  \"\n---\n", "x", remote()).unwrap_err();
        assert_eq!(err, ParseError::MissingName);
    }

    #[test]
    fn document_without_header_has_no_name() {
        let err = parse("# Just markdown\n\nNo header.", "x", remote()).unwrap_err();
        assert_eq!(err, ParseError::MissingName);
    }

    #[test]
    fn horizontal_rule_is_not_a_header() {
        let err = parse("----\nname: x\n----\n", "x", remote()).unwrap_err();
        assert_eq!(err, ParseError::MissingName);
    }

    #[test]
    fn unterminated_header_is_rejected() {
        let err = parse("---\nname: test\nno closing\n", "x", remote()).unwrap_err();
        assert_eq!(err, ParseError::UnterminatedFrontmatter);
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let err = parse("---\nname: [unclosed\n---\n", "x", remote()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFrontmatter(_)));
    }

    #[test]
    fn tolerates_crlf_and_bom() {
        let content = "\u{feff}---\r\nname: win\r\ndescription: crlf\r\n---\r\nBody\r\n";
        let skill = parse(content, "win", remote()).unwrap();
        assert_eq!(skill.name, "win");
        assert_eq!(skill.description, "crlf");
        assert_eq!(skill.content, "Body");
    }

    #[test]
    fn parse_is_deterministic() {
        let content = "---\nname: same\n---\nbody\n";
        assert_eq!(
            parse(content, "same", remote()).unwrap(),
            parse(content, "same", remote()).unwrap()
        );
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let mut original = parse("---\nname: x\n---\n", "x", remote()).unwrap();
        original.name = "Review: strict mode".into();
        original.description = "Quotes \"and\" colons: handled\nacross lines".into();
        original.version = "1.0".into();
        original.content = "# Steps\n\n---\n\n1. Read the diff".into();

        let text = serialize(&original).unwrap();
        let back = parse(&text, "x", SkillSource::Local(Provider::Claude)).unwrap();
        assert_eq!(back.name, original.name);
        assert_eq!(back.description, original.description);
        assert_eq!(back.version, original.version);
        assert_eq!(back.content, original.content);
    }

    #[test]
    fn serialize_without_body() {
        let skill = parse("---\nname: empty\n---\n", "empty", remote()).unwrap();
        let text = serialize(&skill).unwrap();
        assert!(text.starts_with("---\nname: empty\n"));
        assert!(text.ends_with("---\n"));
        assert_eq!(parse(&text, "empty", remote()).unwrap().content, "");
    }
}
