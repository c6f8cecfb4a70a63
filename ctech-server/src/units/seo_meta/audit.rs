// ctech-server/src/units/seo_meta/audit.rs
use ctech_common::SettingsBlob;
use serde::Serialize;
use serde_json::Value;
use url::Url;

pub const TITLE_MAX_CHARS: usize = 60;
pub const DESCRIPTION_MAX_CHARS: usize = 160;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditIssue {
    MissingTitle,
    TitleTooLong,
    MissingDescription,
    DescriptionTooLong,
    MissingOgImage,
    InvalidCanonical,
    InvalidOgImage,
    Noindex,
}

fn text<'a>(seo: &'a SettingsBlob, name: &str) -> Option<&'a str> {
    seo.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_web_url(raw: &str) -> bool {
    matches!(Url::parse(raw), Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host())
}

/// Problems found in one document's friendly-named SEO fields.
pub fn audit_document(seo: &SettingsBlob) -> Vec<AuditIssue> {
    let mut issues = Vec::new();

    match text(seo, "title") {
        None => issues.push(AuditIssue::MissingTitle),
        Some(title) if title.chars().count() > TITLE_MAX_CHARS => issues.push(AuditIssue::TitleTooLong),
        Some(_) => {}
    }
    match text(seo, "description") {
        None => issues.push(AuditIssue::MissingDescription),
        Some(d) if d.chars().count() > DESCRIPTION_MAX_CHARS => issues.push(AuditIssue::DescriptionTooLong),
        Some(_) => {}
    }
    match text(seo, "og_image") {
        None => issues.push(AuditIssue::MissingOgImage),
        Some(url) if !is_web_url(url) => issues.push(AuditIssue::InvalidOgImage),
        Some(_) => {}
    }
    if let Some(canonical) = text(seo, "canonical") {
        if !is_web_url(canonical) {
            issues.push(AuditIssue::InvalidCanonical);
        }
    }
    if seo.get("noindex") == Some(&Value::Bool(true)) {
        issues.push(AuditIssue::Noindex);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blob(value: Value) -> SettingsBlob {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_fields_report_everything_missing() {
        let issues = audit_document(&blob(json!({ "title": "   " })));
        assert_eq!(
            issues,
            vec![AuditIssue::MissingTitle, AuditIssue::MissingDescription, AuditIssue::MissingOgImage]
        );
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let sixty_accented = "é".repeat(60);
        let issues = audit_document(&blob(json!({
            "title": sixty_accented,
            "description": "d".repeat(161),
            "og_image": "https://example.org/a.png",
        })));
        assert_eq!(issues, vec![AuditIssue::DescriptionTooLong]);
    }

    #[test]
    fn urls_must_be_absolute_web_urls() {
        let issues = audit_document(&blob(json!({
            "title": "t",
            "description": "d",
            "og_image": "/relative.png",
            "canonical": "ftp://example.org/",
            "noindex": true,
        })));
        assert_eq!(
            issues,
            vec![AuditIssue::InvalidOgImage, AuditIssue::InvalidCanonical, AuditIssue::Noindex]
        );
    }
}
