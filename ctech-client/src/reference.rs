// ctech-client/src/reference.rs
//! Markdown reference of the page builder's widgets, trimmed to the
//! controls worth setting by hand.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Internal widgets with nothing useful to configure.
const SKIP_WIDGETS: &[&str] = &["common-base", "common", "common-optimized", "inner-section", "e-component"];
const SKIP_WIDGET_PREFIXES: &[&str] = &["wp-widget-"];

/// Sub-property fragments of group controls (typography, shadows, backgrounds, filters).
const SKIP_CONTAINS: &[&str] = &[
    "_font_family", "_font_size", "_font_weight", "_text_transform", "_font_style",
    "_text_decoration", "_line_height", "_letter_spacing", "_word_spacing",
    "_text_shadow", "_box_shadow",
    "_color_stop", "_color_b", "_gradient_type", "_gradient_angle", "_gradient_position",
    "_xpos", "_ypos", "_attachment", "_repeat", "_bg_width",
    "_slideshow_", "_video_link", "_video_start", "_video_end", "_video_fallback",
    "_play_once", "_privacy_mode", "_ken_burns",
    "_blur", "_brightness", "_contrast", "_saturate", "_hue",
    "_stroke_color",
];
const SKIP_SUFFIXES: &[&str] = &["_tablet", "_mobile", "_widescreen", "_laptop", "_tablet_extra", "_mobile_extra"];
const SKIP_TYPES: &[&str] = &[
    "hidden", "section", "tabs", "tab", "alert", "divider", "raw_html", "deprecated_notice", "heading",
];
const SKIP_EXACT: &[&str] = &[
    "background_position", "background_size", "background_image", "background_video", "background_color_stop",
];
const HOVER_BACKGROUND_PARTS: &[&str] = &["_position", "_size", "_image", "_video", "_slideshow"];

/// Categories rendered first, in this order; the rest follow alphabetically.
pub const CATEGORY_ORDER: &[&str] = &[
    "basic",
    "general",
    "pro-elements",
    "theme-elements",
    "theme-elements-single",
    "theme-elements-archive",
    "link-in-bio",
];

const TABS: &[&str] = &["content", "style"];

pub fn is_practical(name: &str) -> bool {
    !SKIP_WIDGETS.contains(&name) && !SKIP_WIDGET_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn control_type(ctrl: &Value) -> &str {
    ctrl.get("type").and_then(Value::as_str).unwrap_or("unknown")
}

fn str_field<'a>(ctrl: &'a Value, field: &str) -> Option<&'a str> {
    ctrl.get(field).and_then(Value::as_str)
}

pub fn should_skip(key: &str, ctrl: &Value) -> bool {
    if key.starts_with('_') || SKIP_TYPES.contains(&control_type(ctrl)) {
        return true;
    }
    if SKIP_SUFFIXES.iter().any(|s| key.ends_with(s)) || SKIP_EXACT.contains(&key) {
        return true;
    }
    if SKIP_CONTAINS.iter().any(|p| key.contains(p)) {
        // The group's main toggle stays, e.g. `text_shadow_text_shadow_type`.
        return !(key.ends_with("_typography") || key.ends_with("_type"));
    }
    if key.contains("hover_") && HOVER_BACKGROUND_PARTS.iter().any(|p| key.contains(p)) {
        return true;
    }
    key.contains("css_filter") && !key.ends_with("css_filter")
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn format_control(key: &str, ctrl: &Value) -> String {
    let ctype = control_type(ctrl);
    let options = ctrl.get("options");
    if matches!(options, Some(Value::Array(_))) {
        return format!("`{}` ({})", key, ctype);
    }
    let options: Vec<&str> = match options {
        Some(Value::Object(map)) => map.keys().map(String::as_str).collect(),
        _ => Vec::new(),
    };

    let mut out = format!("`{}`", key);
    match ctype {
        "select" if !options.is_empty() => {
            let named: Vec<&str> = options.into_iter().filter(|k| !k.is_empty()).collect();
            if named.len() > 6 {
                out.push_str(&format!(" ({}, +{})", named[..5].join(", "), named.len() - 5));
            } else if !named.is_empty() {
                out.push_str(&format!(" ({})", named.join(", ")));
            }
        }
        "choose" if !options.is_empty() => out.push_str(&format!(" ({})", options.join(", "))),
        "switcher" => out.push_str(" (on/off)"),
        "slider" => match ctrl.get("default").and_then(|d| d.get("size")) {
            Some(size) if is_truthy(size) => {
                let unit = ctrl["default"].get("unit").map(scalar).unwrap_or_default();
                out.push_str(&format!(" (slider, default: {}{})", scalar(size), unit));
            }
            _ => out.push_str(" (slider)"),
        },
        "text" | "textarea" | "number" => match str_field(ctrl, "default") {
            Some(default) if !default.is_empty() && default.chars().count() < 30 => {
                out.push_str(&format!(" ({}, default: \"{}\")", ctype, default));
            }
            _ => out.push_str(&format!(" ({})", ctype)),
        },
        other => out.push_str(&format!(" ({})", other)),
    }
    out
}

struct Group<'a> {
    tab: String,
    section: String,
    label: String,
    controls: Vec<(&'a str, &'a Value)>,
}

pub fn format_widget(name: &str, detail: &Value) -> String {
    let empty = Map::new();
    let controls = detail.get("controls").and_then(Value::as_object).unwrap_or(&empty);
    let title = str_field(detail, "title").unwrap_or(name);

    let mut lines = vec![format!("### `{}` — {}", name, title)];
    let keywords: Vec<&str> = detail
        .get("keywords")
        .and_then(Value::as_array)
        .map(|k| k.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !keywords.is_empty() {
        lines.push(format!("*{}*", keywords.join(", ")));
    }

    let mut sections: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
    for (key, ctrl) in controls {
        if control_type(ctrl) == "section" {
            let label = str_field(ctrl, "label").unwrap_or(key.as_str());
            let tab = str_field(ctrl, "tab").unwrap_or("content");
            sections.insert(key.as_str(), (label, tab));
        }
    }

    let mut groups: Vec<Group> = Vec::new();
    for (key, ctrl) in controls {
        let key = key.as_str();
        if should_skip(key, ctrl) {
            continue;
        }
        let section = str_field(ctrl, "section").unwrap_or("other");
        let tab = str_field(ctrl, "tab")
            .or_else(|| sections.get(section).map(|(_, tab)| *tab))
            .unwrap_or("content");
        if tab == "advanced" {
            continue;
        }

        match groups.iter_mut().find(|g| g.tab == tab && g.section == section) {
            Some(group) => group.controls.push((key, ctrl)),
            None => groups.push(Group {
                tab: tab.to_string(),
                section: section.to_string(),
                label: sections.get(section).map(|(label, _)| *label).unwrap_or(section).to_string(),
                controls: vec![(key, ctrl)],
            }),
        }
    }

    for tab in TABS {
        for group in groups.iter().filter(|g| g.tab == *tab) {
            let rendered: Vec<String> = group.controls.iter().map(|(k, c)| format_control(k, c)).collect();
            lines.push(format!("- **{}** ({}): {}", group.label, tab, rendered.join(" · ")));
        }
    }

    lines.join("\n")
}

fn primary_category(detail: &Value) -> String {
    detail
        .get("categories")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(Value::as_str)
        .unwrap_or("uncategorized")
        .to_string()
}

/// Render the whole document. `widgets` are `(name, definition)` pairs;
/// within a category they appear in the order given.
pub fn render_reference(widgets: &[(String, Value)], source: &str) -> String {
    let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, detail) in widgets {
        by_category
            .entry(primary_category(detail))
            .or_default()
            .push(format_widget(name, detail));
    }

    let mut md = vec![
        "# Elementor Widget Reference".to_string(),
        String::new(),
        format!("Auto-generated from the CommunityTech Widget Registry API on {}.", source),
        "To regenerate: query `GET /wp-json/communitytech/v1/elementor/widgets/<name>` for each widget.".to_string(),
        String::new(),
        "## Usage Notes".to_string(),
        String::new(),
        "- **Colors**: always use `__globals__` references — `\"__globals__\": {\"title_color\": \"globals/colors?id=primary\"}`".to_string(),
        "- **Typography**: use `__globals__` — `\"__globals__\": {\"typography_typography\": \"globals/typography?id=primary\"}`".to_string(),
        "- **Advanced tab** (margins, padding, motion effects, custom CSS): identical for all widgets, not shown here.".to_string(),
        "- **Responsive variants** (`_tablet`, `_mobile`): not shown — append suffix to any control key.".to_string(),
        "- **Full schema**: `GET /wp-json/communitytech/v1/elementor/widgets/<name>` returns every control.".to_string(),
        String::new(),
        "---".to_string(),
    ];

    let ordered = CATEGORY_ORDER.iter().map(|c| c.to_string());
    let rest = by_category.keys().filter(|c| !CATEGORY_ORDER.contains(&c.as_str())).cloned();
    for category in ordered.chain(rest.collect::<Vec<_>>()) {
        let Some(entries) = by_category.get(&category) else {
            continue;
        };
        md.push(String::new());
        md.push(format!("## {}", category));
        md.push(String::new());
        for entry in entries {
            md.push(entry.clone());
            md.push(String::new());
        }
    }

    md.join("\n")
}
