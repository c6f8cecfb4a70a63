// ctech-server/src/units/elementor_widgets/operations.rs
use ctech_common::{ApiError, HostContext};
use serde_json::{json, Value};

/// Summary of one widget definition with its control count.
pub fn summarize(name: &str, widget: &Value) -> Value {
    let controls = match widget.get("controls") {
        Some(Value::Object(map)) => map.len(),
        Some(Value::Array(list)) => list.len(),
        _ => 0,
    };
    json!({
        "name": name,
        "title": widget.get("title").and_then(Value::as_str).unwrap_or(name),
        "categories": widget.get("categories").cloned().unwrap_or_else(|| json!([])),
        "keywords": widget.get("keywords").cloned().unwrap_or_else(|| json!([])),
        "controls": controls,
    })
}

pub fn list(host: &HostContext) -> Result<Value, ApiError> {
    let widgets = host.widgets.widgets()?;
    let summaries: Vec<Value> = widgets.iter().map(|(name, w)| summarize(name, w)).collect();
    Ok(json!({ "count": summaries.len(), "widgets": summaries }))
}

pub fn get(host: &HostContext, name: &str) -> Result<Value, ApiError> {
    let mut widgets = host.widgets.widgets()?;
    match widgets.remove(name) {
        Some(widget) => Ok(json!({ "name": name, "widget": widget })),
        None => Err(ApiError::not_found(
            "widget_not_found",
            format!("Widget {} is not registered.", name),
        )),
    }
}
