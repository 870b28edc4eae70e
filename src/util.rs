use std::collections::HashMap;

use handlebars::Handlebars;
use serde_json::{Map, Value};

use crate::session::FieldValue;

/// Renders a Handlebars template against the session's captured fields.
/// Falls back to the raw template on render errors so a bad template never
/// silences a prompt.
pub fn render_handlebars(template: &str, fields: &HashMap<String, FieldValue>) -> String {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    let data: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    handlebars
        .render_template(template, &data)
        .unwrap_or_else(|_| template.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_captured_fields() {
        let mut fields = HashMap::new();
        fields.insert(
            "document_number".to_string(),
            FieldValue::String("1234567".into()),
        );
        let out = render_handlebars("Cases for {{document_number}}:", &fields);
        assert_eq!(out, "Cases for 1234567:");
    }

    #[test]
    fn bad_template_falls_back_to_raw() {
        let out = render_handlebars("{{#if}}", &HashMap::new());
        assert_eq!(out, "{{#if}}");
    }
}
