use std::collections::HashMap;

/// Fill `{{name}}` placeholders in one pass.
///
/// Inserted values are never scanned again, so memory content that happens to
/// contain `{{...}}` is copied verbatim. Unknown placeholders stay as written.
pub fn render(template: &str, values: &HashMap<&str, &str>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let Some(end_offset) = rest[start..].find("}}") else {
            rendered.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let placeholder = &rest[start..start + end_offset + 2];
        let name = placeholder[2..placeholder.len() - 2].trim();
        match values.get(name) {
            Some(value) => rendered.push_str(value),
            None => rendered.push_str(placeholder),
        }
        rest = &rest[start + end_offset + 2..];
    }
    rendered.push_str(rest);
    rendered
}

#[cfg(test)]
mod tests {
    use super::render;
    use std::collections::HashMap;

    #[test]
    fn test_basic_substitution() {
        let values = HashMap::from([("role", "helper"), ("todo", "- milk")]);
        assert_eq!(
            render("{{role}}\n<todo>\n{{ todo }}\n</todo>", &values),
            "helper\n<todo>\n- milk\n</todo>"
        );
    }

    #[test]
    fn test_inserted_values_are_not_rendered_again() {
        let values = HashMap::from([("instructions", "say {{role}}"), ("role", "x")]);
        assert_eq!(render("{{instructions}}", &values), "say {{role}}");
    }

    #[test]
    fn test_unknown_and_unclosed_placeholders_are_kept() {
        let values = HashMap::from([("known", "ok")]);
        assert_eq!(render("{{known}} {{unknown}}", &values), "ok {{unknown}}");
        assert_eq!(render("prefix {{known", &values), "prefix {{known");
    }
}
