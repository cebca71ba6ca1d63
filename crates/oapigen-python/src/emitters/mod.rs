pub mod client;
pub mod models;

use minijinja::Environment;

/// A template environment with one template registered under `name`.
pub(crate) fn environment(
    name: &'static str,
    source: &'static str,
) -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_template(name, source)?;
    Ok(env)
}

/// A triple-quoted docstring indented by `indent` spaces, with paragraphs
/// separated by blank lines.
///
/// - `["#/definitions/Pet"]` at 4 → `    """\n    #/definitions/Pet\n    """`
pub fn docstring(paragraphs: &[String], indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = format!("{pad}\"\"\"\n");
    for (index, paragraph) in paragraphs.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        for line in escape_docstring(paragraph.trim()).lines() {
            let line = line.trim_end();
            if !line.is_empty() {
                out.push_str(&pad);
                out.push_str(line);
            }
            out.push('\n');
        }
    }
    out.push_str(&pad);
    out.push_str("\"\"\"");
    out
}

fn escape_docstring(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docstring_paragraphs() {
        let rendered = docstring(
            &["#/definitions/Pet".to_string(), "A pet.\n\nWith \"\"\"quotes\"\"\".".to_string()],
            4,
        );
        assert_eq!(
            rendered,
            "    \"\"\"\n    #/definitions/Pet\n\n    A pet.\n\n    With \\\"\\\"\\\"quotes\\\"\\\"\\\".\n    \"\"\""
        );
    }
}
