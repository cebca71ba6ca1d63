use heck::{ToPascalCase, ToSnakeCase};

/// Identifiers a generated field, argument or method may not use verbatim:
/// Python keywords plus the module-level names generated code relies on.
const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield", "self", "sob", "typing", "oapi",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Normalize an arbitrary string to a snake_case identifier. Reserved
/// words are suffixed with `_`, and a leading digit is prefixed with `_`.
///
/// Examples:
/// - `petId` → `pet_id`
/// - `X-Rate-Limit` → `x_rate_limit`
/// - `class` → `class_`
/// - `2fa` → `_2fa`
pub fn property_name(name: &str) -> String {
    let mut snake = sanitize_identifier(name).to_snake_case();
    if snake.is_empty() {
        snake = "unnamed".to_string();
    }
    if snake.starts_with(|c: char| c.is_ascii_digit()) {
        snake.insert(0, '_');
    }
    if is_reserved(&snake) {
        snake.push('_');
    }
    snake
}

/// Convert a `/`-separated name path to a PascalCase class name.
///
/// Examples:
/// - `a/get/first` → `AGetFirst`
/// - `/pets/{petId}/response` → `PetsPetIdResponse`
/// - `200/item` → `_200Item`
pub fn class_name(path: &str) -> String {
    let mut pascal = sanitize_identifier(path).to_pascal_case();
    if pascal.is_empty() {
        pascal = "Model".to_string();
    }
    if pascal.starts_with(|c: char| c.is_ascii_digit()) {
        pascal.insert(0, '_');
    }
    pascal
}

/// Append `_` to `name` until `taken` no longer reports it.
pub fn unique_name(name: String, mut taken: impl FnMut(&str) -> bool) -> String {
    let mut candidate = name;
    while taken(&candidate) {
        candidate.push('_');
    }
    candidate
}

/// Replace runs of non-alphanumeric characters with a single `_`, so case
/// conversion sees word boundaries at punctuation.
fn sanitize_identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut prev_was_separator = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if prev_was_separator && !result.is_empty() {
                result.push('_');
            }
            result.push(ch);
            prev_was_separator = false;
        } else {
            prev_was_separator = true;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_names() {
        assert_eq!(property_name("petId"), "pet_id");
        assert_eq!(property_name("X-Rate-Limit"), "x_rate_limit");
        assert_eq!(property_name("IPAddress"), "ip_address");
        assert_eq!(property_name("@type"), "type");
        assert_eq!(property_name("v2Name"), "v2_name");
    }

    #[test]
    fn test_reserved_property_names() {
        assert_eq!(property_name("class"), "class_");
        assert_eq!(property_name("sob"), "sob_");
        assert_eq!(property_name("self"), "self_");
        assert_eq!(property_name("from"), "from_");
    }

    #[test]
    fn test_leading_digits() {
        assert_eq!(property_name("2fa"), "_2fa");
        assert_eq!(class_name("200/item"), "_200Item");
    }

    #[test]
    fn test_empty_names() {
        assert_eq!(property_name("$"), "unnamed");
        assert_eq!(class_name("//"), "Model");
    }

    #[test]
    fn test_class_names() {
        assert_eq!(class_name("a/get/first"), "AGetFirst");
        assert_eq!(class_name("/pets/{petId}/response"), "PetsPetIdResponse");
        assert_eq!(
            class_name("check/post/response/language/detectedLanguage"),
            "CheckPostResponseLanguageDetectedLanguage"
        );
        assert_eq!(class_name("directory/sub-directory/name"), "DirectorySubDirectoryName");
    }

    #[test]
    fn test_unique_name() {
        let taken = ["Pet", "Pet_"];
        assert_eq!(unique_name("Pet".to_string(), |n| taken.contains(&n)), "Pet__");
        assert_eq!(unique_name("Tag".to_string(), |n| taken.contains(&n)), "Tag");
    }
}
