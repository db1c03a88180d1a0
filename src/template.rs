//! Fills `{key}` placeholders in bot lines with collected answers.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// Replaces every `{key}` in `template` with the answer recorded under `key`.
///
/// A placeholder naming a key that has no answer is left in the output
/// verbatim, as is any brace that doesn't enclose an identifier.
pub fn fill_placeholders(template: &str, answers: &HashMap<String, String>) -> String {
    let mut chars = template.chars().peekable();

    let mut filled = String::with_capacity(template.len());

    while let Some(c) = chars.next() {
        if c != '{' {
            // plain text!
            filled.push(c);
            continue;
        }

        match read_placeholder(&mut chars) {
            Ok(key) => {
                if let Some(value) = answers.get(&key) {
                    filled.push_str(value);
                } else {
                    filled.push('{');
                    filled.push_str(&key);
                    filled.push('}');
                }
            }
            Err(consumed) => {
                filled.push('{');
                filled.push_str(&consumed);
            }
        }
    }

    filled
}

// placeholder = { [\w_]+ }
//
// Called just after the opening brace. On failure, hands back whatever
// was consumed so the caller can emit it unchanged.
fn read_placeholder(chars: &mut Peekable<Chars>) -> Result<String, String> {
    let mut id_string = String::new();

    loop {
        match chars.peek() {
            Some('}') => {
                chars.next();
                if id_string.is_empty() {
                    return Err("}".to_string());
                }
                return Ok(id_string);
            }
            Some(&next_char) if next_char.is_alphanumeric() || next_char == '_' => {
                id_string.push(next_char);
                chars.next(); // consume it
            }
            // Not an identifier, or the line ended. Don't consume the
            // character; it may open another placeholder.
            _ => return Err(id_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_fills_name() {
        let answers = answers(&[("name", "Asha Rao")]);
        assert_eq!(
            fill_placeholders("Thank you, {name}! Here's what we'll do next:", &answers),
            "Thank you, Asha Rao! Here's what we'll do next:"
        );
    }

    #[test]
    fn test_fills_several_keys() {
        let answers = answers(&[("name", "Ravi"), ("callTime", "Evening")]);
        assert_eq!(
            fill_placeholders("{name}, we'll call you in the {callTime}.", &answers),
            "Ravi, we'll call you in the Evening."
        );
    }

    #[test]
    fn test_missing_key_stays_literal() {
        let answers = answers(&[("phone", "12345")]);
        assert_eq!(
            fill_placeholders("Thank you, {name}!", &answers),
            "Thank you, {name}!"
        );
    }

    #[test]
    fn test_stray_braces_are_kept() {
        let answers = answers(&[("name", "Asha")]);
        assert_eq!(fill_placeholders("{} and { name }", &answers), "{} and { name }");
        assert_eq!(fill_placeholders("open {name", &answers), "open {name");
        assert_eq!(fill_placeholders("{{name}}", &answers), "{Asha}");
    }

    #[test]
    fn test_no_placeholders() {
        let answers = answers(&[]);
        assert_eq!(
            fill_placeholders("Our team will review your request.", &answers),
            "Our team will review your request."
        );
    }
}
