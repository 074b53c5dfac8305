//! CLI output formatting utilities.
//!
//! JSON syntax highlighting and column helpers shared by the commands.

use colored::Colorize;

/// Prints JSON with syntax highlighting.
///
/// Colors:
/// - Keys: Cyan
/// - Strings: Green
/// - Numbers: Yellow
/// - Booleans/Null: Magenta
/// - Punctuation: White, brackets bold
pub fn print_highlighted_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    println!("{}", highlight_json(&json));
}

/// Colors pretty-printed JSON.
#[must_use]
pub fn highlight_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len() * 2);
    let mut chars = json.chars().peekable();
    let mut containers: Vec<char> = Vec::new();
    let mut after_colon = false;

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                let mut literal = String::from('"');
                while let Some(next) = chars.next() {
                    literal.push(next);
                    if next == '\\' {
                        literal.extend(chars.next());
                    } else if next == '"' {
                        break;
                    }
                }
                let is_key = containers.last() == Some(&'{') && !after_colon;
                let colored = if is_key { literal.cyan() } else { literal.green() };
                out.push_str(&colored.to_string());
                after_colon = false;
            }
            ':' => {
                out.push_str(&":".white().to_string());
                after_colon = true;
            }
            ',' => {
                out.push_str(&",".white().to_string());
                after_colon = false;
            }
            '{' | '[' | '}' | ']' => {
                if matches!(ch, '{' | '[') {
                    containers.push(ch);
                } else {
                    containers.pop();
                }
                out.push_str(&ch.to_string().white().bold().to_string());
                after_colon = false;
            }
            c if c.is_whitespace() => out.push(c),
            _ => {
                let mut literal = String::from(ch);
                while let Some(&next) = chars.peek() {
                    if matches!(next, ',' | '}' | ']') || next.is_whitespace() {
                        break;
                    }
                    literal.push(next);
                    chars.next();
                }
                let colored = match literal.as_str() {
                    "true" | "false" | "null" => literal.magenta(),
                    _ if literal.parse::<f64>().is_ok() => literal.yellow(),
                    _ => literal.normal(),
                };
                out.push_str(&colored.to_string());
                after_colon = false;
            }
        }
    }

    out
}

/// Truncates a string to a maximum number of characters, adding ellipsis if needed.
///
/// This function correctly handles multi-byte UTF-8 characters by counting
/// characters rather than bytes.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();

    if char_count <= max_chars {
        s.to_string()
    } else if max_chars <= 1 {
        "…".to_string()
    } else {
        // Find the byte index of the (max_chars - 1)th character
        let truncate_at = s.char_indices().nth(max_chars - 1).map_or(s.len(), |(idx, _)| idx);
        format!("{}…", &s[..truncate_at])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_json_keeps_text_without_colors() {
        colored::control::set_override(false);
        let json = "{\n  \"clients\": [\"Skype\", \"a\\\"b\"],\n  \"debounceMs\": 1000,\n  \"muteOnDuplex\": true\n}";
        assert_eq!(highlight_json(json), json);
    }

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello w…");
    }

    #[test]
    fn test_truncate_exact_length() {
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_min_length() {
        assert_eq!(truncate("hello", 1), "…");
    }

    #[test]
    fn test_truncate_multibyte_utf8() {
        let s = "Lecteur vidéo • Totem";
        assert_eq!(truncate(s, 16), "Lecteur vidéo •…");
        assert_eq!(truncate(s, 30), s);
    }

    #[test]
    fn test_truncate_emoji() {
        let s = "hello 🌍 world";
        assert_eq!(truncate(s, 8), "hello 🌍…");
    }
}
