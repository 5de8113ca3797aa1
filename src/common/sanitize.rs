// src/common/sanitize.rs

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Limpa texto livre antes de gravar: remove espaços das pontas, descarta
/// caracteres de controle (mantém quebra de linha e tab), escapa `<` e `>`
/// e corta em `max_chars` caracteres.
pub fn sanitize_text(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars));
    let mut count = 0;

    for c in input.trim().chars() {
        if count >= max_chars {
            break;
        }
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' | '\t' => out.push(c),
            '\r' => continue,
            c if c.is_control() => continue,
            c => out.push(c),
        }
        count += 1;
    }
    out
}

/// Igual a `sanitize_text`, mas texto vazio vira `None`.
pub fn sanitize_optional(input: Option<&str>, max_chars: usize) -> Option<String> {
    input
        .map(|s| sanitize_text(s, max_chars))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_escapes_markup() {
        assert_eq!(
            sanitize_text("  <script>alert(1)</script> ", 100),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_drops_control_chars_but_keeps_newlines() {
        assert_eq!(sanitize_text("linha 1\r\nlinha\u{0007} 2\tfim", 100), "linha 1\nlinha 2\tfim");
    }

    #[test]
    fn test_truncates_by_chars_not_bytes() {
        assert_eq!(sanitize_text("ação ação", 4), "ação");
    }

    #[test]
    fn test_blank_optional_becomes_none() {
        assert_eq!(sanitize_optional(Some("   "), 10), None);
        assert_eq!(sanitize_optional(None, 10), None);
        assert_eq!(sanitize_optional(Some(" ok "), 10), Some("ok".to_string()));
    }
}
