use std::fmt::Display;

/// Shortens long SQL text before it ends up in log lines and error messages.
pub fn printable(value: &str) -> String {
    let mut end = value.len().min(497);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut result = value[..end].trim_end().to_string();
    if end < value.len() {
        result.push_str("...");
    }
    result
}

pub fn consume_while<'s>(input: &mut &'s str, predicate: impl FnMut(&char) -> bool) -> &'s str {
    let len = input
        .chars()
        .take_while(predicate)
        .map(char::len_utf8)
        .sum::<usize>();
    if len == 0 {
        return "";
    }
    let result = &input[..len];
    *input = &input[len..];
    result
}

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Joins displayable values, used to build readable error messages.
pub fn join_display<T: Display>(values: impl IntoIterator<Item = T>, separator: &str) -> String {
    let mut out = String::new();
    separated_by(&mut out, values, |out, v| out.push_str(&v.to_string()), separator);
    out
}
