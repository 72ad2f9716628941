/// Byte offset of a 1-based line/column pair, where the column counts characters.
/// Returns `None` for line 0 (records without a place in the script) and for
/// positions past the end of the text.
pub fn byte_offset(source: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 || column == 0 {
        return None;
    }
    let line_start = if line == 1 {
        0
    } else {
        source
            .match_indices('\n')
            .nth(line - 2)
            .map(|(i, _)| i + 1)?
    };
    let rest = &source[line_start..];
    let line_text = rest.split('\n').next().unwrap_or_default();
    match line_text.char_indices().nth(column - 1) {
        Some((i, _)) => Some(line_start + i),
        None if column - 1 == line_text.chars().count() => Some(line_start + line_text.len()),
        None => None,
    }
}

/// Length in bytes of the token starting at `offset`: a quoted string up to
/// its closing quote, or a bare word up to the next delimiter.
pub fn token_len(source: &str, offset: usize) -> usize {
    let Some(rest) = source.get(offset..) else {
        return 0;
    };
    let mut chars = rest.char_indices();
    match chars.next() {
        None => 0,
        Some((_, '"')) => {
            let mut escaped = false;
            for (i, c) in chars {
                match c {
                    '\\' if !escaped => escaped = true,
                    '"' if !escaped => return i + 1,
                    '\n' => return i,
                    _ => escaped = false,
                }
            }
            rest.len()
        }
        Some(_) => rest
            .find(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | ')' | '{' | '}' | ':'))
            .filter(|end| *end > 0)
            .unwrap_or_else(|| rest.chars().next().map_or(0, char::len_utf8)),
    }
}
