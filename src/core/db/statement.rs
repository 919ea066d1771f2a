/// Statement Boundaries
///
/// SQLite compiles only the first statement of a string and ignores the
/// rest. `trailing_sql` finds that rest so it can be rejected instead of
/// silently dropped. The scan follows SQLite's own completeness rules: quoted
/// text, identifiers and comments never end a statement, and inside
/// `CREATE TRIGGER` a `;` only ends the statement once every `BEGIN`/`CASE`
/// has been closed by an `END`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Semi,
    Other,
}

/// Yields `(end offset, token)` pairs, skipping whitespace and comments.
struct Tokens<'a> {
    sql: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(sql: &'a str) -> Self {
        Tokens { sql, pos: 0 }
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Offset just past the closing quote, honoring doubled-quote escapes.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn find_from(bytes: &[u8], start: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(start..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| start + i)
}

impl<'a> Iterator for Tokens<'a> {
    type Item = (usize, Token<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let sql = self.sql;
        let bytes = sql.as_bytes();
        loop {
            let start = self.pos;
            let b = *bytes.get(start)?;
            match b {
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'-' if bytes.get(start + 1) == Some(&b'-') => {
                    self.pos = find_from(bytes, start, b"\n").map_or(bytes.len(), |i| i + 1);
                }
                b'/' if bytes.get(start + 1) == Some(&b'*') => {
                    self.pos = find_from(bytes, start + 2, b"*/").map_or(bytes.len(), |i| i + 2);
                }
                b';' => {
                    self.pos += 1;
                    return Some((self.pos, Token::Semi));
                }
                b'\'' | b'"' | b'`' => {
                    self.pos = skip_quoted(bytes, start, b);
                    return Some((self.pos, Token::Other));
                }
                b'[' => {
                    self.pos = find_from(bytes, start + 1, b"]").map_or(bytes.len(), |i| i + 1);
                    return Some((self.pos, Token::Other));
                }
                b if is_word_byte(b) => {
                    let len = bytes[start..].iter().take_while(|&&b| is_word_byte(b)).count();
                    self.pos = start + len;
                    return Some((self.pos, Token::Word(&sql[start..self.pos])));
                }
                _ => {
                    self.pos += 1;
                    return Some((self.pos, Token::Other));
                }
            }
        }
    }
}

fn is_trigger(leading: &[String]) -> bool {
    let words: Vec<&str> = leading
        .iter()
        .map(String::as_str)
        .skip_while(|w| matches!(*w, "EXPLAIN" | "QUERY" | "PLAN"))
        .collect();
    match words.as_slice() {
        ["CREATE", "TRIGGER", ..] => true,
        ["CREATE", "TEMP" | "TEMPORARY", "TRIGGER", ..] => true,
        _ => false,
    }
}

/// Offset just past the `;` that ends the first statement, if there is one.
fn first_statement_end(sql: &str) -> Option<usize> {
    let mut leading: Vec<String> = Vec::new();
    let mut in_prefix = true;
    let mut depth = 0usize;

    for (end, token) in Tokens::new(sql) {
        match token {
            Token::Semi => {
                if depth == 0 || !is_trigger(&leading) {
                    return Some(end);
                }
            }
            Token::Word(word) => {
                if in_prefix && leading.len() < 6 {
                    leading.push(word.to_ascii_uppercase());
                }
                if is_trigger(&leading) {
                    if word.eq_ignore_ascii_case("BEGIN") || word.eq_ignore_ascii_case("CASE") {
                        depth += 1;
                    } else if word.eq_ignore_ascii_case("END") {
                        depth = depth.saturating_sub(1);
                    }
                }
            }
            Token::Other => in_prefix = false,
        }
    }
    None
}

/// Returns the SQL following the first statement when it contains anything
/// besides whitespace, comments and semicolons.
pub fn trailing_sql(sql: &str) -> Option<&str> {
    let tail = &sql[first_statement_end(sql)?..];
    let has_content = Tokens::new(tail).any(|(_, token)| token != Token::Semi);
    has_content.then_some(tail)
}
