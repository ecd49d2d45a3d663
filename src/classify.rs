//! Content classifier for PHP-`serialize()` style values.
//!
//! Stored cells may hold a length-prefixed, typed token encoding of a
//! composite value (`a:1:{s:3:"key";i:42;}`). Searching or editing the raw
//! form is useless at best and corrupting at worst, so the classifier:
//!
//! - detects the grammar without ever panicking on arbitrary text,
//! - decodes into a readable literal notation for search and editing,
//! - re-encodes that notation back to the byte-identical serialized form.
//!
//! The decoded notation is itself a small grammar (`null`, `true`, `42`,
//! `1.5`, `"text"`, `{key => value, ...}`) so the round trip
//! `encode(decode(x)) == x` holds for every structured `x`. Numeric scalars
//! keep their source text verbatim; a float without a decimal point or
//! exponent is rendered with an `f` suffix (`d:1;` decodes to `1f`) so it
//! cannot be mistaken for an integer on the way back.

/// Nesting cap for both parsers. Anything deeper classifies as malformed
/// and is handled as plain text, which keeps recursive descent (and the
/// renderer and serializer that walk the parsed tree) off unbounded input.
const MAX_DEPTH: usize = 128;

/// Tri-state classification of a raw cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Ordinary text, searched and edited as-is.
    Plain,
    /// A well-formed serialized value this module can decode and re-encode.
    Structured,
    /// Looks like the serialized grammar but does not parse (truncated,
    /// hand-mangled, or an unsupported tag such as `O:`). Treated as plain
    /// text everywhere; never rewritten.
    MalformedStructured,
}

/// Parsed serialized value. Int and Float keep the raw digit text so that
/// re-serialization reproduces the original bytes.
#[derive(Debug, Clone, PartialEq)]
enum PhpValue {
    Null,
    Bool(bool),
    Int(String),
    Float(String),
    Str(String),
    Array(Vec<(PhpValue, PhpValue)>),
}

/// Classify a raw cell value. Total: never panics, never errors.
pub fn classify(raw: &str) -> Classification {
    if !looks_serialized(raw) {
        return Classification::Plain;
    }
    match parse_serialized(raw) {
        Some(_) => Classification::Structured,
        None => Classification::MalformedStructured,
    }
}

pub fn is_structured(raw: &str) -> bool {
    classify(raw) == Classification::Structured
}

/// Decode a structured value into the display notation.
/// Returns `None` for plain or malformed input; callers fall back to `raw`.
pub fn decode(raw: &str) -> Option<String> {
    let value = parse_serialized(raw)?;
    let mut out = String::new();
    render(&value, &mut out);
    Some(out)
}

/// Re-encode display notation back into the serialized form.
/// Returns `None` when the text is not the display notation, in which case
/// the caller persists it as ordinary text.
pub fn encode(display: &str) -> Option<String> {
    let value = parse_display(display)?;
    let mut out = String::new();
    serialize(&value, &mut out);
    Some(out)
}

/// Cheap shape check in the spirit of WordPress's `is_serialized()`:
/// a known tag byte, a `:` separator, and a `;` or `}` terminator.
/// False negatives here just mean the value is searched as plain text.
fn looks_serialized(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if raw == "N;" {
        return true;
    }
    if bytes.len() < 4 || bytes[1] != b':' {
        return false;
    }
    matches!(bytes[0], b'b' | b'i' | b'd' | b's' | b'a' | b'O')
        && matches!(bytes[bytes.len() - 1], b';' | b'}')
}

// ---------------------------------------------------------------------------
// Serialized-form parser (byte cursor, full-input match required)
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn eat(&mut self, prefix: &str) -> Option<()> {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            Some(())
        } else {
            None
        }
    }

    /// Consume up to the next `stop` byte, not including it.
    fn take_until(&mut self, stop: u8) -> Option<&'a str> {
        let rest = self.rest();
        let end = rest.bytes().position(|b| b == stop)?;
        self.pos += end;
        Some(&rest[..end])
    }

    /// Consume exactly `n` bytes, which must fall on a char boundary.
    fn take_bytes(&mut self, n: usize) -> Option<&'a str> {
        let taken = self.rest().get(..n)?;
        self.pos += n;
        Some(taken)
    }
}

fn parse_serialized(raw: &str) -> Option<PhpValue> {
    let mut cur = Cursor { input: raw, pos: 0 };
    let value = parse_value(&mut cur, 0)?;
    if cur.pos == raw.len() {
        Some(value)
    } else {
        None
    }
}

fn parse_value(cur: &mut Cursor, depth: usize) -> Option<PhpValue> {
    if depth > MAX_DEPTH {
        return None;
    }
    match cur.rest().as_bytes().first()? {
        b'N' => {
            cur.eat("N;")?;
            Some(PhpValue::Null)
        }
        b'b' => {
            cur.eat("b:")?;
            let flag = match cur.rest().as_bytes().first()? {
                b'0' => false,
                b'1' => true,
                _ => return None,
            };
            cur.pos += 1;
            cur.eat(";")?;
            Some(PhpValue::Bool(flag))
        }
        b'i' => {
            cur.eat("i:")?;
            let digits = cur.take_until(b';')?;
            if !is_int_text(digits) {
                return None;
            }
            let digits = digits.to_string();
            cur.eat(";")?;
            Some(PhpValue::Int(digits))
        }
        b'd' => {
            cur.eat("d:")?;
            let text = cur.take_until(b';')?;
            if !is_float_text(text) {
                return None;
            }
            let text = text.to_string();
            cur.eat(";")?;
            Some(PhpValue::Float(text))
        }
        b's' => {
            cur.eat("s:")?;
            let len: usize = cur.take_until(b':')?.parse().ok()?;
            cur.eat(":\"")?;
            let content = cur.take_bytes(len)?.to_string();
            cur.eat("\";")?;
            Some(PhpValue::Str(content))
        }
        b'a' => {
            cur.eat("a:")?;
            let count: usize = cur.take_until(b':')?.parse().ok()?;
            cur.eat(":{")?;
            let mut entries = Vec::with_capacity(count.min(64));
            for _ in 0..count {
                let key = parse_value(cur, depth + 1)?;
                if !matches!(key, PhpValue::Int(_) | PhpValue::Str(_)) {
                    return None;
                }
                let value = parse_value(cur, depth + 1)?;
                entries.push((key, value));
            }
            cur.eat("}")?;
            Some(PhpValue::Array(entries))
        }
        _ => None,
    }
}

fn is_int_text(text: &str) -> bool {
    let digits = text
        .strip_prefix(['-', '+'])
        .unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float_text(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let body = text.strip_prefix('-').unwrap_or(text);
    if body == "NAN" || body == "INF" {
        return true;
    }
    text.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
}

// ---------------------------------------------------------------------------
// Display notation: renderer
// ---------------------------------------------------------------------------

fn render(value: &PhpValue, out: &mut String) {
    match value {
        PhpValue::Null => out.push_str("null"),
        PhpValue::Bool(true) => out.push_str("true"),
        PhpValue::Bool(false) => out.push_str("false"),
        PhpValue::Int(text) => out.push_str(text),
        PhpValue::Float(text) => {
            out.push_str(text);
            // Disambiguate from an integer when the source text carries no
            // float marker of its own.
            if text.bytes().all(|b| b.is_ascii_digit() || b == b'-' || b == b'+') {
                out.push('f');
            }
        }
        PhpValue::Str(text) => {
            out.push('"');
            for ch in text.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(ch),
                }
            }
            out.push('"');
        }
        PhpValue::Array(entries) => {
            out.push('{');
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render(key, out);
                out.push_str(" => ");
                render(val, out);
            }
            out.push('}');
        }
    }
}

// ---------------------------------------------------------------------------
// Display notation: parser (the encode path)
// ---------------------------------------------------------------------------

fn parse_display(text: &str) -> Option<PhpValue> {
    let mut cur = Cursor { input: text, pos: 0 };
    skip_ws(&mut cur);
    let value = parse_display_value(&mut cur, 0)?;
    skip_ws(&mut cur);
    if cur.pos == text.len() {
        Some(value)
    } else {
        None
    }
}

fn skip_ws(cur: &mut Cursor) {
    while cur.rest().starts_with([' ', '\t', '\n', '\r']) {
        cur.pos += 1;
    }
}

fn parse_display_value(cur: &mut Cursor, depth: usize) -> Option<PhpValue> {
    if depth > MAX_DEPTH {
        return None;
    }
    let rest = cur.rest();
    if rest.starts_with("null") {
        cur.pos += 4;
        return Some(PhpValue::Null);
    }
    if rest.starts_with("true") {
        cur.pos += 4;
        return Some(PhpValue::Bool(true));
    }
    if rest.starts_with("false") {
        cur.pos += 5;
        return Some(PhpValue::Bool(false));
    }
    for keyword in ["-NAN", "NAN", "-INF", "INF"] {
        if rest.starts_with(keyword) {
            cur.pos += keyword.len();
            return Some(PhpValue::Float(keyword.to_string()));
        }
    }
    match rest.as_bytes().first()? {
        b'"' => parse_display_string(cur),
        b'{' => parse_display_array(cur, depth),
        b'-' | b'+' | b'0'..=b'9' => parse_display_number(cur),
        _ => None,
    }
}

fn parse_display_string(cur: &mut Cursor) -> Option<PhpValue> {
    cur.eat("\"")?;
    let mut content = String::new();
    let mut chars = cur.rest().char_indices();
    loop {
        let (offset, ch) = chars.next()?;
        match ch {
            '"' => {
                cur.pos += offset + 1;
                return Some(PhpValue::Str(content));
            }
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    '"' => content.push('"'),
                    '\\' => content.push('\\'),
                    'n' => content.push('\n'),
                    'r' => content.push('\r'),
                    't' => content.push('\t'),
                    _ => return None,
                }
            }
            _ => content.push(ch),
        }
    }
}

fn parse_display_number(cur: &mut Cursor) -> Option<PhpValue> {
    let rest = cur.rest();
    let end = rest
        .bytes()
        .position(|b| {
            !(b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
        })
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let text = &rest[..end];
    cur.pos += end;
    // Trailing `f` marks a float whose source text looks integral.
    if cur.rest().starts_with('f') {
        cur.pos += 1;
        if !is_float_text(text) {
            return None;
        }
        return Some(PhpValue::Float(text.to_string()));
    }
    if is_int_text(text) {
        Some(PhpValue::Int(text.to_string()))
    } else if is_float_text(text) {
        Some(PhpValue::Float(text.to_string()))
    } else {
        None
    }
}

fn parse_display_array(cur: &mut Cursor, depth: usize) -> Option<PhpValue> {
    cur.eat("{")?;
    let mut entries = Vec::new();
    skip_ws(cur);
    if cur.eat("}").is_some() {
        return Some(PhpValue::Array(entries));
    }
    loop {
        skip_ws(cur);
        let key = parse_display_value(cur, depth + 1)?;
        if !matches!(key, PhpValue::Int(_) | PhpValue::Str(_)) {
            return None;
        }
        skip_ws(cur);
        cur.eat("=>")?;
        skip_ws(cur);
        let value = parse_display_value(cur, depth + 1)?;
        entries.push((key, value));
        skip_ws(cur);
        if cur.eat(",").is_some() {
            continue;
        }
        cur.eat("}")?;
        return Some(PhpValue::Array(entries));
    }
}

// ---------------------------------------------------------------------------
// Serializer (exact inverse of the parser)
// ---------------------------------------------------------------------------

fn serialize(value: &PhpValue, out: &mut String) {
    match value {
        PhpValue::Null => out.push_str("N;"),
        PhpValue::Bool(flag) => {
            out.push_str(if *flag { "b:1;" } else { "b:0;" });
        }
        PhpValue::Int(text) => {
            out.push_str("i:");
            out.push_str(text);
            out.push(';');
        }
        PhpValue::Float(text) => {
            out.push_str("d:");
            out.push_str(text);
            out.push(';');
        }
        PhpValue::Str(text) => {
            out.push_str("s:");
            out.push_str(&text.len().to_string());
            out.push_str(":\"");
            out.push_str(text);
            out.push_str("\";");
        }
        PhpValue::Array(entries) => {
            out.push_str("a:");
            out.push_str(&entries.len().to_string());
            out.push_str(":{");
            for (key, val) in entries {
                serialize(key, out);
                serialize(val, out);
            }
            out.push('}');
        }
    }
}
