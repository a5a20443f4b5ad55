//! Closed grammar for the model's action expressions.
//!
//! ```text
//! call    := ("do" | "finish") "(" [kwarg ("," kwarg)* [","]] ")"
//! kwarg   := ident "=" literal
//! literal := string | number | "[" [literal ("," literal)* [","]] "]"
//! ```
//!
//! Nothing outside this grammar is accepted: no positional arguments, names,
//! attribute access or nested calls.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::errors::{PhoneClawError, PhoneClawResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Str(String),
    Number(f64),
    List(Vec<Literal>),
}

impl Literal {
    /// Text form used for string-typed fields; numbers and lists are rendered.
    pub fn as_text(&self) -> String {
        match self {
            Literal::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Callee {
    Do,
    Finish,
}

/// An evaluated action expression: the callee tag plus its keyword arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    #[serde(rename = "_metadata")]
    pub callee: Callee,
    #[serde(flatten)]
    pub kwargs: BTreeMap<String, Literal>,
}

impl Call {
    pub fn get(&self, key: &str) -> Option<&Literal> {
        self.kwargs.get(key)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(Literal::as_text)
    }
}

/// Parses a call at the start of `input` (leading whitespace allowed).
/// Returns the call and the number of bytes consumed; trailing text is left
/// to the caller.
pub fn parse_call(input: &str) -> PhoneClawResult<(Call, usize)> {
    let mut cur = Cursor::new(input);
    cur.skip_ws();
    let call = cur.call()?;
    Ok((call, cur.pos))
}

/// Parses `input` as exactly one literal.
pub fn parse_literal(input: &str) -> PhoneClawResult<Literal> {
    let mut cur = Cursor::new(input);
    cur.skip_ws();
    let lit = cur.literal()?;
    cur.skip_ws();
    if cur.peek().is_some() {
        return Err(cur.error("trailing characters after literal"));
    }
    Ok(lit)
}

/// Deepest list nesting accepted inside a literal.
const MAX_LIST_DEPTH: usize = 32;

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn error(&self, msg: &str) -> PhoneClawError {
        PhoneClawError::Parse(format!("{msg} at offset {}", self.pos))
    }

    fn expect(&mut self, want: char) -> PhoneClawResult<()> {
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(&format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(&format!("expected '{want}', found end of input"))),
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.bump();
            }
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        Some(&self.src[start..self.pos])
    }

    fn call(&mut self) -> PhoneClawResult<Call> {
        let callee = match self.ident() {
            Some("do") => Callee::Do,
            Some("finish") => Callee::Finish,
            Some(other) => return Err(self.error(&format!("'{other}' is not callable"))),
            None => return Err(self.error("expected 'do' or 'finish'")),
        };
        self.skip_ws();
        self.expect('(')?;

        let mut kwargs = BTreeMap::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(')') {
                self.bump();
                break;
            }
            let key = self
                .ident()
                .ok_or_else(|| self.error("positional arguments are not allowed"))?
                .to_string();
            self.skip_ws();
            if self.peek() != Some('=') {
                return Err(self.error(&format!("argument '{key}' must be passed by keyword")));
            }
            self.bump();
            self.skip_ws();
            let value = self.literal()?;
            if kwargs.insert(key.clone(), value).is_some() {
                return Err(self.error(&format!("keyword argument '{key}' repeated")));
            }
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(')') => break,
                Some(c) => return Err(self.error(&format!("unexpected '{c}' in argument list"))),
                None => return Err(self.error("unterminated argument list")),
            }
        }

        Ok(Call { callee, kwargs })
    }

    fn literal(&mut self) -> PhoneClawResult<Literal> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.string(q).map(Literal::Str),
            Some('[') => self.list(),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(_) if self.src[self.pos..].starts_with(|c: char| c.is_alphabetic() || c == '_') => {
                Err(self.error("names and expressions are not allowed as values"))
            }
            Some(c) => Err(self.error(&format!("unexpected '{c}' where a value was expected"))),
            None => Err(self.error("expected a value, found end of input")),
        }
    }

    fn string(&mut self, quote: char) -> PhoneClawResult<String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some('u') => out.push(self.unicode_escape()?),
                    Some('\n') => {}
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    // Unknown escapes are kept verbatim.
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self) -> PhoneClawResult<char> {
        let start = self.pos;
        for _ in 0..4 {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => {}
                _ => return Err(self.error("invalid \\u escape")),
            }
        }
        u32::from_str_radix(&self.src[start..self.pos], 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid \\u escape"))
    }

    fn number(&mut self) -> PhoneClawResult<Literal> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '_'))
        {
            let c = self.bump();
            if matches!(c, Some('e' | 'E')) && matches!(self.peek(), Some('-' | '+')) {
                self.bump();
            }
        }
        let raw: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        raw.parse::<f64>()
            .map(Literal::Number)
            .map_err(|_| self.error(&format!("invalid number '{raw}'")))
    }

    fn list(&mut self) -> PhoneClawResult<Literal> {
        if self.depth >= MAX_LIST_DEPTH {
            return Err(self.error("list nested too deeply"));
        }
        self.depth += 1;
        let items = self.list_items();
        self.depth -= 1;
        items.map(Literal::List)
    }

    fn list_items(&mut self) -> PhoneClawResult<Vec<Literal>> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(items);
            }
            items.push(self.literal()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(items),
                Some(c) => return Err(self.error(&format!("unexpected '{c}' in list"))),
                None => return Err(self.error("unterminated list")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_do_call_with_mixed_kwargs() {
        let (call, used) =
            parse_call(r#"do(action="Swipe", start=[100, 800], end=[100,200], speed=1.5)"#).unwrap();
        assert_eq!(call.callee, Callee::Do);
        assert_eq!(call.text("action").as_deref(), Some("Swipe"));
        assert_eq!(
            call.get("start"),
            Some(&Literal::List(vec![Literal::Number(100.0), Literal::Number(800.0)]))
        );
        assert_eq!(call.get("speed"), Some(&Literal::Number(1.5)));
        assert_eq!(used, 62);
    }

    #[test]
    fn string_may_contain_parentheses_and_escapes() {
        let (call, _) = parse_call(r#"finish(message='Done (it\'s "ok")\n')"#).unwrap();
        assert_eq!(call.callee, Callee::Finish);
        assert_eq!(call.text("message").as_deref(), Some("Done (it's \"ok\")\n"));
    }

    #[test]
    fn multiline_call_and_trailing_comma() {
        let (call, _) = parse_call("do(\n  action=\"Back\",\n)").unwrap();
        assert_eq!(call.text("action").as_deref(), Some("Back"));
    }

    #[test]
    fn deeply_nested_list_is_rejected() {
        let nested = format!(
            "do(action=\"Tap\", element={}{})",
            "[".repeat(5000),
            "]".repeat(5000)
        );
        let err = parse_call(&nested).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"), "{err}");

        let shallow = format!("[{}1{}]", "[".repeat(30), "]".repeat(30));
        assert!(parse_literal(&shallow).is_ok());
    }

    #[test]
    fn empty_argument_list() {
        let (call, _) = parse_call("finish()").unwrap();
        assert!(call.kwargs.is_empty());
    }

    #[test]
    fn rejects_everything_outside_the_grammar() {
        for src in [
            r#"do("Tap")"#,
            r#"do(action=os.system("rm -rf /"))"#,
            r#"do(action=__import__)"#,
            r#"do(action="Tap", element=[1+2, 3])"#,
            r#"exec(action="Tap")"#,
            r#"do(action="Tap", action="Back")"#,
            r#"do(action="Tap""#,
            r#"do(action="Tap"; element=[1,2])"#,
        ] {
            assert!(parse_call(src).is_err(), "accepted {src}");
        }
    }

    #[test]
    fn literal_parse_is_strict() {
        assert_eq!(
            parse_literal(" [899, 55] ").unwrap(),
            Literal::List(vec![Literal::Number(899.0), Literal::Number(55.0)])
        );
        assert!(parse_literal("[899, 55] tap").is_err());
        assert!(parse_literal("x=899, y=55").is_err());
    }

    #[test]
    fn display_renders_integral_numbers_without_fraction() {
        let lit = Literal::List(vec![Literal::Number(3.0), Literal::Number(2.5), Literal::Str("a".into())]);
        assert_eq!(lit.to_string(), r#"[3, 2.5, "a"]"#);
        assert_eq!(Literal::Number(3.0).as_text(), "3");
    }
}
