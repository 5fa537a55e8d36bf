//! Parses one line of GDB/MI `--interpreter=mi3` output into a
//! [`MiRecord`] (spec §4.1).
//!
//! This has no teacher analogue (`probe-rs` never speaks GDB/MI); it is
//! hand-rolled the way the teacher hand-rolls its own small protocol
//! parsers (see `util/rtt/processing.rs`): an explicit cursor over the
//! input, no parser-combinator crate, and a typed error on any shape the
//! grammar does not recognize.

use super::record::{AsyncClass, MiRecord, ResultClass, StreamKind};
use super::value::{MiTuple, MiValue};

/// A line failed to match the MI grammar. The caller should log the raw
/// line and drop it; parsing does not terminate the session (spec §4.1
/// "Failure").
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed MI record: {0:?}")]
pub struct MalformedRecord(pub String);

pub struct MiParser;

impl MiParser {
    /// Parse one line (already split on `\n`, with any trailing `\r`
    /// stripped by the caller).
    pub fn parse_line(line: &str) -> Result<MiRecord, MalformedRecord> {
        let line = line.trim_end_matches('\r');
        if line == "(gdb)" {
            return Ok(MiRecord::Terminator);
        }

        let mut cursor = Cursor::new(line);
        let token = cursor.take_token();

        match cursor.peek() {
            Some('^') => {
                cursor.advance();
                let class_name = cursor.take_ident();
                let class = ResultClass::parse(&class_name)
                    .ok_or_else(|| MalformedRecord(line.to_string()))?;
                let fields = cursor
                    .take_results()
                    .map_err(|_| MalformedRecord(line.to_string()))?;
                Ok(MiRecord::Result {
                    token,
                    class,
                    fields,
                })
            }
            Some(marker @ ('*' | '+' | '=')) => {
                cursor.advance();
                let class = match marker {
                    '*' => AsyncClass::Exec,
                    '+' => AsyncClass::Status,
                    '=' => AsyncClass::Notify,
                    _ => unreachable!(),
                };
                let name = cursor.take_ident();
                if name.is_empty() {
                    return Err(MalformedRecord(line.to_string()));
                }
                let fields = cursor
                    .take_results()
                    .map_err(|_| MalformedRecord(line.to_string()))?;
                Ok(MiRecord::Async {
                    token,
                    class,
                    name,
                    fields,
                })
            }
            Some(marker @ ('~' | '@' | '&')) => {
                cursor.advance();
                let kind = match marker {
                    '~' => StreamKind::Console,
                    '@' => StreamKind::Target,
                    '&' => StreamKind::Log,
                    _ => unreachable!(),
                };
                let text = cursor
                    .take_c_string()
                    .map_err(|_| MalformedRecord(line.to_string()))?;
                Ok(MiRecord::Stream { kind, text })
            }
            _ => Err(MalformedRecord(line.to_string())),
        }
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

#[derive(Debug)]
struct ParseFailure;

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.rest = &self.rest[c.len_utf8()..];
        }
    }

    fn take_token(&mut self) -> Option<u64> {
        let digits: String = self.rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }
        self.rest = &self.rest[digits.len()..];
        digits.parse().ok()
    }

    /// An MI "class"/field name: letters, digits and `-`/`_`.
    fn take_ident(&mut self) -> String {
        let ident: String = self
            .rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.rest = &self.rest[ident.len()..];
        ident
    }

    /// `,name=value,name=value,...` (comma-prefixed, possibly empty).
    fn take_results(&mut self) -> Result<MiTuple, ParseFailure> {
        let mut tuple = MiTuple::new();
        while self.peek() == Some(',') {
            self.advance();
            let name = self.take_ident();
            if name.is_empty() || self.peek() != Some('=') {
                return Err(ParseFailure);
            }
            self.advance();
            let value = self.take_value()?;
            tuple.push(name, value);
        }
        Ok(tuple)
    }

    fn take_value(&mut self) -> Result<MiValue, ParseFailure> {
        match self.peek() {
            Some('"') => Ok(MiValue::Const(
                self.take_c_string().map_err(|_| ParseFailure)?,
            )),
            Some('{') => self.take_tuple(),
            Some('[') => self.take_list(),
            _ => Err(ParseFailure),
        }
    }

    fn take_tuple(&mut self) -> Result<MiValue, ParseFailure> {
        debug_assert_eq!(self.peek(), Some('{'));
        self.advance();
        let mut tuple = MiTuple::new();
        if self.peek() == Some('}') {
            self.advance();
            return Ok(MiValue::Tuple(tuple));
        }
        loop {
            let name = self.take_ident();
            if name.is_empty() || self.peek() != Some('=') {
                return Err(ParseFailure);
            }
            self.advance();
            let value = self.take_value()?;
            tuple.push(name, value);
            match self.peek() {
                Some(',') => {
                    self.advance();
                }
                Some('}') => {
                    self.advance();
                    break;
                }
                _ => return Err(ParseFailure),
            }
        }
        Ok(MiValue::Tuple(tuple))
    }

    /// `[value,value,...]` or `[name=value,...]` — a "result list". Both
    /// shapes are flattened into a plain list of [`MiValue`]; a bare
    /// `name=value` element becomes a single-entry tuple so no
    /// information is lost.
    fn take_list(&mut self) -> Result<MiValue, ParseFailure> {
        debug_assert_eq!(self.peek(), Some('['));
        self.advance();
        let mut items = Vec::new();
        if self.peek() == Some(']') {
            self.advance();
            return Ok(MiValue::List(items));
        }
        loop {
            let item = self.take_list_item()?;
            items.push(item);
            match self.peek() {
                Some(',') => {
                    self.advance();
                }
                Some(']') => {
                    self.advance();
                    break;
                }
                _ => return Err(ParseFailure),
            }
        }
        Ok(MiValue::List(items))
    }

    fn take_list_item(&mut self) -> Result<MiValue, ParseFailure> {
        // Disambiguate `name=value` from a bare value by speculatively
        // scanning an identifier followed by `=` that is not itself the
        // start of a nested tuple/list/string.
        let save = self.rest;
        let name = self.take_ident();
        if !name.is_empty() && self.peek() == Some('=') {
            self.advance();
            let value = self.take_value()?;
            let mut tuple = MiTuple::new();
            tuple.push(name, value);
            return Ok(MiValue::Tuple(tuple));
        }
        self.rest = save;
        self.take_value()
    }

    /// A C-escaped, double-quoted string literal.
    fn take_c_string(&mut self) -> Result<String, ParseFailure> {
        if self.peek() != Some('"') {
            return Err(ParseFailure);
        }
        self.advance();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseFailure),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    out.push(self.take_escape()?);
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
            }
        }
        Ok(out)
    }

    fn take_escape(&mut self) -> Result<char, ParseFailure> {
        let c = self.peek().ok_or(ParseFailure)?;
        match c {
            'n' => {
                self.advance();
                Ok('\n')
            }
            't' => {
                self.advance();
                Ok('\t')
            }
            'r' => {
                self.advance();
                Ok('\r')
            }
            '\\' => {
                self.advance();
                Ok('\\')
            }
            '"' => {
                self.advance();
                Ok('"')
            }
            'a' => {
                self.advance();
                Ok('\u{7}')
            }
            'b' => {
                self.advance();
                Ok('\u{8}')
            }
            'f' => {
                self.advance();
                Ok('\u{c}')
            }
            'v' => {
                self.advance();
                Ok('\u{b}')
            }
            'x' => {
                self.advance();
                let hex: String = self.rest.chars().take(2).filter(|c| c.is_ascii_hexdigit()).collect();
                if hex.is_empty() {
                    return Err(ParseFailure);
                }
                self.rest = &self.rest[hex.len()..];
                let byte = u8::from_str_radix(&hex, 16).map_err(|_| ParseFailure)?;
                Ok(byte as char)
            }
            '0'..='7' => {
                let oct: String = self.rest.chars().take(3).take_while(|c| ('0'..='7').contains(c)).collect();
                self.rest = &self.rest[oct.len()..];
                let byte = u8::from_str_radix(&oct, 8).map_err(|_| ParseFailure)?;
                Ok(byte as char)
            }
            other => {
                self.advance();
                Ok(other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator() {
        assert_eq!(MiParser::parse_line("(gdb)").unwrap(), MiRecord::Terminator);
    }

    #[test]
    fn result_record_with_token() {
        let rec = MiParser::parse_line(r#"42^done,reason="breakpoint-hit""#).unwrap();
        match rec {
            MiRecord::Result {
                token: Some(42),
                class: ResultClass::Done,
                fields,
            } => {
                assert_eq!(fields.get_const("reason").unwrap(), "breakpoint-hit");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exec_async_no_token() {
        let rec = MiParser::parse_line(r#"*running,thread-id="all""#).unwrap();
        match rec {
            MiRecord::Async {
                token: None,
                class: AsyncClass::Exec,
                name,
                fields,
            } => {
                assert_eq!(name, "running");
                assert_eq!(fields.get_const("thread-id").unwrap(), "all");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nested_tuple_and_list() {
        let rec = MiParser::parse_line(
            r#"^done,bkpt={number="1",type="breakpoint",locs=[{addr="0x1"},{addr="0x2"}]}"#,
        )
        .unwrap();
        let fields = rec.fields().unwrap();
        let bkpt = fields.get_tuple("bkpt").unwrap();
        assert_eq!(bkpt.get_const("number").unwrap(), "1");
        let locs = bkpt.get_list("locs").unwrap();
        assert_eq!(locs.len(), 2);
    }

    #[test]
    fn duplicate_keys_are_preserved() {
        let rec =
            MiParser::parse_line(r#"^done,thread-ids={thread-id="1",thread-id="2"}"#).unwrap();
        let fields = rec.fields().unwrap();
        let ids = fields.get_tuple("thread-ids").unwrap();
        let all: Vec<_> = ids.all("thread-id").map(|v| v.as_const().unwrap()).collect();
        assert_eq!(all, vec!["1", "2"]);
    }

    #[test]
    fn stream_records() {
        assert_eq!(
            MiParser::parse_line(r#"~"hello\nworld""#).unwrap(),
            MiRecord::Stream {
                kind: StreamKind::Console,
                text: "hello\nworld".to_string(),
            }
        );
        assert_eq!(
            MiParser::parse_line(r#"@"raw""#).unwrap(),
            MiRecord::Stream {
                kind: StreamKind::Target,
                text: "raw".to_string(),
            }
        );
        assert_eq!(
            MiParser::parse_line(r#"&"log line\n""#).unwrap(),
            MiRecord::Stream {
                kind: StreamKind::Log,
                text: "log line\n".to_string(),
            }
        );
    }

    #[test]
    fn c_string_escapes() {
        let rec = MiParser::parse_line(r#"~"tab\tbell\aquote\"hex\x41oct\101""#).unwrap();
        match rec {
            MiRecord::Stream { text, .. } => {
                assert_eq!(text, "tab\tbell\u{7}quote\"hexAoctA");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_line_is_reported_not_fatal() {
        let err = MiParser::parse_line("this is not mi").unwrap_err();
        assert_eq!(err.0, "this is not mi");
    }

    #[test]
    fn result_list_of_name_value_pairs() {
        let rec = MiParser::parse_line(r#"^done,register-names=[name="r0",name="r1"]"#).unwrap();
        let fields = rec.fields().unwrap();
        let names = fields.get_list("register-names").unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(
            names[0].as_tuple().unwrap().get_const("name").unwrap(),
            "r0"
        );
    }
}
