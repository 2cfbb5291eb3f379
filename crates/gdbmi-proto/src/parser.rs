//! Line parser: one raw output line in, one [`Record`] out.
//!
//! Parsing never partially applies. A line either yields a complete record
//! or a [`ParseError`] describing the first problem found.

use tracing::warn;

use crate::error::ParseError;
use crate::record::{
    AsyncKind, AsyncRecord, Record, ResultRecord, StreamKind, StreamRecord, PROMPT, RESULT_PREFIX,
};
use crate::value::{List, Named, Tuple, Value};

/// Deepest bracket/brace nesting accepted in one line.
pub const MAX_NESTING: usize = 256;

/// Parse a single output line.
///
/// Trailing `\r`/`\n` are ignored.
pub fn parse_record(line: &str) -> Result<Record, ParseError> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    if line.trim().is_empty() {
        return Err(ParseError::Blank);
    }
    if line.starts_with(PROMPT) {
        return Ok(Record::Prompt);
    }

    let mut chars = line.chars();
    if let Some(kind) = chars.next().and_then(StreamKind::from_prefix) {
        let content = strip_stream_quotes(chars.as_str());
        return StreamRecord::new(kind, content).map(Record::Stream);
    }

    parse_keyed(line)
}

/// Parse the data part of a keyed record (everything after the first comma).
///
/// Unnamed top-level values are dropped when named ones are present; a
/// non-empty sequence with no named value at all is rejected.
pub fn parse_payload(data: &str) -> Result<Tuple, ParseError> {
    let values = parse_sequence(0, data)?;
    let total = values.len();
    let named: Vec<Named> = values
        .into_iter()
        .filter_map(|value| match value {
            Value::Named(named) => Some(named),
            other => {
                warn!(kind = other.kind(), value = %other, "dropping unnamed top-level value");
                None
            }
        })
        .collect();
    if named.is_empty() && total > 0 {
        return Err(ParseError::UnnamedPayload);
    }
    Ok(Tuple::from_named(named))
}

/// Parse a single value literal such as `{a="1"}`, `["x"]` or `name="v"`.
pub fn parse_value(text: &str) -> Result<Value, ParseError> {
    let segments = split_top_level(0, text)?;
    match segments.as_slice() {
        [(offset, segment)] => parse_segment(*offset, segment),
        _ => {
            let first_len = segments.first().map_or(0, |(_, s)| s.len());
            Err(ParseError::TrailingCharacters(text[first_len..].to_string()))
        }
    }
}

fn strip_stream_quotes(content: &str) -> &str {
    let content = content.strip_prefix('"').unwrap_or(content);
    content.strip_suffix('"').unwrap_or(content)
}

fn parse_keyed(line: &str) -> Result<Record, ParseError> {
    let type_at = line
        .find(|c: char| !c.is_ascii_digit())
        .ok_or(ParseError::MissingRecordType)?;
    let token_text = &line[..type_at];
    let token = if token_text.is_empty() {
        0
    } else {
        token_text
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidToken(token_text.to_string()))?
    };

    let mut rest = line[type_at..].chars();
    let type_char = rest.next().ok_or(ParseError::MissingRecordType)?;
    let rest = rest.as_str();

    let (class, data) = match rest.split_once(',') {
        Some((class, data)) => (class, data),
        None => (rest, ""),
    };
    let class = class.trim();
    let payload = parse_payload(data)?;

    if type_char == RESULT_PREFIX {
        return ResultRecord::new(token, class, payload).map(Record::Result);
    }
    match AsyncKind::from_prefix(type_char) {
        Some(kind) => AsyncRecord::new(kind, token, class, payload).map(Record::Async),
        None => Err(ParseError::UnknownRecordType(type_char)),
    }
}

/// Tracks enclosure depth across quotes, braces and brackets.
#[derive(Default)]
struct Enclosures {
    closers: Vec<u8>,
    in_quotes: bool,
    escaped: bool,
}

impl Enclosures {
    fn step(&mut self, byte: u8, offset: usize) -> Result<(), ParseError> {
        if self.in_quotes {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_quotes = false;
            }
            return Ok(());
        }
        match byte {
            b'"' => self.in_quotes = true,
            b'{' => self.open(b'}', offset)?,
            b'[' => self.open(b']', offset)?,
            b'}' | b']' => {
                if self.closers.pop() != Some(byte) {
                    return Err(ParseError::UnbalancedEnclosure { offset });
                }
            }
            _ => {}
        }
        Ok(())
    }

    // Every entry point scans the whole text here before recursing, so this
    // bounds the recursion depth of the segment parser.
    fn open(&mut self, closer: u8, offset: usize) -> Result<(), ParseError> {
        if self.closers.len() >= MAX_NESTING {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
                offset,
            });
        }
        self.closers.push(closer);
        Ok(())
    }

    fn at_top(&self) -> bool {
        !self.in_quotes && self.closers.is_empty()
    }

    fn finish(&self, offset: usize) -> Result<(), ParseError> {
        if self.in_quotes {
            Err(ParseError::UnterminatedString)
        } else if !self.closers.is_empty() {
            Err(ParseError::UnbalancedEnclosure { offset })
        } else {
            Ok(())
        }
    }
}

/// Split on commas at depth zero. Offsets are absolute within the data.
fn split_top_level(base: usize, text: &str) -> Result<Vec<(usize, &str)>, ParseError> {
    let mut depth = Enclosures::default();
    let mut segments = Vec::new();
    let mut start = 0;
    for (i, byte) in text.bytes().enumerate() {
        if byte == b',' && depth.at_top() {
            segments.push((base + start, &text[start..i]));
            start = i + 1;
            continue;
        }
        depth.step(byte, base + i)?;
    }
    depth.finish(base + text.len())?;
    segments.push((base + start, &text[start..]));
    Ok(segments)
}

/// Parse the comma-separated contents of an enclosure. Empty text is an
/// empty sequence.
fn parse_sequence(base: usize, text: &str) -> Result<Vec<Value>, ParseError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(base, text)?
        .into_iter()
        .map(|(offset, segment)| parse_segment(offset, segment))
        .collect()
}

fn parse_segment(base: usize, segment: &str) -> Result<Value, ParseError> {
    if segment.is_empty() {
        return Err(ParseError::EmptyValue);
    }
    let name_end = segment
        .bytes()
        .position(|b| matches!(b, b'=' | b'"' | b'{' | b'['))
        .filter(|&i| segment.as_bytes()[i] == b'=');

    match name_end {
        Some(end) => {
            let name = &segment[..end];
            if name.trim().is_empty() {
                return Err(ParseError::EmptyName);
            }
            let value = parse_body(base + end + 1, &segment[end + 1..])?;
            Ok(Value::named(name, value)?)
        }
        None => parse_body(base, segment),
    }
}

fn parse_body(base: usize, body: &str) -> Result<Value, ParseError> {
    let Some(&first) = body.as_bytes().first() else {
        return Err(ParseError::EmptyValue);
    };
    match first {
        b'[' => {
            let inner = enclosed(base, body)?;
            Ok(Value::List(List::new(parse_sequence(base + 1, inner)?)))
        }
        b'{' => {
            let inner = enclosed(base, body)?;
            let entries = parse_sequence(base + 1, inner)?;
            Ok(Value::Tuple(Tuple::try_from_values(entries)?))
        }
        b'"' => Ok(Value::Const(enclosed(base, body)?.to_string())),
        _ => Ok(Value::Const(body.to_string())),
    }
}

/// Contents between the opening delimiter at index 0 and its match, which
/// must be the last byte of `body`.
fn enclosed(base: usize, body: &str) -> Result<&str, ParseError> {
    let mut depth = Enclosures::default();
    for (i, byte) in body.bytes().enumerate() {
        depth.step(byte, base + i)?;
        if depth.at_top() {
            let rest = &body[i + 1..];
            if !rest.is_empty() {
                return Err(ParseError::TrailingCharacters(rest.to_string()));
            }
            return Ok(&body[1..i]);
        }
    }
    depth.finish(base + body.len())?;
    Err(ParseError::UnbalancedEnclosure {
        offset: base + body.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(line: &str) -> ResultRecord {
        match parse_record(line).unwrap() {
            Record::Result(record) => record,
            other => panic!("expected result record, got {other:?}"),
        }
    }

    fn async_record(line: &str) -> AsyncRecord {
        match parse_record(line).unwrap() {
            Record::Async(record) => record,
            other => panic!("expected async record, got {other:?}"),
        }
    }

    #[test]
    fn prompt_line() {
        assert_eq!(parse_record("(gdb)").unwrap(), Record::Prompt);
        assert_eq!(parse_record("(gdb) \n").unwrap(), Record::Prompt);
    }

    #[test]
    fn blank_lines_are_rejected() {
        assert_eq!(parse_record("").unwrap_err(), ParseError::Blank);
        assert_eq!(parse_record("  \r\n").unwrap_err(), ParseError::Blank);
    }

    #[test]
    fn stream_strips_prefix_and_one_quote_pair() {
        let record = parse_record(r#"~"Hello\n""#).unwrap();
        let Record::Stream(stream) = record else {
            panic!("expected stream");
        };
        assert_eq!(stream.kind(), StreamKind::Console);
        assert_eq!(stream.content(), r"Hello\n");
        assert_eq!(stream.unescaped(), "Hello\n");
    }

    #[test]
    fn stream_without_quotes_keeps_text() {
        let Record::Stream(stream) = parse_record("~~~console text output~~").unwrap() else {
            panic!("expected stream");
        };
        assert_eq!(stream.content(), "~~console text output~~");
    }

    #[test]
    fn stream_kinds_by_prefix() {
        let kinds: Vec<StreamKind> = [r#"~"a""#, r#"@"b""#, r#"&"c""#]
            .iter()
            .map(|line| match parse_record(line).unwrap() {
                Record::Stream(s) => s.kind(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![StreamKind::Console, StreamKind::Target, StreamKind::Log]
        );
    }

    #[test]
    fn empty_stream_is_rejected() {
        assert_eq!(parse_record(r#"&"""#).unwrap_err(), ParseError::EmptyStream);
        assert_eq!(parse_record("@").unwrap_err(), ParseError::EmptyStream);
    }

    #[test]
    fn simple_result() {
        let record = result(r#"^done,value="0xefffeb7c""#);
        assert_eq!(record.token(), 0);
        assert_eq!(record.class(), "done");
        assert_eq!(record.payload().len(), 1);
        assert_eq!(
            record.payload().get("value"),
            Some(&Value::constant("0xefffeb7c"))
        );
    }

    #[test]
    fn exec_stopped_notification() {
        let record = async_record(r#"*stopped,reason="breakpoint-hit",bkptno="1""#);
        assert_eq!(record.kind(), AsyncKind::Exec);
        assert_eq!(record.token(), 0);
        assert_eq!(record.class(), "stopped");
        let keys: Vec<&str> = record.payload().keys().collect();
        assert_eq!(keys, vec!["reason", "bkptno"]);
        assert_eq!(
            record.payload().get("reason"),
            Some(&Value::constant("breakpoint-hit"))
        );
    }

    #[test]
    fn status_and_notify_kinds() {
        assert_eq!(async_record(r#"+status,reason="r""#).kind(), AsyncKind::Status);
        assert_eq!(
            async_record(r#"=thread-group-added,id="i1""#).kind(),
            AsyncKind::Notify
        );
    }

    #[test]
    fn class_without_data() {
        let record = result("^running");
        assert_eq!(record.class(), "running");
        assert!(record.payload().is_empty());
    }

    #[test]
    fn token_boundaries() {
        assert_eq!(result("42^done").token(), 42);
        assert_eq!(result(&format!("{}^done", u32::MAX)).token(), u32::MAX);
        assert_eq!(
            parse_record("4294967296^done").unwrap_err(),
            ParseError::InvalidToken("4294967296".into())
        );
    }

    #[test]
    fn unknown_and_missing_type() {
        assert_eq!(
            parse_record("12!done").unwrap_err(),
            ParseError::UnknownRecordType('!')
        );
        assert_eq!(parse_record("1234").unwrap_err(), ParseError::MissingRecordType);
    }

    #[test]
    fn empty_class_is_rejected() {
        assert_eq!(parse_record("^").unwrap_err(), ParseError::EmptyClass);
        assert_eq!(
            parse_record(r#"*,reason="x""#).unwrap_err(),
            ParseError::EmptyClass
        );
    }

    #[test]
    fn list_of_constants_round_trips() {
        let line = r#"^done,features=["frozen-varobjs","pending-breakpoints","thread-info"]"#;
        let record = parse_record(line).unwrap();
        let features = record.payload().unwrap().get("features").unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features.by_index(2).unwrap(), &Value::constant("thread-info"));
        assert_eq!(record.to_string(), line);
    }

    #[test]
    fn list_of_tuples() {
        let record = result(
            r#"^done,groups=[{id="17",type="process",pid="yyy",num_children="2"},{id="18",type="process"}]"#,
        );
        let groups = record.payload().get("groups").unwrap();
        assert_eq!(groups.len(), 2);
        let first = groups.by_index(0).unwrap();
        assert!(matches!(first, Value::Tuple(_)));
        assert_eq!(first.by_key("id").unwrap(), &Value::constant("17"));
        assert_eq!(first.by_key("num_children").unwrap(), &Value::constant("2"));
    }

    #[test]
    fn list_of_named_tuples_keeps_names() {
        let record = result(concat!(
            r#"^done,asm_insns=[src_and_asm_line={line="31",file="/tmp/basics.c","#,
            r#"line_asm_insn=[{address="0x08048410",func-name="main",offset="4",inst="mov"}]},"#,
            r#"src_and_asm_line={line="32",file="/tmp/basics.c",line_asm_insn=[]}]"#
        ));
        let insns = record.payload().get("asm_insns").unwrap();
        assert_eq!(insns.len(), 2);
        for element in insns.children() {
            let named = element.as_named().expect("named element");
            assert_eq!(named.name(), "src_and_asm_line");
        }
        let second = insns.by_index(1).unwrap();
        assert_eq!(second.by_key("line").unwrap(), &Value::constant("32"));
        assert!(second.by_key("line_asm_insn").unwrap().is_empty());
    }

    #[test]
    fn duplicate_top_level_names_last_wins() {
        let record = async_record(concat!(
            r#"*stopped,reason="signal - received",signal-name="SIGSEGV","#,
            r#"reason="signal - received",signal-name="SIGSEGV","#,
            r#"reason="exited - signalled",signal-name="SIGSEGV",signal-meaning="Segmentation fault""#
        ));
        assert_eq!(record.payload().len(), 3);
        assert_eq!(
            record.payload().get("reason"),
            Some(&Value::constant("exited - signalled"))
        );
    }

    #[test]
    fn duplicate_names_inside_nested_tuple_collapse() {
        let value = parse_value(r#"{a="1",b="2",a="3"}"#).unwrap();
        assert_eq!(value.len(), 2);
        assert_eq!(value.by_key("a").unwrap(), &Value::constant("3"));
    }

    // Quirk kept for compatibility: unnamed siblings vanish next to named ones.
    #[test]
    fn unnamed_top_level_siblings_are_dropped() {
        let record = result(r#"^done,"stray",value="1""#);
        assert_eq!(record.payload().len(), 1);
        assert_eq!(record.payload().get("value"), Some(&Value::constant("1")));
    }

    #[test]
    fn only_unnamed_top_level_is_rejected() {
        assert_eq!(
            parse_record(r#"^done,"a","b""#).unwrap_err(),
            ParseError::UnnamedPayload
        );
    }

    #[test]
    fn unnamed_tuple_entry_is_rejected() {
        assert_eq!(
            parse_record(r#"^done,x={"a"}"#).unwrap_err(),
            ParseError::UnnamedTupleEntry
        );
    }

    #[test]
    fn commas_and_brackets_inside_quotes_are_literal() {
        let record = result(r#"^done,msg="a,b]{c",next="2""#);
        assert_eq!(record.payload().get("msg"), Some(&Value::constant("a,b]{c")));
        assert_eq!(record.payload().get("next"), Some(&Value::constant("2")));
    }

    #[test]
    fn escaped_quotes_stay_raw() {
        let line = r#"^error,msg="No symbol \"foo\" in current context.""#;
        let record = result(line);
        assert_eq!(
            record.payload().get("msg").unwrap().as_str(),
            Some(r#"No symbol \"foo\" in current context."#)
        );
        assert_eq!(
            record.error_message().as_deref(),
            Some(r#"No symbol "foo" in current context."#)
        );
        assert_eq!(Record::Result(record).to_string(), line);
    }

    #[test]
    fn unbalanced_input_is_rejected() {
        assert!(matches!(
            parse_record(r#"^done,a={b="1""#).unwrap_err(),
            ParseError::UnbalancedEnclosure { .. }
        ));
        assert!(matches!(
            parse_record(r#"^done,a=["1"}"#).unwrap_err(),
            ParseError::UnbalancedEnclosure { .. }
        ));
        assert_eq!(
            parse_record(r#"^done,a="1"#).unwrap_err(),
            ParseError::UnterminatedString
        );
    }

    #[test]
    fn unbalanced_offset_points_at_closer() {
        assert_eq!(
            parse_payload(r#"a="1"]"#).unwrap_err(),
            ParseError::UnbalancedEnclosure { offset: 5 }
        );
    }

    #[test]
    fn nesting_at_limit_is_accepted() {
        let line = format!(
            "^done,a={}{}",
            "[".repeat(MAX_NESTING),
            "]".repeat(MAX_NESTING)
        );
        let record = result(&line);
        assert_eq!(record.payload().len(), 1);
    }

    #[test]
    fn nesting_past_limit_is_rejected() {
        let line = format!(
            "^done,a={}{}",
            "[".repeat(MAX_NESTING + 1),
            "]".repeat(MAX_NESTING + 1)
        );
        assert_eq!(
            parse_record(&line).unwrap_err(),
            ParseError::TooDeep {
                limit: MAX_NESTING,
                offset: 2 + MAX_NESTING
            }
        );
    }

    #[test]
    fn very_deep_line_is_rejected_without_recursing() {
        let line = format!("^done,a={}{}", "{x=".repeat(100_000), "}".repeat(100_000));
        assert!(matches!(
            parse_record(&line).unwrap_err(),
            ParseError::TooDeep { .. }
        ));
        assert!(matches!(
            parse_value(&"[".repeat(100_000)).unwrap_err(),
            ParseError::TooDeep { .. }
        ));
    }

    #[test]
    fn class_whitespace_is_trimmed() {
        let record = result(r#"^done ,x="1""#);
        assert_eq!(record.class(), "done");
        assert_eq!(Record::Result(record).to_string(), r#"^done,x="1""#);
        assert_eq!(parse_record("^ ,x=\"1\"").unwrap_err(), ParseError::EmptyClass);
    }

    #[test]
    fn empty_values_and_names_are_rejected() {
        assert_eq!(parse_record("^done,a=").unwrap_err(), ParseError::EmptyValue);
        assert_eq!(
            parse_record(r#"^done,a="1",,b="2""#).unwrap_err(),
            ParseError::EmptyValue
        );
        assert_eq!(
            parse_record(r#"^done,="1""#).unwrap_err(),
            ParseError::EmptyName
        );
    }

    #[test]
    fn trailing_characters_after_value() {
        assert_eq!(
            parse_record(r#"^done,a="1"x"#).unwrap_err(),
            ParseError::TrailingCharacters("x".into())
        );
        assert_eq!(
            parse_value(r#""a","b""#).unwrap_err(),
            ParseError::TrailingCharacters(r#","b""#.into())
        );
    }

    #[test]
    fn empty_enclosures() {
        let record = result("^done,a=[],b={}");
        assert_eq!(record.payload().get("a"), Some(&Value::List(List::default())));
        assert_eq!(record.payload().get("b"), Some(&Value::Tuple(Tuple::new())));
    }

    #[test]
    fn parsing_is_deterministic() {
        let line = r#"=breakpoint-modified,bkpt={number="1",thread-groups=["i1"],times="1"}"#;
        assert_eq!(parse_record(line).unwrap(), parse_record(line).unwrap());
    }

    #[test]
    fn nested_values_round_trip() {
        let line = concat!(
            r#"*stopped,reason="breakpoint-hit",frame={addr="0x08048564",func="main","#,
            r#"args=[{name="argc",value="1"},{name="argv",value="0xbfc4d4d4"}],line="68"}"#
        );
        assert_eq!(parse_record(line).unwrap().to_string(), line);
    }

    #[test]
    fn crlf_is_trimmed() {
        assert_eq!(result("5^done\r\n").token(), 5);
    }
}
