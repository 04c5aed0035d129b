//! Minimal XML-RPC codec: enough of the format to call an Odoo server.

use std::collections::BTreeMap;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::remote::error::RemoteError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    Base64(String),
    DateTime(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    fn write(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(i) => {
                out.push_str("<int>");
                out.push_str(&i.to_string());
                out.push_str("</int>");
            }
            Value::Bool(b) => {
                out.push_str(if *b {
                    "<boolean>1</boolean>"
                } else {
                    "<boolean>0</boolean>"
                });
            }
            Value::Double(d) => {
                out.push_str("<double>");
                out.push_str(&d.to_string());
                out.push_str("</double>");
            }
            Value::String(s) => {
                out.push_str("<string>");
                out.push_str(&escape(s.as_str()));
                out.push_str("</string>");
            }
            Value::Base64(s) => {
                out.push_str("<base64>");
                out.push_str(s);
                out.push_str("</base64>");
            }
            Value::DateTime(s) => {
                out.push_str("<dateTime.iso8601>");
                out.push_str(&escape(s.as_str()));
                out.push_str("</dateTime.iso8601>");
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    out.push_str("<member><name>");
                    out.push_str(&escape(name.as_str()));
                    out.push_str("</name>");
                    value.write(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(members: BTreeMap<String, Value>) -> Self {
        Value::Struct(members)
    }
}

pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        param.write(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
}

fn tokenize(xml: &str) -> Result<Vec<Token>, RemoteError> {
    let mut reader = Reader::from_str(xml);
    let mut tokens = Vec::new();
    let mut text = String::new();

    let flush = |text: &mut String, tokens: &mut Vec<Token>| {
        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(text)));
        }
    };

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                flush(&mut text, &mut tokens);
                tokens.push(Token::Open(local_name(e.local_name().as_ref())));
            }
            Event::End(ref e) => {
                flush(&mut text, &mut tokens);
                tokens.push(Token::Close(local_name(e.local_name().as_ref())));
            }
            Event::Empty(ref e) => {
                flush(&mut text, &mut tokens);
                tokens.push(Token::Empty(local_name(e.local_name().as_ref())));
            }
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|e| RemoteError::Protocol(format!("Bad text: {}", e)))?;
                text.push_str(&decoded);
            }
            Event::CData(e) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(&e).to_string();
                text.push(resolve_entity(&name)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    flush(&mut text, &mut tokens);

    Ok(tokens)
}

fn local_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

fn resolve_entity(name: &str) -> Result<char, RemoteError> {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name
            .strip_prefix("#x")
            .map(|hex| u32::from_str_radix(hex, 16).ok())
            .or_else(|| name.strip_prefix('#').map(|dec| dec.parse::<u32>().ok()))
            .flatten()
            .and_then(char::from_u32),
    };
    resolved.ok_or_else(|| RemoteError::Protocol(format!("Unknown entity &{};", name)))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Skips whitespace between elements.
    fn skip_space(&mut self) {
        while let Some(Token::Text(t)) = self.peek() {
            if t.trim().is_empty() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn expect_open(&mut self, name: &str) -> Result<(), RemoteError> {
        self.skip_space();
        match self.next() {
            Some(Token::Open(n)) if n == name => Ok(()),
            other => Err(unexpected(name, other)),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<(), RemoteError> {
        self.skip_space();
        match self.next() {
            Some(Token::Close(n)) if n == name => Ok(()),
            other => Err(unexpected(&format!("/{}", name), other)),
        }
    }

    fn text_until_close(&mut self, name: &str) -> Result<String, RemoteError> {
        let text = match self.peek() {
            Some(Token::Text(t)) => {
                let t = t.clone();
                self.pos += 1;
                t
            }
            _ => String::new(),
        };
        match self.next() {
            Some(Token::Close(n)) if n == name => Ok(text),
            other => Err(unexpected(&format!("/{}", name), other)),
        }
    }

    fn value(&mut self) -> Result<Value, RemoteError> {
        self.expect_open("value")?;

        // An untyped value is a string and keeps its whitespace.
        if let Some(Token::Text(_)) | Some(Token::Close(_)) = self.peek() {
            let save = self.pos;
            let text = match self.peek() {
                Some(Token::Text(t)) => {
                    let t = t.clone();
                    self.pos += 1;
                    t
                }
                _ => String::new(),
            };
            if let Some(Token::Close(n)) = self.peek() {
                if n == "value" {
                    self.pos += 1;
                    return Ok(Value::String(text));
                }
            }
            self.pos = save;
        }

        self.skip_space();
        let value = match self.next() {
            Some(Token::Empty(tag)) => match tag.as_str() {
                "nil" => Value::Nil,
                "string" => Value::String(String::new()),
                "array" => Value::Array(Vec::new()),
                "struct" => Value::Struct(BTreeMap::new()),
                other => return Err(RemoteError::Protocol(format!("Empty <{}/> value", other))),
            },
            Some(Token::Open(tag)) => match tag.as_str() {
                "int" | "i4" | "i8" => {
                    let text = self.text_until_close(&tag)?;
                    Value::Int(text.trim().parse().map_err(|_| {
                        RemoteError::Protocol(format!("Invalid integer '{}'", text))
                    })?)
                }
                "boolean" => match self.text_until_close(&tag)?.trim() {
                    "1" => Value::Bool(true),
                    "0" => Value::Bool(false),
                    other => {
                        return Err(RemoteError::Protocol(format!("Invalid boolean '{}'", other)))
                    }
                },
                "double" => {
                    let text = self.text_until_close(&tag)?;
                    Value::Double(text.trim().parse().map_err(|_| {
                        RemoteError::Protocol(format!("Invalid double '{}'", text))
                    })?)
                }
                "string" => Value::String(self.text_until_close(&tag)?),
                "base64" => Value::Base64(self.text_until_close(&tag)?.trim().to_string()),
                "dateTime.iso8601" => Value::DateTime(self.text_until_close(&tag)?),
                "array" => self.array()?,
                "struct" => self.structure()?,
                other => return Err(RemoteError::Protocol(format!("Unknown value type <{}>", other))),
            },
            other => return Err(unexpected("value type", other)),
        };

        self.expect_close("value")?;
        Ok(value)
    }

    fn array(&mut self) -> Result<Value, RemoteError> {
        self.skip_space();
        let mut items = Vec::new();
        match self.next() {
            Some(Token::Empty(n)) if n == "data" => {}
            Some(Token::Open(n)) if n == "data" => loop {
                self.skip_space();
                match self.peek() {
                    Some(Token::Close(n)) if n == "data" => {
                        self.pos += 1;
                        break;
                    }
                    _ => items.push(self.value()?),
                }
            },
            other => return Err(unexpected("data", other)),
        }
        self.expect_close("array")?;
        Ok(Value::Array(items))
    }

    fn structure(&mut self) -> Result<Value, RemoteError> {
        let mut members = BTreeMap::new();
        loop {
            self.skip_space();
            match self.peek() {
                Some(Token::Close(n)) if n == "struct" => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    self.expect_open("member")?;
                    self.expect_open("name")?;
                    let name = self.text_until_close("name")?;
                    let value = self.value()?;
                    self.expect_close("member")?;
                    members.insert(name, value);
                }
            }
        }
        Ok(Value::Struct(members))
    }
}

fn unexpected(wanted: &str, got: Option<Token>) -> RemoteError {
    RemoteError::Protocol(format!("Expected <{}>, found {:?}", wanted, got))
}

/// Parses a `methodResponse`, turning a `<fault>` into [`RemoteError::Fault`].
pub fn parse_response(xml: &str) -> Result<Value, RemoteError> {
    let tokens = tokenize(xml)?;
    let mut parser = Parser::new(tokens);

    parser.expect_open("methodResponse")?;
    parser.skip_space();
    match parser.next() {
        Some(Token::Open(n)) if n == "params" => {
            parser.expect_open("param")?;
            let value = parser.value()?;
            parser.expect_close("param")?;
            parser.expect_close("params")?;
            Ok(value)
        }
        Some(Token::Open(n)) if n == "fault" => {
            let value = parser.value()?;
            let members = value
                .as_struct()
                .ok_or_else(|| RemoteError::Protocol("Fault is not a struct".to_string()))?;
            Err(RemoteError::Fault {
                code: members
                    .get("faultCode")
                    .and_then(Value::as_i64)
                    .unwrap_or_default(),
                message: members
                    .get("faultString")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        }
        other => Err(unexpected("params", other)),
    }
}
