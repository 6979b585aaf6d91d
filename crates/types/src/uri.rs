//! Canonical WBEM URI rendering and parsing for CIM object paths.
//!
//! The renderer produces `//host/namespace:Class.key1="v1",key2=42` with
//! keybindings sorted case-insensitively by name. The parser inverts the
//! renderer for the untyped value grammar: double-quoted strings,
//! single-quoted nested instance paths, bare integers, reals, and
//! booleans.

use crate::{CimClassName, CimInstanceName, CimValue, ModelError, Result};

fn fold(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

fn push_prefix(out: &mut String, host: Option<&str>, namespace: Option<&str>) {
    if let Some(host) = host {
        out.push_str("//");
        out.push_str(host);
        out.push('/');
    }
    if let Some(namespace) = namespace {
        out.push_str(namespace);
        out.push(':');
    }
}

fn push_quoted(out: &mut String, quote: char, raw: &str) {
    out.push(quote);
    for c in raw.chars() {
        if c == quote || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(quote);
}

fn push_keybinding_value(out: &mut String, value: &CimValue) {
    match value {
        CimValue::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        CimValue::Reference(path) => push_quoted(out, '\'', &instance_name_to_uri(path)),
        CimValue::String(_) | CimValue::Char16(_) | CimValue::DateTime(_) => {
            // unwrap is fine: these variants always have a text form
            push_quoted(out, '"', &value.text().unwrap());
        }
        CimValue::Array(_) => {
            // not a legal keybinding value; render a placeholder rather
            // than panic in a Display path
            out.push_str("\"\"");
        }
        other => out.push_str(&other.text().unwrap_or_default()),
    }
}

pub(crate) fn instance_name_to_uri(name: &CimInstanceName) -> String {
    let mut out = String::new();
    push_prefix(
        &mut out,
        name.host.as_deref(),
        name.namespace.as_deref(),
    );
    out.push_str(&name.classname);

    let mut bindings: Vec<(&str, &CimValue)> = name.keybindings.iter().collect();
    bindings.sort_by_key(|(k, _)| fold(k));
    for (i, (key, value)) in bindings.into_iter().enumerate() {
        out.push(if i == 0 { '.' } else { ',' });
        out.push_str(key);
        out.push('=');
        push_keybinding_value(&mut out, value);
    }
    out
}

pub(crate) fn class_name_to_uri(name: &CimClassName) -> String {
    let mut out = String::new();
    push_prefix(
        &mut out,
        name.host.as_deref(),
        name.namespace.as_deref(),
    );
    out.push_str(&name.classname);
    out
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn fail(&self, reason: &'static str) -> ModelError {
        ModelError::UriParse {
            position: self.pos,
            reason,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            _ => Err(self.fail("unexpected character")),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn identifier(&mut self) -> Result<&'a str> {
        let id = self.take_while(|c| c.is_alphanumeric() || c == '_');
        if id.is_empty() {
            Err(self.fail("expected an identifier"))
        } else {
            Ok(id)
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String> {
        self.eat(quote)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.fail("unterminated quoted value")),
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err(self.fail("unterminated escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }
}

fn parse_prefix(scanner: &mut Scanner<'_>) -> Result<(Option<String>, Option<String>)> {
    let host = if scanner.rest().starts_with("//") {
        scanner.bump();
        scanner.bump();
        let host = scanner.take_while(|c| c != '/');
        if host.is_empty() {
            return Err(scanner.fail("empty host"));
        }
        scanner.eat('/')?;
        Some(host.to_string())
    } else {
        None
    };

    // a ':' ahead of the first '.' separates the namespace from the class
    let rest = scanner.rest();
    let namespace = match (rest.find(':'), rest.find('.')) {
        (Some(colon), dot) if dot.map_or(true, |d| colon < d) => {
            let ns = &rest[..colon];
            if ns.is_empty() {
                return Err(scanner.fail("empty namespace"));
            }
            scanner.pos += colon + 1;
            Some(ns.to_string())
        }
        _ => None,
    };

    Ok((host, namespace))
}

fn parse_keybinding_value(scanner: &mut Scanner<'_>) -> Result<CimValue> {
    match scanner.peek() {
        Some('"') => Ok(CimValue::String(scanner.quoted('"')?)),
        Some('\'') => {
            let inner = scanner.quoted('\'')?;
            let path = instance_name_from_uri(&inner)?;
            Ok(CimValue::Reference(Box::new(path)))
        }
        Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => {
            let literal = scanner.take_while(|c| c != ',');
            if literal.contains(['.', 'e', 'E']) {
                literal
                    .parse::<f64>()
                    .map(CimValue::Real64)
                    .map_err(|_| scanner.fail("malformed real keybinding"))
            } else if literal.starts_with('-') {
                literal
                    .parse::<i64>()
                    .map(CimValue::Sint64)
                    .map_err(|_| scanner.fail("malformed integer keybinding"))
            } else {
                literal
                    .trim_start_matches('+')
                    .parse::<u64>()
                    .map(CimValue::Uint64)
                    .map_err(|_| scanner.fail("malformed integer keybinding"))
            }
        }
        Some(_) => {
            let word = scanner.take_while(|c| c != ',');
            if word.eq_ignore_ascii_case("true") {
                Ok(CimValue::Boolean(true))
            } else if word.eq_ignore_ascii_case("false") {
                Ok(CimValue::Boolean(false))
            } else {
                Err(scanner.fail("unrecognized keybinding value"))
            }
        }
        None => Err(scanner.fail("missing keybinding value")),
    }
}

pub(crate) fn instance_name_from_uri(input: &str) -> Result<CimInstanceName> {
    let mut scanner = Scanner::new(input);
    let (host, namespace) = parse_prefix(&mut scanner)?;
    let classname = scanner.identifier()?.to_string();

    let mut name = CimInstanceName {
        classname,
        keybindings: Default::default(),
        namespace,
        host,
    };

    if scanner.peek().is_none() {
        return Ok(name);
    }
    scanner.eat('.')?;
    loop {
        let key = scanner.identifier()?.to_string();
        scanner.eat('=')?;
        let value = parse_keybinding_value(&mut scanner)?;
        name.keybindings.insert(key, value);
        match scanner.bump() {
            None => return Ok(name),
            Some(',') => continue,
            Some(_) => return Err(scanner.fail("expected ',' between keybindings")),
        }
    }
}
