//! A lightweight owned element tree over the quick-xml event stream.
//!
//! CIM-XML payloads are small enough to materialize; a tree makes the
//! typed extraction walkers in `read` straightforward and keeps the
//! syntax/schema error distinction clean: everything that fails here is
//! an XML syntax error, everything that fails in the walkers is a
//! schema violation.

use crate::{CodecError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, Default)]
pub(crate) struct Elem {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Elem>,
    pub text: String,
}

impl Elem {
    /// Attribute by exact name; XML attribute names are case-sensitive.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn require_attr(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| {
            CodecError::schema(format!("{} element lacks {name} attribute", self.name))
        })
    }

    pub fn child(&self, name: &str) -> Option<&Elem> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn require_child(&self, name: &str) -> Result<&Elem> {
        self.child(name).ok_or_else(|| {
            CodecError::schema(format!("{} element lacks {name} child", self.name))
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Elem> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// The single child of an element whose content model is a choice,
    /// e.g. `VALUE.REFERENCE` or `OBJECTPATH`.
    pub fn only_child(&self) -> Result<&Elem> {
        match self.children.as_slice() {
            [child] => Ok(child),
            _ => Err(CodecError::schema(format!(
                "{} element must have exactly one child",
                self.name
            ))),
        }
    }
}

fn start_to_elem(start: &quick_xml::events::BytesStart<'_>) -> Result<Elem> {
    let name = String::from_utf8(start.name().as_ref().to_vec())
        .map_err(|e| CodecError::Syntax(e.to_string()))?;
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CodecError::Syntax(e.to_string()))?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())
            .map_err(|e| CodecError::Syntax(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| CodecError::Syntax(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Elem {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

/// Parses a document into its root element.
pub(crate) fn parse_tree(xml: &str) -> Result<Elem> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Elem> = Vec::new();
    let mut root: Option<Elem> = None;

    fn attach(stack: &mut Vec<Elem>, root: &mut Option<Elem>, elem: Elem) -> Result<()> {
        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(elem);
                Ok(())
            }
            None if root.is_none() => {
                *root = Some(elem);
                Ok(())
            }
            None => Err(CodecError::Syntax(
                "multiple top-level elements".to_string(),
            )),
        }
    }

    loop {
        match reader.read_event() {
            Err(e) => return Err(CodecError::Syntax(e.to_string())),
            Ok(Event::Start(start)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(CodecError::Syntax(
                        "multiple top-level elements".to_string(),
                    ));
                }
                stack.push(start_to_elem(&start)?);
            }
            Ok(Event::Empty(start)) => {
                let elem = start_to_elem(&start)?;
                attach(&mut stack, &mut root, elem)?;
            }
            Ok(Event::End(_)) => {
                // quick-xml validates tag nesting, so the stack is nonempty
                let elem = stack
                    .pop()
                    .ok_or_else(|| CodecError::Syntax("unexpected end tag".to_string()))?;
                attach(&mut stack, &mut root, elem)?;
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| CodecError::Syntax(e.to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(CodecError::Syntax(
                            "text content outside the document element".to_string(),
                        ))
                    }
                }
            }
            Ok(Event::CData(data)) => {
                let text = String::from_utf8(data.into_inner().into_owned())
                    .map_err(|e| CodecError::Syntax(e.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&text);
                }
            }
            Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
        }
    }

    if !stack.is_empty() {
        return Err(CodecError::Syntax("unclosed element".to_string()));
    }
    root.ok_or_else(|| CodecError::Syntax("empty document".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements() {
        let root = parse_tree(r#"<A X="1"><B/><B Y="2">text</B></A>"#).unwrap();
        assert_eq!(root.name, "A");
        assert_eq!(root.attr("X"), Some("1"));
        assert_eq!(root.children_named("B").count(), 2);
        assert_eq!(root.children[1].text, "text");
        assert_eq!(root.children[1].attr("Y"), Some("2"));
    }

    #[test]
    fn unescapes_text_and_attributes() {
        let root = parse_tree(r#"<A X="a&amp;b">1 &lt; 2</A>"#).unwrap();
        assert_eq!(root.attr("X"), Some("a&b"));
        assert_eq!(root.text, "1 < 2");
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(parse_tree("<A><B></A>").is_err());
        assert!(parse_tree("<A>").is_err());
        assert!(parse_tree("").is_err());
        assert!(matches!(
            parse_tree("<A attr=oops/>"),
            Err(CodecError::Syntax(_))
        ));
    }

    #[test]
    fn whitespace_between_elements_ignored() {
        let root = parse_tree("<A>\n  <B/>\n</A>").unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.text.trim(), "");
    }
}
