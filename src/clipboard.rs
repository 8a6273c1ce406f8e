//! Clipboard payloads
//!
//! The clipboard carries a sequence of element descriptions as JSON text. The
//! transport itself is a collaborator ([`Clipboard`]); the core only decides
//! whether a payload can be accepted and turns it into live elements.

use serde::{Deserialize, Serialize};

use crate::elements::{Element, Owner};
use crate::errors::EditError;

/// Logical clipboard content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub format: String,
    pub items: Vec<Element>,
}

impl ClipboardPayload {
    /// Format marker written into every payload
    pub const FORMAT: &'static str = "treeline/elements";

    pub fn from_elements(items: Vec<Element>) -> Self {
        Self {
            format: Self::FORMAT.to_string(),
            items,
        }
    }

    pub fn to_text(&self) -> Result<String, EditError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse clipboard text. Fails on malformed JSON or a foreign format.
    pub fn from_text(text: &str) -> Result<Self, EditError> {
        let payload: Self = serde_json::from_str(text)?;
        if payload.format != Self::FORMAT {
            return Err(EditError::Deserialization(format!(
                "unsupported clipboard format '{}'",
                payload.format
            )));
        }
        Ok(payload)
    }

    /// Whether every item, and everything nested in it, is a statement
    pub fn can_accept(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.ensure_statements().is_ok())
    }

    /// Live, detached copies of the items with fresh ids
    pub fn materialize(&self) -> Result<Vec<Element>, EditError> {
        self.items
            .iter()
            .map(|item| {
                item.ensure_statements()?;
                let mut element = item.clone();
                element.reidentify();
                element.relink(Owner::Detached);
                Ok(element)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Clipboard transport
pub trait Clipboard {
    fn read(&self) -> Option<String>;
    fn write(&mut self, text: String);
}

/// Process-local clipboard
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for MemoryClipboard {
    fn read(&self) -> Option<String> {
        self.contents.clone()
    }

    fn write(&mut self, text: String) {
        self.contents = Some(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Expr;

    #[test]
    fn test_text_round_trip_keeps_shape() {
        let payload = ClipboardPayload::from_elements(vec![
            Element::comment("first"),
            Element::block(vec![Element::print(Expr::lit(1)), Element::wait(3)]),
        ]);

        let text = payload.to_text().unwrap();
        let mut parsed = ClipboardPayload::from_text(&text).unwrap();
        for item in &mut parsed.items {
            item.relink(Owner::Detached);
        }

        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_foreign_format_is_rejected() {
        let text = r#"{"format": "other/thing", "items": []}"#;
        assert!(matches!(
            ClipboardPayload::from_text(text),
            Err(EditError::Deserialization(_))
        ));
    }

    #[test]
    fn test_malformed_text_is_rejected() {
        assert!(matches!(
            ClipboardPayload::from_text("not json at all"),
            Err(EditError::Deserialization(_))
        ));
    }

    #[test]
    fn test_can_accept_requires_statements_everywhere() {
        let good = ClipboardPayload::from_elements(vec![Element::comment("ok")]);
        assert!(good.can_accept());

        let top = ClipboardPayload::from_elements(vec![
            Element::comment("ok"),
            Element::expression(Expr::lit(1)),
        ]);
        assert!(!top.can_accept());

        let nested = ClipboardPayload::from_elements(vec![Element::block(vec![
            Element::expression(Expr::lit(1)),
        ])]);
        assert!(!nested.can_accept());

        assert!(!ClipboardPayload::from_elements(vec![]).can_accept());
    }

    #[test]
    fn test_materialize_gives_fresh_ids() {
        let block = Element::block(vec![Element::comment("inner")]);
        let payload = ClipboardPayload::from_elements(vec![block.clone()]);

        let first = payload.materialize().unwrap();
        let second = payload.materialize().unwrap();

        assert_eq!(first.len(), 1);
        assert_ne!(first[0].id, block.id);
        assert_ne!(first[0].id, second[0].id);
        assert_eq!(first[0].kind.name(), "block");
        assert_eq!(first[0].parent(), Owner::Detached);
    }

    #[test]
    fn test_memory_clipboard() {
        let mut clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.read(), None);
        clipboard.write("hello".to_string());
        assert_eq!(clipboard.read().as_deref(), Some("hello"));
    }
}
