//! Per-parse session state and its scoped binding
//!
//! All mutable parse state lives in a [`ParseSession`]: the active token
//! set, the link-definition table, the footnote-definition table and the
//! footnote reference order. A session is bound to the current thread for
//! the duration of one parse operation via [`bind`]; the returned guard
//! unbinds it on every exit path, panics included, so no state leaks into
//! a later, differently-configured parse. There is no shared global:
//! independent parses on separate threads each bind their own session and
//! need no synchronization. A single session must not be driven from two
//! threads at once.
//!
//! Tokenizer internals resolve the active session through short-lived
//! borrows ([`with_active`]); the borrow is never held across a nested
//! tokenizer call, which keeps quote/list recursion re-entrant.

pub mod registry;

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::document::{FootnoteDef, LinkDef};
use crate::ast::span::InlineContent;
use registry::TokenSet;

/// Scoped mutable state for one parse operation.
#[derive(Debug, Clone)]
pub struct ParseSession {
    tokens: Arc<TokenSet>,
    link_definitions: HashMap<String, LinkDef>,
    footnotes: Vec<FootnoteDef>,
    footnote_order: Vec<String>,
}

impl ParseSession {
    pub fn new(tokens: TokenSet) -> Self {
        Self {
            tokens: Arc::new(tokens),
            link_definitions: HashMap::new(),
            footnotes: Vec::new(),
            footnote_order: Vec::new(),
        }
    }

    /// The active token set.
    pub fn tokens(&self) -> Arc<TokenSet> {
        self.tokens.clone()
    }

    /// Clear the reference tables so the session can be reused for
    /// another input with the same token set.
    pub fn reset(&mut self) {
        self.link_definitions.clear();
        self.footnotes.clear();
        self.footnote_order.clear();
    }

    /// Record a link definition. Keys are pre-normalized; the first
    /// definition for a key wins and later duplicates are ignored.
    pub(crate) fn add_link_definition(&mut self, key: String, def: LinkDef) {
        self.link_definitions.entry(key).or_insert(def);
    }

    pub(crate) fn link_definition(&self, key: &str) -> Option<LinkDef> {
        self.link_definitions.get(key).cloned()
    }

    /// Record a footnote definition; the first definition for a label
    /// wins and later duplicates are ignored.
    pub(crate) fn add_footnote(&mut self, def: FootnoteDef) {
        if !self.footnotes.iter().any(|d| d.label == def.label) {
            self.footnotes.push(def);
        }
    }

    /// Resolve a footnote reference, assigning the next reference-order
    /// number at the first sighting of a label. Unknown labels resolve to
    /// `None` and degrade to literal text at the call site.
    pub(crate) fn footnote_index(&mut self, label: &str) -> Option<usize> {
        if !self.footnotes.iter().any(|d| d.label == label) {
            return None;
        }
        if let Some(i) = self.footnote_order.iter().position(|l| l == label) {
            return Some(i + 1);
        }
        self.footnote_order.push(label.to_string());
        Some(self.footnote_order.len())
    }

    pub(crate) fn footnote_count(&self) -> usize {
        self.footnotes.len()
    }

    /// Detach a footnote body for expansion outside the session borrow.
    pub(crate) fn take_footnote_content(&mut self, index: usize) -> Option<InlineContent> {
        self.footnotes
            .get_mut(index)
            .map(|def| std::mem::replace(&mut def.content, InlineContent::expanded(Vec::new())))
    }

    pub(crate) fn restore_footnote_content(&mut self, index: usize, content: InlineContent) {
        if let Some(def) = self.footnotes.get_mut(index) {
            def.content = content;
        }
    }

    /// Move the resolved tables out, for the finished document.
    pub(crate) fn take_tables(&mut self) -> (HashMap<String, LinkDef>, Vec<FootnoteDef>, Vec<String>) {
        (
            std::mem::take(&mut self.link_definitions),
            std::mem::take(&mut self.footnotes),
            std::mem::take(&mut self.footnote_order),
        )
    }
}

thread_local! {
    static ACTIVE: RefCell<Vec<ParseSession>> = const { RefCell::new(Vec::new()) };
}

/// Unbinds the session it guards when dropped.
#[must_use = "dropping the guard unbinds the session immediately"]
pub struct SessionGuard {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Bind `session` to the current thread until the guard is dropped.
/// Bindings nest: an inner parse shadows the outer session and the outer
/// one becomes active again when the inner guard is dropped.
pub fn bind(session: ParseSession) -> SessionGuard {
    ACTIVE.with(|stack| stack.borrow_mut().push(session));
    SessionGuard {
        _not_send: std::marker::PhantomData,
    }
}

/// Run `f` against the active session. When no session is bound a default
/// core session is bound implicitly for the rest of the thread's
/// lifetime, mirroring the behavior callers expect from ad hoc use.
///
/// The borrow lasts only for the closure; never call back into a
/// tokenizer from inside `f`.
pub(crate) fn with_active<R>(f: impl FnOnce(&mut ParseSession) -> R) -> R {
    ACTIVE.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.is_empty() {
            stack.push(ParseSession::new(TokenSet::core()));
        }
        let session = stack
            .last_mut()
            .expect("session stack is non-empty after implicit bind");
        f(session)
    })
}

/// The token set of the active session.
pub(crate) fn active_tokens() -> Arc<TokenSet> {
    with_active(|session| session.tokens())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::position::Position;

    #[test]
    fn test_guard_unbinds_on_drop() {
        let outer = ParseSession::new(TokenSet::core());
        let guard = bind(outer);
        with_active(|s| {
            s.add_link_definition(
                "key".to_string(),
                LinkDef {
                    target: "t".to_string(),
                    title: String::new(),
                },
            )
        });
        {
            let _inner = bind(ParseSession::new(TokenSet::core()));
            with_active(|s| assert!(s.link_definition("key").is_none()));
        }
        with_active(|s| assert!(s.link_definition("key").is_some()));
        drop(guard);
    }

    #[test]
    fn test_first_link_definition_wins() {
        let mut session = ParseSession::new(TokenSet::core());
        session.add_link_definition(
            "k".to_string(),
            LinkDef {
                target: "first".to_string(),
                title: String::new(),
            },
        );
        session.add_link_definition(
            "k".to_string(),
            LinkDef {
                target: "second".to_string(),
                title: String::new(),
            },
        );
        assert_eq!(session.link_definition("k").map(|d| d.target), Some("first".to_string()));
    }

    #[test]
    fn test_footnote_numbering_follows_first_reference() {
        let mut session = ParseSession::new(TokenSet::core());
        for label in ["a", "b"] {
            session.add_footnote(FootnoteDef {
                label: label.to_string(),
                content: InlineContent::expanded(Vec::new()),
                position: Position::single(1),
            });
        }
        assert_eq!(session.footnote_index("b"), Some(1));
        assert_eq!(session.footnote_index("a"), Some(2));
        assert_eq!(session.footnote_index("b"), Some(1));
        assert_eq!(session.footnote_index("missing"), None);
    }

    #[test]
    fn test_reset_clears_tables() {
        let mut session = ParseSession::new(TokenSet::core());
        session.add_footnote(FootnoteDef {
            label: "a".to_string(),
            content: InlineContent::expanded(Vec::new()),
            position: Position::single(1),
        });
        session.reset();
        assert_eq!(session.footnote_count(), 0);
        assert_eq!(session.footnote_index("a"), None);
    }
}
