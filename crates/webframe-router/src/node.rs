//! Segment trie node.
//!
//! Each node owns one path segment. Children are split by kind: static
//! children live in a map keyed by their literal text, while the wildcard,
//! parameter and regex children are single slots of which at most one may be
//! occupied at any position.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{RouteError, RouteResult};

/// Kind of path segment a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Literal segment such as `users`.
    Static,
    /// Named parameter such as `:id`.
    Param,
    /// Named parameter constrained by a pattern, such as `:id([0-9]+)`.
    Regex,
    /// The `*` segment.
    Wildcard,
}

/// A node in a per-method routing trie.
///
/// `H` is the handler type stored at route endpoints and `M` the middleware
/// type attached to nodes.
#[derive(Debug, Clone)]
pub struct Node<H, M> {
    pub(crate) segment: String,
    pub(crate) kind: NodeKind,
    pub(crate) children: HashMap<String, Node<H, M>>,
    pub(crate) wildcard_child: Option<Box<Node<H, M>>>,
    pub(crate) param_child: Option<Box<Node<H, M>>>,
    pub(crate) regex_child: Option<Box<Node<H, M>>>,
    pub(crate) param_name: Option<String>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) handler: Option<H>,
    pub(crate) middlewares: Vec<M>,
    pub(crate) route: Option<String>,
}

impl<H, M> Node<H, M> {
    fn with_kind(segment: &str, kind: NodeKind) -> Self {
        Self {
            segment: segment.to_string(),
            kind,
            children: HashMap::new(),
            wildcard_child: None,
            param_child: None,
            regex_child: None,
            param_name: None,
            pattern: None,
            handler: None,
            middlewares: Vec::new(),
            route: None,
        }
    }

    /// Creates the root node of a method tree.
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind("/", NodeKind::Static)
    }

    /// The literal segment this node was registered with.
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// The node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Name the matched segment is bound to, for parameter and regex nodes.
    #[must_use]
    pub fn param_name(&self) -> Option<&str> {
        self.param_name.as_deref()
    }

    /// The handler registered at this node, if any.
    #[must_use]
    pub fn handler(&self) -> Option<&H> {
        self.handler.as_ref()
    }

    /// Middleware attached directly to this node, in registration order.
    #[must_use]
    pub fn middlewares(&self) -> &[M] {
        &self.middlewares
    }

    /// The full path this node was registered under.
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Returns true if this node's pattern accepts `segment`.
    ///
    /// Nodes without a pattern accept nothing.
    #[must_use]
    pub fn matches(&self, segment: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(segment))
    }

    /// Finds the child for `segment`, creating it when absent.
    pub(crate) fn child_or_create(&mut self, segment: &str) -> RouteResult<&mut Self> {
        if segment == "*" {
            if self.param_child.is_some() || self.regex_child.is_some() {
                return Err(RouteError::WildcardConflict {
                    segment: segment.to_string(),
                });
            }
            let child = self
                .wildcard_child
                .get_or_insert_with(|| Box::new(Self::with_kind(segment, NodeKind::Wildcard)));
            return Ok(&mut **child);
        }

        if let Some(param) = segment.strip_prefix(':') {
            if self.wildcard_child.is_some() {
                return Err(RouteError::WildcardConflict {
                    segment: segment.to_string(),
                });
            }
            let (name, pattern) = parse_param(param);
            return match pattern {
                Some(pattern) => self.regex_child_or_create(segment, name, pattern),
                None => self.param_child_or_create(segment, name),
            };
        }

        Ok(self
            .children
            .entry(segment.to_string())
            .or_insert_with(|| Self::with_kind(segment, NodeKind::Static)))
    }

    fn param_child_or_create(&mut self, segment: &str, name: &str) -> RouteResult<&mut Self> {
        if let Some(regex) = &self.regex_child {
            return Err(RouteError::RegexConflict {
                existing: regex.segment.clone(),
                segment: segment.to_string(),
            });
        }
        if let Some(param) = &self.param_child {
            if param.segment != segment {
                return Err(RouteError::ParamConflict {
                    existing: param.segment.clone(),
                    segment: segment.to_string(),
                });
            }
        }
        let child = self.param_child.get_or_insert_with(|| {
            let mut node = Self::with_kind(segment, NodeKind::Param);
            node.param_name = Some(name.to_string());
            Box::new(node)
        });
        Ok(&mut **child)
    }

    fn regex_child_or_create(
        &mut self,
        segment: &str,
        name: &str,
        pattern: &str,
    ) -> RouteResult<&mut Self> {
        if let Some(param) = &self.param_child {
            return Err(RouteError::ParamConflict {
                existing: param.segment.clone(),
                segment: segment.to_string(),
            });
        }
        if let Some(regex) = &self.regex_child {
            if regex.segment != segment {
                return Err(RouteError::RegexConflict {
                    existing: regex.segment.clone(),
                    segment: segment.to_string(),
                });
            }
        }
        let child = match self.regex_child.take() {
            Some(existing) => existing,
            None => {
                let compiled = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    RouteError::InvalidRegex {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?;
                let mut node = Self::with_kind(segment, NodeKind::Regex);
                node.param_name = Some(name.to_string());
                node.pattern = Some(compiled);
                Box::new(node)
            }
        };
        Ok(&mut **self.regex_child.insert(child))
    }

    /// Picks the child a request segment descends into.
    ///
    /// Static children win, then a regex child whose pattern matches, then the
    /// parameter child, then the wildcard child.
    #[must_use]
    pub fn child_of(&self, segment: &str) -> Option<&Self> {
        if let Some(child) = self.children.get(segment) {
            return Some(child);
        }
        if let Some(regex) = self.regex_child.as_deref().filter(|n| n.matches(segment)) {
            return Some(regex);
        }
        self.param_child
            .as_deref()
            .or(self.wildcard_child.as_deref())
    }

    /// Every child that can accept `segment`, in middleware sweep order:
    /// wildcard, parameter, matching regex, static.
    pub fn children_of<'a>(&'a self, segment: &str) -> impl Iterator<Item = &'a Self> + 'a {
        self.wildcard_child
            .as_deref()
            .into_iter()
            .chain(self.param_child.as_deref())
            .chain(self.regex_child.as_deref().filter(|n| n.matches(segment)))
            .chain(self.children.get(segment))
    }
}

/// Splits `name(pattern)` into its name and optional pattern.
fn parse_param(param: &str) -> (&str, Option<&str>) {
    if let Some((name, rest)) = param.split_once('(') {
        if let Some(pattern) = rest.strip_suffix(')') {
            return (name, Some(pattern));
        }
    }
    (param, None)
}
