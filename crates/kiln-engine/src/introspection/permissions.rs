//! Permission policy
//!
//! Decides which classes and members are visible to scripts. A policy is
//! immutable and cheap to clone; it is consulted only while a class map is
//! being populated, never on the invocation path.
//!
//! ## Composing deny rules
//!
//! A base policy can be narrowed with rules written in a small block
//! language. Rules nest package, class, member:
//!
//! ```text
//! # whole package
//! app.internal { }
//! // one class
//! app.model { Secret { } }
//! // members: `name;` is a field, `name();` every method (or constructor) named so
//! app.model { Person { ssn; wipe(); Person(); } }
//! ```
//!
//! Package names accept the wildcards `*`, `**`, `pkg.*` (strict
//! subpackages) and `pkg.**` (the package and its subpackages).
//! Composition only ever removes access.

use std::fmt;
use std::sync::Arc;

use kiln_sdk::{ClassDef, ConstructorDef, FieldDef, MethodDef};
use rustc_hash::{FxHashMap, FxHashSet};

/// Packages visible under [`Permissions::restricted`]
pub const CORE_PACKAGES: [&str; 2] = ["kiln.lang", "kiln.util"];

/// Malformed deny rules
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PermissionsError {
    /// Unexpected token or end of input
    #[error("Permission rule syntax error at {line}:{column}: {message}")]
    Syntax {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// What was expected
        message: String,
    },
}

/// An immutable, shareable permission policy
#[derive(Clone)]
pub struct Permissions(Arc<Policy>);

enum Policy {
    Unrestricted,
    Restricted,
    Classes {
        base: Permissions,
        allowed: FxHashSet<String>,
    },
    Narrowed {
        base: Permissions,
        rules: Vec<PackageRule>,
    },
}

impl Permissions {
    /// Everything public is visible
    pub fn unrestricted() -> Self {
        Self(Arc::new(Policy::Unrestricted))
    }

    /// Only the core packages are visible
    pub fn restricted() -> Self {
        Self(Arc::new(Policy::Restricted))
    }

    /// This policy, plus the named classes (qualified names)
    pub fn with_classes<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(Policy::Classes {
            base: self.clone(),
            allowed: names.into_iter().map(Into::into).collect(),
        }))
    }

    /// A strictly narrower policy with `rules` denied
    pub fn compose(&self, rules: &str) -> Result<Self, PermissionsError> {
        let rules = RuleParser::new(rules).parse()?;
        if rules.is_empty() {
            return Ok(self.clone());
        }
        Ok(Self(Arc::new(Policy::Narrowed {
            base: self.clone(),
            rules,
        })))
    }

    /// Whether no restriction applies at all
    pub fn is_unrestricted(&self) -> bool {
        matches!(*self.0, Policy::Unrestricted)
    }

    /// Whether classes of `package` may be visible
    pub fn allow_package(&self, package: &str) -> bool {
        match &*self.0 {
            Policy::Unrestricted => true,
            Policy::Restricted => CORE_PACKAGES.contains(&package),
            Policy::Classes { base, allowed } => {
                base.allow_package(package)
                    || allowed
                        .iter()
                        .any(|name| name.rsplit_once('.').map(|(p, _)| p) == Some(package))
            }
            Policy::Narrowed { base, rules } => {
                base.allow_package(package)
                    && !rules.iter().any(|r| r.deny_all && r.matches(package))
            }
        }
    }

    /// Whether the class is visible. Array classes are always visible;
    /// their elements are checked when accessed.
    pub fn allow_class(&self, class: &ClassDef) -> bool {
        if class.is_array() {
            return true;
        }
        match &*self.0 {
            Policy::Unrestricted => true,
            Policy::Restricted => self.allow_package(class.package()),
            Policy::Classes { base, allowed } => {
                allowed.contains(&class.qualified_name()) || base.allow_class(class)
            }
            Policy::Narrowed { base, rules } => {
                base.allow_class(class) && !rules.iter().any(|r| r.denies_class(class))
            }
        }
    }

    /// Whether a method declared by `class` is visible
    pub fn allow_method(&self, class: &ClassDef, method: &MethodDef) -> bool {
        self.allow_class(class) && !self.denies_member(class, method.name(), MemberKind::Method)
    }

    /// Whether a field declared by `class` is visible
    pub fn allow_field(&self, class: &ClassDef, field: &FieldDef) -> bool {
        self.allow_class(class) && !self.denies_member(class, field.name(), MemberKind::Field)
    }

    /// Whether a constructor of `class` is visible. Constructors are named
    /// after the class in deny rules.
    pub fn allow_constructor(&self, class: &ClassDef, _ctor: &ConstructorDef) -> bool {
        self.allow_class(class) && !self.denies_member(class, class.name(), MemberKind::Method)
    }

    fn denies_member(&self, class: &ClassDef, name: &str, kind: MemberKind) -> bool {
        match &*self.0 {
            Policy::Unrestricted | Policy::Restricted => false,
            Policy::Classes { base, .. } => base.denies_member(class, name, kind),
            Policy::Narrowed { base, rules } => {
                base.denies_member(class, name, kind)
                    || rules.iter().any(|r| r.denies_member(class, name, kind))
            }
        }
    }

    /// Literal (wildcard-free) package names mentioned by deny rules
    pub fn rule_packages(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_rule_packages(&mut out);
        out
    }

    fn collect_rule_packages(&self, out: &mut Vec<String>) {
        match &*self.0 {
            Policy::Unrestricted | Policy::Restricted => {}
            Policy::Classes { base, .. } => base.collect_rule_packages(out),
            Policy::Narrowed { base, rules } => {
                base.collect_rule_packages(out);
                out.extend(
                    rules
                        .iter()
                        .filter(|r| !r.pattern.contains('*'))
                        .map(|r| r.pattern.clone()),
                );
            }
        }
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::unrestricted()
    }
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            Policy::Unrestricted => write!(f, "Unrestricted"),
            Policy::Restricted => write!(f, "Restricted"),
            Policy::Classes { base, allowed } => {
                write!(f, "Classes({:?} + {} classes)", base, allowed.len())
            }
            Policy::Narrowed { base, rules } => {
                write!(f, "Narrowed({:?} - {} rules)", base, rules.len())
            }
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Field,
    Method,
}

#[derive(Debug, Default)]
struct ClassRule {
    fields: FxHashSet<String>,
    methods: FxHashSet<String>,
}

impl ClassRule {
    fn denies_all(&self) -> bool {
        self.fields.is_empty() && self.methods.is_empty()
    }
}

/// Package pattern (supports wildcards) with the classes it narrows
#[derive(Debug)]
struct PackageRule {
    pattern: String,
    /// `pkg { }`: the package is denied outright
    deny_all: bool,
    classes: FxHashMap<String, ClassRule>,
}

impl PackageRule {
    fn matches(&self, package: &str) -> bool {
        if self.pattern == "**" || self.pattern == "*" {
            return true;
        }

        if let Some(prefix) = self.pattern.strip_suffix(".**") {
            package == prefix
                || (package.starts_with(prefix) && package[prefix.len()..].starts_with('.'))
        } else if let Some(prefix) = self.pattern.strip_suffix(".*") {
            package.starts_with(prefix)
                && package.len() > prefix.len() + 1
                && package[prefix.len()..].starts_with('.')
        } else {
            self.pattern == package
        }
    }

    fn denies_class(&self, class: &ClassDef) -> bool {
        if !self.matches(class.package()) {
            return false;
        }
        self.deny_all
            || self
                .classes
                .get(class.name())
                .map(ClassRule::denies_all)
                .unwrap_or(false)
    }

    fn denies_member(&self, class: &ClassDef, name: &str, kind: MemberKind) -> bool {
        if !self.matches(class.package()) {
            return false;
        }
        match self.classes.get(class.name()) {
            Some(rule) => match kind {
                MemberKind::Field => rule.fields.contains(name),
                MemberKind::Method => rule.methods.contains(name),
            },
            None => false,
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Open,
    Close,
    Semi,
    LParen,
    RParen,
}

struct RuleParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> RuleParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_line(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> PermissionsError {
        PermissionsError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// Next token with its position
    fn next_token(&mut self) -> Result<Option<(Token, usize, usize)>, PermissionsError> {
        loop {
            let Some(&c) = self.chars.peek() else {
                return Ok(None);
            };
            let (line, column) = (self.line, self.column);
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '#' => self.skip_line(),
                '/' => {
                    self.bump();
                    if self.chars.peek() == Some(&'/') {
                        self.skip_line();
                    } else {
                        return Err(self.error(line, column, "expected '//' comment"));
                    }
                }
                '{' | '}' | ';' | '(' | ')' => {
                    self.bump();
                    let token = match c {
                        '{' => Token::Open,
                        '}' => Token::Close,
                        ';' => Token::Semi,
                        '(' => Token::LParen,
                        _ => Token::RParen,
                    };
                    return Ok(Some((token, line, column)));
                }
                c if is_name_char(c) => {
                    let mut name = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if !is_name_char(c) {
                            break;
                        }
                        name.push(c);
                        self.bump();
                    }
                    return Ok(Some((Token::Name(name), line, column)));
                }
                other => {
                    return Err(self.error(line, column, format!("unexpected character '{}'", other)));
                }
            }
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), PermissionsError> {
        match self.next_token()? {
            Some((token, _, _)) if token == expected => Ok(()),
            Some((_, line, column)) => Err(self.error(line, column, format!("expected {}", what))),
            None => Err(self.error(self.line, self.column, format!("expected {}, found end of input", what))),
        }
    }

    fn parse(mut self) -> Result<Vec<PackageRule>, PermissionsError> {
        let mut rules = Vec::new();
        while let Some((token, line, column)) = self.next_token()? {
            let Token::Name(pattern) = token else {
                return Err(self.error(line, column, "expected package name"));
            };
            self.expect(Token::Open, "'{'")?;
            let classes = self.parse_classes()?;
            rules.push(PackageRule {
                pattern,
                deny_all: classes.is_empty(),
                classes,
            });
        }
        Ok(rules)
    }

    fn parse_classes(&mut self) -> Result<FxHashMap<String, ClassRule>, PermissionsError> {
        let mut classes: FxHashMap<String, ClassRule> = FxHashMap::default();
        loop {
            match self.next_token()? {
                Some((Token::Close, _, _)) => return Ok(classes),
                Some((Token::Name(name), _, _)) => {
                    self.expect(Token::Open, "'{'")?;
                    let rule = classes.entry(name).or_default();
                    self.parse_members(rule)?;
                }
                Some((_, line, column)) => {
                    return Err(self.error(line, column, "expected class name or '}'"));
                }
                None => {
                    return Err(self.error(self.line, self.column, "unterminated package block"));
                }
            }
        }
    }

    fn parse_members(&mut self, rule: &mut ClassRule) -> Result<(), PermissionsError> {
        loop {
            match self.next_token()? {
                Some((Token::Close, _, _)) => return Ok(()),
                Some((Token::Name(name), _, _)) => match self.next_token()? {
                    Some((Token::Semi, _, _)) => {
                        rule.fields.insert(name);
                    }
                    Some((Token::LParen, _, _)) => {
                        self.expect(Token::RParen, "')'")?;
                        self.expect(Token::Semi, "';'")?;
                        rule.methods.insert(name);
                    }
                    Some((_, line, column)) => {
                        return Err(self.error(line, column, "expected ';' or '()'"));
                    }
                    None => {
                        return Err(self.error(self.line, self.column, "unterminated member"));
                    }
                },
                Some((_, line, column)) => {
                    return Err(self.error(line, column, "expected member name or '}'"));
                }
                None => {
                    return Err(self.error(self.line, self.column, "unterminated class block"));
                }
            }
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '*')
}
