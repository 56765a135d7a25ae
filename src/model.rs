//! Data model for extracted Python API members, independent of output format.
//!
//! Everything here is decided once at extraction time: a class whose bases
//! name an enum type is an [`EnumDef`], a `@property` is a property, and the
//! renderers only ever match on [`Entity`].

use std::path::PathBuf;

/// A parsed Python module (a `.py` file or a package `__init__.py`).
#[derive(Debug, Default, Clone)]
pub struct Module {
    /// Dotted module name, e.g. `pkg.sub.mod`
    pub name: String,
    /// Source file the module was extracted from
    pub file: PathBuf,
    /// True when `file` is a package `__init__.py`
    pub is_package: bool,
    pub docstring: Option<String>,
    pub classes: Vec<Class>,
    pub enums: Vec<EnumDef>,
    pub functions: Vec<Function>,
    /// `import` / `from ... import` bindings, in source order
    pub imports: Vec<Import>,
}

impl Module {
    /// The package a relative import in this module is resolved against.
    pub fn package(&self) -> &str {
        if self.is_package {
            &self.name
        } else {
            self.name.rsplit_once('.').map(|(p, _)| p).unwrap_or("")
        }
    }

    /// True when `name` is a class, enum or function defined in this module.
    pub fn defines(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c.name == name)
            || self.enums.iter().any(|e| e.name == name)
            || self.functions.iter().any(|f| f.name == name)
    }

    /// Public names imported from this module's own root package without
    /// being defined here, i.e. re-exports.
    pub fn aliases(&self) -> Vec<&str> {
        let root = self.name.split('.').next().unwrap_or("");
        let mut names: Vec<&str> = self
            .imports
            .iter()
            .filter(|i| i.target.split('.').next() == Some(root) && i.target != root)
            .map(|i| i.alias.as_str())
            .filter(|alias| !alias.starts_with('_') && !self.defines(alias))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// A single name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Local name the import binds (`np` for `import numpy as np`)
    pub alias: String,
    /// Fully-qualified target (`numpy`, `pkg.sub.Thing`)
    pub target: String,
}

/// A function, method, staticmethod, classmethod or property getter.
#[derive(Debug, Default, Clone)]
pub struct Function {
    pub name: String,
    /// Line of the first decorator, else of the `def`
    pub line: usize,
    pub docstring: Option<String>,
    pub signature: Signature,
    pub decorators: Vec<String>,
}

/// A class and the members defined directly on it.
#[derive(Debug, Default, Clone)]
pub struct Class {
    pub name: String,
    pub line: usize,
    pub docstring: Option<String>,
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    /// Signature of the class call (its `__init__` without `self`)
    pub init: Signature,
    /// Class-level `name: type [= value]` declarations
    pub annotations: Vec<Param>,
    pub methods: Vec<Function>,
    pub properties: Vec<Function>,
}

/// An enum class rendered as a member table.
#[derive(Debug, Default, Clone)]
pub struct EnumDef {
    pub name: String,
    pub line: usize,
    pub docstring: Option<String>,
    /// `(member name, underlying value)` in definition order
    pub members: Vec<(String, String)>,
}

/// Ordered parameters plus an optional return annotation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Param>,
    pub returns: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    /// Annotation source text, unresolved
    pub annotation: Option<String>,
    pub default: DefaultValue,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            annotation: None,
            default: DefaultValue::Missing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// The bare `/` separator
    PositionalOnlyMarker,
    Positional,
    /// `*args`
    VarPositional,
    /// The bare `*` separator
    KeywordOnlyMarker,
    KeywordOnly,
    /// `**kwargs`
    VarKeyword,
}

/// A parameter's default, with `Missing` standing in for "no default".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Missing,
    None,
    Value(String),
}

impl DefaultValue {
    pub fn from_source(text: &str) -> Self {
        match text.trim() {
            "None" => DefaultValue::None,
            other => DefaultValue::Value(other.to_string()),
        }
    }
}

/// The closed set of documentable members.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Module(&'a Module),
    Class(&'a Class),
    Enum(&'a EnumDef),
    Function(&'a Function),
    Property(&'a Function),
}

impl<'a> Entity<'a> {
    pub fn docstring(&self) -> Option<&'a str> {
        match self {
            Entity::Module(m) => m.docstring.as_deref(),
            Entity::Class(c) => c.docstring.as_deref(),
            Entity::Enum(e) => e.docstring.as_deref(),
            Entity::Function(f) | Entity::Property(f) => f.docstring.as_deref(),
        }
    }

    /// Source line as the runtime would report it (modules report 0).
    pub fn line(&self) -> usize {
        match self {
            Entity::Module(_) => 0,
            Entity::Class(c) => c.line,
            Entity::Enum(e) => e.line,
            Entity::Function(f) | Entity::Property(f) => f.line,
        }
    }

    /// The signature used for parameter types and the signature block.
    pub fn signature(&self) -> Option<&'a Signature> {
        match self {
            Entity::Module(_) | Entity::Enum(_) => None,
            Entity::Class(c) => Some(&c.init),
            Entity::Function(f) | Entity::Property(f) => Some(&f.signature),
        }
    }
}
