//! Avro qualified names.

use std::fmt;

/// An Avro qualified name: an optional namespace plus the type name.
///
/// An empty `namespace` means the null namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct QualifiedName {
    /// Dot-separated namespace, empty for the null namespace.
    pub namespace: String,
    /// The simple name.
    pub name: String,
}

impl QualifiedName {
    /// Create a qualified name from its parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a name relative to an enclosing namespace.
    ///
    /// If `raw` contains a dot, everything after the last dot is the name and
    /// the prefix is the namespace. Otherwise `enclosing` is used verbatim.
    ///
    /// # Example
    /// ```
    /// use contrail::schema::QualifiedName;
    ///
    /// let q = QualifiedName::parse("com.example", "User");
    /// assert_eq!(q.to_string(), "com.example.User");
    ///
    /// let q = QualifiedName::parse("com.example", "org.other.Account");
    /// assert_eq!(q.namespace, "org.other");
    /// assert_eq!(q.name, "Account");
    /// ```
    pub fn parse(enclosing: &str, raw: &str) -> Self {
        match raw.rsplit_once('.') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new(enclosing, raw),
        }
    }

    /// Whether this name lives in the null namespace.
    pub fn is_unqualified(&self) -> bool {
        self.namespace.is_empty()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}
