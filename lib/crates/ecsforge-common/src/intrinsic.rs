//! Template values and CloudFormation intrinsic functions.
//!
//! [`Expr`] is a JSON value tree extended with the intrinsics ecsforge emits.
//! A [`Reference`] is a pointer to a resource in some stack; it stays symbolic
//! until the assembly decides whether it becomes a `Ref`/`Fn::GetAtt` (same
//! stack) or an `Fn::ImportValue` (another stack).

use std::collections::BTreeMap;

use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

/// Symbolic pointer to a resource, or one of its attributes, in a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    /// Name of the stack that owns the resource.
    pub stack: String,
    /// Logical ID of the resource inside that stack.
    pub logical_id: String,
    /// `None` for `Ref`, `Some(attr)` for `Fn::GetAtt`.
    pub attribute: Option<String>,
}

impl Reference {
    #[must_use]
    pub fn new(stack: impl Into<String>, logical_id: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            logical_id: logical_id.into(),
            attribute: None,
        }
    }

    #[must_use]
    pub fn attribute(
        stack: impl Into<String>,
        logical_id: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            stack: stack.into(),
            logical_id: logical_id.into(),
            attribute: Some(attribute.into()),
        }
    }

    /// The intrinsic used when the consumer lives in the owning stack.
    #[must_use]
    pub fn local_expr(&self) -> Expr {
        match &self.attribute {
            None => Expr::Ref(self.logical_id.clone()),
            Some(attr) => Expr::GetAtt(self.logical_id.clone(), attr.clone()),
        }
    }

    /// Suffix shared by the export name and the output ID of this reference.
    ///
    /// `Ref` of `Cluster1A2B` → `RefCluster1A2B`;
    /// `GetAtt` of `Role1A2B.Arn` → `FnGetAttRole1A2BArn`.
    #[must_use]
    pub fn export_suffix(&self) -> String {
        match &self.attribute {
            None => format!("Ref{}", self.logical_id),
            Some(attr) => {
                let attr: String = attr.chars().filter(char::is_ascii_alphanumeric).collect();
                format!("FnGetAtt{}{attr}", self.logical_id)
            }
        }
    }
}

/// A template value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Expr>),
    Object(BTreeMap<String, Expr>),
    /// `{"Ref": id}`; also used for pseudo parameters such as `AWS::Region`.
    Ref(String),
    /// `{"Fn::GetAtt": [id, attr]}`
    GetAtt(String, String),
    /// `{"Fn::Sub": template}`
    Sub(String),
    /// `{"Fn::Join": [delimiter, [parts]]}`
    Join(String, Vec<Expr>),
    /// `{"Fn::Select": [index, list]}`
    Select(u32, Box<Expr>),
    /// `{"Fn::GetAZs": region}`; empty string means the stack's region.
    GetAzs(String),
    /// `{"Fn::ImportValue": export}`
    ImportValue(String),
    /// Unresolved pointer into a stack. Never serialized.
    Reference(Reference),
}

impl Expr {
    /// Build an object from `(key, value)` pairs.
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Expr)>,
        K: Into<String>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list from anything convertible into values.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Expr>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn region() -> Self {
        Self::Ref("AWS::Region".to_string())
    }

    #[must_use]
    pub fn account_id() -> Self {
        Self::Ref("AWS::AccountId".to_string())
    }

    /// `Fn::Select` of the `index`-th availability zone of the stack's region.
    #[must_use]
    pub fn availability_zone(index: u32) -> Self {
        Self::Select(index, Box::new(Self::GetAzs(String::new())))
    }

    /// Value stored under `key` when `self` is an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Expr> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Walk a chain of object keys.
    #[must_use]
    pub fn pointer(&self, keys: &[&str]) -> Option<&Expr> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Expr]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// All unresolved references in this value, depth first.
    #[must_use]
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Self::Reference(r) => out.push(r),
            Self::List(items) | Self::Join(_, items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Object(map) => {
                for value in map.values() {
                    value.collect_references(out);
                }
            }
            Self::Select(_, inner) => inner.collect_references(out),
            Self::Null
            | Self::Bool(_)
            | Self::Int(_)
            | Self::Str(_)
            | Self::Ref(_)
            | Self::GetAtt(..)
            | Self::Sub(_)
            | Self::GetAzs(_)
            | Self::ImportValue(_) => {}
        }
    }

    /// Replace every [`Expr::Reference`] with the value produced by `f`.
    ///
    /// # Errors
    ///
    /// Stops at the first reference `f` rejects and returns its error.
    pub fn resolve_with<F, E>(&mut self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&Reference) -> Result<Expr, E>,
    {
        match self {
            Self::Reference(r) => {
                let resolved = f(r)?;
                *self = resolved;
                Ok(())
            }
            Self::List(items) | Self::Join(_, items) => {
                items.iter_mut().try_for_each(|item| item.resolve_with(f))
            }
            Self::Object(map) => map.values_mut().try_for_each(|value| value.resolve_with(f)),
            Self::Select(_, inner) => inner.resolve_with(f),
            Self::Null
            | Self::Bool(_)
            | Self::Int(_)
            | Self::Str(_)
            | Self::Ref(_)
            | Self::GetAtt(..)
            | Self::Sub(_)
            | Self::GetAzs(_)
            | Self::ImportValue(_) => Ok(()),
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for Expr {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u16> for Expr {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Expr {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<Reference> for Expr {
    fn from(value: Reference) -> Self {
        Self::Reference(value)
    }
}

impl From<&Reference> for Expr {
    fn from(value: &Reference) -> Self {
        Self::Reference(value.clone())
    }
}

impl From<Vec<Expr>> for Expr {
    fn from(value: Vec<Expr>) -> Self {
        Self::List(value)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Str(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
            Self::Ref(id) => single(serializer, "Ref", id),
            Self::GetAtt(id, attr) => single(serializer, "Fn::GetAtt", &[id, attr]),
            Self::Sub(template) => single(serializer, "Fn::Sub", template),
            Self::Join(delimiter, parts) => single(serializer, "Fn::Join", &(delimiter, parts)),
            Self::Select(index, list) => single(serializer, "Fn::Select", &(index, list)),
            Self::GetAzs(region) => single(serializer, "Fn::GetAZs", region),
            Self::ImportValue(name) => single(serializer, "Fn::ImportValue", name),
            Self::Reference(r) => Err(S::Error::custom(format!(
                "unresolved reference to {}/{}",
                r.stack, r.logical_id
            ))),
        }
    }
}

fn single<S, V>(serializer: S, key: &str, value: &V) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut m = serializer.serialize_map(Some(1))?;
    m.serialize_entry(key, value)?;
    m.end()
}
