//! Constructible targets.
//!
//! A target is a named constructor plus a description of its parameters, kept
//! in a `TargetRegistry` that instantiation looks names up in. Constructors
//! receive the assembled keyword arguments and return a type-erased `Object`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::domain::Value;
use crate::error::{ParamError, Result};

/// Anything a constructor can return.
pub trait Instance: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + fmt::Debug + Send + Sync> Instance for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A live object built by a target.
#[derive(Clone)]
pub struct Object {
    inner: Arc<dyn Instance>,
    type_name: &'static str,
}

impl Object {
    pub fn new<T: Any + fmt::Debug + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Rust type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).as_any().downcast_ref::<T>()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Instance::into_any(Arc::clone(&self.inner)).downcast::<T>().ok()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

/// A keyword argument: plain data, or an object built by a nested target.
#[derive(Debug, Clone)]
pub enum Arg {
    Value(Value),
    Object(Object),
}

/// Keyword arguments handed to a constructor.
///
/// Accessors return `String` errors; the registry wraps them into
/// `ParamError::Construction` with the record path attached.
#[derive(Debug, Clone, Default)]
pub struct Kwargs {
    args: IndexMap<String, Arg>,
}

impl Kwargs {
    pub fn insert(&mut self, name: impl Into<String>, arg: Arg) {
        self.args.insert(name.into(), arg);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.args.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn value(&self, name: &str) -> Result<&Value, String> {
        match self.args.get(name) {
            Some(Arg::Value(v)) => Ok(v),
            Some(Arg::Object(o)) => Err(format!(
                "argument '{name}' is an object ({}), expected a value",
                o.type_name()
            )),
            None => Err(format!("argument '{name}' is missing")),
        }
    }

    pub fn f64(&self, name: &str) -> Result<f64, String> {
        let v = self.value(name)?;
        v.as_f64()
            .ok_or_else(|| format!("argument '{name}' must be a number, got {}", v.describe()))
    }

    pub fn i64(&self, name: &str) -> Result<i64, String> {
        let v = self.value(name)?;
        v.as_i64()
            .ok_or_else(|| format!("argument '{name}' must be an integer, got {}", v.describe()))
    }

    pub fn str(&self, name: &str) -> Result<&str, String> {
        let v = self.value(name)?;
        v.as_str()
            .ok_or_else(|| format!("argument '{name}' must be a string, got {}", v.describe()))
    }

    pub fn bool(&self, name: &str) -> Result<bool, String> {
        let v = self.value(name)?;
        v.as_bool().ok_or_else(|| format!("argument '{name}' must be a bool, got {}", v.describe()))
    }

    /// Optional numeric argument: absent or null gives `None`.
    pub fn opt_f64(&self, name: &str) -> Result<Option<f64>, String> {
        match self.args.get(name) {
            None | Some(Arg::Value(Value::Null)) => Ok(None),
            Some(_) => self.f64(name).map(Some),
        }
    }

    pub fn object<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, String> {
        match self.args.get(name) {
            Some(Arg::Object(o)) => o.downcast::<T>().ok_or_else(|| {
                format!(
                    "argument '{name}' is a {}, expected {}",
                    o.type_name(),
                    std::any::type_name::<T>()
                )
            }),
            Some(Arg::Value(v)) => Err(format!(
                "argument '{name}' is a {}, expected an object",
                v.describe()
            )),
            None => Err(format!("argument '{name}' is missing")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: false,
        }
    }
}

pub type Constructor = Arc<dyn Fn(&Kwargs) -> Result<Object, String> + Send + Sync>;

/// Descriptor for a registered target.
#[derive(Clone)]
pub struct TargetDescriptor {
    /// Name used in discriminator fields (e.g. "PointAdder").
    pub name: String,
    /// Short description for listings.
    pub doc: String,
    pub params: Vec<ParamSpec>,
    constructor: Constructor,
}

impl TargetDescriptor {
    pub fn new(
        name: &str,
        params: Vec<ParamSpec>,
        constructor: impl Fn(&Kwargs) -> Result<Object, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            doc: String::new(),
            params,
            constructor: Arc::new(constructor),
        }
    }

    pub fn with_doc(mut self, doc: &str) -> Self {
        self.doc = doc.to_string();
        self
    }

    /// Check the arguments against `params` and call the constructor.
    ///
    /// `path` identifies the record being instantiated in error messages.
    pub fn invoke(&self, kwargs: &Kwargs, path: &str) -> Result<Object> {
        let missing = self.params.iter().find(|p| p.required && !kwargs.contains(&p.name));
        if let Some(missing) = missing {
            return Err(ParamError::MissingArgument {
                target: self.name.clone(),
                param: missing.name.clone(),
                path: path.to_string(),
            });
        }
        let unexpected = kwargs.names().find(|n| !self.params.iter().any(|p| p.name == *n));
        if let Some(unexpected) = unexpected {
            return Err(ParamError::Construction {
                target: self.name.clone(),
                path: path.to_string(),
                message: format!("unexpected argument '{unexpected}'"),
            });
        }
        (self.constructor)(kwargs).map_err(|message| ParamError::Construction {
            target: self.name.clone(),
            path: path.to_string(),
            message,
        })
    }
}

impl fmt::Debug for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Name -> target lookup. Resolution is a plain exact-name match.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: IndexMap<String, TargetDescriptor>,
}

impl TargetRegistry {
    pub fn register(&mut self, descriptor: TargetDescriptor) -> &mut Self {
        self.targets.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<&TargetDescriptor> {
        self.targets.get(name)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetDescriptor> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pair(i64, i64);

    fn pair_target() -> TargetDescriptor {
        TargetDescriptor::new(
            "Pair",
            vec![ParamSpec::required("a"), ParamSpec::optional("b")],
            |kw| {
                let b = if kw.contains("b") { kw.i64("b")? } else { 0 };
                Ok(Object::new(Pair(kw.i64("a")?, b)))
            },
        )
    }

    #[test]
    fn object_downcasts() {
        let o = Object::new(Pair(1, 2));
        assert_eq!(o.downcast_ref::<Pair>(), Some(&Pair(1, 2)));
        assert!(o.downcast_ref::<String>().is_none());
        assert_eq!(*o.downcast::<Pair>().unwrap(), Pair(1, 2));
        assert_eq!(format!("{o:?}"), "Pair(1, 2)");
    }

    #[test]
    fn invoke_checks_required_and_unexpected_args() {
        let target = pair_target();
        let mut kw = Kwargs::default();
        kw.insert("b", Arg::Value(Value::Int(2)));
        let err = target.invoke(&kw, "<root>").unwrap_err();
        assert!(matches!(err, ParamError::MissingArgument { ref param, .. } if param == "a"));

        kw.insert("a", Arg::Value(Value::Int(1)));
        kw.insert("c", Arg::Value(Value::Int(3)));
        let err = target.invoke(&kw, "<root>").unwrap_err();
        assert!(matches!(
            err,
            ParamError::Construction { ref message, .. } if message.contains("'c'")
        ));
    }

    #[test]
    fn constructor_errors_carry_the_path() {
        let target = pair_target();
        let mut kw = Kwargs::default();
        kw.insert("a", Arg::Value(Value::from("one")));
        let err = target.invoke(&kw, "model.encoder").unwrap_err();
        match err {
            ParamError::Construction { path, message, .. } => {
                assert_eq!(path, "model.encoder");
                assert!(message.contains("integer"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn registry_resolves_exact_names() {
        let mut registry = TargetRegistry::default();
        registry.register(pair_target());
        assert!(registry.is_known("Pair"));
        assert!(registry.resolve("pair").is_none());
        assert_eq!(registry.len(), 1);
    }
}
