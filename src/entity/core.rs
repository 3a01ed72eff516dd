use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Failure raised by an entity method or action.
#[derive(Debug)]
pub enum EntityError {
    /// The entity is not in a state that allows the call
    /// (e.g. no resource was created for the id)
    IllegalState(String),
    /// The arguments were rejected
    InvalidArgument(String),
    /// Any other failure, cause preserved
    Failed(anyhow::Error),
}

impl EntityError {
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        EntityError::IllegalState(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        EntityError::InvalidArgument(msg.into())
    }
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::IllegalState(msg) => write!(f, "illegal state: {msg}"),
            EntityError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EntityError::Failed(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for EntityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EntityError::Failed(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for EntityError {
    fn from(err: anyhow::Error) -> Self {
        EntityError::Failed(err)
    }
}

fn to_value<R: Serialize>(result: Result<R, EntityError>) -> Result<Value, EntityError> {
    result.and_then(|r| serde_json::to_value(r).map_err(|e| EntityError::Failed(e.into())))
}

type RegisteredFn<E> = Arc<dyn Fn(&E, &[String]) -> Result<Value, EntityError> + Send + Sync>;

/// A plain object whose methods are called by name.
///
/// Implementors declare every callable method in [`ServiceEntity::register`].
/// Arguments arrive positionally as strings: the id token first, then
/// either the declared form fields in order or the raw request body.
pub trait ServiceEntity: Send + Sync + Sized + 'static {
    fn register(registry: &mut MethodRegistry<Self>);
}

/// Collects the methods an entity exposes, keyed by `(name, arity)`.
///
/// The same name may be registered under several arities; the dispatch
/// bridge picks the overload matching the request shape.
pub struct MethodRegistry<E> {
    methods: Vec<(String, usize, RegisteredFn<E>)>,
}

impl<E: ServiceEntity> MethodRegistry<E> {
    fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// Register a method taking `arity` positional arguments.
    pub fn variadic<R, F>(&mut self, name: &str, arity: usize, f: F) -> &mut Self
    where
        R: Serialize,
        F: Fn(&E, &[String]) -> Result<R, EntityError> + Send + Sync + 'static,
    {
        self.methods.push((
            name.to_string(),
            arity,
            Arc::new(move |entity, args| to_value(f(entity, args))),
        ));
        self
    }

    pub fn unary<R, F>(&mut self, name: &str, f: F) -> &mut Self
    where
        R: Serialize,
        F: Fn(&E, &str) -> Result<R, EntityError> + Send + Sync + 'static,
    {
        self.variadic(name, 1, move |entity, args| f(entity, args[0].as_str()))
    }

    pub fn binary<R, F>(&mut self, name: &str, f: F) -> &mut Self
    where
        R: Serialize,
        F: Fn(&E, &str, &str) -> Result<R, EntityError> + Send + Sync + 'static,
    {
        self.variadic(name, 2, move |entity, args| f(entity, args[0].as_str(), args[1].as_str()))
    }

    pub fn ternary<R, F>(&mut self, name: &str, f: F) -> &mut Self
    where
        R: Serialize,
        F: Fn(&E, &str, &str, &str) -> Result<R, EntityError> + Send + Sync + 'static,
    {
        self.variadic(name, 3, move |entity, args| {
            f(entity, args[0].as_str(), args[1].as_str(), args[2].as_str())
        })
    }
}

/// One resolved method, bound to its entity instance.
#[derive(Clone)]
pub struct EntityMethod {
    name: String,
    arity: usize,
    call: Arc<dyn Fn(&[String]) -> Result<Value, EntityError> + Send + Sync>,
}

impl EntityMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Call the method. The argument count must equal the arity.
    pub fn invoke(&self, args: &[String]) -> Result<Value, EntityError> {
        if args.len() != self.arity {
            return Err(EntityError::InvalidArgument(format!(
                "{} expects {} argument(s), got {}",
                self.name,
                self.arity,
                args.len()
            )));
        }
        (self.call)(args)
    }
}

impl fmt::Debug for EntityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMethod")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Every method of one entity instance, built once when the entity is
/// attached to a definition.
#[derive(Clone)]
pub struct MethodTable {
    entity_type: &'static str,
    methods: HashMap<(String, usize), EntityMethod>,
}

impl MethodTable {
    pub fn for_entity<E: ServiceEntity>(entity: Arc<E>) -> Self {
        let mut registry = MethodRegistry::<E>::new();
        E::register(&mut registry);

        let methods = registry
            .methods
            .into_iter()
            .map(|(name, arity, f)| {
                let entity = Arc::clone(&entity);
                let method = EntityMethod {
                    name: name.clone(),
                    arity,
                    call: Arc::new(move |args| f(entity.as_ref(), args)),
                };
                ((name, arity), method)
            })
            .collect();

        Self {
            entity_type: std::any::type_name::<E>(),
            methods,
        }
    }

    pub fn entity_type(&self) -> &'static str {
        self.entity_type
    }

    pub fn resolve(&self, name: &str, arity: usize) -> Option<EntityMethod> {
        self.methods.get(&(name.to_string(), arity)).cloned()
    }

    /// Registered arities for `name`, ascending.
    pub fn arities(&self, name: &str) -> Vec<usize> {
        let mut arities: Vec<usize> = self
            .methods
            .keys()
            .filter(|(n, _)| n == name)
            .map(|(_, a)| *a)
            .collect();
        arities.sort_unstable();
        arities
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("entity_type", &self.entity_type)
            .field("methods", &self.methods.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Notes {
        items: Mutex<Vec<String>>,
    }

    impl ServiceEntity for Notes {
        fn register(registry: &mut MethodRegistry<Self>) {
            registry
                .unary("count", |notes, _id| {
                    Ok::<_, EntityError>(notes.items.lock().map(|i| i.len()).unwrap_or(0))
                })
                .binary("add", |notes, _id, text| {
                    let mut items = notes
                        .items
                        .lock()
                        .map_err(|_| EntityError::illegal_state("poisoned"))?;
                    items.push(text.to_string());
                    Ok(())
                })
                .ternary("add", |notes, id, a, b| {
                    let mut items = notes
                        .items
                        .lock()
                        .map_err(|_| EntityError::illegal_state("poisoned"))?;
                    items.push(format!("{id}:{a}"));
                    items.push(format!("{id}:{b}"));
                    Ok(items.len())
                })
                .unary("fail", |_, id| -> Result<(), EntityError> {
                    Err(EntityError::illegal_state(format!("nothing for {id}")))
                });
        }
    }

    fn table() -> MethodTable {
        MethodTable::for_entity(Arc::new(Notes {
            items: Mutex::new(Vec::new()),
        }))
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_by_name_and_arity() {
        let table = table();
        assert_eq!(table.len(), 4);
        assert!(table.resolve("add", 2).is_some());
        assert!(table.resolve("add", 3).is_some());
        assert!(table.resolve("add", 4).is_none());
        assert!(table.resolve("missing", 1).is_none());
        assert_eq!(table.arities("add"), vec![2, 3]);
    }

    #[test]
    fn test_overloads_share_entity_state() {
        let table = table();
        let add = table.resolve("add", 2).unwrap();
        assert_eq!(add.invoke(&args(&["x", "one"])).unwrap(), Value::Null);

        let add_two = table.resolve("add", 3).unwrap();
        assert_eq!(add_two.invoke(&args(&["x", "a", "b"])).unwrap(), 3);

        let count = table.resolve("count", 1).unwrap();
        assert_eq!(count.invoke(&args(&["x"])).unwrap(), 3);
    }

    #[test]
    fn test_invoke_checks_arity() {
        let table = table();
        let count = table.resolve("count", 1).unwrap();
        let err = count.invoke(&args(&["x", "y"])).unwrap_err();
        assert!(matches!(err, EntityError::InvalidArgument(_)));
    }

    #[test]
    fn test_errors_pass_through() {
        let table = table();
        let fail = table.resolve("fail", 1).unwrap();
        let err = fail.invoke(&args(&["book"])).unwrap_err();
        assert_eq!(err.to_string(), "illegal state: nothing for book");
    }
}
