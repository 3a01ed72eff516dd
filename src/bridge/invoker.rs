use crate::definition::Backing;
use crate::entity::{Action, EntityMethod};
use crate::error::BindError;
use crate::handler::{HttpMethod, ServiceHandler, Target};
use std::fmt;
use std::sync::Arc;

/// The callable behind one dispatch token, resolved once at bind time.
#[derive(Clone)]
pub enum Invoker {
    /// Entity method overloads. `positional` takes the id plus declared form
    /// fields (or just the id for non-POST verbs); `raw` takes `(id, body)`.
    Entity {
        positional: Option<EntityMethod>,
        raw: Option<EntityMethod>,
    },
    /// An explicit action, or the definition's delegate.
    Action(Arc<dyn Action>),
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invoker::Entity { positional, raw } => f
                .debug_struct("Entity")
                .field("positional", &positional.as_ref().map(EntityMethod::arity))
                .field("raw", &raw.as_ref().map(EntityMethod::arity))
                .finish(),
            Invoker::Action(action) => f.debug_tuple("Action").field(&action.name()).finish(),
        }
    }
}

/// Arity of the `(id, raw body)` overload.
pub(crate) const RAW_ARITY: usize = 2;

/// Resolve what `handler` calls on `backing`.
///
/// GET, PUT, DELETE and HEAD need a unary method. POST with `N` declared
/// form fields needs arity `1 + N` and may also use the raw-body overload;
/// POST without form fields needs the raw-body overload.
pub fn resolve_invoker(handler: &ServiceHandler, backing: &Backing) -> Result<Invoker, BindError> {
    let name = match handler.target() {
        Target::Action(action) => return Ok(Invoker::Action(Arc::clone(action))),
        Target::Method(name) => name,
    };
    let table = match backing {
        Backing::Delegate(action) => return Ok(Invoker::Action(Arc::clone(action))),
        Backing::Entity(table) => table,
    };

    let unresolved = |expected: Vec<usize>| BindError::UnresolvedMethod {
        dispatch_key: handler.dispatch_key(),
        method: name.clone(),
        expected_arities: expected,
        registered_arities: table.arities(name),
    };

    match handler.http_method() {
        HttpMethod::Post if handler.form_params().is_empty() => {
            let raw = table
                .resolve(name, RAW_ARITY)
                .ok_or_else(|| unresolved(vec![RAW_ARITY]))?;
            Ok(Invoker::Entity {
                positional: None,
                raw: Some(raw),
            })
        }
        HttpMethod::Post => {
            let arity = 1 + handler.form_params().len();
            let positional = table
                .resolve(name, arity)
                .ok_or_else(|| unresolved(vec![arity]))?;
            Ok(Invoker::Entity {
                positional: Some(positional),
                raw: table.resolve(name, RAW_ARITY),
            })
        }
        _ => {
            let positional = table.resolve(name, 1).ok_or_else(|| unresolved(vec![1]))?;
            Ok(Invoker::Entity {
                positional: Some(positional),
                raw: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityError, MethodRegistry, MethodTable, ServiceEntity};

    struct Echo;

    impl ServiceEntity for Echo {
        fn register(registry: &mut MethodRegistry<Self>) {
            registry
                .unary("read", |_, id: &str| Ok::<_, EntityError>(id.to_string()))
                .binary("write", |_, id: &str, v: &str| {
                    Ok::<_, EntityError>(format!("{id}={v}"))
                })
                .ternary("write", |_, id: &str, a: &str, b: &str| {
                    Ok::<_, EntityError>(format!("{id}={a},{b}"))
                });
        }
    }

    fn backing() -> Backing {
        Backing::Entity(MethodTable::for_entity(Arc::new(Echo)))
    }

    #[test]
    fn test_unary_for_get() {
        let inv = resolve_invoker(&ServiceHandler::get(None, "read"), &backing()).unwrap();
        assert!(matches!(inv, Invoker::Entity { positional: Some(ref m), raw: None } if m.arity() == 1));
    }

    #[test]
    fn test_post_with_two_form_params_keeps_raw_overload() {
        let handler = ServiceHandler::post(None, "write")
            .add_form_param("a")
            .unwrap()
            .add_form_param("b")
            .unwrap();
        let inv = resolve_invoker(&handler, &backing()).unwrap();
        match inv {
            Invoker::Entity { positional, raw } => {
                assert_eq!(positional.map(|m| m.arity()), Some(3));
                assert_eq!(raw.map(|m| m.arity()), Some(2));
            }
            Invoker::Action(_) => panic!("expected entity invoker"),
        }
    }

    #[test]
    fn test_missing_arity_is_bind_error() {
        let err = resolve_invoker(&ServiceHandler::put(None, "write"), &backing()).unwrap_err();
        assert_eq!(
            err,
            BindError::UnresolvedMethod {
                dispatch_key: "write".into(),
                method: "write".into(),
                expected_arities: vec![1],
                registered_arities: vec![2, 3],
            }
        );
    }
}
