//! Method Resolution
//!
//! Picks the overload of a method for a typed argument list.
//!
//! # Compatibility
//!
//! A parameter accepts an argument when:
//! - the kinds are the same (a primitive parameter accepts its boxed kind),
//! - the argument widens to it: `Int` to `Long`/`Double`, `Long` to `Double`,
//! - the parameter is `Any`,
//! - both are lists and every element is accepted by the element type,
//! - the argument is `Null` and the parameter is a reference type.
//!
//! # Ranking
//!
//! Among compatible overloads the one with the most exact kind matches wins.
//! A tie for first place is reported as `AmbiguousMethod`.

use ormi_common::protocol::error::{RemotingError, Result};
use ormi_common::protocol::{ParamType, Value};
use std::sync::Arc;

use crate::service::{RegisteredService, RemoteMethod};

/// Whether a parameter of type `param` accepts `arg`.
pub fn accepts(param: &ParamType, arg: &Value) -> bool {
    match (param, arg) {
        (ParamType::Any, _) => true,
        (ParamType::Unit, _) => false,
        (p, Value::Null) => p.is_nullable(),
        (ParamType::Bool, Value::Bool(_)) => true,
        (ParamType::Char, Value::Char(_)) => true,
        (ParamType::Int, Value::Int(_)) => true,
        (ParamType::Long, Value::Int(_) | Value::Long(_)) => true,
        (ParamType::Double, Value::Int(_) | Value::Long(_) | Value::Double(_)) => true,
        (ParamType::Str, Value::Str(_)) => true,
        (ParamType::Record, Value::Record(_)) => true,
        (ParamType::List(elem), Value::List(items)) => items.iter().all(|item| accepts(elem, item)),
        _ => false,
    }
}

fn is_exact(param: &ParamType, arg: &Value) -> bool {
    match (param, arg) {
        (ParamType::List(elem), Value::List(items)) => items.iter().all(|item| is_exact(elem, item)),
        (ParamType::Str, Value::Str(_)) | (ParamType::Record, Value::Record(_)) => true,
        _ => param.boxed_kind() == Some(arg.kind()),
    }
}

fn exactness(method: &RemoteMethod, args: &[Value]) -> usize {
    method
        .params()
        .iter()
        .zip(args)
        .filter(|(param, arg)| is_exact(param, arg))
        .count()
}

fn describe(args: &[Value]) -> String {
    let kinds: Vec<String> = args.iter().map(|a| a.kind().to_string()).collect();
    kinds.join(", ")
}

/// Methods named `method` with the given arity, in declaration order.
///
/// Transports decode the raw parameters against these before a call is
/// resolved. Fails with `MethodNotFound` if there are none.
pub fn decoding_candidates<'a>(
    service: &'a RegisteredService,
    method: &str,
    arity: usize,
) -> Result<Vec<&'a Arc<RemoteMethod>>> {
    let candidates: Vec<_> = service
        .methods()
        .iter()
        .filter(|m| m.name() == method && m.arity() == arity)
        .collect();

    if candidates.is_empty() {
        return Err(RemotingError::MethodNotFound(format!(
            "{} with {} parameters on service {}",
            method,
            arity,
            service.id()
        )));
    }
    Ok(candidates)
}

/// Resolves `method` on `service` for `args`.
pub fn resolve(service: &RegisteredService, method: &str, args: &[Value]) -> Result<Arc<RemoteMethod>> {
    let same_arity: Vec<_> = service
        .methods()
        .iter()
        .filter(|m| m.name() == method && m.arity() == args.len())
        .collect();

    if same_arity.len() > 1 && args.iter().any(Value::is_null) {
        return Err(RemotingError::AmbiguousMethod(format!(
            "Cannot resolve overload of {} on service {} with a null argument",
            method,
            service.id()
        )));
    }

    let compatible: Vec<_> = same_arity
        .into_iter()
        .filter(|m| m.params().iter().zip(args).all(|(p, a)| accepts(p, a)))
        .collect();

    match compatible.as_slice() {
        [] => Err(RemotingError::MethodNotFound(format!(
            "{}({}) on service {}",
            method,
            describe(args),
            service.id()
        ))),
        [only] => Ok(Arc::clone(only)),
        several => {
            let best = several
                .iter()
                .map(|m| exactness(m, args))
                .max()
                .unwrap_or(0);
            let mut winners = several.iter().filter(|m| exactness(m, args) == best);

            match (winners.next(), winners.next()) {
                (Some(winner), None) => Ok(Arc::clone(winner)),
                _ => Err(RemotingError::AmbiguousMethod(format!(
                    "{}({}) matches several overloads on service {}",
                    method,
                    describe(args),
                    service.id()
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{Args, ServiceBuilder};
    use ormi_common::protocol::{ErrorKind, ServiceId};

    struct Calc;

    fn calc() -> RegisteredService {
        ServiceBuilder::new(Calc)
            .method("add", &[ParamType::Int, ParamType::Int], ParamType::Int, |_, a| {
                Ok(Value::Int(a.i32(0)? + a.i32(1)?))
            })
            .method("scale", &[ParamType::Long], ParamType::Long, |_, a| Ok(Value::Long(a.i64(0)? * 2)))
            .method("scale", &[ParamType::Double], ParamType::Double, |_, a| {
                Ok(Value::Double(a.f64(0)? * 2.0))
            })
            .method("show", &[ParamType::Str], ParamType::Str, |_, a| {
                Ok(a.opt_str(0)?.unwrap_or("none").into())
            })
            .method("pick", &[ParamType::Int, ParamType::Double], ParamType::Int, |_, _| Ok(Value::Int(1)))
            .method("pick", &[ParamType::Double, ParamType::Int], ParamType::Int, |_, _| Ok(Value::Int(2)))
            .method("sum", &[ParamType::list_of(ParamType::Int)], ParamType::Int, |_, _| Ok(Value::Int(0)))
            .build()
            .into_registered(ServiceId::new("Calc").unwrap())
    }

    #[test]
    fn test_accepts() {
        assert!(accepts(&ParamType::Long, &Value::Int(1)));
        assert!(accepts(&ParamType::Double, &Value::Long(1)));
        assert!(!accepts(&ParamType::Int, &Value::Long(1)));
        assert!(accepts(&ParamType::Any, &Value::Null));
        assert!(!accepts(&ParamType::Int, &Value::Null));
        assert!(accepts(&ParamType::Str, &Value::Null));
        assert!(accepts(
            &ParamType::list_of(ParamType::Long),
            &Value::List(vec![Value::Int(1), Value::Long(2)])
        ));
        assert!(!accepts(
            &ParamType::list_of(ParamType::Int),
            &Value::List(vec![Value::from("a")])
        ));
    }

    #[test]
    fn test_resolves_single_candidate() {
        let service = calc();
        let method = resolve(&service, "add", &[Value::Int(1), Value::Int(2)]).unwrap();
        let args: Args = vec![Value::Int(1), Value::Int(2)].into();
        assert_eq!(method.call(&args).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_missing_method_names_method_and_service() {
        let err = resolve(&calc(), "missing", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotFound);
        assert!(err.to_string().contains("missing"));
        assert!(err.to_string().contains("Calc"));
    }

    #[test]
    fn test_incompatible_args_are_method_not_found() {
        let err = resolve(&calc(), "add", &[Value::from("a"), Value::from("b")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotFound);
    }

    #[test]
    fn test_exact_overload_wins() {
        let service = calc();
        let long = resolve(&service, "scale", &[Value::Long(3)]).unwrap();
        assert_eq!(long.params(), &[ParamType::Long]);

        let double = resolve(&service, "scale", &[Value::Double(1.5)]).unwrap();
        assert_eq!(double.params(), &[ParamType::Double]);
    }

    #[test]
    fn test_widening_without_exact_match_is_ambiguous() {
        let err = resolve(&calc(), "scale", &[Value::Int(3)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMethod);
    }

    #[test]
    fn test_tie_in_exactness_is_ambiguous() {
        let err = resolve(&calc(), "pick", &[Value::Int(1), Value::Int(2)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMethod);

        let first = resolve(&calc(), "pick", &[Value::Int(1), Value::Double(2.0)]).unwrap();
        assert_eq!(first.params(), &[ParamType::Int, ParamType::Double]);
    }

    #[test]
    fn test_null_with_single_overload_is_accepted() {
        let method = resolve(&calc(), "show", &[Value::Null]).unwrap();
        let args: Args = vec![Value::Null].into();
        assert_eq!(method.call(&args).unwrap(), Value::from("none"));
    }

    #[test]
    fn test_null_with_overloads_is_ambiguous() {
        let err = resolve(&calc(), "scale", &[Value::Null]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMethod);
    }

    #[test]
    fn test_list_argument() {
        let args = [Value::List(vec![Value::Int(1), Value::Int(2)])];
        assert!(resolve(&calc(), "sum", &args).is_ok());
    }

    #[test]
    fn test_decoding_candidates_in_declaration_order() {
        let service = calc();
        let candidates = decoding_candidates(&service, "scale", 1).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].params(), &[ParamType::Long]);

        let err = decoding_candidates(&service, "add", 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotFound);
    }
}
