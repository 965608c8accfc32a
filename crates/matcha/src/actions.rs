//! Rule actions.
//!
//! An action runs when a rule's subexpression has matched. It receives
//! the matched span and the values emitted/bound inside the rule, and
//! returns the values the rule emits instead. The returned bindings
//! replace the rule's local bindings wholesale.

use crate::error::BoxError;
use crate::value::{determine, Binding, Value};

/// What an action hands back: replacement emitted values and bindings
/// for the rule's local scope.
pub type Emitted<'a, 's> = (Vec<Value<'s>>, Vec<Binding<'a, 's>>);

/// A user-supplied transformation attached to a rule.
///
/// `input` is the whole subject string; `start..end` is the span the
/// rule matched. Errors propagate out of the match unchanged.
pub trait Action<'a>: Send + Sync {
    fn invoke<'s>(
        &self,
        input: &'s str,
        start: usize,
        end: usize,
        args: Vec<Value<'s>>,
        kwargs: Vec<Binding<'a, 's>>,
    ) -> Result<Emitted<'a, 's>, BoxError>;
}

/// Bind the determined value of the rule to a name.
///
/// Emits nothing; existing local bindings are kept and the new one is
/// appended (later bindings of the same name win).
pub struct Bind<'a> {
    name: &'a str,
}

impl<'a> Bind<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name }
    }
}

impl<'a> Action<'a> for Bind<'a> {
    fn invoke<'s>(
        &self,
        _input: &'s str,
        _start: usize,
        _end: usize,
        args: Vec<Value<'s>>,
        mut kwargs: Vec<Binding<'a, 's>>,
    ) -> Result<Emitted<'a, 's>, BoxError> {
        kwargs.push((self.name, determine(&args)));
        Ok((Vec::new(), kwargs))
    }
}

/// Discard the rule's values and emit a fixed value instead.
pub struct Constant(pub Value<'static>);

impl<'a> Action<'a> for Constant {
    fn invoke<'s>(
        &self,
        _input: &'s str,
        _start: usize,
        _end: usize,
        _args: Vec<Value<'s>>,
        _kwargs: Vec<Binding<'a, 's>>,
    ) -> Result<Emitted<'a, 's>, BoxError> {
        Ok((vec![self.0.clone()], Vec::new()))
    }
}

/// Keep only the first emitted value.
pub struct First;

impl<'a> Action<'a> for First {
    fn invoke<'s>(
        &self,
        _input: &'s str,
        _start: usize,
        _end: usize,
        args: Vec<Value<'s>>,
        _kwargs: Vec<Binding<'a, 's>>,
    ) -> Result<Emitted<'a, 's>, BoxError> {
        match args.into_iter().next() {
            Some(v) => Ok((vec![v], Vec::new())),
            None => Err("first: no emitted values".into()),
        }
    }
}

/// Keep only the last emitted value.
pub struct Last;

impl<'a> Action<'a> for Last {
    fn invoke<'s>(
        &self,
        _input: &'s str,
        _start: usize,
        _end: usize,
        args: Vec<Value<'s>>,
        _kwargs: Vec<Binding<'a, 's>>,
    ) -> Result<Emitted<'a, 's>, BoxError> {
        match args.into_iter().last() {
            Some(v) => Ok((vec![v], Vec::new())),
            None => Err("last: no emitted values".into()),
        }
    }
}

/// Concatenate emitted strings into one, separated by `sep`.
pub struct Join {
    sep: String,
}

impl Join {
    pub fn new(sep: impl Into<String>) -> Self {
        Self { sep: sep.into() }
    }
}

impl<'a> Action<'a> for Join {
    fn invoke<'s>(
        &self,
        _input: &'s str,
        _start: usize,
        _end: usize,
        args: Vec<Value<'s>>,
        _kwargs: Vec<Binding<'a, 's>>,
    ) -> Result<Emitted<'a, 's>, BoxError> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in &args {
            match arg.as_str() {
                Some(s) => parts.push(s),
                None => return Err("join: non-string emitted value".into()),
            }
        }
        Ok((vec![Value::from(parts.join(&self.sep))], Vec::new()))
    }
}

/// Wrap a plain function as an action. The function's return values
/// become the rule's emitted values; bindings are cleared.
///
/// Use a `fn` item rather than a closure so the higher-ranked input
/// lifetime is inferred.
pub struct Call<F>(pub F);

impl<'a, F> Action<'a> for Call<F>
where
    F: for<'s> Fn(
            &'s str,
            usize,
            usize,
            Vec<Value<'s>>,
            Vec<Binding<'a, 's>>,
        ) -> Result<Vec<Value<'s>>, BoxError>
        + Send
        + Sync,
{
    fn invoke<'s>(
        &self,
        input: &'s str,
        start: usize,
        end: usize,
        args: Vec<Value<'s>>,
        kwargs: Vec<Binding<'a, 's>>,
    ) -> Result<Emitted<'a, 's>, BoxError> {
        Ok(((self.0)(input, start, end, args, kwargs)?, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_appends_determined_value() {
        let bind = Bind::new("x");
        let (args, kwargs) = bind
            .invoke("42", 0, 2, vec![Value::from("42")], vec![("y", Value::Int(1))])
            .unwrap();
        assert!(args.is_empty());
        assert_eq!(kwargs, vec![("y", Value::Int(1)), ("x", Value::from("42"))]);
    }

    #[test]
    fn bind_of_nothing_is_the_empty_sentinel() {
        let bind = Bind::new("x");
        let (_, kwargs) = bind.invoke("", 0, 0, Vec::new(), Vec::new()).unwrap();
        assert_eq!(kwargs, vec![("x", Value::None)]);
    }

    #[test]
    fn join_concatenates_strings() {
        let join = Join::new("-");
        let (args, _) = join
            .invoke("ab", 0, 2, vec![Value::from("a"), Value::from("b")], Vec::new())
            .unwrap();
        assert_eq!(args, vec![Value::from("a-b".to_string())]);
    }

    #[test]
    fn join_rejects_non_strings() {
        let join = Join::new("");
        assert!(join
            .invoke("", 0, 0, vec![Value::Int(3)], Vec::new())
            .is_err());
    }
}
