//! Constructor signature analysis.
//!
//! Every constructor is a plain Rust function or closure. Its parameter types
//! classify themselves through [`Dependency`], its return type through
//! [`ConstructorOutput`], and [`Constructor`] glues both together for
//! functions of up to twelve arguments. The result of the analysis is a
//! [`Signature`]: the identity the constructor provides plus the ordered
//! dependency descriptors it needs.

use std::sync::Arc;

use crate::creation::{Instance, ObjectFactory};
use crate::error::{DiError, DiResult};
use crate::factory::Factory;
use crate::key::{nil_key, Key};
use crate::{Container, Context};

/// How a constructor argument is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Resolved from the graph by identity
    Direct,
    /// Resolved from the graph, restricted to factories carrying the qualifier
    Qualified(Key),
    /// Deferred handle resolved through the scope on every call
    Provider,
    /// Deferred handle whose instances are owned by the caller
    Unmanaged,
    /// The call-time ambient context
    Context,
    /// The owning container
    Container,
}

/// How a factory matched a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Structural,
}

/// Descriptor of one constructor argument.
///
/// `key` is the identity of the argument type as written (for example
/// `Provider<Database>`), `value` is the identity the graph has to supply
/// (`Database`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    key: Key,
    value: Key,
    kind: ParamKind,
}

impl Parameter {
    pub fn direct(key: Key) -> Self {
        Self { key, value: key, kind: ParamKind::Direct }
    }

    pub fn qualified(key: Key, value: Key, qualifier: Key) -> Self {
        Self { key, value, kind: ParamKind::Qualified(qualifier) }
    }

    pub fn provider(key: Key, value: Key) -> Self {
        Self { key, value, kind: ParamKind::Provider }
    }

    pub fn unmanaged(key: Key, value: Key) -> Self {
        Self { key, value, kind: ParamKind::Unmanaged }
    }

    pub(crate) fn ambient(key: Key, kind: ParamKind) -> Self {
        Self { key, value: key, kind }
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn value(&self) -> Key {
        self.value
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn qualifier(&self) -> Option<Key> {
        match self.kind {
            ParamKind::Qualified(q) => Some(q),
            _ => None,
        }
    }

    /// Provider or unmanaged provider.
    pub fn is_deferred(&self) -> bool {
        matches!(self.kind, ParamKind::Provider | ParamKind::Unmanaged)
    }

    /// Supplied from the call itself rather than the graph.
    pub fn is_ambient(&self) -> bool {
        matches!(self.kind, ParamKind::Context | ParamKind::Container)
    }

    /// Classifies `factory` as a candidate for this parameter.
    ///
    /// Qualified parameters only accept factories carrying the qualifier;
    /// wrapper parameters match against the wrapped value identity.
    pub fn candidate_match(&self, factory: &Factory) -> Option<MatchKind> {
        if self.is_ambient() || !factory.returns_value() {
            return None;
        }
        if let Some(qualifier) = self.qualifier() {
            if !factory.has_qualifier(qualifier) {
                return None;
            }
        }
        if factory.key() == self.value {
            Some(MatchKind::Exact)
        } else if factory.is_assignable_to(self.value) {
            Some(MatchKind::Structural)
        } else {
            None
        }
    }
}

/// A resolved constructor argument, before conversion to its typed form.
#[derive(Clone)]
pub enum Argument {
    Instance(Instance),
    Provider(ObjectFactory),
    Unmanaged(ObjectFactory),
    Context(Context),
    Container(Container),
}

impl Argument {
    fn describe(&self) -> &'static str {
        match self {
            Argument::Instance(_) => "instance",
            Argument::Provider(_) => "provider",
            Argument::Unmanaged(_) => "unmanaged provider",
            Argument::Context(_) => "context",
            Argument::Container(_) => "container",
        }
    }
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// A type that can appear as a constructor parameter.
///
/// Implemented for `Arc<T>` (direct dependency), the wrapper shapes
/// [`Qualified`](crate::Qualified), [`Provider`](crate::Provider) and
/// [`Unmanaged`](crate::Unmanaged), and the ambient [`Context`] and
/// [`Container`].
pub trait Dependency: Sized + Send + 'static {
    /// Static classification of this parameter shape.
    fn parameter() -> Parameter;

    /// Rebuilds the typed argument from its resolved form.
    fn from_argument(argument: Argument) -> DiResult<Self>;
}

impl<T> Dependency for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn parameter() -> Parameter {
        Parameter::direct(Key::of::<T>())
    }

    fn from_argument(argument: Argument) -> DiResult<Self> {
        match argument {
            Argument::Instance(instance) => instance
                .downcast::<T>()
                .ok_or(DiError::TypeMismatch(std::any::type_name::<T>())),
            _ => Err(DiError::TypeMismatch(std::any::type_name::<T>())),
        }
    }
}

impl Dependency for Context {
    fn parameter() -> Parameter {
        Parameter::ambient(Key::of::<Context>(), ParamKind::Context)
    }

    fn from_argument(argument: Argument) -> DiResult<Self> {
        match argument {
            Argument::Context(ctx) => Ok(ctx),
            _ => Err(DiError::TypeMismatch(std::any::type_name::<Context>())),
        }
    }
}

impl Dependency for Container {
    fn parameter() -> Parameter {
        Parameter::ambient(Key::of::<Container>(), ParamKind::Container)
    }

    fn from_argument(argument: Argument) -> DiResult<Self> {
        match argument {
            Argument::Container(container) => Ok(container),
            _ => Err(DiError::TypeMismatch(std::any::type_name::<Container>())),
        }
    }
}

/// Error type returned by fallible constructors once boxed.
pub type ConstructorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Return arrangement of a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnShape {
    /// Identity of the produced value, `None` for constructors returning nothing
    pub value: Option<Key>,
    pub error: bool,
}

/// A type that can be returned by a constructor.
///
/// Accepted shapes are `Arc<T>`, `Result<Arc<T>, E>`, `()` and
/// `Result<(), E>`. Constructors without a value are only useful as startup
/// hooks.
pub trait ConstructorOutput: 'static {
    /// Component type produced
    type Component: ?Sized + Send + Sync + 'static;

    fn shape() -> ReturnShape;

    fn into_result(self) -> Result<Option<Arc<Self::Component>>, ConstructorError>;
}

impl<T> ConstructorOutput for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    type Component = T;

    fn shape() -> ReturnShape {
        ReturnShape { value: Some(Key::of::<T>()), error: false }
    }

    fn into_result(self) -> Result<Option<Arc<T>>, ConstructorError> {
        Ok(Some(self))
    }
}

impl<T, E> ConstructorOutput for Result<Arc<T>, E>
where
    T: ?Sized + Send + Sync + 'static,
    E: Into<ConstructorError> + 'static,
{
    type Component = T;

    fn shape() -> ReturnShape {
        ReturnShape { value: Some(Key::of::<T>()), error: true }
    }

    fn into_result(self) -> Result<Option<Arc<T>>, ConstructorError> {
        self.map(Some).map_err(Into::into)
    }
}

impl ConstructorOutput for () {
    type Component = crate::key::NilReturn;

    fn shape() -> ReturnShape {
        ReturnShape { value: None, error: false }
    }

    fn into_result(self) -> Result<Option<Arc<Self::Component>>, ConstructorError> {
        Ok(None)
    }
}

impl<E> ConstructorOutput for Result<(), E>
where
    E: Into<ConstructorError> + 'static,
{
    type Component = crate::key::NilReturn;

    fn shape() -> ReturnShape {
        ReturnShape { value: None, error: true }
    }

    fn into_result(self) -> Result<Option<Arc<Self::Component>>, ConstructorError> {
        self.map(|_| None).map_err(Into::into)
    }
}

/// A callable usable as a component constructor.
///
/// `Args` is the tuple of parameter types and only exists to keep the
/// per-arity implementations apart; it is always inferred.
pub trait Constructor<Args>: Send + Sync + 'static {
    type Output: ConstructorOutput;

    /// Parameter descriptors in declaration order.
    fn parameters() -> Vec<Parameter>;

    /// Invokes the constructor with positional arguments.
    fn construct(&self, args: Vec<Argument>) -> DiResult<Self::Output>;
}

macro_rules! impl_constructor {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> Constructor<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out + Send + Sync + 'static,
            Out: ConstructorOutput,
            $($arg: Dependency,)*
        {
            type Output = Out;

            fn parameters() -> Vec<Parameter> {
                vec![$($arg::parameter()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn construct(&self, args: Vec<Argument>) -> DiResult<Out> {
                let mut args = args.into_iter();
                $(
                    let $arg = match args.next() {
                        Some(argument) => $arg::from_argument(argument)?,
                        None => return Err(DiError::TypeMismatch(std::any::type_name::<$arg>())),
                    };
                )*
                Ok((self)($($arg),*))
            }
        }
    };
}

impl_constructor!();
impl_constructor!(A1);
impl_constructor!(A1, A2);
impl_constructor!(A1, A2, A3);
impl_constructor!(A1, A2, A3, A4);
impl_constructor!(A1, A2, A3, A4, A5);
impl_constructor!(A1, A2, A3, A4, A5, A6);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);

/// Result of analysing a constructor or a bare value.
#[derive(Debug, Clone)]
pub struct Signature {
    pub returns: ReturnShape,
    pub params: Vec<Parameter>,
}

impl Signature {
    /// Analyses the constructor type `C`.
    pub fn of<C, Args>() -> DiResult<Self>
    where
        C: Constructor<Args>,
    {
        let signature = Signature {
            returns: <C::Output as ConstructorOutput>::shape(),
            params: C::parameters(),
        };
        signature.validate()?;
        Ok(signature)
    }

    /// A bare value is a zero-argument constructor returning itself.
    pub fn of_value<T: ?Sized + Send + Sync + 'static>() -> DiResult<Self> {
        let signature = Signature {
            returns: ReturnShape { value: Some(Key::of::<T>()), error: false },
            params: Vec::new(),
        };
        signature.validate()?;
        Ok(signature)
    }

    /// Identity provided by the constructor.
    pub fn key(&self) -> Key {
        self.returns.value.unwrap_or_else(nil_key)
    }

    fn validate(&self) -> DiResult<()> {
        if let Some(value) = self.returns.value {
            if value.is_reserved() {
                return Err(DiError::InvalidProviderShape(format!(
                    "{} cannot be provided by a constructor",
                    value
                )));
            }
        }

        for param in &self.params {
            match param.kind() {
                ParamKind::Context | ParamKind::Container => {}
                ParamKind::Direct if param.key().is_reserved() => {
                    return Err(DiError::InvalidProviderShape(format!(
                        "parameter Arc<{}> must be requested by value",
                        param.key()
                    )));
                }
                _ if param.value().is_reserved() => {
                    return Err(DiError::InvalidProviderShape(format!(
                        "{} wraps a reserved identity",
                        param.key()
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}
