/*! Named-type registries for configurable product families.

A [Registry] maps a type name (e.g., `"linear"`) to a [Builder] that
knows how to turn a configuration element into an instance of the
product family `P` (e.g., `dyn QoSFun`). Building always happens in
two explicit stages:

1. [Builder::parse_parameters] extracts the builder's parameters from
   the configuration and checks only that they are present and well
   formed.
2. [Builder::create_instance] checks the domain constraints on those
   parameters and constructs the product.

The intermediate [ParameterBundle] is type-erased so that a builder
can detect bundles that were produced by a different builder. The
same facility backs the QoS-function, task-type and distribution
families.
*/

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::ConfigNode;
use crate::error::{Error, Result};

/// The type-erased parameters produced by [Builder::parse_parameters].
pub type ParameterBundle = Box<dyn Any + Send + Sync>;

/// Knows how to configure and construct one concrete type of the
/// product family `P`.
pub trait Builder<P: ?Sized>: Send + Sync {
    /// Extract the parameters from a configuration element.
    fn parse_parameters(&self, config: &ConfigNode<'_>) -> Result<ParameterBundle>;

    /// Validate previously parsed parameters and construct the product.
    fn create_instance(&self, parameters: &(dyn Any + Send + Sync)) -> Result<Box<P>>;
}

/// Recover the concrete parameter type `T` from a bundle, or report
/// that the bundle belongs to another builder.
pub fn downcast_parameters<'a, T: Any>(
    parameters: &'a (dyn Any + Send + Sync),
    family: &'static str,
    expected: &'static str,
) -> Result<&'a T> {
    parameters
        .downcast_ref::<T>()
        .ok_or(Error::TypeMismatch { family, expected })
}

/// A thread-safe, string-keyed collection of builders for the product
/// family `P`.
pub struct Registry<P: ?Sized> {
    family: &'static str,
    builders: RwLock<BTreeMap<String, Arc<dyn Builder<P>>>>,
}

impl<P: ?Sized + 'static> Registry<P> {
    /// Create an empty registry; `family` names the product family in
    /// log messages and errors.
    pub fn new(family: &'static str) -> Self {
        Registry {
            family,
            builders: RwLock::new(BTreeMap::new()),
        }
    }

    /// The product family served by this registry.
    pub fn family(&self) -> &'static str {
        self.family
    }

    /// Register `builder` under `name`. An existing builder with the
    /// same name is replaced; the return value indicates whether
    /// that happened.
    pub fn register_type<B>(&self, name: impl Into<String>, builder: B) -> bool
    where
        B: Builder<P> + 'static,
    {
        let name = name.into();
        let replaced = self
            .builders
            .write()
            .insert(name.clone(), Arc::new(builder))
            .is_some();
        if replaced {
            warn!(family = self.family, type_name = %name, "replacing registered builder");
        } else {
            debug!(family = self.family, type_name = %name, "registered builder");
        }
        replaced
    }

    /// Check whether a builder is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.builders.read().contains_key(name)
    }

    /// The registered type names, in lexicographic order.
    pub fn type_names(&self) -> Vec<String> {
        self.builders.read().keys().cloned().collect()
    }

    /// Look up the builder registered under `name`.
    pub fn builder(&self, name: &str) -> Result<Arc<dyn Builder<P>>> {
        self.builders
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType {
                family: self.family,
                name: name.to_string(),
            })
    }

    /// Build an instance of the type registered under `name` from the
    /// given configuration element.
    pub fn create(&self, name: &str, config: &ConfigNode<'_>) -> Result<Box<P>> {
        // The lock is not held while the builder runs, so builders may
        // themselves consult registries.
        let builder = self.builder(name)?;
        let parameters = builder.parse_parameters(config)?;
        let product = builder.create_instance(&*parameters)?;
        debug!(family = self.family, type_name = name, path = config.path(), "created instance");
        Ok(product)
    }

    /// Like [Registry::create], but read the type name from the
    /// element's `type` field.
    pub fn create_from(&self, config: &ConfigNode<'_>) -> Result<Box<P>> {
        let name = config.required_str("type")?;
        self.create(name, config)
    }
}

impl<P: ?Sized + 'static> fmt::Debug for Registry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Registry {{ family: {:?}, types: [{}] }}",
            self.family,
            self.builders.read().keys().join(", ")
        )
    }
}
