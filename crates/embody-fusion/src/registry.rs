//! [`PluginRegistry`] – maps fuser and filter names to their constructors.

use std::collections::HashMap;
use std::time::Duration;

use embody_types::{Arguments, EmbodyError};

use crate::adaptive::AdaptiveDoubleExponentialFilter;
use crate::dominance::ConfidenceDominanceFuser;
use crate::double_exponential::DoubleExponentialFilter;
use crate::filter::Filter;
use crate::fuser::Fuser;
use crate::weighted::ConfidenceWeightedFuser;

/// Controller settings a plugin may depend on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PluginContext {
    /// Ticks per second.
    pub update_frequency: f64,
    /// How long a channel may stay untracked before it snaps back to its
    /// default pose.
    pub return_to_default: Duration,
}

impl Default for PluginContext {
    fn default() -> Self {
        Self {
            update_frequency: 30.0,
            return_to_default: Duration::from_millis(2000),
        }
    }
}

pub type FuserConstructor =
    fn(&PluginContext, &Arguments) -> Result<Box<dyn Fuser>, EmbodyError>;
pub type FilterConstructor =
    fn(&PluginContext, &Arguments) -> Result<Box<dyn Filter>, EmbodyError>;

/// Name-indexed fuser and filter registry.
///
/// [`Default`] holds the built-in plugins.
pub struct PluginRegistry {
    fusers: HashMap<String, FuserConstructor>,
    filters: HashMap<String, FilterConstructor>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_fuser(ConfidenceWeightedFuser::NAME, |ctx, args| {
            Ok(Box::new(ConfidenceWeightedFuser::from_args(
                ctx.return_to_default,
                args,
            )))
        });
        registry.register_fuser(ConfidenceDominanceFuser::NAME, |ctx, args| {
            Ok(Box::new(ConfidenceDominanceFuser::from_args(
                ctx.return_to_default,
                args,
            )))
        });
        registry.register_filter(DoubleExponentialFilter::NAME, |_, args| {
            Ok(Box::new(DoubleExponentialFilter::from_args(args)?))
        });
        registry.register_filter(AdaptiveDoubleExponentialFilter::NAME, |ctx, args| {
            Ok(Box::new(AdaptiveDoubleExponentialFilter::from_args(
                args,
                ctx.update_frequency,
            )?))
        });
        registry
    }
}

impl PluginRegistry {
    /// The fuser used when configuration names none.
    pub const DEFAULT_FUSER: &'static str = ConfidenceWeightedFuser::NAME;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            fusers: HashMap::new(),
            filters: HashMap::new(),
        }
    }

    pub fn register_fuser(&mut self, name: impl Into<String>, constructor: FuserConstructor) {
        self.fusers.insert(name.into(), constructor);
    }

    pub fn register_filter(&mut self, name: impl Into<String>, constructor: FilterConstructor) {
        self.filters.insert(name.into(), constructor);
    }

    pub fn fuser_names(&self) -> Vec<&str> {
        sorted(self.fusers.keys())
    }

    pub fn filter_names(&self) -> Vec<&str> {
        sorted(self.filters.keys())
    }

    /// Construct fuser `name`.
    ///
    /// # Errors
    ///
    /// - [`EmbodyError::UnknownPlugin`] when `name` is not registered.
    /// - Any error the constructor reports for its arguments.
    pub fn create_fuser(
        &self,
        name: &str,
        ctx: &PluginContext,
        args: &Arguments,
    ) -> Result<Box<dyn Fuser>, EmbodyError> {
        let constructor = self.fusers.get(name).ok_or_else(|| unknown("fuser", name))?;
        constructor(ctx, args)
    }

    /// Construct filter `name`.
    ///
    /// # Errors
    ///
    /// - [`EmbodyError::UnknownPlugin`] when `name` is not registered.
    /// - Any error the constructor reports for its arguments.
    pub fn create_filter(
        &self,
        name: &str,
        ctx: &PluginContext,
        args: &Arguments,
    ) -> Result<Box<dyn Filter>, EmbodyError> {
        let constructor = self.filters.get(name).ok_or_else(|| unknown("filter", name))?;
        constructor(ctx, args)
    }
}

fn sorted<'a>(names: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut names: Vec<&str> = names.map(String::as_str).collect();
    names.sort_unstable();
    names
}

fn unknown(category: &str, name: &str) -> EmbodyError {
    EmbodyError::UnknownPlugin {
        category: category.to_string(),
        name: name.to_string(),
    }
}
