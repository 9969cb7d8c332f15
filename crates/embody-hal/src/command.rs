//! [`CommandTable`] – typed, per-driver command dispatch.
//!
//! Each driver type declares the commands an operator may invoke on it by
//! name.  A command takes either no argument or exactly one string argument
//! and returns a string.  Commands marked internal are listed (so callers get
//! a precise "not accessible" answer) but cannot be invoked from outside.
//!
//! ```rust
//! use embody_hal::command::CommandTable;
//!
//! struct Lamp { on: bool }
//!
//! let table = CommandTable::<Lamp>::new()
//!     .public("state", |lamp| Ok(if lamp.on { "on".into() } else { "off".into() }))
//!     .public_unary("echo", |_, arg| Ok(arg.to_string()));
//!
//! let lamp = Lamp { on: true };
//! assert_eq!(table.invoke("lamp-1", &lamp, "state", &[]).unwrap(), "on");
//! assert!(table.invoke("lamp-1", &lamp, "blink", &[]).is_err());
//! ```

use std::collections::BTreeMap;

use embody_types::DispatchError;

type Nullary<S> = fn(&S) -> Result<String, String>;
type Unary<S> = fn(&S, &str) -> Result<String, String>;

enum Handler<S> {
    Nullary(Nullary<S>),
    Unary(Unary<S>),
}

impl<S> Handler<S> {
    fn arity(&self) -> usize {
        match self {
            Handler::Nullary(_) => 0,
            Handler::Unary(_) => 1,
        }
    }
}

struct Command<S> {
    handler: Handler<S>,
    public: bool,
}

/// Name-indexed command table for driver type `S`.
pub struct CommandTable<S> {
    commands: BTreeMap<&'static str, Command<S>>,
}

impl<S> Default for CommandTable<S> {
    fn default() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }
}

impl<S> CommandTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an externally invocable command without arguments.
    pub fn public(self, name: &'static str, f: Nullary<S>) -> Self {
        self.add(name, Handler::Nullary(f), true)
    }

    /// Register an externally invocable command with one argument.
    pub fn public_unary(self, name: &'static str, f: Unary<S>) -> Self {
        self.add(name, Handler::Unary(f), true)
    }

    /// Register a command that exists but may not be invoked externally.
    pub fn internal(self, name: &'static str, f: Nullary<S>) -> Self {
        self.add(name, Handler::Nullary(f), false)
    }

    fn add(mut self, name: &'static str, handler: Handler<S>, public: bool) -> Self {
        self.commands.insert(name, Command { handler, public });
        self
    }

    /// Names of the externally invocable commands, sorted.
    pub fn public_names(&self) -> Vec<&'static str> {
        self.commands
            .iter()
            .filter(|(_, c)| c.public)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Look up `method` and call it on `target`.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::NoSuchMethod`] – no command of that name.
    /// - [`DispatchError::NotAccessible`] – the command is internal.
    /// - [`DispatchError::BadArguments`] – wrong number of arguments.
    /// - [`DispatchError::Failed`] – the command itself reported an error.
    pub fn invoke(
        &self,
        sensor_id: &str,
        target: &S,
        method: &str,
        args: &[String],
    ) -> Result<String, DispatchError> {
        let command = self
            .commands
            .get(method)
            .ok_or_else(|| DispatchError::NoSuchMethod {
                sensor: sensor_id.to_string(),
                method: method.to_string(),
            })?;

        if !command.public {
            return Err(DispatchError::NotAccessible {
                method: method.to_string(),
            });
        }

        let expected = command.handler.arity();
        if args.len() != expected {
            return Err(DispatchError::BadArguments {
                method: method.to_string(),
                expected,
                given: args.len(),
            });
        }

        let result = match (&command.handler, args) {
            (Handler::Nullary(f), []) => f(target),
            (Handler::Unary(f), [arg]) => f(target, arg),
            // Arity was checked above.
            _ => unreachable!("arity mismatch after check"),
        };

        result.map_err(|details| DispatchError::Failed {
            method: method.to_string(),
            details,
        })
    }
}
