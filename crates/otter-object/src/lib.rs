//! # Otter Object
//!
//! Object/property model of the Otter JavaScript runtime, together with the
//! two engine parts that lean on it hardest: destructuring bindings and
//! iterator/generator control.
//!
//! ## Layout
//!
//! - **Property store**: [`property`], ordered key → descriptor maps and
//!   descriptor validation
//! - **Objects**: [`object`] with exotic hook tables for [`array`],
//!   [`typed_array`], [`array_buffer`] and [`shared_buffer`]
//! - **Bindings**: [`binding`] patterns bound into [`environment`] records
//! - **Iteration**: [`iterator`], [`generator`], [`async_generator`],
//!   [`promise`] and [`job_queue`]
//!
//! Every operation that may look up an intrinsic or run user code takes a
//! [`Realm`] by reference.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod array;
pub mod array_buffer;
pub mod async_generator;
pub mod binding;
pub mod builtins;
pub mod convert;
pub mod environment;
pub mod error;
pub mod generator;
pub mod intrinsics;
pub mod iterator;
pub mod job_queue;
pub mod object;
pub mod operations;
pub mod promise;
pub mod property;
pub mod realm;
pub mod shared_buffer;
pub mod string;
pub mod symbol;
pub mod typed_array;
pub mod value;

pub use binding::{BindingMode, BindingPattern, bind_pattern};
pub use environment::Environment;
pub use error::{ErrorKind, VmError, VmResult};
pub use generator::{GeneratorBody, GeneratorStep, Resumption};
pub use object::{JsObject, ObjectKind};
pub use property::{PartialDescriptor, PropertyDescriptor, PropertyKey};
pub use realm::{Realm, RealmOptions};
pub use string::JsString;
pub use symbol::Symbol;
pub use value::Value;
