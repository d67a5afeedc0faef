//! JavaScript Generator implementation
//!
//! A generator body is a resumable closure over a saved [`GeneratorFrame`].
//! Each resumption hands it a [`Resumption`] and it answers with the next
//! [`GeneratorStep`]; the body keeps its position in `frame.pc`.
//!
//! ```ignore
//! // function* gen() { yield 1; return 2; }
//! let body = GeneratorBody::new(|_realm, frame, resumption| {
//!     frame.pc += 1;
//!     match (frame.pc, resumption) {
//!         (_, Resumption::Throw(e)) => Err(VmError::exception(e)),
//!         (_, Resumption::Return(v)) => Ok(GeneratorStep::Return(v)),
//!         (1, _) => Ok(GeneratorStep::Yield(Value::int32(1))),
//!         _ => Ok(GeneratorStep::Return(Value::int32(2))),
//!     }
//! });
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::{JsObject, ObjectKind};
use crate::realm::Realm;
use crate::value::Value;

/// Generator execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Created, body not entered yet
    SuspendedStart,
    /// Paused at a `yield`
    SuspendedYield,
    /// Generator is currently executing
    Executing,
    /// Generator has completed (returned or thrown)
    Completed,
}

/// Saved execution context for generator suspension
#[derive(Debug, Clone, Default)]
pub struct GeneratorFrame {
    /// Resume point, owned by the body
    pub pc: usize,
    /// Local variables
    pub locals: Vec<Value>,
}

impl GeneratorFrame {
    /// Read a local, `undefined` if never written
    pub fn local(&self, slot: usize) -> Value {
        self.locals.get(slot).cloned().unwrap_or_default()
    }

    /// Write a local, growing the frame as needed
    pub fn set_local(&mut self, slot: usize, value: Value) {
        if slot >= self.locals.len() {
            self.locals.resize(slot + 1, Value::undefined());
        }
        self.locals[slot] = value;
    }
}

/// How a suspended body is resumed
#[derive(Debug, Clone, PartialEq)]
pub enum Resumption {
    /// `next(v)`, or a fulfilled await
    Next(Value),
    /// `return(v)`
    Return(Value),
    /// `throw(e)`, or a rejected await
    Throw(Value),
}

/// What the body did before suspending or finishing
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorStep {
    /// `yield value`
    Yield(Value),
    /// `await value` (async generators only)
    Await(Value),
    /// `return value`
    Return(Value),
}

type BodyFn = dyn FnMut(&Realm, &mut GeneratorFrame, Resumption) -> VmResult<GeneratorStep> + Send;

/// The resumable body of a (possibly async) generator
pub struct GeneratorBody(Box<BodyFn>);

impl GeneratorBody {
    /// Wrap a resumable closure
    pub fn new<F>(body: F) -> Self
    where
        F: FnMut(&Realm, &mut GeneratorFrame, Resumption) -> VmResult<GeneratorStep>
            + Send
            + 'static,
    {
        Self(Box::new(body))
    }

    /// A body that yields each value in turn and then returns `undefined`.
    /// `return`/`throw` complete it.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::new(move |_realm, frame, resumption| match resumption {
            Resumption::Throw(e) => Err(VmError::exception(e)),
            Resumption::Return(v) => Ok(GeneratorStep::Return(v)),
            Resumption::Next(_) => {
                let step = match values.get(frame.pc) {
                    Some(v) => GeneratorStep::Yield(v.clone()),
                    None => GeneratorStep::Return(Value::undefined()),
                };
                frame.pc += 1;
                Ok(step)
            }
        })
    }

    pub(crate) fn run(
        &mut self,
        realm: &Realm,
        frame: &mut GeneratorFrame,
        resumption: Resumption,
    ) -> VmResult<GeneratorStep> {
        (self.0)(realm, frame, resumption)
    }
}

impl std::fmt::Debug for GeneratorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GeneratorBody")
    }
}

struct GeneratorInner {
    state: GeneratorState,
    frame: GeneratorFrame,
    /// `None` while the body runs and after completion
    body: Option<GeneratorBody>,
}

/// A JavaScript Generator object
///
/// Generators maintain their execution state across yields.
pub struct JsGenerator {
    inner: Mutex<GeneratorInner>,
}

impl std::fmt::Debug for JsGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Generator")
            .field("state", &inner.state)
            .field("pc", &inner.frame.pc)
            .finish()
    }
}

impl JsGenerator {
    /// Create a new generator
    pub fn new(body: GeneratorBody) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(GeneratorInner {
                state: GeneratorState::SuspendedStart,
                frame: GeneratorFrame::default(),
                body: Some(body),
            }),
        })
    }

    /// Get the current state
    pub fn state(&self) -> GeneratorState {
        self.inner.lock().state
    }

    /// Check if generator is completed
    pub fn is_completed(&self) -> bool {
        self.state() == GeneratorState::Completed
    }

    fn transition(inner: &mut GeneratorInner, to: GeneratorState) {
        tracing::debug!(target: "otter::generator", from = ?inner.state, to = ?to, "generator state");
        inner.state = to;
    }

    /// GeneratorResume / GeneratorResumeAbrupt
    pub fn resume(&self, realm: &Realm, resumption: Resumption) -> VmResult<IteratorResult> {
        let (mut body, mut frame) = {
            let mut inner = self.inner.lock();
            match inner.state {
                GeneratorState::Executing => {
                    return Err(VmError::type_error("Generator is already running"));
                }
                GeneratorState::SuspendedStart
                    if !matches!(resumption, Resumption::Next(_)) =>
                {
                    Self::transition(&mut inner, GeneratorState::Completed);
                    inner.body = None;
                    return finished(resumption);
                }
                GeneratorState::Completed => return finished(resumption),
                _ => {}
            }
            let Some(body) = inner.body.take() else {
                Self::transition(&mut inner, GeneratorState::Completed);
                return finished(resumption);
            };
            Self::transition(&mut inner, GeneratorState::Executing);
            (body, std::mem::take(&mut inner.frame))
        };

        let outcome = body.run(realm, &mut frame, resumption);

        let mut inner = self.inner.lock();
        inner.frame = frame;
        match outcome {
            Ok(GeneratorStep::Yield(value)) => {
                inner.body = Some(body);
                Self::transition(&mut inner, GeneratorState::SuspendedYield);
                Ok(IteratorResult::yielded(value))
            }
            Ok(GeneratorStep::Return(value)) => {
                Self::transition(&mut inner, GeneratorState::Completed);
                Ok(IteratorResult::done(value))
            }
            Ok(GeneratorStep::Await(_)) => {
                Self::transition(&mut inner, GeneratorState::Completed);
                Err(VmError::syntax_error("await is only valid in async generators"))
            }
            Err(err) => {
                Self::transition(&mut inner, GeneratorState::Completed);
                Err(err)
            }
        }
    }
}

/// Outcome of resuming a generator that will not run its body again
fn finished(resumption: Resumption) -> VmResult<IteratorResult> {
    match resumption {
        Resumption::Next(_) => Ok(IteratorResult::done_undefined()),
        Resumption::Return(v) => Ok(IteratorResult::done(v)),
        Resumption::Throw(e) => Err(VmError::exception(e)),
    }
}

/// Create a generator object over `body`
pub fn create_generator(realm: &Realm, body: GeneratorBody) -> Arc<JsObject> {
    Arc::new(JsObject::with_kind(
        Some(realm.intrinsics().generator_prototype.clone()),
        ObjectKind::Generator(JsGenerator::new(body)),
    ))
}

/// Result of calling generator.next()
#[derive(Debug, Clone, PartialEq)]
pub struct IteratorResult {
    /// The yielded/returned value
    pub value: Value,
    /// Whether the generator is done
    pub done: bool,
}

impl IteratorResult {
    /// Create a new iterator result
    pub fn new(value: Value, done: bool) -> Self {
        Self { value, done }
    }

    /// Create a "not done" result
    pub fn yielded(value: Value) -> Self {
        Self { value, done: false }
    }

    /// Create a "done" result
    pub fn done(value: Value) -> Self {
        Self { value, done: true }
    }

    /// Create a "done with undefined" result
    pub fn done_undefined() -> Self {
        Self::done(Value::undefined())
    }
}
