//! JavaScript AsyncGenerator implementation
//!
//! Requests (`next`/`return`/`throw`) are queued FIFO, each with its own
//! promise, and served one at a time. The body runs synchronously until it
//! yields, awaits or finishes; awaits suspend it until a job on the realm's
//! queue settles the awaited promise.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::VmResult;
use crate::generator::{GeneratorBody, GeneratorFrame, GeneratorStep, Resumption};
use crate::iterator::create_iter_result_object;
use crate::object::{JsObject, ObjectKind};
use crate::promise::{self, Settlement};
use crate::realm::Realm;
use crate::value::Value;

/// Async generator execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncGeneratorState {
    /// Created, body not entered yet
    SuspendedStart,
    /// Paused at a `yield`
    SuspendedYield,
    /// Body running, or suspended at an `await`
    Executing,
    /// Completed, awaiting the operand of a `return` request
    AwaitingReturn,
    /// Body finished
    Completed,
}

struct AsyncGeneratorRequest {
    completion: Resumption,
    promise: Arc<JsObject>,
}

struct AsyncGeneratorInner {
    state: AsyncGeneratorState,
    frame: GeneratorFrame,
    body: Option<GeneratorBody>,
    queue: VecDeque<AsyncGeneratorRequest>,
}

/// What a settled await resumes
#[derive(Debug, Clone, Copy)]
enum AwaitTarget {
    /// `await` inside the body
    Body,
    /// operand of `yield`
    Yield,
    /// operand of `return` inside the body
    Return,
    /// operand of a `return(v)` request on a finished generator
    ReturnRequest,
}

/// An async generator instance
pub struct JsAsyncGenerator {
    inner: Mutex<AsyncGeneratorInner>,
}

impl std::fmt::Debug for JsAsyncGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("AsyncGenerator")
            .field("state", &inner.state)
            .field("queued", &inner.queue.len())
            .finish()
    }
}

impl JsAsyncGenerator {
    /// Create a new async generator over `body`
    pub fn new(body: GeneratorBody) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(AsyncGeneratorInner {
                state: AsyncGeneratorState::SuspendedStart,
                frame: GeneratorFrame::default(),
                body: Some(body),
                queue: VecDeque::new(),
            }),
        })
    }

    /// Get the current state
    pub fn state(&self) -> AsyncGeneratorState {
        self.inner.lock().state
    }

    /// Number of requests not yet settled
    pub fn pending_requests(&self) -> usize {
        self.inner.lock().queue.len()
    }

    fn transition(inner: &mut AsyncGeneratorInner, to: AsyncGeneratorState) {
        tracing::debug!(target: "otter::generator", from = ?inner.state, to = ?to, "async generator state");
        inner.state = to;
    }

    fn set_state(&self, to: AsyncGeneratorState) {
        Self::transition(&mut self.inner.lock(), to);
    }

    /// AsyncGeneratorEnqueue: queue a request and return its promise. The
    /// generator is resumed right away unless a request is in flight.
    pub fn enqueue(self: &Arc<Self>, realm: &Realm, completion: Resumption) -> VmResult<Arc<JsObject>> {
        let promise = promise::new_promise(realm);
        let idle = {
            let mut inner = self.inner.lock();
            inner.queue.push_back(AsyncGeneratorRequest {
                completion,
                promise: promise.clone(),
            });
            !matches!(
                inner.state,
                AsyncGeneratorState::Executing | AsyncGeneratorState::AwaitingReturn
            )
        };
        if idle {
            self.resume_next(realm)?;
        }
        Ok(promise)
    }

    /// AsyncGeneratorResumeNext: serve queued requests until one suspends
    /// the generator or the queue is empty.
    fn resume_next(self: &Arc<Self>, realm: &Realm) -> VmResult<()> {
        loop {
            let mut inner = self.inner.lock();
            if matches!(
                inner.state,
                AsyncGeneratorState::Executing | AsyncGeneratorState::AwaitingReturn
            ) {
                return Ok(());
            }
            let Some(completion) = inner.queue.front().map(|r| r.completion.clone()) else {
                return Ok(());
            };

            if inner.state == AsyncGeneratorState::SuspendedStart
                && !matches!(completion, Resumption::Next(_))
            {
                inner.body = None;
                Self::transition(&mut inner, AsyncGeneratorState::Completed);
            }

            if inner.state == AsyncGeneratorState::Completed {
                match completion {
                    Resumption::Return(value) => {
                        Self::transition(&mut inner, AsyncGeneratorState::AwaitingReturn);
                        drop(inner);
                        return self.await_value(realm, value, AwaitTarget::ReturnRequest);
                    }
                    Resumption::Throw(reason) => {
                        drop(inner);
                        self.complete_step(realm, Err(reason), true)?;
                    }
                    Resumption::Next(_) => {
                        drop(inner);
                        self.complete_step(realm, Ok(Value::undefined()), true)?;
                    }
                }
                continue;
            }

            Self::transition(&mut inner, AsyncGeneratorState::Executing);
            drop(inner);
            return self.run_body(realm, completion);
        }
    }

    /// Run the body until it suspends, then act on what it did
    fn run_body(self: &Arc<Self>, realm: &Realm, resumption: Resumption) -> VmResult<()> {
        let (body, frame) = {
            let mut inner = self.inner.lock();
            (inner.body.take(), std::mem::take(&mut inner.frame))
        };
        let mut frame = frame;
        let (body, outcome) = match body {
            Some(mut body) => {
                let outcome = body.run(realm, &mut frame, resumption);
                (Some(body), outcome)
            }
            None => (None, Ok(GeneratorStep::Return(Value::undefined()))),
        };
        {
            let mut inner = self.inner.lock();
            inner.frame = frame;
            inner.body = body;
        }

        match outcome {
            Ok(GeneratorStep::Await(value)) => self.await_value(realm, value, AwaitTarget::Body),
            Ok(GeneratorStep::Yield(value)) => self.await_value(realm, value, AwaitTarget::Yield),
            Ok(GeneratorStep::Return(value)) => self.await_value(realm, value, AwaitTarget::Return),
            Err(err) => {
                let reason = realm.error_to_value(err);
                tracing::debug!(target: "otter::generator", "async generator body threw");
                self.finish();
                self.complete_step(realm, Err(reason), true)?;
                self.resume_next(realm)
            }
        }
    }

    fn finish(&self) {
        let mut inner = self.inner.lock();
        inner.body = None;
        Self::transition(&mut inner, AsyncGeneratorState::Completed);
    }

    /// Await `value`, resuming through a job once it settles
    fn await_value(self: &Arc<Self>, realm: &Realm, value: Value, target: AwaitTarget) -> VmResult<()> {
        let awaited = match promise::promise_resolve(realm, value) {
            Ok(awaited) => awaited,
            Err(err) => {
                let reason = realm.error_to_value(err);
                return self.after_await(realm, target, Err(reason));
            }
        };
        let generator = self.clone();
        promise::then_native(
            realm,
            &awaited,
            Box::new(move |realm: &Realm, outcome: Settlement| generator.after_await(realm, target, outcome)),
        )
    }

    fn after_await(self: &Arc<Self>, realm: &Realm, target: AwaitTarget, outcome: Settlement) -> VmResult<()> {
        match (target, outcome) {
            (AwaitTarget::Body, Ok(value)) => self.run_body(realm, Resumption::Next(value)),
            (AwaitTarget::Body | AwaitTarget::Yield | AwaitTarget::Return, Err(reason)) => {
                self.run_body(realm, Resumption::Throw(reason))
            }
            (AwaitTarget::Yield, Ok(value)) => {
                self.set_state(AsyncGeneratorState::SuspendedYield);
                self.complete_step(realm, Ok(value), false)?;
                self.resume_next(realm)
            }
            (AwaitTarget::Return, Ok(value)) => {
                self.finish();
                self.complete_step(realm, Ok(value), true)?;
                self.resume_next(realm)
            }
            (AwaitTarget::ReturnRequest, outcome) => {
                self.set_state(AsyncGeneratorState::Completed);
                self.complete_step(realm, outcome, true)?;
                self.resume_next(realm)
            }
        }
    }

    /// AsyncGeneratorCompleteStep: settle the front request's promise
    fn complete_step(&self, realm: &Realm, outcome: Settlement, done: bool) -> VmResult<()> {
        let Some(request) = self.inner.lock().queue.pop_front() else {
            return Ok(());
        };
        match outcome {
            Ok(value) => {
                let result = create_iter_result_object(realm, value, done);
                promise::resolve_promise(realm, &request.promise, result)
            }
            Err(reason) => promise::reject_promise(realm, &request.promise, reason),
        }
    }
}

/// Create an async generator object over `body`
pub fn create_async_generator(realm: &Realm, body: GeneratorBody) -> Arc<JsObject> {
    Arc::new(JsObject::with_kind(
        Some(realm.intrinsics().async_generator_prototype.clone()),
        ObjectKind::AsyncGenerator(JsAsyncGenerator::new(body)),
    ))
}
