//! Event stream dispatcher.
//!
//! A [`Stream`] owns a set of nets keyed by schema, one state vector per
//! schema and an append-only history. Events are fired one at a time through
//! [`Stream::dispatch`]; accepted events are logged and routed to the handler
//! registered for their action, rejected ones to the failure handler.

use crate::error::CoreError;
use crate::model::{FireResult, Vector};
use crate::net::Net;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Anything that names a schema, an action and a multiplier.
pub trait StreamEvent {
    fn schema(&self) -> &str;
    fn action(&self) -> &str;
    fn multiple(&self) -> i64 {
        1
    }
}

fn default_multiple() -> i64 {
    1
}

/// A stream event carrying an arbitrary JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub schema: String,
    pub action: String,
    #[serde(default = "default_multiple")]
    pub multiple: i64,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(schema: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            action: action.into(),
            multiple: 1,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_multiple(mut self, multiple: i64) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

impl StreamEvent for Event {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn action(&self) -> &str {
        &self.action
    }

    fn multiple(&self) -> i64 {
        self.multiple
    }
}

/// One accepted event.
#[derive(Debug, Clone, Serialize)]
pub struct EventLog<E> {
    pub seq: u64,
    pub event: E,
    /// Microseconds since the Unix epoch.
    pub ts: u64,
}

/// Read-only view of a stream handed to handlers.
pub struct StreamView<'a, E> {
    history: &'a [EventLog<E>],
    seq: u64,
    states: &'a HashMap<String, Vector>,
}

impl<'a, E> StreamView<'a, E> {
    pub fn history(&self) -> &'a [EventLog<E>] {
        self.history
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Stored state for a schema, if it has been touched since the last
    /// restart.
    pub fn state(&self, schema: &str) -> Option<&'a [i64]> {
        self.states.get(schema).map(Vec::as_slice)
    }
}

pub type Handler<E> = Box<dyn FnMut(&StreamView<'_, E>, &E, &FireResult)>;

/// Sequences firings over a keyed set of nets.
pub struct Stream<E> {
    models: IndexMap<String, Net>,
    states: HashMap<String, Vector>,
    seq: u64,
    history: Vec<EventLog<E>>,
    handlers: HashMap<String, Handler<E>>,
    fail: Option<Handler<E>>,
}

impl<E: StreamEvent> Stream<E> {
    /// Creates a stream over `models`, keyed by each net's schema.
    pub fn new(models: impl IntoIterator<Item = Net>) -> Self {
        let models = models
            .into_iter()
            .map(|net| (net.schema().to_string(), net))
            .collect();
        Self {
            models,
            states: HashMap::new(),
            seq: 0,
            history: Vec::new(),
            handlers: HashMap::new(),
            fail: None,
        }
    }

    pub fn model(&self, schema: &str) -> Result<&Net, CoreError> {
        self.models.get(schema).ok_or_else(|| CoreError::UnknownSchema {
            schema: schema.to_string(),
        })
    }

    /// Registers the handler for accepted events of `action`, replacing any
    /// previous one.
    pub fn on<F>(&mut self, action: impl Into<String>, handler: F)
    where
        F: FnMut(&StreamView<'_, E>, &E, &FireResult) + 'static,
    {
        self.handlers.insert(action.into(), Box::new(handler));
    }

    pub fn off(&mut self, action: &str) {
        self.handlers.remove(action);
    }

    /// Registers the handler for rejected events.
    pub fn on_fail<F>(&mut self, handler: F)
    where
        F: FnMut(&StreamView<'_, E>, &E, &FireResult) + 'static,
    {
        self.fail = Some(Box::new(handler));
    }

    /// Current state for `schema`: the stored vector, or the initial marking
    /// if nothing has been dispatched to it yet.
    pub fn state(&self, schema: &str) -> Result<Vector, CoreError> {
        match self.states.get(schema) {
            Some(state) => Ok(state.clone()),
            None => Ok(self.model(schema)?.initial_vector()),
        }
    }

    pub fn history(&self) -> &[EventLog<E>] {
        &self.history
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Fires `event` against its schema's net and state.
    ///
    /// Rejection is reported through the result's `ok` flag and the failure
    /// handler, not as an error. Errors are reserved for unknown schemas and
    /// actions.
    pub fn dispatch(&mut self, event: E) -> Result<FireResult, CoreError> {
        let net = self
            .models
            .get(event.schema())
            .ok_or_else(|| CoreError::UnknownSchema {
                schema: event.schema().to_string(),
            })?;
        let state = self
            .states
            .entry(event.schema().to_string())
            .or_insert_with(|| net.initial_vector());

        let result = net.fire(state, event.action(), event.multiple())?;

        if !result.ok {
            tracing::debug!(
                "Rejected {}.{} at seq {}",
                event.schema(),
                event.action(),
                self.seq
            );
            if let Some(fail) = self.fail.as_mut() {
                let view = StreamView {
                    history: &self.history,
                    seq: self.seq,
                    states: &self.states,
                };
                fail(&view, &event, &result);
            }
            return Ok(result);
        }

        let action = event.action().to_string();
        self.history.push(EventLog {
            seq: self.seq,
            event,
            ts: now_micros(),
        });
        self.seq += 1;

        if let Some(handler) = self.handlers.get_mut(&action) {
            let view = StreamView {
                history: &self.history,
                seq: self.seq,
                states: &self.states,
            };
            if let Some(entry) = self.history.last() {
                handler(&view, &entry.event, &result);
            }
        }

        Ok(result)
    }

    /// Clears history, sequence and every stored state.
    pub fn restart(&mut self) {
        self.seq = 0;
        self.history.clear();
        self.states.clear();
        tracing::debug!("Stream restarted");
    }
}

fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}
