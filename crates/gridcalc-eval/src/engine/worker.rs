//! Message protocol and the dedicated engine thread.
//!
//! Requests are processed strictly one at a time; each produces its
//! responses before the next request is read, so response order follows
//! request order.

use std::collections::BTreeMap;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use gridcalc_common::LiteralValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::EvalConfig;
use super::eval::{CellInput, Engine, EngineError, Updates};

/// Raw cell content as sent by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl InputValue {
    /// Interpretation used by `load`: text starting with `=` is a formula.
    pub fn into_cell_input(self) -> CellInput {
        match self {
            InputValue::Text(s) => CellInput::from_raw(&s),
            other => CellInput::Value(other.into_literal()),
        }
    }

    /// Interpretation used by `setCellValue`: never a formula.
    pub fn into_literal(self) -> LiteralValue {
        match self {
            InputValue::Number(n) => LiteralValue::Number(n),
            InputValue::Bool(b) => LiteralValue::Boolean(b),
            InputValue::Text(s) => LiteralValue::from_input(&s),
            InputValue::Empty => LiteralValue::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    Load {
        cells: BTreeMap<String, InputValue>,
    },
    #[serde(rename_all = "camelCase")]
    SetFormula { cell_id: String, formula: String },
    #[serde(rename_all = "camelCase")]
    SetCellValue { cell_id: String, value: InputValue },
    #[serde(rename_all = "camelCase")]
    ClearCell { cell_id: String },
    CopyCell { source: String, target: String },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Load { .. } => "load",
            Request::SetFormula { .. } => "setFormula",
            Request::SetCellValue { .. } => "setCellValue",
            Request::ClearCell { .. } => "clearCell",
            Request::CopyCell { .. } => "copyCell",
        }
    }
}

/// A value as it crosses the wire: numbers stay numbers, everything else
/// becomes its display text (`TRUE`, `#DIV/0!`, `""` for empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Number(f64),
    Text(String),
}

impl From<&LiteralValue> for WireValue {
    fn from(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Number(n) => WireValue::Number(*n),
            LiteralValue::Text(s) => WireValue::Text(s.clone()),
            LiteralValue::Boolean(true) => WireValue::Text("TRUE".into()),
            LiteralValue::Boolean(false) => WireValue::Text("FALSE".into()),
            LiteralValue::Empty => WireValue::Text(String::new()),
            LiteralValue::Error(e) => WireValue::Text(e.kind.token().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Ready,
    Updates {
        updates: BTreeMap<String, WireValue>,
    },
    Loaded,
    Error {
        message: String,
    },
}

impl Response {
    pub fn updates(updates: &Updates) -> Self {
        Response::Updates {
            updates: updates
                .iter()
                .map(|(addr, v)| (addr.to_a1(), WireValue::from(v)))
                .collect(),
        }
    }
}

/// Apply one request to `engine`. Failures become a single `Error` response;
/// the engine stays usable.
#[tracing::instrument(name = "request", level = "info", skip_all, fields(kind = request.kind()))]
pub fn handle_request(engine: &mut Engine, request: Request) -> Vec<Response> {
    match apply(engine, request) {
        Ok(responses) => responses,
        Err(err) => {
            tracing::warn!(error = %err, "request failed");
            vec![Response::Error {
                message: err.to_string(),
            }]
        }
    }
}

fn apply(engine: &mut Engine, request: Request) -> Result<Vec<Response>, EngineError> {
    let updates = match request {
        Request::Load { cells } => {
            let mut inputs = Vec::with_capacity(cells.len());
            for (id, value) in cells {
                inputs.push((engine.resolve(&id)?, value.into_cell_input()));
            }
            let updates = engine.load(inputs)?;
            return Ok(vec![Response::updates(&updates), Response::Loaded]);
        }
        Request::SetFormula { cell_id, formula } => {
            let addr = engine.resolve(&cell_id)?;
            engine.set_formula(addr, &formula)?
        }
        Request::SetCellValue { cell_id, value } => {
            let addr = engine.resolve(&cell_id)?;
            engine.set_cell_value(addr, value.into_literal())?
        }
        Request::ClearCell { cell_id } => {
            let addr = engine.resolve(&cell_id)?;
            engine.clear_cell(addr)?
        }
        Request::CopyCell { source, target } => {
            let (source, target) = (engine.resolve(&source)?, engine.resolve(&target)?);
            engine.copy_cell(source, target)?
        }
    };
    Ok(vec![Response::updates(&updates)])
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("engine worker has shut down")]
    Disconnected,
    #[error("timed out waiting for the engine worker")]
    Timeout,
    #[error("engine worker thread panicked")]
    Panicked,
}

/// Formula depth is capped by the parser; this leaves room for evaluating
/// the deepest accepted formula in an unoptimized build.
const ENGINE_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Handle to an [`Engine`] running on its own thread.
pub struct EngineWorker {
    requests: Option<Sender<Request>>,
    responses: Receiver<Response>,
    handle: Option<JoinHandle<()>>,
}

impl EngineWorker {
    pub fn spawn(config: EvalConfig) -> io::Result<Self> {
        Self::spawn_with(Engine::new(config))
    }

    /// Run a preconfigured engine (custom registry, preloaded cells).
    pub fn spawn_with(engine: Engine) -> io::Result<Self> {
        let (req_tx, req_rx) = channel::unbounded::<Request>();
        let (resp_tx, resp_rx) = channel::unbounded::<Response>();
        let handle = thread::Builder::new()
            .name("gridcalc-engine".into())
            .stack_size(ENGINE_STACK_SIZE)
            .spawn(move || serve(engine, req_rx, resp_tx))?;
        Ok(Self {
            requests: Some(req_tx),
            responses: resp_rx,
            handle: Some(handle),
        })
    }

    pub fn send(&self, request: Request) -> Result<(), WorkerError> {
        self.requests
            .as_ref()
            .ok_or(WorkerError::Disconnected)?
            .send(request)
            .map_err(|_| WorkerError::Disconnected)
    }

    pub fn recv(&self) -> Result<Response, WorkerError> {
        self.responses.recv().map_err(|_| WorkerError::Disconnected)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Response, WorkerError> {
        self.responses.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => WorkerError::Timeout,
            RecvTimeoutError::Disconnected => WorkerError::Disconnected,
        })
    }

    /// Send `request` and collect every response it produces.
    pub fn call(&self, request: Request) -> Result<Vec<Response>, WorkerError> {
        let is_load = matches!(request, Request::Load { .. });
        self.send(request)?;
        let mut out = Vec::new();
        loop {
            let response = self.recv()?;
            let last = match &response {
                Response::Error { .. } | Response::Loaded => true,
                Response::Updates { .. } => !is_load,
                Response::Ready => false,
            };
            out.push(response);
            if last {
                return Ok(out);
            }
        }
    }

    /// Close the request channel and wait for the thread to finish.
    pub fn shutdown(mut self) -> Result<(), WorkerError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), WorkerError> {
        self.requests.take();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked),
            None => Ok(()),
        }
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn serve(mut engine: Engine, requests: Receiver<Request>, responses: Sender<Response>) {
    if responses.send(Response::Ready).is_err() {
        return;
    }
    for request in requests.iter() {
        let out = match catch_unwind(AssertUnwindSafe(|| handle_request(&mut engine, request))) {
            Ok(out) => out,
            Err(payload) => {
                engine.abort_in_flight();
                let err = EngineError::Internal(panic_text(payload.as_ref()));
                tracing::warn!(error = %err, "request panicked");
                vec![Response::Error {
                    message: err.to_string(),
                }]
            }
        };
        for response in out {
            if responses.send(response).is_err() {
                return;
            }
        }
    }
    tracing::debug!("request channel closed, engine worker exiting");
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
