//! Scripted oracle for testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Oracle, OracleError, OracleRequest, RequestKind};

type ResponseFn = dyn Fn(&OracleRequest) -> Result<String, OracleError> + Send + Sync;

enum Responder {
    Sequence(Mutex<VecDeque<String>>),
    Func(Box<ResponseFn>),
}

/// Oracle test double that answers from a script and records every request.
///
/// Useful for exercising retry and memoization logic without network calls.
pub struct ScriptedOracle {
    responder: Responder,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    /// Answer with the given strings in order; fails once the script runs out.
    pub fn sequence<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responder: Responder::Sequence(Mutex::new(
                answers.into_iter().map(Into::into).collect(),
            )),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer by calling `f` for every request.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&OracleRequest) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            responder: Responder::Func(Box::new(f)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests mutex poisoned").len()
    }

    /// Number of enumeration requests received so far.
    pub fn enumerate_calls(&self) -> usize {
        self.count_matching(|kind| matches!(kind, RequestKind::Enumerate { .. }))
    }

    /// Number of selection requests received so far.
    pub fn select_calls(&self) -> usize {
        self.count_matching(|kind| matches!(kind, RequestKind::Select { .. }))
    }

    fn count_matching(&self, pred: impl Fn(&RequestKind) -> bool) -> usize {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .iter()
            .filter(|r| pred(&r.kind))
            .count()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(request.clone());

        match &self.responder {
            Responder::Sequence(answers) => answers
                .lock()
                .expect("script mutex poisoned")
                .pop_front()
                .ok_or_else(|| OracleError::ApiError("script exhausted".to_string())),
            Responder::Func(f) => f(request),
        }
    }
}
