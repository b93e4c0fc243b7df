//! In-memory backend that replays scripted operation states.

use crate::error::{Result, VeoChainError};
use crate::video::operation::Operation;
use crate::video::provider::OperationBackend;
use crate::video::types::GenerationRequest;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What happens on one submission.
pub(crate) enum Script {
    /// Submission fails with an API error carrying this message.
    Reject(String),
    /// Submission returns the first state; each refresh returns the next.
    Run(Vec<Operation>),
}

pub(crate) struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    states: Mutex<VecDeque<Operation>>,
    submitted: Mutex<Vec<GenerationRequest>>,
    refreshes: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            states: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn submissions(&self) -> Vec<GenerationRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub(crate) fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationBackend for ScriptedBackend {
    async fn submit(&self, request: &GenerationRequest) -> Result<Operation> {
        self.submitted.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Reject(message)) => Err(VeoChainError::Api {
                status: 400,
                message,
            }),
            Some(Script::Run(states)) => {
                let mut states: VecDeque<Operation> = states.into();
                let first = states.pop_front().ok_or_else(|| {
                    VeoChainError::UnexpectedResponse("empty script".into())
                })?;
                *self.states.lock().unwrap() = states;
                Ok(first)
            }
            None => Err(VeoChainError::UnexpectedResponse("no scripts left".into())),
        }
    }

    async fn refresh(&self, _operation: &Operation) -> Result<Operation> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.states
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| VeoChainError::UnexpectedResponse("script exhausted".into()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
