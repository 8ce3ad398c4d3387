use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::{AdapterDescriptor, AdapterError, AdapterFuture, ChainAdapter};
use crate::OperationRequest;

fn default_failure_message() -> String {
    String::from("upstream returned an error")
}

/// One scripted reaction to an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScriptStep {
    Ok {
        #[serde(default)]
        data: Value,
        #[serde(default)]
        delay_ms: u64,
    },
    Fail {
        #[serde(default = "default_failure_message")]
        message: String,
        #[serde(default)]
        delay_ms: u64,
    },
    Panic {
        message: String,
    },
    /// Never completes; only the timeout guard ends the attempt.
    Hang,
}

impl ScriptStep {
    pub fn ok(data: Value) -> Self {
        Self::Ok { data, delay_ms: 0 }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
            delay_ms: 0,
        }
    }
}

/// Deterministic adapter that replays a fixed script of outcomes.
///
/// The n-th invocation plays step n; once the script is exhausted the last
/// step repeats. Used for failover drills and tests.
#[derive(Debug)]
pub struct ScriptedAdapter {
    descriptor: AdapterDescriptor,
    steps: Vec<ScriptStep>,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(descriptor: AdapterDescriptor, steps: Vec<ScriptStep>) -> Self {
        Self {
            descriptor,
            steps,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_ok(descriptor: AdapterDescriptor, data: Value) -> Self {
        Self::new(descriptor, vec![ScriptStep::ok(data)])
    }

    pub fn always_fail(descriptor: AdapterDescriptor, message: impl Into<String>) -> Self {
        Self::new(descriptor, vec![ScriptStep::fail(message)])
    }

    pub fn hanging(descriptor: AdapterDescriptor) -> Self {
        Self::new(descriptor, vec![ScriptStep::Hang])
    }

    pub fn panicking(descriptor: AdapterDescriptor, message: impl Into<String>) -> Self {
        Self::new(
            descriptor,
            vec![ScriptStep::Panic {
                message: message.into(),
            }],
        )
    }

    /// Number of times [`execute`](ChainAdapter::execute) has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<ScriptStep> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.steps
            .get(index)
            .or_else(|| self.steps.last())
            .cloned()
    }
}

impl ChainAdapter for ScriptedAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn execute(&self, _request: OperationRequest) -> AdapterFuture<'_> {
        let step = self.next_step();

        Box::pin(async move {
            match step {
                None => Err(AdapterError::failed("adapter script is empty")),
                Some(ScriptStep::Ok { data, delay_ms }) => {
                    pause(delay_ms).await;
                    Ok(data)
                }
                Some(ScriptStep::Fail { message, delay_ms }) => {
                    pause(delay_ms).await;
                    Err(AdapterError::failed(message))
                }
                Some(ScriptStep::Panic { message }) => panic!("{message}"),
                Some(ScriptStep::Hang) => std::future::pending().await,
            }
        })
    }
}

async fn pause(delay_ms: u64) {
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
