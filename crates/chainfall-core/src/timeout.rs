use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;

use crate::adapter::{AdapterError, AdapterResult, ChainAdapter};
use crate::OperationRequest;

/// Runs one adapter call on its own task and waits at most `limit` for it.
///
/// On expiry the task is aborted and a timeout failure is returned, so a
/// stuck upstream never delays fallback. A panic inside the adapter is
/// reported as [`AdapterError::panicked`].
pub async fn run_with_timeout(
    adapter: Arc<dyn ChainAdapter>,
    request: OperationRequest,
    limit: Duration,
) -> AdapterResult {
    let mut task = tokio::spawn(async move { adapter.execute(request).await });

    match tokio::time::timeout(limit, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(join_failure(join_error)),
        Err(_elapsed) => {
            task.abort();
            Err(AdapterError::timeout(limit))
        }
    }
}

fn join_failure(error: JoinError) -> AdapterError {
    if error.is_panic() {
        return AdapterError::panicked(format!(
            "adapter panicked: {}",
            panic_message(error.into_panic())
        ));
    }
    AdapterError::failed("adapter task was cancelled")
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("non-string panic payload")
}
