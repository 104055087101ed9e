//! 请求ID上下文管理
//!
//! 使用 `tokio::task_local` 在异步任务中携带当前请求ID，
//! 日志关联和脱离请求生命周期的后台任务都从这里取ID。

use std::future::Future;

use tokio::task::JoinHandle;
use tokio::task_local;

use crate::request_id::RequestId;

task_local! {
    static CURRENT_REQUEST_ID: RequestId;
}

/// 获取当前请求ID
///
/// 如果当前不在请求上下文中，则记录一个警告并生成一个新的ID。
pub fn current_request_id() -> RequestId {
    try_current_request_id().unwrap_or_else(|| {
        tracing::warn!("RequestId not found in task-local context. Generating a new one. This might indicate a logic error where a function is called outside of a request scope.");
        RequestId::new()
    })
}

/// 获取当前请求ID，不在上下文中时返回None
pub fn try_current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID.try_with(|id| *id).ok()
}

/// 在指定的请求上下文中执行异步操作
///
/// 嵌套调用时内层ID覆盖外层，退出内层后恢复外层。
pub async fn with_request_id<F, T>(request_id: RequestId, future: F) -> T
where
    F: Future<Output = T>,
{
    CURRENT_REQUEST_ID.scope(request_id, future).await
}

/// 派生一个继承当前请求ID的后台任务
///
/// 任务可以比原请求活得更久，其中的日志仍能和原请求关联。
/// 不在请求上下文中时，任务使用一个新生成的ID。
///
/// 必须在 tokio 运行时中调用。
pub fn spawn_detached<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let request_id = try_current_request_id().unwrap_or_default();
    tokio::spawn(CURRENT_REQUEST_ID.scope(request_id, future))
}

/// 创建携带请求ID字段的 tracing span
///
/// ```
/// use request_id::{request_span, RequestId};
///
/// let id = RequestId::new();
/// let _guard = request_span(&id).entered();
/// tracing::info!("this event carries request_id");
/// ```
pub fn request_span(request_id: &RequestId) -> tracing::Span {
    tracing::info_span!("request", request_id = %request_id)
}
