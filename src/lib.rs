//! 请求ID生成与传递模块
//!
//! 为每个请求生成一个短小、抗碰撞、无堆分配的ID，
//! 并在异步任务中传递，用于日志关联和全链路追踪。
//!
//! ## Usage
//!
//! ### 基础用法：生成和使用 RequestId
//! ```
//! use request_id::RequestId;
//!
//! // 使用进程级默认生成器
//! let request_id = RequestId::new();
//! println!("Generated request ID: {}", request_id);
//!
//! // 从上游传入的字符串创建（带验证）
//! let upstream = "0af7651916cd43dd8448eb211c80319c";
//! if let Some(request_id) = RequestId::from_string_validated(upstream) {
//!     println!("Valid request ID: {}", request_id);
//! }
//! ```
//!
//! ### 独立的生成器实例
//! ```
//! use request_id::{GeneratorConfig, RequestIdGenerator};
//!
//! let generator = RequestIdGenerator::with_config(GeneratorConfig {
//!     node_id: Some(7),
//!     ..Default::default()
//! });
//! let a = generator.next_id();
//! let b = generator.next_id();
//! assert_ne!(a, b);
//! ```
//!
//! ### 在请求上下文中传递
//! ```
//! use request_id::{current_request_id, spawn_detached, with_request_id, RequestId};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let id = RequestId::new();
//! let background = with_request_id(id, async {
//!     assert_eq!(current_request_id(), id);
//!     // 后台任务继承同一个ID
//!     spawn_detached(async { current_request_id() })
//! })
//! .await;
//! assert_eq!(background.await.unwrap(), id);
//! # }
//! ```

mod context;
mod entropy;
mod generator;
mod request_id;

pub use context::{
    current_request_id, request_span, spawn_detached, try_current_request_id, with_request_id,
};
pub use entropy::{EntropySource, FastRandom, NoEntropy};
pub use generator::{default_generator, GeneratorConfig, RequestIdGenerator};
pub use request_id::{RequestId, REQUEST_ID_LEN};
