//! 随机数来源
//!
//! 生成器只从这里取每个ID末尾的32位随机字。
//! ID的唯一性由时间戳、节点ID和计数器保证，随机字只用于跨进程的抗碰撞，
//! 所以来源不可用时生成器会退回到确定性方案，而不是报错或阻塞。

/// 32位随机字的来源
///
/// 返回 `None` 表示来源当前不可用。
pub trait EntropySource: Send + Sync {
    fn next_u32(&self) -> Option<u32>;
}

/// 基于 `fastrand` 线程本地生成器的默认来源
///
/// 每个线程各自持有一个RNG，并发调用之间没有争用。
#[derive(Debug, Default, Clone, Copy)]
pub struct FastRandom;

impl EntropySource for FastRandom {
    #[inline]
    fn next_u32(&self) -> Option<u32> {
        Some(fastrand::u32(..))
    }
}

/// 永远不可用的来源，强制生成器使用确定性回退方案
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEntropy;

impl EntropySource for NoEntropy {
    #[inline]
    fn next_u32(&self) -> Option<u32> {
        None
    }
}

impl<F> EntropySource for F
where
    F: Fn() -> Option<u32> + Send + Sync,
{
    #[inline]
    fn next_u32(&self) -> Option<u32> {
        self()
    }
}
