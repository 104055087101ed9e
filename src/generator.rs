//! 请求ID生成器
//!
//! 每个ID由四部分组成（共128位，从高到低）：
//! timestamp(48位，毫秒) + node_id(16位) + sequence(32位) + entropy(32位)
//!
//! 每个 node_id 在进程内对应唯一一个序列号计数器，使用同一 node_id 的生成器共享它，
//! 因此同一进程内 (node_id, sequence) 在 2^32 次调用内不会重复，与生成器的创建顺序无关。
//! 随机字只负责跨进程的抗碰撞。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::entropy::{EntropySource, FastRandom};
use crate::request_id::RequestId;

/// 进程级节点ID基数，基于进程ID和启动时间戳生成，降低不同进程之间的冲突概率
static PROCESS_NODE_BASE: LazyLock<u16> = LazyLock::new(|| {
    let pid = std::process::id();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32;
    ((pid ^ timestamp) & 0xFFFF) as u16
});

/// 自动分配节点ID时的候选序号
static INSTANCE_SEQ: AtomicU32 = AtomicU32::new(0);

/// 奇数步长：乘法在 mod 2^16 下是双射，连续 65536 个候选序号覆盖全部节点ID
const NODE_STRIDE: u16 = 0x9E37;

/// 节点ID到序列号计数器的映射
///
/// 条目一旦创建就不再移除：生成器被丢弃后，下一个使用该节点ID的生成器从原计数器继续，
/// 不会重新从0开始。
static NODE_SEQUENCES: LazyLock<Mutex<HashMap<u16, Arc<AtomicU64>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static DEFAULT_GENERATOR: LazyLock<RequestIdGenerator> = LazyLock::new(RequestIdGenerator::new);

/// 获取进程级默认生成器
///
/// [`RequestId::new`] 和请求上下文在需要新ID时都使用它。
pub fn default_generator() -> &'static RequestIdGenerator {
    &DEFAULT_GENERATOR
}

/// 生成器配置选项
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// 固定的节点ID（默认自动分配）
    ///
    /// 可以与其他存活的生成器相同：同一节点ID的生成器共享序列号计数器，ID仍然不重复。
    /// 自动分配时优先选择当前没有存活生成器使用的节点ID。
    pub node_id: Option<u16>,
    /// 随机数来源不可用时是否记录一次警告（默认启用）
    pub warn_on_fallback: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            warn_on_fallback: true,
        }
    }
}

/// 高性能请求ID生成器
///
/// 可以通过 `&self` 从任意多个线程并发调用，每次生成不做堆分配，也不会阻塞。
pub struct RequestIdGenerator {
    sequence: Arc<AtomicU64>,
    issued: AtomicU64,
    fallbacks: AtomicU64,
    warned: AtomicBool,
    node_id: u16,
    config: GeneratorConfig,
    entropy: Box<dyn EntropySource>,
}

impl RequestIdGenerator {
    /// 使用默认配置和 [`FastRandom`] 创建生成器
    pub fn new() -> Self {
        Self::with_config(GeneratorConfig::default())
    }

    /// 使用自定义配置创建生成器
    pub fn with_config(config: GeneratorConfig) -> Self {
        let (node_id, sequence) = claim_node(config.node_id);
        Self {
            sequence,
            issued: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            warned: AtomicBool::new(false),
            node_id,
            config,
            entropy: Box::new(FastRandom),
        }
    }

    /// 替换随机数来源
    ///
    /// # 示例
    /// ```
    /// use request_id::{NoEntropy, RequestIdGenerator};
    ///
    /// // 不依赖随机数，完全由序列号和节点ID保证唯一
    /// let generator = RequestIdGenerator::new().with_entropy(NoEntropy);
    /// assert_ne!(generator.next_id(), generator.next_id());
    /// ```
    pub fn with_entropy<E>(mut self, entropy: E) -> Self
    where
        E: EntropySource + 'static,
    {
        self.entropy = Box::new(entropy);
        self
    }

    /// 生成新的请求ID
    ///
    /// 使用时间戳+节点ID+序列号+随机字的组合，生成32字符的小写十六进制ID，
    /// 兼容 W3C TraceContext 的 trace-id。
    ///
    /// # 返回
    /// 新生成的请求ID。随机数来源不可用时随机字改用确定性回退值，调用仍然成功。
    ///
    /// # 性能优化
    /// - 两次 `Relaxed` 原子自增，没有锁
    /// - 结果内联存储在定长数组中，不做堆分配
    /// - 回退路径标记为 `#[cold]`
    #[inline]
    pub fn next_id(&self) -> RequestId {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.issued.fetch_add(1, Ordering::Relaxed);

        let entropy = match self.entropy.next_u32() {
            Some(word) => word,
            None => self.fallback_word(sequence),
        };

        RequestId::from_u128(compose(timestamp, self.node_id, sequence, entropy))
    }

    /// 随机数来源不可用时的确定性随机字：进程ID混合序列号高位
    #[cold]
    fn fallback_word(&self, sequence: u64) -> u32 {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);

        if self.config.warn_on_fallback
            && !self.warned.load(Ordering::Relaxed)
            && !self.warned.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(
                node_id = self.node_id,
                "Entropy source unavailable. Falling back to deterministic request IDs built from the sequence and process id."
            );
        }

        std::process::id().rotate_left(16) ^ (sequence >> 32) as u32
    }

    /// 本生成器使用的节点ID
    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// 本生成器已生成的ID数量
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    /// 使用回退方案生成的ID数量
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdGenerator")
            .field("node_id", &self.node_id)
            .field("issued", &self.issued())
            .field("fallbacks", &self.fallbacks())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// 将各字段拼装为128位ID数值
///
/// 全零ID无效，结果至少为1。
#[inline]
pub(crate) fn compose(timestamp: u64, node_id: u16, sequence: u64, entropy: u32) -> u128 {
    let high_64 = ((timestamp & 0xFFFF_FFFF_FFFF) << 16) | u64::from(node_id);
    let low_64 = ((sequence & 0xFFFF_FFFF) << 32) | u64::from(entropy);
    ((u128::from(high_64) << 64) | u128::from(low_64)).max(1)
}

/// 为新生成器选定节点ID并取得该节点的序列号计数器
///
/// 未指定节点ID时，按候选序号依次尝试，跳过仍有存活生成器的节点；
/// 全部节点都被占用时退回到共享第一个候选节点。
fn claim_node(requested: Option<u16>) -> (u16, Arc<AtomicU64>) {
    let mut sequences = NODE_SEQUENCES
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    let node_id = requested.unwrap_or_else(|| {
        let first = next_candidate();
        let mut candidate = first;
        for _ in 0..=u16::MAX {
            let in_use = sequences
                .get(&candidate)
                .is_some_and(|sequence| Arc::strong_count(sequence) > 1);
            if !in_use {
                return candidate;
            }
            candidate = next_candidate();
        }
        first
    });

    let sequence = sequences
        .entry(node_id)
        .or_insert_with(|| Arc::new(AtomicU64::new(0)));
    (node_id, Arc::clone(sequence))
}

fn next_candidate() -> u16 {
    let seq = INSTANCE_SEQ.fetch_add(1, Ordering::Relaxed) as u16;
    PROCESS_NODE_BASE.wrapping_add(seq.wrapping_mul(NODE_STRIDE))
}
