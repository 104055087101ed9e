//! RequestId 核心结构体定义

use std::fmt;

use crate::generator::default_generator;

/// 请求ID的字符长度（128位，32个小写十六进制字符）
pub const REQUEST_ID_LEN: usize = 32;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// 请求ID结构体
///
/// 以定长字节数组内联存储32个小写十六进制字符，
/// 复制、比较和取字符串都不需要堆分配。
/// 格式兼容 W3C TraceContext 的 trace-id。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId([u8; REQUEST_ID_LEN]);

impl RequestId {
    /// 使用进程级默认生成器生成新的请求ID
    ///
    /// 需要隔离状态（例如测试）时，请自行构造 [`RequestIdGenerator`](crate::RequestIdGenerator)。
    #[inline]
    pub fn new() -> Self {
        default_generator().next_id()
    }

    /// 将128位数值编码为请求ID
    #[inline]
    pub(crate) fn from_u128(value: u128) -> Self {
        let mut buf = [0u8; REQUEST_ID_LEN];
        for (i, slot) in buf.iter_mut().enumerate() {
            let shift = (REQUEST_ID_LEN - 1 - i) * 4;
            *slot = HEX[((value >> shift) & 0xF) as usize];
        }
        Self(buf)
    }

    /// 从字符串创建请求ID，并进行格式校验
    ///
    /// 用于接收上游传入的ID。
    ///
    /// # 参数
    /// * `id` - 请求ID字符串
    ///
    /// # 校验规则
    /// - 长度必须是 32 个字符
    /// - 只能包含小写十六进制字符（0-9, a-f）
    /// - 不能全为零
    ///
    /// # 返回
    /// 如果格式有效则返回Some(RequestId)，否则返回None
    ///
    /// # 性能优化
    /// - 先按字节长度转换为定长数组，长度不符直接返回
    /// - 字节级校验，避免Unicode处理
    #[inline]
    pub fn from_string_validated(id: &str) -> Option<Self> {
        let bytes: &[u8; REQUEST_ID_LEN] = id.as_bytes().try_into().ok()?;

        if !bytes
            .iter()
            .all(|&b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }

        if bytes.iter().all(|&b| b == b'0') {
            return None;
        }

        Some(Self(*bytes))
    }

    /// 获取请求ID字符串
    ///
    /// # 返回
    /// 请求ID的字符串表示，借用自内部数组
    ///
    /// # 性能优化
    /// - 不做堆分配，也不复制
    #[inline]
    pub fn as_str(&self) -> &str {
        // 内部字节只会由 from_u128 或校验过的输入写入，始终是ASCII
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// 获取请求ID的原始ASCII字节
    #[inline]
    pub fn as_bytes(&self) -> &[u8; REQUEST_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestId").field(&self.as_str()).finish()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.as_str().to_owned()
    }
}
