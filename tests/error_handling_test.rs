//! 错误处理和边界情况测试
//!
//! 验证随机数来源失效、上游ID非法等异常情况下的降级行为

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use request_id::{
    current_request_id, try_current_request_id, GeneratorConfig, NoEntropy, RequestId,
    RequestIdGenerator,
};
use tracing::subscriber::with_default;
use tracing_subscriber::fmt::MakeWriter;

/// 收集日志输出的写入器
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_subscriber(logs: &CapturedLogs) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish()
}

/// 测试上游ID校验的边界情况
#[test]
fn test_request_id_validation_edge_cases() {
    let invalid_chars = [
        "0af7651916cd43dd8448eb211c80319G",  // 大写G
        "0af7651916cd43dd8448eb211c80319-",  // 连字符
        "0af7651916cd43dd8448eb211c80319 ",  // 空格
        "0af7651916cd43dd8448eb211c80319\n", // 换行符
        "0af7651916cd43dd8448eb211c80319\0", // 空字符
    ];

    for invalid_id in &invalid_chars {
        assert!(
            RequestId::from_string_validated(invalid_id).is_none(),
            "应该拒绝无效ID: {invalid_id:?}"
        );
    }

    let boundary_lengths = [
        (0, ""),
        (1, "a"),
        (31, "0af7651916cd43dd8448eb211c80319"),
        (32, "0af7651916cd43dd8448eb211c80319c"),
        (33, "0af7651916cd43dd8448eb211c80319ca"),
        (
            64,
            "0af7651916cd43dd8448eb211c80319c0af7651916cd43dd8448eb211c80319c",
        ),
    ];

    for (length, test_str) in &boundary_lengths {
        let result = RequestId::from_string_validated(test_str);
        if *length == 32 {
            assert!(result.is_some(), "长度为32的有效ID应该被接受: {test_str}");
        } else {
            assert!(result.is_none(), "长度为{length}的ID应该被拒绝: {test_str}");
        }
    }

    assert!(RequestId::from_string_validated("00000000000000000000000000000000").is_none());
    assert!(RequestId::from_string_validated(&"a".repeat(1000)).is_none());
}

/// 非法的上游ID应被丢弃并换成新生成的ID
#[test]
fn test_invalid_upstream_id_replaced() {
    let upstream = "not-a-request-id";
    let id = RequestId::from_string_validated(upstream).unwrap_or_default();
    assert_ne!(id.as_str(), upstream);
    assert!(RequestId::from_string_validated(id.as_str()).is_some());
}

/// 随机数来源失效时仍然返回可用的ID，并且只警告一次
#[test]
fn test_entropy_failure_degrades_gracefully() {
    let logs = CapturedLogs::default();

    let ids: Vec<RequestId> = with_default(capture_subscriber(&logs), || {
        let generator = RequestIdGenerator::new().with_entropy(NoEntropy);
        (0..100).map(|_| generator.next_id()).collect()
    });

    let unique: HashSet<&RequestId> = ids.iter().collect();
    assert_eq!(unique.len(), 100);
    for id in &ids {
        assert!(RequestId::from_string_validated(id.as_str()).is_some());
    }

    let output = logs.contents();
    assert_eq!(
        output.matches("Entropy source unavailable").count(),
        1,
        "回退警告只应记录一次: {output}"
    );
}

/// 关闭回退警告后不输出任何日志
#[test]
fn test_entropy_failure_warning_disabled() {
    let logs = CapturedLogs::default();

    with_default(capture_subscriber(&logs), || {
        let generator = RequestIdGenerator::with_config(GeneratorConfig {
            warn_on_fallback: false,
            ..Default::default()
        })
        .with_entropy(NoEntropy);

        for _ in 0..10 {
            let _ = generator.next_id();
        }
        assert_eq!(generator.fallbacks(), 10);
    });

    assert!(logs.contents().is_empty());
}

/// 随机数来源在运行中途失效又恢复
#[test]
fn test_entropy_source_recovers() {
    let calls = AtomicU32::new(0);
    let generator = RequestIdGenerator::with_config(GeneratorConfig {
        warn_on_fallback: false,
        ..Default::default()
    })
    .with_entropy(move || {
        let n = calls.fetch_add(1, Ordering::Relaxed);
        // 第100到199次调用期间不可用
        if (100..200).contains(&n) {
            None
        } else {
            Some(fastrand::u32(..))
        }
    });

    let ids: HashSet<RequestId> = (0..300).map(|_| generator.next_id()).collect();
    assert_eq!(ids.len(), 300);
    assert_eq!(generator.fallbacks(), 100);
    assert_eq!(generator.issued(), 300);
}

/// 在没有上下文的情况下读取当前ID：记录警告并返回一个新的有效ID
#[test]
fn test_current_request_id_outside_context() {
    let logs = CapturedLogs::default();

    let (first, second) = with_default(capture_subscriber(&logs), || {
        assert!(try_current_request_id().is_none());
        (current_request_id(), current_request_id())
    });

    assert!(RequestId::from_string_validated(first.as_str()).is_some());
    assert_ne!(first, second, "连续调用应生成不同的ID");
    assert!(logs.contents().contains("RequestId not found in task-local context"));
}

/// 测试大量生成和丢弃
#[test]
fn test_memory_stability() {
    let generator = RequestIdGenerator::new();
    for _ in 0..10_000 {
        let id = generator.next_id();
        let copied = id;
        assert_eq!(copied.as_str(), id.as_str());
        let _display = id.to_string();
        let _debug = format!("{id:?}");
    }
    assert_eq!(generator.issued(), 10_000);
}
