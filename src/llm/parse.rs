//! 结构化输出提取
//!
//! 从 LLM 回复中尽力定位并解析 JSON：优先 ```json 围栏块，其次整段文本，
//! 最后取最宽的 {..} 或 [..] 切片；容忍前后混杂的散文。

use serde_json::Value;

/// 尽力从文本中提取一个 JSON 数组或对象；全部尝试失败时返回 None
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        let inner = rest.find("```").map(|end| &rest[..end]).unwrap_or(rest);
        if let Ok(v) = serde_json::from_str(inner.trim()) {
            return Some(v);
        }
    }

    if let Ok(v) = serde_json::from_str(trimmed) {
        return Some(v);
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(v) = serde_json::from_str(&trimmed[start..=end]) {
                    return Some(v);
                }
            }
        }
    }

    None
}
