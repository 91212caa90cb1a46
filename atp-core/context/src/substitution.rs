//! `${name}` 占位符替换

use crate::{ContextError, Result};

const PLACEHOLDER_START: &str = "${";
const PLACEHOLDER_END: char = '}';

/// 将 `input` 中的 `${name}` 替换为 `resolve(name)` 的结果
///
/// 未闭合的占位符返回 [`ContextError::UnbalancedPlaceholder`],
/// 解析失败的错误原样返回。替换结果不会再次展开。
pub fn replace_variables<F>(input: &str, resolve: F) -> Result<String>
where
    F: Fn(&str) -> Result<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;

    while let Some(found) = input[cursor..].find(PLACEHOLDER_START) {
        let start = cursor + found;
        let name_start = start + PLACEHOLDER_START.len();

        let Some(end_offset) = input[name_start..].find(PLACEHOLDER_END) else {
            return Err(ContextError::UnbalancedPlaceholder(input.to_string()));
        };
        let name_end = name_start + end_offset;

        out.push_str(&input[cursor..start]);
        out.push_str(&resolve(&input[name_start..name_end])?);
        cursor = name_end + PLACEHOLDER_END.len_utf8();
    }

    out.push_str(&input[cursor..]);
    Ok(out)
}

/// 字符串中是否包含占位符
pub fn contains_placeholder(input: &str) -> bool {
    input.contains(PLACEHOLDER_START)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(name: &str) -> Result<String> {
        match name {
            "user" => Ok("alice".to_string()),
            "count" => Ok("3".to_string()),
            "nested" => Ok("${user}".to_string()),
            other => Err(ContextError::UnknownVariable(other.to_string())),
        }
    }

    #[test]
    fn test_replace_single() {
        assert_eq!(replace_variables("hi ${user}", resolve).unwrap(), "hi alice");
    }

    #[test]
    fn test_replace_multiple() {
        assert_eq!(
            replace_variables("${user} has ${count} items", resolve).unwrap(),
            "alice has 3 items"
        );
    }

    #[test]
    fn test_no_placeholder() {
        assert_eq!(replace_variables("plain text", resolve).unwrap(), "plain text");
        assert!(!contains_placeholder("plain text"));
        assert!(contains_placeholder("a ${b}"));
    }

    #[test]
    fn test_replacement_not_expanded_again() {
        assert_eq!(replace_variables("${nested}", resolve).unwrap(), "${user}");
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            replace_variables("${nope}", resolve),
            Err(ContextError::UnknownVariable("nope".to_string()))
        );
    }

    #[test]
    fn test_unbalanced_placeholder() {
        assert!(matches!(
            replace_variables("value ${user", resolve),
            Err(ContextError::UnbalancedPlaceholder(_))
        ));
    }
}
