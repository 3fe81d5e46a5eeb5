use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 参与签名的字段名列表。
///
/// 列表本身随报文一起发送（`signed_field_names`），签名串严格按列表顺序拼接
/// `name=value`，以逗号分隔。出站请求与入站回调都从这里生成签名串。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedFieldNames(Vec<String>);

impl SignedFieldNames {
    /// 出站支付请求的签名字段
    pub fn outbound() -> Self {
        Self(
            ["total_amount", "transaction_uuid", "product_code"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    /// 解析逗号分隔的字段名，如 `total_amount,transaction_uuid,product_code`
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let names: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        if names.iter().any(|n| n.is_empty()) {
            return Err(DomainError::ValidationError(format!(
                "Malformed signed_field_names: {:?}",
                raw
            )));
        }

        Ok(Self(names))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// 拼接签名串；任一字段缺失则返回该字段名
    pub fn canonicalize<F>(&self, lookup: F) -> Result<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut parts = Vec::with_capacity(self.0.len());
        for name in &self.0 {
            let value = lookup(name).ok_or_else(|| name.clone())?;
            parts.push(format!("{}={}", name, value));
        }
        Ok(parts.join(","))
    }
}

impl fmt::Display for SignedFieldNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl Serialize for SignedFieldNames {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SignedFieldNames {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SignedFieldNames::parse(&raw).map_err(serde::de::Error::custom)
    }
}
