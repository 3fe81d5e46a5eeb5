use serde::Serialize;

/// 提交给外部网关的表单
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayForm {
    pub action: String,
    pub method: &'static str,
    pub fields: Vec<(String, String)>,
}

/// 让用户浏览器携带表单跳转到外部地址。
///
/// 这是浏览器侧的副作用；核心签名/验签逻辑只依赖这个接口。
pub trait UserAgentRedirect {
    type Output;

    fn redirect(&self, form: &GatewayForm) -> Self::Output;
}
