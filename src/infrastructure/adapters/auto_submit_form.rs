use crate::ports::user_agent_port::{GatewayForm, UserAgentRedirect};

/// 生成自动提交的 HTML 表单页面，浏览器加载后立即 POST 到网关
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoSubmitForm;

impl UserAgentRedirect for AutoSubmitForm {
    type Output = String;

    fn redirect(&self, form: &GatewayForm) -> String {
        let inputs: String = form
            .fields
            .iter()
            .map(|(name, value)| {
                format!(
                    "    <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                    escape_html(name),
                    escape_html(value)
                )
            })
            .collect();

        format!(
            concat!(
                "<!DOCTYPE html>\n",
                "<html>\n",
                "<head><meta charset=\"utf-8\"><title>Redirecting to payment gateway</title></head>\n",
                "<body onload=\"document.forms[0].submit()\">\n",
                "  <form action=\"{action}\" method=\"{method}\">\n",
                "{inputs}",
                "    <noscript><button type=\"submit\">Continue to payment</button></noscript>\n",
                "  </form>\n",
                "</body>\n",
                "</html>\n"
            ),
            action = escape_html(&form.action),
            method = form.method,
            inputs = inputs,
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}
