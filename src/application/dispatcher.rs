use crate::domain::errors::{DomainError, DomainResult};
use crate::ports::esewa_port::EsewaPaymentRequest;
use crate::ports::user_agent_port::{GatewayForm, UserAgentRedirect};
use tracing::{error, info};

/// 网关跳转分发器：校验签名字段齐全后，生成表单交给浏览器提交
#[derive(Debug, Clone)]
pub struct GatewayRedirectDispatcher {
    endpoint: String,
}

impl GatewayRedirectDispatcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// 构造表单；任一签名字段或签名本身缺失都拒绝提交
    pub fn build_form(&self, request: &EsewaPaymentRequest) -> DomainResult<GatewayForm> {
        let required = request
            .signed_field_names
            .names()
            .chain(["signature", "signed_field_names"]);

        for name in required {
            let present = request
                .field(name)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                error!(
                    transaction_id = %request.transaction_uuid,
                    field = name,
                    "Refusing to dispatch incomplete gateway form"
                );
                return Err(DomainError::ValidationError(format!(
                    "Missing required eSewa field: {}",
                    name
                )));
            }
        }

        Ok(GatewayForm {
            action: self.endpoint.clone(),
            method: "POST",
            fields: request.form_fields(),
        })
    }

    /// 交给浏览器跳转
    pub fn dispatch<U: UserAgentRedirect>(
        &self,
        request: &EsewaPaymentRequest,
        user_agent: &U,
    ) -> DomainResult<U::Output> {
        let form = self.build_form(request)?;
        info!(
            transaction_id = %request.transaction_uuid,
            endpoint = %self.endpoint,
            "Dispatching payment form to gateway"
        );
        Ok(user_agent.redirect(&form))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignedFieldNames;
    use std::cell::RefCell;

    /// 记录跳转表单，代替浏览器
    #[derive(Default)]
    struct RecordingUserAgent {
        forms: RefCell<Vec<GatewayForm>>,
    }

    impl UserAgentRedirect for RecordingUserAgent {
        type Output = usize;

        fn redirect(&self, form: &GatewayForm) -> usize {
            self.forms.borrow_mut().push(form.clone());
            self.forms.borrow().len()
        }
    }

    fn request() -> EsewaPaymentRequest {
        EsewaPaymentRequest {
            amount: "1500".to_string(),
            tax_amount: "0".to_string(),
            total_amount: "1500".to_string(),
            transaction_uuid: "T-1".to_string(),
            product_code: "EPAYTEST".to_string(),
            product_service_charge: "0".to_string(),
            product_delivery_charge: "0".to_string(),
            success_url: "https://shop.example.com/payment/esewa/success".to_string(),
            failure_url: "https://shop.example.com/payment/esewa/failure".to_string(),
            signed_field_names: SignedFieldNames::outbound(),
            signature: "c2lnbmF0dXJl".to_string(),
        }
    }

    #[test]
    fn test_dispatch_submits_every_field() {
        let dispatcher = GatewayRedirectDispatcher::new("https://gateway.example/form");
        let agent = RecordingUserAgent::default();

        dispatcher.dispatch(&request(), &agent).unwrap();

        let forms = agent.forms.borrow();
        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form.action, "https://gateway.example/form");
        assert_eq!(form.method, "POST");
        assert_eq!(form.fields.len(), 11);
        assert!(form
            .fields
            .contains(&("signed_field_names".to_string(), "total_amount,transaction_uuid,product_code".to_string())));
        assert!(form
            .fields
            .contains(&("signature".to_string(), "c2lnbmF0dXJl".to_string())));
    }

    #[test]
    fn test_missing_signed_field_is_not_dispatched() {
        let dispatcher = GatewayRedirectDispatcher::new("https://gateway.example/form");
        let agent = RecordingUserAgent::default();
        let mut incomplete = request();
        incomplete.product_code = String::new();

        let result = dispatcher.dispatch(&incomplete, &agent);

        assert!(matches!(result, Err(DomainError::ValidationError(ref m)) if m.contains("product_code")));
        assert!(agent.forms.borrow().is_empty());
    }

    #[test]
    fn test_unsigned_request_is_not_dispatched() {
        let dispatcher = GatewayRedirectDispatcher::new("https://gateway.example/form");
        let agent = RecordingUserAgent::default();
        let mut unsigned = request();
        unsigned.signature = String::new();

        assert!(dispatcher.dispatch(&unsigned, &agent).is_err());
        assert!(agent.forms.borrow().is_empty());
    }
}
