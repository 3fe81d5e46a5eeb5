use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Money, Order, PaymentMethod, SignedFieldNames};
use crate::infrastructure::adapters::esewa_signature::SignatureEngine;
use crate::infrastructure::config::esewa_config::EsewaConfig;
use crate::ports::esewa_port::*;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const STATUS_COMPLETE: &str = "COMPLETE";

/// 成功回调必须签名覆盖的字段；出站请求的签名不覆盖 status 与 transaction_code，不能冒充回调
const CALLBACK_REQUIRED_SIGNED: [&str; 5] = [
    "transaction_code",
    "status",
    "total_amount",
    "transaction_uuid",
    "product_code",
];

/// eSewa 网关适配器实现
#[derive(Clone)]
pub struct EsewaGatewayAdapter {
    config: Arc<EsewaConfig>,
    engine: SignatureEngine,
}

impl EsewaGatewayAdapter {
    pub fn new(config: Arc<EsewaConfig>) -> DomainResult<Self> {
        if config.merchant_code.trim().is_empty() {
            return Err(DomainError::ConfigurationError(
                "eSewa merchant code is not configured".to_string(),
            ));
        }
        if config.public_base_url.trim().is_empty() {
            return Err(DomainError::ConfigurationError(
                "Public base URL is not configured".to_string(),
            ));
        }

        let engine = SignatureEngine::new(&config.merchant_secret)?;
        Ok(Self { config, engine })
    }

    /// 解码回调报文为字段表
    fn decode_callback(input: CallbackInput) -> Result<HashMap<String, String>, RejectionReason> {
        match input {
            CallbackInput::Plain(params) => Ok(params),
            CallbackInput::Encoded(data) => {
                // 查询串解码会把未转义的 '+' 变成空格
                let data = data.replace(' ', "+");
                let bytes = STANDARD
                    .decode(data.trim().as_bytes())
                    .map_err(|e| RejectionReason::MalformedPayload(format!("invalid base64: {}", e)))?;

                let object: serde_json::Map<String, Value> = serde_json::from_slice(&bytes)
                    .map_err(|e| RejectionReason::MalformedPayload(format!("invalid JSON: {}", e)))?;

                Ok(object
                    .into_iter()
                    .filter_map(|(key, value)| {
                        let value = match value {
                            Value::Null => return None,
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        Some((key, value))
                    })
                    .collect())
            }
        }
    }
}

fn rejected(transaction_id: &Option<String>, reason: RejectionReason) -> Verification {
    Verification::Rejected {
        transaction_id: transaction_id.clone(),
        reason,
    }
}

impl EsewaGatewayPort for EsewaGatewayAdapter {
    fn form_endpoint(&self) -> &str {
        &self.config.form_url
    }

    /// 构造支付请求
    fn build_request(&self, order: &Order) -> DomainResult<EsewaPaymentRequest> {
        if order.payment_method != PaymentMethod::Esewa {
            return Err(DomainError::ValidationError(format!(
                "Order {} is paid via {}, not esewa",
                order.transaction_id, order.payment_method
            )));
        }

        if !order.can_pay() {
            return Err(DomainError::InvalidState {
                expected: "pending".to_string(),
                actual: order.status.to_string(),
            });
        }

        if order.transaction_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Order has no transaction id".to_string(),
            ));
        }

        let total_amount = order.charges.total_with(order.amount)?;
        if !total_amount.is_positive() {
            return Err(DomainError::InvalidAmount(
                "Total amount must be greater than 0".to_string(),
            ));
        }
        if total_amount != order.total_amount {
            return Err(DomainError::InvalidAmount(format!(
                "Stored total {} does not match breakdown {}",
                order.total_amount, total_amount
            )));
        }

        let mut request = EsewaPaymentRequest {
            amount: order.amount.to_gateway_string(),
            tax_amount: order.charges.tax_amount.to_gateway_string(),
            total_amount: total_amount.to_gateway_string(),
            transaction_uuid: order.transaction_id.clone(),
            product_code: self.config.merchant_code.clone(),
            product_service_charge: order.charges.service_charge.to_gateway_string(),
            product_delivery_charge: order.charges.delivery_charge.to_gateway_string(),
            success_url: self.config.success_url(),
            failure_url: self.config.failure_url(),
            signed_field_names: SignedFieldNames::outbound(),
            signature: String::new(),
        };

        let canonical = request
            .signed_field_names
            .canonicalize(|name| request.field(name))
            .map_err(|missing| {
                DomainError::ValidationError(format!("Missing signed field: {}", missing))
            })?;
        debug!("eSewa signature string: {}", canonical);

        request.signature = self.engine.sign(&canonical);

        info!(
            transaction_id = %request.transaction_uuid,
            total_amount = %request.total_amount,
            "eSewa payment request built"
        );
        Ok(request)
    }

    /// 验证回调
    fn verify_callback(&self, input: CallbackInput) -> Verification {
        let fields = match Self::decode_callback(input) {
            Ok(fields) => fields,
            Err(reason) => {
                warn!(%reason, "Undecodable eSewa callback");
                return rejected(&None, reason);
            }
        };

        let transaction_id = fields.get("transaction_uuid").cloned();

        // 非 COMPLETE 状态不验签，必要字段可能本来就缺失
        let status = fields.get("status").map(String::as_str).unwrap_or_default();
        if status != STATUS_COMPLETE {
            warn!(
                transaction_id = ?transaction_id,
                status = %status,
                "eSewa payment not complete"
            );
            return rejected(
                &transaction_id,
                RejectionReason::NotComplete {
                    status: status.to_string(),
                },
            );
        }

        let Some(raw_names) = fields.get("signed_field_names") else {
            return rejected(
                &transaction_id,
                RejectionReason::MissingField("signed_field_names".to_string()),
            );
        };
        let names = match SignedFieldNames::parse(raw_names) {
            Ok(names) => names,
            Err(e) => return rejected(&transaction_id, RejectionReason::MalformedPayload(e.to_string())),
        };
        if let Some(unsigned) = CALLBACK_REQUIRED_SIGNED
            .iter()
            .find(|required| !names.names().any(|name| name == **required))
        {
            error!(
                security_event = "unsigned_callback_field",
                transaction_id = ?transaction_id,
                field = *unsigned,
                signed_field_names = %names,
                "eSewa callback does not sign a required field"
            );
            return rejected(
                &transaction_id,
                RejectionReason::UnsignedField(unsigned.to_string()),
            );
        }
        let Some(signature) = fields.get("signature") else {
            return rejected(
                &transaction_id,
                RejectionReason::MissingField("signature".to_string()),
            );
        };

        let canonical = match names.canonicalize(|name| fields.get(name).cloned()) {
            Ok(canonical) => canonical,
            Err(missing) => {
                return rejected(&transaction_id, RejectionReason::MissingField(missing));
            }
        };

        if !self.engine.verify(&canonical, signature) {
            error!(
                security_event = "signature_mismatch",
                transaction_id = ?transaction_id,
                signed_field_names = %names,
                "eSewa callback signature mismatch, possible tampering"
            );
            return rejected(&transaction_id, RejectionReason::SignatureMismatch);
        }

        let product_code = fields.get("product_code").map(String::as_str).unwrap_or_default();
        if product_code != self.config.merchant_code {
            error!(
                security_event = "merchant_mismatch",
                transaction_id = ?transaction_id,
                product_code = %product_code,
                "eSewa callback signed for another merchant"
            );
            return rejected(
                &transaction_id,
                RejectionReason::MerchantMismatch {
                    received: product_code.to_string(),
                },
            );
        }

        let Some(transaction_id) = transaction_id else {
            return rejected(
                &None,
                RejectionReason::MissingField("transaction_uuid".to_string()),
            );
        };
        let Some(reference_id) = fields.get("transaction_code").cloned() else {
            return rejected(
                &Some(transaction_id),
                RejectionReason::MissingField("transaction_code".to_string()),
            );
        };
        let amount = match fields.get("total_amount").map(|raw| Money::parse_decimal(raw)) {
            Some(Ok(amount)) => amount,
            Some(Err(e)) => {
                return rejected(&Some(transaction_id), RejectionReason::MalformedPayload(e.to_string()));
            }
            None => {
                return rejected(
                    &Some(transaction_id),
                    RejectionReason::MissingField("total_amount".to_string()),
                );
            }
        };

        info!(
            transaction_id = %transaction_id,
            reference_id = %reference_id,
            "eSewa callback verified"
        );

        Verification::Verified(VerifiedPayment {
            transaction_id,
            amount,
            reference_id,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Charges, CustomerInfo, OrderStatus};
    use crate::infrastructure::config::esewa_config::DEFAULT_ESEWA_FORM_URL;

    pub(crate) const SECRET: &str = "8gBm/:&EnhH.1/q";
    pub(crate) const CALLBACK_FIELDS: &str =
        "transaction_code,status,total_amount,transaction_uuid,product_code,signed_field_names";

    pub(crate) fn config() -> Arc<EsewaConfig> {
        Arc::new(EsewaConfig {
            merchant_code: "EPAYTEST".to_string(),
            merchant_secret: SECRET.to_string(),
            public_base_url: "https://shop.example.com".to_string(),
            form_url: DEFAULT_ESEWA_FORM_URL.to_string(),
        })
    }

    pub(crate) fn adapter() -> EsewaGatewayAdapter {
        EsewaGatewayAdapter::new(config()).unwrap()
    }

    pub(crate) fn order_with_total(rupees: i64) -> Order {
        Order::new(
            Money::from_rupees(rupees),
            Charges::default(),
            PaymentMethod::Esewa,
            "Dhaka topi".to_string(),
            CustomerInfo {
                name: "Sita Sharma".to_string(),
                email: "sita@example.com".to_string(),
                phone: "9800000000".to_string(),
            },
        )
        .unwrap()
    }

    /// 模拟网关生成的回调字段（按 signed_field_names 签名）
    pub(crate) fn signed_callback(
        secret: &str,
        transaction_id: &str,
        total_amount: &str,
        reference_id: &str,
    ) -> HashMap<String, String> {
        let mut fields: HashMap<String, String> = [
            ("transaction_code", reference_id),
            ("status", "COMPLETE"),
            ("total_amount", total_amount),
            ("transaction_uuid", transaction_id),
            ("product_code", "EPAYTEST"),
            ("signed_field_names", CALLBACK_FIELDS),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let canonical = SignedFieldNames::parse(CALLBACK_FIELDS)
            .unwrap()
            .canonicalize(|name| fields.get(name).cloned())
            .unwrap();
        let signature = SignatureEngine::new(secret).unwrap().sign(&canonical);
        fields.insert("signature".to_string(), signature);
        fields
    }

    pub(crate) fn encode(fields: &HashMap<String, String>) -> String {
        STANDARD.encode(serde_json::to_vec(fields).unwrap())
    }

    #[test]
    fn test_build_request_scenario_a() {
        let mut order = order_with_total(1500);
        order.transaction_id = "T-1".to_string();

        let request = adapter().build_request(&order).unwrap();

        assert_eq!(request.total_amount, "1500");
        assert_eq!(request.amount, "1500");
        assert_eq!(request.tax_amount, "0");
        assert_eq!(request.transaction_uuid, "T-1");
        assert_eq!(request.product_code, "EPAYTEST");
        assert_eq!(
            request.success_url,
            "https://shop.example.com/payment/esewa/success"
        );
        assert_eq!(
            request.signed_field_names.to_string(),
            "total_amount,transaction_uuid,product_code"
        );

        let expected = SignatureEngine::new(SECRET)
            .unwrap()
            .sign("total_amount=1500,transaction_uuid=T-1,product_code=EPAYTEST");
        assert_eq!(request.signature, expected);
    }

    #[test]
    fn test_build_request_includes_charges_in_total() {
        let mut order = Order::new(
            Money::from_paisa(100050),
            Charges {
                tax_amount: Money::from_rupees(130),
                service_charge: Money::from_rupees(10),
                delivery_charge: Money::from_rupees(100),
            },
            PaymentMethod::Esewa,
            "Pashmina shawl".to_string(),
            order_with_total(1).customer,
        )
        .unwrap();
        order.transaction_id = "T-9".to_string();

        let request = adapter().build_request(&order).unwrap();

        assert_eq!(request.amount, "1000.50");
        assert_eq!(request.total_amount, "1240.50");
        assert_eq!(request.product_service_charge, "10");
        assert_eq!(request.product_delivery_charge, "100");
    }

    #[test]
    fn test_build_request_rejects_finished_or_foreign_orders() {
        let mut order = order_with_total(1500);
        order.status = OrderStatus::Completed;
        assert!(matches!(
            adapter().build_request(&order),
            Err(DomainError::InvalidState { .. })
        ));

        let mut order = order_with_total(1500);
        order.payment_method = PaymentMethod::Khalti;
        assert!(matches!(
            adapter().build_request(&order),
            Err(DomainError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_configuration_fails_fast() {
        let mut cfg = (*config()).clone();
        cfg.merchant_secret = String::new();
        assert!(matches!(
            EsewaGatewayAdapter::new(Arc::new(cfg)),
            Err(DomainError::ConfigurationError(_))
        ));

        let mut cfg = (*config()).clone();
        cfg.merchant_code = " ".to_string();
        assert!(matches!(
            EsewaGatewayAdapter::new(Arc::new(cfg)),
            Err(DomainError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_verify_encoded_callback() {
        let fields = signed_callback(SECRET, "T-1", "1500.0", "000AE01");

        let verification = adapter().verify_callback(CallbackInput::Encoded(encode(&fields)));

        assert_eq!(
            verification,
            Verification::Verified(VerifiedPayment {
                transaction_id: "T-1".to_string(),
                amount: Money::from_rupees(1500),
                reference_id: "000AE01".to_string(),
            })
        );
    }

    #[test]
    fn test_verify_plain_callback() {
        let fields = signed_callback(SECRET, "T-1", "1500", "000AE01");
        let verification = adapter().verify_callback(CallbackInput::Plain(fields));
        assert!(verification.is_ok());
    }

    /// 连续三个 '~' 中必有一个落在 3 字节分组的末位，其低 6 位编码为 '+'
    pub(crate) const PLUS_PRODUCING_REFERENCE: &str = "000AE~~~";

    #[test]
    fn test_encoded_callback_survives_plus_to_space() {
        let fields = signed_callback(SECRET, "T-1", "1500", PLUS_PRODUCING_REFERENCE);
        let encoded = encode(&fields);
        assert!(encoded.contains('+'));

        let mangled = encoded.replace('+', " ");
        let verification = adapter().verify_callback(CallbackInput::Encoded(mangled));

        assert_eq!(
            verification,
            Verification::Verified(VerifiedPayment {
                transaction_id: "T-1".to_string(),
                amount: Money::from_rupees(1500),
                reference_id: PLUS_PRODUCING_REFERENCE.to_string(),
            })
        );
    }

    #[test]
    fn test_outbound_signature_cannot_complete_a_payment() {
        let mut order = order_with_total(1500);
        order.transaction_id = "T-1".to_string();
        let request = adapter().build_request(&order).unwrap();

        let mut fields = HashMap::new();
        for (name, value) in request.form_fields() {
            fields.insert(name, value);
        }
        fields.insert("status".to_string(), "COMPLETE".to_string());
        fields.insert("transaction_code".to_string(), "FAKE".to_string());

        let verification = adapter().verify_callback(CallbackInput::Plain(fields));

        match verification {
            Verification::Rejected {
                transaction_id,
                reason,
            } => {
                assert_eq!(transaction_id.as_deref(), Some("T-1"));
                assert!(matches!(reason, RejectionReason::UnsignedField(_)));
                assert!(reason.is_tamper_suspected());
            }
            other => panic!("unexpected verification: {:?}", other),
        }
    }

    #[test]
    fn test_each_required_field_must_be_signed() {
        for dropped in ["transaction_code", "status", "total_amount", "transaction_uuid", "product_code"] {
            let mut fields = signed_callback(SECRET, "T-1", "1500", "000AE01");
            let names: Vec<&str> = CALLBACK_FIELDS.split(',').filter(|n| *n != dropped).collect();
            fields.insert("signed_field_names".to_string(), names.join(","));
            let canonical = SignedFieldNames::parse(&fields["signed_field_names"])
                .unwrap()
                .canonicalize(|name| fields.get(name).cloned())
                .unwrap();
            fields.insert(
                "signature".to_string(),
                SignatureEngine::new(SECRET).unwrap().sign(&canonical),
            );

            let verification = adapter().verify_callback(CallbackInput::Plain(fields));

            assert_eq!(
                verification,
                Verification::Rejected {
                    transaction_id: Some("T-1".to_string()),
                    reason: RejectionReason::UnsignedField(dropped.to_string()),
                },
                "{} was accepted unsigned",
                dropped
            );
        }
    }

    #[test]
    fn test_callback_for_another_merchant_is_rejected() {
        let mut fields = signed_callback(SECRET, "T-1", "1500", "000AE01");
        fields.insert("product_code".to_string(), "OTHERSHOP".to_string());
        let canonical = SignedFieldNames::parse(CALLBACK_FIELDS)
            .unwrap()
            .canonicalize(|name| fields.get(name).cloned())
            .unwrap();
        fields.insert(
            "signature".to_string(),
            SignatureEngine::new(SECRET).unwrap().sign(&canonical),
        );

        let verification = adapter().verify_callback(CallbackInput::Plain(fields));

        assert_eq!(
            verification,
            Verification::Rejected {
                transaction_id: Some("T-1".to_string()),
                reason: RejectionReason::MerchantMismatch {
                    received: "OTHERSHOP".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_non_complete_short_circuits_before_signature() {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), "PENDING".to_string());
        fields.insert("transaction_uuid".to_string(), "T-1".to_string());
        fields.insert("signature".to_string(), "garbage".to_string());

        let verification = adapter().verify_callback(CallbackInput::Encoded(encode(&fields)));

        match verification {
            Verification::Rejected {
                transaction_id,
                reason,
            } => {
                assert_eq!(transaction_id.as_deref(), Some("T-1"));
                assert_eq!(reason.to_string(), "not complete");
            }
            other => panic!("unexpected verification: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_secret_is_signature_mismatch() {
        let fields = signed_callback("not-the-merchant-secret", "T-1", "1500", "000AE01");

        let verification = adapter().verify_callback(CallbackInput::Plain(fields));

        assert_eq!(
            verification,
            Verification::Rejected {
                transaction_id: Some("T-1".to_string()),
                reason: RejectionReason::SignatureMismatch,
            }
        );
    }

    #[test]
    fn test_any_mutated_signed_field_is_detected() {
        let original = signed_callback(SECRET, "T-1", "1500", "000AE01");
        for field in ["transaction_code", "total_amount", "transaction_uuid", "product_code"] {
            let mut fields = original.clone();
            let value = fields.get_mut(field).unwrap();
            value.push('9');

            let verification = adapter().verify_callback(CallbackInput::Plain(fields));
            assert!(
                matches!(
                    verification,
                    Verification::Rejected {
                        reason: RejectionReason::SignatureMismatch,
                        ..
                    }
                ),
                "mutating {} went undetected",
                field
            );
        }
    }

    #[test]
    fn test_callback_order_comes_from_its_own_field_list() {
        // 签名按回调声明的顺序计算；声明顺序改变后原签名失效
        let mut fields = signed_callback(SECRET, "T-1", "1500", "000AE01");
        fields.insert(
            "signed_field_names".to_string(),
            "status,transaction_code,total_amount,transaction_uuid,product_code".to_string(),
        );
        let verification = adapter().verify_callback(CallbackInput::Plain(fields.clone()));
        assert!(!verification.is_ok());

        // 用相同的新顺序重新签名即可通过，说明没有写死顺序
        let canonical = SignedFieldNames::parse(&fields["signed_field_names"])
            .unwrap()
            .canonicalize(|name| fields.get(name).cloned())
            .unwrap();
        fields.insert(
            "signature".to_string(),
            SignatureEngine::new(SECRET).unwrap().sign(&canonical),
        );
        assert!(adapter().verify_callback(CallbackInput::Plain(fields)).is_ok());
    }

    #[test]
    fn test_missing_signed_field_is_rejected() {
        let mut fields = signed_callback(SECRET, "T-1", "1500", "000AE01");
        fields.remove("transaction_code");

        let verification = adapter().verify_callback(CallbackInput::Plain(fields));

        assert_eq!(
            verification,
            Verification::Rejected {
                transaction_id: Some("T-1".to_string()),
                reason: RejectionReason::MissingField("transaction_code".to_string()),
            }
        );
    }

    #[test]
    fn test_malformed_data_is_rejected_without_transaction() {
        let verification =
            adapter().verify_callback(CallbackInput::Encoded("%%%not-base64".to_string()));

        assert!(matches!(
            verification,
            Verification::Rejected {
                transaction_id: None,
                reason: RejectionReason::MalformedPayload(_),
            }
        ));
    }
}
