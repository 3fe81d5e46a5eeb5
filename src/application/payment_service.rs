use crate::application::dispatcher::GatewayRedirectDispatcher;
use crate::application::dto::{
    CallbackOutcome, CreateOrderRequest, EsewaCheckoutResponse, KhaltiCheckoutResponse,
    OrderResponse,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{
    DomainEvent, Order, OrderStatus, PaymentCompleted, PaymentDetails, PaymentEvent, PaymentFailed,
    PaymentMethod,
};
use crate::ports::esewa_port::{CallbackInput, RejectionReason, Verification};
use crate::ports::khalti_port::{KhaltiCustomerInfo, KhaltiInitiateRequest};
use crate::ports::{EsewaGatewayPort, KhaltiPort, OrderRepositoryPort, UserAgentRedirect};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 对账结果；`event` 为空表示本次调用没有改变订单（重复回调等）
#[derive(Debug, Clone)]
pub struct ReconciledOrder {
    pub order: Order,
    pub event: Option<PaymentEvent>,
}

/// 支付服务
pub struct PaymentService<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort> {
    esewa: Arc<E>,
    khalti: Arc<K>,
    repository: Arc<R>,
    dispatcher: GatewayRedirectDispatcher,
}

impl<E: EsewaGatewayPort, K: KhaltiPort, R: OrderRepositoryPort> PaymentService<E, K, R> {
    pub fn new(esewa: Arc<E>, khalti: Arc<K>, repository: Arc<R>) -> Self {
        let dispatcher = GatewayRedirectDispatcher::new(esewa.form_endpoint());
        Self {
            esewa,
            khalti,
            repository,
            dispatcher,
        }
    }

    async fn load_order(&self, transaction_id: &str) -> DomainResult<Order> {
        self.repository
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(transaction_id.to_string()))
    }

    /// 创建待支付订单
    pub async fn create_order(&self, request: CreateOrderRequest) -> DomainResult<OrderResponse> {
        let order = Order::new(
            request.amount,
            request.charges,
            request.payment_method,
            request.description,
            request.customer,
        )?;

        self.repository.save(&order).await?;
        info!(
            transaction_id = %order.transaction_id,
            total_amount = %order.total_amount,
            payment_method = %order.payment_method,
            "Order created"
        );

        Ok(OrderResponse::from(&order))
    }

    /// 查询订单
    pub async fn query_order(&self, transaction_id: &str) -> DomainResult<OrderResponse> {
        let order = self.load_order(transaction_id).await?;
        Ok(OrderResponse::from(&order))
    }

    /// 生成 eSewa 表单地址与签名字段，供前端自行提交
    pub async fn initiate_esewa(&self, transaction_id: &str) -> DomainResult<EsewaCheckoutResponse> {
        let order = self.load_order(transaction_id).await?;
        let payload = self.esewa.build_request(&order)?;
        // 与跳转页使用同样的完整性校验
        self.dispatcher.build_form(&payload)?;

        Ok(EsewaCheckoutResponse {
            payment_url: self.esewa.form_endpoint().to_string(),
            payload,
        })
    }

    /// 构造请求并交给浏览器跳转到 eSewa
    pub async fn checkout_esewa<U: UserAgentRedirect>(
        &self,
        transaction_id: &str,
        user_agent: &U,
    ) -> DomainResult<U::Output> {
        let order = self.load_order(transaction_id).await?;
        let payload = self.esewa.build_request(&order)?;
        self.dispatcher.dispatch(&payload, user_agent)
    }

    /// 服务端向 Khalti 发起支付
    pub async fn initiate_khalti(&self, transaction_id: &str) -> DomainResult<KhaltiCheckoutResponse> {
        let order = self.load_order(transaction_id).await?;

        if order.payment_method != PaymentMethod::Khalti {
            return Err(DomainError::ValidationError(format!(
                "Order {} is paid via {}, not khalti",
                order.transaction_id, order.payment_method
            )));
        }
        if !order.can_pay() {
            return Err(DomainError::InvalidState {
                expected: OrderStatus::Pending.to_string(),
                actual: order.status.to_string(),
            });
        }

        let response = self
            .khalti
            .initiate(KhaltiInitiateRequest {
                amount: order.total_amount.to_paisa(),
                purchase_order_id: order.transaction_id.clone(),
                purchase_order_name: order.description.clone(),
                customer_info: KhaltiCustomerInfo {
                    name: order.customer.name.clone(),
                    email: order.customer.email.clone(),
                    phone: order.customer.phone.clone(),
                },
            })
            .await?;

        Ok(KhaltiCheckoutResponse {
            payment_url: response.payment_url,
            pidx: response.pidx,
            expires_at: response.expires_at,
        })
    }

    /// 处理 eSewa 成功回调；任何错误都转换为失败跳转
    pub async fn handle_esewa_success(&self, input: CallbackInput) -> CallbackOutcome {
        let verification = self.esewa.verify_callback(input);
        debug!(verified = verification.is_ok(), "eSewa success callback checked");

        let Some(transaction_id) = verification.transaction_id().map(str::to_string) else {
            warn!("eSewa callback carries no transaction id, nothing to reconcile");
            return CallbackOutcome::failure(None);
        };

        self.finish_callback(&transaction_id, verification).await
    }

    /// 处理 eSewa 失败回调（不带签名，不验签）
    pub async fn handle_esewa_failure(&self, params: HashMap<String, String>) -> CallbackOutcome {
        debug!(?params, "eSewa failure callback");

        let Some(transaction_id) = params
            .get("transaction_uuid")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        else {
            warn!("eSewa failure callback without transaction_uuid");
            return CallbackOutcome::failure(None);
        };

        let verification = Verification::Rejected {
            transaction_id: Some(transaction_id.clone()),
            reason: RejectionReason::GatewayReportedFailure,
        };
        self.finish_callback(&transaction_id, verification).await
    }

    async fn finish_callback(&self, transaction_id: &str, verification: Verification) -> CallbackOutcome {
        match self.reconcile(transaction_id, verification).await {
            Ok(reconciled) => {
                if let Some(event) = &reconciled.event {
                    info!(
                        transaction_id = %transaction_id,
                        event_type = event.event_type(),
                        occurred_at = %event.occurred_at(),
                        "Payment reconciled"
                    );
                }
                CallbackOutcome::from_order(reconciled.order)
            }
            Err(DomainError::OrderNotFound(id)) => {
                error!(
                    transaction_id = %id,
                    "Gateway callback for unknown order"
                );
                CallbackOutcome::failure(None)
            }
            Err(e) => {
                error!(
                    transaction_id = %transaction_id,
                    "Failed to reconcile payment: {}", e
                );
                CallbackOutcome::failure(None)
            }
        }
    }

    /// 将验签结果写入订单；重复调用不会重复产生事件
    pub async fn reconcile(
        &self,
        transaction_id: &str,
        verification: Verification,
    ) -> DomainResult<ReconciledOrder> {
        let order = self.load_order(transaction_id).await?;

        match verification {
            Verification::Verified(payment) => {
                if payment.transaction_id != order.transaction_id {
                    return Err(DomainError::ValidationError(format!(
                        "Verified payment {} does not belong to order {}",
                        payment.transaction_id, order.transaction_id
                    )));
                }

                if order.status == OrderStatus::Completed {
                    info!(transaction_id = %transaction_id, "Order already completed, skipping");
                    return Ok(ReconciledOrder { order, event: None });
                }
                if !order.can_pay() {
                    warn!(
                        transaction_id = %transaction_id,
                        status = %order.status,
                        "Verified payment for a non-pending order, leaving it unchanged"
                    );
                    return Ok(ReconciledOrder { order, event: None });
                }

                if payment.amount != order.total_amount {
                    let reason = RejectionReason::AmountMismatch {
                        expected: order.total_amount,
                        received: payment.amount,
                    };
                    return self.fail(order, reason).await;
                }

                let mut updated = order;
                updated.mark_as_completed(PaymentDetails {
                    method: PaymentMethod::Esewa,
                    reference_id: payment.reference_id,
                    amount: payment.amount,
                    transaction_id: payment.transaction_id,
                })?;

                let event = PaymentCompleted::from_order(&updated).map(PaymentEvent::Completed);
                self.apply(updated, event).await
            }
            Verification::Rejected { reason, .. } => {
                if !order.can_pay() {
                    info!(
                        transaction_id = %transaction_id,
                        status = %order.status,
                        %reason,
                        "Rejected callback for a settled order, leaving it unchanged"
                    );
                    return Ok(ReconciledOrder { order, event: None });
                }
                self.fail(order, reason).await
            }
        }
    }

    async fn fail(&self, order: Order, reason: RejectionReason) -> DomainResult<ReconciledOrder> {
        if reason.is_tamper_suspected() {
            error!(
                security_event = "tamper_suspected",
                transaction_id = %order.transaction_id,
                %reason,
                "Marking order failed"
            );
        } else {
            warn!(
                transaction_id = %order.transaction_id,
                %reason,
                "Marking order failed"
            );
        }

        let mut updated = order;
        updated.mark_as_failed(reason.to_string())?;
        let event = PaymentEvent::Failed(PaymentFailed::new(&updated, reason.to_string()));
        self.apply(updated, Some(event)).await
    }

    /// 以 pending 为前提写入；并发回调抢先时读取最新状态返回
    async fn apply(&self, updated: Order, event: Option<PaymentEvent>) -> DomainResult<ReconciledOrder> {
        if self
            .repository
            .transition(&updated, OrderStatus::Pending)
            .await?
        {
            return Ok(ReconciledOrder {
                order: updated,
                event,
            });
        }

        debug!(
            transaction_id = %updated.transaction_id,
            "Order changed concurrently, returning stored state"
        );
        let current = self.load_order(&updated.transaction_id).await?;
        Ok(ReconciledOrder {
            order: current,
            event: None,
        })
    }
}
