use ridebook_catalog::{PricingConfig, QuoteCalculator};
use ridebook_core::{BookingRepository, NotificationDispatcher, PaymentProcessor, VehicleCatalog};
use ridebook_infra::WebhookVerifier;
use ridebook_order::{BookingOrchestrator, PaymentReconciler, PaymentSessionBridge, ReceiptAssembler};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingOrchestrator>,
    pub sessions: Arc<PaymentSessionBridge>,
    pub reconciler: Arc<PaymentReconciler>,
    pub receipts: Arc<ReceiptAssembler>,
    pub webhook: WebhookVerifier,
    /// Percent collected when a customer picks `"deposit"`.
    pub deposit_percent: u8,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn VehicleCatalog>,
        repo: Arc<dyn BookingRepository>,
        processor: Arc<dyn PaymentProcessor>,
        notifier: Arc<dyn NotificationDispatcher>,
        pricing: PricingConfig,
        webhook: WebhookVerifier,
        deposit_percent: u8,
    ) -> Self {
        Self {
            bookings: Arc::new(BookingOrchestrator::new(catalog, repo.clone(), QuoteCalculator::new(pricing))),
            sessions: Arc::new(PaymentSessionBridge::new(repo.clone(), processor.clone())),
            reconciler: Arc::new(PaymentReconciler::new(repo.clone(), processor).with_notifier(notifier)),
            receipts: Arc::new(ReceiptAssembler::new(repo)),
            webhook,
            deposit_percent,
        }
    }
}
