pub mod error;
pub mod orchestrator;
pub mod receipt;
pub mod reconciliation;
pub mod session;
pub mod validation;

pub use error::BookingError;
pub use orchestrator::BookingOrchestrator;
pub use receipt::{assemble, Receipt, ReceiptAssembler};
pub use reconciliation::{
    AmountMismatch, ConfirmTarget, Disposition, PaymentReconciler, ReconciliationResult,
};
pub use session::{PaymentRedirect, PaymentSessionBridge};
