//! Service layer - business logic and data access, one service per resource

pub mod content_service;
pub mod email_service;
pub mod payment_service;
pub mod pick_service;
pub mod plan_service;
pub mod referral;
pub mod referral_service;
pub mod support_service;
pub mod user_service;
pub mod withdrawal_service;

pub use content_service::ContentService;
pub use email_service::EmailService;
pub use payment_service::PaymentService;
pub use pick_service::PickService;
pub use plan_service::PlanService;
pub use referral_service::ReferralService;
pub use support_service::SupportService;
pub use user_service::UserService;
pub use withdrawal_service::WithdrawalService;
