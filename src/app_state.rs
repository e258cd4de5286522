//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::services::{
    ContentService, EmailService, PaymentService, PickService, PlanService, ReferralService,
    SupportService, UserService, WithdrawalService,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub pick_service: Arc<PickService>,
    pub plan_service: Arc<PlanService>,
    pub payment_service: Arc<PaymentService>,
    pub withdrawal_service: Arc<WithdrawalService>,
    pub referral_service: Arc<ReferralService>,
    pub support_service: Arc<SupportService>,
    pub content_service: Arc<ContentService>,
    pub email_service: Arc<EmailService>,
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(db_pool: PgPool, jwt_secret: String, email_service: EmailService) -> Self {
        let email_service = Arc::new(email_service);
        let user_service = Arc::new(UserService::new(db_pool.clone()));
        let plan_service = Arc::new(PlanService::new(db_pool.clone()));
        let referral_service = Arc::new(ReferralService::new(db_pool.clone()));
        let payment_service = Arc::new(PaymentService::new(
            db_pool.clone(),
            Arc::clone(&user_service),
            Arc::clone(&plan_service),
            Arc::clone(&referral_service),
            Arc::clone(&email_service),
        ));
        let withdrawal_service = Arc::new(WithdrawalService::new(
            db_pool.clone(),
            Arc::clone(&user_service),
        ));
        let support_service = Arc::new(SupportService::new(
            db_pool.clone(),
            Arc::clone(&email_service),
        ));

        Self {
            user_service,
            pick_service: Arc::new(PickService::new(db_pool.clone())),
            plan_service,
            payment_service,
            withdrawal_service,
            referral_service,
            support_service,
            content_service: Arc::new(ContentService::new(db_pool)),
            email_service,
            jwt_secret,
        }
    }
}
