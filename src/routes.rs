//! Route definitions for the PickVault API

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::{admin, auth, content, payments, picks, plans, support, users, withdrawals};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/verify-otp", post(auth::verify_otp))
        .route("/api/auth/resend-otp", post(auth::resend_otp))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(users::get_profile))
        .route("/api/users/me", put(users::update_profile))
        .route("/api/users/me/password", put(users::change_password))
        .route("/api/users/me/referrals", get(users::my_referrals))
        .route("/api/users/me/transactions", get(users::my_transactions))
}

pub fn pick_routes() -> Router<AppState> {
    Router::new()
        .route("/api/picks", get(picks::list_picks))
        .route("/api/picks", post(picks::create_pick))
        .route("/api/picks/:id", get(picks::get_pick))
        .route("/api/picks/:id", put(picks::update_pick))
        .route("/api/picks/:id", delete(picks::delete_pick))
        .route("/api/picks/:id/status", put(picks::update_pick_status))
}

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/plans", get(plans::list_plans))
        .route("/api/plans", post(plans::create_plan))
        .route("/api/plans/:id", put(plans::update_plan))
        .route("/api/plans/:id", delete(plans::delete_plan))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments", post(payments::submit_payment))
        .route("/api/payments/mine", get(payments::my_payments))
}

pub fn withdrawal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/withdrawals", post(withdrawals::submit_withdrawal))
        .route("/api/withdrawals/mine", get(withdrawals::my_withdrawals))
        .route(
            "/api/withdrawals/:id/submit-code",
            post(withdrawals::submit_code),
        )
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/:id", put(admin::update_user))
        .route("/api/admin/users/:id", delete(admin::deactivate_user))
        .route("/api/admin/payments", get(admin::list_payments))
        .route("/api/admin/payments/:id/approve", post(admin::approve_payment))
        .route("/api/admin/payments/:id/reject", post(admin::reject_payment))
        .route("/api/admin/withdrawals", get(admin::list_withdrawals))
        .route(
            "/api/admin/withdrawals/:id/confirm-code",
            post(admin::confirm_withdrawal_code),
        )
        .route(
            "/api/admin/withdrawals/:id/reject-code",
            post(admin::reject_withdrawal_code),
        )
        .route(
            "/api/admin/withdrawals/:id/process",
            post(admin::process_withdrawal),
        )
        .route(
            "/api/admin/withdrawals/:id/complete",
            post(admin::complete_withdrawal),
        )
        .route(
            "/api/admin/withdrawals/:id/reject",
            post(admin::reject_withdrawal),
        )
        .route("/api/admin/referrals", get(admin::list_referrals))
        .route(
            "/api/admin/referrals/:id/mark-paid",
            post(admin::mark_referral_paid),
        )
        .route("/api/admin/announcements", get(content::list_all_announcements))
        .route("/api/admin/tickets", get(support::list_tickets))
        .route("/api/admin/tickets/:id/close", post(support::close_ticket))
        .route("/api/admin/inquiries", get(content::list_inquiries))
        .route(
            "/api/admin/inquiries/:id/read",
            post(content::mark_inquiry_read),
        )
}

pub fn announcement_routes() -> Router<AppState> {
    Router::new()
        .route("/api/announcements", get(content::list_announcements))
        .route("/api/announcements", post(content::create_announcement))
        .route("/api/announcements/:id", put(content::update_announcement))
        .route(
            "/api/announcements/:id",
            delete(content::delete_announcement),
        )
}

pub fn support_routes() -> Router<AppState> {
    Router::new()
        .route("/api/support", post(support::create_ticket))
        .route("/api/support/mine", get(support::my_tickets))
        .route("/api/support/:id", get(support::get_ticket))
        .route("/api/support/:id/respond", post(support::respond))
}

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/api/homepage", get(content::get_homepage))
        .route("/api/homepage", put(content::put_homepage))
        .route("/api/config", get(content::get_dashboard_config))
        .route("/api/config", put(content::put_dashboard_config))
        .route("/api/contact", post(content::submit_contact))
}
