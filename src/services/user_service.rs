//! User service layer - accounts, OTP registration, credentials

use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    PasswordReset, PendingRegistration, PlanTier, User, UserRole,
};

const OTP_TTL_MINUTES: i64 = 15;
const RESET_TTL_MINUTES: i64 = 15;

pub struct UserService {
    db_pool: PgPool,
}

/// Admin-editable user fields; `None` leaves a field unchanged.
#[derive(Debug, Default)]
pub struct AdminUserUpdate {
    pub role: Option<UserRole>,
    pub plan: Option<PlanTier>,
    pub plan_expiry: Option<Option<chrono::DateTime<Utc>>>,
    pub balance: Option<f64>,
    pub is_active: Option<bool>,
}

/// Filters for the admin user list.
#[derive(Debug, Default)]
pub struct UserListFilter {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub plan: Option<PlanTier>,
    pub is_active: Option<bool>,
}

impl UserService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_referral_code(&self, code: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE referral_code = $1")
            .bind(code)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(user)
    }

    // ===== Registration =====

    /// Start registration: stash a pending record holding the hashed password
    /// and a fresh OTP. Re-registering the same email before verification
    /// replaces the previous pending record.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
        referral_code: Option<&str>,
    ) -> ApiResult<PendingRegistration> {
        if self.get_by_email(email).await?.is_some() {
            return Err(ApiError::conflict(
                "An account with this email already exists",
                "EMAIL_IN_USE",
            ));
        }

        if let Some(code) = referral_code {
            if self.find_by_referral_code(code).await?.is_none() {
                return Err(ApiError::validation("Unknown referral code"));
            }
        }

        let password_hash = hash_password(password)?;
        let now = Utc::now();
        let pending = sqlx::query_as::<_, PendingRegistration>(
            r#"
            INSERT INTO pending_registrations
                (id, email, name, password_hash, otp_code, referral_code, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                password_hash = EXCLUDED.password_hash,
                otp_code = EXCLUDED.otp_code,
                referral_code = EXCLUDED.referral_code,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(generate_otp())
        .bind(referral_code)
        .bind(now + Duration::minutes(OTP_TTL_MINUTES))
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(pending)
    }

    /// Issue a fresh OTP for an email still awaiting verification.
    pub async fn resend_otp(&self, email: &str) -> ApiResult<PendingRegistration> {
        let now = Utc::now();
        let pending = sqlx::query_as::<_, PendingRegistration>(
            r#"
            UPDATE pending_registrations
            SET otp_code = $2, expires_at = $3
            WHERE email = $1
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(generate_otp())
        .bind(now + Duration::minutes(OTP_TTL_MINUTES))
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Pending registration"))?;

        Ok(pending)
    }

    /// Promote a pending registration to a full user once the OTP checks out.
    /// The pending record is deleted on success.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> ApiResult<User> {
        let pending = sqlx::query_as::<_, PendingRegistration>(
            "SELECT * FROM pending_registrations WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Pending registration"))?;

        if pending.expires_at <= Utc::now() {
            return Err(ApiError::validation("Verification code has expired"));
        }
        if pending.otp_code != otp {
            return Err(ApiError::validation("Invalid verification code"));
        }

        let referred_by = match pending.referral_code.as_deref() {
            Some(code) => self.find_by_referral_code(code).await?.map(|u| u.id),
            None => None,
        };

        let mut tx = self.db_pool.begin().await?;
        let user = self
            .insert_user(
                &mut tx,
                &pending.email,
                &pending.name,
                &pending.password_hash,
                PlanTier::Free,
                None,
                referred_by,
            )
            .await?;

        sqlx::query("DELETE FROM pending_registrations WHERE id = $1")
            .bind(pending.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(user)
    }

    /// Create an already-active user, used when approving a subscription
    /// payment submitted before the account existed. Runs on the caller's
    /// connection so approval can enlist it in its transaction. Returns the
    /// generated plaintext password so it can be mailed to the new user.
    pub async fn create_subscribed_user(
        &self,
        conn: &mut PgConnection,
        email: &str,
        name: &str,
        plan: PlanTier,
        plan_expiry: chrono::DateTime<Utc>,
        referred_by: Option<Uuid>,
    ) -> ApiResult<(User, String)> {
        let password = generate_password();
        let password_hash = hash_password(&password)?;
        let user = self
            .insert_user(
                conn,
                email,
                name,
                &password_hash,
                plan,
                Some(plan_expiry),
                referred_by,
            )
            .await?;
        Ok((user, password))
    }

    async fn insert_user(
        &self,
        conn: &mut PgConnection,
        email: &str,
        name: &str,
        password_hash: &str,
        plan: PlanTier,
        plan_expiry: Option<chrono::DateTime<Utc>>,
        referred_by: Option<Uuid>,
    ) -> ApiResult<User> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (id, email, name, password_hash, role, plan, plan_expiry, balance,
                 referral_code, referred_by, referral_total, referral_pending, referral_paid,
                 is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'user', $5, $6, 0, $7, $8, 0, 0, 0, TRUE, $9, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(plan)
        .bind(plan_expiry)
        .bind(generate_referral_code())
        .bind(referred_by)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(user)
    }

    // ===== Credentials =====

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let user = self
            .get_by_email(email)
            .await?
            .ok_or_else(|| ApiError::Auth("Invalid email or password".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(ApiError::Auth("Invalid email or password".to_string()));
        }
        if !user.is_active {
            return Err(ApiError::Auth("Account is deactivated".to_string()));
        }

        Ok(user)
    }

    /// Create or refresh a password-reset code. Returns `None` when the email
    /// has no account, so callers can avoid leaking which emails exist.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<Option<PasswordReset>> {
        if self.get_by_email(email).await?.is_none() {
            return Ok(None);
        }

        let now = Utc::now();
        let reset = sqlx::query_as::<_, PasswordReset>(
            r#"
            INSERT INTO password_resets (id, email, reset_code, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE SET
                reset_code = EXCLUDED.reset_code,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(generate_otp())
        .bind(now + Duration::minutes(RESET_TTL_MINUTES))
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(Some(reset))
    }

    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let reset = sqlx::query_as::<_, PasswordReset>(
            "SELECT * FROM password_resets WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Password reset request"))?;

        if reset.expires_at <= Utc::now() {
            return Err(ApiError::validation("Reset code has expired"));
        }
        if reset.reset_code != code {
            return Err(ApiError::validation("Invalid reset code"));
        }

        let password_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE email = $1")
            .bind(email)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await?;

        sqlx::query("DELETE FROM password_resets WHERE id = $1")
            .bind(reset.id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let user = self
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("User"))?;

        if !verify_password(current, &user.password_hash)? {
            return Err(ApiError::validation("Current password is incorrect"));
        }

        let password_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    // ===== Profile =====

    pub async fn update_profile(&self, user_id: Uuid, name: &str) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET name = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

        Ok(user)
    }

    // ===== Admin =====

    pub async fn list(
        &self,
        filter: UserListFilter,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<User>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM users WHERE 1=1");

        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            query_builder.push(" AND (email ILIKE ");
            query_builder.push_bind(pattern.clone());
            query_builder.push(" OR name ILIKE ");
            query_builder.push_bind(pattern);
            query_builder.push(")");
        }
        if let Some(role) = filter.role {
            query_builder.push(" AND role = ");
            query_builder.push_bind(role);
        }
        if let Some(plan) = filter.plan {
            query_builder.push(" AND plan = ");
            query_builder.push_bind(plan);
        }
        if let Some(is_active) = filter.is_active {
            query_builder.push(" AND is_active = ");
            query_builder.push_bind(is_active);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let users = query_builder
            .build_query_as::<User>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(users)
    }

    pub async fn admin_update(&self, user_id: Uuid, update: AdminUserUpdate) -> ApiResult<User> {
        let existing = self
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("User"))?;

        let plan_expiry = match update.plan_expiry {
            Some(value) => value,
            None => existing.plan_expiry,
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                role = $2, plan = $3, plan_expiry = $4, balance = $5,
                is_active = $6, updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(update.role.unwrap_or(existing.role))
        .bind(update.plan.unwrap_or(existing.plan))
        .bind(plan_expiry)
        .bind(update.balance.unwrap_or(existing.balance))
        .bind(update.is_active.unwrap_or(existing.is_active))
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(user)
    }

    /// Soft delete: the row stays for referential integrity, the account is
    /// locked out by the auth extractors.
    pub async fn deactivate(&self, user_id: Uuid) -> ApiResult<()> {
        let result = sqlx::query(
            "UPDATE users SET is_active = FALSE, updated_at = $2 WHERE id = $1",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User"));
        }
        Ok(())
    }

    pub async fn count_active(&self) -> ApiResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE is_active = TRUE")
                .fetch_one(&self.db_pool)
                .await?;
        Ok(count)
    }

    // ===== Plan and balance mutations (side effects of request approvals) =====
    //
    // These run on the caller's connection so request approvals can enlist
    // them in a single transaction.

    pub async fn activate_plan(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        plan: PlanTier,
        duration_days: i32,
    ) -> ApiResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE users SET plan = $2, plan_expiry = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(user_id)
        .bind(plan)
        .bind(now + Duration::days(duration_days as i64))
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User"));
        }
        Ok(())
    }

    pub async fn credit_balance(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        amount: f64,
    ) -> ApiResult<()> {
        let result = sqlx::query(
            "UPDATE users SET balance = balance + $2, updated_at = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(amount)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User"));
        }
        Ok(())
    }

    /// Conditional debit; returns false when the balance does not cover the
    /// amount, without changing anything.
    pub async fn try_debit_balance(&self, user_id: Uuid, amount: f64) -> ApiResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET balance = balance - $2, updated_at = $3
            WHERE id = $1 AND balance >= $2
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// ===== Helpers =====

fn hash_password(password: &str) -> ApiResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("bcrypt hash failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    bcrypt::verify(password, hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("bcrypt verify failed: {e}")))
}

/// Six-digit numeric OTP.
fn generate_otp() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Eight-character uppercase referral code.
fn generate_referral_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn referral_code_is_eight_uppercase_alphanumerics() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("hunter42").unwrap();
        assert!(verify_password("hunter42", &hash).unwrap());
        assert!(!verify_password("hunter43", &hash).unwrap());
    }
}
