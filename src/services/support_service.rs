//! Support service layer - tickets and contact inquiries

use std::sync::Arc;

use chrono::Utc;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    ContactInquiry, SupportTicket, TicketResponse, TicketStatus, UserRole,
};
use crate::services::EmailService;

pub struct SupportService {
    db_pool: PgPool,
    email_service: Arc<EmailService>,
}

impl SupportService {
    pub fn new(db_pool: PgPool, email_service: Arc<EmailService>) -> Self {
        Self {
            db_pool,
            email_service,
        }
    }

    // ===== Tickets =====

    pub async fn create_ticket(
        &self,
        user_id: Uuid,
        subject: &str,
        message: &str,
    ) -> ApiResult<SupportTicket> {
        let now = Utc::now();
        let ticket = sqlx::query_as::<_, SupportTicket>(
            r#"
            INSERT INTO support_tickets
                (id, user_id, subject, message, status, responses, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'open', '[]', $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(subject)
        .bind(message)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(ticket)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> ApiResult<Vec<SupportTicket>> {
        let tickets = sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(tickets)
    }

    pub async fn list(
        &self,
        status: Option<TicketStatus>,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<SupportTicket>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM support_tickets WHERE 1=1");

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let tickets = query_builder
            .build_query_as::<SupportTicket>()
            .fetch_all(&self.db_pool)
            .await?;
        Ok(tickets)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<SupportTicket> {
        let ticket = sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Support ticket"))?;
        Ok(ticket)
    }

    /// Append to the response thread. An admin reply flips the ticket to
    /// `answered`; a user follow-up reopens it. The append is a single JSONB
    /// concatenation, not read-modify-write.
    pub async fn respond(
        &self,
        id: Uuid,
        author_id: Uuid,
        author_role: UserRole,
        message: &str,
    ) -> ApiResult<SupportTicket> {
        let ticket = self.get(id).await?;
        if ticket.status == TicketStatus::Closed {
            return Err(ApiError::conflict("Ticket is closed", "TICKET_CLOSED"));
        }
        if author_role != UserRole::Admin && ticket.user_id != author_id {
            return Err(ApiError::NotFound("Support ticket"));
        }

        let now = Utc::now();
        let response = TicketResponse {
            author_id,
            author_role,
            message: message.to_string(),
            created_at: now,
        };
        let status = match author_role {
            UserRole::Admin => TicketStatus::Answered,
            UserRole::User => TicketStatus::Open,
        };

        let ticket = sqlx::query_as::<_, SupportTicket>(
            r#"
            UPDATE support_tickets
            SET responses = responses || $2, status = $3, updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(vec![response]))
        .bind(status)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(ticket)
    }

    pub async fn close(&self, id: Uuid) -> ApiResult<SupportTicket> {
        let ticket = sqlx::query_as::<_, SupportTicket>(
            r#"
            UPDATE support_tickets SET status = 'closed', updated_at = $2
            WHERE id = $1 AND status != 'closed'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await?;

        match ticket {
            Some(t) => Ok(t),
            None => match sqlx::query_as::<_, SupportTicket>(
                "SELECT * FROM support_tickets WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            {
                Some(_) => Err(ApiError::already_processed()),
                None => Err(ApiError::NotFound("Support ticket")),
            },
        }
    }

    // ===== Contact inquiries =====

    /// Store a public contact inquiry and notify the admin mailbox. The
    /// notification is fire-and-forget; a provider failure never fails the
    /// inquiry itself.
    pub async fn create_inquiry(
        &self,
        name: &str,
        email: &str,
        subject: &str,
        message: &str,
    ) -> ApiResult<ContactInquiry> {
        let inquiry = sqlx::query_as::<_, ContactInquiry>(
            r#"
            INSERT INTO contact_inquiries (id, name, email, subject, message, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(subject)
        .bind(message)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        self.email_service.notify_admin_contact(name, subject);
        Ok(inquiry)
    }

    pub async fn list_inquiries(&self, limit: i64, offset: i64) -> ApiResult<Vec<ContactInquiry>> {
        let inquiries = sqlx::query_as::<_, ContactInquiry>(
            "SELECT * FROM contact_inquiries ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(inquiries)
    }

    pub async fn mark_inquiry_read(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("UPDATE contact_inquiries SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Contact inquiry"));
        }
        Ok(())
    }
}
