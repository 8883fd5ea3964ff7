//! User administration service

use bcrypt::{hash, DEFAULT_COST};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{ActivityAction, EntityType, User, UserRole};
use crate::services::auth::{UserRow, USER_COLUMNS};
use crate::services::ActivityService;
use shared::{validate_email, validate_name, validate_password};

/// Service behind the admin user endpoints
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// Input for creating an account on someone's behalf
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub department: Option<String>,
}

/// Partial account update; absent fields keep their value
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub department: Option<String>,
}

/// Trim and lowercase an email, then check its shape
fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    validate_email(&email).map_err(|m| AppError::validation("email", m))?;
    Ok(email)
}

fn check_name(name: Option<&str>) -> AppResult<()> {
    if let Some(name) = name {
        validate_name(name).map_err(|m| AppError::validation("name", m))?;
    }
    Ok(())
}

fn hash_password(password: &str) -> AppResult<String> {
    validate_password(password).map_err(|m| AppError::validation("password", m))?;
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Blank department names are stored as no department
fn normalize_department(department: Option<String>) -> Option<String> {
    department
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All accounts, oldest first
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at, email",
            USER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".into()))?;

        Ok(row.into())
    }

    async fn ensure_email_free(&self, email: &str, except: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id != $2)",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.db)
        .await?;

        if taken > 0 {
            return Err(AppError::conflict("user", "Email is already in use"));
        }
        Ok(())
    }

    pub async fn create_user(&self, admin_id: Uuid, input: CreateUserInput) -> AppResult<User> {
        input.validate()?;
        check_name(Some(&input.name))?;
        let email = normalize_email(&input.email)?;
        let password_hash = hash_password(&input.password)?;
        self.ensure_email_free(&email, None).await?;

        let user: User = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, department)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(input.role.as_str())
        .bind(normalize_department(input.department))
        .fetch_one(&self.db)
        .await?
        .into();

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created by admin");

        ActivityService::new(self.db.clone())
            .log_activity(admin_id, ActivityAction::Create, EntityType::User, user.id, json!(user))
            .await;

        Ok(user)
    }

    pub async fn update_user(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> AppResult<User> {
        input.validate()?;
        check_name(input.name.as_deref())?;

        let existing = self.get_user(user_id).await?;

        let email = match input.email.as_deref() {
            Some(e) => normalize_email(e)?,
            None => existing.email.clone(),
        };
        if email != existing.email {
            self.ensure_email_free(&email, Some(user_id)).await?;
        }

        let password_hash = input.password.as_deref().map(hash_password).transpose()?;
        let department = match input.department {
            Some(d) => normalize_department(Some(d)),
            None => existing.department.clone(),
        };

        let updated: User = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET name = $1, email = $2, role = $3, department = $4,
                password_hash = COALESCE($5, password_hash), updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(input.name.as_deref().map(str::trim).unwrap_or(&existing.name))
        .bind(&email)
        .bind(input.role.unwrap_or(existing.role).as_str())
        .bind(&department)
        .bind(&password_hash)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?
        .into();

        ActivityService::new(self.db.clone())
            .log_activity(
                admin_id,
                ActivityAction::Update,
                EntityType::User,
                user_id,
                json!({
                    "old": existing,
                    "new": updated,
                    "passwordChanged": password_hash.is_some(),
                }),
            )
            .await;

        Ok(updated)
    }

    /// Remove an account; admins cannot remove their own
    pub async fn delete_user(&self, admin_id: Uuid, user_id: Uuid) -> AppResult<()> {
        if admin_id == user_id {
            return Err(AppError::conflict("user", "You cannot delete your own account"));
        }

        let existing = self.get_user(user_id).await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        tracing::info!(%user_id, "User deleted");

        ActivityService::new(self.db.clone())
            .log_activity(admin_id, ActivityAction::Delete, EntityType::User, user_id, json!(existing))
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Chef@Kitchen.Example ").unwrap(),
            "chef@kitchen.example"
        );
        assert!(matches!(
            normalize_email("not-an-email"),
            Err(AppError::Validation { field, .. }) if field == "email"
        ));
    }

    #[test]
    fn test_short_password_is_rejected_before_hashing() {
        assert!(matches!(
            hash_password("short"),
            Err(AppError::Validation { field, .. }) if field == "password"
        ));
    }

    #[test]
    fn test_blank_department_means_none() {
        assert_eq!(normalize_department(Some("  ".to_string())), None);
        assert_eq!(
            normalize_department(Some(" Pastry ".to_string())),
            Some("Pastry".to_string())
        );
        assert_eq!(normalize_department(None), None);
    }

    #[test]
    fn test_blank_name_is_rejected() {
        assert!(check_name(None).is_ok());
        assert!(matches!(
            check_name(Some("  ")),
            Err(AppError::Validation { field, .. }) if field == "name"
        ));
    }

    #[test]
    fn test_create_input_requires_known_role() {
        let parsed: Result<CreateUserInput, _> = serde_json::from_str(
            r#"{"name":"Ana","email":"ana@kitchen.example","password":"longenough","role":"chef"}"#,
        );
        assert!(parsed.is_err());

        let parsed: CreateUserInput = serde_json::from_str(
            r#"{"name":"Ana","email":"ana@kitchen.example","password":"longenough","role":"admin"}"#,
        )
        .unwrap();
        assert_eq!(parsed.role, UserRole::Admin);
        assert!(parsed.department.is_none());
    }
}
