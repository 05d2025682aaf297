use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{AdminLoginResponse, LoginRequest, LoginResponse, SignupRequest},
    entity::{
        admins::{Column as AdminCol, Entity as Admins},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    models::{Admin, Role, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

pub async fn signup(state: &AppState, payload: SignupRequest) -> AppResult<ApiResponse<User>> {
    let signup = NormalizedSignup::try_from(payload)?;

    let orm = state.orm().await?;
    let existing = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Email.eq(signup.email.as_str()))
                .add(UserCol::Username.eq(signup.username.as_str())),
        )
        .one(&orm)
        .await?;
    if let Some(existing) = existing {
        let message = if existing.email == signup.email {
            "Email already exists"
        } else {
            "Username already exists"
        };
        return Err(AppError::Conflict(message.into()));
    }

    let password_hash = hash_password(&signup.password)?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(signup.username),
        first_name: Set(signup.first_name),
        last_name: Set(signup.last_name),
        email: Set(signup.email),
        password_hash: Set(password_hash),
        role: Set(Role::User.as_str().to_string()),
        created_at: NotSet,
    }
    .insert(&orm)
    .await?;
    tracing::info!(user_id = %user.id, username = %user.username, "user signed up");

    audit::record(
        &orm,
        Some(user.id),
        "user_signup",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created successfully",
        User::try_from(user)?,
        Some(Meta::empty()),
    ))
}

/// `username` is matched against both the username and the email address.
pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let login = username.trim();

    let orm = state.orm().await?;
    let user = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Username.eq(login))
                .add(UserCol::Email.eq(login.to_lowercase())),
        )
        .one(&orm)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&user.password_hash, &password)? {
        return Err(invalid_credentials());
    }

    let user = User::try_from(user)?;
    let token = state.jwt.issue(user.id, &user.username, user.role)?;

    audit::record(
        &orm,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Login successful",
        LoginResponse { token, user },
        Some(Meta::empty()),
    ))
}

pub async fn admin_login(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AdminLoginResponse>> {
    let orm = state.orm().await?;
    let admin = Admins::find()
        .filter(AdminCol::Username.eq(payload.username.trim()))
        .one(&orm)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&admin.password_hash, &payload.password)? {
        return Err(invalid_credentials());
    }

    let admin = Admin::from(admin);
    let token = state.jwt.issue(admin.id, &admin.username, Role::Admin)?;

    audit::record(
        &orm,
        Some(admin.id),
        "admin_login",
        "admins",
        serde_json::json!({ "admin_id": admin.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Admin login successful",
        AdminLoginResponse { token, admin },
        Some(Meta::empty()),
    ))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}

/// Signup fields after trimming and lower-casing the email.
#[derive(Debug)]
struct NormalizedSignup {
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}

impl TryFrom<SignupRequest> for NormalizedSignup {
    type Error = AppError;

    fn try_from(payload: SignupRequest) -> AppResult<Self> {
        let signup = Self {
            username: payload.username.trim().to_string(),
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            email: payload.email.trim().to_lowercase(),
            password: payload.password,
        };

        if signup.username.chars().count() < MIN_USERNAME_LEN {
            return Err(AppError::InvalidArgument(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if signup.first_name.is_empty() || signup.last_name.is_empty() {
            return Err(AppError::InvalidArgument(
                "First and last name are required".into(),
            ));
        }
        if signup.email.is_empty() || !signup.email.contains('@') {
            return Err(AppError::InvalidArgument("A valid email is required".into()));
        }
        if signup.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidArgument(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(signup)
    }
}
