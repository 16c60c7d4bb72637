//! Account commands: login, registration, the autosave preference and
//! profile management.
//!
//! Login and registration run before there is a session, so they take the
//! remote directly instead of a [`Ctx`]. Holding the resulting session is
//! the facade's job, and so is dropping it once the account is deleted.

use super::{CmdMessage, CmdResult, Ctx, Redirect};
use crate::error::{JotterError, Result};
use crate::model::User;
use crate::remote::{Credentials, PasswordChange, ProfileUpdate, Registration, RemoteService};
use crate::session::Session;

pub async fn login<R: RemoteService>(
    remote: &R,
    credentials: &Credentials,
) -> Result<(Session, CmdResult)> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(JotterError::validation("Email and password are required"));
    }
    let session = Session::from(remote.login(credentials).await?);
    tracing::debug!(user = %session.user.id, "logged in");
    let result = CmdResult::message(CmdMessage::success(format!(
        "Welcome back, {}!",
        session.user.firstname
    )))
    .with_redirect(Redirect::Home);
    Ok((session, result))
}

pub async fn register<R: RemoteService>(
    remote: &R,
    registration: &Registration,
) -> Result<CmdResult> {
    remote.register(registration).await?;
    Ok(
        CmdResult::message(CmdMessage::success("Account Registered! Proceed to Login."))
            .with_redirect(Redirect::Login),
    )
}

/// Returns the preference the service confirmed, which the caller stores.
pub async fn set_autosave<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    enabled: bool,
) -> Result<(bool, CmdResult)> {
    let confirmed = ctx.remote.set_autosave(&ctx.auth, enabled).await?;
    let text = if confirmed {
        "AutoSave Enabled"
    } else {
        "AutoSave Disabled"
    };
    Ok((confirmed, CmdResult::message(CmdMessage::success(text))))
}

/// Returns the user record the service confirmed, which the caller stores.
pub async fn update_profile<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    profile: &ProfileUpdate,
) -> Result<(User, CmdResult)> {
    let user = ctx.remote.update_profile(&ctx.auth, profile).await?;
    tracing::debug!(user = %user.id, "profile updated");
    let result = CmdResult::message(CmdMessage::success("Profile updated successfully"));
    Ok((user, result))
}

/// The confirmation must match before anything is sent.
pub async fn change_password<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    old_password: &str,
    new_password: &str,
    confirmation: &str,
) -> Result<CmdResult> {
    if old_password.is_empty() || new_password.is_empty() {
        return Err(JotterError::validation("Current and new password are required"));
    }
    if new_password != confirmation {
        return Err(JotterError::validation("New password and confirmation do not match."));
    }
    let change = PasswordChange {
        old_password: old_password.to_string(),
        new_password: new_password.to_string(),
    };
    let message = ctx.remote.change_password(&ctx.auth, &change).await?;
    Ok(CmdResult::message(CmdMessage::success(message)))
}

pub async fn delete_account<R: RemoteService>(ctx: &Ctx<'_, R>) -> Result<CmdResult> {
    ctx.remote.delete_account(&ctx.auth).await?;
    tracing::info!(user = ?ctx.user_id, "account deleted");
    Ok(
        CmdResult::message(CmdMessage::info("Account deleted successfully"))
            .with_redirect(Redirect::Register),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::remote::MemRemote;
    use crate::test_utils::{TestEnv, EMAIL, PASSWORD};

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn login_greets_and_redirects_home() {
        let remote = MemRemote::new();
        remote.add_user(EMAIL, PASSWORD, "Ada");

        let (session, result) = login(&remote, &creds(EMAIL, PASSWORD)).await.unwrap();

        assert_eq!(session.user.firstname, "Ada");
        assert_eq!(result.messages, vec![CmdMessage::success("Welcome back, Ada!")]);
        assert_eq!(result.redirect, Some(Redirect::Home));
    }

    #[tokio::test]
    async fn wrong_password_is_an_authorization_failure() {
        let remote = MemRemote::new();
        remote.add_user(EMAIL, PASSWORD, "Ada");

        let err = login(&remote, &creds(EMAIL, "nope")).await.unwrap_err();

        assert_eq!(err.class(), ErrorClass::Authorization);
    }

    #[tokio::test]
    async fn register_reports_every_validation_message() {
        let remote = MemRemote::new();
        let reg = Registration {
            firstname: String::new(),
            lastname: String::new(),
            email: "nope".into(),
            password: "123".into(),
        };

        let err = register(&remote, &reg).await.unwrap_err();

        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(err.to_string().lines().count(), 3);
    }

    #[tokio::test]
    async fn register_then_login() {
        let remote = MemRemote::new();
        let reg = Registration {
            firstname: "Grace".into(),
            lastname: "Hopper".into(),
            email: "grace@example.com".into(),
            password: "cobol60".into(),
        };

        let result = register(&remote, &reg).await.unwrap();
        assert_eq!(result.redirect, Some(Redirect::Login));

        let (session, _) = login(&remote, &creds("grace@example.com", "cobol60")).await.unwrap();
        assert_eq!(session.user.lastname, "Hopper");
    }

    #[tokio::test]
    async fn autosave_reports_confirmed_value() {
        let env = TestEnv::new().await;

        let (enabled, result) = set_autosave(&env.ctx(), false).await.unwrap();

        assert!(!enabled);
        assert_eq!(result.messages[0].content, "AutoSave Disabled");
        assert_eq!(env.remote.requests_to("PUT", "/auth/autosave").len(), 1);
    }

    fn profile(firstname: &str, email: &str) -> ProfileUpdate {
        ProfileUpdate {
            firstname: firstname.into(),
            lastname: "Byron".into(),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn profile_update_returns_the_confirmed_user() {
        let env = TestEnv::new().await;

        let (user, result) = update_profile(&env.ctx(), &profile("Augusta", "augusta@example.com"))
            .await
            .unwrap();

        assert_eq!(user.firstname, "Augusta");
        assert_eq!(user.email, "augusta@example.com");
        assert_eq!(result.messages, vec![CmdMessage::success("Profile updated successfully")]);
    }

    #[tokio::test]
    async fn profile_update_joins_validation_messages() {
        let env = TestEnv::new().await;

        let err = update_profile(&env.ctx(), &profile("", "nope")).await.unwrap_err();

        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(err.to_string(), "First name is required\nValid email is required");
    }

    #[tokio::test]
    async fn mismatched_confirmation_sends_nothing() {
        let env = TestEnv::new().await;

        let err = change_password(&env.ctx(), PASSWORD, "secret99", "secret98")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "New password and confirmation do not match.");
        assert!(env.remote.requests_to("PUT", "/auth/password").is_empty());
    }

    #[tokio::test]
    async fn password_change_needs_the_current_password() {
        let env = TestEnv::new().await;
        let ctx = env.ctx();

        let err = change_password(&ctx, "wrong", "secret99", "secret99").await.unwrap_err();
        assert_eq!(err.to_string(), "Current password is incorrect");

        let result = change_password(&ctx, PASSWORD, "secret99", "secret99").await.unwrap();
        assert_eq!(result.messages[0].content, "Password updated successfully");
        assert!(login(&env.remote, &creds(EMAIL, "secret99")).await.is_ok());
    }

    #[tokio::test]
    async fn deleting_the_account_redirects_to_registration() {
        let env = TestEnv::new().await;

        let result = delete_account(&env.ctx()).await.unwrap();

        assert_eq!(result.messages, vec![CmdMessage::info("Account deleted successfully")]);
        assert_eq!(result.redirect, Some(Redirect::Register));
        let err = login(&env.remote, &creds(EMAIL, PASSWORD)).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Authorization);
    }
}
