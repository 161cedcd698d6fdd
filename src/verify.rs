//! Email verification page. The request is the only one in the app that is cancelled when
//! its view goes away: dropping [`EmailVerification`] aborts it.

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::ApiClient;

pub const VERIFIED_MESSAGE: &str = "Email verified successfully!";
pub const FAILED_MESSAGE: &str = "there is error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Verifying,
    Verified(String),
    Failed(String),
}

pub struct EmailVerification {
    changes: watch::Receiver<VerificationStatus>,
    task: JoinHandle<()>,
}

impl EmailVerification {
    /// Must be called inside a tokio runtime.
    pub fn start(api: ApiClient, verification_token: String) -> EmailVerification {
        let (sender, changes) = watch::channel(VerificationStatus::Verifying);

        let task = tokio::spawn(async move {
            let outcome = match api.verify_email(&verification_token).await {
                Ok(response) => {
                    info!("email verified");
                    VerificationStatus::Verified(
                        response.message.unwrap_or_else(|| VERIFIED_MESSAGE.to_string()),
                    )
                }
                Err(e) => {
                    warn!("email verification failed: {}", e);
                    VerificationStatus::Failed(e.user_message_or(FAILED_MESSAGE))
                }
            };
            let _ = sender.send(outcome);
        });

        EmailVerification {
            changes,
            task,
        }
    }

    pub fn status(&self) -> VerificationStatus {
        self.changes.borrow().clone()
    }

    /// Waits for the request to settle. If it was cancelled, waits for the task to wind down
    /// and returns the status it was left in.
    pub async fn wait(&mut self) -> VerificationStatus {
        let settled = self
            .changes
            .wait_for(|status| *status != VerificationStatus::Verifying)
            .await
            .map(|status| (*status).clone());
        match settled {
            Ok(status) => status,
            Err(_) => {
                if !self.task.is_finished() {
                    if let Err(e) = (&mut self.task).await {
                        debug!("email verification task ended: {}", e);
                    }
                }
                self.status()
            }
        }
    }

    pub fn cancel(&self) {
        if !self.task.is_finished() {
            debug!("email verification cancelled");
            self.task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for EmailVerification {
    fn drop(&mut self) {
        self.cancel();
    }
}
