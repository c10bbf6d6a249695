//! A [`Mailer`] for tests that keeps what it is given instead of sending it.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use super::{Mail, Mailer, NotificationError};

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Mail>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Duration>,
}

impl RecordingMailer {
    /// Make every delivery attempt fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Hold every delivery attempt for `delay` before it completes.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Mail delivered so far, in order.
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivery attempts so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[rocket::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &Mail) -> Result<(), NotificationError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            rocket::tokio::time::sleep(delay).await;
        }
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Send("mail server unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}
