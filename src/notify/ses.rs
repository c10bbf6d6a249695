use aws_sdk_sesv2::{
    error::DisplayErrorContext,
    types::{Body, Content, Destination, EmailContent, Message},
    Client as SesClient,
};

use super::{Mail, MailBody, Mailer, NotificationError};

const CHARSET: &str = "UTF-8";

/// Delivers mail through Amazon SES from a fixed sender address.
#[derive(Clone)]
pub struct SesMailer {
    client: SesClient,
    sender_address: String,
}

impl SesMailer {
    pub fn new(client: SesClient, sender_address: impl Into<String>) -> Self {
        Self {
            client,
            sender_address: sender_address.into(),
        }
    }
}

#[rocket::async_trait]
impl Mailer for SesMailer {
    async fn send(&self, mail: &Mail) -> Result<(), NotificationError> {
        let subject = Content::builder()
            .data(&mail.subject)
            .charset(CHARSET)
            .build()?;
        let content = Content::builder()
            .data(mail.body.as_str())
            .charset(CHARSET)
            .build()?;
        let body = match mail.body {
            MailBody::Text(_) => Body::builder().text(content).build(),
            MailBody::Html(_) => Body::builder().html(content).build(),
        };
        let message = Message::builder().subject(subject).body(body).build();
        let destination = Destination::builder()
            .set_to_addresses(Some(mail.to.clone()))
            .build();

        self.client
            .send_email()
            .from_email_address(&self.sender_address)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|err| NotificationError::Send(DisplayErrorContext(err).to_string()))?;

        Ok(())
    }
}
