use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;

use crate::domain::{
    entities::students::Student, repositories::invites::InviteSender,
    value_objects::masterclasses::Masterclass,
};

use super::ics;

/// Invite delivery over an HTTP email API.
///
/// This sits on the best-effort side channel: the reconciliation flow calls
/// it after the enrollment is already final and swallows every error, so
/// the client keeps a short timeout and never retries.
pub struct ResendClient {
    http: reqwest::Client,
    api_key: String,
    from_name: String,
    from_email: String,
}

impl ResendClient {
    pub fn new(
        api_key: String,
        from_name: String,
        from_email: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_key,
            from_name,
            from_email,
        })
    }

    fn invite_text(student_name: &str, masterclass: &Masterclass) -> String {
        let mut body = format!(
            "Hi {},\n\nYou're enrolled in \"{}\".\nStarts: {}\n",
            student_name,
            masterclass.title,
            masterclass.start_time.to_rfc3339(),
        );
        if let Some(link) = &masterclass.meeting_link {
            body.push_str(&format!("Join: {link}\n"));
        }
        body.push_str("\nThe attached calendar invite has the full details.\n");
        body
    }
}

#[async_trait]
impl InviteSender for ResendClient {
    async fn send_masterclass_invite(
        &self,
        student: &Student,
        masterclass: &Masterclass,
    ) -> Result<()> {
        let email = student
            .email
            .as_deref()
            .filter(|email| !email.is_empty())
            .ok_or_else(|| anyhow!("student has no email address"))?;

        let name = student.display_name();
        let ics_content = ics::masterclass_invite(
            masterclass,
            &self.from_name,
            &self.from_email,
            &name,
            email,
        );

        let body = json!({
            "from": format!("{} <{}>", self.from_name, self.from_email),
            "to": [email],
            "subject": format!("Calendar Invite: {}", masterclass.title),
            "text": Self::invite_text(&name, masterclass),
            "attachments": [{
                "filename": "invite.ics",
                "content": BASE64.encode(ics_content.as_bytes()),
                "content_type": "text/calendar",
            }],
        });

        let resp = self
            .http
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!(
                "invite email request returned status {}",
                resp.status()
            ));
        }

        Ok(())
    }
}
