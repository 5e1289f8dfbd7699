use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::students::Student, value_objects::masterclasses::Masterclass,
};

/// Best-effort side channel. Callers must treat every failure as
/// log-and-continue: by the time an invite is attempted the payment and
/// enrollment are already final.
#[automock]
#[async_trait]
pub trait InviteSender {
    async fn send_masterclass_invite(
        &self,
        student: &Student,
        masterclass: &Masterclass,
    ) -> Result<()>;
}
