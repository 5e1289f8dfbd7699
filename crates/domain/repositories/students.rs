use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::students::{NewStudent, Student};

#[automock]
#[async_trait]
pub trait StudentRepository {
    /// Looks up the student document keyed by the auth provider's external
    /// id (the `user_…` value carried in references and webhook metadata).
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Student>>;

    /// Creates the student document if it does not exist yet, returning the
    /// stored document either way.
    async fn create_if_not_exists(&self, student: NewStudent) -> Result<Student>;
}
