use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::courses::Course, value_objects::masterclasses::Masterclass,
};

#[automock]
#[async_trait]
pub trait CourseCatalog {
    async fn find_course_by_id(&self, course_id: &str) -> Result<Option<Course>>;
}

/// Read-only view of the external calendar catalog.
#[automock]
#[async_trait]
pub trait MasterclassCatalog {
    async fn list_masterclasses(&self) -> Result<Vec<Masterclass>>;

    async fn find_masterclass_by_id(&self, masterclass_id: &str) -> Result<Option<Masterclass>>;

    /// Best available title for an event: the caller's hint when present,
    /// otherwise the calendar's answer, otherwise a generated placeholder.
    async fn event_title(&self, masterclass_id: &str, hint: Option<String>) -> String;
}
